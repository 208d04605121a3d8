//! # HTTP Route Handlers
//!
//! ## Conversion Pipeline
//!
//! `run_conversion` backs `POST /convert`:
//!
//! 1. **Resolve**: rebuild the `Arc` tree from the id-addressed `PlanGraph`, rejecting
//!    cycles and trees deeper than the planner's `max_depth`.
//! 2. **Convert**: run one planner pass per requested convention, in order.
//! 3. **Flatten**: turn the result back into a `PlanGraph` and render its explain text.
//!
//! ## Error Handling
//!
//! Errors are returned as HTTP status codes with the error's message as body:
//! - 400 Bad Request: malformed plans (bad traits, arity, ids, cycles, depth) or an
//!   empty target list
//! - 422 Unprocessable Entity: a well-formed plan the rule set cannot convert
//! - 500 Internal Server Error: broken rules (contract violations, registry errors)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use relconv_core::explain::explain as explain_plan;
use relconv_core::graph::PlanGraph;
use relconv_core::{Convention, PlanError, PlanRef};

use crate::state::AppState;

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /rules: registered rules in registration order.
pub async fn list_rules(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rules: Vec<RuleInfo> = state
        .planner
        .registry()
        .rules()
        .map(|r| RuleInfo {
            name: r.name().to_string(),
            kind: r
                .operand()
                .root_kind()
                .map(|k| k.to_string())
                .unwrap_or_default(),
            source: r.source_convention(),
            target: r.target_convention(),
            priority: r.priority(),
        })
        .collect();

    Json(RulesResponse { rules })
}

#[derive(Serialize)]
pub struct RulesResponse {
    pub rules: Vec<RuleInfo>,
}

#[derive(Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub kind: String,
    pub source: Convention,
    pub target: Convention,
    pub priority: i32,
}

#[derive(Deserialize)]
pub struct ConvertRequest {
    pub plan: PlanGraph,
    /// Conventions to convert through, in order (e.g. `["LOGICAL", "PHYSICAL"]`).
    pub targets: Vec<Convention>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub plan: PlanGraph,
    pub explain: String,
}

/// POST /convert
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let converted = run_conversion(&state, &req)?;
    Ok(Json(converted))
}

#[derive(Deserialize)]
pub struct ExplainRequest {
    pub plan: PlanGraph,
}

#[derive(Serialize)]
pub struct ExplainResponse {
    pub explain: String,
}

/// POST /explain: render a plan as is.
pub async fn explain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExplainRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let plan = resolve(&state, &req.plan)?;
    Ok(Json(ExplainResponse {
        explain: explain_plan(&plan),
    }))
}

/// Core conversion logic behind `POST /convert`.
fn run_conversion(
    state: &AppState,
    req: &ConvertRequest,
) -> Result<ConvertResponse, (StatusCode, String)> {
    if req.targets.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "at least one target convention is required".to_string(),
        ));
    }
    let root = resolve(state, &req.plan)?;
    let converted = state
        .planner
        .convert_through(&root, &req.targets)
        .map_err(reject)?;
    Ok(ConvertResponse {
        plan: PlanGraph::from_plan(&converted),
        explain: explain_plan(&converted),
    })
}

/// Rebuild a plan from the wire, bounded by the planner's depth limit.
fn resolve(state: &AppState, graph: &PlanGraph) -> Result<PlanRef, (StatusCode, String)> {
    graph
        .to_plan_with_max_depth(state.planner.config().max_depth)
        .map_err(reject)
}

fn reject(err: PlanError) -> (StatusCode, String) {
    let status = error_status(&err);
    if status.is_server_error() {
        tracing::error!("Conversion failed: {}", err);
    } else {
        tracing::debug!("Rejected plan: {}", err);
    }
    (status, err.to_string())
}

fn error_status(err: &PlanError) -> StatusCode {
    match err {
        PlanError::InvalidTrait { .. }
        | PlanError::InvalidPlan(_)
        | PlanError::CyclicPlan { .. }
        | PlanError::PlanTooDeep { .. } => StatusCode::BAD_REQUEST,
        PlanError::NoApplicableRule { .. } | PlanError::RuleDeclined { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlanError::RuleContract { .. }
        | PlanError::AmbiguousRule { .. }
        | PlanError::InvalidRule { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
