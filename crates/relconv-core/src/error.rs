//! # Planner Errors
//!
//! Every fallible operation in this crate returns [`PlanError`]. Conversion errors abort
//! the whole `convert` call; no partially converted tree is ever handed back. Registry
//! errors (`AmbiguousRule`, `InvalidRule`) only occur while building a registry at
//! startup, never per query.

use crate::plan::OpKind;
use crate::traits::Convention;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A trait set without exactly one convention, or a node whose kind does not admit
    /// the supplied convention.
    #[error("invalid trait set: {reason}")]
    InvalidTrait { reason: String },

    /// No registered rule converts the operator kind between the two conventions.
    #[error("no rule converts {kind} from {from} to {to}")]
    NoApplicableRule {
        kind: OpKind,
        from: Convention,
        to: Convention,
    },

    /// A node was reached again while its own inputs were still being converted.
    #[error("cyclic plan: {node} reached while still being converted")]
    CyclicPlan { node: String },

    /// Two rules claim the same (kind, source, target) key with the same priority.
    #[error(
        "ambiguous rules for {kind} from {from} to {to}: '{first}' and '{second}' both have priority {priority}"
    )]
    AmbiguousRule {
        kind: OpKind,
        from: Convention,
        to: Convention,
        first: String,
        second: String,
        priority: i32,
    },

    /// The selected rule matched but declined to produce a node.
    #[error("rule '{rule}' declined to convert {kind}")]
    RuleDeclined { rule: String, kind: OpKind },

    /// A rule produced a node that breaks the converter contract.
    #[error("rule '{rule}' violated its contract: {reason}")]
    RuleContract { rule: String, reason: String },

    /// A rule that cannot be registered.
    #[error("cannot register rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    /// Structurally malformed plan: wrong arity, out of range column, bad graph ids.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("plan exceeds the maximum depth of {limit}")]
    PlanTooDeep { limit: usize },
}

impl PlanError {
    pub fn invalid_trait(reason: impl Into<String>) -> Self {
        PlanError::InvalidTrait {
            reason: reason.into(),
        }
    }

    pub fn invalid_plan(reason: impl Into<String>) -> Self {
        PlanError::InvalidPlan(reason.into())
    }
}
