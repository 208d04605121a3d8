//! # Built-in Converter Rules
//!
//! This crate provides the default set of converter rules for the relconv planner.
//! Rules fall into two stages:
//!
//! ## Logical Conversion (NONE -> LOGICAL)
//!
//! Plans arrive from the binder in the NONE convention. These rules re-tag each logical
//! operator with the LOGICAL convention, keeping its attributes, other traits and inputs:
//!
//! - **`LogicalConverterRule`**: one instance per non-aggregate logical kind (Scan,
//!   Filter, Project, Join, Sort, Limit).
//! - **`AggregateConverterRule`**: the aggregate, copying group set, grouping sets,
//!   aggregate calls and hints.
//!
//! ## Implementation (LOGICAL -> PHYSICAL)
//!
//! - **`ImplSeqScanRule`**: Scan as a sequential table scan.
//! - **`ImplFilterRule`**, **`ImplProjectRule`**, **`ImplLimitRule`**: one-to-one
//!   physical counterparts.
//! - **`ImplJoinRule`**: a hash join for equi-joins, a nested loop join otherwise.
//! - **`ImplHashAggregateRule`**: aggregation with a hash table.
//! - **`ImplSortRule`**: a physical sort that establishes the collation trait.

pub mod enforcer;
pub mod impl_agg;
pub mod impl_join;
pub mod impl_scan;
pub mod impl_unary;
pub mod logical;

use relconv_core::plan::{LogicalOpKind, Operator, PhysicalOp, PlanNode, PlanRef};
use relconv_core::rule::{RuleRegistry, RuleRegistryBuilder};
use relconv_core::traits::TraitSet;
use relconv_core::{Convention, Result};
use std::sync::{Arc, OnceLock};

/// Add every built-in rule to `builder`.
///
/// Downstream crates call this before adding their own rules, so that custom conventions
/// can sit alongside the standard ones in one registry.
pub fn default_rules(builder: &mut RuleRegistryBuilder) -> &mut RuleRegistryBuilder {
    for kind in LogicalOpKind::ALL {
        if kind != LogicalOpKind::Aggregate {
            builder.add_rule(Box::new(logical::LogicalConverterRule::new(kind)));
        }
    }
    builder.add_rule(Box::new(logical::AggregateConverterRule));

    builder
        .add_rule(Box::new(impl_scan::ImplSeqScanRule))
        .add_rule(Box::new(impl_unary::ImplFilterRule))
        .add_rule(Box::new(impl_unary::ImplProjectRule))
        .add_rule(Box::new(impl_join::ImplJoinRule))
        .add_rule(Box::new(impl_agg::ImplHashAggregateRule))
        .add_rule(Box::new(enforcer::ImplSortRule))
        .add_rule(Box::new(impl_unary::ImplLimitRule))
}

/// Create a registry with all built-in rules.
pub fn default_rule_registry() -> Result<RuleRegistry> {
    let mut builder = RuleRegistryBuilder::new();
    default_rules(&mut builder);
    builder.build()
}

static SHARED: OnceLock<Result<Arc<RuleRegistry>>> = OnceLock::new();

/// The process-wide default registry, built on first use.
pub fn shared_registry() -> Result<Arc<RuleRegistry>> {
    SHARED
        .get_or_init(|| default_rule_registry().map(Arc::new))
        .clone()
}

/// Replace a logical node by a physical operator over the same inputs.
pub(crate) fn implement(node: &PlanRef, op: PhysicalOp) -> Result<Option<PlanRef>> {
    let traits = node.traits().with_convention(Convention::PHYSICAL);
    implement_with_traits(node, op, traits)
}

pub(crate) fn implement_with_traits(
    node: &PlanRef,
    op: PhysicalOp,
    traits: TraitSet,
) -> Result<Option<PlanRef>> {
    PlanNode::new(Operator::Physical(op), traits, node.inputs().to_vec()).map(Some)
}
