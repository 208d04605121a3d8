//! # Logical Conversion Rules
//!
//! The binder produces logical operators in the NONE convention. Converting them to
//! LOGICAL changes nothing but the convention: operator attributes, the other traits
//! and the (already converted) inputs carry over as they are.
//!
//! The aggregate gets a dedicated rule because it is the operator with the richest
//! payload. It rebuilds the aggregate from its parts through `Aggregate::new`, which
//! re-validates the grouping sets against the group set, instead of copying the
//! operator blindly.

use relconv_core::pattern::Operand;
use relconv_core::plan::{Aggregate, LogicalOp, LogicalOpKind, Operator, PlanRef};
use relconv_core::rule::ConverterRule;
use relconv_core::{Convention, PlanError, Result};

/// Re-tag a NONE-convention logical operator as LOGICAL.
pub struct LogicalConverterRule {
    kind: LogicalOpKind,
    name: String,
}

impl LogicalConverterRule {
    pub fn new(kind: LogicalOpKind) -> Self {
        Self {
            kind,
            name: format!("{kind}ConverterRule"),
        }
    }
}

impl ConverterRule for LogicalConverterRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn operand(&self) -> Operand {
        Operand::of(self.kind).with_convention(Convention::NONE)
    }

    fn source_convention(&self) -> Convention {
        Convention::NONE
    }

    fn target_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        node.copy(
            node.traits().with_convention(Convention::LOGICAL),
            node.inputs().to_vec(),
        )
        .map(Some)
    }
}

/// Convert a NONE-convention aggregate into a LOGICAL one.
pub struct AggregateConverterRule;

impl ConverterRule for AggregateConverterRule {
    fn name(&self) -> &str {
        "AggregateConverterRule"
    }

    fn operand(&self) -> Operand {
        Operand::aggregate().with_convention(Convention::NONE)
    }

    fn source_convention(&self) -> Convention {
        Convention::NONE
    }

    fn target_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let agg = node.aggregate().ok_or_else(|| {
            PlanError::invalid_plan(format!("{} is not an aggregate", node.kind()))
        })?;
        let rebuilt = Aggregate::new(
            agg.group_set.clone(),
            Some(agg.group_sets.clone()),
            agg.agg_calls.clone(),
        )?
        .with_hints(agg.hints.clone());
        node.copy_with_op(
            Operator::Logical(LogicalOp::Aggregate(rebuilt)),
            node.traits().with_convention(Convention::LOGICAL),
            node.inputs().to_vec(),
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relconv_core::expr::{AggFunc, AggregateCall, DataType, TableRef};
    use relconv_core::plan::{ColumnSet, PlanHint, PlanNode};
    use relconv_core::traits::{Distribution, RelTrait};
    use relconv_core::TraitSet;
    use std::sync::Arc;

    fn logical_scan() -> PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Scan {
                table: TableRef::new("s", "t"),
                columns: vec!["a".into(), "b".into(), "c".into()],
            }),
            TraitSet::new(Convention::LOGICAL),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_retag_keeps_other_traits() {
        let traits = TraitSet::new(Convention::NONE)
            .replace(RelTrait::Distribution(Distribution::Hash(vec![0])));
        let limit = PlanNode::new(
            Operator::Logical(LogicalOp::Limit { offset: 5, count: 10 }),
            traits,
            vec![logical_scan()],
        )
        .unwrap();

        let rule = LogicalConverterRule::new(LogicalOpKind::Limit);
        assert_eq!(rule.name(), "LogicalLimitConverterRule");
        let converted = rule.convert(&limit).unwrap().unwrap();
        assert_eq!(converted.convention(), &Convention::LOGICAL);
        assert_eq!(
            converted.traits().distribution(),
            Some(&Distribution::Hash(vec![0]))
        );
        assert_eq!(converted.op(), limit.op());
    }

    #[test]
    fn test_aggregate_payload_carried_over() {
        let agg = Aggregate::new(
            ColumnSet::of(&[0, 1]),
            Some(vec![ColumnSet::of(&[0, 1]), ColumnSet::of(&[0]), ColumnSet::of(&[])]),
            vec![
                AggregateCall::count_star(),
                AggregateCall::new(AggFunc::Sum, vec![2], DataType::Int64),
            ],
        )
        .unwrap()
        .with_hints(vec![PlanHint::new("agg_strategy", vec!["hash".into()])]);
        let input = logical_scan();
        let node = PlanNode::new(
            Operator::Logical(LogicalOp::Aggregate(agg.clone())),
            TraitSet::new(Convention::NONE),
            vec![input.clone()],
        )
        .unwrap();

        let converted = AggregateConverterRule.convert(&node).unwrap().unwrap();
        assert_eq!(converted.aggregate(), Some(&agg));
        assert!(Arc::ptr_eq(&converted.inputs()[0], &input));
        assert_eq!(converted.convention(), &Convention::LOGICAL);
        // the original node is untouched
        assert_eq!(node.convention(), &Convention::NONE);
    }
}
