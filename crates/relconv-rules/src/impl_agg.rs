//! # Aggregate Implementation Rule
//!
//! ## Hash Aggregate (`ImplHashAggregateRule`)
//!
//! Uses a hash table keyed by the group-by columns. Each input row is hashed and routed
//! to its bucket, where the aggregate accumulators are updated. It works with any input
//! ordering and with multiple grouping sets (one hash table per set), which makes it the
//! implementation for every logical aggregate.
//!
//! The whole aggregate payload, grouping sets, calls and hints included, moves to the
//! physical operator unchanged.

use relconv_core::pattern::Operand;
use relconv_core::plan::{LogicalOp, Operator, PhysicalOp, PlanRef};
use relconv_core::rule::ConverterRule;
use relconv_core::{Convention, Result};

/// Implement logical aggregate as a hash aggregate.
pub struct ImplHashAggregateRule;

impl ConverterRule for ImplHashAggregateRule {
    fn name(&self) -> &str {
        "ImplHashAggregate"
    }

    fn operand(&self) -> Operand {
        Operand::aggregate()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Aggregate(agg)) = node.op() else {
            return Ok(None);
        };
        crate::implement(node, PhysicalOp::HashAggregate(agg.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relconv_core::expr::{AggFunc, AggregateCall, DataType, TableRef};
    use relconv_core::plan::{Aggregate, ColumnSet, PlanNode};
    use relconv_core::TraitSet;

    #[test]
    fn test_hash_aggregate_keeps_payload() {
        let scan = PlanNode::new(
            Operator::Physical(PhysicalOp::SeqScan {
                table: TableRef::new("tpch", "lineitem"),
                columns: vec!["l_returnflag".into(), "l_quantity".into()],
            }),
            TraitSet::new(Convention::PHYSICAL),
            vec![],
        )
        .unwrap();
        let agg = Aggregate::new(
            ColumnSet::of(&[0]),
            None,
            vec![AggregateCall {
                distinct: true,
                ..AggregateCall::new(AggFunc::Sum, vec![1], DataType::Int64)
            }],
        )
        .unwrap();
        let logical = PlanNode::new(
            Operator::Logical(LogicalOp::Aggregate(agg.clone())),
            TraitSet::new(Convention::LOGICAL),
            vec![scan],
        )
        .unwrap();

        let physical = ImplHashAggregateRule.convert(&logical).unwrap().unwrap();
        assert_eq!(physical.aggregate(), Some(&agg));
        assert_eq!(
            physical.to_string(),
            "HashAggregate(group={0}, aggs=[SUM(DISTINCT $1)]) [PHYSICAL]"
        );
    }
}
