//! # Sort Implementation Rule
//!
//! Maps a logical Sort (from an ORDER BY) to a physical SortOp. The physical sort is
//! the operator that establishes an ordering, so besides switching the convention it
//! records its sort keys as the node's collation trait. Parents can then read the
//! ordering off the trait set without inspecting the operator.

use relconv_core::pattern::Operand;
use relconv_core::plan::{LogicalOp, Operator, PhysicalOp, PlanRef};
use relconv_core::rule::ConverterRule;
use relconv_core::{Convention, RelTrait, Result};

/// Implement logical sort as a physical sort operator.
pub struct ImplSortRule;

impl ConverterRule for ImplSortRule {
    fn name(&self) -> &str {
        "ImplSort"
    }

    fn operand(&self) -> Operand {
        Operand::sort()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Sort { collation }) = node.op() else {
            return Ok(None);
        };
        let traits = node
            .traits()
            .with_convention(Convention::PHYSICAL)
            .replace(RelTrait::Collation(collation.clone()));
        crate::implement_with_traits(
            node,
            PhysicalOp::SortOp {
                collation: collation.clone(),
            },
            traits,
        )
    }
}
