//! # Join Implementation Rule
//!
//! Maps a logical Join to one of two physical joins:
//!
//! ## Hash Join
//!
//! Builds a hash table on one side and probes it with the other. It needs an
//! equi-condition: every conjunct must compare a left column with a right column
//! (`$l = $r`, in either order). The build side is always the right input; picking the
//! smaller side is a costing decision and out of scope here.
//!
//! ## Nested Loop Join
//!
//! For each left row, scans every right row. It handles any condition, including
//! non-equi predicates and cross joins, and is used whenever the hash join does not
//! apply.

use relconv_core::expr::{BinaryOp, Expr, JoinType};
use relconv_core::pattern::Operand;
use relconv_core::plan::{BuildSide, LogicalOp, Operator, PhysicalOp, PlanRef};
use relconv_core::rule::ConverterRule;
use relconv_core::{Convention, Result};

/// Implement logical join as a hash join when possible, a nested loop join otherwise.
pub struct ImplJoinRule;

impl ConverterRule for ImplJoinRule {
    fn name(&self) -> &str {
        "ImplJoin"
    }

    fn operand(&self) -> Operand {
        Operand::join()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = node.op()
        else {
            return Ok(None);
        };
        let left_width = node.input(0).map_or(0, |left| left.output_width());

        let op = if *join_type != JoinType::Cross && is_equi_join(condition, left_width) {
            PhysicalOp::HashJoin {
                join_type: *join_type,
                condition: condition.clone(),
                build_side: BuildSide::Right,
            }
        } else {
            PhysicalOp::NestedLoopJoin {
                join_type: *join_type,
                condition: condition.clone(),
            }
        };
        crate::implement(node, op)
    }
}

/// True if there is at least one conjunct and every conjunct is `$l = $r` with one
/// column from each side. An empty conjunction is TRUE, i.e. a cross product.
fn is_equi_join(condition: &Expr, left_width: usize) -> bool {
    let conjuncts = condition.conjuncts();
    !conjuncts.is_empty()
        && conjuncts
            .iter()
            .all(|conjunct| is_cross_side_eq(conjunct, left_width))
}

fn is_cross_side_eq(conjunct: &Expr, left_width: usize) -> bool {
    match conjunct {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expr::InputRef(a), Expr::InputRef(b)) => (*a < left_width) != (*b < left_width),
            _ => false,
        },
        _ => false,
    }
}
