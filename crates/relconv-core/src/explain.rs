//! # Explain Output
//!
//! Deterministic text rendering of a plan tree, used for logging and for golden
//! assertions in tests. One node per line, two spaces of indentation per level:
//!
//! ```text
//! LogicalAggregate(group={0, 1}, aggs=[COUNT()]) [LOGICAL]
//!   LogicalScan(table=s.t, columns=[a, b]) [LOGICAL]
//! ```
//!
//! Attribute order is fixed per operator and every collection is printed in its stored
//! order, so equal trees always render identically. Shared subtrees are printed once
//! per reference. An aggregate prints `groups=` only when its grouping sets differ
//! from the single set `[group]` of a plain GROUP BY.

use crate::plan::{Aggregate, LogicalOp, Operator, PhysicalOp, PlanNode};
use crate::traits::write_list;
use std::fmt::{self, Write};

/// Render a plan tree.
pub fn explain(plan: &PlanNode) -> String {
    let mut out = String::new();
    let mut pending = vec![(plan, 0usize)];
    while let Some((node, depth)) = pending.pop() {
        for _ in 0..depth {
            out.push_str("  ");
        }
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", node.digest());
        pending.extend(node.inputs().iter().rev().map(|input| (&**input, depth + 1)));
    }
    out
}

fn write_aggregate(f: &mut fmt::Formatter<'_>, agg: &Aggregate) -> fmt::Result {
    write!(f, "group={}", agg.group_set)?;
    if !agg.is_simple() {
        f.write_str(", groups=[")?;
        write_list(f, agg.group_sets.iter().map(|s| s.to_string()))?;
        f.write_str("]")?;
    }
    f.write_str(", aggs=[")?;
    write_list(f, agg.agg_calls.iter().map(|c| c.to_string()))?;
    f.write_str("]")?;
    if !agg.hints.is_empty() {
        f.write_str(", hints=[")?;
        write_list(
            f,
            agg.hints
                .iter()
                .map(|h| format!("{}({})", h.name, h.options.join(", "))),
        )?;
        f.write_str("]")?;
    }
    Ok(())
}

fn write_strings(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    f.write_str("[")?;
    write_list(f, items.iter().cloned())?;
    f.write_str("]")
}

fn write_exprs(f: &mut fmt::Formatter<'_>, exprs: &[crate::expr::Expr]) -> fmt::Result {
    f.write_str("[")?;
    write_list(f, exprs.iter().map(|e| e.to_string()))?;
    f.write_str("]")
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind())?;
        match self {
            Operator::Logical(LogicalOp::Scan { table, columns })
            | Operator::Physical(PhysicalOp::SeqScan { table, columns }) => {
                write!(f, "table={table}, columns=")?;
                write_strings(f, columns)?;
            }
            Operator::Logical(LogicalOp::Filter { predicate })
            | Operator::Physical(PhysicalOp::Filter { predicate }) => {
                write!(f, "condition={predicate}")?;
            }
            Operator::Logical(LogicalOp::Project { exprs, aliases })
            | Operator::Physical(PhysicalOp::Project { exprs, aliases }) => {
                f.write_str("exprs=")?;
                write_exprs(f, exprs)?;
                f.write_str(", aliases=")?;
                write_strings(f, aliases)?;
            }
            Operator::Logical(LogicalOp::Join {
                join_type,
                condition,
            })
            | Operator::Physical(PhysicalOp::NestedLoopJoin {
                join_type,
                condition,
            }) => {
                write!(f, "type={join_type}, condition={condition}")?;
            }
            Operator::Physical(PhysicalOp::HashJoin {
                join_type,
                condition,
                build_side,
            }) => {
                write!(
                    f,
                    "type={join_type}, condition={condition}, build={build_side:?}"
                )?;
            }
            Operator::Logical(LogicalOp::Aggregate(agg))
            | Operator::Physical(PhysicalOp::HashAggregate(agg)) => {
                write_aggregate(f, agg)?;
            }
            Operator::Logical(LogicalOp::Sort { collation })
            | Operator::Physical(PhysicalOp::SortOp { collation }) => {
                f.write_str("keys=[")?;
                write_list(f, collation.iter().map(|c| c.to_string()))?;
                f.write_str("]")?;
            }
            Operator::Logical(LogicalOp::Limit { offset, count })
            | Operator::Physical(PhysicalOp::Limit { offset, count }) => {
                write!(f, "offset={offset}, count={count}")?;
            }
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{AggregateCall, TableRef};
    use crate::plan::{ColumnSet, PlanHint};
    use crate::traits::{Convention, TraitSet};

    fn scan() -> crate::plan::PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Scan {
                table: TableRef::new("s", "t"),
                columns: vec!["a".into(), "b".into()],
            }),
            TraitSet::new(Convention::NONE),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_explain_plain_group_by() {
        let agg = Aggregate::new(
            ColumnSet::of(&[0, 1]),
            None,
            vec![AggregateCall::count_star()],
        )
        .unwrap();
        let root = PlanNode::new(
            Operator::Logical(LogicalOp::Aggregate(agg)),
            TraitSet::new(Convention::LOGICAL),
            vec![scan()],
        )
        .unwrap();
        assert_eq!(root.digest(), "LogicalAggregate(group={0, 1}, aggs=[COUNT()]) [LOGICAL]");
    }

    #[test]
    fn test_explain_orders_inputs_left_to_right() {
        let join = PlanNode::new(
            Operator::Logical(LogicalOp::Join {
                join_type: crate::expr::JoinType::Inner,
                condition: crate::expr::Expr::eq_columns(0, 2),
            }),
            TraitSet::new(Convention::NONE),
            vec![scan(), scan()],
        )
        .unwrap();
        let limit = PlanNode::new(
            Operator::Logical(LogicalOp::Limit { offset: 0, count: 5 }),
            TraitSet::new(Convention::NONE),
            vec![join],
        )
        .unwrap();
        let text = explain(&limit);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("LogicalLimit("));
        assert!(lines[1].starts_with("  LogicalJoin("));
        assert!(lines[2].starts_with("    LogicalScan("));
        assert!(lines[3].starts_with("    LogicalScan("));
    }

    #[test]
    fn test_explain_nested() {
        let scan = scan();
        let agg = Aggregate::new(
            ColumnSet::of(&[0, 1]),
            Some(vec![ColumnSet::of(&[0, 1]), ColumnSet::of(&[0])]),
            vec![AggregateCall::count_star()],
        )
        .unwrap()
        .with_hints(vec![PlanHint::new("agg_strategy", vec!["hash".into()])]);
        let root = PlanNode::new(
            Operator::Logical(LogicalOp::Aggregate(agg)),
            TraitSet::new(Convention::NONE),
            vec![scan],
        )
        .unwrap();

        assert_eq!(
            explain(&root),
            "LogicalAggregate(group={0, 1}, groups=[{0, 1}, {0}], aggs=[COUNT()], hints=[agg_strategy(hash)]) [NONE]\n\
             \x20 LogicalScan(table=s.t, columns=[a, b]) [NONE]\n"
        );
    }
}
