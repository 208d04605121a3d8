//! # Operand Patterns for Converter Rules
//!
//! Each converter rule declares an [`Operand`] describing the nodes it can convert.
//! The planner checks the operand before calling `convert`, so rules never see nodes
//! they were not written for.
//!
//! ## Pattern Language
//!
//! An operand has three parts:
//!
//! - **Matcher**: an exact operator kind, or any logical / any physical / any operator.
//! - **Convention**: optionally, the convention the node must carry.
//! - **Children**: `AnyInputs` (the common case: inputs are unconstrained and get
//!   converted by recursive application), `Leaf` (no inputs), or `Exact` child operands
//!   matched position by position.
//!
//! The root operand of a registered rule must name an exact kind, because the registry
//! is keyed by it.
//!
//! ## Convenience Constructors
//!
//! Common operands have named constructors (`Operand::aggregate()`, `Operand::join()`,
//! ...) that match a logical operator with any inputs.

use crate::plan::{LogicalOpKind, OpKind, PlanNode};
use crate::traits::Convention;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpMatcher {
    Kind(OpKind),
    AnyLogical,
    AnyPhysical,
    Any,
}

impl OpMatcher {
    pub fn matches(&self, kind: OpKind) -> bool {
        match self {
            OpMatcher::Kind(k) => *k == kind,
            OpMatcher::AnyLogical => matches!(kind, OpKind::Logical(_)),
            OpMatcher::AnyPhysical => matches!(kind, OpKind::Physical(_)),
            OpMatcher::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    AnyInputs,
    Leaf,
    Exact(Vec<Operand>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub matcher: OpMatcher,
    pub convention: Option<Convention>,
    pub children: Children,
}

impl Operand {
    /// Match nodes of the given kind with any inputs.
    pub fn of(kind: impl Into<OpKind>) -> Self {
        Self {
            matcher: OpMatcher::Kind(kind.into()),
            convention: None,
            children: Children::AnyInputs,
        }
    }

    /// Match any node.
    pub fn any() -> Self {
        Self {
            matcher: OpMatcher::Any,
            convention: None,
            children: Children::AnyInputs,
        }
    }

    pub fn any_logical() -> Self {
        Self {
            matcher: OpMatcher::AnyLogical,
            ..Self::any()
        }
    }

    pub fn any_physical() -> Self {
        Self {
            matcher: OpMatcher::AnyPhysical,
            ..Self::any()
        }
    }

    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = Some(convention);
        self
    }

    pub fn any_inputs(mut self) -> Self {
        self.children = Children::AnyInputs;
        self
    }

    pub fn leaf(mut self) -> Self {
        self.children = Children::Leaf;
        self
    }

    pub fn inputs(mut self, children: Vec<Operand>) -> Self {
        self.children = Children::Exact(children);
        self
    }

    pub fn scan() -> Self {
        Self::of(LogicalOpKind::Scan).leaf()
    }

    pub fn filter() -> Self {
        Self::of(LogicalOpKind::Filter)
    }

    pub fn project() -> Self {
        Self::of(LogicalOpKind::Project)
    }

    pub fn join() -> Self {
        Self::of(LogicalOpKind::Join)
    }

    pub fn aggregate() -> Self {
        Self::of(LogicalOpKind::Aggregate)
    }

    pub fn sort() -> Self {
        Self::of(LogicalOpKind::Sort)
    }

    pub fn limit() -> Self {
        Self::of(LogicalOpKind::Limit)
    }

    /// The exact kind this operand's root matches, if it names one.
    pub fn root_kind(&self) -> Option<OpKind> {
        match self.matcher {
            OpMatcher::Kind(kind) => Some(kind),
            _ => None,
        }
    }

    /// Check whether a node (and, per `children`, its inputs) satisfies this operand.
    pub fn matches(&self, node: &PlanNode) -> bool {
        if !self.matcher.matches(node.kind()) {
            return false;
        }
        if let Some(convention) = &self.convention {
            if !node.traits().contains_convention(convention) {
                return false;
            }
        }
        match &self.children {
            Children::AnyInputs => true,
            Children::Leaf => node.inputs().is_empty(),
            Children::Exact(operands) => {
                operands.len() == node.inputs().len()
                    && operands
                        .iter()
                        .zip(node.inputs())
                        .all(|(operand, input)| operand.matches(input))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Expr, JoinType, TableRef};
    use crate::plan::{LogicalOp, Operator, PlanRef};
    use crate::traits::TraitSet;

    fn scan(convention: Convention) -> PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Scan {
                table: TableRef::new("s", "t"),
                columns: vec!["a".into()],
            }),
            TraitSet::new(convention),
            vec![],
        )
        .unwrap()
    }

    fn join(left: PlanRef, right: PlanRef) -> PlanRef {
        PlanNode::new(
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: Expr::eq_columns(0, 1),
            }),
            TraitSet::new(Convention::NONE),
            vec![left, right],
        )
        .unwrap()
    }

    #[test]
    fn test_kind_and_convention() {
        let node = scan(Convention::NONE);
        assert!(Operand::scan().matches(&node));
        assert!(Operand::scan().with_convention(Convention::NONE).matches(&node));
        assert!(!Operand::scan().with_convention(Convention::LOGICAL).matches(&node));
        assert!(!Operand::filter().matches(&node));
        assert!(Operand::any_logical().matches(&node));
        assert!(!Operand::any_physical().matches(&node));
    }

    #[test]
    fn test_exact_children_constrain_input_traits() {
        let node = join(scan(Convention::LOGICAL), scan(Convention::NONE));
        let both_logical = Operand::join().inputs(vec![
            Operand::any().with_convention(Convention::LOGICAL),
            Operand::any().with_convention(Convention::LOGICAL),
        ]);
        let left_logical = Operand::join().inputs(vec![
            Operand::any().with_convention(Convention::LOGICAL),
            Operand::any(),
        ]);
        assert!(!both_logical.matches(&node));
        assert!(left_logical.matches(&node));
        assert!(!Operand::join().inputs(vec![Operand::any()]).matches(&node));
        assert!(!Operand::join().leaf().matches(&node));
    }

    #[test]
    fn test_root_kind() {
        assert_eq!(
            Operand::aggregate().root_kind(),
            Some(OpKind::Logical(LogicalOpKind::Aggregate))
        );
        assert_eq!(Operand::any_logical().root_kind(), None);
    }
}
