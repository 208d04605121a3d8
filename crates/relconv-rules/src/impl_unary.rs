//! # Filter, Project and Limit Implementation Rules
//!
//! Each of these logical operators has exactly one physical counterpart with the same
//! attributes, so the rules are plain mappings.

use relconv_core::pattern::Operand;
use relconv_core::plan::{LogicalOp, Operator, PhysicalOp, PlanRef};
use relconv_core::rule::ConverterRule;
use relconv_core::{Convention, Result};

pub struct ImplFilterRule;

impl ConverterRule for ImplFilterRule {
    fn name(&self) -> &str {
        "ImplFilter"
    }

    fn operand(&self) -> Operand {
        Operand::filter()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Filter { predicate }) = node.op() else {
            return Ok(None);
        };
        crate::implement(
            node,
            PhysicalOp::Filter {
                predicate: predicate.clone(),
            },
        )
    }
}

pub struct ImplProjectRule;

impl ConverterRule for ImplProjectRule {
    fn name(&self) -> &str {
        "ImplProject"
    }

    fn operand(&self) -> Operand {
        Operand::project()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Project { exprs, aliases }) = node.op() else {
            return Ok(None);
        };
        crate::implement(
            node,
            PhysicalOp::Project {
                exprs: exprs.clone(),
                aliases: aliases.clone(),
            },
        )
    }
}

pub struct ImplLimitRule;

impl ConverterRule for ImplLimitRule {
    fn name(&self) -> &str {
        "ImplLimit"
    }

    fn operand(&self) -> Operand {
        Operand::limit()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Limit { offset, count }) = node.op() else {
            return Ok(None);
        };
        crate::implement(
            node,
            PhysicalOp::Limit {
                offset: *offset,
                count: *count,
            },
        )
    }
}
