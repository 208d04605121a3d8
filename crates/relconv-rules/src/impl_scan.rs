//! # Scan Implementation Rule
//!
//! Maps a logical Scan to a physical SeqScan. A sequential scan reads every row of the
//! table; it is the only access path the physical layer knows, so the mapping is
//! one-to-one and keeps the table and column list as they are.

use relconv_core::pattern::Operand;
use relconv_core::plan::{LogicalOp, Operator, PhysicalOp, PlanRef};
use relconv_core::rule::ConverterRule;
use relconv_core::{Convention, Result};

/// Implement logical scan as a sequential (full) table scan.
pub struct ImplSeqScanRule;

impl ConverterRule for ImplSeqScanRule {
    fn name(&self) -> &str {
        "ImplSeqScan"
    }

    fn operand(&self) -> Operand {
        Operand::scan()
    }

    fn source_convention(&self) -> Convention {
        Convention::LOGICAL
    }

    fn target_convention(&self) -> Convention {
        Convention::PHYSICAL
    }

    fn convert(&self, node: &PlanRef) -> Result<Option<PlanRef>> {
        let Operator::Logical(LogicalOp::Scan { table, columns }) = node.op() else {
            return Ok(None);
        };
        crate::implement(
            node,
            PhysicalOp::SeqScan {
                table: table.clone(),
                columns: columns.clone(),
            },
        )
    }
}
