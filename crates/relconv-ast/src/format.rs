//! Canonical SQL rendering.

use crate::tree::{AlterTableRename, DescribeTable, DropTable, ShowTables, Statement};
use crate::visitor::AstVisitor;
use std::fmt;

/// Renders statements as canonical, upper-case SQL.
pub struct SqlFormatter;

impl SqlFormatter {
    pub fn format(statement: &Statement) -> String {
        statement.accept(&mut SqlFormatter, &mut ())
    }
}

impl AstVisitor<()> for SqlFormatter {
    type Output = String;

    fn visit_alter_table_rename(&mut self, node: &AlterTableRename, _: &mut ()) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            node.table().name(),
            node.new_name()
        )
    }

    fn visit_drop_table(&mut self, node: &DropTable, _: &mut ()) -> String {
        if node.if_exists() {
            format!("DROP TABLE IF EXISTS {}", node.table().name())
        } else {
            format!("DROP TABLE {}", node.table().name())
        }
    }

    fn visit_describe_table(&mut self, node: &DescribeTable, _: &mut ()) -> String {
        format!("DESCRIBE {}", node.table().name())
    }

    fn visit_show_tables(&mut self, node: &ShowTables, _: &mut ()) -> String {
        match node.schema() {
            Some(schema) => format!("SHOW TABLES FROM {schema}"),
            None => "SHOW TABLES".to_string(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&SqlFormatter::format(self))
    }
}
