//! # relconv-ast: Statement Syntax Tree
//!
//! Immutable nodes for the DDL and catalog statements the planner front end accepts,
//! plus visitor dispatch over them.
//!
//! - **`tree`**: qualified names, table references and one struct per statement kind,
//!   gathered in the closed [`Statement`] enum. All nodes compare and hash structurally.
//! - **`visitor`**: the [`AstVisitor`] trait. Every statement kind has a method without
//!   a default body, so adding a kind breaks every visitor until it handles it.
//! - **`format`**: [`SqlFormatter`], the visitor that renders canonical SQL text.

pub mod format;
pub mod tree;
pub mod visitor;

pub use format::SqlFormatter;
pub use tree::{
    AlterTableRename, DescribeTable, DropTable, QualifiedName, ShowTables, Statement, Table,
};
pub use visitor::AstVisitor;
