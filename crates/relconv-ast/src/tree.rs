//! Statement nodes.
//!
//! Nodes are plain immutable values: fields are private, set once by the constructor
//! and exposed through accessors. `PartialEq`/`Hash` are derived, so two nodes built
//! from equal fields are equal and hash identically.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dotted name such as `schema.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualifiedName {
    parts: Vec<String>,
}

impl QualifiedName {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// Split a dotted string into its parts.
    pub fn parse(name: &str) -> Self {
        Self::new(name.split('.').map(str::to_string).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The last part (the object name without its qualifiers).
    pub fn suffix(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Every part but the last, if there are any.
    pub fn prefix(&self) -> Option<QualifiedName> {
        match self.parts.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(Self::new(rest.to_vec())),
            _ => None,
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

/// Reference to a table in a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Table {
    name: QualifiedName,
}

impl Table {
    pub fn new(name: QualifiedName) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }
}

/// `ALTER TABLE <table> RENAME TO <new_name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlterTableRename {
    table: Table,
    new_name: QualifiedName,
}

impl AlterTableRename {
    pub fn new(table: Table, new_name: QualifiedName) -> Self {
        Self { table, new_name }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn new_name(&self) -> &QualifiedName {
        &self.new_name
    }
}

/// `DROP TABLE [IF EXISTS] <table>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropTable {
    table: Table,
    if_exists: bool,
}

impl DropTable {
    pub fn new(table: Table, if_exists: bool) -> Self {
        Self { table, if_exists }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn if_exists(&self) -> bool {
        self.if_exists
    }
}

/// `DESCRIBE <table>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescribeTable {
    table: Table,
}

impl DescribeTable {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

/// `SHOW TABLES [FROM <schema>]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowTables {
    schema: Option<QualifiedName>,
}

impl ShowTables {
    pub fn new(schema: Option<QualifiedName>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> Option<&QualifiedName> {
        self.schema.as_ref()
    }
}

/// Every statement kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    AlterTableRename(AlterTableRename),
    DropTable(DropTable),
    DescribeTable(DescribeTable),
    ShowTables(ShowTables),
}

impl From<AlterTableRename> for Statement {
    fn from(stmt: AlterTableRename) -> Self {
        Statement::AlterTableRename(stmt)
    }
}

impl From<DropTable> for Statement {
    fn from(stmt: DropTable) -> Self {
        Statement::DropTable(stmt)
    }
}

impl From<DescribeTable> for Statement {
    fn from(stmt: DescribeTable) -> Self {
        Statement::DescribeTable(stmt)
    }
}

impl From<ShowTables> for Statement {
    fn from(stmt: ShowTables) -> Self {
        Statement::ShowTables(stmt)
    }
}
