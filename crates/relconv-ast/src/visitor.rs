//! Visitor dispatch over statements.
//!
//! Each node's `accept` calls the visitor method for its own kind; `Statement::accept`
//! matches exhaustively on the enum. The context type `C` is threaded through every
//! call, so a visitor can carry per-traversal state without owning it.

use crate::tree::{AlterTableRename, DescribeTable, DropTable, ShowTables, Statement};

/// Statement visitor
pub trait AstVisitor<C> {
    type Output;

    fn visit_alter_table_rename(
        &mut self,
        node: &AlterTableRename,
        context: &mut C,
    ) -> Self::Output;

    fn visit_drop_table(&mut self, node: &DropTable, context: &mut C) -> Self::Output;

    fn visit_describe_table(&mut self, node: &DescribeTable, context: &mut C) -> Self::Output;

    fn visit_show_tables(&mut self, node: &ShowTables, context: &mut C) -> Self::Output;
}

impl AlterTableRename {
    pub fn accept<V: AstVisitor<C>, C>(&self, visitor: &mut V, context: &mut C) -> V::Output {
        visitor.visit_alter_table_rename(self, context)
    }
}

impl DropTable {
    pub fn accept<V: AstVisitor<C>, C>(&self, visitor: &mut V, context: &mut C) -> V::Output {
        visitor.visit_drop_table(self, context)
    }
}

impl DescribeTable {
    pub fn accept<V: AstVisitor<C>, C>(&self, visitor: &mut V, context: &mut C) -> V::Output {
        visitor.visit_describe_table(self, context)
    }
}

impl ShowTables {
    pub fn accept<V: AstVisitor<C>, C>(&self, visitor: &mut V, context: &mut C) -> V::Output {
        visitor.visit_show_tables(self, context)
    }
}

impl Statement {
    pub fn accept<V: AstVisitor<C>, C>(&self, visitor: &mut V, context: &mut C) -> V::Output {
        match self {
            Statement::AlterTableRename(node) => node.accept(visitor, context),
            Statement::DropTable(node) => node.accept(visitor, context),
            Statement::DescribeTable(node) => node.accept(visitor, context),
            Statement::ShowTables(node) => node.accept(visitor, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{QualifiedName, Table};

    /// Collects the tables a batch of statements touches, counting visits in the context.
    struct TableCollector {
        tables: Vec<QualifiedName>,
    }

    impl AstVisitor<usize> for TableCollector {
        type Output = bool;

        fn visit_alter_table_rename(
            &mut self,
            node: &AlterTableRename,
            visits: &mut usize,
        ) -> bool {
            *visits += 1;
            self.tables.push(node.table().name().clone());
            true
        }

        fn visit_drop_table(&mut self, node: &DropTable, visits: &mut usize) -> bool {
            *visits += 1;
            self.tables.push(node.table().name().clone());
            true
        }

        fn visit_describe_table(&mut self, node: &DescribeTable, visits: &mut usize) -> bool {
            *visits += 1;
            self.tables.push(node.table().name().clone());
            true
        }

        fn visit_show_tables(&mut self, _node: &ShowTables, visits: &mut usize) -> bool {
            *visits += 1;
            false
        }
    }

    fn table(name: &str) -> Table {
        Table::new(QualifiedName::parse(name))
    }

    #[test]
    fn test_dispatch_reaches_each_kind() {
        let statements: Vec<Statement> = vec![
            AlterTableRename::new(table("s.a"), QualifiedName::parse("s.b")).into(),
            DropTable::new(table("s.c"), true).into(),
            DescribeTable::new(table("s.d")).into(),
            ShowTables::new(None).into(),
        ];
        let mut collector = TableCollector { tables: vec![] };
        let mut visits = 0;
        let touched: Vec<bool> = statements
            .iter()
            .map(|stmt| stmt.accept(&mut collector, &mut visits))
            .collect();

        assert_eq!(visits, 4);
        assert_eq!(touched, vec![true, true, true, false]);
        assert_eq!(
            collector.tables,
            vec![
                QualifiedName::parse("s.a"),
                QualifiedName::parse("s.c"),
                QualifiedName::parse("s.d"),
            ]
        );
    }
}
