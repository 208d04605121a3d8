//! Statements as seen by a front end: built, shipped as JSON, dispatched and printed.

use relconv_ast::*;
use std::collections::HashSet;

fn rename(table: &str, new_name: &str) -> Statement {
    AlterTableRename::new(
        Table::new(QualifiedName::parse(table)),
        QualifiedName::parse(new_name),
    )
    .into()
}

#[test]
fn test_statement_json_shape() {
    let statement = rename("sales.orders", "sales.orders_2024");
    let json = serde_json::to_value(&statement).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "AlterTableRename": {
                "table": { "name": ["sales", "orders"] },
                "new_name": ["sales", "orders_2024"]
            }
        })
    );
    let parsed: Statement = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, statement);
    assert_eq!(parsed.to_string(), "ALTER TABLE sales.orders RENAME TO sales.orders_2024");
}

#[test]
fn test_equal_statements_deduplicate_in_sets() {
    let batch = vec![
        rename("T", "T2"),
        rename("T", "T2"),
        DropTable::new(Table::new(QualifiedName::parse("T")), false).into(),
        DropTable::new(Table::new(QualifiedName::parse("T")), true).into(),
    ];
    let distinct: HashSet<Statement> = batch.into_iter().collect();
    assert_eq!(distinct.len(), 3);
}
