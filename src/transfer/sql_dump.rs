//! Plain-text SQL dump of table definitions and contents.

use crate::db::dialect::{Dialect, sql_literal};
use crate::db::types::{TypeCategory, categorize_type};
use crate::models::{ColumnMetadata, DatabaseType, Row};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value as JsonValue;
use std::fmt::Write as _;

/// Append the dump section for one table to `out`.
///
/// Column types and defaults are copied verbatim from introspection, so the
/// script targets the engine it was taken from. Binary cells arrive as base64
/// text and are written back as hex literals.
pub fn write_table(
    out: &mut String,
    dialect: Dialect,
    table: &str,
    columns: &[ColumnMetadata],
    rows: &[Row],
) {
    let quoted = dialect.quote_ident(table);
    let primary: Vec<&ColumnMetadata> = columns.iter().filter(|c| c.primary_key).collect();
    let composite_key = primary.len() > 1;

    let _ = writeln!(out, "-- Table: {}", table);
    let _ = writeln!(out, "DROP TABLE IF EXISTS {};", quoted);
    let _ = writeln!(out, "CREATE TABLE {} (", quoted);
    let mut definitions: Vec<String> = columns
        .iter()
        .map(|c| column_definition(dialect, c, !composite_key))
        .collect();
    if composite_key {
        let names: Vec<String> = primary.iter().map(|c| dialect.quote_ident(&c.name)).collect();
        definitions.push(format!("  PRIMARY KEY ({})", names.join(", ")));
    }
    out.push_str(&definitions.join(",\n"));
    out.push_str("\n);\n\n");

    if rows.is_empty() {
        return;
    }
    for row in rows {
        let names: Vec<String> = row.keys().map(|k| dialect.quote_ident(k)).collect();
        let values: Vec<String> = row
            .iter()
            .map(|(name, value)| {
                let column = columns.iter().find(|c| &c.name == name);
                cell_literal(dialect, column, value)
            })
            .collect();
        let _ = writeln!(
            out,
            "INSERT INTO {} ({}) VALUES ({});",
            quoted,
            names.join(", "),
            values.join(", ")
        );
    }
    out.push('\n');
}

fn cell_literal(dialect: Dialect, column: Option<&ColumnMetadata>, value: &JsonValue) -> String {
    let is_binary = column
        .is_some_and(|c| categorize_type(&c.data_type, dialect.db_type()) == TypeCategory::Binary);
    if let (true, JsonValue::String(encoded)) = (is_binary, value) {
        if let Ok(bytes) = STANDARD.decode(encoded) {
            return dialect.binary_literal(&bytes);
        }
    }
    sql_literal(value)
}

fn column_definition(dialect: Dialect, column: &ColumnMetadata, inline_key: bool) -> String {
    let mut def = format!("  {} {}", dialect.quote_ident(&column.name), column.data_type);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if column.primary_key && inline_key {
        def.push_str(" PRIMARY KEY");
        if column.auto_increment && dialect.db_type() == DatabaseType::SQLite {
            def.push_str(" AUTOINCREMENT");
        }
    }
    if let Some(default) = &column.default_value {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    def
}
