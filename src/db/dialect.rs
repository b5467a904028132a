//! Per-engine SQL text helpers.
//!
//! Everything that differs textually between SQLite, PostgreSQL and MySQL
//! lives here: identifier quoting, placeholder syntax, DDL type names,
//! literal rendering and paging clauses. Values are always bound, so the
//! literal renderer is only used for `DEFAULT` clauses and SQL dumps.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use serde_json::Value as JsonValue;

/// Upper bound accepted for new identifiers (MySQL's limit is the tightest).
const MAX_IDENTIFIER_LEN: usize = 64;

/// `LIMIT` clause meaning "no limit" for engines that require one before `OFFSET`.
const SQLITE_NO_LIMIT: &str = "LIMIT -1";
const MYSQL_NO_LIMIT: &str = "LIMIT 18446744073709551615";

// =============================================================================
// DDL Type Classification
// =============================================================================

/// Abstract column kind used by every DDL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlType {
    Integer,
    String,
    Decimal,
    Boolean,
    Date,
    Timestamp,
    Json,
}

impl DdlType {
    /// Map a user-supplied type string onto a kind.
    ///
    /// First match wins, so `datetime` is a date and `point` is an integer.
    pub fn classify(type_name: &str) -> Self {
        let lower = type_name.to_lowercase();

        if lower.contains("int") {
            return Self::Integer;
        }
        if lower.contains("varchar") || lower.contains("text") || lower.contains("string") {
            return Self::String;
        }
        if lower.contains("decimal")
            || lower.contains("numeric")
            || lower.contains("float")
            || lower.contains("double")
        {
            return Self::Decimal;
        }
        if lower.contains("bool") {
            return Self::Boolean;
        }
        if lower.contains("date") {
            return Self::Date;
        }
        if lower.contains("time") {
            return Self::Timestamp;
        }
        if lower.contains("json") {
            return Self::Json;
        }
        Self::String
    }
}

// =============================================================================
// Dialect
// =============================================================================

/// SQL text rules for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    db_type: DatabaseType,
}

impl Dialect {
    pub fn new(db_type: DatabaseType) -> Self {
        Self { db_type }
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote_ident(&self, name: &str) -> String {
        match self.db_type {
            DatabaseType::MySQL => format!("`{}`", name.replace('`', "``")),
            DatabaseType::PostgreSQL | DatabaseType::SQLite => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
        }
    }

    /// Placeholder for the `n`-th bound value (1-based).
    pub fn placeholder(&self, n: usize) -> String {
        match self.db_type {
            DatabaseType::PostgreSQL => format!("${}", n),
            DatabaseType::MySQL | DatabaseType::SQLite => "?".to_string(),
        }
    }

    /// Placeholder cast to the target column type where the engine needs it.
    ///
    /// PostgreSQL infers parameter types from the bound Rust value, so a text
    /// value aimed at an `integer` column has to be cast explicitly. Type
    /// modifiers are dropped from the cast: an explicit cast to `varchar(255)`
    /// truncates silently, while the assignment afterwards reports overflow.
    pub fn typed_placeholder(&self, n: usize, column_type: Option<&str>) -> String {
        match (self.db_type, column_type.map(strip_type_modifiers)) {
            (DatabaseType::PostgreSQL, Some(ty)) if !ty.is_empty() => {
                format!("CAST(${} AS {})", n, ty)
            }
            _ => self.placeholder(n),
        }
    }

    /// Engine type name for an abstract column kind.
    pub fn column_type(&self, kind: DdlType) -> &'static str {
        match (kind, self.db_type) {
            (DdlType::Integer, _) => "integer",
            (DdlType::String, _) => "varchar(255)",
            (DdlType::Decimal, _) => "decimal(8, 2)",
            (DdlType::Boolean, DatabaseType::MySQL) => "tinyint(1)",
            (DdlType::Boolean, _) => "boolean",
            (DdlType::Date, _) => "date",
            (DdlType::Timestamp, DatabaseType::PostgreSQL) => "timestamptz",
            (DdlType::Timestamp, _) => "datetime",
            (DdlType::Json, DatabaseType::SQLite) => "text",
            (DdlType::Json, _) => "json",
        }
    }

    /// Classify and render a user-supplied type string.
    pub fn render_type(&self, type_name: &str) -> &'static str {
        self.column_type(DdlType::classify(type_name))
    }

    /// Auto-increment clause appended after `PRIMARY KEY`.
    pub fn auto_increment_clause(&self) -> &'static str {
        match self.db_type {
            DatabaseType::SQLite => "AUTOINCREMENT",
            DatabaseType::PostgreSQL => "GENERATED BY DEFAULT AS IDENTITY",
            DatabaseType::MySQL => "AUTO_INCREMENT",
        }
    }

    /// `LIMIT`/`OFFSET` suffix. Empty when neither is given; a limit of 0
    /// means no limit.
    pub fn paging_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit.filter(|l| *l > 0), offset) {
            (None, None) => String::new(),
            (Some(limit), None) => format!(" LIMIT {}", limit),
            (Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (None, Some(offset)) => match self.db_type {
                DatabaseType::SQLite => format!(" {} OFFSET {}", SQLITE_NO_LIMIT, offset),
                DatabaseType::MySQL => format!(" {} OFFSET {}", MYSQL_NO_LIMIT, offset),
                DatabaseType::PostgreSQL => format!(" OFFSET {}", offset),
            },
        }
    }

    /// `INSERT` statement for an empty column list.
    pub fn insert_defaults(&self, quoted_table: &str) -> String {
        match self.db_type {
            DatabaseType::MySQL => format!("INSERT INTO {} () VALUES ()", quoted_table),
            DatabaseType::PostgreSQL | DatabaseType::SQLite => {
                format!("INSERT INTO {} DEFAULT VALUES", quoted_table)
            }
        }
    }

    /// Hex literal for raw bytes: `X'00ff'`, or `'\x00ff'::bytea` on PostgreSQL.
    pub fn binary_literal(&self, bytes: &[u8]) -> String {
        match self.db_type {
            DatabaseType::PostgreSQL => format!("'\\x{}'::bytea", hex::encode(bytes)),
            DatabaseType::MySQL | DatabaseType::SQLite => format!("X'{}'", hex::encode(bytes)),
        }
    }

    /// Whether `INSERT ... RETURNING *` is available.
    pub fn supports_returning(&self) -> bool {
        !matches!(self.db_type, DatabaseType::MySQL)
    }
}

// =============================================================================
// Identifiers and Literals
// =============================================================================

/// Check that a new identifier matches `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn validate_identifier(name: &str, what: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest {
        return Err(DbError::invalid_input(format!(
            "Invalid {} '{}': use letters, digits and underscores, not starting with a digit",
            what, name
        )));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(DbError::invalid_input(format!(
            "Invalid {} '{}': longer than {} characters",
            what, name, MAX_IDENTIFIER_LEN
        )));
    }
    Ok(())
}

/// Render a JSON value as an SQL literal.
pub fn sql_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(true) => "TRUE".to_string(),
        JsonValue::Bool(false) => "FALSE".to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => quote_string(s),
        JsonValue::Array(_) | JsonValue::Object(_) => quote_string(&value.to_string()),
    }
}

/// `character varying(255)` -> `character varying`,
/// `timestamp(3) with time zone` -> `timestamp with time zone`.
fn strip_type_modifiers(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len());
    let mut depth = 0usize;
    for c in type_name.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-quote a string literal, doubling embedded quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
