//! Schema-related data models.
//!
//! This module defines the engine-neutral shapes returned by schema
//! introspection and accepted by schema mutation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    pub name: String,
    /// Snapshot taken while listing; not kept in sync with later writes.
    pub row_count: u64,
    pub column_count: usize,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, row_count: u64, column_count: usize) -> Self {
        Self {
            name: name.into(),
            row_count,
            column_count,
        }
    }
}

/// Target of a foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    /// Engine-native type string, e.g. "INTEGER", "character varying(255)", "int(11)"
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
    /// Raw default expression as reported by the engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub indexed: bool,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            primary_key: false,
            auto_increment: false,
            foreign_key: None,
            default_value: None,
            indexed: false,
        }
    }

    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.primary_key = is_pk;
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    /// Set the referenced table and column.
    pub fn with_foreign_key(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }
}

/// Index classification.
///
/// Approximate: SQLite has no catalog flag for foreign-key indexes, so
/// `Foreign` is inferred from the `fk_` naming convention there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    Primary,
    Unique,
    Index,
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    /// Ordered by position in the index
    pub columns: Vec<String>,
    #[serde(rename = "type")]
    pub index_type: IndexType,
}

impl IndexMetadata {
    pub fn new(name: impl Into<String>, columns: Vec<String>, index_type: IndexType) -> Self {
        Self {
            name: name.into(),
            columns,
            index_type,
        }
    }
}

/// Abstract column definition used by table creation and column addition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    /// Free-form type string; mapped through the DDL type classifier
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            auto_increment: false,
            default_value: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Requested change to an existing column. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChange {
    pub new_name: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    /// Accepted but not applied by any engine
    pub nullable: Option<bool>,
    /// `Some(Value::Null)` drops the default
    #[serde(default, deserialize_with = "deserialize_present")]
    pub default_value: Option<serde_json::Value>,
}

/// Distinguish `"defaultValue": null` (Some(Null)) from an absent field (None).
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl ColumnChange {
    pub fn is_empty(&self) -> bool {
        self.new_name.is_none()
            && self.data_type.is_none()
            && self.nullable.is_none()
            && self.default_value.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}
