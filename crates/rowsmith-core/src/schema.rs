use serde::{Deserialize, Serialize};

use crate::constraints::{ForeignKey, PrimaryKey};
use crate::types::{ColumnType, GeneratedExpression, IdentityGeneration, TypeFamily};

/// Structure of a single table as reported by the schema source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns,
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns the generator is allowed to fill, in ordinal order.
    pub fn writable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| !column.is_computed())
    }

    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    pub fn primary_key_columns(&self) -> &[String] {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }
}

/// Column metadata for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub ordinal_position: i16,
    pub name: String,
    pub column_type: ColumnType,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub identity: Option<IdentityGeneration>,
    pub generated: Option<GeneratedExpression>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            ordinal_position: 0,
            name: name.into(),
            column_type,
            is_nullable: true,
            default: None,
            identity: None,
            generated: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether the database assigns this column's value itself.
    ///
    /// Stored generated columns, identity columns (both `ALWAYS` and
    /// `BY DEFAULT`) and sequence-backed defaults are never written.
    pub fn is_computed(&self) -> bool {
        if self.generated.is_some() || self.identity.is_some() {
            return true;
        }
        match &self.default {
            Some(default) => {
                default.contains("nextval(") || default.to_ascii_uppercase().contains("GENERATED")
            }
            None => false,
        }
    }

    pub fn type_family(&self) -> TypeFamily {
        self.column_type.family()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.column_type
            .character_max_length
            .and_then(|len| usize::try_from(len).ok())
            .filter(|len| *len > 0)
    }

    /// Label used in structure listings.
    pub fn generation_label(&self) -> &'static str {
        match (&self.generated, &self.identity) {
            (Some(_), _) => "ALWAYS",
            (None, Some(_)) => "IDENTITY",
            (None, None) if self.is_computed() => "AUTO_INC",
            _ => "NO",
        }
    }
}
