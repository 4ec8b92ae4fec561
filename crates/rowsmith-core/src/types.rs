use serde::{Deserialize, Serialize};

/// Formatted and raw Postgres type metadata for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// User-friendly formatted type (e.g. `character varying(255)`).
    pub data_type: String,
    /// Name of the underlying type (e.g. `varchar`, `int4`).
    pub udt_name: String,
    pub character_max_length: Option<i32>,
}

impl ColumnType {
    pub fn new(data_type: impl Into<String>, udt_name: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            udt_name: udt_name.into(),
            character_max_length: None,
        }
    }

    pub fn with_max_length(mut self, max_length: i32) -> Self {
        self.character_max_length = Some(max_length);
        self
    }

    /// Classify the type into the family used to pick a value shape.
    pub fn family(&self) -> TypeFamily {
        match TypeFamily::from_type_name(&self.data_type) {
            TypeFamily::Other => TypeFamily::from_type_name(&self.udt_name),
            family => family,
        }
    }
}

/// Coarse classification of Postgres types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    Timestamp,
    Time,
    Character,
    Uuid,
    Other,
}

impl TypeFamily {
    /// Classify a formatted or raw type name. Type modifiers such as `(10,2)`
    /// are ignored; arrays classify as `Other`.
    pub fn from_type_name(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase();
        if normalized.ends_with("[]") || normalized.starts_with('_') {
            return TypeFamily::Other;
        }
        let base = match normalized.find('(') {
            Some(idx) => {
                let mut base = normalized[..idx].trim_end().to_string();
                // `timestamp(3) without time zone` keeps its suffix after the modifier.
                if let Some(close) = normalized[idx..].find(')') {
                    base.push_str(&normalized[idx + close + 1..]);
                }
                base
            }
            None => normalized,
        };

        if base.starts_with("timestamp") {
            return TypeFamily::Timestamp;
        }
        if base.starts_with("time") {
            return TypeFamily::Time;
        }

        match base.as_str() {
            "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8"
            | "smallserial" | "serial" | "bigserial" | "serial2" | "serial4" | "serial8" => {
                TypeFamily::Integer
            }
            "numeric" | "decimal" | "money" => TypeFamily::Decimal,
            "real" | "double precision" | "float4" | "float8" | "float" => TypeFamily::Float,
            "boolean" | "bool" => TypeFamily::Boolean,
            "date" => TypeFamily::Date,
            "character varying" | "varchar" | "character" | "char" | "bpchar" | "text"
            | "citext" | "name" => TypeFamily::Character,
            "uuid" => TypeFamily::Uuid,
            _ => TypeFamily::Other,
        }
    }
}

/// Identity generation strategy for columns using `GENERATED ... AS IDENTITY`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityGeneration {
    Always,
    ByDefault,
}

impl IdentityGeneration {
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value {
            "a" | "ALWAYS" => Some(IdentityGeneration::Always),
            "d" | "BY DEFAULT" => Some(IdentityGeneration::ByDefault),
            _ => None,
        }
    }
}

/// Stored generated column expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedExpression {
    pub expression: Option<String>,
}
