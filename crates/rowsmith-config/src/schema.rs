use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::GenerationConfig;

/// Emit the JSON Schema for generation configuration files.
pub fn config_json_schema() -> RootSchema {
    schema_for!(GenerationConfig)
}
