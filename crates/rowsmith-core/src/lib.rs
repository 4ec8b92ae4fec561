//! Core contracts for rowsmith.
//!
//! Schema facts discovered from the target database, type classification,
//! and the dependency ordering shared by the generator and its adapters.

pub mod constraints;
pub mod error;
pub mod graph;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{ForeignKey, PrimaryKey};
pub use error::{Error, Result};
pub use graph::{DependencyNode, TierAssignment, TierPlan, assign_tiers};
pub use schema::{Column, TableSchema};
pub use types::{ColumnType, GeneratedExpression, IdentityGeneration, TypeFamily};
pub use validation::validate_table_schema;
