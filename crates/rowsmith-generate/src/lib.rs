//! Row synthesis and dependency-ordered generation for rowsmith.
//!
//! The engine reads table structure through [`SchemaSource`], produces rows
//! from typed column rules or column heuristics, and hands them to a
//! [`RowStore`]. Parent tables are persisted before their children so that
//! foreign-key columns can be bound to values that actually exist.

pub mod adapter;
pub mod engine;
pub mod errors;
pub mod foreign;
pub mod model;
pub mod nulls;
pub mod output;
pub mod planner;
pub mod synth;
pub mod unique;
pub mod value;

pub use adapter::{RowStore, SchemaSource, StaticSchemaSource};
pub use engine::{
    GenerateOptions, GenerationEngine, TableRows, TableStats, generate_table, hash_seed,
};
pub use errors::GenerationError;
pub use foreign::{Binding, ForeignKeyBinder, ValuePool};
pub use model::{GenerationIssue, GenerationReport, IssueLevel, TableReport, TableStatus};
pub use output::CsvStore;
pub use planner::{GenerationTask, TablePlan, plan_tables};
pub use synth::{RuleSampler, synthesize};
pub use unique::{FallbackStrategy, UniquenessResolver};
pub use value::{GeneratedRow, GeneratedValue};
