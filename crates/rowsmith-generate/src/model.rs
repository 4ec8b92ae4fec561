use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Final state of a table within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Completed,
    /// Not generated: configuration, schema or ordering problem.
    Skipped,
    /// Generated but persistence failed.
    Failed,
}

/// Summary of a processed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableReport {
    pub schema: String,
    pub table: String,
    pub tier: Option<usize>,
    pub status: TableStatus,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub rows_inserted: u64,
    pub null_cells: u64,
    pub fk_bound: u64,
    pub fk_unbound: u64,
    pub fk_orphans: u64,
    pub unique_fallbacks: u64,
    pub cell_failures: u64,
    pub skipped_columns: Vec<String>,
    /// New pool values captured per key column.
    pub captured_keys: BTreeMap<String, usize>,
    pub duration_ms: u64,
}

impl TableReport {
    pub fn new(schema: &str, table: &str, rows_requested: u64) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            tier: None,
            status: TableStatus::Skipped,
            rows_requested,
            rows_generated: 0,
            rows_inserted: 0,
            null_cells: 0,
            fk_bound: 0,
            fk_unbound: 0,
            fk_orphans: 0,
            unique_fallbacks: 0,
            cell_failures: 0,
            skipped_columns: Vec::new(),
            captured_keys: BTreeMap::new(),
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    Warning,
    Error,
}

/// Structured generation issue. `count` is the number of affected cells or rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: IssueLevel,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub count: u64,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            code: code.to_string(),
            message: message.into(),
            table: None,
            column: None,
            count: 1,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            ..Self::warning(code, message)
        }
    }

    pub fn for_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn for_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub tables: Vec<TableReport>,
    pub rows_inserted_total: u64,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub issues: Vec<GenerationIssue>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            tables: Vec::new(),
            rows_inserted_total: 0,
            warnings_by_code: BTreeMap::new(),
            issues: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_issue(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += issue.count;
        self.issues.push(issue);
    }

    pub fn record_table(&mut self, table: TableReport) {
        self.rows_inserted_total += table.rows_inserted;
        self.tables.push(table);
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|table| table.table == name)
    }

    pub fn count(&self, code: &str) -> u64 {
        self.warnings_by_code.get(code).copied().unwrap_or(0)
    }

    /// True when any table was skipped or failed.
    pub fn has_incomplete_tables(&self) -> bool {
        self.tables
            .iter()
            .any(|table| table.status != TableStatus::Completed)
    }
}
