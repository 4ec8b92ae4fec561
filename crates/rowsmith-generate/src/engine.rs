use std::any::Any;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::sync::Once;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use rowsmith_config::{
    GenerationConfig, GlobalSettings, RejectedTable, TableRule, validate_config,
    validate_rule_against_schema, validate_table_rule,
};
use rowsmith_core::{Column, ForeignKey, TableSchema, TypeFamily, validate_table_schema};

use crate::adapter::{RowStore, SchemaSource};
use crate::errors::GenerationError;
use crate::foreign::{
    Binding, ForeignKeyBinder, ValuePool, capture_key_values, find_orphans, key_columns,
};
use crate::model::{GenerationIssue, GenerationReport, TableReport, TableStatus};
use crate::nulls::NullInjector;
use crate::planner::{GenerationTask, plan_tables, referenced_columns};
use crate::synth::{HeuristicKind, HeuristicSampler, RuleSampler};
use crate::unique::{FallbackStrategy, UniquenessResolver};
use crate::value::{GeneratedRow, GeneratedValue};

/// Run-level switches that do not live in the configuration file.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Overrides `global_settings.seed`.
    pub seed: Option<u64>,
    /// Identifier recorded in the report. A fresh UUID when absent.
    pub run_id: Option<String>,
    /// Restrict the run to these tables. Empty means all configured tables.
    pub only_tables: Vec<String>,
    /// Table entries dropped while loading the configuration.
    pub rejected_tables: Vec<RejectedTable>,
}

/// Generates and persists every configured table in dependency order.
#[derive(Debug, Clone)]
pub struct GenerationEngine<'a> {
    config: &'a GenerationConfig,
    options: GenerateOptions,
}

impl<'a> GenerationEngine<'a> {
    pub fn new(config: &'a GenerationConfig, options: GenerateOptions) -> Self {
        Self { config, options }
    }

    /// Run generation against `source` and `store`.
    ///
    /// Only an invalid global configuration aborts the run. Table level
    /// problems end up in the report and the next table is processed.
    pub async fn run(
        &self,
        source: &dyn SchemaSource,
        store: &dyn RowStore,
    ) -> Result<GenerationReport, GenerationError> {
        let start = Instant::now();
        let settings = &self.config.global_settings;
        let schema_name = self.config.database.schema.as_str();

        let global_errors: Vec<String> = validate_config(self.config)
            .errors
            .into_iter()
            .filter(|issue| issue.path.starts_with("global_settings"))
            .map(|issue| issue.to_string())
            .collect();
        if !global_errors.is_empty() {
            return Err(GenerationError::Configuration(global_errors.join("; ")));
        }

        let run_id = self
            .options
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let seed = self
            .options
            .seed
            .or(settings.seed)
            .unwrap_or_else(rand::random);
        let mut report = GenerationReport::new(run_id.clone(), seed);

        for rejected in &self.options.rejected_tables {
            let name = rejected
                .table_name
                .clone()
                .unwrap_or_else(|| format!("tables[{}]", rejected.index));
            record_issue(
                &mut report,
                GenerationIssue::error("table_rejected", rejected.reason.clone()).for_table(&name),
            );
        }

        let rules = self.selected_rules(&mut report);
        info!(
            run_id = %run_id,
            tables = rules.len(),
            seed,
            "generation started"
        );

        let mut schemas: BTreeMap<String, TableSchema> = BTreeMap::new();
        for rule in &rules {
            let fetched = source
                .table_schema(schema_name, &rule.table_name)
                .await
                .and_then(|table| validate_table_schema(&table).map(|()| table));
            match fetched {
                Ok(table) => {
                    schemas.insert(rule.table_name.clone(), table);
                }
                Err(err) => {
                    record_issue(
                        &mut report,
                        GenerationIssue::error("schema_unavailable", err.to_string())
                            .for_table(&rule.table_name),
                    );
                    report.record_table(TableReport::new(
                        schema_name,
                        &rule.table_name,
                        rule.rows_to_generate,
                    ));
                }
            }
        }

        let plan = plan_tables(&rules, &schemas);
        debug!(
            tables = plan.tasks.len(),
            tiers = plan.tiers,
            unresolved = plan.unresolved.len(),
            "generation order planned"
        );
        for table in &plan.unresolved {
            record_issue(
                &mut report,
                GenerationIssue::error(
                    "dependency_cycle",
                    "table is part of a foreign-key cycle or depends on one",
                )
                .for_table(table),
            );
            let rows = rules
                .iter()
                .find(|rule| &rule.table_name == table)
                .map_or(0, |rule| rule.rows_to_generate);
            report.record_table(TableReport::new(schema_name, table, rows));
        }

        let referenced = referenced_columns(&schemas);
        let mut pool = ValuePool::new();
        for task in &plan.tasks {
            let (Some(rule), Some(schema)) = (
                rules.iter().find(|rule| rule.table_name == task.table),
                schemas.get(&task.table),
            ) else {
                continue;
            };
            let run = TableRun {
                task,
                rule,
                schema,
                settings,
                seed,
                referenced: referenced.get(&task.table),
            };
            let table_report = run.execute(store, &mut pool, &mut report).await;
            report.record_table(table_report);
        }

        debug!(pool = ?pool.sizes(), "captured key values");
        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            rows_inserted = report.rows_inserted_total,
            duration_ms = report.duration_ms,
            "generation completed"
        );
        Ok(report)
    }

    /// Configured rules after the table filter, first occurrence wins.
    fn selected_rules(&self, report: &mut GenerationReport) -> Vec<TableRule> {
        let mut seen = BTreeSet::new();
        let mut rules = Vec::new();
        for rule in &self.config.tables {
            if !self.options.only_tables.is_empty()
                && !self.options.only_tables.contains(&rule.table_name)
            {
                continue;
            }
            if !seen.insert(rule.table_name.as_str()) {
                record_issue(
                    report,
                    GenerationIssue::warning(
                        "duplicate_table",
                        "table is configured more than once; later entries are ignored",
                    )
                    .for_table(&rule.table_name),
                );
                continue;
            }
            rules.push(rule.clone());
        }
        rules
    }
}

/// Everything needed to generate, persist and capture a single table.
struct TableRun<'r> {
    task: &'r GenerationTask,
    rule: &'r TableRule,
    schema: &'r TableSchema,
    settings: &'r GlobalSettings,
    seed: u64,
    referenced: Option<&'r BTreeSet<String>>,
}

impl TableRun<'_> {
    async fn execute(
        &self,
        store: &dyn RowStore,
        pool: &mut ValuePool,
        report: &mut GenerationReport,
    ) -> TableReport {
        let table_start = Instant::now();
        let table_name = self.schema.name.as_str();
        let mut table_report =
            TableReport::new(&self.schema.schema, table_name, self.task.rows);
        table_report.tier = Some(self.task.tier);

        let rule_report = validate_table_rule(self.rule);
        if !rule_report.is_ok() {
            record_issue(
                report,
                GenerationIssue::error("table_skipped", rule_report.error_summary())
                    .for_table(table_name),
            );
            return table_report;
        }
        for issue in validate_rule_against_schema(self.rule, self.schema).warnings {
            let mut recorded =
                GenerationIssue::warning(&issue.code, issue.message).for_table(table_name);
            if let Some((_, column)) = issue.path.split_once("/column_rules/") {
                recorded = recorded.for_column(column);
            }
            record_issue(report, recorded);
        }

        if self.settings.enable_foreign_keys {
            self.prefetch_references(store, pool, report).await;
        }

        info!(
            schema = %self.schema.schema,
            table = %table_name,
            tier = self.task.tier,
            rows = self.task.rows,
            "generating table"
        );

        let columns: Vec<Column> = self.schema.writable_columns().cloned().collect();
        let mut rows_iter = match generate_table(
            self.rule,
            &self.schema.columns,
            &self.schema.foreign_keys,
            pool,
            self.settings,
            hash_seed(self.seed, table_name),
        ) {
            Ok(rows) => rows,
            Err(err) => {
                record_issue(
                    report,
                    GenerationIssue::error("table_skipped", err.to_string()).for_table(table_name),
                );
                return table_report;
            }
        };
        let rows: Vec<GeneratedRow> = rows_iter.by_ref().collect();
        let stats = rows_iter.into_stats();
        apply_stats(&stats, table_name, &mut table_report, report);

        if self.settings.enable_foreign_keys {
            for orphan in find_orphans(&rows, &self.schema.foreign_keys, pool) {
                table_report.fk_orphans += orphan.count;
                record_issue(
                    report,
                    GenerationIssue::warning(
                        "fk_orphan",
                        format!("values not found in {}", orphan.reference),
                    )
                    .for_table(table_name)
                    .for_column(&orphan.column)
                    .with_count(orphan.count),
                );
            }
        }

        match store
            .insert_rows(self.schema, &columns, &rows, self.settings.batch_size)
            .await
        {
            Ok(inserted) => table_report.rows_inserted = inserted,
            Err(err) => {
                table_report.status = TableStatus::Failed;
                table_report.duration_ms = table_start.elapsed().as_millis() as u64;
                record_issue(
                    report,
                    GenerationIssue::error("persistence_failed", err.to_string())
                        .for_table(table_name)
                        .with_count(rows.len() as u64),
                );
                return table_report;
            }
        }

        let empty = BTreeSet::new();
        let keys = key_columns(self.schema, self.referenced.unwrap_or(&empty));
        for column in &keys {
            match store
                .distinct_values(&self.schema.schema, table_name, column)
                .await
            {
                Ok(values) => {
                    let added = pool.extend(table_name, column, values);
                    table_report.captured_keys.insert(column.clone(), added);
                }
                Err(err) => {
                    record_issue(
                        report,
                        GenerationIssue::warning(
                            "capture_readback_failed",
                            format!("using generated values instead: {err}"),
                        )
                        .for_table(table_name)
                        .for_column(column),
                    );
                    let captured =
                        capture_key_values(pool, table_name, std::slice::from_ref(column), &rows);
                    table_report.captured_keys.extend(captured);
                }
            }
        }

        table_report.status = TableStatus::Completed;
        table_report.duration_ms = table_start.elapsed().as_millis() as u64;
        info!(
            schema = %self.schema.schema,
            table = %table_name,
            rows_generated = table_report.rows_generated,
            rows_inserted = table_report.rows_inserted,
            duration_ms = table_report.duration_ms,
            "table generated"
        );
        table_report
    }

    /// Seed pool entries that this table references but nothing captured yet,
    /// using rows already present in the store.
    async fn prefetch_references(
        &self,
        store: &dyn RowStore,
        pool: &mut ValuePool,
        report: &mut GenerationReport,
    ) {
        for fk in &self.schema.foreign_keys {
            if pool.has_values(&fk.pool_key()) {
                continue;
            }
            match store
                .distinct_values(&fk.referenced_schema, &fk.referenced_table, &fk.referenced_column)
                .await
            {
                Ok(values) => {
                    let added = pool.extend(&fk.referenced_table, &fk.referenced_column, values);
                    debug!(
                        table = %self.schema.name,
                        reference = %fk.pool_key(),
                        added,
                        "prefetched existing reference values"
                    );
                }
                Err(err) => record_issue(
                    report,
                    GenerationIssue::warning(
                        "fk_prefetch_failed",
                        format!("could not read {}: {err}", fk.pool_key()),
                    )
                    .for_table(&self.schema.name)
                    .for_column(&fk.column),
                ),
            }
        }
    }
}

fn apply_stats(
    stats: &TableStats,
    table: &str,
    table_report: &mut TableReport,
    report: &mut GenerationReport,
) {
    table_report.rows_generated = stats.rows_generated;
    table_report.null_cells = stats.null_cells;
    table_report.fk_bound = stats.fk_bound;
    table_report.skipped_columns = stats.skipped_columns.clone();

    for column in &stats.skipped_columns {
        record_issue(
            report,
            GenerationIssue::warning(
                "computed_column_skipped",
                "column is filled by the database",
            )
            .for_table(table)
            .for_column(column),
        );
    }
    for (column, unbound) in &stats.fk_unbound {
        table_report.fk_unbound += unbound.count;
        record_issue(
            report,
            GenerationIssue::warning(
                "fk_unbound",
                format!("no values available in {}", unbound.reference),
            )
            .for_table(table)
            .for_column(column)
            .with_count(unbound.count),
        );
    }
    for (column, count) in &stats.unique_fallbacks {
        table_report.unique_fallbacks += count;
        record_issue(
            report,
            GenerationIssue::warning(
                "unique_fallback",
                "retries exhausted; fallback value used",
            )
            .for_table(table)
            .for_column(column)
            .with_count(*count),
        );
    }
    for (column, failure) in &stats.cell_failures {
        table_report.cell_failures += failure.count;
        record_issue(
            report,
            GenerationIssue::warning("cell_synthesis_failed", failure.last_message.clone())
                .for_table(table)
                .for_column(column)
                .with_count(failure.count),
        );
    }
}

fn record_issue(report: &mut GenerationReport, issue: GenerationIssue) {
    log_issue(&issue);
    report.record_issue(issue);
}

fn log_issue(issue: &GenerationIssue) {
    warn!(
        code = %issue.code,
        table = issue.table.as_deref().unwrap_or(""),
        column = issue.column.as_deref().unwrap_or(""),
        count = issue.count,
        message = %issue.message
    );
}

/// Counters collected while a table's rows are produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableStats {
    pub rows_generated: u64,
    pub null_cells: u64,
    pub fk_bound: u64,
    pub fk_unbound: BTreeMap<String, UnboundReference>,
    pub unique_fallbacks: BTreeMap<String, u64>,
    pub cell_failures: BTreeMap<String, CellFailure>,
    /// Computed columns left to the database.
    pub skipped_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnboundReference {
    pub reference: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFailure {
    pub count: u64,
    pub last_message: String,
}

#[derive(Debug, Clone)]
enum ValueSource {
    Rule(RuleSampler),
    Heuristic(HeuristicSampler),
}

#[derive(Debug, Clone)]
struct ColumnPlan {
    column: Column,
    source: ValueSource,
    /// Declared limit applied to rule output on character columns.
    truncate_to: Option<usize>,
    unique: Option<(UniquenessResolver, FallbackStrategy)>,
}

impl ColumnPlan {
    fn draw<R: Rng + ?Sized>(
        source: &ValueSource,
        truncate_to: Option<usize>,
        rng: &mut R,
    ) -> GeneratedValue {
        let value = match source {
            ValueSource::Rule(sampler) => sampler.sample(rng),
            ValueSource::Heuristic(sampler) => sampler.sample(rng),
        };
        match truncate_to {
            Some(limit) => value.truncated(limit),
            None => value,
        }
    }
}

/// Lazily produced rows of one table.
///
/// Randomness comes from a generator seeded per table, so the same seed,
/// configuration and pool state yield the same rows.
#[derive(Debug)]
pub struct TableRows<'p> {
    table: String,
    plans: Vec<ColumnPlan>,
    binder: ForeignKeyBinder,
    nulls: NullInjector,
    pool: &'p ValuePool,
    rng: ChaCha8Rng,
    remaining: u64,
    stats: TableStats,
}

impl TableRows<'_> {
    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    pub fn into_stats(self) -> TableStats {
        self.stats
    }

    fn next_row(&mut self) -> GeneratedRow {
        let mut row = GeneratedRow::with_capacity(self.plans.len());
        for plan in &mut self.plans {
            let name = plan.column.name.as_str();

            if self.nulls.should_null(&plan.column, &mut self.rng) {
                self.stats.null_cells += 1;
                row.push(name, GeneratedValue::Null);
                continue;
            }

            match self.binder.bind(name, self.pool, &mut self.rng) {
                Binding::Bound(value) => {
                    self.stats.fk_bound += 1;
                    if let Some((resolver, _)) = plan.unique.as_mut() {
                        resolver.record(&value);
                    }
                    row.push(name, value);
                    continue;
                }
                Binding::Unbound { reference } => {
                    let entry = self.stats.fk_unbound.entry(name.to_string()).or_default();
                    entry.reference = reference;
                    entry.count += 1;
                }
                Binding::NotForeignKey => {}
            }

            let rng = &mut self.rng;
            let outcome = sample_cell(|| {
                let source = &plan.source;
                let truncate_to = plan.truncate_to;
                match plan.unique.as_mut() {
                    Some((resolver, strategy)) => {
                        let resolved = resolver.resolve(rng, strategy, |rng| {
                            ColumnPlan::draw(source, truncate_to, rng)
                        });
                        (resolved.value, resolved.fallback)
                    }
                    None => (ColumnPlan::draw(source, truncate_to, rng), false),
                }
            });

            let value = match outcome {
                Ok((value, fallback)) => {
                    if fallback {
                        *self
                            .stats
                            .unique_fallbacks
                            .entry(name.to_string())
                            .or_insert(0) += 1;
                    }
                    value
                }
                Err(panic) => {
                    let message = panic_message(panic);
                    debug!(table = %self.table, column = %name, error = %message, "cell synthesis failed");
                    let failure = self.stats.cell_failures.entry(name.to_string()).or_default();
                    failure.count += 1;
                    failure.last_message = message;
                    match plan.unique.as_mut() {
                        Some((resolver, _)) => unique_placeholder(resolver, &mut self.rng),
                        None => placeholder(&mut self.rng),
                    }
                }
            };
            row.push(name, value);
        }
        self.stats.rows_generated += 1;
        row
    }
}

impl Iterator for TableRows<'_> {
    type Item = GeneratedRow;

    fn next(&mut self) -> Option<GeneratedRow> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.next_row())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Prepare row generation for one table.
///
/// Computed columns are left out of the rows and listed in the stats.
/// Fails with [`GenerationError::Configuration`] when a rule is contradictory
/// or the null probability is out of range.
pub fn generate_table<'p>(
    rule: &TableRule,
    columns: &[Column],
    foreign_keys: &[ForeignKey],
    pool: &'p ValuePool,
    settings: &GlobalSettings,
    seed: u64,
) -> Result<TableRows<'p>, GenerationError> {
    let nulls = NullInjector::new(rule.effective_null_probability(settings))?;
    let mut stats = TableStats::default();
    let mut plans = Vec::with_capacity(columns.len());

    for column in columns {
        if column.is_computed() {
            stats.skipped_columns.push(column.name.clone());
            continue;
        }

        let source = match rule.column_rules.get(&column.name) {
            Some(column_rule) => ValueSource::Rule(RuleSampler::compile(column_rule).map_err(
                |err| GenerationError::Configuration(format!("column `{}`: {err}", column.name)),
            )?),
            None => ValueSource::Heuristic(HeuristicSampler::for_column(column)),
        };
        let truncate_to = match (&source, column.type_family()) {
            (ValueSource::Rule(_), TypeFamily::Character) => column.max_length(),
            _ => None,
        };

        let unique = rule.is_unique(&column.name).then(|| {
            let strategy = fallback_strategy(&source);
            let resolver =
                UniquenessResolver::new(settings.max_retry_unique, settings.fallback_scan_limit)
                    .with_max_length(truncate_to.or(match &source {
                        ValueSource::Heuristic(sampler) => sampler.max_length(),
                        ValueSource::Rule(_) => None,
                    }));
            (resolver, strategy)
        });

        plans.push(ColumnPlan {
            column: column.clone(),
            source,
            truncate_to,
            unique,
        });
    }

    Ok(TableRows {
        table: rule.table_name.clone(),
        plans,
        binder: ForeignKeyBinder::new(foreign_keys, settings.enable_foreign_keys),
        nulls,
        pool,
        rng: ChaCha8Rng::seed_from_u64(seed),
        remaining: rule.rows_to_generate,
        stats,
    })
}

fn fallback_strategy(source: &ValueSource) -> FallbackStrategy {
    match source {
        ValueSource::Rule(sampler) => match sampler.integer_floor() {
            Some(floor) => FallbackStrategy::Integer { floor },
            None => FallbackStrategy::Suffix {
                base: Some("fallback".to_string()),
            },
        },
        ValueSource::Heuristic(sampler) if sampler.kind() == HeuristicKind::Integer => {
            FallbackStrategy::Integer { floor: 1 }
        }
        ValueSource::Heuristic(_) => FallbackStrategy::Suffix { base: None },
    }
}

fn placeholder<R: Rng + ?Sized>(rng: &mut R) -> GeneratedValue {
    GeneratedValue::Text(format!("error_{}", rng.random_range(1..=1000)))
}

/// A placeholder not yet issued on this column. Once the thousand plain
/// placeholders are used up the set size is stamped in as well.
fn unique_placeholder<R: Rng + ?Sized>(
    resolver: &mut UniquenessResolver,
    rng: &mut R,
) -> GeneratedValue {
    for _ in 0..1000 {
        let candidate = placeholder(rng);
        if resolver.record(&candidate) {
            return candidate;
        }
    }
    loop {
        let candidate = GeneratedValue::Text(format!(
            "error_{}_{}",
            resolver.len() + 1,
            rng.random_range(1000..=9999)
        ));
        if !resolver.contains(&candidate) {
            resolver.record(&candidate);
            return candidate;
        }
    }
}

thread_local! {
    static SAMPLING: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Panics raised while sampling a cell are reported as issues, so the
/// process-wide hook skips them. Other panics reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !SAMPLING.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

fn sample_cell<T>(draw: impl FnOnce() -> T) -> std::thread::Result<T> {
    install_quiet_hook();
    SAMPLING.with(|flag| flag.set(true));
    let outcome = catch_unwind(AssertUnwindSafe(draw));
    SAMPLING.with(|flag| flag.set(false));
    outcome
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during value synthesis".to_string()
    }
}

/// FNV-1a over `key`, keyed by the run seed.
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsmith_config::{ColumnRule, IntRule, PatternRule};
    use rowsmith_core::ColumnType;

    fn int_column(name: &str) -> Column {
        Column::new(name, ColumnType::new("integer", "int4")).not_null()
    }

    #[test]
    fn same_seed_yields_same_rows() {
        let mut rule = TableRule::new("users");
        rule.rows_to_generate = 20;
        let columns = vec![
            int_column("age"),
            Column::new("name", ColumnType::new("character varying", "varchar")),
        ];
        let pool = ValuePool::new();
        let settings = GlobalSettings::default();
        let first: Vec<GeneratedRow> =
            generate_table(&rule, &columns, &[], &pool, &settings, 42).unwrap().collect();
        let second: Vec<GeneratedRow> =
            generate_table(&rule, &columns, &[], &pool, &settings, 42).unwrap().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
    }

    #[test]
    fn computed_columns_are_left_out() {
        let rule = TableRule::new("users");
        let columns = vec![
            int_column("id").with_default("nextval('users_id_seq'::regclass)"),
            int_column("age"),
        ];
        let pool = ValuePool::new();
        let mut rows =
            generate_table(&rule, &columns, &[], &pool, &GlobalSettings::default(), 1).unwrap();
        let row = rows.next().unwrap();
        assert!(row.get("id").is_none());
        assert!(row.get("age").is_some());
        assert_eq!(rows.stats().skipped_columns, vec!["id".to_string()]);
    }

    #[test]
    fn exhausted_unique_int_domain_falls_back() {
        let mut rule = TableRule::new("codes");
        rule.rows_to_generate = 5;
        rule.unique_columns = vec!["code".to_string()];
        rule.column_rules.insert(
            "code".to_string(),
            ColumnRule::Int(IntRule {
                min_value: 7,
                max_value: 7,
            }),
        );
        let columns = vec![int_column("code")];
        let pool = ValuePool::new();
        let mut rows =
            generate_table(&rule, &columns, &[], &pool, &GlobalSettings::default(), 3).unwrap();
        let values: BTreeSet<i64> = rows
            .by_ref()
            .map(|row| row.get("code").and_then(GeneratedValue::as_i64).unwrap())
            .collect();
        assert_eq!(values.len(), 5);
        assert!(values.contains(&7));
        assert_eq!(rows.stats().unique_fallbacks.get("code"), Some(&4));
    }

    #[test]
    fn rule_output_is_truncated_to_declared_length() {
        let mut rule = TableRule::new("items");
        rule.rows_to_generate = 10;
        rule.column_rules.insert(
            "sku".to_string(),
            ColumnRule::Pattern(PatternRule {
                pattern: "AAAA-####".to_string(),
            }),
        );
        let columns = vec![
            Column::new("sku", ColumnType::new("character varying", "varchar").with_max_length(4))
                .not_null(),
        ];
        let pool = ValuePool::new();
        for row in generate_table(&rule, &columns, &[], &pool, &GlobalSettings::default(), 9).unwrap()
        {
            assert_eq!(row.get("sku").and_then(GeneratedValue::as_str).map(|s| s.chars().count()), Some(4));
        }
    }

    #[test]
    fn unbound_foreign_keys_are_counted() {
        let mut rule = TableRule::new("orders");
        rule.rows_to_generate = 3;
        let columns = vec![int_column("user_id")];
        let fks = vec![ForeignKey::new("user_id", "users", "id")];
        let pool = ValuePool::new();
        let mut rows =
            generate_table(&rule, &columns, &fks, &pool, &GlobalSettings::default(), 5).unwrap();
        assert_eq!(rows.by_ref().count(), 3);
        let unbound = &rows.stats().fk_unbound["user_id"];
        assert_eq!(unbound.count, 3);
        assert_eq!(unbound.reference, "users.id");
    }

    #[test]
    fn contradictory_rule_is_a_configuration_error() {
        let mut rule = TableRule::new("bad");
        rule.column_rules.insert(
            "n".to_string(),
            ColumnRule::Int(IntRule {
                min_value: 10,
                max_value: 1,
            }),
        );
        let pool = ValuePool::new();
        let err = generate_table(
            &rule,
            &[int_column("n")],
            &[],
            &pool,
            &GlobalSettings::default(),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
    }

    #[test]
    fn failed_cells_become_distinct_placeholders() {
        let mut rule = TableRule::new("ledger");
        rule.rows_to_generate = 60;
        rule.unique_columns.push("entry".to_string());
        let columns = vec![int_column("entry"), int_column("amount")];
        let pool = ValuePool::new();
        let mut rows =
            generate_table(&rule, &columns, &[], &pool, &GlobalSettings::default(), 3).unwrap();
        // An inverted range panics on every draw.
        for plan in &mut rows.plans {
            plan.source = ValueSource::Rule(RuleSampler::Int { min: 5, max: 4 });
        }

        let generated: Vec<GeneratedRow> = rows.by_ref().collect();
        assert_eq!(generated.len(), 60);
        assert!(!SAMPLING.with(Cell::get));

        let mut entries = BTreeSet::new();
        for row in &generated {
            match row.get("entry") {
                Some(GeneratedValue::Text(text)) => {
                    assert!(text.starts_with("error_"), "{text}");
                    assert!(entries.insert(text.clone()), "repeated {text}");
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        let stats = rows.into_stats();
        assert_eq!(stats.cell_failures["entry"].count, 60);
        assert_eq!(stats.cell_failures["amount"].count, 60);
        assert!(!stats.cell_failures["entry"].last_message.is_empty());
        assert!(stats.unique_fallbacks.is_empty());

        let mut table_report = TableReport::new("public", "ledger", 60);
        let mut report = GenerationReport::new("run".to_string(), 3);
        apply_stats(&stats, "ledger", &mut table_report, &mut report);
        assert_eq!(table_report.cell_failures, 120);
        assert_eq!(report.count("cell_synthesis_failed"), 120);
    }

    #[test]
    fn unique_placeholders_survive_an_exhausted_range() {
        let mut resolver = UniquenessResolver::new(10, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for n in 1..=1000 {
            resolver.record(&GeneratedValue::Text(format!("error_{n}")));
        }
        let value = unique_placeholder(&mut resolver, &mut rng);
        match &value {
            GeneratedValue::Text(text) => assert!(text.starts_with("error_1001_"), "{text}"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(resolver.len(), 1001);
    }

    #[test]
    fn sample_cell_clears_the_quiet_flag() {
        let caught = sample_cell(|| -> u8 { panic!("boom") });
        assert_eq!(panic_message(caught.unwrap_err()), "boom");
        assert!(!SAMPLING.with(Cell::get));
        assert_eq!(sample_cell(|| 7).unwrap(), 7);
    }

    #[test]
    fn hash_seed_differs_per_table() {
        assert_ne!(hash_seed(1, "users"), hash_seed(1, "orders"));
        assert_eq!(hash_seed(1, "users"), hash_seed(1, "users"));
    }
}
