use std::time::Instant;

use rowsmith_config::{LoadedConfig, load_config, validate_loaded_config};
use rowsmith_generate::{
    CsvStore, GenerateOptions, GenerationEngine, GenerationReport, RowStore, SchemaSource,
    StaticSchemaSource, TableStatus,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::registry::{RunContext, init_logging, start_run, write_report};
use crate::{CliError, GenerateArgs};

use super::open_adapter;

pub async fn run(args: GenerateArgs) -> Result<(), CliError> {
    let loaded = load_config(&args.config)?;
    let structure = validate_loaded_config(&loaded)?;
    if !structure.is_ok() {
        return Err(CliError::InvalidConfig(structure.error_summary()));
    }
    let LoadedConfig { config, rejected, .. } = loaded;

    let run_id = Uuid::new_v4().to_string();
    let seed = args
        .seed
        .or(config.global_settings.seed)
        .unwrap_or_else(rand::random);
    let ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: args.run_dir.clone(),
        config_path: args.config.clone(),
        connection: config.database.redacted(),
        settings: config.global_settings.clone(),
        seed,
        dry_run: args.dry_run,
        tables: args.tables.clone(),
    };
    let paths = start_run(&ctx)?;
    init_logging(&config.global_settings.log_level, Some(&paths.logs_path))?;

    info!(
        event = "run_started",
        run_id = %run_id,
        connection = %ctx.connection,
        dry_run = args.dry_run,
        run_dir = %paths.root.display()
    );
    let timer = Instant::now();

    let options = GenerateOptions {
        seed: Some(seed),
        run_id: Some(run_id.clone()),
        only_tables: args.tables.clone(),
        rejected_tables: rejected,
    };
    let engine = GenerationEngine::new(&config, options);

    let report = if args.dry_run {
        let out_dir = args.out_dir.clone().unwrap_or_else(|| paths.root.join("csv"));
        let store = CsvStore::new(out_dir);
        match &args.schema_file {
            Some(path) => {
                let source = StaticSchemaSource::from_json_file(path)?;
                execute(&engine, &source, &store).await?
            }
            None => {
                let adapter = open_adapter(&config.database).await?;
                execute(&engine, &adapter, &store).await?
            }
        }
    } else {
        let adapter = open_adapter(&config.database).await?;
        execute(&engine, &adapter, &adapter).await?
    };

    write_report(&paths, &report)?;
    print_summary(&report);

    let incomplete = report
        .tables
        .iter()
        .filter(|table| table.status != TableStatus::Completed)
        .count();
    info!(
        event = "run_finished",
        status = if incomplete == 0 { "success" } else { "partial" },
        rows_inserted = report.rows_inserted_total,
        duration_ms = timer.elapsed().as_millis() as u64
    );

    if incomplete > 0 {
        return Err(CliError::Incomplete(incomplete));
    }
    Ok(())
}

async fn execute(
    engine: &GenerationEngine<'_>,
    source: &dyn SchemaSource,
    store: &dyn RowStore,
) -> Result<GenerationReport, CliError> {
    match engine.run(source, store).await {
        Ok(report) => Ok(report),
        Err(err) => {
            warn!(event = "run_failed", error = %err);
            Err(err.into())
        }
    }
}

fn print_summary(report: &GenerationReport) {
    println!("run {} (seed {})", report.run_id, report.seed);
    for table in &report.tables {
        let status = match table.status {
            TableStatus::Completed => "ok",
            TableStatus::Skipped => "skipped",
            TableStatus::Failed => "failed",
        };
        println!(
            "  {:<32} {:>8} {:>8}/{:<8} rows",
            format!("{}.{}", table.schema, table.table),
            status,
            table.rows_inserted,
            table.rows_requested,
        );
    }
    if !report.warnings_by_code.is_empty() {
        println!("issues:");
        for (code, count) in &report.warnings_by_code {
            println!("  {code:<32} {count}");
        }
    }
    println!(
        "{} rows inserted in {} ms",
        report.rows_inserted_total, report.duration_ms
    );
}
