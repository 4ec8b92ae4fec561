use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rowsmith_config::{ConfigFormat, GenerationConfig, RejectedTable, parse_config_str};
use rowsmith_core::{Column, ColumnType, Error, ForeignKey, PrimaryKey, Result, TableSchema};
use rowsmith_generate::{
    GenerateOptions, GeneratedRow, GeneratedValue, GenerationEngine, GenerationError, RowStore,
    StaticSchemaSource, TableStatus,
};

/// Store that keeps rows in memory and records the order of inserts.
#[derive(Default)]
struct MemoryStore {
    tables: Mutex<BTreeMap<String, Vec<GeneratedRow>>>,
    inserts: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl MemoryStore {
    fn failing_on(table: &str) -> Self {
        Self {
            fail_on: Some(table.to_string()),
            ..Self::default()
        }
    }

    fn rows(&self, table: &str) -> Vec<GeneratedRow> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn insert_order(&self) -> Vec<String> {
        self.inserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn insert_rows(
        &self,
        table: &TableSchema,
        _columns: &[Column],
        rows: &[GeneratedRow],
        _batch_size: usize,
    ) -> Result<u64> {
        if self.fail_on.as_deref() == Some(table.name.as_str()) {
            return Err(Error::Db("insert rejected".to_string()));
        }
        self.inserts.lock().unwrap().push(table.name.clone());
        self.tables
            .lock()
            .unwrap()
            .entry(table.name.clone())
            .or_default()
            .extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn distinct_values(
        &self,
        _schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Vec<GeneratedValue>> {
        let mut seen = BTreeSet::new();
        Ok(self
            .rows(table)
            .iter()
            .filter_map(|row| row.get(column).cloned())
            .filter(|value| !value.is_null() && seen.insert(value.key()))
            .collect())
    }
}

fn int(name: &str) -> Column {
    Column::new(name, ColumnType::new("integer", "int4")).not_null()
}

fn users_table() -> TableSchema {
    let mut users = TableSchema::new(
        "public",
        "users",
        vec![
            int("id"),
            Column::new("email", ColumnType::new("character varying", "varchar").with_max_length(100)),
            Column::new("first_name", ColumnType::new("character varying", "varchar").with_max_length(30)),
        ],
    );
    users.primary_key = Some(PrimaryKey {
        name: Some("users_pkey".to_string()),
        columns: vec!["id".to_string()],
    });
    users
}

fn orders_table() -> TableSchema {
    let mut orders = TableSchema::new(
        "public",
        "orders",
        vec![
            Column::new("id", ColumnType::new("integer", "int4"))
                .not_null()
                .with_default("nextval('orders_id_seq'::regclass)"),
            int("user_id"),
            Column::new("placed_on", ColumnType::new("date", "date")).not_null(),
            Column::new("code", ColumnType::new("character varying", "varchar")).not_null(),
        ],
    );
    orders.primary_key = Some(PrimaryKey {
        name: Some("orders_pkey".to_string()),
        columns: vec!["id".to_string()],
    });
    orders.foreign_keys = vec![ForeignKey::new("user_id", "users", "id")];
    orders
}

fn config(text: &str) -> GenerationConfig {
    parse_config_str(text, ConfigFormat::Json).unwrap().config
}

const SHOP: &str = r##"{
  "global_settings": { "seed": 7 },
  "tables": [
    {
      "table_name": "orders",
      "rows_to_generate": 40,
      "unique_columns": ["code"],
      "column_rules": {
        "placed_on": { "type": "date", "start_date": "2023-01-01", "end_date": "2023-01-10" },
        "code": { "type": "pattern", "pattern": "AA-####" }
      }
    },
    {
      "table_name": "users",
      "rows_to_generate": 15,
      "unique_columns": ["id"],
      "column_rules": {
        "id": { "type": "int", "min_value": 1, "max_value": 15 }
      }
    }
  ]
}"##;

#[tokio::test]
async fn parents_are_persisted_before_children() {
    let config = config(SHOP);
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let store = MemoryStore::default();

    let report = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    assert_eq!(store.insert_order(), vec!["users", "orders"]);
    assert_eq!(report.seed, 7);
    assert!(!report.has_incomplete_tables());
    assert_eq!(report.rows_inserted_total, 55);

    let user_ids: BTreeSet<i64> = store
        .rows("users")
        .iter()
        .filter_map(|row| row.get("id").and_then(GeneratedValue::as_i64))
        .collect();
    assert_eq!(user_ids, (1..=15).collect());

    for row in store.rows("orders") {
        let user_id = row.get("user_id").and_then(GeneratedValue::as_i64).unwrap();
        assert!(user_ids.contains(&user_id));
        assert!(row.get("id").is_none());
    }

    let orders = report.table("orders").unwrap();
    assert_eq!(orders.tier, Some(1));
    assert_eq!(orders.fk_bound, 40);
    assert_eq!(orders.fk_unbound, 0);
    assert_eq!(orders.fk_orphans, 0);
    assert_eq!(orders.skipped_columns, vec!["id".to_string()]);
    assert_eq!(report.table("users").unwrap().captured_keys.get("id"), Some(&15));
}

#[tokio::test]
async fn rule_output_respects_bounds_and_formats() {
    let config = config(SHOP);
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let store = MemoryStore::default();
    GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let last = NaiveDate::from_ymd_opt(2023, 1, 10).unwrap();
    let mut codes = BTreeSet::new();
    for row in store.rows("orders") {
        match row.get("placed_on") {
            Some(GeneratedValue::Date(date)) => assert!((first..=last).contains(date)),
            other => panic!("unexpected placed_on value {other:?}"),
        }
        let code = row.get("code").and_then(GeneratedValue::as_str).unwrap().to_string();
        let chars: Vec<char> = code.chars().collect();
        assert_eq!(chars.len(), 7, "{code}");
        assert!(chars[..2].iter().all(char::is_ascii_uppercase), "{code}");
        assert_eq!(chars[2], '-');
        assert!(chars[3..].iter().all(char::is_ascii_digit), "{code}");
        assert!(codes.insert(code), "duplicate code");
    }
    assert_eq!(codes.len(), 40);
}

#[tokio::test]
async fn same_seed_reproduces_the_run() {
    let config = config(SHOP);
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let first = MemoryStore::default();
    let second = MemoryStore::default();
    for store in [&first, &second] {
        GenerationEngine::new(&config, GenerateOptions::default())
            .run(&source, store)
            .await
            .unwrap();
    }
    assert_eq!(first.rows("orders"), second.rows("orders"));
    assert_eq!(first.rows("users"), second.rows("users"));
}

#[tokio::test]
async fn single_value_unique_domain_still_yields_distinct_values() {
    let config = config(
        r#"{
          "global_settings": { "seed": 1, "max_retry_unique": 5 },
          "tables": [{
            "table_name": "users",
            "rows_to_generate": 25,
            "unique_columns": ["id"],
            "column_rules": { "id": { "type": "int", "min_value": 3, "max_value": 3 } }
          }]
        }"#,
    );
    let source = StaticSchemaSource::new([users_table()]);
    let store = MemoryStore::default();
    let report = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    let ids: BTreeSet<i64> = store
        .rows("users")
        .iter()
        .filter_map(|row| row.get("id").and_then(GeneratedValue::as_i64))
        .collect();
    assert_eq!(ids.len(), 25);
    assert_eq!(report.count("unique_fallback"), 24);
    assert_eq!(report.table("users").unwrap().unique_fallbacks, 24);
}

#[tokio::test]
async fn cycles_and_missing_tables_are_skipped() {
    let mut a = TableSchema::new("public", "a", vec![int("id"), int("b_id")]);
    a.foreign_keys = vec![ForeignKey::new("b_id", "b", "id")];
    let mut b = TableSchema::new("public", "b", vec![int("id"), int("a_id")]);
    b.foreign_keys = vec![ForeignKey::new("a_id", "a", "id")];

    let config = config(
        r#"{
          "global_settings": { "seed": 2 },
          "tables": [
            { "table_name": "a", "rows_to_generate": 3 },
            { "table_name": "b", "rows_to_generate": 3 },
            { "table_name": "ghost", "rows_to_generate": 3 },
            { "table_name": "users", "rows_to_generate": 3 }
          ]
        }"#,
    );
    let source = StaticSchemaSource::new([a, b, users_table()]);
    let store = MemoryStore::default();
    let report = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    assert_eq!(store.insert_order(), vec!["users"]);
    assert_eq!(report.count("dependency_cycle"), 2);
    assert_eq!(report.count("schema_unavailable"), 1);
    assert_eq!(report.table("ghost").unwrap().status, TableStatus::Skipped);
    assert_eq!(report.table("a").unwrap().status, TableStatus::Skipped);
    assert_eq!(report.table("users").unwrap().status, TableStatus::Completed);
}

#[tokio::test]
async fn persistence_failure_marks_table_and_continues() {
    let config = config(SHOP);
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let store = MemoryStore::failing_on("users");
    let report = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    assert_eq!(report.table("users").unwrap().status, TableStatus::Failed);
    let orders = report.table("orders").unwrap();
    assert_eq!(orders.status, TableStatus::Completed);
    assert_eq!(orders.fk_bound, 0);
    assert_eq!(orders.fk_unbound, 40);
    assert_eq!(report.count("persistence_failed"), 15);
    assert!(report.has_incomplete_tables());
}

#[tokio::test]
async fn disabled_foreign_keys_synthesize_reference_columns() {
    let mut config = config(SHOP);
    config.global_settings.enable_foreign_keys = false;
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let store = MemoryStore::default();
    let report = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    let orders = report.table("orders").unwrap();
    assert_eq!(orders.fk_bound, 0);
    assert_eq!(orders.fk_unbound, 0);
    assert_eq!(report.count("fk_unbound"), 0);
}

#[tokio::test]
async fn invalid_global_settings_abort_the_run() {
    let mut config = config(SHOP);
    config.global_settings.default_null_probability = 1.5;
    let source = StaticSchemaSource::new([users_table()]);
    let store = MemoryStore::default();
    let err = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Configuration(_)));
    assert!(store.insert_order().is_empty());
}

#[tokio::test]
async fn rejected_and_filtered_tables_are_reported() {
    let config = config(SHOP);
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let store = MemoryStore::default();
    let options = GenerateOptions {
        seed: Some(99),
        only_tables: vec!["users".to_string()],
        rejected_tables: vec![RejectedTable {
            index: 2,
            table_name: Some("payments".to_string()),
            reason: "unknown variant `money`".to_string(),
        }],
        ..GenerateOptions::default()
    };
    let report = GenerationEngine::new(&config, options)
        .run(&source, &store)
        .await
        .unwrap();

    assert_eq!(report.seed, 99);
    assert_eq!(store.insert_order(), vec!["users"]);
    assert_eq!(report.count("table_rejected"), 1);
    assert!(report.table("orders").is_none());
}

#[tokio::test]
async fn contradictory_table_rule_skips_only_that_table() {
    let config = config(
        r#"{
          "global_settings": { "seed": 3 },
          "tables": [
            {
              "table_name": "users",
              "rows_to_generate": 5,
              "column_rules": { "id": { "type": "int", "min_value": 9, "max_value": 1 } }
            },
            { "table_name": "orders", "rows_to_generate": 5 }
          ]
        }"#,
    );
    let source = StaticSchemaSource::new([users_table(), orders_table()]);
    let store = MemoryStore::default();
    let report = GenerationEngine::new(&config, GenerateOptions::default())
        .run(&source, &store)
        .await
        .unwrap();

    assert_eq!(report.table("users").unwrap().status, TableStatus::Skipped);
    assert_eq!(report.table("orders").unwrap().status, TableStatus::Completed);
    assert_eq!(report.count("table_skipped"), 1);
    assert_eq!(report.count("fk_unbound"), 5);
}
