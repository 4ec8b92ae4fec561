use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use rowsmith_core::{ForeignKey, TableSchema};

use crate::value::{GeneratedRow, GeneratedValue};

/// Column names treated as keys when the schema has no primary key.
const KEY_NAME_CANDIDATES: [&str; 3] = ["id", "user_id", "order_id"];

#[derive(Debug, Clone, Default)]
struct PoolEntry {
    values: Vec<GeneratedValue>,
    keys: HashSet<String>,
}

/// Values available for foreign-key binding, keyed `table.column`.
///
/// Entries only grow: merging keeps existing values and skips duplicates and nulls.
#[derive(Debug, Clone, Default)]
pub struct ValuePool {
    entries: BTreeMap<String, PoolEntry>,
}

impl ValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(table: &str, column: &str) -> String {
        format!("{table}.{column}")
    }

    /// Merge values into `table.column`; returns how many were new.
    pub fn extend<I>(&mut self, table: &str, column: &str, values: I) -> usize
    where
        I: IntoIterator<Item = GeneratedValue>,
    {
        let entry = self.entries.entry(Self::key(table, column)).or_default();
        let mut added = 0;
        for value in values {
            if value.is_null() {
                continue;
            }
            if entry.keys.insert(value.key()) {
                entry.values.push(value);
                added += 1;
            }
        }
        added
    }

    pub fn values(&self, key: &str) -> Option<&[GeneratedValue]> {
        self.entries.get(key).map(|entry| entry.values.as_slice())
    }

    pub fn has_values(&self, key: &str) -> bool {
        self.values(key).is_some_and(|values| !values.is_empty())
    }

    pub fn contains(&self, key: &str, value: &GeneratedValue) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.keys.contains(&value.key()))
    }

    /// Number of values per entry.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.values.len()))
            .collect()
    }
}

/// Outcome of a binding attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Value picked from the pool.
    Bound(GeneratedValue),
    /// Foreign-key column without pool values; synthesize instead.
    Unbound { reference: String },
    NotForeignKey,
}

/// Binds foreign-key columns of one table to pooled parent values.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyBinder {
    by_column: BTreeMap<String, String>,
}

impl ForeignKeyBinder {
    /// A disabled binder treats every column as a plain column.
    pub fn new(foreign_keys: &[ForeignKey], enabled: bool) -> Self {
        let by_column = if enabled {
            foreign_keys
                .iter()
                .map(|fk| (fk.column.clone(), fk.pool_key()))
                .collect()
        } else {
            BTreeMap::new()
        };
        Self { by_column }
    }

    /// Uniform pick from the referenced pool entry. Values are used verbatim
    /// and may repeat across rows.
    pub fn bind<R: Rng + ?Sized>(&self, column: &str, pool: &ValuePool, rng: &mut R) -> Binding {
        let Some(reference) = self.by_column.get(column) else {
            return Binding::NotForeignKey;
        };
        match pool.values(reference).and_then(|values| values.choose(rng)) {
            Some(value) => Binding::Bound(value.clone()),
            None => Binding::Unbound {
                reference: reference.clone(),
            },
        }
    }
}

/// Foreign-key values absent from the pool, per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanCount {
    pub column: String,
    pub reference: String,
    pub count: u64,
}

/// Count non-null foreign-key values that reference nothing in the pool.
pub fn find_orphans(
    rows: &[GeneratedRow],
    foreign_keys: &[ForeignKey],
    pool: &ValuePool,
) -> Vec<OrphanCount> {
    foreign_keys
        .iter()
        .filter_map(|fk| {
            let reference = fk.pool_key();
            let count = rows
                .iter()
                .filter_map(|row| row.get(&fk.column))
                .filter(|value| !value.is_null() && !pool.contains(&reference, value))
                .count() as u64;
            (count > 0).then(|| OrphanCount {
                column: fk.column.clone(),
                reference,
                count,
            })
        })
        .collect()
}

/// Columns of `table` whose values other tables may reference.
///
/// Primary key columns plus every column in `referenced`. Without a primary
/// key, `id`, `<table>_id`, `user_id` and `order_id` are used when present.
pub fn key_columns(table: &TableSchema, referenced: &BTreeSet<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if table.column(name).is_some() && !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    };

    if table.primary_key_columns().is_empty() {
        let own_id = format!("{}_id", table.name);
        for name in KEY_NAME_CANDIDATES.iter().copied().chain([own_id.as_str()]) {
            push(name);
        }
    } else {
        for name in table.primary_key_columns() {
            push(name);
        }
    }
    for name in referenced {
        push(name);
    }
    columns
}

/// Copy the key columns of persisted rows into the pool.
///
/// Returns the number of new values per column.
pub fn capture_key_values(
    pool: &mut ValuePool,
    table: &str,
    key_columns: &[String],
    rows: &[GeneratedRow],
) -> BTreeMap<String, usize> {
    key_columns
        .iter()
        .map(|column| {
            let values = rows.iter().filter_map(|row| row.get(column).cloned());
            let added = pool.extend(table, column, values);
            (column.clone(), added)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rowsmith_core::{Column, ColumnType, PrimaryKey};

    fn row(cells: &[(&str, GeneratedValue)]) -> GeneratedRow {
        let mut row = GeneratedRow::default();
        for (name, value) in cells {
            row.push(*name, value.clone());
        }
        row
    }

    #[test]
    fn pool_grows_monotonically_without_duplicates() {
        let mut pool = ValuePool::new();
        let added = pool.extend(
            "users",
            "id",
            [1, 2, 2, 3].map(GeneratedValue::Int).into_iter().chain([GeneratedValue::Null]),
        );
        assert_eq!(added, 3);
        assert_eq!(pool.extend("users", "id", [GeneratedValue::Int(3), GeneratedValue::Int(4)]), 1);
        assert_eq!(pool.values("users.id").map(<[_]>::len), Some(4));
        assert!(pool.contains("users.id", &GeneratedValue::Text("4".to_string())));
    }

    #[test]
    fn binder_picks_uniformly_from_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut pool = ValuePool::new();
        pool.extend("users", "id", [1, 2, 3].map(GeneratedValue::Int));
        let binder = ForeignKeyBinder::new(&[ForeignKey::new("user_id", "users", "id")], true);

        let mut counts = BTreeMap::new();
        let draws = 30_000;
        for _ in 0..draws {
            match binder.bind("user_id", &pool, &mut rng) {
                Binding::Bound(GeneratedValue::Int(value)) => *counts.entry(value).or_insert(0) += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        for count in counts.values() {
            let share = *count as f64 / draws as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.02, "share {share}");
        }
    }

    #[test]
    fn binder_falls_through_without_pool_or_when_disabled() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let pool = ValuePool::new();
        let fks = [ForeignKey::new("user_id", "users", "id")];
        let binder = ForeignKeyBinder::new(&fks, true);
        assert_eq!(
            binder.bind("user_id", &pool, &mut rng),
            Binding::Unbound {
                reference: "users.id".to_string()
            }
        );
        assert_eq!(binder.bind("total", &pool, &mut rng), Binding::NotForeignKey);

        let disabled = ForeignKeyBinder::new(&fks, false);
        assert_eq!(disabled.bind("user_id", &pool, &mut rng), Binding::NotForeignKey);
    }

    #[test]
    fn orphans_are_counted_per_column() {
        let mut pool = ValuePool::new();
        pool.extend("users", "id", [GeneratedValue::Int(1)]);
        let rows = vec![
            row(&[("user_id", GeneratedValue::Int(1))]),
            row(&[("user_id", GeneratedValue::Int(7))]),
            row(&[("user_id", GeneratedValue::Null)]),
        ];
        let orphans = find_orphans(&rows, &[ForeignKey::new("user_id", "users", "id")], &pool);
        assert_eq!(
            orphans,
            vec![OrphanCount {
                column: "user_id".to_string(),
                reference: "users.id".to_string(),
                count: 1,
            }]
        );
    }

    #[test]
    fn key_columns_prefer_primary_key_metadata() {
        let int = |name: &str| Column::new(name, ColumnType::new("integer", "int4"));
        let mut table = TableSchema::new(
            "public",
            "accounts",
            vec![int("id"), int("account_no"), int("accounts_id"), int("owner")],
        );
        let referenced: BTreeSet<String> = ["owner".to_string()].into();

        assert_eq!(key_columns(&table, &referenced), vec!["id", "accounts_id", "owner"]);

        table.primary_key = Some(PrimaryKey {
            name: None,
            columns: vec!["account_no".to_string()],
        });
        assert_eq!(key_columns(&table, &referenced), vec!["account_no", "owner"]);
    }

    #[test]
    fn capture_reports_new_values_per_column() {
        let mut pool = ValuePool::new();
        let rows = vec![
            row(&[("id", GeneratedValue::Int(1)), ("code", GeneratedValue::Text("a".into()))]),
            row(&[("id", GeneratedValue::Int(2)), ("code", GeneratedValue::Text("a".into()))]),
        ];
        let added = capture_key_values(&mut pool, "items", &["id".to_string(), "code".to_string()], &rows);
        assert_eq!(added.get("id"), Some(&2));
        assert_eq!(added.get("code"), Some(&1));
        assert!(pool.has_values("items.code"));
    }
}
