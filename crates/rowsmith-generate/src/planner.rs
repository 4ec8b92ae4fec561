use std::collections::{BTreeMap, BTreeSet};

use rowsmith_config::TableRule;
use rowsmith_core::{DependencyNode, TableSchema, assign_tiers};

/// A table scheduled for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub table: String,
    pub tier: usize,
    pub rows: u64,
}

/// Processing order plus tables that cannot be ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePlan {
    pub tasks: Vec<GenerationTask>,
    /// Number of dependency tiers among `tasks`.
    pub tiers: usize,
    /// Tables on a foreign-key cycle or behind one.
    pub unresolved: Vec<String>,
}

/// Order configured tables so referenced tables come first.
///
/// Rules without a schema entry are left out. Rule order breaks ties within a tier.
pub fn plan_tables(rules: &[TableRule], schemas: &BTreeMap<String, TableSchema>) -> TablePlan {
    let nodes: Vec<DependencyNode> = rules
        .iter()
        .filter_map(|rule| {
            schemas.get(&rule.table_name).map(|schema| {
                DependencyNode::new(
                    rule.table_name.clone(),
                    schema
                        .foreign_keys
                        .iter()
                        .map(|fk| fk.referenced_table.clone()),
                )
            })
        })
        .collect();

    let tiers = assign_tiers(&nodes);
    let rows: BTreeMap<&str, u64> = rules
        .iter()
        .map(|rule| (rule.table_name.as_str(), rule.rows_to_generate))
        .rev()
        .collect();

    TablePlan {
        tiers: tiers.tier_count(),
        tasks: tiers
            .ordered
            .into_iter()
            .map(|assignment| GenerationTask {
                rows: rows.get(assignment.table.as_str()).copied().unwrap_or(0),
                table: assignment.table,
                tier: assignment.tier,
            })
            .collect(),
        unresolved: tiers.unresolved,
    }
}

/// Columns referenced by any known foreign key, per referenced table.
pub fn referenced_columns(
    schemas: &BTreeMap<String, TableSchema>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut referenced: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for schema in schemas.values() {
        for fk in &schema.foreign_keys {
            referenced
                .entry(fk.referenced_table.clone())
                .or_default()
                .insert(fk.referenced_column.clone());
        }
    }
    referenced
}
