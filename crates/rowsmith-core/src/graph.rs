use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A table to be ordered, with the tables it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub table: String,
    /// Referenced tables, including external and self references.
    pub references: BTreeSet<String>,
}

impl DependencyNode {
    pub fn new<I, S>(table: impl Into<String>, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            references: references.into_iter().map(Into::into).collect(),
        }
    }
}

/// Position of a table in the processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAssignment {
    pub table: String,
    pub tier: usize,
}

/// Processing order grouped into dependency tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPlan {
    /// Tables in processing order: by tier, then by input order.
    pub ordered: Vec<TierAssignment>,
    /// Tables on a reference cycle or depending on one.
    pub unresolved: Vec<String>,
}

impl TierPlan {
    pub fn tier_count(&self) -> usize {
        self.ordered
            .iter()
            .map(|assignment| assignment.tier + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Assign dependency tiers to tables.
///
/// Tables without references form tier 0. A table with references sits one
/// tier above the highest tier among the input tables it references; external
/// and self references count as tier 0, so such a table lands in tier 1.
/// Within a tier the input order is kept. Duplicate table names keep their
/// first occurrence.
pub fn assign_tiers(nodes: &[DependencyNode]) -> TierPlan {
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for (position, node) in nodes.iter().enumerate() {
        index.entry(node.table.as_str()).or_insert(position);
    }

    // parent position -> dependent positions
    let mut dependents: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    let mut indegree: BTreeMap<usize, usize> = BTreeMap::new();

    for (&table, &position) in &index {
        indegree.entry(position).or_insert(0);
        for reference in &nodes[position].references {
            if reference == table {
                continue;
            }
            if let Some(&parent) = index.get(reference.as_str()) {
                if dependents.entry(parent).or_default().insert(position) {
                    *indegree.entry(position).or_insert(0) += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<usize> = indegree
        .iter()
        .filter_map(|(position, count)| if *count == 0 { Some(*position) } else { None })
        .collect();
    let mut tiers: BTreeMap<usize, usize> = BTreeMap::new();

    while let Some(position) = ready.iter().next().copied() {
        ready.remove(&position);

        let node = &nodes[position];
        let tier = if node.references.is_empty() {
            0
        } else {
            let parent_max = node
                .references
                .iter()
                .filter(|reference| **reference != node.table)
                .filter_map(|reference| index.get(reference.as_str()))
                .filter_map(|parent| tiers.get(parent))
                .max()
                .copied()
                .unwrap_or(0);
            parent_max + 1
        };
        tiers.insert(position, tier);

        if let Some(children) = dependents.get(&position) {
            for child in children {
                if let Some(count) = indegree.get_mut(child) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(*child);
                    }
                }
            }
        }
    }

    let mut ordered: Vec<(usize, usize)> = tiers
        .iter()
        .map(|(position, tier)| (*tier, *position))
        .collect();
    ordered.sort();

    let unresolved = indegree
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(position, _)| nodes[position].table.clone())
        .collect();

    TierPlan {
        ordered: ordered
            .into_iter()
            .map(|(tier, position)| TierAssignment {
                table: nodes[position].table.clone(),
                tier,
            })
            .collect(),
        unresolved,
    }
}
