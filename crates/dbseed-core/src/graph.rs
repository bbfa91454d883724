use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::FkMap;

/// Processing order for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOrder {
    /// Every input table exactly once, parents before children where possible.
    pub order: Vec<String>,
    /// Tables emitted while at least one of their parents was still pending,
    /// i.e. where a cycle had to be broken. Empty for acyclic maps.
    pub forced: Vec<String>,
}

impl DependencyOrder {
    pub fn is_acyclic(&self) -> bool {
        self.forced.is_empty()
    }

    pub fn position(&self, table: &str) -> Option<usize> {
        self.order.iter().position(|item| item == table)
    }
}

/// Order `tables` so that every parent is inserted before its children.
///
/// Self references and edges to tables outside `tables` are ignored. On a
/// cycle the resolver never fails: it emits the lexicographically smallest
/// pending table with the fewest unresolved parents and carries on, so the
/// acyclic part of the graph keeps its guarantees.
pub fn resolve_order(tables: &[String], fk_map: &FkMap) -> DependencyOrder {
    let graph = build_adjacency(tables, fk_map);

    let mut indegree: BTreeMap<&str, usize> =
        graph.keys().map(|node| (node.as_str(), 0)).collect();
    for targets in graph.values() {
        for target in targets {
            if let Some(count) = indegree.get_mut(target.as_str()) {
                *count += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter_map(|(node, count)| if *count == 0 { Some(*node) } else { None })
        .collect();
    let mut emitted: BTreeSet<&str> = BTreeSet::new();
    let mut order = Vec::with_capacity(graph.len());
    let mut forced = Vec::new();

    while order.len() < graph.len() {
        let node = match ready.pop_first() {
            Some(node) => node,
            None => {
                let Some(node) = indegree
                    .iter()
                    .filter(|(node, _)| !emitted.contains(*node))
                    .min_by(|left, right| left.1.cmp(right.1).then_with(|| left.0.cmp(right.0)))
                    .map(|(node, _)| *node)
                else {
                    break;
                };
                forced.push(node.to_string());
                node
            }
        };

        emitted.insert(node);
        order.push(node.to_string());

        if let Some(targets) = graph.get(node) {
            for target in targets {
                let target = target.as_str();
                if emitted.contains(target) {
                    continue;
                }
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target);
                    }
                }
            }
        }
    }

    DependencyOrder { order, forced }
}

/// Parent → children adjacency over the given tables.
fn build_adjacency(tables: &[String], fk_map: &FkMap) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = tables
        .iter()
        .map(|table| (table.clone(), BTreeSet::new()))
        .collect();

    for edge in fk_map.edges() {
        if edge.parent_table == edge.child_table {
            continue;
        }
        if !graph.contains_key(&edge.child_table) {
            continue;
        }
        if let Some(children) = graph.get_mut(&edge.parent_table) {
            children.insert(edge.child_table);
        }
    }

    graph
}
