use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::TableRef;

/// Order `tables` so referenced tables come before the tables referencing them.
///
/// `parents` maps a table to the tables it references. Edges leaving the table
/// set and self-references are ignored. Tables caught in a cycle are appended
/// in name order after everything that could be ordered.
pub fn dependency_order(
    tables: &BTreeSet<TableRef>,
    parents: &BTreeMap<TableRef, BTreeSet<TableRef>>,
) -> Vec<TableRef> {
    let graph = build_adjacency(tables, parents);

    match toposort(&graph) {
        Ok(order) => order,
        Err((mut order, cycle)) => {
            tracing::warn!(
                event = "dependency_cycle",
                tables = %cycle
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            order.extend(cycle);
            order
        }
    }
}

/// Edges point from a referenced table to the tables that depend on it.
fn build_adjacency(
    tables: &BTreeSet<TableRef>,
    parents: &BTreeMap<TableRef, BTreeSet<TableRef>>,
) -> BTreeMap<TableRef, BTreeSet<TableRef>> {
    let mut graph: BTreeMap<TableRef, BTreeSet<TableRef>> = tables
        .iter()
        .map(|table| (table.clone(), BTreeSet::new()))
        .collect();

    for (child, referenced) in parents {
        if !tables.contains(child) {
            continue;
        }
        for parent in referenced {
            if parent == child || !tables.contains(parent) {
                continue;
            }
            graph
                .entry(parent.clone())
                .or_default()
                .insert(child.clone());
        }
    }

    graph
}

type Toposort = Result<Vec<TableRef>, (Vec<TableRef>, Vec<TableRef>)>;

fn toposort(graph: &BTreeMap<TableRef, BTreeSet<TableRef>>) -> Toposort {
    let mut indegree: BTreeMap<TableRef, usize> =
        graph.keys().map(|node| (node.clone(), 0)).collect();

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<TableRef> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| node.clone())
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.clone());

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
    }

    if order.len() == graph.len() {
        Ok(order)
    } else {
        let cycle = indegree
            .into_iter()
            .filter_map(|(node, count)| if count > 0 { Some(node) } else { None })
            .collect();
        Err((order, cycle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str) -> TableRef {
        TableRef::new("public", name)
    }

    fn parents(edges: &[(&str, &str)]) -> BTreeMap<TableRef, BTreeSet<TableRef>> {
        let mut map: BTreeMap<TableRef, BTreeSet<TableRef>> = BTreeMap::new();
        for (child, parent) in edges {
            map.entry(t(child)).or_default().insert(t(parent));
        }
        map
    }

    #[test]
    fn referenced_tables_come_first() {
        let tables = BTreeSet::from([t("order_items"), t("orders"), t("customers")]);
        let edges = parents(&[("orders", "customers"), ("order_items", "orders")]);

        let order = dependency_order(&tables, &edges);
        assert_eq!(order, vec![t("customers"), t("orders"), t("order_items")]);
    }

    #[test]
    fn self_reference_and_outside_edges_are_ignored() {
        let tables = BTreeSet::from([t("employees"), t("teams")]);
        let edges = parents(&[
            ("employees", "employees"),
            ("employees", "teams"),
            ("teams", "companies"),
        ]);

        let order = dependency_order(&tables, &edges);
        assert_eq!(order, vec![t("teams"), t("employees")]);
    }

    #[test]
    fn cycle_members_are_appended_in_name_order() {
        let tables = BTreeSet::from([t("a"), t("b"), t("root")]);
        let edges = parents(&[("a", "b"), ("b", "a"), ("a", "root")]);

        let order = dependency_order(&tables, &edges);
        assert_eq!(order, vec![t("root"), t("a"), t("b")]);
    }
}
