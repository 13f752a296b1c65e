//! Discovery of the tables related to a target table.
//!
//! Relations are found breadth-first over a lazily-queried graph: foreign keys
//! in both directions, plus a naming convention where a table carrying a
//! `<singular target>_id` column is treated as a child of the target.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::catalog::{RelationSource, TableRef};
use crate::error::Result;

const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("analyses", "analysis"),
    ("criteria", "criterion"),
    ("statuses", "status"),
    ("buses", "bus"),
    ("bonuses", "bonus"),
    ("campuses", "campus"),
    ("movies", "movie"),
    ("caches", "cache"),
    ("niches", "niche"),
    ("cliches", "cliche"),
    ("headaches", "headache"),
    ("avalanches", "avalanche"),
    ("moustaches", "moustache"),
    ("menus", "menu"),
    ("emus", "emu"),
    ("gurus", "guru"),
    ("haikus", "haiku"),
];

const UNINFLECTED: &[&str] = &[
    "series",
    "species",
    "news",
    "sheep",
    "fish",
    "deer",
    "equipment",
    "information",
    "metadata",
];

/// Why a table entered the discovered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationKind {
    ForeignKeyOutbound,
    ForeignKeyInbound,
    NamingConvention,
}

impl RelationKind {
    fn as_str(self) -> &'static str {
        match self {
            RelationKind::ForeignKeyOutbound => "fk_outbound",
            RelationKind::ForeignKeyInbound => "fk_inbound",
            RelationKind::NamingConvention => "naming",
        }
    }
}

/// Singular form of a table name.
///
/// Only the last `_`-separated word is inflected. Known irregular plurals
/// (including `-che` and `-u` words the suffix rules would mangle) and
/// common suffixes (`ies`, `sses`, `xes`, `ches`, `shes`) are handled;
/// anything else ending in a single `s` loses it. Words ending in `ss`, `us`
/// or `is` are already singular.
pub fn singularize(name: &str) -> String {
    let (prefix, word) = match name.rfind('_') {
        Some(idx) => name.split_at(idx + 1),
        None => ("", name),
    };
    let lower = word.to_ascii_lowercase();

    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return format!("{prefix}{singular}");
    }
    if UNINFLECTED.contains(&lower.as_str()) {
        return name.to_string();
    }

    let stem = if lower.len() > 3 && lower.ends_with("ies") {
        format!("{}y", &word[..word.len() - 3])
    } else if ["sses", "xes", "ches", "shes"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        word[..word.len() - 2].to_string()
    } else if ["ss", "us", "is"].iter().any(|suffix| lower.ends_with(suffix)) {
        word.to_string()
    } else if lower.ends_with('s') {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    };

    format!("{prefix}{stem}")
}

/// Column name that, by convention, points at rows of `table_name`.
pub fn logical_column_name(table_name: &str) -> String {
    format!("{}_id", singularize(table_name))
}

/// Closed set of tables related to `target`, always including `target`.
///
/// The naming-convention lookup runs once, seeded from `target`; foreign keys
/// are then followed in both directions until no new table is found. There is
/// no depth limit.
pub async fn related_tables<S>(source: &S, target: &TableRef) -> Result<BTreeSet<TableRef>>
where
    S: RelationSource + ?Sized + Sync,
{
    let mut visited = BTreeSet::from([target.clone()]);
    let mut queue = VecDeque::from([target.clone()]);

    let logical_column = logical_column_name(&target.name);
    for table in source.tables_with_column(&logical_column).await? {
        visit(
            &mut visited,
            &mut queue,
            table,
            target,
            RelationKind::NamingConvention,
        );
    }

    traverse(source, &mut visited, queue).await?;
    Ok(visited)
}

/// Expand `seeds` with every table reachable through foreign keys.
pub async fn close_over_foreign_keys<S, I>(source: &S, seeds: I) -> Result<BTreeSet<TableRef>>
where
    S: RelationSource + ?Sized + Sync,
    I: IntoIterator<Item = TableRef>,
{
    let mut visited: BTreeSet<TableRef> = seeds.into_iter().collect();
    let queue = visited.iter().cloned().collect();
    traverse(source, &mut visited, queue).await?;
    Ok(visited)
}

async fn traverse<S>(
    source: &S,
    visited: &mut BTreeSet<TableRef>,
    mut queue: VecDeque<TableRef>,
) -> Result<()>
where
    S: RelationSource + ?Sized + Sync,
{
    while let Some(current) = queue.pop_front() {
        for parent in source.referenced_tables(&current).await? {
            visit(
                visited,
                &mut queue,
                parent,
                &current,
                RelationKind::ForeignKeyOutbound,
            );
        }
        for child in source.referencing_tables(&current).await? {
            visit(
                visited,
                &mut queue,
                child,
                &current,
                RelationKind::ForeignKeyInbound,
            );
        }
    }
    Ok(())
}

fn visit(
    visited: &mut BTreeSet<TableRef>,
    queue: &mut VecDeque<TableRef>,
    table: TableRef,
    from: &TableRef,
    kind: RelationKind,
) {
    if visited.insert(table.clone()) {
        debug!(
            event = "relation_discovered",
            table = %table,
            from = %from,
            via = kind.as_str()
        );
        queue.push_back(table);
    }
}
