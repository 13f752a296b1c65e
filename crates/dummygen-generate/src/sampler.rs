//! Representative value selection for a column.
//!
//! Sources are tried in priority order: enum labels, then literals listed by a
//! `<column> IN (...)` check constraint, then the most frequent values in the
//! table's live data.

use regex::Regex;
use tracing::warn;

use dummygen_core::{quote_literal, ColumnDescriptor, Result, SampledValue, TableRef, ValueSource};

use crate::literal::format_value;

/// A value the generator may embed for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCandidate {
    EnumLabel(String),
    CheckLiteral(String),
    Observed(SampledValue),
}

impl ValueCandidate {
    /// SQL literal for this candidate.
    pub fn to_sql(&self, column: &str) -> String {
        match self {
            ValueCandidate::EnumLabel(label) => quote_literal(label),
            ValueCandidate::CheckLiteral(literal) => quote_literal(literal),
            ValueCandidate::Observed(value) => format_value(value, column),
        }
    }
}

/// Values allowed by the column's enum type or by a check constraint, if any.
pub async fn allowed_values<S>(
    source: &S,
    table: &TableRef,
    column: &ColumnDescriptor,
) -> Result<Option<Vec<String>>>
where
    S: ValueSource + ?Sized + Sync,
{
    let candidates = constraint_candidates(source, table, column).await?;
    Ok(candidates.map(|values| {
        values
            .into_iter()
            .filter_map(|candidate| match candidate {
                ValueCandidate::EnumLabel(value) | ValueCandidate::CheckLiteral(value) => {
                    Some(value)
                }
                ValueCandidate::Observed(_) => None,
            })
            .collect()
    }))
}

/// Up to `limit` candidates for a column, most representative first.
///
/// Enum and check lists longer than `limit` keep their first `limit` entries
/// in declaration order; later labels are never generated. Raise the sample
/// limit to cover them, or use [`allowed_values`] for the full list.
///
/// A failing frequency query is logged and yields no candidates so the
/// generator can fall back to type defaults.
pub async fn sample_values<S>(
    source: &S,
    table: &TableRef,
    column: &ColumnDescriptor,
    limit: usize,
) -> Result<Vec<ValueCandidate>>
where
    S: ValueSource + ?Sized + Sync,
{
    if let Some(mut candidates) = constraint_candidates(source, table, column).await? {
        candidates.truncate(limit);
        return Ok(candidates);
    }

    match source.most_common_values(table, column, limit).await {
        Ok(values) => Ok(values
            .into_iter()
            .take(limit)
            .map(ValueCandidate::Observed)
            .collect()),
        Err(err) => {
            warn!(
                event = "frequency_sampling_failed",
                table = %table,
                column = %column.name,
                error = %err
            );
            Ok(Vec::new())
        }
    }
}

async fn constraint_candidates<S>(
    source: &S,
    table: &TableRef,
    column: &ColumnDescriptor,
) -> Result<Option<Vec<ValueCandidate>>>
where
    S: ValueSource + ?Sized + Sync,
{
    if let Some(labels) = source.enum_labels(column).await?
        && !labels.is_empty()
    {
        return Ok(Some(
            labels.into_iter().map(ValueCandidate::EnumLabel).collect(),
        ));
    }

    for definition in source.check_definitions(table).await? {
        if let Some(values) = parse_in_list(&definition, &column.name) {
            return Ok(Some(
                values.into_iter().map(ValueCandidate::CheckLiteral).collect(),
            ));
        }
    }

    Ok(None)
}

/// Literals of a `<column> IN (...)` clause inside a check constraint definition.
///
/// This is a narrow textual match: entries are split on commas, trimmed and
/// stripped of single quotes. Any other constraint shape yields `None`.
pub fn parse_in_list(definition: &str, column: &str) -> Option<Vec<String>> {
    let pattern = format!(r"(?i)\b{} IN \(([^)]+)\)", regex::escape(column));
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(definition)?;

    let values: Vec<String> = caps[1]
        .split(',')
        .map(|value| value.trim().trim_matches('\'').to_string())
        .collect();

    if values.is_empty() { None } else { Some(values) }
}
