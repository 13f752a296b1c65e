use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dummygen_core::quote_literal;

/// Literal used when a declared type has no entry.
pub const NULL_LITERAL: &str = "NULL";

/// Fallback SQL literal per declared column type.
///
/// Keys are `information_schema` type names compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeDefaults {
    entries: BTreeMap<String, String>,
}

impl TypeDefaults {
    /// Built-in defaults; text columns receive `<prefix>Text`.
    pub fn builtin(dummy_prefix: &str) -> Self {
        let text = quote_literal(&format!("{dummy_prefix}Text"));
        let entries = [
            ("integer", "1"),
            ("bigint", "1"),
            ("smallint", "1"),
            ("character varying", text.as_str()),
            ("varchar", text.as_str()),
            ("text", text.as_str()),
            ("date", "CURRENT_DATE"),
            ("timestamp without time zone", "CURRENT_TIMESTAMP"),
            ("timestamp with time zone", "CURRENT_TIMESTAMP"),
            ("time without time zone", "CURRENT_TIME"),
            ("boolean", "TRUE"),
            ("numeric", "1.23"),
            ("real", "1.23"),
            ("double precision", "1.23"),
        ]
        .into_iter()
        .map(|(ty, literal)| (ty.to_string(), literal.to_string()))
        .collect();

        Self { entries }
    }

    /// Overlay entries on top of the current table, replacing existing keys.
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (ty, literal) in overrides {
            self.insert(&ty, literal);
        }
        self
    }

    pub fn insert(&mut self, declared_type: &str, literal: impl Into<String>) {
        self.entries
            .insert(declared_type.to_ascii_lowercase(), literal.into());
    }

    /// Literal for `declared_type`, `NULL` when unknown.
    pub fn literal_for(&self, declared_type: &str) -> &str {
        self.entries
            .get(&declared_type.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(NULL_LITERAL)
    }
}

impl Default for TypeDefaults {
    fn default() -> Self {
        Self::builtin("Dummy")
    }
}
