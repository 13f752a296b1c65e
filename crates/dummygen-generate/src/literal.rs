//! Rendering of sampled values as SQL literals.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

use dummygen_core::{quote_literal, SampledValue};

use crate::type_defaults::NULL_LITERAL;

/// SQL literal for an observed value of `column`.
///
/// Values that cannot be written as a literal (bytes, arrays, documents and
/// unsupported types) become `NULL`.
pub fn format_value(value: &SampledValue, column: &str) -> String {
    match value {
        SampledValue::Text(text) => quote_literal(text),
        SampledValue::Integer(number) => number.to_string(),
        SampledValue::Float(number) => format_float(*number),
        SampledValue::Decimal(text) => format_decimal(text, column),
        SampledValue::Boolean(flag) => (if *flag { "TRUE" } else { "FALSE" }).to_string(),
        SampledValue::Date(date) => format!("DATE '{date}'"),
        SampledValue::Timestamp(ts) => format!("TIMESTAMP '{ts}'"),
        SampledValue::TimestampTz(ts) => format!("TIMESTAMPTZ '{}'", ts.to_rfc3339()),
        SampledValue::Time(time) => format!("TIME '{time}'"),
        SampledValue::Bytes(_) | SampledValue::Array(_) | SampledValue::Document(_) => {
            NULL_LITERAL.to_string()
        }
        SampledValue::Unsupported { type_name, text } => {
            warn!(
                event = "unsupported_value_type",
                column = %column,
                type_name = %type_name,
                value = text.as_deref().unwrap_or("")
            );
            NULL_LITERAL.to_string()
        }
    }
}

fn format_float(number: f64) -> String {
    if number.is_nan() {
        "'NaN'".to_string()
    } else if number.is_infinite() {
        let literal = if number > 0.0 { "'Infinity'" } else { "'-Infinity'" };
        literal.to_string()
    } else {
        number.to_string()
    }
}

fn format_decimal(text: &str, column: &str) -> String {
    match Decimal::from_str(text.trim()) {
        Ok(decimal) => decimal.to_string(),
        Err(err) => {
            warn!(
                event = "decimal_coercion_failed",
                column = %column,
                value = %text,
                error = %err
            );
            NULL_LITERAL.to_string()
        }
    }
}
