use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use dummygen_core::{ColumnDescriptor, Error, Result, SampledValue, TableRef};

use super::queries::{RawColumn, RawTable};

/// How a Postgres value is decoded into a [`SampledValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Numeric,
    Bool,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Time,
    Bytes,
    Array,
    Document,
    Unsupported,
}

pub fn map_tables(raw: Vec<RawTable>) -> Vec<TableRef> {
    raw.into_iter()
        .map(|table| TableRef::new(table.schema, table.name))
        .collect()
}

pub fn map_columns(raw: Vec<RawColumn>) -> Vec<ColumnDescriptor> {
    raw.into_iter()
        .map(|col| {
            let store_assigned = col.is_identity
                || col.is_generated
                || col
                    .column_default
                    .as_deref()
                    .is_some_and(|default| default.starts_with("nextval("));

            let descriptor = ColumnDescriptor::new(col.name, col.data_type)
                .with_udt(col.udt_schema, col.udt_name);
            let is_identity = descriptor.is_identity || store_assigned;
            descriptor.with_identity(is_identity)
        })
        .collect()
}

/// Classify a Postgres type name as reported by the driver.
pub fn value_kind(type_name: &str) -> ValueKind {
    if type_name.ends_with("[]") {
        return ValueKind::Array;
    }

    match type_name {
        "INT2" => ValueKind::SmallInt,
        "INT4" => ValueKind::Int,
        "INT8" => ValueKind::BigInt,
        "FLOAT4" => ValueKind::Real,
        "FLOAT8" => ValueKind::Double,
        "NUMERIC" | "MONEY" => ValueKind::Numeric,
        "BOOL" => ValueKind::Bool,
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "UUID" | "CITEXT" => ValueKind::Text,
        "DATE" => ValueKind::Date,
        "TIMESTAMP" => ValueKind::Timestamp,
        "TIMESTAMPTZ" => ValueKind::TimestampTz,
        "TIME" => ValueKind::Time,
        "BYTEA" => ValueKind::Bytes,
        "JSON" | "JSONB" | "HSTORE" => ValueKind::Document,
        _ => ValueKind::Unsupported,
    }
}

/// Decode the `value` column of a frequency row.
pub fn decode_sampled_value(row: &PgRow) -> Result<SampledValue> {
    let type_name = row.column(0).type_info().name().to_string();
    let text: Option<String> = row.try_get("value_text").map_err(decode_error)?;

    let value = match value_kind(&type_name) {
        ValueKind::SmallInt => SampledValue::Integer(i64::from(get::<i16>(row)?)),
        ValueKind::Int => SampledValue::Integer(i64::from(get::<i32>(row)?)),
        ValueKind::BigInt => SampledValue::Integer(get::<i64>(row)?),
        ValueKind::Real => SampledValue::Float(f64::from(get::<f32>(row)?)),
        ValueKind::Double => SampledValue::Float(get::<f64>(row)?),
        ValueKind::Numeric => SampledValue::Decimal(text.unwrap_or_default()),
        ValueKind::Bool => SampledValue::Boolean(get::<bool>(row)?),
        ValueKind::Text => SampledValue::Text(text.unwrap_or_default()),
        ValueKind::Date => SampledValue::Date(get::<NaiveDate>(row)?),
        ValueKind::Timestamp => SampledValue::Timestamp(get::<NaiveDateTime>(row)?),
        ValueKind::TimestampTz => SampledValue::TimestampTz(get::<DateTime<Utc>>(row)?),
        ValueKind::Time => SampledValue::Time(get::<NaiveTime>(row)?),
        ValueKind::Bytes => SampledValue::Bytes(get::<Vec<u8>>(row)?),
        ValueKind::Array => SampledValue::Array(text.unwrap_or_default()),
        ValueKind::Document => SampledValue::Document(text.unwrap_or_default()),
        ValueKind::Unsupported => SampledValue::Unsupported { type_name, text },
    };

    Ok(value)
}

fn get<'r, T>(row: &'r PgRow) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<T, _>("value").map_err(decode_error)
}

fn decode_error(err: sqlx::Error) -> Error {
    Error::Db(format!("failed to decode sampled value: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_column(name: &str, data_type: &str) -> RawColumn {
        RawColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            udt_schema: "pg_catalog".to_string(),
            udt_name: data_type.to_string(),
            is_identity: false,
            is_generated: false,
            column_default: None,
        }
    }

    #[test]
    fn classifies_driver_type_names() {
        assert_eq!(value_kind("INT4"), ValueKind::Int);
        assert_eq!(value_kind("TIMESTAMPTZ"), ValueKind::TimestampTz);
        assert_eq!(value_kind("UUID"), ValueKind::Text);
        assert_eq!(value_kind("INT4[]"), ValueKind::Array);
        assert_eq!(value_kind("JSONB"), ValueKind::Document);
        assert_eq!(value_kind("INET"), ValueKind::Unsupported);
    }

    #[test]
    fn store_assigned_columns_are_flagged_as_identity() {
        let mut serial = raw_column("ticket_no", "integer");
        serial.column_default = Some("nextval('tickets_ticket_no_seq'::regclass)".to_string());
        let mut generated = raw_column("total", "numeric");
        generated.is_generated = true;
        let mut identity = raw_column("pk", "bigint");
        identity.is_identity = true;

        let columns = map_columns(vec![
            raw_column("id", "uuid"),
            serial,
            generated,
            identity,
            raw_column("plate", "text"),
        ]);

        let flags: Vec<bool> = columns.iter().map(|col| col.is_identity).collect();
        assert_eq!(flags, vec![true, true, true, true, false]);
    }

    #[test]
    fn keeps_underlying_type_for_enum_columns() {
        let mut raw = raw_column("status", "USER-DEFINED");
        raw.udt_schema = "public".to_string();
        raw.udt_name = "order_status".to_string();

        let columns = map_columns(vec![raw]);
        assert_eq!(columns[0].declared_type, "USER-DEFINED");
        assert_eq!(columns[0].cast_type(), "public.order_status");
    }
}
