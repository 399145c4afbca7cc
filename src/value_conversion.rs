//! Value conversion between JSON values and `may_postgres`.
//!
//! Bind values travel as `serde_json::Value`s with optional [`ParamType`]
//! hints and are converted into `ToSql` trait objects right before execution.
//! Result rows travel the other way: every column is decoded according to its
//! PostgreSQL type into a `serde_json::Value`.
//!
//! The parameter conversion follows a two-pass pattern:
//! 1. First pass: convert every value into an owned, boxed `ToSql`
//! 2. Second pass: create references to the stored values
//!
//! This pattern ensures that references remain valid within the closure scope.

use crate::executor::LifeError;
use crate::query::{BoundParam, ParamType};
use crate::record::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use may_postgres::types::{ToSql, Type};
use may_postgres::Row;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::str::FromStr;
use uuid::Uuid;

/// Convert bound parameters to `may_postgres` ToSql parameters and run `f` with them.
///
/// # Errors
///
/// Returns `LifeError::ParseError` if a value cannot be converted to its hinted type,
/// or whatever `f` returns.
pub fn with_bound_params<F, R>(bound: &[BoundParam], f: F) -> Result<R, LifeError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, LifeError>,
{
    // First pass: owned values
    let owned: Vec<Box<dyn ToSql>> = bound
        .iter()
        .enumerate()
        .map(|(index, param)| to_sql_value(&param.value, param.hint).map_err(|e| {
            LifeError::ParseError(format!("Parameter {}: {e}", index + 1))
        }))
        .collect::<Result<_, _>>()?;

    // Second pass: references to the stored values
    let params: Vec<&dyn ToSql> = owned.iter().map(|value| &**value).collect();

    f(&params)
}

/// Convert one JSON value into a boxed `ToSql`, honoring the type hint if there is one
pub(crate) fn to_sql_value(value: &Value, hint: Option<ParamType>) -> Result<Box<dyn ToSql>, String> {
    let Some(hint) = hint else {
        return Ok(infer_sql_value(value));
    };

    if value.is_null() {
        return Ok(typed_null(hint));
    }

    let boxed: Box<dyn ToSql> = match hint {
        ParamType::Boolean => Box::new(as_bool(value)?),
        ParamType::SmallInt => {
            let v = as_i64(value)?;
            Box::new(i16::try_from(v).map_err(|_| format!("{v} is out of range for SMALLINT"))?)
        }
        ParamType::Integer => {
            let v = as_i64(value)?;
            Box::new(i32::try_from(v).map_err(|_| format!("{v} is out of range for INTEGER"))?)
        }
        ParamType::BigInt => Box::new(as_i64(value)?),
        ParamType::Real => Box::new(as_f64(value)? as f32),
        ParamType::Double => Box::new(as_f64(value)?),
        ParamType::Numeric => {
            let text = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                other => return Err(format!("expected a number for NUMERIC, got {other}")),
            };
            Box::new(Decimal::from_str(&text).map_err(|e| format!("invalid NUMERIC {text}: {e}"))?)
        }
        ParamType::Text => Box::new(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        ParamType::Json => Box::new(value.clone()),
        ParamType::Uuid => {
            let text = as_str(value)?;
            Box::new(Uuid::parse_str(text).map_err(|e| format!("invalid UUID {text}: {e}"))?)
        }
        ParamType::Date => {
            let text = as_str(value)?;
            Box::new(
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|e| format!("invalid DATE {text}: {e}"))?,
            )
        }
        ParamType::Time => {
            let text = as_str(value)?;
            Box::new(
                NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                    .map_err(|e| format!("invalid TIME {text}: {e}"))?,
            )
        }
        ParamType::Timestamp => {
            let text = as_str(value)?;
            Box::new(
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
                    .map_err(|e| format!("invalid TIMESTAMP {text}: {e}"))?,
            )
        }
        ParamType::TimestampTz => {
            let text = as_str(value)?;
            Box::new(
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| format!("invalid TIMESTAMPTZ {text}: {e}"))?,
            )
        }
        ParamType::Bytea => Box::new(as_bytes(value)?),
    };

    Ok(boxed)
}

/// Pick a SQL type from the shape of the JSON value
fn infer_sql_value(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(None::<String>),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Box::new(i),
            None => Box::new(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Box::new(s.clone()),
        Value::Array(_) | Value::Object(_) => Box::new(value.clone()),
    }
}

fn typed_null(hint: ParamType) -> Box<dyn ToSql> {
    match hint {
        ParamType::Boolean => Box::new(None::<bool>),
        ParamType::SmallInt => Box::new(None::<i16>),
        ParamType::Integer => Box::new(None::<i32>),
        ParamType::BigInt => Box::new(None::<i64>),
        ParamType::Real => Box::new(None::<f32>),
        ParamType::Double => Box::new(None::<f64>),
        ParamType::Numeric => Box::new(None::<Decimal>),
        ParamType::Text => Box::new(None::<String>),
        ParamType::Json => Box::new(None::<Value>),
        ParamType::Uuid => Box::new(None::<Uuid>),
        ParamType::Date => Box::new(None::<NaiveDate>),
        ParamType::Time => Box::new(None::<NaiveTime>),
        ParamType::Timestamp => Box::new(None::<NaiveDateTime>),
        ParamType::TimestampTz => Box::new(None::<DateTime<Utc>>),
        ParamType::Bytea => Box::new(None::<Vec<u8>>),
    }
}

fn as_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(true),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(format!("expected a boolean, got {s:?}")),
        },
        other => Err(format!("expected a boolean, got {other}")),
    }
}

fn as_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| format!("expected an integer, got {n}")),
        Value::String(s) => s.trim().parse().map_err(|_| format!("expected an integer, got {s:?}")),
        other => Err(format!("expected an integer, got {other}")),
    }
}

fn as_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("expected a number, got {n}")),
        Value::String(s) => s.trim().parse().map_err(|_| format!("expected a number, got {s:?}")),
        other => Err(format!("expected a number, got {other}")),
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| format!("expected a string, got {value}"))
}

fn as_bytes(value: &Value) -> Result<Vec<u8>, String> {
    match value {
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| format!("expected a byte, got {item}"))
            })
            .collect(),
        other => Err(format!("expected bytes, got {other}")),
    }
}

/// Convert a `may_postgres` row into a record, decoding each column by its type
///
/// # Errors
///
/// Returns `LifeError::PostgresError` if a column fails to decode, or
/// `LifeError::ParseError` for column types without a JSON mapping.
pub fn record_from_row(row: &Row) -> Result<Record, LifeError> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = column_value(row, idx, column.type_()).map_err(|e| match e {
            LifeError::ParseError(msg) => {
                LifeError::ParseError(format!("Column \"{}\": {msg}", column.name()))
            }
            other => other,
        })?;
        record.insert(column.name(), value);
    }
    Ok(record)
}

fn column_value(row: &Row, idx: usize, ty: &Type) -> Result<Value, LifeError> {
    let value = if *ty == Type::BOOL {
        row.try_get::<usize, Option<bool>>(idx)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<usize, Option<i16>>(idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<usize, Option<i32>>(idx)?.map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<usize, Option<i64>>(idx)?.map(Value::from)
    } else if *ty == Type::OID {
        row.try_get::<usize, Option<u32>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<usize, Option<f32>>(idx)?.map(|v| float_value(f64::from(v)))
    } else if *ty == Type::FLOAT8 {
        row.try_get::<usize, Option<f64>>(idx)?.map(float_value)
    } else if *ty == Type::NUMERIC {
        // Kept as text so no precision is lost
        row.try_get::<usize, Option<Decimal>>(idx)?.map(|d| Value::String(d.to_string()))
    } else if *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
        || *ty == Type::UNKNOWN
    {
        row.try_get::<usize, Option<String>>(idx)?.map(Value::String)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<usize, Option<Value>>(idx)?
    } else if *ty == Type::UUID {
        row.try_get::<usize, Option<Uuid>>(idx)?.map(|u| Value::String(u.to_string()))
    } else if *ty == Type::DATE {
        row.try_get::<usize, Option<NaiveDate>>(idx)?.map(|d| Value::String(d.to_string()))
    } else if *ty == Type::TIME {
        row.try_get::<usize, Option<NaiveTime>>(idx)?.map(|t| Value::String(t.to_string()))
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<usize, Option<NaiveDateTime>>(idx)?
            .map(|ts| Value::String(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<usize, Option<DateTime<Utc>>>(idx)?.map(|ts| Value::String(ts.to_rfc3339()))
    } else if *ty == Type::BYTEA {
        row.try_get::<usize, Option<Vec<u8>>>(idx)?
            .map(|bytes| Value::Array(bytes.into_iter().map(Value::from).collect()))
    } else {
        return Err(LifeError::ParseError(format!("unsupported column type {ty}")));
    };

    Ok(value.unwrap_or(Value::Null))
}

/// NaN and infinities have no JSON number form and are kept as their string spelling
fn float_value(v: f64) -> Value {
    match Number::from_f64(v) {
        Some(n) => Value::Number(n),
        None if v.is_nan() => Value::String("NaN".to_string()),
        None if v.is_sign_positive() => Value::String("Infinity".to_string()),
        None => Value::String("-Infinity".to_string()),
    }
}
