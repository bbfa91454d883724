//! Fit a produced value to the column that will receive it.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use dbseed_core::{ColumnSchema, GeneratedValue, SafeType};

use crate::providers::defaults::decimal_shape;

/// Convert `value` into a form `column` accepts, or `None` when it cannot.
///
/// Text lengths are not enforced here; the dispatcher truncates last.
pub fn coerce(value: GeneratedValue, column: &ColumnSchema) -> Option<GeneratedValue> {
    if value.is_null() {
        return column.is_nullable.then_some(GeneratedValue::Null);
    }

    let ty = column.data_type;
    if ty.is_textual() {
        return Some(match value {
            GeneratedValue::Text(text) => GeneratedValue::Text(text),
            other => GeneratedValue::Text(other.render()),
        });
    }
    if ty.is_integer() {
        return to_integer(&value, ty).map(GeneratedValue::Int);
    }
    if ty.is_exact_numeric() {
        return to_decimal(&value, column).map(GeneratedValue::Decimal);
    }
    if ty.is_float() {
        return to_float(&value).map(GeneratedValue::Float);
    }

    match ty {
        SafeType::Bit => to_bool(&value).map(GeneratedValue::Bool),
        SafeType::Uuid => match value {
            GeneratedValue::Uuid(id) => Some(GeneratedValue::Uuid(id)),
            GeneratedValue::Text(text) => Uuid::parse_str(text.trim()).ok().map(GeneratedValue::Uuid),
            _ => None,
        },
        SafeType::Date => to_timestamp(&value).map(|at| GeneratedValue::Date(at.date())),
        SafeType::Time => match value {
            GeneratedValue::Time(time) => Some(GeneratedValue::Time(time)),
            GeneratedValue::Text(text) => NaiveTime::parse_from_str(text.trim(), "%H:%M:%S")
                .ok()
                .map(GeneratedValue::Time),
            other => to_timestamp(&other).map(|at| GeneratedValue::Time(at.time())),
        },
        SafeType::Timestamp | SafeType::TimestampTz => {
            to_timestamp(&value).map(GeneratedValue::Timestamp)
        }
        _ => None,
    }
}

fn to_integer(value: &GeneratedValue, ty: SafeType) -> Option<i64> {
    let raw = match value {
        GeneratedValue::Int(n) => *n,
        GeneratedValue::Bool(flag) => i64::from(*flag),
        GeneratedValue::Decimal(d) => d.trunc().to_i64()?,
        GeneratedValue::Float(f) if f.is_finite() => {
            let truncated = f.trunc();
            if truncated < i64::MIN as f64 || truncated > i64::MAX as f64 {
                return None;
            }
            truncated as i64
        }
        GeneratedValue::Text(text) => {
            let digits = text.trim();
            if digits.is_empty() || !digits.trim_start_matches('-').chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok()?
        }
        _ => return None,
    };
    let (min, max) = ty.integer_range()?;
    (min..=max).contains(&raw).then_some(raw)
}

fn to_decimal(value: &GeneratedValue, column: &ColumnSchema) -> Option<Decimal> {
    let raw = match value {
        GeneratedValue::Decimal(d) => *d,
        GeneratedValue::Int(n) => Decimal::from(*n),
        GeneratedValue::Float(f) => Decimal::try_from(*f).ok()?,
        GeneratedValue::Text(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    let (precision, scale) = decimal_shape(column);
    let rounded = raw.round_dp(scale);
    let integer_digits = precision - scale;
    let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0);
    (rounded.abs() < limit).then_some(rounded)
}

fn to_float(value: &GeneratedValue) -> Option<f64> {
    match value {
        GeneratedValue::Float(f) => Some(*f),
        GeneratedValue::Int(n) => Some(*n as f64),
        GeneratedValue::Decimal(d) => d.to_f64(),
        GeneratedValue::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
    .filter(|f: &f64| f.is_finite())
}

fn to_bool(value: &GeneratedValue) -> Option<bool> {
    match value {
        GeneratedValue::Bool(flag) => Some(*flag),
        GeneratedValue::Int(0) => Some(false),
        GeneratedValue::Int(1) => Some(true),
        GeneratedValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "f" | "no" => Some(false),
            "1" | "true" | "t" | "yes" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn to_timestamp(value: &GeneratedValue) -> Option<NaiveDateTime> {
    match value {
        GeneratedValue::Timestamp(at) => Some(*at),
        GeneratedValue::Date(date) => date.and_hms_opt(0, 0, 0),
        GeneratedValue::Text(text) => {
            let text = text.trim();
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(text, "%Y-%m-%d")
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> GeneratedValue {
        GeneratedValue::Text(value.to_string())
    }

    #[test]
    fn digit_strings_become_integers() {
        let column = ColumnSchema::new("tax_number", SafeType::BigInt);
        assert_eq!(
            coerce(text("1234567890"), &column),
            Some(GeneratedValue::Int(1_234_567_890))
        );
        assert_eq!(coerce(text("12-34"), &column), None);
        assert_eq!(coerce(text("john@example.com"), &column), None);
    }

    #[test]
    fn integers_outside_storage_range_decline() {
        let tiny = ColumnSchema::new("level", SafeType::TinyInt);
        assert_eq!(coerce(GeneratedValue::Int(256), &tiny), None);
        assert_eq!(coerce(GeneratedValue::Int(-1), &tiny), None);
        assert_eq!(coerce(GeneratedValue::Int(200), &tiny), Some(GeneratedValue::Int(200)));

        let int = ColumnSchema::new("tax_number", SafeType::Int);
        assert_eq!(coerce(text("98765432101"), &int), None);
    }

    #[test]
    fn decimals_round_to_scale_and_fit_precision() {
        let column = ColumnSchema::new("price", SafeType::Decimal).with_precision(6, 2);
        assert_eq!(
            coerce(GeneratedValue::Decimal(Decimal::new(123_456, 3)), &column),
            Some(GeneratedValue::Decimal(Decimal::new(12_346, 2)))
        );
        assert_eq!(coerce(GeneratedValue::Int(10_000), &column), None);
        assert_eq!(
            coerce(text("42.5"), &column),
            Some(GeneratedValue::Decimal(Decimal::new(4250, 2)))
        );
    }

    #[test]
    fn any_value_stringifies_into_text() {
        let column = ColumnSchema::new("code", SafeType::VarChar);
        assert_eq!(coerce(GeneratedValue::Int(7), &column), Some(text("7")));
        assert_eq!(coerce(GeneratedValue::Bool(true), &column), Some(text("1")));
    }

    #[test]
    fn booleans_and_uuids() {
        let bit = ColumnSchema::new("active", SafeType::Bit);
        assert_eq!(coerce(GeneratedValue::Int(1), &bit), Some(GeneratedValue::Bool(true)));
        assert_eq!(coerce(GeneratedValue::Int(2), &bit), None);

        let uuid = ColumnSchema::new("external_id", SafeType::Uuid);
        let raw = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert!(matches!(coerce(text(raw), &uuid), Some(GeneratedValue::Uuid(_))));
        assert_eq!(coerce(text("not-a-uuid"), &uuid), None);
    }

    #[test]
    fn null_only_lands_in_nullable_columns() {
        let nullable = ColumnSchema::new("notes", SafeType::Text);
        assert_eq!(coerce(GeneratedValue::Null, &nullable), Some(GeneratedValue::Null));
        let required = ColumnSchema::new("name", SafeType::Text).not_null();
        assert_eq!(coerce(GeneratedValue::Null, &required), None);
    }

    #[test]
    fn dates_project_from_timestamps() {
        let column = ColumnSchema::new("born_on", SafeType::Date);
        assert_eq!(
            coerce(text("2021-03-04T10:11:12"), &column),
            NaiveDate::from_ymd_opt(2021, 3, 4).map(GeneratedValue::Date)
        );
    }
}
