use chrono::{Duration, NaiveDateTime};
use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use uuid::Uuid;

use dbseed_core::{ColumnSchema, GeneratedValue, LengthLimit, SafeType};

use super::text;

pub const DEFAULT_PRECISION: u32 = 18;
pub const DEFAULT_SCALE: u32 = 2;
const MAX_DECIMAL_PRECISION: u32 = 28;
const DECIMAL_CAP: i128 = 10_000;
const FLOAT_CAP: f64 = 10_000.0;
const RECENT_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

/// Upper bound used for synthesized integers, inside the subtype's storage range.
pub fn integer_bound(ty: SafeType) -> i64 {
    match ty {
        SafeType::TinyInt => 255,
        SafeType::SmallInt => 32_000,
        SafeType::Int => 100_000,
        _ => 1_000_000,
    }
}

pub fn random_uuid(rng: &mut dyn RngCore) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// Uniform decimal in `[min, max]` with exactly `scale` fractional digits.
pub fn decimal_between(min: Decimal, max: Decimal, scale: u32, rng: &mut dyn RngCore) -> Decimal {
    let scale = scale.min(MAX_DECIMAL_PRECISION);
    let mut lo = min;
    lo.rescale(scale);
    let mut hi = max;
    hi.rescale(scale);
    let (lo, hi) = (lo.mantissa(), hi.mantissa());
    if lo >= hi {
        return Decimal::try_from_i128_with_scale(lo, scale).unwrap_or(min);
    }
    let mantissa = rng.random_range(lo..=hi);
    Decimal::try_from_i128_with_scale(mantissa, scale).unwrap_or(min)
}

/// Effective precision and scale of an exact numeric column.
pub fn decimal_shape(column: &ColumnSchema) -> (u32, u32) {
    let precision = column
        .numeric_precision
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_PRECISION)
        .min(MAX_DECIMAL_PRECISION);
    let scale = column.numeric_scale.unwrap_or(DEFAULT_SCALE).min(precision);
    (precision, scale)
}

/// Value chosen purely from the column's declared type.
///
/// `None` when the declared shape admits no value, such as a zero-width
/// character column; the column is then left to its database default.
pub fn for_column(
    column: &ColumnSchema,
    rng: &mut dyn RngCore,
    now: NaiveDateTime,
    text_ceiling: usize,
) -> Option<GeneratedValue> {
    let value = match column.data_type {
        SafeType::Bit => GeneratedValue::Bool(rng.random_bool(0.5)),
        ty if ty.is_integer() => GeneratedValue::Int(rng.random_range(0..=integer_bound(ty))),
        SafeType::Decimal | SafeType::Money => {
            let (precision, scale) = decimal_shape(column);
            let digits_cap = 10i128.pow(precision) - 1;
            let value_cap = DECIMAL_CAP * 10i128.pow(scale);
            let mantissa = rng.random_range(0..=digits_cap.min(value_cap));
            GeneratedValue::Decimal(
                Decimal::try_from_i128_with_scale(mantissa, scale).unwrap_or(Decimal::ZERO),
            )
        }
        SafeType::Real | SafeType::Double => {
            let raw: f64 = rng.random_range(0.0..FLOAT_CAP);
            GeneratedValue::Float((raw * 100.0).round() / 100.0)
        }
        ty if ty.is_temporal() => {
            let at = now - Duration::seconds(rng.random_range(0..=RECENT_WINDOW_SECS));
            match ty {
                SafeType::Date => GeneratedValue::Date(at.date()),
                SafeType::Time => GeneratedValue::Time(at.time()),
                _ => GeneratedValue::Timestamp(at),
            }
        }
        SafeType::Uuid => GeneratedValue::Uuid(random_uuid(rng)),
        _ => {
            let limit = column
                .max_length
                .unwrap_or(LengthLimit::Unbounded)
                .effective(text_ceiling);
            if limit == 0 {
                return None;
            }
            let raw = if limit < 10 {
                text::lexify("????", rng)
            } else if limit < 50 {
                text::title_word(rng)
            } else {
                text::sentence(5, rng)
            };
            GeneratedValue::Text(text::truncate_chars(&raw, limit))
        }
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn tinyint_stays_in_one_byte() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let column = ColumnSchema::new("flags", SafeType::TinyInt);
        for _ in 0..500 {
            let n = for_column(&column, &mut rng, now(), 100)
                .and_then(|v| v.as_i64())
                .unwrap();
            assert!((0..=255).contains(&n));
        }
    }

    #[test]
    fn decimals_respect_precision_and_scale() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let column = ColumnSchema::new("ratio", SafeType::Decimal).with_precision(5, 3);
        for _ in 0..500 {
            let value = for_column(&column, &mut rng, now(), 100)
                .and_then(|v| v.as_decimal())
                .unwrap();
            assert_eq!(value.scale(), 3);
            assert!(value < Decimal::from(100));
            assert!(value >= Decimal::ZERO);
        }
    }

    #[test]
    fn unknown_decimal_shape_uses_defaults_and_cap() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let column = ColumnSchema::new("amount", SafeType::Money);
        for _ in 0..200 {
            let value = for_column(&column, &mut rng, now(), 100)
                .and_then(|v| v.as_decimal())
                .unwrap();
            assert_eq!(value.scale(), DEFAULT_SCALE);
            assert!(value <= Decimal::from(10_000));
        }
    }

    #[test]
    fn text_follows_declared_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        for len in [1u32, 3, 9, 12, 49, 80] {
            let column = ColumnSchema::new("label", SafeType::VarChar).with_max_length(len);
            for _ in 0..20 {
                let value = for_column(&column, &mut rng, now(), 100).unwrap();
                let text = value.as_str().unwrap();
                assert!(text.chars().count() <= len as usize, "{text} exceeds {len}");
                assert!(!text.is_empty());
            }
        }

        let unbounded = ColumnSchema::new("notes", SafeType::Text);
        let value = for_column(&unbounded, &mut rng, now(), 30).unwrap();
        assert!(value.as_str().unwrap().chars().count() <= 30);
    }

    #[test]
    fn zero_width_text_has_no_default() {
        let mut rng = ChaCha8Rng::seed_from_u64(16);
        let column = ColumnSchema::new("filler", SafeType::Char).with_max_length(0);
        assert_eq!(for_column(&column, &mut rng, now(), 100), None);

        let unbounded = ColumnSchema::new("notes", SafeType::Text);
        assert_eq!(for_column(&unbounded, &mut rng, now(), 0), None);
    }

    #[test]
    fn temporal_values_are_recent() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let column = ColumnSchema::new("created", SafeType::TimestampTz);
        for _ in 0..50 {
            let Some(GeneratedValue::Timestamp(at)) = for_column(&column, &mut rng, now(), 100) else {
                panic!("expected timestamp");
            };
            assert!(at <= now());
            assert!(at >= now() - Duration::days(366));
        }
    }

    #[test]
    fn decimal_between_keeps_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        for _ in 0..100 {
            let value = decimal_between(Decimal::from(10), Decimal::from(20), 2, &mut rng);
            assert!(value >= Decimal::from(10) && value <= Decimal::from(20));
            assert_eq!(value.scale(), 2);
        }
    }
}
