use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Synthesized (or sampled) value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            GeneratedValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    /// Text rendering used when a value lands in a character column.
    pub fn render(&self) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Bool(value) => u8::from(*value).to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Decimal(value) => value.to_string(),
            GeneratedValue::Text(value) => value.clone(),
            GeneratedValue::Uuid(value) => value.to_string(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Time(value) => value.format("%H:%M:%S").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_booleans_as_bits() {
        assert_eq!(GeneratedValue::Bool(true).render(), "1");
        assert_eq!(GeneratedValue::Bool(false).render(), "0");
    }

    #[test]
    fn renders_decimals_with_scale() {
        let value = GeneratedValue::Decimal(Decimal::new(12345, 2));
        assert_eq!(value.render(), "123.45");
        assert_eq!(value.as_decimal(), Some(Decimal::new(12345, 2)));
    }
}
