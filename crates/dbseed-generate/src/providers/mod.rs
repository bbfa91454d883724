//! Named value generators and the override directive grammar.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::currency::en::CurrencyCode;
use fake::faker::internet::en::{DomainSuffix, SafeEmail};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use rand::{Rng, RngCore};
use rust_decimal::Decimal;

use dbseed_core::GeneratedValue;

use crate::errors::SeedError;

pub mod defaults;
pub mod text;

/// A value generator assignable to a column by override, keyword or type.
#[derive(Debug, Clone, PartialEq)]
pub enum Provider {
    Email,
    PhoneNumber,
    Company,
    FirstName,
    LastName,
    FullName,
    Address,
    City,
    Country,
    PostalCode,
    Iban,
    Ean13,
    Url,
    CurrencyCode,
    Word,
    Sentence { words: usize },
    ProductName,
    /// Short alphanumeric business code such as `AUTO-0421`.
    Code,
    Boolean,
    Uuid,
    DateThisDecade,
    RandomInt { min: i64, max: i64 },
    Numerify(String),
    Decimal { min: Decimal, max: Decimal, scale: u32 },
    /// Draw from the reference cache of the named parent table.
    ForeignKey { parent: String },
}

impl Provider {
    /// Parse an override directive of the form `name[:args]`.
    pub fn parse(directive: &str) -> Result<Self, SeedError> {
        let directive = directive.trim();
        let (name, args) = match directive.split_once(':') {
            Some((name, args)) => (name.trim(), Some(args.trim())),
            None => (directive, None),
        };

        let provider = match name {
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "company" => Self::Company,
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "name" => Self::FullName,
            "address" => Self::Address,
            "city" => Self::City,
            "country" => Self::Country,
            "postcode" | "zipcode" => Self::PostalCode,
            "iban" => Self::Iban,
            "ean13" => Self::Ean13,
            "url" => Self::Url,
            "currency_code" => Self::CurrencyCode,
            "word" => Self::Word,
            "sentence" => Self::Sentence {
                words: match args {
                    Some(raw) => parse_number(directive, raw)?,
                    None => 6,
                },
            },
            "boolean" => Self::Boolean,
            "uuid4" => Self::Uuid,
            "date_this_decade" => Self::DateThisDecade,
            "random_int" => {
                let raw = required(directive, args)?;
                let (min, max) = raw.split_once(',').ok_or_else(|| {
                    SeedError::InvalidOverride(format!("{directive}: expected MIN,MAX"))
                })?;
                let min: i64 = parse_number(directive, min)?;
                let max: i64 = parse_number(directive, max)?;
                if min > max {
                    return Err(SeedError::InvalidOverride(format!(
                        "{directive}: min {min} exceeds max {max}"
                    )));
                }
                Self::RandomInt { min, max }
            }
            "numerify" => Self::Numerify(required(directive, args)?.to_string()),
            "pyfloat" => parse_pyfloat(directive, args)?,
            "foreign_key" => Self::ForeignKey {
                parent: required(directive, args)?.to_string(),
            },
            _ => {
                return Err(SeedError::InvalidOverride(format!(
                    "unknown provider '{name}'"
                )));
            }
        };
        Ok(provider)
    }

    /// Produce a raw value. `ForeignKey` yields nothing here; it is resolved
    /// against the reference cache by the caller.
    pub fn generate(&self, rng: &mut dyn RngCore, now: NaiveDateTime) -> Option<GeneratedValue> {
        let value = match self {
            Self::Email => GeneratedValue::Text(SafeEmail().fake_with_rng(rng)),
            Self::PhoneNumber => GeneratedValue::Text(PhoneNumber().fake_with_rng(rng)),
            Self::Company => GeneratedValue::Text(CompanyName().fake_with_rng(rng)),
            Self::FirstName => GeneratedValue::Text(FirstName().fake_with_rng(rng)),
            Self::LastName => GeneratedValue::Text(LastName().fake_with_rng(rng)),
            Self::FullName => GeneratedValue::Text(Name().fake_with_rng(rng)),
            Self::Address => {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                GeneratedValue::Text(format!("{number} {street}"))
            }
            Self::City => GeneratedValue::Text(CityName().fake_with_rng(rng)),
            Self::Country => GeneratedValue::Text(CountryName().fake_with_rng(rng)),
            Self::PostalCode => GeneratedValue::Text(ZipCode().fake_with_rng(rng)),
            Self::Iban => GeneratedValue::Text(text::iban(rng)),
            Self::Ean13 => GeneratedValue::Text(text::ean13(rng)),
            Self::Url => {
                let host = text::lexify("????????", rng);
                let suffix: String = DomainSuffix().fake_with_rng(rng);
                GeneratedValue::Text(format!("https://www.{host}.{suffix}"))
            }
            Self::CurrencyCode => GeneratedValue::Text(CurrencyCode().fake_with_rng(rng)),
            Self::Word => GeneratedValue::Text(text::title_word(rng)),
            Self::Sentence { words } => GeneratedValue::Text(text::sentence(*words, rng)),
            Self::ProductName => GeneratedValue::Text(text::product_name(rng)),
            Self::Code => GeneratedValue::Text(text::numerify("AUTO-####", rng)),
            Self::Boolean => GeneratedValue::Bool(rng.random_bool(0.5)),
            Self::Uuid => GeneratedValue::Uuid(defaults::random_uuid(rng)),
            Self::DateThisDecade => GeneratedValue::Date(date_this_decade(now.date(), rng)),
            Self::RandomInt { min, max } => GeneratedValue::Int(rng.random_range(*min..=*max)),
            Self::Numerify(pattern) => GeneratedValue::Text(text::numerify(pattern, rng)),
            Self::Decimal { min, max, scale } => {
                GeneratedValue::Decimal(defaults::decimal_between(*min, *max, *scale, rng))
            }
            Self::ForeignKey { .. } => return None,
        };
        Some(value)
    }
}

fn date_this_decade(today: NaiveDate, rng: &mut dyn RngCore) -> NaiveDate {
    let decade_start = today.year() - today.year().rem_euclid(10);
    let start = NaiveDate::from_ymd_opt(decade_start, 1, 1).unwrap_or(today);
    let span = (today - start).num_days().max(0);
    start + Duration::days(rng.random_range(0..=span))
}

fn required<'a>(directive: &str, args: Option<&'a str>) -> Result<&'a str, SeedError> {
    args.filter(|args| !args.is_empty())
        .ok_or_else(|| SeedError::InvalidOverride(format!("{directive}: missing argument")))
}

fn parse_number<T: std::str::FromStr>(directive: &str, raw: &str) -> Result<T, SeedError> {
    raw.trim()
        .parse()
        .map_err(|_| SeedError::InvalidOverride(format!("{directive}: invalid number '{raw}'")))
}

fn parse_pyfloat(directive: &str, args: Option<&str>) -> Result<Provider, SeedError> {
    let mut scale = 2u32;
    let mut min = Decimal::ZERO;
    let mut max = Decimal::from(10_000);
    let mut positive = false;

    for pair in args.unwrap_or("").split(',').filter(|pair| !pair.trim().is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            SeedError::InvalidOverride(format!("{directive}: expected key=value, got '{pair}'"))
        })?;
        match key.trim() {
            "right_digits" => scale = parse_number(directive, value)?,
            "min_value" => min = parse_number(directive, value)?,
            "max_value" => max = parse_number(directive, value)?,
            "positive" => positive = matches!(value.trim(), "true" | "True" | "1"),
            // Width hints only; the column's precision bounds the value later.
            "left_digits" => {}
            other => {
                return Err(SeedError::InvalidOverride(format!(
                    "{directive}: unknown pyfloat key '{other}'"
                )));
            }
        }
    }

    if positive && min <= Decimal::ZERO {
        min = Decimal::new(1, scale.min(28));
    }
    if min > max {
        return Err(SeedError::InvalidOverride(format!(
            "{directive}: min_value exceeds max_value"
        )));
    }
    Ok(Provider::Decimal {
        min,
        max,
        scale: scale.min(28),
    })
}
