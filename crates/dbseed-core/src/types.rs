use serde::{Deserialize, Serialize};

/// Column types the engine knows how to synthesize.
///
/// Anything the catalog reports outside this set (binary, xml, json,
/// spatial, arrays, user-defined types) never reaches the rest of the
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Money,
    Real,
    Double,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Char,
    VarChar,
    Text,
    Uuid,
}

impl SafeType {
    /// Resolve a declared type name against the allow-list.
    ///
    /// Accepts Postgres catalog names (`int4`, `bpchar`), their SQL
    /// spellings (`integer`, `character varying(40)`) and the SQL Server
    /// names found in schema dumps (`tinyint`, `nvarchar`, `uniqueidentifier`).
    /// `bit` is rejected: in Postgres it is a bit string, and a boolean
    /// cannot be bound to it.
    pub fn parse(declared: &str) -> Option<Self> {
        let base = declared
            .split('(')
            .next()
            .unwrap_or(declared)
            .trim()
            .to_ascii_lowercase();

        let ty = match base.as_str() {
            "bool" | "boolean" => Self::Bit,
            "tinyint" => Self::TinyInt,
            "int2" | "smallint" => Self::SmallInt,
            "int4" | "int" | "integer" => Self::Int,
            "int8" | "bigint" => Self::BigInt,
            "numeric" | "decimal" => Self::Decimal,
            "money" | "smallmoney" => Self::Money,
            "float4" | "real" => Self::Real,
            "float8" | "double precision" | "float" => Self::Double,
            "date" => Self::Date,
            "time" | "time without time zone" => Self::Time,
            "timestamp" | "timestamp without time zone" | "datetime" | "datetime2"
            | "smalldatetime" => Self::Timestamp,
            "timestamptz" | "timestamp with time zone" | "datetimeoffset" => Self::TimestampTz,
            "bpchar" | "char" | "character" | "nchar" => Self::Char,
            "varchar" | "character varying" | "nvarchar" => Self::VarChar,
            "text" | "ntext" => Self::Text,
            "uuid" | "uniqueidentifier" => Self::Uuid,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Int | Self::BigInt
        )
    }

    pub fn is_exact_numeric(self) -> bool {
        matches!(self, Self::Decimal | Self::Money)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Real | Self::Double)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, Self::Char | Self::VarChar | Self::Text)
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::Timestamp | Self::TimestampTz
        )
    }

    /// Inclusive storage range of an integer subtype.
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            Self::TinyInt => Some((0, 255)),
            Self::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Canonical lower-case name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bit => "bit",
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Decimal => "decimal",
            Self::Money => "money",
            Self::Real => "real",
            Self::Double => "double",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
            Self::Char => "char",
            Self::VarChar => "varchar",
            Self::Text => "text",
            Self::Uuid => "uuid",
        }
    }
}

impl std::fmt::Display for SafeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared maximum length of a character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthLimit {
    Bounded(u32),
    /// `text`, unsized `varchar`, or the `-1` (MAX) sentinel of schema dumps.
    Unbounded,
}

impl LengthLimit {
    /// Interpret a raw catalog length. `None` and negative values mean unbounded.
    pub fn from_catalog(raw: Option<i32>) -> Self {
        match raw {
            Some(len) if len > 0 => Self::Bounded(len as u32),
            _ => Self::Unbounded,
        }
    }

    /// Effective character budget, applying `ceiling` to unbounded columns.
    pub fn effective(self, ceiling: usize) -> usize {
        match self {
            Self::Bounded(len) => len as usize,
            Self::Unbounded => ceiling,
        }
    }
}
