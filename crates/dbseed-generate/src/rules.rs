//! Prioritized provider rule chain.
//!
//! Rules are tried in order and the first one that produces a value the
//! column can hold wins: explicit override, foreign key, keyword heuristic,
//! then the type default.

use chrono::NaiveDateTime;
use rand::RngCore;

use dbseed_core::{ColumnSchema, GeneratedValue, LengthLimit};

use crate::coerce::coerce;
use crate::keywords;
use crate::overrides::OverrideMap;
use crate::providers::{Provider, defaults, text};
use crate::reference::{ReferenceCache, fallback_reference};

pub const RULE_OVERRIDE: &str = "override";
pub const RULE_FOREIGN_KEY: &str = "foreign_key";
pub const RULE_KEYWORD: &str = "keyword";
pub const RULE_TYPE_DEFAULT: &str = "type_default";

/// Per-column input to the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub table: &'a str,
    pub column: &'a ColumnSchema,
    pub parent_table: Option<&'a str>,
}

/// Shared state a rule may read while producing a value.
pub struct RuleEnv<'a> {
    pub references: &'a ReferenceCache,
    pub rng: &'a mut dyn RngCore,
    pub now: NaiveDateTime,
    pub text_ceiling: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub value: GeneratedValue,
    /// The value references a parent row that is not known to exist.
    pub dangling: bool,
}

impl Produced {
    fn plain(value: GeneratedValue) -> Self {
        Self {
            value,
            dangling: false,
        }
    }
}

pub trait ProviderRule: Send + Sync {
    fn id(&self) -> &'static str;

    /// `None` declines the column and passes it to the next rule.
    fn produce(&self, ctx: &SynthesisContext<'_>, env: &mut RuleEnv<'_>) -> Option<Produced>;
}

/// Outcome of the dispatcher for one column of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub value: GeneratedValue,
    pub rule: &'static str,
    pub dangling: bool,
}

pub struct OverrideRule {
    overrides: OverrideMap,
}

impl ProviderRule for OverrideRule {
    fn id(&self) -> &'static str {
        RULE_OVERRIDE
    }

    fn produce(&self, ctx: &SynthesisContext<'_>, env: &mut RuleEnv<'_>) -> Option<Produced> {
        let provider = self.overrides.get(ctx.table, &ctx.column.name)?;
        if let Provider::ForeignKey { parent } = provider {
            return Some(resolve_reference(parent, ctx.column, env));
        }
        let raw = provider.generate(env.rng, env.now)?;
        coerce(raw, ctx.column).map(Produced::plain)
    }
}

pub struct ForeignKeyRule;

impl ProviderRule for ForeignKeyRule {
    fn id(&self) -> &'static str {
        RULE_FOREIGN_KEY
    }

    fn produce(&self, ctx: &SynthesisContext<'_>, env: &mut RuleEnv<'_>) -> Option<Produced> {
        let parent = ctx.parent_table?;
        Some(resolve_reference(parent, ctx.column, env))
    }
}

pub struct KeywordRule;

impl ProviderRule for KeywordRule {
    fn id(&self) -> &'static str {
        RULE_KEYWORD
    }

    fn produce(&self, ctx: &SynthesisContext<'_>, env: &mut RuleEnv<'_>) -> Option<Produced> {
        let provider = keywords::lookup(&ctx.column.name, ctx.column.description.as_deref())?;
        let raw = provider.generate(env.rng, env.now)?;
        coerce(raw, ctx.column).map(Produced::plain)
    }
}

pub struct TypeDefaultRule;

impl ProviderRule for TypeDefaultRule {
    fn id(&self) -> &'static str {
        RULE_TYPE_DEFAULT
    }

    fn produce(&self, ctx: &SynthesisContext<'_>, env: &mut RuleEnv<'_>) -> Option<Produced> {
        defaults::for_column(ctx.column, env.rng, env.now, env.text_ceiling).map(Produced::plain)
    }
}

/// Cached parent key when one is known, otherwise a dangling fallback.
fn resolve_reference(parent: &str, column: &ColumnSchema, env: &mut RuleEnv<'_>) -> Produced {
    if let Some(value) = env
        .references
        .sample(parent, env.rng)
        .and_then(|value| coerce(value, column))
    {
        return Produced::plain(value);
    }
    Produced {
        value: fallback_reference(column, env.rng),
        dangling: true,
    }
}

/// The ordered rule chain.
pub struct ProviderRegistry {
    rules: Vec<Box<dyn ProviderRule>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(OverrideMap::new())
    }
}

impl ProviderRegistry {
    pub fn new(overrides: OverrideMap) -> Self {
        Self {
            rules: vec![
                Box::new(OverrideRule { overrides }),
                Box::new(ForeignKeyRule),
                Box::new(KeywordRule),
                Box::new(TypeDefaultRule),
            ],
        }
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    /// Value for one column, or `None` when the column must be left out of
    /// the insert (database-assigned, or every rule declined).
    pub fn synthesize(
        &self,
        ctx: &SynthesisContext<'_>,
        env: &mut RuleEnv<'_>,
    ) -> Option<Synthesized> {
        if ctx.column.is_database_assigned() {
            return None;
        }

        let ceiling = env.text_ceiling;
        self.rules.iter().find_map(|rule| {
            let produced = rule.produce(ctx, env)?;
            Some(Synthesized {
                value: fit_length(produced.value, ctx.column, ceiling)?,
                rule: rule.id(),
                dangling: produced.dangling,
            })
        })
    }
}

/// Truncate text to the column's budget; a zero budget declines the value.
fn fit_length(
    value: GeneratedValue,
    column: &ColumnSchema,
    ceiling: usize,
) -> Option<GeneratedValue> {
    match value {
        GeneratedValue::Text(raw) if column.data_type.is_textual() => {
            let limit = column
                .max_length
                .unwrap_or(LengthLimit::Unbounded)
                .effective(ceiling);
            (limit > 0).then(|| GeneratedValue::Text(text::truncate_chars(&raw, limit)))
        }
        other => Some(other),
    }
}
