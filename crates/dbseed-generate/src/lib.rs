//! Synthetic data generation engine for dbseed.
//!
//! Orders tables by their foreign keys, suspends constraint enforcement,
//! synthesizes rows through a prioritized provider rule chain and inserts
//! them one transaction per table, keeping a cache of known primary keys so
//! child tables reference rows that actually exist.

pub mod coerce;
pub mod constraints;
pub mod engine;
pub mod errors;
pub mod keywords;
pub mod memory;
pub mod model;
pub mod overrides;
pub mod postgres;
pub mod providers;
pub mod reference;
pub mod rules;
pub mod target;

pub use constraints::{ConstraintManager, ConstraintState};
pub use engine::{RunPlan, SeedEngine};
pub use errors::SeedError;
pub use model::{RunReport, SeedOptions, TableOutcome, TableReport};
pub use overrides::OverrideMap;
pub use postgres::PostgresTarget;
pub use providers::Provider;
pub use reference::ReferenceCache;
pub use rules::{ProviderRegistry, ProviderRule, RuleEnv, Synthesized, SynthesisContext};
pub use target::{RowBatch, SeedTarget};
