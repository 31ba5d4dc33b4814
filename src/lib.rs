pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::InMemoryStore;
pub use config::FixtureConfig;
pub use crate::core::{
    composer::{compose, conjoin, ConditionBuilder, Criterion},
    expr::{member, team, CaseBuilder, Condition, Expr, SubQuery, Value},
    factory::QueryFactory,
    query::MemberQuery,
    search::MemberSearch,
};
pub use domain::ports::{MemberStore, Predicate};
pub use utils::error::{QueryError, Result};
