pub mod bulk;
pub mod composer;
pub mod engine;
pub mod eval;
pub mod expr;
pub mod factory;
pub mod projection;
pub mod query;
pub mod render;
pub mod search;

pub use crate::domain::model::{Member, MemberDto, Team, TeamRef, UserDto};
pub use crate::domain::ports::{MemberStore, Predicate};
pub use crate::utils::error::Result;
