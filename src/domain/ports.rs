use crate::domain::model::{Member, NewMember, Team};
use crate::utils::error::Result;
use async_trait::async_trait;

/// A filter that can be combined by conjunction.
///
/// `always()` is the identity of `and`: `always().and(p)` must behave as `p`.
pub trait Predicate: Sized {
    fn always() -> Self;
    fn and(self, other: Self) -> Self;
}

#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn teams(&self) -> Result<Vec<Team>>;
    async fn members(&self) -> Result<Vec<Member>>;
    async fn persist_team(&self, name: &str) -> Result<Team>;
    async fn persist_member(&self, member: NewMember) -> Result<Member>;
    /// Overwrites stored members with the same ids and removes the ones listed in `deleted`.
    async fn replace_members(&self, updated: Vec<Member>, deleted: Vec<Member>) -> Result<()>;
}
