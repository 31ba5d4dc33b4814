use crate::core::bulk::{DeleteClause, UpdateClause};
use crate::core::eval::Dataset;
use crate::core::expr::{Expr, Selection, Value};
use crate::core::projection::{FromTuple, QueryResults, Tuple};
use crate::core::query::MemberQuery;
use crate::domain::model::{Member, Team};
use crate::domain::ports::MemberStore;
use crate::utils::error::Result;
use serde::de::DeserializeOwned;

/// Runs queries and bulk statements against a [`MemberStore`].
///
/// Each call reads a fresh snapshot, so results always reflect earlier bulk
/// updates and deletes.
pub struct QueryFactory<S: MemberStore> {
    store: S,
}

impl<S: MemberStore> QueryFactory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn snapshot(&self) -> Result<Dataset> {
        let teams = self.store.teams().await?;
        let members = self.store.members().await?;
        Ok(Dataset::new(teams, members))
    }

    pub async fn fetch(&self, query: &MemberQuery) -> Result<Vec<Member>> {
        let data = self.snapshot().await?;
        query.fetch_members(&data)
    }

    pub async fn fetch_one(&self, query: &MemberQuery) -> Result<Option<Member>> {
        let data = self.snapshot().await?;
        query.fetch_one_member(&data)
    }

    pub async fn fetch_results(&self, query: &MemberQuery) -> Result<QueryResults<Member>> {
        let data = self.snapshot().await?;
        query.fetch_member_results(&data)
    }

    pub async fn fetch_pairs(&self, query: &MemberQuery) -> Result<Vec<(Member, Option<Team>)>> {
        let data = self.snapshot().await?;
        query.fetch_member_pairs(&data)
    }

    pub async fn fetch_tuples(
        &self,
        query: &MemberQuery,
        selections: Vec<Selection>,
    ) -> Result<Vec<Tuple>> {
        let data = self.snapshot().await?;
        query.fetch_tuples(&data, &selections)
    }

    pub async fn fetch_values(&self, query: &MemberQuery, expr: Expr) -> Result<Vec<Value>> {
        let data = self.snapshot().await?;
        query.fetch_column(&data, &expr)
    }

    /// Field projection: columns bound to `T` by label.
    pub async fn fetch_fields<T: DeserializeOwned>(
        &self,
        query: &MemberQuery,
        selections: Vec<Selection>,
    ) -> Result<Vec<T>> {
        self.fetch_tuples(query, selections)
            .await?
            .iter()
            .map(Tuple::into_dto::<T>)
            .collect()
    }

    /// Constructor projection: columns bound to `T` by position.
    pub async fn fetch_constructed<T: FromTuple>(
        &self,
        query: &MemberQuery,
        selections: Vec<Selection>,
    ) -> Result<Vec<T>> {
        self.fetch_tuples(query, selections)
            .await?
            .iter()
            .map(T::from_tuple)
            .collect()
    }

    /// Returns the number of members changed.
    pub async fn execute_update(&self, update: &UpdateClause) -> Result<u64> {
        let data = self.snapshot().await?;
        let updated = update.apply(&data)?;
        let count = updated.len() as u64;
        self.store.replace_members(updated, Vec::new()).await?;
        tracing::info!("bulk update changed {} members", count);
        Ok(count)
    }

    /// Returns the number of members removed.
    pub async fn execute_delete(&self, delete: &DeleteClause) -> Result<u64> {
        let data = self.snapshot().await?;
        let doomed = delete.apply(&data)?;
        let count = doomed.len() as u64;
        self.store.replace_members(Vec::new(), doomed).await?;
        tracing::info!("bulk delete removed {} members", count);
        Ok(count)
    }
}
