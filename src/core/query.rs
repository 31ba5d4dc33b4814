use crate::core::composer::compose;
use crate::core::expr::{Condition, Expr, OrderSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinTarget {
    /// Follows `member.team`.
    Association,
    /// Any team, matched only through the `on` condition.
    Unrelated,
    /// Cartesian product of members and teams, filtered by `where`.
    Theta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub target: JoinTarget,
    pub on: Condition,
    pub fetch: bool,
}

/// A select over members, optionally joined with teams.
///
/// The builder only records the query; see [`crate::core::engine`] for
/// evaluation and [`crate::core::factory::QueryFactory`] for running it
/// against a store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemberQuery {
    pub join: Option<Join>,
    pub filter: Condition,
    pub order: Vec<OrderSpec>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub group_by: Vec<Expr>,
}

impl MemberQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_join(mut self, kind: JoinKind, target: JoinTarget) -> Self {
        self.join = Some(Join {
            kind,
            target,
            on: Condition::True,
            fetch: false,
        });
        self
    }

    /// `join member.team team`
    pub fn join_team(self) -> Self {
        self.with_join(JoinKind::Inner, JoinTarget::Association)
    }

    /// `left join member.team team`
    pub fn left_join_team(self) -> Self {
        self.with_join(JoinKind::Left, JoinTarget::Association)
    }

    /// `left join team on ...` with no association between the two.
    pub fn left_join_unrelated_team(self) -> Self {
        self.with_join(JoinKind::Left, JoinTarget::Unrelated)
    }

    /// `join team on ...` with no association between the two.
    pub fn join_unrelated_team(self) -> Self {
        self.with_join(JoinKind::Inner, JoinTarget::Unrelated)
    }

    /// `from member, team`
    pub fn theta_team(self) -> Self {
        self.with_join(JoinKind::Inner, JoinTarget::Theta)
    }

    /// Adds a condition to the current join. Without a join this is a no-op.
    pub fn on(mut self, condition: Condition) -> Self {
        match self.join.as_mut() {
            Some(join) => join.on = std::mem::take(&mut join.on).and(condition),
            None => tracing::warn!("on({}) ignored: query has no join", condition),
        }
        self
    }

    /// Loads the joined team into each returned member.
    pub fn fetch_join(mut self) -> Self {
        match self.join.as_mut() {
            Some(join) => join.fetch = true,
            None => tracing::warn!("fetch_join() ignored: query has no join"),
        }
        self
    }

    pub fn where_(mut self, condition: Condition) -> Self {
        self.filter = std::mem::take(&mut self.filter).and(condition);
        self
    }

    /// Adds every present condition; absent ones are skipped.
    pub fn where_all(self, conditions: impl IntoIterator<Item = Option<Condition>>) -> Self {
        self.where_(compose(conditions))
    }

    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.order.push(order);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn is_fetch_join(&self) -> bool {
        self.join.as_ref().is_some_and(|j| j.fetch)
    }
}
