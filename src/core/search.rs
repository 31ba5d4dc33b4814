//! Dynamic member search built from optional parameters.

use crate::core::composer::{compose, conjoin, ConditionBuilder, Criterion};
use crate::core::expr::{member, Condition, Path};
use crate::core::query::MemberQuery;
use serde::{Deserialize, Serialize};

/// Optional search parameters. `None` means the field is not constrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSearch {
    pub username: Option<String>,
    pub age: Option<i64>,
}

impl MemberSearch {
    pub fn new(username: Option<&str>, age: Option<i64>) -> Self {
        Self {
            username: username.map(str::to_string),
            age,
        }
    }

    /// Reads `username` and `age` from loosely typed parameters.
    ///
    /// Unknown keys, nulls and values of the wrong type are skipped.
    pub fn from_params(params: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut search = Self::default();
        for (key, value) in params {
            match (key.as_str(), value) {
                ("username", serde_json::Value::String(s)) => search.username = Some(s.clone()),
                ("age", v) if v.as_i64().is_some() => search.age = v.as_i64(),
                (_, serde_json::Value::Null) => {}
                (key, value) => {
                    tracing::debug!("ignoring search parameter {}={}", key, value);
                }
            }
        }
        search
    }

    pub fn username_eq(&self) -> Option<Condition> {
        self.username.as_deref().map(|u| member::username().eq(u))
    }

    pub fn age_eq(&self) -> Option<Condition> {
        self.age.map(|a| member::age().eq(a))
    }

    /// Both constraints together, or whichever one is present.
    pub fn all_eq(&self) -> Option<Condition> {
        conjoin([self.username_eq(), self.age_eq()])
    }

    /// The search as field criteria.
    pub fn criteria(&self) -> Vec<Criterion> {
        vec![
            Criterion::equal(Path::MemberUsername, self.username.clone()),
            Criterion::equal(Path::MemberAge, self.age),
        ]
    }

    /// Where-parameter style: absent predicates are dropped before combining.
    pub fn condition(&self) -> Condition {
        compose([self.username_eq(), self.age_eq()])
    }

    /// Builder style: each present parameter is and-ed in turn.
    pub fn builder_condition(&self) -> Condition {
        let mut builder = ConditionBuilder::new();
        if let Some(username) = &self.username {
            builder.and(member::username().eq(username.as_str()));
        }
        if let Some(age) = self.age {
            builder.and(member::age().eq(age));
        }
        builder.build()
    }

    pub fn query(&self) -> MemberQuery {
        MemberQuery::new().where_all([self.username_eq(), self.age_eq()])
    }
}
