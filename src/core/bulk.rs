use crate::core::eval::{Dataset, Row};
use crate::core::expr::{Condition, Expr, Path, Value};
use crate::domain::model::Member;
use crate::utils::error::{QueryError, Result};

/// `update member set ... where ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateClause {
    assignments: Vec<(Expr, Expr)>,
    filter: Condition,
}

impl UpdateClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, target: Expr, value: impl Into<Expr>) -> Self {
        self.assignments.push((target, value.into()));
        self
    }

    pub fn where_(mut self, condition: Condition) -> Self {
        self.filter = std::mem::take(&mut self.filter).and(condition);
        self
    }

    /// Members as they look after the update. Every assignment is evaluated
    /// against the row before any of them is applied.
    pub fn apply(&self, data: &Dataset) -> Result<Vec<Member>> {
        let mut updated = Vec::new();
        for member in &data.members {
            let row = Row::new(member, None);
            if !self.filter.matches(&row, data)? {
                continue;
            }
            let mut values = Vec::with_capacity(self.assignments.len());
            for (target, value) in &self.assignments {
                values.push((target, value.eval(&row, data)?));
            }

            let mut changed = member.clone();
            for (target, value) in values {
                assign(&mut changed, target, value)?;
            }
            updated.push(changed);
        }
        tracing::debug!("update where {} touches {} members", self.filter, updated.len());
        Ok(updated)
    }
}

fn assign(member: &mut Member, target: &Expr, value: Value) -> Result<()> {
    match (target, value) {
        (Expr::Path(Path::MemberUsername), Value::Text(s)) => member.username = s,
        (Expr::Path(Path::MemberAge), Value::Int(v)) => member.age = v,
        (Expr::Path(path @ (Path::MemberUsername | Path::MemberAge)), value) => {
            return Err(QueryError::type_mismatch(
                "update",
                format!("cannot assign {} to {}", value, path),
            ))
        }
        (target, _) => {
            return Err(QueryError::type_mismatch(
                "update",
                format!("{} is not an updatable member column", target),
            ))
        }
    }
    Ok(())
}

/// `delete from member where ...`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteClause {
    filter: Condition,
}

impl DeleteClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(mut self, condition: Condition) -> Self {
        self.filter = std::mem::take(&mut self.filter).and(condition);
        self
    }

    /// Members that the delete removes.
    pub fn apply(&self, data: &Dataset) -> Result<Vec<Member>> {
        let mut doomed = Vec::new();
        for member in &data.members {
            if self.filter.matches(&Row::new(member, None), data)? {
                doomed.push(member.clone());
            }
        }
        Ok(doomed)
    }
}
