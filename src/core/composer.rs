//! Composition of optional filter criteria into a single predicate.
//!
//! An absent criterion means "no constraint". The fold below never hands an
//! absent operand to `and`: a lone predicate comes back unchanged and an empty
//! input yields `Predicate::always()`.

use crate::core::expr::{CmpOp, Condition, Expr, Path, Value};
use crate::domain::ports::Predicate;

/// Conjunction of the present predicates, or `None` when every input is absent.
pub fn conjoin<P: Predicate>(parts: impl IntoIterator<Item = Option<P>>) -> Option<P> {
    parts.into_iter().flatten().fold(None, |acc, p| match acc {
        None => Some(p),
        Some(acc) => Some(acc.and(p)),
    })
}

/// Conjunction of the present predicates; matches everything when none are present.
pub fn compose<P: Predicate>(parts: impl IntoIterator<Item = Option<P>>) -> P {
    conjoin(parts).unwrap_or_else(P::always)
}

/// A named-field comparison whose value may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub path: Path,
    pub op: CmpOp,
    pub value: Option<Value>,
}

impl Criterion {
    pub fn new(path: Path, op: CmpOp, value: Option<Value>) -> Self {
        Self { path, op, value }
    }

    pub fn equal(path: Path, value: Option<impl Into<Value>>) -> Self {
        Self::new(path, CmpOp::Eq, value.map(Into::into))
    }

    /// Present means a value of the kind the column holds; missing, NULL and
    /// ill-typed values all count as absent.
    pub fn is_present(&self) -> bool {
        self.value.as_ref().is_some_and(|v| self.path.accepts(v))
    }

    pub fn to_condition(&self) -> Option<Condition> {
        let value = self.value.as_ref()?;
        if !self.path.accepts(value) {
            if !value.is_null() {
                tracing::debug!(
                    "ignoring criterion {} {} {}: wrong value type",
                    self.path,
                    self.op.symbol(),
                    value
                );
            }
            return None;
        }
        Some(Condition::compare(
            self.op,
            Expr::Path(self.path),
            Expr::Const(value.clone()),
        ))
    }
}

pub fn compose_criteria<'a>(criteria: impl IntoIterator<Item = &'a Criterion>) -> Condition {
    compose(criteria.into_iter().map(Criterion::to_condition))
}

/// Incremental AND/OR builder that ignores absent operands.
#[derive(Debug, Clone, Default)]
pub struct ConditionBuilder {
    condition: Option<Condition>,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(&mut self, condition: impl Into<Option<Condition>>) -> &mut Self {
        if let Some(c) = condition.into() {
            self.condition = Some(match self.condition.take() {
                Some(existing) => existing.and(c),
                None => c,
            });
        }
        self
    }

    pub fn or(&mut self, condition: impl Into<Option<Condition>>) -> &mut Self {
        if let Some(c) = condition.into() {
            self.condition = Some(match self.condition.take() {
                Some(existing) => existing.or(c),
                None => c,
            });
        }
        self
    }

    pub fn has_value(&self) -> bool {
        self.condition.is_some()
    }

    pub fn build(&self) -> Condition {
        self.condition.clone().unwrap_or(Condition::True)
    }
}
