use crate::core::expr::Value;
use crate::domain::model::MemberDto;
use crate::utils::error::{QueryError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A row of a multi-column projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tuple {
    labels: Vec<String>,
    values: Vec<Value>,
}

impl Tuple {
    pub fn new(labels: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(labels.len(), values.len());
        Self { labels, values }
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        let idx = self.labels.iter().position(|l| l == label)?;
        self.values.get(idx)
    }

    pub fn get_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Binds columns to the fields of `T` by label, like a field/setter projection.
    pub fn into_dto<T: DeserializeOwned>(&self) -> Result<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .labels
            .iter()
            .cloned()
            .zip(self.values.iter().map(|v| serde_json::to_value(v)))
            .map(|(label, v)| v.map(|v| (label, v)))
            .collect::<std::result::Result<_, _>>()?;

        serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
            QueryError::ProjectionError {
                message: format!("cannot bind {:?}: {}", self.labels, e),
            }
        })
    }
}

/// Positional binding of a tuple, like a constructor projection.
pub trait FromTuple: Sized {
    fn from_tuple(tuple: &Tuple) -> Result<Self>;
}

fn text_at(tuple: &Tuple, idx: usize) -> Result<String> {
    match tuple.get_at(idx) {
        Some(Value::Text(s)) => Ok(s.clone()),
        other => Err(QueryError::ProjectionError {
            message: format!("column {} is not text: {:?}", idx, other),
        }),
    }
}

fn int_at(tuple: &Tuple, idx: usize) -> Result<i64> {
    match tuple.get_at(idx) {
        Some(Value::Int(v)) => Ok(*v),
        other => Err(QueryError::ProjectionError {
            message: format!("column {} is not an integer: {:?}", idx, other),
        }),
    }
}

impl FromTuple for MemberDto {
    fn from_tuple(tuple: &Tuple) -> Result<Self> {
        if tuple.len() != 2 {
            return Err(QueryError::ProjectionError {
                message: format!("MemberDto takes 2 columns, got {}", tuple.len()),
            });
        }
        Ok(MemberDto {
            username: text_at(tuple, 0)?,
            age: int_at(tuple, 1)?,
        })
    }
}

impl FromTuple for Tuple {
    fn from_tuple(tuple: &Tuple) -> Result<Self> {
        Ok(tuple.clone())
    }
}

/// One page of results together with the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResults<T> {
    pub total: usize,
    pub limit: Option<usize>,
    pub offset: usize,
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::UserDto;

    fn tuple(labels: &[&str], values: Vec<Value>) -> Tuple {
        Tuple::new(labels.iter().map(|l| l.to_string()).collect(), values)
    }

    #[test]
    fn test_into_dto_binds_by_label() {
        let t = tuple(&["name", "age"], vec!["member1".into(), 40.into()]);
        let dto: UserDto = t.into_dto().unwrap();
        assert_eq!(
            dto,
            UserDto {
                name: "member1".to_string(),
                age: 40
            }
        );
    }

    #[test]
    fn test_into_dto_reports_missing_field() {
        let t = tuple(&["username", "age"], vec!["member1".into(), 40.into()]);
        let err = t.into_dto::<UserDto>().unwrap_err();
        assert!(matches!(err, QueryError::ProjectionError { .. }));
    }

    #[test]
    fn test_member_dto_from_tuple_is_positional() {
        let t = tuple(&["a", "b"], vec!["member2".into(), 20.into()]);
        let dto = MemberDto::from_tuple(&t).unwrap();
        assert_eq!(dto.username, "member2");
        assert_eq!(dto.age, 20);

        let wrong = tuple(&["a", "b"], vec![20.into(), "member2".into()]);
        assert!(MemberDto::from_tuple(&wrong).is_err());
    }
}
