use crate::core::expr::{
    Aggregate, CaseExpr, Condition, Expr, Path, SubProjection, SubQuery, Value,
};
use crate::domain::model::{Member, Team, TeamId};
use crate::utils::error::{QueryError, Result};

/// Snapshot of the store that a query is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub teams: Vec<Team>,
    pub members: Vec<Member>,
}

impl Dataset {
    pub fn new(teams: Vec<Team>, members: Vec<Member>) -> Self {
        Self { teams, members }
    }

    pub fn team(&self, id: Option<TeamId>) -> Option<&Team> {
        let id = id?;
        self.teams.iter().find(|t| t.id == id)
    }
}

/// One member, optionally paired with the team a join attached to it.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub member: &'a Member,
    pub team: Option<&'a Team>,
}

impl<'a> Row<'a> {
    pub fn new(member: &'a Member, team: Option<&'a Team>) -> Self {
        Self { member, team }
    }

    fn path(&self, path: Path) -> Value {
        match path {
            Path::MemberId => Value::Int(self.member.id.0 as i64),
            Path::MemberUsername => Value::Text(self.member.username.clone()),
            Path::MemberAge => Value::Int(self.member.age),
            Path::TeamId => self
                .team
                .map(|t| Value::Int(t.id.0 as i64))
                .unwrap_or(Value::Null),
            Path::TeamName => self
                .team
                .map(|t| Value::Text(t.name.clone()))
                .unwrap_or(Value::Null),
        }
    }
}

impl Expr {
    pub fn eval(&self, row: &Row<'_>, data: &Dataset) -> Result<Value> {
        match self {
            Expr::Path(path) => Ok(row.path(*path)),
            Expr::Const(value) => Ok(value.clone()),
            Expr::Concat(a, b) => {
                let (a, b) = (a.eval(row, data)?, b.eval(row, data)?);
                concat_values("concat", &[a, b])
            }
            Expr::StringValue(e) => Ok(e.eval(row, data)?.to_text().into()),
            Expr::Add(a, b) => add_values(&a.eval(row, data)?, &b.eval(row, data)?),
            Expr::Function { name, args } => {
                let args = args
                    .iter()
                    .map(|a| a.eval(row, data))
                    .collect::<Result<Vec<_>>>()?;
                call_function(name, &args)
            }
            Expr::Case(case) => eval_case(case, row, data),
            Expr::Scalar(sub) => sub.scalar(data),
        }
    }
}

impl Condition {
    /// True only when the condition is known to hold. UNKNOWN (a comparison
    /// involving NULL) does not match, and neither does its negation.
    pub fn matches(&self, row: &Row<'_>, data: &Dataset) -> Result<bool> {
        Ok(self.truth(row, data)?.unwrap_or(false))
    }

    /// Three-valued result: `None` is SQL UNKNOWN.
    pub fn truth(&self, row: &Row<'_>, data: &Dataset) -> Result<Option<bool>> {
        match self {
            Condition::True => Ok(Some(true)),
            Condition::Compare { op, left, right } => {
                let (l, r) = (left.eval(row, data)?, right.eval(row, data)?);
                Ok(l.compare(&r).map(|o| op.holds(o)))
            }
            Condition::Between { expr, low, high } => {
                let v = expr.eval(row, data)?;
                let (low, high) = (low.eval(row, data)?, high.eval(row, data)?);
                let above = v.compare(&low).map(|o| o.is_ge());
                let below = v.compare(&high).map(|o| o.is_le());
                Ok(and3(above, below))
            }
            Condition::InList { expr, values } => {
                let v = expr.eval(row, data)?;
                Ok(member_of(&v, values))
            }
            Condition::InSubquery { expr, subquery } => {
                let v = expr.eval(row, data)?;
                Ok(member_of(&v, &subquery.values(data)?))
            }
            Condition::IsNull(expr) => Ok(Some(expr.eval(row, data)?.is_null())),
            Condition::And(parts) => {
                let mut acc = Some(true);
                for part in parts {
                    acc = and3(acc, part.truth(row, data)?);
                    if acc == Some(false) {
                        break;
                    }
                }
                Ok(acc)
            }
            Condition::Or(parts) => {
                let mut acc = Some(false);
                for part in parts {
                    acc = or3(acc, part.truth(row, data)?);
                    if acc == Some(true) {
                        break;
                    }
                }
                Ok(acc)
            }
            Condition::Not(inner) => Ok(inner.truth(row, data)?.map(|t| !t)),
        }
    }
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// `v in (candidates)`: true on a match, UNKNOWN when nothing matched but
/// some comparison was undecidable.
fn member_of(v: &Value, candidates: &[Value]) -> Option<bool> {
    let mut unknown = false;
    for c in candidates {
        match v.compare(c) {
            Some(o) if o.is_eq() => return Some(true),
            Some(_) => {}
            None => unknown = true,
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

impl Aggregate {
    pub fn over(&self, rows: &[Row<'_>], data: &Dataset) -> Result<Value> {
        let input = match self {
            Aggregate::Count => return Ok(Value::Int(rows.len() as i64)),
            Aggregate::Sum(e) | Aggregate::Avg(e) | Aggregate::Max(e) | Aggregate::Min(e) => e,
        };

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let v = input.eval(row, data)?;
            if !v.is_null() {
                values.push(v);
            }
        }
        if values.is_empty() {
            return Ok(Value::Null);
        }

        match self {
            Aggregate::Count => Ok(Value::Int(values.len() as i64)),
            Aggregate::Sum(_) => values
                .iter()
                .skip(1)
                .try_fold(values[0].clone(), |acc, v| add_values(&acc, v)),
            Aggregate::Avg(_) => {
                let mut total = 0.0;
                for v in &values {
                    total += v
                        .as_f64()
                        .ok_or_else(|| QueryError::type_mismatch("avg", format!("{} is not numeric", v)))?;
                }
                Ok(Value::Float(total / values.len() as f64))
            }
            Aggregate::Max(_) => extreme(values, "max", std::cmp::Ordering::Greater),
            Aggregate::Min(_) => extreme(values, "min", std::cmp::Ordering::Less),
        }
    }
}

impl SubQuery {
    fn matching_rows<'a>(&self, data: &'a Dataset) -> Result<Vec<Row<'a>>> {
        let mut rows = Vec::new();
        // No implicit join: team paths inside a subquery are NULL.
        for m in &data.members {
            let row = Row::new(m, None);
            if self.filter.matches(&row, data)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Result as a single value. A column subquery must yield at most one row.
    pub fn scalar(&self, data: &Dataset) -> Result<Value> {
        let rows = self.matching_rows(data)?;
        match &self.projection {
            SubProjection::Aggregate(agg) => agg.over(&rows, data),
            SubProjection::Column(expr) => match rows.as_slice() {
                [] => Ok(Value::Null),
                [row] => expr.eval(row, data),
                many => Err(QueryError::NonUniqueResult { count: many.len() }),
            },
        }
    }

    /// Result as a list of values, for `in (subquery)`.
    pub fn values(&self, data: &Dataset) -> Result<Vec<Value>> {
        match &self.projection {
            SubProjection::Aggregate(_) => Ok(vec![self.scalar(data)?]),
            SubProjection::Column(expr) => self
                .matching_rows(data)?
                .iter()
                .map(|row| expr.eval(row, data))
                .collect(),
        }
    }
}

fn eval_case(case: &CaseExpr, row: &Row<'_>, data: &Dataset) -> Result<Value> {
    for (condition, then) in &case.branches {
        if condition.matches(row, data)? {
            return then.eval(row, data);
        }
    }
    case.otherwise.eval(row, data)
}

fn extreme(values: Vec<Value>, operation: &str, keep: std::cmp::Ordering) -> Result<Value> {
    let mut iter = values.into_iter();
    let mut best = iter.next().unwrap_or(Value::Null);
    for v in iter {
        match v.compare(&best) {
            Some(o) if o == keep => best = v,
            Some(_) => {}
            None => {
                return Err(QueryError::type_mismatch(
                    operation,
                    format!("cannot compare {} with {}", v, best),
                ))
            }
        }
    }
    Ok(best)
}

fn add_values(a: &Value, b: &Value) -> Result<Value> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(x), Value::Int(y)) => x
            .checked_add(*y)
            .map(Value::Int)
            .ok_or_else(|| QueryError::type_mismatch("add", "integer overflow")),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(Value::Float(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0)))
        }
        _ => Err(QueryError::type_mismatch(
            "add",
            format!("cannot add {} and {}", a, b),
        )),
    }
}

fn text_arg<'v>(function: &str, value: &'v Value) -> Result<Option<&'v str>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(QueryError::type_mismatch(
            function,
            format!("expected text, got {}", other),
        )),
    }
}

fn concat_values(function: &str, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for arg in args {
        match text_arg(function, arg)? {
            Some(s) => out.push_str(s),
            None => return Ok(Value::Null),
        }
    }
    Ok(Value::Text(out))
}

fn expect_arity(function: &str, args: &[Value], arity: usize) -> Result<()> {
    if args.len() != arity {
        return Err(QueryError::type_mismatch(
            function,
            format!("expected {} arguments, got {}", arity, args.len()),
        ));
    }
    Ok(())
}

/// Database functions available to `Expr::function`.
pub fn call_function(name: &str, args: &[Value]) -> Result<Value> {
    match name.to_ascii_lowercase().as_str() {
        "lower" => {
            expect_arity(name, args, 1)?;
            Ok(text_arg(name, &args[0])?.map(str::to_lowercase).into())
        }
        "upper" => {
            expect_arity(name, args, 1)?;
            Ok(text_arg(name, &args[0])?.map(str::to_uppercase).into())
        }
        "length" => {
            expect_arity(name, args, 1)?;
            Ok(text_arg(name, &args[0])?
                .map(|s| s.chars().count() as i64)
                .into())
        }
        "replace" => {
            expect_arity(name, args, 3)?;
            let source = text_arg(name, &args[0])?;
            let from = text_arg(name, &args[1])?;
            let to = text_arg(name, &args[2])?;
            Ok(match (source, from, to) {
                (Some(s), Some(f), Some(t)) => Value::Text(s.replace(f, t)),
                _ => Value::Null,
            })
        }
        "concat" => concat_values(name, args),
        _ => Err(QueryError::UnknownFunction {
            name: name.to_string(),
        }),
    }
}
