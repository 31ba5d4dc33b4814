//! Typed expressions over the member/team schema.
//!
//! Everything here is plain data: building an expression never touches the
//! store. Evaluation lives in [`crate::core::eval`] and SQL rendering in
//! [`crate::core::render`].

use crate::domain::ports::Predicate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Textual form used by `string_value()` and `concat`. NULL stays NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(v) => Some(v.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Text(v) => Some(v.clone()),
        }
    }

    /// SQL comparison: `None` when either side is NULL or the types are unrelated.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => None,
        }
    }

    /// Total order for ORDER BY. NULLs sort after every other value.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self
                .compare(other)
                .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A column reachable from a query row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Path {
    MemberId,
    MemberUsername,
    MemberAge,
    TeamId,
    TeamName,
}

impl Path {
    pub fn entity(&self) -> &'static str {
        match self {
            Path::MemberId | Path::MemberUsername | Path::MemberAge => "member",
            Path::TeamId | Path::TeamName => "team",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Path::MemberId | Path::TeamId => "id",
            Path::MemberUsername => "username",
            Path::MemberAge => "age",
            Path::TeamName => "name",
        }
    }

    /// Whether `value` can be compared against this column. NULL never can.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Path::MemberId | Path::MemberAge | Path::TeamId => {
                matches!(value, Value::Int(_) | Value::Float(_))
            }
            Path::MemberUsername | Path::TeamName => matches!(value, Value::Text(_)),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity(), self.column())
    }
}

/// Columns of the member entity.
pub mod member {
    use super::{Aggregate, Expr, Path};

    pub fn id() -> Expr {
        Expr::Path(Path::MemberId)
    }

    pub fn username() -> Expr {
        Expr::Path(Path::MemberUsername)
    }

    pub fn age() -> Expr {
        Expr::Path(Path::MemberAge)
    }

    pub fn count() -> Aggregate {
        Aggregate::Count
    }
}

/// Columns of the team entity. Only populated when the query joins a team.
pub mod team {
    use super::{Expr, Path};

    pub fn id() -> Expr {
        Expr::Path(Path::TeamId)
    }

    pub fn name() -> Expr {
        Expr::Path(Path::TeamName)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Path(Path),
    Const(Value),
    Concat(Box<Expr>, Box<Expr>),
    StringValue(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Function { name: String, args: Vec<Expr> },
    Case(Box<CaseExpr>),
    Scalar(Box<SubQuery>),
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Const(value.into())
    }

    /// Calls a named database function, e.g. `replace` or `lower`.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Condition {
        Condition::compare(CmpOp::Eq, self, other.into())
    }

    pub fn ne(self, other: impl Into<Expr>) -> Condition {
        Condition::compare(CmpOp::Ne, self, other.into())
    }

    pub fn lt(self, other: impl Into<Expr>) -> Condition {
        Condition::compare(CmpOp::Lt, self, other.into())
    }

    pub fn loe(self, other: impl Into<Expr>) -> Condition {
        Condition::compare(CmpOp::Loe, self, other.into())
    }

    pub fn gt(self, other: impl Into<Expr>) -> Condition {
        Condition::compare(CmpOp::Gt, self, other.into())
    }

    pub fn goe(self, other: impl Into<Expr>) -> Condition {
        Condition::compare(CmpOp::Goe, self, other.into())
    }

    /// Inclusive on both ends.
    pub fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Condition {
        Condition::Between {
            expr: self,
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn in_list<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::InList {
            expr: self,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn in_subquery(self, subquery: SubQuery) -> Condition {
        Condition::InSubquery {
            expr: self,
            subquery: Box::new(subquery),
        }
    }

    pub fn is_null(self) -> Condition {
        Condition::IsNull(self)
    }

    pub fn concat(self, other: impl Into<Expr>) -> Expr {
        Expr::Concat(Box::new(self), Box::new(other.into()))
    }

    pub fn string_value(self) -> Expr {
        Expr::StringValue(Box::new(self))
    }

    pub fn add(self, other: impl Into<Expr>) -> Expr {
        Expr::Add(Box::new(self), Box::new(other.into()))
    }

    pub fn lower(self) -> Expr {
        Expr::function("lower", vec![self])
    }

    pub fn upper(self) -> Expr {
        Expr::function("upper", vec![self])
    }

    /// Starts a simple case expression over this value.
    pub fn when(self, value: impl Into<Expr>) -> SimpleCaseThen {
        SimpleCase {
            subject: self,
            builder: CaseBuilder::new(),
        }
        .when(value)
    }

    pub fn sum(self) -> Aggregate {
        Aggregate::Sum(self)
    }

    pub fn avg(self) -> Aggregate {
        Aggregate::Avg(self)
    }

    pub fn max(self) -> Aggregate {
        Aggregate::Max(self)
    }

    pub fn min(self) -> Aggregate {
        Aggregate::Min(self)
    }

    pub fn asc(self) -> OrderSpec {
        OrderSpec {
            expr: self,
            descending: false,
        }
    }

    pub fn desc(self) -> OrderSpec {
        OrderSpec {
            expr: self,
            descending: true,
        }
    }

    pub fn as_(self, alias: impl Into<String>) -> Selection {
        Selection::from(self).as_(alias)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(path) => write!(f, "{}", path),
            Expr::Const(value) => write!(f, "{}", value),
            Expr::Concat(a, b) => write!(f, "concat({}, {})", a, b),
            Expr::StringValue(e) => write!(f, "str({})", e),
            Expr::Add(a, b) => write!(f, "{} + {}", a, b),
            Expr::Function { name, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
            Expr::Case(case) => {
                write!(f, "case")?;
                for (cond, then) in &case.branches {
                    write!(f, " when {} then {}", cond, then)?;
                }
                write!(f, " else {} end", case.otherwise)
            }
            Expr::Scalar(sub) => write!(f, "({})", sub),
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Const(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Const(v.into())
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Const(v.into())
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Const(v.into())
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        Expr::Const(v.into())
    }
}

impl From<SubQuery> for Expr {
    fn from(sub: SubQuery) -> Self {
        Expr::Scalar(Box::new(sub))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub branches: Vec<(Condition, Expr)>,
    pub otherwise: Expr,
}

/// Searched case: `case when <condition> then <expr> ... else <expr> end`.
#[derive(Debug, Clone, Default)]
pub struct CaseBuilder {
    branches: Vec<(Condition, Expr)>,
}

impl CaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn when(self, condition: Condition) -> CaseThen {
        CaseThen {
            builder: self,
            condition,
        }
    }

    pub fn otherwise(self, value: impl Into<Expr>) -> Expr {
        Expr::Case(Box::new(CaseExpr {
            branches: self.branches,
            otherwise: value.into(),
        }))
    }
}

pub struct CaseThen {
    builder: CaseBuilder,
    condition: Condition,
}

impl CaseThen {
    pub fn then(mut self, value: impl Into<Expr>) -> CaseBuilder {
        self.builder.branches.push((self.condition, value.into()));
        self.builder
    }
}

/// Simple case: `case <subject> when <value> then <expr> ... end`, lowered to
/// equality branches.
pub struct SimpleCase {
    subject: Expr,
    builder: CaseBuilder,
}

impl SimpleCase {
    pub fn when(self, value: impl Into<Expr>) -> SimpleCaseThen {
        SimpleCaseThen {
            condition: self.subject.clone().eq(value),
            case: self,
        }
    }

    pub fn otherwise(self, value: impl Into<Expr>) -> Expr {
        self.builder.otherwise(value)
    }
}

pub struct SimpleCaseThen {
    case: SimpleCase,
    condition: Condition,
}

impl SimpleCaseThen {
    pub fn then(self, value: impl Into<Expr>) -> SimpleCase {
        let SimpleCase { subject, builder } = self.case;
        SimpleCase {
            subject,
            builder: builder.when(self.condition).then(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Loe,
    Gt,
    Goe,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Loe => "<=",
            CmpOp::Gt => ">",
            CmpOp::Goe => ">=",
        }
    }

    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Loe => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Goe => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every row; the identity of `and`.
    True,
    Compare {
        op: CmpOp,
        left: Expr,
        right: Expr,
    },
    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
    },
    InList {
        expr: Expr,
        values: Vec<Value>,
    },
    InSubquery {
        expr: Expr,
        subquery: Box<SubQuery>,
    },
    IsNull(Expr),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(op: CmpOp, left: Expr, right: Expr) -> Self {
        Condition::Compare { op, left, right }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Condition::True)
    }

    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::True, c) | (c, Condition::True) => c,
            (Condition::And(mut left), Condition::And(right)) => {
                left.extend(right);
                Condition::And(left)
            }
            (Condition::And(mut left), c) => {
                left.push(c);
                Condition::And(left)
            }
            (c, Condition::And(mut right)) => {
                right.insert(0, c);
                Condition::And(right)
            }
            (a, b) => Condition::And(vec![a, b]),
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::True, _) | (_, Condition::True) => Condition::True,
            (Condition::Or(mut left), Condition::Or(right)) => {
                left.extend(right);
                Condition::Or(left)
            }
            (Condition::Or(mut left), c) => {
                left.push(c);
                Condition::Or(left)
            }
            (a, b) => Condition::Or(vec![a, b]),
        }
    }

    pub fn not(self) -> Condition {
        match self {
            Condition::Not(inner) => *inner,
            c => Condition::Not(Box::new(c)),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::True
    }
}

impl Predicate for Condition {
    fn always() -> Self {
        Condition::True
    }

    fn and(self, other: Self) -> Self {
        Condition::and(self, other)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::True => write!(f, "true"),
            Condition::Compare { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Condition::Between { expr, low, high } => {
                write!(f, "{} between {} and {}", expr, low, high)
            }
            Condition::InList { expr, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{} in ({})", expr, values.join(", "))
            }
            Condition::InSubquery { expr, subquery } => write!(f, "{} in ({})", expr, subquery),
            Condition::IsNull(expr) => write!(f, "{} is null", expr),
            Condition::And(parts) => join_conditions(f, parts, " && "),
            Condition::Or(parts) => join_conditions(f, parts, " || "),
            Condition::Not(inner) => write!(f, "!({})", inner),
        }
    }
}

fn join_conditions(f: &mut fmt::Formatter<'_>, parts: &[Condition], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", part)?;
    }
    write!(f, ")")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Count,
    Sum(Expr),
    Avg(Expr),
    Max(Expr),
    Min(Expr),
}

impl Aggregate {
    pub fn as_(self, alias: impl Into<String>) -> Selection {
        Selection::from(self).as_(alias)
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Count => write!(f, "count(member)"),
            Aggregate::Sum(e) => write!(f, "sum({})", e),
            Aggregate::Avg(e) => write!(f, "avg({})", e),
            Aggregate::Max(e) => write!(f, "max({})", e),
            Aggregate::Min(e) => write!(f, "min({})", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubProjection {
    Column(Expr),
    Aggregate(Aggregate),
}

impl From<Expr> for SubProjection {
    fn from(e: Expr) -> Self {
        SubProjection::Column(e)
    }
}

impl From<Aggregate> for SubProjection {
    fn from(a: Aggregate) -> Self {
        SubProjection::Aggregate(a)
    }
}

/// An uncorrelated subquery over every stored member.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub projection: SubProjection,
    pub filter: Condition,
}

impl SubQuery {
    pub fn select(projection: impl Into<SubProjection>) -> Self {
        Self {
            projection: projection.into(),
            filter: Condition::True,
        }
    }

    pub fn where_(mut self, condition: Condition) -> Self {
        self.filter = self.filter.and(condition);
        self
    }

    pub fn as_(self, alias: impl Into<String>) -> Selection {
        Selection::from(self).as_(alias)
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.projection {
            SubProjection::Column(e) => write!(f, "select {} from member", e)?,
            SubProjection::Aggregate(a) => write!(f, "select {} from member", a)?,
        }
        if !self.filter.is_true() {
            write!(f, " where {}", self.filter)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr(Expr),
    Aggregate(Aggregate),
}

/// One column of a tuple projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub item: SelectItem,
    pub alias: Option<String>,
}

impl Selection {
    pub fn as_(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Alias if given, the bare column name for a path, the rendered expression otherwise.
    pub fn label(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.item {
            SelectItem::Expr(Expr::Path(path)) => path.column().to_string(),
            SelectItem::Expr(e) => e.to_string(),
            SelectItem::Aggregate(a) => a.to_string(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.item, SelectItem::Aggregate(_))
    }
}

impl From<Expr> for Selection {
    fn from(e: Expr) -> Self {
        Self {
            item: SelectItem::Expr(e),
            alias: None,
        }
    }
}

impl From<Aggregate> for Selection {
    fn from(a: Aggregate) -> Self {
        Self {
            item: SelectItem::Aggregate(a),
            alias: None,
        }
    }
}

impl From<SubQuery> for Selection {
    fn from(sub: SubQuery) -> Self {
        Selection::from(Expr::from(sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_treats_true_as_identity() {
        let cond = member::age().eq(10);
        assert_eq!(Condition::True.and(cond.clone()), cond);
        assert_eq!(cond.clone().and(Condition::True), cond);
    }

    #[test]
    fn test_and_flattens_nested_conjunctions() {
        let a = member::age().eq(10);
        let b = member::username().eq("member1");
        let c = member::id().gt(0);
        let combined = a.clone().and(b.clone()).and(c.clone());
        assert_eq!(combined, Condition::And(vec![a, b, c]));
    }

    #[test]
    fn test_or_with_true_is_true() {
        let cond = member::age().eq(10).or(Condition::True);
        assert!(cond.is_true());
    }

    #[test]
    fn test_value_comparison_is_sql_like() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.0)), Some(Ordering::Equal));
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Int(1).compare(&Value::Text("1".into())), None);
        assert_eq!(Value::Null.sort_cmp(&Value::Int(1)), Ordering::Greater);
    }

    #[test]
    fn test_path_accepts_matching_kinds() {
        assert!(Path::MemberAge.accepts(&Value::Int(10)));
        assert!(Path::MemberAge.accepts(&Value::Float(10.5)));
        assert!(!Path::MemberAge.accepts(&Value::from("ten")));
        assert!(Path::TeamName.accepts(&Value::from("teamA")));
        assert!(!Path::MemberUsername.accepts(&Value::Int(1)));
        assert!(!Path::MemberId.accepts(&Value::Null));
    }

    #[test]
    fn test_selection_labels() {
        assert_eq!(Selection::from(member::username()).label(), "username");
        assert_eq!(Selection::from(member::age().avg()).label(), "avg(member.age)");
        assert_eq!(member::username().as_("name").label(), "name");
        assert_eq!(Selection::from(member::count()).label(), "count(member)");
    }

    #[test]
    fn test_simple_case_lowers_to_equality_branches() {
        let expr = member::age().when(10).then("ten").otherwise("other");
        match expr {
            Expr::Case(case) => {
                assert_eq!(case.branches.len(), 1);
                assert_eq!(case.branches[0].0, member::age().eq(10));
                assert_eq!(case.otherwise, Expr::from("other"));
            }
            other => panic!("expected case expression, got {:?}", other),
        }
    }
}
