//! Rendering of conditions into a SQL `where` fragment with positional parameters.

use crate::core::expr::{Aggregate, Condition, Expr, Path, SubProjection, SubQuery, Value};
use crate::domain::ports::Predicate;
use serde::Serialize;

const IDENTITY_SQL: &str = "1 = 1";
const MEMBER_ALIAS: &str = "m";
const TEAM_ALIAS: &str = "t";
const SUBQUERY_ALIAS: &str = "ms";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFilter {
    pub sql: String,
    pub params: Vec<Value>,
    /// `sql` is already a top-level `(a) and (b) ...` list.
    #[serde(skip)]
    conjunction: bool,
}

impl SqlFilter {
    pub fn from_condition(condition: &Condition) -> Self {
        let mut writer = SqlWriter::new(MEMBER_ALIAS);
        let sql = writer.condition(condition);
        Self {
            sql,
            params: writer.params,
            conjunction: matches!(condition, Condition::And(_)),
        }
    }

    fn conjunct(&self) -> String {
        if self.conjunction {
            self.sql.clone()
        } else {
            format!("({})", self.sql)
        }
    }

    pub fn is_identity(&self) -> bool {
        self.sql == IDENTITY_SQL && self.params.is_empty()
    }
}

impl Predicate for SqlFilter {
    fn always() -> Self {
        Self {
            sql: IDENTITY_SQL.to_string(),
            params: Vec::new(),
            conjunction: false,
        }
    }

    fn and(self, other: Self) -> Self {
        if self.is_identity() {
            return other;
        }
        if other.is_identity() {
            return self;
        }
        let sql = format!("{} and {}", self.conjunct(), other.conjunct());
        let mut params = self.params;
        params.extend(other.params);
        Self {
            sql,
            params,
            conjunction: true,
        }
    }
}

struct SqlWriter {
    member_alias: &'static str,
    params: Vec<Value>,
}

impl SqlWriter {
    fn new(member_alias: &'static str) -> Self {
        Self {
            member_alias,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        self.params.push(value.clone());
        "?".to_string()
    }

    fn path(&self, path: Path) -> String {
        let alias = match path {
            // subqueries select from member alone
            Path::TeamId | Path::TeamName if self.member_alias == SUBQUERY_ALIAS => {
                return "null".to_string()
            }
            Path::TeamId | Path::TeamName => TEAM_ALIAS,
            Path::MemberId | Path::MemberUsername | Path::MemberAge => self.member_alias,
        };
        format!("{}.{}", alias, path.column())
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Path(path) => self.path(*path),
            Expr::Const(value) => self.bind(value),
            Expr::Concat(a, b) => format!("concat({}, {})", self.expr(a), self.expr(b)),
            Expr::StringValue(e) => format!("cast({} as varchar)", self.expr(e)),
            Expr::Add(a, b) => format!("({} + {})", self.expr(a), self.expr(b)),
            Expr::Function { name, args } => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Case(case) => {
                let mut sql = "case".to_string();
                for (cond, then) in &case.branches {
                    let cond = self.condition(cond);
                    let then = self.expr(then);
                    sql.push_str(&format!(" when {} then {}", cond, then));
                }
                let otherwise = self.expr(&case.otherwise);
                format!("{} else {} end", sql, otherwise)
            }
            Expr::Scalar(sub) => format!("({})", self.subquery(sub)),
        }
    }

    fn aggregate(&mut self, agg: &Aggregate) -> String {
        match agg {
            Aggregate::Count => format!("count({}.id)", self.member_alias),
            Aggregate::Sum(e) => format!("sum({})", self.expr(e)),
            Aggregate::Avg(e) => format!("avg({})", self.expr(e)),
            Aggregate::Max(e) => format!("max({})", self.expr(e)),
            Aggregate::Min(e) => format!("min({})", self.expr(e)),
        }
    }

    fn subquery(&mut self, sub: &SubQuery) -> String {
        let outer = std::mem::replace(&mut self.member_alias, SUBQUERY_ALIAS);
        let projection = match &sub.projection {
            SubProjection::Column(e) => self.expr(e),
            SubProjection::Aggregate(a) => self.aggregate(a),
        };
        let mut sql = format!("select {} from member {}", projection, SUBQUERY_ALIAS);
        if !sub.filter.is_true() {
            let filter = self.condition(&sub.filter);
            sql.push_str(&format!(" where {}", filter));
        }
        self.member_alias = outer;
        sql
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::True => IDENTITY_SQL.to_string(),
            Condition::Compare { op, left, right } => {
                let left = self.expr(left);
                let right = self.expr(right);
                format!("{} {} {}", left, op.symbol(), right)
            }
            Condition::Between { expr, low, high } => {
                let expr = self.expr(expr);
                let low = self.expr(low);
                let high = self.expr(high);
                format!("{} between {} and {}", expr, low, high)
            }
            // 空的 in 清單永遠不成立
            Condition::InList { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Condition::InList { expr, values } => {
                let expr = self.expr(expr);
                let placeholders: Vec<String> = values.iter().map(|v| self.bind(v)).collect();
                format!("{} in ({})", expr, placeholders.join(", "))
            }
            Condition::InSubquery { expr, subquery } => {
                let expr = self.expr(expr);
                format!("{} in ({})", expr, self.subquery(subquery))
            }
            Condition::IsNull(expr) => format!("{} is null", self.expr(expr)),
            Condition::And(parts) => self.join(parts, " and "),
            Condition::Or(parts) => format!("({})", self.join(parts, " or ")),
            Condition::Not(inner) => format!("not ({})", self.condition(inner)),
        }
    }

    fn join(&mut self, parts: &[Condition], sep: &str) -> String {
        let rendered: Vec<String> = parts
            .iter()
            .map(|p| format!("({})", self.condition(p)))
            .collect();
        rendered.join(sep)
    }
}
