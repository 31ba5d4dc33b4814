//! Evaluation of a [`MemberQuery`] against a [`Dataset`] snapshot.

use crate::core::eval::{Dataset, Row};
use crate::core::expr::{Expr, SelectItem, Selection, Value};
use crate::core::projection::{QueryResults, Tuple};
use crate::core::query::{JoinKind, JoinTarget, MemberQuery};
use crate::domain::model::{Member, Team, TeamRef};
use crate::utils::error::{QueryError, Result};
use std::cmp::Ordering;

impl MemberQuery {
    /// Rows produced by the from/join clauses, before `where`.
    fn joined_rows<'a>(&self, data: &'a Dataset) -> Result<Vec<Row<'a>>> {
        let Some(join) = &self.join else {
            return Ok(data.members.iter().map(|m| Row::new(m, None)).collect());
        };

        let mut rows = Vec::new();
        for member in &data.members {
            match join.target {
                JoinTarget::Association => {
                    let team = data.team(member.team_id());
                    let candidate = Row::new(member, team);
                    let on = team.is_some() && join.on.matches(&candidate, data)?;
                    match (join.kind, on) {
                        (_, true) => rows.push(candidate),
                        (JoinKind::Left, false) => rows.push(Row::new(member, None)),
                        (JoinKind::Inner, false) => {}
                    }
                }
                JoinTarget::Unrelated => {
                    let before = rows.len();
                    for team in &data.teams {
                        let candidate = Row::new(member, Some(team));
                        if join.on.matches(&candidate, data)? {
                            rows.push(candidate);
                        }
                    }
                    if join.kind == JoinKind::Left && rows.len() == before {
                        rows.push(Row::new(member, None));
                    }
                }
                JoinTarget::Theta => {
                    for team in &data.teams {
                        let candidate = Row::new(member, Some(team));
                        if join.on.matches(&candidate, data)? {
                            rows.push(candidate);
                        }
                    }
                }
            }
        }
        Ok(rows)
    }

    fn filtered_rows<'a>(&self, data: &'a Dataset) -> Result<Vec<Row<'a>>> {
        let mut rows = Vec::new();
        for row in self.joined_rows(data)? {
            if self.filter.matches(&row, data)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn sort_rows(&self, rows: &mut Vec<Row<'_>>, data: &Dataset) -> Result<()> {
        if self.order.is_empty() {
            return Ok(());
        }
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows.drain(..) {
            keyed.push((self.sort_key(&row, data)?, row));
        }
        keyed.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        rows.extend(keyed.into_iter().map(|(_, row)| row));
        Ok(())
    }

    fn sort_key(&self, row: &Row<'_>, data: &Dataset) -> Result<Vec<Value>> {
        self.order.iter().map(|o| o.expr.eval(row, data)).collect()
    }

    fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((spec, x), y) in self.order.iter().zip(a).zip(b) {
            let ord = x.sort_cmp(y);
            let ord = if spec.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn page<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.offset.unwrap_or(0);
        let iter = items.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }

    /// Sorted and filtered rows, not yet paged.
    pub fn rows<'a>(&self, data: &'a Dataset) -> Result<Vec<Row<'a>>> {
        let mut rows = self.filtered_rows(data)?;
        self.sort_rows(&mut rows, data)?;
        tracing::debug!(
            "query where {} matched {} of {} members",
            self.filter,
            rows.len(),
            data.members.len()
        );
        Ok(rows)
    }

    fn to_member(&self, row: &Row<'_>) -> Member {
        let mut member = row.member.clone();
        member.team = match (self.is_fetch_join(), row.team) {
            (true, Some(team)) if member.team_id() == Some(team.id) => TeamRef::Loaded {
                team: team.clone(),
            },
            _ => member.team.unload(),
        };
        member
    }

    pub fn fetch_members(&self, data: &Dataset) -> Result<Vec<Member>> {
        let rows = self.rows(data)?;
        Ok(self.page(rows).iter().map(|r| self.to_member(r)).collect())
    }

    pub fn fetch_one_member(&self, data: &Dataset) -> Result<Option<Member>> {
        let rows = self.page(self.rows(data)?);
        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(self.to_member(row))),
            many => Err(QueryError::NonUniqueResult { count: many.len() }),
        }
    }

    pub fn fetch_member_results(&self, data: &Dataset) -> Result<QueryResults<Member>> {
        let rows = self.rows(data)?;
        let total = rows.len();
        let results = self.page(rows).iter().map(|r| self.to_member(r)).collect();
        Ok(QueryResults {
            total,
            limit: self.limit,
            offset: self.offset.unwrap_or(0),
            results,
        })
    }

    /// Member together with whatever team the join attached to the row.
    pub fn fetch_member_pairs(&self, data: &Dataset) -> Result<Vec<(Member, Option<Team>)>> {
        let rows = self.rows(data)?;
        Ok(self
            .page(rows)
            .iter()
            .map(|r| (self.to_member(r), r.team.cloned()))
            .collect())
    }

    pub fn fetch_tuples(&self, data: &Dataset, selections: &[Selection]) -> Result<Vec<Tuple>> {
        let labels: Vec<String> = selections.iter().map(Selection::label).collect();
        let rows = self.rows(data)?;

        // Plain columns only and no group by: one tuple per row.
        let columns: Option<Vec<&Expr>> = selections
            .iter()
            .map(|s| match &s.item {
                SelectItem::Expr(expr) => Some(expr),
                SelectItem::Aggregate(_) => None,
            })
            .collect();

        let mut tuples = Vec::new();
        match columns {
            Some(columns) if self.group_by.is_empty() => {
                for row in &rows {
                    let mut values = Vec::with_capacity(columns.len());
                    for expr in &columns {
                        values.push(expr.eval(row, data)?);
                    }
                    tuples.push(Tuple::new(labels.clone(), values));
                }
            }
            _ => {
                for group in self.groups(rows, data)? {
                    let values = selections
                        .iter()
                        .map(|s| match &s.item {
                            SelectItem::Aggregate(agg) => agg.over(&group, data),
                            SelectItem::Expr(expr) => match group.first() {
                                Some(row) => expr.eval(row, data),
                                None => Ok(Value::Null),
                            },
                        })
                        .collect::<Result<Vec<_>>>()?;
                    tuples.push(Tuple::new(labels.clone(), values));
                }
            }
        }
        Ok(self.page(tuples))
    }

    /// Splits rows by the `group_by` key, keeping first-seen order.
    /// Without `group_by` the whole input is one group, even when empty.
    fn groups<'a>(&self, rows: Vec<Row<'a>>, data: &Dataset) -> Result<Vec<Vec<Row<'a>>>> {
        if self.group_by.is_empty() {
            return Ok(vec![rows]);
        }
        let mut groups: Vec<(Vec<Value>, Vec<Row<'a>>)> = Vec::new();
        for row in rows {
            let key = self
                .group_by
                .iter()
                .map(|e| e.eval(&row, data))
                .collect::<Result<Vec<_>>>()?;
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }
        Ok(groups.into_iter().map(|(_, rows)| rows).collect())
    }

    pub fn fetch_column(&self, data: &Dataset, expr: &Expr) -> Result<Vec<Value>> {
        let tuples = self.fetch_tuples(data, &[Selection::from(expr.clone())])?;
        Ok(tuples
            .into_iter()
            .filter_map(|t| t.get_at(0).cloned())
            .collect())
    }
}
