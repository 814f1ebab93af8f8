use chrono::NaiveDate;

use crate::search::condition::{parse_condition, Op};
use crate::search::reldate::resolve_relative;
use crate::search::FilterError;

/// Sentinel stored in place of a latest-viewing date for titles that
/// have never been watched. ISO dates compare lexicographically, so it
/// sorts before every real date and "watched more than N ago" holds
/// for any N.
pub const NEVER_WATCHED: &str = "0000-01-01";

const LAST_WATCHED_EXPR: &str = "COALESCE(lv.watched, '0000-01-01')";

/// Optional filters for a collection search. An unset field is simply
/// skipped; no filters at all means "every title".
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Runtime condition in minutes, e.g. `"< 120"`.
    pub runtime: Option<String>,
    /// Exact series name.
    pub series: Option<String>,
    /// Time-since-last-viewing condition, e.g. `"> 1 year"`.
    pub last_viewed: Option<String>,
}

/// Auxiliary tables a plan may pull in. Each joins straight to
/// `movies` on the IMDb ID; auxiliary tables never join each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    Series,
    LatestViewing,
}

impl Join {
    fn as_sql(self) -> &'static str {
        match self {
            Join::Series => "JOIN series s ON s.id = m.id",
            // LEFT so never-watched titles stay in the result set and
            // get the sentinel date through COALESCE.
            Join::LatestViewing => "LEFT JOIN latest_viewings lv ON lv.id = m.id",
        }
    }
}

/// One comparison in the WHERE clause. The column expression comes
/// from a fixed set and the operator from the `Op` allow-list; only
/// the value is user-supplied, and it is always a bound parameter.
pub struct Predicate {
    pub expr: &'static str,
    pub op: Op,
    pub param: Box<dyn rusqlite::types::ToSql>,
}

/// Assembled search query: projection, deduplicated join set, and
/// typed predicates, ready to render and execute.
#[derive(Default)]
pub struct QueryPlan {
    pub columns: Vec<&'static str>,
    pub joins: Vec<Join>,
    pub predicates: Vec<Predicate>,
    pub with_runtime: bool,
    pub with_series: bool,
    pub with_last_watched: bool,
}

impl QueryPlan {
    fn add_join(&mut self, join: Join) {
        if !self.joins.contains(&join) {
            self.joins.push(join);
        }
    }

    /// Render to SQL plus the bound parameters, in predicate order.
    pub fn render(&self) -> (String, Vec<&dyn rusqlite::types::ToSql>) {
        let mut sql = format!("SELECT {} FROM movies m", self.columns.join(", "));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.as_sql());
        }
        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self
                .predicates
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{} {} ?{}", p.expr, p.op.as_sql(), i + 1))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY m.title");

        let params: Vec<&dyn rusqlite::types::ToSql> =
            self.predicates.iter().map(|p| p.param.as_ref()).collect();
        (sql, params)
    }
}

impl Filters {
    /// Build the query plan for these filters. The first malformed
    /// condition fails the whole plan; a bad filter must never be
    /// dropped or match everything.
    ///
    /// Filter order is fixed (runtime, series, last-viewed) and only
    /// affects projection order.
    pub fn plan(&self, today: NaiveDate) -> Result<QueryPlan, FilterError> {
        let mut plan = QueryPlan {
            columns: vec!["m.title"],
            ..QueryPlan::default()
        };

        if let Some(ref raw) = self.runtime {
            let (op, value) = parse_condition(raw)?;
            let minutes: i64 = value
                .parse()
                .map_err(|_| FilterError::BadRuntime(value.to_string()))?;
            plan.columns.push("m.runtime");
            plan.predicates.push(Predicate {
                expr: "m.runtime",
                op,
                param: Box::new(minutes),
            });
            plan.with_runtime = true;
        }

        if let Some(ref name) = self.series {
            plan.add_join(Join::Series);
            plan.columns.push("s.series");
            plan.predicates.push(Predicate {
                expr: "s.series",
                op: Op::Eq,
                param: Box::new(name.clone()),
            });
            plan.with_series = true;
        }

        if let Some(ref raw) = self.last_viewed {
            let (op, value) = parse_condition(raw)?;
            let cutoff = resolve_relative(value, today)?;
            plan.add_join(Join::LatestViewing);
            plan.columns
                .push("COALESCE(lv.watched, '0000-01-01') AS last_watched");
            // The user states "time since last viewing <op> N"; the
            // column holds the viewing date itself, which runs the
            // other way, hence the inversion.
            plan.predicates.push(Predicate {
                expr: LAST_WATCHED_EXPR,
                op: op.invert(),
                param: Box::new(cutoff.format("%Y-%m-%d").to_string()),
            });
            plan.with_last_watched = true;
        }

        Ok(plan)
    }
}
