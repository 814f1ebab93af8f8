pub mod condition;
pub mod filters;
pub mod reldate;

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::db::Database;
use filters::{QueryPlan, NEVER_WATCHED};

/// A malformed search filter. Recovered at the CLI: the whole search
/// is aborted with an empty result set and the diagnostic below.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unrecognized comparison operator {0:?} (expected one of =, <, <=, >, >=)")]
    BadOperator(String),
    #[error("runtime must be a whole number of minutes, got {0:?}")]
    BadRuntime(String),
    #[error("could not read {0:?} as a relative date (expected e.g. \"1 year\", \"6 months\", \"90 days\")")]
    BadRelativeDate(String),
}

/// One search result row. Optional fields are present only when the
/// corresponding filter was active.
#[derive(Debug, Clone, Serialize)]
pub struct MovieRow {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Latest viewing date; `None` means never watched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watched: Option<String>,
}

impl Database {
    /// Execute an assembled search plan. Columns are read back in the
    /// plan's projection order: title, then runtime, series and
    /// last-watched as present.
    pub fn search_movies(&self, plan: &QueryPlan) -> Result<Vec<MovieRow>> {
        let (sql, params) = plan.render();
        debug!(sql = %sql, params = params.len(), "executing search plan");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            let mut idx = 0;
            let title: String = row.get(idx)?;
            idx += 1;

            let runtime = if plan.with_runtime {
                let v: Option<i64> = row.get(idx)?;
                idx += 1;
                v
            } else {
                None
            };

            let series = if plan.with_series {
                let v: String = row.get(idx)?;
                idx += 1;
                Some(v)
            } else {
                None
            };

            let last_watched = if plan.with_last_watched {
                let v: String = row.get(idx)?;
                // The sentinel surfaces as "never watched" here.
                if v == NEVER_WATCHED {
                    None
                } else {
                    Some(v)
                }
            } else {
                None
            };

            Ok(MovieRow {
                title,
                runtime,
                series,
                last_watched,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewMovie;
    use chrono::NaiveDate;
    use filters::Filters;

    fn movie(id: &str, title: &str, runtime: i64) -> NewMovie {
        NewMovie {
            id: id.to_string(),
            title: title.to_string(),
            year: None,
            released: None,
            runtime: Some(runtime),
            rated: None,
            plot: None,
            poster: None,
            imdb_rating: None,
            imdb_votes: None,
            genres: Vec::new(),
            actors: Vec::new(),
            directors: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Three movies: a short one watched recently, a long one watched
    /// years ago, and a long one never watched at all.
    fn collection() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&movie("tt0000001", "Brief Encounter", 86))
            .unwrap();
        db.insert_movie(&movie("tt0000002", "Long Ago", 150)).unwrap();
        db.insert_movie(&movie("tt0000003", "Untouched Epic", 180))
            .unwrap();
        db.add_viewing("tt0000001", "2024-03-01").unwrap();
        db.add_viewing("tt0000002", "2020-06-15").unwrap();
        db.add_series("tt0000002", "Foo").unwrap();
        db
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn titles(rows: &[MovieRow]) -> Vec<&str> {
        rows.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_empty_filters_return_every_title() {
        let db = collection();
        let plan = Filters::default().plan(today()).unwrap();
        let rows = db.search_movies(&plan).unwrap();
        assert_eq!(
            titles(&rows),
            vec!["Brief Encounter", "Long Ago", "Untouched Epic"]
        );
        assert!(rows.iter().all(|r| r.runtime.is_none()));
    }

    #[test]
    fn test_runtime_filter_restricts_and_projects() {
        let db = collection();
        let filters = Filters {
            runtime: Some("< 120".to_string()),
            ..Filters::default()
        };
        let rows = db.search_movies(&filters.plan(today()).unwrap()).unwrap();
        assert_eq!(titles(&rows), vec!["Brief Encounter"]);
        assert_eq!(rows[0].runtime, Some(86));
    }

    #[test]
    fn test_series_and_runtime_combine_with_and() {
        let db = collection();
        let filters = Filters {
            runtime: Some("> 90".to_string()),
            series: Some("Foo".to_string()),
            ..Filters::default()
        };
        let rows = db.search_movies(&filters.plan(today()).unwrap()).unwrap();
        assert_eq!(titles(&rows), vec!["Long Ago"]);
        assert_eq!(rows[0].runtime, Some(150));
        assert_eq!(rows[0].series.as_deref(), Some("Foo"));
    }

    #[test]
    fn test_last_viewed_more_than_a_year_ago() {
        let db = collection();
        let filters = Filters {
            last_viewed: Some("> 1 year".to_string()),
            ..Filters::default()
        };
        let rows = db.search_movies(&filters.plan(today()).unwrap()).unwrap();
        // Never-watched counts as "more than any interval ago"
        assert_eq!(titles(&rows), vec!["Long Ago", "Untouched Epic"]);
        assert_eq!(rows[0].last_watched.as_deref(), Some("2020-06-15"));
        assert_eq!(rows[1].last_watched, None);
    }

    #[test]
    fn test_last_viewed_within_a_year() {
        let db = collection();
        let filters = Filters {
            last_viewed: Some("< 1 year".to_string()),
            ..Filters::default()
        };
        let rows = db.search_movies(&filters.plan(today()).unwrap()).unwrap();
        assert_eq!(titles(&rows), vec!["Brief Encounter"]);
        assert_eq!(rows[0].last_watched.as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn test_never_watched_satisfies_any_interval() {
        let db = collection();
        for cond in ["> 1 day", "> 6 months", "> 50 years"] {
            let filters = Filters {
                last_viewed: Some(cond.to_string()),
                ..Filters::default()
            };
            let rows = db.search_movies(&filters.plan(today()).unwrap()).unwrap();
            assert!(
                titles(&rows).contains(&"Untouched Epic"),
                "never-watched title missing for {cond:?}"
            );
        }
    }

    #[test]
    fn test_all_three_filters_together() {
        let db = collection();
        let filters = Filters {
            runtime: Some(">= 150".to_string()),
            series: Some("Foo".to_string()),
            last_viewed: Some("> 2 years".to_string()),
        };
        let rows = db.search_movies(&filters.plan(today()).unwrap()).unwrap();
        assert_eq!(titles(&rows), vec!["Long Ago"]);
    }
}
