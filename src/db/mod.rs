pub mod migrations;
pub mod models;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::info;

use models::*;

pub struct Database {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // Performance pragmas
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;

        info!("Opened database: {}", path.display());

        Ok(Database {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Default database path: ~/.reels/reels.db
    pub fn default_db_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".reels").join("reels.db"))
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::create_schema(&conn)?;
        migrations::run_migrations(&conn)?;
        Ok(Database {
            conn,
            path: PathBuf::new(),
        })
    }

    /// Insert a movie with its genre/actor/director/writer lists.
    /// Called at most once per IMDb ID; callers check `movie_exists`
    /// first and movie rows are never updated afterwards.
    pub fn insert_movie(&self, m: &NewMovie) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO movies (id, title, year, released, runtime, rated, plot, poster, imdb_rating, imdb_votes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                m.id,
                m.title,
                m.year,
                m.released,
                m.runtime,
                m.rated,
                m.plot,
                m.poster,
                m.imdb_rating,
                m.imdb_votes,
            ],
        )?;

        for genre in &m.genres {
            tx.execute(
                "INSERT OR IGNORE INTO genres (id, genre) VALUES (?1, ?2)",
                rusqlite::params![m.id, genre],
            )?;
        }

        // Billing order is 1-based
        for (i, name) in m.actors.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO actors (id, name, ord) VALUES (?1, ?2, ?3)",
                rusqlite::params![m.id, name, (i + 1) as i64],
            )?;
        }

        for name in &m.directors {
            tx.execute(
                "INSERT OR IGNORE INTO directors (id, name) VALUES (?1, ?2)",
                rusqlite::params![m.id, name],
            )?;
        }

        for name in &m.writers {
            tx.execute(
                "INSERT OR IGNORE INTO writers (id, name) VALUES (?1, ?2)",
                rusqlite::params![m.id, name],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Check if a movie record exists.
    pub fn movie_exists(&self, id: &str) -> Result<bool> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM movies WHERE id = ?1", [id], |r| {
                    r.get(0)
                })?;
        Ok(count > 0)
    }

    /// Get a single movie by IMDb ID.
    pub fn get_movie(&self, id: &str) -> Result<Option<Movie>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, year, released, runtime, rated, plot, poster, imdb_rating, imdb_votes, created_at
             FROM movies WHERE id = ?1",
        )?;

        let result = stmt
            .query_row([id], |row| {
                Ok(Movie {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    year: row.get(2)?,
                    released: row.get(3)?,
                    runtime: row.get(4)?,
                    rated: row.get(5)?,
                    plot: row.get(6)?,
                    poster: row.get(7)?,
                    imdb_rating: row.get(8)?,
                    imdb_votes: row.get(9)?,
                    created_at: row.get(10)?,
                })
            })
            .optional()?;

        Ok(result)
    }

    /// Check whether a copy of the movie is owned in the given format.
    pub fn owns_format(&self, id: &str, format: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM formats WHERE id = ?1 AND format = ?2",
            [id, format],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record an owned copy. Callers check `owns_format` first.
    pub fn add_format(&self, id: &str, format: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO formats (id, format) VALUES (?1, ?2)",
            [id, format],
        )?;
        Ok(())
    }

    /// Delete one owned copy. Returns false if it wasn't recorded.
    /// Movie metadata is kept even when the last copy goes; viewing
    /// history still refers to it.
    pub fn remove_format(&self, id: &str, format: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM formats WHERE id = ?1 AND format = ?2",
            [id, format],
        )?;
        Ok(deleted > 0)
    }

    /// Record a viewing date (ISO, YYYY-MM-DD) and rebuild the
    /// latest-viewings aggregate in the same transaction. Returns
    /// false (and writes nothing) if that exact date is already on
    /// record for the movie.
    pub fn add_viewing(&self, id: &str, watched: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let already: i64 = tx.query_row(
            "SELECT COUNT(*) FROM viewings WHERE id = ?1 AND watched = ?2",
            [id, watched],
            |r| r.get(0),
        )?;
        if already > 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO viewings (id, watched) VALUES (?1, ?2)",
            [id, watched],
        )?;
        rebuild_latest_viewings(&tx)?;

        tx.commit()?;
        Ok(true)
    }

    /// Most recent viewing date for a movie, if any.
    pub fn latest_viewing(&self, id: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row(
                "SELECT watched FROM latest_viewings WHERE id = ?1",
                [id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// Record a series membership. Returns false if it already exists.
    pub fn add_series(&self, id: &str, series: &str) -> Result<bool> {
        let already: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM series WHERE id = ?1 AND series = ?2",
            [id, series],
            |r| r.get(0),
        )?;
        if already > 0 {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO series (id, series) VALUES (?1, ?2)",
            [id, series],
        )?;
        Ok(true)
    }

    /// Get genres for a movie.
    pub fn get_genres(&self, id: &str) -> Result<Vec<String>> {
        self.string_column("SELECT genre FROM genres WHERE id = ?1 ORDER BY genre", id)
    }

    /// Get actors for a movie, in billing order.
    pub fn get_actors(&self, id: &str) -> Result<Vec<String>> {
        self.string_column("SELECT name FROM actors WHERE id = ?1 ORDER BY ord", id)
    }

    /// Get directors for a movie.
    pub fn get_directors(&self, id: &str) -> Result<Vec<String>> {
        self.string_column("SELECT name FROM directors WHERE id = ?1 ORDER BY name", id)
    }

    /// Get writers for a movie.
    pub fn get_writers(&self, id: &str) -> Result<Vec<String>> {
        self.string_column("SELECT name FROM writers WHERE id = ?1 ORDER BY name", id)
    }

    /// Get owned formats for a movie.
    pub fn get_formats(&self, id: &str) -> Result<Vec<String>> {
        self.string_column(
            "SELECT format FROM formats WHERE id = ?1 ORDER BY format",
            id,
        )
    }

    /// Get series memberships for a movie.
    pub fn get_series(&self, id: &str) -> Result<Vec<String>> {
        self.string_column("SELECT series FROM series WHERE id = ?1 ORDER BY series", id)
    }

    /// Get viewing dates for a movie, newest first.
    pub fn get_viewings(&self, id: &str) -> Result<Vec<String>> {
        self.string_column(
            "SELECT watched FROM viewings WHERE id = ?1 ORDER BY watched DESC",
            id,
        )
    }

    fn string_column(&self, sql: &str, id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([id], |row| row.get(0))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    /// Get database statistics.
    pub fn stats(&self) -> Result<DbStats> {
        let movies: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM movies", [], |r| r.get(0))?;
        let copies: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM formats", [], |r| r.get(0))?;
        let viewings: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM viewings", [], |r| r.get(0))?;
        let series: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT series) FROM series", [], |r| {
                r.get(0)
            })?;
        let never_watched: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM movies m
             WHERE NOT EXISTS (SELECT 1 FROM viewings v WHERE v.id = m.id)",
            [],
            |r| r.get(0),
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT format, COUNT(*) FROM formats GROUP BY format ORDER BY format")?;
        let format_rows = stmt.query_map([], |row| {
            Ok(FormatCount {
                format: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let mut formats = Vec::new();
        for row in format_rows {
            formats.push(row?);
        }

        let db_size_bytes = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            movies,
            copies,
            viewings,
            series,
            never_watched,
            formats,
            db_size_bytes,
        })
    }
}

/// Rebuild the latest-viewings aggregate from the viewings table.
/// Full rebuild rather than incremental patch: the table is tiny for
/// a personal collection and this keeps the view trivially consistent.
fn rebuild_latest_viewings(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM latest_viewings;
         INSERT INTO latest_viewings (id, watched)
         SELECT id, MAX(watched) FROM viewings GROUP BY id;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_movie(id: &str, title: &str, runtime: i64) -> NewMovie {
        NewMovie {
            id: id.to_string(),
            title: title.to_string(),
            year: Some(2010),
            released: Some("2010-07-16".to_string()),
            runtime: Some(runtime),
            rated: Some("PG-13".to_string()),
            plot: None,
            poster: None,
            imdb_rating: Some(8.8),
            imdb_votes: Some(2_000_000),
            genres: vec!["Action".to_string(), "Sci-Fi".to_string()],
            actors: vec!["Leonardo DiCaprio".to_string(), "Elliot Page".to_string()],
            directors: vec!["Christopher Nolan".to_string()],
            writers: vec!["Christopher Nolan".to_string()],
        }
    }

    #[test]
    fn test_insert_and_get_movie() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();

        assert!(db.movie_exists("tt1375666").unwrap());
        let m = db.get_movie("tt1375666").unwrap().unwrap();
        assert_eq!(m.title, "Inception");
        assert_eq!(m.runtime, Some(148));

        assert_eq!(
            db.get_genres("tt1375666").unwrap(),
            vec!["Action", "Sci-Fi"]
        );
        // Billing order, not alphabetical
        assert_eq!(
            db.get_actors("tt1375666").unwrap(),
            vec!["Leonardo DiCaprio", "Elliot Page"]
        );
    }

    #[test]
    fn test_format_ownership_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();

        assert!(!db.owns_format("tt1375666", "DVD").unwrap());
        db.add_format("tt1375666", "DVD").unwrap();
        assert!(db.owns_format("tt1375666", "DVD").unwrap());

        assert!(db.remove_format("tt1375666", "DVD").unwrap());
        assert!(!db.remove_format("tt1375666", "DVD").unwrap());
        // Metadata survives losing the last copy
        assert!(db.movie_exists("tt1375666").unwrap());
    }

    #[test]
    fn test_add_viewing_rebuilds_latest() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();

        assert!(db.add_viewing("tt1375666", "2023-05-01").unwrap());
        assert_eq!(
            db.latest_viewing("tt1375666").unwrap().as_deref(),
            Some("2023-05-01")
        );

        // A newer date moves the aggregate, an older one doesn't
        assert!(db.add_viewing("tt1375666", "2024-01-15").unwrap());
        assert_eq!(
            db.latest_viewing("tt1375666").unwrap().as_deref(),
            Some("2024-01-15")
        );
        assert!(db.add_viewing("tt1375666", "2022-11-30").unwrap());
        assert_eq!(
            db.latest_viewing("tt1375666").unwrap().as_deref(),
            Some("2024-01-15")
        );
    }

    #[test]
    fn test_duplicate_viewing_is_noop() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();

        assert!(db.add_viewing("tt1375666", "2024-01-15").unwrap());
        assert!(!db.add_viewing("tt1375666", "2024-01-15").unwrap());
        assert_eq!(db.get_viewings("tt1375666").unwrap().len(), 1);
        assert_eq!(
            db.latest_viewing("tt1375666").unwrap().as_deref(),
            Some("2024-01-15")
        );
    }

    #[test]
    fn test_duplicate_series_is_noop() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();

        assert!(db.add_series("tt1375666", "Nolan mind-benders").unwrap());
        assert!(!db.add_series("tt1375666", "Nolan mind-benders").unwrap());
        assert_eq!(db.get_series("tt1375666").unwrap().len(), 1);
    }

    #[test]
    fn test_never_watched_has_no_latest() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();
        assert_eq!(db.latest_viewing("tt1375666").unwrap(), None);
    }

    #[test]
    fn test_stats_counts() {
        let db = Database::open_in_memory().unwrap();
        db.insert_movie(&sample_movie("tt1375666", "Inception", 148))
            .unwrap();
        db.insert_movie(&sample_movie("tt0816692", "Interstellar", 169))
            .unwrap();
        db.add_format("tt1375666", "DVD").unwrap();
        db.add_format("tt1375666", "iTunes").unwrap();
        db.add_viewing("tt1375666", "2024-01-15").unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.movies, 2);
        assert_eq!(stats.copies, 2);
        assert_eq!(stats.viewings, 1);
        assert_eq!(stats.never_watched, 1);
        assert_eq!(stats.formats.len(), 2);
    }
}
