use anyhow::Result;
use rusqlite::Connection;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Version tracking
        CREATE TABLE IF NOT EXISTS reels_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Core table: one row per unique IMDb ID, inserted once when
        -- the first owned copy is recorded, never updated afterwards.
        CREATE TABLE IF NOT EXISTS movies (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            year INTEGER,
            released TEXT,
            runtime INTEGER,
            rated TEXT,
            plot TEXT,
            poster TEXT,
            imdb_rating REAL,
            imdb_votes INTEGER,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        -- Owned copies, one row per (movie, format)
        CREATE TABLE IF NOT EXISTS formats (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            format TEXT NOT NULL,
            PRIMARY KEY (id, format)
        );

        -- Watch history, one row per (movie, date)
        CREATE TABLE IF NOT EXISTS viewings (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            watched TEXT NOT NULL,
            PRIMARY KEY (id, watched)
        );

        -- Derived: most recent viewing per movie. Rebuilt in full in
        -- the same transaction as every viewing insert; never the
        -- authoritative copy of anything.
        CREATE TABLE IF NOT EXISTS latest_viewings (
            id TEXT PRIMARY KEY,
            watched TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS series (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            series TEXT NOT NULL,
            PRIMARY KEY (id, series)
        );

        CREATE TABLE IF NOT EXISTS genres (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            genre TEXT NOT NULL,
            PRIMARY KEY (id, genre)
        );

        -- ord preserves OMDb billing order (1-based)
        CREATE TABLE IF NOT EXISTS actors (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            ord INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (id, name)
        );

        CREATE TABLE IF NOT EXISTS directors (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            PRIMARY KEY (id, name)
        );

        CREATE TABLE IF NOT EXISTS writers (
            id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            PRIMARY KEY (id, name)
        );

        -- Indexes for common filters
        CREATE INDEX IF NOT EXISTS idx_movies_runtime ON movies(runtime);
        CREATE INDEX IF NOT EXISTS idx_series_series ON series(series);
        CREATE INDEX IF NOT EXISTS idx_viewings_id ON viewings(id);
        ",
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO reels_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
