use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub year: Option<i64>,
    pub released: Option<String>,
    pub runtime: Option<i64>,
    pub rated: Option<String>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: Option<i64>,
    pub created_at: String,
}

/// Data needed to insert a new movie (no auto-generated fields).
/// Built from an OMDb by-ID record; the list fields land in their own
/// tables keyed by the IMDb ID.
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub id: String,
    pub title: String,
    pub year: Option<i64>,
    pub released: Option<String>,
    pub runtime: Option<i64>,
    pub rated: Option<String>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub imdb_rating: Option<f64>,
    pub imdb_votes: Option<i64>,
    pub genres: Vec<String>,
    /// Billing order preserved; stored 1-based.
    pub actors: Vec<String>,
    pub directors: Vec<String>,
    pub writers: Vec<String>,
}

/// Stats returned by `reels stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub movies: i64,
    pub copies: i64,
    pub viewings: i64,
    pub series: i64,
    pub never_watched: i64,
    pub formats: Vec<FormatCount>,
    pub db_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatCount {
    pub format: String,
    pub count: i64,
}
