use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::db::models::NewMovie;

const OMDB_ENDPOINT: &str = "https://www.omdbapi.com/";

/// Transient network trouble is retried this many times, back to
/// back, before the lookup is given up as NoResponse. Matches the
/// tool's interactive use: either the API answers promptly or the
/// user gets told to try again later.
const MAX_ATTEMPTS: u32 = 10;

/// Outcome of an OMDb lookup. Callers treat NotFound and NoResponse
/// the same way: report and abandon the operation without touching
/// the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    NoResponse,
}

/// A title-search hit: just enough to let the user pick or confirm a
/// movie before the full record is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub imdb_id: String,
    pub title: String,
    pub year: String,
}

pub struct OmdbClient {
    api_key: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OmdbClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OMDB_ENDPOINT.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Search movies by title. Found(candidates) is never empty.
    pub fn search_by_title(&self, title: &str) -> Result<Lookup<Vec<Candidate>>> {
        let json = match self.request(&[("s", title), ("type", "movie")])? {
            Some(json) => json,
            None => return Ok(Lookup::NoResponse),
        };

        let hits = json
            .get("Search")
            .and_then(|s| s.as_array())
            .cloned()
            .unwrap_or_default();
        if hits.is_empty() {
            return Ok(Lookup::NotFound);
        }

        let mut candidates = Vec::new();
        for hit in hits {
            let hit: SearchHit =
                serde_json::from_value(hit).context("Failed to parse OMDb search result")?;
            candidates.push(Candidate {
                imdb_id: hit.imdb_id,
                title: hit.title,
                year: hit.year.unwrap_or_default(),
            });
        }
        Ok(Lookup::Found(candidates))
    }

    /// Fetch the full record for an IMDb ID.
    pub fn fetch_by_id(&self, id: &str) -> Result<Lookup<NewMovie>> {
        let json = match self.request(&[("i", id)])? {
            Some(json) => json,
            None => return Ok(Lookup::NoResponse),
        };

        if json.get("Response").and_then(|r| r.as_str()) == Some("False") {
            return Ok(Lookup::NotFound);
        }

        let record: OmdbRecord =
            serde_json::from_value(json).context("Failed to parse OMDb movie record")?;
        Ok(Lookup::Found(record.into_new_movie()))
    }

    /// One GET against the API with the bounded retry loop. Ok(None)
    /// means the retry budget ran out without a usable response.
    fn request(&self, params: &[(&str, &str)]) -> Result<Option<serde_json::Value>> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_once(params) {
                Ok(json) => return Ok(Some(json)),
                Err(err) => {
                    debug!(attempt, error = %err, "OMDb request failed");
                }
            }
        }
        warn!("No response from OMDb after {MAX_ATTEMPTS} attempts");
        Ok(None)
    }

    fn try_once(&self, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .context("Failed to send request to OMDb")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("OMDb returned {status}");
        }

        resp.json().context("Failed to parse OMDb response")
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: Option<String>,
}

/// Raw OMDb by-ID record. Every field except the ID and title may be
/// absent or the literal "N/A".
#[derive(Debug, Deserialize)]
struct OmdbRecord {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Released")]
    released: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Rated")]
    rated: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    imdb_votes: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Writer")]
    writer: Option<String>,
}

impl OmdbRecord {
    fn into_new_movie(self) -> NewMovie {
        NewMovie {
            id: self.imdb_id,
            title: self.title,
            year: opt(self.year).and_then(|s| s.parse().ok()),
            released: opt(self.released),
            runtime: opt(self.runtime).and_then(|s| parse_runtime(&s)),
            rated: opt(self.rated),
            plot: opt(self.plot),
            poster: opt(self.poster),
            imdb_rating: opt(self.imdb_rating).and_then(|s| s.parse().ok()),
            imdb_votes: opt(self.imdb_votes).and_then(|s| parse_votes(&s)),
            genres: split_list(self.genre.as_deref()),
            actors: split_list(self.actors.as_deref()),
            directors: split_list(self.director.as_deref()),
            writers: split_list(self.writer.as_deref()),
        }
    }
}

/// OMDb's "N/A" and empty strings become None.
fn opt(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty() && s != "N/A")
}

/// "148 min" -> 148
fn parse_runtime(raw: &str) -> Option<i64> {
    raw.split_whitespace().next()?.parse().ok()
}

/// "2,143,014" -> 2143014
fn parse_votes(raw: &str) -> Option<i64> {
    raw.replace(',', "").parse().ok()
}

/// Split an OMDb comma-joined list ("Drama, Sci-Fi"), trimming each
/// entry. Order is preserved; actors come billing-ordered.
fn split_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(s) if !s.is_empty() && s != "N/A" => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_conversion() {
        let json = serde_json::json!({
            "imdbID": "tt1375666",
            "Title": "Inception",
            "Year": "2010",
            "Released": "16 Jul 2010",
            "Runtime": "148 min",
            "Rated": "PG-13",
            "Plot": "A thief who steals corporate secrets...",
            "Poster": "https://example.com/poster.jpg",
            "imdbRating": "8.8",
            "imdbVotes": "2,143,014",
            "Genre": "Action, Adventure, Sci-Fi",
            "Actors": "Leonardo DiCaprio, Joseph Gordon-Levitt, Elliot Page",
            "Director": "Christopher Nolan",
            "Writer": "Christopher Nolan",
            "Response": "True"
        });
        let record: OmdbRecord = serde_json::from_value(json).unwrap();
        let m = record.into_new_movie();

        assert_eq!(m.id, "tt1375666");
        assert_eq!(m.year, Some(2010));
        assert_eq!(m.runtime, Some(148));
        assert_eq!(m.imdb_rating, Some(8.8));
        assert_eq!(m.imdb_votes, Some(2_143_014));
        assert_eq!(m.genres, vec!["Action", "Adventure", "Sci-Fi"]);
        assert_eq!(
            m.actors,
            vec!["Leonardo DiCaprio", "Joseph Gordon-Levitt", "Elliot Page"]
        );
    }

    #[test]
    fn test_na_fields_become_none() {
        let json = serde_json::json!({
            "imdbID": "tt0000000",
            "Title": "Obscure",
            "Year": "N/A",
            "Runtime": "N/A",
            "imdbVotes": "N/A",
            "Genre": "N/A",
            "Response": "True"
        });
        let record: OmdbRecord = serde_json::from_value(json).unwrap();
        let m = record.into_new_movie();

        assert_eq!(m.year, None);
        assert_eq!(m.runtime, None);
        assert_eq!(m.imdb_votes, None);
        assert!(m.genres.is_empty());
    }

    #[test]
    fn test_split_list_trims_entries() {
        assert_eq!(
            split_list(Some("Drama ,  Sci-Fi,Thriller")),
            vec!["Drama", "Sci-Fi", "Thriller"]
        );
        assert!(split_list(Some("N/A")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_runtime_and_votes_parsing() {
        assert_eq!(parse_runtime("90 min"), Some(90));
        assert_eq!(parse_runtime("min"), None);
        assert_eq!(parse_votes("1,234"), Some(1234));
        assert_eq!(parse_votes("abc"), None);
    }
}
