use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reels::config::{self, ReelsConfig};
use reels::db::Database;
use reels::format::canonical_format;
use reels::omdb::{Candidate, Lookup, OmdbClient};
use reels::output::{json as json_out, table};
use reels::search::filters::Filters;

#[derive(Parser)]
#[command(name = "reels", version, about = "Reels — track owned movies, series and viewing dates, with OMDb metadata")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to database file (default: ~/.reels/reels.db)
    #[arg(long, global = true, env = "REELS_DB")]
    db: Option<PathBuf>,

    /// OMDb API key (overrides env and config file)
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the collection with optional filters
    Search {
        /// Runtime condition in minutes, e.g. "< 120"
        #[arg(long)]
        runtime: Option<String>,

        /// Time since last viewing, e.g. "> 1 year"
        #[arg(long = "last-viewed")]
        last_viewed: Option<String>,

        /// Exact series name
        #[arg(long)]
        series: Option<String>,
    },

    /// Add an owned copy of a movie (fetches metadata on first sight)
    Add {
        /// Movie title to look up on OMDb
        title: String,

        /// Format of the copy: blu ray, DVD, iTunes, UltraViolet
        #[arg(long)]
        format: String,
    },

    /// Delete an owned copy
    Delete {
        /// Movie title to look up on OMDb
        title: String,

        /// Format of the copy to delete
        #[arg(long)]
        format: String,
    },

    /// Record one or more viewing dates for a movie
    Watched {
        /// Movie title to look up on OMDb
        title: String,

        /// Viewing dates (YYYY-MM-DD)
        #[arg(required = true)]
        dates: Vec<String>,
    },

    /// Add a movie to a named series
    Series {
        /// Movie title to look up on OMDb
        title: String,

        /// Series name
        name: String,
    },

    /// Show movie details
    Show {
        /// IMDb ID (e.g. tt1375666)
        id: String,
    },

    /// Show collection statistics
    Stats,

    /// Show database info
    Info,

    /// Write a starter config file
    Init,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let json_output = cli.json;

    if let Commands::Init = cli.command {
        let created = config::init_config()?;
        let path = config::config_path()?;
        if created {
            println!("Wrote {}", path.display());
        } else {
            println!("Config already exists: {}", path.display());
        }
        return Ok(());
    }

    let db_path = match cli.db {
        Some(path) => path,
        None => Database::default_db_path()?,
    };
    let db = Database::open(&db_path)?;

    match cli.command {
        Commands::Search {
            runtime,
            last_viewed,
            series,
        } => {
            let filters = Filters {
                runtime,
                series,
                last_viewed,
            };
            let today = chrono::Local::now().date_naive();

            // A malformed filter aborts the whole search: empty
            // result plus the diagnostic, never a partial match.
            let plan = match filters.plan(today) {
                Ok(plan) => plan,
                Err(err) => {
                    if json_output {
                        json_out::print_json(&serde_json::json!({
                            "total": 0,
                            "movies": [],
                            "error": err.to_string(),
                        }))?;
                    } else {
                        println!("{err}");
                        println!("No matching movies.");
                    }
                    return Ok(());
                }
            };

            let results = db.search_movies(&plan)?;
            if json_output {
                json_out::print_json(&serde_json::json!({
                    "total": results.len(),
                    "movies": results,
                }))?;
            } else {
                table::print_search_results(&results, &plan);
            }
        }

        Commands::Add { title, format } => {
            let format = canonical_format(&format)?;
            let client = omdb_client(cli.api_key.as_deref())?;

            let Some(candidate) = resolve_movie(&client, &title)? else {
                return Ok(());
            };

            if db.owns_format(&candidate.imdb_id, format)? {
                println!("Already in the database: {} ({})", candidate.title, format);
                return Ok(());
            }

            // First copy of this movie: pull the full record before
            // touching the database, so an unanswered lookup leaves
            // no partial state behind.
            if !db.movie_exists(&candidate.imdb_id)? {
                let movie = match client.fetch_by_id(&candidate.imdb_id)? {
                    Lookup::Found(movie) => movie,
                    Lookup::NotFound | Lookup::NoResponse => {
                        println!("No data from OMDb for {}; nothing added.", candidate.title);
                        return Ok(());
                    }
                };
                db.insert_movie(&movie)?;
            }

            db.add_format(&candidate.imdb_id, format)?;
            println!("{} ({}) added", candidate.title, format);
        }

        Commands::Delete { title, format } => {
            let format = canonical_format(&format)?;
            let client = omdb_client(cli.api_key.as_deref())?;

            let Some(candidate) = resolve_movie(&client, &title)? else {
                return Ok(());
            };

            if db.remove_format(&candidate.imdb_id, format)? {
                println!("{} ({}) deleted", candidate.title, format);
            } else {
                println!("Not in the database.");
            }
        }

        Commands::Watched { title, dates } => {
            let client = omdb_client(cli.api_key.as_deref())?;

            let Some(candidate) = resolve_movie(&client, &title)? else {
                return Ok(());
            };

            if !db.movie_exists(&candidate.imdb_id)? {
                println!("{} is not in the database; add it first.", candidate.title);
                return Ok(());
            }

            for date in &dates {
                if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                    println!("Not a valid date (YYYY-MM-DD): {date}");
                    continue;
                }
                if db.add_viewing(&candidate.imdb_id, date)? {
                    println!("Added viewing date {} for {}", date, candidate.title);
                } else {
                    println!(
                        "Viewing date {} already recorded for {}",
                        date, candidate.title
                    );
                }
            }
        }

        Commands::Series { title, name } => {
            let client = omdb_client(cli.api_key.as_deref())?;

            let Some(candidate) = resolve_movie(&client, &title)? else {
                return Ok(());
            };

            if !db.movie_exists(&candidate.imdb_id)? {
                println!("{} is not in the database; add it first.", candidate.title);
                return Ok(());
            }

            if db.add_series(&candidate.imdb_id, &name)? {
                println!("Added {} to the series {}", candidate.title, name);
            } else {
                println!("{} is already in the series {}", candidate.title, name);
            }
        }

        Commands::Show { id } => {
            let movie = db
                .get_movie(&id)?
                .with_context(|| format!("Movie not found: {id}"))?;
            let genres = db.get_genres(&id)?;
            let actors = db.get_actors(&id)?;
            let directors = db.get_directors(&id)?;
            let writers = db.get_writers(&id)?;
            let formats = db.get_formats(&id)?;
            let series = db.get_series(&id)?;
            let viewings = db.get_viewings(&id)?;

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "movie": movie,
                    "genres": genres,
                    "actors": actors,
                    "directors": directors,
                    "writers": writers,
                    "formats": formats,
                    "series": series,
                    "viewings": viewings,
                }))?;
            } else {
                table::print_movie_detail(
                    &movie, &genres, &actors, &directors, &writers, &formats, &series, &viewings,
                );
            }
        }

        Commands::Stats => {
            let stats = db.stats()?;
            if json_output {
                json_out::print_json(&stats)?;
            } else {
                table::print_stats(&stats);
            }
        }

        Commands::Info => {
            let stats = db.stats()?;
            let schema_ver: String = db
                .conn
                .query_row(
                    "SELECT value FROM reels_meta WHERE key = 'schema_version'",
                    [],
                    |r| r.get(0),
                )
                .unwrap_or_else(|_| "unknown".to_string());

            if json_output {
                json_out::print_json(&serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "schema_version": schema_ver,
                    "db_path": db.path.display().to_string(),
                    "db_size_bytes": stats.db_size_bytes,
                    "movies": stats.movies,
                    "copies": stats.copies,
                }))?;
            } else {
                println!("reels v{}", env!("CARGO_PKG_VERSION"));
                println!("  Schema:   v{schema_ver}");
                println!("  Database: {}", db.path.display());
                println!("  Size:     {}", format_bytes(stats.db_size_bytes));
                println!("  Movies:   {}", stats.movies);
                println!("  Copies:   {}", stats.copies);
            }
        }

        Commands::Init => unreachable!("handled above"),
    }

    Ok(())
}

/// Build the OMDb client from the credential chain and the optional
/// base_url override in the config file.
fn omdb_client(api_key_flag: Option<&str>) -> Result<OmdbClient> {
    let cfg = ReelsConfig::load()?;
    let api_key = config::resolve_api_key(api_key_flag, cfg.omdb.as_ref())?;
    let client = match cfg.omdb.and_then(|o| o.base_url) {
        Some(base_url) => OmdbClient::with_base_url(api_key, base_url),
        None => OmdbClient::new(api_key),
    };
    Ok(client)
}

/// Look a title up on OMDb and let the user confirm or pick a match.
/// Ok(None) means the operation should be abandoned, whether because
/// nothing matched, OMDb didn't answer, or the user declined.
fn resolve_movie(client: &OmdbClient, title: &str) -> Result<Option<Candidate>> {
    let candidates = match client.search_by_title(title)? {
        Lookup::Found(candidates) => candidates,
        Lookup::NotFound => {
            println!("No movies found matching {title}");
            return Ok(None);
        }
        Lookup::NoResponse => {
            println!("No response from OMDb.");
            return Ok(None);
        }
    };

    if candidates.len() == 1 {
        let candidate = &candidates[0];
        println!("Found {} ({})", candidate.title, candidate.year);
        eprint!("Is this the right movie? [Y/n] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if answer.trim().to_lowercase().starts_with('n') {
            println!("Cancelled.");
            return Ok(None);
        }
        return Ok(Some(candidate.clone()));
    }

    println!("Select a movie, or press Enter to cancel:");
    table::print_candidates(&candidates);
    let mut choice = String::new();
    std::io::stdin().read_line(&mut choice)?;
    let choice = choice.trim();
    if choice.is_empty() {
        println!("Cancelled.");
        return Ok(None);
    }

    let picked = choice.parse::<usize>().ok().and_then(|i| candidates.get(i));
    match picked {
        Some(candidate) => Ok(Some(candidate.clone())),
        None => {
            println!("Cancelled.");
            Ok(None)
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
