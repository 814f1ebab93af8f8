use unicode_width::UnicodeWidthStr;

use crate::db::models::{DbStats, Movie};
use crate::omdb::Candidate;
use crate::search::filters::QueryPlan;
use crate::search::MovieRow;

/// Format a runtime in minutes to human-readable string.
pub fn format_runtime(minutes: i64) -> String {
    let h = minutes / 60;
    let m = minutes % 60;
    if h > 0 {
        format!("{h}h{m:02}m")
    } else {
        format!("{m}m")
    }
}

/// Truncate a string to fit within max_width (respecting unicode width).
fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + cw + 3 > max_width {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += cw;
    }
    result
}

/// Format search results as a table. Columns follow the plan's
/// projection: title always, then runtime/series/last-watched as the
/// corresponding filters were active.
pub fn print_search_results(rows: &[MovieRow], plan: &QueryPlan) {
    if rows.is_empty() {
        println!("No matching movies.");
        return;
    }

    println!(
        "{} movie{}:\n",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    );

    let mut header = format!("  {:<42}", "TITLE");
    if plan.with_runtime {
        header.push_str(&format!(" {:<8}", "RUNTIME"));
    }
    if plan.with_series {
        header.push_str(&format!(" {:<20}", "SERIES"));
    }
    if plan.with_last_watched {
        header.push_str(&format!(" {:<12}", "LAST SEEN"));
    }
    println!("{header}");
    println!("  {}", "-".repeat(header.len().saturating_sub(2)));

    for row in rows {
        let mut line = format!("  {:<42}", truncate(&row.title, 40));
        if plan.with_runtime {
            let runtime = row
                .runtime
                .map(format_runtime)
                .unwrap_or_else(|| "?".to_string());
            line.push_str(&format!(" {runtime:<8}"));
        }
        if plan.with_series {
            let series = row.series.as_deref().unwrap_or("");
            line.push_str(&format!(" {:<20}", truncate(series, 18)));
        }
        if plan.with_last_watched {
            let seen = row.last_watched.as_deref().unwrap_or("(never)");
            line.push_str(&format!(" {seen:<12}"));
        }
        println!("{line}");
    }
}

/// Numbered candidate list for interactive selection.
pub fn print_candidates(candidates: &[Candidate]) {
    for (i, c) in candidates.iter().enumerate() {
        println!("{}: {} ({})", i, c.title, c.year);
    }
}

/// Full detail view for one movie.
#[allow(clippy::too_many_arguments)]
pub fn print_movie_detail(
    movie: &Movie,
    genres: &[String],
    actors: &[String],
    directors: &[String],
    writers: &[String],
    formats: &[String],
    series: &[String],
    viewings: &[String],
) {
    match movie.year {
        Some(year) => println!("{} ({})", movie.title, year),
        None => println!("{}", movie.title),
    }
    println!("  id:        {}", movie.id);
    if let Some(runtime) = movie.runtime {
        println!("  runtime:   {}", format_runtime(runtime));
    }
    if let Some(ref rated) = movie.rated {
        println!("  rated:     {rated}");
    }
    if let Some(ref released) = movie.released {
        println!("  released:  {released}");
    }
    if let Some(rating) = movie.imdb_rating {
        let votes = movie
            .imdb_votes
            .map(|v| format!(" ({v} votes)"))
            .unwrap_or_default();
        println!("  rating:    {rating}{votes}");
    }
    if !genres.is_empty() {
        println!("  genres:    {}", genres.join(", "));
    }
    if !directors.is_empty() {
        println!("  directors: {}", directors.join(", "));
    }
    if !writers.is_empty() {
        println!("  writers:   {}", writers.join(", "));
    }
    if !actors.is_empty() {
        println!("  actors:    {}", actors.join(", "));
    }
    if !formats.is_empty() {
        println!("  owned on:  {}", formats.join(", "));
    }
    if !series.is_empty() {
        println!("  series:    {}", series.join(", "));
    }
    if viewings.is_empty() {
        println!("  watched:   never");
    } else {
        println!("  watched:   {}", viewings.join(", "));
    }
    if let Some(ref plot) = movie.plot {
        println!("\n  {plot}");
    }
}

/// Stats summary for `reels stats`.
pub fn print_stats(stats: &DbStats) {
    println!("Collection");
    println!("  Movies:        {}", stats.movies);
    println!("  Owned copies:  {}", stats.copies);
    println!("  Viewings:      {}", stats.viewings);
    println!("  Series:        {}", stats.series);
    println!("  Never watched: {}", stats.never_watched);
    if !stats.formats.is_empty() {
        println!("  By format:");
        for fc in &stats.formats {
            println!("    {:<14} {}", fc.format, fc.count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(148), "2h28m");
        assert_eq!(format_runtime(60), "1h00m");
        assert_eq!(format_runtime(45), "45m");
        assert_eq!(format_runtime(0), "0m");
    }

    #[test]
    fn test_truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(50);
        let cut = truncate(&long, 10);
        assert!(cut.ends_with("..."));
        assert!(UnicodeWidthStr::width(cut.as_str()) <= 10);
    }
}
