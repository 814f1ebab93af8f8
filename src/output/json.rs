use anyhow::Result;
use serde::Serialize;

/// Pretty-print a serializable value as JSON to stdout (the `--json`
/// output path for every subcommand).
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
