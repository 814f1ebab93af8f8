use anyhow::{bail, Result};
use regex::Regex;

/// Formats a copy can be owned in, in their canonical spellings.
pub const VALID_FORMATS: [&str; 4] = ["blu ray", "DVD", "iTunes", "UltraViolet"];

/// Map a user-typed format name to its canonical spelling, ignoring
/// case, whitespace, punctuation and underscores ("Blu-Ray", "blu_ray"
/// and "bluray" all canonicalize to "blu ray").
pub fn canonical_format(raw: &str) -> Result<&'static str> {
    let strip = Regex::new(r"[\W_]+").expect("static pattern");
    let normalized = strip.replace_all(raw, "").to_lowercase();

    for valid in VALID_FORMATS {
        if strip.replace_all(valid, "").to_lowercase() == normalized {
            return Ok(valid);
        }
    }

    bail!(
        "Unknown format {:?}. Valid formats: {}",
        raw,
        VALID_FORMATS.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_spellings_pass_through() {
        for valid in VALID_FORMATS {
            assert_eq!(canonical_format(valid).unwrap(), valid);
        }
    }

    #[test]
    fn test_variant_spellings_canonicalize() {
        assert_eq!(canonical_format("Blu-Ray").unwrap(), "blu ray");
        assert_eq!(canonical_format("bluray").unwrap(), "blu ray");
        assert_eq!(canonical_format("blu_ray").unwrap(), "blu ray");
        assert_eq!(canonical_format("dvd").unwrap(), "DVD");
        assert_eq!(canonical_format("ITUNES").unwrap(), "iTunes");
        assert_eq!(canonical_format("ultra-violet").unwrap(), "UltraViolet");
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(canonical_format("VHS").is_err());
        assert!(canonical_format("").is_err());
    }
}
