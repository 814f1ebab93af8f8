use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// OMDb configuration block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct OmdbConfig {
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub base_url: Option<String>,
}

/// Top-level reels config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ReelsConfig {
    pub omdb: Option<OmdbConfig>,
}

impl ReelsConfig {
    /// Load config from ~/.reels/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(ReelsConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: ReelsConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
        Ok(config)
    }
}

/// Resolve the OMDb API key through the chain: CLI flag > env var > config key > config command.
pub fn resolve_api_key(cli_flag: Option<&str>, config: Option<&OmdbConfig>) -> Result<String> {
    // 1. CLI flag
    if let Some(key) = cli_flag {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var("OMDB_API_KEY") {
        if !val.is_empty() {
            return Ok(val);
        }
    }

    if let Some(oc) = config {
        // 3. Config file api_key
        if let Some(ref key) = oc.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        // 4. External command
        if let Some(ref cmd) = oc.api_key_command {
            if !cmd.is_empty() {
                let output = std::process::Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .with_context(|| format!("Failed to run api_key_command: {cmd}"))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    bail!(
                        "api_key_command failed (exit {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    );
                }

                let secret = String::from_utf8(output.stdout)
                    .context("api_key_command output is not valid UTF-8")?
                    .trim()
                    .to_string();

                if !secret.is_empty() {
                    return Ok(secret);
                }
            }
        }
    }

    bail!("No OMDb API key found. Provide via --api-key, OMDB_API_KEY env var, or ~/.reels/config.toml")
}

/// Path to the config file: ~/.reels/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".reels").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.reels/config.toml
# Credential resolution order: CLI flag > OMDB_API_KEY env var > api_key > api_key_command

[omdb]
# api_key = "your-omdb-api-key"
# api_key_command = "your-secrets-manager-command-here"
# base_url = "https://www.omdbapi.com/"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}
