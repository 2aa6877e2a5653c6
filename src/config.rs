use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "~/.c3po.json";

const DEFAULT_BASE_URL: &str = "https://api.keystone.disney.com";
const DEFAULT_APPLICATION_ID: &str = "4515ed23-5479-4cb0-a342-817b90e21241";
const DEFAULT_TOKEN_CACHE: &str = "~/.c3poAccessToken";

/// Client settings. Every field has a built-in default so a config file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub application_id: String,
    /// Directory sent with the username/password in the first login step.
    pub directory: String,
    /// Directory sent with the session pair in the token exchange.
    pub token_directory: String,
    /// Organizational prefix carried by group display names.
    pub org_prefix: String,
    pub token_cache_path: String,
    pub insecure_skip_verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            application_id: DEFAULT_APPLICATION_ID.to_string(),
            directory: "vds".to_string(),
            token_directory: "keystone".to_string(),
            org_prefix: "C3PO - ".to_string(),
            token_cache_path: DEFAULT_TOKEN_CACHE.to_string(),
            insecure_skip_verify: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&raw).context("parsing JSON")?;
        Ok(cfg)
    }

    /// Loads `path` when given. Without one, the default location is tried and
    /// built-in defaults are used if nothing is there.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(&expand_home(p)),
            None => {
                let default_path = expand_home(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    debug!(path = %default_path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn token_cache_path(&self) -> PathBuf {
        expand_home(&self.token_cache_path)
    }
}

/// Expands a bare `~` or a leading `~/` to the current user's home directory.
/// `~user` forms are left alone.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with(['/', '\\']) => rest.trim_start_matches(['/', '\\']),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}
