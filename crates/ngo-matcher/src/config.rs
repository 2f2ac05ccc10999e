use std::path::PathBuf;
use std::time::Duration;

use ngo_common::directory::DEFAULT_RETRIEVAL_LIMIT;

use crate::error::AppError;
use crate::patterns::MatchMode;

/// Where candidate NGOs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    Http { base_url: String },
    File { path: PathBuf },
}

/// Application configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub directory: DirectorySource,
    /// Optional JSON pattern set; the built-in categories are used when `None`.
    pub patterns_file: Option<PathBuf>,
    pub match_mode: MatchMode,
    /// Upper bound on a single directory call, retries included.
    pub retrieval_timeout: Duration,
    pub retrieval_limit: usize,
    /// Serve the HTTP API here; MCP is served instead when `None`.
    pub http_listen_addr: Option<String>,
    pub mcp_tcp_listen_addr: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required (exactly one):
    /// - `NGO_DIRECTORY_URL`: base URL of the NGO directory service
    /// - `NGO_DIRECTORY_FILE`: JSON snapshot of NGO records
    ///
    /// Optional:
    /// - `CATEGORY_PATTERNS_FILE`
    /// - `KEYWORD_MATCH_MODE` (`substring` | `word`, default: substring)
    /// - `RETRIEVAL_TIMEOUT_MS` (default: 5000)
    /// - `RETRIEVAL_LIMIT` (default: 20)
    /// - `HTTP_LISTEN_ADDR`, `MCP_TCP_LISTEN_ADDR`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let directory = match (non_empty("NGO_DIRECTORY_URL"), non_empty("NGO_DIRECTORY_FILE")) {
            (Some(base_url), None) => DirectorySource::Http { base_url },
            (None, Some(path)) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "NGO_DIRECTORY_FILE not found: {}",
                        path.display()
                    )));
                }
                DirectorySource::File { path }
            }
            (Some(_), Some(_)) => {
                return Err(AppError::Config(
                    "set only one of NGO_DIRECTORY_URL or NGO_DIRECTORY_FILE".to_string(),
                ))
            }
            (None, None) => {
                return Err(AppError::Config(
                    "NGO_DIRECTORY_URL or NGO_DIRECTORY_FILE environment variable is required"
                        .to_string(),
                ))
            }
        };

        let match_mode = match non_empty("KEYWORD_MATCH_MODE") {
            Some(mode) => mode.parse()?,
            None => MatchMode::default(),
        };

        let retrieval_timeout = parse_number::<u64>(&non_empty, "RETRIEVAL_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5_000));

        let retrieval_limit = parse_number::<usize>(&non_empty, "RETRIEVAL_LIMIT")?
            .unwrap_or(DEFAULT_RETRIEVAL_LIMIT);
        if retrieval_limit == 0 {
            return Err(AppError::Config("RETRIEVAL_LIMIT must be positive".to_string()));
        }

        Ok(Self {
            directory,
            patterns_file: non_empty("CATEGORY_PATTERNS_FILE").map(PathBuf::from),
            match_mode,
            retrieval_timeout,
            retrieval_limit,
            http_listen_addr: non_empty("HTTP_LISTEN_ADDR"),
            mcp_tcp_listen_addr: non_empty("MCP_TCP_LISTEN_ADDR"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| AppError::Config(format!("{key} must be a number, got '{raw}'")))
        })
        .transpose()
}
