use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, FutureExt};
use reqwest::{StatusCode, Url};
use tracing::warn;

use crate::directory::{validate_records, ActiveNgoQuery, NgoDirectory};
use crate::error::CommonError;
use crate::ngo::{NgoRecord, RawNgoRecord};

const SORT_ORDER: &str = "rating:desc,createdAt:desc";

#[derive(Clone, Debug)]
pub struct HttpDirectoryConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl HttpDirectoryConfig {
    /// Defaults keep `worst_case_duration` under the engine's 5s retrieval bound.
    pub fn with_defaults(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(2_000),
            max_error_body_bytes: 8 * 1024,
        }
    }

    /// Tuning knobs for the directory client. The base URL is passed in by the caller;
    /// everything else falls back to defaults when unset or unparsable.
    pub fn from_env(base_url: &str) -> Self {
        let defaults = Self::with_defaults(base_url);

        let timeout = std::env::var("NGO_DIRECTORY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let max_retries = std::env::var("NGO_DIRECTORY_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_retries);

        let initial_backoff = std::env::var("NGO_DIRECTORY_RETRY_INITIAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_backoff);

        let max_backoff = std::env::var("NGO_DIRECTORY_RETRY_MAX_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_backoff);

        let max_error_body_bytes = std::env::var("NGO_DIRECTORY_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_error_body_bytes);

        Self {
            timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
            ..defaults
        }
    }

    /// Longest a single directory call can take: every attempt timing out, plus the
    /// largest possible backoff between attempts.
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff_ms = (0..self.max_retries)
            .map(|exponent| {
                let (base_ms, jitter_cap) =
                    backoff_bounds(self.initial_backoff, self.max_backoff, exponent);
                base_ms.saturating_add(jitter_cap)
            })
            .fold(0u64, u64::saturating_add);
        self.timeout
            .saturating_mul(attempts)
            .saturating_add(Duration::from_millis(backoff_ms))
    }
}

/// REST client for the NGO directory service.
///
/// - `GET {base}/ngos/{id}`: single record, 404 when unknown
/// - `GET {base}/ngos?status=active&category=..&sort=..&limit=..`: JSON array
#[derive(Clone)]
pub struct HttpDirectory {
    config: HttpDirectoryConfig,
    base: Url,
    http: reqwest::Client,
}

impl HttpDirectory {
    pub fn new(config: HttpDirectoryConfig) -> Result<Self, CommonError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| CommonError::InvalidBaseUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(CommonError::InvalidBaseUrl(config.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .user_agent("ngo-matcher")
            .build()?;
        Ok(Self { config, base, http })
    }

    pub fn config(&self) -> &HttpDirectoryConfig {
        &self.config
    }

    /// `{base}/ngos`, or `{base}/ngos/{id}` with the id as one encoded segment.
    fn endpoint(&self, id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("ngos");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<NgoRecord>, CommonError> {
        // Empty and dot segments would address the listing, not a record.
        if matches!(id, "" | "." | "..") {
            return Ok(None);
        }
        let url = self.endpoint(Some(id));
        let record = self
            .request_with_retry(|| async {
                let resp = self
                    .http
                    .get(url.clone())
                    .timeout(self.config.timeout)
                    .send()
                    .await?;
                if resp.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if !resp.status().is_success() {
                    return Err(to_upstream_error(resp, self.config.max_error_body_bytes).await);
                }
                let raw = resp.json::<RawNgoRecord>().await?;
                NgoRecord::try_from(raw).map(Some)
            })
            .await?;

        match record {
            Some(record) if record.id != id => Err(CommonError::InvalidRecord(format!(
                "requested {id}, directory returned {}",
                record.id
            ))),
            other => Ok(other),
        }
    }

    async fn fetch_active(&self, query: &ActiveNgoQuery) -> Result<Vec<NgoRecord>, CommonError> {
        let url = self.endpoint(None);
        let mut params: Vec<(&str, String)> = vec![
            ("status", "active".to_string()),
            ("sort", SORT_ORDER.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(categories) = &query.category_in {
            params.extend(categories.iter().map(|c| ("category", c.clone())));
        }

        let values = self
            .request_with_retry(|| async {
                let resp = self
                    .http
                    .get(url.clone())
                    .query(&params)
                    .timeout(self.config.timeout)
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(to_upstream_error(resp, self.config.max_error_body_bytes).await);
                }
                Ok(resp.json::<Vec<serde_json::Value>>().await?)
            })
            .await?;

        // The directory is trusted for order but not for shape or bounds.
        let mut records: Vec<NgoRecord> = validate_records(values)
            .into_iter()
            .filter(|r| r.is_active() && query.matches_category(&r.category))
            .collect();
        records.truncate(query.limit);
        Ok(records)
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CommonError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CommonError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "directory request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl NgoDirectory for HttpDirectory {
    fn find_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<NgoRecord>, CommonError>> {
        self.fetch_by_id(id).boxed()
    }

    fn find_active<'a>(
        &'a self,
        query: &'a ActiveNgoQuery,
    ) -> BoxFuture<'a, Result<Vec<NgoRecord>, CommonError>> {
        self.fetch_active(query).boxed()
    }
}

fn should_retry(err: &CommonError) -> bool {
    match err {
        CommonError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        CommonError::Upstream { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        CommonError::InvalidBaseUrl(_)
        | CommonError::InvalidJson(_)
        | CommonError::Snapshot(_)
        | CommonError::InvalidRecord(_) => false,
    }
}

/// Capped exponential delay in ms and the most jitter that may be added to it.
fn backoff_bounds(initial: Duration, max: Duration, exponent: u32) -> (u64, u64) {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    (capped_ms, std::cmp::max(1, capped_ms / 4))
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let (capped_ms, jitter_cap) = backoff_bounds(initial, max, exponent);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    (now.subsec_nanos() as u64) % (max_inclusive + 1)
}

async fn to_upstream_error(resp: reqwest::Response, max_bytes: usize) -> CommonError {
    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read directory error body");
            "<failed to read error body>".to_string()
        }
    };
    CommonError::Upstream { status, body }
}
