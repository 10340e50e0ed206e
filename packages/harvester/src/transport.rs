//! Rate-limited HTTP transport shared by all adapters.
//!
//! Two jobs: keep a minimum delay between any two outbound requests (shared
//! across hosts, so the whole roster is paced as one polite client), and
//! retry transient failures with exponential backoff. Anything that is not
//! transient propagates immediately. No caching.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::HarvesterConfig;
use crate::error::TransportError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Base delay for the first backoff sleep; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

pub struct Transport {
    client: reqwest::Client,
    min_delay: Duration,
    retry_count: u32,
    transient_statuses: Vec<u16>,
    /// When the previous request went out. Held across the pacing sleep so
    /// concurrent callers queue up behind one shared delay.
    last_request: Mutex<Option<Instant>>,
}

impl Transport {
    pub fn new(config: &HarvesterConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"
                .parse()
                .context("invalid Accept header")?,
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.5".parse().context("invalid header")?,
        );

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            min_delay: config.inter_request_delay,
            retry_count: config.retry_count,
            transient_statuses: config.transient_statuses.clone(),
            last_request: Mutex::new(None),
        })
    }

    /// Fetch a URL and return the response body.
    pub async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.send_with_retry(url, || self.client.get(url)).await
    }

    /// POST a JSON body and return the response body.
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<String, TransportError> {
        self.send_with_retry(url, || self.client.post(url).json(body))
            .await
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<String, TransportError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            self.pace().await;

            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.text().await?);
                    }
                    if self.is_transient(status) && attempt < self.retry_count {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        warn!(%url, %status, attempt, "transient HTTP status, backing off {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(TransportError::Status {
                        status,
                        url: url.to_string(),
                    });
                }
                Err(err) => {
                    let transient = err.is_timeout() || err.is_connect() || err.is_request();
                    if transient && attempt < self.retry_count {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        warn!(%url, attempt, "transient network error ({err}), backing off {delay:?}");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if attempt > 0 {
                        return Err(TransportError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: attempt + 1,
                            source: err,
                        });
                    }
                    return Err(TransportError::Http(err));
                }
            }
        }
    }

    /// Enforce the shared inter-request delay.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                debug!("pacing outbound request by {wait:?}");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn is_transient(&self, status: StatusCode) -> bool {
        self.transient_statuses.contains(&status.as_u16())
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    exp.min(BACKOFF_CAP)
}
