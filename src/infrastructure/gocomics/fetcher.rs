//! HTTP strip fetcher.
//!
//! One attempt is: GET the strip page, pull the `og:image` URL out of it,
//! GET the image. Transient failures are retried with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url, header};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::page_parser::extract_image_url;
use super::retry::RetryPolicy;
use crate::domain::entities::Title;
use crate::domain::ports::{ComicFetcher, FetchError};
use crate::infrastructure::config::NetworkConfig;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Fetches strips from a GoComics-style site.
pub struct GoComicsFetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl std::fmt::Debug for GoComicsFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoComicsFetcher")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl GoComicsFetcher {
    /// Creates a fetcher from network configuration.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(config: &NetworkConfig) -> Result<Self, FetchError> {
        Self::with_policy(&config.base_url, config.timeout(), RetryPolicy::from(config))
    }

    /// Creates a fetcher with an explicit base URL, timeout and retry policy.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn with_policy(
        base_url: impl Into<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static(ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            policy,
        })
    }

    /// Page URL for `title` on `date`: `{base}/{slug}/{YYYY}/{MM}/{DD}`.
    #[must_use]
    pub fn page_url(&self, title: &Title, date: NaiveDate) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            title.id(),
            date.format("%Y/%m/%d")
        )
    }

    async fn attempt(&self, page_url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(page_url)
            .send()
            .await
            .map_err(|e| request_error("page request", &e))?;
        check_status(response.status())?;

        let page_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| request_error("page body", &e))?;
        if html.trim().is_empty() {
            return Err(FetchError::parse("empty page"));
        }

        let image_url = extract_image_url(&html, &page_url)?;
        debug!(url = %image_url, "Found strip image");
        self.download_image(image_url).await
    }

    async fn download_image(&self, url: Url) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error("image request", &e))?;
        check_status(response.status())?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error("image body", &e))?;
        if bytes.is_empty() {
            return Err(FetchError::network("empty image body"));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ComicFetcher for GoComicsFetcher {
    async fn fetch(
        &self,
        title: &Title,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Bytes, FetchError> {
        let page_url = self.page_url(title, date);
        info!(url = %page_url, "Fetching strip");

        let mut attempt = 0;
        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = tokio::time::timeout(self.timeout, self.attempt(&page_url)) => result,
            };

            let error = match result {
                Ok(Ok(bytes)) => {
                    debug!(url = %page_url, size = bytes.len(), attempt = attempt, "Fetched strip");
                    return Ok(bytes);
                }
                Ok(Err(e)) => e,
                Err(_) => FetchError::network(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f32()
                )),
            };

            if !error.is_retryable() || attempt >= self.policy.max_retries {
                if error.is_retryable() {
                    warn!(url = %page_url, error = %error, attempts = attempt + 1, "Giving up on strip");
                } else {
                    debug!(url = %page_url, error = %error, "Strip not retried");
                }
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            warn!(
                url = %page_url,
                error = %error,
                attempt = attempt + 1,
                delay = ?delay,
                "Strip fetch failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return Err(FetchError::network(format!("HTTP {status}")));
    }
    if status.is_client_error() {
        return Err(FetchError::not_available(format!("HTTP {status}")));
    }
    Err(FetchError::network(format!("unexpected HTTP {status}")))
}

fn request_error(stage: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::network(format!("{stage} timed out"))
    } else if err.is_connect() {
        FetchError::network(format!("{stage} could not connect: {err}"))
    } else {
        FetchError::network(format!("{stage} failed: {err}"))
    }
}
