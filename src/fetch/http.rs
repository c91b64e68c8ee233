//! HTTP fetcher over reqwest
//!
//! Requests are paced by a governor rate limiter, carry a user agent drawn
//! from the configured pool, and are retried with linear backoff on
//! retryable statuses, timeouts and bot-check pages.

use crate::fetch::{FetchError, FetchRequest, FetchedPage, Fetcher, FetcherConfig};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rand::seq::SliceRandom;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::sync::Arc;
use tracing::{Instrument, debug, debug_span, instrument, warn};

const BOT_CHECK_MARKERS: [&str; 3] = [
    "robot check",
    "validatecaptcha",
    "enter the characters you see below",
];

/// Fetcher for live sites
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::InvalidRequest(format!("header '{}': {}", name, e)))?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()?;

        let limiter = Quota::with_period(config.request_delay()).map(|quota| Arc::new(RateLimiter::direct(quota)));

        Ok(Self {
            client,
            limiter,
            config,
        })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn user_agent(&self) -> Option<String> {
        self.config
            .user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
    }

    fn is_retryable(&self, err: &FetchError) -> bool {
        match err {
            FetchError::Status { status, .. } => self.config.retry_statuses.contains(status),
            FetchError::Timeout(_) | FetchError::Blocked(_) => true,
            FetchError::Http(e) => e.is_connect() || e.is_request(),
            FetchError::InvalidRequest(_) => false,
        }
    }

    async fn attempt(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().instrument(debug_span!("limiter")).await;
        }

        let mut builder = self.client.get(&request.url);
        if let Some(user_agent) = self.user_agent() {
            builder = builder.header(USER_AGENT, user_agent);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(request.url.clone())
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;

        if is_bot_check(&body) {
            return Err(FetchError::Blocked(url));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        debug!(status = status.as_u16(), bytes = body.len(), "fetched page");
        Ok(FetchedPage {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

fn is_bot_check(body: &str) -> bool {
    let lower = body.to_lowercase();
    BOT_CHECK_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let mut retries = 0;
        loop {
            match self.attempt(request).await {
                Ok(page) => return Ok(page),
                Err(err) if retries < self.config.max_retries && self.is_retryable(&err) => {
                    retries += 1;
                    warn!(retries, error = %err, "retrying fetch");
                    tokio::time::sleep(self.config.retry_backoff() * retries).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
