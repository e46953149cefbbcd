use log::warn;
use reqwest::{Client, Method};
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, SprintLensError};

pub(crate) const MAX_ATTEMPTS: u32 = 4;
pub(crate) const RETRY_BASE_DELAY_SECS: f64 = 0.8;
pub(crate) const RETRY_MAX_DELAY_SECS: f64 = 6.0;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const ERROR_BODY_SNIPPET_CHARS: usize = 800;

/// HTTP client for the issue tracker's REST APIs.
///
/// Every request goes through the same bounded-retry policy: up to
/// [`MAX_ATTEMPTS`] attempts, exponential backoff doubling from
/// [`RETRY_BASE_DELAY_SECS`] and capped at [`RETRY_MAX_DELAY_SECS`],
/// no jitter. Connect errors, timeouts, and non-2xx responses all count
/// as retryable; whatever failed last is surfaced when attempts run out.
pub struct JiraClient {
    client: Client,
    base_url: Url,
    email: Option<String>,
    token: Option<Token>,
}

impl JiraClient {
    pub fn new(base_url: &str, email: Option<String>, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("SprintLens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SprintLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| SprintLensError::Config(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            email,
            token,
        })
    }

    /// Cloud instances authenticate with email + API token (basic auth);
    /// server instances with a bearer personal access token.
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.email, &self.token) {
            (Some(email), Some(token)) => request.basic_auth(email, Some(token.as_str())),
            (None, Some(token)) => request.bearer_auth(token.as_str()),
            _ => request,
        }
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| SprintLensError::Config(format!("Invalid request path '{path}': {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        self.execute_json(Method::GET, url, None).await
    }

    /// Executes one request with the retry policy, returning the parsed
    /// JSON body of the first successful response.
    async fn execute_json(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut attempt = 1u32;
        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }
            let request = self.auth_request(request);

            let detail = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json().await?);
                    }
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unable to read response body".to_string());
                    format!("status {}: {}", status.as_u16(), response_snippet(&body))
                }
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => e.to_string(),
                Err(e) => return Err(e.into()),
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(SprintLensError::RetriesExhausted {
                    method: method.to_string(),
                    url: url.to_string(),
                    attempts: MAX_ATTEMPTS,
                    detail,
                });
            }

            let delay = backoff_delay(attempt);
            warn!(
                "{method} {url} attempt {attempt}/{MAX_ATTEMPTS} failed ({detail}), retrying in {:.1}s",
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Delay before the retry that follows `attempt` (1-based) failing.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31) as i32;
    let secs = (RETRY_BASE_DELAY_SECS * f64::powi(2.0, exponent)).min(RETRY_MAX_DELAY_SECS);
    Duration::from_secs_f64(secs)
}

/// Keeps error bodies loggable: first 800 characters only.
pub(crate) fn response_snippet(body: &str) -> String {
    if body.len() <= ERROR_BODY_SNIPPET_CHARS {
        return body.to_string();
    }
    body.chars().take(ERROR_BODY_SNIPPET_CHARS).collect()
}
