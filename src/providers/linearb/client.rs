use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

use crate::auth::Token;
use crate::error::{Result, SprintLensError};
use crate::providers::jira::client::{backoff_delay, response_snippet, MAX_ATTEMPTS};

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client for the engineering-metrics measurements API.
///
/// Shares the tracker client's retry policy; authenticates with an
/// `x-api-key` header instead of a bearer token.
pub struct LinearbClient {
    client: Client,
    measurements_url: Url,
    token: Token,
}

impl LinearbClient {
    pub fn new(base_url: &str, token: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("SprintLens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SprintLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let measurements_url = Url::parse(base_url)
            .and_then(|base| base.join("api/v2/measurements"))
            .map_err(|e| SprintLensError::Config(format!("Invalid metrics base URL: {e}")))?;

        Ok(Self {
            client,
            measurements_url,
            token,
        })
    }

    /// Daily cycle-time sub-phase measurements over an inclusive date
    /// range. An HTTP 204 or an empty body is the service's explicit
    /// "no data" signal and comes back as an empty row set.
    pub async fn fetch_daily_measurements(
        &self,
        team_id: u64,
        after: NaiveDate,
        before: NaiveDate,
    ) -> Result<Vec<super::types::DailyCycleRow>> {
        let body = serde_json::to_value(super::types::MeasurementRequest::daily_cycle_phases(
            team_id, after, before,
        ))?;

        let mut attempt = 1u32;
        loop {
            let request = self
                .client
                .post(self.measurements_url.clone())
                .header("x-api-key", self.token.as_str())
                .json(&body);

            let detail = match request.send().await {
                Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                    debug!("Measurements query returned 204 for team {team_id}");
                    return Ok(Vec::new());
                }
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response.text().await?;
                        if text.trim().is_empty() {
                            return Ok(Vec::new());
                        }
                        let slices: Vec<super::types::MeasurementSlice> =
                            serde_json::from_str(&text)?;
                        return Ok(slices
                            .into_iter()
                            .filter_map(super::types::MeasurementSlice::into_row)
                            .collect());
                    }
                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unable to read response body".to_string());
                    format!("status {}: {}", status.as_u16(), response_snippet(&text))
                }
                Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => e.to_string(),
                Err(e) => return Err(e.into()),
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(SprintLensError::RetriesExhausted {
                    method: "POST".to_string(),
                    url: self.measurements_url.to_string(),
                    attempts: MAX_ATTEMPTS,
                    detail,
                });
            }

            let delay = backoff_delay(attempt);
            warn!(
                "POST {} attempt {attempt}/{MAX_ATTEMPTS} failed ({detail}), retrying in {:.1}s",
                self.measurements_url,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_client(server: &mockito::Server) -> LinearbClient {
        LinearbClient::new(&server.url(), Token::from("lb-key")).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_measurements_parses_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/measurements")
            .match_header("x-api-key", "lb-key")
            .with_status(200)
            .with_body(
                serde_json::json!([
                    {
                        "after": "2024-03-04T00:00:00",
                        "metrics": [
                            {"branch.time_to_pr:p50": 120.0},
                            {"branch.time_to_review:p50": 30.0},
                            {"branch.review_time:p50": 60.0},
                        ]
                    },
                    {
                        "after": "2024-03-05T00:00:00",
                        "metrics": []
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let rows = client
            .fetch_daily_measurements(89945, date(2024, 3, 4), date(2024, 3, 13))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].coding_min, Some(120.0));
        assert_eq!(rows[1].coding_min, None);
    }

    #[tokio::test]
    async fn test_fetch_measurements_204_means_no_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2/measurements")
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server);
        let rows = client
            .fetch_daily_measurements(89945, date(2024, 3, 4), date(2024, 3, 13))
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_measurements_empty_body_means_no_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2/measurements")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let client = test_client(&server);
        let rows = client
            .fetch_daily_measurements(89945, date(2024, 3, 4), date(2024, 3, 13))
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_measurements_retries_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/measurements")
            .with_status(500)
            .with_body("internal error")
            .expect(4)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client
            .fetch_daily_measurements(89945, date(2024, 3, 4), date(2024, 3, 13))
            .await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(SprintLensError::RetriesExhausted { attempts: 4, .. })
        ));
    }
}
