use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use reqwest::multipart::Form;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RelayError, RelayResult};

pub(crate) const HEALTH_PATH: &str = "/health";
pub(crate) const ANALYZE_PATH: &str = "/v1/analyze";
pub(crate) const EMBED_PATH: &str = "/v1/embed";
pub(crate) const COSINE_SIM_PATH: &str = "/v1/cosine-sim";

/// Shared handle to the single upstream inference server.
#[derive(Clone, Debug)]
pub(crate) struct UpstreamClient {
    http: Client,
    base_url: String,
    health_timeout: Duration,
    forward_timeout: Duration,
}

impl UpstreamClient {
    /// `base_url` is expected to be normalized already, without a trailing slash.
    /// A connection attempt that outlives `connect_timeout` is reported as unreachable, not as a
    /// timeout, so it should stay below both request budgets.
    pub(crate) fn new(
        base_url: String,
        connect_timeout: Duration,
        health_timeout: Duration,
        forward_timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(UpstreamClient {
            http,
            base_url,
            health_timeout,
            forward_timeout,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Liveness probe. Any transport or decode failure is returned untouched; the upstream
    /// status code is not inspected.
    #[tracing::instrument(level = "debug", skip(self), fields(upstream = %self.base_url))]
    pub(crate) async fn probe_health(&self) -> Result<Value, reqwest::Error> {
        self.http
            .get(self.url_for(HEALTH_PATH))
            .timeout(self.health_timeout)
            .send()
            .await?
            .json::<Value>()
            .await
    }

    /// Posts `form` to the upstream `path` and returns the decoded JSON body.
    #[tracing::instrument(level = "debug", skip(self, form), fields(upstream = %self.base_url))]
    pub(crate) async fn forward(&self, path: &str, form: Form) -> RelayResult<Value> {
        let response = self
            .http
            .post(self.url_for(path))
            .multipart(form)
            .timeout(self.forward_timeout)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|err| self.transport_error(err))?;
            warn!("Upstream answered {} on {}", status, path);
            return Err(RelayError::new(
                status,
                format!("Upstream server error: {}", body),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| self.transport_error(err))
    }

    fn transport_error(&self, err: reqwest::Error) -> RelayError {
        debug!("Upstream transport error: {:?}", err);
        if err.is_connect() {
            RelayError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!(
                    "Cannot connect to upstream server at {}. \
                     Make sure the server is running and the upstream URL is correct.",
                    self.base_url
                ),
            )
        } else if err.is_timeout() {
            RelayError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "Request to upstream server timed out. The model might be loading.",
            )
        } else {
            err.into()
        }
    }
}
