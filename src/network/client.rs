//! HTTP client implementation

use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use super::{HttpOutcome, Method, RequestDescriptor};
use crate::config::NetworkConfig;
use crate::utils::{EngageError, Result};

/// HTTP client with connection pooling
///
/// Cloning is cheap and shares the underlying pool. Each
/// [`execute`](Self::execute) call is exactly one round trip; retries are
/// the caller's business.
#[derive(Clone)]
pub struct NetworkClient {
    http: reqwest::Client,
}

impl NetworkClient {
    /// Create a new HTTP client
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| EngageError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { http })
    }

    /// Execute a request and classify its response
    pub async fn execute<T>(&self, request: &RequestDescriptor<T>) -> HttpOutcome<T> {
        let method = request.method();
        let mut builder = self
            .http
            .request(method.as_reqwest(), request.url().clone())
            .header(ACCEPT, "application/json");

        if let Some(token) = request.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose()));
        }
        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{:?} {} failed before a response: {}", method, request.url(), e);
                return HttpOutcome::TransportError(e.to_string());
            }
        };

        let status = response.status().as_u16();
        debug!("{:?} {} -> {}", method, request.url(), status);

        if let Some(outcome) = HttpOutcome::from_failed_status(status) {
            return outcome;
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return HttpOutcome::TransportError(e.to_string()),
        };

        Self::decode(method, status, &body, request)
    }

    fn decode<T>(
        method: Method,
        status: u16,
        body: &[u8],
        request: &RequestDescriptor<T>,
    ) -> HttpOutcome<T> {
        if body.is_empty() {
            // Bodyless deletes are acknowledged rather than parsed
            if method == Method::Delete {
                if let Some(value) = request.decoder().empty_delete_value() {
                    return HttpOutcome::Success(value);
                }
            }
            return HttpOutcome::MalformedResponse(format!("HTTP {status} with empty body"));
        }

        match request.decoder().decode(body) {
            Ok(value) => HttpOutcome::Success(value),
            Err(reason) => {
                warn!("{:?} {}: undecodable body: {}", method, request.url(), reason);
                HttpOutcome::DecodeError(reason)
            }
        }
    }
}
