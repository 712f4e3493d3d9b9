//! HTTP transport seam.
//!
//! Notifiers only need "send a GET/POST, get a status code back".
//! [`HttpTransport`] is that primitive; [`ReqwestTransport`] implements it on
//! a shared `reqwest::Client`.

use std::time::Duration;

use alertik_core::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;

use crate::error::RelayError;

/// User agent sent with every request
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Maximum redirects followed per request
pub const MAX_REDIRECTS: usize = 3;

/// Request could not be completed (no HTTP status available)
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Minimal HTTP client
pub trait HttpTransport: Send + Sync {
    /// Issues a GET and returns the response status.
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<u16, TransportError>>;

    /// POSTs `body` as `application/json` and returns the response status.
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<u16, TransportError>>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| RelayError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<u16, TransportError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;
            Ok(response.status().as_u16())
        })
    }

    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> BoxFuture<'a, Result<u16, TransportError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string())
                .send()
                .await
                .map_err(|e| TransportError(e.to_string()))?;
            Ok(response.status().as_u16())
        })
    }
}
