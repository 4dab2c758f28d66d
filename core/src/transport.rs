//! The network seam: one request in, one response (or failure) out.
//!
//! # Design
//! Façades only see the [`Transport`] trait, so tests and hosts can swap in
//! their own I/O. [`HttpTransport`] is the default implementation: a ureq
//! agent run on tokio's blocking pool so callers still just `.await`.
//!
//! The agent is configured with `http_status_as_error(false)` so 4xx/5xx
//! responses come back as data. Both backends put their error details in
//! the body and the decoder needs to see it.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes exactly one HTTP round trip per call. No retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(feature = "http-transport")]
pub use self::ureq_transport::HttpTransport;

#[cfg(feature = "http-transport")]
mod ureq_transport {
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing::debug;
    use ureq::Agent;

    use super::Transport;
    use crate::config::ClientConfig;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// [`Transport`] backed by a shared ureq [`Agent`].
    #[derive(Clone)]
    pub struct HttpTransport {
        agent: Agent,
    }

    impl HttpTransport {
        /// `timeout` of `None` keeps ureq's defaults.
        pub fn new(timeout: Option<Duration>) -> Self {
            let agent = Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(timeout)
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn from_config(config: &ClientConfig) -> Self {
            Self::new(config.timeout())
        }
    }

    impl Default for HttpTransport {
        fn default() -> Self {
            Self::new(None)
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let agent = self.agent.clone();
            debug!(method = %request.method, url = %request.url, "sending request");
            let response = tokio::task::spawn_blocking(move || execute(&agent, request))
                .await
                .map_err(|e| TransportError::Request(format!("transport task failed: {e}")))??;
            debug!(status = response.status, bytes = response.body.len(), "received response");
            Ok(response)
        }
    }

    fn execute(agent: &Agent, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match method {
            HttpMethod::Get => with_headers(agent.get(&url), &headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(&url), &headers).call(),
            HttpMethod::Post => send_body(with_headers(agent.post(&url), &headers), body),
            HttpMethod::Put => send_body(with_headers(agent.put(&url), &headers), body),
        };
        let mut response = result.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn with_headers<B>(
        mut builder: ureq::RequestBuilder<B>,
        headers: &[(String, String)],
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn send_body(
        builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
        body: Option<Vec<u8>>,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match body {
            Some(bytes) => builder.send(&bytes[..]),
            None => builder.send_empty(),
        }
    }

    fn classify(err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Http(e) => TransportError::InvalidRequest(e.to_string()),
            ureq::Error::BadUri(uri) => TransportError::InvalidRequest(format!("bad uri: {uri}")),
            other => TransportError::Request(other.to_string()),
        }
    }
}
