//! HTTP transport composition.
//!
//! Every protocol client talks to the backend through a chain of
//! [`RoundTripper`]s: a base transport (a plain `reqwest::Client` unless the
//! caller supplies one), the [`UserAgentTransport`] that stamps the product
//! tag on each request, and finally the [`HttpTransport`] runtime that knows
//! the scheme, host, base path, media types and cookie jar.

mod csrf;
mod transport;
mod user_agent;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use std::sync::Arc;

pub use csrf::{
    CSRF_FETCH_VALUE, CSRF_REQUIRED_VALUE, CSRF_SESSION_TIMEOUT, CSRF_TOKEN_HEADER, CsrfTransport,
};
pub use transport::{
    ClientOperation, Consumer, HTML_MIME, HttpTransport, JSON_MIME, SCHEMES, TEXT_MIME,
    read_location,
};
pub use user_agent::{
    USER_AGENT_PREFIX, UserAgentTransport, build_user_agent, plugin_version,
    sanitize_user_agent_suffix,
};

/// A single HTTP exchange.
///
/// Implementations must not alter the caller's request; decorators clone it
/// (see [`clone_request`]) before changing headers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoundTripper: Send + Sync {
    async fn round_trip(&self, request: &Request) -> Result<Response>;
}

#[async_trait]
impl RoundTripper for Client {
    #[tracing::instrument(skip(self, request), fields(url = %request.url()))]
    async fn round_trip(&self, request: &Request) -> Result<Response> {
        let request = clone_request(request)?;
        self.execute(request)
            .await
            .context("Failed to send request")
    }
}

/// The transport used when the caller does not provide one.
pub fn default_transport() -> Arc<dyn RoundTripper> {
    Arc::new(Client::new())
}

/// Copies a request so it can be modified without touching the original.
pub fn clone_request(request: &Request) -> Result<Request> {
    request.try_clone().ok_or_else(|| {
        anyhow!(
            "Request to {} has a streaming body and cannot be cloned",
            request.url()
        )
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    #[test]
    fn test_clone_request_keeps_headers_and_body() {
        let mut request = Request::new(
            Method::POST,
            Url::parse("http://example.com/operations").unwrap(),
        );
        request
            .headers_mut()
            .insert("x-test", "value".parse().unwrap());
        *request.body_mut() = Some(b"{}".to_vec().into());

        let copy = clone_request(&request).unwrap();

        assert_eq!(copy.method(), Method::POST);
        assert_eq!(copy.url(), request.url());
        assert_eq!(copy.headers().get("x-test").unwrap(), "value");
        assert_eq!(copy.body().unwrap().as_bytes(), Some(&b"{}"[..]));
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(204)
            .create_async()
            .await;

        let request = Request::new(
            Method::GET,
            Url::parse(&format!("{}/ping", server.url())).unwrap(),
        );
        let response = Client::new().round_trip(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status().as_u16(), 204);
    }

    #[tokio::test]
    async fn test_client_round_trip_connection_error_passes_through() {
        // Port 9 (discard) on localhost is not expected to accept connections
        let request = Request::new(Method::GET, Url::parse("http://127.0.0.1:9/").unwrap());
        let result = Client::new().round_trip(&request).await;

        let err = result.unwrap_err();
        assert!(err.downcast_ref::<reqwest::Error>().is_some());
    }
}
