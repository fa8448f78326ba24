//! User-Agent construction and the transport that enforces it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Request, Response};
use std::sync::Arc;

use super::{RoundTripper, clone_request, default_transport};

/// Product tag every outgoing request starts its User-Agent with.
pub const USER_AGENT_PREFIX: &str = "Multiapps-CF-plugin";

const MAX_SUFFIX_LENGTH: usize = 128;

/// Version baked in at build time.
pub fn plugin_version() -> &'static str {
    env!("MTA_CLIENT_VERSION")
}

/// `Multiapps-CF-plugin/{version} ({os} {arch}) rust [suffix]`. The suffix is
/// sanitized first and left out when nothing remains.
pub fn build_user_agent(suffix: Option<&str>) -> String {
    let mut user_agent = format!(
        "{}/{} ({} {}) rust",
        USER_AGENT_PREFIX,
        plugin_version(),
        std::env::consts::OS,
        std::env::consts::ARCH
    );

    if let Some(suffix) = suffix.map(sanitize_user_agent_suffix) {
        if !suffix.is_empty() {
            user_agent.push(' ');
            user_agent.push_str(&suffix);
        }
    }

    user_agent
}

/// Reduces a suffix to characters that are safe inside a header value.
///
/// CR and LF are dropped, tabs become spaces, and anything outside
/// `[a-zA-Z0-9 .-_]` is removed. The result is trimmed and capped at
/// 128 characters.
pub fn sanitize_user_agent_suffix(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_'))
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.len() > MAX_SUFFIX_LENGTH {
        // Only ASCII survives the filter above, so byte slicing is safe
        trimmed[..MAX_SUFFIX_LENGTH].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sets the product User-Agent on a copy of every request before delegating.
pub struct UserAgentTransport {
    base: Arc<dyn RoundTripper>,
    user_agent: String,
}

impl UserAgentTransport {
    pub fn new(base: Option<Arc<dyn RoundTripper>>) -> Self {
        Self::with_user_agent(base, build_user_agent(None))
    }

    pub fn with_user_agent(base: Option<Arc<dyn RoundTripper>>, user_agent: String) -> Self {
        Self {
            base: base.unwrap_or_else(default_transport),
            user_agent,
        }
    }

    pub fn base(&self) -> &Arc<dyn RoundTripper> {
        &self.base
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[async_trait]
impl RoundTripper for UserAgentTransport {
    async fn round_trip(&self, request: &Request) -> Result<Response> {
        let mut request = clone_request(request)?;
        let value = HeaderValue::from_str(&self.user_agent)
            .with_context(|| format!("Invalid User-Agent value {:?}", self.user_agent))?;
        // Overwrite whatever the caller set
        request.headers_mut().insert(USER_AGENT, value);
        self.base.round_trip(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockRoundTripper;
    use crate::http::test_support::response;
    use reqwest::{Method, Url};

    fn has_product_user_agent(request: &Request) -> bool {
        request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(&format!("{}/", USER_AGENT_PREFIX)))
    }

    fn get_request() -> Request {
        Request::new(Method::GET, Url::parse("http://example.com").unwrap())
    }

    #[test]
    fn test_build_user_agent_format() {
        let user_agent = build_user_agent(None);
        assert!(user_agent.starts_with(&format!("{}/{}", USER_AGENT_PREFIX, plugin_version())));
        assert!(user_agent.contains(std::env::consts::OS));
        assert!(user_agent.contains(std::env::consts::ARCH));
    }

    #[test]
    fn test_build_user_agent_appends_sanitized_suffix() {
        let user_agent = build_user_agent(Some("ci-pipeline\r\nX-Injected: yes"));
        assert!(user_agent.ends_with(" ci-pipelineX-Injected yes"));
    }

    #[test]
    fn test_build_user_agent_ignores_empty_suffix() {
        let plain = build_user_agent(None);
        assert_eq!(build_user_agent(Some("  ;:  ")), plain);
    }

    #[test]
    fn test_sanitize_user_agent_suffix() {
        assert_eq!(sanitize_user_agent_suffix("team_a build-1.2"), "team_a build-1.2");
        assert_eq!(sanitize_user_agent_suffix("a\tb"), "a b");
        assert_eq!(sanitize_user_agent_suffix("  <script>;x:y  "), "scriptxy");
        assert_eq!(sanitize_user_agent_suffix("ünïcode"), "ncode");
    }

    #[test]
    fn test_sanitize_user_agent_suffix_limits_length() {
        let long = "a".repeat(127) + " " + &"b".repeat(50);
        let sanitized = sanitize_user_agent_suffix(&long);
        // Cut at 128 lands on the space, which is trimmed away
        assert_eq!(sanitized, "a".repeat(127));

        let sanitized = sanitize_user_agent_suffix(&"c".repeat(300));
        assert_eq!(sanitized.len(), 128);
    }

    #[test]
    fn test_new_without_base_uses_default_transport() {
        let transport = UserAgentTransport::new(None);
        assert!(transport.user_agent().starts_with(USER_AGENT_PREFIX));
    }

    #[test]
    fn test_new_keeps_custom_base() {
        let base: Arc<dyn RoundTripper> = Arc::new(MockRoundTripper::new());
        let transport = UserAgentTransport::new(Some(Arc::clone(&base)));
        assert!(Arc::ptr_eq(transport.base(), &base));
    }

    #[tokio::test]
    async fn test_round_trip_sets_user_agent_and_keeps_headers() {
        let mut base = MockRoundTripper::new();
        base.expect_round_trip()
            .withf(|request: &Request| {
                has_product_user_agent(request)
                    && request.headers().get("Existing-Header").unwrap() == "value"
            })
            .times(1)
            .returning(|_| Ok(response(200, None, "")));

        let transport = UserAgentTransport::new(Some(Arc::new(base)));
        let mut request = get_request();
        request
            .headers_mut()
            .insert("Existing-Header", "value".parse().unwrap());

        let result = transport.round_trip(&request).await;

        assert!(result.is_ok());
        // The caller's request is untouched
        assert!(request.headers().get(USER_AGENT).is_none());
        assert_eq!(request.headers().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_overrides_existing_user_agent() {
        let mut base = MockRoundTripper::new();
        base.expect_round_trip()
            .withf(|request: &Request| {
                has_product_user_agent(request)
                    && request.headers().get(USER_AGENT).unwrap() != "existing-user-agent"
            })
            .times(1)
            .returning(|_| Ok(response(200, None, "")));

        let transport = UserAgentTransport::new(Some(Arc::new(base)));
        let mut request = get_request();
        request
            .headers_mut()
            .insert(USER_AGENT, "existing-user-agent".parse().unwrap());

        transport.round_trip(&request).await.unwrap();

        assert_eq!(
            request.headers().get(USER_AGENT).unwrap(),
            "existing-user-agent"
        );
    }

    #[tokio::test]
    async fn test_round_trip_reaches_server_with_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/test")
            .match_header(
                "user-agent",
                mockito::Matcher::Regex(format!("^{}/", USER_AGENT_PREFIX)),
            )
            .with_status(200)
            .create_async()
            .await;

        let transport = UserAgentTransport::new(None);
        let request = Request::new(
            Method::GET,
            Url::parse(&format!("{}/test", server.url())).unwrap(),
        );
        let response = transport.round_trip(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status().as_u16(), 200);
    }
}
