//! CSRF protection for state-changing requests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, trace};
use reqwest::cookie::CookieStore;
use reqwest::header::{
    AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE,
    USER_AGENT,
};
use reqwest::{Method, Request, Response, StatusCode, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{JSON_MIME, RoundTripper, clone_request, default_transport};

pub const CSRF_TOKEN_HEADER: &str = "X-Csrf-Token";
const CSRF_HEADER_NAME_HEADER: &str = "X-Csrf-Header";

/// Sent in [`CSRF_TOKEN_HEADER`] to ask the backend for a token.
pub const CSRF_FETCH_VALUE: &str = "Fetch";

/// Returned in [`CSRF_TOKEN_HEADER`] with a 403 when the token was rejected.
pub const CSRF_REQUIRED_VALUE: &str = "Required";

/// How long a fetched token is reused.
pub const CSRF_SESSION_TIMEOUT: Duration = Duration::from_secs(90);

const CSRF_TOKEN_PATH: &str = "/api/v1/csrf-token";

#[derive(Debug, Clone)]
struct CsrfToken {
    header: HeaderName,
    value: HeaderValue,
    cookies: Option<HeaderValue>,
    fetched_at: Instant,
}

impl CsrfToken {
    fn from_response(response: &Response, cookies: Option<HeaderValue>) -> Option<Self> {
        let value = response.headers().get(CSRF_TOKEN_HEADER)?.clone();
        let header = response
            .headers()
            .get(CSRF_HEADER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| HeaderName::from_bytes(v.trim().as_bytes()).ok())
            .unwrap_or_else(|| HeaderName::from_static("x-csrf-token"));

        Some(Self {
            header,
            value,
            cookies,
            fetched_at: Instant::now(),
        })
    }

    fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(self.header.clone(), self.value.clone());
        if let Some(cookies) = &self.cookies {
            headers.insert(COOKIE, cookies.clone());
        }
    }
}

/// Attaches a CSRF token to every request whose method changes state.
///
/// The token is fetched from `/api/v1/csrf-token` on the request's host and
/// shared by all requests through this transport until it expires or the
/// backend rejects it.
pub struct CsrfTransport {
    base: Arc<dyn RoundTripper>,
    jar: Option<Arc<dyn CookieStore>>,
    timeout: Duration,
    token: Mutex<Option<CsrfToken>>,
}

impl CsrfTransport {
    /// `jar`, when given, receives the session cookies handed out with the token.
    pub fn new(base: Option<Arc<dyn RoundTripper>>, jar: Option<Arc<dyn CookieStore>>) -> Self {
        Self {
            base: base.unwrap_or_else(default_transport),
            jar,
            timeout: CSRF_SESSION_TIMEOUT,
            token: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }

    async fn update_token(&self, request: &mut Request) -> Result<()> {
        // Held across the fetch so concurrent requests share one token
        let mut token = self.token.lock().await;

        let expired = token
            .as_ref()
            .is_none_or(|t| t.fetched_at.elapsed() > self.timeout);
        if expired {
            *token = self.fetch_token(request).await?;
        }

        if let Some(token) = token.as_ref() {
            token.apply(request.headers_mut());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(host = request.url().host_str()))]
    async fn fetch_token(&self, request: &Request) -> Result<Option<CsrfToken>> {
        let url = csrf_token_url(request.url());
        let mut fetch = Request::new(Method::GET, url.clone());
        {
            let headers = fetch.headers_mut();
            headers.insert(CSRF_TOKEN_HEADER, HeaderValue::from_static(CSRF_FETCH_VALUE));
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
            for name in [AUTHORIZATION, USER_AGENT, COOKIE] {
                if let Some(value) = request.headers().get(&name) {
                    headers.insert(name, value.clone());
                }
            }
        }

        let mut response = self
            .base
            .round_trip(&fetch)
            .await
            .context("Failed to fetch CSRF token")?;

        // A new session was opened: ask again so the token is bound to it
        let cookies = self.session_cookies(&response, &url);
        if let Some(cookies) = &cookies {
            fetch.headers_mut().insert(COOKIE, cookies.clone());
            response = self
                .base
                .round_trip(&fetch)
                .await
                .context("Failed to fetch CSRF token")?;
        }

        let token = CsrfToken::from_response(&response, cookies);
        if token.is_none() {
            debug!(
                "No CSRF token returned by {} (status {})",
                url,
                response.status()
            );
        }
        Ok(token)
    }

    fn session_cookies(&self, response: &Response, url: &Url) -> Option<HeaderValue> {
        let set_cookies: Vec<&HeaderValue> = response.headers().get_all(SET_COOKIE).iter().collect();
        if set_cookies.is_empty() {
            return None;
        }

        match &self.jar {
            Some(jar) => {
                jar.set_cookies(&mut set_cookies.into_iter(), url);
                jar.cookies(url)
            }
            None => {
                let pairs: Vec<&str> = set_cookies
                    .iter()
                    .filter_map(|v| v.to_str().ok())
                    .filter_map(|v| v.split(';').next())
                    .map(str::trim)
                    .filter(|pair| !pair.is_empty())
                    .collect();
                if pairs.is_empty() {
                    None
                } else {
                    HeaderValue::from_str(&pairs.join("; ")).ok()
                }
            }
        }
    }
}

#[async_trait]
impl RoundTripper for CsrfTransport {
    async fn round_trip(&self, request: &Request) -> Result<Response> {
        if !is_protection_required(request.method()) {
            return self.base.round_trip(request).await;
        }

        let mut request = clone_request(request)?;
        self.update_token(&mut request).await?;
        trace!(
            "Sending a request with CSRF {:?}",
            request.headers().get(CSRF_TOKEN_HEADER)
        );

        let response = self.base.round_trip(&request).await?;
        if is_csrf_rejection(&response) {
            debug!("CSRF token rejected by {}", request.url());
            self.invalidate().await;
        }
        Ok(response)
    }
}

fn is_protection_required(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn is_csrf_rejection(response: &Response) -> bool {
    response.status() == StatusCode::FORBIDDEN
        && response
            .headers()
            .get(CSRF_TOKEN_HEADER)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(CSRF_REQUIRED_VALUE.as_bytes()))
}

fn csrf_token_url(request_url: &Url) -> Url {
    let mut url = request_url.clone();
    url.set_path(CSRF_TOKEN_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url
}
