//! The protocol runtime shared by all clients.

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{
    ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, LOCATION, SET_COOKIE,
};
use reqwest::{Method, Request, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use super::{RoundTripper, UserAgentTransport};
use crate::clients::base::{ApiError, ErrorResponse, Token};

/// Schemes a transport may talk; `https` is chosen when the host has none.
pub const SCHEMES: [&str; 2] = ["http", "https"];

pub const JSON_MIME: &str = "application/json";
pub const TEXT_MIME: &str = "text/plain";
pub const HTML_MIME: &str = "text/html";

/// How a response body of a given media type is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Json,
    Text,
}

/// One wire call: method, path below the transport's base path, query and body.
#[derive(Debug, Clone)]
pub struct ClientOperation {
    pub id: &'static str,
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub produces: &'static str,
    pub body: Option<Vec<u8>>,
}

impl ClientOperation {
    pub fn new(id: &'static str, method: Method, path: impl Into<String>) -> Self {
        Self {
            id,
            method,
            path: path.into(),
            query: Vec::new(),
            produces: JSON_MIME,
            body: None,
        }
    }

    pub fn get(id: &'static str, path: impl Into<String>) -> Self {
        Self::new(id, Method::GET, path)
    }

    pub fn post(id: &'static str, path: impl Into<String>) -> Self {
        Self::new(id, Method::POST, path)
    }

    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn query_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn produces(mut self, media_type: &'static str) -> Self {
        self.produces = media_type;
        self
    }

    pub fn json_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .with_context(|| format!("Failed to encode request body for {}", self.id))?;
        self.body = Some(encoded);
        Ok(self)
    }
}

/// Scheme, host and base path bound to a round-tripper chain and a cookie jar.
///
/// Building one performs no I/O.
pub struct HttpTransport {
    scheme: String,
    host: String,
    base_path: String,
    encoded_base_path: Option<String>,
    default_media_type: &'static str,
    consumers: HashMap<&'static str, Consumer>,
    transport: UserAgentTransport,
    jar: Arc<dyn CookieStore>,
}

impl HttpTransport {
    /// `host` may carry a scheme (`http://127.0.0.1:8080`); otherwise `https`
    /// is used. `encoded_base_path`, when given, is used verbatim in URLs
    /// instead of `base_path`.
    pub fn new(
        host: &str,
        base_path: &str,
        encoded_base_path: Option<String>,
        base: Option<Arc<dyn RoundTripper>>,
        jar: Option<Arc<dyn CookieStore>>,
    ) -> Self {
        let (scheme, host) = split_scheme(host);

        let mut consumers = HashMap::new();
        consumers.insert(JSON_MIME, Consumer::Json);
        consumers.insert(TEXT_MIME, Consumer::Text);
        consumers.insert(HTML_MIME, Consumer::Text);

        Self {
            scheme,
            host,
            base_path: base_path.to_string(),
            encoded_base_path,
            default_media_type: JSON_MIME,
            consumers,
            transport: UserAgentTransport::new(base),
            jar: jar.unwrap_or_else(|| Arc::new(Jar::default())),
        }
    }

    /// Replaces the User-Agent sent with every request, keeping the base transport.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        let base = Arc::clone(self.transport.base());
        self.transport = UserAgentTransport::with_user_agent(Some(base), user_agent);
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn default_media_type(&self) -> &'static str {
        self.default_media_type
    }

    pub fn consumer(&self, media_type: &str) -> Option<Consumer> {
        self.consumers.get(media_type).copied()
    }

    pub fn transport(&self) -> &UserAgentTransport {
        &self.transport
    }

    pub fn jar(&self) -> &Arc<dyn CookieStore> {
        &self.jar
    }

    /// Absolute URL of an operation, query included.
    pub fn operation_url(&self, operation: &ClientOperation) -> Result<Url> {
        let base = self
            .encoded_base_path
            .as_deref()
            .unwrap_or(&self.base_path)
            .trim_matches('/');
        let path = operation.path.trim_start_matches('/');

        let mut raw = format!("{}://{}/", self.scheme, self.host);
        raw.push_str(base);
        if !base.is_empty() && !path.is_empty() {
            raw.push('/');
        }
        raw.push_str(path);

        let mut url = Url::parse(&raw)
            .with_context(|| format!("Invalid URL for operation {}: {}", operation.id, raw))?;
        if !operation.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                operation
                    .query
                    .iter()
                    .map(|(key, value)| (*key, value.as_str())),
            );
        }
        Ok(url)
    }

    /// Sends an operation with the given credential.
    ///
    /// Non-2xx responses become an [`ApiError`] (no body) or an
    /// [`ErrorResponse`] (body kept as payload). Transport failures are
    /// returned as they are.
    #[tracing::instrument(skip(self, operation, token), fields(operation = operation.id))]
    pub async fn submit(&self, operation: &ClientOperation, token: &Token) -> Result<Response> {
        let url = self.operation_url(operation)?;
        debug!("{} {}", operation.method, url);

        let mut request = Request::new(operation.method.clone(), url.clone());
        {
            let headers = request.headers_mut();
            headers.insert(ACCEPT, HeaderValue::from_static(operation.produces));
            if operation.body.is_some() {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.default_media_type));
            }
            token.authenticate(headers)?;
            if let Some(cookies) = self.jar.cookies(&url) {
                headers.insert(COOKIE, cookies);
            }
        }
        if let Some(body) = &operation.body {
            *request.body_mut() = Some(body.clone().into());
        }

        let response = self.transport.round_trip(&request).await?;
        self.jar
            .set_cookies(&mut response.headers().get_all(SET_COOKIE).iter(), &url);

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(operation.id, response).await)
        }
    }

    /// Decodes a JSON payload. An empty body yields `T::default()`.
    pub async fn read_json<T: DeserializeOwned + Default>(&self, response: Response) -> Result<T> {
        let media_type = media_type(response.headers());
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;
        if body.is_empty() {
            return Ok(T::default());
        }

        match self.consumer_for(media_type.as_deref())? {
            Consumer::Json => {
                serde_json::from_slice(&body).context("Failed to parse JSON response")
            }
            Consumer::Text => bail!(
                "Expected a JSON response but received {}",
                media_type.as_deref().unwrap_or(self.default_media_type)
            ),
        }
    }

    /// Decodes a text payload. An empty body yields an empty string.
    pub async fn read_text(&self, response: Response) -> Result<String> {
        let media_type = media_type(response.headers());
        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;
        if body.is_empty() {
            return Ok(String::new());
        }

        match self.consumer_for(media_type.as_deref())? {
            Consumer::Text => {
                String::from_utf8(body.to_vec()).context("Response body is not valid UTF-8")
            }
            Consumer::Json => {
                serde_json::from_slice(&body).context("Failed to parse JSON string response")
            }
        }
    }

    fn consumer_for(&self, media_type: Option<&str>) -> Result<Consumer> {
        let media_type = media_type.unwrap_or(self.default_media_type);
        match self.consumer(media_type) {
            Some(consumer) => Ok(consumer),
            None => bail!("No consumer registered for media type {}", media_type),
        }
    }
}

/// The `Location` header of a response, if any.
pub fn read_location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn media_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

fn split_scheme(host: &str) -> (String, String) {
    let default_scheme = SCHEMES[SCHEMES.len() - 1];
    match host.split_once("://") {
        Some((scheme, rest)) => (
            scheme.to_ascii_lowercase(),
            rest.trim_end_matches('/').to_string(),
        ),
        None => (
            default_scheme.to_string(),
            host.trim_end_matches('/').to_string(),
        ),
    }
}

async fn error_from_response(operation: &str, response: Response) -> anyhow::Error {
    let status = response.status();
    let code = status.as_u16();
    let message = status.canonical_reason().unwrap_or("Unknown Status").to_string();

    match response.text().await {
        Ok(body) if !body.trim().is_empty() => ErrorResponse {
            code,
            status: message,
            payload: body,
        }
        .into(),
        _ => ApiError {
            operation: operation.to_string(),
            code,
            message,
        }
        .into(),
    }
}
