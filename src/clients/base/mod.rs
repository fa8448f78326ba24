//! Pieces shared by every protocol client: credentials, error shapes and
//! the call sequence (token, request, classification).

mod error;
mod token;

use anyhow::Result;
use reqwest::Response;
use reqwest::cookie::CookieStore;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::http::{ClientOperation, HttpTransport, RoundTripper, read_location};

pub use error::{ApiError, ClientError, ErrorResponse, new_client_error, should_retry};
#[cfg(test)]
pub use token::{MockAccessTokenSource, MockTokenFactory};
pub use token::{
    AccessTokenSource, CachingTokenFactory, CfCliTokenSource, StaticTokenFactory, Token,
    TokenFactory,
};

/// Query-escapes a value that is placed in a URL path; spaces become `%20`.
pub fn encode_arg(arg: &str) -> String {
    url::form_urlencoded::byte_serialize(arg.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Where and how a client reaches the deploy service.
#[derive(Clone)]
pub struct Connection {
    pub host: String,
    pub round_tripper: Option<Arc<dyn RoundTripper>>,
    pub jar: Option<Arc<dyn CookieStore>>,
    pub token_factory: Arc<dyn TokenFactory>,
    /// Overrides the default product User-Agent
    pub user_agent: Option<String>,
}

impl Connection {
    pub fn new(host: impl Into<String>, token_factory: Arc<dyn TokenFactory>) -> Self {
        Self {
            host: host.into(),
            round_tripper: None,
            jar: None,
            token_factory,
            user_agent: None,
        }
    }

    pub fn with_round_tripper(mut self, round_tripper: Arc<dyn RoundTripper>) -> Self {
        self.round_tripper = Some(round_tripper);
        self
    }

    pub fn with_jar(mut self, jar: Arc<dyn CookieStore>) -> Self {
        self.jar = Some(jar);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// A client rooted at `base_path`, sending through the configured chain.
    pub fn client(&self, base_path: &str, encoded_base_path: Option<String>) -> BaseClient {
        let mut transport = HttpTransport::new(
            &self.host,
            base_path,
            encoded_base_path,
            self.round_tripper.clone(),
            self.jar.clone(),
        );
        if let Some(user_agent) = &self.user_agent {
            transport = transport.with_user_agent(user_agent.clone());
        }
        BaseClient::new(transport, Arc::clone(&self.token_factory))
    }
}

/// A transport plus the token factory that authorizes its calls.
pub struct BaseClient {
    transport: HttpTransport,
    token_factory: Arc<dyn TokenFactory>,
}

impl BaseClient {
    pub fn new(transport: HttpTransport, token_factory: Arc<dyn TokenFactory>) -> Self {
        Self {
            transport,
            token_factory,
        }
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub fn token_factory(&self) -> &Arc<dyn TokenFactory> {
        &self.token_factory
    }

    /// Acquires a token and sends the operation. Nothing is sent when the
    /// token cannot be obtained.
    pub async fn send(&self, operation: &ClientOperation) -> Result<Response> {
        let token = self.token_factory.new_token().map_err(new_client_error)?;
        self.transport
            .submit(operation, &token)
            .await
            .map_err(new_client_error)
    }

    pub async fn call_json<T: DeserializeOwned + Default>(
        &self,
        operation: &ClientOperation,
    ) -> Result<T> {
        let response = self.send(operation).await?;
        self.transport.read_json(response).await
    }

    pub async fn call_text(&self, operation: &ClientOperation) -> Result<String> {
        let response = self.send(operation).await?;
        self.transport.read_text(response).await
    }

    pub async fn call_empty(&self, operation: &ClientOperation) -> Result<()> {
        self.send(operation).await?;
        Ok(())
    }

    /// Returns the `Location` header of the response, if the backend sent one.
    pub async fn call_location(&self, operation: &ClientOperation) -> Result<Option<String>> {
        let response = self.send(operation).await?;
        Ok(read_location(&response))
    }
}
