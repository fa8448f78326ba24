//! Error shapes produced by the clients and the retry predicate over them.

use std::fmt;

/// The error every client operation reports for a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub code: u16,
    pub status: String,
    pub description: String,
}

impl ClientError {
    pub fn new(code: u16, status: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code,
            status: status.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (status {}): {}",
            self.status, self.code, self.description
        )
    }
}

impl std::error::Error for ClientError {}

/// A non-2xx response that carried no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub operation: String,
    pub code: u16,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed with status {}: {}",
            self.operation, self.code, self.message
        )
    }
}

impl std::error::Error for ApiError {}

/// A non-2xx response whose body was kept as the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub payload: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (status {}): {}", self.status, self.code, self.payload)
    }
}

impl std::error::Error for ErrorResponse {}

/// Normalizes status-carrying errors into a [`ClientError`].
///
/// Errors without a status (connection failures, decode errors, token
/// acquisition failures) are returned untouched.
pub fn new_client_error(err: anyhow::Error) -> anyhow::Error {
    if let Some(api_error) = err.downcast_ref::<ApiError>() {
        return ClientError::new(api_error.code, &api_error.message, &api_error.message).into();
    }
    if let Some(response) = err.downcast_ref::<ErrorResponse>() {
        return ClientError::new(response.code, &response.status, &response.payload).into();
    }
    err
}

/// Whether a failed (or successful) call is worth another attempt.
///
/// Success never is. A [`ClientError`] is retried unless its status is in the
/// 2xx class, so 1xx, 3xx, 4xx and 5xx all qualify. Anything else is retried.
pub fn should_retry(err: Option<&anyhow::Error>) -> bool {
    let Some(err) = err else {
        return false;
    };

    match err.downcast_ref::<ClientError>() {
        Some(client_error) => client_error.code / 100 != 2,
        None => true,
    }
}
