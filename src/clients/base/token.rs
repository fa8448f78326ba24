//! Bearer credentials and the factories that produce them.

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::runtime::Runtime;

/// An OAuth access token sent as `Authorization: Bearer <value>`.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn bearer(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Writes the `Authorization` header, marked sensitive.
    pub fn authenticate(&self, headers: &mut HeaderMap) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .context("Access token contains characters not allowed in a header")?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Produces a credential for the next remote call.
#[cfg_attr(test, mockall::automock)]
pub trait TokenFactory: Send + Sync {
    fn new_token(&self) -> Result<Token>;
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenFactory {
    token: Token,
}

impl StaticTokenFactory {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            token: Token::bearer(value),
        }
    }
}

impl TokenFactory for StaticTokenFactory {
    fn new_token(&self) -> Result<Token> {
        Ok(self.token.clone())
    }
}

/// Where raw access tokens (`"bearer <jwt>"`) come from.
#[cfg_attr(test, mockall::automock)]
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Result<String>;
}

/// Asks the Cloud Foundry CLI for the logged-in user's token.
pub struct CfCliTokenSource {
    runtime: Arc<dyn Runtime>,
}

impl CfCliTokenSource {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }
}

impl AccessTokenSource for CfCliTokenSource {
    fn access_token(&self) -> Result<String> {
        run_blocking(|| {
            self.runtime
                .command_output("cf", &["oauth-token".to_string()])
        })
        .context("Could not get access token")
    }
}

/// Runs a blocking call. On a multi-threaded runtime the worker's other tasks
/// are handed off first so they keep running while the call waits.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

#[derive(Debug, Default)]
struct CachedToken {
    value: Option<String>,
    fetched_at: i64,
}

/// Reuses a token until half of its remaining lifetime has passed.
///
/// The lifetime is read from the JWT `exp` claim. A cached token whose claims
/// cannot be read is replaced. The cache lock is held while the source is
/// asked for a new token, so concurrent callers wait for one refresh instead
/// of each starting their own.
pub struct CachingTokenFactory<S> {
    source: S,
    cache: Mutex<CachedToken>,
}

impl<S: AccessTokenSource> CachingTokenFactory<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(CachedToken::default()),
        }
    }

    fn raw_token_at(&self, now: i64) -> Result<String> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| anyhow!("Token cache lock poisoned"))?;

        if let Some(value) = &cache.value {
            match token_expiration_time(value) {
                Ok(expires_at) => {
                    let refresh_after = (expires_at - now) / 2;
                    if now - cache.fetched_at < refresh_after {
                        return Ok(value.clone());
                    }
                }
                Err(e) => debug!("Discarding cached token: {:#}", e),
            }
        }

        let raw = self.source.access_token()?;
        let value = token_value(&raw)?;
        cache.value = Some(value.clone());
        cache.fetched_at = now;
        Ok(value)
    }
}

impl<S: AccessTokenSource> TokenFactory for CachingTokenFactory<S> {
    fn new_token(&self) -> Result<Token> {
        self.raw_token_at(unix_now()).map(Token::bearer)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// The credential part of `"bearer <value>"`; a bare value is kept as-is.
fn token_value(raw: &str) -> Result<String> {
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(value)) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(value.to_string())
        }
        (Some(value), None) => Ok(value.to_string()),
        _ => bail!("Unexpected access token format"),
    }
}

fn token_expiration_time(token: &str) -> Result<i64> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(_)) if !header.is_empty() && !payload.is_empty() => {
            payload
        }
        _ => bail!("Access token is not a JWT"),
    };

    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .context("Could not decode token claims")?;
    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).context("Could not read token claims")?;

    claims
        .get("exp")
        .and_then(|exp| exp.as_f64())
        .map(|exp| exp as i64)
        .context("Could not get token expiration time")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    fn jwt(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{},"user_name":"admin"}}"#, exp));
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_token_authenticate() {
        let mut headers = HeaderMap::new();
        Token::bearer("abc").authenticate(&mut headers).unwrap();

        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value, "Bearer abc");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        assert_eq!(format!("{:?}", Token::bearer("secret")), "Token(***)");
    }

    #[test]
    fn test_token_authenticate_rejects_invalid_value() {
        let mut headers = HeaderMap::new();
        assert!(Token::bearer("a\nb").authenticate(&mut headers).is_err());
    }

    #[test]
    fn test_static_token_factory() {
        let factory = StaticTokenFactory::new("fixed");
        assert_eq!(factory.new_token().unwrap().value(), "fixed");
        assert_eq!(factory.new_token().unwrap().value(), "fixed");
    }

    #[test]
    fn test_token_value() {
        assert_eq!(token_value("bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert_eq!(token_value("Bearer xyz").unwrap(), "xyz");
        assert_eq!(token_value("xyz").unwrap(), "xyz");
        assert!(token_value("").is_err());
        assert!(token_value("basic a b").is_err());
    }

    #[test]
    fn test_token_expiration_time() {
        assert_eq!(token_expiration_time(&jwt(1_700_000_000)).unwrap(), 1_700_000_000);
        assert!(token_expiration_time("opaque").is_err());

        let no_exp = format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode("{}"),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"x"}"#)
        );
        assert!(token_expiration_time(&no_exp).is_err());
    }

    #[test]
    fn test_caching_factory_reuses_token_within_half_lifetime() {
        let token = jwt(2_000);
        let mut source = MockAccessTokenSource::new();
        let raw = format!("bearer {}", token);
        source
            .expect_access_token()
            .times(1)
            .returning(move || Ok(raw.clone()));

        let factory = CachingTokenFactory::new(source);
        assert_eq!(factory.raw_token_at(1_000).unwrap(), token);
        // At 1_200: elapsed 200 < (2000 - 1200) / 2 = 400
        assert_eq!(factory.raw_token_at(1_200).unwrap(), token);
    }

    #[test]
    fn test_caching_factory_refreshes_after_half_lifetime() {
        let first = jwt(2_000);
        let second = jwt(5_000);
        let mut source = MockAccessTokenSource::new();
        let mut seq = mockall::Sequence::new();
        let raw_first = format!("bearer {}", first);
        let raw_second = format!("bearer {}", second);
        source
            .expect_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move || Ok(raw_first.clone()));
        source
            .expect_access_token()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move || Ok(raw_second.clone()));

        let factory = CachingTokenFactory::new(source);
        assert_eq!(factory.raw_token_at(1_000).unwrap(), first);
        // At 1_600: elapsed 600 >= (2000 - 1600) / 2 = 200
        assert_eq!(factory.raw_token_at(1_600).unwrap(), second);
    }

    #[test]
    fn test_caching_factory_replaces_unreadable_token() {
        let mut source = MockAccessTokenSource::new();
        source
            .expect_access_token()
            .times(2)
            .returning(|| Ok("bearer opaque".to_string()));

        let factory = CachingTokenFactory::new(source);
        assert_eq!(factory.raw_token_at(1_000).unwrap(), "opaque");
        assert_eq!(factory.raw_token_at(1_001).unwrap(), "opaque");
    }

    #[test]
    fn test_caching_factory_propagates_source_error() {
        let mut source = MockAccessTokenSource::new();
        source
            .expect_access_token()
            .returning(|| Err(anyhow!("Not logged in")));

        let factory = CachingTokenFactory::new(source);
        let err = factory.new_token().unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
    }

    #[test]
    fn test_cf_cli_token_source() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_command_output()
            .withf(|program, args| {
                program.to_string() == "cf" && args.len() == 1 && args[0] == "oauth-token"
            })
            .returning(|_, _| Ok("bearer abc".to_string()));

        let source = CfCliTokenSource::new(Arc::new(runtime));
        assert_eq!(source.access_token().unwrap(), "bearer abc");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_cf_cli_token_source_does_not_stall_other_tasks() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let mut runtime = MockRuntime::new();
        runtime.expect_command_output().returning(move |_, _| {
            // Only completes if the runtime keeps polling tasks while cf runs
            let tx = tx.clone();
            Handle::current().spawn(async move {
                let _ = tx.send(());
            });
            rx.recv_timeout(std::time::Duration::from_secs(5))
                .map_err(|_| anyhow!("worker blocked while waiting for cf"))?;
            Ok("bearer abc".to_string())
        });

        let source = CfCliTokenSource::new(Arc::new(runtime));
        let token = tokio::spawn(async move { source.access_token() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token, "bearer abc");
    }

    #[tokio::test]
    async fn test_cf_cli_token_source_on_current_thread_runtime() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_command_output()
            .returning(|_, _| Ok("bearer abc".to_string()));

        let source = CfCliTokenSource::new(Arc::new(runtime));
        assert_eq!(source.access_token().unwrap(), "bearer abc");
    }

    #[test]
    fn test_cf_cli_token_source_failure() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_command_output()
            .returning(|_, _| Err(anyhow!("cf exited with 1: Not logged in")));

        let source = CfCliTokenSource::new(Arc::new(runtime));
        let err = source.access_token().unwrap_err();
        assert!(format!("{:#}", err).contains("Could not get access token"));
    }
}
