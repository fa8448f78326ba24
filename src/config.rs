//! Environment-driven settings.
//!
//! Every setting has a default. A value that does not parse is reported and
//! replaced by the default; a valid custom value is reported too, since it
//! changes how the client talks to the deploy service.

use anyhow::{Result, anyhow, bail};
use log::{info, warn};
use url::Url;

use crate::http::build_user_agent;
use crate::runtime::Runtime;

pub const CONTROLLER_URL_ENV: &str = "MULTIAPPS_CONTROLLER_URL";
pub const UPLOAD_CHUNK_SIZE_ENV: &str = "MULTIAPPS_UPLOAD_CHUNK_SIZE";
pub const DEPRECATED_UPLOAD_CHUNK_SIZE_ENV: &str = "CHUNK_SIZE_IN_MB";
pub const UPLOAD_CHUNKS_SEQUENTIALLY_ENV: &str = "MULTIAPPS_UPLOAD_CHUNKS_SEQUENTIALLY";
pub const UPLOAD_CHUNKS_IN_PARALLEL_ENV: &str = "MULTIAPPS_UPLOAD_CHUNKS_IN_PARALLEL";
pub const DISABLE_PROGRESS_BAR_ENV: &str = "MULTIAPPS_DISABLE_UPLOAD_PROGRESS_BAR";
/// Free-form text appended to the User-Agent after sanitizing.
pub const USER_AGENT_SUFFIX_ENV: &str = "MULTIAPPS_USER_AGENT_SUFFIX";

pub const DEFAULT_UPLOAD_CHUNK_SIZE_MB: u64 = 45;

const DEPLOY_SERVICE_HOST_PREFIX: &str = "deploy-service";

/// Settings read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Overrides the deploy service URL derived from the Cloud Foundry API
    pub controller_url: Option<String>,
    pub upload_chunk_size_mb: u64,
    pub upload_chunks_sequentially: bool,
    pub upload_chunks_in_parallel: bool,
    pub disable_progress_bar: bool,
    pub user_agent_suffix: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            controller_url: None,
            upload_chunk_size_mb: DEFAULT_UPLOAD_CHUNK_SIZE_MB,
            upload_chunks_sequentially: false,
            upload_chunks_in_parallel: false,
            disable_progress_bar: false,
            user_agent_suffix: None,
        }
    }
}

impl Snapshot {
    #[tracing::instrument(skip(runtime))]
    pub fn load(runtime: &dyn Runtime) -> Self {
        let defaults = Self::default();

        let controller_url = lookup(runtime, &[CONTROLLER_URL_ENV]).map(|(name, value)| {
            warn!(
                "Using the custom deploy service URL {} from {}. It may run an outdated or modified service.",
                value, name
            );
            value
        });

        Self {
            controller_url,
            upload_chunk_size_mb: property(
                runtime,
                &[UPLOAD_CHUNK_SIZE_ENV, DEPRECATED_UPLOAD_CHUNK_SIZE_ENV],
                parse_chunk_size,
                defaults.upload_chunk_size_mb,
            ),
            upload_chunks_sequentially: property(
                runtime,
                &[UPLOAD_CHUNKS_SEQUENTIALLY_ENV],
                parse_bool,
                defaults.upload_chunks_sequentially,
            ),
            upload_chunks_in_parallel: property(
                runtime,
                &[UPLOAD_CHUNKS_IN_PARALLEL_ENV],
                parse_bool,
                defaults.upload_chunks_in_parallel,
            ),
            disable_progress_bar: property(
                runtime,
                &[DISABLE_PROGRESS_BAR_ENV],
                parse_bool,
                defaults.disable_progress_bar,
            ),
            user_agent_suffix: lookup(runtime, &[USER_AGENT_SUFFIX_ENV]).map(|(_, value)| value),
        }
    }

    /// The User-Agent every request carries, including the configured suffix.
    pub fn user_agent(&self) -> String {
        build_user_agent(self.user_agent_suffix.as_deref())
    }
}

/// First non-empty variable among `names`, with the name it came from.
fn lookup(runtime: &dyn Runtime, names: &[&'static str]) -> Option<(&'static str, String)> {
    names.iter().find_map(|name| {
        runtime
            .env_var(name)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| (*name, value.trim().to_string()))
    })
}

fn property<T: std::fmt::Display + Copy>(
    runtime: &dyn Runtime,
    names: &[&'static str],
    parse: fn(&str) -> Result<T>,
    default: T,
) -> T {
    let Some((name, raw)) = lookup(runtime, names) else {
        return default;
    };

    match parse(&raw) {
        Ok(value) => {
            info!("Using {} from the environment variable {}", value, name);
            value
        }
        Err(e) => {
            warn!(
                "Invalid value {:?} for the environment variable {} ({}). Using the default {}.",
                raw, name, e, default
            );
            default
        }
    }
}

fn parse_chunk_size(value: &str) -> Result<u64> {
    let size: u64 = value.parse()?;
    if size == 0 {
        bail!("chunk size cannot be 0");
    }
    Ok(size)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => bail!("not a boolean"),
    }
}

/// Picks the deploy service URL: an explicit option, then the environment,
/// then `deploy-service.<domain>` where the domain is the Cloud Foundry API
/// host without its first label.
pub fn deploy_service_url(
    option: Option<&str>,
    snapshot: &Snapshot,
    cf_api: Option<&str>,
) -> Result<String> {
    if let Some(url) = option.filter(|u| !u.trim().is_empty()) {
        return Ok(url.trim().to_string());
    }
    if let Some(url) = &snapshot.controller_url {
        return Ok(url.clone());
    }

    let cf_api = cf_api
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| anyhow!("No deploy service URL given and no Cloud Foundry API to derive it from"))?;
    let host = match Url::parse(cf_api) {
        Ok(url) => url.host_str().map(str::to_string),
        // A bare host without a scheme
        Err(_) => Some(cf_api.trim().trim_end_matches('/').to_string()),
    }
    .ok_or_else(|| anyhow!("Cloud Foundry API URL {} has no host", cf_api))?;

    match host.split_once('.') {
        Some((_, domain)) if !domain.is_empty() => {
            Ok(format!("{}.{}", DEPLOY_SERVICE_HOST_PREFIX, domain))
        }
        _ => bail!("Cannot derive the deploy service URL from {}", cf_api),
    }
}
