use anyhow::{Context, Result};
use log::debug;

use crate::clients::rest::RestClientOperations;

/// Removes configuration entries of applications that no longer exist.
#[tracing::instrument(skip(client))]
pub async fn purge_mta_config(
    client: &dyn RestClientOperations,
    org: &str,
    space: &str,
) -> Result<()> {
    println!("Purging configuration entries in org {} / space {}", org, space);

    client
        .purge_configuration(org, space)
        .await
        .context("Could not purge configuration")?;

    debug!("Purged configuration entries of {}/{}", org, space);
    println!("OK");
    Ok(())
}
