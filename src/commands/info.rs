use anyhow::{Context, Result};

use crate::clients::mta::MtaClientOperations;

/// Prints the API version reported by the deploy service.
#[tracing::instrument(skip(client))]
pub async fn info(client: &dyn MtaClientOperations) -> Result<()> {
    let info = client
        .get_info()
        .await
        .context("Could not get deploy service information")?;
    println!("API version: {}", info.api_version);
    Ok(())
}
