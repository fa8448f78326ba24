use anyhow::{Context, Result};

use super::print_table;
use crate::clients::models::Mta;
use crate::clients::mta_v2::MtaV2ClientOperations;

/// Lists the multi-target apps deployed in the space.
#[tracing::instrument(skip(client))]
pub async fn mtas(client: &dyn MtaV2ClientOperations) -> Result<()> {
    println!("Getting multi-target apps...");

    let mtas = client
        .get_mtas_for_this_space(None, None)
        .await
        .context("Could not get deployed components")?;
    println!("OK");

    if mtas.is_empty() {
        println!("No multi-target apps found");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = mtas
        .iter()
        .map(|mta| {
            vec![
                mta.metadata.id.clone(),
                mta_version(mta),
                mta.metadata.namespace.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["mta id", "version", "namespace"], &rows);
    Ok(())
}

pub(crate) fn mta_version(mta: &Mta) -> String {
    if mta.metadata.version.is_empty() || mta.metadata.version == "0.0.0-unknown" {
        "?".to_string()
    } else {
        mta.metadata.version.clone()
    }
}
