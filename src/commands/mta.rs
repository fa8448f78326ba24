use anyhow::{Result, bail};

use super::mtas::mta_version;
use super::print_table;
use crate::clients::base::ClientError;
use crate::clients::mta_v2::MtaV2ClientOperations;

/// Shows the modules and services of one multi-target app.
///
/// The same MTA id may be deployed under several namespaces; `namespace`
/// picks one of them.
#[tracing::instrument(skip(client))]
pub async fn mta(
    client: &dyn MtaV2ClientOperations,
    mta_id: &str,
    namespace: Option<&str>,
) -> Result<()> {
    println!("Showing health and status for multi-target app {}...", mta_id);

    let mtas = match client
        .get_mtas_for_this_space(Some(mta_id.to_string()), namespace.map(str::to_string))
        .await
    {
        Ok(mtas) => mtas,
        Err(e) => {
            if matches!(e.downcast_ref::<ClientError>(), Some(ce) if ce.code == 404) {
                bail!("Multi-target app {} not found", mta_id);
            }
            return Err(e.context(format!("Could not get multi-target app {}", mta_id)));
        }
    };
    if mtas.len() > 1 {
        bail!(
            "Multiple multi-target apps exist for name {}, please enter namespace",
            mta_id
        );
    }
    let Some(mta) = mtas.into_iter().next() else {
        bail!("Multi-target app {} not found", mta_id);
    };
    println!("OK");

    println!("Version: {}", mta_version(&mta));
    println!(
        "Namespace: {}",
        mta.metadata.namespace.as_deref().unwrap_or_default()
    );

    println!();
    println!("Apps:");
    let rows: Vec<Vec<String>> = mta
        .modules
        .iter()
        .map(|module| {
            vec![
                module.app_name.clone(),
                module.module_name.clone(),
                module.uris.join(", "),
            ]
        })
        .collect();
    print_table(&["name", "module", "urls"], &rows);

    println!();
    println!("Services:");
    for service in &mta.services {
        println!("{}", service);
    }
    Ok(())
}
