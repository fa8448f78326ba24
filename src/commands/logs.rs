use anyhow::{Context, Result};
use log::debug;

use crate::clients::mta::MtaClientOperations;

/// Prints the logs of an operation, or only the one named by `log_id`.
#[tracing::instrument(skip(client))]
pub async fn mta_op_logs(
    client: &dyn MtaClientOperations,
    operation_id: &str,
    log_id: Option<&str>,
) -> Result<()> {
    println!(
        "Getting logs of multi-target app operation with id {}...",
        operation_id
    );

    let log_ids: Vec<String> = match log_id {
        Some(id) => vec![id.to_string()],
        None => client
            .get_mta_operation_logs(operation_id)
            .await
            .context("Could not get process logs")?
            .into_iter()
            .map(|log| log.id)
            .collect(),
    };
    debug!("Operation {} has {} log(s)", operation_id, log_ids.len());

    for id in &log_ids {
        let content = client
            .get_mta_operation_log_content(operation_id, id)
            .await
            .with_context(|| format!("Could not get content of log {}", id))?;
        println!("==> {} <==", id);
        println!("{}", content);
    }

    if log_ids.is_empty() {
        println!("No logs found");
    }
    Ok(())
}
