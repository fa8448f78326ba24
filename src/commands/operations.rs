use anyhow::{Context, Result};
use log::debug;

use super::print_table;
use crate::clients::models::Operation;
use crate::clients::mta::MtaClientOperations;

/// States an operation can be in while it still needs attention.
pub const ACTIVE_STATES: [&str; 3] = ["RUNNING", "ERROR", "ACTION_REQUIRED"];

/// Lists operations in the space.
///
/// Without `last` or `all` only active operations are shown. `last` limits
/// the list to the most recent operations in any state.
#[tracing::instrument(skip(client))]
pub async fn mta_ops(
    client: &dyn MtaClientOperations,
    mta_id: Option<String>,
    last: Option<u32>,
    all: bool,
) -> Result<()> {
    println!("{}", initial_message(mta_id.as_deref(), last, all));

    let (last, states) = filters(last, all);
    debug!("Querying operations with last={:?} states={:?}", last, states);

    let operations = client
        .get_mta_operations(mta_id, last, &states)
        .await
        .context("Could not get multi-target app operations")?;
    println!("OK");

    if operations.is_empty() {
        println!("No multi-target app operations found");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = operations.iter().map(operation_row).collect();
    print_table(
        &[
            "id",
            "type",
            "mta id",
            "namespace",
            "status",
            "started at",
            "started by",
        ],
        &rows,
    );
    Ok(())
}

fn initial_message(mta_id: Option<&str>, last: Option<u32>, all: bool) -> String {
    match (mta_id, last) {
        (Some(mta_id), _) => format!("Getting multi-target app operations for {}...", mta_id),
        _ if all => "Getting all multi-target app operations...".to_string(),
        (None, Some(1)) => "Getting last multi-target app operation...".to_string(),
        (None, Some(n)) if n > 0 => format!("Getting last {} multi-target app operations...", n),
        _ => "Getting active multi-target app operations...".to_string(),
    }
}

fn filters(last: Option<u32>, all: bool) -> (Option<u32>, Vec<String>) {
    if all {
        return (None, Vec::new());
    }
    match last.filter(|n| *n > 0) {
        Some(n) => (Some(n), Vec::new()),
        None => (None, ACTIVE_STATES.iter().map(|s| s.to_string()).collect()),
    }
}

fn operation_row(operation: &Operation) -> Vec<String> {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    vec![
        field(&operation.process_id),
        field(&operation.process_type),
        operation
            .mta_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        field(&operation.namespace),
        field(&operation.state),
        field(&operation.started_at),
        field(&operation.user),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mta::MockMtaClientOperations;

    #[test]
    fn test_filters() {
        let active: Vec<String> = ACTIVE_STATES.iter().map(|s| s.to_string()).collect();
        assert_eq!(filters(None, false), (None, active.clone()));
        assert_eq!(filters(Some(0), false), (None, active));
        assert_eq!(filters(Some(3), false), (Some(3), vec![]));
        assert_eq!(filters(Some(3), true), (None, vec![]));
    }

    #[test]
    fn test_initial_message() {
        assert_eq!(
            initial_message(Some("anatz"), None, false),
            "Getting multi-target app operations for anatz..."
        );
        assert_eq!(
            initial_message(None, Some(1), false),
            "Getting last multi-target app operation..."
        );
        assert_eq!(
            initial_message(None, Some(5), false),
            "Getting last 5 multi-target app operations..."
        );
        assert_eq!(
            initial_message(None, None, true),
            "Getting all multi-target app operations..."
        );
        assert_eq!(
            initial_message(None, None, false),
            "Getting active multi-target app operations..."
        );
    }

    #[test]
    fn test_operation_row_missing_mta_id() {
        let operation = Operation {
            process_id: Some("p1".to_string()),
            state: Some("RUNNING".to_string()),
            ..Default::default()
        };
        let row = operation_row(&operation);
        assert_eq!(row[0], "p1");
        assert_eq!(row[2], "N/A");
        assert_eq!(row[4], "RUNNING");
    }

    #[tokio::test]
    async fn test_mta_ops_requests_active_states_by_default() {
        let mut client = MockMtaClientOperations::new();
        client
            .expect_get_mta_operations()
            .withf(|mta_id, last, states| {
                mta_id.is_none()
                    && last.is_none()
                    && states == ["RUNNING", "ERROR", "ACTION_REQUIRED"]
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![Operation::default()]));

        assert!(mta_ops(&client, None, None, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_mta_ops_last_for_one_mta() {
        let mut client = MockMtaClientOperations::new();
        client
            .expect_get_mta_operations()
            .withf(|mta_id, last, states| {
                mta_id.as_deref() == Some("anatz") && *last == Some(2) && states.is_empty()
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        assert!(
            mta_ops(&client, Some("anatz".to_string()), Some(2), false)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_mta_ops_error() {
        let mut client = MockMtaClientOperations::new();
        client
            .expect_get_mta_operations()
            .returning(|_, _, _| Err(anyhow::anyhow!("connection reset")));

        let err = mta_ops(&client, None, None, true).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not get multi-target app operations"
        );
    }
}
