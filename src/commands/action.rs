use anyhow::{Context, Result, bail};
use log::debug;

use crate::clients::mta::MtaClientOperations;

/// Actions an operation can be asked to perform.
pub const ACTIONS: [&str; 3] = ["abort", "retry", "resume"];

/// Executes `action_id` on an operation after checking that the operation
/// currently offers it.
#[tracing::instrument(skip(client))]
pub async fn action(
    client: &dyn MtaClientOperations,
    operation_id: &str,
    action_id: &str,
) -> Result<()> {
    if !ACTIONS.contains(&action_id) {
        bail!(
            "Invalid action {:?}. Valid actions are: {}",
            action_id,
            ACTIONS.join(", ")
        );
    }

    let available = client
        .get_operation_actions(operation_id)
        .await
        .with_context(|| format!("Could not get actions of operation {}", operation_id))?;
    debug!("Operation {} offers {:?}", operation_id, available);
    if !available.iter().any(|a| a == action_id) {
        bail!(
            "Action {:?} is not possible for operation {}",
            action_id,
            operation_id
        );
    }

    println!(
        "Executing action {:?} on operation {}...",
        action_id, operation_id
    );
    let location = client
        .execute_action(operation_id, action_id)
        .await
        .with_context(|| {
            format!(
                "Could not execute action {:?} on operation {}",
                action_id, operation_id
            )
        })?;
    if let Some(location) = location {
        debug!("Operation is at {}", location);
    }
    println!("OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::base::ClientError;
    use crate::clients::mta::MockMtaClientOperations;

    #[tokio::test]
    async fn test_executes_available_action() {
        let mut client = MockMtaClientOperations::new();
        client
            .expect_get_operation_actions()
            .withf(|operation_id| operation_id == "p1")
            .returning(|_| Ok(vec!["abort".to_string(), "retry".to_string()]));
        client
            .expect_execute_action()
            .withf(|operation_id, action_id| operation_id == "p1" && action_id == "retry")
            .times(1)
            .returning(|_, _| Ok(Some("spaces/guid/operations/p1".to_string())));

        assert!(action(&client, "p1", "retry").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected_before_any_call() {
        let client = MockMtaClientOperations::new();

        let err = action(&client, "p1", "explode").await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid action \"explode\""));
    }

    #[tokio::test]
    async fn test_unavailable_action() {
        let mut client = MockMtaClientOperations::new();
        client
            .expect_get_operation_actions()
            .returning(|_| Ok(vec!["abort".to_string()]));
        client.expect_execute_action().times(0);

        let err = action(&client, "p1", "resume").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Action \"resume\" is not possible for operation p1"
        );
    }

    #[tokio::test]
    async fn test_execute_failure() {
        let mut client = MockMtaClientOperations::new();
        client
            .expect_get_operation_actions()
            .returning(|_| Ok(vec!["abort".to_string()]));
        client
            .expect_execute_action()
            .returning(|_, _| Err(ClientError::new(409, "Conflict", "already finished").into()));

        let err = action(&client, "p1", "abort").await.unwrap_err();
        assert_eq!(err.downcast_ref::<ClientError>().unwrap().code, 409);
    }
}
