use anyhow::Result;
use async_trait::async_trait;

use super::MtaClientOperations;
use crate::clients::Retryable;
use crate::clients::models::{FileMetadata, Info, Log, Mta, Operation};

#[async_trait]
impl<C: MtaClientOperations> MtaClientOperations for Retryable<C> {
    async fn execute_action(&self, operation_id: &str, action_id: &str) -> Result<Option<String>> {
        self.retry(|client| client.execute_action(operation_id, action_id))
            .await
    }

    async fn get_mta(&self, mta_id: &str) -> Result<Mta> {
        self.retry(|client| client.get_mta(mta_id)).await
    }

    async fn get_mta_files(&self, namespace: Option<String>) -> Result<Vec<FileMetadata>> {
        self.retry(|client| client.get_mta_files(namespace.clone()))
            .await
    }

    async fn get_mta_operation(&self, operation_id: &str, embed: &str) -> Result<Operation> {
        self.retry(|client| client.get_mta_operation(operation_id, embed))
            .await
    }

    async fn get_mta_operation_logs(&self, operation_id: &str) -> Result<Vec<Log>> {
        self.retry(|client| client.get_mta_operation_logs(operation_id))
            .await
    }

    async fn get_mta_operations(
        &self,
        mta_id: Option<String>,
        last: Option<u32>,
        states: &[String],
    ) -> Result<Vec<Operation>> {
        self.retry(|client| client.get_mta_operations(mta_id.clone(), last, states))
            .await
    }

    async fn get_mtas(&self) -> Result<Vec<Mta>> {
        self.retry(|client| client.get_mtas()).await
    }

    async fn get_operation_actions(&self, operation_id: &str) -> Result<Vec<String>> {
        self.retry(|client| client.get_operation_actions(operation_id))
            .await
    }

    async fn start_mta_operation(&self, operation: &Operation) -> Result<Option<String>> {
        self.retry(|client| client.start_mta_operation(operation))
            .await
    }

    async fn get_mta_operation_log_content(
        &self,
        operation_id: &str,
        log_id: &str,
    ) -> Result<String> {
        self.retry(|client| client.get_mta_operation_log_content(operation_id, log_id))
            .await
    }

    async fn get_info(&self) -> Result<Info> {
        self.retry(|client| client.get_info()).await
    }

    async fn get_csrf_token(&self) -> Result<Option<String>> {
        self.retry(|client| client.get_csrf_token()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::base::ClientError;
    use crate::clients::mta::MockMtaClientOperations;
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    fn retryable(inner: MockMtaClientOperations) -> Retryable<MockMtaClientOperations> {
        Retryable::with_policy(inner, RetryPolicy::new(3, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_owned_arguments_are_cloned_per_attempt() {
        let mut inner = MockMtaClientOperations::new();
        inner
            .expect_get_mta_files()
            .withf(|namespace| namespace.as_deref() == Some("dev"))
            .times(4)
            .returning(|_| Err(ClientError::new(500, "Internal Server Error", "").into()));

        let err = retryable(inner)
            .get_mta_files(Some("dev".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ClientError>().unwrap().code, 500);
    }

    #[tokio::test]
    async fn test_missing_location_is_not_an_error() {
        let mut inner = MockMtaClientOperations::new();
        inner
            .expect_start_mta_operation()
            .times(1)
            .returning(|_| Ok(None));

        let location = retryable(inner)
            .start_mta_operation(&Operation::default())
            .await
            .unwrap();
        assert_eq!(location, None);
    }

    #[tokio::test]
    async fn test_redirect_status_is_retried() {
        let mut inner = MockMtaClientOperations::new();
        let mut seq = mockall::Sequence::new();
        inner
            .expect_get_info()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ClientError::new(302, "Found", "Found").into()));
        inner
            .expect_get_info()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(Info { api_version: 1 }));

        assert_eq!(retryable(inner).get_info().await.unwrap().api_version, 1);
    }

    #[tokio::test]
    async fn test_execute_action_forwards_ids() {
        let mut inner = MockMtaClientOperations::new();
        inner
            .expect_execute_action()
            .withf(|operation_id, action_id| operation_id == "p1" && action_id == "resume")
            .times(1)
            .returning(|_, _| Ok(Some("operations/p1".to_string())));

        let location = retryable(inner).execute_action("p1", "resume").await.unwrap();
        assert_eq!(location.as_deref(), Some("operations/p1"));
    }
}
