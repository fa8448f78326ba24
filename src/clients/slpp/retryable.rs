use anyhow::Result;
use async_trait::async_trait;

use super::SlppClientOperations;
use crate::clients::Retryable;
use crate::clients::models::slp::{Action, Log, Metadata, ProcessError, Task};

#[async_trait]
impl<C: SlppClientOperations> SlppClientOperations for Retryable<C> {
    async fn get_metadata(&self) -> Result<Metadata> {
        self.retry(|client| client.get_metadata()).await
    }

    async fn get_logs(&self) -> Result<Vec<Log>> {
        self.retry(|client| client.get_logs()).await
    }

    async fn get_log_content(&self, log_id: &str) -> Result<String> {
        self.retry(|client| client.get_log_content(log_id)).await
    }

    async fn get_tasklist(&self) -> Result<Vec<Task>> {
        self.retry(|client| client.get_tasklist()).await
    }

    async fn get_tasklist_task(&self, task_id: &str) -> Result<Task> {
        self.retry(|client| client.get_tasklist_task(task_id)).await
    }

    fn get_service_id(&self) -> String {
        self.inner().get_service_id()
    }

    async fn get_error(&self) -> Result<ProcessError> {
        self.retry(|client| client.get_error()).await
    }

    async fn execute_action(&self, action_id: &str) -> Result<()> {
        self.retry(|client| client.execute_action(action_id)).await
    }

    async fn get_actions(&self) -> Result<Vec<Action>> {
        self.retry(|client| client.get_actions()).await
    }
}
