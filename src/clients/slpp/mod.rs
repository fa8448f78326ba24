//! Long-running-process API (`slprot/{org}/{space}/slp/runs/{serviceId}/{processId}`).

mod retryable;

use anyhow::Result;
use async_trait::async_trait;

use super::base::{BaseClient, Connection, encode_arg};
use super::models::slp::{Action, Log, Metadata, ProcessError, Task};
use crate::http::{ClientOperation, TEXT_MIME};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlppClientOperations: Send + Sync {
    async fn get_metadata(&self) -> Result<Metadata>;
    async fn get_logs(&self) -> Result<Vec<Log>>;
    async fn get_log_content(&self, log_id: &str) -> Result<String>;
    async fn get_tasklist(&self) -> Result<Vec<Task>>;
    async fn get_tasklist_task(&self, task_id: &str) -> Result<Task>;

    /// The service the process runs under. Answered locally.
    fn get_service_id(&self) -> String;

    async fn get_error(&self) -> Result<ProcessError>;
    async fn execute_action(&self, action_id: &str) -> Result<()>;
    async fn get_actions(&self) -> Result<Vec<Action>>;
}

pub struct SlppClient {
    base: BaseClient,
    service_id: String,
}

impl SlppClient {
    pub fn new(
        connection: &Connection,
        org: &str,
        space: &str,
        service_id: &str,
        process_id: &str,
    ) -> Self {
        let base_path = slpp_path([org, space, service_id, process_id].map(str::to_string));
        let encoded_base_path = slpp_path([org, space, service_id, process_id].map(encode_arg));

        Self {
            base: connection.client(&base_path, Some(encoded_base_path)),
            service_id: service_id.to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        self.base.transport().base_path()
    }
}

fn slpp_path([org, space, service_id, process_id]: [String; 4]) -> String {
    format!(
        "slprot/{}/{}/slp/runs/{}/{}",
        org, space, service_id, process_id
    )
}

#[async_trait]
impl SlppClientOperations for SlppClient {
    async fn get_metadata(&self) -> Result<Metadata> {
        self.base
            .call_json(&ClientOperation::get("GetMetadata", "/metadata"))
            .await
    }

    async fn get_logs(&self) -> Result<Vec<Log>> {
        self.base
            .call_json(&ClientOperation::get("GetLogs", "/logs"))
            .await
    }

    async fn get_log_content(&self, log_id: &str) -> Result<String> {
        let operation = ClientOperation::get(
            "GetLogContent",
            format!("/logs/{}/content", encode_arg(log_id)),
        )
        .produces(TEXT_MIME);
        self.base.call_text(&operation).await
    }

    async fn get_tasklist(&self) -> Result<Vec<Task>> {
        self.base
            .call_json(&ClientOperation::get("GetTasklist", "/tasklist"))
            .await
    }

    async fn get_tasklist_task(&self, task_id: &str) -> Result<Task> {
        let operation =
            ClientOperation::get("GetTasklistTask", format!("/tasklist/{}", encode_arg(task_id)));
        self.base.call_json(&operation).await
    }

    fn get_service_id(&self) -> String {
        self.service_id.clone()
    }

    async fn get_error(&self) -> Result<ProcessError> {
        self.base
            .call_json(&ClientOperation::get("GetError", "/error"))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn execute_action(&self, action_id: &str) -> Result<()> {
        let operation =
            ClientOperation::post("ExecuteAction", format!("/actions/{}", encode_arg(action_id)));
        self.base.call_empty(&operation).await
    }

    async fn get_actions(&self) -> Result<Vec<Action>> {
        self.base
            .call_json(&ClientOperation::get("GetActions", "/actions"))
            .await
    }
}
