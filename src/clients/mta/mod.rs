//! Operations API (`api/v1/spaces/{spaceGuid}/...`).

mod retryable;

use anyhow::Result;
use async_trait::async_trait;

use super::base::{BaseClient, Connection, encode_arg};
use super::models::{FileMetadata, Info, Log, Mta, Operation};
use crate::http::{CSRF_TOKEN_HEADER, ClientOperation, TEXT_MIME};

pub const MTA_BASE_PATH: &str = "api/v1";
const SPACES_PATH: &str = "spaces";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MtaClientOperations: Send + Sync {
    /// Runs `abort`, `retry`, `resume` or another action on an operation and
    /// returns where the operation can be polled.
    async fn execute_action(&self, operation_id: &str, action_id: &str) -> Result<Option<String>>;

    async fn get_mta(&self, mta_id: &str) -> Result<Mta>;
    async fn get_mta_files(&self, namespace: Option<String>) -> Result<Vec<FileMetadata>>;

    /// `embed` names nested collections to inline, e.g. `messages`.
    async fn get_mta_operation(&self, operation_id: &str, embed: &str) -> Result<Operation>;

    async fn get_mta_operation_logs(&self, operation_id: &str) -> Result<Vec<Log>>;

    async fn get_mta_operations(
        &self,
        mta_id: Option<String>,
        last: Option<u32>,
        states: &[String],
    ) -> Result<Vec<Operation>>;

    async fn get_mtas(&self) -> Result<Vec<Mta>>;
    async fn get_operation_actions(&self, operation_id: &str) -> Result<Vec<String>>;

    /// Starts a process and returns where it can be polled.
    async fn start_mta_operation(&self, operation: &Operation) -> Result<Option<String>>;

    async fn get_mta_operation_log_content(&self, operation_id: &str, log_id: &str)
    -> Result<String>;

    async fn get_info(&self) -> Result<Info>;

    /// The CSRF token handed out by the service, if it enforces one.
    async fn get_csrf_token(&self) -> Result<Option<String>>;
}

pub struct MtaClient {
    base: BaseClient,
}

impl MtaClient {
    /// A client for the operations of one space.
    pub fn new(connection: &Connection, space_guid: &str) -> Self {
        let base_path = format!("{}/{}/{}", MTA_BASE_PATH, SPACES_PATH, space_guid);
        let encoded_base_path = format!(
            "{}/{}/{}",
            MTA_BASE_PATH,
            SPACES_PATH,
            encode_arg(space_guid)
        );
        Self {
            base: connection.client(&base_path, Some(encoded_base_path)),
        }
    }

    /// A client for the endpoints that are not bound to a space.
    pub fn management(connection: &Connection) -> Self {
        Self {
            base: connection.client(MTA_BASE_PATH, None),
        }
    }

    pub fn base_path(&self) -> &str {
        self.base.transport().base_path()
    }
}

fn operation_path(operation_id: &str, suffix: &str) -> String {
    format!("/operations/{}{}", encode_arg(operation_id), suffix)
}

#[async_trait]
impl MtaClientOperations for MtaClient {
    #[tracing::instrument(skip(self))]
    async fn execute_action(&self, operation_id: &str, action_id: &str) -> Result<Option<String>> {
        let operation =
            ClientOperation::post("ExecuteOperationAction", operation_path(operation_id, ""))
                .query("actionId", action_id);
        self.base.call_location(&operation).await
    }

    async fn get_mta(&self, mta_id: &str) -> Result<Mta> {
        let operation = ClientOperation::get("GetMta", format!("/mtas/{}", encode_arg(mta_id)));
        self.base.call_json(&operation).await
    }

    async fn get_mta_files(&self, namespace: Option<String>) -> Result<Vec<FileMetadata>> {
        let namespace = namespace.filter(|n| !n.is_empty());
        let operation = ClientOperation::get("GetMtaFiles", "/files").query_opt("namespace", namespace);
        self.base.call_json(&operation).await
    }

    async fn get_mta_operation(&self, operation_id: &str, embed: &str) -> Result<Operation> {
        let embed = Some(embed).filter(|e| !e.is_empty());
        let operation = ClientOperation::get("GetMtaOperation", operation_path(operation_id, ""))
            .query_opt("embed", embed);
        self.base.call_json(&operation).await
    }

    async fn get_mta_operation_logs(&self, operation_id: &str) -> Result<Vec<Log>> {
        let operation =
            ClientOperation::get("GetMtaOperationLogs", operation_path(operation_id, "/logs"));
        self.base.call_json(&operation).await
    }

    async fn get_mta_operations(
        &self,
        mta_id: Option<String>,
        last: Option<u32>,
        states: &[String],
    ) -> Result<Vec<Operation>> {
        let mut operation = ClientOperation::get("GetMtaOperations", "/operations")
            .query_opt("mtaId", mta_id)
            .query_opt("last", last);
        for state in states {
            operation = operation.query("state", state);
        }
        self.base.call_json(&operation).await
    }

    async fn get_mtas(&self) -> Result<Vec<Mta>> {
        self.base
            .call_json(&ClientOperation::get("GetMtas", "/mtas"))
            .await
    }

    async fn get_operation_actions(&self, operation_id: &str) -> Result<Vec<String>> {
        let operation =
            ClientOperation::get("GetOperationActions", operation_path(operation_id, "/actions"));
        self.base.call_json(&operation).await
    }

    #[tracing::instrument(skip(self, operation))]
    async fn start_mta_operation(&self, operation: &Operation) -> Result<Option<String>> {
        let request = ClientOperation::post("StartMtaOperation", "/operations").json_body(operation)?;
        self.base.call_location(&request).await
    }

    async fn get_mta_operation_log_content(
        &self,
        operation_id: &str,
        log_id: &str,
    ) -> Result<String> {
        let path = operation_path(
            operation_id,
            &format!("/logs/{}/content", encode_arg(log_id)),
        );
        let operation = ClientOperation::get("GetMtaOperationLogContent", path).produces(TEXT_MIME);
        self.base.call_text(&operation).await
    }

    async fn get_info(&self) -> Result<Info> {
        self.base
            .call_json(&ClientOperation::get("GetInfo", "/info"))
            .await
    }

    async fn get_csrf_token(&self) -> Result<Option<String>> {
        let response = self
            .base
            .send(&ClientOperation::get("GetCsrfToken", "/csrf-token"))
            .await?;
        Ok(response
            .headers()
            .get(CSRF_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()))
    }
}
