//! REST configuration API (`rest/...`).

mod retryable;

use anyhow::Result;
use async_trait::async_trait;

use super::base::{BaseClient, Connection, encode_arg};
use super::models::{Components, Mta, Operation};
use crate::http::ClientOperation;

pub const REST_BASE_PATH: &str = "rest";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RestClientOperations: Send + Sync {
    /// Removes configuration entries left behind by deleted applications.
    async fn purge_configuration(&self, org: &str, space: &str) -> Result<()>;

    async fn get_operations(&self, last: Option<u32>, states: &[String]) -> Result<Vec<Operation>>;

    /// MTAs and standalone applications deployed in the space.
    async fn get_components(&self) -> Result<Components>;

    async fn get_mta(&self, mta_id: &str) -> Result<Mta>;
}

pub struct RestClient {
    base: BaseClient,
    org: String,
    space: String,
}

impl RestClient {
    pub fn new(connection: &Connection, org: &str, space: &str) -> Self {
        Self {
            base: connection.client(REST_BASE_PATH, None),
            org: org.to_string(),
            space: space.to_string(),
        }
    }

    fn space_path(&self, suffix: &str) -> String {
        format!(
            "/{}/{}{}",
            encode_arg(&self.org),
            encode_arg(&self.space),
            suffix
        )
    }
}

#[async_trait]
impl RestClientOperations for RestClient {
    #[tracing::instrument(skip(self))]
    async fn purge_configuration(&self, org: &str, space: &str) -> Result<()> {
        let operation = ClientOperation::post("PurgeConfiguration", "/configuration-entries/purge")
            .query("org", org)
            .query("space", space);
        self.base.call_empty(&operation).await
    }

    async fn get_operations(&self, last: Option<u32>, states: &[String]) -> Result<Vec<Operation>> {
        let mut operation = ClientOperation::get("GetOperations", self.space_path("/operations"))
            .query_opt("last", last);
        for state in states {
            operation = operation.query("status", state);
        }
        self.base.call_json(&operation).await
    }

    async fn get_components(&self) -> Result<Components> {
        let operation = ClientOperation::get("GetComponents", self.space_path("/components"));
        self.base.call_json(&operation).await
    }

    async fn get_mta(&self, mta_id: &str) -> Result<Mta> {
        let path = self.space_path(&format!("/components/{}", encode_arg(mta_id)));
        self.base
            .call_json(&ClientOperation::get("GetMta", path))
            .await
    }
}
