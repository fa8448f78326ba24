use anyhow::Result;
use async_trait::async_trait;

use super::RestClientOperations;
use crate::clients::Retryable;
use crate::clients::models::{Components, Mta, Operation};

#[async_trait]
impl<C: RestClientOperations> RestClientOperations for Retryable<C> {
    async fn purge_configuration(&self, org: &str, space: &str) -> Result<()> {
        self.retry(|client| client.purge_configuration(org, space))
            .await
    }

    async fn get_operations(&self, last: Option<u32>, states: &[String]) -> Result<Vec<Operation>> {
        self.retry(|client| client.get_operations(last, states)).await
    }

    async fn get_components(&self) -> Result<Components> {
        self.retry(|client| client.get_components()).await
    }

    async fn get_mta(&self, mta_id: &str) -> Result<Mta> {
        self.retry(|client| client.get_mta(mta_id)).await
    }
}
