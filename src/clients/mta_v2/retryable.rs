use anyhow::Result;
use async_trait::async_trait;

use super::MtaV2ClientOperations;
use crate::clients::Retryable;
use crate::clients::models::Mta;

#[async_trait]
impl<C: MtaV2ClientOperations> MtaV2ClientOperations for Retryable<C> {
    async fn get_mtas(
        &self,
        name: Option<String>,
        namespace: Option<String>,
        space_guid: &str,
    ) -> Result<Vec<Mta>> {
        self.retry(|client| client.get_mtas(name.clone(), namespace.clone(), space_guid))
            .await
    }

    async fn get_mtas_for_this_space(
        &self,
        name: Option<String>,
        namespace: Option<String>,
    ) -> Result<Vec<Mta>> {
        self.retry(|client| client.get_mtas_for_this_space(name.clone(), namespace.clone()))
            .await
    }
}
