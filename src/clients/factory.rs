//! Hands out retry-wrapped protocol clients.

use std::sync::{Arc, OnceLock};

use super::Retryable;
use super::base::Connection;
use super::mta::{MtaClient, MtaClientOperations};
use super::mta_v2::{MtaV2Client, MtaV2ClientOperations};
use super::rest::{RestClient, RestClientOperations};
use super::slpp::{SlppClient, SlppClientOperations};

pub trait ClientFactory: Send + Sync {
    fn new_rest_client(
        &self,
        connection: &Connection,
        org: &str,
        space: &str,
    ) -> Arc<dyn RestClientOperations>;

    fn new_mta_client(&self, connection: &Connection, space_guid: &str)
    -> Arc<dyn MtaClientOperations>;

    fn new_management_mta_client(&self, connection: &Connection) -> Arc<dyn MtaClientOperations>;

    fn new_mta_v2_client(
        &self,
        connection: &Connection,
        space_guid: &str,
    ) -> Arc<dyn MtaV2ClientOperations>;

    fn new_slpp_client(
        &self,
        connection: &Connection,
        org: &str,
        space: &str,
        service_id: &str,
        process_id: &str,
    ) -> Arc<dyn SlppClientOperations>;
}

/// Builds each REST, space and management client once and reuses it.
///
/// The arguments of the first request for a kind of client win; later
/// requests get the cached instance whatever they pass. SLPP clients are
/// bound to one process and are built fresh every time.
#[derive(Default)]
pub struct DefaultClientFactory {
    rest_client: OnceLock<Arc<dyn RestClientOperations>>,
    mta_client: OnceLock<Arc<dyn MtaClientOperations>>,
    management_mta_client: OnceLock<Arc<dyn MtaClientOperations>>,
    mta_v2_client: OnceLock<Arc<dyn MtaV2ClientOperations>>,
}

impl DefaultClientFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientFactory for DefaultClientFactory {
    fn new_rest_client(
        &self,
        connection: &Connection,
        org: &str,
        space: &str,
    ) -> Arc<dyn RestClientOperations> {
        let client = self.rest_client.get_or_init(|| {
            Arc::new(Retryable::new(RestClient::new(connection, org, space)))
        });
        Arc::clone(client)
    }

    fn new_mta_client(
        &self,
        connection: &Connection,
        space_guid: &str,
    ) -> Arc<dyn MtaClientOperations> {
        let client = self
            .mta_client
            .get_or_init(|| Arc::new(Retryable::new(MtaClient::new(connection, space_guid))));
        Arc::clone(client)
    }

    fn new_management_mta_client(&self, connection: &Connection) -> Arc<dyn MtaClientOperations> {
        let client = self
            .management_mta_client
            .get_or_init(|| Arc::new(Retryable::new(MtaClient::management(connection))));
        Arc::clone(client)
    }

    fn new_mta_v2_client(
        &self,
        connection: &Connection,
        space_guid: &str,
    ) -> Arc<dyn MtaV2ClientOperations> {
        let client = self
            .mta_v2_client
            .get_or_init(|| Arc::new(Retryable::new(MtaV2Client::new(connection, space_guid))));
        Arc::clone(client)
    }

    fn new_slpp_client(
        &self,
        connection: &Connection,
        org: &str,
        space: &str,
        service_id: &str,
        process_id: &str,
    ) -> Arc<dyn SlppClientOperations> {
        Arc::new(Retryable::new(SlppClient::new(
            connection, org, space, service_id, process_id,
        )))
    }
}
