//! Namespace-aware MTA lookups (`api/v2/spaces/{spaceGuid}/mtas`).

mod retryable;

use anyhow::Result;
use async_trait::async_trait;

use super::base::{BaseClient, Connection, encode_arg};
use super::models::Mta;
use crate::http::ClientOperation;

pub const MTA_V2_BASE_PATH: &str = "api/v2";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MtaV2ClientOperations: Send + Sync {
    /// MTAs deployed in `space_guid`, optionally narrowed by MTA id and namespace.
    async fn get_mtas(
        &self,
        name: Option<String>,
        namespace: Option<String>,
        space_guid: &str,
    ) -> Result<Vec<Mta>>;

    /// [`get_mtas`](Self::get_mtas) for the space the client was built for.
    async fn get_mtas_for_this_space(
        &self,
        name: Option<String>,
        namespace: Option<String>,
    ) -> Result<Vec<Mta>>;
}

pub struct MtaV2Client {
    base: BaseClient,
    space_guid: String,
}

impl MtaV2Client {
    pub fn new(connection: &Connection, space_guid: &str) -> Self {
        Self {
            base: connection.client(MTA_V2_BASE_PATH, None),
            space_guid: space_guid.to_string(),
        }
    }

    pub fn space_guid(&self) -> &str {
        &self.space_guid
    }
}

#[async_trait]
impl MtaV2ClientOperations for MtaV2Client {
    #[tracing::instrument(skip(self))]
    async fn get_mtas(
        &self,
        name: Option<String>,
        namespace: Option<String>,
        space_guid: &str,
    ) -> Result<Vec<Mta>> {
        let path = format!("/spaces/{}/mtas", encode_arg(space_guid));
        let operation = ClientOperation::get("GetMtasV2", path)
            .query_opt("name", name)
            .query_opt("namespace", namespace);
        self.base.call_json(&operation).await
    }

    async fn get_mtas_for_this_space(
        &self,
        name: Option<String>,
        namespace: Option<String>,
    ) -> Result<Vec<Mta>> {
        self.get_mtas(name, namespace, &self.space_guid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Retryable;
    use crate::clients::base::{ClientError, MockTokenFactory, StaticTokenFactory};
    use crate::http::MockRoundTripper;
    use crate::http::test_support::response;
    use crate::retry::RetryPolicy;
    use anyhow::anyhow;
    use mockito::Matcher;
    use std::sync::Arc;
    use std::time::Duration;

    fn connection(host: &str) -> Connection {
        Connection::new(host, Arc::new(StaticTokenFactory::new("test-token")))
    }

    #[tokio::test]
    async fn test_get_mtas_for_this_space() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/spaces/space-guid/mtas")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"metadata": {"id": "anatz", "version": "1.0.0", "namespace": "dev"}}]"#)
            .create_async()
            .await;

        let client = MtaV2Client::new(&connection(&server.url()), "space-guid");
        let mtas = client.get_mtas_for_this_space(None, None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(mtas.len(), 1);
        assert_eq!(mtas[0].metadata.namespace.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn test_get_mtas_filters_by_name_and_namespace() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/spaces/other%20space/mtas")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "anatz".into()),
                Matcher::UrlEncoded("namespace".into(), "dev".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = MtaV2Client::new(&connection(&server.url()), "space-guid");
        let mtas = client
            .get_mtas(
                Some("anatz".to_string()),
                Some("dev".to_string()),
                "other space",
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(mtas.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_client_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/spaces/space-guid/mtas")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("MTA with name \"anatz\" does not exist")
            .create_async()
            .await;

        let client = MtaV2Client::new(&connection(&server.url()), "space-guid");
        let err = client
            .get_mtas_for_this_space(Some("anatz".to_string()), None)
            .await
            .unwrap_err();

        let client_error = err.downcast_ref::<ClientError>().unwrap();
        assert_eq!(client_error.code, 404);
        assert!(client_error.description.contains("anatz"));
    }

    #[tokio::test]
    async fn test_token_error_sends_nothing() {
        let mut base = MockRoundTripper::new();
        base.expect_round_trip().times(0);
        let mut token_factory = MockTokenFactory::new();
        token_factory
            .expect_new_token()
            .times(1)
            .returning(|| Err(anyhow!("token expired")));

        let connection = Connection::new("example.com", Arc::new(token_factory))
            .with_round_tripper(Arc::new(base));
        let client = MtaV2Client::new(&connection, "space-guid");

        let err = client.get_mtas_for_this_space(None, None).await.unwrap_err();
        assert_eq!(err.to_string(), "token expired");
    }

    #[tokio::test]
    async fn test_retryable_server_error_reaches_transport_four_times() {
        let mut base = MockRoundTripper::new();
        base.expect_round_trip()
            .times(4)
            .returning(|_| Ok(response(503, None, "")));

        let connection = connection("example.com").with_round_tripper(Arc::new(base));
        let client = Retryable::with_policy(
            MtaV2Client::new(&connection, "space-guid"),
            RetryPolicy::new(3, Duration::ZERO),
        );

        let err = client.get_mtas_for_this_space(None, None).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ClientError>().unwrap().code, 503);
    }
}
