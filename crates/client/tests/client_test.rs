use infrahub_client::{ClientError, InfrahubClient, TOKEN_HEADER};
use infrahub_core::{Cardinality, FetchError, NodeKind, ServerConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_config(endpoint: &str) -> ServerConfig {
    ServerConfig {
        api_endpoint: Some(format!("{endpoint}/")),
        token: Some("secret".to_string()),
        timeout_secs: 1,
        ..Default::default()
    }
}

fn client_for(server: &MockServer) -> InfrahubClient {
    InfrahubClient::new(&server_config(&server.uri())).unwrap()
}

fn schema_body() -> serde_json::Value {
    json!({
        "nodes": [{
            "namespace": "Infra",
            "name": "Device",
            "inherit_from": [],
            "attributes": [{"name": "name", "kind": "Text"}],
            "relationships": [
                {"name": "site", "peer": "LocationSite", "cardinality": "one", "kind": "Attribute"}
            ]
        }],
        "generics": [{
            "namespace": "Infra",
            "name": "Interface",
            "attributes": [{"name": "name", "kind": "Text"}],
            "relationships": []
        }]
    })
}

#[tokio::test]
async fn test_execute_graphql_returns_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/main"))
        .and(header(TOKEN_HEADER, "secret"))
        .and(body_partial_json(json!({"variables": {"site": "atl1"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"InfraDevice": {"count": 2}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client_for(&server)
        .execute_graphql(
            "query Devices($site: String) { InfraDevice { count } }",
            Some(&json!({"site": "atl1"})),
        )
        .await
        .unwrap();

    assert_eq!(data, json!({"InfraDevice": {"count": 2}}));
}

#[tokio::test]
async fn test_execute_graphql_surfaces_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [
                {"message": "Cannot query field 'foo'"},
                {"message": "Unknown type 'Bar'"}
            ]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute_graphql("{ foo }", None)
        .await
        .unwrap_err();

    match err {
        ClientError::Fetch(FetchError::GraphQl(message)) => {
            assert_eq!(message, "Cannot query field 'foo'; Unknown type 'Bar'");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_execute_graphql_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/main"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute_graphql("{ foo }", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_schema_is_downloaded_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .and(query_param("branch", "main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let device = client.fetch_schema(&NodeKind::from("InfraDevice")).await.unwrap();
    let interface = client
        .fetch_schema(&NodeKind::from("InfraInterface"))
        .await
        .unwrap();

    assert_eq!(device.attribute_names(), vec!["name".to_string()]);
    assert_eq!(
        device.relationship("site").map(|rel| rel.cardinality),
        Some(Cardinality::One)
    );
    assert_eq!(interface.kind().as_str(), "InfraInterface");
}

#[tokio::test]
async fn test_unknown_kind_is_schema_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(schema_body()))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_schema(&NodeKind::from("InfraCircuit"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Fetch(FetchError::SchemaNotFound(kind)) if kind.as_str() == "InfraCircuit"
    ));
}

#[tokio::test]
async fn test_schema_404_is_schema_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/schema/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_schema(&NodeKind::from("InfraDevice"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Fetch(FetchError::SchemaNotFound(_))));
}

async fn mount_artifact(server: &MockServer, content_type: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path("/graphql/main"))
        .and(body_partial_json(json!({
            "variables": {"name": "startup-config", "target": "d1"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"CoreArtifact": {"edges": [{"node": {
                "id": "a1",
                "name": {"value": "startup-config"},
                "storage_id": {"value": "obj-1"},
                "content_type": {"value": content_type}
            }}]}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/storage/object/obj-1"))
        .and(header(TOKEN_HEADER, "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(content))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_json_artifact() {
    let server = MockServer::start().await;
    mount_artifact(&server, "application/json", r#"{"hostname": "atl1-edge1"}"#).await;

    let content = client_for(&server)
        .fetch_artifact("startup-config", "d1")
        .await
        .unwrap();

    assert_eq!(content, json!({"hostname": "atl1-edge1"}));
}

#[tokio::test]
async fn test_fetch_text_artifact() {
    let server = MockServer::start().await;
    mount_artifact(&server, "text/plain", "hostname atl1-edge1\n").await;

    let content = client_for(&server)
        .fetch_artifact("startup-config", "d1")
        .await
        .unwrap();

    assert_eq!(content, json!("hostname atl1-edge1\n"));
}

#[tokio::test]
async fn test_missing_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"CoreArtifact": {"edges": []}}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_artifact("startup-config", "d1")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ArtifactNotFound { .. }));
}

#[tokio::test]
async fn test_slow_server_is_unresponsive() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql/main"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute_graphql("{ foo }", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Fetch(FetchError::ServerUnresponsive(_))));
}

#[tokio::test]
async fn test_closed_port_is_unreachable() {
    // Bind then drop a listener to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = InfrahubClient::new(&server_config(&format!("http://127.0.0.1:{port}"))).unwrap();

    let err = client.execute_graphql("{ foo }", None).await.unwrap_err();

    assert!(matches!(err, ClientError::Fetch(FetchError::ServerUnreachable(_))));
}

#[test]
fn test_missing_token_is_config_error() {
    let config = ServerConfig {
        api_endpoint: Some("http://localhost:8000".to_string()),
        ..Default::default()
    };

    let err = InfrahubClient::new(&config).err().unwrap();

    assert!(err.to_string().contains("Missing API token"));
}
