//! HTTP client for the Infrahub REST and GraphQL endpoints

use crate::error::{transport_error, ClientError, Result};
use crate::queries::ARTIFACT_CONTENT_QUERY;
use indexmap::IndexMap;
use infrahub_core::{FetchError, NodeKind, SchemaDescriptor, ServerConfig};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Header carrying the API token
pub const TOKEN_HEADER: &str = "X-INFRAHUB-KEY";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Envelope of every GraphQL response
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Body of the REST schema endpoint
#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    nodes: Vec<SchemaDescriptor>,
    #[serde(default)]
    generics: Vec<SchemaDescriptor>,
}

/// Client bound to one server and branch
pub struct InfrahubClient {
    client: Client,
    endpoint: String,
    token: String,
    branch: String,
    schemas: OnceCell<IndexMap<NodeKind, SchemaDescriptor>>,
}

impl InfrahubClient {
    /// Create a client from validated connection settings
    pub fn new(config: &ServerConfig) -> infrahub_core::Result<Self> {
        let endpoint = config.endpoint()?.to_string();
        let token = config.token()?.to_string();

        info!("Initializing Infrahub client");
        info!("  Endpoint: {endpoint}");
        info!("  Branch: {}", config.branch);
        info!("  Timeout: {}s", config.timeout_secs);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            token,
            branch: config.branch.clone(),
            schemas: OnceCell::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Execute a GraphQL query and return its `data` object
    ///
    /// Any entry in the response's `errors` array fails the call.
    pub async fn execute_graphql(&self, query: &str, variables: Option<&Value>) -> Result<Value> {
        let url = format!("{}/graphql/{}", self.endpoint, self.branch);
        let mut payload = json!({ "query": query });
        if let Some(variables) = variables {
            payload["variables"] = variables.clone();
        }

        debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;

        match serde_json::from_str::<GraphQlResponse>(&body) {
            Ok(parsed) if !parsed.errors.is_empty() => {
                let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
                Err(FetchError::GraphQl(messages.join("; ")).into())
            }
            _ if !status.is_success() => Err(ClientError::Status {
                url,
                status: status.as_u16(),
                body,
            }),
            Ok(parsed) => Ok(parsed.data.unwrap_or(Value::Null)),
            Err(e) => Err(ClientError::invalid_response(format!(
                "Failed to parse GraphQL response from {url}: {e}"
            ))),
        }
    }

    /// Look up the schema of one kind
    ///
    /// The full schema of the branch is downloaded once per client; nodes and
    /// generics are both searched.
    pub async fn fetch_schema(&self, kind: &NodeKind) -> Result<SchemaDescriptor> {
        let schemas = match self.schemas().await {
            Ok(schemas) => schemas,
            Err(ClientError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(FetchError::SchemaNotFound(kind.clone()).into());
            }
            Err(e) => return Err(e),
        };
        schemas
            .get(kind)
            .cloned()
            .ok_or_else(|| FetchError::SchemaNotFound(kind.clone()).into())
    }

    /// Every schema known on the client's branch
    pub async fn schemas(&self) -> Result<&IndexMap<NodeKind, SchemaDescriptor>> {
        self.schemas
            .get_or_try_init(|| self.download_schemas())
            .await
    }

    async fn download_schemas(&self) -> Result<IndexMap<NodeKind, SchemaDescriptor>> {
        let url = format!("{}/api/schema/", self.endpoint);
        debug!("GET {url}?branch={}", self.branch);

        let response = self.get(&url, &[("branch", self.branch.as_str())]).await?;
        let parsed: SchemaResponse = response.json().await.map_err(|e| {
            ClientError::invalid_response(format!("Failed to parse schema response: {e}"))
        })?;

        let schemas: IndexMap<NodeKind, SchemaDescriptor> = parsed
            .nodes
            .into_iter()
            .chain(parsed.generics)
            .map(|schema| (schema.kind().clone(), schema))
            .collect();
        info!("Loaded {} schemas from branch {}", schemas.len(), self.branch);
        Ok(schemas)
    }

    /// Fetch the content of the artifact `name` generated for `target_id`
    ///
    /// JSON artifacts are returned parsed, anything else as a string value.
    pub async fn fetch_artifact(&self, name: &str, target_id: &str) -> Result<Value> {
        let variables = json!({ "name": name, "target": target_id });
        let data = self
            .execute_graphql(ARTIFACT_CONTENT_QUERY, Some(&variables))
            .await?;

        let Some(artifact) = data
            .pointer("/CoreArtifact/edges/0/node")
            .and_then(Value::as_object)
        else {
            return Err(ClientError::ArtifactNotFound {
                name: name.to_string(),
                target_id: target_id.to_string(),
            });
        };

        let storage_id = attribute_value(artifact, "storage_id").ok_or_else(|| {
            ClientError::invalid_response(format!("Artifact '{name}' has no storage id"))
        })?;
        let content_type = attribute_value(artifact, "content_type").unwrap_or_default();

        let url = format!("{}/api/storage/object/{storage_id}", self.endpoint);
        debug!("GET {url}");
        let response = self.get(&url, &[]).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;

        if content_type == JSON_CONTENT_TYPE {
            serde_json::from_str(&body).map_err(|e| {
                ClientError::invalid_response(format!("Artifact '{name}' is not valid JSON: {e}"))
            })
        } else {
            Ok(Value::String(body))
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        warn!("GET {url} returned {status}");
        Err(ClientError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

/// Read `<name>.value` of a GraphQL node as a string
fn attribute_value(node: &Map<String, Value>, name: &str) -> Option<String> {
    node.get(name)?
        .get("value")?
        .as_str()
        .map(str::to_string)
}

