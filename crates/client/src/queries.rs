//! Fixed GraphQL documents sent by the client

/// Looks up an artifact by name and target node
pub const ARTIFACT_CONTENT_QUERY: &str = r#"query ArtifactContent($name: String!, $target: ID!) {
  CoreArtifact(name__value: $name, object__ids: [$target]) {
    edges {
      node {
        id
        name { value }
        storage_id { value }
        content_type { value }
      }
    }
  }
}"#;
