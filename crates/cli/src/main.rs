//! Infrahub inventory CLI
//!
//! Renders an Ansible dynamic inventory from Infrahub nodes and gives access
//! to raw GraphQL queries, artifacts and schemas.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use infrahub_client::InfrahubClient;
use infrahub_core::{Config, NodeKind};
use infrahub_inventory::graphql::hostvars_from_query;
use infrahub_inventory::{resolve_inventory, schema_summary, InventoryRenderer};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "infrahub-inventory")]
#[command(about = "Ansible dynamic inventory backed by Infrahub")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ansible inventory protocol: print the full inventory
    #[arg(long, conflicts_with = "host")]
    list: bool,

    /// Ansible inventory protocol: print the variables of one host
    #[arg(long, value_name = "NAME")]
    host: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dynamic inventory as JSON
    Inventory {
        /// Graph snapshot to resolve nodes from
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },
    /// Print the variables of one host
    Host {
        name: String,

        /// Graph snapshot to resolve nodes from
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,
    },
    /// Run a GraphQL query against the server
    Query {
        /// Query text
        #[arg(long)]
        query: String,

        /// Query variables as a JSON object
        #[arg(long, value_name = "JSON")]
        variables: Option<String>,

        /// Print the result as inventory host variables
        #[arg(long)]
        update_hostvars: bool,
    },
    /// Fetch the content of an artifact
    Artifact {
        /// Artifact name
        #[arg(long)]
        name: String,

        /// Id of the node the artifact was generated for
        #[arg(long)]
        target_id: String,
    },
    /// Describe the schema of a node kind
    Schema { kind: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose)?;

    let config_path = cli.config.as_deref();
    let command = match (cli.command, cli.host) {
        (Some(command), _) => command,
        (None, Some(name)) => Commands::Host {
            name,
            snapshot: None,
        },
        (None, None) => Commands::Inventory { snapshot: None },
    };
    if cli.list {
        debug!("--list requested");
    }

    let output = match command {
        Commands::Inventory { snapshot } => inventory(config_path, snapshot.as_deref()).await?,
        Commands::Host { name, snapshot } => host(config_path, &name, snapshot.as_deref()).await?,
        Commands::Query {
            query: text,
            variables,
            update_hostvars,
        } => query(config_path, &text, variables.as_deref(), update_hostvars).await?,
        Commands::Artifact { name, target_id } => {
            artifact(config_path, &name, &target_id).await?
        }
        Commands::Schema { kind } => schema(config_path, &kind).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Initialize logging system
///
/// Logs go to stderr; stdout carries the JSON document.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "infrahub_core={level},infrahub_client={level},{}={level}",
            env!("CARGO_PKG_NAME").replace('-', "_")
        ))
        .init();

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    Config::load(config_path).context("Failed to load configuration")
}

async fn inventory(config_path: Option<&Path>, snapshot: Option<&Path>) -> Result<Value> {
    let config = load_config(config_path)?;
    config.validate()?;

    let nodes = resolve_inventory(&config, snapshot).await?;
    info!("Rendering inventory with {} hosts", nodes.len());
    InventoryRenderer::from_config(&config).render(&nodes)
}

async fn host(config_path: Option<&Path>, name: &str, snapshot: Option<&Path>) -> Result<Value> {
    let config = load_config(config_path)?;
    config.validate()?;

    let nodes = resolve_inventory(&config, snapshot).await?;
    InventoryRenderer::from_config(&config).render_host(&nodes, name)
}

fn connect(config: &Config) -> Result<InfrahubClient> {
    config.server.validate()?;
    Ok(InfrahubClient::new(&config.server)?)
}

async fn query(
    config_path: Option<&Path>,
    text: &str,
    variables: Option<&str>,
    update_hostvars: bool,
) -> Result<Value> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    let variables: Option<Value> = variables
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--variables must be a JSON object")?;
    let data = client.execute_graphql(text, variables.as_ref()).await?;

    if update_hostvars {
        Ok(json!({ "_meta": { "hostvars": hostvars_from_query(&data) } }))
    } else {
        Ok(data)
    }
}

async fn artifact(config_path: Option<&Path>, name: &str, target_id: &str) -> Result<Value> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    info!("Fetching artifact {name} for {target_id}");
    Ok(client.fetch_artifact(name, target_id).await?)
}

async fn schema(config_path: Option<&Path>, kind: &str) -> Result<Value> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;

    let schema = client.fetch_schema(&NodeKind::from(kind)).await?;
    Ok(schema_summary(&schema))
}
