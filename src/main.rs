use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use search_broker::client::EngineClient;
use search_broker::config::Config;
use search_broker::error::AppError;
use search_broker::index::{load_stream, reindex, Index, IndexGroup};
use search_broker::registry::Registries;
use search_broker::schema::FieldDefinitions;
use search_broker::search::Searcher;

#[derive(Parser)]
#[command(name = "search-broker")]
#[command(about = "Index management and query middleware for the search engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh index for a group, repopulate it from the live one
    /// and switch the alias over
    Migrate {
        #[arg(value_name = "GROUP")]
        group: String,
    },

    /// Point a group's alias at an existing concrete index
    Switch {
        #[arg(value_name = "GROUP")]
        group: String,

        #[arg(value_name = "INDEX")]
        index: String,
    },

    /// Delete every unaliased index in a group
    Clean {
        #[arg(value_name = "GROUP")]
        group: String,
    },

    /// Delete unaliased indices in a group older than the retention limit
    TimedClean {
        #[arg(value_name = "GROUP")]
        group: String,
    },

    /// Lock an index against writes
    Lock {
        #[arg(value_name = "INDEX")]
        index: String,
    },

    /// Remove an index's write lock
    Unlock {
        #[arg(value_name = "INDEX")]
        index: String,
    },

    /// Create a fresh index for a group, fill it from an NDJSON bulk file
    /// and switch the alias over
    Load {
        #[arg(value_name = "GROUP")]
        group: String,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run a search and print the response body
    Search {
        /// key=value pairs, e.g. q=cheese count=5 filter_format=guide
        #[arg(value_name = "PARAM")]
        params: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli.command, &config).await {
        error!(code = e.error_code(), error = %e, "command failed");
        return Err(e.into());
    }
    Ok(())
}

async fn run(command: Commands, config: &Config) -> Result<(), AppError> {
    match command {
        Commands::Migrate { group } => {
            let group = group_for(config, &group)?;
            let applied = reindex(&group, &config.population).await?;
            info!(group = group.name(), applied, "migration complete");
        }
        Commands::Switch { group, index } => {
            let group = group_for(config, &group)?;
            let target = group.index_for_name(&index);
            group.switch_to(&target).await?;
            info!(group = group.name(), index = %index, "alias switched");
        }
        Commands::Clean { group } => {
            let group = group_for(config, &group)?;
            group.clean().await?;
        }
        Commands::TimedClean { group } => {
            let group = group_for(config, &group)?;
            group.timed_clean(config.retention.day_limit).await?;
        }
        Commands::Lock { index } => {
            index_for(config, &index)?.lock().await?;
            info!(index = %index, "locked");
        }
        Commands::Unlock { index } => {
            index_for(config, &index)?.unlock().await?;
            info!(index = %index, "unlocked");
        }
        Commands::Load { group, file } => {
            let group = group_for(config, &group)?;
            let reader = BufReader::new(File::open(&file).await?);
            let applied = load_stream(&group, reader, &config.population).await?;
            info!(group = group.name(), applied, "load complete");
        }
        Commands::Search { params } => {
            let searcher = searcher_for(config)?;
            let pairs = parse_pairs(&params);
            let body = searcher.run_raw(&pairs).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}

fn group_for(config: &Config, name: &str) -> Result<IndexGroup, AppError> {
    Ok(IndexGroup::new(
        EngineClient::new(&config.engine)?,
        EngineClient::admin(&config.engine)?,
        name,
        definitions_for(config, name),
        config.scroll,
    )?)
}

fn index_for(config: &Config, name: &str) -> Result<Index, AppError> {
    Ok(Index::new(
        EngineClient::new(&config.engine)?,
        name,
        definitions_for(config, name),
        config.scroll,
    ))
}

fn definitions_for(config: &Config, name: &str) -> FieldDefinitions {
    if name.starts_with(&config.indexes.metasearch) {
        FieldDefinitions::metasearch()
    } else {
        FieldDefinitions::core()
    }
}

fn searcher_for(config: &Config) -> Result<Searcher, AppError> {
    let registries = Registries::standard(
        index_for(config, &config.indexes.registry)?,
        &config.registry,
    );
    Ok(Searcher::new(
        index_for(config, &config.indexes.content)?,
        index_for(config, &config.indexes.metasearch)?,
        registries,
    ))
}

/// Query-string style pairs; a bare key is an empty value
fn parse_pairs(params: &[String]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|raw| match raw.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (raw.clone(), String::new()),
        })
        .collect()
}
