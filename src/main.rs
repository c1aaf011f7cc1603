pub mod types;
pub mod config;
pub mod data;
pub mod processing;
pub mod severity;
pub mod popup;
pub mod render;
pub mod html;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive distress map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Run one render pass and print the map view as JSON
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// One of: "All Distresses", "By Severity", "Distress Heatmap", "Distress Type Clustering"
        #[arg(short, long, default_value = "All Distresses")]
        layer: String,
        /// Severity value for the "By Severity" layer
        #[arg(short, long)]
        severity: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
        Commands::Render { config, layer, severity } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let mode: types::LayerMode = layer.parse()?;
            let selection = types::LayerSelection {
                mode,
                severity: severity.clone(),
            };

            let client = data::feed_client(&app_config.input)?;
            let loaded = data::load_records(&app_config, &client)
                .await
                .context("Failed to load distress records")?;

            let view = render::render_pass(&loaded.records, selection, &app_config.map, loaded.skipped);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}
