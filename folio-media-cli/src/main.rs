//! folio-media CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{GalleryCommand, IngestCommand, LogoCommand};
use folio_media::config::MediaConfig;
use folio_media::observability::{self, LogFormat, ObservabilityConfig};
use folio_media::pipeline::MediaPipeline;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio-media")]
#[command(version)]
#[command(
    about = "Validate, crop, compress and publish images for the Folio CMS",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Service name used to locate configuration
    #[arg(long, global = true, default_value = "admin")]
    service: String,

    /// Log pipeline progress (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an image to a gallery and publish it
    Ingest(IngestCommand),
    /// Inspect and edit saved galleries
    Gallery {
        #[command(subcommand)]
        command: GalleryCommand,
    },
    /// Replace a logo slot
    Logo(LogoCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info,folio_media=debug",
        _ => "debug,folio_media=trace",
    };
    observability::init_with(
        &ObservabilityConfig::new("folio-media-cli")
            .with_format(LogFormat::Compact)
            .with_default_filter(filter),
    )?;

    let config = match &cli.config {
        Some(path) => MediaConfig::load_from(path)?,
        None => MediaConfig::load_for_service(&cli.service)?,
    };
    let pipeline = MediaPipeline::from_config(config)?;

    match cli.command {
        Commands::Ingest(command) => command.execute(&pipeline).await?,
        Commands::Gallery { command } => command.execute(&pipeline).await?,
        Commands::Logo(command) => command.execute(&pipeline).await?,
    }

    Ok(())
}
