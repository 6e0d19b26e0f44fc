//! CLI command implementations

mod gallery;
mod ingest;
mod logo;

pub use gallery::GalleryCommand;
pub use ingest::IngestCommand;
pub use logo::LogoCommand;

use anyhow::{Context, Result};
use clap::Args;
use console::Emoji;
use folio_media::crop::CropRect;
use folio_media::media::MediaFile;
use folio_media::pipeline::CropRequest;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

static SUCCESS: Emoji = Emoji("✓", "√");
static INFO: Emoji = Emoji("ℹ", "i");

/// Crop adjustments shared by `ingest` and `logo`
#[derive(Debug, Clone, Default, Args)]
pub struct CropArgs {
    /// Zoom factor between 1 and 3
    #[arg(long)]
    zoom: Option<f64>,

    /// Pan after zooming, in source pixels: `dx,dy`
    #[arg(long, value_parser = parse_pan, allow_hyphen_values = true)]
    pan: Option<(f64, f64)>,

    /// Explicit crop rectangle `x,y,width,height`, snapped to the slot's aspect;
    /// overrides zoom and pan
    #[arg(long, conflicts_with_all = ["zoom", "pan"])]
    rect: Option<CropRect>,
}

impl CropArgs {
    const fn to_request(&self) -> CropRequest {
        CropRequest {
            zoom: self.zoom,
            pan: self.pan,
            rect: self.rect,
        }
    }
}

fn parse_pan(raw: &str) -> Result<(f64, f64), String> {
    let (dx, dy) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected dx,dy, got {raw:?}"))?;
    let dx = dx.trim().parse::<f64>().map_err(|e| format!("bad dx: {e}"))?;
    let dy = dy.trim().parse::<f64>().map_err(|e| format!("bad dy: {e}"))?;
    Ok((dx, dy))
}

/// Reads a file from disk the way a browser file picker hands it over
fn read_media_file(path: &Path, content_type: Option<&str>) -> Result<MediaFile> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().to_string());
    let content_type = content_type.map_or_else(|| content_type_for(path), str::to_string);
    Ok(MediaFile::new(filename, content_type, data))
}

/// Declared content type from a file extension
fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

fn spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Failed to set progress style")?,
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(spinner)
}
