//! Logo slot command

use super::{read_media_file, spinner, CropArgs, INFO, SUCCESS};
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use folio_media::media::LogoSlot;
use folio_media::pipeline::MediaPipeline;
use std::path::{Path, PathBuf};

/// Crop an image square, shrink it to thumbnail size and make it the logo
#[derive(Debug, Args)]
pub struct LogoCommand {
    /// JSON file holding the slot record (`{"url": ...}`); created if missing
    #[arg(short, long)]
    slot: PathBuf,

    /// Storage folder for the uploaded blob
    #[arg(short, long, default_value = "logos")]
    folder: String,

    /// Override the content type guessed from the file extension
    #[arg(long)]
    content_type: Option<String>,

    #[command(flatten)]
    crop: CropArgs,

    /// Image file
    file: PathBuf,
}

impl LogoCommand {
    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the slot file is unreadable or any pipeline stage
    /// fails. A failed cleanup of the previous logo is only logged.
    pub async fn execute(&self, pipeline: &MediaPipeline) -> Result<()> {
        let current = read_slot(&self.slot)?;
        let file = read_media_file(&self.file, self.content_type.as_deref())?;

        let spinner = spinner()?;
        spinner.set_message("Uploading logo...");
        let result = pipeline
            .upload_logo(current.as_ref(), file, &self.crop.to_request(), &self.folder)
            .await;
        spinner.finish_and_clear();
        let slot = result.context("Failed to replace logo")?;

        write_slot(&self.slot, &slot)?;

        println!("{} Logo updated: {}", SUCCESS, style(&slot.url).green());
        if let Some(previous) = current {
            println!("  {} Replaced {}", INFO, style(previous.url).dim());
        }
        Ok(())
    }
}

fn read_slot(path: &Path) -> Result<Option<LogoSlot>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let slot = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid logo slot in {}", path.display()))?;
    Ok(Some(slot))
}

fn write_slot(path: &Path, slot: &LogoSlot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(slot)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}
