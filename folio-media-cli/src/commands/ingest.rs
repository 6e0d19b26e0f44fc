//! Gallery ingest command

use super::{read_media_file, spinner, CropArgs, INFO, SUCCESS};
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use folio_media::pipeline::MediaPipeline;
use std::path::PathBuf;

/// Validate, crop, compress, upload and append images to a gallery
#[derive(Debug, Args)]
pub struct IngestCommand {
    /// Gallery key, e.g. `products/acme/screenshots`
    #[arg(short, long)]
    gallery: String,

    /// Storage folder for the uploaded blobs (defaults to the gallery key)
    #[arg(short, long)]
    folder: Option<String>,

    /// Category tag for the new assets
    #[arg(long)]
    category: Option<String>,

    /// Caption for the new assets
    #[arg(long)]
    caption: Option<String>,

    /// Override the content type guessed from the file extension
    #[arg(long)]
    content_type: Option<String>,

    #[command(flatten)]
    crop: CropArgs,

    /// Image files, appended in the order given
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl IngestCommand {
    /// Execute the command
    ///
    /// Every file is prepared before anything is uploaded, so one bad file
    /// leaves the gallery untouched.
    ///
    /// # Errors
    ///
    /// Returns the first failing pipeline stage.
    pub async fn execute(&self, pipeline: &MediaPipeline) -> Result<()> {
        let folder = self.folder.as_deref().unwrap_or(&self.gallery);
        let request = self.crop.to_request();

        let mut gallery = pipeline
            .load_gallery(&self.gallery)
            .await
            .with_context(|| format!("Failed to load gallery {}", self.gallery))?;
        let existing = gallery.len();

        let spinner = spinner()?;
        for path in &self.files {
            spinner.set_message(format!("Preparing {}...", path.display()));
            let file = read_media_file(path, self.content_type.as_deref())?;
            pipeline
                .ingest(
                    &mut gallery,
                    file,
                    &request,
                    self.category.as_deref(),
                    self.caption.clone(),
                )
                .await
                .with_context(|| format!("Failed to prepare {}", path.display()))?;
        }

        spinner.set_message(format!("Uploading {} image(s)...", self.files.len()));
        let result = pipeline.publish(&mut gallery, folder, &self.gallery).await;
        spinner.finish_and_clear();
        result.context("Failed to publish gallery")?;

        println!(
            "{} {} image(s) added to {}",
            SUCCESS,
            style(gallery.len() - existing).green().bold(),
            style(&self.gallery).cyan()
        );
        for asset in &gallery.assets()[existing..] {
            println!("  {} {}", INFO, asset.origin.url().unwrap_or_default());
        }

        Ok(())
    }
}
