//! Gallery management commands

use super::{INFO, SUCCESS};
use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use console::style;
use folio_media::collection::CollectionState;
use folio_media::pipeline::MediaPipeline;
use folio_media::reorder::{KeyStep, MoveGesture, ReorderController};

/// Keyboard-style reorder steps
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Step {
    /// One place towards the start
    Up,
    /// One place towards the end
    Down,
    /// To the start
    First,
    /// To the end
    Last,
}

impl From<Step> for KeyStep {
    fn from(step: Step) -> Self {
        match step {
            Step::Up => Self::Up,
            Step::Down => Self::Down,
            Step::First => Self::First,
            Step::Last => Self::Last,
        }
    }
}

/// Gallery management commands
#[derive(Debug, Subcommand)]
pub enum GalleryCommand {
    /// List the images of a gallery in display order
    List {
        /// Gallery key
        gallery: String,

        /// Print the stored JSON records instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Move an image and save the new order
    Move {
        /// Gallery key
        gallery: String,

        /// Current position of the image
        from: usize,

        /// Target position
        #[arg(required_unless_present = "step", conflicts_with = "step")]
        to: Option<usize>,

        /// Move by a step instead of to a position
        #[arg(long, value_enum)]
        step: Option<Step>,
    },

    /// Remove an image and save the new order
    ///
    /// The blob itself stays in storage.
    Remove {
        /// Gallery key
        gallery: String,

        /// Position of the image
        index: usize,
    },
}

impl GalleryCommand {
    /// Execute the gallery command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The gallery cannot be loaded or saved
    /// - An index is out of range
    pub async fn execute(&self, pipeline: &MediaPipeline) -> Result<()> {
        match self {
            Self::List { gallery, json } => list(pipeline, gallery, *json).await,
            Self::Move { gallery, from, to, step } => {
                let gesture = match (to, step) {
                    (_, Some(step)) => MoveGesture::Keyboard {
                        index: *from,
                        step: (*step).into(),
                    },
                    (Some(to), None) => MoveGesture::Pointer {
                        from: *from,
                        drop_index: *to,
                    },
                    (None, None) => anyhow::bail!("Either a target position or --step is required"),
                };
                move_asset(pipeline, gallery, gesture).await
            }
            Self::Remove { gallery, index } => remove(pipeline, gallery, *index).await,
        }
    }
}

async fn load(pipeline: &MediaPipeline, key: &str) -> Result<CollectionState> {
    pipeline
        .load_gallery(key)
        .await
        .with_context(|| format!("Failed to load gallery {key}"))
}

async fn list(pipeline: &MediaPipeline, key: &str, json: bool) -> Result<()> {
    let gallery = load(pipeline, key).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&gallery.records()?)?);
        return Ok(());
    }

    println!("\n{} Gallery {}", INFO, style(key).cyan().bold());
    println!("{}", "─".repeat(80));
    println!("{:<6} {:<10} {:<40} {}", "Order", "Category", "URL", "Caption");
    println!("{}", "─".repeat(80));
    if gallery.is_empty() {
        println!("  {}", style("(No images)").dim());
    }
    for asset in gallery.assets() {
        println!(
            "{:<6} {:<10} {:<40} {}",
            asset.display_order,
            asset.category,
            asset.origin.url().unwrap_or_default(),
            asset.caption.as_deref().unwrap_or_default()
        );
    }
    println!();

    Ok(())
}

async fn move_asset(pipeline: &MediaPipeline, key: &str, gesture: MoveGesture) -> Result<()> {
    let mut gallery = load(pipeline, key).await?;

    let Some(moved) = ReorderController::new().apply(gesture, &mut gallery)? else {
        println!("{} Nothing to move", INFO);
        return Ok(());
    };
    pipeline.save_gallery(&mut gallery, key).await?;

    println!(
        "{} Moved image {} to {} in {}",
        SUCCESS,
        style(moved.from).yellow(),
        style(moved.to).green(),
        style(key).cyan()
    );
    Ok(())
}

async fn remove(pipeline: &MediaPipeline, key: &str, index: usize) -> Result<()> {
    let mut gallery = load(pipeline, key).await?;

    let removed = gallery.remove_at(index)?;
    pipeline.save_gallery(&mut gallery, key).await?;

    println!(
        "{} Removed {} from {} ({} left)",
        SUCCESS,
        style(removed.origin.url().unwrap_or_default()).yellow(),
        style(key).cyan(),
        gallery.len()
    );
    Ok(())
}
