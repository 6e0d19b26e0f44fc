//! Interactive crop session
//!
//! A [`CropSession`] walks `Idle → Active → {Committed | Cancelled}`:
//!
//! - [`CropSession::begin`] takes a validated file, decodes it, and starts
//!   with the largest centered rectangle of the target aspect ratio.
//! - [`CropSession::pan`], [`CropSession::drag`], [`CropSession::set_zoom`]
//!   and [`CropSession::select`] move and size the rectangle.
//! - [`CropSession::commit`] rasterizes exactly the rectangle at 1:1 and
//!   encodes it as JPEG.
//! - [`CropSession::cancel`] throws the selection away.
//!
//! Zoom changes what part of the image is selectable, never the output
//! resolution: the committed image is always `crop_rect.width × crop_rect.height`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use folio_media::crop::{AspectRatio, CropSession};
//! use folio_media::media::MediaFile;
//! use folio_media::validation::Validator;
//!
//! # fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let file = Validator::default().admit(MediaFile::new("cover.png", "image/png", bytes))?;
//!
//! let mut session = CropSession::new(AspectRatio::landscape());
//! session.begin(file)?;
//! session.set_zoom(1.5)?;
//! session.pan(40.0, 0.0)?;
//!
//! let cropped = session.commit()?;
//! assert_eq!(cropped.content_type, "image/jpeg");
//! # Ok(())
//! # }
//! ```

mod geometry;

pub use geometry::{clamp_zoom, size_at_zoom, AspectRatio, CropRect, Dimensions, MAX_ZOOM, MIN_ZOOM};

use crate::media::MediaBlob;
use crate::validation::ValidatedFile;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Default JPEG quality for committed crops
pub const DEFAULT_OUTPUT_QUALITY: u8 = 92;

/// Crop failures; the session is back in `Idle` after any of them
#[derive(Debug, Error)]
pub enum CropError {
    /// The source could not be decoded as an image
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    /// Drawing or encoding the cropped region failed
    #[error("Failed to rasterize crop: {0}")]
    Raster(String),

    /// The operation needs an active session
    #[error("No active crop session")]
    NotActive,

    /// `begin` was called while a session is already active
    #[error("A crop session is already active")]
    AlreadyActive,
}

/// Observable phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropPhase {
    /// Waiting for a file
    Idle,
    /// A file is loaded and the rectangle can be adjusted
    Active,
    /// The selection was rasterized and handed off
    Committed,
    /// The selection was discarded
    Cancelled,
}

/// Parameters of an active crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSpec {
    /// Selected region in natural pixels
    pub crop_rect: CropRect,
    /// Zoom factor in `[1, 3]`
    pub zoom: f64,
    /// Source image size
    pub natural: Dimensions,
    /// Ratio the rectangle is locked to
    pub target_aspect: AspectRatio,
}

impl CropSpec {
    fn new(natural: Dimensions, target_aspect: AspectRatio) -> Self {
        let base = target_aspect.fit_within(natural);
        let center = (f64::from(natural.width) / 2.0, f64::from(natural.height) / 2.0);
        Self {
            crop_rect: CropRect::centered_on(center, base, natural),
            zoom: MIN_ZOOM,
            natural,
            target_aspect,
        }
    }

    /// Rectangle size at zoom 1
    #[must_use]
    pub fn base_size(&self) -> Dimensions {
        self.target_aspect.fit_within(self.natural)
    }

    fn rezoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
        let size = size_at_zoom(self.base_size(), self.zoom);
        self.crop_rect = CropRect::centered_on(self.crop_rect.center(), size, self.natural);
    }

    fn select(&mut self, rect: CropRect) {
        let clamped = rect.clamped_to(self.natural);
        let size = self.target_aspect.fit_within(clamped.dimensions());
        self.crop_rect = CropRect::centered_on(clamped.center(), size, self.natural);
    }

    fn pan(&mut self, dx: f64, dy: f64) {
        let (cx, cy) = self.crop_rect.center();
        self.crop_rect =
            CropRect::centered_on((cx + dx, cy + dy), self.crop_rect.dimensions(), self.natural);
    }
}

struct ActiveCrop {
    source: DynamicImage,
    spec: CropSpec,
}

enum State {
    Idle,
    Active(Box<ActiveCrop>),
    Committed,
    Cancelled,
}

/// Crop state machine for one image slot
pub struct CropSession {
    target_aspect: AspectRatio,
    quality: u8,
    state: State,
}

impl CropSession {
    /// Creates an idle session locked to `target_aspect`
    #[must_use]
    pub const fn new(target_aspect: AspectRatio) -> Self {
        Self::with_quality(target_aspect, DEFAULT_OUTPUT_QUALITY)
    }

    /// Creates an idle session with an explicit JPEG output quality (1-100)
    #[must_use]
    pub const fn with_quality(target_aspect: AspectRatio, quality: u8) -> Self {
        let quality = if quality == 0 {
            1
        } else if quality > 100 {
            100
        } else {
            quality
        };
        Self {
            target_aspect,
            quality,
            state: State::Idle,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> CropPhase {
        match self.state {
            State::Idle => CropPhase::Idle,
            State::Active(_) => CropPhase::Active,
            State::Committed => CropPhase::Committed,
            State::Cancelled => CropPhase::Cancelled,
        }
    }

    /// The active crop parameters
    #[must_use]
    pub fn spec(&self) -> Option<&CropSpec> {
        match &self.state {
            State::Active(active) => Some(&active.spec),
            _ => None,
        }
    }

    /// Loads a validated file and enters `Active`
    ///
    /// Allowed from any phase except `Active`.
    ///
    /// # Errors
    ///
    /// - `CropError::AlreadyActive` if a crop is in progress
    /// - `CropError::Decode` if the bytes are not a decodable image; the
    ///   session is left `Idle`
    pub fn begin(&mut self, file: ValidatedFile) -> Result<&CropSpec, CropError> {
        if matches!(self.state, State::Active(_)) {
            return Err(CropError::AlreadyActive);
        }
        self.state = State::Idle;

        let file = file.into_inner();
        let source = ImageReader::new(Cursor::new(&file.data))
            .with_guessed_format()
            .map_err(|e| CropError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| CropError::Decode(e.to_string()))?;

        let natural = Dimensions::new(source.width(), source.height());
        if natural.width == 0 || natural.height == 0 {
            return Err(CropError::Decode("image has no pixels".to_string()));
        }

        let spec = CropSpec::new(natural, self.target_aspect);
        tracing::debug!(
            filename = %file.filename,
            width = natural.width,
            height = natural.height,
            rect = %spec.crop_rect,
            "Crop session started"
        );

        self.state = State::Active(Box::new(ActiveCrop { source, spec }));
        self.spec().ok_or(CropError::NotActive)
    }

    /// Sets the zoom factor, clamped to `[1, 3]`
    ///
    /// The rectangle is resized to the zoom-1 rectangle divided by the zoom,
    /// keeping its center where possible.
    ///
    /// # Errors
    ///
    /// Returns `CropError::NotActive` outside `Active`.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<&CropSpec, CropError> {
        let active = self.active_mut()?;
        active.spec.rezoom(zoom);
        Ok(&active.spec)
    }

    /// Moves the rectangle by a delta in natural pixels, stopping at the edges
    ///
    /// # Errors
    ///
    /// Returns `CropError::NotActive` outside `Active`.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<&CropSpec, CropError> {
        let active = self.active_mut()?;
        active.spec.pan(dx, dy);
        Ok(&active.spec)
    }

    /// Applies a pointer drag given in screen pixels
    ///
    /// `display_scale` is how many screen pixels one natural pixel occupies at
    /// zoom 1. Dragging the image right moves the selection left.
    ///
    /// # Errors
    ///
    /// Returns `CropError::NotActive` outside `Active`.
    pub fn drag(
        &mut self,
        dx_screen: f64,
        dy_screen: f64,
        display_scale: f64,
    ) -> Result<&CropSpec, CropError> {
        let active = self.active_mut()?;
        let scale = if display_scale.is_finite() && display_scale > 0.0 {
            display_scale * active.spec.zoom
        } else {
            active.spec.zoom
        };
        active.spec.pan(-dx_screen / scale, -dy_screen / scale);
        Ok(&active.spec)
    }

    /// Replaces the rectangle with an explicit selection
    ///
    /// The selection is clamped to the image, then shrunk to the largest
    /// rectangle of the target aspect that fits inside it, keeping its center.
    ///
    /// # Errors
    ///
    /// Returns `CropError::NotActive` outside `Active`.
    pub fn select(&mut self, rect: CropRect) -> Result<&CropSpec, CropError> {
        let active = self.active_mut()?;
        active.spec.select(rect);
        Ok(&active.spec)
    }

    /// Rasterizes the selection and enters `Committed`
    ///
    /// # Errors
    ///
    /// - `CropError::NotActive` outside `Active`
    /// - `CropError::Raster` if drawing or encoding fails; the session
    ///   returns to `Idle`
    pub fn commit(&mut self) -> Result<MediaBlob, CropError> {
        if !matches!(self.state, State::Active(_)) {
            return Err(CropError::NotActive);
        }
        let State::Active(active) = std::mem::replace(&mut self.state, State::Idle) else {
            return Err(CropError::NotActive);
        };

        let blob = rasterize(&active.source, active.spec.crop_rect, self.quality)?;
        tracing::info!(
            rect = %active.spec.crop_rect,
            zoom = active.spec.zoom,
            bytes = blob.size(),
            "Crop committed"
        );

        self.state = State::Committed;
        Ok(blob)
    }

    /// Discards the selection and enters `Cancelled`
    ///
    /// # Errors
    ///
    /// Returns `CropError::NotActive` outside `Active`.
    pub fn cancel(&mut self) -> Result<(), CropError> {
        if !matches!(self.state, State::Active(_)) {
            return Err(CropError::NotActive);
        }
        self.state = State::Cancelled;
        tracing::debug!("Crop cancelled");
        Ok(())
    }

    fn active_mut(&mut self) -> Result<&mut ActiveCrop, CropError> {
        match &mut self.state {
            State::Active(active) => Ok(active),
            _ => Err(CropError::NotActive),
        }
    }
}

/// Draws `rect` of `source` onto an opaque surface at 1:1 and encodes it
fn rasterize(source: &DynamicImage, rect: CropRect, quality: u8) -> Result<MediaBlob, CropError> {
    let natural = Dimensions::new(source.width(), source.height());
    if !rect.fits_in(natural) {
        return Err(CropError::Raster(format!(
            "rectangle {rect} outside {}x{} source",
            natural.width, natural.height
        )));
    }

    let region = source
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .to_rgba8();

    // JPEG has no alpha channel: composite transparent areas onto white
    let mut surface = RgbImage::new(rect.width, rect.height);
    for (x, y, pixel) in region.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        surface.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, quality)
        .encode_image(&surface)
        .map_err(|e| CropError::Raster(e.to_string()))?;

    Ok(MediaBlob::new(mime::IMAGE_JPEG.to_string(), data))
}
