//! Crop geometry in natural-pixel coordinates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest zoom factor (whole image width or height selectable)
pub const MIN_ZOOM: f64 = 1.0;

/// Largest zoom factor
pub const MAX_ZOOM: f64 = 3.0;

/// Pixel size of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Creates a size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Width-to-height ratio the crop rectangle is locked to
///
/// Serialized as `"W:H"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// Creates a ratio, returning `None` if either side is zero
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self { width, height })
        }
    }

    /// 1:1, used for logos
    #[must_use]
    pub const fn square() -> Self {
        Self { width: 1, height: 1 }
    }

    /// 16:9, used for portfolio covers and screenshots
    #[must_use]
    pub const fn landscape() -> Self {
        Self { width: 16, height: 9 }
    }

    /// 4:3
    #[must_use]
    pub const fn classic() -> Self {
        Self { width: 4, height: 3 }
    }

    /// Ratio as a float (width / height)
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Largest rectangle of this ratio that fits inside `bounds`
    #[must_use]
    pub fn fit_within(self, bounds: Dimensions) -> Dimensions {
        let ratio = self.value();
        let (bw, bh) = (f64::from(bounds.width), f64::from(bounds.height));

        let (w, h) = if bw / bh > ratio {
            (bh * ratio, bh)
        } else {
            (bw, bw / ratio)
        };

        Dimensions::new(
            (w.round() as u32).clamp(1, bounds.width.max(1)),
            (h.round() as u32).clamp(1, bounds.height.max(1)),
        )
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    /// Parses `"16:9"`, `"1:1"`, or the names `square`, `landscape`, `classic`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" => return Ok(Self::square()),
            "landscape" => return Ok(Self::landscape()),
            "classic" => return Ok(Self::classic()),
            _ => {}
        }

        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| format!("expected W:H, got {s:?}"))?;
        let w = w.trim().parse::<u32>().map_err(|e| format!("bad width in {s:?}: {e}"))?;
        let h = h.trim().parse::<u32>().map_err(|e| format!("bad height in {s:?}: {e}"))?;
        Self::new(w, h).ok_or_else(|| format!("aspect ratio sides must be non-zero: {s:?}"))
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

/// Rectangle in natural-pixel coordinates of the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl CropRect {
    /// Creates a rectangle
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Center point
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Size of the rectangle
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// A `size` rectangle centered on `center`, shifted to stay inside `bounds`
    #[must_use]
    pub fn centered_on(center: (f64, f64), size: Dimensions, bounds: Dimensions) -> Self {
        let width = size.width.clamp(1, bounds.width.max(1));
        let height = size.height.clamp(1, bounds.height.max(1));

        let x = place(center.0, width, bounds.width);
        let y = place(center.1, height, bounds.height);
        Self::new(x, y, width, height)
    }

    /// This rectangle shrunk and shifted until it lies inside `bounds`
    #[must_use]
    pub fn clamped_to(self, bounds: Dimensions) -> Self {
        let width = self.width.clamp(1, bounds.width.max(1));
        let height = self.height.clamp(1, bounds.height.max(1));
        Self::new(
            self.x.min(bounds.width.saturating_sub(width)),
            self.y.min(bounds.height.saturating_sub(height)),
            width,
            height,
        )
    }

    /// Whether the rectangle lies fully inside `bounds`
    #[must_use]
    pub fn fits_in(&self, bounds: Dimensions) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(bounds.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(bounds.height)
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl FromStr for CropRect {
    type Err = String;

    /// Parses `x,y,width,height`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("bad crop rectangle {s:?}: {e}"))?;
        match parts.as_slice() {
            [x, y, w, h] if *w > 0 && *h > 0 => Ok(Self::new(*x, *y, *w, *h)),
            _ => Err(format!("expected x,y,width,height with non-zero size, got {s:?}")),
        }
    }
}

/// Left/top coordinate for a span of `len` centered on `center` within `0..limit`
fn place(center: f64, len: u32, limit: u32) -> u32 {
    let max_start = f64::from(limit.saturating_sub(len));
    (center - f64::from(len) / 2.0).round().clamp(0.0, max_start) as u32
}

/// Crop rectangle size for `zoom`, derived from the zoom-1 rectangle
#[must_use]
pub fn size_at_zoom(base: Dimensions, zoom: f64) -> Dimensions {
    let zoom = clamp_zoom(zoom);
    Dimensions::new(
        ((f64::from(base.width) / zoom).round() as u32).max(1),
        ((f64::from(base.height) / zoom).round() as u32).max(1),
    )
}

/// Clamps a zoom factor to `[MIN_ZOOM, MAX_ZOOM]`; NaN maps to `MIN_ZOOM`
#[must_use]
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        MIN_ZOOM
    } else {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_wide_image() {
        let fit = AspectRatio::square().fit_within(Dimensions::new(400, 300));
        assert_eq!(fit, Dimensions::new(300, 300));
    }

    #[test]
    fn test_fit_tall_image() {
        let fit = AspectRatio::landscape().fit_within(Dimensions::new(1600, 2000));
        assert_eq!(fit, Dimensions::new(1600, 900));
    }

    #[test]
    fn test_fit_exact() {
        let fit = AspectRatio::landscape().fit_within(Dimensions::new(1920, 1080));
        assert_eq!(fit, Dimensions::new(1920, 1080));
    }

    #[test]
    fn test_parse_aspect() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::landscape());
        assert_eq!("Square".parse::<AspectRatio>().unwrap(), AspectRatio::square());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert!("wide".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_aspect_serde_as_string() {
        let json = serde_json::to_string(&AspectRatio::landscape()).unwrap();
        assert_eq!(json, "\"16:9\"");
        let parsed: AspectRatio = serde_json::from_str("\"square\"").unwrap();
        assert_eq!(parsed, AspectRatio::square());
    }

    #[test]
    fn test_parse_rect() {
        assert_eq!(
            "10, 20, 300, 200".parse::<CropRect>().unwrap(),
            CropRect::new(10, 20, 300, 200)
        );
        assert!("1,2,3".parse::<CropRect>().is_err());
        assert!("0,0,0,10".parse::<CropRect>().is_err());
    }

    #[test]
    fn test_centered_on_clamps_to_edges() {
        let bounds = Dimensions::new(100, 100);
        let rect = CropRect::centered_on((5.0, 95.0), Dimensions::new(40, 40), bounds);
        assert_eq!(rect, CropRect::new(0, 60, 40, 40));
        assert!(rect.fits_in(bounds));
    }

    #[test]
    fn test_clamped_to_shrinks_oversized() {
        let rect = CropRect::new(50, 50, 500, 20).clamped_to(Dimensions::new(200, 100));
        assert_eq!(rect, CropRect::new(0, 50, 200, 20));
    }

    #[test]
    fn test_size_at_zoom() {
        let base = Dimensions::new(300, 300);
        assert_eq!(size_at_zoom(base, 1.0), base);
        assert_eq!(size_at_zoom(base, 2.0), Dimensions::new(150, 150));
        assert_eq!(size_at_zoom(base, 10.0), Dimensions::new(100, 100));
        assert_eq!(size_at_zoom(base, 0.2), base);
    }

    #[test]
    fn test_clamp_zoom_nan() {
        assert!((clamp_zoom(f64::NAN) - MIN_ZOOM).abs() < f64::EPSILON);
    }
}
