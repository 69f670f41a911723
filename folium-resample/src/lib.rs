/*!
Separable resampling of scanline sources.

`folium-resample` scales any [`PixelSource`] to a new size in two passes: every
source row is first scaled horizontally into an intermediate buffer, then the
intermediate rows are combined vertically and handed to a [`ScanlineSink`].
Each axis uses a [`WeightTable`](weights::WeightTable) of 16.16 fixed-point
weights. Downscaled axes are box filtered, upscaled axes use nearest neighbor
or bilinear interpolation.

The horizontal pass polls a
[`PauseIndicator`](folium_common::raster::PauseIndicator) every few rows so
long operations can yield to a cooperative scheduler.

# Example
```rust
use folium_common::raster::{Bitmap, PixelFormat};
use folium_resample::{ResampleOptions, stretch};

let mut source = Bitmap::new(4, 4, PixelFormat::Mask8).unwrap();
source.clear(200);

let scaled = stretch(&mut source, PixelFormat::Mask8, 2, 2, ResampleOptions::empty()).unwrap();
assert_eq!(scaled.row(0).unwrap()[..2], [200, 200]);
```

# Cargo features
- `logging` (default): diagnostics via the `log` crate.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod engine;
mod error;
mod log;
mod sink;
pub mod weights;

pub use engine::{StretchEngine, StretchStatus, TransformMethod};
pub use error::{Result, StretchError};
pub use sink::ScanlineSink;

use bitflags::bitflags;
use folium_common::raster::{Bitmap, PixelFormat, PixelSource};

bitflags! {
    /// Flags controlling the filter a [`StretchEngine`] picks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResampleOptions: u32 {
        /// Always take the nearest source pixel.
        const NO_SMOOTH = 1 << 0;
        /// Interpolate bilinearly on upscaled axes.
        const BILINEAR = 1 << 1;
    }
}

/// A rectangle in pixel coordinates, `right` and `bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipRect {
    /// The first column.
    pub left: i32,
    /// The first row.
    pub top: i32,
    /// The column after the last one.
    pub right: i32,
    /// The row after the last one.
    pub bottom: i32,
}

impl ClipRect {
    /// Create a new rectangle.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The rectangle at the origin with the given size.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// The width, zero for inverted rectangles.
    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    /// The height, zero for inverted rectangles.
    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Whether the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// The overlap of both rectangles.
    pub fn intersect(&self, other: &Self) -> Self {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);

        Self::new(
            left,
            top,
            self.right.min(other.right).max(left),
            self.bottom.min(other.bottom).max(top),
        )
    }
}

/// Scale `source` into a new bitmap of `|dest_width|` x `|dest_height|`
/// pixels, mirroring the axes with a negative size.
pub fn stretch(
    source: &mut dyn PixelSource,
    dest_format: PixelFormat,
    dest_width: i32,
    dest_height: i32,
    options: ResampleOptions,
) -> Result<Bitmap> {
    if dest_width == 0 || dest_height == 0 {
        return Err(StretchError::EmptySize);
    }

    let mut bitmap = Bitmap::new(
        dest_width.unsigned_abs(),
        dest_height.unsigned_abs(),
        dest_format,
    )
    .ok_or(StretchError::Overflow)?;

    let clip = ClipRect::from_size(dest_width.saturating_abs(), dest_height.saturating_abs());

    {
        let mut engine = StretchEngine::new(
            &mut bitmap,
            dest_format,
            dest_width,
            dest_height,
            clip,
            source,
            options,
        )?;

        if !engine.start_stretch_horz() {
            return Err(StretchError::Overflow);
        }

        while engine.continue_stretch(None) == StretchStatus::NeedsMoreTime {}
    }

    Ok(bitmap)
}
