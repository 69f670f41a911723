//! Pixel formats, scanline providers and an owned bitmap.

use crate::pitch::pitch32;

/// The layout of a single scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One bit per pixel coverage mask, set bits are painted.
    Mask1,
    /// One bit per pixel, optionally mapped through a two-entry palette.
    Indexed1,
    /// One byte of coverage per pixel.
    Mask8,
    /// One byte per pixel, mapped through a palette, or gray without one.
    Indexed8,
    /// Three bytes per pixel, in blue, green, red order.
    Bgr24,
    /// Four bytes per pixel, in blue, green, red order with an unused fourth byte.
    Bgrx32,
    /// Four bytes per pixel, in blue, green, red, alpha order.
    Bgra32,
}

impl PixelFormat {
    /// The number of bits per pixel.
    pub fn bpp(self) -> u32 {
        match self {
            Self::Mask1 | Self::Indexed1 => 1,
            Self::Mask8 | Self::Indexed8 => 8,
            Self::Bgr24 => 24,
            Self::Bgrx32 | Self::Bgra32 => 32,
        }
    }

    /// Whether every pixel carries its own alpha value.
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Bgra32)
    }
}

/// A cooperative scheduler hook, polled by long-running operations.
pub trait PauseIndicator {
    /// Return `true` if the current operation should yield.
    fn need_to_pause_now(&mut self) -> bool;
}

/// Reborrow an optional pause indicator so it can be handed to several
/// operations in turn.
pub fn reborrow<'a>(
    pause: &'a mut Option<&mut dyn PauseIndicator>,
) -> Option<&'a mut dyn PauseIndicator> {
    match pause {
        Some(pause) => {
            let pause: &'a mut dyn PauseIndicator = &mut **pause;
            Some(pause)
        }
        None => None,
    }
}

/// Something that produces scanlines in one of the canonical pixel formats.
pub trait PixelSource {
    /// The width in pixels.
    fn width(&self) -> u32;

    /// The height in pixels.
    fn height(&self) -> u32;

    /// The layout of the scanlines returned by [`PixelSource::scanline`].
    fn format(&self) -> PixelFormat;

    /// The ARGB palette for indexed formats, if any.
    fn palette(&self) -> Option<&[u32]>;

    /// Return the scanline at row `line`.
    ///
    /// Rows that cannot be produced come back zero-filled.
    fn scanline(&mut self, line: u32) -> &[u8];

    /// Prepare the rows up to `line`, returning `true` if the caller should
    /// yield and try again later.
    fn skip_to_scanline(&mut self, _line: u32, _pause: Option<&mut dyn PauseIndicator>) -> bool {
        false
    }
}

/// A pixel buffer with a four-byte aligned pitch.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    format: PixelFormat,
    pitch: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Allocate a zeroed bitmap.
    ///
    /// Returns `None` for empty dimensions or if the buffer size overflows.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let pitch = pitch32(format.bpp(), width)?;
        let size = (pitch as usize).checked_mul(height as usize)?;

        Some(Self {
            width,
            height,
            format,
            pitch,
            data: vec![0; size],
        })
    }

    /// The number of bytes between two rows.
    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    /// Fill every byte of the buffer with `value`.
    pub fn clear(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// The row at `line`, or `None` if it is out of bounds.
    pub fn row(&self, line: u32) -> Option<&[u8]> {
        let start = line as usize * self.pitch as usize;
        self.data.get(start..start + self.pitch as usize)
    }

    /// The mutable row at `line`, or `None` if it is out of bounds.
    pub fn row_mut(&mut self, line: u32) -> Option<&mut [u8]> {
        let start = line as usize * self.pitch as usize;
        self.data.get_mut(start..start + self.pitch as usize)
    }

    /// The whole buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The whole buffer, mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl PixelSource for Bitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn palette(&self) -> Option<&[u32]> {
        None
    }

    fn scanline(&mut self, line: u32) -> &[u8] {
        let line = line.min(self.height - 1);
        let start = line as usize * self.pitch as usize;
        &self.data[start..start + self.pitch as usize]
    }
}
