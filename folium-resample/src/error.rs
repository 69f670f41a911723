//! Error types for resampling.

use core::fmt;
use folium_common::raster::PixelFormat;

/// The error type for setting up a [`StretchEngine`](crate::StretchEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchError {
    /// The source, the destination or the clip rectangle is empty.
    EmptySize,
    /// Scanlines of the source format can't be written in the destination
    /// format.
    UnsupportedFormat {
        /// The format of the source scanlines.
        source: PixelFormat,
        /// The requested destination format.
        dest: PixelFormat,
    },
    /// Arithmetic overflow in size calculations.
    Overflow,
}

impl fmt::Display for StretchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySize => write!(f, "empty source or destination"),
            Self::UnsupportedFormat { source, dest } => {
                write!(f, "cannot resample {source:?} into {dest:?}")
            }
            Self::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl core::error::Error for StretchError {}

/// Result type for resampling operations.
pub type Result<T> = core::result::Result<T, StretchError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err)
    };
}

pub(crate) use bail;
