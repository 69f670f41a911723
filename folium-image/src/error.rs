//! Error types for image loading.

use crate::object::ImageFilter;
use core::fmt;

/// The main error type for image loading operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Errors related to the image dictionary.
    Image(ImageError),
    /// Errors related to colorspace resolution.
    Color(ColorError),
    /// Errors related to setting up a decoder.
    Decoder(DecoderError),
    /// Errors reported while decoding.
    Codec(CodecError),
    /// Arithmetic overflow in size calculations.
    Overflow,
    /// Feature not supported.
    Unsupported,
}

/// Errors related to the image dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    /// Width or height is missing or outside the supported range.
    InvalidDimensions,
    /// The bits per component value is not allowed.
    InvalidBitDepth,
    /// The component count does not fit the colorspace.
    InvalidComponents,
    /// The stream contains no data.
    EmptyData,
}

/// Errors related to colorspace resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorError {
    /// The colorspace object could not be resolved.
    Unresolved,
    /// The colorspace of an embedded JPEG 2000 image does not match the
    /// declared one.
    JpxMismatch,
}

/// Errors related to setting up a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderError {
    /// The decoder for the given filter could not be created.
    Construction(ImageFilter),
    /// No decoder is available for the given filter.
    Unavailable(ImageFilter),
    /// The decoder produces rows shorter than the image requires.
    PitchMismatch,
}

/// Errors reported while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The encoded data ended early.
    Truncated,
    /// The encoded data is invalid.
    Corrupt,
    /// The JBIG2 decoder reported a failure.
    Jbig2,
    /// The decoded JPEG 2000 image is unusable.
    Jpx,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(e) => write!(f, "{e}"),
            Self::Color(e) => write!(f, "{e}"),
            Self::Decoder(e) => write!(f, "{e}"),
            Self::Codec(e) => write!(f, "{e}"),
            Self::Overflow => write!(f, "arithmetic overflow"),
            Self::Unsupported => write!(f, "unsupported feature"),
        }
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimensions => write!(f, "invalid image dimensions"),
            Self::InvalidBitDepth => write!(f, "invalid bits per component"),
            Self::InvalidComponents => write!(f, "component count does not fit colorspace"),
            Self::EmptyData => write!(f, "image stream is empty"),
        }
    }
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "failed to resolve colorspace"),
            Self::JpxMismatch => write!(f, "JPEG 2000 colorspace does not match image colorspace"),
        }
    }
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction(filter) => write!(f, "failed to create {filter:?} decoder"),
            Self::Unavailable(filter) => write!(f, "no {filter:?} decoder available"),
            Self::PitchMismatch => write!(f, "decoder rows are shorter than image rows"),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "unexpected end of encoded data"),
            Self::Corrupt => write!(f, "invalid encoded data"),
            Self::Jbig2 => write!(f, "JBIG2 decoding failed"),
            Self::Jpx => write!(f, "JPEG 2000 decoding failed"),
        }
    }
}

impl core::error::Error for DecodeError {}
impl core::error::Error for ImageError {}
impl core::error::Error for ColorError {}
impl core::error::Error for DecoderError {}
impl core::error::Error for CodecError {}

impl From<ImageError> for DecodeError {
    fn from(e: ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<ColorError> for DecodeError {
    fn from(e: ColorError) -> Self {
        Self::Color(e)
    }
}

impl From<DecoderError> for DecodeError {
    fn from(e: DecoderError) -> Self {
        Self::Decoder(e)
    }
}

impl From<CodecError> for DecodeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Result type for image loading operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
