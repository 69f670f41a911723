//! Scanline decoders for the image filters.
//!
//! Flate, run-length, DCT and CCITT decoding are built in. JBIG2 and JPEG 2000
//! decoding is plugged in through a [`CodecProvider`].

#[cfg(feature = "ccitt")]
pub(crate) mod ccitt;
#[cfg(feature = "dct")]
pub(crate) mod dct;
pub(crate) mod flate;
mod predictor;
pub(crate) mod run_length;

use crate::jpx::JpxImage;
use crate::object::Dict;
use folium_common::pitch::pitch8;
use folium_common::raster::{Bitmap, PauseIndicator};

/// A decoder producing the rows of an image one at a time.
pub trait ScanlineDecoder {
    /// The width of the decoded image.
    fn width(&self) -> u32;

    /// The height of the decoded image.
    fn height(&self) -> u32;

    /// The number of components per pixel.
    fn components(&self) -> u32;

    /// The bits per component.
    fn bpc(&self) -> u32;

    /// Return the row at `line`, or `None` if the data ended before it.
    fn scanline(&mut self, line: u32) -> Option<&[u8]>;

    /// Prepare the rows up to `line`, returning `true` if the caller should
    /// yield and try again later.
    fn skip_to_scanline(&mut self, _line: u32, _pause: Option<&mut dyn PauseIndicator>) -> bool {
        false
    }
}

/// The parameters a decoder is created with.
#[derive(Debug, Clone, Copy)]
pub struct DecoderParams<'a> {
    /// The width from the image dictionary.
    pub width: u32,
    /// The height from the image dictionary.
    pub height: u32,
    /// The number of components per pixel.
    pub components: u32,
    /// The bits per component.
    pub bpc: u32,
    /// The `/DecodeParms` of the image filter.
    pub params: Option<&'a Dict>,
}

/// Fully decoded image data, split into rows on demand.
#[derive(Debug, Clone)]
pub struct DecodedRows {
    width: u32,
    height: u32,
    components: u32,
    bpc: u32,
    pitch: usize,
    data: Vec<u8>,
}

impl DecodedRows {
    /// Wrap decoded data with rows of `pitch8(bpc, components, width)` bytes.
    pub fn new(width: u32, height: u32, components: u32, bpc: u32, data: Vec<u8>) -> Option<Self> {
        let pitch = pitch8(bpc, components, width)? as usize;

        Some(Self {
            width,
            height,
            components,
            bpc,
            pitch,
            data,
        })
    }

    /// The number of bytes in a row.
    pub fn pitch(&self) -> usize {
        self.pitch
    }
}

impl ScanlineDecoder for DecodedRows {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn components(&self) -> u32 {
        self.components
    }

    fn bpc(&self) -> u32 {
        self.bpc
    }

    fn scanline(&mut self, line: u32) -> Option<&[u8]> {
        if line >= self.height {
            return None;
        }

        // A partly decoded last row keeps the bytes it has.
        let start = line as usize * self.pitch;
        let row = self.data.get(start..)?;
        let row = &row[..row.len().min(self.pitch)];

        (!row.is_empty()).then_some(row)
    }
}

/// The result of driving a JBIG2 decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jbig2Status {
    /// Decoding paused and has to be resumed.
    Continue,
    /// The whole page has been decoded.
    Done,
    /// Decoding failed.
    Error,
}

/// An incremental JBIG2 decoder.
pub trait Jbig2Decoder {
    /// Decode (or keep decoding) the embedded page `data` into `bitmap`, a
    /// 1-bit image where set bits are black.
    ///
    /// `globals` is the content of the `/JBIG2Globals` stream. The decoder is
    /// called with the same arguments until it stops returning
    /// [`Jbig2Status::Continue`].
    fn decode(
        &mut self,
        data: &[u8],
        globals: Option<&[u8]>,
        bitmap: &mut Bitmap,
        pause: Option<&mut dyn PauseIndicator>,
    ) -> Jbig2Status;
}

/// Options for JPEG 2000 decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JpxOptions {
    /// The number of highest resolution levels to drop, halving the image
    /// dimensions for each level.
    pub resolution_levels_to_skip: u8,
    /// Whether the samples are palette indices and must not be color
    /// converted.
    pub indexed: bool,
}

/// Creates decoders for the image filters.
///
/// Every method has a default implementation using the built-in decoders,
/// so implementors only override what they want to replace. JBIG2 and JPEG
/// 2000 have no built-in decoder.
pub trait CodecProvider {
    /// Create a `FlateDecode` decoder.
    fn flate(&self, data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
        flate::decoder(data, params)
    }

    /// Create a `RunLengthDecode` decoder.
    fn run_length(
        &self,
        data: &[u8],
        params: DecoderParams<'_>,
    ) -> Option<Box<dyn ScanlineDecoder>> {
        run_length::decoder(data, params)
    }

    /// Create a `DCTDecode` decoder. The decoder reports the dimensions and
    /// component count stored in the JPEG data.
    fn dct(&self, data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
        dct_decoder(data, params)
    }

    /// Create a `CCITTFaxDecode` decoder.
    fn ccitt(&self, data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
        ccitt_decoder(data, params)
    }

    /// Create a JBIG2 decoder.
    fn jbig2(&self) -> Option<Box<dyn Jbig2Decoder>> {
        None
    }

    /// Decode a JPEG 2000 image.
    fn jpx(&self, _data: &[u8], _options: JpxOptions) -> Option<JpxImage> {
        None
    }
}

#[cfg(feature = "dct")]
fn dct_decoder(data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    dct::decoder(data, params)
}

#[cfg(not(feature = "dct"))]
fn dct_decoder(_: &[u8], _: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    None
}

#[cfg(feature = "ccitt")]
fn ccitt_decoder(data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    ccitt::decoder(data, params)
}

#[cfg(not(feature = "ccitt"))]
fn ccitt_decoder(_: &[u8], _: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    None
}

/// The built-in decoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodecs;

impl CodecProvider for DefaultCodecs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_rows() {
        let mut rows = DecodedRows::new(10, 3, 1, 1, vec![1, 2, 3, 4, 5]).unwrap();
        assert_eq!(rows.pitch(), 2);
        assert_eq!(rows.scanline(0), Some(&[1, 2][..]));
        assert_eq!(rows.scanline(1), Some(&[3, 4][..]));
        assert_eq!(rows.scanline(2), Some(&[5][..]));
        assert_eq!(rows.scanline(3), None);

        let mut rows = DecodedRows::new(10, 3, 1, 1, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(rows.scanline(2), None);
        assert_eq!(rows.scanline(0), Some(&[1, 2][..]));
    }

    #[test]
    fn default_provider_has_no_jbig2_or_jpx() {
        assert!(DefaultCodecs.jbig2().is_none());
        assert!(DefaultCodecs.jpx(&[0; 4], JpxOptions::default()).is_none());
    }
}
