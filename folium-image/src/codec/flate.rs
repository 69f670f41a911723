use crate::codec::predictor::{PredictorParams, apply_predictor};
use crate::codec::{DecodedRows, DecoderParams, ScanlineDecoder};
use crate::log::{ldebug, lwarn};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

pub(crate) fn decoder(data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    let decoded = decode(data)?;

    let predictor = params
        .params
        .map(PredictorParams::from_params)
        .unwrap_or_default();
    let decoded = apply_predictor(decoded, &predictor)?;

    let rows = DecodedRows::new(
        params.width,
        params.height,
        params.components,
        params.bpc,
        decoded,
    )?;

    Some(Box::new(rows))
}

/// Inflate zlib data, falling back to raw deflate data.
///
/// Truncated streams keep whatever was decoded before the error.
pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let zlib = inflate(ZlibDecoder::new(data));

    if !zlib.is_empty() {
        return Some(zlib);
    }

    ldebug!("zlib decoding produced no data, trying raw deflate");

    let deflate = inflate(DeflateDecoder::new(data));

    (!deflate.is_empty()).then_some(deflate)
}

fn inflate(mut reader: impl Read) -> Vec<u8> {
    let mut out = vec![];

    if reader.read_to_end(&mut out).is_err() {
        lwarn!("flate stream ended prematurely");
    }

    out
}
