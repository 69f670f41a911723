use crate::codec::{DecodedRows, DecoderParams, ScanlineDecoder};
use crate::log::{ldebug, lwarn};
use crate::object::keys::{BLACK_IS_1, COLUMNS, ENCODED_BYTE_ALIGN, K, ROWS};
use fax::decoder::{decode_g3, decode_g4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CcittParams {
    k: i32,
    columns: u32,
    rows: u32,
    black_is_1: bool,
    encoded_byte_align: bool,
}

impl CcittParams {
    fn new(params: DecoderParams<'_>) -> Self {
        let dict = params.params;
        let get_u32 = |key| dict.and_then(|d| d.get::<u32>(key));
        let get_bool = |key| dict.and_then(|d| d.get::<bool>(key)).unwrap_or(false);

        Self {
            k: dict.and_then(|d| d.get::<i32>(K)).unwrap_or(0),
            columns: get_u32(COLUMNS).unwrap_or(1728),
            rows: get_u32(ROWS).unwrap_or(params.height),
            black_is_1: get_bool(BLACK_IS_1),
            encoded_byte_align: get_bool(ENCODED_BYTE_ALIGN),
        }
    }
}

pub(crate) fn decoder(data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    let ccitt = CcittParams::new(params);

    if ccitt.columns == 0 || ccitt.columns > u32::from(u16::MAX) {
        lwarn!("unsupported CCITT width {}", ccitt.columns);

        return None;
    }

    if ccitt.encoded_byte_align {
        ldebug!("ignoring EncodedByteAlign, rows are located by their codes");
    }

    let decoded = decode(data, &ccitt)?;
    let height = if params.height > 0 {
        params.height
    } else {
        ccitt.rows
    };

    let rows = DecodedRows::new(ccitt.columns, height, 1, 1, decoded)?;

    Some(Box::new(rows))
}

fn decode(data: &[u8], params: &CcittParams) -> Option<Vec<u8>> {
    let width = params.columns as usize;
    let mut out = vec![];

    let mut push_row = |transitions: &[u16]| {
        out.extend(transitions_to_row(transitions, width, params.black_is_1));
    };

    let status = if params.k < 0 {
        let height = u16::try_from(params.rows).ok().filter(|h| *h > 0);
        decode_g4(
            data.iter().copied(),
            params.columns as u16,
            height,
            &mut push_row,
        )
    } else {
        decode_g3(data.iter().copied(), &mut push_row)
    };

    if status.is_none() {
        if out.is_empty() {
            lwarn!("failed to decode CCITT data");

            return None;
        }

        lwarn!("CCITT stream ended prematurely");
    }

    Some(out)
}

/// Pack the color changes of a row, starting with white, into a 1-bit row.
///
/// Black pixels are 0 unless `black_is_1` is set.
fn transitions_to_row(transitions: &[u16], width: usize, black_is_1: bool) -> Vec<u8> {
    let fill = if black_is_1 { 0x00 } else { 0xFF };
    let mut row = vec![fill; width.div_ceil(8)];

    let mut black = false;
    let mut start = 0;

    let mut flip = |from: usize, to: usize| {
        for pixel in from..to.min(width) {
            row[pixel / 8] ^= 0x80 >> (pixel % 8);
        }
    };

    for &position in transitions {
        let position = position as usize;

        if black {
            flip(start, position);
        }

        black = !black;
        start = position;
    }

    if black {
        flip(start, width);
    }

    if width % 8 != 0
        && let Some(last) = row.last_mut()
    {
        *last &= 0xFF << (8 - width % 8);
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        // WW BBB WW B
        assert_eq!(transitions_to_row(&[2, 5, 7], 8, true), vec![0b0011_1001]);
        assert_eq!(transitions_to_row(&[2, 5, 7], 8, false), vec![0b1100_0110]);
    }

    #[test]
    fn all_white_row() {
        assert_eq!(transitions_to_row(&[], 10, false), vec![0xFF, 0xC0]);
        assert_eq!(transitions_to_row(&[], 10, true), vec![0x00, 0x00]);
    }

    #[test]
    fn black_until_the_end() {
        assert_eq!(transitions_to_row(&[4], 12, true), vec![0x0F, 0xF0]);
    }

    #[test]
    fn defaults() {
        let params = CcittParams::new(DecoderParams {
            width: 8,
            height: 4,
            components: 1,
            bpc: 1,
            params: None,
        });

        assert_eq!(params.k, 0);
        assert_eq!(params.columns, 1728);
        assert_eq!(params.rows, 4);
        assert!(!params.black_is_1);
    }
}
