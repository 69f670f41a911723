use crate::codec::{DecodedRows, DecoderParams, ScanlineDecoder};
use crate::log::lwarn;

pub(crate) fn decoder(data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    let rows = DecodedRows::new(
        params.width,
        params.height,
        params.components,
        params.bpc,
        decode(data),
    )?;

    Some(Box::new(rows))
}

pub(crate) fn decode(data: &[u8]) -> Vec<u8> {
    let mut decoded = vec![];

    if decode_inner(data, &mut decoded).is_none() {
        lwarn!("run-length decode stream ended prematurely");
    }

    decoded
}

fn decode_inner(data: &[u8], decoded: &mut Vec<u8>) -> Option<()> {
    let mut data = data.iter().copied();

    loop {
        let length = data.next()?;

        match length {
            128 => return Some(()),
            0..=127 => {
                for _ in 0..=length {
                    decoded.push(data.next()?);
                }
            }
            _ => {
                let byte = data.next()?;
                decoded.extend(std::iter::repeat_n(byte, 257 - length as usize));
            }
        }
    }
}
