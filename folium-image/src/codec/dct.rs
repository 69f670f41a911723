use crate::codec::{DecodedRows, DecoderParams, ScanlineDecoder};
use crate::log::ldebug;
use crate::object::keys::COLOR_TRANSFORM;
use std::io::Cursor;
use zune_jpeg::JpegDecoder;
use zune_jpeg::zune_core::colorspace::ColorSpace;
use zune_jpeg::zune_core::options::DecoderOptions;

pub(crate) fn decoder(data: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
    let color_transform = params.params.and_then(|p| p.get::<u8>(COLOR_TRANSFORM));
    let (decoded, out_colorspace, (width, height)) = decode(data, color_transform)?;

    let components = match out_colorspace {
        ColorSpace::Luma => 1,
        ColorSpace::YCCK | ColorSpace::CMYK => 4,
        _ => 3,
    };

    ldebug!(
        "decoded {}x{} JPEG with {} components",
        width,
        height,
        components
    );

    let rows = DecodedRows::new(
        u32::try_from(width).ok()?,
        u32::try_from(height).ok()?,
        components,
        8,
        decoded,
    )?;

    Some(Box::new(rows))
}

fn options() -> DecoderOptions {
    DecoderOptions::default()
        .set_max_width(u16::MAX as usize)
        .set_max_height(u16::MAX as usize)
}

fn decode(
    data: &[u8],
    color_transform: Option<u8>,
) -> Option<(Vec<u8>, ColorSpace, (usize, usize))> {
    let mut decoder = JpegDecoder::new_with_options(Cursor::new(data), options());
    decoder.decode_headers().ok()?;

    let jpeg_data = extract_jpeg_data(data)?;

    let mut out_colorspace = match decoder.input_colorspace()? {
        ColorSpace::YCbCr => {
            if jpeg_data.app14.is_none()
                && jpeg_data.components.first()?.id == b'R'
                && jpeg_data.components.get(1)?.id == b'G'
                && jpeg_data.components.get(2)?.id == b'B'
            {
                // The samples are RGB even though no APP14 marker says so, keep
                // them as they are.
                ColorSpace::YCbCr
            } else if color_transform.is_none_or(|c| c == 1) {
                ColorSpace::RGB
            } else {
                ColorSpace::YCbCr
            }
        }
        ColorSpace::RGB | ColorSpace::RGBA => ColorSpace::RGB,
        ColorSpace::Luma | ColorSpace::LumaA => ColorSpace::Luma,
        ColorSpace::CMYK => ColorSpace::CMYK,
        ColorSpace::YCCK => ColorSpace::YCCK,
        _ => ColorSpace::RGB,
    };

    decoder.set_options(options().jpeg_set_out_colorspace(out_colorspace));

    let mut decoded = match decoder.decode() {
        Ok(decoded) => decoded,
        Err(_) => {
            // An APP14 marker can make the decoder pick a different input
            // colorspace, so retry with the other family.
            decoder = JpegDecoder::new_with_options(Cursor::new(data), options());
            decoder.decode_headers().ok()?;

            out_colorspace = if matches!(out_colorspace, ColorSpace::YCCK | ColorSpace::CMYK) {
                ColorSpace::RGB
            } else {
                ColorSpace::CMYK
            };

            decoder.set_options(options().jpeg_set_out_colorspace(out_colorspace));
            decoder.decode().ok()?
        }
    };

    if out_colorspace == ColorSpace::YCCK {
        for c in decoded.chunks_exact_mut(4) {
            let y = c[0] as f32;
            let cb = c[1] as f32;
            let cr = c[2] as f32;
            c[0] = (434.456 - y - 1.402 * cr) as u8;
            c[1] = (119.541 - y + 0.344 * cb + 0.714 * cr) as u8;
            c[2] = (481.816 - y - 1.772 * cb) as u8;
        }
    }

    Some((decoded, out_colorspace, decoder.dimensions()?))
}

#[derive(Debug)]
struct JpegComponent {
    id: u8,
}

#[derive(Debug)]
struct JpegData {
    app14: Option<u8>,
    components: Vec<JpegComponent>,
}

/// Read the Adobe APP14 color transform and the component ids of the frame
/// header.
fn extract_jpeg_data(jpeg_bytes: &[u8]) -> Option<JpegData> {
    if jpeg_bytes.len() < 4 || jpeg_bytes[0..2] != [0xFF, 0xD8] {
        return None;
    }

    let mut pos = 2;
    let mut app14 = None;
    let mut components = Vec::new();

    while pos + 3 < jpeg_bytes.len() {
        if jpeg_bytes[pos] != 0xFF {
            return None;
        }

        let marker = jpeg_bytes[pos + 1];

        if marker == 0xFF {
            pos += 1;
            continue;
        }

        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 || marker == 0xDA {
            break;
        }

        let length = u16::from_be_bytes([jpeg_bytes[pos + 2], jpeg_bytes[pos + 3]]) as usize;

        if marker == 0xEE
            && let Some(segment) = jpeg_bytes.get(pos + 4..pos + 2 + length)
            && segment.len() >= 12
            && &segment[0..5] == b"Adobe"
        {
            app14 = Some(segment[11]);
        }

        if (0xC0..=0xCF).contains(&marker)
            && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
            && let Some(&num_components) = jpeg_bytes.get(pos + 9)
        {
            for i in 0..num_components as usize {
                if let Some(&id) = jpeg_bytes.get(pos + 10 + i * 3) {
                    components.push(JpegComponent { id });
                }
            }
        }

        pos += 2 + length;
    }

    Some(JpegData { app14, components })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_header(ids: &[u8]) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend([0xFF, 0xC0, 0x00, (8 + ids.len() * 3) as u8, 8, 0, 1, 0, 1]);
        data.push(ids.len() as u8);

        for id in ids {
            data.extend([*id, 0x11, 0]);
        }

        data.extend([0xFF, 0xDA, 0x00, 0x02]);
        data
    }

    #[test]
    fn component_ids() {
        let data = extract_jpeg_data(&frame_header(b"RGB")).unwrap();
        let ids: Vec<u8> = data.components.iter().map(|c| c.id).collect();
        assert_eq!(ids, b"RGB".to_vec());
        assert!(data.app14.is_none());
    }

    #[test]
    fn adobe_marker() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xEE, 0x00, 0x0E];
        data.extend(b"Adobe");
        data.extend([0, 100, 0, 0, 0, 0, 2]);
        data.extend(&frame_header(&[1, 2, 3, 4])[2..]);

        let data = extract_jpeg_data(&data).unwrap();
        assert_eq!(data.app14, Some(2));
        assert_eq!(data.components.len(), 4);
    }

    #[test]
    fn not_a_jpeg() {
        assert!(extract_jpeg_data(&[0, 1, 2, 3]).is_none());
        let params = DecoderParams {
            width: 1,
            height: 1,
            components: 3,
            bpc: 8,
            params: None,
        };
        assert!(decoder(&[0xFF, 0xD8, 0xFF, 0xD9], params).is_none());
    }
}
