use crate::codec::ScanlineDecoder;
use crate::color::{ColorSpace, Family};
use crate::resolve::{ColorInfo, ComponentData};
use crate::source::SampleSource;
use folium_common::bit::{bit_is_set, sample};
use folium_common::pitch::pitch8;
use folium_common::raster::{Bitmap, PixelSource};

impl SampleSource {
    /// Produce the row at `line` in the output format of the source.
    pub(super) fn produce_scanline(&mut self, line: u32) -> &[u8] {
        let info = &self.color;

        if info.bpc == 0 {
            return &[];
        }

        let Some(src_pitch) = pitch8(info.bpc, info.components, self.width) else {
            return &[];
        };

        let src_pitch = src_pitch as usize;
        let width = self.width as usize;

        let src = source_row(
            self.cached.as_ref(),
            self.decoder.as_mut(),
            self.stream.data(),
            &mut self.pad_buf,
            line,
            src_pitch,
        );

        let Some(src) = src else {
            let buf = if self.mask_buf.is_empty() {
                &mut self.line_buf
            } else {
                &mut self.mask_buf
            };
            buf.fill(0);

            return buf;
        };

        let line_buf = &mut self.line_buf;
        let mask_buf = &mut self.mask_buf;
        let palette = self.palette.as_deref();

        if info.bpp() == 1 {
            if info.image_mask && info.default_decode {
                for (dst, src) in line_buf.iter_mut().zip(src) {
                    *dst = !src;
                }

                return &line_buf[..src_pitch];
            }

            if !info.color_key {
                line_buf[..src_pitch].copy_from_slice(src);

                return &line_buf[..src_pitch];
            }

            let set = info.set_value(palette).to_le_bytes();
            let reset = info.reset_value(palette).to_le_bytes();

            for (col, dst) in mask_buf.chunks_exact_mut(4).take(width).enumerate() {
                dst.copy_from_slice(if bit_is_set(src, col) { &set } else { &reset });
            }

            return &mask_buf[..4 * width];
        }

        if info.bpp() <= 8 {
            let len = if info.bpc == 8 {
                line_buf[..src_pitch].copy_from_slice(src);
                src_pitch
            } else {
                unpack_indices(src, info, width, line_buf);
                width
            };

            if !info.color_key {
                return &line_buf[..len];
            }

            let key = info.comp_data.first().copied().unwrap_or_default();

            for (dst, &index) in mask_buf.chunks_exact_mut(4).zip(line_buf.iter()).take(width) {
                let [b, g, r] = match palette.and_then(|p| p.get(index as usize)) {
                    Some(&argb) => {
                        let [b, g, r, _] = argb.to_le_bytes();
                        [b, g, r]
                    }
                    None => [index; 3],
                };

                let alpha = if is_keyed_out(u32::from(index), &key) {
                    0
                } else {
                    0xFF
                };
                dst.copy_from_slice(&[b, g, r, alpha]);
            }

            return &mask_buf[..4 * width];
        }

        if info.color_key {
            if info.components == 3 && info.bpc == 8 {
                for (dst, px) in mask_buf
                    .chunks_exact_mut(4)
                    .zip(src.chunks_exact(3))
                    .take(width)
                {
                    let keyed = px
                        .iter()
                        .zip(&info.comp_data)
                        .all(|(s, key)| is_keyed_out(u32::from(*s), key));
                    dst[3] = if keyed { 0 } else { 0xFF };
                }
            } else {
                mask_buf.fill(0xFF);
            }
        }

        let src = match &info.color_space {
            Some(cs) => {
                let trans_mask = self.options.load_mask
                    && self.options.group_family == Some(Family::DeviceCmyk)
                    && info.family == Some(Family::DeviceCmyk);
                translate_24bpp(info, cs, width, trans_mask, src, line_buf);

                &line_buf[..3 * width]
            }
            None => src,
        };

        if !info.color_key {
            return src;
        }

        for (dst, px) in mask_buf.chunks_exact_mut(4).zip(src.chunks_exact(3)).take(width) {
            dst[..3].copy_from_slice(px);
        }

        &mask_buf[..4 * width]
    }
}

/// Locate the encoded row at `line`, zero-padding rows that end early.
fn source_row<'a>(
    cached: Option<&'a Bitmap>,
    decoder: Option<&'a mut Box<dyn ScanlineDecoder>>,
    data: &'a [u8],
    pad_buf: &'a mut Vec<u8>,
    line: u32,
    src_pitch: usize,
) -> Option<&'a [u8]> {
    let row = match (cached, decoder) {
        (Some(bitmap), _) if src_pitch <= bitmap.pitch() as usize => {
            bitmap.row(line.min(bitmap.height().saturating_sub(1)))?
        }
        (_, Some(decoder)) => decoder.scanline(line)?,
        _ => data.get(line as usize * src_pitch..)?,
    };

    if row.is_empty() {
        return None;
    }

    if row.len() >= src_pitch {
        return Some(&row[..src_pitch]);
    }

    pad_buf.clear();
    pad_buf.extend_from_slice(row);
    pad_buf.resize(src_pitch, 0);

    Some(pad_buf.as_slice())
}

fn unpack_indices(src: &[u8], info: &ColorInfo, width: usize, dst: &mut [u8]) {
    let bpc = info.bpc as u8;
    let components = info.components as usize;

    for (col, out) in dst.iter_mut().take(width).enumerate() {
        let mut index = 0;

        for c in 0..components {
            index |= sample(src, col * components + c, bpc) << (c as u32 * info.bpc);
        }

        *out = index as u8;
    }
}

fn is_keyed_out(value: u32, key: &ComponentData) -> bool {
    (key.key_min..=key.key_max).contains(&value)
}

fn translate_24bpp(
    info: &ColorInfo,
    cs: &ColorSpace,
    width: usize,
    trans_mask: bool,
    src: &[u8],
    dst: &mut [u8],
) {
    if info.bpc == 0 || translate_default_decode(info, cs, width, src, dst) {
        return;
    }

    let bpc = info.bpc.min(16) as u8;
    let components = info.components as usize;
    let mut values = vec![0.0_f32; components.max(4)];

    for (col, out) in dst.chunks_exact_mut(3).take(width).enumerate() {
        for (c, (value, data)) in values.iter_mut().zip(&info.comp_data).enumerate() {
            let s = sample(src, col * components + c, bpc);
            *value = data.decode_min + data.decode_step * s as f32;
        }

        let rgb = if trans_mask {
            let k = 1.0 - values[3];
            [
                (1.0 - values[0]) * k,
                (1.0 - values[1]) * k,
                (1.0 - values[2]) * k,
            ]
        } else if info.family != Some(Family::Pattern) {
            cs.rgb_or_black(&values[..components])
        } else {
            [0.0; 3]
        };

        let [r, g, b] = rgb.map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8);
        out.copy_from_slice(&[b, g, r]);
    }
}

/// The shortcuts for samples using the default decode ranges. Returns `false`
/// if the generic path has to be taken.
fn translate_default_decode(
    info: &ColorInfo,
    cs: &ColorSpace,
    width: usize,
    src: &[u8],
    dst: &mut [u8],
) -> bool {
    if !info.default_decode {
        return false;
    }

    if !matches!(info.family, Some(Family::DeviceRgb | Family::CalRgb)) {
        if info.bpc != 8 {
            return false;
        }

        if info.components == cs.component_count() {
            cs.translate_row(src, width, dst);
        }

        return true;
    }

    if info.components != 3 {
        return true;
    }

    let pixels = dst.chunks_exact_mut(3).take(width);

    match info.bpc {
        8 => {
            for (out, px) in pixels.zip(src.chunks_exact(3)) {
                out.copy_from_slice(&[px[2], px[1], px[0]]);
            }
        }
        16 => {
            for (out, px) in pixels.zip(src.chunks_exact(6)) {
                out.copy_from_slice(&[px[4], px[2], px[0]]);
            }
        }
        bpc => {
            let max = (1_u32 << bpc) - 1;
            let scale = |v: u32| (v.min(max) * 255 / max) as u8;

            for (col, out) in pixels.enumerate() {
                let r = sample(src, col * 3, bpc as u8);
                let g = sample(src, col * 3 + 1, bpc as u8);
                let b = sample(src, col * 3 + 2, bpc as u8);
                out.copy_from_slice(&[scale(b), scale(g), scale(r)]);
            }
        }
    }

    true
}
