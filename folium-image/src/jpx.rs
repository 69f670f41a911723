//! Turning decoded JPEG 2000 images into bitmaps the scanline path can read.
//!
//! JPEG 2000 decoding itself is pluggable (see [`CodecProvider::jpx`]). The
//! decoder hands back planar integer samples together with the colorspace
//! signalled in the codestream, and this module decides how those samples
//! relate to the colorspace declared in the PDF image dictionary.
//!
//! [`CodecProvider::jpx`]: crate::codec::CodecProvider::jpx

use crate::color::{ColorSpace, Family};
use crate::error::{CodecError, Result, bail};
use crate::log::ldebug;
use bytemuck::{Pod, Zeroable};
use folium_common::pitch::pitch32;
use folium_common::raster::{Bitmap, PixelFormat, PixelSource};
use std::cmp::Ordering;

/// The colorspace signalled inside a JPEG 2000 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpxColorSpace {
    /// The decoder could not determine the colorspace.
    Unknown,
    /// The file does not specify a colorspace.
    Unspecified,
    /// sRGB.
    Srgb,
    /// Grayscale.
    Gray,
    /// sYCC, luma and two chroma channels.
    Sycc,
    /// Extended YCC.
    Eycc,
    /// CMYK.
    Cmyk,
}

impl JpxColorSpace {
    fn matches(self, other: Self) -> bool {
        self == other || matches!(self, Self::Unknown | Self::Unspecified)
    }
}

/// A single channel of a decoded JPEG 2000 image.
#[derive(Debug, Clone)]
pub struct JpxComponent {
    /// The width of the channel in samples.
    pub width: u32,
    /// The height of the channel in samples.
    pub height: u32,
    /// The horizontal subsampling factor.
    pub dx: u32,
    /// The vertical subsampling factor.
    pub dy: u32,
    /// The bit precision of a sample.
    pub precision: u8,
    /// Whether samples are signed.
    pub signed: bool,
    /// The samples in row-major order.
    pub data: Vec<i32>,
}

/// A decoded JPEG 2000 image.
#[derive(Debug, Clone)]
pub struct JpxImage {
    /// The width of the (possibly reduced) image.
    pub width: u32,
    /// The height of the (possibly reduced) image.
    pub height: u32,
    /// The colorspace signalled in the file.
    pub color_space: JpxColorSpace,
    /// The channels of the image.
    pub components: Vec<JpxComponent>,
}

impl JpxImage {
    /// The number of channels.
    pub fn channels(&self) -> u32 {
        self.components.len() as u32
    }

    /// Convert sYCC images into RGB and tag images with at most two
    /// channels as gray.
    ///
    /// Three channel images with subsampled chroma are treated as sYCC even
    /// if the file claims otherwise.
    pub fn normalize(&mut self) {
        let subsampled_chroma = match self.components.as_slice() {
            [luma, chroma, _] => luma.dx == luma.dy && chroma.dx != 1,
            _ => false,
        };

        if self.color_space != JpxColorSpace::Sycc && subsampled_chroma {
            self.color_space = JpxColorSpace::Sycc;
        } else if self.components.len() <= 2 {
            self.color_space = JpxColorSpace::Gray;
        }

        if self.color_space == JpxColorSpace::Sycc {
            self.sycc_to_rgb();
        }
    }

    fn sycc_to_rgb(&mut self) {
        let [luma, cb, cr, ..] = self.components.as_mut_slice() else {
            self.color_space = JpxColorSpace::Gray;

            return;
        };

        let factors = |c: &JpxComponent| (c.dx, c.dy);
        let supported = luma.dx == 1
            && luma.dy == 1
            && factors(cb) == factors(cr)
            && matches!(factors(cb), (1, 1) | (2, 1) | (2, 2));

        if !supported || luma.precision == 0 || luma.precision > 16 {
            ldebug!("unsupported sYCC layout, leaving samples untouched");

            return;
        }

        let (width, height) = (luma.width as usize, luma.height as usize);
        let (cw, ch) = (cb.width as usize, cb.height as usize);

        if luma.data.len() < width * height
            || cw == 0
            || ch == 0
            || cb.data.len() < cw * ch
            || cr.data.len() < cw * ch
            || (cr.width, cr.height) != (cb.width, cb.height)
        {
            return;
        }

        let offset = 1_i32 << (luma.precision - 1);
        let upb = (1_i32 << luma.precision) - 1;
        let (dx, dy) = (cb.dx as usize, cb.dy as usize);

        let mut r = Vec::with_capacity(width * height);
        let mut g = Vec::with_capacity(width * height);
        let mut b = Vec::with_capacity(width * height);

        for row in 0..height {
            let chroma_row = (row / dy).min(ch - 1) * cw;

            for col in 0..width {
                let chroma = chroma_row + (col / dx).min(cw - 1);
                let [pr, pg, pb] = sycc_pixel(
                    luma.data[row * width + col],
                    cb.data[chroma],
                    cr.data[chroma],
                    offset,
                    upb,
                );
                r.push(pr);
                g.push(pg);
                b.push(pb);
            }
        }

        luma.data = r;
        cb.data = g;
        cr.data = b;

        for chroma in [cb, cr] {
            chroma.width = luma.width;
            chroma.height = luma.height;
            chroma.dx = luma.dx;
            chroma.dy = luma.dy;
            chroma.precision = luma.precision;
            chroma.signed = luma.signed;
        }

        self.color_space = JpxColorSpace::Srgb;
    }
}

fn sycc_pixel(y: i32, cb: i32, cr: i32, offset: i32, upb: i32) -> [i32; 3] {
    let cb = (cb - offset) as f32;
    let cr = (cr - offset) as f32;

    let r = y + (1.402 * cr) as i32;
    let g = y - (0.344 * cb + 0.714 * cr) as i32;
    let b = y + (1.772 * cb) as i32;

    [r.clamp(0, upb), g.clamp(0, upb), b.clamp(0, upb)]
}

/// How the samples of a JPEG 2000 image are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpxAction {
    /// Keep the samples and the declared colorspace.
    DoNothing,
    /// Treat the image as `DeviceGray`.
    UseGray,
    /// Treat the samples as palette indices.
    UseIndexed,
    /// Treat the image as RGB, producing BGR output directly.
    UseRgb,
    /// Treat the image as `DeviceCMYK`.
    UseCmyk,
    /// Drop (or split off) the fourth channel of an RGB image.
    ConvertArgbToRgb,
}

/// The reconciliation of a JPEG 2000 image with the PDF colorspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpxConversion {
    action: JpxAction,
    components: Option<u32>,
}

impl JpxConversion {
    /// Decide how to treat `image` given the colorspace of the image
    /// dictionary.
    ///
    /// `inline_alpha` is whether `/SMaskInData` asks for the alpha channel
    /// embedded in the JPEG 2000 data. Returns `None` if the image cannot be
    /// used with the declared colorspace.
    pub fn new(image: &JpxImage, pdf_cs: Option<&ColorSpace>, inline_alpha: bool) -> Option<Self> {
        let tag = image.color_space;
        let channels = image.channels();

        let conversion = match pdf_cs {
            Some(cs) => Self {
                action: Self::action_for_pdf_cs(tag, channels, cs, inline_alpha)?,
                components: None,
            },
            None => Self {
                action: Self::action_without_pdf_cs(tag, channels),
                components: Some(match tag {
                    JpxColorSpace::Unknown | JpxColorSpace::Unspecified => channels,
                    JpxColorSpace::Gray => 1,
                    JpxColorSpace::Srgb | JpxColorSpace::Sycc | JpxColorSpace::Eycc => 3,
                    JpxColorSpace::Cmyk => 4,
                }),
            },
        };

        ldebug!("JPEG 2000 action: {:?}", conversion.action);

        Some(conversion)
    }

    fn action_for_pdf_cs(
        tag: JpxColorSpace,
        channels: u32,
        cs: &ColorSpace,
        inline_alpha: bool,
    ) -> Option<JpxAction> {
        match cs.family() {
            Family::DeviceGray => tag
                .matches(JpxColorSpace::Gray)
                .then_some(JpxAction::UseGray),
            Family::DeviceRgb => {
                if !tag.matches(JpxColorSpace::Srgb) {
                    return None;
                }

                if channels > 3 && inline_alpha {
                    Some(JpxAction::ConvertArgbToRgb)
                } else {
                    Some(JpxAction::UseRgb)
                }
            }
            Family::DeviceCmyk => tag
                .matches(JpxColorSpace::Cmyk)
                .then_some(JpxAction::UseCmyk),
            _ if cs.component_count() == 3 && channels == 4 && tag == JpxColorSpace::Srgb => {
                Some(JpxAction::ConvertArgbToRgb)
            }
            Family::Indexed => Some(JpxAction::UseIndexed),
            _ => Some(JpxAction::DoNothing),
        }
    }

    fn action_without_pdf_cs(tag: JpxColorSpace, channels: u32) -> JpxAction {
        match tag {
            JpxColorSpace::Unknown | JpxColorSpace::Unspecified => {
                if channels == 3 {
                    JpxAction::UseRgb
                } else {
                    JpxAction::DoNothing
                }
            }
            JpxColorSpace::Sycc | JpxColorSpace::Eycc => JpxAction::DoNothing,
            JpxColorSpace::Srgb => {
                if channels > 3 {
                    JpxAction::ConvertArgbToRgb
                } else {
                    JpxAction::UseRgb
                }
            }
            JpxColorSpace::Gray => JpxAction::UseGray,
            JpxColorSpace::Cmyk => JpxAction::UseCmyk,
        }
    }

    /// The chosen action.
    pub fn action(&self) -> JpxAction {
        self.action
    }

    /// The component count implied by the JPEG 2000 colorspace, only known
    /// when the image dictionary has no colorspace.
    pub fn components(&self) -> Option<u32> {
        self.components
    }

    /// Whether red and blue need to be swapped to produce BGR output.
    pub fn swap_rgb(&self) -> bool {
        matches!(self.action, JpxAction::UseRgb | JpxAction::ConvertArgbToRgb)
    }

    /// Replace the image colorspace according to the action.
    ///
    /// RGB output is final, so the colorspace is cleared and the bitmap is
    /// used as is.
    pub fn apply_colorspace(&self, color_space: &mut Option<ColorSpace>) {
        match self.action {
            JpxAction::UseGray => *color_space = Some(ColorSpace::DeviceGray),
            JpxAction::UseCmyk => *color_space = Some(ColorSpace::DeviceCmyk),
            JpxAction::UseRgb | JpxAction::ConvertArgbToRgb => *color_space = None,
            JpxAction::DoNothing | JpxAction::UseIndexed => {}
        }
    }

    /// The width and format of the bitmap the samples are decoded into.
    pub fn output_layout(&self, width: u32, channels: u32) -> Option<(u32, PixelFormat)> {
        let layout = match self.action {
            JpxAction::UseGray | JpxAction::UseIndexed => (width, PixelFormat::Indexed8),
            JpxAction::UseRgb if channels == 3 => (width, PixelFormat::Bgr24),
            JpxAction::UseRgb if channels == 4 => (width, PixelFormat::Bgrx32),
            JpxAction::ConvertArgbToRgb => (width, PixelFormat::Bgrx32),
            _ => {
                let bytes = u64::from(width) * u64::from(channels);
                (u32::try_from(bytes.div_ceil(3)).ok()?, PixelFormat::Bgr24)
            }
        };

        Some(layout)
    }

    /// The number of channels written per pixel, given the channels of the
    /// image and the component count of the source.
    ///
    /// Only ARGB to RGB conversion keeps a channel the source doesn't read.
    pub fn output_channels(&self, channels: u32, components: u32) -> u32 {
        match self.action {
            JpxAction::ConvertArgbToRgb => channels,
            _ => components.min(channels),
        }
    }
}

/// Write the first `channel_count` channels of `image` interleaved into
/// `bitmap`, normalizing every sample to eight bits.
pub fn decode_into(
    image: &JpxImage,
    bitmap: &mut Bitmap,
    swap_rgb: bool,
    channel_count: u32,
) -> Result<()> {
    let Some(first) = image.components.first() else {
        bail!(CodecError::Jpx);
    };

    let (width, height) = (image.width as usize, image.height as usize);
    let channels = channel_count as usize;

    if channels == 0 || channels > image.components.len() {
        bail!(CodecError::Jpx);
    }

    if width == 0
        || height == 0
        || first.width != image.width
        || first.height != image.height
    {
        bail!(CodecError::Jpx);
    }

    let required = pitch32(8 * channels as u32, image.width);

    if required.is_none_or(|p| bitmap.pitch() < p) || bitmap.height() < image.height {
        bail!(CodecError::Jpx);
    }

    if swap_rgb && channels < 3 {
        bail!(CodecError::Jpx);
    }

    if image.components.iter().any(|c| {
        c.dx != first.dx
            || c.dy != first.dy
            || c.precision != first.precision
            || c.data.len() < width * height
    }) {
        bail!(CodecError::Jpx);
    }

    if !(1..=31).contains(&first.precision) {
        bail!(CodecError::Jpx);
    }

    bitmap.clear(0xFF);

    for (index, component) in image.components.iter().take(channels).enumerate() {
        let channel = if swap_rgb && index < 3 { 2 - index } else { index };
        let offset = if component.signed {
            1 << (component.precision - 1)
        } else {
            0
        };
        let adjust = i32::from(component.precision) - 8;

        for (row, samples) in component.data.chunks_exact(width).take(height).enumerate() {
            let Some(dst) = bitmap.row_mut(row as u32) else {
                bail!(CodecError::Jpx);
            };

            for (col, sample) in samples.iter().enumerate() {
                dst[col * channels + channel] = normalize_sample(sample + offset, adjust);
            }
        }
    }

    Ok(())
}

fn normalize_sample(sample: i32, adjust: i32) -> u8 {
    match adjust.cmp(&0) {
        Ordering::Less => (sample << -adjust) as u8,
        Ordering::Equal => sample as u8,
        Ordering::Greater => {
            let rounded = (sample >> adjust) + ((sample >> (adjust - 1)) & 1);
            rounded.clamp(0, 255) as u8
        }
    }
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Bgra8 {
    b: u8,
    g: u8,
    r: u8,
    a: u8,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Bgr8 {
    b: u8,
    g: u8,
    r: u8,
}

fn composite_over_white(color: u8, alpha: u8) -> u8 {
    let (c, a) = (u32::from(color), u32::from(alpha));

    ((c * a + 255 * (255 - a)) / 255) as u8
}

/// Convert a `Bgrx32` bitmap into `Bgr24`.
///
/// With `inline_alpha`, the fourth channel is returned as a separate
/// row-major alpha buffer and the color is composited over white. Otherwise
/// it is dropped.
pub fn argb_to_rgb(src: &Bitmap, inline_alpha: bool) -> Option<(Bitmap, Option<Vec<u8>>)> {
    let (width, height) = (src.width(), src.height());
    let mut dst = Bitmap::new(width, height, PixelFormat::Bgr24)?;
    let mut alpha = inline_alpha.then(|| Vec::with_capacity(width as usize * height as usize));

    for row in 0..height {
        let src_row = src.row(row)?.get(..width as usize * 4)?;
        let dst_row = dst.row_mut(row)?.get_mut(..width as usize * 3)?;

        let src_pixels: &[Bgra8] = bytemuck::cast_slice(src_row);
        let dst_pixels: &mut [Bgr8] = bytemuck::cast_slice_mut(dst_row);

        for (out, px) in dst_pixels.iter_mut().zip(src_pixels) {
            *out = match &mut alpha {
                Some(alpha) => {
                    alpha.push(px.a);

                    Bgr8 {
                        b: composite_over_white(px.b, px.a),
                        g: composite_over_white(px.g, px.a),
                        r: composite_over_white(px.r, px.a),
                    }
                }
                None => Bgr8 {
                    b: px.b,
                    g: px.g,
                    r: px.r,
                },
            };
        }
    }

    Some((dst, alpha))
}

/// Shift palette indices of images with fewer than eight bits per component
/// into range.
pub fn shift_indexed(bitmap: &mut Bitmap, bpc: u32) {
    if bpc == 0 || bpc >= 8 {
        return;
    }

    let width = bitmap.width() as usize;
    let shift = 8 - bpc;

    for row in 0..bitmap.height() {
        if let Some(row) = bitmap.row_mut(row) {
            for v in row.iter_mut().take(width) {
                *v >>= shift;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(width: u32, height: u32, data: Vec<i32>) -> JpxComponent {
        JpxComponent {
            width,
            height,
            dx: 1,
            dy: 1,
            precision: 8,
            signed: false,
            data,
        }
    }

    fn image(color_space: JpxColorSpace, channels: usize) -> JpxImage {
        JpxImage {
            width: 1,
            height: 1,
            color_space,
            components: (0..channels).map(|_| component(1, 1, vec![0])).collect(),
        }
    }

    #[test]
    fn rgb_with_fourth_channel() {
        let img = image(JpxColorSpace::Unspecified, 4);

        let plain = JpxConversion::new(&img, Some(&ColorSpace::DeviceRgb), false).unwrap();
        assert_eq!(plain.action(), JpxAction::UseRgb);
        assert!(plain.swap_rgb());

        let alpha = JpxConversion::new(&img, Some(&ColorSpace::DeviceRgb), true).unwrap();
        assert_eq!(alpha.action(), JpxAction::ConvertArgbToRgb);
        assert!(alpha.swap_rgb());
    }

    #[test]
    fn mismatching_colorspaces() {
        let gray = image(JpxColorSpace::Gray, 1);
        assert!(JpxConversion::new(&gray, Some(&ColorSpace::DeviceRgb), false).is_none());
        assert!(JpxConversion::new(&gray, Some(&ColorSpace::DeviceCmyk), false).is_none());

        let cmyk = image(JpxColorSpace::Cmyk, 4);
        assert!(JpxConversion::new(&cmyk, Some(&ColorSpace::DeviceGray), false).is_none());
        assert_eq!(
            JpxConversion::new(&cmyk, Some(&ColorSpace::DeviceCmyk), false)
                .unwrap()
                .action(),
            JpxAction::UseCmyk
        );
    }

    #[test]
    fn actions_without_pdf_colorspace() {
        let action = |tag, channels| {
            let conversion = JpxConversion::new(&image(tag, channels), None, false).unwrap();
            (conversion.action(), conversion.components())
        };

        assert_eq!(
            action(JpxColorSpace::Unknown, 3),
            (JpxAction::UseRgb, Some(3))
        );
        assert_eq!(
            action(JpxColorSpace::Unspecified, 2),
            (JpxAction::DoNothing, Some(2))
        );
        assert_eq!(
            action(JpxColorSpace::Srgb, 4),
            (JpxAction::ConvertArgbToRgb, Some(3))
        );
        assert_eq!(action(JpxColorSpace::Gray, 1), (JpxAction::UseGray, Some(1)));
        assert_eq!(action(JpxColorSpace::Cmyk, 4), (JpxAction::UseCmyk, Some(4)));
        assert_eq!(
            action(JpxColorSpace::Eycc, 3),
            (JpxAction::DoNothing, Some(3))
        );
    }

    #[test]
    fn colorspace_override() {
        let conversion = JpxConversion::new(&image(JpxColorSpace::Srgb, 3), None, false).unwrap();
        let mut cs = Some(ColorSpace::DeviceRgb);
        conversion.apply_colorspace(&mut cs);
        assert!(cs.is_none());

        let conversion = JpxConversion::new(&image(JpxColorSpace::Gray, 1), None, false).unwrap();
        let mut cs = None;
        conversion.apply_colorspace(&mut cs);
        assert_eq!(cs.map(|c| c.family()), Some(Family::DeviceGray));
    }

    #[test]
    fn output_layouts() {
        let layout = |tag, channels| {
            JpxConversion::new(&image(tag, channels), None, false)
                .unwrap()
                .output_layout(10, channels as u32)
        };

        assert_eq!(layout(JpxColorSpace::Gray, 1), Some((10, PixelFormat::Indexed8)));
        assert_eq!(layout(JpxColorSpace::Srgb, 3), Some((10, PixelFormat::Bgr24)));
        assert_eq!(layout(JpxColorSpace::Srgb, 4), Some((10, PixelFormat::Bgrx32)));
        assert_eq!(layout(JpxColorSpace::Cmyk, 4), Some((14, PixelFormat::Bgr24)));
    }

    #[test]
    fn sample_normalization() {
        assert_eq!(normalize_sample(0x3, -4), 0x30);
        assert_eq!(normalize_sample(200, 0), 200);
        assert_eq!(normalize_sample(0x1234, 8), 0x12);
        assert_eq!(normalize_sample(0x1280, 8), 0x13);
        assert_eq!(normalize_sample(0xFFFF, 8), 0xFF);
    }

    #[test]
    fn interleaves_and_swaps() {
        let img = JpxImage {
            width: 2,
            height: 1,
            color_space: JpxColorSpace::Srgb,
            components: vec![
                component(2, 1, vec![10, 11]),
                component(2, 1, vec![20, 21]),
                component(2, 1, vec![30, 31]),
            ],
        };

        let mut bitmap = Bitmap::new(2, 1, PixelFormat::Bgr24).unwrap();
        decode_into(&img, &mut bitmap, true, 3).unwrap();
        assert_eq!(&bitmap.data()[..6], &[30, 20, 10, 31, 21, 11]);

        let mut bitmap = Bitmap::new(2, 1, PixelFormat::Bgr24).unwrap();
        decode_into(&img, &mut bitmap, false, 3).unwrap();
        assert_eq!(&bitmap.data()[..6], &[10, 20, 30, 11, 21, 31]);
    }

    #[test]
    fn unread_channels_are_skipped() {
        let img = JpxImage {
            width: 2,
            height: 1,
            color_space: JpxColorSpace::Unspecified,
            components: vec![
                component(2, 1, vec![10, 11]),
                component(2, 1, vec![20, 21]),
                component(2, 1, vec![30, 31]),
                component(2, 1, vec![255, 255]),
            ],
        };

        let rgb = JpxConversion::new(&img, Some(&ColorSpace::DeviceRgb), false).unwrap();
        assert_eq!(rgb.output_channels(4, 3), 3);

        let mut bitmap = Bitmap::new(2, 1, PixelFormat::Bgrx32).unwrap();
        decode_into(&img, &mut bitmap, true, 3).unwrap();
        assert_eq!(&bitmap.data()[..6], &[30, 20, 10, 31, 21, 11]);

        let argb = JpxConversion::new(&img, Some(&ColorSpace::DeviceRgb), true).unwrap();
        assert_eq!(argb.output_channels(4, 3), 4);
    }

    #[test]
    fn signed_samples() {
        let mut comp = component(1, 1, vec![-128]);
        comp.signed = true;
        let img = JpxImage {
            width: 1,
            height: 1,
            color_space: JpxColorSpace::Gray,
            components: vec![comp],
        };

        let mut bitmap = Bitmap::new(1, 1, PixelFormat::Indexed8).unwrap();
        decode_into(&img, &mut bitmap, false, 1).unwrap();
        assert_eq!(bitmap.data()[0], 0);
    }

    #[test]
    fn rejects_inconsistent_channels() {
        let mut img = image(JpxColorSpace::Srgb, 3);
        img.components[1].precision = 12;
        let mut bitmap = Bitmap::new(1, 1, PixelFormat::Bgr24).unwrap();
        assert!(decode_into(&img, &mut bitmap, false, 3).is_err());

        let img = image(JpxColorSpace::Gray, 1);
        let mut bitmap = Bitmap::new(1, 1, PixelFormat::Indexed8).unwrap();
        assert!(decode_into(&img, &mut bitmap, true, 1).is_err());
        assert!(decode_into(&img, &mut bitmap, false, 2).is_err());
    }

    #[test]
    fn sycc_444() {
        let mut img = JpxImage {
            width: 1,
            height: 1,
            color_space: JpxColorSpace::Sycc,
            components: vec![
                component(1, 1, vec![100]),
                component(1, 1, vec![128]),
                component(1, 1, vec![128]),
            ],
        };
        img.normalize();

        assert_eq!(img.color_space, JpxColorSpace::Srgb);
        let rgb: Vec<i32> = img.components.iter().map(|c| c.data[0]).collect();
        assert_eq!(rgb, vec![100, 100, 100]);
    }

    #[test]
    fn subsampled_chroma_is_detected() {
        let mut chroma = component(1, 1, vec![128]);
        chroma.dx = 2;
        let mut img = JpxImage {
            width: 2,
            height: 1,
            color_space: JpxColorSpace::Unspecified,
            components: vec![component(2, 1, vec![50, 60]), chroma.clone(), chroma],
        };
        img.normalize();

        assert_eq!(img.color_space, JpxColorSpace::Srgb);
        assert_eq!(img.components[2].width, 2);
        assert_eq!(img.components[1].data, vec![50, 60]);
    }

    #[test]
    fn two_channels_are_gray() {
        let mut img = image(JpxColorSpace::Srgb, 2);
        img.normalize();
        assert_eq!(img.color_space, JpxColorSpace::Gray);
    }

    #[test]
    fn argb_with_inline_alpha() {
        let mut src = Bitmap::new(2, 1, PixelFormat::Bgrx32).unwrap();
        src.row_mut(0)
            .unwrap()
            .copy_from_slice(&[0, 0, 0, 0, 10, 20, 30, 255]);

        let (rgb, alpha) = argb_to_rgb(&src, true).unwrap();
        assert_eq!(alpha, Some(vec![0, 255]));
        assert_eq!(&rgb.data()[..6], &[255, 255, 255, 10, 20, 30]);

        let (rgb, alpha) = argb_to_rgb(&src, false).unwrap();
        assert_eq!(alpha, None);
        assert_eq!(&rgb.data()[..6], &[0, 0, 0, 10, 20, 30]);
    }

    #[test]
    fn indexed_shift() {
        let mut bitmap = Bitmap::new(2, 1, PixelFormat::Indexed8).unwrap();
        bitmap.row_mut(0).unwrap()[..2].copy_from_slice(&[0xC0, 0x40]);
        shift_indexed(&mut bitmap, 2);
        assert_eq!(&bitmap.data()[..2], &[3, 1]);
    }
}
