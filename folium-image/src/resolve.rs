//! Resolving the color information of an image dictionary.
//!
//! This covers the component count and family of the image colorspace, the
//! per-component decode ranges, color key ranges and the palette used for
//! images with at most eight bits per pixel.

use crate::color::{ColorSpace, ColorSpaceLookup, Family};
use crate::error::{ColorError, ImageError, Result, bail};
use crate::log::lwarn;
use crate::object::keys::{BITS_PER_COMPONENT, COLOR_SPACE, DECODE, IMAGE_MASK, MASK, SMASK};
use crate::object::{Dict, ImageFilter, Object};

/// The decode range and color key range of a single component.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentData {
    /// The value a sample of 0 decodes to.
    pub decode_min: f32,
    /// The increment per sample value.
    pub decode_step: f32,
    /// The lowest sample value that is masked out by a color key.
    pub key_min: u32,
    /// The highest sample value that is masked out by a color key.
    pub key_max: u32,
}

/// Whether `bpc` is a sample depth images may declare.
pub fn is_allowed_bpc(bpc: u32) -> bool {
    matches!(bpc, 1 | 2 | 4 | 8 | 16)
}

/// Encode an opaque ARGB value from RGB components between 0 and 1.
pub(crate) fn argb_from_rgb(alpha: u8, rgb: [f32; 3]) -> u32 {
    let [r, g, b] = rgb.map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u32);

    (u32::from(alpha) << 24) | (r << 16) | (g << 8) | b
}

/// The resolved color information of an image.
#[derive(Debug, Clone, Default)]
pub struct ColorInfo {
    /// The resolved colorspace, `None` for image masks and for JPEG 2000
    /// images without a `/ColorSpace` entry.
    pub color_space: Option<ColorSpace>,
    /// The family of the colorspace.
    pub family: Option<Family>,
    /// The number of components per pixel.
    pub components: u32,
    /// The bits per component after filter-specific adjustments.
    pub bpc: u32,
    /// The bits per component declared in the dictionary.
    pub bpc_orig: u32,
    /// Whether the image is a stencil mask.
    pub image_mask: bool,
    /// Whether every component uses the default decode range.
    pub default_decode: bool,
    /// Whether the bit depth and component count still need to be validated.
    pub do_bpc_check: bool,
    /// Whether a `/Mask` array specifies a color key.
    pub color_key: bool,
    /// Per-component decode and color key data.
    pub comp_data: Vec<ComponentData>,
}

impl ColorInfo {
    /// Resolve the color information of an image dictionary.
    ///
    /// `filter` is the terminal filter of the image stream. Named colorspaces
    /// are looked up in `form_resources` first and in `page_resources`
    /// second.
    pub fn resolve(
        dict: &Dict,
        filter: Option<ImageFilter>,
        lookup: &dyn ColorSpaceLookup,
        form_resources: Option<&Dict>,
        page_resources: Option<&Dict>,
    ) -> Result<Self> {
        let bpc_orig = dict.get::<i64>(BITS_PER_COMPONENT).unwrap_or(0);

        if !(0..=16).contains(&bpc_orig) {
            bail!(ImageError::InvalidBitDepth);
        }

        let bpc_orig = bpc_orig as u32;
        let image_mask = dict.get::<bool>(IMAGE_MASK).unwrap_or(false);

        let mut info = Self {
            color_space: None,
            family: None,
            components: 0,
            bpc: 0,
            bpc_orig,
            image_mask,
            default_decode: true,
            do_bpc_check: true,
            color_key: false,
            comp_data: vec![],
        };

        if image_mask || !dict.contains(COLOR_SPACE) {
            if !image_mask && filter == Some(ImageFilter::Jpx) {
                info.do_bpc_check = false;

                return Ok(info);
            }

            info.image_mask = true;
            info.bpc = 1;
            info.components = 1;
            info.default_decode = dict
                .get::<&[Object]>(DECODE)
                .is_none_or(|d| d.first().and_then(Object::as_int).unwrap_or(0) == 0);

            return Ok(info);
        }

        let Some(cs_object) = dict.get_object(COLOR_SPACE) else {
            bail!(ColorError::Unresolved);
        };

        let color_space = form_resources
            .and_then(|r| lookup.lookup(cs_object, Some(r)))
            .or_else(|| lookup.lookup(cs_object, page_resources));

        let Some(color_space) = color_space else {
            lwarn!("failed to resolve image colorspace");

            bail!(ColorError::Unresolved);
        };

        let family = color_space.family();
        let mut components = color_space.component_count();

        if family == Family::IccBased {
            match cs_object.as_name() {
                Some("DeviceGray") => components = 1,
                Some("DeviceRGB") => components = 3,
                Some("DeviceCMYK") => components = 4,
                _ => {}
            }
        }

        info.color_space = Some(color_space);
        info.family = Some(family);
        info.components = components;

        info.validate_filter(filter)?;
        info.component_data(dict)?;

        Ok(info)
    }

    fn validate_filter(&mut self, filter: Option<ImageFilter>) -> Result<()> {
        self.bpc = self.bpc_orig;

        match filter {
            Some(ImageFilter::Jpx) => {
                self.do_bpc_check = false;

                return Ok(());
            }
            Some(ImageFilter::CcittFax | ImageFilter::Jbig2) => {
                self.bpc = 1;
                self.components = 1;
            }
            Some(ImageFilter::Dct) => self.bpc = 8,
            _ => {}
        }

        if !is_allowed_bpc(self.bpc) {
            self.bpc = 0;

            bail!(ImageError::InvalidBitDepth);
        }

        Ok(())
    }

    /// Compute the decode ranges and color key ranges of every component.
    pub fn component_data(&mut self, dict: &Dict) -> Result<()> {
        let Some(color_space) = &self.color_space else {
            bail!(ColorError::Unresolved);
        };

        let max_data = ((1_u64 << self.bpc.min(32)) - 1) as u32;
        let is_indexed = self.family == Some(Family::Indexed);
        let defaults = color_space.default_ranges(self.bpc.min(16) as u8);
        let default_range = |i: usize| defaults.get(i).copied().unwrap_or((0.0, 1.0));

        self.comp_data = vec![ComponentData::default(); self.components as usize];

        if let Some(decode) = dict.get::<&[Object]>(DECODE) {
            let value = |i: usize| decode.get(i).and_then(Object::as_f32).unwrap_or(0.0);

            for (i, data) in self.comp_data.iter_mut().enumerate() {
                let min = value(i * 2);
                let max = value(i * 2 + 1);
                data.decode_min = min;
                data.decode_step = (max - min) / max_data as f32;

                let (def_min, mut def_max) = default_range(i);

                if is_indexed {
                    def_max = max_data as f32;
                }

                if def_min != min || def_max != max {
                    self.default_decode = false;
                }
            }
        } else {
            for (i, data) in self.comp_data.iter_mut().enumerate() {
                let (min, mut max) = default_range(i);

                if is_indexed {
                    max = max_data as f32;
                }

                data.decode_min = min;
                data.decode_step = (max - min) / max_data as f32;
            }
        }

        if dict.contains(SMASK) {
            return Ok(());
        }

        if let Some(Object::Array(mask)) = dict.get_object(MASK) {
            if mask.len() >= self.comp_data.len() * 2 {
                let value = |i: usize| mask.get(i).and_then(Object::as_int).unwrap_or(0);

                for (i, data) in self.comp_data.iter_mut().enumerate() {
                    data.key_min = value(i * 2).max(0) as u32;
                    data.key_max = value(i * 2 + 1).clamp(0, i64::from(max_data)) as u32;
                }
            }

            self.color_key = true;
        }

        Ok(())
    }

    /// The number of bits per pixel.
    pub fn bpp(&self) -> u32 {
        self.bpc * self.components
    }

    /// Build the ARGB palette for images with at most eight bits per pixel.
    ///
    /// Returns `None` when no palette is needed.
    pub fn build_palette(&self) -> Option<Vec<u32>> {
        let color_space = self.color_space.as_ref()?;

        if self.family == Some(Family::Pattern) || self.bpc == 0 {
            return None;
        }

        let bits = self.bpc.checked_mul(self.components).unwrap_or(255);

        if bits > 8 {
            return None;
        }

        let first = self.comp_data.first()?;

        if bits == 1 {
            if self.default_decode
                && matches!(self.family, Some(Family::DeviceGray | Family::DeviceRgb))
            {
                return None;
            }

            if color_space.component_count() > 3 {
                return None;
            }

            let mut values = [first.decode_min; 3];
            let argb0 = argb_from_rgb(0xFF, color_space.rgb_or_black(&values));

            let argb1 = match color_space {
                ColorSpace::Indexed(indexed) if indexed.hival() == 0 => 0xFF000000,
                _ => {
                    for v in &mut values {
                        *v += first.decode_step;
                    }

                    argb_from_rgb(0xFF, color_space.rgb_or_black(&values))
                }
            };

            if argb0 != 0xFF000000 || argb1 != 0xFFFFFFFF {
                return Some(vec![argb0, argb1]);
            }

            return None;
        }

        if self.bpc == 8 && self.default_decode && matches!(color_space, ColorSpace::DeviceGray) {
            return None;
        }

        let cs_components = color_space.component_count() as usize;
        let replicate = self.components == 1
            && self.family == Some(Family::IccBased)
            && cs_components > 1;
        let mut values = vec![0.0; (self.components as usize).max(cs_components)];

        let palette = (0..1_u32 << bits)
            .map(|i| {
                let mut color_data = i;

                for (value, data) in values.iter_mut().zip(&self.comp_data) {
                    let encoded = color_data % (1 << self.bpc);
                    color_data /= 1 << self.bpc;
                    *value = data.decode_min + data.decode_step * encoded as f32;
                }

                let rgb = if replicate {
                    color_space.rgb_or_black(&vec![values[0]; cs_components])
                } else {
                    color_space.rgb_or_black(&values)
                };

                argb_from_rgb(0xFF, rgb)
            })
            .collect();

        Some(palette)
    }

    /// The ARGB value of set bits in 1-bit color keyed output.
    pub fn set_value(&self, palette: Option<&[u32]>) -> u32 {
        if self.comp_data.first().is_some_and(|d| d.key_max == 1) {
            return 0;
        }

        palette.and_then(|p| p.get(1).copied()).unwrap_or(0xFFFFFFFF)
    }

    /// The ARGB value of unset bits in 1-bit color keyed output.
    pub fn reset_value(&self, palette: Option<&[u32]>) -> u32 {
        if self.comp_data.first().is_some_and(|d| d.key_min == 0) {
            return 0;
        }

        palette.and_then(|p| p.first().copied()).unwrap_or(0xFF000000)
    }
}
