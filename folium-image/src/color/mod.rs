//! PDF colorspaces and their conversion into sRGB.

mod cal;
mod function;
mod icc;
mod lookup;

pub use cal::{CalGray, CalRgb, Lab};
pub use function::{Exponential, Function, Sampled};
pub use icc::{IccBased, IccProfile};
pub use lookup::{ColorSpaceLookup, DefaultColorSpaceLookup};

use smallvec::{SmallVec, smallvec};
use std::fmt::Debug;
use std::sync::Arc;

/// A storage for color components.
pub type Values = SmallVec<[f32; 4]>;

/// The family of a colorspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// `DeviceGray`.
    DeviceGray,
    /// `DeviceRGB`.
    DeviceRgb,
    /// `DeviceCMYK`.
    DeviceCmyk,
    /// `CalGray`.
    CalGray,
    /// `CalRGB`.
    CalRgb,
    /// `Lab`.
    Lab,
    /// `ICCBased`.
    IccBased,
    /// `Indexed`.
    Indexed,
    /// `Separation`.
    Separation,
    /// `DeviceN`.
    DeviceN,
    /// `Pattern`.
    Pattern,
}

/// A function mapping the components of a `Separation` or `DeviceN`
/// colorspace into its alternate colorspace.
pub trait TintTransform: Debug + Send + Sync {
    /// Evaluate the transform, returning `None` if it fails.
    fn eval(&self, input: &[f32]) -> Option<Values>;
}

/// A PDF colorspace.
#[derive(Debug, Clone)]
pub enum ColorSpace {
    /// `DeviceGray`.
    DeviceGray,
    /// `DeviceRGB`.
    DeviceRgb,
    /// `DeviceCMYK`.
    DeviceCmyk,
    /// `CalGray`.
    CalGray(CalGray),
    /// `CalRGB`.
    CalRgb(CalRgb),
    /// `Lab`.
    Lab(Lab),
    /// `ICCBased`.
    IccBased(IccBased),
    /// `Indexed`.
    Indexed(Indexed),
    /// `Separation`.
    Separation(Separation),
    /// `DeviceN`.
    DeviceN(DeviceN),
    /// `Pattern`, with an optional underlying colorspace.
    Pattern(Option<Box<ColorSpace>>),
}

impl ColorSpace {
    /// The family of the colorspace.
    pub fn family(&self) -> Family {
        match self {
            Self::DeviceGray => Family::DeviceGray,
            Self::DeviceRgb => Family::DeviceRgb,
            Self::DeviceCmyk => Family::DeviceCmyk,
            Self::CalGray(_) => Family::CalGray,
            Self::CalRgb(_) => Family::CalRgb,
            Self::Lab(_) => Family::Lab,
            Self::IccBased(_) => Family::IccBased,
            Self::Indexed(_) => Family::Indexed,
            Self::Separation(_) => Family::Separation,
            Self::DeviceN(_) => Family::DeviceN,
            Self::Pattern(_) => Family::Pattern,
        }
    }

    /// The number of components of a color in this colorspace.
    pub fn component_count(&self) -> u32 {
        match self {
            Self::DeviceGray | Self::CalGray(_) | Self::Indexed(_) | Self::Separation(_) => 1,
            Self::DeviceRgb | Self::CalRgb(_) | Self::Lab(_) => 3,
            Self::DeviceCmyk => 4,
            Self::IccBased(i) => u32::from(i.components()),
            Self::DeviceN(d) => d.components as u32,
            Self::Pattern(p) => p.as_ref().map_or(1, |p| p.component_count()),
        }
    }

    /// The default decode range of every component for samples with `bpc`
    /// bits.
    pub fn default_ranges(&self, bpc: u8) -> SmallVec<[(f32, f32); 4]> {
        match self {
            Self::Indexed(_) => smallvec![(0.0, ((1_u32 << bpc.min(16)) - 1) as f32)],
            Self::Lab(l) => {
                let r = l.range();
                smallvec![(0.0, 100.0), (r[0], r[1]), (r[2], r[3])]
            }
            _ => smallvec![(0.0, 1.0); self.component_count() as usize],
        }
    }

    /// The initial color of the colorspace.
    pub fn initial_color(&self) -> Values {
        match self {
            Self::DeviceCmyk => smallvec![0.0, 0.0, 0.0, 1.0],
            Self::IccBased(i) if i.components() == 4 => smallvec![0.0, 0.0, 0.0, 1.0],
            Self::Separation(_) => smallvec![1.0],
            Self::DeviceN(d) => smallvec![1.0; d.components],
            _ => smallvec![0.0; self.component_count() as usize],
        }
    }

    /// Convert a color into RGB components between 0 and 1.
    pub fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        match self {
            Self::DeviceGray => {
                let v = input.first()?.clamp(0.0, 1.0);
                Some([v, v, v])
            }
            Self::DeviceRgb => match input {
                [r, g, b, ..] => Some([r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]),
                _ => None,
            },
            Self::DeviceCmyk => match input {
                [c, m, y, k, ..] => {
                    let k = 1.0 - k.clamp(0.0, 1.0);
                    Some([
                        (1.0 - c.clamp(0.0, 1.0)) * k,
                        (1.0 - m.clamp(0.0, 1.0)) * k,
                        (1.0 - y.clamp(0.0, 1.0)) * k,
                    ])
                }
                _ => None,
            },
            Self::CalGray(c) => Some(c.to_rgb(*input.first()?)),
            Self::CalRgb(c) => c.to_rgb(input),
            Self::Lab(l) => l.to_rgb(input),
            Self::IccBased(i) => i.to_rgb(input),
            Self::Indexed(i) => i.to_rgb(*input.first()?),
            Self::Separation(s) => s.to_rgb(input),
            Self::DeviceN(d) => d.to_rgb(input),
            Self::Pattern(p) => p.as_ref()?.to_rgb(input),
        }
    }

    /// Like [`ColorSpace::to_rgb`], but black if the conversion fails.
    pub fn rgb_or_black(&self, input: &[f32]) -> [f32; 3] {
        self.to_rgb(input).unwrap_or([0.0; 3])
    }

    /// Translate `pixels` pixels of 8-bit samples with the default decode
    /// ranges into BGR bytes.
    pub fn translate_row(&self, src: &[u8], pixels: usize, dst: &mut [u8]) {
        let comps = self.component_count() as usize;

        if comps == 0 {
            return;
        }

        if let Self::IccBased(icc) = self
            && let Some(profile) = icc.profile()
            && let Some(src) = src.get(..pixels * comps)
        {
            let mut rgb = vec![0_u8; pixels * 3];

            if profile.convert_u8(src, &mut rgb).is_some() {
                for (out, px) in dst.chunks_exact_mut(3).zip(rgb.chunks_exact(3)) {
                    out.copy_from_slice(&[px[2], px[1], px[0]]);
                }

                return;
            }
        }

        let mut values: Values = smallvec![0.0; comps];

        for (out, px) in dst
            .chunks_exact_mut(3)
            .zip(src.chunks_exact(comps))
            .take(pixels)
        {
            for (v, s) in values.iter_mut().zip(px) {
                *v = *s as f32 / 255.0;
            }

            let [r, g, b] = self.rgb_or_black(&values);
            out.copy_from_slice(&[to_u8(b), to_u8(g), to_u8(r)]);
        }
    }

    /// Return a colorspace that converts `ICCBased` colors through their
    /// device fallback instead of the embedded profile.
    pub fn with_std_conversion(self) -> Self {
        match self {
            Self::IccBased(i) => Self::IccBased(i.without_profile()),
            other => other,
        }
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// An `Indexed` colorspace.
#[derive(Debug, Clone)]
pub struct Indexed {
    base: Box<ColorSpace>,
    hival: u8,
    lookup: Vec<u8>,
}

impl Indexed {
    /// Create a new indexed colorspace.
    pub fn new(base: ColorSpace, hival: u8, lookup: Vec<u8>) -> Self {
        Self {
            base: Box::new(base),
            hival,
            lookup,
        }
    }

    /// The base colorspace.
    pub fn base(&self) -> &ColorSpace {
        &self.base
    }

    /// The highest valid index.
    pub fn hival(&self) -> u8 {
        self.hival
    }

    fn to_rgb(&self, input: f32) -> Option<[f32; 3]> {
        let idx = (input.clamp(0.0, self.hival as f32) + 0.5) as usize;
        let comps = self.base.component_count() as usize;
        let entry = self.lookup.get(idx * comps..(idx + 1) * comps)?;
        let ranges = self.base.default_ranges(8);

        let values = entry
            .iter()
            .zip(ranges.iter())
            .map(|(b, (min, max))| min + *b as f32 / 255.0 * (max - min))
            .collect::<Values>();

        self.base.to_rgb(&values)
    }
}

/// A `Separation` colorspace.
#[derive(Debug, Clone)]
pub struct Separation {
    alternate: Box<ColorSpace>,
    tint_transform: Arc<dyn TintTransform>,
}

impl Separation {
    /// Create a new separation colorspace.
    pub fn new(alternate: ColorSpace, tint_transform: Arc<dyn TintTransform>) -> Self {
        Self {
            alternate: Box::new(alternate),
            tint_transform,
        }
    }

    fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        let evaluated = self
            .tint_transform
            .eval(input.get(..1)?)
            .unwrap_or_else(|| self.alternate.initial_color());
        self.alternate.to_rgb(&evaluated)
    }
}

/// A `DeviceN` colorspace.
#[derive(Debug, Clone)]
pub struct DeviceN {
    alternate: Box<ColorSpace>,
    components: usize,
    tint_transform: Arc<dyn TintTransform>,
}

impl DeviceN {
    /// Create a new `DeviceN` colorspace with `components` colorants.
    pub fn new(
        components: usize,
        alternate: ColorSpace,
        tint_transform: Arc<dyn TintTransform>,
    ) -> Option<Self> {
        if components == 0 {
            return None;
        }

        Some(Self {
            alternate: Box::new(alternate),
            components,
            tint_transform,
        })
    }

    fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        let evaluated = self
            .tint_transform
            .eval(input.get(..self.components)?)
            .unwrap_or_else(|| self.alternate.initial_color());
        self.alternate.to_rgb(&evaluated)
    }
}
