//! ICC-based colorspaces.

use crate::color::ColorSpace;
use crate::log::lwarn;
use moxcms::{ColorProfile, Layout, Transform8BitExecutor, TransformOptions};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

struct IccRepr {
    transform: Arc<Transform8BitExecutor>,
    components: usize,
}

/// A parsed ICC profile with a transform into sRGB.
#[derive(Clone)]
pub struct IccProfile(Arc<IccRepr>);

impl Debug for IccProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IccProfile {{ components: {} }}", self.0.components)
    }
}

impl IccProfile {
    /// Parse the profile and build a transform for `components` inputs.
    pub fn new(profile: &[u8], components: usize) -> Option<Self> {
        let src_profile = ColorProfile::new_from_slice(profile).ok()?;
        let dest_profile = ColorProfile::new_srgb();

        let src_layout = match components {
            1 => Layout::Gray,
            3 => Layout::Rgb,
            4 => Layout::Rgba,
            _ => {
                lwarn!("unsupported number of components {components} for ICC profile");

                return None;
            }
        };

        let transform = src_profile
            .create_transform_8bit(
                src_layout,
                &dest_profile,
                Layout::Rgb,
                TransformOptions::default(),
            )
            .ok()?;

        Some(Self(Arc::new(IccRepr {
            transform,
            components,
        })))
    }

    /// Whether the device model of the profile is `sRGB`.
    pub fn is_srgb(profile: &[u8]) -> bool {
        const SRGB_MARKER: &[u8] = b"sRGB";

        profile
            .get(52..56)
            .is_some_and(|device_model| device_model == SRGB_MARKER)
    }

    /// Convert interleaved 8-bit samples into interleaved RGB.
    pub fn convert_u8(&self, input: &[u8], output: &mut [u8]) -> Option<()> {
        self.0.transform.transform(input, output).ok()
    }

    fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        let mut src = [0_u8; 4];

        for (s, v) in src.iter_mut().zip(input.iter().take(self.0.components)) {
            *s = (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
        }

        let mut out = [0_u8; 3];
        self.convert_u8(&src[..self.0.components], &mut out)?;

        Some(out.map(|v| v as f32 / 255.0))
    }
}

/// An `ICCBased` colorspace.
#[derive(Debug, Clone)]
pub struct IccBased {
    components: u8,
    profile: Option<IccProfile>,
    alternate: Option<Box<ColorSpace>>,
}

impl IccBased {
    pub(crate) fn new(
        components: u8,
        profile: Option<IccProfile>,
        alternate: Option<ColorSpace>,
    ) -> Self {
        Self {
            components,
            profile,
            alternate: alternate.map(Box::new),
        }
    }

    /// The number of components declared by `/N`.
    pub fn components(&self) -> u8 {
        self.components
    }

    /// The parsed profile, if it could be used.
    pub fn profile(&self) -> Option<&IccProfile> {
        self.profile.as_ref()
    }

    /// The same colorspace without the profile, converting through the
    /// alternate or device colorspace instead.
    pub(crate) fn without_profile(&self) -> Self {
        Self {
            components: self.components,
            profile: None,
            alternate: self.alternate.clone(),
        }
    }

    fn fallback(&self) -> Option<ColorSpace> {
        if let Some(alternate) = &self.alternate
            && alternate.component_count() == u32::from(self.components)
        {
            return Some(alternate.as_ref().clone());
        }

        match self.components {
            1 => Some(ColorSpace::DeviceGray),
            3 => Some(ColorSpace::DeviceRgb),
            4 => Some(ColorSpace::DeviceCmyk),
            _ => None,
        }
    }

    pub(crate) fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        if let Some(profile) = &self.profile {
            return profile.to_rgb(input);
        }

        self.fallback()?.to_rgb(input)
    }
}
