//! Resolving colorspace objects, optionally through resource dictionaries.

use crate::color::{
    CalGray, CalRgb, ColorSpace, DeviceN, Function, IccBased, IccProfile, Indexed, Lab,
    Separation,
};
use crate::log::{ldebug, lwarn};
use crate::object::keys::{ALTERNATE, COLOR_SPACE, N};
use crate::object::{Dict, Object};
use std::sync::Arc;

const MAX_DEPTH: u8 = 8;

/// Resolves a colorspace object, scoped to a resource dictionary.
pub trait ColorSpaceLookup {
    /// Resolve `cs`, looking up named colorspaces in `resources`.
    fn lookup(&self, cs: &Object, resources: Option<&Dict>) -> Option<ColorSpace>;
}

/// A lookup for the colorspace families of the PDF specification.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultColorSpaceLookup;

impl ColorSpaceLookup for DefaultColorSpaceLookup {
    fn lookup(&self, cs: &Object, resources: Option<&Dict>) -> Option<ColorSpace> {
        resolve(cs, resources, 0)
    }
}

fn resolve(cs: &Object, resources: Option<&Dict>, depth: u8) -> Option<ColorSpace> {
    if depth > MAX_DEPTH {
        lwarn!("colorspace nesting is too deep");

        return None;
    }

    match cs {
        Object::Name(name) => resolve_name(name, resources, depth),
        Object::Array(array) => resolve_array(array, resources, depth),
        _ => None,
    }
}

fn device_from_name(name: &str) -> Option<ColorSpace> {
    match name {
        "DeviceGray" | "G" => Some(ColorSpace::DeviceGray),
        "DeviceRGB" | "RGB" => Some(ColorSpace::DeviceRgb),
        "DeviceCMYK" | "CMYK" | "CalCMYK" => Some(ColorSpace::DeviceCmyk),
        "Pattern" => Some(ColorSpace::Pattern(None)),
        _ => None,
    }
}

fn resolve_name(name: &str, resources: Option<&Dict>, depth: u8) -> Option<ColorSpace> {
    if let Some(cs) = device_from_name(name) {
        return Some(cs);
    }

    let aliased = resources?.get::<&Dict>(COLOR_SPACE)?.get_object(name)?;
    resolve(aliased, resources, depth + 1)
}

fn resolve_array(array: &[Object], resources: Option<&Dict>, depth: u8) -> Option<ColorSpace> {
    let name = array.first()?.as_name()?;
    let arg = |idx: usize| array.get(idx);

    let cs = match name {
        "ICCBased" => {
            let stream = arg(1)?.as_stream()?;
            let dict = stream.dict();
            let components = dict.get::<u8>(N)?;

            if IccProfile::is_srgb(stream.data()) && components == 3 {
                return Some(ColorSpace::DeviceRgb);
            }

            let profile = IccProfile::new(stream.data(), components as usize);

            if profile.is_none() {
                ldebug!("falling back to alternate colorspace for ICC profile");
            }

            let alternate = dict
                .get_object(ALTERNATE)
                .and_then(|o| resolve(o, resources, depth + 1));

            if components == 0 {
                return None;
            }

            ColorSpace::IccBased(IccBased::new(components, profile, alternate))
        }
        "CalGray" => ColorSpace::CalGray(CalGray::new(arg(1)?.as_dict()?)),
        "CalRGB" => ColorSpace::CalRgb(CalRgb::new(arg(1)?.as_dict()?)),
        "CalCMYK" => ColorSpace::DeviceCmyk,
        "Lab" => ColorSpace::Lab(Lab::new(arg(1)?.as_dict()?)),
        "Indexed" | "I" => {
            let base = resolve(arg(1)?, resources, depth + 1)?;

            if matches!(base, ColorSpace::Indexed(_) | ColorSpace::Pattern(_)) {
                return None;
            }

            let hival = arg(2)?.as_int()?.clamp(0, 255) as u8;
            let lookup = arg(3)?.as_bytes()?.to_vec();

            ColorSpace::Indexed(Indexed::new(base, hival, lookup))
        }
        "Separation" => {
            let alternate = resolve(arg(2)?, resources, depth + 1)?;
            let function = Function::new(arg(3)?)?;

            ColorSpace::Separation(Separation::new(alternate, Arc::new(function)))
        }
        "DeviceN" => {
            let components = arg(1)?.as_array()?.len();
            let alternate = resolve(arg(2)?, resources, depth + 1)?;
            let function = Function::new(arg(3)?)?;

            ColorSpace::DeviceN(DeviceN::new(components, alternate, Arc::new(function))?)
        }
        "Pattern" => ColorSpace::Pattern(
            arg(1)
                .and_then(|o| resolve(o, resources, depth + 1))
                .map(Box::new),
        ),
        other => {
            if array.len() == 1 {
                return resolve_name(other, resources, depth);
            }

            lwarn!("unsupported colorspace: {}", other);

            return None;
        }
    };

    Some(cs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Family;
    use crate::object::keys::{C0, C1, DOMAIN, FUNCTION_TYPE};
    use crate::object::Stream;

    fn lookup(cs: &Object, resources: Option<&Dict>) -> Option<ColorSpace> {
        DefaultColorSpaceLookup.lookup(cs, resources)
    }

    #[test]
    fn device_names() {
        assert_eq!(
            lookup(&Object::name("DeviceRGB"), None).map(|c| c.family()),
            Some(Family::DeviceRgb)
        );
        assert_eq!(
            lookup(&Object::name("G"), None).map(|c| c.family()),
            Some(Family::DeviceGray)
        );
        assert!(lookup(&Object::name("Unknown"), None).is_none());
    }

    #[test]
    fn resource_alias() {
        let resources = Dict::new().with(
            COLOR_SPACE,
            Dict::new().with(
                "CS0",
                Object::Array(vec![
                    Object::name("Indexed"),
                    Object::name("DeviceRGB"),
                    Object::Integer(1),
                    Object::String(vec![0, 0, 0, 255, 255, 255]),
                ]),
            ),
        );

        let cs = lookup(&Object::name("CS0"), Some(&resources)).unwrap();
        assert_eq!(cs.family(), Family::Indexed);
        assert_eq!(cs.to_rgb(&[1.0]), Some([1.0, 1.0, 1.0]));
        assert!(lookup(&Object::name("CS1"), Some(&resources)).is_none());
    }

    #[test]
    fn self_referencing_alias() {
        let resources = Dict::new().with(
            COLOR_SPACE,
            Dict::new().with("Loop", Object::name("Loop")),
        );
        assert!(lookup(&Object::name("Loop"), Some(&resources)).is_none());
    }

    #[test]
    fn separation() {
        let function = Dict::new()
            .with(FUNCTION_TYPE, 2_i64)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(C0, Object::numbers(&[0.0, 0.0, 0.0, 0.0]))
            .with(C1, Object::numbers(&[0.0, 0.0, 0.0, 1.0]))
            .with(N, 1_i64);
        let cs = Object::Array(vec![
            Object::name("Separation"),
            Object::name("Black"),
            Object::name("DeviceCMYK"),
            function.into(),
        ]);

        let cs = lookup(&cs, None).unwrap();
        assert_eq!(cs.family(), Family::Separation);
        assert_eq!(cs.to_rgb(&[1.0]), Some([0.0, 0.0, 0.0]));
        assert_eq!(cs.to_rgb(&[0.0]), Some([1.0, 1.0, 1.0]));
    }

    #[test]
    fn icc_with_broken_profile_uses_alternate() {
        let stream = Stream::new(
            Dict::new()
                .with(N, 1_i64)
                .with(ALTERNATE, Object::name("DeviceGray")),
            vec![1, 2, 3],
        );
        let cs = lookup(
            &Object::Array(vec![Object::name("ICCBased"), stream.into()]),
            None,
        )
        .unwrap();

        assert_eq!(cs.family(), Family::IccBased);
        assert_eq!(cs.component_count(), 1);
        assert_eq!(cs.to_rgb(&[1.0]), Some([1.0, 1.0, 1.0]));
    }
}
