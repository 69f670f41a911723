//! CIE-based colorspaces.

use crate::object::Dict;
use crate::object::keys::{BLACK_POINT, GAMMA, MATRIX, RANGE, WHITE_POINT};

/// A `CalGray` colorspace.
#[derive(Debug, Clone, PartialEq)]
pub struct CalGray {
    white_point: [f32; 3],
    black_point: [f32; 3],
    gamma: f32,
}

// See <https://github.com/mozilla/pdf.js/blob/06f44916c8936b92f464d337fe3a0a6b2b78d5b4/src/core/colorspace.js#L752>
impl CalGray {
    pub(crate) fn new(dict: &Dict) -> Self {
        let white_point = dict.get::<[f32; 3]>(WHITE_POINT).unwrap_or([1.0, 1.0, 1.0]);
        let black_point = dict.get::<[f32; 3]>(BLACK_POINT).unwrap_or([0.0, 0.0, 0.0]);
        let gamma = dict.get::<f32>(GAMMA).unwrap_or(1.0);

        Self {
            white_point,
            black_point,
            gamma,
        }
    }

    pub(crate) fn to_rgb(&self, a: f32) -> [f32; 3] {
        let _ = self.black_point;
        let yw = self.white_point[1];
        let l = yw * a.max(0.0).powf(self.gamma);
        let val = 0.0_f32.max(295.8 * l.powf(0.333_333_34) - 40.8) / 255.0;
        let val = val.min(1.0);

        [val, val, val]
    }
}

/// A `CalRGB` colorspace.
#[derive(Debug, Clone, PartialEq)]
pub struct CalRgb {
    white_point: [f32; 3],
    black_point: [f32; 3],
    matrix: [f32; 9],
    gamma: [f32; 3],
}

// See <https://github.com/mozilla/pdf.js/blob/06f44916c8936b92f464d337fe3a0a6b2b78d5b4/src/core/colorspace.js#L846>
impl CalRgb {
    pub(crate) fn new(dict: &Dict) -> Self {
        let white_point = dict.get::<[f32; 3]>(WHITE_POINT).unwrap_or([1.0, 1.0, 1.0]);
        let black_point = dict.get::<[f32; 3]>(BLACK_POINT).unwrap_or([0.0, 0.0, 0.0]);
        let matrix = dict
            .get::<[f32; 9]>(MATRIX)
            .unwrap_or([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let gamma = dict.get::<[f32; 3]>(GAMMA).unwrap_or([1.0, 1.0, 1.0]);

        Self {
            white_point,
            black_point,
            matrix,
            gamma,
        }
    }

    pub(crate) fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        let [r, g, b] = match input {
            [r, g, b, ..] => [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)],
            _ => return None,
        };

        let [gr, gg, gb] = self.gamma;
        let [agr, bgg, cgb] = [
            if r == 1.0 { 1.0 } else { r.powf(gr) },
            if g == 1.0 { 1.0 } else { g.powf(gg) },
            if b == 1.0 { 1.0 } else { b.powf(gb) },
        ];

        let m = &self.matrix;
        let xyz = [
            m[0] * agr + m[3] * bgg + m[6] * cgb,
            m[1] * agr + m[4] * bgg + m[7] * cgb,
            m[2] * agr + m[5] * bgg + m[8] * cgb,
        ];

        Some(xyz_to_srgb(&self.white_point, &self.black_point, &xyz))
    }
}

/// A `Lab` colorspace.
#[derive(Debug, Clone, PartialEq)]
pub struct Lab {
    white_point: [f32; 3],
    range: [f32; 4],
}

impl Lab {
    pub(crate) fn new(dict: &Dict) -> Self {
        let white_point = dict.get::<[f32; 3]>(WHITE_POINT).unwrap_or([1.0, 1.0, 1.0]);
        let range = dict
            .get::<[f32; 4]>(RANGE)
            .unwrap_or([-100.0, 100.0, -100.0, 100.0]);

        Self { white_point, range }
    }

    /// The ranges of the `a*` and `b*` components.
    pub fn range(&self) -> [f32; 4] {
        self.range
    }

    pub(crate) fn to_rgb(&self, input: &[f32]) -> Option<[f32; 3]> {
        let [l, a, b] = match input {
            [l, a, b, ..] => [
                l.clamp(0.0, 100.0),
                a.clamp(self.range[0], self.range[1]),
                b.clamp(self.range[2], self.range[3]),
            ],
            _ => return None,
        };

        let m = (l + 16.0) / 116.0;
        let x = lab_inverse(m + a / 500.0) * self.white_point[0];
        let y = lab_inverse(m) * self.white_point[1];
        let z = lab_inverse(m - b / 200.0) * self.white_point[2];

        Some(xyz_to_srgb(&self.white_point, &[0.0; 3], &[x, y, z]))
    }
}

fn lab_inverse(v: f32) -> f32 {
    if v >= 6.0 / 29.0 {
        v * v * v
    } else {
        (108.0 / 841.0) * (v - 4.0 / 29.0)
    }
}

const BRADFORD_SCALE_MATRIX: [f32; 9] = [
    0.8951, 0.2664, -0.1614, -0.7502, 1.7135, 0.0367, 0.0389, -0.0685, 1.0296,
];

const BRADFORD_SCALE_INVERSE_MATRIX: [f32; 9] = [
    0.9869929, -0.1470543, 0.1599627, 0.4323053, 0.5183603, 0.0492912, -0.0085287, 0.0400428,
    0.9684867,
];

const SRGB_D65_XYZ_TO_RGB_MATRIX: [f32; 9] = [
    3.2404542, -1.5371385, -0.4985314, -0.969_266, 1.8760108, 0.0415560, 0.0556434, -0.2040259,
    1.0572252,
];

const FLAT_WHITEPOINT: [f32; 3] = [1.0, 1.0, 1.0];
const D65_WHITEPOINT: [f32; 3] = [0.95047, 1.0, 1.08883];

fn xyz_to_srgb(white_point: &[f32; 3], black_point: &[f32; 3], xyz: &[f32; 3]) -> [f32; 3] {
    let xyz_flat = normalize_white_point_to_flat(white_point, xyz);
    let xyz_black = compensate_black_point(black_point, &xyz_flat);
    let xyz_d65 = normalize_white_point_to_d65(&FLAT_WHITEPOINT, &xyz_black);
    let srgb = matrix_product(&SRGB_D65_XYZ_TO_RGB_MATRIX, &xyz_d65);

    srgb.map(srgb_transfer_function)
}

fn decode_l_constant() -> f32 {
    ((8.0_f32 + 16.0) / 116.0).powi(3) / 8.0
}

fn srgb_transfer_function(color: f32) -> f32 {
    if color <= 0.0031308 {
        (12.92 * color).clamp(0.0, 1.0)
    } else if color >= 0.99554525 {
        1.0
    } else {
        ((1.0 + 0.055) * color.powf(1.0 / 2.4) - 0.055).clamp(0.0, 1.0)
    }
}

fn matrix_product(a: &[f32; 9], b: &[f32; 3]) -> [f32; 3] {
    [
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2],
        a[3] * b[0] + a[4] * b[1] + a[5] * b[2],
        a[6] * b[0] + a[7] * b[1] + a[8] * b[2],
    ]
}

fn decode_l(l: f32) -> f32 {
    if l < 0.0 {
        -decode_l(-l)
    } else if l > 8.0 {
        ((l + 16.0) / 116.0).powi(3)
    } else {
        l * decode_l_constant()
    }
}

fn compensate_black_point(source_bp: &[f32; 3], xyz_flat: &[f32; 3]) -> [f32; 3] {
    if source_bp == &[0.0, 0.0, 0.0] {
        return *xyz_flat;
    }

    let zero_decode_l = decode_l(0.0);

    let mut out = [0.0; 3];
    for i in 0..3 {
        let src = decode_l(source_bp[i]);
        let scale = (1.0 - zero_decode_l) / (1.0 - src);
        let offset = 1.0 - scale;
        out[i] = xyz_flat[i] * scale + offset;
    }

    out
}

fn normalize_white_point_to_flat(source_white_point: &[f32; 3], xyz: &[f32; 3]) -> [f32; 3] {
    if source_white_point[0] == 1.0 && source_white_point[2] == 1.0 {
        return *xyz;
    }

    let lms = matrix_product(&BRADFORD_SCALE_MATRIX, xyz);
    let lms_flat = [
        lms[0] / source_white_point[0],
        lms[1] / source_white_point[1],
        lms[2] / source_white_point[2],
    ];
    matrix_product(&BRADFORD_SCALE_INVERSE_MATRIX, &lms_flat)
}

fn normalize_white_point_to_d65(source_white_point: &[f32; 3], xyz: &[f32; 3]) -> [f32; 3] {
    let lms = matrix_product(&BRADFORD_SCALE_MATRIX, xyz);
    let lms_d65 = [
        lms[0] * D65_WHITEPOINT[0] / source_white_point[0],
        lms[1] * D65_WHITEPOINT[1] / source_white_point[1],
        lms[2] * D65_WHITEPOINT[2] / source_white_point[2],
    ];
    matrix_product(&BRADFORD_SCALE_INVERSE_MATRIX, &lms_d65)
}
