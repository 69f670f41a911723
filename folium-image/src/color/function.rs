//! The PDF functions that can act as tint transforms.

use crate::color::{TintTransform, Values};
use crate::log::OptionLog;
use crate::object::keys::{BITS_PER_SAMPLE, C0, C1, DECODE, DOMAIN, ENCODE, FUNCTION_TYPE, N, RANGE, SIZE};
use crate::object::{Dict, Object};
use folium_common::bit::{BitReader, bit_mask};
use smallvec::smallvec;

type Ranges = Vec<(f32, f32)>;

fn read_ranges(dict: &Dict, key: &str) -> Option<Ranges> {
    let values = dict.get::<Vec<f32>>(key)?;

    if values.is_empty() || values.len() % 2 != 0 {
        return None;
    }

    Some(values.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    if x_max == x_min {
        return y_min;
    }

    y_min + (x - x_min) * (y_max - y_min) / (x_max - x_min)
}

/// A function of type 0 (sampled) or type 2 (exponential).
#[derive(Debug, Clone)]
pub enum Function {
    /// A type 2 function.
    Exponential(Exponential),
    /// A type 0 function.
    Sampled(Sampled),
}

impl Function {
    /// Create a function from a function dictionary or stream.
    pub fn new(object: &Object) -> Option<Self> {
        let dict = object.as_dict()?;

        match dict.get::<u8>(FUNCTION_TYPE)? {
            0 => Sampled::new(dict, object.as_bytes()?).map(Self::Sampled),
            2 => Exponential::new(dict).map(Self::Exponential),
            _ => None.warn_none("unsupported function type"),
        }
    }

    /// Evaluate the function.
    pub fn eval(&self, input: &[f32]) -> Option<Values> {
        match self {
            Self::Exponential(e) => Some(e.eval(*input.first()?)),
            Self::Sampled(s) => s.eval(input),
        }
    }
}

impl TintTransform for Function {
    fn eval(&self, input: &[f32]) -> Option<Values> {
        Self::eval(self, input)
    }
}

/// An exponential interpolation function.
#[derive(Debug, Clone)]
pub struct Exponential {
    c0: Values,
    c1: Values,
    domain: Ranges,
    range: Option<Ranges>,
    n: f32,
}

impl Exponential {
    fn new(dict: &Dict) -> Option<Self> {
        let c0 = dict
            .get::<Vec<f32>>(C0)
            .map(Values::from_vec)
            .unwrap_or(smallvec![0.0]);
        let c1 = dict
            .get::<Vec<f32>>(C1)
            .map(Values::from_vec)
            .unwrap_or(smallvec![1.0]);
        let domain = read_ranges(dict, DOMAIN)?;
        let range = read_ranges(dict, RANGE);
        let n = dict.get::<f32>(N)?;

        Some(Self {
            c0,
            c1,
            domain,
            range,
            n,
        })
    }

    fn eval(&self, input: f32) -> Values {
        let x = input.clamp(self.domain[0].0, self.domain[0].1);

        let mut out = self
            .c0
            .iter()
            .zip(self.c1.iter())
            .map(|(c0, c1)| *c0 + x.powf(self.n) * (*c1 - *c0))
            .collect::<Values>();

        if let Some(range) = &self.range {
            for (v, r) in out.iter_mut().zip(range) {
                *v = v.clamp(r.0, r.1);
            }
        }

        out
    }
}

/// A sampled function with multilinear interpolation.
#[derive(Debug, Clone)]
pub struct Sampled {
    sizes: Vec<u32>,
    samples: Vec<u32>,
    domain: Ranges,
    range: Ranges,
    encode: Ranges,
    decode: Ranges,
    bits_per_sample: u8,
}

impl Sampled {
    fn new(dict: &Dict, data: &[u8]) -> Option<Self> {
        let bits_per_sample = dict.get::<u8>(BITS_PER_SAMPLE)?;

        if !matches!(bits_per_sample, 1 | 2 | 4 | 8 | 12 | 16 | 24 | 32) {
            return None.warn_none("unsupported bits per sample in sampled function");
        }

        let domain = read_ranges(dict, DOMAIN)?;
        let range = read_ranges(dict, RANGE)?;
        let sizes = dict
            .get::<&[Object]>(SIZE)?
            .iter()
            .map(|o| o.as_int().and_then(|i| u32::try_from(i).ok()))
            .collect::<Option<Vec<_>>>()?;

        if sizes.len() != domain.len() || sizes.contains(&0) {
            return None;
        }

        let encode = read_ranges(dict, ENCODE)
            .unwrap_or_else(|| sizes.iter().map(|s| (0.0, (*s - 1) as f32)).collect());
        let decode = read_ranges(dict, DECODE).unwrap_or_else(|| range.clone());

        let count = sizes
            .iter()
            .try_fold(range.len(), |acc, s| acc.checked_mul(*s as usize))?;

        let mut reader = BitReader::new(data);
        let samples = (0..count)
            .map(|_| reader.read(bits_per_sample))
            .collect::<Option<Vec<_>>>()
            .warn_none("sampled function has too little data")?;

        Some(Self {
            sizes,
            samples,
            domain,
            range,
            encode,
            decode,
            bits_per_sample,
        })
    }

    fn eval(&self, input: &[f32]) -> Option<Values> {
        if input.len() != self.sizes.len() {
            return None;
        }

        let m = input.len();
        let outputs = self.range.len();

        let mut floor = Vec::with_capacity(m);
        let mut frac = Vec::with_capacity(m);

        for (i, x) in input.iter().enumerate() {
            let (d0, d1) = self.domain[i];
            let (e0, e1) = self.encode.get(i).copied().unwrap_or((0.0, 0.0));
            let size = self.sizes[i];

            let e = interpolate(x.clamp(d0, d1), d0, d1, e0, e1).clamp(0.0, (size - 1) as f32);
            let f = (e.floor() as u32).min(size - 1);
            floor.push(f);
            frac.push(e - f as f32);
        }

        let mut acc: Values = smallvec![0.0; outputs];

        // Visit every corner of the surrounding hypercube.
        for corner in 0..(1_usize << m) {
            let mut weight = 1.0;
            let mut index = 0_usize;
            let mut stride = 1_usize;

            for dim in 0..m {
                let high = corner & (1 << dim) != 0;
                let coord = if high {
                    weight *= frac[dim];
                    (floor[dim] + 1).min(self.sizes[dim] - 1)
                } else {
                    weight *= 1.0 - frac[dim];
                    floor[dim]
                };

                index += coord as usize * stride;
                stride *= self.sizes[dim] as usize;
            }

            if weight == 0.0 {
                continue;
            }

            for (j, out) in acc.iter_mut().enumerate() {
                *out += weight * *self.samples.get(index * outputs + j)? as f32;
            }
        }

        let max = bit_mask(self.bits_per_sample) as f32;

        for (j, v) in acc.iter_mut().enumerate() {
            let (dmin, dmax) = self.decode.get(j).copied().unwrap_or(self.range[j]);
            *v = interpolate(*v, 0.0, max, dmin, dmax).clamp(self.range[j].0, self.range[j].1);
        }

        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Stream;

    #[test]
    fn exponential() {
        let func = Function::new(
            &Dict::new()
                .with(FUNCTION_TYPE, 2_i64)
                .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
                .with(C0, Object::numbers(&[0.0, 20.0]))
                .with(C1, Object::numbers(&[30.0, -50.0]))
                .with(N, 1_i64)
                .into(),
        )
        .unwrap();

        assert_eq!(func.eval(&[0.0]).unwrap().as_ref(), &[0.0, 20.0]);
        assert_eq!(func.eval(&[0.5]).unwrap().as_ref(), &[15.0, -15.0]);
        assert_eq!(func.eval(&[2.0]).unwrap().as_ref(), &[30.0, -50.0]);
    }

    #[test]
    fn sampled_interpolates() {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 0_i64)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(RANGE, Object::numbers(&[0.0, 1.0, 0.0, 1.0]))
            .with(SIZE, Object::Array(vec![Object::Integer(2)]))
            .with(BITS_PER_SAMPLE, 8_i64);
        let func = Function::new(&Stream::new(dict, vec![0, 255, 255, 0]).into()).unwrap();

        assert_eq!(func.eval(&[0.0]).unwrap().as_ref(), &[0.0, 1.0]);
        assert_eq!(func.eval(&[1.0]).unwrap().as_ref(), &[1.0, 0.0]);

        let mid = func.eval(&[0.5]).unwrap();
        assert!((mid[0] - 0.5).abs() < 1e-5);
        assert!((mid[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn sampled_needs_enough_data() {
        let dict = Dict::new()
            .with(FUNCTION_TYPE, 0_i64)
            .with(DOMAIN, Object::numbers(&[0.0, 1.0]))
            .with(RANGE, Object::numbers(&[0.0, 1.0]))
            .with(SIZE, Object::Array(vec![Object::Integer(4)]))
            .with(BITS_PER_SAMPLE, 8_i64);
        assert!(Function::new(&Stream::new(dict, vec![0, 1]).into()).is_none());
    }

    #[test]
    fn unsupported_type() {
        let dict = Dict::new().with(FUNCTION_TYPE, 4_i64);
        assert!(Function::new(&dict.into()).is_none());
    }
}
