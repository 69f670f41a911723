//! PNG and TIFF predictors applied after Flate decoding.

use crate::log::lwarn;
use crate::object::Dict;
use crate::object::keys::{BITS_PER_COMPONENT, COLORS, COLUMNS, PREDICTOR};
use folium_common::bit::{BitReader, BitWriter, bit_mask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PredictorParams {
    predictor: u8,
    colors: u8,
    bits_per_component: u8,
    columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub(crate) fn from_params(dict: &Dict) -> Self {
        let dp = Self::default();

        Self {
            predictor: dict.get(PREDICTOR).unwrap_or(dp.predictor),
            colors: dict.get(COLORS).unwrap_or(dp.colors),
            bits_per_component: dict.get(BITS_PER_COMPONENT).unwrap_or(dp.bits_per_component),
            columns: dict.get(COLUMNS).unwrap_or(dp.columns),
        }
    }

    fn bits_per_pixel(&self) -> usize {
        self.bits_per_component as usize * self.colors as usize
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel().div_ceil(8).max(1)
    }

    fn row_length_in_bytes(&self) -> usize {
        (self.columns * self.bits_per_pixel()).div_ceil(8)
    }
}

/// Undo the predictor. Returns `None` for unsupported predictors or
/// parameters.
pub(crate) fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    match params.predictor {
        1 => Some(data),
        2 => apply_tiff(data, params),
        10..=15 => apply_png(&data, params),
        other => {
            lwarn!("unknown predictor {}", other);

            None
        }
    }
}

fn apply_png(data: &[u8], params: &PredictorParams) -> Option<Vec<u8>> {
    let row_len = params.row_length_in_bytes();

    if row_len == 0 {
        return None;
    }

    let bpp = params.bytes_per_pixel();
    // Every row starts with the tag of the filter it uses.
    let num_rows = data.len() / (row_len + 1);
    let mut out = vec![0; num_rows * row_len];
    let mut prev_row = vec![0; row_len];

    for (row, input) in data.chunks_exact(row_len + 1).enumerate() {
        let (tag, input) = (input[0], &input[1..]);
        let out_row = &mut out[row * row_len..(row + 1) * row_len];

        for i in 0..row_len {
            let left = if i >= bpp { out_row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };

            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => {
                    lwarn!("invalid PNG filter type {}", tag);

                    return None;
                }
            };

            out_row[i] = input[i].wrapping_add(predicted);
        }

        prev_row.copy_from_slice(out_row);
    }

    if data.len() % (row_len + 1) != 0 {
        lwarn!("PNG predictor data ends with a partial row");
    }

    Some(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn apply_tiff(mut data: Vec<u8>, params: &PredictorParams) -> Option<Vec<u8>> {
    let row_len = params.row_length_in_bytes();
    let colors = params.colors as usize;

    if row_len == 0 || colors == 0 {
        return None;
    }

    match params.bits_per_component {
        8 => {
            for row in data.chunks_exact_mut(row_len) {
                for i in colors..row_len {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
        }
        16 => {
            for row in data.chunks_exact_mut(row_len) {
                for i in (colors * 2..row_len.saturating_sub(1)).step_by(2) {
                    let prev = u16::from_be_bytes([row[i - colors * 2], row[i - colors * 2 + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    row[i..i + 2].copy_from_slice(&cur.wrapping_add(prev).to_be_bytes());
                }
            }
        }
        bpc @ (1 | 2 | 4) => {
            let mask = bit_mask(bpc);

            for row in data.chunks_exact_mut(row_len) {
                let input = row.to_vec();
                let mut reader = BitReader::new(&input);
                let mut writer = BitWriter::new(row, bpc)?;
                let mut prev = vec![0_u32; colors];

                for _ in 0..params.columns {
                    for p in prev.iter_mut() {
                        let value = (reader.read(bpc)? + *p) & mask;
                        writer.write(value)?;
                        *p = value;
                    }
                }
            }
        }
        _ => return None,
    }

    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(predictor: u8, colors: u8, bpc: u8, columns: usize) -> PredictorParams {
        PredictorParams {
            predictor,
            colors,
            bits_per_component: bpc,
            columns,
        }
    }

    #[test]
    fn png_up() {
        let data = vec![2, 1, 2, 3, 2, 1, 1, 1];
        let out = apply_predictor(data, &params(12, 1, 8, 3)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn png_mixed_tags() {
        let data = vec![1, 10, 5, 5, 0, 1, 2, 3, 4, 1, 1, 1, 3, 2, 2, 2];
        let out = apply_predictor(data, &params(15, 1, 8, 3)).unwrap();
        assert_eq!(out, vec![10, 15, 20, 1, 2, 3, 2, 3, 4, 3, 5, 6]);
    }

    #[test]
    fn png_paeth() {
        assert_eq!(paeth(10, 20, 10), 20);
        assert_eq!(paeth(20, 10, 10), 20);
        assert_eq!(paeth(5, 5, 5), 5);
    }

    #[test]
    fn png_invalid_tag() {
        assert!(apply_predictor(vec![9, 1, 2], &params(10, 1, 8, 2)).is_none());
    }

    #[test]
    fn tiff_8_bit() {
        let data = vec![10, 20, 1, 1, 2, 2];
        let out = apply_predictor(data, &params(2, 2, 8, 3)).unwrap();
        assert_eq!(out, vec![10, 20, 11, 21, 13, 23]);
    }

    #[test]
    fn tiff_16_bit() {
        let data = vec![0x01, 0x00, 0x00, 0x10];
        let out = apply_predictor(data, &params(2, 1, 16, 2)).unwrap();
        assert_eq!(out, vec![0x01, 0x00, 0x01, 0x10]);
    }

    #[test]
    fn tiff_1_bit() {
        let data = vec![0b1000_0000];
        let out = apply_predictor(data, &params(2, 1, 1, 8)).unwrap();
        assert_eq!(out, vec![0xFF]);
    }

    #[test]
    fn unknown_predictor() {
        assert!(apply_predictor(vec![1], &params(7, 1, 8, 1)).is_none());
    }
}
