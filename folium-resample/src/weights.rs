//! Per-axis weight tables.
//!
//! A [`WeightTable`] maps every destination index of one axis to a range of
//! source indices and the 16.16 fixed-point weight each of them contributes.
//! Upscaling uses nearest neighbor or two-tap bilinear weights, downscaling
//! uses box filtering over the covered source area.

use crate::ResampleOptions;
use crate::log::ldebug;

/// `1.0` in 16.16 fixed point.
pub const FIXED_ONE: u32 = 1 << 16;

/// The upper bound for the memory a single table may occupy.
const MAX_TABLE_SIZE: usize = 1 << 30;

/// Convert a fixed-point accumulator to a pixel value, rounding to nearest.
#[inline]
pub fn pixel_from_fixed(value: u32) -> u8 {
    (value.saturating_add(FIXED_ONE / 2) >> 16).min(255) as u8
}

#[inline]
fn fixed_from_f64(value: f64) -> u32 {
    (value * f64::from(FIXED_ONE)).round().max(0.0) as u32
}

/// The contribution of a source range to one destination index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWeight<'a> {
    /// The first contributing source index.
    pub src_start: i32,
    /// The last contributing source index, inclusive.
    pub src_end: i32,
    weights: &'a [u32],
}

impl<'a> PixelWeight<'a> {
    /// The weight of the source index `src`, zero outside of the range.
    pub fn weight(&self, src: i32) -> u32 {
        if src < self.src_start || src > self.src_end {
            return 0;
        }

        self.weights
            .get((src - self.src_start) as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Iterate over the source indices and their weights.
    pub fn iter(self) -> impl Iterator<Item = (usize, u32)> + 'a {
        let start = self.src_start.max(0) as usize;
        let len = (self.src_end - self.src_start + 1).max(0) as usize;

        self.weights
            .iter()
            .take(len)
            .enumerate()
            .map(move |(i, w)| (start + i, *w))
    }

    /// The sum of all weights.
    pub fn total(&self) -> u32 {
        self.iter().map(|(_, w)| w).sum()
    }
}

/// The weights of one axis for the destination range `dest_min..dest_max`.
#[derive(Debug, Clone)]
pub struct WeightTable {
    dest_min: i32,
    weight_count: usize,
    ranges: Vec<(i32, i32)>,
    weights: Vec<u32>,
}

impl WeightTable {
    /// Compute the weights for scaling `src_len` source pixels to `dest_len`
    /// destination pixels. A negative `dest_len` mirrors the axis.
    ///
    /// Only destination indices in `dest_min..dest_max` get an entry, and only
    /// source indices in `src_min..src_max` are referenced. Returns `None` if
    /// either range is empty or the table would get too large.
    pub fn new(
        dest_len: i32,
        dest_min: i32,
        dest_max: i32,
        src_len: i32,
        src_min: i32,
        src_max: i32,
        options: ResampleOptions,
    ) -> Option<Self> {
        if dest_len == 0 || dest_max < dest_min || src_max <= src_min {
            return None;
        }

        let scale = f64::from(src_len) / f64::from(dest_len);
        let base = if dest_len < 0 { f64::from(src_len) } else { 0.0 };
        let weight_count = scale.abs().ceil() as usize + 1;
        let item_size = size_of::<u32>() * (weight_count + 2);
        let dest_count = (dest_max - dest_min) as usize;

        if dest_count > (MAX_TABLE_SIZE - 4) / item_size {
            ldebug!("weight table for {} pixels is too large", dest_count);

            return None;
        }

        let mut table = Self {
            dest_min,
            weight_count,
            ranges: Vec::with_capacity(dest_count),
            weights: vec![0; dest_count * weight_count],
        };

        let last = src_max - 1;
        let slots = table.weights.chunks_exact_mut(weight_count);

        if options.contains(ResampleOptions::NO_SMOOTH) || scale.abs() < 1.0 {
            for (dest, w) in (dest_min..dest_max).zip(slots) {
                let pos = f64::from(dest) * scale + scale / 2.0 + base;

                if options.contains(ResampleOptions::BILINEAR) {
                    let start = ((pos - 0.5).floor() as i32).clamp(src_min, last);
                    let end = ((pos + 0.5).floor() as i32).clamp(start, last);

                    if start == end {
                        w[0] = FIXED_ONE;
                    } else {
                        w[1] = fixed_from_f64(pos - f64::from(start) - 0.5).min(FIXED_ONE);
                        w[0] = FIXED_ONE - w[1];
                    }

                    table.ranges.push((start, end));
                } else {
                    let index = (pos.floor() as i32).clamp(src_min, last);
                    w[0] = FIXED_ONE;
                    table.ranges.push((index, index));
                }
            }

            return Some(table);
        }

        for (dest, w) in (dest_min..dest_max).zip(slots) {
            let src_start = f64::from(dest) * scale + base;
            let src_end = src_start + scale;
            let start = (src_start.min(src_end).floor() as i32).max(src_min);
            let end = (src_start.max(src_end).floor() as i32).min(last);

            if start > end {
                let index = start.min(last);
                w[0] = FIXED_ONE;
                table.ranges.push((index, index));

                continue;
            }

            if (end - start) as usize >= weight_count {
                return None;
            }

            let mut remaining = i64::from(FIXED_ONE);
            let mut rounding_error = 0.0;

            for j in start..end {
                let mut dest_start = (f64::from(j) - base) / scale;
                let mut dest_end = (f64::from(j + 1) - base) / scale;

                if dest_start > dest_end {
                    core::mem::swap(&mut dest_start, &mut dest_end);
                }

                let area_start = dest_start.max(f64::from(dest));
                let area_end = dest_end.min(f64::from(dest + 1));
                let weight = (area_end - area_start).max(0.0);
                let fixed = fixed_from_f64(weight + rounding_error);

                w[(j - start) as usize] = fixed;
                remaining -= i64::from(fixed);
                rounding_error = weight - f64::from(fixed) / f64::from(FIXED_ONE);
            }

            // On underflow the leftover is dropped and the last index keeps a
            // weight of zero.
            if remaining > 0 && remaining <= i64::from(FIXED_ONE) {
                w[(end - start) as usize] = remaining as u32;
            }

            table.ranges.push((start, end));
        }

        Some(table)
    }

    /// The weights for the destination index `dest`.
    pub fn get(&self, dest: i32) -> Option<PixelWeight<'_>> {
        let index = usize::try_from(dest.checked_sub(self.dest_min)?).ok()?;
        let (src_start, src_end) = *self.ranges.get(index)?;
        let offset = index * self.weight_count;

        Some(PixelWeight {
            src_start,
            src_end,
            weights: &self.weights[offset..offset + self.weight_count],
        })
    }

    /// The number of destination indices in the table.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the table covers no destination index.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_normalized(table: &WeightTable, dest: core::ops::Range<i32>, src_len: i32) {
        for d in dest {
            let pw = table.get(d).unwrap();
            assert!(pw.src_start <= pw.src_end, "range of {d}");
            assert!(pw.src_start >= 0 && pw.src_end < src_len, "bounds of {d}");
            assert!(pw.total().abs_diff(FIXED_ONE) <= 1, "sum of {d}: {}", pw.total());
        }
    }

    #[test]
    fn box_downscale() {
        let table = WeightTable::new(1, 0, 1, 2, 0, 2, ResampleOptions::empty()).unwrap();
        let pw = table.get(0).unwrap();

        assert_eq!((pw.src_start, pw.src_end), (0, 1));
        assert_eq!(pw.weight(0), 32768);
        assert_eq!(pw.weight(1), 32768);
        assert_eq!(pw.weight(2), 0);
    }

    #[test]
    fn box_downscale_fractional() {
        let table = WeightTable::new(3, 0, 3, 7, 0, 7, ResampleOptions::empty()).unwrap();
        assert_normalized(&table, 0..3, 7);

        let pw = table.get(1).unwrap();
        assert_eq!((pw.src_start, pw.src_end), (2, 4));
    }

    #[test]
    fn nearest_upscale() {
        let table = WeightTable::new(4, 0, 4, 2, 0, 2, ResampleOptions::empty()).unwrap();
        let starts: Vec<_> = (0..4).map(|d| table.get(d).unwrap().src_start).collect();

        assert_eq!(starts, [0, 0, 1, 1]);
        assert_normalized(&table, 0..4, 2);
    }

    #[test]
    fn bilinear_upscale() {
        let table = WeightTable::new(4, 0, 4, 2, 0, 2, ResampleOptions::BILINEAR).unwrap();
        assert_normalized(&table, 0..4, 2);

        // Position 0.25 is clamped to the first pixel.
        let pw = table.get(0).unwrap();
        assert_eq!((pw.src_start, pw.src_end), (0, 0));

        // Position 0.75 sits between both pixels.
        let pw = table.get(1).unwrap();
        assert_eq!((pw.src_start, pw.src_end), (0, 1));
        assert_eq!(pw.weight(0), 49152);
        assert_eq!(pw.weight(1), 16384);
    }

    #[test]
    fn no_smooth_downscale_picks_nearest() {
        let table = WeightTable::new(2, 0, 2, 8, 0, 8, ResampleOptions::NO_SMOOTH).unwrap();
        let pw = table.get(1).unwrap();

        assert_eq!((pw.src_start, pw.src_end), (6, 6));
        assert_eq!(pw.weight(6), FIXED_ONE);
    }

    #[test]
    fn mirrored_axis() {
        let table = WeightTable::new(-4, 0, 4, 4, 0, 4, ResampleOptions::NO_SMOOTH).unwrap();
        let starts: Vec<_> = (0..4).map(|d| table.get(d).unwrap().src_start).collect();

        assert_eq!(starts, [3, 2, 1, 0]);
    }

    #[test]
    fn clipped_source_range() {
        let table = WeightTable::new(2, 0, 2, 4, 2, 4, ResampleOptions::empty()).unwrap();

        // The first destination pixel only covers clipped source pixels.
        let pw = table.get(0).unwrap();
        assert_eq!((pw.src_start, pw.src_end), (2, 2));
        assert_eq!(pw.total(), FIXED_ONE);
        assert!(table.get(2).is_none());
    }

    #[test]
    fn invalid_ranges() {
        assert!(WeightTable::new(0, 0, 1, 2, 0, 2, ResampleOptions::empty()).is_none());
        assert!(WeightTable::new(2, 0, 2, 2, 1, 1, ResampleOptions::empty()).is_none());
        assert!(WeightTable::new(1, 0, i32::MAX, i32::MAX, 0, 2, ResampleOptions::empty()).is_none());
    }

    #[test]
    fn fixed_point_rounding() {
        assert_eq!(pixel_from_fixed(255 * FIXED_ONE), 255);
        assert_eq!(pixel_from_fixed(FIXED_ONE / 2), 1);
        assert_eq!(pixel_from_fixed(FIXED_ONE / 2 - 1), 0);
        assert_eq!(pixel_from_fixed(255 * (FIXED_ONE + 1)), 255);
    }
}
