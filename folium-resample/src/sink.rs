//! Receivers for resampled scanlines.

use folium_common::raster::Bitmap;

/// Receives the destination rows of a [`StretchEngine`](crate::StretchEngine)
/// from top to bottom.
pub trait ScanlineSink {
    /// Store the row at `line`, counted from the top of the clip.
    ///
    /// `scanline` is padded to a four-byte boundary and may be longer than
    /// the row of the sink.
    fn compose_scanline(&mut self, line: u32, scanline: &[u8]);
}

impl ScanlineSink for Bitmap {
    fn compose_scanline(&mut self, line: u32, scanline: &[u8]) {
        if let Some(row) = self.row_mut(line) {
            let len = row.len().min(scanline.len());
            row[..len].copy_from_slice(&scanline[..len]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folium_common::raster::PixelFormat;

    #[test]
    fn rows_outside_are_ignored() {
        let mut bitmap = Bitmap::new(2, 1, PixelFormat::Mask8).unwrap();

        bitmap.compose_scanline(0, &[7, 8, 9, 10, 11]);
        bitmap.compose_scanline(1, &[1, 1, 1, 1]);

        assert_eq!(bitmap.data(), &[7, 8, 9, 10]);
    }
}
