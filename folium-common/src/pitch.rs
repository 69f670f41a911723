//! Checked row pitch arithmetic.

/// The number of bytes needed for one row of `width` pixels with
/// `components` samples of `bpc` bits each, rounded up to whole bytes.
///
/// Returns `None` if the result does not fit into a `u32`.
pub fn pitch8(bpc: u32, components: u32, width: u32) -> Option<u32> {
    let bits = (bpc as u64)
        .checked_mul(components as u64)?
        .checked_mul(width as u64)?;

    u32::try_from(bits.div_ceil(8)).ok()
}

/// The number of bytes needed for one row of `width` pixels at `bpp` bits per
/// pixel, rounded up to a multiple of four bytes.
///
/// Returns `None` if the result does not fit into a `u32`.
pub fn pitch32(bpp: u32, width: u32) -> Option<u32> {
    let bits = (bpp as u64).checked_mul(width as u64)?;

    u32::try_from(bits.div_ceil(32) * 4).ok()
}
