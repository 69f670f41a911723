//! Reading and writing of packed, MSB-first samples.

/// Return the mask covering the lowest `bit_size` bits.
#[inline]
pub fn bit_mask(bit_size: u8) -> u32 {
    ((1u64 << bit_size as u64) - 1) as u32
}

/// Read the `index`-th sample of a row packed with `bits` bits per sample.
///
/// Only the PDF sample depths 1, 2, 4, 8 and 16 are supported. Reading
/// past the end of `data` yields 0.
#[inline]
pub fn sample(data: &[u8], index: usize, bits: u8) -> u32 {
    let bit_pos = index * bits as usize;
    let byte = data.get(bit_pos / 8).copied().unwrap_or(0) as u32;

    match bits {
        8 => byte,
        16 => (byte << 8) | data.get(bit_pos / 8 + 1).copied().unwrap_or(0) as u32,
        _ => (byte >> (8 - bits as usize - bit_pos % 8)) & bit_mask(bits),
    }
}

/// Whether the bit at `index` of an MSB-first row is set.
#[inline]
pub fn bit_is_set(data: &[u8], index: usize) -> bool {
    data.get(index / 8)
        .is_some_and(|b| b & (0x80 >> (index % 8)) != 0)
}

/// A bit reader over a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    cur_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader starting at the first bit of `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cur_pos: 0 }
    }

    /// Read `bit_size` bits (at most 32) as a big-endian number.
    #[inline]
    pub fn read(&mut self, bit_size: u8) -> Option<u32> {
        if bit_size > 32 {
            return None;
        }

        if bit_size == 0 {
            return Some(0);
        }

        let byte_pos = self.byte_pos();
        let bit_pos = self.bit_pos();
        let last_byte = (bit_pos + bit_size as usize - 1) / 8;

        let mut buf = [0u8; 8];
        for (i, b) in buf.iter_mut().enumerate().take(last_byte + 1) {
            *b = *self.data.get(byte_pos + i)?;
        }

        let shift = 64 - bit_pos - bit_size as usize;
        let value = (u64::from_be_bytes(buf) >> shift) as u32 & bit_mask(bit_size);
        self.cur_pos += bit_size as usize;

        Some(value)
    }

    #[inline]
    fn byte_pos(&self) -> usize {
        self.cur_pos / 8
    }

    #[inline]
    fn bit_pos(&self) -> usize {
        self.cur_pos % 8
    }
}

/// A writer of fixed-width samples into a byte buffer.
#[derive(Debug)]
pub struct BitWriter<'a> {
    data: &'a mut [u8],
    cur_pos: usize,
    bit_size: u8,
}

impl<'a> BitWriter<'a> {
    /// Create a new writer for samples of `bit_size` bits, between 1 and 32.
    #[inline]
    pub fn new(data: &'a mut [u8], bit_size: u8) -> Option<Self> {
        if !(1..=32).contains(&bit_size) {
            return None;
        }

        Some(Self {
            data,
            cur_pos: 0,
            bit_size,
        })
    }

    /// Write one sample. Bits above `bit_size` are ignored.
    pub fn write(&mut self, val: u32) -> Option<()> {
        let mut remaining = self.bit_size as usize;
        let value = val & bit_mask(self.bit_size);

        while remaining > 0 {
            let byte_pos = self.cur_pos / 8;
            let bit_pos = self.cur_pos % 8;
            let chunk_bits = (8 - bit_pos).min(remaining);
            let chunk_mask = bit_mask(chunk_bits as u8) as u8;
            let chunk = (value >> (remaining - chunk_bits)) as u8 & chunk_mask;
            let shift = 8 - bit_pos - chunk_bits;

            let byte = self.data.get_mut(byte_pos)?;
            *byte = (*byte & !(chunk_mask << shift)) | (chunk << shift);

            self.cur_pos += chunk_bits;
            remaining -= chunk_bits;
        }

        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_mixed_sizes() {
        let data = [0b1011_0010, 0b0111_1000, 0xAB];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read(3).unwrap(), 0b101);
        assert_eq!(reader.read(2).unwrap(), 0b10);
        assert_eq!(reader.read(7).unwrap(), 0b010_0111);
        assert_eq!(reader.read(4).unwrap(), 0b1000);
        assert_eq!(reader.read(8).unwrap(), 0xAB);
        assert!(reader.read(1).is_none());
    }

    #[test]
    fn reader_rejects_wide_reads() {
        let mut reader = BitReader::new(&[0; 8]);
        assert!(reader.read(33).is_none());
    }

    #[test]
    fn samples_at_every_depth() {
        let data = [0b1001_1100, 0x5A, 0x01, 0x02];
        assert_eq!(sample(&data, 0, 1), 1);
        assert_eq!(sample(&data, 1, 1), 0);
        assert_eq!(sample(&data, 2, 2), 0b11);
        assert_eq!(sample(&data, 1, 4), 0b1100);
        assert_eq!(sample(&data, 1, 8), 0x5A);
        assert_eq!(sample(&data, 1, 16), 0x0102);
        assert_eq!(sample(&data, 10, 8), 0);
    }

    #[test]
    fn bit_lookup() {
        let data = [0b0100_0001];
        assert!(!bit_is_set(&data, 0));
        assert!(bit_is_set(&data, 1));
        assert!(bit_is_set(&data, 7));
        assert!(!bit_is_set(&data, 8));
    }

    #[test]
    fn writer_packs_nibbles() {
        let mut buf = [0u8; 2];
        let mut writer = BitWriter::new(&mut buf, 4).unwrap();
        for v in [0xA, 0x5, 0xF, 0x0] {
            writer.write(v).unwrap();
        }
        assert!(writer.write(1).is_none());
        assert_eq!(buf, [0xA5, 0xF0]);
    }

    #[test]
    fn writer_rejects_invalid_sizes() {
        let mut buf = [0u8; 2];
        assert!(BitWriter::new(&mut buf, 0).is_none());
        assert!(BitWriter::new(&mut buf, 33).is_none());
    }

    #[test]
    fn writer_reader_agree() {
        for bit_size in [1u8, 2, 3, 5, 8, 12, 16, 24, 32] {
            let values: Vec<u32> = (0..7u32)
                .map(|i| (0x9E37_79B9u32.wrapping_mul(i + 3)) & bit_mask(bit_size))
                .collect();
            let mut buf = vec![0u8; (bit_size as usize * values.len()).div_ceil(8)];
            let mut writer = BitWriter::new(&mut buf, bit_size).unwrap();
            for v in &values {
                writer.write(*v).unwrap();
            }

            let mut reader = BitReader::new(&buf);
            for v in &values {
                assert_eq!(reader.read(bit_size).unwrap(), *v, "bit size {bit_size}");
            }
        }
    }
}
