//! Bit-level packing for sub-octet payloads.
//!
//! Fast Infoset itself is octet aligned, but two payload layouts pack values
//! below octet granularity: the boolean encoding algorithm (one bit per value)
//! and restricted alphabets (`n` bits per character). Both are MSB first.

use crate::{Error, Result};

/// Writes individual bits into a growable byte buffer, MSB first.
///
/// Intern wird ein u64-Akkumulator verwendet, volle Bytes wandern sofort in `buf`.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    /// Akkumulator: enthält die nächsten `accum_bits` Bits (MSB = ältestes Bit).
    accum: u64,
    /// Anzahl gültiger Bits im Akkumulator (0..8 nach Flush).
    accum_bits: u8,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with room for `bytes` octets.
    pub fn with_capacity(bytes: usize) -> Self {
        Self { buf: Vec::with_capacity(bytes), accum: 0, accum_bits: 0 }
    }

    #[inline(always)]
    fn flush_to_buf(&mut self) {
        while self.accum_bits >= 8 {
            self.accum_bits -= 8;
            self.buf.push((self.accum >> self.accum_bits) as u8);
        }
        self.accum &= (1u64 << self.accum_bits) - 1;
    }

    /// Writes a single bit. `true` = 1, `false` = 0.
    #[inline(always)]
    pub fn write_bit(&mut self, val: bool) {
        self.accum = (self.accum << 1) | u64::from(val);
        self.accum_bits += 1;
        if self.accum_bits >= 8 {
            self.flush_to_buf();
        }
    }

    /// Writes the lower `n` bits of `val`, MSB first. `n` must be at most 32.
    #[inline]
    pub fn write_bits(&mut self, val: u32, n: u8) {
        debug_assert!(n <= 32, "bit count must be 0..=32, got {n}");
        if n == 0 {
            return;
        }
        let mask = (1u64 << n) - 1;
        self.accum = (self.accum << n) | (u64::from(val) & mask);
        self.accum_bits += n;
        self.flush_to_buf();
    }

    /// Returns the number of bits written so far.
    pub fn bit_position(&self) -> usize {
        self.buf.len() * 8 + self.accum_bits as usize
    }

    /// Number of bits missing until the next octet boundary.
    pub fn unused_bits(&self) -> u8 {
        (8 - self.accum_bits) % 8
    }

    /// Fills the current octet with one bits. No-op if already aligned.
    pub fn pad_with_ones(&mut self) {
        let pad = self.unused_bits();
        if pad > 0 {
            self.write_bits(u32::MAX, pad);
        }
    }

    /// Finalises the writer, padding the last byte with zero bits, and returns the buffer.
    pub fn into_vec(mut self) -> Vec<u8> {
        if self.accum_bits > 0 {
            self.buf.push((self.accum << (8 - self.accum_bits)) as u8);
        }
        self.buf
    }
}

/// Reads individual bits from a byte slice, MSB first.
#[derive(Debug, Clone, Copy)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Position des nächsten Bits.
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Reads `n` bits (at most 32), MSB first.
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        debug_assert!(n <= 32, "bit count must be 0..=32, got {n}");
        if n as usize > self.remaining_bits() {
            return Err(Error::PrematureEndOfStream { offset: (self.bit_pos / 8) as u64 });
        }
        let mut val = 0u32;
        for _ in 0..n {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            val = (val << 1) | u32::from(bit);
            self.bit_pos += 1;
        }
        Ok(val)
    }

    /// Returns the number of unread bits.
    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }
}
