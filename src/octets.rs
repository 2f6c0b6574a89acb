//! Octet buffers: the encoder's patchable write buffer and the decoder's
//! refilling read cursor.
//!
//! Every Fast Infoset construct starts on an octet boundary, so both sides
//! work in whole octets. The write side can remember one position ("mark")
//! and OR flag bits into it later, which is how an element start octet learns
//! that attributes follow after its namespace declarations were written.

use std::io::{self, Read, Write};

use crate::{Error, Result};

/// Default size of the [`OctetReader`] refill buffer.
pub const DEFAULT_READ_BUFFER: usize = 8 * 1024;

/// Growable output buffer with a single patch-back mark.
#[derive(Debug, Default)]
pub struct OctetWriter {
    buf: Vec<u8>,
    mark: Option<usize>,
}

impl OctetWriter {
    /// Creates a new empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity), mark: None }
    }

    /// Appends one octet.
    #[inline(always)]
    pub fn write(&mut self, octet: u8) {
        self.buf.push(octet);
    }

    /// Appends a run of octets.
    #[inline]
    pub fn write_all(&mut self, octets: &[u8]) {
        self.buf.extend_from_slice(octets);
    }

    /// Appends a big-endian `u32`.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Records the position of the next octet to be written.
    pub fn mark(&mut self) {
        self.mark = Some(self.buf.len());
    }

    /// Returns `true` while a mark is set.
    pub fn has_mark(&self) -> bool {
        self.mark.is_some()
    }

    /// ORs `bits` into the marked octet. No-op without a mark or when the
    /// marked octet has not been written yet.
    pub fn or_at_mark(&mut self, bits: u8) {
        if let Some(pos) = self.mark {
            self.patch(pos, bits);
        }
    }

    /// Clears the mark.
    pub fn reset_mark(&mut self) {
        self.mark = None;
    }

    /// ORs `bits` into the octet at `pos`.
    pub fn patch(&mut self, pos: usize, bits: u8) {
        debug_assert!(pos < self.buf.len(), "patch position {pos} not written yet");
        if let Some(octet) = self.buf.get_mut(pos) {
            *octet |= bits;
        }
    }

    /// Writes every octet before the mark (or all octets without a mark) to
    /// `sink` and removes them from the buffer. The mark stays valid.
    pub fn drain_to(&mut self, sink: &mut impl Write) -> io::Result<()> {
        let end = self.mark.unwrap_or(self.buf.len());
        if end == 0 {
            return Ok(());
        }
        sink.write_all(&self.buf[..end])?;
        self.buf.drain(..end);
        if self.mark.is_some() {
            self.mark = Some(0);
        }
        Ok(())
    }

    /// Number of buffered octets.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Buffered octets.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Drops all buffered octets and the mark, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.mark = None;
    }

    /// Returns the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Sequential octet cursor over any [`Read`] source.
///
/// Reads happen in blocks of the configured buffer size; `offset()` always
/// reports the absolute position of the next unread octet.
#[derive(Debug)]
pub struct OctetReader<R> {
    source: R,
    buf: Box<[u8]>,
    pos: usize,
    end: usize,
    /// Octets vor `buf[0]`.
    consumed: u64,
}

impl<R: Read> OctetReader<R> {
    /// Creates a reader with the default buffer size.
    pub fn new(source: R) -> Self {
        Self::with_buffer_size(source, DEFAULT_READ_BUFFER)
    }

    /// Creates a reader with a custom buffer size (at least one octet).
    pub fn with_buffer_size(source: R, size: usize) -> Self {
        Self {
            source,
            buf: vec![0u8; size.max(1)].into_boxed_slice(),
            pos: 0,
            end: 0,
            consumed: 0,
        }
    }

    /// Absolute offset of the next unread octet.
    pub fn offset(&self) -> u64 {
        self.consumed + self.pos as u64
    }

    /// Refills the buffer when it is exhausted. Returns `false` at end of input.
    fn fill(&mut self) -> Result<bool> {
        if self.pos < self.end {
            return Ok(true);
        }
        self.consumed += self.end as u64;
        self.pos = 0;
        self.end = 0;
        loop {
            match self.source.read(&mut self.buf) {
                Ok(n) => {
                    self.end = n;
                    return Ok(n > 0);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io("reading octets", e)),
            }
        }
    }

    /// Reads one octet.
    #[inline]
    pub fn read(&mut self) -> Result<u8> {
        if self.pos < self.end {
            let b = self.buf[self.pos];
            self.pos += 1;
            return Ok(b);
        }
        if !self.fill()? {
            return Err(Error::PrematureEndOfStream { offset: self.offset() });
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Returns the next octet without consuming it, or `None` at end of input.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos]))
    }

    /// Returns `true` when no octet is left.
    pub fn is_at_end(&mut self) -> Result<bool> {
        Ok(self.peek()?.is_none())
    }

    /// Fills `out` completely.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            if !self.fill()? {
                return Err(Error::PrematureEndOfStream { offset: self.offset() });
            }
            let n = (self.end - self.pos).min(out.len() - filled);
            out[filled..filled + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(())
    }

    /// Reads `len` octets into a new vector.
    ///
    /// Die Länge kommt aus dem Stream: der Vec wächst blockweise statt
    /// `len` vorab zu reservieren, ein gefälschtes Längenfeld endet so als
    /// `PrematureEndOfStream` statt als riesige Allokation.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(self.buf.len()));
        while out.len() < len {
            if !self.fill()? {
                return Err(Error::PrematureEndOfStream { offset: self.offset() });
            }
            let n = (self.end - self.pos).min(len - out.len());
            out.extend_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
        }
        Ok(out)
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    /// Returns the underlying source. Buffered but unread octets are lost.
    pub fn into_inner(self) -> R {
        self.source
    }
}
