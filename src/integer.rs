//! Variable-length integers: table indices and string lengths.
//!
//! Each context starts its integer at a different bit of the leading octet
//! (the bits before it carry construct flags) and picks one of up to four
//! tiers by magnitude. Every tier subtracts the base of its range before
//! writing, so ranges are contiguous and never overlap.
//!
//! | context | small | medium | large | large-large |
//! |---|---|---|---|---|
//! | index, 2nd bit | `< 64` | `< 8256` | `< 2^20` | - |
//! | index, 3rd bit | `< 32` | `< 2080` | `< 526368` | `< 2^20` |
//! | index, 4th bit | `< 16` | `< 1040` | `< 263184` | `< 2^20` |
//! | length, 2nd bit | `<= 64` | `<= 320` | 4 octets | - |
//! | length, 5th bit | `<= 8` | `<= 264` | 4 octets | - |
//! | length, 7th bit | `<= 2` | `<= 258` | 4 octets | - |

use std::io::Read;

use crate::octets::{OctetReader, OctetWriter};
use crate::{Error, Result};

/// Exclusive upper bound of every table index (and so of every table size).
pub const INDEX_LIMIT: usize = 1 << 20;

pub(crate) const INDEX_2ND_SMALL_LIMIT: usize = 64;
pub(crate) const INDEX_2ND_MEDIUM_LIMIT: usize = 8256;

pub(crate) const INDEX_3RD_SMALL_LIMIT: usize = 32;
pub(crate) const INDEX_3RD_MEDIUM_LIMIT: usize = 2080;
pub(crate) const INDEX_3RD_LARGE_LIMIT: usize = 526_368;

pub(crate) const INDEX_4TH_SMALL_LIMIT: usize = 16;
pub(crate) const INDEX_4TH_MEDIUM_LIMIT: usize = 1040;
pub(crate) const INDEX_4TH_LARGE_LIMIT: usize = 263_184;

pub(crate) const LENGTH_2ND_SMALL_LIMIT: usize = 65;
pub(crate) const LENGTH_2ND_MEDIUM_LIMIT: usize = 321;

pub(crate) const LENGTH_5TH_SMALL_LIMIT: usize = 9;
pub(crate) const LENGTH_5TH_MEDIUM_LIMIT: usize = 265;

pub(crate) const LENGTH_7TH_SMALL_LIMIT: usize = 3;
pub(crate) const LENGTH_7TH_MEDIUM_LIMIT: usize = 259;

/// Size class of an encoded integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Small,
    Medium,
    Large,
    LargeLarge,
}

// ============================================================================
// Tier-Klassifikation des führenden Octets (const, für die Dispatch-Tabellen)
// ============================================================================

/// Tier of an index starting on the 2nd bit (first bit already consumed).
pub const fn index_tier_2nd(b: u8) -> Option<Tier> {
    match b & 0x70 {
        0x00..=0x30 => Some(Tier::Small),
        0x40 | 0x50 => Some(Tier::Medium),
        0x60 => Some(Tier::Large),
        _ => None,
    }
}

/// Tier of an index starting on the 3rd bit.
pub const fn index_tier_3rd(b: u8) -> Option<Tier> {
    if b & 0x20 == 0 {
        return Some(Tier::Small);
    }
    match b & 0x38 {
        0x20 => Some(Tier::Medium),
        0x28 => Some(Tier::Large),
        0x30 if b & 0x07 == 0 => Some(Tier::LargeLarge),
        _ => None,
    }
}

/// Tier of an index starting on the 4th bit.
pub const fn index_tier_4th(b: u8) -> Option<Tier> {
    if b & 0x10 == 0 {
        return Some(Tier::Small);
    }
    match b & 0x1C {
        0x10 => Some(Tier::Medium),
        0x14 => Some(Tier::Large),
        0x18 if b & 0x03 == 0 => Some(Tier::LargeLarge),
        _ => None,
    }
}

/// Tier of a length starting on the 2nd bit.
pub const fn length_tier_2nd(b: u8) -> Option<Tier> {
    if b & 0x40 == 0 {
        return Some(Tier::Small);
    }
    match b & 0x7F {
        0x40 => Some(Tier::Medium),
        0x60 => Some(Tier::Large),
        _ => None,
    }
}

/// Tier of a length starting on the 5th bit.
pub const fn length_tier_5th(b: u8) -> Option<Tier> {
    if b & 0x08 == 0 {
        return Some(Tier::Small);
    }
    match b & 0x0F {
        0x08 => Some(Tier::Medium),
        0x0C => Some(Tier::Large),
        _ => None,
    }
}

/// Tier of a length starting on the 7th bit.
pub const fn length_tier_7th(b: u8) -> Option<Tier> {
    match b & 0x03 {
        0x00 | 0x01 => Some(Tier::Small),
        0x02 => Some(Tier::Medium),
        _ => Some(Tier::Large),
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn check_index(index: usize) -> Result<()> {
    if index >= INDEX_LIMIT {
        return Err(Error::IntegerOverflow(index as u64));
    }
    Ok(())
}

fn large_length(length: usize, base: usize) -> Result<u32> {
    u32::try_from(length - base).map_err(|_| Error::IntegerOverflow(length as u64))
}

/// Writes `index` starting on the 2nd bit; `leading` carries the first bit.
pub fn encode_index_2nd(w: &mut OctetWriter, leading: u8, index: usize) -> Result<()> {
    check_index(index)?;
    if index < INDEX_2ND_SMALL_LIMIT {
        w.write(leading | index as u8);
    } else if index < INDEX_2ND_MEDIUM_LIMIT {
        let i = index - INDEX_2ND_SMALL_LIMIT;
        w.write(leading | 0x40 | (i >> 8) as u8);
        w.write(i as u8);
    } else {
        let i = index - INDEX_2ND_MEDIUM_LIMIT;
        w.write(leading | 0x60 | (i >> 16) as u8);
        w.write((i >> 8) as u8);
        w.write(i as u8);
    }
    Ok(())
}

/// Writes `index` starting on the 3rd bit; `leading` carries the first two bits.
pub fn encode_index_3rd(w: &mut OctetWriter, leading: u8, index: usize) -> Result<()> {
    check_index(index)?;
    if index < INDEX_3RD_SMALL_LIMIT {
        w.write(leading | index as u8);
    } else if index < INDEX_3RD_MEDIUM_LIMIT {
        let i = index - INDEX_3RD_SMALL_LIMIT;
        w.write(leading | 0x20 | (i >> 8) as u8);
        w.write(i as u8);
    } else if index < INDEX_3RD_LARGE_LIMIT {
        let i = index - INDEX_3RD_MEDIUM_LIMIT;
        w.write(leading | 0x28 | (i >> 16) as u8);
        w.write((i >> 8) as u8);
        w.write(i as u8);
    } else {
        let i = index - INDEX_3RD_LARGE_LIMIT;
        w.write(leading | 0x30);
        w.write((i >> 16) as u8 & 0x0F);
        w.write((i >> 8) as u8);
        w.write(i as u8);
    }
    Ok(())
}

/// Writes `index` starting on the 4th bit; `leading` carries the first three bits.
pub fn encode_index_4th(w: &mut OctetWriter, leading: u8, index: usize) -> Result<()> {
    check_index(index)?;
    if index < INDEX_4TH_SMALL_LIMIT {
        w.write(leading | index as u8);
    } else if index < INDEX_4TH_MEDIUM_LIMIT {
        let i = index - INDEX_4TH_SMALL_LIMIT;
        w.write(leading | 0x10 | (i >> 8) as u8);
        w.write(i as u8);
    } else if index < INDEX_4TH_LARGE_LIMIT {
        let i = index - INDEX_4TH_MEDIUM_LIMIT;
        w.write(leading | 0x14 | (i >> 16) as u8);
        w.write((i >> 8) as u8);
        w.write(i as u8);
    } else {
        let i = index - INDEX_4TH_LARGE_LIMIT;
        w.write(leading | 0x18);
        w.write((i >> 16) as u8 & 0x0F);
        w.write((i >> 8) as u8);
        w.write(i as u8);
    }
    Ok(())
}

/// Writes a non-zero `length` starting on the 2nd bit.
pub fn encode_length_2nd(w: &mut OctetWriter, leading: u8, length: usize) -> Result<()> {
    debug_assert!(length > 0, "lengths on the wire are non-zero");
    if length < LENGTH_2ND_SMALL_LIMIT {
        w.write(leading | (length - 1) as u8);
    } else if length < LENGTH_2ND_MEDIUM_LIMIT {
        w.write(leading | 0x40);
        w.write((length - LENGTH_2ND_SMALL_LIMIT) as u8);
    } else {
        let rest = large_length(length, LENGTH_2ND_MEDIUM_LIMIT)?;
        w.write(leading | 0x60);
        w.write_u32(rest);
    }
    Ok(())
}

/// Writes a non-zero `length` starting on the 5th bit.
pub fn encode_length_5th(w: &mut OctetWriter, leading: u8, length: usize) -> Result<()> {
    debug_assert!(length > 0, "lengths on the wire are non-zero");
    if length < LENGTH_5TH_SMALL_LIMIT {
        w.write(leading | (length - 1) as u8);
    } else if length < LENGTH_5TH_MEDIUM_LIMIT {
        w.write(leading | 0x08);
        w.write((length - LENGTH_5TH_SMALL_LIMIT) as u8);
    } else {
        let rest = large_length(length, LENGTH_5TH_MEDIUM_LIMIT)?;
        w.write(leading | 0x0C);
        w.write_u32(rest);
    }
    Ok(())
}

/// Writes a non-zero `length` starting on the 7th bit.
pub fn encode_length_7th(w: &mut OctetWriter, leading: u8, length: usize) -> Result<()> {
    debug_assert!(length > 0, "lengths on the wire are non-zero");
    if length < LENGTH_7TH_SMALL_LIMIT {
        w.write(leading | (length - 1) as u8);
    } else if length < LENGTH_7TH_MEDIUM_LIMIT {
        w.write(leading | 0x02);
        w.write((length - LENGTH_7TH_SMALL_LIMIT) as u8);
    } else {
        let rest = large_length(length, LENGTH_7TH_MEDIUM_LIMIT)?;
        w.write(leading | 0x03);
        w.write_u32(rest);
    }
    Ok(())
}

/// Writes the length of a sequence (additional data, initial vocabulary lists).
pub fn encode_sequence_length(w: &mut OctetWriter, length: usize) -> Result<()> {
    debug_assert!(length > 0, "empty sequences are flagged absent instead");
    if length <= 128 {
        w.write((length - 1) as u8);
    } else {
        let i = length - 129;
        if i >= INDEX_LIMIT {
            return Err(Error::IntegerOverflow(length as u64));
        }
        w.write(0x80 | ((i >> 16) as u8 & 0x0F));
        w.write((i >> 8) as u8);
        w.write(i as u8);
    }
    Ok(())
}

// ============================================================================
// Decoding
// ============================================================================

fn read_u16<R: Read>(r: &mut OctetReader<R>) -> Result<usize> {
    let hi = r.read()? as usize;
    let lo = r.read()? as usize;
    Ok((hi << 8) | lo)
}

fn large_length_from<R: Read>(r: &mut OctetReader<R>, base: usize) -> Result<usize> {
    let raw = r.read_u32()? as u64 + base as u64;
    usize::try_from(raw).map_err(|_| Error::IntegerOverflow(raw))
}

/// Reads an index on the 2nd bit whose leading octet `b` has already been consumed.
pub fn decode_index_2nd<R: Read>(tier: Tier, b: u8, r: &mut OctetReader<R>) -> Result<usize> {
    Ok(match tier {
        Tier::Small => (b & 0x3F) as usize,
        Tier::Medium => ((((b & 0x1F) as usize) << 8) | r.read()? as usize) + INDEX_2ND_SMALL_LIMIT,
        Tier::Large | Tier::LargeLarge => {
            ((((b & 0x0F) as usize) << 16) | read_u16(r)?) + INDEX_2ND_MEDIUM_LIMIT
        }
    })
}

/// Reads an index on the 3rd bit.
pub fn decode_index_3rd<R: Read>(tier: Tier, b: u8, r: &mut OctetReader<R>) -> Result<usize> {
    Ok(match tier {
        Tier::Small => (b & 0x1F) as usize,
        Tier::Medium => ((((b & 0x07) as usize) << 8) | r.read()? as usize) + INDEX_3RD_SMALL_LIMIT,
        Tier::Large => ((((b & 0x07) as usize) << 16) | read_u16(r)?) + INDEX_3RD_MEDIUM_LIMIT,
        Tier::LargeLarge => {
            let hi = (r.read()? & 0x0F) as usize;
            ((hi << 16) | read_u16(r)?) + INDEX_3RD_LARGE_LIMIT
        }
    })
}

/// Reads an index on the 4th bit.
pub fn decode_index_4th<R: Read>(tier: Tier, b: u8, r: &mut OctetReader<R>) -> Result<usize> {
    Ok(match tier {
        Tier::Small => (b & 0x0F) as usize,
        Tier::Medium => ((((b & 0x03) as usize) << 8) | r.read()? as usize) + INDEX_4TH_SMALL_LIMIT,
        Tier::Large => ((((b & 0x03) as usize) << 16) | read_u16(r)?) + INDEX_4TH_MEDIUM_LIMIT,
        Tier::LargeLarge => {
            let hi = (r.read()? & 0x0F) as usize;
            ((hi << 16) | read_u16(r)?) + INDEX_4TH_LARGE_LIMIT
        }
    })
}

/// Reads a length on the 2nd bit.
pub fn decode_length_2nd<R: Read>(tier: Tier, b: u8, r: &mut OctetReader<R>) -> Result<usize> {
    match tier {
        Tier::Small => Ok((b & 0x3F) as usize + 1),
        Tier::Medium => Ok(r.read()? as usize + LENGTH_2ND_SMALL_LIMIT),
        Tier::Large | Tier::LargeLarge => large_length_from(r, LENGTH_2ND_MEDIUM_LIMIT),
    }
}

/// Reads a length on the 5th bit.
pub fn decode_length_5th<R: Read>(tier: Tier, b: u8, r: &mut OctetReader<R>) -> Result<usize> {
    match tier {
        Tier::Small => Ok((b & 0x07) as usize + 1),
        Tier::Medium => Ok(r.read()? as usize + LENGTH_5TH_SMALL_LIMIT),
        Tier::Large | Tier::LargeLarge => large_length_from(r, LENGTH_5TH_MEDIUM_LIMIT),
    }
}

/// Reads a length on the 7th bit.
pub fn decode_length_7th<R: Read>(tier: Tier, b: u8, r: &mut OctetReader<R>) -> Result<usize> {
    match tier {
        Tier::Small => Ok((b & 0x01) as usize + 1),
        Tier::Medium => Ok(r.read()? as usize + LENGTH_7TH_SMALL_LIMIT),
        Tier::Large | Tier::LargeLarge => large_length_from(r, LENGTH_7TH_MEDIUM_LIMIT),
    }
}

/// Reads a sequence length.
pub fn decode_sequence_length<R: Read>(r: &mut OctetReader<R>) -> Result<usize> {
    let b = r.read()?;
    if b & 0x80 == 0 {
        return Ok(b as usize + 1);
    }
    Ok(((((b & 0x0F) as usize) << 16) | read_u16(r)?) + 129)
}
