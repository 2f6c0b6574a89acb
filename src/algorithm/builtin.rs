//! The built-in encoding algorithms.
//!
//! Numeric arrays are fixed-width big-endian. Booleans are packed one bit
//! per value behind a 4-bit count of unused trailing bits. UUIDs are two
//! 64-bit words, most significant first. Text forms separate values with a
//! single space; parsing accepts any whitespace.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{EncodingAlgorithm, TypedArray};
use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// One of the ten algorithms every Fast Infoset processor knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinAlgorithm {
    Hexadecimal,
    Base64,
    Short,
    Int,
    Long,
    Boolean,
    Float,
    Double,
    Uuid,
    /// Character content from a CDATA section, carried as UTF-8 octets.
    Cdata,
}

impl BuiltinAlgorithm {
    /// Algorithm for a built-in id.
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            super::HEXADECIMAL => Self::Hexadecimal,
            super::BASE64 => Self::Base64,
            super::SHORT => Self::Short,
            super::INT => Self::Int,
            super::LONG => Self::Long,
            super::BOOLEAN => Self::Boolean,
            super::FLOAT => Self::Float,
            super::DOUBLE => Self::Double,
            super::UUID => Self::Uuid,
            super::CDATA => Self::Cdata,
            _ => return None,
        })
    }

    /// Wire id.
    pub fn id(self) -> u8 {
        match self {
            Self::Hexadecimal => super::HEXADECIMAL,
            Self::Base64 => super::BASE64,
            Self::Short => super::SHORT,
            Self::Int => super::INT,
            Self::Long => super::LONG,
            Self::Boolean => super::BOOLEAN,
            Self::Float => super::FLOAT,
            Self::Double => super::DOUBLE,
            Self::Uuid => super::UUID,
            Self::Cdata => super::CDATA,
        }
    }

    /// Lower-case name, for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hexadecimal => "hexadecimal",
            Self::Base64 => "base64",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Double => "double",
            Self::Uuid => "uuid",
            Self::Cdata => "cdata",
        }
    }

    /// Octets per value for fixed-width algorithms.
    fn element_size(self) -> Option<usize> {
        match self {
            Self::Short => Some(2),
            Self::Int | Self::Float => Some(4),
            Self::Long | Self::Double => Some(8),
            Self::Uuid => Some(16),
            _ => None,
        }
    }

    /// Returns `true` when `data` has the array type this algorithm carries.
    pub fn accepts(self, data: &TypedArray) -> bool {
        matches!(
            (self, data),
            (Self::Hexadecimal | Self::Base64 | Self::Cdata, TypedArray::Bytes(_))
                | (Self::Short, TypedArray::Shorts(_))
                | (Self::Int, TypedArray::Ints(_))
                | (Self::Long, TypedArray::Longs(_))
                | (Self::Boolean, TypedArray::Booleans(_))
                | (Self::Float, TypedArray::Floats(_))
                | (Self::Double, TypedArray::Doubles(_))
                | (Self::Uuid, TypedArray::Uuids(_))
        )
    }

    fn type_mismatch(self, data: &TypedArray) -> Error {
        Error::invalid_algorithm_data(format!(
            "{} algorithm cannot carry {}",
            self.name(),
            data.type_name()
        ))
    }

    fn check_length(self, octets: &[u8]) -> Result<()> {
        if let Some(size) = self.element_size()
            && octets.len() % size != 0
        {
            return Err(Error::invalid_algorithm_data(format!(
                "{} octets are not a multiple of {size} for {} algorithm",
                octets.len(),
                self.name()
            )));
        }
        Ok(())
    }
}

impl EncodingAlgorithm for BuiltinAlgorithm {
    fn decode_from_bytes(&self, octets: &[u8]) -> Result<TypedArray> {
        self.check_length(octets)?;
        Ok(match self {
            Self::Hexadecimal | Self::Base64 => TypedArray::Bytes(octets.to_vec()),
            Self::Cdata => {
                std::str::from_utf8(octets)
                    .map_err(|_| Error::invalid_algorithm_data("CDATA octets are not UTF-8"))?;
                TypedArray::Bytes(octets.to_vec())
            }
            Self::Short => TypedArray::Shorts(
                octets.chunks_exact(2).map(|c| i16::from_be_bytes([c[0], c[1]])).collect(),
            ),
            Self::Int => TypedArray::Ints(
                octets.chunks_exact(4).map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]])).collect(),
            ),
            Self::Long => TypedArray::Longs(octets.chunks_exact(8).map(|c| i64::from_be_bytes(word(c))).collect()),
            Self::Float => TypedArray::Floats(
                octets
                    .chunks_exact(4)
                    .map(|c| f32::from_bits(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                    .collect(),
            ),
            Self::Double => TypedArray::Doubles(
                octets.chunks_exact(8).map(|c| f64::from_bits(u64::from_be_bytes(word(c)))).collect(),
            ),
            Self::Uuid => TypedArray::Uuids(
                octets
                    .chunks_exact(16)
                    .map(|c| {
                        let msb = u64::from_be_bytes(word(&c[..8]));
                        let lsb = u64::from_be_bytes(word(&c[8..]));
                        (u128::from(msb) << 64) | u128::from(lsb)
                    })
                    .collect(),
            ),
            Self::Boolean => TypedArray::Booleans(unpack_booleans(octets)?),
        })
    }

    fn encode_to_bytes(&self, data: &TypedArray) -> Result<Vec<u8>> {
        if !self.accepts(data) {
            return Err(self.type_mismatch(data));
        }
        Ok(match data {
            TypedArray::Bytes(v) => {
                if *self == Self::Cdata {
                    std::str::from_utf8(v)
                        .map_err(|_| Error::invalid_algorithm_data("CDATA content is not UTF-8"))?;
                }
                v.clone()
            }
            TypedArray::Shorts(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            TypedArray::Ints(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            TypedArray::Longs(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            TypedArray::Floats(v) => v.iter().flat_map(|x| x.to_bits().to_be_bytes()).collect(),
            TypedArray::Doubles(v) => v.iter().flat_map(|x| x.to_bits().to_be_bytes()).collect(),
            TypedArray::Uuids(v) => v.iter().flat_map(|x| x.to_be_bytes()).collect(),
            TypedArray::Booleans(v) => pack_booleans(v),
        })
    }

    fn convert_from_text(&self, text: &str) -> Result<TypedArray> {
        let values = text.split_ascii_whitespace();
        Ok(match self {
            Self::Hexadecimal => {
                let digits = strip_whitespace(text);
                TypedArray::Bytes(
                    hex::decode(digits.as_bytes())
                        .map_err(|e| Error::invalid_algorithm_data(format!("hexadecimal: {e}")))?,
                )
            }
            Self::Base64 => {
                let compact = strip_whitespace(text);
                TypedArray::Bytes(
                    STANDARD
                        .decode(compact.as_bytes())
                        .map_err(|e| Error::invalid_algorithm_data(format!("base64: {e}")))?,
                )
            }
            Self::Cdata => TypedArray::Bytes(text.as_bytes().to_vec()),
            Self::Short => TypedArray::Shorts(parse_all(values, "short")?),
            Self::Int => TypedArray::Ints(parse_all(values, "int")?),
            Self::Long => TypedArray::Longs(parse_all(values, "long")?),
            Self::Float => TypedArray::Floats(values.map(parse_f32).collect::<Result<_>>()?),
            Self::Double => TypedArray::Doubles(values.map(parse_f64).collect::<Result<_>>()?),
            Self::Boolean => TypedArray::Booleans(values.map(parse_bool).collect::<Result<_>>()?),
            Self::Uuid => TypedArray::Uuids(values.map(parse_uuid).collect::<Result<_>>()?),
        })
    }

    fn convert_to_text(&self, data: &TypedArray) -> Result<String> {
        if !self.accepts(data) {
            return Err(self.type_mismatch(data));
        }
        Ok(match (self, data) {
            (Self::Hexadecimal, TypedArray::Bytes(v)) => hex::encode_upper(v),
            (Self::Base64, TypedArray::Bytes(v)) => STANDARD.encode(v),
            (Self::Cdata, TypedArray::Bytes(v)) => String::from_utf8(v.clone())
                .map_err(|_| Error::invalid_algorithm_data("CDATA content is not UTF-8"))?,
            (_, TypedArray::Shorts(v)) => join(v.iter().map(ToString::to_string)),
            (_, TypedArray::Ints(v)) => join(v.iter().map(ToString::to_string)),
            (_, TypedArray::Longs(v)) => join(v.iter().map(ToString::to_string)),
            (_, TypedArray::Floats(v)) => join(v.iter().map(|x| format_float(f64::from(*x), x.to_string()))),
            (_, TypedArray::Doubles(v)) => join(v.iter().map(|x| format_float(*x, x.to_string()))),
            (_, TypedArray::Booleans(v)) => join(v.iter().map(|b| if *b { "true" } else { "false" }.to_string())),
            (_, TypedArray::Uuids(v)) => join(v.iter().map(|u| format_uuid(*u))),
            (_, other) => return Err(self.type_mismatch(other)),
        })
    }
}

// ============================================================================
// Hilfsfunktionen
// ============================================================================

fn word(c: &[u8]) -> [u8; 8] {
    let mut w = [0u8; 8];
    w.copy_from_slice(&c[..8]);
    w
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

fn join(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

fn parse_all<'a, T: std::str::FromStr>(values: impl Iterator<Item = &'a str>, what: &'static str) -> Result<Vec<T>> {
    values
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| Error::invalid_algorithm_data(format!("'{v}' is not a valid {what}")))
        })
        .collect()
}

fn format_float(value: f64, display: String) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        display
    }
}

fn parse_f32(v: &str) -> Result<f32> {
    match v {
        "INF" => Ok(f32::INFINITY),
        "-INF" => Ok(f32::NEG_INFINITY),
        "NaN" => Ok(f32::NAN),
        _ => v
            .parse()
            .map_err(|_| Error::invalid_algorithm_data(format!("'{v}' is not a valid float"))),
    }
}

fn parse_f64(v: &str) -> Result<f64> {
    match v {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        _ => v
            .parse()
            .map_err(|_| Error::invalid_algorithm_data(format!("'{v}' is not a valid double"))),
    }
}

fn parse_bool(v: &str) -> Result<bool> {
    match v {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::invalid_algorithm_data(format!("'{v}' is not a valid boolean"))),
    }
}

fn format_uuid(u: u128) -> String {
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (u >> 96) as u32,
        (u >> 80) as u16,
        (u >> 64) as u16,
        (u >> 48) as u16,
        u & 0xFFFF_FFFF_FFFF
    )
}

fn parse_uuid(v: &str) -> Result<u128> {
    let digits: String = v.chars().filter(|c| *c != '-').collect();
    let mut raw = [0u8; 16];
    hex::decode_to_slice(digits.as_bytes(), &mut raw)
        .map_err(|_| Error::invalid_algorithm_data(format!("'{v}' is not a valid UUID")))?;
    Ok(u128::from_be_bytes(raw))
}

/// Packt Booleans: 4 Bit "unbenutzte Bits am Ende", dann ein Bit pro Wert.
fn pack_booleans(values: &[bool]) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }
    let total_bits = 4 + values.len();
    let unused = ((8 - total_bits % 8) % 8) as u32;
    let mut w = BitWriter::with_capacity(total_bits.div_ceil(8));
    w.write_bits(unused, 4);
    for &b in values {
        w.write_bit(b);
    }
    w.into_vec()
}

fn unpack_booleans(octets: &[u8]) -> Result<Vec<bool>> {
    if octets.is_empty() {
        return Ok(Vec::new());
    }
    let mut r = BitReader::new(octets);
    let unused = r.read_bits(4)? as usize;
    let count = r
        .remaining_bits()
        .checked_sub(unused)
        .ok_or_else(|| Error::invalid_algorithm_data(format!("{unused} unused bits exceed boolean payload")))?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(r.read_bit()?);
    }
    Ok(out)
}
