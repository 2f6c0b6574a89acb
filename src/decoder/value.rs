//! Non-identifying strings and character chunks.
//!
//! Beide Formen tragen Text als UTF-8, UTF-16, Restricted Alphabet oder
//! Encoding Algorithm. Das Lesen der Octets ist von der Interpretation
//! getrennt: `read_non_identifying` borgt nur Input und Tabellen, die
//! Algorithmus-Auflösung braucht danach Vokabular und Optionen.

use std::io::Read;
use std::rc::Rc;

use log::trace;

use crate::algorithm::{self, Codec, EncodingAlgorithm};
use crate::alphabet;
use crate::decoder::Decoder;
use crate::decoder::name::read_utf8;
use crate::decoder::tables::{self, Encoding, Value};
use crate::event::{AlgorithmValue, AttributeValue, ChContent, EaContent, FiEvent, RaContent};
use crate::integer::{self, Tier};
use crate::octets::OctetReader;
use crate::vocabulary::StringTable;
use crate::{Error, Result};

const CII_ADD_TO_TABLE: u8 = 0x10;

/// Ein gelesener String, noch ohne Algorithmus-Auflösung.
enum Raw {
    Text(Rc<str>),
    Restricted { alphabet: u8, value: Rc<str> },
    Encoded { id: u8, octets: Vec<u8> },
}

/// Reads `len` octets of big-endian UTF-16.
pub(super) fn read_utf16<R: Read>(r: &mut OctetReader<R>, len: usize) -> Result<Rc<str>> {
    let offset = r.offset();
    if len % 2 != 0 {
        return Err(Error::InvalidUtf16 { offset });
    }
    let bytes = r.read_vec(len)?;
    let units = bytes.chunks_exact(2).map(|p| u16::from_be_bytes([p[0], p[1]]));
    char::decode_utf16(units)
        .collect::<core::result::Result<String, _>>()
        .map(Rc::from)
        .map_err(|_| Error::InvalidUtf16 { offset })
}

fn read_text<R: Read>(r: &mut OctetReader<R>, encoding: Encoding, len: usize) -> Result<Rc<str>> {
    match encoding {
        Encoding::Utf16 => read_utf16(r, len),
        _ => read_utf8(r, len),
    }
}

/// Non-identifying string starting on the first bit.
///
/// Literal text flagged for addition is appended to `table`, as is the
/// decoded text of a flagged restricted-alphabet value.
fn read_non_identifying<R: Read>(r: &mut OctetReader<R>, table: &mut StringTable, alphabets: &StringTable) -> Result<Raw> {
    let offset = r.offset();
    let b = r.read()?;
    let context = table.name();
    let invalid = || Error::InvalidConstruct { octet: b, offset, context };
    match tables::VALUE[b as usize] {
        Value::Empty => Ok(Raw::Text(Rc::from(""))),
        Value::Index(tier) => {
            let index = integer::decode_index_2nd(tier, b, r)?;
            table.resolve(index).map(Raw::Text)
        }
        Value::Literal { add, encoding: encoding @ (Encoding::Utf8 | Encoding::Utf16) } => {
            let tier = integer::length_tier_5th(b).ok_or_else(invalid)?;
            let len = integer::decode_length_5th(tier, b, r)?;
            let value = read_text(r, encoding, len)?;
            if add {
                table.add(Rc::clone(&value));
            }
            Ok(Raw::Text(value))
        }
        Value::Literal { add, encoding } => {
            let b2 = r.read()?;
            let id = ((b & 0x0F) << 4) | (b2 >> 4);
            let tier = integer::length_tier_5th(b2).ok_or(Error::InvalidConstruct {
                octet: b2,
                offset: offset + 1,
                context,
            })?;
            let len = integer::decode_length_5th(tier, b2, r)?;
            let octets = r.read_vec(len)?;
            if encoding == Encoding::Restricted {
                let chars = alphabet::resolve(id, alphabets)?;
                let value: Rc<str> = Rc::from(alphabet::decode(&chars, &octets)?);
                if add {
                    table.add(Rc::clone(&value));
                }
                return Ok(Raw::Restricted { alphabet: id, value });
            }
            if add {
                return Err(Error::unsupported("encoding algorithm value added to a table"));
            }
            Ok(Raw::Encoded { id, octets })
        }
        Value::Invalid => Err(invalid()),
    }
}

impl<R: Read> Decoder<R> {
    /// Turns algorithm octets into event data.
    fn decode_algorithm(&self, id: u8, octets: Vec<u8>) -> Result<EaContent> {
        let table = &self.vocabulary.encoding_algorithms;
        let codec = algorithm::resolve(id, |i| table.get(i).map(|u| &**u), &self.options.algorithms)?;
        let ea = match codec {
            Codec::Builtin(alg) => EaContent {
                algorithm: id,
                uri: None,
                value: AlgorithmValue::Typed(alg.decode_from_bytes(&octets)?),
            },
            Codec::Custom { uri, algorithm } => EaContent {
                algorithm: id,
                uri: Some(Rc::from(uri)),
                value: AlgorithmValue::Typed(algorithm.decode_from_bytes(&octets)?),
            },
            Codec::Unregistered { uri } => {
                if !self.options.octets_for_unknown_algorithms {
                    return Err(Error::UnsupportedAlgorithm(uri.to_string()));
                }
                trace!("algorithm {uri} has no codec, passing {} octets through", octets.len());
                EaContent { algorithm: id, uri: Some(Rc::from(uri)), value: AlgorithmValue::Octets(Rc::from(octets)) }
            }
        };
        Ok(ea)
    }

    /// Text form of algorithm data in a string-only position.
    fn algorithm_text(&self, id: u8, octets: Vec<u8>) -> Result<Rc<str>> {
        let table = &self.vocabulary.encoding_algorithms;
        let text = match algorithm::resolve(id, |i| table.get(i).map(|u| &**u), &self.options.algorithms)? {
            Codec::Builtin(alg) => alg.convert_to_text(&alg.decode_from_bytes(&octets)?)?,
            Codec::Custom { algorithm, .. } => algorithm.convert_to_text(&algorithm.decode_from_bytes(&octets)?)?,
            Codec::Unregistered { uri } => return Err(Error::UnsupportedAlgorithm(uri.to_string())),
        };
        Ok(Rc::from(text))
    }

    pub(super) fn read_attribute_value(&mut self) -> Result<AttributeValue> {
        let vocabulary = &mut self.vocabulary;
        let raw = read_non_identifying(&mut self.input, &mut vocabulary.attribute_values, &vocabulary.restricted_alphabets)?;
        Ok(match raw {
            Raw::Text(value) => AttributeValue::Text(value),
            Raw::Restricted { alphabet, value } => AttributeValue::Restricted(RaContent { alphabet, value }),
            Raw::Encoded { id, octets } => AttributeValue::Algorithm(self.decode_algorithm(id, octets)?),
        })
    }

    /// Comment text, PI data or the version: always delivered as text.
    pub(super) fn read_other_string(&mut self, context: &'static str) -> Result<Rc<str>> {
        trace!("reading {context}");
        let vocabulary = &mut self.vocabulary;
        match read_non_identifying(&mut self.input, &mut vocabulary.other_strings, &vocabulary.restricted_alphabets)? {
            Raw::Text(value) | Raw::Restricted { value, .. } => Ok(value),
            Raw::Encoded { id, octets } => self.algorithm_text(id, octets),
        }
    }

    /// Character chunk literal; `b` is the consumed first octet.
    pub(super) fn read_chunk(&mut self, b: u8) -> Result<()> {
        let add = b & CII_ADD_TO_TABLE != 0;
        let encoding = tables::chunk_encoding(b);
        let event = match encoding {
            Encoding::Utf8 | Encoding::Utf16 => {
                let tier = integer::length_tier_7th(b).unwrap_or(Tier::Large);
                let len = integer::decode_length_7th(tier, b, &mut self.input)?;
                let value = read_text(&mut self.input, encoding, len)?;
                if add {
                    self.vocabulary.character_chunks.add(Rc::clone(&value));
                }
                FiEvent::Characters(ChContent { value, cdata: false })
            }
            Encoding::Restricted | Encoding::Algorithm => {
                let b2 = self.input.read()?;
                let id = ((b & 0x03) << 6) | (b2 >> 2);
                let tier = integer::length_tier_7th(b2).unwrap_or(Tier::Large);
                let len = integer::decode_length_7th(tier, b2, &mut self.input)?;
                let octets = self.input.read_vec(len)?;
                if encoding == Encoding::Restricted {
                    let chars = alphabet::resolve(id, &self.vocabulary.restricted_alphabets)?;
                    let value: Rc<str> = Rc::from(alphabet::decode(&chars, &octets)?);
                    if add {
                        self.vocabulary.character_chunks.add(Rc::clone(&value));
                    }
                    FiEvent::RestrictedCharacters(RaContent { alphabet: id, value })
                } else if add {
                    return Err(Error::unsupported("encoding algorithm chunk added to a table"));
                } else if id == algorithm::CDATA {
                    let value = String::from_utf8(octets)
                        .map_err(|_| Error::InvalidUtf8 { offset: self.input.offset() })?;
                    FiEvent::Characters(ChContent { value: Rc::from(value), cdata: true })
                } else {
                    FiEvent::AlgorithmData(self.decode_algorithm(id, octets)?)
                }
            }
        };
        self.queue.push_back(event);
        Ok(())
    }

    /// Character chunk by index on the 4th bit.
    pub(super) fn read_chunk_index(&mut self, tier: Tier, b: u8) -> Result<()> {
        let index = integer::decode_index_4th(tier, b, &mut self.input)?;
        let value = self.vocabulary.character_chunks.resolve(index)?;
        self.queue.push_back(FiEvent::Characters(ChContent { value, cdata: false }));
        Ok(())
    }
}
