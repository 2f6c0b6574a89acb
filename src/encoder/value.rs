use std::rc::Rc;

use crate::algorithm::{self, AlgorithmRegistry, BuiltinAlgorithm, EncodingAlgorithm, TypedArray};
use crate::alphabet;
use crate::encoder::Encoder;
use crate::event::{AlgorithmValue, EaContent};
use crate::integer;
use crate::octets::OctetWriter;
use crate::vocabulary::{StringTable, Vocabulary};
use crate::{Error, Result};

// Non-identifying string, erstes Bit
const NIS_ADD_TO_TABLE: u8 = 0x40;
const NIS_UTF8: u8 = 0x00;
const NIS_RESTRICTED_ALPHABET: u8 = 0x20;
const NIS_ENCODING_ALGORITHM: u8 = 0x30;
const NIS_INDEX: u8 = 0x80;
pub(super) const NIS_EMPTY: u8 = 0xFF;

// Character chunk
const CII: u8 = 0x80;
const CII_ADD_TO_TABLE: u8 = 0x10;
const CII_UTF8: u8 = 0x00;
const CII_RESTRICTED_ALPHABET: u8 = 0x08;
const CII_ENCODING_ALGORITHM: u8 = 0x0C;
const CII_INDEX: u8 = 0xA0;

/// Writes text as a non-identifying string starting on the first bit.
///
/// Strings shorter than `limit` octets are looked up and, when new, added
/// to `table`; longer ones are always written literally.
pub(super) fn write_non_identifying(out: &mut OctetWriter, table: &mut StringTable, value: &str, limit: usize) -> Result<()> {
    if value.is_empty() {
        out.write(NIS_EMPTY);
        return Ok(());
    }
    let mut add = value.len() < limit;
    if add && let Some(index) = table.lookup(value) {
        return integer::encode_index_2nd(out, NIS_INDEX, index);
    }
    add = add && table.add(Rc::from(value)).is_some();
    let flag = if add { NIS_ADD_TO_TABLE } else { 0 };
    integer::encode_length_5th(out, flag | NIS_UTF8, value.len())?;
    out.write_all(value.as_bytes());
    Ok(())
}

/// Algorithm or alphabet octets in a non-identifying string. The id spans
/// the low nibble of the first and the high nibble of the second octet.
fn write_non_identifying_encoded(out: &mut OctetWriter, kind: u8, id: u8, octets: &[u8]) -> Result<()> {
    if octets.is_empty() {
        return Err(Error::unsupported("empty encoded value in attribute or comment"));
    }
    out.write(kind | (id >> 4));
    integer::encode_length_5th(out, (id & 0x0F) << 4, octets.len())?;
    out.write_all(octets);
    Ok(())
}

/// Writes text as a character chunk.
pub(super) fn write_chunk(out: &mut OctetWriter, table: &mut StringTable, value: &str, limit: usize) -> Result<()> {
    debug_assert!(!value.is_empty(), "empty chunks are skipped by the caller");
    let mut add = value.len() < limit;
    if add && let Some(index) = table.lookup(value) {
        return integer::encode_index_4th(out, CII_INDEX, index);
    }
    add = add && table.add(Rc::from(value)).is_some();
    let flag = if add { CII_ADD_TO_TABLE } else { 0 };
    integer::encode_length_7th(out, CII | flag | CII_UTF8, value.len())?;
    out.write_all(value.as_bytes());
    Ok(())
}

/// Algorithm or alphabet octets in a character chunk. The id spans the low
/// 2 bits of the first and the high 6 bits of the second octet.
fn write_chunk_encoded(out: &mut OctetWriter, kind: u8, id: u8, octets: &[u8]) -> Result<()> {
    debug_assert!(!octets.is_empty());
    out.write(CII | kind | (id >> 6));
    integer::encode_length_7th(out, (id & 0x3F) << 2, octets.len())?;
    out.write_all(octets);
    Ok(())
}

/// Wire id of the application algorithm `uri`.
fn custom_algorithm_id(uri: &str, vocabulary: &Vocabulary) -> Result<u8> {
    vocabulary
        .encoding_algorithms
        .lookup(uri)
        .and_then(|i| u8::try_from(i + algorithm::APPLICATION_START as usize).ok())
        .ok_or_else(|| Error::UnsupportedAlgorithm(uri.to_string()))
}

fn builtin_octets(alg: BuiltinAlgorithm, data: &TypedArray) -> Result<Vec<u8>> {
    if !alg.accepts(data) {
        return Err(Error::invalid_algorithm_data(format!(
            "{} cannot carry {}",
            alg.name(),
            data.type_name()
        )));
    }
    alg.encode_to_bytes(data)
}

/// Wire id and octets of `ea`.
pub(super) fn algorithm_octets(ea: &EaContent, vocabulary: &Vocabulary, registry: &AlgorithmRegistry) -> Result<(u8, Vec<u8>)> {
    match &ea.uri {
        Some(uri) => {
            let id = custom_algorithm_id(uri, vocabulary)?;
            let octets = match &ea.value {
                AlgorithmValue::Typed(data) => registry
                    .get(uri)
                    .ok_or_else(|| Error::UnsupportedAlgorithm(uri.to_string()))?
                    .encode_to_bytes(data)?,
                AlgorithmValue::Octets(o) => o.to_vec(),
            };
            Ok((id, octets))
        }
        None => {
            let alg = BuiltinAlgorithm::from_id(ea.algorithm).ok_or(Error::UnknownAlgorithm(ea.algorithm))?;
            let octets = match &ea.value {
                AlgorithmValue::Typed(data) => builtin_octets(alg, data)?,
                AlgorithmValue::Octets(o) => o.to_vec(),
            };
            Ok((ea.algorithm, octets))
        }
    }
}

impl Encoder {
    /// Packed octets of `text` in alphabet `id`.
    fn alphabet_octets(&self, id: u8, text: &str) -> Result<Vec<u8>> {
        let chars = alphabet::resolve(id, &self.vocabulary.restricted_alphabets)?;
        alphabet::encode(&chars, text)
    }

    pub(super) fn write_attribute_text(&mut self, value: &str) -> Result<()> {
        let limit = self.options.attribute_value_size_limit;
        write_non_identifying(&mut self.out, &mut self.vocabulary.attribute_values, value, limit)
    }

    pub(super) fn write_attribute_restricted(&mut self, id: u8, value: &str) -> Result<()> {
        if value.is_empty() {
            self.out.write(NIS_EMPTY);
            return Ok(());
        }
        let octets = self.alphabet_octets(id, value)?;
        write_non_identifying_encoded(&mut self.out, NIS_RESTRICTED_ALPHABET, id, &octets)
    }

    pub(super) fn write_attribute_algorithm(&mut self, ea: &EaContent) -> Result<()> {
        let (id, octets) = algorithm_octets(ea, &self.vocabulary, &self.options.algorithms)?;
        write_non_identifying_encoded(&mut self.out, NIS_ENCODING_ALGORITHM, id, &octets)
    }

    pub(super) fn write_text_chunk(&mut self, value: &str) -> Result<()> {
        let limit = self.options.character_chunk_size_limit;
        write_chunk(&mut self.out, &mut self.vocabulary.character_chunks, value, limit)
    }

    pub(super) fn write_cdata_chunk(&mut self, value: &str) -> Result<()> {
        write_chunk_encoded(&mut self.out, CII_ENCODING_ALGORITHM, algorithm::CDATA, value.as_bytes())
    }

    pub(super) fn write_restricted_chunk(&mut self, id: u8, value: &str) -> Result<()> {
        let octets = self.alphabet_octets(id, value)?;
        write_chunk_encoded(&mut self.out, CII_RESTRICTED_ALPHABET, id, &octets)
    }

    /// Algorithm data as a character chunk.
    ///
    /// Chunk-Längen beginnen bei 1: leere Arrays sind nicht darstellbar.
    pub(super) fn write_algorithm_chunk(&mut self, ea: &EaContent) -> Result<()> {
        let (id, octets) = algorithm_octets(ea, &self.vocabulary, &self.options.algorithms)?;
        if octets.is_empty() {
            return Err(Error::unsupported("empty encoded value in character chunk"));
        }
        write_chunk_encoded(&mut self.out, CII_ENCODING_ALGORITHM, id, &octets)
    }

    /// Comment text: other-string table, never added.
    pub(super) fn write_comment_text(&mut self, text: &str) -> Result<()> {
        write_non_identifying(&mut self.out, &mut self.vocabulary.other_strings, text, 0)
    }

    /// PI data and the version string: other-string table, added below the chunk limit.
    pub(super) fn write_other_string(&mut self, text: &str) -> Result<()> {
        let limit = self.options.character_chunk_size_limit;
        write_non_identifying(&mut self.out, &mut self.vocabulary.other_strings, text, limit)
    }
}
