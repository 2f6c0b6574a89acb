//! Document header: optional XML declaration, magic, document flags and the
//! optional document components.
//!
//! Aufbau:
//! - [XML-Deklaration] (optional): `<?xml ... encoding='finf'?>`
//! - Magic `E0 00 00 01` (Identifikation + Version 1)
//! - Flag-Octet, danach in dieser Reihenfolge: additional data, initial
//!   vocabulary, notations, unparsed entities, character encoding scheme,
//!   standalone, version
//!
//! # Beispiel
//!
//! ```
//! use fastinfoset::header::DocumentHeader;
//!
//! let header = DocumentHeader::new().with_standalone(true);
//! assert_eq!(header.standalone, Some(true));
//! assert!(header.xml_declaration.is_none());
//! ```

use std::io::Read;

use crate::integer::{self, Tier};
use crate::octets::{OctetReader, OctetWriter};
use crate::vocabulary::{InitialVocabulary, NameSurrogate, VocabularyTables};
use crate::{Error, Result};

/// Identification and version octets.
pub const MAGIC: [u8; 4] = [0xE0, 0x00, 0x00, 0x01];

pub(crate) const ADDITIONAL_DATA_FLAG: u8 = 0x40;
pub(crate) const INITIAL_VOCABULARY_FLAG: u8 = 0x20;
pub(crate) const NOTATIONS_FLAG: u8 = 0x10;
pub(crate) const UNPARSED_ENTITIES_FLAG: u8 = 0x08;
pub(crate) const CHARACTER_ENCODING_SCHEME_FLAG: u8 = 0x04;
pub(crate) const STANDALONE_FLAG: u8 = 0x02;
pub(crate) const VERSION_FLAG: u8 = 0x01;

// Initial Vocabulary, erstes Octet
const IV_EXTERNAL_VOCABULARY: u8 = 0x10;
const IV_RESTRICTED_ALPHABETS: u8 = 0x08;
const IV_ENCODING_ALGORITHMS: u8 = 0x04;
const IV_PREFIXES: u8 = 0x02;
const IV_NAMESPACE_NAMES: u8 = 0x01;
// Initial Vocabulary, zweites Octet
const IV_LOCAL_NAMES: u8 = 0x80;
const IV_OTHER_NCNAMES: u8 = 0x40;
const IV_OTHER_URIS: u8 = 0x20;
const IV_ATTRIBUTE_VALUES: u8 = 0x10;
const IV_CHARACTER_CHUNKS: u8 = 0x08;
const IV_OTHER_STRINGS: u8 = 0x04;
const IV_ELEMENT_NAME_SURROGATES: u8 = 0x02;
const IV_ATTRIBUTE_NAME_SURROGATES: u8 = 0x01;

const SURROGATE_PREFIX_FLAG: u8 = 0x02;
const SURROGATE_NAMESPACE_FLAG: u8 = 0x01;

/// The XML declaration written when none is configured explicitly.
pub const DEFAULT_XML_DECLARATION: &str = "<?xml version='1.0' encoding='finf'?>";

/// Längste erlaubte Deklaration (version + standalone).
const MAX_XML_DECLARATION: usize = 64;

/// One additional-data item: an opaque payload identified by URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalData {
    pub id: String,
    pub data: Vec<u8>,
}

/// Document-level properties carried in the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentHeader {
    /// XML declaration in front of the magic.
    pub xml_declaration: Option<String>,
    pub additional_data: Vec<AdditionalData>,
    /// URI of the external vocabulary the document was encoded against.
    /// Filled by the decoder; the encoder takes it from its initial vocabulary.
    pub external_vocabulary: Option<String>,
    pub character_encoding_scheme: Option<String>,
    pub standalone: Option<bool>,
    pub version: Option<String>,
}

impl DocumentHeader {
    /// Empty header: magic and flags only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the default XML declaration.
    pub fn with_xml_declaration(mut self) -> Self {
        self.xml_declaration = Some(DEFAULT_XML_DECLARATION.to_string());
        self
    }

    /// Sets the standalone property.
    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = Some(standalone);
        self
    }

    /// Sets the XML version property.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the character encoding scheme property.
    pub fn with_character_encoding_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.character_encoding_scheme = Some(scheme.into());
        self
    }

    /// Appends one additional-data item.
    pub fn with_additional_data(mut self, id: impl Into<String>, data: Vec<u8>) -> Self {
        self.additional_data.push(AdditionalData { id: id.into(), data });
        self
    }
}

/// Every XML declaration a Fast Infoset document may start with.
pub fn permitted_xml_declarations() -> Vec<String> {
    let mut out = Vec::with_capacity(18);
    for q in ['\'', '"'] {
        for version in [None, Some("1.0"), Some("1.1")] {
            for standalone in [None, Some("no"), Some("yes")] {
                let mut decl = String::from("<?xml");
                if let Some(v) = version {
                    decl.push_str(&format!(" version={q}{v}{q}"));
                }
                decl.push_str(&format!(" encoding={q}finf{q}"));
                if let Some(s) = standalone {
                    decl.push_str(&format!(" standalone={q}{s}{q}"));
                }
                decl.push_str("?>");
                out.push(decl);
            }
        }
    }
    out
}

fn is_permitted_xml_declaration(decl: &str) -> bool {
    permitted_xml_declarations().iter().any(|d| d == decl)
}

// ============================================================================
// Encoding
// ============================================================================

/// Writes a non-empty octet string whose length starts on the 2nd bit.
pub(crate) fn write_octet_string(w: &mut OctetWriter, octets: &[u8]) -> Result<()> {
    if octets.is_empty() {
        return Err(Error::unsupported("empty octet string in document header"));
    }
    integer::encode_length_2nd(w, 0x00, octets.len())?;
    w.write_all(octets);
    Ok(())
}

/// Writes the header up to (excluding) the version string, which needs the
/// other-string table. Returns the flag octet.
pub fn encode(w: &mut OctetWriter, header: &DocumentHeader, vocabulary: Option<&InitialVocabulary>) -> Result<u8> {
    if let Some(decl) = &header.xml_declaration {
        if !is_permitted_xml_declaration(decl) {
            return Err(Error::InvalidXmlDeclaration);
        }
        w.write_all(decl.as_bytes());
    }
    w.write_all(&MAGIC);

    let vocabulary = vocabulary.filter(|iv| iv.external.is_some() || !iv.additions.is_empty());
    let mut flags = 0u8;
    if !header.additional_data.is_empty() {
        flags |= ADDITIONAL_DATA_FLAG;
    }
    if vocabulary.is_some() {
        flags |= INITIAL_VOCABULARY_FLAG;
    }
    if header.character_encoding_scheme.is_some() {
        flags |= CHARACTER_ENCODING_SCHEME_FLAG;
    }
    if header.standalone.is_some() {
        flags |= STANDALONE_FLAG;
    }
    if header.version.is_some() {
        flags |= VERSION_FLAG;
    }
    w.write(flags);

    if !header.additional_data.is_empty() {
        integer::encode_sequence_length(w, header.additional_data.len())?;
        for item in &header.additional_data {
            write_octet_string(w, item.id.as_bytes())?;
            write_octet_string(w, &item.data)?;
        }
    }
    if let Some(iv) = vocabulary {
        encode_initial_vocabulary(w, iv)?;
    }
    if let Some(ces) = &header.character_encoding_scheme {
        write_octet_string(w, ces.as_bytes())?;
    }
    if let Some(standalone) = header.standalone {
        w.write(u8::from(standalone));
    }
    Ok(flags)
}

fn encode_initial_vocabulary(w: &mut OctetWriter, iv: &InitialVocabulary) -> Result<()> {
    let t = &iv.additions;
    let mut b1 = 0u8;
    let mut b2 = 0u8;
    for (present, flag) in [
        (iv.external.is_some(), IV_EXTERNAL_VOCABULARY),
        (!t.restricted_alphabets.is_empty(), IV_RESTRICTED_ALPHABETS),
        (!t.encoding_algorithms.is_empty(), IV_ENCODING_ALGORITHMS),
        (!t.prefixes.is_empty(), IV_PREFIXES),
        (!t.namespace_names.is_empty(), IV_NAMESPACE_NAMES),
    ] {
        if present {
            b1 |= flag;
        }
    }
    for (present, flag) in [
        (!t.local_names.is_empty(), IV_LOCAL_NAMES),
        (!t.other_ncnames.is_empty(), IV_OTHER_NCNAMES),
        (!t.other_uris.is_empty(), IV_OTHER_URIS),
        (!t.attribute_values.is_empty(), IV_ATTRIBUTE_VALUES),
        (!t.character_chunks.is_empty(), IV_CHARACTER_CHUNKS),
        (!t.other_strings.is_empty(), IV_OTHER_STRINGS),
        (!t.element_names.is_empty(), IV_ELEMENT_NAME_SURROGATES),
        (!t.attribute_names.is_empty(), IV_ATTRIBUTE_NAME_SURROGATES),
    ] {
        if present {
            b2 |= flag;
        }
    }
    w.write(b1);
    w.write(b2);

    if let Some(ext) = &iv.external {
        write_octet_string(w, ext.uri.as_bytes())?;
    }
    for list in [
        &t.restricted_alphabets,
        &t.encoding_algorithms,
        &t.prefixes,
        &t.namespace_names,
        &t.local_names,
        &t.other_ncnames,
        &t.other_uris,
        &t.attribute_values,
        &t.character_chunks,
        &t.other_strings,
    ] {
        if list.is_empty() {
            continue;
        }
        integer::encode_sequence_length(w, list.len())?;
        for s in list {
            write_octet_string(w, s.as_bytes())?;
        }
    }
    for list in [&t.element_names, &t.attribute_names] {
        if list.is_empty() {
            continue;
        }
        integer::encode_sequence_length(w, list.len())?;
        for s in list {
            encode_surrogate(w, s)?;
        }
    }
    Ok(())
}

fn encode_surrogate(w: &mut OctetWriter, s: &NameSurrogate) -> Result<()> {
    if s.prefix.is_some() && s.namespace_name.is_none() {
        return Err(Error::InvalidName("name surrogate has a prefix but no namespace".into()));
    }
    let mut b = 0u8;
    if s.prefix.is_some() {
        b |= SURROGATE_PREFIX_FLAG;
    }
    if s.namespace_name.is_some() {
        b |= SURROGATE_NAMESPACE_FLAG;
    }
    w.write(b);
    if let Some(p) = s.prefix {
        integer::encode_index_2nd(w, 0x00, p)?;
    }
    if let Some(n) = s.namespace_name {
        integer::encode_index_2nd(w, 0x00, n)?;
    }
    integer::encode_index_2nd(w, 0x00, s.local_name)
}

// ============================================================================
// Decoding
// ============================================================================

/// Header components read before the version string.
#[derive(Debug, Default)]
pub struct DecodedHeader {
    pub header: DocumentHeader,
    pub initial_vocabulary: Option<VocabularyTables>,
    /// The version string follows and must be read by the caller.
    pub has_version: bool,
}

/// Reads a non-empty octet string whose length starts on the 2nd bit.
pub(crate) fn read_octet_string<R: Read>(r: &mut OctetReader<R>) -> Result<Vec<u8>> {
    let offset = r.offset();
    let b = r.read()?;
    let tier = integer::length_tier_2nd(b)
        .filter(|_| b & 0x80 == 0)
        .ok_or(Error::InvalidConstruct { octet: b, offset, context: "octet string length" })?;
    let len = integer::decode_length_2nd(tier, b, r)?;
    r.read_vec(len)
}

fn read_utf8<R: Read>(r: &mut OctetReader<R>) -> Result<String> {
    let bytes = read_octet_string(r)?;
    String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8 { offset: r.offset() })
}

/// Reads the optional XML declaration and the magic.
pub fn decode_preamble<R: Read>(r: &mut OctetReader<R>) -> Result<Option<String>> {
    let mut declaration = None;
    if r.peek()? == Some(b'<') {
        let mut raw = Vec::with_capacity(MAX_XML_DECLARATION);
        while !raw.ends_with(b"?>") {
            if raw.len() >= MAX_XML_DECLARATION {
                return Err(Error::InvalidXmlDeclaration);
            }
            raw.push(r.read()?);
        }
        let decl = String::from_utf8(raw).map_err(|_| Error::InvalidXmlDeclaration)?;
        if !is_permitted_xml_declaration(&decl) {
            return Err(Error::InvalidXmlDeclaration);
        }
        declaration = Some(decl);
    }
    let offset = r.offset();
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic[..2] != MAGIC[..2] {
        return Err(Error::InvalidMagic { offset });
    }
    let version = u16::from_be_bytes([magic[2], magic[3]]);
    if version != 1 {
        return Err(Error::UnsupportedVersion(version));
    }
    Ok(declaration)
}

/// Reads the flag octet and every component up to (excluding) the version.
pub fn decode<R: Read>(r: &mut OctetReader<R>) -> Result<DecodedHeader> {
    let mut out = DecodedHeader::default();
    out.header.xml_declaration = decode_preamble(r)?;

    let offset = r.offset();
    let flags = r.read()?;
    if flags & 0x80 != 0 {
        return Err(Error::InvalidConstruct { octet: flags, offset, context: "document flags" });
    }
    if flags & ADDITIONAL_DATA_FLAG != 0 {
        let n = integer::decode_sequence_length(r)?;
        for _ in 0..n {
            let id = read_utf8(r)?;
            let data = read_octet_string(r)?;
            out.header.additional_data.push(AdditionalData { id, data });
        }
    }
    if flags & INITIAL_VOCABULARY_FLAG != 0 {
        let (external, tables) = decode_initial_vocabulary(r)?;
        out.header.external_vocabulary = external;
        out.initial_vocabulary = Some(tables);
    }
    if flags & NOTATIONS_FLAG != 0 {
        return Err(Error::unsupported("notation items"));
    }
    if flags & UNPARSED_ENTITIES_FLAG != 0 {
        return Err(Error::unsupported("unparsed entity items"));
    }
    if flags & CHARACTER_ENCODING_SCHEME_FLAG != 0 {
        out.header.character_encoding_scheme = Some(read_utf8(r)?);
    }
    if flags & STANDALONE_FLAG != 0 {
        let offset = r.offset();
        out.header.standalone = Some(match r.read()? {
            0 => false,
            1 => true,
            b => return Err(Error::InvalidConstruct { octet: b, offset, context: "standalone" }),
        });
    }
    out.has_version = flags & VERSION_FLAG != 0;
    Ok(out)
}

fn decode_initial_vocabulary<R: Read>(r: &mut OctetReader<R>) -> Result<(Option<String>, VocabularyTables)> {
    let offset = r.offset();
    let b1 = r.read()?;
    if b1 & 0xE0 != 0 {
        return Err(Error::InvalidConstruct { octet: b1, offset, context: "initial vocabulary flags" });
    }
    let b2 = r.read()?;
    let external = if b1 & IV_EXTERNAL_VOCABULARY != 0 { Some(read_utf8(r)?) } else { None };

    let mut t = VocabularyTables::default();
    let string_lists: [(bool, &mut Vec<String>); 10] = [
        (b1 & IV_RESTRICTED_ALPHABETS != 0, &mut t.restricted_alphabets),
        (b1 & IV_ENCODING_ALGORITHMS != 0, &mut t.encoding_algorithms),
        (b1 & IV_PREFIXES != 0, &mut t.prefixes),
        (b1 & IV_NAMESPACE_NAMES != 0, &mut t.namespace_names),
        (b2 & IV_LOCAL_NAMES != 0, &mut t.local_names),
        (b2 & IV_OTHER_NCNAMES != 0, &mut t.other_ncnames),
        (b2 & IV_OTHER_URIS != 0, &mut t.other_uris),
        (b2 & IV_ATTRIBUTE_VALUES != 0, &mut t.attribute_values),
        (b2 & IV_CHARACTER_CHUNKS != 0, &mut t.character_chunks),
        (b2 & IV_OTHER_STRINGS != 0, &mut t.other_strings),
    ];
    for (present, list) in string_lists {
        if !present {
            continue;
        }
        let n = integer::decode_sequence_length(r)?;
        for _ in 0..n {
            list.push(read_utf8(r)?);
        }
    }
    for (present, list) in [
        (b2 & IV_ELEMENT_NAME_SURROGATES != 0, &mut t.element_names),
        (b2 & IV_ATTRIBUTE_NAME_SURROGATES != 0, &mut t.attribute_names),
    ] {
        if !present {
            continue;
        }
        let n = integer::decode_sequence_length(r)?;
        for _ in 0..n {
            list.push(decode_surrogate(r)?);
        }
    }
    Ok((external, t))
}

fn read_index<R: Read>(r: &mut OctetReader<R>) -> Result<usize> {
    let offset = r.offset();
    let b = r.read()?;
    let tier: Tier = integer::index_tier_2nd(b)
        .filter(|_| b & 0x80 == 0)
        .ok_or(Error::InvalidConstruct { octet: b, offset, context: "name surrogate index" })?;
    integer::decode_index_2nd(tier, b, r)
}

fn decode_surrogate<R: Read>(r: &mut OctetReader<R>) -> Result<NameSurrogate> {
    let offset = r.offset();
    let b = r.read()?;
    if b & 0xFC != 0 || b == SURROGATE_PREFIX_FLAG {
        return Err(Error::InvalidConstruct { octet: b, offset, context: "name surrogate" });
    }
    let prefix = if b & SURROGATE_PREFIX_FLAG != 0 { Some(read_index(r)?) } else { None };
    let namespace_name = if b & SURROGATE_NAMESPACE_FLAG != 0 { Some(read_index(r)?) } else { None };
    let local_name = read_index(r)?;
    Ok(NameSurrogate { prefix, namespace_name, local_name })
}
