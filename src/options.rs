//! Encoder and decoder options.
//!
//! # Beispiel
//!
//! ```
//! use fastinfoset::options::{EncoderOptions, Ignore};
//!
//! let opts = EncoderOptions::default()
//!     .with_ignore(Ignore { comments: true, ..Ignore::default() })
//!     .with_attribute_value_size_limit(64)
//!     .with_xml_declaration();
//!
//! assert!(opts.ignore().comments);
//! assert_eq!(opts.attribute_value_size_limit(), 64);
//! assert_eq!(opts.character_chunk_size_limit(), 32);
//! ```

use std::sync::Arc;

use crate::algorithm::AlgorithmRegistry;
use crate::header::{self, AdditionalData, DocumentHeader};
use crate::octets::DEFAULT_READ_BUFFER;
use crate::vocabulary::{ExternalVocabulary, InitialVocabulary, VocabularyTables};
use crate::{Error, FastHashMap, Result};

/// Default size limit below which attribute values and character chunks are
/// added to their tables.
pub const DEFAULT_SIZE_LIMIT: usize = 32;

/// Information items the encoder drops instead of writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ignore {
    pub comments: bool,
    pub processing_instructions: bool,
    /// Character runs consisting only of XML whitespace.
    pub whitespace_text: bool,
}

/// Options controlling how a document is encoded.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub(crate) attribute_value_size_limit: usize,
    pub(crate) character_chunk_size_limit: usize,
    pub(crate) ignore: Ignore,
    pub(crate) characters_as_cdata: bool,
    pub(crate) xml_declaration: Option<String>,
    pub(crate) standalone: Option<bool>,
    pub(crate) version: Option<String>,
    pub(crate) character_encoding_scheme: Option<String>,
    pub(crate) additional_data: Vec<AdditionalData>,
    pub(crate) initial_vocabulary: Option<InitialVocabulary>,
    pub(crate) algorithms: AlgorithmRegistry,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            attribute_value_size_limit: DEFAULT_SIZE_LIMIT,
            character_chunk_size_limit: DEFAULT_SIZE_LIMIT,
            ignore: Ignore::default(),
            characters_as_cdata: false,
            xml_declaration: None,
            standalone: None,
            version: None,
            character_encoding_scheme: None,
            additional_data: Vec::new(),
            initial_vocabulary: None,
            algorithms: AlgorithmRegistry::default(),
        }
    }
}

impl EncoderOptions {
    // --- Getter ---

    /// Attribute values shorter than this are added to the value table.
    pub fn attribute_value_size_limit(&self) -> usize { self.attribute_value_size_limit }
    /// Character chunks shorter than this are added to the chunk table.
    pub fn character_chunk_size_limit(&self) -> usize { self.character_chunk_size_limit }
    pub fn ignore(&self) -> Ignore { self.ignore }
    pub fn characters_as_cdata(&self) -> bool { self.characters_as_cdata }
    pub fn xml_declaration(&self) -> Option<&str> { self.xml_declaration.as_deref() }
    pub fn standalone(&self) -> Option<bool> { self.standalone }
    pub fn version(&self) -> Option<&str> { self.version.as_deref() }
    pub fn character_encoding_scheme(&self) -> Option<&str> { self.character_encoding_scheme.as_deref() }
    pub fn additional_data(&self) -> &[AdditionalData] { &self.additional_data }
    pub fn initial_vocabulary(&self) -> Option<&InitialVocabulary> { self.initial_vocabulary.as_ref() }
    pub fn algorithms(&self) -> &AlgorithmRegistry { &self.algorithms }

    // --- Builder ---

    pub fn with_attribute_value_size_limit(mut self, limit: usize) -> Self { self.attribute_value_size_limit = limit; self }
    pub fn with_character_chunk_size_limit(mut self, limit: usize) -> Self { self.character_chunk_size_limit = limit; self }
    pub fn with_ignore(mut self, ignore: Ignore) -> Self { self.ignore = ignore; self }
    pub fn with_characters_as_cdata(mut self) -> Self { self.characters_as_cdata = true; self }
    /// Writes the default `<?xml version='1.0' encoding='finf'?>` declaration.
    pub fn with_xml_declaration(mut self) -> Self { self.xml_declaration = Some(header::DEFAULT_XML_DECLARATION.to_string()); self }
    /// Writes a specific declaration; it must be one of the permitted `finf` forms.
    pub fn with_custom_xml_declaration(mut self, decl: impl Into<String>) -> Self { self.xml_declaration = Some(decl.into()); self }
    pub fn with_standalone(mut self, standalone: bool) -> Self { self.standalone = Some(standalone); self }
    pub fn with_version(mut self, version: impl Into<String>) -> Self { self.version = Some(version.into()); self }
    pub fn with_character_encoding_scheme(mut self, scheme: impl Into<String>) -> Self { self.character_encoding_scheme = Some(scheme.into()); self }
    pub fn with_additional_data(mut self, id: impl Into<String>, data: Vec<u8>) -> Self { self.additional_data.push(AdditionalData { id: id.into(), data }); self }
    pub fn with_initial_vocabulary(mut self, vocabulary: InitialVocabulary) -> Self { self.initial_vocabulary = Some(vocabulary); self }
    pub fn with_algorithms(mut self, algorithms: AlgorithmRegistry) -> Self { self.algorithms = algorithms; self }

    // --- Setter ---

    pub fn set_ignore(&mut self, ignore: Ignore) { self.ignore = ignore; }
    pub fn set_characters_as_cdata(&mut self, val: bool) { self.characters_as_cdata = val; }
    pub fn set_attribute_value_size_limit(&mut self, limit: usize) { self.attribute_value_size_limit = limit; }
    pub fn set_character_chunk_size_limit(&mut self, limit: usize) { self.character_chunk_size_limit = limit; }

    /// Header properties written in front of the body.
    pub(crate) fn header(&self) -> DocumentHeader {
        DocumentHeader {
            xml_declaration: self.xml_declaration.clone(),
            additional_data: self.additional_data.clone(),
            external_vocabulary: self
                .initial_vocabulary
                .as_ref()
                .and_then(|iv| iv.external.as_ref())
                .map(|ext| ext.uri.clone()),
            character_encoding_scheme: self.character_encoding_scheme.clone(),
            standalone: self.standalone,
            version: self.version.clone(),
        }
    }

    /// Rejects option values the header cannot carry.
    pub fn validate(&self) -> Result<()> {
        if let Some(decl) = &self.xml_declaration
            && !header::permitted_xml_declarations().iter().any(|d| d == decl)
        {
            return Err(Error::InvalidXmlDeclaration);
        }
        if self.additional_data.iter().any(|d| d.id.is_empty() || d.data.is_empty()) {
            return Err(Error::unsupported("additional data with empty id or payload"));
        }
        if self.character_encoding_scheme.as_deref() == Some("") {
            return Err(Error::unsupported("empty character encoding scheme"));
        }
        Ok(())
    }
}

/// Options controlling how a document is decoded.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    pub(crate) external_vocabularies: FastHashMap<String, Arc<VocabularyTables>>,
    pub(crate) algorithms: AlgorithmRegistry,
    pub(crate) octets_for_unknown_algorithms: bool,
    pub(crate) buffer_size: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            external_vocabularies: FastHashMap::default(),
            algorithms: AlgorithmRegistry::default(),
            octets_for_unknown_algorithms: false,
            buffer_size: DEFAULT_READ_BUFFER,
        }
    }
}

impl DecoderOptions {
    /// Tables of the external vocabulary registered under `uri`.
    pub fn external_vocabulary(&self, uri: &str) -> Option<&Arc<VocabularyTables>> { self.external_vocabularies.get(uri) }
    pub fn algorithms(&self) -> &AlgorithmRegistry { &self.algorithms }
    pub fn octets_for_unknown_algorithms(&self) -> bool { self.octets_for_unknown_algorithms }
    pub fn buffer_size(&self) -> usize { self.buffer_size }

    /// Makes an external vocabulary available to documents that reference it.
    pub fn with_external_vocabulary(mut self, vocabulary: ExternalVocabulary) -> Self {
        self.external_vocabularies.insert(vocabulary.uri, vocabulary.tables);
        self
    }
    pub fn with_algorithms(mut self, algorithms: AlgorithmRegistry) -> Self { self.algorithms = algorithms; self }
    /// Yields raw octets for application algorithms without a registered codec.
    pub fn with_octets_for_unknown_algorithms(mut self) -> Self { self.octets_for_unknown_algorithms = true; self }
    pub fn with_buffer_size(mut self, size: usize) -> Self { self.buffer_size = size.max(1); self }
}
