//! fastinfoset – Fast Infoset (ITU-T Rec. X.891) binary XML library
//!
//! # Beispiel
//!
//! ```
//! use std::rc::Rc;
//! use fastinfoset::{DecoderOptions, EncoderOptions, FiEvent, QName};
//! use fastinfoset::encoder::encode;
//! use fastinfoset::decoder::decode;
//!
//! // Encode
//! let events = vec![
//!     FiEvent::StartDocument,
//!     FiEvent::StartElement(Rc::new(QName::new("", "greeting"))),
//!     FiEvent::characters("Hello"),
//!     FiEvent::EndElement,
//!     FiEvent::EndDocument,
//! ];
//! let bytes = encode(&events, &EncoderOptions::default()).unwrap();
//! assert_eq!(&bytes[..4], &[0xE0, 0x00, 0x00, 0x01]);
//!
//! // Decode
//! let decoded = decode(&bytes).unwrap();
//! assert_eq!(decoded, events);
//! # let _ = DecoderOptions::default();
//! ```

pub mod algorithm;
pub mod alphabet;
pub mod bitstream;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod header;
pub mod integer;
pub mod namespace;
pub mod octets;
pub mod options;
pub mod qname;
pub mod vocabulary;
pub mod xml;
pub mod xml_serializer;

pub use error::{Error, ErrorKind, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent, für interne Datenstrukturen).
/// Nutzt hashbrown direkt für entry_ref() und raw_entry API.
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Events
pub use event::{
    AlgorithmValue, AtContent, AttributeValue, ChContent, CmContent, DtContent, EaContent, ErContent,
    FiEvent, PiContent, RaContent,
};

// Public API: Options
pub use options::{DecoderOptions, EncoderOptions, Ignore};

// Public API: Header
pub use header::{AdditionalData, DocumentHeader};

// Public API: Encoder/Decoder
pub use decoder::{Decoder, decode, decode_with_options};
pub use encoder::{Encoder, encode};

// Public API: Types
pub use algorithm::{AlgorithmRegistry, BuiltinAlgorithm, EncodingAlgorithm, TypedArray};
pub use namespace::NamespaceContext;
pub use qname::{NamespaceDecl, QName};
pub use vocabulary::{ExternalVocabulary, InitialVocabulary, VocabularyTables};

// Public API: XML
pub use xml::{parse_reader, parse_str, xml_reader_to_fi, xml_to_fi};
pub use xml_serializer::{XmlSerializer, events_to_xml, fi_reader_to_xml, fi_to_xml};
