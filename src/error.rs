//! Central error types for the Fast Infoset codec.
//!
//! Every variant belongs to exactly one [`ErrorKind`], so callers can tell a
//! corrupt stream apart from a stream that merely needs a vocabulary or codec
//! they did not supply.

use core::fmt;
use std::borrow::Cow;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The octet stream does not follow the wire format.
    MalformedInput,
    /// A table index, algorithm, alphabet or external vocabulary cannot be resolved.
    UnresolvedReference,
    /// The stream or the caller uses a feature this codec does not provide.
    UnsupportedFeature,
    /// The API was driven in an order or with arguments it does not accept.
    CallerContract,
    /// The underlying byte source or sink failed.
    Io,
}

/// All errors raised while encoding or decoding Fast Infoset documents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The four magic octets `E0 00 00 01` are missing.
    InvalidMagic { offset: u64 },
    /// The magic is present but names a version other than 1.
    UnsupportedVersion(u16),
    /// The leading XML declaration is not one of the permitted `finf` forms.
    InvalidXmlDeclaration,
    /// The input ended in the middle of a construct.
    PrematureEndOfStream { offset: u64 },
    /// A leading octet does not classify to any construct valid at this point.
    InvalidConstruct {
        /// Das fehlerhafte Octet.
        octet: u8,
        /// Absolute Position im Stream.
        offset: u64,
        /// Was gerade gelesen wurde (z.B. "attribute", "child of element").
        context: &'static str,
    },
    /// A literal string is not valid UTF-8.
    InvalidUtf8 { offset: u64 },
    /// A literal string is not valid UTF-16.
    InvalidUtf16 { offset: u64 },
    /// An index or length exceeds what the wire format or the platform can represent.
    IntegerOverflow(u64),
    /// The document contains no element.
    NoDocumentElement,
    /// A vocabulary index was never assigned.
    IndexOutOfRange {
        table: &'static str,
        index: usize,
        len: usize,
    },
    /// The stream references an external vocabulary that was not supplied.
    UnknownExternalVocabulary(String),
    /// An encoding algorithm id is reserved or has no URI in the vocabulary.
    UnknownAlgorithm(u8),
    /// An encoding algorithm URI has no registered codec or vocabulary entry.
    UnsupportedAlgorithm(String),
    /// A restricted alphabet id is reserved or has no vocabulary entry.
    UnknownAlphabet(u8),
    /// Algorithm octets or text cannot be converted (wrong length, bad digit, ...).
    InvalidAlgorithmData(Cow<'static, str>),
    /// A character is not part of the restricted alphabet used to encode it.
    InvalidAlphabetCharacter(char),
    /// A construct the codec deliberately does not handle.
    UnsupportedFeature(Cow<'static, str>),
    /// API calls arrive in an order the document structure does not allow.
    OrderingViolation {
        /// Was erwartet wurde.
        expected: Cow<'static, str>,
        /// Was stattdessen kam.
        found: Cow<'static, str>,
    },
    /// A name is not usable on the wire (empty local name, prefix without namespace, ...).
    InvalidName(Cow<'static, str>),
    /// XML text could not be parsed.
    XmlParseError(String),
    /// The byte source or sink failed.
    IoError {
        /// Welches Konstrukt gerade gelesen/geschrieben wurde.
        context: &'static str,
        kind: std::io::ErrorKind,
        message: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic { offset } => {
                write!(f, "missing Fast Infoset magic E0 00 00 01 at offset {offset}")
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported Fast Infoset version {v}"),
            Self::InvalidXmlDeclaration => {
                write!(f, "invalid XML declaration in front of Fast Infoset document")
            }
            Self::PrematureEndOfStream { offset } => {
                write!(f, "premature end of Fast Infoset stream at offset {offset}")
            }
            Self::InvalidConstruct { octet, offset, context } => write!(
                f,
                "invalid octet 0x{octet:02X} at offset {offset} while reading {context}"
            ),
            Self::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 string ending at offset {offset}"),
            Self::InvalidUtf16 { offset } => {
                write!(f, "invalid UTF-16 string ending at offset {offset}")
            }
            Self::IntegerOverflow(v) => write!(f, "integer {v} exceeds the representable range"),
            Self::NoDocumentElement => write!(f, "document has no element"),
            Self::IndexOutOfRange { table, index, len } => write!(
                f,
                "index {index} out of range for {table} table with {len} entries"
            ),
            Self::UnknownExternalVocabulary(uri) => {
                write!(f, "external vocabulary '{uri}' is not available")
            }
            Self::UnknownAlgorithm(id) => write!(f, "encoding algorithm id {id} is not resolvable"),
            Self::UnsupportedAlgorithm(uri) => {
                write!(f, "encoding algorithm '{uri}' is not supported")
            }
            Self::UnknownAlphabet(id) => write!(f, "restricted alphabet id {id} is not resolvable"),
            Self::InvalidAlgorithmData(msg) => write!(f, "invalid encoding algorithm data: {msg}"),
            Self::InvalidAlphabetCharacter(c) => {
                write!(f, "character {c:?} is not in the restricted alphabet")
            }
            Self::UnsupportedFeature(what) => write!(f, "unsupported feature: {what}"),
            Self::OrderingViolation { expected, found } => {
                if expected.is_empty() && found.is_empty() {
                    write!(f, "event ordering violation")
                } else {
                    write!(f, "event ordering violation: expected {expected}, found {found}")
                }
            }
            Self::InvalidName(msg) => write!(f, "invalid name: {msg}"),
            Self::XmlParseError(msg) => write!(f, "XML parse error: {msg}"),
            Self::IoError { context, kind, message } => {
                write!(f, "IO error while {context} ({kind:?}): {message}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagic { .. }
            | Self::InvalidXmlDeclaration
            | Self::PrematureEndOfStream { .. }
            | Self::InvalidConstruct { .. }
            | Self::InvalidUtf8 { .. }
            | Self::InvalidUtf16 { .. }
            | Self::IntegerOverflow(_)
            | Self::NoDocumentElement
            | Self::InvalidAlgorithmData(_)
            | Self::XmlParseError(_) => ErrorKind::MalformedInput,
            Self::IndexOutOfRange { .. }
            | Self::UnknownExternalVocabulary(_)
            | Self::UnknownAlgorithm(_)
            | Self::UnknownAlphabet(_) => ErrorKind::UnresolvedReference,
            Self::UnsupportedVersion(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            Self::OrderingViolation { .. }
            | Self::InvalidName(_)
            | Self::InvalidAlphabetCharacter(_) => ErrorKind::CallerContract,
            Self::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Creates an `OrderingViolation` with context.
    pub fn ordering_violation(
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::OrderingViolation {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates an `InvalidAlgorithmData` error.
    pub fn invalid_algorithm_data(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidAlgorithmData(msg.into())
    }

    /// Creates an `UnsupportedFeature` error.
    pub fn unsupported(what: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFeature(what.into())
    }

    /// Wraps an I/O error, keeping its kind.
    pub fn io(context: &'static str, err: std::io::Error) -> Self {
        Self::IoError {
            context,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
