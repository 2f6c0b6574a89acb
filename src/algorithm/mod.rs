//! Encoding algorithms: typed arrays carried as octets instead of text.
//!
//! Ids 0..=9 are the built-in algorithms, 10..=31 are reserved and ids from
//! 32 upward index the vocabulary's encoding-algorithm URI table. The
//! built-ins form a closed set ([`BuiltinAlgorithm`]); application algorithms
//! are looked up by URI in an [`AlgorithmRegistry`] once per construct.

mod builtin;

use std::fmt;
use std::sync::Arc;

pub use builtin::BuiltinAlgorithm;

use crate::{Error, FastIndexMap, Result};

pub const HEXADECIMAL: u8 = 0;
pub const BASE64: u8 = 1;
pub const SHORT: u8 = 2;
pub const INT: u8 = 3;
pub const LONG: u8 = 4;
pub const BOOLEAN: u8 = 5;
pub const FLOAT: u8 = 6;
pub const DOUBLE: u8 = 7;
pub const UUID: u8 = 8;
pub const CDATA: u8 = 9;
/// Highest built-in id.
pub const LAST_BUILTIN: u8 = CDATA;
/// First application-defined id; `id - APPLICATION_START` indexes the URI table.
pub const APPLICATION_START: u8 = 32;

/// A contiguous array of primitive values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Bytes(Vec<u8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Booleans(Vec<bool>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    /// 128-bit UUIDs, most significant 64 bits first on the wire.
    Uuids(Vec<u128>),
}

impl TypedArray {
    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(v) => v.len(),
            Self::Shorts(v) => v.len(),
            Self::Ints(v) => v.len(),
            Self::Longs(v) => v.len(),
            Self::Booleans(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Doubles(v) => v.len(),
            Self::Uuids(v) => v.len(),
        }
    }

    /// Returns `true` when the array holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Shorts(_) => "shorts",
            Self::Ints(_) => "ints",
            Self::Longs(_) => "longs",
            Self::Booleans(_) => "booleans",
            Self::Floats(_) => "floats",
            Self::Doubles(_) => "doubles",
            Self::Uuids(_) => "uuids",
        }
    }

    /// The built-in algorithm that carries this array type by default.
    /// Bytes default to base64.
    pub fn default_algorithm(&self) -> BuiltinAlgorithm {
        match self {
            Self::Bytes(_) => BuiltinAlgorithm::Base64,
            Self::Shorts(_) => BuiltinAlgorithm::Short,
            Self::Ints(_) => BuiltinAlgorithm::Int,
            Self::Longs(_) => BuiltinAlgorithm::Long,
            Self::Booleans(_) => BuiltinAlgorithm::Boolean,
            Self::Floats(_) => BuiltinAlgorithm::Float,
            Self::Doubles(_) => BuiltinAlgorithm::Double,
            Self::Uuids(_) => BuiltinAlgorithm::Uuid,
        }
    }
}

/// A codec between typed arrays and their octet and text forms.
///
/// Implementations are shared between encoder and decoder instances and
/// must not keep per-document state.
pub trait EncodingAlgorithm: Send + Sync {
    /// Converts wire octets to an array.
    fn decode_from_bytes(&self, octets: &[u8]) -> Result<TypedArray>;
    /// Converts an array to wire octets.
    fn encode_to_bytes(&self, data: &TypedArray) -> Result<Vec<u8>>;
    /// Parses the canonical text form.
    fn convert_from_text(&self, text: &str) -> Result<TypedArray>;
    /// Produces the canonical text form.
    fn convert_to_text(&self, data: &TypedArray) -> Result<String>;
}

/// Application algorithms keyed by URI, in registration order.
///
/// The registry is filled before a document starts and only read while it
/// is processed; clone it (cheap, codecs are `Arc`s) to share it.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    algorithms: FastIndexMap<String, Arc<dyn EncodingAlgorithm>>,
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.algorithms.keys()).finish()
    }
}

impl AlgorithmRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `algorithm` under `uri`, returning the codec it replaces.
    pub fn register(
        &mut self,
        uri: impl Into<String>,
        algorithm: Arc<dyn EncodingAlgorithm>,
    ) -> Option<Arc<dyn EncodingAlgorithm>> {
        self.algorithms.insert(uri.into(), algorithm)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, uri: impl Into<String>, algorithm: Arc<dyn EncodingAlgorithm>) -> Self {
        self.register(uri, algorithm);
        self
    }

    /// Removes the codec registered under `uri`.
    pub fn unregister(&mut self, uri: &str) -> Option<Arc<dyn EncodingAlgorithm>> {
        self.algorithms.shift_remove(uri)
    }

    /// Codec registered under `uri`.
    pub fn get(&self, uri: &str) -> Option<&Arc<dyn EncodingAlgorithm>> {
        self.algorithms.get(uri)
    }

    /// Registered URIs in registration order.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.algorithms.keys().map(String::as_str)
    }

    /// Removes every codec.
    pub fn clear(&mut self) {
        self.algorithms.clear();
    }

    /// Number of registered codecs.
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }
}

/// What an algorithm id resolves to.
#[derive(Clone, Copy)]
pub enum Codec<'a> {
    Builtin(BuiltinAlgorithm),
    Custom { uri: &'a str, algorithm: &'a dyn EncodingAlgorithm },
    /// The URI is known from the vocabulary but has no registered codec.
    Unregistered { uri: &'a str },
}

/// Resolves `id` against the built-ins, the vocabulary URI table
/// (`uri_for(id - 32)`) and the registry.
pub fn resolve<'a>(
    id: u8,
    uri_for: impl FnOnce(usize) -> Option<&'a str>,
    registry: &'a AlgorithmRegistry,
) -> Result<Codec<'a>> {
    if id <= LAST_BUILTIN {
        return BuiltinAlgorithm::from_id(id).map(Codec::Builtin).ok_or(Error::UnknownAlgorithm(id));
    }
    if id < APPLICATION_START {
        return Err(Error::UnknownAlgorithm(id));
    }
    let uri = uri_for((id - APPLICATION_START) as usize).ok_or(Error::UnknownAlgorithm(id))?;
    Ok(match registry.get(uri) {
        Some(algorithm) => Codec::Custom { uri, algorithm: algorithm.as_ref() },
        None => Codec::Unregistered { uri },
    })
}
