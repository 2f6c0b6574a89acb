//! Qualified names.
//!
//! A name on the wire is a triple of optional prefix, optional namespace name
//! and local name. Two names are the same name when namespace and local name
//! match; the prefix only travels along so literals round-trip as written.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use ahash::AHasher;

/// The namespace bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// The namespace of `xmlns` attributes. Never encoded as an attribute.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
/// The reserved `xml` prefix.
pub const XML_PREFIX: &str = "xml";

/// An element or attribute name.
///
/// `PartialEq`, `Eq` and `Hash` only consider `uri` and `local_name`.
/// `identity` ist ein vorberechneter 64-Bit-Hash von (uri, local_name).
#[derive(Clone)]
pub struct QName {
    /// The namespace name. Empty string means no namespace.
    pub uri: Rc<str>,
    /// The local name.
    pub local_name: Rc<str>,
    /// The prefix as written. `None` for unprefixed names.
    pub prefix: Option<Rc<str>>,
    identity: u64,
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QName")
            .field("uri", &self.uri)
            .field("local_name", &self.local_name)
            .field("prefix", &self.prefix)
            .finish()
    }
}

/// Berechnet den Identity-Hash für ein QName (uri + local_name).
pub(crate) fn compute_identity(uri: &str, local_name: &str) -> u64 {
    let mut hasher = AHasher::default();
    uri.hash(&mut hasher);
    local_name.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.uri == other.uri
            && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl PartialEq<QName> for Rc<QName> {
    fn eq(&self, other: &QName) -> bool {
        **self == *other
    }
}

impl PartialEq<Rc<QName>> for QName {
    fn eq(&self, other: &Rc<QName>) -> bool {
        *self == **other
    }
}

/// Sortierung: erst local_name, dann uri. Prefix wird ignoriert.
impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

/// Display: `prefix:local_name` when a prefix is present, else `local_name`.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(pfx) if !pfx.is_empty() => write!(f, "{pfx}:{}", self.local_name),
            _ => f.write_str(&self.local_name),
        }
    }
}

impl QName {
    /// Creates a name without prefix.
    pub fn new(uri: impl Into<Rc<str>>, local_name: impl Into<Rc<str>>) -> Self {
        let uri = uri.into();
        let local_name = local_name.into();
        let identity = compute_identity(&uri, &local_name);
        Self { uri, local_name, prefix: None, identity }
    }

    /// Creates a name with prefix. An empty prefix is stored as `None`.
    pub fn with_prefix(
        uri: impl Into<Rc<str>>,
        local_name: impl Into<Rc<str>>,
        prefix: impl Into<Rc<str>>,
    ) -> Self {
        let mut name = Self::new(uri, local_name);
        let prefix = prefix.into();
        if !prefix.is_empty() {
            name.prefix = Some(prefix);
        }
        name
    }

    /// Creates a name from already shared parts.
    pub(crate) fn from_parts(prefix: Option<Rc<str>>, uri: Rc<str>, local_name: Rc<str>) -> Self {
        let identity = compute_identity(&uri, &local_name);
        Self { uri, local_name, prefix: prefix.filter(|p| !p.is_empty()), identity }
    }

    /// The prefix, or `""` when absent.
    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Equal name *and* equal prefix.
    ///
    /// Der Encoder vergleicht Tabelleneinträge so, damit ein Index nie
    /// einen anderen Prefix als den geschriebenen zurückliefert.
    pub fn same_spelling(&self, other: &QName) -> bool {
        self == other && self.prefix_str() == other.prefix_str()
    }

    /// Returns `true` for names in the `xmlns` namespace.
    pub fn is_xmlns(&self) -> bool {
        &*self.uri == XMLNS_NAMESPACE
    }
}

/// One namespace declaration (`xmlns:prefix="uri"`); an empty prefix is the
/// default namespace, an empty `uri` undeclares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceDecl {
    pub prefix: Rc<str>,
    pub uri: Rc<str>,
}

impl NamespaceDecl {
    /// Creates a declaration.
    pub fn new(prefix: impl Into<Rc<str>>, uri: impl Into<Rc<str>>) -> Self {
        Self { prefix: prefix.into(), uri: uri.into() }
    }
}
