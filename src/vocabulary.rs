//! Vocabulary: the interning tables shared by encoder and decoder.
//!
//! Every table is append-only and 0-based. The encoder adds an entry right
//! after writing the literal; the decoder adds it right after reading the
//! literal, so both sides assign identical indices. Entries from an external
//! or initial vocabulary occupy the low indices ("base"); [`Vocabulary::reset`]
//! drops everything a document added on top of them.

use std::rc::Rc;
use std::sync::Arc;

use log::{debug, warn};

use crate::integer::INDEX_LIMIT;
use crate::qname::{QName, XML_NAMESPACE, XML_PREFIX};
use crate::{Error, FastHashMap, Result};

/// Bis zu dieser Größe wird linear gesucht, danach über die HashMap.
const LINEAR_LOOKUP_THRESHOLD: usize = 16;

// ============================================================================
// StringTable
// ============================================================================

/// Append-only string table (prefixes, namespace names, values, ...).
#[derive(Debug, Clone)]
pub struct StringTable {
    name: &'static str,
    entries: Vec<Rc<str>>,
    /// String → erster Index. Lazy ab `LINEAR_LOOKUP_THRESHOLD`, nie im Decode-Modus.
    lookup: Option<FastHashMap<Rc<str>, usize>>,
    base_len: usize,
    decode_only: bool,
}

impl StringTable {
    /// Creates an empty table; `name` appears in error messages.
    pub fn new(name: &'static str) -> Self {
        Self { name, entries: Vec::new(), lookup: None, base_len: 0, decode_only: false }
    }

    /// Table name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Disables the reverse lookup. The decoder never searches by value.
    pub fn set_decode_only(&mut self) {
        self.decode_only = true;
        self.lookup = None;
    }

    /// Index of the first entry equal to `value`.
    #[inline]
    pub fn lookup(&self, value: &str) -> Option<usize> {
        match &self.lookup {
            Some(map) => map.get(value).copied(),
            None => self.entries.iter().position(|e| &**e == value),
        }
    }

    /// Appends `value` and returns its index, or `None` when the table is full.
    ///
    /// Duplikate sind erlaubt: der Decoder muss jedes Literal mit Add-Flag
    /// übernehmen, auch wenn ein anderer Encoder es doppelt schickt.
    pub fn add(&mut self, value: Rc<str>) -> Option<usize> {
        let index = self.entries.len();
        if index >= INDEX_LIMIT {
            return None;
        }
        if !self.decode_only {
            if let Some(map) = &mut self.lookup {
                map.entry(Rc::clone(&value)).or_insert(index);
            } else if index + 1 >= LINEAR_LOOKUP_THRESHOLD {
                let mut map = FastHashMap::with_capacity_and_hasher(index + 1, Default::default());
                for (i, e) in self.entries.iter().enumerate() {
                    map.entry(Rc::clone(e)).or_insert(i);
                }
                map.entry(Rc::clone(&value)).or_insert(index);
                self.lookup = Some(map);
            }
        }
        self.entries.push(value);
        if self.entries.len() == INDEX_LIMIT {
            warn!("{} table reached {INDEX_LIMIT} entries, further literals are not indexed", self.name);
        }
        Some(index)
    }

    /// Entry at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Rc<str>> {
        self.entries.get(index)
    }

    /// Entry at `index`, or an `IndexOutOfRange` error.
    pub fn resolve(&self, index: usize) -> Result<Rc<str>> {
        self.entries.get(index).cloned().ok_or(Error::IndexOutOfRange {
            table: self.name,
            index,
            len: self.entries.len(),
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that survive [`reset`](Self::reset).
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Makes every current entry part of the base.
    pub fn freeze(&mut self) {
        self.base_len = self.entries.len();
    }

    /// Drops all entries above the base.
    pub fn reset(&mut self) {
        if self.entries.len() == self.base_len {
            return;
        }
        self.entries.truncate(self.base_len);
        if let Some(map) = &mut self.lookup {
            let base = self.base_len;
            map.retain(|_, i| *i < base);
        }
    }

    /// Iterates over the entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<str>> {
        self.entries.iter()
    }
}

// ============================================================================
// NameTable
// ============================================================================

/// Append-only table of qualified names (element names, attribute names).
///
/// Names sharing a local name are grouped under that local name, so the
/// encoder only compares the few candidates that could match.
#[derive(Debug, Clone)]
pub struct NameTable {
    name: &'static str,
    entries: Vec<Rc<QName>>,
    by_local_name: FastHashMap<Rc<str>, Vec<usize>>,
    base_len: usize,
    decode_only: bool,
}

impl NameTable {
    /// Creates an empty table.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
            by_local_name: FastHashMap::default(),
            base_len: 0,
            decode_only: false,
        }
    }

    /// Disables the local-name index.
    pub fn set_decode_only(&mut self) {
        self.decode_only = true;
        self.by_local_name.clear();
    }

    /// Indices of all names with this local name.
    pub fn candidates(&self, local_name: &str) -> &[usize] {
        self.by_local_name.get(local_name).map_or(&[], Vec::as_slice)
    }

    /// Index of an entry with the same namespace, local name and prefix.
    pub fn find(&self, name: &QName) -> Option<usize> {
        self.candidates(&name.local_name)
            .iter()
            .copied()
            .find(|&i| self.entries[i].same_spelling(name))
    }

    /// Appends `name`, or returns `None` when the table is full.
    pub fn add(&mut self, name: Rc<QName>) -> Option<usize> {
        let index = self.entries.len();
        if index >= INDEX_LIMIT {
            return None;
        }
        if !self.decode_only {
            self.by_local_name
                .entry(Rc::clone(&name.local_name))
                .or_default()
                .push(index);
        }
        self.entries.push(name);
        if self.entries.len() == INDEX_LIMIT {
            warn!("{} table reached {INDEX_LIMIT} entries, further names are not indexed", self.name);
        }
        Some(index)
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&Rc<QName>> {
        self.entries.get(index)
    }

    /// Entry at `index`, or an `IndexOutOfRange` error.
    pub fn resolve(&self, index: usize) -> Result<Rc<QName>> {
        self.entries.get(index).cloned().ok_or(Error::IndexOutOfRange {
            table: self.name,
            index,
            len: self.entries.len(),
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Makes every current entry part of the base.
    pub fn freeze(&mut self) {
        self.base_len = self.entries.len();
    }

    /// Drops all entries above the base.
    pub fn reset(&mut self) {
        if self.entries.len() == self.base_len {
            return;
        }
        self.entries.truncate(self.base_len);
        let base = self.base_len;
        self.by_local_name.retain(|_, indices| {
            indices.retain(|&i| i < base);
            !indices.is_empty()
        });
    }
}

// ============================================================================
// Externe / initiale Vokabulare (reine Daten, Send + Sync)
// ============================================================================

/// A name expressed through indices into the prefix, namespace-name and
/// local-name tables, as it appears in an initial vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSurrogate {
    pub prefix: Option<usize>,
    pub namespace_name: Option<usize>,
    pub local_name: usize,
}

impl NameSurrogate {
    /// Surrogate without prefix and namespace.
    pub fn local(local_name: usize) -> Self {
        Self { prefix: None, namespace_name: None, local_name }
    }

    /// Surrogate in a namespace, optionally prefixed.
    pub fn qualified(prefix: Option<usize>, namespace_name: usize, local_name: usize) -> Self {
        Self { prefix, namespace_name: Some(namespace_name), local_name }
    }
}

/// Plain table contents used for external vocabularies and inline initial
/// vocabularies. Immutable once built, so it may be shared across threads
/// behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyTables {
    pub restricted_alphabets: Vec<String>,
    pub encoding_algorithms: Vec<String>,
    pub prefixes: Vec<String>,
    pub namespace_names: Vec<String>,
    pub local_names: Vec<String>,
    pub other_ncnames: Vec<String>,
    pub other_uris: Vec<String>,
    pub attribute_values: Vec<String>,
    pub character_chunks: Vec<String>,
    pub other_strings: Vec<String>,
    pub element_names: Vec<NameSurrogate>,
    pub attribute_names: Vec<NameSurrogate>,
}

impl VocabularyTables {
    /// Returns `true` when no table has entries.
    pub fn is_empty(&self) -> bool {
        self.restricted_alphabets.is_empty()
            && self.encoding_algorithms.is_empty()
            && self.prefixes.is_empty()
            && self.namespace_names.is_empty()
            && self.local_names.is_empty()
            && self.other_ncnames.is_empty()
            && self.other_uris.is_empty()
            && self.attribute_values.is_empty()
            && self.character_chunks.is_empty()
            && self.other_strings.is_empty()
            && self.element_names.is_empty()
            && self.attribute_names.is_empty()
    }
}

/// An external vocabulary: tables known to both sides, referenced by URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalVocabulary {
    pub uri: String,
    pub tables: Arc<VocabularyTables>,
}

impl ExternalVocabulary {
    /// Creates an external vocabulary.
    pub fn new(uri: impl Into<String>, tables: VocabularyTables) -> Self {
        Self { uri: uri.into(), tables: Arc::new(tables) }
    }
}

/// The vocabulary a document starts with: an optional external vocabulary
/// followed by inline additions written into the document header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialVocabulary {
    pub external: Option<ExternalVocabulary>,
    pub additions: VocabularyTables,
}

impl InitialVocabulary {
    /// Initial vocabulary that only references an external vocabulary.
    pub fn external(vocabulary: ExternalVocabulary) -> Self {
        Self { external: Some(vocabulary), additions: VocabularyTables::default() }
    }

    /// Initial vocabulary written inline.
    pub fn inline(additions: VocabularyTables) -> Self {
        Self { external: None, additions }
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

/// All tables of one encoder or decoder.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub restricted_alphabets: StringTable,
    pub encoding_algorithms: StringTable,
    pub prefixes: StringTable,
    pub namespace_names: StringTable,
    pub local_names: StringTable,
    pub other_ncnames: StringTable,
    pub other_uris: StringTable,
    pub attribute_values: StringTable,
    pub character_chunks: StringTable,
    pub other_strings: StringTable,
    pub element_names: NameTable,
    pub attribute_names: NameTable,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    /// Creates the built-in vocabulary: `xml` at prefix index 0 and the XML
    /// namespace at namespace-name index 0, everything else empty.
    pub fn new() -> Self {
        let mut v = Self {
            restricted_alphabets: StringTable::new("restricted alphabet"),
            encoding_algorithms: StringTable::new("encoding algorithm"),
            prefixes: StringTable::new("prefix"),
            namespace_names: StringTable::new("namespace name"),
            local_names: StringTable::new("local name"),
            other_ncnames: StringTable::new("other NCName"),
            other_uris: StringTable::new("other URI"),
            attribute_values: StringTable::new("attribute value"),
            character_chunks: StringTable::new("character chunk"),
            other_strings: StringTable::new("other string"),
            element_names: NameTable::new("element name"),
            attribute_names: NameTable::new("attribute name"),
        };
        v.prefixes.add(Rc::from(XML_PREFIX));
        v.namespace_names.add(Rc::from(XML_NAMESPACE));
        v.freeze();
        v
    }

    /// Built-in vocabulary without reverse lookups.
    pub fn for_decoding() -> Self {
        let mut v = Self::new();
        for t in v.string_tables_mut() {
            t.set_decode_only();
        }
        v.element_names.set_decode_only();
        v.attribute_names.set_decode_only();
        v
    }

    fn string_tables_mut(&mut self) -> [&mut StringTable; 10] {
        [
            &mut self.restricted_alphabets,
            &mut self.encoding_algorithms,
            &mut self.prefixes,
            &mut self.namespace_names,
            &mut self.local_names,
            &mut self.other_ncnames,
            &mut self.other_uris,
            &mut self.attribute_values,
            &mut self.character_chunks,
            &mut self.other_strings,
        ]
    }

    /// Appends the contents of `tables` behind the current entries.
    ///
    /// Name surrogates are resolved against the string tables after the
    /// strings of `tables` have been appended.
    pub fn load(&mut self, tables: &VocabularyTables) -> Result<()> {
        fn push_all(table: &mut StringTable, values: &[String]) {
            for v in values {
                table.add(Rc::from(v.as_str()));
            }
        }
        push_all(&mut self.restricted_alphabets, &tables.restricted_alphabets);
        push_all(&mut self.encoding_algorithms, &tables.encoding_algorithms);
        push_all(&mut self.prefixes, &tables.prefixes);
        push_all(&mut self.namespace_names, &tables.namespace_names);
        push_all(&mut self.local_names, &tables.local_names);
        push_all(&mut self.other_ncnames, &tables.other_ncnames);
        push_all(&mut self.other_uris, &tables.other_uris);
        push_all(&mut self.attribute_values, &tables.attribute_values);
        push_all(&mut self.character_chunks, &tables.character_chunks);
        push_all(&mut self.other_strings, &tables.other_strings);
        for s in &tables.element_names {
            let name = self.name_from_surrogate(s)?;
            self.element_names.add(Rc::new(name));
        }
        for s in &tables.attribute_names {
            let name = self.name_from_surrogate(s)?;
            self.attribute_names.add(Rc::new(name));
        }
        debug!(
            "loaded vocabulary: {} local names, {} element names, {} attribute names",
            tables.local_names.len(),
            tables.element_names.len(),
            tables.attribute_names.len()
        );
        Ok(())
    }

    /// Resolves a surrogate against the current tables.
    pub fn name_from_surrogate(&self, s: &NameSurrogate) -> Result<QName> {
        if s.prefix.is_some() && s.namespace_name.is_none() {
            return Err(Error::InvalidName("name surrogate has a prefix but no namespace".into()));
        }
        let prefix = s.prefix.map(|i| self.prefixes.resolve(i)).transpose()?;
        let uri = match s.namespace_name {
            Some(i) => self.namespace_names.resolve(i)?,
            None => Rc::from(""),
        };
        let local = self.local_names.resolve(s.local_name)?;
        Ok(QName::from_parts(prefix, uri, local))
    }

    /// Makes every current entry part of the base.
    pub fn freeze(&mut self) {
        for t in self.string_tables_mut() {
            t.freeze();
        }
        self.element_names.freeze();
        self.attribute_names.freeze();
    }

    /// Drops every entry added since the last [`freeze`](Self::freeze).
    pub fn reset(&mut self) {
        for t in self.string_tables_mut() {
            t.reset();
        }
        self.element_names.reset();
        self.attribute_names.reset();
    }
}
