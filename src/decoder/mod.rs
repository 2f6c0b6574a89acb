//! Fast Infoset decoder: octets in, events out.
//!
//! Der Decoder ist ein Pull-Parser. Jeder Aufruf von
//! [`next_event`](Decoder::next_event) liefert ein gepuffertes Event oder liest
//! genau ein Konstrukt: ein Element samt Namespaces und Attributen, einen
//! Textblock, einen Kommentar, eine PI oder einen Terminator. Das führende
//! Octet wird über die Tabellen in `tables` klassifiziert.
//!
//! # Beispiel
//!
//! ```
//! use fastinfoset::decoder::decode;
//! use fastinfoset::encoder::encode;
//! use fastinfoset::event::FiEvent;
//! use fastinfoset::options::EncoderOptions;
//!
//! let events_in = vec![
//!     FiEvent::StartDocument,
//!     FiEvent::start("root"),
//!     FiEvent::characters("hello"),
//!     FiEvent::EndElement,
//!     FiEvent::EndDocument,
//! ];
//! let bytes = encode(&events_in, &EncoderOptions::default()).unwrap();
//! let events_out = decode(&bytes).unwrap();
//! assert_eq!(events_in, events_out);
//! ```

mod api;
mod name;
mod tables;
mod value;

pub use api::{decode, decode_with_options};

use std::collections::VecDeque;
use std::io::Read;
use std::iter::FusedIterator;
use std::rc::Rc;

use log::{debug, trace};

use crate::event::{AtContent, CmContent, DtContent, ErContent, FiEvent, PiContent};
use crate::header::{self, DocumentHeader};
use crate::namespace::NamespaceContext;
use crate::octets::OctetReader;
use crate::options::DecoderOptions;
use crate::qname::QName;
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};

use tables::{Attribute, Child};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header noch nicht gelesen.
    Header,
    Body,
    /// `EndDocument` ist gepuffert oder geliefert.
    Done,
    /// Nach dem ersten Fehler liefert der Decoder nichts mehr.
    Failed,
}

// ============================================================================
// Decoder
// ============================================================================

/// Pull decoder over any byte source.
///
/// Events come out in document order; `resolve_prefix` and `depth` reflect
/// the position of the consumer, i.e. the last event returned. An element's
/// own namespace declarations are in scope from its `StartElement` on.
pub struct Decoder<R> {
    input: OctetReader<R>,
    options: DecoderOptions,
    vocabulary: Vocabulary,
    /// Bindungen aus Sicht des Konsumenten (beim Ausliefern gepflegt).
    namespaces: NamespaceContext,
    document: DocumentHeader,
    /// Offene Elemente aus Sicht des Lesers.
    stack: Vec<Rc<QName>>,
    queue: VecDeque<FiEvent>,
    state: State,
    saw_element: bool,
    saw_doctype: bool,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder. Nothing is read until the first event is requested.
    pub fn new(source: R, options: DecoderOptions) -> Self {
        let input = OctetReader::with_buffer_size(source, options.buffer_size);
        Self {
            input,
            options,
            vocabulary: Vocabulary::for_decoding(),
            namespaces: NamespaceContext::new(),
            document: DocumentHeader::default(),
            stack: Vec::new(),
            queue: VecDeque::new(),
            state: State::Header,
            saw_element: false,
            saw_doctype: false,
        }
    }

    /// The options this decoder was created with.
    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    /// Header properties. Filled in once `StartDocument` has been returned.
    pub fn document(&self) -> &DocumentHeader {
        &self.document
    }

    /// Element depth after the last returned event.
    pub fn depth(&self) -> usize {
        self.namespaces.depth()
    }

    /// Namespace bound to `prefix` after the last returned event.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.namespaces.resolve(prefix).map(|uri| &**uri)
    }

    /// Absolute offset of the next unread octet.
    pub fn offset(&self) -> u64 {
        self.input.offset()
    }

    /// Returns `true` while `next_event` can still produce an event.
    pub fn has_next(&self) -> bool {
        !self.queue.is_empty() || matches!(self.state, State::Header | State::Body)
    }

    /// Prepares the decoder for the next document of the same source.
    pub fn reset(&mut self) {
        self.vocabulary = Vocabulary::for_decoding();
        self.namespaces.reset();
        self.document = DocumentHeader::default();
        self.stack.clear();
        self.queue.clear();
        self.state = State::Header;
        self.saw_element = false;
        self.saw_doctype = false;
    }

    /// Returns the byte source. Octets already buffered are lost.
    pub fn into_inner(self) -> R {
        self.input.into_inner()
    }

    /// Returns the next event, or `None` after `EndDocument` or an error.
    pub fn next_event(&mut self) -> Result<Option<FiEvent>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                self.track_scope(&event);
                return Ok(Some(event));
            }
            let step = match self.state {
                State::Done | State::Failed => return Ok(None),
                State::Header => self.read_header(),
                State::Body => self.read_construct(),
            };
            if let Err(e) = step {
                debug!("decoding failed at offset {}: {e}", self.input.offset());
                self.state = State::Failed;
                self.queue.clear();
                return Err(e);
            }
        }
    }

    /// Pflegt die Namespace-Bindungen beim Ausliefern eines Events.
    ///
    /// Die Deklarationen eines Elements stehen direkt hinter seinem
    /// StartElement in der Queue und gelten schon ab dem StartElement.
    fn track_scope(&mut self, event: &FiEvent) {
        match event {
            FiEvent::StartElement(_) => {
                self.namespaces.push_scope();
                for queued in &self.queue {
                    let FiEvent::NamespaceDeclaration(ns) = queued else { break };
                    self.namespaces.declare(ns);
                }
            }
            FiEvent::EndElement => {
                self.namespaces.pop_scope();
            }
            _ => {}
        }
    }

    // ========================================================================
    // Header
    // ========================================================================

    fn read_header(&mut self) -> Result<()> {
        let decoded = header::decode(&mut self.input)?;
        if let Some(uri) = &decoded.header.external_vocabulary {
            let tables = self
                .options
                .external_vocabulary(uri)
                .ok_or_else(|| Error::UnknownExternalVocabulary(uri.clone()))?;
            debug!("using external vocabulary {uri}");
            self.vocabulary.load(tables)?;
        }
        if let Some(tables) = &decoded.initial_vocabulary {
            self.vocabulary.load(tables)?;
        }
        self.document = decoded.header;
        if decoded.has_version {
            let version = self.read_other_string("version")?;
            self.document.version = Some(version.to_string());
        }
        debug!(
            "header read: declaration {:?}, standalone {:?}, version {:?}",
            self.document.xml_declaration, self.document.standalone, self.document.version
        );
        self.queue.push_back(FiEvent::StartDocument);
        self.state = State::Body;
        Ok(())
    }

    // ========================================================================
    // Konstrukte
    // ========================================================================

    fn invalid(octet: u8, offset: u64, context: &'static str) -> Error {
        Error::InvalidConstruct { octet, offset, context }
    }

    fn read_construct(&mut self) -> Result<()> {
        let offset = self.input.offset();
        let b = self.input.read()?;
        let at_document = self.stack.is_empty();
        let context = if at_document { "child of document" } else { "child of element" };
        let class = tables::CHILD[b as usize];
        trace!("0x{b:02X} at {offset}: {class:?}");
        match class {
            Child::Element(_) | Child::ElementLiteral | Child::ElementNamespaces => {
                if at_document && self.saw_element {
                    return Err(Self::invalid(b, offset, "second document element"));
                }
                self.read_element(b, offset)
            }
            Child::Chunk if !at_document => self.read_chunk(b),
            Child::ChunkIndex(tier) if !at_document => self.read_chunk_index(tier, b),
            Child::ProcessingInstruction => {
                let pi = self.read_processing_instruction()?;
                self.queue.push_back(FiEvent::ProcessingInstruction(pi));
                Ok(())
            }
            Child::Comment => {
                let text = self.read_other_string("comment")?;
                self.queue.push_back(FiEvent::Comment(CmContent { text }));
                Ok(())
            }
            Child::DocumentType if at_document && !self.saw_element && !self.saw_doctype => {
                self.read_document_type(b)
            }
            Child::EntityReference if !at_document => self.read_entity_reference(b),
            Child::Terminator => self.end_level(),
            Child::DoubleTerminator if !at_document => {
                self.end_level()?;
                self.end_level()
            }
            _ => Err(Self::invalid(b, offset, context)),
        }
    }

    /// Beendet das innerste Element, oder das Dokument bei leerem Stack.
    fn end_level(&mut self) -> Result<()> {
        if self.stack.pop().is_some() {
            self.queue.push_back(FiEvent::EndElement);
            return Ok(());
        }
        if !self.saw_element {
            return Err(Error::NoDocumentElement);
        }
        self.queue.push_back(FiEvent::EndDocument);
        self.state = State::Done;
        Ok(())
    }

    /// Element with its namespace attributes and attributes.
    fn read_element(&mut self, b: u8, offset: u64) -> Result<()> {
        let has_attributes = b & tables::ATTRIBUTE_FLAG != 0;
        let (namespaces, name) = if tables::CHILD[b as usize] == Child::ElementNamespaces {
            let namespaces = self.read_namespace_attributes()?;
            let offset = self.input.offset();
            let e = self.input.read()?;
            if e & 0xC0 != 0 {
                return Err(Self::invalid(e, offset, "element after namespace attributes"));
            }
            (namespaces, self.read_element_name(e, offset)?)
        } else {
            (Vec::new(), self.read_element_name(b, offset)?)
        };
        trace!("element {name}");
        self.saw_element = true;
        self.queue.push_back(FiEvent::StartElement(Rc::clone(&name)));
        self.queue.extend(namespaces.into_iter().map(FiEvent::NamespaceDeclaration));
        self.stack.push(name);
        if has_attributes {
            self.read_attributes()?;
        }
        Ok(())
    }

    /// Attribute bis `F0` (Kinder folgen) oder `FF` (Element endet).
    fn read_attributes(&mut self) -> Result<()> {
        loop {
            let offset = self.input.offset();
            let b = self.input.read()?;
            let name = match tables::ATTRIBUTE[b as usize] {
                Attribute::Index(tier) => self.read_attribute_index(tier, b)?,
                Attribute::Literal => self.read_attribute_literal(b, offset)?,
                Attribute::End => return Ok(()),
                Attribute::EndElement => return self.end_level(),
                Attribute::Invalid => return Err(Self::invalid(b, offset, "attribute")),
            };
            let value = self.read_attribute_value()?;
            self.queue.push_back(FiEvent::Attribute(AtContent { qname: name, value }));
        }
    }

    fn read_processing_instruction(&mut self) -> Result<PiContent> {
        let target = name::read_identifying(&mut self.input, &mut self.vocabulary.other_ncnames)?;
        let data = self.read_other_string("processing instruction")?;
        Ok(PiContent { target, data })
    }

    fn read_document_type(&mut self, b: u8) -> Result<()> {
        let mut dt = DtContent::default();
        if b & tables::SYSTEM_ID_FLAG != 0 {
            dt.system_id = Some(name::read_identifying(&mut self.input, &mut self.vocabulary.other_uris)?);
        }
        if b & tables::PUBLIC_ID_FLAG != 0 {
            dt.public_id = Some(name::read_identifying(&mut self.input, &mut self.vocabulary.other_uris)?);
        }
        loop {
            let offset = self.input.offset();
            match self.input.read()? {
                tables::PROCESSING_INSTRUCTION => {
                    let pi = self.read_processing_instruction()?;
                    dt.instructions.push(pi);
                }
                tables::TERMINATOR => break,
                other => return Err(Self::invalid(other, offset, "document type declaration")),
            }
        }
        self.saw_doctype = true;
        self.queue.push_back(FiEvent::DocumentType(dt));
        Ok(())
    }

    fn read_entity_reference(&mut self, b: u8) -> Result<()> {
        let name = name::read_identifying(&mut self.input, &mut self.vocabulary.other_ncnames)?;
        let system_id = if b & tables::SYSTEM_ID_FLAG != 0 {
            Some(name::read_identifying(&mut self.input, &mut self.vocabulary.other_uris)?)
        } else {
            None
        };
        let public_id = if b & tables::PUBLIC_ID_FLAG != 0 {
            Some(name::read_identifying(&mut self.input, &mut self.vocabulary.other_uris)?)
        } else {
            None
        };
        self.queue.push_back(FiEvent::EntityReference(ErContent { name, system_id, public_id }));
        Ok(())
    }
}

// ============================================================================
// Iterator API
// ============================================================================

/// Yields events until `EndDocument`; after an error it yields nothing more.
impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<FiEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

impl<R: Read> FusedIterator for Decoder<R> {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests;
