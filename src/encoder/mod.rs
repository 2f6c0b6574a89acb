//! Fast Infoset encoder: push calls (or events) in, octets out.
//!
//! Der Encoder ist eine Zustandsmaschine über
//! `Idle → Prolog → (Namespaces →) Attributes → Content → … → Epilog → Finished`.
//! Terminatoren werden verzögert geschrieben: erst der nächste Konstrukt
//! entscheidet, ob ein `F0` allein steht oder mit dem nächsten Ende zu `FF`
//! zusammengefasst wird.
//!
//! # Beispiel
//!
//! ```
//! use fastinfoset::encoder::encode;
//! use fastinfoset::event::FiEvent;
//! use fastinfoset::options::EncoderOptions;
//!
//! let events = vec![
//!     FiEvent::StartDocument,
//!     FiEvent::start("root"),
//!     FiEvent::EndElement,
//!     FiEvent::EndDocument,
//! ];
//! let bytes = encode(&events, &EncoderOptions::default()).unwrap();
//! assert_eq!(&bytes[..4], &[0xE0, 0x00, 0x00, 0x01]);
//! ```

mod name;
mod value;

use std::io::Write;
use std::rc::Rc;

use log::{debug, trace};

use crate::algorithm::TypedArray;
use crate::event::{AlgorithmValue, AtContent, AttributeValue, DtContent, EaContent, ErContent, FiEvent};
use crate::header;
use crate::octets::OctetWriter;
use crate::options::EncoderOptions;
use crate::qname::{NamespaceDecl, QName};
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};

pub(crate) const TERMINATOR: u8 = 0xF0;
pub(crate) const DOUBLE_TERMINATOR: u8 = 0xFF;
pub(crate) const ELEMENT_NAMESPACES: u8 = 0x38;
pub(crate) const ELEMENT_ATTRIBUTE_FLAG: u8 = 0x40;
pub(crate) const PROCESSING_INSTRUCTION: u8 = 0xE1;
pub(crate) const COMMENT: u8 = 0xE2;
pub(crate) const DOCUMENT_TYPE: u8 = 0xC4;
pub(crate) const ENTITY_REFERENCE: u8 = 0xC8;
pub(crate) const SYSTEM_ID_FLAG: u8 = 0x02;
pub(crate) const PUBLIC_ID_FLAG: u8 = 0x01;

/// Prüft ob ein String ausschließlich aus XML-Whitespace besteht (SP/TAB/CR/LF).
pub(crate) fn is_xml_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// Dokumentebene vor dem Wurzelelement.
    Prolog,
    /// `0x38` geschrieben, Namespace-Attribute folgen.
    Namespaces,
    /// Elementname geschrieben, Attribute dürfen folgen.
    Attributes,
    Content,
    /// Dokumentebene nach dem Wurzelelement.
    Epilog,
    Finished,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "start document",
            Self::Prolog => "document prolog",
            Self::Namespaces => "namespace declarations",
            Self::Attributes => "attributes",
            Self::Content => "element content",
            Self::Epilog => "document epilog",
            Self::Finished => "end document",
        }
    }
}

/// Noch nicht geschriebener Terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Single,
    Double,
}

/// Start element buffered by [`Encoder::encode_event`] until its first child.
#[derive(Debug)]
struct PendingElement {
    name: Rc<QName>,
    namespaces: Vec<NamespaceDecl>,
    attributes: Vec<AtContent>,
}

// ============================================================================
// Encoder
// ============================================================================

/// Fast Infoset encoder writing into an in-memory buffer.
///
/// Drive it with the push methods (`start_document`, `start_element`, ...)
/// or with [`encode_event`](Self::encode_event); use
/// [`flush_to`](Self::flush_to) to move finished octets to a sink while
/// encoding.
pub struct Encoder {
    out: OctetWriter,
    options: EncoderOptions,
    vocabulary: Vocabulary,
    state: State,
    terminator: Pending,
    depth: usize,
    has_attributes: bool,
    in_cdata: bool,
    doctype_written: bool,
    pending: Option<PendingElement>,
}

impl Encoder {
    /// Creates an encoder. The initial vocabulary of `options` is loaded
    /// once and survives [`reset`](Self::reset).
    pub fn new(options: EncoderOptions) -> Result<Self> {
        options.validate()?;
        let mut vocabulary = Vocabulary::new();
        if let Some(iv) = &options.initial_vocabulary {
            if let Some(ext) = &iv.external {
                vocabulary.load(&ext.tables)?;
            }
            vocabulary.load(&iv.additions)?;
            vocabulary.freeze();
        }
        Ok(Self {
            out: OctetWriter::with_capacity(4096),
            options,
            vocabulary,
            state: State::Idle,
            terminator: Pending::None,
            depth: 0,
            has_attributes: false,
            in_cdata: false,
            doctype_written: false,
            pending: None,
        })
    }

    /// The options this encoder was created with.
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Current element nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Octets buffered and not yet flushed.
    pub fn buffered_len(&self) -> usize {
        self.out.len()
    }

    /// Returns the encoder to its state before `start_document`, dropping
    /// buffered octets and every vocabulary entry the document added.
    pub fn reset(&mut self) {
        self.out.clear();
        self.vocabulary.reset();
        self.state = State::Idle;
        self.terminator = Pending::None;
        self.depth = 0;
        self.has_attributes = false;
        self.in_cdata = false;
        self.doctype_written = false;
        self.pending = None;
    }

    fn violation(&self, found: &'static str) -> Error {
        Error::ordering_violation(self.state.name(), found)
    }

    // ========================================================================
    // Terminatoren
    // ========================================================================

    /// Schreibt einen ausstehenden Terminator.
    fn encode_termination(&mut self) {
        match self.terminator {
            Pending::None => {}
            Pending::Single => self.out.write(TERMINATOR),
            Pending::Double => self.out.write(DOUBLE_TERMINATOR),
        }
        self.terminator = Pending::None;
    }

    /// Ende eines Elements: zwei ausstehende Enden werden zu `FF`.
    fn encode_element_termination(&mut self) {
        self.terminator = match self.terminator {
            Pending::None => Pending::Single,
            Pending::Single => Pending::Double,
            Pending::Double => {
                self.out.write(DOUBLE_TERMINATOR);
                Pending::Single
            }
        };
    }

    /// Closes an open attribute list. The mark is no longer needed.
    fn close_attributes(&mut self) {
        if self.state == State::Attributes {
            self.out.reset_mark();
            self.state = State::Content;
        }
    }

    /// Prepares a child of the current element.
    fn enter_content(&mut self, found: &'static str) -> Result<()> {
        match self.state {
            State::Attributes | State::Content => {
                self.close_attributes();
                self.encode_termination();
                Ok(())
            }
            _ => Err(self.violation(found)),
        }
    }

    /// Prepares a child of the current element or of the document.
    fn enter_child(&mut self, found: &'static str) -> Result<()> {
        match self.state {
            State::Prolog | State::Epilog => {
                self.encode_termination();
                Ok(())
            }
            _ => self.enter_content(found),
        }
    }

    // ========================================================================
    // Push-API
    // ========================================================================

    /// Writes the header.
    pub fn start_document(&mut self) -> Result<()> {
        if self.state != State::Idle {
            return Err(self.violation("start document"));
        }
        let header = self.options.header();
        let flags = header::encode(&mut self.out, &header, self.options.initial_vocabulary.as_ref())?;
        debug!("document flags 0x{flags:02X}");
        if let Some(version) = &header.version {
            self.write_other_string(version)?;
        }
        self.state = State::Prolog;
        Ok(())
    }

    /// Declares a namespace on the element started next.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) -> Result<()> {
        self.write_namespace_declaration(&NamespaceDecl::new(prefix, uri))
    }

    fn write_namespace_declaration(&mut self, decl: &NamespaceDecl) -> Result<()> {
        match self.state {
            State::Namespaces => {}
            State::Prolog | State::Attributes | State::Content => {
                self.close_attributes();
                self.encode_termination();
                self.out.mark();
                self.out.write(ELEMENT_NAMESPACES);
                self.state = State::Namespaces;
            }
            _ => return Err(self.violation("namespace declaration")),
        }
        self.write_namespace_attribute(decl)
    }

    /// Starts an element. Attributes may follow until the first child.
    pub fn start_element(&mut self, name: &QName) -> Result<()> {
        match self.state {
            State::Namespaces => {
                // Namespace-Liste schließen; der Name beginnt auf einem frischen Octet,
                // das Attribut-Flag landet im 0x38-Octet (Mark).
                self.out.write(TERMINATOR);
            }
            State::Prolog | State::Attributes | State::Content => {
                self.close_attributes();
                self.encode_termination();
                self.out.mark();
            }
            _ => return Err(self.violation("start element")),
        }
        trace!("start element {name}");
        self.write_element_name(name)?;
        self.state = State::Attributes;
        self.has_attributes = false;
        self.depth += 1;
        Ok(())
    }

    /// Adds a text attribute to the element just started.
    pub fn attribute(&mut self, name: &QName, value: &str) -> Result<()> {
        self.begin_attribute(name)?;
        self.write_attribute_text(value)
    }

    /// Adds an attribute with any value form.
    pub fn attribute_value(&mut self, name: &QName, value: &AttributeValue) -> Result<()> {
        self.begin_attribute(name)?;
        match value {
            AttributeValue::Text(t) => self.write_attribute_text(t),
            AttributeValue::Restricted(ra) => self.write_attribute_restricted(ra.alphabet, &ra.value),
            AttributeValue::Algorithm(ea) => self.write_attribute_algorithm(ea),
        }
    }

    fn begin_attribute(&mut self, name: &QName) -> Result<()> {
        if self.state != State::Attributes {
            return Err(self.violation("attribute"));
        }
        if !self.has_attributes {
            self.out.or_at_mark(ELEMENT_ATTRIBUTE_FLAG);
            self.has_attributes = true;
            // Die Attributliste endet mit F0, oder mit FF falls das Element gleich endet.
            self.terminator = Pending::Single;
        }
        self.write_attribute_name(name)
    }

    /// Character content. Whitespace-only runs are dropped at document level
    /// and, with `ignore.whitespace_text`, everywhere.
    pub fn characters(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let whitespace = is_xml_whitespace(text);
        if matches!(self.state, State::Prolog | State::Epilog) && whitespace {
            return Ok(());
        }
        if self.in_cdata {
            return self.cdata(text);
        }
        if whitespace && self.options.ignore.whitespace_text {
            return Ok(());
        }
        self.enter_content("characters")?;
        if self.options.characters_as_cdata {
            self.write_cdata_chunk(text)
        } else {
            self.write_text_chunk(text)
        }
    }

    /// Opens a CDATA section; following `characters` are written as CDATA.
    pub fn start_cdata(&mut self) -> Result<()> {
        self.enter_content("start CDATA")?;
        self.in_cdata = true;
        Ok(())
    }

    /// Closes a CDATA section.
    pub fn end_cdata(&mut self) -> Result<()> {
        if !self.in_cdata {
            return Err(Error::ordering_violation("start CDATA", "end CDATA"));
        }
        self.in_cdata = false;
        Ok(())
    }

    /// Character content from a CDATA section.
    pub fn cdata(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.enter_content("CDATA")?;
        self.write_cdata_chunk(text)
    }

    /// Character content packed with restricted alphabet `alphabet`.
    pub fn restricted_characters(&mut self, alphabet: u8, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.enter_content("restricted characters")?;
        self.write_restricted_chunk(alphabet, text)
    }

    /// Typed array under its default built-in algorithm. Empty arrays are rejected.
    pub fn typed_array(&mut self, data: &TypedArray) -> Result<()> {
        self.enter_content("typed array")?;
        self.write_algorithm_chunk(&EaContent::builtin(data.clone()))
    }

    /// Typed array under the application algorithm registered for `uri`.
    pub fn algorithm_data(&mut self, uri: &str, data: &TypedArray) -> Result<()> {
        self.enter_content("algorithm data")?;
        self.write_algorithm_chunk(&EaContent::custom(uri, data.clone()))
    }

    /// Raw octets under the application algorithm `uri`; no codec is needed.
    pub fn octets(&mut self, uri: &str, octets: &[u8]) -> Result<()> {
        self.enter_content("algorithm data")?;
        self.write_algorithm_chunk(&EaContent {
            algorithm: 0,
            uri: Some(uri.into()),
            value: AlgorithmValue::Octets(octets.into()),
        })
    }

    /// Any algorithm content.
    pub fn encoded_data(&mut self, ea: &EaContent) -> Result<()> {
        self.enter_content("algorithm data")?;
        self.write_algorithm_chunk(ea)
    }

    /// A comment, unless comments are ignored.
    pub fn comment(&mut self, text: &str) -> Result<()> {
        if self.options.ignore.comments {
            return Ok(());
        }
        self.enter_child("comment")?;
        self.out.write(COMMENT);
        self.write_comment_text(text)
    }

    /// A processing instruction, unless PIs are ignored.
    pub fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        if self.options.ignore.processing_instructions {
            return Ok(());
        }
        self.enter_child("processing instruction")?;
        self.write_processing_instruction(target, data)
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.out.write(PROCESSING_INSTRUCTION);
        name::write_identifying(&mut self.out, &mut self.vocabulary.other_ncnames, target)?;
        self.write_other_string(data)
    }

    /// The document type declaration; only before the root element.
    pub fn document_type(&mut self, dt: &DtContent) -> Result<()> {
        if self.state != State::Prolog || self.doctype_written {
            return Err(self.violation("document type"));
        }
        self.encode_termination();
        let mut b = DOCUMENT_TYPE;
        if dt.system_id.is_some() {
            b |= SYSTEM_ID_FLAG;
        }
        if dt.public_id.is_some() {
            b |= PUBLIC_ID_FLAG;
        }
        self.out.write(b);
        if let Some(id) = &dt.system_id {
            name::write_identifying(&mut self.out, &mut self.vocabulary.other_uris, id)?;
        }
        if let Some(id) = &dt.public_id {
            name::write_identifying(&mut self.out, &mut self.vocabulary.other_uris, id)?;
        }
        if !self.options.ignore.processing_instructions {
            for pi in &dt.instructions {
                self.write_processing_instruction(&pi.target, &pi.data)?;
            }
        }
        self.out.write(TERMINATOR);
        self.doctype_written = true;
        Ok(())
    }

    /// An unexpanded entity reference.
    pub fn entity_reference(&mut self, er: &ErContent) -> Result<()> {
        self.enter_content("entity reference")?;
        let mut b = ENTITY_REFERENCE;
        if er.system_id.is_some() {
            b |= SYSTEM_ID_FLAG;
        }
        if er.public_id.is_some() {
            b |= PUBLIC_ID_FLAG;
        }
        self.out.write(b);
        name::write_identifying(&mut self.out, &mut self.vocabulary.other_ncnames, &er.name)?;
        if let Some(id) = &er.system_id {
            name::write_identifying(&mut self.out, &mut self.vocabulary.other_uris, id)?;
        }
        if let Some(id) = &er.public_id {
            name::write_identifying(&mut self.out, &mut self.vocabulary.other_uris, id)?;
        }
        Ok(())
    }

    /// Ends the current element.
    pub fn end_element(&mut self) -> Result<()> {
        if !matches!(self.state, State::Attributes | State::Content) || self.in_cdata {
            return Err(self.violation("end element"));
        }
        self.close_attributes();
        self.encode_element_termination();
        self.depth -= 1;
        self.state = if self.depth == 0 { State::Epilog } else { State::Content };
        Ok(())
    }

    /// Ends the document. Fails when no element was written.
    pub fn end_document(&mut self) -> Result<()> {
        match self.state {
            State::Epilog => {}
            State::Prolog => return Err(Error::NoDocumentElement),
            _ => return Err(self.violation("end document")),
        }
        self.encode_element_termination();
        self.encode_termination();
        self.state = State::Finished;
        debug!("document encoded, {} octets buffered", self.out.len());
        Ok(())
    }

    // ========================================================================
    // Event-API
    // ========================================================================

    /// Encodes one event. A start element is buffered together with its
    /// namespace declarations and attributes until the next other event.
    pub fn encode_event(&mut self, event: &FiEvent) -> Result<()> {
        match event {
            FiEvent::NamespaceDeclaration(ns) => {
                return match &mut self.pending {
                    Some(p) => {
                        p.namespaces.push(ns.clone());
                        Ok(())
                    }
                    None => Err(Error::ordering_violation("start element", "namespace declaration")),
                };
            }
            FiEvent::Attribute(at) => {
                return match &mut self.pending {
                    Some(p) => {
                        p.attributes.push(at.clone());
                        Ok(())
                    }
                    None => Err(Error::ordering_violation("start element", "attribute")),
                };
            }
            _ => {}
        }
        self.flush_pending()?;
        match event {
            FiEvent::StartDocument => self.start_document(),
            FiEvent::EndDocument => self.end_document(),
            FiEvent::StartElement(name) => {
                if !matches!(self.state, State::Prolog | State::Attributes | State::Content) {
                    return Err(self.violation("start element"));
                }
                self.pending = Some(PendingElement {
                    name: Rc::clone(name),
                    namespaces: Vec::new(),
                    attributes: Vec::new(),
                });
                Ok(())
            }
            FiEvent::EndElement => self.end_element(),
            FiEvent::Characters(ch) if ch.cdata => self.cdata(&ch.value),
            FiEvent::Characters(ch) => self.characters(&ch.value),
            FiEvent::RestrictedCharacters(ra) => self.restricted_characters(ra.alphabet, &ra.value),
            FiEvent::AlgorithmData(ea) => self.encoded_data(ea),
            FiEvent::Comment(cm) => self.comment(&cm.text),
            FiEvent::ProcessingInstruction(pi) => self.processing_instruction(&pi.target, &pi.data),
            FiEvent::DocumentType(dt) => self.document_type(dt),
            FiEvent::EntityReference(er) => self.entity_reference(er),
            FiEvent::NamespaceDeclaration(_) | FiEvent::Attribute(_) => Ok(()),
        }
    }

    /// Encodes a sequence of events.
    pub fn encode_events(&mut self, events: &[FiEvent]) -> Result<()> {
        for event in events {
            self.encode_event(event)?;
        }
        Ok(())
    }

    fn flush_pending(&mut self) -> Result<()> {
        let Some(element) = self.pending.take() else {
            return Ok(());
        };
        for ns in &element.namespaces {
            self.write_namespace_declaration(ns)?;
        }
        self.start_element(&element.name)?;
        for at in &element.attributes {
            self.attribute_value(&at.qname, &at.value)?;
        }
        Ok(())
    }

    // ========================================================================
    // Ausgabe
    // ========================================================================

    /// Moves every finished octet to `sink`. Octets behind an open element
    /// start stay buffered until its attribute flag is known.
    pub fn flush_to(&mut self, sink: &mut impl Write) -> Result<()> {
        self.out.drain_to(sink).map_err(|e| Error::io("writing octets", e))
    }

    /// Returns the encoded document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.flush_pending()?;
        if self.state != State::Finished {
            return Err(self.violation("finish"));
        }
        Ok(self.out.into_vec())
    }

    /// Writes the rest of the document to `sink`.
    pub fn finish_to(mut self, sink: &mut impl Write) -> Result<()> {
        if self.state != State::Finished {
            return Err(self.violation("finish"));
        }
        self.flush_to(sink)?;
        sink.flush().map_err(|e| Error::io("flushing output", e))
    }
}

/// Encodes `events` into a complete document.
pub fn encode(events: &[FiEvent], options: &EncoderOptions) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(options.clone())?;
    encoder.encode_events(events)?;
    encoder.finish()
}

// ============================================================================
// Tests
// ============================================================================
