//! Fast Infoset Events → XML-Text.
//!
//! Drei APIs:
//! - `events_to_xml()` gibt XML als String zurück.
//! - `fi_to_xml()` decodiert ein Dokument und serialisiert es in einem Schritt.
//! - `fi_reader_to_xml()` streamt vom Decoder direkt in `impl Write`.
//!
//! Fehlende Namespace-Deklarationen werden ergänzt: Prefixe, die das Dokument
//! nicht deklariert, und `ns0`, `ns1`, ... für namespace-qualifizierte
//! Attribute ohne Prefix. Algorithmusdaten werden in ihrer Textform
//! geschrieben, unbekannte Octets als Base64.

use std::io::{Read, Write};
use std::rc::Rc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::algorithm::{AlgorithmRegistry, BuiltinAlgorithm, EncodingAlgorithm};
use crate::decoder::Decoder;
use crate::error::Error;
use crate::event::{AlgorithmValue, AttributeValue, DtContent, EaContent, FiEvent};
use crate::header::DocumentHeader;
use crate::namespace::NamespaceContext;
use crate::options::DecoderOptions;
use crate::qname::{NamespaceDecl, QName, XML_NAMESPACE, XML_PREFIX};
use crate::Result;

/// Serialisiert Events als XML-String.
pub fn events_to_xml(events: &[FiEvent]) -> Result<String> {
    let mut serializer = XmlSerializer::new(Vec::new());
    for event in events {
        serializer.process(event)?;
    }
    into_string(serializer.finish()?)
}

/// Decodiert `data` und gibt das Dokument als XML-Text zurück.
pub fn fi_to_xml(data: &[u8], options: &DecoderOptions) -> Result<String> {
    let mut out = Vec::new();
    fi_reader_to_xml(data, options, &mut out)?;
    into_string(out)
}

/// Decodiert ein Dokument aus `reader` und schreibt XML nach `writer`.
///
/// Trägt der Header eine XML-Deklaration, Version oder Standalone-Angabe,
/// wird eine XML-Deklaration vorangestellt.
pub fn fi_reader_to_xml(reader: impl Read, options: &DecoderOptions, writer: impl Write) -> Result<()> {
    let mut decoder = Decoder::new(reader, options.clone());
    let mut serializer = XmlSerializer::new(writer).with_algorithms(options.algorithms().clone());
    while let Some(event) = decoder.next_event()? {
        if matches!(event, FiEvent::StartDocument) {
            serializer.write_declaration(decoder.document())?;
        }
        serializer.process(&event)?;
    }
    serializer.finish()?;
    Ok(())
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::XmlParseError(e.to_string()))
}

// ============================================================================
// Freie Hilfsfunktionen
// ============================================================================

/// Schreibt einen String als Bytes in den Writer.
#[inline]
fn w(writer: &mut impl Write, s: &str) -> Result<()> {
    writer.write_all(s.as_bytes()).map_err(|e| Error::io("writing XML", e))
}

/// Schreibt einen Kommentar, prüft auf XML-Restriktionen.
fn write_comment(writer: &mut impl Write, text: &str) -> Result<()> {
    if text.contains("--") || text.ends_with('-') {
        return Err(Error::XmlParseError(
            "comment contains '--' or ends with '-'".into(),
        ));
    }
    w(writer, "<!--")?;
    w(writer, text)?;
    w(writer, "-->")
}

/// Schreibt eine Processing Instruction, prüft auf XML-Restriktionen.
fn write_pi(writer: &mut impl Write, target: &str, data: &str) -> Result<()> {
    if data.contains("?>") {
        return Err(Error::XmlParseError("processing instruction data contains '?>'".into()));
    }
    w(writer, "<?")?;
    w(writer, target)?;
    if !data.is_empty() {
        w(writer, " ")?;
        w(writer, data)?;
    }
    w(writer, "?>")
}

/// Schreibt eine DOCTYPE-Deklaration; der Name ist der des Wurzelelements.
fn write_doctype(writer: &mut impl Write, name: &str, dt: &DtContent) -> Result<()> {
    w(writer, "<!DOCTYPE ")?;
    w(writer, name)?;
    match (&dt.public_id, &dt.system_id) {
        (Some(public), system) => {
            w(writer, " PUBLIC \"")?;
            write_escaped_attr(writer, public)?;
            w(writer, "\" \"")?;
            write_escaped_attr(writer, system.as_deref().unwrap_or(""))?;
            w(writer, "\"")?;
        }
        (None, Some(system)) => {
            w(writer, " SYSTEM \"")?;
            write_escaped_attr(writer, system)?;
            w(writer, "\"")?;
        }
        (None, None) => {}
    }
    if !dt.instructions.is_empty() {
        w(writer, " [")?;
        for pi in &dt.instructions {
            write_pi(writer, &pi.target, &pi.data)?;
        }
        w(writer, "]")?;
    }
    w(writer, ">")
}

/// `]]>` im Inhalt wird auf zwei Abschnitte verteilt.
fn write_cdata(writer: &mut impl Write, text: &str) -> Result<()> {
    w(writer, "<![CDATA[")?;
    w(writer, &text.replace("]]>", "]]]]><![CDATA[>"))?;
    w(writer, "]]>")
}

/// Schreibt `s` und ersetzt jedes Byte, für das `escape` eine Entity liefert.
fn write_escaped(w: &mut impl Write, s: &str, escape: fn(u8) -> Option<&'static str>) -> Result<()> {
    let io = |e| Error::io("writing XML", e);
    let bytes = s.as_bytes();
    let mut start = 0;
    for (pos, &b) in bytes.iter().enumerate() {
        if let Some(entity) = escape(b) {
            w.write_all(&bytes[start..pos]).map_err(io)?;
            w.write_all(entity.as_bytes()).map_err(io)?;
            start = pos + 1;
        }
    }
    w.write_all(&bytes[start..]).map_err(io)
}

/// XML-Escaping für Text-Inhalt: & < > \r → &amp; &lt; &gt; &#13;
///
/// Ein rohes \r würde beim Parsen zu \n normalisiert.
fn write_escaped_text(w: &mut impl Write, s: &str) -> Result<()> {
    write_escaped(w, s, |b| match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'\r' => Some("&#13;"),
        _ => None,
    })
}

/// XML-Escaping für Attribut-Werte: & < " \t \n \r → &amp; &lt; &quot; &#9; &#10; &#13;
///
/// Rohe Whitespace-Zeichen würden bei der Attributwert-Normalisierung zu
/// Leerzeichen.
fn write_escaped_attr(w: &mut impl Write, s: &str) -> Result<()> {
    write_escaped(w, s, |b| match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'"' => Some("&quot;"),
        b'\t' => Some("&#9;"),
        b'\n' => Some("&#10;"),
        b'\r' => Some("&#13;"),
        _ => None,
    })
}

// ============================================================================
// XmlSerializer
// ============================================================================

/// Gepufferter Start-Tag bis zum ersten Kind-Event.
struct PendingStart {
    qname: Rc<QName>,
    namespaces: Vec<NamespaceDecl>,
    attributes: Vec<(Rc<QName>, String)>,
}

/// Streaming XML serializer writing compact XML to `W`.
///
/// Feed it the events of one document in order, then call
/// [`finish`](Self::finish).
pub struct XmlSerializer<W: Write> {
    writer: W,
    algorithms: AlgorithmRegistry,
    namespaces: NamespaceContext,
    /// Geschriebene Namen der offenen Elemente.
    open: Vec<String>,
    pending: Option<PendingStart>,
    doctype: Option<DtContent>,
    synthetic_prefixes: usize,
}

impl<W: Write> XmlSerializer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            algorithms: AlgorithmRegistry::default(),
            namespaces: NamespaceContext::new(),
            open: Vec::new(),
            pending: None,
            doctype: None,
            synthetic_prefixes: 0,
        }
    }

    /// Codecs used to render application algorithm data as text.
    pub fn with_algorithms(mut self, algorithms: AlgorithmRegistry) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Writes `<?xml ...?>` when the header carries a declaration, a version
    /// or a standalone property.
    pub fn write_declaration(&mut self, header: &DocumentHeader) -> Result<()> {
        if header.xml_declaration.is_none() && header.version.is_none() && header.standalone.is_none() {
            return Ok(());
        }
        w(&mut self.writer, "<?xml version=\"")?;
        w(&mut self.writer, header.version.as_deref().unwrap_or("1.0"))?;
        w(&mut self.writer, "\" encoding=\"UTF-8\"")?;
        if let Some(standalone) = header.standalone {
            w(&mut self.writer, if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" })?;
        }
        w(&mut self.writer, "?>")
    }

    /// Writes the XML for one event.
    pub fn process(&mut self, event: &FiEvent) -> Result<()> {
        match event {
            FiEvent::StartDocument => {}
            FiEvent::EndDocument => {
                self.flush_pending_start(false)?;
                if !self.open.is_empty() {
                    return Err(Error::XmlParseError("document ends inside an element".into()));
                }
            }
            FiEvent::StartElement(qname) => {
                self.flush_pending_start(false)?;
                self.pending = Some(PendingStart {
                    qname: Rc::clone(qname),
                    namespaces: Vec::new(),
                    attributes: Vec::new(),
                });
            }
            FiEvent::NamespaceDeclaration(decl) => {
                let pending = self.pending_mut("namespace declaration")?;
                pending.namespaces.push(decl.clone());
            }
            FiEvent::Attribute(at) => {
                let value = self.attribute_text(&at.value)?;
                let pending = self.pending_mut("attribute")?;
                pending.attributes.push((Rc::clone(&at.qname), value));
            }
            FiEvent::EndElement => {
                if self.pending.is_some() {
                    self.flush_pending_start(true)?;
                } else {
                    let name = self
                        .open
                        .pop()
                        .ok_or_else(|| Error::XmlParseError("end of element without open element".into()))?;
                    self.namespaces.pop_scope();
                    w(&mut self.writer, "</")?;
                    w(&mut self.writer, &name)?;
                    w(&mut self.writer, ">")?;
                }
            }
            FiEvent::Characters(ch) => {
                self.flush_pending_start(false)?;
                if ch.cdata {
                    write_cdata(&mut self.writer, &ch.value)?;
                } else {
                    write_escaped_text(&mut self.writer, &ch.value)?;
                }
            }
            FiEvent::RestrictedCharacters(ra) => {
                self.flush_pending_start(false)?;
                write_escaped_text(&mut self.writer, &ra.value)?;
            }
            FiEvent::AlgorithmData(ea) => {
                self.flush_pending_start(false)?;
                let text = self.algorithm_text(ea)?;
                write_escaped_text(&mut self.writer, &text)?;
            }
            FiEvent::Comment(cm) => {
                self.flush_pending_start(false)?;
                write_comment(&mut self.writer, &cm.text)?;
            }
            FiEvent::ProcessingInstruction(pi) => {
                self.flush_pending_start(false)?;
                write_pi(&mut self.writer, &pi.target, &pi.data)?;
            }
            FiEvent::DocumentType(dt) => {
                // Bis zum Wurzelelement zurückgehalten, das den Namen liefert.
                self.doctype = Some(dt.clone());
            }
            FiEvent::EntityReference(er) => {
                self.flush_pending_start(false)?;
                w(&mut self.writer, "&")?;
                w(&mut self.writer, &er.name)?;
                w(&mut self.writer, ";")?;
            }
        }
        Ok(())
    }

    /// Flushes the writer and returns it.
    pub fn finish(mut self) -> Result<W> {
        self.flush_pending_start(false)?;
        self.writer.flush().map_err(|e| Error::io("writing XML", e))?;
        Ok(self.writer)
    }

    fn pending_mut(&mut self, what: &'static str) -> Result<&mut PendingStart> {
        self.pending
            .as_mut()
            .ok_or_else(|| Error::XmlParseError(format!("{what} outside a start tag")))
    }

    fn attribute_text(&self, value: &AttributeValue) -> Result<String> {
        match value {
            AttributeValue::Text(text) => Ok(text.to_string()),
            AttributeValue::Restricted(ra) => Ok(ra.value.to_string()),
            AttributeValue::Algorithm(ea) => self.algorithm_text(ea),
        }
    }

    /// Textform von Algorithmusdaten: registrierter Codec, sonst Built-in.
    fn algorithm_text(&self, ea: &EaContent) -> Result<String> {
        let data = match &ea.value {
            AlgorithmValue::Octets(octets) => return Ok(STANDARD.encode(octets)),
            AlgorithmValue::Typed(data) => data,
        };
        if let Some(uri) = &ea.uri
            && let Some(codec) = self.algorithms.get(uri)
        {
            return codec.convert_to_text(data);
        }
        match BuiltinAlgorithm::from_id(ea.algorithm) {
            Some(builtin) if builtin.accepts(data) => builtin.convert_to_text(data),
            _ => data.default_algorithm().convert_to_text(data),
        }
    }

    /// Schreibt den gepufferten Start-Tag und öffnet den Namespace-Scope.
    fn flush_pending_start(&mut self, self_closing: bool) -> Result<()> {
        let Some(PendingStart { qname, namespaces, attributes }) = self.pending.take() else {
            return Ok(());
        };

        self.namespaces.push_scope();
        for decl in &namespaces {
            self.namespaces.declare(decl);
        }
        let mut synthesized = Vec::new();

        let element_name = self.element_name(&qname, &mut synthesized);
        let mut attribute_names = Vec::with_capacity(attributes.len());
        for (name, _) in &attributes {
            attribute_names.push(self.attribute_name(name, &mut synthesized));
        }

        if self.open.is_empty()
            && let Some(dt) = self.doctype.take()
        {
            write_doctype(&mut self.writer, &element_name, &dt)?;
        }

        w(&mut self.writer, "<")?;
        w(&mut self.writer, &element_name)?;
        for decl in namespaces.iter().chain(&synthesized) {
            if decl.prefix.is_empty() {
                w(&mut self.writer, " xmlns=\"")?;
            } else {
                w(&mut self.writer, " xmlns:")?;
                w(&mut self.writer, &decl.prefix)?;
                w(&mut self.writer, "=\"")?;
            }
            write_escaped_attr(&mut self.writer, &decl.uri)?;
            w(&mut self.writer, "\"")?;
        }
        for (name, (_, value)) in attribute_names.iter().zip(&attributes) {
            w(&mut self.writer, " ")?;
            w(&mut self.writer, name)?;
            w(&mut self.writer, "=\"")?;
            write_escaped_attr(&mut self.writer, value)?;
            w(&mut self.writer, "\"")?;
        }

        if self_closing {
            w(&mut self.writer, "/>")?;
            self.namespaces.pop_scope();
        } else {
            w(&mut self.writer, ">")?;
            self.open.push(element_name);
        }
        Ok(())
    }

    fn bind(&mut self, prefix: &str, uri: &Rc<str>, synthesized: &mut Vec<NamespaceDecl>) {
        let decl = NamespaceDecl::new(prefix, Rc::clone(uri));
        self.namespaces.declare(&decl);
        synthesized.push(decl);
    }

    /// Elementname; bindet Prefix bzw. Default-Namespace, falls nötig.
    fn element_name(&mut self, qname: &QName, synthesized: &mut Vec<NamespaceDecl>) -> String {
        let prefix = qname.prefix_str();
        if prefix == XML_PREFIX {
            return qname.to_string();
        }
        if self.namespaces.resolve(prefix).map(|u| &**u) != Some(&*qname.uri) {
            self.bind(prefix, &qname.uri, synthesized);
        }
        qname.to_string()
    }

    /// Attributname; Attribute ohne Prefix sind nie im Default-Namespace.
    fn attribute_name(&mut self, qname: &QName, synthesized: &mut Vec<NamespaceDecl>) -> String {
        if qname.uri.is_empty() {
            return qname.local_name.to_string();
        }
        if &*qname.uri == XML_NAMESPACE {
            return format!("{XML_PREFIX}:{}", qname.local_name);
        }
        let prefix = qname.prefix_str();
        if !prefix.is_empty() {
            if self.namespaces.resolve(prefix).map(|u| &**u) != Some(&*qname.uri) {
                self.bind(prefix, &qname.uri, synthesized);
            }
            return qname.to_string();
        }
        if let Some(existing) = self.namespaces.prefix_for(&qname.uri) {
            return format!("{existing}:{}", qname.local_name);
        }
        let prefix = loop {
            let candidate = format!("ns{}", self.synthetic_prefixes);
            self.synthetic_prefixes += 1;
            if self.namespaces.resolve(&candidate).is_none() {
                break candidate;
            }
        };
        self.bind(&prefix, &qname.uri, synthesized);
        format!("{prefix}:{}", qname.local_name)
    }
}
