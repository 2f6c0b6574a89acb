use std::borrow::Cow;
use std::io::BufRead;
use std::rc::Rc;

use memchr::memchr;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName as XmlQName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::Error;
use crate::event::{AtContent, AttributeValue, ChContent, CmContent, ErContent, FiEvent, PiContent};
use crate::qname::{NamespaceDecl, QName, XML_NAMESPACE, XML_PREFIX};
use crate::Result;

use super::doctype::parse_doctype;

/// Liest XML und ruft `emit` für jedes Event auf, beginnend mit
/// `StartDocument` und endend mit `EndDocument`.
pub(super) fn emit_events(xml_reader: impl BufRead, mut emit: impl FnMut(FiEvent) -> Result<()>) -> Result<()> {
    let mut reader = NsReader::from_reader(xml_reader);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;
    // CH-Coalescing: gepufferter Text wird vor jedem anderen Event geflusht.
    let mut pending_ch: Option<String> = None;

    emit(FiEvent::StartDocument)?;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                check_root(depth, &mut saw_root)?;
                emit_start(&reader, &e, &mut emit)?;
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                check_root(depth, &mut saw_root)?;
                emit_start(&reader, &e, &mut emit)?;
                emit(FiEvent::EndElement)?;
            }
            Ok(Event::End(_)) => {
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::XmlParseError("end tag without open element".to_string()))?;
                emit(FiEvent::EndElement)?;
            }
            Ok(Event::Text(e)) => {
                // Referenzen kommen als eigene GeneralRef-Events.
                let text = decode_utf8(&e)?;
                push_text(&mut pending_ch, depth, &normalize_line_endings(text))?;
            }
            Ok(Event::CData(e)) => {
                if depth == 0 {
                    return Err(Error::XmlParseError("CDATA section outside the document element".to_string()));
                }
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                let text = normalize_line_endings(decode_utf8(&e)?).into_owned();
                if !text.is_empty() {
                    emit(FiEvent::Characters(ChContent { value: text.into(), cdata: true }))?;
                }
            }
            Ok(Event::Comment(e)) => {
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                let text = normalize_line_endings(decode_utf8(&e)?);
                emit(FiEvent::Comment(CmContent { text: Rc::from(text.as_ref()) }))?;
            }
            Ok(Event::PI(e)) => {
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                let target = decode_utf8(e.target())?;
                // Der Separator zwischen Target und Daten gehört nicht zu den Daten.
                let data = normalize_line_endings(decode_utf8(e.content())?.trim_start());
                emit(FiEvent::ProcessingInstruction(PiContent { target: target.into(), data: Rc::from(data.as_ref()) }))?;
            }
            Ok(Event::DocType(e)) => {
                flush_pending_ch(&mut pending_ch, &mut emit)?;
                emit(FiEvent::DocumentType(parse_doctype(decode_utf8(&e)?)))?;
            }
            Ok(Event::GeneralRef(e)) => {
                let name = decode_utf8(&e)?;
                if let Some(rest) = name.strip_prefix('#') {
                    let c = resolve_char_reference(rest)
                        .ok_or_else(|| Error::XmlParseError(format!("invalid character reference &{name};")))?;
                    push_text(&mut pending_ch, depth, c.encode_utf8(&mut [0; 4]))?;
                } else if let Some(resolved) = resolve_predefined_entity(name) {
                    push_text(&mut pending_ch, depth, resolved)?;
                } else {
                    if depth == 0 {
                        return Err(Error::XmlParseError(format!("entity reference &{name}; outside the document element")));
                    }
                    flush_pending_ch(&mut pending_ch, &mut emit)?;
                    emit(FiEvent::EntityReference(ErContent { name: name.into(), system_id: None, public_id: None }))?;
                }
            }
            Ok(Event::Decl(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlParseError(format!("XML error at {}: {e}", reader.buffer_position())));
            }
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(Error::XmlParseError("document ends inside an element".to_string()));
    }
    if !saw_root {
        return Err(Error::XmlParseError("document has no element".to_string()));
    }
    emit(FiEvent::EndDocument)
}

fn check_root(depth: usize, saw_root: &mut bool) -> Result<()> {
    if depth == 0 {
        if *saw_root {
            return Err(Error::XmlParseError("second document element".to_string()));
        }
        *saw_root = true;
    }
    Ok(())
}

/// Text innerhalb eines Elements puffern; außerhalb ist nur Whitespace erlaubt.
fn push_text(pending_ch: &mut Option<String>, depth: usize, text: &str) -> Result<()> {
    if depth == 0 {
        if text.chars().any(|c| !matches!(c, ' ' | '\t' | '\n' | '\r')) {
            return Err(Error::XmlParseError("character data outside the document element".to_string()));
        }
        return Ok(());
    }
    if !text.is_empty() {
        pending_ch.get_or_insert_with(String::new).push_str(text);
    }
    Ok(())
}

fn flush_pending_ch(pending_ch: &mut Option<String>, emit: &mut impl FnMut(FiEvent) -> Result<()>) -> Result<()> {
    if let Some(text) = pending_ch.take() {
        emit(FiEvent::Characters(ChContent { value: text.into(), cdata: false }))?;
    }
    Ok(())
}

/// Start-Tag: Element, dann Namespace-Deklarationen, dann Attribute in Dokumentreihenfolge.
fn emit_start(reader: &NsReader<impl BufRead>, e: &BytesStart<'_>, emit: &mut impl FnMut(FiEvent) -> Result<()>) -> Result<()> {
    let name = resolve_name(reader, e.name(), false)?;
    emit(FiEvent::StartElement(Rc::new(name)))?;

    let mut attributes = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(|er| Error::XmlParseError(er.to_string()))?;
        if let Some(decl) = namespace_declaration(&attr)? {
            emit(FiEvent::NamespaceDeclaration(decl))?;
            continue;
        }
        let qname = resolve_name(reader, attr.key, true)?;
        let value = attribute_text(&attr)?;
        attributes.push(FiEvent::Attribute(AtContent {
            qname: Rc::new(qname),
            value: AttributeValue::Text(value.into()),
        }));
    }
    for attribute in attributes {
        emit(attribute)?;
    }
    Ok(())
}

fn resolve_name(reader: &NsReader<impl BufRead>, name: XmlQName<'_>, attribute: bool) -> Result<QName> {
    let (ns, local) = if attribute {
        reader.resolver().resolve_attribute(name)
    } else {
        reader.resolver().resolve_element(name)
    };
    let local = decode_utf8(local.as_ref())?;
    let prefix = match split_prefix(name.as_ref()) {
        Some(p) => Some(decode_utf8(p)?),
        None => None,
    };
    let uri = if prefix == Some(XML_PREFIX) {
        XML_NAMESPACE
    } else {
        match ns {
            ResolveResult::Bound(ns) => decode_utf8(ns.0)?,
            ResolveResult::Unbound => "",
            ResolveResult::Unknown(p) => {
                return Err(Error::XmlParseError(format!(
                    "unbound namespace prefix '{}'",
                    String::from_utf8_lossy(&p)
                )));
            }
        }
    };
    Ok(match prefix {
        Some(p) => QName::with_prefix(uri, local, p),
        None => QName::new(uri, local),
    })
}

fn namespace_declaration(attr: &Attribute<'_>) -> Result<Option<NamespaceDecl>> {
    let key = attr.key.as_ref();
    let prefix = if key == b"xmlns" {
        ""
    } else if let Some(p) = key.strip_prefix(b"xmlns:") {
        decode_utf8(p)?
    } else {
        return Ok(None);
    };
    let uri = attribute_text(attr)?;
    Ok(Some(NamespaceDecl::new(prefix, uri)))
}

/// Attributwert nach XML 1.0 Sec. 3.3.3: rohe Zeilenenden und Whitespace
/// werden zu Leerzeichen, danach werden Referenzen aufgelöst. Zeichen aus
/// `&#9;`, `&#10;` und `&#13;` bleiben damit erhalten.
fn attribute_text(attr: &Attribute<'_>) -> Result<String> {
    let raw = decode_utf8(attr.value.as_ref())?;
    let normalized = normalize_line_endings(raw).replace(['\t', '\n'], " ");
    let unescaped =
        quick_xml::escape::unescape(&normalized).map_err(|er| Error::XmlParseError(er.to_string()))?;
    Ok(unescaped.into_owned())
}

fn decode_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|er| Error::XmlParseError(er.to_string()))
}

/// XML 1.0 Sec. 2.11: \r\n -> \n, alleinstehende \r -> \n
fn normalize_line_endings(s: &str) -> Cow<'_, str> {
    if memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

fn split_prefix(name: &[u8]) -> Option<&[u8]> {
    let pos = memchr(b':', name)?;
    Some(&name[..pos])
}

/// Zeichenreferenz ohne `&#` und `;`: `65` oder `x41`.
fn resolve_char_reference(digits: &str) -> Option<char> {
    let code_point = match digits.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code_point)
}
