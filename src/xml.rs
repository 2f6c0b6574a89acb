//! XML text ↔ Fast Infoset.
//!
//! Parsing uses quick-xml's namespace-aware reader and produces [`FiEvent`]s
//! in document order; serializing lives in [`crate::xml_serializer`].
//!
//! Character data is coalesced across entity and character references.
//! CDATA sections stay separate events with the CDATA flag set. Whitespace
//! outside the document element is dropped. References to entities other
//! than the five predefined ones become `EntityReference` events.
//!
//! # Beispiel
//!
//! ```
//! use fastinfoset::options::{DecoderOptions, EncoderOptions};
//! use fastinfoset::xml::{fi_to_xml, xml_to_fi};
//!
//! let fi = xml_to_fi("<a x='1'><b>text</b></a>", &EncoderOptions::default()).unwrap();
//! let xml = fi_to_xml(&fi, &DecoderOptions::default()).unwrap();
//! assert_eq!(xml, r#"<a x="1"><b>text</b></a>"#);
//! ```

use std::io::{BufRead, Write};

use crate::encoder::Encoder;
use crate::event::FiEvent;
use crate::options::EncoderOptions;
use crate::Result;

mod doctype;
mod emit;

pub use crate::xml_serializer::{XmlSerializer, events_to_xml, fi_reader_to_xml, fi_to_xml};

/// Ab dieser Puffergröße schreibt der Streaming-Encoder in die Senke.
const FLUSH_THRESHOLD: usize = 64 * 1024;

/// Parses XML text into events, `StartDocument` through `EndDocument`.
pub fn parse_str(xml: &str) -> Result<Vec<FiEvent>> {
    let mut events = Vec::new();
    emit::emit_events(xml.as_bytes(), |event| {
        events.push(event);
        Ok(())
    })?;
    Ok(events)
}

/// Parses XML from `reader` and hands every event to `emit` as it is read.
pub fn parse_reader(reader: impl BufRead, emit: impl FnMut(FiEvent) -> Result<()>) -> Result<()> {
    emit::emit_events(reader, emit)
}

/// Encodes XML text as a Fast Infoset document.
pub fn xml_to_fi(xml: &str, options: &EncoderOptions) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(options.clone())?;
    emit::emit_events(xml.as_bytes(), |event| encoder.encode_event(&event))?;
    encoder.finish()
}

/// Streams XML from `reader` into a Fast Infoset document written to `sink`.
///
/// Finished octets are passed on whenever the buffer grows beyond 64 KiB,
/// so memory stays bounded by the largest element start.
pub fn xml_reader_to_fi(reader: impl BufRead, options: &EncoderOptions, sink: &mut impl Write) -> Result<()> {
    let mut encoder = Encoder::new(options.clone())?;
    emit::emit_events(reader, |event| {
        encoder.encode_event(&event)?;
        if encoder.buffered_len() > FLUSH_THRESHOLD {
            encoder.flush_to(&mut *sink)?;
        }
        Ok(())
    })?;
    encoder.finish_to(sink)
}
