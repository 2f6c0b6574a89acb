//! Dispatch-Tabellen: Klassifikation des führenden Octets.
//!
//! Jede Tabelle hat 256 Einträge und wird zur Compile-Zeit aus der Bit-Belegung
//! berechnet. Der Decoder liest ein Octet, schlägt die Klasse nach und liest
//! danach genau die Octets, die Klasse und Tier verlangen.

use crate::integer::{self, Tier};

pub(super) const TERMINATOR: u8 = 0xF0;
pub(super) const DOUBLE_TERMINATOR: u8 = 0xFF;
pub(super) const ATTRIBUTE_FLAG: u8 = 0x40;
pub(super) const NAMESPACE_ATTRIBUTE: u8 = 0xCC;
pub(super) const PREFIX_FLAG: u8 = 0x02;
pub(super) const NAME_FLAG: u8 = 0x01;
pub(super) const SYSTEM_ID_FLAG: u8 = 0x02;
pub(super) const PUBLIC_ID_FLAG: u8 = 0x01;
pub(super) const PROCESSING_INSTRUCTION: u8 = 0xE1;

/// Child of the document or of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Child {
    Invalid,
    /// Element name as an index on the 3rd bit.
    Element(Tier),
    ElementLiteral,
    /// `0x38`: namespace attributes precede the element octet.
    ElementNamespaces,
    /// Character chunk literal (UTF-8, UTF-16, alphabet or algorithm).
    Chunk,
    /// Character chunk index on the 4th bit.
    ChunkIndex(Tier),
    ProcessingInstruction,
    Comment,
    DocumentType,
    EntityReference,
    Terminator,
    DoubleTerminator,
}

/// Octet in an attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Attribute {
    Invalid,
    /// Attribute name as an index on the 2nd bit.
    Index(Tier),
    Literal,
    /// `F0`: children follow.
    End,
    /// `FF`: the element ends with its attributes.
    EndElement,
}

/// Representation of a non-identifying string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Encoding {
    Utf8,
    Utf16,
    Restricted,
    Algorithm,
}

/// First octet of a non-identifying string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Value {
    Invalid,
    Literal { add: bool, encoding: Encoding },
    Index(Tier),
    Empty,
}

const fn encoding_of(bits: u8) -> Encoding {
    match bits & 0x03 {
        0 => Encoding::Utf8,
        1 => Encoding::Utf16,
        2 => Encoding::Restricted,
        _ => Encoding::Algorithm,
    }
}

const fn classify_child(b: u8) -> Child {
    match b {
        0x00..=0x7F => {
            // Attribut-Flag (Bit 2) spielt für die Klasse keine Rolle
            let e = b & 0x3F;
            match e {
                0x38 => Child::ElementNamespaces,
                0x39..=0x3B => Child::Invalid,
                0x3C..=0x3F => Child::ElementLiteral,
                _ => match integer::index_tier_3rd(e) {
                    Some(t) => Child::Element(t),
                    None => Child::Invalid,
                },
            }
        }
        0x80..=0x9F => Child::Chunk,
        0xA0..=0xBF => match integer::index_tier_4th(b) {
            Some(t) => Child::ChunkIndex(t),
            None => Child::Invalid,
        },
        0xC4..=0xC7 => Child::DocumentType,
        0xC8..=0xCB => Child::EntityReference,
        0xE1 => Child::ProcessingInstruction,
        0xE2 => Child::Comment,
        0xF0 => Child::Terminator,
        0xFF => Child::DoubleTerminator,
        _ => Child::Invalid,
    }
}

const fn classify_attribute(b: u8) -> Attribute {
    match b {
        0x78..=0x7B => Attribute::Literal,
        0x00..=0x77 => match integer::index_tier_2nd(b) {
            Some(t) => Attribute::Index(t),
            None => Attribute::Invalid,
        },
        0xF0 => Attribute::End,
        0xFF => Attribute::EndElement,
        _ => Attribute::Invalid,
    }
}

const fn classify_value(b: u8) -> Value {
    match b {
        0xFF => Value::Empty,
        0x80..=0xFE => match integer::index_tier_2nd(b) {
            Some(t) => Value::Index(t),
            None => Value::Invalid,
        },
        _ => Value::Literal { add: b & 0x40 != 0, encoding: encoding_of(b >> 4) },
    }
}

const fn build_child() -> [Child; 256] {
    let mut t = [Child::Invalid; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = classify_child(i as u8);
        i += 1;
    }
    t
}

const fn build_attribute() -> [Attribute; 256] {
    let mut t = [Attribute::Invalid; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = classify_attribute(i as u8);
        i += 1;
    }
    t
}

const fn build_value() -> [Value; 256] {
    let mut t = [Value::Invalid; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = classify_value(i as u8);
        i += 1;
    }
    t
}

pub(super) static CHILD: [Child; 256] = build_child();
pub(super) static ATTRIBUTE: [Attribute; 256] = build_attribute();
pub(super) static VALUE: [Value; 256] = build_value();

/// Encoding of a character chunk literal (`0x80..=0x9F`).
pub(super) const fn chunk_encoding(b: u8) -> Encoding {
    encoding_of(b >> 2)
}
