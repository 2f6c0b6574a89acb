//! Event model: the information items an encoder consumes and a decoder
//! produces.
//!
//! Order per element: `StartElement`, its `NamespaceDeclaration`s, its
//! `Attribute`s, then children, then `EndElement`. A document is
//! `StartDocument`, optional `DocumentType`, comments and PIs, exactly one
//! root element subtree, more comments and PIs, `EndDocument`.

use std::rc::Rc;

use crate::algorithm::TypedArray;
use crate::qname::{NamespaceDecl, QName};

/// Content for Attribute events.
#[derive(Debug, Clone, PartialEq)]
pub struct AtContent {
    pub qname: Rc<QName>,
    pub value: AttributeValue,
}

/// An attribute value as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(Rc<str>),
    Restricted(RaContent),
    Algorithm(EaContent),
}

impl AttributeValue {
    /// Text form if the value is plain or restricted-alphabet text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Restricted(ra) => Some(&ra.value),
            Self::Algorithm(_) => None,
        }
    }
}

/// Content for Characters events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChContent {
    pub value: Rc<str>,
    /// The run came from (or goes into) a CDATA section.
    pub cdata: bool,
}

/// Text packed with a restricted alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaContent {
    /// Alphabet id: 0 numeric, 1 date-time, 16.. vocabulary table.
    pub alphabet: u8,
    pub value: Rc<str>,
}

/// Data carried by an encoding algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmValue {
    Typed(TypedArray),
    /// Raw octets of an algorithm without a registered codec.
    Octets(Rc<[u8]>),
}

/// Content for AlgorithmData events.
#[derive(Debug, Clone, PartialEq)]
pub struct EaContent {
    /// Algorithm id as written on the wire. Encoders ignore it when `uri` is set.
    pub algorithm: u8,
    /// URI of an application algorithm (ids 32 and up).
    pub uri: Option<Rc<str>>,
    pub value: AlgorithmValue,
}

impl EaContent {
    /// Typed array under its default built-in algorithm.
    pub fn builtin(data: TypedArray) -> Self {
        Self { algorithm: data.default_algorithm().id(), uri: None, value: AlgorithmValue::Typed(data) }
    }

    /// Typed array under an application algorithm.
    pub fn custom(uri: impl Into<Rc<str>>, data: TypedArray) -> Self {
        Self { algorithm: 0, uri: Some(uri.into()), value: AlgorithmValue::Typed(data) }
    }
}

/// Content for Comment events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmContent {
    pub text: Rc<str>,
}

/// Content for ProcessingInstruction events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiContent {
    pub target: Rc<str>,
    pub data: Rc<str>,
}

/// Content for DocumentType events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DtContent {
    pub system_id: Option<Rc<str>>,
    pub public_id: Option<Rc<str>>,
    /// Processing instructions from the internal subset.
    pub instructions: Vec<PiContent>,
}

/// Content for EntityReference events (an unexpanded entity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErContent {
    pub name: Rc<str>,
    pub system_id: Option<Rc<str>>,
    pub public_id: Option<Rc<str>>,
}

/// One information item.
#[derive(Debug, Clone, PartialEq)]
pub enum FiEvent {
    StartDocument,
    EndDocument,
    StartElement(Rc<QName>),
    EndElement,
    /// Namespace attribute of the preceding `StartElement`.
    NamespaceDeclaration(NamespaceDecl),
    Attribute(AtContent),
    Characters(ChContent),
    RestrictedCharacters(RaContent),
    AlgorithmData(EaContent),
    Comment(CmContent),
    ProcessingInstruction(PiContent),
    DocumentType(DtContent),
    EntityReference(ErContent),
}

impl FiEvent {
    /// Start of an element without namespace.
    pub fn start(local_name: &str) -> Self {
        Self::StartElement(Rc::new(QName::new("", local_name)))
    }

    /// Plain text attribute.
    pub fn attribute(qname: QName, value: &str) -> Self {
        Self::Attribute(AtContent { qname: Rc::new(qname), value: AttributeValue::Text(value.into()) })
    }

    /// Plain character run.
    pub fn characters(text: &str) -> Self {
        Self::Characters(ChContent { value: text.into(), cdata: false })
    }

    /// Namespace declaration.
    pub fn namespace(prefix: &str, uri: &str) -> Self {
        Self::NamespaceDeclaration(NamespaceDecl::new(prefix, uri))
    }

    /// Comment.
    pub fn comment(text: &str) -> Self {
        Self::Comment(CmContent { text: text.into() })
    }

    /// Processing instruction.
    pub fn processing_instruction(target: &str, data: &str) -> Self {
        Self::ProcessingInstruction(PiContent { target: target.into(), data: data.into() })
    }

    /// Short name of the variant, for ordering errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::StartDocument => "start document",
            Self::EndDocument => "end document",
            Self::StartElement(_) => "start element",
            Self::EndElement => "end element",
            Self::NamespaceDeclaration(_) => "namespace declaration",
            Self::Attribute(_) => "attribute",
            Self::Characters(_) => "characters",
            Self::RestrictedCharacters(_) => "restricted characters",
            Self::AlgorithmData(_) => "algorithm data",
            Self::Comment(_) => "comment",
            Self::ProcessingInstruction(_) => "processing instruction",
            Self::DocumentType(_) => "document type",
            Self::EntityReference(_) => "entity reference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_build_expected_variants() {
        let FiEvent::StartElement(q) = FiEvent::start("root") else {
            panic!("Expected StartElement");
        };
        assert_eq!(&*q.local_name, "root");
        assert!(q.uri.is_empty());

        assert_eq!(
            FiEvent::characters("x"),
            FiEvent::Characters(ChContent { value: "x".into(), cdata: false })
        );
        let FiEvent::NamespaceDeclaration(ns) = FiEvent::namespace("p", "urn:p") else {
            panic!("Expected NamespaceDeclaration");
        };
        assert_eq!((&*ns.prefix, &*ns.uri), ("p", "urn:p"));
    }

    #[test]
    fn attribute_text_access() {
        let FiEvent::Attribute(at) = FiEvent::attribute(QName::new("", "id"), "7") else {
            panic!("Expected Attribute");
        };
        assert_eq!(at.value.as_text(), Some("7"));
        let ea = AttributeValue::Algorithm(EaContent::builtin(TypedArray::Ints(vec![1])));
        assert_eq!(ea.as_text(), None);
    }

    #[test]
    fn builtin_algorithm_content_uses_default_id() {
        let ea = EaContent::builtin(TypedArray::Floats(vec![1.5]));
        assert_eq!(ea.algorithm, crate::algorithm::FLOAT);
        assert!(ea.uri.is_none());
        let ea = EaContent::custom("urn:alg", TypedArray::Bytes(vec![1]));
        assert_eq!(ea.uri.as_deref(), Some("urn:alg"));
    }

    #[test]
    fn kind_names_are_distinct() {
        let events = [
            FiEvent::StartDocument,
            FiEvent::EndDocument,
            FiEvent::start("a"),
            FiEvent::EndElement,
            FiEvent::comment("c"),
            FiEvent::processing_instruction("t", "d"),
        ];
        let names: std::collections::HashSet<_> = events.iter().map(FiEvent::kind_name).collect();
        assert_eq!(names.len(), events.len());
    }
}
