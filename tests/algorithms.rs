//! Encoding-Algorithmus-Tests: Built-in-Typarrays und Anwendungsalgorithmen
//! ueber Registry und Vokabular.

use std::rc::Rc;
use std::sync::Arc;

use fastinfoset::algorithm::{AlgorithmRegistry, EncodingAlgorithm, TypedArray};
use fastinfoset::decoder::{decode, decode_with_options};
use fastinfoset::encoder::encode;
use fastinfoset::error::{Error, ErrorKind, Result};
use fastinfoset::event::{AlgorithmValue, AtContent, AttributeValue, EaContent, FiEvent};
use fastinfoset::options::{DecoderOptions, EncoderOptions};
use fastinfoset::qname::QName;
use fastinfoset::vocabulary::{ExternalVocabulary, InitialVocabulary, VocabularyTables};
use fastinfoset::xml::fi_to_xml;

const INTS_URI: &str = "urn:example:ints-le";

// ============================================================================
// Hilfsfunktionen
// ============================================================================

/// Ints als Little-Endian, Textform kommagetrennt.
struct IntsLe;

impl EncodingAlgorithm for IntsLe {
    fn decode_from_bytes(&self, octets: &[u8]) -> Result<TypedArray> {
        if octets.len() % 4 != 0 {
            return Err(Error::invalid_algorithm_data("length is not a multiple of 4"));
        }
        Ok(TypedArray::Ints(
            octets.chunks_exact(4).map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect(),
        ))
    }

    fn encode_to_bytes(&self, data: &TypedArray) -> Result<Vec<u8>> {
        match data {
            TypedArray::Ints(v) => Ok(v.iter().flat_map(|i| i.to_le_bytes()).collect()),
            other => Err(Error::invalid_algorithm_data(format!("expected ints, got {}", other.type_name()))),
        }
    }

    fn convert_from_text(&self, text: &str) -> Result<TypedArray> {
        text.split(',')
            .map(|s| s.trim().parse().map_err(|_| Error::invalid_algorithm_data("not an int")))
            .collect::<Result<Vec<i32>>>()
            .map(TypedArray::Ints)
    }

    fn convert_to_text(&self, data: &TypedArray) -> Result<String> {
        match data {
            TypedArray::Ints(v) => Ok(v.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")),
            _ => Err(Error::invalid_algorithm_data("expected ints")),
        }
    }
}

fn registry() -> AlgorithmRegistry {
    AlgorithmRegistry::new().with(INTS_URI, Arc::new(IntsLe))
}

fn algorithm_tables() -> VocabularyTables {
    VocabularyTables { encoding_algorithms: vec![INTS_URI.into()], ..VocabularyTables::default() }
}

fn custom_document() -> Vec<FiEvent> {
    vec![
        FiEvent::StartDocument,
        FiEvent::start("r"),
        FiEvent::Attribute(AtContent {
            qname: Rc::new(QName::new("", "v")),
            value: AttributeValue::Algorithm(EaContent::custom(INTS_URI, TypedArray::Ints(vec![4, 5]))),
        }),
        FiEvent::AlgorithmData(EaContent::custom(INTS_URI, TypedArray::Ints(vec![1, -2, 300]))),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ]
}

/// Anwendungsdaten aus einem decodierten Dokument: (Algorithmus-Id, URI, Wert).
fn custom_values(events: &[FiEvent]) -> Vec<(u8, Option<Rc<str>>, AlgorithmValue)> {
    events
        .iter()
        .filter_map(|e| match e {
            FiEvent::AlgorithmData(ea) => Some(ea),
            FiEvent::Attribute(AtContent { value: AttributeValue::Algorithm(ea), .. }) => Some(ea),
            _ => None,
        })
        .map(|ea| (ea.algorithm, ea.uri.clone(), ea.value.clone()))
        .collect()
}

// ============================================================================
// Schritt 1: Built-in-Algorithmen
// ============================================================================

#[test]
fn builtin_typed_arrays_round_trip() {
    let arrays = [
        TypedArray::Bytes(vec![0, 1, 254, 255]),
        TypedArray::Shorts(vec![i16::MIN, -1, 0, i16::MAX]),
        TypedArray::Ints(vec![i32::MIN, 42, i32::MAX]),
        TypedArray::Longs(vec![i64::MIN, -7, i64::MAX]),
        TypedArray::Booleans(vec![true, false, true, true, false]),
        TypedArray::Floats(vec![1.5, -0.25, f32::MAX, f32::INFINITY]),
        TypedArray::Doubles(vec![std::f64::consts::PI, -1e300, 0.0]),
        TypedArray::Uuids(vec![0x0123_4567_89ab_cdef_0123_4567_89ab_cdef]),
    ];
    let mut body: Vec<FiEvent> = vec![FiEvent::StartDocument, FiEvent::start("r")];
    for array in &arrays {
        body.push(FiEvent::start("v"));
        body.push(FiEvent::AlgorithmData(EaContent::builtin(array.clone())));
        body.push(FiEvent::EndElement);
    }
    body.push(FiEvent::EndElement);
    body.push(FiEvent::EndDocument);

    let fi = encode(&body, &EncoderOptions::default()).unwrap();
    assert_eq!(decode(&fi).unwrap(), body);
}

#[test]
fn builtin_arrays_render_as_text() {
    let events = vec![
        FiEvent::StartDocument,
        FiEvent::start("r"),
        FiEvent::Attribute(AtContent {
            qname: Rc::new(QName::new("", "flags")),
            value: AttributeValue::Algorithm(EaContent::builtin(TypedArray::Booleans(vec![true, false]))),
        }),
        FiEvent::AlgorithmData(EaContent::builtin(TypedArray::Shorts(vec![3, -4]))),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    let fi = encode(&events, &EncoderOptions::default()).unwrap();
    assert_eq!(
        fi_to_xml(&fi, &DecoderOptions::default()).unwrap(),
        r#"<r flags="true false">3 -4</r>"#
    );
}

#[test]
fn empty_typed_array_is_rejected() {
    let empty = EaContent::builtin(TypedArray::Ints(Vec::new()));
    let chunk = vec![
        FiEvent::StartDocument,
        FiEvent::start("r"),
        FiEvent::AlgorithmData(empty.clone()),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    let err = encode(&chunk, &EncoderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature, "{err:?}");

    let attribute = vec![
        FiEvent::StartDocument,
        FiEvent::start("r"),
        FiEvent::Attribute(AtContent { qname: Rc::new(QName::new("", "v")), value: AttributeValue::Algorithm(empty) }),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    let err = encode(&attribute, &EncoderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature, "{err:?}");
}

// ============================================================================
// Schritt 2: Anwendungsalgorithmen
// ============================================================================

#[test]
fn custom_algorithm_with_inline_table() {
    let opts = EncoderOptions::default()
        .with_initial_vocabulary(InitialVocabulary::inline(algorithm_tables()))
        .with_algorithms(registry());
    let fi = encode(&custom_document(), &opts).unwrap();

    let dec = DecoderOptions::default().with_algorithms(registry());
    let values = custom_values(&decode_with_options(&fi, &dec).unwrap());
    assert_eq!(
        values,
        vec![
            (32, Some(Rc::from(INTS_URI)), AlgorithmValue::Typed(TypedArray::Ints(vec![4, 5]))),
            (32, Some(Rc::from(INTS_URI)), AlgorithmValue::Typed(TypedArray::Ints(vec![1, -2, 300]))),
        ]
    );
    assert_eq!(fi_to_xml(&fi, &dec).unwrap(), r#"<r v="4,5">1,-2,300</r>"#);
}

#[test]
fn custom_algorithm_with_external_table() {
    let vocabulary = ExternalVocabulary::new("urn:example:algorithms", algorithm_tables());
    let opts = EncoderOptions::default()
        .with_initial_vocabulary(InitialVocabulary::external(vocabulary.clone()))
        .with_algorithms(registry());
    let fi = encode(&custom_document(), &opts).unwrap();

    let dec = DecoderOptions::default()
        .with_external_vocabulary(vocabulary)
        .with_algorithms(registry());
    let values = custom_values(&decode_with_options(&fi, &dec).unwrap());
    assert_eq!(values.len(), 2);
    assert!(values.iter().all(|(id, uri, _)| *id == 32 && uri.as_deref() == Some(INTS_URI)));
}

#[test]
fn unregistered_algorithm_fails_or_passes_octets() {
    let opts = EncoderOptions::default()
        .with_initial_vocabulary(InitialVocabulary::inline(algorithm_tables()))
        .with_algorithms(registry());
    let fi = encode(&custom_document(), &opts).unwrap();

    let err = decode_with_options(&fi, &DecoderOptions::default()).unwrap_err();
    assert!(matches!(&err, Error::UnsupportedAlgorithm(uri) if uri == INTS_URI), "{err:?}");

    let dec = DecoderOptions::default().with_octets_for_unknown_algorithms();
    let values = custom_values(&decode_with_options(&fi, &dec).unwrap());
    assert_eq!(values[1].2, AlgorithmValue::Octets(Rc::from(&[1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF, 44, 1, 0, 0][..])));
    // [4, 5] als LE-Octets → Base64
    assert_eq!(fi_to_xml(&fi, &dec).unwrap(), r#"<r v="BAAAAAUAAAA=">AQAAAP7///8sAQAA</r>"#);
}

#[test]
fn algorithm_without_table_entry_is_rejected() {
    let opts = EncoderOptions::default().with_algorithms(registry());
    let err = encode(&custom_document(), &opts).unwrap_err();
    assert!(matches!(&err, Error::UnsupportedAlgorithm(uri) if uri == INTS_URI), "{err:?}");
}

#[test]
fn algorithm_without_codec_is_rejected() {
    let opts = EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::inline(algorithm_tables()));
    let err = encode(&custom_document(), &opts).unwrap_err();
    assert!(matches!(&err, Error::UnsupportedAlgorithm(uri) if uri == INTS_URI), "{err:?}");
}
