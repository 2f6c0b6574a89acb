//! Vokabular-Tests: Groessenschwellen, Wiederverwendung, initiale und
//! externe Vokabulare.

use std::rc::Rc;

use fastinfoset::decoder::{decode, decode_with_options};
use fastinfoset::encoder::{Encoder, encode};
use fastinfoset::error::{Error, ErrorKind};
use fastinfoset::event::{AttributeValue, FiEvent, RaContent};
use fastinfoset::options::{DecoderOptions, EncoderOptions};
use fastinfoset::qname::QName;
use fastinfoset::vocabulary::{ExternalVocabulary, InitialVocabulary, NameSurrogate, VocabularyTables};
use fastinfoset::xml::{fi_to_xml, xml_to_fi};

// ============================================================================
// Hilfsfunktionen
// ============================================================================

/// Zaehlt die Vorkommen von `needle` in `haystack`.
fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn document(body: &[FiEvent]) -> Vec<FiEvent> {
    let mut events = vec![FiEvent::StartDocument, FiEvent::start("r")];
    events.extend_from_slice(body);
    events.push(FiEvent::EndElement);
    events.push(FiEvent::EndDocument);
    events
}

// ============================================================================
// Schritt 1: Groessenschwellen
// ============================================================================

#[test]
fn attribute_values_below_limit_are_indexed() {
    let below = "q".repeat(31);
    let at = "z".repeat(32);
    let xml = format!(
        r#"<r><a v="{below}"/><a v="{below}"/><b v="{at}"/><b v="{at}"/></r>"#
    );
    let fi = xml_to_fi(&xml, &EncoderOptions::default()).unwrap();
    assert_eq!(occurrences(&fi, below.as_bytes()), 1);
    assert_eq!(occurrences(&fi, at.as_bytes()), 2);
    assert_eq!(fi_to_xml(&fi, &DecoderOptions::default()).unwrap(), xml);
}

#[test]
fn character_chunks_below_limit_are_indexed() {
    let below = "k".repeat(31);
    let at = "m".repeat(32);
    let xml = format!("<r><a>{below}</a><a>{below}</a><b>{at}</b><b>{at}</b></r>");
    let fi = xml_to_fi(&xml, &EncoderOptions::default()).unwrap();
    assert_eq!(occurrences(&fi, below.as_bytes()), 1);
    assert_eq!(occurrences(&fi, at.as_bytes()), 2);
    assert_eq!(fi_to_xml(&fi, &DecoderOptions::default()).unwrap(), xml);
}

#[test]
fn configured_limits_apply() {
    let xml = r#"<r><a v="wwww">ttt</a><a v="wwww">ttt</a><a v="vvvvv">sssss</a><a v="vvvvv">sssss</a></r>"#;
    let opts = EncoderOptions::default()
        .with_attribute_value_size_limit(5)
        .with_character_chunk_size_limit(4);
    let fi = xml_to_fi(xml, &opts).unwrap();
    assert_eq!(occurrences(&fi, b"wwww"), 1);
    assert_eq!(occurrences(&fi, b"vvvvv"), 2);
    assert_eq!(occurrences(&fi, b"ttt"), 1);
    assert_eq!(occurrences(&fi, b"sssss"), 2);
    assert_eq!(fi_to_xml(&fi, &DecoderOptions::default()).unwrap(), xml);
}

#[test]
fn zero_limit_never_indexes() {
    let xml = "<r><a>xyzzy</a><a>xyzzy</a></r>";
    let opts = EncoderOptions::default().with_character_chunk_size_limit(0);
    let fi = xml_to_fi(xml, &opts).unwrap();
    assert_eq!(occurrences(&fi, b"xyzzy"), 2);
}

#[test]
fn comments_are_never_indexed() {
    let xml = "<r><!--same--><!--same--></r>";
    let fi = xml_to_fi(xml, &EncoderOptions::default()).unwrap();
    assert_eq!(occurrences(&fi, b"same"), 2);
    assert_eq!(fi_to_xml(&fi, &DecoderOptions::default()).unwrap(), xml);
}

#[test]
fn empty_attribute_value_round_trips() {
    let xml = r#"<r a="" b=""/>"#;
    let fi = xml_to_fi(xml, &EncoderOptions::default()).unwrap();
    assert_eq!(fi_to_xml(&fi, &DecoderOptions::default()).unwrap(), xml);
}

// ============================================================================
// Schritt 2: Wiederverwendung ueber den Push-Encoder
// ============================================================================

#[test]
fn encoder_reset_forgets_vocabulary() {
    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();
    let events = document(&[FiEvent::characters("hallo")]);
    encoder.encode_events(&events).unwrap();
    let first = encoder.finish().unwrap();

    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();
    encoder.encode_events(&events).unwrap();
    encoder.reset();
    encoder.encode_events(&events).unwrap();
    let second = encoder.finish().unwrap();
    assert_eq!(first, second);
    assert_eq!(decode(&second).unwrap(), events);
}

// ============================================================================
// Schritt 3: Initiales Vokabular im Header
// ============================================================================

#[test]
fn inline_vocabulary_is_written_and_loaded() {
    let tables = VocabularyTables {
        restricted_alphabets: vec!["abc".into()],
        local_names: vec!["r".into(), "code".into()],
        attribute_values: vec!["vorbelegt".into()],
        element_names: vec![NameSurrogate::local(0)],
        attribute_names: vec![NameSurrogate::local(1)],
        ..VocabularyTables::default()
    };
    let opts = EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::inline(tables));
    let events = vec![
        FiEvent::StartDocument,
        FiEvent::start("r"),
        FiEvent::attribute(QName::new("", "code"), "vorbelegt"),
        FiEvent::RestrictedCharacters(RaContent { alphabet: 16, value: Rc::from("cabba") }),
        FiEvent::RestrictedCharacters(RaContent { alphabet: 0, value: Rc::from("-12.5E3") }),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    let fi = encode(&events, &opts).unwrap();
    assert_eq!(decode(&fi).unwrap(), events);
    assert_eq!(
        fi_to_xml(&fi, &DecoderOptions::default()).unwrap(),
        r#"<r code="vorbelegt">cabba-12.5E3</r>"#
    );
}

#[test]
fn restricted_attribute_value_round_trips() {
    let tables = VocabularyTables { restricted_alphabets: vec!["01".into()], ..VocabularyTables::default() };
    let opts = EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::inline(tables));
    let mut events = document(&[]);
    events.insert(
        2,
        FiEvent::Attribute(fastinfoset::event::AtContent {
            qname: Rc::new(QName::new("", "bits")),
            value: AttributeValue::Restricted(RaContent { alphabet: 16, value: Rc::from("0110") }),
        }),
    );
    let fi = encode(&events, &opts).unwrap();
    assert_eq!(decode(&fi).unwrap(), events);
}

#[test]
fn character_outside_alphabet_is_rejected() {
    let events = document(&[FiEvent::RestrictedCharacters(RaContent { alphabet: 0, value: Rc::from("12a") })]);
    let err = encode(&events, &EncoderOptions::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidAlphabetCharacter('a')), "{err:?}");
}

// ============================================================================
// Schritt 4: Externes Vokabular
// ============================================================================

fn shared_vocabulary() -> ExternalVocabulary {
    ExternalVocabulary::new(
        "urn:example:vocab",
        VocabularyTables {
            prefixes: vec!["s".into()],
            namespace_names: vec!["urn:example:shop".into()],
            local_names: vec!["order".into(), "position".into(), "sku".into()],
            attribute_values: vec!["A-100".into()],
            character_chunks: vec!["geliefert".into()],
            element_names: vec![NameSurrogate::qualified(Some(0), 0, 0), NameSurrogate::qualified(Some(0), 0, 1)],
            attribute_names: vec![NameSurrogate::local(2)],
            ..VocabularyTables::default()
        },
    )
}

#[test]
fn external_vocabulary_round_trip() {
    let xml = r#"<s:order xmlns:s="urn:example:shop"><s:position sku="A-100">geliefert</s:position></s:order>"#;
    let vocabulary = shared_vocabulary();
    let opts = EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::external(vocabulary.clone()));
    let fi = xml_to_fi(xml, &opts).unwrap();

    // Alle Namen und Werte stehen im Vokabular und erscheinen nicht im Dokument.
    for literal in ["position", "A-100", "geliefert", "urn:example:shop"] {
        assert_eq!(occurrences(&fi, literal.as_bytes()), 0, "{literal} literal geschrieben");
    }
    assert_eq!(occurrences(&fi, b"urn:example:vocab"), 1);

    let dec = DecoderOptions::default().with_external_vocabulary(vocabulary);
    assert_eq!(fi_to_xml(&fi, &dec).unwrap(), xml);
    let plain = xml_to_fi(xml, &EncoderOptions::default()).unwrap();
    assert!(fi.len() < plain.len());
}

#[test]
fn unknown_external_vocabulary_is_unresolved() {
    let opts = EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::external(shared_vocabulary()));
    let fi = xml_to_fi("<x/>", &opts).unwrap();
    let err = decode_with_options(&fi, &DecoderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert!(matches!(&err, Error::UnknownExternalVocabulary(uri) if uri == "urn:example:vocab"), "{err:?}");
}
