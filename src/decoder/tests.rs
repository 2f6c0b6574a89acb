use super::*;
use crate::algorithm::TypedArray;
use crate::encoder::{Encoder, encode};
use crate::event::{AlgorithmValue, AttributeValue, ChContent, EaContent, RaContent};
use crate::options::EncoderOptions;
use crate::vocabulary::{ExternalVocabulary, InitialVocabulary, VocabularyTables};

/// Header ohne Optionen: Magic + Flag-Octet 0.
const HEADER: [u8; 5] = [0xE0, 0x00, 0x00, 0x01, 0x00];

fn with_header(body: &[u8]) -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(body);
    bytes
}

fn name(local: &str) -> QName {
    QName::new("", local)
}

fn start(local: &str) -> FiEvent {
    FiEvent::start(local)
}

fn round_trip(events: &[FiEvent]) -> Vec<FiEvent> {
    let bytes = encode(events, &EncoderOptions::default()).unwrap();
    decode(&bytes).unwrap()
}

// ============================================================================
// Schritt 1: Header + Terminatoren
// ============================================================================

/// `<e/>`: ein FF schließt Element und Dokument.
#[test]
fn single_leaf() {
    let events = decode(&with_header(&[0x3C, 0x00, b'e', 0xFF])).unwrap();
    assert_eq!(
        events,
        vec![FiEvent::StartDocument, start("e"), FiEvent::EndElement, FiEvent::EndDocument]
    );
}

/// `<r><a/><b/></r>`: F0 zwischen Geschwistern, FF F0 am Ende.
#[test]
fn siblings_and_double_terminator() {
    let bytes = with_header(&[0x3C, 0x00, b'r', 0x3C, 0x00, b'a', 0xF0, 0x3C, 0x00, b'b', 0xFF, 0xF0]);
    let events = decode(&bytes).unwrap();
    assert_eq!(
        events,
        vec![
            FiEvent::StartDocument,
            start("r"),
            start("a"),
            FiEvent::EndElement,
            start("b"),
            FiEvent::EndElement,
            FiEvent::EndElement,
            FiEvent::EndDocument,
        ]
    );
}

/// Attribute ohne Kinder: FF beendet Attributliste und Element.
#[test]
fn attributes_without_children() {
    let bytes = with_header(&[0x7C, 0x00, b'e', 0x78, 0x00, b'a', 0x40, b'v', 0xFF, 0xF0]);
    let events = decode(&bytes).unwrap();
    assert_eq!(
        events,
        vec![
            FiEvent::StartDocument,
            start("e"),
            FiEvent::attribute(name("a"), "v"),
            FiEvent::EndElement,
            FiEvent::EndDocument,
        ]
    );
}

/// Header-Eigenschaften stehen nach StartDocument bereit.
#[test]
fn document_properties() {
    let opts = EncoderOptions::default()
        .with_xml_declaration()
        .with_version("1.0")
        .with_standalone(true)
        .with_character_encoding_scheme("UTF-8")
        .with_additional_data("urn:extra", vec![1, 2, 3]);
    let bytes = encode(&[FiEvent::StartDocument, start("e"), FiEvent::EndElement, FiEvent::EndDocument], &opts).unwrap();
    let mut d = Decoder::new(&bytes[..], DecoderOptions::default());
    assert_eq!(d.next_event().unwrap(), Some(FiEvent::StartDocument));
    let doc = d.document();
    assert_eq!(doc.xml_declaration.as_deref(), Some(crate::header::DEFAULT_XML_DECLARATION));
    assert_eq!(doc.version.as_deref(), Some("1.0"));
    assert_eq!(doc.standalone, Some(true));
    assert_eq!(doc.character_encoding_scheme.as_deref(), Some("UTF-8"));
    assert_eq!(doc.additional_data.len(), 1);
    assert_eq!(doc.additional_data[0].id, "urn:extra");
    assert_eq!(doc.additional_data[0].data, vec![1, 2, 3]);
}

// ============================================================================
// Schritt 2: Fehlerfälle
// ============================================================================

/// Reservierte Octets werden mit Offset gemeldet.
#[test]
fn reserved_octet_in_element() {
    let bytes = with_header(&[0x3C, 0x00, b'e', 0xC0]);
    assert_eq!(
        decode(&bytes),
        Err(Error::InvalidConstruct { octet: 0xC0, offset: 8, context: "child of element" })
    );
}

/// Text direkt im Dokument ist nicht erlaubt.
#[test]
fn chunk_at_document_level() {
    let bytes = with_header(&[0x90, b'x']);
    assert_eq!(
        decode(&bytes),
        Err(Error::InvalidConstruct { octet: 0x90, offset: 5, context: "child of document" })
    );
}

#[test]
fn document_without_element() {
    assert_eq!(decode(&with_header(&[0xF0])), Err(Error::NoDocumentElement));
}

#[test]
fn second_document_element() {
    let bytes = with_header(&[0x3C, 0x00, b'a', 0xF0, 0x3C, 0x00, b'b', 0xFF]);
    assert_eq!(
        decode(&bytes),
        Err(Error::InvalidConstruct { octet: 0x3C, offset: 9, context: "second document element" })
    );
}

/// FF auf Dokumentebene würde zwei Ebenen schließen.
#[test]
fn double_terminator_at_document_level() {
    let bytes = with_header(&[0x3C, 0x00, b'e', 0xF0, 0xFF]);
    assert!(matches!(decode(&bytes), Err(Error::InvalidConstruct { octet: 0xFF, .. })));
}

#[test]
fn premature_end() {
    let err = decode(&with_header(&[0x3C, 0x00])).unwrap_err();
    assert!(matches!(err, Error::PrematureEndOfStream { .. }), "{err}");
    assert_eq!(err.kind(), crate::ErrorKind::MalformedInput);
}

/// Element ohne Abschluss endet vorzeitig.
#[test]
fn unterminated_element() {
    let err = decode(&with_header(&[0x3C, 0x00, b'e'])).unwrap_err();
    assert!(matches!(err, Error::PrematureEndOfStream { .. }), "{err}");
}

/// Index auf einen nie vergebenen Eintrag.
#[test]
fn element_index_out_of_range() {
    let err = decode(&with_header(&[0x00, 0xFF])).unwrap_err();
    assert_eq!(err, Error::IndexOutOfRange { table: "element name", index: 0, len: 0 });
    assert_eq!(err.kind(), crate::ErrorKind::UnresolvedReference);
}

/// Präfix ohne Namespace ist kein gültiges Literal.
#[test]
fn prefix_without_namespace() {
    let bytes = with_header(&[0x3E, 0x00, b'p', 0x00, b'e', 0xFF]);
    assert!(matches!(decode(&bytes), Err(Error::InvalidConstruct { .. })));
}

#[test]
fn bad_magic() {
    assert!(matches!(decode(&[0xE0, 0x01, 0x00, 0x01, 0x00]), Err(Error::InvalidMagic { offset: 0 })));
}

/// Nach einem Fehler liefert der Iterator nichts mehr.
#[test]
fn iterator_is_fused_after_error() {
    let bytes = with_header(&[0x3C, 0x00, b'e', 0xC0, 0xFF]);
    let mut d = Decoder::new(&bytes[..], DecoderOptions::default());
    assert_eq!(d.next().unwrap().unwrap(), FiEvent::StartDocument);
    assert_eq!(d.next().unwrap().unwrap(), start("e"));
    assert!(d.next().unwrap().is_err());
    assert!(d.next().is_none());
    assert!(d.next().is_none());
    assert!(!d.has_next());
}

// ============================================================================
// Schritt 3: Inhalte
// ============================================================================

#[test]
fn text_comments_and_instructions() {
    let events = vec![
        FiEvent::StartDocument,
        FiEvent::comment("before"),
        start("r"),
        FiEvent::characters("hello"),
        FiEvent::processing_instruction("t", "d"),
        FiEvent::characters("hello"),
        FiEvent::comment("inside"),
        FiEvent::EndElement,
        FiEvent::processing_instruction("t", "d"),
        FiEvent::EndDocument,
    ];
    assert_eq!(round_trip(&events), events);
}

#[test]
fn document_type_and_entity_reference() {
    let events = vec![
        FiEvent::StartDocument,
        FiEvent::DocumentType(DtContent {
            system_id: Some("s.dtd".into()),
            public_id: Some("-//P".into()),
            instructions: vec![PiContent { target: "t".into(), data: "d".into() }],
        }),
        start("e"),
        FiEvent::EntityReference(ErContent { name: "ent".into(), system_id: Some("s.dtd".into()), public_id: None }),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    assert_eq!(round_trip(&events), events);
}

/// CDATA-Flag überlebt den Round-Trip.
#[test]
fn cdata_flag() {
    let events = vec![
        FiEvent::StartDocument,
        start("e"),
        FiEvent::Characters(ChContent { value: "x<y".into(), cdata: true }),
        FiEvent::characters("plain"),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    assert_eq!(round_trip(&events), events);
}

/// UTF-16-Chunk (0x84 + Länge 2): wird gelesen, obwohl der Encoder UTF-8 schreibt.
#[test]
fn utf16_chunk() {
    let bytes = with_header(&[0x3C, 0x00, b'e', 0x85, 0x00, b'h', 0xFF]);
    let events = decode(&bytes).unwrap();
    assert_eq!(events[2], FiEvent::characters("h"));
}

#[test]
fn typed_arrays_and_restricted_text() {
    let events = vec![
        FiEvent::StartDocument,
        start("e"),
        FiEvent::AlgorithmData(EaContent::builtin(TypedArray::Ints(vec![1, -2, 3]))),
        FiEvent::AlgorithmData(EaContent::builtin(TypedArray::Doubles(vec![0.5]))),
        FiEvent::RestrictedCharacters(RaContent { alphabet: crate::alphabet::NUMERIC, value: "12.5E3".into() }),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    assert_eq!(round_trip(&events), events);
}

/// Attributwerte als Algorithmus-Daten und Restricted Alphabet.
#[test]
fn encoded_attribute_values() {
    let typed = AttributeValue::Algorithm(EaContent::builtin(TypedArray::Shorts(vec![7, -7])));
    let restricted = AttributeValue::Restricted(RaContent { alphabet: crate::alphabet::DATE_TIME, value: "2024-01-01".into() });
    let mut e = Encoder::new(EncoderOptions::default()).unwrap();
    e.start_document().unwrap();
    e.start_element(&name("e")).unwrap();
    e.attribute_value(&name("a"), &typed).unwrap();
    e.attribute_value(&name("b"), &restricted).unwrap();
    e.attribute_value(&name("c"), &AttributeValue::Text("".into())).unwrap();
    e.end_element().unwrap();
    e.end_document().unwrap();
    let events = decode(&e.finish().unwrap()).unwrap();
    let values: Vec<_> = events
        .iter()
        .filter_map(|ev| match ev {
            FiEvent::Attribute(at) => Some(at.value.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![typed, restricted, AttributeValue::Text("".into())]);
}

/// Wiederholte Werte und Texte werden als Index gelesen.
#[test]
fn repeated_values_resolve_through_tables() {
    let mut events = vec![FiEvent::StartDocument, start("r")];
    for _ in 0..3 {
        events.push(start("item"));
        events.push(FiEvent::attribute(name("id"), "same"));
        events.push(FiEvent::characters("text"));
        events.push(FiEvent::EndElement);
    }
    events.push(FiEvent::EndElement);
    events.push(FiEvent::EndDocument);
    assert_eq!(round_trip(&events), events);
}

// ============================================================================
// Schritt 4: Vokabulare + Algorithmen
// ============================================================================

fn algorithm_tables() -> VocabularyTables {
    VocabularyTables { encoding_algorithms: vec!["urn:alg".into()], ..Default::default() }
}

fn octets_document(options: EncoderOptions) -> Vec<u8> {
    let mut e = Encoder::new(options).unwrap();
    e.start_document().unwrap();
    e.start_element(&name("e")).unwrap();
    e.octets("urn:alg", &[7, 8]).unwrap();
    e.end_element().unwrap();
    e.end_document().unwrap();
    e.finish().unwrap()
}

/// Anwendungsalgorithmus ohne Codec: Fehler, außer Octets sind erlaubt.
#[test]
fn unknown_algorithm_octets() {
    let bytes = octets_document(EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::inline(algorithm_tables())));
    assert_eq!(decode(&bytes), Err(Error::UnsupportedAlgorithm("urn:alg".into())));

    let opts = DecoderOptions::default().with_octets_for_unknown_algorithms();
    let events = decode_with_options(&bytes, &opts).unwrap();
    assert_eq!(
        events[2],
        FiEvent::AlgorithmData(EaContent {
            algorithm: 32,
            uri: Some("urn:alg".into()),
            value: AlgorithmValue::Octets(Rc::from(vec![7u8, 8])),
        })
    );
}

/// Externes Vokabular muss beim Decoder registriert sein.
#[test]
fn external_vocabulary_must_be_supplied() {
    let tables = VocabularyTables { local_names: vec!["e".into()], ..Default::default() };
    let vocabulary = ExternalVocabulary::new("urn:vocab", tables);
    let opts = EncoderOptions::default().with_initial_vocabulary(InitialVocabulary::external(vocabulary.clone()));
    let events = vec![FiEvent::StartDocument, start("e"), FiEvent::EndElement, FiEvent::EndDocument];
    let bytes = encode(&events, &opts).unwrap();

    let err = decode(&bytes).unwrap_err();
    assert_eq!(err, Error::UnknownExternalVocabulary("urn:vocab".into()));
    assert_eq!(err.kind(), crate::ErrorKind::UnresolvedReference);

    let opts = DecoderOptions::default().with_external_vocabulary(vocabulary);
    let mut d = Decoder::new(&bytes[..], opts);
    let decoded: Vec<_> = d.by_ref().collect::<Result<_>>().unwrap();
    assert_eq!(decoded, events);
    assert_eq!(d.document().external_vocabulary.as_deref(), Some("urn:vocab"));
}

// ============================================================================
// Schritt 5: Pull-API
// ============================================================================

/// Präfix-Bindung gilt ab dem eigenen StartElement, wird im Kind
/// überschattet und danach wiederhergestellt.
#[test]
fn namespace_scope_applies_at_start_element() {
    let events = vec![
        FiEvent::StartDocument,
        FiEvent::StartElement(Rc::new(QName::with_prefix("urn:outer", "r", "p"))),
        FiEvent::namespace("p", "urn:outer"),
        FiEvent::StartElement(Rc::new(QName::with_prefix("urn:inner", "c", "p"))),
        FiEvent::namespace("p", "urn:inner"),
        FiEvent::EndElement,
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    let bytes = encode(&events, &EncoderOptions::default()).unwrap();
    let mut d = Decoder::new(&bytes[..], DecoderOptions::default());
    let mut seen = Vec::new();
    while let Some(event) = d.next_event().unwrap() {
        seen.push((event.kind_name(), d.depth(), d.resolve_prefix("p").map(str::to_string)));
    }
    let outer = Some("urn:outer".to_string());
    let inner = Some("urn:inner".to_string());
    assert_eq!(
        seen,
        vec![
            ("start document", 0, None),
            ("start element", 1, outer.clone()),
            ("namespace declaration", 1, outer.clone()),
            ("start element", 2, inner.clone()),
            ("namespace declaration", 2, inner),
            ("end element", 1, outer.clone()),
            ("end element", 0, None),
            ("end document", 0, None),
        ]
    );
    assert!(!d.has_next());
}

/// Zwei Dokumente hintereinander in einer Quelle.
#[test]
fn reset_between_concatenated_documents() {
    let first = vec![FiEvent::StartDocument, start("a"), FiEvent::characters("x"), FiEvent::EndElement, FiEvent::EndDocument];
    let second = vec![FiEvent::StartDocument, start("b"), FiEvent::characters("x"), FiEvent::EndElement, FiEvent::EndDocument];
    let mut bytes = encode(&first, &EncoderOptions::default()).unwrap();
    bytes.extend(encode(&second, &EncoderOptions::default()).unwrap());

    let mut d = Decoder::new(&bytes[..], DecoderOptions::default().with_buffer_size(3));
    let decoded: Vec<_> = d.by_ref().collect::<Result<_>>().unwrap();
    assert_eq!(decoded, first);
    d.reset();
    assert!(d.has_next());
    let decoded: Vec<_> = d.by_ref().collect::<Result<_>>().unwrap();
    assert_eq!(decoded, second);
    assert_eq!(d.offset(), bytes.len() as u64);
}

/// Kleiner Lesepuffer liefert dieselben Events.
#[test]
fn small_read_buffer() {
    let events = vec![
        FiEvent::StartDocument,
        start("root"),
        FiEvent::attribute(name("attr"), "a longer attribute value that spans refills"),
        FiEvent::characters("some text content"),
        FiEvent::EndElement,
        FiEvent::EndDocument,
    ];
    let bytes = encode(&events, &EncoderOptions::default()).unwrap();
    let opts = DecoderOptions::default().with_buffer_size(1);
    assert_eq!(decode_with_options(&bytes, &opts).unwrap(), events);
}

#[test]
fn into_inner_returns_source() {
    let bytes = with_header(&[0x3C, 0x00, b'e', 0xFF]);
    let d = Decoder::new(std::io::Cursor::new(bytes.clone()), DecoderOptions::default());
    assert_eq!(d.into_inner().into_inner(), bytes);
}
