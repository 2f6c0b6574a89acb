//! XML → Fast Infoset → XML Round-Trip-Tests.
//!
//! Jeder Test encodiert XML-Text, decodiert das Ergebnis zurueck und
//! vergleicht die Baeume mit roxmltree. Zusaetzlich wird auf Event-Ebene
//! geprueft, dass Encoder und Decoder dieselbe Sequenz sehen.

use fastinfoset::decoder::{Decoder, decode};
use fastinfoset::encoder::encode;
use fastinfoset::event::FiEvent;
use fastinfoset::options::{DecoderOptions, EncoderOptions, Ignore};
use fastinfoset::xml::{fi_to_xml, parse_str, xml_reader_to_fi, xml_to_fi};

include!("common/tree.rs");

// ============================================================================
// Hilfsfunktionen
// ============================================================================

fn fi_round_trip(xml: &str, opts: &EncoderOptions) -> String {
    let fi = xml_to_fi(xml, opts).unwrap_or_else(|e| panic!("Encode-Fehler: {e}\nXML: {xml}"));
    fi_to_xml(&fi, &DecoderOptions::default())
        .unwrap_or_else(|e| panic!("Decode-Fehler: {e}\nFI: {} bytes", fi.len()))
}

fn assert_round_trip(xml: &str) {
    let back = fi_round_trip(xml, &EncoderOptions::default());
    assert_same_tree(xml, &back);

    let events = parse_str(xml).unwrap();
    let fi = encode(&events, &EncoderOptions::default()).unwrap();
    assert_eq!(decode(&fi).unwrap(), events, "Events nach Round-Trip verschieden: {xml}");
}

// ============================================================================
// Schritt 1: Dokumentstrukturen
// ============================================================================

#[test]
fn elements_attributes_and_text() {
    assert_round_trip(
        r#"<doc a="1" b="x &amp; y"><p>Hello &lt;world&gt;</p><p>Hello &lt;world&gt;</p><empty/></doc>"#,
    );
}

#[test]
fn mixed_content_and_whitespace() {
    assert_round_trip("<r>\n  <a>one</a>\n  text <b>two</b> tail\n</r>");
}

#[test]
fn comments_pis_and_cdata() {
    assert_round_trip("<r><!-- note --><?proc data here?><![CDATA[<raw> & stuff]]>tail<?empty?></r>");
}

#[test]
fn prolog_and_epilog_items() {
    assert_round_trip("<!--vorher--><?style href='a.css'?><r/><!--nachher-->");
}

#[test]
fn unicode_text_and_names() {
    assert_round_trip("<straße größe=\"süß\">Grüße 日本語 😀</straße>");
}

#[test]
fn namespaces_prefixes_and_defaults() {
    assert_round_trip(
        r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:c p:a="1" b="2"><d xmlns="">t</d><e/></p:c><p:c xml:lang="de"/></r>"#,
    );
}

#[test]
fn prefix_rebound_in_child() {
    assert_round_trip(r#"<p:a xmlns:p="urn:1"><p:b xmlns:p="urn:2"><p:c/></p:b><p:d/></p:a>"#);
}

/// Zeichenreferenzen fuer Whitespace bleiben ueber FI → XML → FI erhalten.
#[test]
fn whitespace_references_survive_round_trip() {
    let xml = r#"<a v="x&#10;y&#9;z">p&#13;q</a>"#;
    assert_round_trip(xml);
    let back = fi_round_trip(xml, &EncoderOptions::default());
    assert_eq!(back, xml);

    let events = parse_str(&back).unwrap();
    assert!(events.contains(&FiEvent::attribute(fastinfoset::qname::QName::new("", "v"), "x\ny\tz")));
    let text: String = events
        .iter()
        .filter_map(|e| match e {
            FiEvent::Characters(ch) => Some(ch.value.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "p\rq");
}

#[test]
fn long_values_cross_length_tiers() {
    // 2nd/5th/7th-Bit-Laengen: klein, mittel, gross.
    for len in [1, 2, 3, 8, 9, 64, 65, 258, 259, 264, 265, 320, 321, 5000] {
        let text = "x".repeat(len);
        let name = format!("n{}", "a".repeat(len.min(400)));
        let xml = format!(r#"<{name} v="{text}">{text}</{name}>"#);
        assert_round_trip(&xml);
    }
}

// ============================================================================
// Schritt 2: Vokabular und Tabellen-Tiers
// ============================================================================

/// Viele verschiedene Namen und Werte: Indizes erreichen alle Integer-Tiers.
#[test]
fn many_distinct_names_use_all_index_tiers() {
    let mut xml = String::from("<r>");
    for round in 0..2 {
        for i in 0..3000 {
            xml.push_str(&format!(r#"<e{i} a{i}="v{i}">t{i}</e{i}>"#));
        }
        if round == 0 {
            xml.push_str("<sep/>");
        }
    }
    xml.push_str("</r>");
    assert_round_trip(&xml);
}

/// Wiederholte Namen und Inhalte kosten nur noch Indizes.
#[test]
fn repeated_structure_is_indexed() {
    let doc = |n: usize| {
        let mut xml = String::from("<r>");
        for _ in 0..n {
            xml.push_str("<item>v</item>");
        }
        xml.push_str("</r>");
        xml_to_fi(&xml, &EncoderOptions::default()).unwrap()
    };
    // Elementindex + Chunk-Index + Terminator
    assert_eq!(doc(20).len() - doc(10).len(), 30);
}

#[test]
fn deep_nesting() {
    let depth = 500;
    let mut xml = String::new();
    for i in 0..depth {
        xml.push_str(&format!("<l{}>", i % 7));
    }
    xml.push('x');
    for i in (0..depth).rev() {
        xml.push_str(&format!("</l{}>", i % 7));
    }
    assert_round_trip(&xml);
}

// ============================================================================
// Schritt 3: Optionen
// ============================================================================

fn kinds(events: &[FiEvent]) -> Vec<&'static str> {
    events.iter().map(FiEvent::kind_name).collect()
}

#[test]
fn ignore_toggles_drop_items() {
    let xml = "<r><!--c--><?pi x?>\n  <a> </a>text</r>";
    let all = decode(&xml_to_fi(xml, &EncoderOptions::default()).unwrap()).unwrap();
    assert!(all.iter().any(|e| matches!(e, FiEvent::Comment(_))));
    assert!(all.iter().any(|e| matches!(e, FiEvent::ProcessingInstruction(_))));

    let opts = EncoderOptions::default().with_ignore(Ignore {
        comments: true,
        processing_instructions: true,
        whitespace_text: true,
    });
    let events = decode(&xml_to_fi(xml, &opts).unwrap()).unwrap();
    assert_eq!(
        events,
        vec![
            FiEvent::StartDocument,
            FiEvent::start("r"),
            FiEvent::start("a"),
            FiEvent::EndElement,
            FiEvent::characters("text"),
            FiEvent::EndElement,
            FiEvent::EndDocument,
        ],
        "erhalten: {:?}",
        kinds(&events)
    );
}

#[test]
fn characters_as_cdata_keeps_text() {
    let xml = "<r><a>x &lt; y</a><a>]]&gt;</a></r>";
    let opts = EncoderOptions::default().with_characters_as_cdata();
    let back = fi_round_trip(xml, &opts);
    assert!(back.contains("<![CDATA[x < y]]>"), "{back}");
    assert_same_tree(xml, &back);
}

#[test]
fn header_properties_become_xml_declaration() {
    let opts = EncoderOptions::default().with_xml_declaration().with_standalone(true);
    let fi = xml_to_fi("<r/>", &opts).unwrap();
    assert!(fi.starts_with(b"<?xml version='1.0' encoding='finf'?>"));
    let xml = fi_to_xml(&fi, &DecoderOptions::default()).unwrap();
    assert_eq!(xml, r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><r/>"#);
}

// ============================================================================
// Schritt 4: Namespace-Scoping im Decoder
// ============================================================================

#[test]
fn decoder_scopes_follow_elements() {
    let xml = r#"<p:a xmlns:p="urn:1"><p:b xmlns:p="urn:2"><p:c/></p:b><p:d/></p:a>"#;
    let fi = xml_to_fi(xml, &EncoderOptions::default()).unwrap();
    let mut decoder = Decoder::new(&fi[..], DecoderOptions::default());
    let mut seen = Vec::new();
    while let Some(event) = decoder.next_event().unwrap() {
        if let FiEvent::StartElement(name) = &event {
            seen.push((
                name.local_name.to_string(),
                name.uri.to_string(),
                decoder.depth(),
                decoder.resolve_prefix("p").map(str::to_string),
            ));
        }
    }
    let expected = [
        ("a", "urn:1", 1, "urn:1"),
        ("b", "urn:2", 2, "urn:2"),
        ("c", "urn:2", 3, "urn:2"),
        ("d", "urn:1", 2, "urn:1"),
    ];
    assert_eq!(seen.len(), expected.len());
    for (got, want) in seen.iter().zip(expected) {
        assert_eq!(got.0, want.0);
        assert_eq!(got.1, want.1, "URI von {}", want.0);
        assert_eq!(got.2, want.2, "Tiefe von {}", want.0);
        assert_eq!(got.3.as_deref(), Some(want.3), "Bindung von p bei {}", want.0);
    }
    assert_eq!(decoder.depth(), 0);
    assert!(decoder.resolve_prefix("p").is_none());
}

/// Ein Kind, das sein eigenes Praefix neu bindet, sieht beim StartElement
/// bereits die innere URI.
#[test]
fn shadowed_prefix_resolves_at_child_start() {
    let xml = r#"<p:a xmlns:p="urn:a"><p:c xmlns:p="urn:b"/></p:a>"#;
    let fi = xml_to_fi(xml, &EncoderOptions::default()).unwrap();
    let mut decoder = Decoder::new(&fi[..], DecoderOptions::default());
    let mut starts = Vec::new();
    while let Some(event) = decoder.next_event().unwrap() {
        if let FiEvent::StartElement(name) = &event {
            let bound = decoder.resolve_prefix("p").map(str::to_string);
            assert_eq!(bound.as_deref(), Some(&*name.uri), "Bindung bei {}", name.local_name);
            starts.push((bound, decoder.depth()));
        }
    }
    assert_eq!(
        starts,
        vec![(Some("urn:a".to_string()), 1), (Some("urn:b".to_string()), 2)]
    );
}

// ============================================================================
// Schritt 5: Streaming
// ============================================================================

#[test]
fn streaming_encode_matches_batch_for_large_documents() {
    let mut xml = String::from("<log>");
    for i in 0..5000 {
        xml.push_str(&format!(r#"<entry id="{i}" level="info">message number {i}</entry>"#));
    }
    xml.push_str("</log>");

    let batch = xml_to_fi(&xml, &EncoderOptions::default()).unwrap();
    let mut streamed = Vec::new();
    xml_reader_to_fi(xml.as_bytes(), &EncoderOptions::default(), &mut streamed).unwrap();
    assert!(batch.len() > 64 * 1024, "Dokument soll den Flush-Schwellwert ueberschreiten");
    assert_eq!(batch, streamed);
    assert_same_tree(&xml, &fi_to_xml(&streamed, &DecoderOptions::default()).unwrap());
}

#[test]
fn malformed_xml_is_rejected() {
    for xml in ["<a>", "<a></b>", "<p:a/>", "text", "<a/><b/>"] {
        assert!(xml_to_fi(xml, &EncoderOptions::default()).is_err(), "akzeptiert: {xml}");
    }
}
