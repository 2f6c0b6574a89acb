// Gemeinsame Baumvergleiche fuer XML-Round-Trip-Tests.
//
// Wird per `include!` eingebunden. Benoetigt `roxmltree` als dev-dependency.

/// Serialisiert ein XML-Dokument zu kanonischem Text fuer den Vergleich.
///
/// Normalisierungen:
/// - Namen als `{uri}local` (Prefixe sind nicht Teil des Infosets)
/// - Attribute lexikographisch sortiert
/// - Text und CDATA zusammengefasst (macht roxmltree bereits)
/// - Whitespace ausserhalb des Wurzelelements entfernt
fn canonical_tree(xml: &str) -> String {
    let doc = roxmltree::Document::parse(xml)
        .unwrap_or_else(|e| panic!("XML nicht wohlgeformt: {e}\n{xml}"));
    let mut out = String::new();
    write_canonical(doc.root(), &mut out);
    out
}

fn write_canonical(node: roxmltree::Node<'_, '_>, out: &mut String) {
    use roxmltree::NodeType;
    match node.node_type() {
        NodeType::Root => {
            for child in node.children().filter(|c| !c.is_text()) {
                write_canonical(child, out);
            }
        }
        NodeType::Element => {
            let tag = node.tag_name();
            out.push_str(&format!("<{{{}}}{}", tag.namespace().unwrap_or(""), tag.name()));
            let mut attrs: Vec<String> = node
                .attributes()
                .map(|a| format!(" {{{}}}{}={:?}", a.namespace().unwrap_or(""), a.name(), a.value()))
                .collect();
            attrs.sort();
            for a in attrs {
                out.push_str(&a);
            }
            out.push('>');
            for child in node.children() {
                write_canonical(child, out);
            }
            out.push_str("</>");
        }
        NodeType::Text => out.push_str(&format!("T{:?}", node.text().unwrap_or(""))),
        NodeType::Comment => out.push_str(&format!("C{:?}", node.text().unwrap_or(""))),
        NodeType::PI => {
            if let Some(pi) = node.pi() {
                out.push_str(&format!("P{}{:?}", pi.target, pi.value.unwrap_or("")));
            }
        }
    }
}

/// Vergleicht zwei XML-Dokumente auf Infoset-Ebene.
fn assert_same_tree(expected: &str, actual: &str) {
    assert_eq!(
        canonical_tree(expected),
        canonical_tree(actual),
        "Baeume unterscheiden sich\nerwartet: {expected}\nerhalten: {actual}"
    );
}
