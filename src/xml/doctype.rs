//! Felder einer Dokumenttyp-Deklaration.
//!
//! Fast Infoset überträgt von einer DOCTYPE nur System- und Public-Identifier
//! sowie die Processing Instructions des internen Subsets. Der Name ergibt
//! sich beim Serialisieren aus dem Wurzelelement.

use std::rc::Rc;

use crate::event::{DtContent, PiContent};

/// Parst den Inhalt zwischen `<!DOCTYPE` und `>`.
pub(super) fn parse_doctype(raw: &str) -> DtContent {
    let trimmed = raw.trim();

    // Name: erstes Token (vor Whitespace oder '[')
    let name_end = trimmed
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(trimmed.len());
    let rest = trimmed[name_end..].trim_start();

    let mut public_id = None;
    let mut system_id = None;

    let rest = if let Some(after) = rest.strip_prefix("SYSTEM") {
        let (sys, remaining) = extract_quoted_string(after.trim_start());
        system_id = sys;
        remaining.trim_start()
    } else if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (pub_id, remaining) = extract_quoted_string(after.trim_start());
        public_id = pub_id;
        let (sys, remaining) = extract_quoted_string(remaining.trim_start());
        system_id = sys;
        remaining.trim_start()
    } else {
        rest
    };

    let mut instructions = Vec::new();
    if let Some(open) = rest.find('[') {
        let after_bracket = &rest[open + 1..];
        if let Some(close) = after_bracket.rfind(']') {
            instructions = subset_instructions(&after_bracket[..close]);
        }
    }

    DtContent { system_id, public_id, instructions }
}

fn extract_quoted_string(s: &str) -> (Option<Rc<str>>, &str) {
    let Some(q) = s.chars().next().filter(|&c| c == '"' || c == '\'') else {
        return (None, s);
    };
    match s[1..].find(q) {
        Some(end) => (Some(Rc::from(&s[1..1 + end])), &s[1 + end + 1..]),
        None => (None, s),
    }
}

/// Sammelt die PIs des internen Subsets. Kommentare und Literale werden
/// übersprungen, damit ein `<?` darin nicht als PI zählt.
fn subset_instructions(subset: &str) -> Vec<PiContent> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < subset.len() {
        let rest = &subset[pos..];
        if let Some(body) = rest.strip_prefix("<!--") {
            pos += 4 + body.find("-->").map_or(body.len(), |end| end + 3);
        } else if let Some(body) = rest.strip_prefix("<?") {
            let Some(end) = body.find("?>") else { break };
            let content = &body[..end];
            let target_end = content.find(char::is_whitespace).unwrap_or(content.len());
            out.push(PiContent {
                target: Rc::from(&content[..target_end]),
                data: Rc::from(content[target_end..].trim_start()),
            });
            pos += 2 + end + 2;
        } else if rest.starts_with('"') || rest.starts_with('\'') {
            let q = &rest[..1];
            pos += 1 + rest[1..].find(q).map_or(rest.len() - 1, |end| end + 1);
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }
    out
}
