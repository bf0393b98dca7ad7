//! Verbatim serialization of XML fragments.
//!
//! Harvested metadata is stored as the provider sent it. The fragment is cut
//! straight out of the response text, so nothing is reformatted, but any
//! namespace declarations it inherits from the OAI-PMH envelope are copied
//! onto its root element so the fragment stands on its own as a document.

use roxmltree::Node;

/// Serialize an element and its subtree as standalone XML.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use oaiharvest_harvester::xml::serialize_element;
///
/// let xml = r#"<metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>T</dc:title></metadata>"#;
/// let doc = Document::parse(xml).unwrap();
/// let title = doc.root_element().first_element_child().unwrap();
///
/// assert_eq!(
///     serialize_element(title),
///     r#"<dc:title xmlns:dc="http://purl.org/dc/elements/1.1/">T</dc:title>"#
/// );
/// ```
pub fn serialize_element(node: Node<'_, '_>) -> String {
    let raw = &node.document().input_text()[node.range()];
    let declarations = inherited_declarations(node, raw);
    if declarations.is_empty() {
        return raw.to_string();
    }

    // Insert right after the element name: `<prefix:name` + declarations + rest
    let name_end = raw
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace() || *c == '/' || *c == '>')
        .map_or(raw.len(), |(i, _)| i);

    let mut out = String::with_capacity(raw.len() + declarations.len());
    out.push_str(&raw[..name_end]);
    out.push_str(&declarations);
    out.push_str(&raw[name_end..]);
    out
}

/// Serialize every element child of `node`, one per line.
///
/// This is the body of an OAI-PMH `<metadata>` or `<about>` container.
pub fn serialize_children(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_element())
        .map(serialize_element)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Namespace declarations in scope from ancestors but not written on the
/// element's own start tag.
fn inherited_declarations(node: Node<'_, '_>, raw: &str) -> String {
    let Some(parent) = node.parent_element() else {
        return String::new();
    };
    let own = start_tag_attribute_names(raw);

    let mut declarations = String::new();
    for ns in node.namespaces() {
        let attr = match ns.name() {
            Some("xml") => continue,
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        let inherited = parent
            .namespaces()
            .any(|p| p.name() == ns.name() && p.uri() == ns.uri());
        if inherited && !own.contains(&attr.as_str()) {
            declarations.push_str(&format!(" {attr}=\"{}\"", escape_attribute(ns.uri())));
        }
    }
    declarations
}

/// Names of the attributes, namespace declarations included, on the start tag
/// that `raw` begins with.
fn start_tag_attribute_names(raw: &str) -> Vec<&str> {
    let bytes = raw.as_bytes();
    let skip_space = |mut i: usize| {
        while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }
        i
    };
    let ends_name = |b: u8| b.is_ascii_whitespace() || matches!(b, b'=' | b'/' | b'>');

    // Past `<` and the element name
    let mut i = 1;
    while bytes.get(i).is_some_and(|&b| !ends_name(b)) {
        i += 1;
    }

    let mut names = Vec::new();
    loop {
        i = skip_space(i);
        let start = i;
        while bytes.get(i).is_some_and(|&b| !ends_name(b)) {
            i += 1;
        }
        if i == start {
            break;
        }
        names.push(&raw[start..i]);

        i = skip_space(i);
        if bytes.get(i) != Some(&b'=') {
            break;
        }
        i = skip_space(i + 1);
        let Some(&quote) = bytes.get(i).filter(|&&b| b == b'"' || b == b'\'') else {
            break;
        };
        i += 1;
        while bytes.get(i).is_some_and(|&b| b != quote) {
            i += 1;
        }
        i += 1;
    }
    names
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
