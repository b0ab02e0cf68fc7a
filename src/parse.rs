//! HTML parsing into rcdom documents.
//!
//! Documents go through the full html5ever tree builder, so fragments are
//! wrapped in `<html><head></head><body>…</body></html>` exactly as a browser
//! would do it.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::validate::BindError;

/// Parse a document from HTML source, returning the `Document` node.
pub fn parse_html(html: &str) -> Result<Handle, BindError> {
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| BindError::Parse(e.to_string()))?;

    Ok(dom.document)
}

/// Find the `<body>` element of a parsed document.
pub fn body(document: &Handle) -> Option<Handle> {
    find_element(document, "body")
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if &*name.local == tag {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn test_parse_wraps_fragment_in_body() {
        let document = parse_html("<div id=\"app\"><h1>Hi</h1></div>").unwrap();
        assert!(matches!(document.data, NodeData::Document));

        let body = body(&document).unwrap();
        assert_eq!(dom::inner_html(&body), "<div id=\"app\"><h1>Hi</h1></div>");
    }

    #[test]
    fn test_parse_recovers_from_bad_markup() {
        let document = parse_html("<ul><li>one<li>two</ul>").unwrap();
        let body = body(&document).unwrap();
        assert_eq!(dom::inner_html(&body), "<ul><li>one</li><li>two</li></ul>");
    }
}
