//! DOM primitives over `markup5ever_rcdom` nodes.
//!
//! The binding engine only needs a handful of operations from the document:
//! tree navigation, `contains`, deep cloning, text/attribute mutation and
//! sibling-relative insertion. rcdom keeps parents as weak pointers inside a
//! `Cell`, so every read of a parent takes it out and puts it back.

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::{Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;
use tendril::StrTendril;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

// ═══════════════════════════════════════════════════════════════════════════════
// NAVIGATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

pub fn same_node(a: &Handle, b: &Handle) -> bool {
    Rc::ptr_eq(a, b)
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// Lowercase local name of an element, `None` for other node types.
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => {
            let local: &str = &name.local;
            Some(local.to_ascii_lowercase())
        }
        _ => None,
    }
}

/// Inclusive containment, like `Node.contains`.
pub fn contains(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if same_node(&n, ancestor) {
            return true;
        }
        current = parent_of(&n);
    }
    false
}

pub fn child_index(node: &Handle) -> Option<usize> {
    let parent = parent_of(node)?;
    let children = parent.children.borrow();
    children.iter().position(|c| same_node(c, node))
}

pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| is_element(c))
        .cloned()
        .collect()
}

pub fn previous_element_sibling(node: &Handle) -> Option<Handle> {
    let parent = parent_of(node)?;
    let children = parent.children.borrow();
    let index = children.iter().position(|c| same_node(c, node))?;
    children[..index].iter().rev().find(|c| is_element(c)).cloned()
}

pub fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = parent_of(node)?;
    let children = parent.children.borrow();
    let index = children.iter().position(|c| same_node(c, node))?;
    children.get(index + 1).cloned()
}

/// Child-index path leading from `ancestor` down to `node`. Empty when they
/// are the same node; `None` when `node` is not inside `ancestor`.
pub fn path_from(ancestor: &Handle, node: &Handle) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut current = node.clone();
    while !same_node(&current, ancestor) {
        path.push(child_index(&current)?);
        current = parent_of(&current)?;
    }
    path.reverse();
    Some(path)
}

pub fn node_at(root: &Handle, path: &[usize]) -> Option<Handle> {
    let mut current = root.clone();
    for &index in path {
        let next = current.children.borrow().get(index).cloned()?;
        current = next;
    }
    Some(current)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE MUTATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent
            .children
            .borrow_mut()
            .retain(|c| !same_node(c, node));
    }
    node.parent.set(None);
}

pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// Inserts `node` right before `reference`. Returns false when `reference`
/// has no parent.
pub fn insert_before(reference: &Handle, node: &Handle) -> bool {
    if same_node(reference, node) {
        return true;
    }
    detach(node);
    let Some(parent) = parent_of(reference) else {
        return false;
    };
    let mut children = parent.children.borrow_mut();
    let Some(index) = children.iter().position(|c| same_node(c, reference)) else {
        return false;
    };
    node.parent.set(Some(Rc::downgrade(&parent)));
    children.insert(index, node.clone());
    true
}

pub fn replace_with(old: &Handle, new: &Handle) -> bool {
    if !insert_before(old, new) {
        return false;
    }
    detach(old);
    true
}

pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

pub fn create_comment(text: &str) -> Handle {
    Node::new(NodeData::Comment {
        contents: StrTendril::from_slice(text),
    })
}

pub fn create_element(tag: &str) -> Handle {
    Node::new(NodeData::Element {
        name: html_name(tag),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Deep clone, detached from any parent. Equivalent to `cloneNode(true)`.
pub fn clone_node(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            template_contents,
            mathml_annotation_xml_integration_point,
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: RefCell::new(template_contents.borrow().as_ref().map(clone_node)),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => {
            NodeData::ProcessingInstruction {
                target: target.clone(),
                contents: contents.clone(),
            }
        }
    };

    let copy = Node::new(data);
    for child in node.children.borrow().iter() {
        append_child(&copy, &clone_node(child));
    }
    copy
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT & ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// Replaces all children with a single text node (none for empty text).
pub fn set_text_content(node: &Handle, text: &str) {
    if let NodeData::Text { contents } = &node.data {
        *contents.borrow_mut() = StrTendril::from_slice(text);
        return;
    }

    let old: Vec<Handle> = node.children.borrow_mut().drain(..).collect();
    for child in &old {
        child.parent.set(None);
    }
    if !text.is_empty() {
        append_child(node, &create_text(text));
    }
}

pub fn get_attribute(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| attr_is(a, name))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn has_attribute(node: &Handle, name: &str) -> bool {
    get_attribute(node, name).is_some()
}

pub fn set_attribute(node: &Handle, name: &str, value: &str) {
    let NodeData::Element { attrs, .. } = &node.data else {
        return;
    };
    let mut attrs = attrs.borrow_mut();
    match attrs.iter_mut().find(|a| attr_is(a, name)) {
        Some(attr) => attr.value = StrTendril::from_slice(value),
        None => attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from_slice(value),
        }),
    }
}

pub fn remove_attribute(node: &Handle, name: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        attrs
            .borrow_mut()
            .retain(|a| !attr_is(a, name));
    }
}

/// The `type` of an `<input>`, lowercased, defaulting to `text`.
pub fn input_type(node: &Handle) -> Option<String> {
    if tag_name(node).as_deref() != Some("input") {
        return None;
    }
    Some(
        get_attribute(node, "type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string()),
    )
}

fn attr_is(attr: &Attribute, name: &str) -> bool {
    let local: &str = &attr.name.local;
    local.eq_ignore_ascii_case(name)
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(local))
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializes `node` including its own tag. Document nodes serialize their
/// children.
pub fn outer_html(node: &Handle) -> String {
    let scope = match node.data {
        NodeData::Document => TraversalScope::ChildrenOnly(None),
        _ => TraversalScope::IncludeNode,
    };
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };
    let mut bytes = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    if serialize(&mut bytes, &handle, opts).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn inner_html(node: &Handle) -> String {
    node.children.borrow().iter().map(outer_html).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    fn fixture() -> Scope {
        Scope::parse(r#"<div id="app"><p class="a">one</p><p class="b">two<b>!</b></p></div>"#)
            .unwrap()
    }

    #[test]
    fn test_contains_is_inclusive() {
        let scope = fixture();
        let app = scope.query_selector("#app").unwrap().unwrap();
        let bold = scope.query_selector("b").unwrap().unwrap();
        assert!(contains(&app, &bold));
        assert!(contains(&app, &app));
        assert!(!contains(&bold, &app));
    }

    #[test]
    fn test_path_round_trips_inside_clone() {
        let scope = fixture();
        let app = scope.query_selector("#app").unwrap().unwrap();
        let bold = scope.query_selector("b").unwrap().unwrap();
        let path = path_from(&app, &bold).unwrap();
        assert_eq!(path, vec![1, 1]);

        let copy = clone_node(&app);
        assert!(parent_of(&copy).is_none());
        let found = node_at(&copy, &path).unwrap();
        assert_eq!(tag_name(&found).as_deref(), Some("b"));
        assert!(!same_node(&found, &bold));
    }

    #[test]
    fn test_set_text_content_replaces_children() {
        let scope = fixture();
        let second = scope.query_selector(".b").unwrap().unwrap();
        set_text_content(&second, "replaced");
        assert_eq!(outer_html(&second), r#"<p class="b">replaced</p>"#);
        set_text_content(&second, "");
        assert!(second.children.borrow().is_empty());
    }

    #[test]
    fn test_insert_before_and_detach() {
        let scope = fixture();
        let app = scope.query_selector("#app").unwrap().unwrap();
        let first = scope.query_selector(".a").unwrap().unwrap();
        let marker = create_comment("");
        assert!(replace_with(&first, &marker));
        assert!(parent_of(&first).is_none());

        let fresh = create_element("span");
        assert!(insert_before(&marker, &fresh));
        assert_eq!(
            inner_html(&app),
            r#"<span></span><!----><p class="b">two<b>!</b></p>"#
        );
        assert!(same_node(&next_sibling(&fresh).unwrap(), &marker));
    }

    #[test]
    fn test_attributes() {
        let node = create_element("input");
        assert_eq!(input_type(&node).as_deref(), Some("text"));
        set_attribute(&node, "type", "CheckBox");
        assert_eq!(input_type(&node).as_deref(), Some("checkbox"));
        set_attribute(&node, "checked", "");
        assert!(has_attribute(&node, "checked"));
        remove_attribute(&node, "checked");
        assert!(!has_attribute(&node, "checked"));
    }
}
