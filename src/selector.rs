//! CSS selector subset used by `querySelector`.
//!
//! Supported grammar:
//! - type selectors and `*`
//! - `#id`, `.class`
//! - attribute selectors `[a]`, `[a=v]`, `[a~=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`
//! - `:first-child`, `:last-child`
//! - combinators: descendant (whitespace), `>`, `+`, `~`
//! - selector lists separated by `,`
//!
//! Matching follows DOM semantics: the subject must be a descendant of the
//! query root, but combinators may reach ancestors outside of it.

use lazy_static::lazy_static;
use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::dom;
use crate::validate::BindError;

lazy_static! {
    /// One simple selector at the start of the input.
    static ref SIMPLE_RE: Regex = Regex::new(
        r#"^(?:(\*)|([A-Za-z][\w-]*)|#([\w-]+)|\.([\w-]+)|\[\s*([\w-]+)\s*(?:([~^$*]?=)\s*(?:"([^"]*)"|'([^']*)'|([\w-]+))\s*)?\]|:([\w-]+))"#
    )
    .unwrap();

    static ref COMBINATOR_RE: Regex = Regex::new(r"^\s*([>+~])\s*|^\s+").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTOR AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pseudo {
    FirstChild,
    LastChild,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, AttrOp)>,
    pub pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

/// A complex selector stored right to left: `subject` is the rightmost
/// compound, `ancestors` walks leftwards, each entry reached from the previous
/// one through its combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complex {
    pub subject: Compound,
    pub ancestors: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<Complex>);

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parse(selector: &str) -> Result<SelectorList, BindError> {
    let invalid = |reason: &str| BindError::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    let mut list = Vec::new();
    for part in split_list(selector) {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty selector"));
        }
        list.push(parse_complex(part).map_err(|reason| invalid(&reason))?);
    }
    Ok(SelectorList(list))
}

/// Splits on top-level commas, leaving commas inside quoted attribute values.
fn split_list(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, ',') => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

fn parse_complex(input: &str) -> Result<Complex, String> {
    let mut compounds: Vec<Compound> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut rest = input;

    loop {
        let (compound, remaining) = parse_compound(rest)?;
        compounds.push(compound);
        rest = remaining;
        if rest.is_empty() {
            break;
        }

        let caps = COMBINATOR_RE
            .captures(rest)
            .ok_or_else(|| format!("unexpected input at \"{}\"", rest))?;
        let combinator = match caps.get(1).map(|m| m.as_str()) {
            Some(">") => Combinator::Child,
            Some("+") => Combinator::Adjacent,
            Some("~") => Combinator::Sibling,
            _ => Combinator::Descendant,
        };
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
        if rest.is_empty() {
            return Err("dangling combinator".to_string());
        }
        combinators.push(combinator);
    }

    let subject = compounds.pop().ok_or_else(|| "empty selector".to_string())?;
    let mut ancestors = Vec::new();
    while let Some(compound) = compounds.pop() {
        // combinators[i] sits between compounds[i] and compounds[i + 1]
        let combinator = combinators.pop().unwrap_or(Combinator::Descendant);
        ancestors.push((combinator, compound));
    }

    Ok(Complex { subject, ancestors })
}

fn parse_compound(input: &str) -> Result<(Compound, &str), String> {
    let mut compound = Compound::default();
    let mut rest = input;
    let mut matched_any = false;

    while let Some(caps) = SIMPLE_RE.captures(rest) {
        let whole = caps.get(0).map_or(0, |m| m.end());
        if caps.get(1).is_some() || caps.get(2).is_some() {
            if matched_any {
                return Err(format!("type selector must come first in \"{}\"", input));
            }
            compound.tag = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
        } else if let Some(id) = caps.get(3) {
            compound.ids.push(id.as_str().to_string());
        } else if let Some(class) = caps.get(4) {
            compound.classes.push(class.as_str().to_string());
        } else if let Some(name) = caps.get(5) {
            let value = caps
                .get(7)
                .or_else(|| caps.get(8))
                .or_else(|| caps.get(9))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let op = match caps.get(6).map(|m| m.as_str()) {
                None => AttrOp::Exists,
                Some("=") => AttrOp::Equals(value),
                Some("~=") => AttrOp::Includes(value),
                Some("^=") => AttrOp::Prefix(value),
                Some("$=") => AttrOp::Suffix(value),
                Some(_) => AttrOp::Substring(value),
            };
            compound.attrs.push((name.as_str().to_ascii_lowercase(), op));
        } else if let Some(pseudo) = caps.get(10) {
            let pseudo = match pseudo.as_str().to_ascii_lowercase().as_str() {
                "first-child" => Pseudo::FirstChild,
                "last-child" => Pseudo::LastChild,
                other => return Err(format!("unsupported pseudo-class \":{}\"", other)),
            };
            compound.pseudos.push(pseudo);
        }
        matched_any = true;
        rest = &rest[whole..];
    }

    if !matched_any {
        return Err(format!("unexpected input at \"{}\"", input));
    }
    Ok((compound, rest))
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATCHING
// ═══════════════════════════════════════════════════════════════════════════════

impl SelectorList {
    pub fn matches(&self, node: &Handle) -> bool {
        self.0.iter().any(|complex| complex.matches(node))
    }
}

impl Complex {
    pub fn matches(&self, node: &Handle) -> bool {
        self.subject.matches(node) && match_ancestors(node, &self.ancestors)
    }
}

fn match_ancestors(node: &Handle, rest: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), remaining)) = rest.split_first() else {
        return true;
    };

    match combinator {
        Combinator::Child => dom::parent_of(node)
            .filter(|p| compound.matches(p))
            .is_some_and(|p| match_ancestors(&p, remaining)),
        Combinator::Descendant => {
            let mut current = dom::parent_of(node);
            while let Some(ancestor) = current {
                if compound.matches(&ancestor) && match_ancestors(&ancestor, remaining) {
                    return true;
                }
                current = dom::parent_of(&ancestor);
            }
            false
        }
        Combinator::Adjacent => dom::previous_element_sibling(node)
            .filter(|s| compound.matches(s))
            .is_some_and(|s| match_ancestors(&s, remaining)),
        Combinator::Sibling => {
            let mut current = dom::previous_element_sibling(node);
            while let Some(sibling) = current {
                if compound.matches(&sibling) && match_ancestors(&sibling, remaining) {
                    return true;
                }
                current = dom::previous_element_sibling(&sibling);
            }
            false
        }
    }
}

impl Compound {
    pub fn matches(&self, node: &Handle) -> bool {
        let Some(tag) = dom::tag_name(node) else {
            return false;
        };
        if self.tag.as_ref().is_some_and(|t| *t != tag) {
            return false;
        }

        let id = dom::get_attribute(node, "id");
        if self.ids.iter().any(|want| id.as_deref() != Some(want.as_str())) {
            return false;
        }

        if !self.classes.is_empty() {
            let class = dom::get_attribute(node, "class").unwrap_or_default();
            let have: Vec<&str> = class.split_ascii_whitespace().collect();
            if self.classes.iter().any(|c| !have.contains(&c.as_str())) {
                return false;
            }
        }

        for (name, op) in &self.attrs {
            let Some(value) = dom::get_attribute(node, name) else {
                return false;
            };
            let ok = match op {
                AttrOp::Exists => true,
                AttrOp::Equals(v) => value == *v,
                AttrOp::Includes(v) => value.split_ascii_whitespace().any(|w| w == v),
                AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
                AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
                AttrOp::Substring(v) => !v.is_empty() && value.contains(v.as_str()),
            };
            if !ok {
                return false;
            }
        }

        self.pseudos.iter().all(|pseudo| {
            let siblings = dom::parent_of(node)
                .map(|p| dom::element_children(&p))
                .unwrap_or_default();
            match pseudo {
                Pseudo::FirstChild => siblings.first().is_some_and(|s| dom::same_node(s, node)),
                Pseudo::LastChild => siblings.last().is_some_and(|s| dom::same_node(s, node)),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY
// ═══════════════════════════════════════════════════════════════════════════════

/// First descendant of `root`, in document order, matching `selector`.
pub fn query_selector(root: &Handle, selector: &str) -> Result<Option<Handle>, BindError> {
    let list = parse(selector)?;
    Ok(find_first(root, &list))
}

fn find_first(node: &Handle, list: &SelectorList) -> Option<Handle> {
    let children: Vec<Handle> = node.children.borrow().clone();
    for child in children {
        if list.matches(&child) {
            return Some(child);
        }
        if let Some(found) = find_first(&child, list) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    const HTML: &str = r#"
        <main id="app">
            <ul class="list primary">
                <li data-kind="a">one</li>
                <li data-kind="b" class="current">two</li>
                <li data-kind="c item">three</li>
            </ul>
            <p lang="en-US">tail</p>
        </main>
    "#;

    fn text_of(scope: &Scope, selector: &str) -> Option<String> {
        scope
            .query_selector(selector)
            .unwrap()
            .map(|n| dom::text_content(&n))
    }

    #[test]
    fn test_parse_complex_right_to_left() {
        let list = parse("main > ul li.current").unwrap();
        let complex = &list.0[0];
        assert_eq!(complex.subject.tag.as_deref(), Some("li"));
        assert_eq!(complex.subject.classes, vec!["current".to_string()]);
        assert_eq!(complex.ancestors[0].0, Combinator::Descendant);
        assert_eq!(complex.ancestors[0].1.tag.as_deref(), Some("ul"));
        assert_eq!(complex.ancestors[1].0, Combinator::Child);
        assert_eq!(complex.ancestors[1].1.tag.as_deref(), Some("main"));
    }

    #[test]
    fn test_simple_selectors() {
        let scope = Scope::parse(HTML).unwrap();
        assert_eq!(text_of(&scope, "li").as_deref(), Some("one"));
        assert_eq!(text_of(&scope, ".current").as_deref(), Some("two"));
        assert_eq!(text_of(&scope, "ul.list.primary > li:last-child").as_deref(), Some("three"));
        assert_eq!(text_of(&scope, "#app p").as_deref(), Some("tail"));
        assert_eq!(text_of(&scope, "#nope"), None);
    }

    #[test]
    fn test_attribute_selectors() {
        let scope = Scope::parse(HTML).unwrap();
        assert_eq!(text_of(&scope, r#"[data-kind="b"]"#).as_deref(), Some("two"));
        assert_eq!(text_of(&scope, "[data-kind~=item]").as_deref(), Some("three"));
        assert_eq!(text_of(&scope, "[lang^=en]").as_deref(), Some("tail"));
        assert_eq!(text_of(&scope, "[lang$='US']").as_deref(), Some("tail"));
        assert_eq!(text_of(&scope, "p[lang]").as_deref(), Some("tail"));
    }

    #[test]
    fn test_sibling_combinators_and_lists() {
        let scope = Scope::parse(HTML).unwrap();
        assert_eq!(text_of(&scope, "li + li").as_deref(), Some("two"));
        assert_eq!(text_of(&scope, ".current ~ li").as_deref(), Some("three"));
        assert_eq!(text_of(&scope, "p, .current").as_deref(), Some("two"));
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "li >", "li,,p", "::before", "li:hover", "a[b"] {
            let err = parse(bad).unwrap_err();
            assert!(
                matches!(err, BindError::InvalidSelector { .. }),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_query_excludes_root() {
        let scope = Scope::parse(HTML).unwrap();
        let list = scope.query_selector("ul").unwrap().unwrap();
        let found = query_selector(&list, "ul").unwrap();
        assert!(found.is_none());
    }
}
