//! # Simulacra
//!
//! Binds a plain data object to a region of an html5ever document so that
//! later changes to the data are reflected in the document.
//!
//! ```ignore
//! let scope = Scope::parse(r#"<div id="app"><h1></h1><ul><li></li></ul></div>"#)?;
//! let mut data = Value::from(json!({ "title": "Todos", "items": ["a", "b"] }));
//!
//! let definition = Definition::new().bind("title", "h1").bind("items", "li");
//! let mut bound = bind(&scope, &mut data, "#app", &definition)?;
//!
//! bound.update(&Value::from(json!({ "title": "Done", "items": [] })))?;
//! ```
//!
//! ## Binding Invariants
//!
//! 1. **Bind Once**: a data object is bound at most once. The mark is set by
//!    [`bind`] and never cleared.
//! 2. **Compile Before Mutate**: every selector is resolved and every
//!    structural rule checked before any node is touched. A failed bind leaves
//!    the document exactly as it was.
//! 3. **Shared Compiled Tree**: the compiled tree is immutable and shared by
//!    every copy rendered from it. Per-copy state (markers, rendered instances)
//!    lives in the [`Bound`] handle.
//! 4. **Document Order Follows Data Order**: instances rendered for an array
//!    appear in the order of the array's elements.

mod compile;
mod definition;
pub mod dom;
mod parse;
mod scope;
pub mod selector;
mod sync;
mod validate;
mod value;

#[cfg(test)]
mod compile_tests;

pub use compile::{check_disjoint, compile, CompiledAction, CompiledBinding, CompiledDefinition};
pub use definition::{Action, BindingValue, Definition, RenderFn, Target, UpdateHandler};
pub use parse::{body, parse_html};
pub use scope::{BindOptions, ReplaceAttribute, Scope};
pub use sync::Bound;
pub use validate::*;
pub use value::{Record, Value, RETAIN_ELEMENT};

pub use markup5ever_rcdom::Handle;

/// Bind `data` to the node at `target` using `definition`.
///
/// `target` is a node or a selector resolved against the scope's document.
/// On success the returned handle owns a detached, rendered copy of the
/// target; insert [`Bound::node`] into a document and call
/// [`Bound::update`] with new data to keep it in sync.
pub fn bind(
    scope: &Scope,
    data: &mut Value,
    target: impl Into<Target>,
    definition: &Definition,
) -> Result<Bound, BindError> {
    let record = data.as_record_mut().ok_or(BindError::NotAnObject)?;
    if record.is_bound() {
        return Err(BindError::AlreadyBound);
    }

    let root = match target.into() {
        Target::Node(node) => node,
        Target::Selector(selector) => scope
            .query_selector(&selector)?
            .ok_or(BindError::TopLevelNotFound { selector })?,
    };

    let compiled = compile(scope, &root, definition)?;
    record.mark_bound();

    tracing::debug!(keys = compiled.len(), "bound data object");

    Ok(Bound::render(dom::clone_node(&root), compiled, record))
}
