//! Binding compiler.
//!
//! Turns a [`Definition`] into a [`CompiledDefinition`]: every selector
//! resolved to a node, every key classified, every structural rule checked.
//!
//! ## Invariants
//!
//! 1. **Singular elements**: each key resolves to exactly one element.
//! 2. **Containment**: a key's element is contained in the element of its
//!    enclosing binding, or is that element itself (bound to parent).
//! 3. **Disjointness**: sibling keys never share or nest elements. Keys bound
//!    to the parent claim no region, but their nested keys count as siblings
//!    of the enclosing level.
//! 4. **Purity**: compiling never touches the document or the definition, so
//!    a failure leaves everything as it was.
//!
//! Compilation runs in two phases per level. Phase 1 resolves each key (and
//! recursively compiles nested definitions). Phase 2 is a pure check over the
//! resolved list that returns the first sibling overlap.

use markup5ever_rcdom::Handle;
use std::fmt;
use std::rc::Rc;

use crate::definition::{Action, BindingValue, Definition, RenderFn, Target, UpdateHandler};
use crate::dom;
use crate::scope::{ReplaceAttribute, Scope};
use crate::selector;
use crate::validate::BindError;

#[derive(Clone)]
pub enum CompiledAction {
    Leaf {
        /// `None` for keys bound to their parent: those only run a handler.
        replace: Option<ReplaceAttribute>,
        handler: Option<UpdateHandler>,
    },
    Nested {
        definition: CompiledDefinition,
        render: Option<RenderFn>,
        key: Option<String>,
    },
}

impl fmt::Debug for CompiledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledAction::Leaf { replace, handler } => f
                .debug_struct("Leaf")
                .field("replace", replace)
                .field("handler", &handler.is_some())
                .finish(),
            CompiledAction::Nested {
                definition,
                render,
                key,
            } => f
                .debug_struct("Nested")
                .field("definition", definition)
                .field("render", &render.is_some())
                .field("key", key)
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct CompiledBinding {
    pub key: String,
    /// The resolved node in the source document.
    pub node: Handle,
    /// Pristine deep copy of `node`, stamped out once per rendered value.
    /// `None` when bound to the parent.
    pub template: Option<Handle>,
    /// Child indices from the enclosing binding's node down to `node`.
    pub path: Vec<usize>,
    pub bound_to_parent: bool,
    pub action: CompiledAction,
}

impl CompiledBinding {
    pub fn has_definition(&self) -> bool {
        matches!(self.action, CompiledAction::Nested { .. })
    }

    pub fn is_bound_to_parent(&self) -> bool {
        self.bound_to_parent
    }

    pub fn replace_attribute(&self) -> Option<ReplaceAttribute> {
        match &self.action {
            CompiledAction::Leaf { replace, .. } => *replace,
            CompiledAction::Nested { .. } => None,
        }
    }

    pub fn nested(&self) -> Option<&CompiledDefinition> {
        match &self.action {
            CompiledAction::Nested { definition, .. } => Some(definition),
            CompiledAction::Leaf { .. } => None,
        }
    }
}

impl fmt::Debug for CompiledBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledBinding")
            .field("key", &self.key)
            .field("tag", &dom::tag_name(&self.node))
            .field("path", &self.path)
            .field("bound_to_parent", &self.bound_to_parent)
            .field("action", &self.action)
            .finish()
    }
}

/// The canonical binding tree. Immutable once built and shared by every
/// instance rendered from it.
#[derive(Debug, Clone)]
pub struct CompiledDefinition {
    bindings: Rc<[CompiledBinding]>,
}

impl CompiledDefinition {
    pub fn bindings(&self) -> &[CompiledBinding] {
        &self.bindings
    }

    pub fn get(&self, key: &str) -> Option<&CompiledBinding> {
        self.bindings.iter().find(|b| b.key == key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PHASE 1: RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile `definition` against `parent`.
pub fn compile(
    scope: &Scope,
    parent: &Handle,
    definition: &Definition,
) -> Result<CompiledDefinition, BindError> {
    let bindings = definition
        .iter()
        .map(|(key, value)| resolve_binding(scope, parent, key, value))
        .collect::<Result<Vec<_>, _>>()?;

    check_disjoint(&bindings)?;

    tracing::debug!(
        keys = bindings.len(),
        parent = ?dom::tag_name(parent),
        "compiled definition"
    );

    Ok(CompiledDefinition {
        bindings: bindings.into(),
    })
}

fn resolve_binding(
    scope: &Scope,
    parent: &Handle,
    key: &str,
    value: &BindingValue,
) -> Result<CompiledBinding, BindError> {
    let node = resolve_target(parent, key, &value.target)?;
    let bound_to_parent = dom::same_node(&node, parent);

    let path = if bound_to_parent {
        Vec::new()
    } else {
        dom::path_from(parent, &node).ok_or_else(|| BindError::NotContained {
            key: key.to_string(),
        })?
    };

    let action = match &value.action {
        Action::Nested {
            definition,
            render,
            key: field,
        } => CompiledAction::Nested {
            definition: compile(scope, &node, definition)?,
            render: render.clone(),
            key: field.clone(),
        },
        Action::Leaf { handler } => {
            if bound_to_parent && handler.is_none() {
                tracing::warn!(
                    key,
                    "A change function was not defined on the key \"{}\".",
                    key
                );
            }
            CompiledAction::Leaf {
                replace: (!bound_to_parent).then(|| scope.options().replace_attribute_for(&node)),
                handler: handler.clone(),
            }
        }
    };

    Ok(CompiledBinding {
        key: key.to_string(),
        template: (!bound_to_parent).then(|| dom::clone_node(&node)),
        node,
        path,
        bound_to_parent,
        action,
    })
}

/// Selectors are queried from the parent's parent so a key may address the
/// container itself.
fn resolve_target(parent: &Handle, key: &str, target: &Target) -> Result<Handle, BindError> {
    match target {
        Target::Selector(query) => {
            let ancestor = dom::parent_of(parent).unwrap_or_else(|| parent.clone());
            selector::query_selector(&ancestor, query)?.ok_or_else(|| {
                BindError::ElementNotFound {
                    key: key.to_string(),
                    selector: query.clone(),
                }
            })
        }
        Target::Node(node) if dom::is_element(node) => Ok(node.clone()),
        Target::Node(_) => Err(BindError::NotAnElement {
            key: key.to_string(),
        }),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PHASE 2: DISJOINTNESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Returns the first key whose node shares or sits inside the node of another
/// sibling key.
///
/// A key bound to the parent with a nested definition claims no region of its
/// own, but its nested keys claim regions in the same container, so they are
/// checked alongside the keys at this level.
pub fn check_disjoint(bindings: &[CompiledBinding]) -> Result<(), BindError> {
    let mut regions = Vec::new();
    collect_regions(bindings, &mut regions);

    for (i, binding) in regions.iter().enumerate() {
        for (j, other) in regions.iter().enumerate() {
            if i == j {
                continue;
            }
            if dom::same_node(&other.node, &binding.node) {
                return Err(BindError::SharedElement {
                    key: binding.key.clone(),
                    adjacent: other.key.clone(),
                });
            }
            if dom::contains(&other.node, &binding.node) {
                return Err(BindError::Overlap {
                    key: binding.key.clone(),
                    adjacent: other.key.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Bindings that own a region in the container, looking through keys bound
/// to the parent.
fn collect_regions<'a>(bindings: &'a [CompiledBinding], regions: &mut Vec<&'a CompiledBinding>) {
    for binding in bindings {
        match &binding.action {
            CompiledAction::Nested { definition, .. } if binding.bound_to_parent => {
                collect_regions(definition.bindings(), regions)
            }
            CompiledAction::Leaf { .. } if binding.bound_to_parent => {}
            _ => regions.push(binding),
        }
    }
}
