//! Caller-supplied definition trees.
//!
//! A definition maps keys of the data object to places in the document.
//! Each entry is a [`BindingValue`]: where the key lives ([`Target`]) and what
//! happens there ([`Action`]).
//!
//! ```ignore
//! let definition = Definition::new()
//!     .bind("title", BindingValue::selector("h1"))
//!     .bind("done", BindingValue::selector("input").with_handler(|node, value| { ... }))
//!     .bind(
//!         "items",
//!         BindingValue::selector("li").nested(Definition::new().bind("name", "span")),
//!     );
//! ```

use markup5ever_rcdom::Handle;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Called with the bound node and the new value, in place of the default
/// write strategy.
pub type UpdateHandler = Rc<dyn Fn(&Handle, &Value)>;

/// Called with a nested instance's node and value after it was synchronized.
pub type RenderFn = Rc<dyn Fn(&Handle, &Value)>;

#[derive(Clone)]
pub enum Target {
    Node(Handle),
    Selector(String),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(_) => f.write_str("Node(..)"),
            Target::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
        }
    }
}

impl From<Handle> for Target {
    fn from(node: Handle) -> Self {
        Target::Node(node)
    }
}

impl From<&Handle> for Target {
    fn from(node: &Handle) -> Self {
        Target::Node(node.clone())
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

#[derive(Clone)]
pub enum Action {
    Leaf {
        handler: Option<UpdateHandler>,
    },
    Nested {
        definition: Definition,
        render: Option<RenderFn>,
        /// Field of each array element that identifies it across updates.
        key: Option<String>,
    },
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Leaf { handler } => f
                .debug_struct("Leaf")
                .field("handler", &handler.is_some())
                .finish(),
            Action::Nested {
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

#[derive(Debug, Clone)]
pub struct BindingValue {
    pub target: Target,
    pub action: Action,
}

impl BindingValue {
    pub fn new(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            action: Action::Leaf { handler: None },
        }
    }

    pub fn selector(selector: impl Into<String>) -> Self {
        Self::new(Target::Selector(selector.into()))
    }

    pub fn node(node: &Handle) -> Self {
        Self::new(Target::Node(node.clone()))
    }

    /// Replace the default write strategy with `handler`. Drops any nested
    /// definition.
    pub fn with_handler(mut self, handler: impl Fn(&Handle, &Value) + 'static) -> Self {
        self.action = Action::Leaf {
            handler: Some(Rc::new(handler)),
        };
        self
    }

    pub fn nested(mut self, definition: Definition) -> Self {
        self.action = Action::Nested {
            definition,
            render: None,
            key: None,
        };
        self
    }

    /// Attach a render function. Only nested bindings carry one; on a leaf it
    /// is ignored.
    pub fn with_render(mut self, render: impl Fn(&Handle, &Value) + 'static) -> Self {
        if let Action::Nested { render: slot, .. } = &mut self.action {
            *slot = Some(Rc::new(render));
        }
        self
    }

    /// Reconcile array elements by the value of `field` instead of by position.
    pub fn keyed_by(mut self, field: impl Into<String>) -> Self {
        if let Action::Nested { key, .. } = &mut self.action {
            *key = Some(field.into());
        }
        self
    }

    pub fn has_definition(&self) -> bool {
        matches!(self.action, Action::Nested { .. })
    }
}

impl From<&str> for BindingValue {
    fn from(selector: &str) -> Self {
        BindingValue::selector(selector)
    }
}

impl From<Handle> for BindingValue {
    fn from(node: Handle) -> Self {
        BindingValue::new(Target::Node(node))
    }
}

/// Ordered mapping from key to binding. Keys are processed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Definition {
    entries: Vec<(String, BindingValue)>,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `key`. A replaced key keeps its original position.
    pub fn bind(mut self, key: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<BindingValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&BindingValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
