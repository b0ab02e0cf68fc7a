//! Synchronizer.
//!
//! Walks a [`CompiledDefinition`] against data and mutates a rendered copy of
//! the bound subtree to match.
//!
//! Mounting a definition over a node replaces every bound descendant with an
//! empty comment marker. Rendered copies of that descendant (one per value)
//! live contiguously right before the marker, in data order. Keys bound to
//! the parent act on the mounted node itself and own no marker.
//!
//! Arrays are reconciled by position, or by a key field when the nested
//! binding declares one and every element carries it. [`Value::Retain`] at a
//! position keeps whatever node is there untouched.

use markup5ever_rcdom::Handle;
use std::collections::HashMap;
use std::fmt;

use crate::compile::{CompiledAction, CompiledBinding, CompiledDefinition};
use crate::definition::UpdateHandler;
use crate::dom;
use crate::scope::ReplaceAttribute;
use crate::validate::BindError;
use crate::value::{Record, Value};

static NULL: Value = Value::Null;

// ═══════════════════════════════════════════════════════════════════════════════
// BOUND HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

/// A rendered copy of a bound root, kept in sync through [`Bound::update`].
///
/// The node returned by [`Bound::node`] may be inserted anywhere in a
/// document; updates keep mutating the same nodes.
pub struct Bound {
    node: Handle,
    /// Pristine copy of the root as it was compiled.
    template: Handle,
    definition: CompiledDefinition,
    instance: Instance,
}

impl Bound {
    pub(crate) fn render(template: Handle, definition: CompiledDefinition, data: &Record) -> Self {
        let node = dom::clone_node(&template);
        let mut instance = Instance::mount(&node, &definition);
        instance.sync(&definition, data);
        Self {
            node,
            template,
            definition,
            instance,
        }
    }

    pub fn node(&self) -> &Handle {
        &self.node
    }

    pub fn definition(&self) -> &CompiledDefinition {
        &self.definition
    }

    /// Re-synchronize with `data`, mutating only what changed.
    pub fn update(&mut self, data: &Value) -> Result<(), BindError> {
        let record = data.as_record().ok_or(BindError::NotAnObject)?;
        self.instance.sync(&self.definition, record);
        Ok(())
    }

    /// Render another independent copy from the same compiled tree.
    pub fn instantiate(&self, data: &Value) -> Result<Bound, BindError> {
        let record = data.as_record().ok_or(BindError::NotAnObject)?;
        Ok(Bound::render(
            self.template.clone(),
            self.definition.clone(),
            record,
        ))
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("node", &dom::tag_name(&self.node))
            .field("definition", &self.definition)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCES
// ═══════════════════════════════════════════════════════════════════════════════

/// One mounted definition: the node it is mounted on plus per-key state,
/// parallel to the definition's bindings.
struct Instance {
    node: Handle,
    slots: Vec<Slot>,
}

enum Slot {
    /// Leaf bound to the mounted node itself.
    Container { last: Option<Value> },
    /// Nested definition bound to the mounted node itself.
    ContainerNested(Instance),
    Region(Region),
    /// The path did not lead to a node in this copy.
    Unresolved,
}

impl Instance {
    fn mount(node: &Handle, definition: &CompiledDefinition) -> Instance {
        // Resolve everything before the first marker goes in.
        let targets: Vec<Option<Handle>> = definition
            .bindings()
            .iter()
            .map(|b| dom::node_at(node, &b.path))
            .collect();

        let slots = definition
            .bindings()
            .iter()
            .zip(targets)
            .map(|(binding, target)| match (target, &binding.action) {
                (None, _) => {
                    tracing::warn!(key = %binding.key, "bound node is missing from the rendered copy");
                    Slot::Unresolved
                }
                (Some(_), CompiledAction::Nested { definition, .. }) if binding.bound_to_parent => {
                    Slot::ContainerNested(Instance::mount(node, definition))
                }
                (Some(_), CompiledAction::Leaf { .. }) if binding.bound_to_parent => {
                    Slot::Container { last: None }
                }
                (Some(target), _) => {
                    let marker = dom::create_comment("");
                    if dom::replace_with(&target, &marker) {
                        Slot::Region(Region {
                            marker,
                            items: Vec::new(),
                        })
                    } else {
                        Slot::Unresolved
                    }
                }
            })
            .collect();

        Instance {
            node: node.clone(),
            slots,
        }
    }

    fn sync(&mut self, definition: &CompiledDefinition, data: &Record) {
        for (binding, slot) in definition.bindings().iter().zip(self.slots.iter_mut()) {
            let value = data.get(&binding.key).unwrap_or(&NULL);

            match slot {
                Slot::Unresolved => {}
                Slot::Container { last } => {
                    if value.is_retain() || last.as_ref() == Some(value) {
                        continue;
                    }
                    if let CompiledAction::Leaf {
                        handler: Some(handler),
                        ..
                    } = &binding.action
                    {
                        handler(&self.node, value);
                    }
                    *last = Some(value.clone());
                }
                Slot::ContainerNested(inner) => {
                    if value.is_retain() {
                        continue;
                    }
                    if let CompiledAction::Nested {
                        definition, render, ..
                    } = &binding.action
                    {
                        let empty = Record::new();
                        inner.sync(definition, nested_record(&binding.key, value, &empty));
                        if let Some(render) = render {
                            render(&inner.node, value);
                        }
                    }
                }
                Slot::Region(region) => region.reconcile(binding, value),
            }
        }
    }
}

/// The record a nested definition reads from. Anything but an object reads
/// as empty.
fn nested_record<'a>(key: &str, value: &'a Value, empty: &'a Record) -> &'a Record {
    match value {
        Value::Object(record) => record,
        Value::Null => empty,
        other => {
            tracing::warn!(key, value = %other, "nested binding received a non-object value");
            empty
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGIONS
// ═══════════════════════════════════════════════════════════════════════════════

struct Region {
    marker: Handle,
    items: Vec<Item>,
}

struct Item {
    node: Handle,
    /// Last value written into `node`.
    value: Value,
    key: Option<String>,
    nested: Option<Instance>,
}

impl Region {
    fn reconcile(&mut self, binding: &CompiledBinding, value: &Value) {
        let values: Vec<&Value> = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
            other => vec![other],
        };

        match &binding.action {
            CompiledAction::Nested {
                key: Some(field), ..
            } if values
                .iter()
                .all(|v| v.is_retain() || v.get(field).is_some()) =>
            {
                self.reconcile_keyed(binding, field, &values)
            }
            _ => self.reconcile_positional(binding, &values),
        }

        tracing::trace!(key = %binding.key, rendered = self.items.len(), "reconciled region");
    }

    fn reconcile_positional(&mut self, binding: &CompiledBinding, values: &[&Value]) {
        let mut old = std::mem::take(&mut self.items).into_iter();
        let mut items = Vec::with_capacity(values.len());

        for &value in values {
            match old.next() {
                Some(item) if value.is_retain() => items.push(item),
                Some(mut item) => {
                    item.update(binding, value);
                    items.push(item);
                }
                None if value.is_retain() => {}
                None => {
                    if let Some(item) = Item::create(binding, value) {
                        dom::insert_before(&self.marker, &item.node);
                        items.push(item);
                    }
                }
            }
        }

        for item in old {
            dom::detach(&item.node);
        }
        self.items = items;
    }

    fn reconcile_keyed(&mut self, binding: &CompiledBinding, field: &str, values: &[&Value]) {
        let mut old: Vec<Option<Item>> = std::mem::take(&mut self.items)
            .into_iter()
            .map(Some)
            .collect();

        let mut by_key: HashMap<String, usize> = HashMap::new();
        for (i, item) in old.iter().enumerate() {
            if let Some(key) = item.as_ref().and_then(|it| it.key.clone()) {
                by_key.entry(key).or_insert(i);
            }
        }

        let mut slots: Vec<Option<Item>> = Vec::with_capacity(values.len());
        let mut retained = Vec::new();
        for (position, &value) in values.iter().enumerate() {
            if value.is_retain() {
                retained.push(position);
                slots.push(None);
                continue;
            }

            let key = value.get(field).map(Value::to_string);
            let claimed = key
                .and_then(|k| by_key.remove(&k))
                .and_then(|i| old[i].take());
            match claimed {
                Some(mut item) => {
                    item.update(binding, value);
                    slots.push(Some(item));
                }
                None => slots.push(Item::create(binding, value)),
            }
        }

        // A retained position keeps the old item there unless a key claimed it,
        // in which case the position renders nothing.
        for position in retained {
            if let Some(item) = old.get_mut(position).and_then(Option::take) {
                slots[position] = Some(item);
            }
        }

        for item in old.into_iter().flatten() {
            dom::detach(&item.node);
        }

        let items: Vec<Item> = slots.into_iter().flatten().collect();

        // Walk backwards from the marker, moving only nodes that are out of place.
        let mut next = self.marker.clone();
        for item in items.iter().rev() {
            let in_place =
                dom::next_sibling(&item.node).is_some_and(|n| dom::same_node(&n, &next));
            if !in_place {
                dom::insert_before(&next, &item.node);
            }
            next = item.node.clone();
        }

        self.items = items;
    }
}

impl Item {
    fn create(binding: &CompiledBinding, value: &Value) -> Option<Item> {
        let template = binding.template.as_ref()?;
        let node = dom::clone_node(template);
        let nested = binding.nested().map(|def| Instance::mount(&node, def));
        let mut item = Item {
            node,
            value: Value::Null,
            key: None,
            nested,
        };
        item.apply(binding, value);
        Some(item)
    }

    fn update(&mut self, binding: &CompiledBinding, value: &Value) {
        if self.value == *value {
            return;
        }
        self.apply(binding, value);
    }

    fn apply(&mut self, binding: &CompiledBinding, value: &Value) {
        match &binding.action {
            CompiledAction::Leaf { replace, handler } => {
                write_leaf(&self.node, *replace, handler.as_ref(), value)
            }
            CompiledAction::Nested {
                definition,
                render,
                key,
            } => {
                if let Some(instance) = &mut self.nested {
                    let empty = Record::new();
                    instance.sync(definition, nested_record(&binding.key, value, &empty));
                }
                if let Some(render) = render {
                    render(&self.node, value);
                }
                self.key = key
                    .as_ref()
                    .and_then(|field| value.get(field))
                    .map(Value::to_string);
            }
        }
        self.value = value.clone();
    }
}

fn write_leaf(
    node: &Handle,
    replace: Option<ReplaceAttribute>,
    handler: Option<&UpdateHandler>,
    value: &Value,
) {
    if let Some(handler) = handler {
        handler(node, value);
        return;
    }

    match replace {
        Some(ReplaceAttribute::TextContent) => dom::set_text_content(node, &value.to_string()),
        Some(ReplaceAttribute::Value) => {
            if dom::tag_name(node).as_deref() == Some("textarea") {
                dom::set_text_content(node, &value.to_string());
            } else {
                dom::set_attribute(node, "value", &value.to_string());
            }
        }
        Some(ReplaceAttribute::Checked) => {
            if value.is_truthy() {
                dom::set_attribute(node, "checked", "");
            } else {
                dom::remove_attribute(node, "checked");
            }
        }
        None => {}
    }
}
