//! Mutation Engine
//!
//! Structural edits addressed by node paths. The target's last two segments
//! decide where the edit lands:
//!
//! | tail              | example                     | edit                          |
//! |-------------------|-----------------------------|-------------------------------|
//! | `(name, index)`   | `choice.when.1`             | splice the `when` array       |
//! | `(index, name)`   | `actions.0.print`           | splice the `actions` array    |
//! | `(name, name)`    | `choice.otherwise`          | overwrite / drop the slot key |
//!
//! Child inserts resolve the target's own container settings instead. Every
//! operation on a path that does not fit the document is a logged no-op that
//! reports `false`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::container::{ContainerKind, ContainerSettings, ContainerTable};
use crate::dialect::{Dialect, DialectStrategy};
use crate::error::{FlowError, Result};
use crate::path::{
    ensure_array_at, join_path, join_segments, parse_path, remove_key_ordered, resolve_type_and_component,
    to_real_path, value_at, value_at_mut, PathSegment,
};

/// Where an added value goes relative to the target node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddMode {
    /// Before the target
    Prepend,
    /// After the target
    Append,
    /// In place of the target
    Replace,
    /// Into the target's first branch slot
    InsertChild,
    /// Into the target's slot named by the value, else its first non-branch
    /// slot, else a secondary branch slot
    InsertSpecialChild,
}

/// Detached node value as placed on a clipboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardCopy {
    pub dialect: Dialect,
    pub type_name: String,
    pub value: Value,
}

/// Error unless content copied from `from` may be pasted into `to`
pub fn check_compatible(from: Dialect, to: Dialect) -> Result<()> {
    if to.is_compatible_with(from) {
        Ok(())
    } else {
        Err(FlowError::IncompatibleDialect {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Wrap a value under its (possibly compound) type name:
/// `camel-jbang-run` → `{camel: {jbang: {run: value}}}`
pub fn wrap_typed(type_name: &str, value: Value) -> Value {
    type_name.rsplit('-').fold(value, |inner, segment| {
        let mut wrapper = Map::new();
        wrapper.insert(segment.to_string(), inner);
        Value::Object(wrapper)
    })
}

/// Take `body` out of `{slot: body}`; anything else is returned as is
fn unwrap_slot(slot: &str, value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(slot) => {
            map.remove(slot).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Document location addressed by a node path
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// Element `index` of the array stored under `key` of the object at `parent`
    Member {
        parent: String,
        key: String,
        index: usize,
        /// Elements are bare clause bodies rather than `{type: body}` steps
        clause: bool,
    },
    /// Key of the object at `parent`
    Slot { parent: String, key: String },
}

impl Target {
    fn classify(path: &str) -> Option<Self> {
        let segments = parse_path(path);
        let n = segments.len();
        let head = |len: usize| join_segments(&segments[..len]);

        match segments.as_slice() {
            [.., list, index] if !list.is_index && index.is_index => Some(Target::Member {
                parent: head(n - 2),
                key: list.value.clone(),
                index: index.index()?,
                clause: true,
            }),
            [.., list, index, name] if !list.is_index && index.is_index && !name.is_index => Some(Target::Member {
                parent: head(n - 3),
                key: list.value.clone(),
                index: index.index()?,
                clause: false,
            }),
            [.., a, b] if !a.is_index && !b.is_index => Some(Target::Slot {
                parent: head(n - 1),
                key: b.value.clone(),
            }),
            [PathSegment { is_index: false, value }] => Some(Target::Slot {
                parent: String::new(),
                key: value.clone(),
            }),
            _ => None,
        }
    }
}

/// Applies structural edits to documents of one dialect
pub struct MutationEngine<'a> {
    table: &'a ContainerTable,
    strategy: &'a dyn DialectStrategy,
}

impl<'a> MutationEngine<'a> {
    pub fn new(table: &'a ContainerTable, strategy: &'a dyn DialectStrategy) -> Self {
        Self { table, strategy }
    }

    /// Insert `value` relative to the node at `target`
    pub fn add(&self, document: &mut Value, target: &str, mode: AddMode, value: Value) -> bool {
        let applied = match mode {
            AddMode::InsertChild | AddMode::InsertSpecialChild => self.insert_child(document, target, mode, value),
            AddMode::Prepend | AddMode::Append | AddMode::Replace => Self::insert_sibling(document, target, mode, value),
        };
        if !applied {
            debug!(target_path = target, ?mode, "add skipped: target does not fit the document");
        }
        applied
    }

    /// Remove the node at `path`
    pub fn remove(&self, document: &mut Value, path: &str) -> bool {
        let removed = match Target::classify(path) {
            Some(Target::Member { parent, key, index, .. }) => {
                let array_path = to_real_path(&join_path(&parent, &key));
                match value_at_mut(document, &array_path).and_then(Value::as_array_mut) {
                    Some(items) if index < items.len() => {
                        items.remove(index);
                        true
                    }
                    _ => false,
                }
            }
            Some(Target::Slot { parent, key }) => value_at_mut(document, &to_real_path(&parent))
                .and_then(Value::as_object_mut)
                .and_then(|object| remove_key_ordered(object, &key))
                .is_some(),
            None => false,
        };
        if !removed {
            debug!(path, "remove skipped: nothing at path");
        }
        removed
    }

    /// Detach a copy of the node at `path`
    pub fn copy(&self, document: &Value, path: &str) -> Option<ClipboardCopy> {
        let value = value_at(document, &to_real_path(path))?.clone();
        let type_name = if path == self.strategy.root_path() {
            self.strategy.root_type().to_string()
        } else {
            resolve_type_and_component(path, Some(&value)).ok()?.type_name
        };

        Some(ClipboardCopy {
            dialect: self.strategy.dialect(),
            type_name,
            value,
        })
    }

    /// Add a clipboard copy relative to `target`; content from an
    /// incompatible dialect is refused
    pub fn paste(&self, document: &mut Value, target: &str, mode: AddMode, clip: &ClipboardCopy) -> bool {
        if let Err(err) = check_compatible(clip.dialect, self.strategy.dialect()) {
            debug!(%err, "paste refused");
            return false;
        }
        self.add(document, target, mode, wrap_typed(&clip.type_name, clip.value.clone()))
    }

    fn insert_sibling(document: &mut Value, target: &str, mode: AddMode, value: Value) -> bool {
        match Target::classify(target) {
            Some(Target::Member {
                parent,
                key,
                index,
                clause,
            }) => {
                let value = if clause { unwrap_slot(&key, value) } else { value };
                let Some(items) = ensure_array_at(document, &to_real_path(&parent), &key) else {
                    return false;
                };
                // one past the end is a placeholder; anything further is stale
                if index > items.len() {
                    return false;
                }
                match mode {
                    AddMode::Replace if index < items.len() => items[index] = value,
                    AddMode::Replace => items.push(value),
                    AddMode::Append => items.insert((index + 1).min(items.len()), value),
                    _ => items.insert(index, value),
                }
                true
            }
            Some(Target::Slot { parent, key }) => {
                let value = unwrap_slot(&key, value);
                match value_at_mut(document, &to_real_path(&parent)).and_then(Value::as_object_mut) {
                    Some(object) => {
                        object.insert(key, value);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    fn insert_child(&self, document: &mut Value, target: &str, mode: AddMode, value: Value) -> bool {
        let type_name = if target == self.strategy.root_path() {
            self.strategy.root_type().to_string()
        } else {
            match resolve_type_and_component(target, None) {
                Ok(resolved) => resolved.type_name,
                Err(_) => return false,
            }
        };

        let slots = self.table.get_all_container_settings(&type_name);
        let Some((slot, named)) = Self::pick_slot(slots, mode, &value) else {
            return false;
        };

        let target = to_real_path(target);
        match slot.kind {
            ContainerKind::SingleNode => {
                let value = unwrap_slot(&slot.child_property, value);
                match value_at_mut(document, &target).and_then(Value::as_object_mut) {
                    Some(object) => {
                        object.insert(slot.child_property.clone(), value);
                        true
                    }
                    None => false,
                }
            }
            ContainerKind::ArrayNode | ContainerKind::Branch => {
                let value = if slot.kind == ContainerKind::ArrayNode || (named && self.is_slot_wrapped_step(slot, &value)) {
                    unwrap_slot(&slot.child_property, value)
                } else {
                    value
                };
                match ensure_array_at(document, &target, &slot.child_property) {
                    Some(items) => {
                        items.push(value);
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Slot for a child insert, and whether the value named it by its key
    fn pick_slot<'s>(slots: &'s [ContainerSettings], mode: AddMode, value: &Value) -> Option<(&'s ContainerSettings, bool)> {
        let primary_branch = slots.iter().position(|s| s.kind == ContainerKind::Branch);
        if mode == AddMode::InsertChild {
            return primary_branch.map(|i| &slots[i]).or_else(|| slots.first()).map(|slot| (slot, false));
        }

        let named = value
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.keys().next())
            .and_then(|key| slots.iter().find(|s| &s.child_property == key));
        if let Some(slot) = named {
            return Some((slot, true));
        }
        slots
            .iter()
            .find(|s| s.kind != ContainerKind::Branch)
            .or_else(|| {
                slots
                    .iter()
                    .enumerate()
                    .find(|(i, s)| s.kind == ContainerKind::Branch && Some(*i) != primary_branch)
                    .map(|(_, s)| s)
            })
            .map(|slot| (slot, false))
    }

    /// `{finally: {print: ..}}` carries a step under its slot name, while
    /// `{onException: {..}}` is itself a step of the slot's own type
    fn is_slot_wrapped_step(&self, slot: &ContainerSettings, value: &Value) -> bool {
        if self.table.is_container(&slot.child_property) {
            return false;
        }
        value
            .get(&slot.child_property)
            .and_then(Value::as_object)
            .is_some_and(|body| body.len() == 1)
    }
}
