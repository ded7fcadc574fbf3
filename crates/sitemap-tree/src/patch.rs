//! Key-addressed structural edit commands.
//!
//! Commands address array elements by `_key` rather than position, so an
//! edit stays valid when siblings are reordered concurrently. Head and tail
//! anchors use the indices `0` and `-1`, which do not depend on sibling
//! order either.
//!
//! Paths are relative to the sitemap document's `roots` field and render in
//! the store's path syntax:
//!
//! ```text
//! roots[_key=="h"].children.nodes[_key=="a"]
//! roots[_key=="h"].children.nodes[-1]
//! ```

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::node::NodeKey;

/// Name of the document field holding the root nodes.
const ROOTS_FIELD: &str = "roots";

/// One step of a [`PatchPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Array element with this `_key`.
    Key(NodeKey),
    /// Object field.
    Field(&'static str),
    /// Array position; negative values count from the end.
    Index(i64),
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Keyed<'a> {
            #[serde(rename = "_key")]
            key: &'a NodeKey,
        }

        match self {
            Self::Key(key) => Keyed { key }.serialize(serializer),
            Self::Field(name) => serializer.serialize_str(name),
            Self::Index(index) => serializer.serialize_i64(*index),
        }
    }
}

/// Path into the `roots` array. The empty path is `roots` itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PatchPath(Vec<PathSegment>);

impl PatchPath {
    /// Path of the `roots` array itself.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a keyed array element.
    #[must_use]
    pub fn key(mut self, key: NodeKey) -> Self {
        self.0.push(PathSegment::Key(key));
        self
    }

    /// Append an object field.
    #[must_use]
    pub fn field(mut self, name: &'static str) -> Self {
        self.0.push(PathSegment::Field(name));
        self
    }

    /// Append an array position.
    #[must_use]
    pub fn index(mut self, index: i64) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    /// Path segments in order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Path without its last segment.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOTS_FIELD)?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, "[_key=={:?}]", key.as_str())?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Side of the anchor element an insert places its items on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    /// Before the anchor.
    Before,
    /// After the anchor.
    After,
}

/// A single structural edit.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PatchCommand {
    /// Set `value` at `path` unless something is already there.
    SetIfMissing {
        /// Target path.
        path: PatchPath,
        /// Value to write.
        value: Value,
    },
    /// Replace whatever is at `path`.
    Set {
        /// Target path.
        path: PatchPath,
        /// Value to write.
        value: Value,
    },
    /// Insert `items` next to the array element at `path`.
    Insert {
        /// Anchor element path.
        path: PatchPath,
        /// Side of the anchor.
        position: InsertPosition,
        /// Items to insert.
        items: Vec<Value>,
    },
    /// Remove whatever is at `path`.
    Unset {
        /// Target path.
        path: PatchPath,
    },
}

/// Ordered list of commands produced by one edit gesture.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Patch {
    commands: Vec<PatchCommand>,
}

/// Error applying a patch to a JSON document.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A path segment does not exist in the document.
    #[error("Path not found: {0}")]
    PathNotFound(String),
    /// The value at a path has the wrong JSON type.
    #[error("Expected {expected} at {path}")]
    TypeMismatch {
        /// Offending path.
        path: String,
        /// Expected JSON type.
        expected: &'static str,
    },
    /// Insert anchor element does not exist.
    #[error("Insert anchor not found: {0}")]
    AnchorNotFound(String),
}

impl Patch {
    pub(crate) fn new(commands: Vec<PatchCommand>) -> Self {
        Self { commands }
    }

    /// Commands in application order.
    #[must_use]
    pub fn commands(&self) -> &[PatchCommand] {
        &self.commands
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the patch is a no-op.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply the commands to the JSON value of the `roots` field.
    ///
    /// All-or-nothing: on error `roots` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError`] if a command addresses a path that does not
    /// exist or has the wrong type.
    pub fn apply_to(&self, roots: &mut Value) -> Result<(), PatchError> {
        let mut working = roots.clone();
        for command in &self.commands {
            command.apply_to(&mut working)?;
        }
        *roots = working;
        Ok(())
    }
}

impl IntoIterator for Patch {
    type Item = PatchCommand;
    type IntoIter = std::vec::IntoIter<PatchCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl PatchCommand {
    /// Target path of the command.
    #[must_use]
    pub fn path(&self) -> &PatchPath {
        match self {
            Self::SetIfMissing { path, .. }
            | Self::Set { path, .. }
            | Self::Insert { path, .. }
            | Self::Unset { path } => path,
        }
    }

    fn apply_to(&self, roots: &mut Value) -> Result<(), PatchError> {
        match self {
            Self::SetIfMissing { path, value } => set_value(roots, path, value, false),
            Self::Set { path, value } => set_value(roots, path, value, true),
            Self::Insert {
                path,
                position,
                items,
            } => insert_items(roots, path, *position, items),
            Self::Unset { path } => {
                unset_value(roots, path);
                Ok(())
            }
        }
    }
}

fn set_value(
    roots: &mut Value,
    path: &PatchPath,
    value: &Value,
    overwrite: bool,
) -> Result<(), PatchError> {
    let Some((last, parents)) = path.0.split_last() else {
        if overwrite || roots.is_null() {
            *roots = value.clone();
        }
        return Ok(());
    };

    let parent = resolve_mut(roots, parents, path)?;
    if let PathSegment::Field(name) = last {
        let object = parent.as_object_mut().ok_or_else(|| PatchError::TypeMismatch {
            path: path.parent().to_string(),
            expected: "object",
        })?;
        match object.get_mut(*name) {
            Some(slot) if overwrite || slot.is_null() => *slot = value.clone(),
            Some(_) => {}
            None => {
                object.insert((*name).to_owned(), value.clone());
            }
        }
        return Ok(());
    }

    let slot = step_mut(parent, last).ok_or_else(|| PatchError::PathNotFound(path.to_string()))?;
    if overwrite || slot.is_null() {
        *slot = value.clone();
    }
    Ok(())
}

fn unset_value(roots: &mut Value, path: &PatchPath) {
    let Some((last, parents)) = path.0.split_last() else {
        *roots = Value::Null;
        return;
    };
    let Ok(parent) = resolve_mut(roots, parents, path) else {
        return;
    };

    match (last, parent) {
        (PathSegment::Field(name), Value::Object(object)) => {
            object.remove(*name);
        }
        (PathSegment::Key(key), Value::Array(items)) => {
            items.retain(|item| !has_key(item, key));
        }
        (PathSegment::Index(index), Value::Array(items)) => {
            if let Some(i) = resolve_index(*index, items.len()) {
                items.remove(i);
            }
        }
        _ => {}
    }
}

fn insert_items(
    roots: &mut Value,
    path: &PatchPath,
    position: InsertPosition,
    items: &[Value],
) -> Result<(), PatchError> {
    let Some((anchor, parents)) = path.0.split_last() else {
        return Err(PatchError::AnchorNotFound(path.to_string()));
    };

    let array = resolve_mut(roots, parents, path)?
        .as_array_mut()
        .ok_or_else(|| PatchError::TypeMismatch {
            path: path.parent().to_string(),
            expected: "array",
        })?;

    let at = match anchor {
        // Head/tail anchors into an empty array insert at the start.
        PathSegment::Index(_) if array.is_empty() => 0,
        PathSegment::Index(index) => {
            let i = resolve_index(*index, array.len())
                .ok_or_else(|| PatchError::AnchorNotFound(path.to_string()))?;
            offset(i, position)
        }
        PathSegment::Key(key) => {
            let i = array
                .iter()
                .position(|item| has_key(item, key))
                .ok_or_else(|| PatchError::AnchorNotFound(path.to_string()))?;
            offset(i, position)
        }
        PathSegment::Field(_) => return Err(PatchError::AnchorNotFound(path.to_string())),
    };

    array.splice(at..at, items.iter().cloned());
    Ok(())
}

fn offset(index: usize, position: InsertPosition) -> usize {
    match position {
        InsertPosition::Before => index,
        InsertPosition::After => index + 1,
    }
}

fn resolve_mut<'a>(
    value: &'a mut Value,
    segments: &[PathSegment],
    path: &PatchPath,
) -> Result<&'a mut Value, PatchError> {
    let mut current = value;
    for segment in segments {
        current =
            step_mut(current, segment).ok_or_else(|| PatchError::PathNotFound(path.to_string()))?;
    }
    Ok(current)
}

fn step_mut<'a>(value: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match segment {
        PathSegment::Field(name) => value.as_object_mut()?.get_mut(*name),
        PathSegment::Key(key) => value
            .as_array_mut()?
            .iter_mut()
            .find(|item| has_key(item, key)),
        PathSegment::Index(index) => {
            let items = value.as_array_mut()?;
            let i = resolve_index(*index, items.len())?;
            items.get_mut(i)
        }
    }
}

fn has_key(item: &Value, key: &NodeKey) -> bool {
    item.get("_key").and_then(Value::as_str) == Some(key.as_str())
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok().filter(|&i| i < len)
    } else {
        len.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)
    }
}
