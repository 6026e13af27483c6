//! Dump context: the nested key/value state templates are resolved against

use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Resolves a dotted placeholder path to its replacement text.
///
/// Returning `None` means the path is absent; the template renders an empty
/// string in its place.
pub trait Lookup {
    fn lookup(&self, path: &str) -> Option<Cow<'_, str>>;
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, path: &str) -> Option<Cow<'_, str>> {
        self(path).map(Cow::Owned)
    }
}

/// Session-wide dump state.
///
/// The root holds captured session variables (`character_set_client`,
/// `version`, ...) as scalars. Per-object state lives in named sub-trees
/// (`table`, `routine`, `trigger`, `view`) that are replaced wholesale when
/// the orchestrator moves to the next object.
#[derive(Debug, Clone, Default)]
pub struct Context {
    root: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar at the root.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.root.insert(key.into(), Value::String(value.into()));
    }

    /// Replace a whole sub-tree with the serialized form of `value`.
    pub fn replace<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.root.insert(key.into(), value);
        Ok(())
    }

    /// Remove a sub-tree or scalar from the root.
    pub fn clear(&mut self, key: &str) {
        self.root.remove(key);
    }

    /// Descend the context one dotted segment at a time.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }
}

impl Lookup for Context {
    fn lookup(&self, path: &str) -> Option<Cow<'_, str>> {
        match self.get(path)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Borrowed(if *b { "1" } else { "0" })),
            // Nested maps, arrays and nulls are not scalars.
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}
