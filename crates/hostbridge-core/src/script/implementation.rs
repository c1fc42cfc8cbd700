//! Plain script objects used as implementation facets.

use std::any::Any;
use std::fmt;

use parking_lot::RwLock;

use crate::error::ScriptResult;

use super::{ScriptFn, ScriptValue, Scriptable};

/// An insertion-ordered plain script object.
///
/// This is what a script author writes as an object literal. Entries are
/// kept exactly as written, duplicates included, so consumers that must
/// reject duplicate keys can see them.
#[derive(Default)]
pub struct ImplementationObject {
    entries: RwLock<Vec<(String, ScriptValue)>>,
}

impl ImplementationObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `(key, value)` pairs in order.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ScriptValue)>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value))
                    .collect(),
            ),
        }
    }

    /// Append a data property.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.entries.write().push((key.into(), value.into()));
        self
    }

    /// Append a callable. The function is named after the key unless it
    /// already has a name.
    pub fn with_fn(self, key: impl Into<String>, f: ScriptFn) -> Self {
        let key = key.into();
        let f = if f.name().is_some() {
            f
        } else {
            f.named(key.as_str())
        };
        self.entries.write().push((key, ScriptValue::Function(f)));
        self
    }

    /// Snapshot of all entries as written.
    pub fn entries(&self) -> Vec<(String, ScriptValue)> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Scriptable for ImplementationObject {
    fn class_name(&self) -> &str {
        "Object"
    }

    fn get(&self, name: &str) -> Option<ScriptValue> {
        self.entries
            .read()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn put(&self, name: &str, value: ScriptValue) -> ScriptResult<()> {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => entries.push((name.to_string(), value)),
        }
        Ok(())
    }

    fn own_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for (key, _) in self.entries.read().iter() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for ImplementationObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptContext;

    #[test]
    fn keeps_insertion_order_and_duplicates() {
        let obj = ImplementationObject::from_entries([
            ("b", ScriptValue::Int(1)),
            ("a", ScriptValue::Int(2)),
            ("b", ScriptValue::Int(3)),
        ]);
        assert_eq!(obj.len(), 3);
        assert_eq!(obj.own_keys(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(obj.get("b"), Some(ScriptValue::Int(1)));
    }

    #[test]
    fn put_replaces_or_appends() {
        let obj = ImplementationObject::new().with_value("x", 1);
        obj.put("x", ScriptValue::Int(5)).unwrap();
        obj.put("y", ScriptValue::Bool(true)).unwrap();
        assert_eq!(obj.get("x"), Some(ScriptValue::Int(5)));
        assert_eq!(obj.own_keys(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn methods_are_callable_with_this() {
        let guard = ScriptContext::enter();
        let obj = ScriptValue::object(
            ImplementationObject::new()
                .with_value("base", 40)
                .with_fn(
                    "answer",
                    ScriptFn::new(|_, this, args| {
                        let base = this.get("base").and_then(|v| v.as_int()).unwrap_or(0);
                        let extra = args.first().and_then(|v| v.as_int()).unwrap_or(0);
                        Ok(ScriptValue::Int(base + extra))
                    }),
                ),
        );
        let result = obj
            .call_member(guard.context(), "answer", &[ScriptValue::Int(2)])
            .unwrap();
        assert_eq!(result, ScriptValue::Int(42));
        assert_eq!(
            obj.get("answer").and_then(|f| f.as_function().and_then(|f| f.name().map(String::from))),
            Some("answer".to_string())
        );
    }
}
