//! Per-scene variable storage and its dependency-tracking subscription set
//!.

use std::hash::Hash;

use boldui_protocol::{Value, ValueKind, VarId};
use rustc_hash::{FxHashMap, FxHashSet};

struct VarEntry {
    declared_kind: ValueKind,
    value: Value,
}

/// `name -> (declared_type, live_value)` plus a subscription set of watch
/// keys that depend on each variable.
///
/// Generic over `K`, the subscriber key (in practice a `(SceneId, watch
/// index)` pair owned by `boldui-scene`), so this crate doesn't need to
/// depend back on the scene-tree crate that owns watches.
pub struct VariableStore<K> {
    vars: FxHashMap<VarId, VarEntry>,
    subscribers: FxHashMap<VarId, FxHashSet<K>>,
}

impl<K> Default for VariableStore<K> {
    fn default() -> Self {
        VariableStore { vars: FxHashMap::default(), subscribers: FxHashMap::default() }
    }
}

impl<K: Copy + Eq + Hash> VariableStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable with a default. If it's already declared with
    /// the same concrete type, the live value is preserved (spec §3
    /// invariant 2, §4.C "preserve existing variable live values for names
    /// still declared with a compatible type"). Otherwise the live value
    /// is (re)initialised to `default`.
    pub fn declare(&mut self, var: VarId, default: Value) {
        let kind = default.kind();
        match self.vars.get_mut(&var) {
            Some(entry) if entry.declared_kind == kind => {
                // Keep the live value, just in case the default itself changed.
            }
            _ => {
                self.vars.insert(var, VarEntry { declared_kind: kind, value: default });
            }
        }
    }

    /// Removes a variable no longer declared by any attached scene
    /// (called when a scene re-emission drops a previously-declared name).
    pub fn undeclare(&mut self, var: &VarId) {
        self.vars.remove(var);
        self.subscribers.remove(var);
    }

    pub fn get(&self, var: &VarId) -> Option<&Value> {
        self.vars.get(var).map(|e| &e.value)
    }

    pub fn declared_kind(&self, var: &VarId) -> Option<ValueKind> {
        self.vars.get(var).map(|e| e.declared_kind)
    }

    /// Writes a variable, enforcing that the concrete variant matches the
    /// declared type (spec §3: "setting a variable to a value of a
    /// different concrete variant is an error"). Returns the set of
    /// subscriber keys to notify — call-sites are expected to notify once
    /// per batch, not once per individual write.
    pub fn set(&mut self, var: &VarId, value: Value) -> Result<Vec<K>, boldui_protocol::SchemaError> {
        let entry = self.vars.get_mut(var).ok_or_else(|| boldui_protocol::SchemaError::UnknownVar(var.clone()))?;
        if entry.declared_kind != value.kind() {
            return Err(boldui_protocol::SchemaError::TypeMismatch {
                var: var.clone(),
                expected: entry.declared_kind,
                got: value.kind(),
            });
        }
        entry.value = value;
        Ok(self.subscribers.get(var).map(|s| s.iter().copied().collect()).unwrap_or_default())
    }

    /// Records that `subscriber` depends on `var` (called after a watch
    /// condition is evaluated, spec §4.D: "The evaluator records the set
    /// of variables read during a pass so the store can invert that to a
    /// dependency set for watches").
    pub fn subscribe(&mut self, var: VarId, subscriber: K) {
        self.subscribers.entry(var).or_default().insert(subscriber);
    }

    /// Clears all dependency edges for one subscriber, e.g. before
    /// recomputing them on scene reinstall (spec §4.H "dependency sets are
    /// captured on first evaluation and refreshed whenever the scene is
    /// reinstalled").
    pub fn clear_subscriptions_for(&mut self, subscriber: K) {
        for set in self.subscribers.values_mut() {
            set.remove(&subscriber);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_preserves_live_value_of_compatible_type() {
        let mut store: VariableStore<u32> = VariableStore::new();
        let v = VarId::new(boldui_protocol::SceneId(1), "count");
        store.declare(v.clone(), Value::Sint64(0));
        store.set(&v, Value::Sint64(42)).unwrap();
        store.declare(v.clone(), Value::Sint64(0));
        assert_eq!(store.get(&v), Some(&Value::Sint64(42)));
    }

    #[test]
    fn declare_resets_on_incompatible_type_change() {
        let mut store: VariableStore<u32> = VariableStore::new();
        let v = VarId::new(boldui_protocol::SceneId(1), "count");
        store.declare(v.clone(), Value::Sint64(0));
        store.set(&v, Value::Sint64(42)).unwrap();
        store.declare(v.clone(), Value::String("hi".into()));
        assert_eq!(store.get(&v), Some(&Value::String("hi".into())));
    }

    #[test]
    fn set_rejects_type_mismatch() {
        let mut store: VariableStore<u32> = VariableStore::new();
        let v = VarId::new(boldui_protocol::SceneId(1), "count");
        store.declare(v.clone(), Value::Sint64(0));
        let err = store.set(&v, Value::String("oops".into())).unwrap_err();
        assert!(matches!(err, boldui_protocol::SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn set_returns_subscribers_once() {
        let mut store: VariableStore<u32> = VariableStore::new();
        let v = VarId::new(boldui_protocol::SceneId(1), "count");
        store.declare(v.clone(), Value::Sint64(0));
        store.subscribe(v.clone(), 1);
        store.subscribe(v.clone(), 2);
        let mut notified = store.set(&v, Value::Sint64(1)).unwrap();
        notified.sort();
        assert_eq!(notified, vec![1, 2]);
    }
}
