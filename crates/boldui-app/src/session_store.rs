//! Session durability as an external-collaborator seam (spec §3 "optional
//! durable store", §6). This crate only defines the trait boundary and an
//! in-memory default; a real on-disk store is out of
//! scope per spec §1 and would implement [`SessionStore`] itself.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use zng_txt::Txt;

/// Loads and saves session model state keyed by session id.
pub trait SessionStore<S>: Send + Sync {
    /// Returns the previously saved state for `session_id`, if any.
    fn load(&self, session_id: &Txt) -> Option<S>;
    /// Persists `state` for `session_id`, replacing whatever was saved.
    fn save(&self, session_id: &Txt, state: &S);
}

/// The default store: keeps every session's state in a `Mutex`-guarded map
/// for the lifetime of the process, with no actual durability across
/// restarts.
pub struct MemorySessionStore<S> {
    sessions: Mutex<FxHashMap<Txt, S>>,
}

impl<S> Default for MemorySessionStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MemorySessionStore<S> {
    pub fn new() -> Self {
        Self { sessions: Mutex::new(FxHashMap::default()) }
    }
}

impl<S: Clone + Send> SessionStore<S> for MemorySessionStore<S> {
    fn load(&self, session_id: &Txt) -> Option<S> {
        self.sessions.lock().get(session_id).cloned()
    }

    fn save(&self, session_id: &Txt, state: &S) {
        self.sessions.lock().insert(session_id.clone(), state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_saved_state() {
        let store: MemorySessionStore<i64> = MemorySessionStore::new();
        let id = Txt::from("abc");
        assert_eq!(store.load(&id), None);
        store.save(&id, &42);
        assert_eq!(store.load(&id), Some(42));
    }
}
