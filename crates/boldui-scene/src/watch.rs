//! Per-watch acknowledgement bookkeeping. The re-evaluation
//! loop itself lives in [`crate::graph::SceneGraph`], which has the tree,
//! variable store and evaluator all in scope; this module only tracks which
//! watches are edge-triggered and which are blocked on a pending ack.

use boldui_protocol::{SceneId, Watch};
use rustc_hash::{FxHashMap, FxHashSet};

/// Identifies one watch: its owning scene and its position in
/// `A2RUpdateScene::watches`, used to break ties between
/// identically-conditioned watches in registration order.
pub type WatchKey = (SceneId, u32);

/// Bound on re-fire rounds per external stimulus, so a watch that updates a
/// variable which retriggers itself isn't allowed to loop indefinitely. One
/// settle round beyond the initial pass is enough to observe variables a
/// first-round watch just wrote, without opening the door to runaway
/// feedback loops.
pub const MAX_SETTLE_ROUNDS: u32 = 2;

#[derive(Default)]
pub struct WatchEngine {
    blocked: FxHashSet<WatchKey>,
    /// Last-observed truthiness, to detect the non-truthy → truthy edge a
    /// watch fires on.
    last_truthy: FxHashMap<WatchKey, bool>,
}

impl WatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self, key: WatchKey) -> bool {
        self.blocked.contains(&key)
    }

    /// Records that a watch just fired; if it waits for a roundtrip, it's
    /// now blocked until [`Self::ack`] or [`Self::release_for_rebuild`].
    pub fn mark_fired(&mut self, key: WatchKey, wait_for_roundtrip: bool) {
        self.last_truthy.insert(key, true);
        if wait_for_roundtrip {
            self.blocked.insert(key);
        }
    }

    pub fn mark_not_truthy(&mut self, key: WatchKey) {
        self.last_truthy.insert(key, false);
    }

    pub fn was_truthy(&self, key: WatchKey) -> bool {
        self.last_truthy.get(&key).copied().unwrap_or(false)
    }

    /// Releases an explicit `WatchAck`.
    pub fn ack(&mut self, key: WatchKey) {
        self.blocked.remove(&key);
    }

    /// Releases every blocked watch in `scene` that opted into
    /// `wait_for_rebuild`; call once after a scene is reinstalled (spec
    /// §4.H "or, when `wait_for_rebuild` is set, a new A2RUpdateScene for
    /// the owning scene arrives").
    pub fn release_for_rebuild(&mut self, scene: SceneId, watches: &[Watch]) {
        for (idx, watch) in watches.iter().enumerate() {
            if watch.wait_for_rebuild {
                self.blocked.remove(&(scene, idx as u32));
            }
        }
    }

    /// Drops all bookkeeping for a scene that's gone (reparented to
    /// `Disconnect`).
    pub fn forget_scene(&mut self, scene: SceneId, watch_count: usize) {
        for idx in 0..watch_count as u32 {
            let key = (scene, idx);
            self.blocked.remove(&key);
            self.last_truthy.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_watch_blocks_until_ack() {
        let mut engine = WatchEngine::new();
        let key = (SceneId(1), 0);
        engine.mark_fired(key, true);
        assert!(engine.is_blocked(key));
        engine.ack(key);
        assert!(!engine.is_blocked(key));
    }

    #[test]
    fn non_roundtrip_watch_never_blocks() {
        let mut engine = WatchEngine::new();
        let key = (SceneId(1), 0);
        engine.mark_fired(key, false);
        assert!(!engine.is_blocked(key));
    }

    #[test]
    fn rebuild_releases_only_wait_for_rebuild_watches() {
        let mut engine = WatchEngine::new();
        engine.mark_fired((SceneId(1), 0), true);
        engine.mark_fired((SceneId(1), 1), true);
        let watches = vec![
            Watch { condition: boldui_protocol::OpId::NULL, handler: Default::default(), wait_for_roundtrip: true, wait_for_rebuild: true },
            Watch { condition: boldui_protocol::OpId::NULL, handler: Default::default(), wait_for_roundtrip: true, wait_for_rebuild: false },
        ];
        engine.release_for_rebuild(SceneId(1), &watches);
        assert!(!engine.is_blocked((SceneId(1), 0)));
        assert!(engine.is_blocked((SceneId(1), 1)));
    }
}
