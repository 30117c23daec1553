//! An application-side session: an id, the scenes it spawned, and the
//! user's domain model.

use boldui_protocol::SceneId;
use zng_txt::Txt;

/// One conversation identified by a `session=` URI parameter. Every scene
/// opened with the same session id shares this state and gets re-rendered
/// together when it's marked dirty (spec §4.F "every scene tied to the
/// session re-runs its view handler").
pub struct Session<S> {
    pub id: Txt,
    /// `(scene id, the path its view handler was registered under)`, so a
    /// dirty re-render knows which handler to re-invoke for each scene.
    pub scenes: Vec<(SceneId, Txt)>,
    pub state: S,
    dirty: bool,
}

impl<S> Session<S> {
    pub fn new(id: Txt, state: S) -> Self {
        Session { id, scenes: Vec::new(), state, dirty: false }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn add_scene(&mut self, id: SceneId, view_path: Txt) {
        self.scenes.push((id, view_path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clean_and_tracks_dirty_state() {
        let mut session = Session::new(Txt::from("s1"), 0i64);
        assert!(!session.is_dirty());
        session.mark_dirty();
        assert!(session.is_dirty());
        session.clear_dirty();
        assert!(!session.is_dirty());
    }
}
