//! The scene tree: `SceneId -> SceneRecord` plus the parent/sibling
//! relation, and the reparenting engine that edits it.

use boldui_protocol::{A2RUpdateScene, SceneId};
use rustc_hash::FxHashMap;

/// A resolved reparent target: `A2RReparentScene` with its `OpId`-addressed
/// scene ids already evaluated to concrete [`SceneId`]s by the handler
/// interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentTarget {
    Inside(SceneId),
    After(SceneId),
    Root,
    Disconnect,
    Hide,
}

pub struct SceneRecord {
    pub scene: A2RUpdateScene,
    parent: Option<SceneId>,
    hidden: bool,
}

/// Maintains the scene tree as a mapping from `SceneId` to its record plus
/// a parent/sibling relation.
#[derive(Default)]
pub struct SceneTree {
    records: FxHashMap<SceneId, SceneRecord>,
    root_children: Vec<SceneId>,
    children: FxHashMap<SceneId, Vec<SceneId>>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces a scene's data without touching its tree
    /// position. A brand new scene
    /// starts detached; it becomes visible once reparented.
    pub fn install(&mut self, scene: A2RUpdateScene) {
        let id = scene.id;
        match self.records.get_mut(&id) {
            Some(rec) => rec.scene = scene,
            None => {
                self.records.insert(id, SceneRecord { scene, parent: None, hidden: false });
            }
        }
    }

    pub fn get(&self, id: SceneId) -> Option<&A2RUpdateScene> {
        self.records.get(&id).map(|r| &r.scene)
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.records.contains_key(&id)
    }

    /// Whether `id` is reachable from the implicit root via `Inside`/`After`
    /// edges.
    pub fn is_attached(&self, id: SceneId) -> bool {
        match self.records.get(&id) {
            Some(rec) if !rec.hidden => rec.parent.is_some() || self.root_children.contains(&id),
            _ => false,
        }
    }

    /// A pre-order walk of every attached scene, root windows first in
    /// installation order.
    pub fn attached_scenes(&self) -> Vec<SceneId> {
        let mut out = Vec::new();
        for &root in &self.root_children {
            self.walk(root, &mut out);
        }
        out
    }

    fn walk(&self, id: SceneId, out: &mut Vec<SceneId>) {
        out.push(id);
        if let Some(kids) = self.children.get(&id) {
            for &kid in kids {
                self.walk(kid, out);
            }
        }
    }

    /// `true` if `candidate` is `ancestor` itself or appears anywhere in its
    /// subtree, used to reject reparenting a scene under its own
    /// descendant.
    fn is_self_or_descendant(&self, ancestor: SceneId, candidate: SceneId) -> bool {
        if ancestor == candidate {
            return true;
        }
        self.children
            .get(&ancestor)
            .map(|kids| kids.iter().any(|&kid| self.is_self_or_descendant(kid, candidate)))
            .unwrap_or(false)
    }

    /// Atomically moves `scene` to `target`. Rejects the edit
    /// (leaving the tree unchanged) if it would create a cycle.
    pub fn reparent(
        &mut self,
        scene: SceneId,
        target: ReparentTarget,
    ) -> Result<(), boldui_protocol::SchemaError> {
        if let ReparentTarget::Inside(parent) = target {
            if self.is_self_or_descendant(scene, parent) {
                return Err(boldui_protocol::SchemaError::ReparentIntoDescendant { scene, target: parent });
            }
        }
        if let ReparentTarget::After(sibling) = target {
            let sibling_parent = self.records.get(&sibling).and_then(|r| r.parent);
            let would_cycle = match sibling_parent {
                Some(p) => self.is_self_or_descendant(scene, p),
                None => false,
            };
            if would_cycle || scene == sibling {
                return Err(boldui_protocol::SchemaError::ReparentIntoDescendant { scene, target: sibling });
            }
        }

        self.detach(scene);

        match target {
            ReparentTarget::Inside(parent) => {
                self.children.entry(parent).or_default().insert(0, scene);
                if let Some(rec) = self.records.get_mut(&scene) {
                    rec.parent = Some(parent);
                }
            }
            ReparentTarget::After(sibling) => {
                let parent = self.records.get(&sibling).and_then(|r| r.parent);
                let siblings = match parent {
                    Some(p) => self.children.entry(p).or_default(),
                    None => &mut self.root_children,
                };
                let pos = siblings.iter().position(|&s| s == sibling).map(|i| i + 1).unwrap_or(siblings.len());
                siblings.insert(pos, scene);
                if let Some(rec) = self.records.get_mut(&scene) {
                    rec.parent = parent;
                }
            }
            ReparentTarget::Root => {
                self.root_children.push(scene);
                if let Some(rec) = self.records.get_mut(&scene) {
                    rec.parent = None;
                }
            }
            ReparentTarget::Disconnect => {
                // Fully destroyed: the record itself is dropped. Callers are
                // responsible for undeclaring its variables.
                self.records.remove(&scene);
            }
            ReparentTarget::Hide => {
                if let Some(rec) = self.records.get_mut(&scene) {
                    rec.hidden = true;
                    rec.parent = None;
                }
            }
        }
        Ok(())
    }

    /// Removes `scene` from wherever it currently sits in the tree
    /// structure, without touching its record.
    fn detach(&mut self, scene: SceneId) {
        self.root_children.retain(|&s| s != scene);
        for kids in self.children.values_mut() {
            kids.retain(|&s| s != scene);
        }
        if let Some(rec) = self.records.get_mut(&scene) {
            rec.hidden = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boldui_protocol::A2RUpdateScene;

    fn install(tree: &mut SceneTree, id: u32) {
        tree.install(A2RUpdateScene::new(SceneId(id)));
    }

    #[test]
    fn root_attach_makes_scene_visible() {
        let mut tree = SceneTree::new();
        install(&mut tree, 1);
        assert!(!tree.is_attached(SceneId(1)));
        tree.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        assert!(tree.is_attached(SceneId(1)));
        assert_eq!(tree.attached_scenes(), vec![SceneId(1)]);
    }

    #[test]
    fn inside_nests_under_parent_in_preorder() {
        let mut tree = SceneTree::new();
        for id in [1, 2, 3] {
            install(&mut tree, id);
        }
        tree.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        tree.reparent(SceneId(2), ReparentTarget::Inside(SceneId(1))).unwrap();
        tree.reparent(SceneId(3), ReparentTarget::Inside(SceneId(1))).unwrap();
        // Most recent Inside() insert is the first child (spec leaves
        // ordering among repeated Inside(parent) calls implementation
        // defined; LIFO matches a typical "insert as new first child" reading).
        assert_eq!(tree.attached_scenes(), vec![SceneId(1), SceneId(3), SceneId(2)]);
    }

    #[test]
    fn reparenting_into_own_descendant_is_rejected() {
        let mut tree = SceneTree::new();
        for id in [1, 2] {
            install(&mut tree, id);
        }
        tree.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        tree.reparent(SceneId(2), ReparentTarget::Inside(SceneId(1))).unwrap();
        let err = tree.reparent(SceneId(1), ReparentTarget::Inside(SceneId(2))).unwrap_err();
        assert!(matches!(err, boldui_protocol::SchemaError::ReparentIntoDescendant { .. }));
        // Tree must be unchanged (spec S5).
        assert_eq!(tree.attached_scenes(), vec![SceneId(1), SceneId(2)]);
    }

    #[test]
    fn disconnect_destroys_the_record() {
        let mut tree = SceneTree::new();
        install(&mut tree, 1);
        tree.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        tree.reparent(SceneId(1), ReparentTarget::Disconnect).unwrap();
        assert!(!tree.contains(SceneId(1)));
    }

    #[test]
    fn hide_detaches_but_keeps_the_record() {
        let mut tree = SceneTree::new();
        install(&mut tree, 1);
        tree.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        tree.reparent(SceneId(1), ReparentTarget::Hide).unwrap();
        assert!(!tree.is_attached(SceneId(1)));
        assert!(tree.contains(SceneId(1)));
    }

    #[test]
    fn after_inserts_as_next_sibling() {
        let mut tree = SceneTree::new();
        for id in [1, 2, 3] {
            install(&mut tree, id);
        }
        tree.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        tree.reparent(SceneId(2), ReparentTarget::Root).unwrap();
        tree.reparent(SceneId(3), ReparentTarget::After(SceneId(1))).unwrap();
        assert_eq!(tree.attached_scenes(), vec![SceneId(1), SceneId(3), SceneId(2)]);
    }
}
