//! Installing/updating a scene's data while preserving compatible variable
//! live values.

use boldui_protocol::{A2RUpdateScene, VarId};
use rustc_hash::FxHashSet;

use crate::tree::SceneTree;
use crate::watch::WatchKey;

/// Declares `scene`'s variables against `vars` (preserving live values of
/// names that stay declared with a compatible type, via
/// [`boldui_eval::VariableStore::declare`]), undeclares names the new scene
/// dropped, and refreshes watch dependency sets before installing the scene
/// into the tree.
pub fn install_scene(
    tree: &mut SceneTree,
    vars: &mut boldui_eval::VariableStore<WatchKey>,
    scene: A2RUpdateScene,
) {
    let id = scene.id;
    let old_names: FxHashSet<_> = tree.get(id).map(|s| s.var_decls.keys().cloned().collect()).unwrap_or_default();
    let old_watch_count = tree.get(id).map(|s| s.watches.len()).unwrap_or(0);
    let new_watch_count = scene.watches.len();

    for (name, default) in &scene.var_decls {
        vars.declare(VarId::new(id, name.clone()), default.clone());
    }
    for name in old_names.iter().filter(|name| !scene.var_decls.contains_key(*name)) {
        vars.undeclare(&VarId::new(id, name.clone()));
    }

    // Dependency sets are captured on first evaluation and must be
    // recaptured whenever the scene is reinstalled, so drop
    // whatever this scene's watches subscribed to previously.
    for idx in 0..old_watch_count.max(new_watch_count) {
        vars.clear_subscriptions_for((id, idx as u32));
    }

    tree.install(scene);
}

#[cfg(test)]
mod tests {
    use super::*;
    use boldui_protocol::{SceneId, Value};

    #[test]
    fn reinstall_preserves_live_value_of_surviving_variable() {
        let mut tree = SceneTree::new();
        let mut vars = boldui_eval::VariableStore::new();
        let mut scene = A2RUpdateScene::new(SceneId(1));
        scene.var_decls.insert("count".into(), Value::Sint64(0));
        install_scene(&mut tree, &mut vars, scene);

        vars.set(&VarId::new(SceneId(1), "count"), Value::Sint64(9)).unwrap();

        let mut scene2 = A2RUpdateScene::new(SceneId(1));
        scene2.var_decls.insert("count".into(), Value::Sint64(0));
        install_scene(&mut tree, &mut vars, scene2);

        assert_eq!(vars.get(&VarId::new(SceneId(1), "count")), Some(&Value::Sint64(9)));
    }

    #[test]
    fn dropped_variable_is_undeclared() {
        let mut tree = SceneTree::new();
        let mut vars = boldui_eval::VariableStore::new();
        let mut scene = A2RUpdateScene::new(SceneId(1));
        scene.var_decls.insert("count".into(), Value::Sint64(0));
        install_scene(&mut tree, &mut vars, scene);

        let scene2 = A2RUpdateScene::new(SceneId(1));
        install_scene(&mut tree, &mut vars, scene2);

        assert_eq!(vars.get(&VarId::new(SceneId(1), "count")), None);
    }
}
