//! [`SceneGraph`]: the renderer-side scene graph store, tying
//! together the tree, the variable store, the watch engine and the resource
//! store behind one API that the application-level transport loop drives.

use rustc_hash::FxHashSet;
use zng_txt::Txt;

use boldui_eval::{EvalContext, EvalError, Evaluator, SceneResolver, VariableStore};
use boldui_protocol::{
    builtin_vars, A2RUpdate, A2RUpdateScene, OpId, OpsOperation, Reply, ResourceId, SceneId, SchemaError, Value,
    VarId,
};

use crate::event::PointerEvent;
use crate::install;
use crate::interpreter;
use crate::resources::ResourceStore;
use crate::tree::{ReparentTarget, SceneTree};
use crate::watch::{WatchEngine, WatchKey, MAX_SETTLE_ROUNDS};

struct GraphResolver<'a> {
    tree: &'a SceneTree,
    vars: &'a VariableStore<WatchKey>,
    reads: FxHashSet<VarId>,
}
impl SceneResolver for GraphResolver<'_> {
    fn ops(&self, scene: SceneId) -> Option<&[OpsOperation]> {
        self.tree.get(scene).map(|s| s.ops.as_slice())
    }
    fn var(&self, var: &VarId) -> Option<&Value> {
        self.vars.get(var)
    }
    fn record_var_read(&mut self, var: &VarId) {
        self.reads.insert(var.clone());
    }
    fn is_attached(&self, scene: SceneId) -> bool {
        self.tree.is_attached(scene)
    }
}

pub struct SceneGraph {
    tree: SceneTree,
    vars: VariableStore<WatchKey>,
    watches: WatchEngine,
    resources: ResourceStore,
    next_scene_id: u32,
}

impl Default for SceneGraph {
    fn default() -> Self {
        SceneGraph {
            tree: SceneTree::new(),
            vars: VariableStore::new(),
            watches: WatchEngine::new(),
            resources: ResourceStore::new(),
            // Scene id 0 is reserved for handler-block-local ops.
            next_scene_id: 1,
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    pub fn vars(&self) -> &VariableStore<WatchKey> {
        &self.vars
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    /// Scene identifiers are allocated monotonically from a per-application
    /// counter.
    pub fn alloc_scene_id(&mut self) -> SceneId {
        let id = SceneId(self.next_scene_id);
        self.next_scene_id += 1;
        id
    }

    pub fn install_scene(&mut self, scene: A2RUpdateScene) {
        install::install_scene(&mut self.tree, &mut self.vars, scene);
    }

    /// Edits the tree topology, cleaning up variables and watch state when a
    /// scene is destroyed by reparenting to `Disconnect`.
    pub fn reparent(&mut self, scene: SceneId, target: ReparentTarget) -> Result<(), SchemaError> {
        if target == ReparentTarget::Disconnect {
            if let Some(record) = self.tree.get(scene) {
                let names: Vec<_> = record.var_decls.keys().cloned().collect();
                let watch_count = record.watches.len();
                for name in names {
                    self.vars.undeclare(&VarId::new(scene, name));
                }
                self.watches.forget_scene(scene, watch_count);
            }
        }
        self.tree.reparent(scene, target)
    }

    pub fn ack_watch(&mut self, scene: SceneId, watch_index: u32) {
        self.watches.ack((scene, watch_index));
    }

    /// Applies a full application→renderer batch: installs land before
    /// handler blocks run, and blocks run in declared order. Returns the
    /// replies the run blocks produced and any `Open` paths to loop back.
    pub fn apply_update(&mut self, update: A2RUpdate, ctx: &EvalContext) -> (Vec<Reply>, Vec<Txt>) {
        self.sync_builtin_vars(ctx);
        for scene in update.updated_scenes {
            let id = scene.id;
            let watches_snapshot = scene.watches.clone();
            self.install_scene(scene);
            self.watches.release_for_rebuild(id, &watches_snapshot);
        }

        let mut replies = Vec::new();
        let mut opens = Vec::new();
        let mut next_id = self.next_scene_id;
        for block in &update.run_blocks {
            let outcome = interpreter::run_handler_block(
                block,
                &mut self.tree,
                &mut self.vars,
                ctx,
                &mut || {
                    let id = SceneId(next_id);
                    next_id += 1;
                    id
                },
                &mut replies,
            );
            opens.extend(outcome.opens);
        }
        self.next_scene_id = next_id;

        for chunk in update.resource_chunks {
            self.resources.add_chunk(chunk);
        }
        for id in update.resource_deallocs {
            self.dealloc_resource(id);
        }
        for req in &update.external_app_requests {
            tracing::debug!(scene = ?req.scene_id, uri = %req.uri, "external app request received");
        }

        (replies, opens)
    }

    pub fn dealloc_resource(&mut self, id: ResourceId) {
        self.resources.dealloc(id);
    }

    /// Re-evaluates watches across every attached scene, in installation
    /// order, running any that just transitioned from non-truthy to truthy
    ///. Bounded to a few settle rounds so a watch that
    /// retriggers itself can't loop forever within one flush.
    pub fn flush_watches(&mut self, ctx: &EvalContext) -> (Vec<Reply>, Vec<Txt>) {
        self.sync_builtin_vars(ctx);
        let mut replies = Vec::new();
        let mut opens = Vec::new();
        let mut next_id = self.next_scene_id;

        for _round in 0..MAX_SETTLE_ROUNDS {
            let mut fired_any = false;
            for scene_id in self.tree.attached_scenes() {
                let watch_count = self.tree.get(scene_id).map(|s| s.watches.len()).unwrap_or(0);
                for idx in 0..watch_count {
                    let key: WatchKey = (scene_id, idx as u32);
                    if self.watches.is_blocked(key) {
                        continue;
                    }
                    let (condition, wait_for_roundtrip) = {
                        let w = &self.tree.get(scene_id).unwrap().watches[idx];
                        (w.condition, w.wait_for_roundtrip)
                    };
                    let (result, reads) = self.eval_in_scene(scene_id, condition, ctx);
                    for var in reads {
                        self.vars.subscribe(var, key);
                    }
                    let truthy = result.map(|v| v.is_truthy()).unwrap_or(false);

                    if truthy && !self.watches.was_truthy(key) {
                        let handler = self.tree.get(scene_id).unwrap().watches[idx].handler.clone();
                        let outcome = interpreter::run_handler_block(
                            &handler,
                            &mut self.tree,
                            &mut self.vars,
                            ctx,
                            &mut || {
                                let id = SceneId(next_id);
                                next_id += 1;
                                id
                            },
                            &mut replies,
                        );
                        opens.extend(outcome.opens);
                        self.watches.mark_fired(key, wait_for_roundtrip);
                        fired_any = true;
                    } else if !truthy {
                        self.watches.mark_not_truthy(key);
                    }
                }
            }
            if !fired_any {
                break;
            }
        }
        self.next_scene_id = next_id;
        (replies, opens)
    }

    /// Walks every attached scene's event handlers in install order,
    /// hit-testing against the freshly re-evaluated rect, and stops the
    /// whole walk the first time a handler's `continue_handling` comes back
    /// falsy.
    pub fn dispatch_pointer_event(&mut self, event: PointerEvent, base_ctx: &EvalContext) -> (Vec<Reply>, Vec<Txt>) {
        let ctx = base_ctx.with_input(event.input_coords());
        self.sync_builtin_vars(&ctx);
        let mut replies = Vec::new();
        let mut opens = Vec::new();
        let mut next_id = self.next_scene_id;

        'outer: for scene_id in self.tree.attached_scenes() {
            let handler_count = self.tree.get(scene_id).map(|s| s.event_handlers.len()).unwrap_or(0);
            for idx in 0..handler_count {
                let (event_type, rect_op, continue_op) = {
                    let h = &self.tree.get(scene_id).unwrap().event_handlers[idx];
                    (h.event_type.clone(), h.event_type.rect(), h.continue_handling)
                };
                if !event.matches_kind(&event_type) {
                    continue;
                }
                let (rect_result, _) = self.eval_in_scene(scene_id, rect_op, &ctx);
                let Ok(Value::Rect(rect)) = rect_result else { continue };
                if !event.hits(&rect) {
                    continue;
                }

                let handler_block = self.tree.get(scene_id).unwrap().event_handlers[idx].handler.clone();
                let outcome = interpreter::run_handler_block(
                    &handler_block,
                    &mut self.tree,
                    &mut self.vars,
                    &ctx,
                    &mut || {
                        let id = SceneId(next_id);
                        next_id += 1;
                        id
                    },
                    &mut replies,
                );
                opens.extend(outcome.opens);

                let (cont_result, _) = self.eval_in_scene(scene_id, continue_op, &ctx);
                if !cont_result.map(|v| v.is_truthy()).unwrap_or(true) {
                    self.next_scene_id = next_id;
                    break 'outer;
                }
            }
        }
        self.next_scene_id = next_id;
        (replies, opens)
    }

    /// Publishes `:width`/`:height`/`:mouse_x`/... into the variable store so
    /// scene ops can read them through an ordinary `Var` node, addressed the
    /// same way as scene-declared variables. Pointer coordinates persist
    /// across passes that don't carry input (e.g. the next watch flush
    /// after a click) rather than reverting to a default.
    fn sync_builtin_vars(&mut self, ctx: &EvalContext) {
        self.set_builtin(builtin_vars::WIDTH, Value::Sint64(ctx.width));
        self.set_builtin(builtin_vars::HEIGHT, Value::Sint64(ctx.height));
        self.set_optional_builtin(builtin_vars::MOUSE_X, ctx.input.mouse_x);
        self.set_optional_builtin(builtin_vars::MOUSE_Y, ctx.input.mouse_y);
        self.set_optional_builtin(builtin_vars::CLICK_X, ctx.input.click_x);
        self.set_optional_builtin(builtin_vars::CLICK_Y, ctx.input.click_y);
        self.set_optional_builtin(builtin_vars::SCROLL_X, ctx.input.scroll_x);
        self.set_optional_builtin(builtin_vars::SCROLL_Y, ctx.input.scroll_y);
    }

    fn set_builtin(&mut self, key: &'static str, value: Value) {
        let var = VarId::builtin(key);
        if self.vars.declared_kind(&var).is_none() {
            self.vars.declare(var.clone(), value.clone());
        }
        let _ = self.vars.set(&var, value);
    }

    fn set_optional_builtin(&mut self, key: &'static str, value: Option<f64>) {
        let var = VarId::builtin(key);
        if self.vars.declared_kind(&var).is_none() {
            self.vars.declare(var.clone(), Value::Double(value.unwrap_or(0.0)));
        }
        if let Some(v) = value {
            let _ = self.vars.set(&var, Value::Double(v));
        }
    }

    fn eval_in_scene(&self, scene_id: SceneId, op: OpId, ctx: &EvalContext) -> (Result<Value, EvalError>, FxHashSet<VarId>) {
        let Some(scene) = self.tree.get(scene_id) else {
            return (Err(EvalError::UnattachedScene(scene_id)), FxHashSet::default());
        };
        let ops = scene.ops.clone();
        let mut resolver = GraphResolver { tree: &self.tree, vars: &self.vars, reads: FxHashSet::default() };
        let result = {
            let mut evaluator = Evaluator::new(scene_id, &ops, ctx, &mut resolver);
            evaluator.evaluate(op)
        };
        (result, resolver.reads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boldui_eval::TimeSnapshot;
    use boldui_protocol::{A2RUpdateScene, HandlerBlock, HandlerCmd, OpsOperation, SceneAttr, Watch};

    fn ctx(t: f64) -> EvalContext {
        EvalContext::new(TimeSnapshot::default_for_test(t), 640, 480)
    }

    #[test]
    fn cross_scene_var_read_sees_updated_value() {
        let mut graph = SceneGraph::new();

        let mut scene_a = A2RUpdateScene::new(SceneId(1));
        scene_a.var_decls.insert("x".into(), Value::Sint64(10));
        graph.install_scene(scene_a);
        graph.reparent(SceneId(1), ReparentTarget::Root).unwrap();

        let mut scene_b = A2RUpdateScene::new(SceneId(2));
        scene_b.ops.push(OpsOperation::Var(VarId::new(SceneId(1), "x")));
        graph.install_scene(scene_b);
        graph.reparent(SceneId(2), ReparentTarget::Root).unwrap();

        let (v, _) = graph.eval_in_scene(SceneId(2), OpId::new(SceneId(2), 0), &ctx(0.0));
        assert_eq!(v.unwrap(), Value::Sint64(10));

        graph.vars.set(&VarId::new(SceneId(1), "x"), Value::Sint64(20)).unwrap();
        let (v, _) = graph.eval_in_scene(SceneId(2), OpId::new(SceneId(2), 0), &ctx(0.0));
        assert_eq!(v.unwrap(), Value::Sint64(20));
    }

    #[test]
    fn watch_fires_once_then_blocks_until_ack() {
        let mut graph = SceneGraph::new();
        let mut scene = A2RUpdateScene::new(SceneId(1));
        // Install happens at t=100.0 (spec S3); start_time must reflect the
        // install time or the condition (GetTime > start_time + 1.0) is
        // already truthy on the very first flush.
        scene.var_decls.insert("start_time".into(), Value::Double(100.0));
        scene.ops.push(OpsOperation::Var(VarId::new(SceneId(1), "start_time"))); // 0
        scene.ops.push(OpsOperation::GetTime); // 1
        scene.ops.push(OpsOperation::Value(Value::Double(1.0))); // 2
        scene.ops.push(OpsOperation::Add(OpId::new(SceneId(1), 0), OpId::new(SceneId(1), 2))); // 3
        scene.ops.push(OpsOperation::GreaterThan(OpId::new(SceneId(1), 1), OpId::new(SceneId(1), 3))); // 4
        scene.attrs.insert(SceneAttr::WindowId, OpId::NULL);
        scene.watches.push(Watch {
            condition: OpId::new(SceneId(1), 4),
            handler: HandlerBlock::new(vec![], vec![HandlerCmd::Reply { path: "/tick".into(), params: vec![] }]),
            wait_for_roundtrip: true,
            wait_for_rebuild: false,
        });
        graph.install_scene(scene);
        graph.reparent(SceneId(1), ReparentTarget::Root).unwrap();

        let (replies, _) = graph.flush_watches(&ctx(100.0));
        assert!(replies.is_empty());

        let (replies, _) = graph.flush_watches(&ctx(101.5));
        assert_eq!(replies.len(), 1);

        let (replies, _) = graph.flush_watches(&ctx(200.0));
        assert!(replies.is_empty(), "watch must not refire without an ack");

        graph.ack_watch(SceneId(1), 0);
        let (replies, _) = graph.flush_watches(&ctx(200.0));
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn disconnect_cleans_up_variables_and_watch_state() {
        let mut graph = SceneGraph::new();
        let mut scene = A2RUpdateScene::new(SceneId(1));
        scene.var_decls.insert("count".into(), Value::Sint64(0));
        graph.install_scene(scene);
        graph.reparent(SceneId(1), ReparentTarget::Root).unwrap();
        graph.reparent(SceneId(1), ReparentTarget::Disconnect).unwrap();
        assert_eq!(graph.vars().get(&VarId::new(SceneId(1), "count")), None);
    }
}
