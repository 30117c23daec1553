//! The handler-block interpreter.
//!
//! `ops` evaluates once into a memo snapshot (scene id 0, a private
//! "mini-scene"), then `cmds` run strictly in the declared order against
//! that snapshot. Because the whole block runs synchronously to completion
//! before anything else gets a turn, no other code can observe a
//! partially-applied block: atomicity falls out of the single-threaded
//! cooperative scheduling model rather than needing an explicit
//! staging/rollback mechanism.

use rustc_hash::FxHashSet;
use zng_txt::Txt;

use boldui_eval::{EvalContext, Evaluator, SceneResolver, VariableStore};
use boldui_protocol::{
    A2RReparentScene, HandlerBlock, HandlerCmd, OpId, OpsOperation, Reply, SceneId, Value, VarId,
};

use crate::tree::{ReparentTarget, SceneTree};
use crate::watch::WatchKey;

/// Everything a handler block produced that the caller (the scene graph, or
/// ultimately the application loop) needs to act on beyond its direct
/// mutation of `tree`/`vars`.
#[derive(Default)]
pub struct HandlerOutcome {
    /// `Open` commands, in execution order — the renderer "loops these back"
    /// as if the user had navigated there.
    pub opens: Vec<Txt>,
    /// Scene ids minted by `AllocateWindowId`, in execution order, so the
    /// caller can splice them into whatever follow-up logic needed a fresh
    /// id for a window it's about to reparent to root.
    pub allocated_window_ids: Vec<SceneId>,
    /// Variables read while evaluating the block's own ops, for watch
    /// dependency tracking if this block is itself a watch's handler.
    pub read_vars: FxHashSet<VarId>,
    /// Watch subscribers unblocked by a `SetVar`/`SetVarByRef` in this
    /// block, for the caller to re-run through the watch engine.
    pub dirtied_watches: FxHashSet<WatchKey>,
}

/// Runs one handler block to completion. `replies_out` is an accumulator
/// rather than part of the return value so a caller running several blocks
/// in one batch (e.g. `A2RUpdate::run_blocks`) can flush them together into
/// a single `R2AUpdate`, batched and sent at block end.
pub fn run_handler_block(
    block: &HandlerBlock,
    tree: &mut SceneTree,
    vars: &mut VariableStore<WatchKey>,
    ctx: &EvalContext,
    alloc_window_id: &mut dyn FnMut() -> SceneId,
    replies_out: &mut Vec<Reply>,
) -> HandlerOutcome {
    let (memo, read_vars) = evaluate_all(block, tree, vars, ctx);
    let mut outcome = HandlerOutcome { read_vars, ..Default::default() };
    for cmd in &block.cmds {
        exec_cmd(cmd, &memo, tree, vars, alloc_window_id, replies_out, &mut outcome);
    }
    outcome
}

struct LocalResolver<'a> {
    tree: &'a SceneTree,
    vars: &'a VariableStore<WatchKey>,
    local_ops: &'a [OpsOperation],
    reads: FxHashSet<VarId>,
}
impl<'a> SceneResolver for LocalResolver<'a> {
    fn ops(&self, scene: SceneId) -> Option<&[OpsOperation]> {
        if scene == SceneId::HANDLER_LOCAL {
            Some(self.local_ops)
        } else {
            self.tree.get(scene).map(|s| s.ops.as_slice())
        }
    }
    fn var(&self, var: &VarId) -> Option<&Value> {
        self.vars.get(var)
    }
    fn record_var_read(&mut self, var: &VarId) {
        self.reads.insert(var.clone());
    }
    fn is_attached(&self, scene: SceneId) -> bool {
        scene == SceneId::HANDLER_LOCAL || self.tree.is_attached(scene)
    }
}

fn evaluate_all(
    block: &HandlerBlock,
    tree: &SceneTree,
    vars: &VariableStore<WatchKey>,
    ctx: &EvalContext,
) -> (Vec<Value>, FxHashSet<VarId>) {
    let mut resolver = LocalResolver { tree, vars, local_ops: &block.ops, reads: FxHashSet::default() };
    let mut memo = Vec::with_capacity(block.ops.len());
    {
        let mut evaluator = Evaluator::new(SceneId::HANDLER_LOCAL, &block.ops, ctx, &mut resolver);
        for idx in 0..block.ops.len() {
            let op = OpId::new(SceneId::HANDLER_LOCAL, idx as u32);
            let value = evaluator.evaluate(op).unwrap_or_else(|err| {
                tracing::warn!(%err, "handler block op failed to evaluate, substituting a default value");
                Value::Sint64(0)
            });
            memo.push(value);
        }
    }
    (memo, resolver.reads)
}

fn resolve(memo: &[Value], op: OpId) -> Value {
    memo.get(op.index as usize).cloned().unwrap_or(Value::Sint64(0))
}

fn exec_cmd(
    cmd: &HandlerCmd,
    memo: &[Value],
    tree: &mut SceneTree,
    vars: &mut VariableStore<WatchKey>,
    alloc_window_id: &mut dyn FnMut() -> SceneId,
    replies_out: &mut Vec<Reply>,
    outcome: &mut HandlerOutcome,
) {
    match cmd {
        HandlerCmd::Nop => {}
        HandlerCmd::AllocateWindowId => {
            outcome.allocated_window_ids.push(alloc_window_id());
        }
        HandlerCmd::ReparentScene { scene, to } => {
            let Value::Sint64(id) = resolve(memo, *scene) else {
                tracing::warn!("ReparentScene target did not evaluate to Sint64");
                return;
            };
            if let Err(err) = tree.reparent(SceneId(id as u32), to_reparent_target(to)) {
                tracing::warn!(%err, "reparent rejected");
            }
        }
        HandlerCmd::SetVar { var, value } => {
            let value = resolve(memo, *value);
            match vars.set(var, value) {
                Ok(subscribers) => outcome.dirtied_watches.extend(subscribers),
                Err(err) => tracing::warn!(%err, "SetVar rejected"),
            }
        }
        HandlerCmd::SetVarByRef { var, value } => match resolve(memo, *var) {
            Value::VarRef(var_id) => {
                let value = resolve(memo, *value);
                match vars.set(&var_id, value) {
                    Ok(subscribers) => outcome.dirtied_watches.extend(subscribers),
                    Err(err) => tracing::warn!(%err, "SetVarByRef rejected"),
                }
            }
            _ => tracing::warn!("SetVarByRef operand did not evaluate to a VarRef"),
        },
        HandlerCmd::DebugMessage(msg) => tracing::debug!(%msg, "handler block debug message"),
        HandlerCmd::Reply { path, params } => {
            let params = params.iter().map(|op| resolve(memo, *op)).collect();
            replies_out.push(Reply { path: path.clone(), params });
        }
        HandlerCmd::Open(path) => outcome.opens.push(path.clone()),
        HandlerCmd::If { cond, then, or_else } => {
            let branch = if resolve(memo, *cond).is_truthy() { then } else { or_else };
            exec_cmd(branch, memo, tree, vars, alloc_window_id, replies_out, outcome);
        }
    }
}

fn to_reparent_target(to: &A2RReparentScene) -> ReparentTarget {
    match *to {
        A2RReparentScene::Inside(id) => ReparentTarget::Inside(SceneId(id as u32)),
        A2RReparentScene::After(id) => ReparentTarget::After(SceneId(id as u32)),
        A2RReparentScene::Root => ReparentTarget::Root,
        A2RReparentScene::Disconnect => ReparentTarget::Disconnect,
        A2RReparentScene::Hide => ReparentTarget::Hide,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boldui_eval::TimeSnapshot;

    fn ctx() -> EvalContext {
        EvalContext::new(TimeSnapshot::default_for_test(100.0), 640, 480)
    }

    #[test]
    fn reply_params_resolve_against_block_local_ops() {
        let block = HandlerBlock::new(
            vec![OpsOperation::Value(Value::Sint64(7))],
            vec![HandlerCmd::Reply { path: "/inc".into(), params: vec![OpId::new(SceneId::HANDLER_LOCAL, 0)] }],
        );
        let mut tree = SceneTree::new();
        let mut vars = VariableStore::new();
        let mut replies = Vec::new();
        let mut next_id = 1u32;
        run_handler_block(&block, &mut tree, &mut vars, &ctx(), &mut || {
            next_id += 1;
            SceneId(next_id)
        }, &mut replies);
        assert_eq!(replies, vec![Reply { path: "/inc".into(), params: vec![Value::Sint64(7)] }]);
    }

    #[test]
    fn set_var_returns_dirtied_subscribers() {
        let mut tree = SceneTree::new();
        let mut vars = VariableStore::new();
        let var = VarId::new(SceneId(1), "count");
        vars.declare(var.clone(), Value::Sint64(0));
        vars.subscribe(var.clone(), (SceneId(1), 0));

        let block = HandlerBlock::new(
            vec![OpsOperation::Value(Value::Sint64(1))],
            vec![HandlerCmd::SetVar { var: var.clone(), value: OpId::new(SceneId::HANDLER_LOCAL, 0) }],
        );
        let mut replies = Vec::new();
        let outcome =
            run_handler_block(&block, &mut tree, &mut vars, &ctx(), &mut || SceneId(99), &mut replies);
        assert_eq!(vars.get(&var), Some(&Value::Sint64(1)));
        assert!(outcome.dirtied_watches.contains(&(SceneId(1), 0)));
    }

    #[test]
    fn if_command_runs_only_the_selected_branch() {
        let block = HandlerBlock::new(
            vec![OpsOperation::Value(Value::Sint64(1))],
            vec![HandlerCmd::If {
                cond: OpId::new(SceneId::HANDLER_LOCAL, 0),
                then: Box::new(HandlerCmd::Reply { path: "/then".into(), params: vec![] }),
                or_else: Box::new(HandlerCmd::Reply { path: "/else".into(), params: vec![] }),
            }],
        );
        let mut tree = SceneTree::new();
        let mut vars = VariableStore::new();
        let mut replies = Vec::new();
        run_handler_block(&block, &mut tree, &mut vars, &ctx(), &mut || SceneId(1), &mut replies);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].path.as_str(), "/then");
    }

    #[test]
    fn open_is_collected_for_the_caller_to_loop_back() {
        let block = HandlerBlock::new(vec![], vec![HandlerCmd::Open("/home".into())]);
        let mut tree = SceneTree::new();
        let mut vars = VariableStore::new();
        let mut replies = Vec::new();
        let outcome =
            run_handler_block(&block, &mut tree, &mut vars, &ctx(), &mut || SceneId(1), &mut replies);
        assert_eq!(outcome.opens, vec![Txt::from("/home")]);
    }
}
