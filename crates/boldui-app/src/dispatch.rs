//! Session lookup/minting, view/reply handler registries, and dirty
//! re-render propagation.

use rustc_hash::FxHashMap;
use zng_txt::Txt;

use boldui_protocol::{
    A2RReparentScene, A2RUpdate, A2RUpdateScene, HandlerBlock, HandlerCmd, OpId, OpsOperation, R2AOpen, R2AUpdate,
    SceneId, Value, VarId, WatchAck,
};

use crate::current_scene::CurrentScene;
use crate::error::UserError;
use crate::session::Session;
use crate::session_store::SessionStore;
use crate::uri::parse_relative_path;

/// Builds a scene's contents; registered under a URI path (spec §4.F "view
/// handlers (path → handler+state-factory)").
pub type ViewHandler<S> = Box<dyn Fn(&mut CurrentScene, &mut S) + Send + Sync>;
/// Constructs a brand new session's model the first time its path is opened
/// without a durable-store hit.
pub type StateFactory<S> = Box<dyn Fn() -> S + Send + Sync>;
/// Handles one `Reply` path, mutating the session model in place. Returns
/// the [`WatchAck`] to send back if this reply is acknowledging a
/// `wait_for_roundtrip` watch — most reply
/// handlers return `None`.
pub type ReplyHandler<S> = Box<dyn Fn(&mut S, Vec<Value>) -> Option<WatchAck> + Send + Sync>;

struct ViewRegistration<S> {
    handler: ViewHandler<S>,
    state_factory: StateFactory<S>,
}

/// Owns every registered handler plus live session/scene bookkeeping, and
/// turns `R2AOpen`/`R2AUpdate` into the `A2RUpdate`s to send back.
pub struct Dispatcher<S> {
    views: FxHashMap<Txt, ViewRegistration<S>>,
    replies: FxHashMap<Txt, ReplyHandler<S>>,
    sessions: FxHashMap<Txt, Session<S>>,
    scene_owner: FxHashMap<SceneId, Txt>,
    store: Box<dyn SessionStore<S>>,
    next_scene_id: u32,
}

impl<S: Clone> Dispatcher<S> {
    pub fn new(store: Box<dyn SessionStore<S>>) -> Self {
        Dispatcher {
            views: FxHashMap::default(),
            replies: FxHashMap::default(),
            sessions: FxHashMap::default(),
            scene_owner: FxHashMap::default(),
            store,
            // Scene id 0 is reserved for handler-block-local ops.
            next_scene_id: 1,
        }
    }

    pub fn register_view(&mut self, path: impl Into<Txt>, handler: ViewHandler<S>, state_factory: StateFactory<S>) {
        self.views.insert(path.into(), ViewRegistration { handler, state_factory });
    }

    pub fn register_reply(&mut self, path: impl Into<Txt>, handler: ReplyHandler<S>) {
        self.replies.insert(path.into(), handler);
    }

    fn alloc_scene_id(&mut self) -> SceneId {
        let id = SceneId(self.next_scene_id);
        self.next_scene_id += 1;
        id
    }

    /// Handles a renderer-initiated (or handler-looped-back) `Open` (spec
    /// §4.F "On R2AOpen").
    pub fn handle_open(&mut self, open: R2AOpen) -> Result<A2RUpdate, UserError> {
        let parsed = parse_relative_path(&open.path);
        let view_path: Txt = parsed.segments.join("/").into();
        let registration = self.views.get(&view_path).ok_or_else(|| UserError::ViewNotFound(view_path.clone()))?;

        let session_id = parsed.session.unwrap_or_else(|| Txt::from(uuid::Uuid::new_v4().to_string()));
        if !self.sessions.contains_key(&session_id) {
            let state = self.store.load(&session_id).unwrap_or_else(|| (registration.state_factory)());
            self.sessions.insert(session_id.clone(), Session::new(session_id.clone(), state));
        }

        let scene_id = self.alloc_scene_id();
        self.scene_owner.insert(scene_id, session_id.clone());
        let session = self.sessions.get_mut(&session_id).expect("just inserted");
        session.add_scene(scene_id, view_path.clone());

        let registration = self.views.get(&view_path).expect("checked above");
        let mut current = CurrentScene::new(scene_id);
        (registration.handler)(&mut current, &mut session.state);
        let scene = current.finish();

        self.store.save(&session_id, &session.state);
        let mut update = Self::reparent_to_root(scene.clone());
        // Bind client-side model fields to their VarIds (spec §4.F "emitting
        // initial SetVar run-block to publish defaults").
        if let Some(publish) = publish_vars_run_block(&scene) {
            update.run_blocks.push(publish);
        }
        Ok(update)
    }

    /// Handles a batch of replies from one `R2AUpdate` (spec §4.F "On
    /// R2AUpdate.reply"): dispatches each by path, then conservatively
    /// re-emits every scene belonging to a session any reply touched. The
    /// second element of the result is the `WatchAck`s any reply handler
    /// produced, in reply order, for the caller to flush onto the wire
    /// ahead of the `A2RUpdate`.
    pub fn handle_update(&mut self, update: R2AUpdate) -> Result<(A2RUpdate, Vec<WatchAck>), UserError> {
        let mut dirty_sessions = Vec::new();
        let mut acks = Vec::new();
        for reply in update.replies {
            let handler = self.replies.get(&reply.path).ok_or_else(|| UserError::ReplyNotFound(reply.path.clone()))?;
            let scene_id = first_scene_id_hint(&reply.params);
            let session_id = match scene_id.and_then(|id| self.scene_owner.get(&id)) {
                Some(id) => id.clone(),
                // Replies aren't scene-addressed on the wire (spec §4.E
                // `Reply{path, params}` has no scene field); a single-session
                // deployment is the common case, so fall back to the only
                // session if there's exactly one.
                None if self.sessions.len() == 1 => self.sessions.keys().next().expect("len == 1").clone(),
                None => continue,
            };
            if let Some(session) = self.sessions.get_mut(&session_id) {
                if let Some(ack) = handler(&mut session.state, reply.params) {
                    acks.push(ack);
                }
                session.mark_dirty();
                if !dirty_sessions.contains(&session_id) {
                    dirty_sessions.push(session_id);
                }
            }
        }

        let mut out = A2RUpdate::default();
        for session_id in dirty_sessions {
            let Some(session) = self.sessions.get_mut(&session_id) else { continue };
            self.store.save(&session_id, &session.state);
            let scenes = session.scenes.clone();
            for (scene_id, view_path) in scenes {
                let Some(registration) = self.views.get(&view_path) else { continue };
                let mut current = CurrentScene::new(scene_id);
                (registration.handler)(&mut current, &mut session.state);
                let scene = current.finish();
                // The re-declared default is discarded by the renderer's
                // live-value preservation (§3 invariant 2), so the model's
                // new value must be pushed explicitly via SetVar or the
                // renderer never observes it (spec §4.F).
                if let Some(publish) = publish_vars_run_block(&scene) {
                    out.run_blocks.push(publish);
                }
                out.updated_scenes.push(scene);
            }
            session.clear_dirty();
        }
        Ok((out, acks))
    }

    /// Wraps a freshly built window scene in the `A2RUpdate` plus the
    /// reparent-to-root run-block `create_window` implies.
    fn reparent_to_root(scene: A2RUpdateScene) -> A2RUpdate {
        let run_block = HandlerBlock::new(
            vec![OpsOperation::Value(Value::Sint64(scene.id.0 as i64))],
            vec![HandlerCmd::ReparentScene {
                scene: OpId::new(SceneId::HANDLER_LOCAL, 0),
                to: A2RReparentScene::Root,
            }],
        );
        A2RUpdate { updated_scenes: vec![scene], run_blocks: vec![run_block], ..Default::default() }
    }
}

/// Builds the run-block that publishes a scene's declared variables to
/// their current values via `SetVar`, binding the client-side model fields
/// `declare_var` registered to their `VarId`s (spec §4.F "bind client-side
/// model fields to VarIds, emitting initial SetVar run-block to publish
/// defaults"). `None` if the scene declared no variables.
///
/// `install_scene` preserves a variable's live value across re-declaration
/// when its kind is unchanged (spec §3 invariant 2), so re-emitting a scene
/// with an updated default is not enough to move the renderer's copy — the
/// new value has to be pushed explicitly.
fn publish_vars_run_block(scene: &A2RUpdateScene) -> Option<HandlerBlock> {
    if scene.var_decls.is_empty() {
        return None;
    }
    let mut ops = Vec::new();
    let mut cmds = Vec::new();
    for (name, value) in &scene.var_decls {
        let op = OpId::new(SceneId::HANDLER_LOCAL, ops.len() as u32);
        ops.push(OpsOperation::Value(value.clone()));
        cmds.push(HandlerCmd::SetVar { var: VarId::new(scene.id, name.clone()), value: op });
    }
    Some(HandlerBlock::new(ops, cmds))
}

/// `Reply` params carry no scene field; when a reply's first
/// param happens to be the originating scene id (a convention this
/// dispatcher's own demos follow for multi-session disambiguation) this
/// recovers it, otherwise returns `None`.
fn first_scene_id_hint(params: &[Value]) -> Option<SceneId> {
    match params.first() {
        Some(Value::Sint64(id)) if *id >= 0 => Some(SceneId(*id as u32)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::MemorySessionStore;
    use boldui_protocol::Reply;

    fn dispatcher() -> Dispatcher<i64> {
        let mut d = Dispatcher::new(Box::new(MemorySessionStore::new()));
        d.register_view(
            "counter",
            Box::new(|scene, state| {
                let text = scene.const_int(*state);
                let paint = scene.const_color(boldui_protocol::Color::new(0, 0, 0, u16::MAX));
                let center = scene.const_point(boldui_protocol::Point::new(320.0, 240.0));
                scene.cmd_draw_centered_text(text, paint, center);
            }),
            Box::new(|| 0i64),
        );
        d.register_reply(
            "/inc",
            Box::new(|state, _params| {
                *state += 1;
                None
            }),
        );
        d
    }

    #[test]
    fn open_mints_a_session_and_runs_the_view_handler() {
        let mut d = dispatcher();
        let update = d.handle_open(R2AOpen { path: "/counter".into() }).unwrap();
        assert_eq!(update.updated_scenes.len(), 1);
        assert_eq!(update.run_blocks.len(), 1);
    }

    #[test]
    fn unregistered_view_is_not_found() {
        let mut d = dispatcher();
        let err = d.handle_open(R2AOpen { path: "/nope".into() }).unwrap_err();
        assert!(matches!(err, UserError::ViewNotFound(_)));
    }

    #[test]
    fn reply_marks_session_dirty_and_reruns_its_view() {
        let mut d = dispatcher();
        d.handle_open(R2AOpen { path: "/counter".into() }).unwrap();
        let (update, acks) =
            d.handle_update(R2AUpdate { replies: vec![Reply { path: "/inc".into(), params: vec![] }] }).unwrap();
        assert_eq!(update.updated_scenes.len(), 1);
        assert!(acks.is_empty());
    }

    fn bound_dispatcher() -> Dispatcher<i64> {
        let mut d = Dispatcher::new(Box::new(MemorySessionStore::new()));
        d.register_view(
            "counter",
            Box::new(|scene, state| {
                let _ = scene.declare_var("count", Value::Sint64(*state));
            }),
            Box::new(|| 0i64),
        );
        d.register_reply(
            "/inc",
            Box::new(|state, _params| {
                *state += 1;
                None
            }),
        );
        d
    }

    fn set_var_value<'a>(block: &'a HandlerBlock, name: &str) -> Option<&'a Value> {
        block.cmds.iter().find_map(|cmd| match cmd {
            HandlerCmd::SetVar { var, value } if var.key == name => {
                match block.ops.get(value.index as usize) {
                    Some(OpsOperation::Value(v)) => Some(v),
                    _ => None,
                }
            }
            _ => None,
        })
    }

    #[test]
    fn open_publishes_the_declared_variable_via_set_var() {
        let mut d = bound_dispatcher();
        let update = d.handle_open(R2AOpen { path: "/counter".into() }).unwrap();
        let publish = update.run_blocks.iter().find_map(|b| set_var_value(b, "count"));
        assert_eq!(publish, Some(&Value::Sint64(0)));
    }

    #[test]
    fn dirty_rerender_publishes_the_updated_model_value() {
        let mut d = bound_dispatcher();
        d.handle_open(R2AOpen { path: "/counter".into() }).unwrap();
        for _ in 0..3 {
            d.handle_update(R2AUpdate { replies: vec![Reply { path: "/inc".into(), params: vec![] }] }).unwrap();
        }
        let (update, _) =
            d.handle_update(R2AUpdate { replies: vec![Reply { path: "/inc".into(), params: vec![] }] }).unwrap();
        let publish = update.run_blocks.iter().find_map(|b| set_var_value(b, "count"));
        assert_eq!(publish, Some(&Value::Sint64(4)));
    }
}
