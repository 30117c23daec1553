//! Renderer-side scene state: the tree, the watch engine, resource
//! reassembly, pointer-event dispatch and the handler-block interpreter.
//!
//! [`SceneGraph`] is the thing an application loop actually holds; the
//! individual modules are exposed too so a caller that only needs, say, the
//! reparenting engine in isolation (as `boldui-app`'s tests do) can use it
//! without going through the whole graph.

mod event;
mod graph;
mod install;
mod interpreter;
mod resources;
mod tree;
mod watch;

pub use event::PointerEvent;
pub use graph::SceneGraph;
pub use install::install_scene;
pub use interpreter::{run_handler_block, HandlerOutcome};
pub use resources::{ChunkOutcome, ResourceStore};
pub use tree::{ReparentTarget, SceneTree};
pub use watch::{WatchEngine, WatchKey, MAX_SETTLE_ROUNDS};
