//! Application-process facade over the BoldUI core crates.
//!
//! An application binary depends on this crate alone rather than reaching
//! into `boldui-protocol`/`boldui-eval`/`boldui-scene`/`boldui-app`
//! separately, the same way `zng`'s top-level crate re-exports its `zng-*`
//! crates as `zng::app`, `zng::var`, etc. behind one dependency.

pub use boldui_protocol as protocol;

pub mod eval {
    //! Pure expression evaluation and per-scene variable storage.
    pub use boldui_eval::*;
}

pub mod scene {
    //! Renderer-side scene tree, watch engine, event dispatcher and
    //! handler-block interpreter.
    pub use boldui_scene::*;
}

pub mod app {
    //! Application-side session protocol: URI dispatch, view/reply
    //! handlers, the scene builder, and the stdio transport loop.
    pub use boldui_app::*;
}

pub use boldui_app::{BoldUiApplication, RunnerConfig};
pub use boldui_protocol::{
    A2RReparentScene, A2RUpdate, A2RUpdateScene, CmdsCommand, Color, EventHandler, EventType, HandlerBlock,
    HandlerCmd, OpId, OpsOperation, Point, Rect, SceneAttr, SceneId, Value, VarId, Watch,
};
