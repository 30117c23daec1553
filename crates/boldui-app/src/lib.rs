//! Application-side session protocol: URI dispatch by path,
//! view/reply handler registries, the op-allocating scene builder, dirty
//! re-render propagation, and the stdio transport loop a host binary drives.
//!
//! [`BoldUiApplication`] is the thing a `fn main` actually holds; the
//! individual pieces (`Dispatcher`, `CurrentScene`, `SessionStore`) are
//! exposed too for callers that want to drive the session layer without the
//! stdio loop, e.g. to embed it behind a different transport.

mod app;
mod current_scene;
mod dispatch;
mod error;
mod session;
mod session_store;
mod uri;

pub use app::{setup_logging, BoldUiApplication, RunnerConfig};
pub use current_scene::{ClientSide, CurrentScene};
pub use dispatch::{Dispatcher, ReplyHandler, StateFactory, ViewHandler};
pub use error::UserError;
pub use session::Session;
pub use session_store::{MemorySessionStore, SessionStore};
pub use uri::{parse_relative_path, ParsedUri};
