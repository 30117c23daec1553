//! Pure expression evaluation and variable storage for BoldUI scenes.
//!
//! This crate has no notion of a scene *tree*, draw commands, or the wire
//! protocol — it only knows how to fold an [`boldui_protocol::OpsOperation`]
//! array down to a [`boldui_protocol::Value`] given a variable store and an
//! ambient [`EvalContext`]. The scene-graph crate supplies the
//! [`SceneResolver`] that stitches per-scene evaluators together.

mod context;
mod error;
mod eval;
mod vars;

pub use context::{Clock, EvalContext, InputCoords, TimeSnapshot};
pub use error::EvalError;
pub use eval::{Evaluator, SceneResolver};
pub use vars::VariableStore;
