//! Application-level error taxonomy, hand-rolled in
//! the style of `zng-view-api`'s `ClipboardError`.

use std::fmt;

use zng_txt::Txt;

/// Errors the session/dispatch layer can hit while handling an `R2AOpen` or
/// an `R2AUpdate.reply`. Unlike [`boldui_protocol::CodecError`], these never
/// close the connection; they're reported back as a wire `Error` message.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum UserError {
    /// No view handler is registered for the opened path.
    ViewNotFound(Txt),
    /// A reply arrived for a path with no registered reply handler.
    ReplyNotFound(Txt),
    /// A reply or view re-render referenced a scene with no session
    /// ownership record (it was never opened, or the session already expired).
    UnknownScene(boldui_protocol::SceneId),
    Schema(boldui_protocol::SchemaError),
}
impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserError::ViewNotFound(path) => write!(f, "no view handler registered for path {path:?}"),
            UserError::ReplyNotFound(path) => write!(f, "no reply handler registered for path {path:?}"),
            UserError::UnknownScene(id) => write!(f, "scene {id} has no owning session"),
            UserError::Schema(e) => write!(f, "{e}"),
        }
    }
}
impl std::error::Error for UserError {}

impl From<boldui_protocol::SchemaError> for UserError {
    fn from(e: boldui_protocol::SchemaError) -> Self {
        UserError::Schema(e)
    }
}

impl UserError {
    /// Error code reserved for "handler/view not found at this path" (spec
    /// §7), reusing [`boldui_protocol::Error::NOT_FOUND`].
    pub fn to_wire_error(&self) -> boldui_protocol::Error {
        let code = match self {
            UserError::ViewNotFound(_) | UserError::ReplyNotFound(_) => boldui_protocol::Error::NOT_FOUND,
            UserError::UnknownScene(_) => boldui_protocol::Error::NOT_FOUND,
            UserError::Schema(_) => boldui_protocol::Error::SCHEMA,
        };
        boldui_protocol::Error::new(code, self.to_string())
    }
}
