//! Scene/op/variable identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use zng_txt::Txt;

/// Identifies a scene within the attached scene tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub u32);
impl SceneId {
    /// Scene id 0 is reserved for handler-block-local ops.
    pub const HANDLER_LOCAL: SceneId = SceneId(0);
}
impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Addresses one node in a scene's expression DAG: the scene it belongs to
/// plus its index within that scene's `ops` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId {
    pub scene_id: SceneId,
    pub index: u32,
}
impl OpId {
    pub const fn new(scene_id: SceneId, index: u32) -> Self {
        OpId { scene_id, index }
    }

    /// The sentinel op id meaning "no op", used where a command field is
    /// optional (e.g. an `If` with no `continue_handling`).
    pub const NULL: OpId = OpId { scene_id: SceneId(0), index: u32::MAX };

    pub fn is_null(&self) -> bool {
        *self == OpId::NULL
    }

    /// Whether this op lives in the scene currently being evaluated/built.
    pub fn is_local_to(&self, scene: SceneId) -> bool {
        self.scene_id == scene
    }
}
impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scene_id, self.index)
    }
}

/// A string key scoped to a scene, or a `:`-prefixed built-in context
/// variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId {
    pub scene: SceneId,
    pub key: Txt,
}
impl VarId {
    pub fn new(scene: SceneId, key: impl Into<Txt>) -> Self {
        VarId { scene, key: key.into() }
    }

    /// Built-in context variables are not scoped to any one scene; they're
    /// addressed with `scene = SceneId(0)` and a `:`-prefixed key.
    pub fn builtin(key: &'static str) -> Self {
        debug_assert!(key.starts_with(':'), "built-in VarId keys must start with ':'");
        VarId { scene: SceneId(0), key: Txt::from(key) }
    }

    pub fn is_builtin(&self) -> bool {
        self.key.starts_with(':')
    }
}
impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_builtin() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}/{}", self.scene, self.key)
        }
    }
}

/// Built-in context variable names.
pub mod builtin_vars {
    pub const WIDTH: &str = ":width";
    pub const HEIGHT: &str = ":height";
    pub const MOUSE_X: &str = ":mouse_x";
    pub const MOUSE_Y: &str = ":mouse_y";
    pub const CLICK_X: &str = ":click_x";
    pub const CLICK_Y: &str = ":click_y";
    pub const SCROLL_X: &str = ":scroll_x";
    pub const SCROLL_Y: &str = ":scroll_y";
    pub const WINDOW_ID: &str = ":window_id";
}

/// An opaque resource handle (images, fonts) referenced by draw commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);
