//! Message grammar for the R2A / A2R / R2EA / EA2R channels.

use serde::{Deserialize, Serialize};
use zng_txt::Txt;

use crate::{A2RUpdateScene, HandlerBlock, ResourceId, Value};

/// An application-level error, either sent over the wire (spec §7
/// `SchemaError`/`UserError` reporting) or carried internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    pub code: u64,
    pub text: Txt,
}
impl Error {
    pub fn new(code: u64, text: impl Into<Txt>) -> Self {
        Error { code, text: text.into() }
    }
    /// Error code reserved for "handler/view not found at this path".
    pub const NOT_FOUND: u64 = 1;
    /// Error code reserved for scene-level schema violations.
    pub const SCHEMA: u64 = 2;
}

/// A streamed chunk of a resource (image/font) payload (spec §6
/// "Resources"). A resource is ready once received chunk lengths sum to the
/// declared total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChunk {
    pub id: ResourceId,
    pub offset: u32,
    /// Total resource length in bytes, carried by the first chunk
    /// (`offset == 0`); ignored on subsequent chunks.
    pub total_len: u32,
    pub data: Vec<u8>,
}

/// A request that the renderer spawn/attach an out-of-process widget over
/// the external-app channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAppRequest {
    pub scene_id: crate::SceneId,
    pub uri: Txt,
}

/// One reply batched into an `R2AUpdate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub path: Txt,
    pub params: Vec<Value>,
}

/// Renderer → application update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct R2AUpdate {
    pub replies: Vec<Reply>,
}

/// Renderer → application: a URI was opened (user navigation, or a
/// handler's `Open` command looping back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct R2AOpen {
    pub path: Txt,
}

/// Renderer → application wire message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum R2AMessage {
    Update(R2AUpdate),
    Open(R2AOpen),
    Error(Error),
}

/// Application → renderer: a batch of scene installs, handler-block runs,
/// and resource updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct A2RUpdate {
    pub updated_scenes: Vec<A2RUpdateScene>,
    pub run_blocks: Vec<HandlerBlock>,
    pub resource_chunks: Vec<ResourceChunk>,
    pub resource_deallocs: Vec<ResourceId>,
    pub external_app_requests: Vec<ExternalAppRequest>,
}

/// Application → renderer wire message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum A2RMessage {
    Update(A2RUpdate),
    Error(Error),
    /// An opaque pre-compressed envelope (spec §1 Non-goals: diff-based
    /// compression beyond this raw envelope is out of scope — the bytes
    /// are not interpreted by this crate).
    CompressedUpdate(Vec<u8>),
    /// Releases a `wait_for_roundtrip` watch (spec §3 "Watch", §4.H, §8
    /// invariant 6). Not named as its own dataclass in the retrieved source
    /// snapshot; added here because the application, not the renderer,
    /// is the one that sends it.
    WatchAck(WatchAck),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchAck {
    pub scene: crate::SceneId,
    pub watch_index: u32,
}

/// Out-of-process widget channel: renderer → external app (spec §4.E
/// "R2EA").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum R2EAMessage {
    Update(R2AUpdate),
    Open(R2AOpen),
    Error(Error),
}

/// Out-of-process widget channel: external app → renderer (spec §4.E
/// "EA2R").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EA2RMessage {
    Update(A2RUpdate),
    Error(Error),
    /// A GPU-shareable texture was created for the widget; the renderer
    /// passes the descriptor alongside a file descriptor over SCM_RIGHTS
    /// out of band, so only the texture id and dimensions
    /// travel in-band.
    CreatedExternalWidget { texture_info: TextureInfo },
    /// An update the external app pushed without the renderer asking
    /// (e.g. its own internal animation), keyed by frame id so the
    /// renderer can de-duplicate.
    SpontaneousUpdate { frame_id: u64, update: A2RUpdate },
    /// Acknowledges that a previously sent `A2RUpdate` was applied.
    UpdateHandled { frame_id: u64 },
}

/// Dimensions of a shared GPU texture handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}
