//! The BoldUI wire protocol: the tagged [`Value`] union, the expression DAG
//! node set ([`OpsOperation`]), the scene-graph data model, the message
//! grammar, and the bincode framing shared by application and renderer
//! processes.

mod codec;
mod error;
mod ids;
mod message;
mod op;
mod scene;
mod value;

pub use codec::{
    negotiate, read_frame, read_magic, skip_extra, write_frame, A2RHelloResponse, R2AHello, A2R_MAGIC, EA2R_MAGIC,
    LATEST_MAJOR_VER, LATEST_MINOR_VER, R2A_MAGIC, R2EA_MAGIC,
};
pub use error::{CodecError, SchemaError};
pub use ids::{builtin_vars, OpId, ResourceId, SceneId, VarId};
pub use message::{
    A2RMessage, A2RUpdate, EA2RMessage, Error, ExternalAppRequest, R2AMessage, R2AOpen, R2AUpdate, R2EAMessage,
    Reply, ResourceChunk, TextureInfo, WatchAck,
};
pub use op::OpsOperation;
pub use scene::{
    A2RReparentScene, A2RUpdateScene, CmdsCommand, EventHandler, EventType, HandlerBlock, HandlerCmd, SceneAttr,
    Watch,
};
pub use value::{Color, Point, Rect, Value, ValueKind};
