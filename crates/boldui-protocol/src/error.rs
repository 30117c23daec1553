//! Protocol- and schema-level error taxonomy.

use std::fmt;

use crate::OpId;

/// Transport/framing failures — fatal, the connection is closed (spec §7
/// "ProtocolError").
#[derive(Debug)]
#[non_exhaustive]
pub enum CodecError {
    Io(std::io::Error),
    BadMagic { expected: Vec<u8>, got: Vec<u8> },
    VersionMismatch { min_major: u16, max_major: u16, have_major: u16 },
    Decode(String),
    Encode(String),
    FrameTooLarge(usize),
}
impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "io error: {e}"),
            CodecError::BadMagic { .. } => write!(f, "missing or invalid magic preamble"),
            CodecError::VersionMismatch { min_major, max_major, have_major } => write!(
                f,
                "incompatible protocol version: have major {have_major}, peer requires [{min_major}, {max_major}]"
            ),
            CodecError::Decode(e) => write!(f, "failed to decode frame: {e}"),
            CodecError::Encode(e) => write!(f, "failed to encode frame: {e}"),
            CodecError::FrameTooLarge(n) => write!(f, "frame of {n} bytes exceeds u32 length prefix"),
        }
    }
}
impl std::error::Error for CodecError {}

/// Scene-local structural violations — the offending scene is rejected but
/// the connection survives.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchemaError {
    OpIdOutOfRange { op: OpId, scene_len: u32 },
    UnknownVar(crate::VarId),
    TypeMismatch { var: crate::VarId, expected: crate::ValueKind, got: crate::ValueKind },
    CycleInExpressionDag { op: OpId },
    ReparentIntoDescendant { scene: crate::SceneId, target: crate::SceneId },
    UnattachedForeignScene { scene: crate::SceneId },
}
impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::OpIdOutOfRange { op, scene_len } => {
                write!(f, "op {op} is out of range for a scene with {scene_len} ops")
            }
            SchemaError::UnknownVar(v) => write!(f, "unknown variable {v}"),
            SchemaError::TypeMismatch { var, expected, got } => {
                write!(f, "variable {var} declared as {expected:?}, written as {got:?}")
            }
            SchemaError::CycleInExpressionDag { op } => write!(f, "cycle in expression DAG at {op}"),
            SchemaError::ReparentIntoDescendant { scene, target } => {
                write!(f, "cannot reparent {scene} under its own descendant {target}")
            }
            SchemaError::UnattachedForeignScene { scene } => {
                write!(f, "cross-scene op references unattached scene {scene}")
            }
        }
    }
}
impl std::error::Error for SchemaError {}

impl SchemaError {
    /// Converts a schema violation into the wire `Error` message (spec §7:
    /// "send Error with code 1").
    pub fn to_wire_error(&self) -> crate::Error {
        crate::Error::new(crate::Error::SCHEMA, self.to_string())
    }
}
