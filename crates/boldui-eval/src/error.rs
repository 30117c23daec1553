//! Runtime evaluation failures: arithmetic errors and
//! missing resources evaluate to a defined "error value" rather than
//! terminating anything.

use std::fmt;

use boldui_protocol::{OpId, ValueKind};

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EvalError {
    BadOperand { op: OpId, reason: &'static str },
    DivisionByZero { op: OpId },
    TypeMismatch { op: OpId, expected: &'static str, got: ValueKind },
    UnknownVar(boldui_protocol::VarId),
    UnattachedScene(boldui_protocol::SceneId),
    CycleDetected { op: OpId },
    DepthLimitExceeded { op: OpId },
}
impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::BadOperand { op, reason } => write!(f, "bad operand at {op}: {reason}"),
            EvalError::DivisionByZero { op } => write!(f, "division by zero at {op}"),
            EvalError::TypeMismatch { op, expected, got } => {
                write!(f, "type mismatch at {op}: expected {expected}, got {got:?}")
            }
            EvalError::UnknownVar(v) => write!(f, "unknown variable {v}"),
            EvalError::UnattachedScene(s) => write!(f, "cross-scene read from unattached scene {s}"),
            EvalError::CycleDetected { op } => write!(f, "cycle in expression DAG at {op}"),
            EvalError::DepthLimitExceeded { op } => write!(f, "evaluation depth limit exceeded at {op}"),
        }
    }
}
impl std::error::Error for EvalError {}
