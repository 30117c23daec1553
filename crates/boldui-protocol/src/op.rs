//! The expression DAG node set.

use serde::{Deserialize, Serialize};

use crate::{OpId, Value, VarId};

/// One node of a scene's expression DAG. Every variant is a pure function of
/// the evaluation context and its operand [`OpId`]s — evaluating the same op
/// twice within one pass must yield the same [`Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum OpsOperation {
    /// A literal, already-folded value.
    Value(Value),
    /// Reads the current value of a variable.
    Var(VarId),
    /// Seconds since an implementation-chosen epoch, monotonic and
    /// snapshotted once per evaluation pass.
    GetTime,
    /// `GetTime` saturated to `[low, high]`, not modular.
    GetTimeAndClamp(OpId, OpId),

    Add(OpId, OpId),
    Mul(OpId, OpId),
    Div(OpId, OpId),
    FloorDiv(OpId, OpId),
    Min(OpId, OpId),
    Max(OpId, OpId),
    Or(OpId, OpId),
    And(OpId, OpId),
    GreaterThan(OpId, OpId),
    Eq(OpId, OpId),
    /// Spec §9 Open Question 5: always supported alongside `Eq`.
    Neq(OpId, OpId),

    Neg(OpId),
    Abs(OpId),
    Sin(OpId),
    Cos(OpId),
    ToString(OpId),

    MakePoint(OpId, OpId),
    MakeRectFromPoints(OpId, OpId),
    MakeRectFromSides(OpId, OpId, OpId, OpId),
    MakeColor(OpId, OpId, OpId, OpId),

    /// Lazy: only the selected branch is evaluated.
    If(OpId, OpId, OpId),
}

impl OpsOperation {
    /// The direct operand [`OpId`]s of this op, in evaluation order. Used by
    /// the evaluator's dependency walk and by cycle detection.
    pub fn operands(&self) -> Vec<OpId> {
        use OpsOperation::*;
        match self {
            Value(_) | Var(_) | GetTime => vec![],
            GetTimeAndClamp(a, b) => vec![*a, *b],
            Add(a, b) | Mul(a, b) | Div(a, b) | FloorDiv(a, b) | Min(a, b) | Max(a, b) | Or(a, b) | And(a, b)
            | GreaterThan(a, b) | Eq(a, b) | Neq(a, b) | MakePoint(a, b) | MakeRectFromPoints(a, b) => vec![*a, *b],
            Neg(a) | Abs(a) | Sin(a) | Cos(a) | ToString(a) => vec![*a],
            MakeRectFromSides(a, b, c, d) | MakeColor(a, b, c, d) => vec![*a, *b, *c, *d],
            If(c, t, e) => vec![*c, *t, *e],
        }
    }
}
