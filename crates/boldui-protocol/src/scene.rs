//! Scene-graph data model: commands, watches, event handlers, handler
//! blocks, and the scene itself.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use zng_txt::Txt;

use crate::{OpId, SceneId, Value};

/// A drawing command, executed in order against the rasteriser; only the
/// command shape is specified here, not the rasteriser itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CmdsCommand {
    Clear(OpId),
    DrawRect { paint: OpId, rect: OpId },
    DrawRoundRect { paint: OpId, rect: OpId, radius: OpId },
    DrawCenteredText { text: OpId, paint: OpId, center: OpId },
    DrawImage { res: OpId, top_left: OpId },
}

/// `A2RUpdateScene.attrs` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SceneAttr {
    WindowTitle,
    WindowId,
    Uri,
    Size,
    Transform,
}

/// A scene-scoped condition that runs a handler block when it transitions
/// from non-truthy to truthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watch {
    pub condition: OpId,
    pub handler: HandlerBlock,
    /// Blocks re-firing until an explicit `WatchAck` (or, if
    /// `wait_for_rebuild` is also set, the next scene re-install) is
    /// received.
    pub wait_for_roundtrip: bool,
    /// Only meaningful combined with `wait_for_roundtrip`: a fresh
    /// `A2RUpdateScene` for the owning scene also releases the block.
    pub wait_for_rebuild: bool,
}

/// Predicates under which an event handler runs; `rect` is re-evaluated on
/// every event so animated hit regions stay correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EventType {
    MouseDown(OpId),
    MouseUp(OpId),
    MouseMove(OpId),
    Click(OpId),
    Scroll(OpId),
}
impl EventType {
    pub fn rect(&self) -> OpId {
        match self {
            EventType::MouseDown(r)
            | EventType::MouseUp(r)
            | EventType::MouseMove(r)
            | EventType::Click(r)
            | EventType::Scroll(r) => *r,
        }
    }
}

/// A registered event handler: predicate, handler block, and the
/// `continue_handling` op evaluated after the handler runs to decide
/// whether dispatch should keep walking later handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHandler {
    pub event_type: EventType,
    pub handler: HandlerBlock,
    pub continue_handling: OpId,
}

/// A tree-topology edit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum A2RReparentScene {
    Inside(i64),
    After(i64),
    Root,
    Disconnect,
    Hide,
}

/// An imperative program run in response to an event/watch/reply. Its
/// `ops` form a mini-scene with id 0: `OpId`s with `scene_id == 0` inside a
/// handler block address this array, not the owning scene's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HandlerBlock {
    pub ops: Vec<crate::OpsOperation>,
    pub cmds: Vec<HandlerCmd>,
}
impl HandlerBlock {
    pub fn new(ops: Vec<crate::OpsOperation>, cmds: Vec<HandlerCmd>) -> Self {
        HandlerBlock { ops, cmds }
    }
}

/// One imperative command inside a [`HandlerBlock`]. Side effects run in
/// strictly the declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum HandlerCmd {
    Nop,
    AllocateWindowId,
    ReparentScene { scene: OpId, to: A2RReparentScene },
    SetVar { var: crate::VarId, value: OpId },
    SetVarByRef { var: OpId, value: OpId },
    DebugMessage(Txt),
    Reply { path: Txt, params: Vec<OpId> },
    Open(Txt),
    If { cond: OpId, then: Box<HandlerCmd>, or_else: Box<HandlerCmd> },
}

/// A complete scene: expression ops, draw commands, variable declarations,
/// watches, and event handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2RUpdateScene {
    pub id: SceneId,
    pub attrs: BTreeMap<SceneAttr, OpId>,
    pub ops: Vec<crate::OpsOperation>,
    pub cmds: Vec<CmdsCommand>,
    pub var_decls: FxHashMap<Txt, Value>,
    pub watches: Vec<Watch>,
    pub event_handlers: Vec<EventHandler>,
}
impl A2RUpdateScene {
    pub fn new(id: SceneId) -> Self {
        A2RUpdateScene {
            id,
            attrs: BTreeMap::new(),
            ops: Vec::new(),
            cmds: Vec::new(),
            var_decls: FxHashMap::default(),
            watches: Vec::new(),
            event_handlers: Vec::new(),
        }
    }

    /// Invariant 1: every local `OpId` must be in range.
    pub fn validate_local_op_ranges(&self) -> Result<(), crate::SchemaError> {
        let len = self.ops.len() as u32;
        let check = |op: OpId| -> Result<(), crate::SchemaError> {
            if op.scene_id == self.id && op.index >= len {
                return Err(crate::SchemaError::OpIdOutOfRange { op, scene_len: len });
            }
            Ok(())
        };
        for op in &self.ops {
            for operand in op.operands() {
                check(operand)?;
            }
        }
        for cmd in &self.cmds {
            match cmd {
                CmdsCommand::Clear(c) => check(*c)?,
                CmdsCommand::DrawRect { paint, rect } => {
                    check(*paint)?;
                    check(*rect)?;
                }
                CmdsCommand::DrawRoundRect { paint, rect, radius } => {
                    check(*paint)?;
                    check(*rect)?;
                    check(*radius)?;
                }
                CmdsCommand::DrawCenteredText { text, paint, center } => {
                    check(*text)?;
                    check(*paint)?;
                    check(*center)?;
                }
                CmdsCommand::DrawImage { res, top_left } => {
                    check(*res)?;
                    check(*top_left)?;
                }
            }
        }
        for watch in &self.watches {
            check(watch.condition)?;
        }
        for eh in &self.event_handlers {
            check(eh.event_type.rect())?;
            check(eh.continue_handling)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpsOperation;

    #[test]
    fn out_of_range_local_op_is_rejected() {
        let mut scene = A2RUpdateScene::new(SceneId(1));
        scene.ops.push(OpsOperation::Value(Value::Sint64(1)));
        scene.cmds.push(CmdsCommand::Clear(OpId::new(SceneId(1), 5)));
        assert!(matches!(
            scene.validate_local_op_ranges(),
            Err(crate::SchemaError::OpIdOutOfRange { .. })
        ));
    }

    #[test]
    fn in_range_local_op_is_accepted() {
        let mut scene = A2RUpdateScene::new(SceneId(1));
        scene.ops.push(OpsOperation::Value(Value::Sint64(1)));
        scene.cmds.push(CmdsCommand::Clear(OpId::new(SceneId(1), 0)));
        assert!(scene.validate_local_op_ranges().is_ok());
    }

    #[test]
    fn foreign_scene_op_is_not_range_checked_here() {
        let mut scene = A2RUpdateScene::new(SceneId(1));
        scene.cmds.push(CmdsCommand::Clear(OpId::new(SceneId(99), 1000)));
        assert!(scene.validate_local_op_ranges().is_ok());
    }
}
