//! Pointer-input matching against registered [`EventType`]s. The
//! walk-and-dispatch loop itself lives in [`crate::graph::SceneGraph`],
//! which owns the tree and the evaluator; this module only answers "does
//! this input match this handler's predicate" and "what context variables
//! does it publish".

use boldui_eval::InputCoords;
use boldui_protocol::EventType;

/// A single pointer input, already split into a kind and a position (spec
/// §4.I "Scroll events provide `:scroll_x`, `:scroll_y`... mouse events
/// provide `:mouse_x`/`:mouse_y` and/or `:click_x`/`:click_y`").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    MouseDown { x: f64, y: f64 },
    MouseUp { x: f64, y: f64 },
    MouseMove { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    Scroll { x: f64, y: f64 },
}

impl PointerEvent {
    fn position(&self) -> (f64, f64) {
        match *self {
            PointerEvent::MouseDown { x, y }
            | PointerEvent::MouseUp { x, y }
            | PointerEvent::MouseMove { x, y }
            | PointerEvent::Click { x, y }
            | PointerEvent::Scroll { x, y } => (x, y),
        }
    }

    /// Whether `event_type` is the predicate this event should be checked
    /// against.
    pub fn matches_kind(&self, event_type: &EventType) -> bool {
        matches!(
            (self, event_type),
            (PointerEvent::MouseDown { .. }, EventType::MouseDown(_))
                | (PointerEvent::MouseUp { .. }, EventType::MouseUp(_))
                | (PointerEvent::MouseMove { .. }, EventType::MouseMove(_))
                | (PointerEvent::Click { .. }, EventType::Click(_))
                | (PointerEvent::Scroll { .. }, EventType::Scroll(_))
        )
    }

    /// The built-in context variables this event publishes during dispatch
    ///.
    pub fn input_coords(&self) -> InputCoords {
        let (x, y) = self.position();
        let mut coords = InputCoords::default();
        match self {
            PointerEvent::Scroll { .. } => {
                coords.scroll_x = Some(x);
                coords.scroll_y = Some(y);
            }
            PointerEvent::Click { .. } => {
                coords.click_x = Some(x);
                coords.click_y = Some(y);
                coords.mouse_x = Some(x);
                coords.mouse_y = Some(y);
            }
            PointerEvent::MouseDown { .. } | PointerEvent::MouseUp { .. } | PointerEvent::MouseMove { .. } => {
                coords.mouse_x = Some(x);
                coords.mouse_y = Some(y);
            }
        }
        coords
    }

    /// Hit-test point, inclusive of the rect boundary.
    pub fn hits(&self, rect: &boldui_protocol::Rect) -> bool {
        let (x, y) = self.position();
        rect.contains(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_publishes_both_click_and_mouse_coords() {
        let coords = PointerEvent::Click { x: 1.0, y: 2.0 }.input_coords();
        assert_eq!(coords.click_x, Some(1.0));
        assert_eq!(coords.mouse_x, Some(1.0));
    }

    #[test]
    fn scroll_does_not_match_click_handler() {
        assert!(!PointerEvent::Scroll { x: 0.0, y: 0.0 }
            .matches_kind(&EventType::Click(boldui_protocol::OpId::NULL)));
    }

    #[test]
    fn hit_test_is_inclusive() {
        let rect = boldui_protocol::Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(PointerEvent::Click { x: 10.0, y: 10.0 }.hits(&rect));
        assert!(!PointerEvent::Click { x: 10.1, y: 0.0 }.hits(&rect));
    }
}
