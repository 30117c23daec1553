//! The ambient evaluation context: window size, a single time snapshot per
//! pass, and the input coordinates exposed during event dispatch (spec
//! §4.B, §6 "Built-in variables").

use std::time::{Duration, Instant};

/// A monotonic clock snapshot, taken once per evaluation pass so that every
/// `GetTime` read within the pass agrees (spec §4.B "Time evaluations
/// within one evaluation pass must be consistent").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSnapshot(Duration);
impl TimeSnapshot {
    pub fn seconds(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Builds a fixed snapshot for tests that need a deterministic time
    /// value rather than a real clock reading. Not `#[cfg(test)]`: other
    /// workspace crates' test modules (a separate compilation unit) need it
    /// too, and that gate only survives within the defining crate's own
    /// test build.
    pub fn default_for_test(seconds: f64) -> Self {
        TimeSnapshot(Duration::from_secs_f64(seconds))
    }
}

/// Hands out [`TimeSnapshot`]s relative to an implementation-chosen epoch
/// (spec §4.B: "`GetTime` returns seconds since an implementation-chosen
/// epoch, monotonically").
#[derive(Debug)]
pub struct Clock {
    epoch: Instant,
}
impl Default for Clock {
    fn default() -> Self {
        Clock { epoch: Instant::now() }
    }
}
impl Clock {
    pub fn snapshot(&self) -> TimeSnapshot {
        TimeSnapshot(self.epoch.elapsed())
    }
}

/// Input coordinates only populated during event dispatch (spec §4.I:
/// "Scroll events provide `:scroll_x`, `:scroll_y`... mouse events provide
/// `:mouse_x`/`:mouse_y` and/or `:click_x`/`:click_y`").
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputCoords {
    pub mouse_x: Option<f64>,
    pub mouse_y: Option<f64>,
    pub click_x: Option<f64>,
    pub click_y: Option<f64>,
    pub scroll_x: Option<f64>,
    pub scroll_y: Option<f64>,
}

/// Everything an evaluation pass needs besides the scene's own ops and the
/// variable store (spec §4.B "Operates on one scene's ops array plus an
/// ambient context and the external variable store").
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub time: TimeSnapshot,
    pub width: i64,
    pub height: i64,
    pub input: InputCoords,
}
impl EvalContext {
    pub fn new(time: TimeSnapshot, width: i64, height: i64) -> Self {
        EvalContext { time, width, height, input: InputCoords::default() }
    }

    pub fn with_input(mut self, input: InputCoords) -> Self {
        self.input = input;
        self
    }
}
