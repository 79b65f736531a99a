//! Control surface interface boundary. GPIO debouncing and the physical
//! buttons/touch sensor are out of scope; this module only defines the
//! edge shape a real driver would produce and a couple of inert/demo
//! implementations.

/// A single debounced edge from the control surface. Pull-up buttons
/// (MODE, ACTION, LEFT/PAUSE, RIGHT/CLEAR) fire on active-low press;
/// the pull-down touch sensor fires on active-high touch. Debouncing
/// itself happens upstream of this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEdge {
    Mode,
    Action,
    Left,
    Right,
    Touch,
}

pub trait ControlSurface: Send {
    /// Return any edges observed since the last poll. Called at ~20 Hz.
    fn poll(&mut self) -> Vec<ControlEdge>;
}

/// A control surface that never produces an edge. Used when no
/// hardware or demo surface is wired up (e.g. embedding the engine as a
/// library and driving it programmatically instead).
pub struct NullControlSurface;

impl ControlSurface for NullControlSurface {
    fn poll(&mut self) -> Vec<ControlEdge> {
        Vec::new()
    }
}

/// A programmable surface for tests: edges are queued and drained on
/// each `poll`.
#[derive(Default)]
pub struct QueuedControlSurface {
    queue: Vec<ControlEdge>,
}

impl QueuedControlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edge: ControlEdge) {
        self.queue.push(edge);
    }
}

impl ControlSurface for QueuedControlSurface {
    fn poll(&mut self) -> Vec<ControlEdge> {
        std::mem::take(&mut self.queue)
    }
}
