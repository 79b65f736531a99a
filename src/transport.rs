//! Transport state as an atomic tagged value, so the Controller can CAS
//! IDLE -> non-IDLE as the single guard against a second Sequencer
//! thread racing the first.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Playing,
    Recording,
    PausedPlaying,
    PausedRecording,
}

impl TransportState {
    fn encode(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Playing => 1,
            Self::Recording => 2,
            Self::PausedPlaying => 3,
            Self::PausedRecording => 4,
        }
    }

    fn decode(value: u8) -> Self {
        match value {
            1 => Self::Playing,
            2 => Self::Recording,
            3 => Self::PausedPlaying,
            4 => Self::PausedRecording,
            _ => Self::Idle,
        }
    }

    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_paused(self) -> bool {
        matches!(self, Self::PausedPlaying | Self::PausedRecording)
    }

    pub fn is_recording(self) -> bool {
        matches!(self, Self::Recording | Self::PausedRecording)
    }
}

/// Mode is orthogonal display-level state, relevant only while IDLE: it
/// decides which non-idle state ACTION enters next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Rec,
    Play,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Rec => Self::Play,
            Self::Play => Self::Rec,
        }
    }
}

/// Atomic cell holding the current `TransportState`, with a CAS-style
/// transition primitive.
#[derive(Debug)]
pub struct TransportCell(AtomicU8);

impl Default for TransportCell {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(TransportState::Idle.encode()))
    }

    pub fn get(&self) -> TransportState {
        TransportState::decode(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, state: TransportState) {
        self.0.store(state.encode(), Ordering::SeqCst);
    }

    /// Attempt to move from `from` to `to`; returns whether it succeeded.
    /// This is the sole gate for starting a Sequencer thread: only the
    /// caller that wins the CAS may spawn one.
    pub fn try_transition(&self, from: TransportState, to: TransportState) -> bool {
        self.0
            .compare_exchange(from.encode(), to.encode(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let cell = TransportCell::new();
        assert_eq!(cell.get(), TransportState::Idle);
    }

    #[test]
    fn cas_transition_succeeds_once() {
        let cell = TransportCell::new();
        assert!(cell.try_transition(TransportState::Idle, TransportState::Recording));
        assert!(!cell.try_transition(TransportState::Idle, TransportState::Recording));
        assert_eq!(cell.get(), TransportState::Recording);
    }

    #[test]
    fn mode_toggles() {
        assert_eq!(Mode::Rec.toggled(), Mode::Play);
        assert_eq!(Mode::Play.toggled(), Mode::Rec);
    }
}
