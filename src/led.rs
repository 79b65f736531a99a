//! UI indicator surface. Physical LED PWM duty cycles are
//! out of scope; this module computes the logical on/off state as a
//! pure function of (mode, recording?, paused?, selected track, track
//! has-content) and defines the trait a real driver would implement.

use crate::track::NUM_TRACKS;
use crate::transport::{Mode, TransportState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    ModeRec,
    ModePlay,
    Pause,
    Clear,
    DeleteAll,
    Track(usize),
}

pub trait LedSurface: Send {
    fn set(&mut self, indicator: Indicator, on: bool);

    /// Flash an indicator once; the default blocks for `duration`, which
    /// is fine for a non-PWM stand-in but a hardware driver would
    /// normally do this asynchronously.
    fn flash(&mut self, indicator: Indicator, duration: std::time::Duration) {
        self.set(indicator, true);
        std::thread::sleep(duration);
        self.set(indicator, false);
    }
}

/// The full set of indicator states at one instant, as a function of
/// transport/engine state. `blink_phase` is the ~2 Hz blink phase
/// applied to the recording indicator and the selected track's LED
/// while recording.
pub struct LedState {
    pub mode_rec: bool,
    pub mode_play: bool,
    pub pause: bool,
    pub tracks: [bool; NUM_TRACKS],
}

#[allow(clippy::too_many_arguments)]
pub fn compute_led_state(
    state: TransportState,
    mode: Mode,
    current_idx: usize,
    track_has_content: impl Fn(usize) -> bool,
    blink_phase: bool,
) -> LedState {
    let recording = state.is_recording();
    let mode_rec = if recording {
        blink_phase
    } else {
        mode == Mode::Rec
    };
    let mode_play = mode == Mode::Play && !recording;
    let pause = state.is_paused();

    let mut tracks = [false; NUM_TRACKS];
    for (i, slot) in tracks.iter_mut().enumerate() {
        *slot = if mode == Mode::Play {
            track_has_content(i)
        } else if i == current_idx && recording {
            blink_phase
        } else {
            i == current_idx
        };
    }

    LedState {
        mode_rec,
        mode_play,
        pause,
        tracks,
    }
}

/// An indicator surface with no physical backing. The default wiring
/// for a binary that has no GPIO/PWM driver attached; `flash` still
/// sleeps for the requested duration so timing-dependent call sites
/// (the unreachable-port failure mode) behave the same either way.
pub struct NullLedSurface;

impl LedSurface for NullLedSurface {
    fn set(&mut self, _indicator: Indicator, _on: bool) {}
}

/// Drives every `Indicator` on `surface` to match `state`.
pub fn apply_led_state(surface: &mut dyn LedSurface, state: &LedState) {
    surface.set(Indicator::ModeRec, state.mode_rec);
    surface.set(Indicator::ModePlay, state.mode_play);
    surface.set(Indicator::Pause, state.pause);
    for (i, on) in state.tracks.iter().enumerate() {
        surface.set(Indicator::Track(i), *on);
    }
}
