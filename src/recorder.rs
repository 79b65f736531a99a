//! Recorder: observes inbound MIDI continuously, and captures it into
//! the active track only while the transport is RECORDING.
//!
//! Kept stateless with respect to transport: the entry ceremony that
//! injects a pending tone at RECORDING start lives in `controller`
//! instead, so this module only needs `Clock`, `TrackStore` and
//! `PendingTone` to do its job.

use crate::clock::Clock;
use crate::pending_tone::PendingTone;
use crate::track::TrackStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Not recording right now; only the observation step ran.
    Observed,
    /// Recording; the event was appended.
    Captured,
    /// Recording, but the clock had not yet reached song time zero
    /// (pre-origin drift); the event was dropped.
    DroppedPreOrigin,
}

/// Observation step: track program/bank-select values regardless of
/// transport state, always, whether or not recording is active.
pub fn observe(message: &crate::message::Message, pending: &mut PendingTone) {
    pending.observe(message);
}

/// Capture step: when `recording` is true, stamp and append the
/// (already channel-remapped) event into `track[current_idx]`, and track
/// any tone change it carries.
pub fn capture(
    clock: &Clock,
    store: &TrackStore,
    current_idx: usize,
    message: crate::message::Message,
    recording: bool,
) -> CaptureOutcome {
    if !recording {
        return CaptureOutcome::Observed;
    }

    let t = clock.song_time();
    if t < 0.0 {
        return CaptureOutcome::DroppedPreOrigin;
    }

    let channel = store.channel_of(current_idx);
    let remapped = message.with_channel(channel);

    if remapped.is_program_change() {
        if let crate::message::Message::ProgramChange { program, .. } = remapped {
            let (_, bank_msb, bank_lsb) = store.tone_of(current_idx);
            store.set_tone(current_idx, program, bank_msb, bank_lsb);
        }
    } else if remapped.is_bank_msb_cc() {
        if let crate::message::Message::ControlChange { value, .. } = remapped {
            let (program, _, bank_lsb) = store.tone_of(current_idx);
            store.set_tone(current_idx, program, value, bank_lsb);
        }
    } else if remapped.is_bank_lsb_cc() {
        if let crate::message::Message::ControlChange { value, .. } = remapped {
            let (program, bank_msb, _) = store.tone_of(current_idx);
            store.set_tone(current_idx, program, bank_msb, value);
        }
    }

    store.append(current_idx, t, remapped);
    CaptureOutcome::Captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn capture_rewrites_channel_to_track_channel() {
        let clock = Clock::new();
        let store = TrackStore::new();
        let outcome = capture(
            &clock,
            &store,
            5,
            Message::NoteOn {
                channel: 3,
                note: 60,
                velocity: 100,
            },
            true,
        );
        assert_eq!(outcome, CaptureOutcome::Captured);
        let track = store.clone_track(5);
        assert_eq!(track.events.len(), 1);
        assert_eq!(track.events[0].message.channel(), Some(5));
    }

    #[test]
    fn not_recording_only_observes() {
        let clock = Clock::new();
        let store = TrackStore::new();
        let outcome = capture(
            &clock,
            &store,
            0,
            Message::NoteOn {
                channel: 0,
                note: 1,
                velocity: 1,
            },
            false,
        );
        assert_eq!(outcome, CaptureOutcome::Observed);
        assert!(store.is_empty(0));
    }

    #[test]
    fn program_change_updates_track_tone() {
        let clock = Clock::new();
        let store = TrackStore::new();
        capture(
            &clock,
            &store,
            2,
            Message::ProgramChange {
                channel: 9,
                program: 42,
            },
            true,
        );
        let (program, _, _) = store.tone_of(2);
        assert_eq!(program, 42);
    }
}
