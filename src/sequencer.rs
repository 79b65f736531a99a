//! Sequencer: drives playback of every eligible track against song
//! time, each looping at its own `duration_s`.

use crate::clock::Clock;
use crate::message::Message;
use crate::midi_io::MidiIo;
use crate::track::TrackStore;
use crate::transport::TransportCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(1);
const PAUSED_TICK: Duration = Duration::from_millis(50);
const TONE_SEND_DELAY: Duration = Duration::from_millis(10);

/// Per-track play cursor. Owned entirely by the Sequencer's run loop:
/// nothing else ever reads or writes it.
#[derive(Debug, Clone, Copy, Default)]
struct PlayCursor {
    next_event_index: usize,
    last_wrap_position: f64,
}

pub struct Sequencer<'a> {
    clock: &'a Mutex<Clock>,
    store: &'a TrackStore,
    transport: &'a TransportCell,
    midi: &'a dyn MidiIo,
    current_idx: &'a AtomicUsize,
    cursors: Vec<PlayCursor>,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        clock: &'a Mutex<Clock>,
        store: &'a TrackStore,
        transport: &'a TransportCell,
        midi: &'a dyn MidiIo,
        current_idx: &'a AtomicUsize,
    ) -> Self {
        Self {
            clock,
            store,
            transport,
            midi,
            current_idx,
            cursors: Vec::new(),
        }
    }

    /// Send the init ceremony for one non-empty, non-excluded track:
    /// sustain off, then (if any tone field is non-zero) bank-select and
    /// program change, each separated by a short delay for slow
    /// synthesizers.
    fn send_init_ceremony(&self, track_idx: usize) {
        let channel = self.store.channel_of(track_idx);
        let (program, bank_msb, bank_lsb) = self.store.tone_of(track_idx);

        self.send_logged(&Message::ControlChange {
            channel,
            control: crate::message::CC_SUSTAIN,
            value: 0,
        });

        if program != 0 || bank_msb != 0 || bank_lsb != 0 {
            sleep(TONE_SEND_DELAY);
            self.send_logged(&Message::ControlChange {
                channel,
                control: crate::message::CC_BANK_MSB,
                value: bank_msb,
            });
            sleep(TONE_SEND_DELAY);
            self.send_logged(&Message::ControlChange {
                channel,
                control: crate::message::CC_BANK_LSB,
                value: bank_lsb,
            });
            sleep(TONE_SEND_DELAY);
            self.send_logged(&Message::ProgramChange { channel, program });
        }
    }

    fn send_logged(&self, message: &Message) {
        if let Err(err) = self.midi.send(message) {
            log::error!("sequencer: send failed: {err}");
        }
    }

    /// Run until the transport state observed via `transport` becomes
    /// Idle. `started_recording` indicates the engine entered RECORDING
    /// (not PLAYING): the currently-selected track is excluded from
    /// playback even if non-empty, because the Controller has already
    /// cleared it.
    pub fn run(&mut self, started_recording: bool) {
        let exclude_idx = if started_recording {
            Some(self.current_idx.load(Ordering::SeqCst))
        } else {
            None
        };

        let snapshot = self.store.snapshot_for_playback(exclude_idx);
        for view in &snapshot {
            if !view.events.is_empty() {
                self.send_init_ceremony(view.track_idx);
            }
        }
        self.cursors = vec![PlayCursor::default(); snapshot.len()];

        let mut was_paused = false;

        loop {
            let state = self.transport.get();
            if state.is_idle() {
                break;
            }

            if state.is_paused() {
                if !was_paused {
                    self.midi.panic();
                    was_paused = true;
                }
                sleep(PAUSED_TICK);
                continue;
            }
            was_paused = false;

            let s = self
                .clock
                .lock()
                .expect("clock mutex poisoned")
                .song_time();

            for (slot, view) in snapshot.iter().enumerate() {
                if view.duration_s <= 0.0 {
                    continue;
                }
                let pos = s.rem_euclid(view.duration_s);
                let cursor = &mut self.cursors[slot];
                if pos < cursor.last_wrap_position {
                    cursor.next_event_index = 0;
                }
                cursor.last_wrap_position = pos;

                while cursor.next_event_index < view.events.len() {
                    let event = &view.events[cursor.next_event_index];
                    if event.offset_s > pos {
                        break;
                    }
                    self.send_logged(&event.message);
                    cursor.next_event_index += 1;
                }
            }

            sleep(TICK);
        }

        self.midi.panic();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::transport::TransportState;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct RecordingMidi {
        sent: Mutex<Vec<Message>>,
    }

    impl MidiIo for RecordingMidi {
        fn send(&self, message: &Message) -> Result<(), EngineError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn skips_tracks_with_zero_duration() {
        let clock = Mutex::new(Clock::new());
        let store = TrackStore::new();
        let transport = TransportCell::new();
        let midi = RecordingMidi {
            sent: Mutex::new(Vec::new()),
        };
        let current_idx = AtomicUsize::new(0);

        // A track with events but duration 0 is silent (edge case).
        store.append(
            0,
            0.0,
            Message::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100,
            },
        );

        transport.set(TransportState::Idle);
        let mut sequencer = Sequencer::new(&clock, &store, &transport, &midi, &current_idx);
        sequencer.run(false);

        // Only the panic-on-exit messages should have been sent, no
        // track events (duration_s stayed 0).
        let sent = midi.sent.lock().unwrap();
        assert_eq!(sent.len(), 16 * 130);
    }

    #[test]
    fn terminates_immediately_when_already_idle_and_still_panics() {
        let clock = Mutex::new(Clock::new());
        let store = TrackStore::new();
        let transport = TransportCell::new();
        let midi = RecordingMidi {
            sent: Mutex::new(Vec::new()),
        };
        let current_idx = AtomicUsize::new(0);
        let mut sequencer = Sequencer::new(&clock, &store, &transport, &midi, &current_idx);
        sequencer.run(false);
        assert!(!midi.sent.lock().unwrap().is_empty());
    }
}
