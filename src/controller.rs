//! Transport Controller: the state machine driven by the
//! control surface. Composes Recorder and Sequencer, owns mode and
//! track-selection state, and is the sole spawner of Sequencer threads.

use crate::control_surface::ControlEdge;
use crate::engine::Engine;
use std::sync::Arc;
use crate::sequencer::Sequencer;
use crate::transport::{Mode, TransportState};
use std::sync::atomic::Ordering;
use std::thread;

/// Drive one debounced edge through the state machine. Returns once any
/// spawned Sequencer thread has been handed off (non-blocking): the
/// thread itself runs until the next edge flips transport back to IDLE.
pub fn handle_edge(engine: &Arc<Engine>, edge: ControlEdge) {
    match edge {
        ControlEdge::Touch => handle_touch(engine),
        ControlEdge::Mode => handle_mode(engine),
        ControlEdge::Action => handle_action(engine),
        ControlEdge::Left => handle_left(engine),
        ControlEdge::Right => handle_right(engine),
    }
}

fn handle_mode(engine: &Arc<Engine>) {
    if !engine.transport.get().is_idle() {
        return;
    }
    let mut mode = engine.mode.lock().expect("mode mutex poisoned");
    *mode = mode.toggled();
}

fn handle_action(engine: &Arc<Engine>) {
    let state = engine.transport.get();
    if state.is_idle() {
        let mode = *engine.mode.lock().expect("mode mutex poisoned");
        match mode {
            Mode::Rec => start_recording(engine),
            Mode::Play => start_playing(engine),
        }
    } else if matches!(state, TransportState::Recording | TransportState::Playing) {
        close(engine, state);
    }
    // PAUSED_* + ACTION: no transition is named in the table; ignored.
}

fn handle_left(engine: &Arc<Engine>) {
    let state = engine.transport.get();
    if state.is_idle() {
        let idx = engine.current_idx.load(Ordering::SeqCst);
        engine
            .current_idx
            .store((idx + crate::track::NUM_TRACKS - 1) % crate::track::NUM_TRACKS, Ordering::SeqCst);
    } else if matches!(
        state,
        TransportState::Playing
            | TransportState::Recording
            | TransportState::PausedPlaying
            | TransportState::PausedRecording
    ) {
        toggle_pause(engine, state);
    }
}

fn handle_right(engine: &Arc<Engine>) {
    let state = engine.transport.get();
    if state.is_idle() {
        let idx = engine.current_idx.load(Ordering::SeqCst);
        engine
            .current_idx
            .store((idx + 1) % crate::track::NUM_TRACKS, Ordering::SeqCst);
    } else if state == TransportState::Playing {
        let idx = engine.current_idx.load(Ordering::SeqCst);
        engine.store.clear(idx);
        engine.midi.panic_channel(engine.store.channel_of(idx));
        engine.autosave();
    }
    // RECORDING + RIGHT: no effect, per the transition table.
}

fn handle_touch(engine: &Arc<Engine>) {
    engine.transport.set(TransportState::Idle);
    engine.midi.panic();
    engine.store.clear_all();
    let mut looper = engine.super_looper.lock().expect("super looper mutex poisoned");
    looper.reset_duration();
    drop(looper);
    engine.autosave();
}

fn start_recording(engine: &Arc<Engine>) {
    if !engine.transport.try_transition(TransportState::Idle, TransportState::Recording) {
        return;
    }
    let idx = engine.current_idx.load(Ordering::SeqCst);
    engine.store.clear(idx);

    let pending = {
        let mut pending = engine.pending_tone.lock().expect("pending tone mutex poisoned");
        let observed = *pending;
        pending.clear();
        observed
    };
    if pending.is_set() {
        let channel = engine.store.channel_of(idx);
        if let (Some(bank_msb), true) = (pending.bank_msb, true) {
            engine.store.append(
                idx,
                0.0,
                crate::message::Message::ControlChange {
                    channel,
                    control: crate::message::CC_BANK_MSB,
                    value: bank_msb,
                },
            );
        }
        if let Some(bank_lsb) = pending.bank_lsb {
            engine.store.append(
                idx,
                0.0,
                crate::message::Message::ControlChange {
                    channel,
                    control: crate::message::CC_BANK_LSB,
                    value: bank_lsb,
                },
            );
        }
        if let Some(program) = pending.program {
            engine
                .store
                .append(idx, 0.0, crate::message::Message::ProgramChange { channel, program });
            let (_, bank_msb, bank_lsb) = engine.store.tone_of(idx);
            engine.store.set_tone(idx, program, bank_msb, bank_lsb);
        }
    }

    engine.clock.lock().expect("clock mutex poisoned").reset();
    spawn_sequencer(engine, true);
}

fn start_playing(engine: &Arc<Engine>) {
    if !engine.transport.try_transition(TransportState::Idle, TransportState::Playing) {
        return;
    }
    engine.clock.lock().expect("clock mutex poisoned").reset();
    spawn_sequencer(engine, false);
}

fn spawn_sequencer(engine: &Arc<Engine>, started_recording: bool) {
    let engine = Arc::clone(engine);
    thread::spawn(move || {
        // The Sequencer re-locks `clock` once per tick rather than for
        // its whole run, so Controller threads can still pause/resume
        // it concurrently; the Controller will not start a second
        // Sequencer while transport is non-IDLE (CAS-guarded).
        let mut sequencer = Sequencer::new(
            &engine.clock,
            &engine.store,
            &engine.transport,
            engine.midi.as_ref(),
            &engine.current_idx,
        );
        sequencer.run(started_recording);
        engine.transport.set(TransportState::Idle);
    });
}

fn toggle_pause(engine: &Arc<Engine>, state: TransportState) {
    let (running_state, paused_state) = match state {
        TransportState::Playing => (TransportState::Playing, TransportState::PausedPlaying),
        TransportState::Recording => (TransportState::Recording, TransportState::PausedRecording),
        TransportState::PausedPlaying => (TransportState::Playing, TransportState::PausedPlaying),
        TransportState::PausedRecording => (TransportState::Recording, TransportState::PausedRecording),
        TransportState::Idle => return,
    };

    if state == running_state {
        if engine.transport.try_transition(running_state, paused_state) {
            engine.clock.lock().expect("clock mutex poisoned").pause();
        }
    } else if engine.transport.try_transition(paused_state, running_state) {
        engine.clock.lock().expect("clock mutex poisoned").resume();
    }
}

/// Close a RECORDING or PLAYING session: finalize duration, panic,
/// persist, and let the Sequencer thread observe IDLE and exit on its
/// own next tick.
fn close(engine: &Arc<Engine>, state: TransportState) {
    if state == TransportState::Recording {
        let idx = engine.current_idx.load(Ordering::SeqCst);
        if engine.store.is_empty(idx) {
            // Nothing was captured (e.g. ACTION pressed twice with no
            // input in between): the empty/zero-duration invariant takes
            // priority over whatever song time elapsed, and an empty take
            // must not touch the shared Super Looper duration either.
            engine.store.set_duration(idx, 0.0);
        } else {
            let d_recorded = engine.clock.lock().expect("clock mutex poisoned").song_time();
            let mut looper = engine.super_looper.lock().expect("super looper mutex poisoned");
            let duration = looper.close_recording(d_recorded);
            drop(looper);
            engine.store.set_duration(idx, duration);
        }
    }
    engine.transport.set(TransportState::Idle);
    engine.midi.panic();
    engine.autosave();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn mode_toggles_only_while_idle() {
        let engine = Engine::for_tests();
        handle_edge(&engine, ControlEdge::Mode);
        assert_eq!(*engine.mode.lock().unwrap(), Mode::Play);
        handle_edge(&engine, ControlEdge::Mode);
        assert_eq!(*engine.mode.lock().unwrap(), Mode::Rec);
    }

    #[test]
    fn left_and_right_rotate_current_track_while_idle() {
        let engine = Engine::for_tests();
        handle_edge(&engine, ControlEdge::Right);
        assert_eq!(engine.current_idx.load(Ordering::SeqCst), 1);
        handle_edge(&engine, ControlEdge::Left);
        assert_eq!(engine.current_idx.load(Ordering::SeqCst), 0);
        handle_edge(&engine, ControlEdge::Left);
        assert_eq!(engine.current_idx.load(Ordering::SeqCst), crate::track::NUM_TRACKS - 1);
    }

    #[test]
    fn touch_forces_idle_and_clears_everything() {
        let engine = Engine::for_tests();
        engine.store.append(
            0,
            0.0,
            Message::NoteOn {
                channel: 0,
                note: 1,
                velocity: 1,
            },
        );
        engine.store.set_duration(0, 1.0);
        handle_edge(&engine, ControlEdge::Touch);
        assert_eq!(engine.transport.get(), TransportState::Idle);
        assert!(engine.store.is_empty(0));
    }

    #[test]
    fn pending_tone_is_consumed_on_recording_entry() {
        let engine = Engine::for_tests();
        engine.current_idx.store(5, Ordering::SeqCst);
        {
            let mut pending = engine.pending_tone.lock().unwrap();
            pending.program = Some(42);
            pending.bank_msb = Some(1);
        }
        start_recording(&engine);
        let track = engine.store.clone_track(5);
        assert_eq!(track.events[0].message, Message::ControlChange {
            channel: 5,
            control: crate::message::CC_BANK_MSB,
            value: 1,
        });
        assert_eq!(track.events[1].message, Message::ProgramChange {
            channel: 5,
            program: 42,
        });
        assert!(!engine.pending_tone.lock().unwrap().is_set());
        engine.transport.set(TransportState::Idle);
    }

    #[test]
    fn right_clears_selected_track_while_playing() {
        let engine = Engine::for_tests();
        engine.store.append(
            0,
            0.0,
            Message::NoteOn {
                channel: 0,
                note: 1,
                velocity: 1,
            },
        );
        engine.store.set_duration(0, 1.0);
        engine.transport.set(TransportState::Playing);
        handle_edge(&engine, ControlEdge::Right);
        assert!(engine.store.is_empty(0));
        engine.transport.set(TransportState::Idle);
    }

    #[test]
    fn right_has_no_effect_while_recording() {
        let engine = Engine::for_tests();
        engine.store.append(
            3,
            0.0,
            Message::NoteOn {
                channel: 3,
                note: 1,
                velocity: 1,
            },
        );
        engine.current_idx.store(3, Ordering::SeqCst);
        engine.transport.set(TransportState::Recording);
        handle_edge(&engine, ControlEdge::Right);
        assert!(!engine.store.is_empty(3));
        engine.transport.set(TransportState::Idle);
    }

    #[test]
    fn left_pauses_and_a_second_left_resumes() {
        let engine = Engine::for_tests();
        engine.transport.set(TransportState::Playing);

        handle_edge(&engine, ControlEdge::Left);
        assert_eq!(engine.transport.get(), TransportState::PausedPlaying);
        assert!(engine.clock.lock().unwrap().is_paused());

        handle_edge(&engine, ControlEdge::Left);
        assert_eq!(engine.transport.get(), TransportState::Playing);
        assert!(!engine.clock.lock().unwrap().is_paused());

        engine.transport.set(TransportState::Idle);
    }

    #[test]
    fn left_resumes_out_of_paused_recording_too() {
        let engine = Engine::for_tests();
        engine.transport.set(TransportState::Recording);
        handle_edge(&engine, ControlEdge::Left);
        assert_eq!(engine.transport.get(), TransportState::PausedRecording);

        handle_edge(&engine, ControlEdge::Left);
        assert_eq!(engine.transport.get(), TransportState::Recording);

        engine.transport.set(TransportState::Idle);
    }

    #[test]
    fn inbound_events_are_dropped_while_paused_recording() {
        let engine = Engine::for_tests();
        engine.current_idx.store(2, Ordering::SeqCst);
        engine.transport.set(TransportState::Recording);
        engine.handle_inbound(Message::NoteOn {
            channel: 2,
            note: 1,
            velocity: 1,
        });
        engine.transport.set(TransportState::PausedRecording);
        engine.handle_inbound(Message::NoteOn {
            channel: 2,
            note: 2,
            velocity: 1,
        });
        let track = engine.store.clone_track(2);
        assert_eq!(track.events.len(), 1, "events arriving while paused must not be captured");
        engine.transport.set(TransportState::Idle);
    }

    #[test]
    fn closing_an_empty_recording_leaves_duration_zero() {
        let engine = Engine::for_tests();
        engine.current_idx.store(4, Ordering::SeqCst);
        engine.transport.set(TransportState::Recording);
        std::thread::sleep(std::time::Duration::from_millis(5));
        close(&engine, TransportState::Recording);
        let track = engine.store.clone_track(4);
        assert!(track.is_empty());
        assert_eq!(track.duration_s, 0.0);
    }

    #[test]
    fn closing_an_empty_recording_does_not_fix_super_looper_duration() {
        let engine = Engine::for_tests();
        {
            let mut looper = engine.super_looper.lock().unwrap();
            looper.enabled = true;
        }
        engine.current_idx.store(0, Ordering::SeqCst);
        engine.transport.set(TransportState::Recording);
        std::thread::sleep(std::time::Duration::from_millis(5));
        close(&engine, TransportState::Recording);
        let looper = engine.super_looper.lock().unwrap();
        assert!(!looper.duration_fixed);
    }
}
