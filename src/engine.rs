//! The owned state bundle: a single value composing Clock, TrackStore,
//! SuperLooperConfig, TransportState, and PendingTone, shared between
//! threads behind a small number of narrowly-scoped mutexes and atomics.
//! Subsystems receive an `Arc<Engine>`.

use crate::clock::Clock;
use crate::config::Config;
use crate::midi_io::{MidiIo, NullMidiIo};
use crate::pending_tone::PendingTone;
use crate::session;
use crate::super_looper::SuperLooperConfig;
use crate::track::TrackStore;
use crate::transport::{Mode, TransportCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct Engine {
    pub clock: Mutex<Clock>,
    pub store: TrackStore,
    pub transport: TransportCell,
    pub super_looper: Mutex<SuperLooperConfig>,
    pub pending_tone: Mutex<PendingTone>,
    pub mode: Mutex<Mode>,
    pub current_idx: AtomicUsize,
    pub midi: Arc<dyn MidiIo>,
    pub config: Config,
}

impl Engine {
    pub fn new(midi: Arc<dyn MidiIo>, config: Config) -> Arc<Self> {
        let super_looper = SuperLooperConfig::new(config.super_looper);
        Arc::new(Self {
            clock: Mutex::new(Clock::new()),
            store: TrackStore::new(),
            transport: TransportCell::new(),
            super_looper: Mutex::new(super_looper),
            pending_tone: Mutex::new(PendingTone::default()),
            mode: Mutex::new(Mode::Rec),
            current_idx: AtomicUsize::new(0),
            midi,
            config,
        })
    }

    /// An engine wired to a no-op MIDI output, for unit tests that drive
    /// the Controller without a real port.
    pub fn for_tests() -> Arc<Self> {
        Self::new(Arc::new(NullMidiIo), Config::default())
    }

    /// Load whichever session file matches the current Super Looper
    /// setting and replace all ten tracks and the Super Looper config
    /// with its contents. Call only while IDLE; behavior mid-playback
    /// is undefined.
    pub fn load_active_session(&self) {
        let enabled = self.super_looper.lock().expect("super looper mutex poisoned").enabled;
        let path = self.config.active_session_path(enabled);
        let (tracks, looper) = session::load(path);
        self.store.replace_all(tracks);
        *self.super_looper.lock().expect("super looper mutex poisoned") = looper;
    }

    /// Persist the current state to whichever session file matches the
    /// current Super Looper setting, if autosave is enabled.
    pub fn autosave(&self) {
        if !self.config.autosave_enabled() {
            return;
        }
        let tracks = self.store.clone_all();
        let looper = *self.super_looper.lock().expect("super looper mutex poisoned");
        let path = self.config.active_session_path(looper.enabled);
        session::save(path, &tracks, &looper);
    }

    /// Run one inbound MIDI message through the Recorder: observation
    /// always happens, capture happens only while actively recording (not
    /// while paused, when the clock is frozen and every inbound event
    /// would otherwise stack up at the same offset).
    pub fn handle_inbound(&self, message: crate::message::Message) {
        {
            let mut pending = self.pending_tone.lock().expect("pending tone mutex poisoned");
            crate::recorder::observe(&message, &mut pending);
        }
        let state = self.transport.get();
        let idx = self.current_idx.load(Ordering::SeqCst);
        let clock = self.clock.lock().expect("clock mutex poisoned");
        let recording = state == crate::transport::TransportState::Recording;
        crate::recorder::capture(&clock, &self.store, idx, message, recording);
    }

    /// Non-interactive status snapshot: per-track event count and
    /// duration, exposed as a plain method so a CLI or logger can report
    /// it without an interactive command loop.
    pub fn status_report(&self) -> Vec<(usize, usize, f64)> {
        let tracks = self.store.clone_all();
        tracks
            .iter()
            .enumerate()
            .map(|(idx, track)| (idx, track.events.len(), track.duration_s))
            .collect()
    }

    pub fn current_track(&self) -> usize {
        self.current_idx.load(Ordering::SeqCst)
    }
}
