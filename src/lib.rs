//! Ten-track MIDI loop sequencer engine.
//!
//! The library crate exposes the full engine: the Clock, Track Store,
//! MIDI I/O, Recorder, Sequencer, and Transport Controller that make up
//! the real-time core, plus the Session and Standard MIDI File leaves
//! that collaborate with it. GPIO control surfaces and LED drivers are
//! boundaries the binary plugs a real or demo implementation into.

pub mod clock;
pub mod config;
pub mod control_surface;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event;
pub mod led;
pub mod message;
pub mod midi_io;
pub mod pending_tone;
pub mod recorder;
pub mod sequencer;
pub mod session;
pub mod smf;
pub mod super_looper;
pub mod track;
pub mod transport;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
