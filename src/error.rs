//! Crate-wide error type.
//!
//! Mirrors the taxonomy in the design doc: transient MIDI I/O errors are
//! logged and swallowed by the callers that can tolerate them (the
//! Sequencer and Recorder loops); everything else bubbles up as an
//! `EngineError`.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("midi error: {0}")]
    Midi(String),

    #[error("no matching MIDI port found")]
    PortNotFound,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("session (de)serialization error: {0}")]
    Session(#[from] serde_json::Error),

    #[error("standard MIDI file error: {0}")]
    Smf(String),
}

impl From<midir::ConnectError<midir::MidiOutput>> for EngineError {
    fn from(err: midir::ConnectError<midir::MidiOutput>) -> Self {
        Self::Midi(err.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for EngineError {
    fn from(err: midir::ConnectError<midir::MidiInput>) -> Self {
        Self::Midi(err.to_string())
    }
}

impl From<midir::InitError> for EngineError {
    fn from(err: midir::InitError) -> Self {
        Self::Midi(err.to_string())
    }
}

impl From<midir::SendError> for EngineError {
    fn from(err: midir::SendError) -> Self {
        Self::Midi(err.to_string())
    }
}
