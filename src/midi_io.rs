//! Bidirectional MIDI port pair with a `panic()` primitive.
//!
//! Port selection by name filter falls back to the first available port
//! when nothing matches, so a device can be plugged in under any name
//! and the engine still opens something.

use crate::error::EngineError;
use crate::message::{panic_messages_for_channel, Message};
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// Operations the rest of the engine needs from a MIDI output.
/// `panic()` is the only correctness-critical error-recovery primitive:
/// it must not itself fail silently, but a failure on one channel must
/// not stop it from trying the rest.
pub trait MidiIo: Send + Sync {
    fn send(&self, message: &Message) -> Result<(), EngineError>;

    fn panic(&self) {
        for channel in 0..16u8 {
            self.panic_channel(channel);
        }
    }

    /// Silence a single channel only, e.g. clearing one track without
    /// disturbing the others.
    fn panic_channel(&self, channel: u8) {
        for message in panic_messages_for_channel(channel) {
            if let Err(err) = self.send(&message) {
                log::error!("midi panic: send failed on channel {channel}: {err}");
            }
        }
    }
}

/// Pick a port whose name contains `filter` (case-insensitive), falling
/// back to the first available port if no name matches or no filter was
/// given.
pub fn select_port<P: Clone>(
    ports: &[P],
    names: impl Fn(&P) -> Option<String>,
    filter: Option<&str>,
) -> Option<P> {
    if ports.is_empty() {
        return None;
    }
    if let Some(filter) = filter {
        let filter = filter.to_lowercase();
        let matched = ports.iter().find(|p| {
            names(p)
                .map(|name| name.to_lowercase().contains(&filter))
                .unwrap_or(false)
        });
        if let Some(port) = matched {
            return Some(port.clone());
        }
    }
    ports.first().cloned()
}

/// `midir`-backed MIDI output, serialized behind a mutex so the
/// Sequencer (bulk dispatch) and the Controller (panic, init ceremony)
/// never interleave writes on the wire.
pub struct MidirMidiOutput {
    connection: Mutex<MidiOutputConnection>,
}

impl MidirMidiOutput {
    pub fn open(name_filter: Option<&str>) -> Result<Self, EngineError> {
        let midi_out = MidiOutput::new("decaloop")?;
        let ports = midi_out.ports();
        let port = select_port(
            &ports,
            |p: &MidiOutputPort| midi_out.port_name(p).ok(),
            name_filter,
        )
        .ok_or(EngineError::PortNotFound)?;
        let port_name = midi_out.port_name(&port).unwrap_or_default();
        log::info!("opening MIDI output port {port_name}");
        let connection = midi_out.connect(&port, "decaloop-out")?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl MidiIo for MidirMidiOutput {
    fn send(&self, message: &Message) -> Result<(), EngineError> {
        let bytes = message.to_live_bytes();
        let mut connection = self
            .connection
            .lock()
            .expect("midi output connection mutex poisoned");
        connection.send(&bytes).map_err(EngineError::from)
    }
}

/// Opens a `midir` input port and forwards every parsed message to a
/// channel, since `midir`'s input API is callback-driven rather than
/// iterator-driven. The returned connection must be kept alive for as
/// long as input should be received.
pub struct MidirMidiInput {
    _connection: MidiInputConnection<()>,
    receiver: Receiver<Message>,
}

impl MidirMidiInput {
    pub fn open(name_filter: Option<&str>) -> Result<Self, EngineError> {
        let midi_in = MidiInput::new("decaloop")?;
        let ports = midi_in.ports();
        let port = select_port(
            &ports,
            |p: &MidiInputPort| midi_in.port_name(p).ok(),
            name_filter,
        )
        .ok_or(EngineError::PortNotFound)?;
        let port_name = midi_in.port_name(&port).unwrap_or_default();
        log::info!("opening MIDI input port {port_name}");

        let (sender, receiver): (Sender<Message>, Receiver<Message>) = channel();
        let connection = midi_in
            .connect(
                &port,
                "decaloop-in",
                move |_timestamp_us, data, _| {
                    if let Some(message) = Message::from_live_bytes(data) {
                        if sender.send(message).is_err() {
                            log::debug!("midi input receiver dropped, discarding message");
                        }
                    }
                },
                (),
            )
            .map_err(|err| EngineError::Midi(err.to_string()))?;

        Ok(Self {
            _connection: connection,
            receiver,
        })
    }

    pub fn receiver(&self) -> &Receiver<Message> {
        &self.receiver
    }
}

/// A MIDI output that discards everything it is sent. Useful for tests
/// and for embedding the engine without a real port open.
pub struct NullMidiIo;

impl MidiIo for NullMidiIo {
    fn send(&self, _message: &Message) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct FakePort(&'static str);

    #[test]
    fn select_port_prefers_name_match() {
        let ports = vec![FakePort("Midi Through"), FakePort("Casio CTK-2100")];
        let picked = select_port(&ports, |p| Some(p.0.to_string()), Some("casio"));
        assert_eq!(picked.map(|p| p.0), Some("Casio CTK-2100"));
    }

    #[test]
    fn select_port_falls_back_to_first() {
        let ports = vec![FakePort("Midi Through"), FakePort("Casio CTK-2100")];
        let picked = select_port(&ports, |p| Some(p.0.to_string()), Some("nonexistent"));
        assert_eq!(picked.map(|p| p.0), Some("Midi Through"));
    }

    #[test]
    fn select_port_on_empty_list_is_none() {
        let ports: Vec<FakePort> = Vec::new();
        let picked = select_port(&ports, |p| Some(p.0.to_string()), None);
        assert!(picked.is_none());
    }

    struct RecordingOutput {
        sent: Mutex<Vec<Message>>,
    }

    impl MidiIo for RecordingOutput {
        fn send(&self, message: &Message) -> Result<(), EngineError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[test]
    fn panic_sends_all_notes_off_and_sound_off_on_every_channel() {
        let output = RecordingOutput {
            sent: Mutex::new(Vec::new()),
        };
        output.panic();
        let sent = output.sent.lock().unwrap();
        assert_eq!(sent.len(), 16 * 130);
    }

    #[test]
    fn two_panics_produce_a_superset_multiset() {
        let output = RecordingOutput {
            sent: Mutex::new(Vec::new()),
        };
        output.panic();
        let first_len = output.sent.lock().unwrap().len();
        output.panic();
        let second_len = output.sent.lock().unwrap().len();
        assert_eq!(second_len, first_len * 2);
    }
}
