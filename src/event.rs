//! A single timestamped MIDI message within a track's loop.

use crate::message::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Seconds since the track's loop origin.
    pub offset_s: f64,
    pub message: Message,
}

impl Event {
    pub fn new(offset_s: f64, message: Message) -> Self {
        Self { offset_s, message }
    }
}

/// On-disk shape for one event. Unknown `type` values are skipped on
/// load rather than erroring the whole session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i16>,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        let channel = event.message.channel().unwrap_or(0);
        let (kind, note, velocity, control, value, program, pitch) = match &event.message {
            Message::NoteOn { note, velocity, .. } => {
                ("note_on", Some(*note), Some(*velocity), None, None, None, None)
            }
            Message::NoteOff { note, velocity, .. } => {
                ("note_off", Some(*note), Some(*velocity), None, None, None, None)
            }
            Message::ControlChange { control, value, .. } => {
                ("control_change", None, None, Some(*control), Some(*value), None, None)
            }
            Message::ProgramChange { program, .. } => {
                ("program_change", None, None, None, None, Some(*program), None)
            }
            Message::PitchWheel { pitch, .. } => {
                ("pitchwheel", None, None, None, None, None, Some(*pitch))
            }
            Message::Other { .. } => ("other", None, None, None, None, None, None),
        };
        Self {
            time: event.offset_s,
            kind: kind.to_string(),
            channel,
            note,
            velocity,
            control,
            value,
            program,
            pitch,
        }
    }
}

impl EventRecord {
    /// Reconstruct an `Event`, or `None` for an unrecognized `type`.
    pub fn into_event(self) -> Option<Event> {
        let message = match self.kind.as_str() {
            "note_on" => Message::NoteOn {
                channel: self.channel,
                note: self.note?,
                velocity: self.velocity?,
            },
            "note_off" => Message::NoteOff {
                channel: self.channel,
                note: self.note?,
                velocity: self.velocity?,
            },
            "control_change" => Message::ControlChange {
                channel: self.channel,
                control: self.control?,
                value: self.value?,
            },
            "program_change" => Message::ProgramChange {
                channel: self.channel,
                program: self.program?,
            },
            "pitchwheel" => Message::PitchWheel {
                channel: self.channel,
                pitch: self.pitch?,
            },
            _ => return None,
        };
        Some(Event::new(self.time, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_event_record() {
        let event = Event::new(
            1.5,
            Message::NoteOn {
                channel: 3,
                note: 60,
                velocity: 100,
            },
        );
        let record = EventRecord::from(&event);
        let back = record.into_event().unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn unknown_type_is_skipped() {
        let record = EventRecord {
            time: 0.0,
            kind: "sysex".to_string(),
            channel: 0,
            note: None,
            velocity: None,
            control: None,
            value: None,
            program: None,
            pitch: None,
        };
        assert!(record.into_event().is_none());
    }
}
