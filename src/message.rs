//! Tagged MIDI message type.
//!
//! Replaces duck-typed attribute probing (as the source's `getattr(msg,
//! 'note', None)` does) with a pattern-matchable variant, per the design
//! note "Duck-typed MIDI message handling". Serialization, channel remap,
//! and dispatch all match on this enum instead of poking at raw bytes.

use midly::{live::LiveEvent, num::u7, MidiMessage};

pub const CC_BANK_MSB: u8 = 0;
pub const CC_BANK_LSB: u8 = 32;
pub const CC_SUSTAIN: u8 = 64;
pub const CC_ALL_SOUND_OFF: u8 = 120;
pub const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, control: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    PitchWheel { channel: u8, pitch: i16 },
    /// Anything the engine does not interpret (aftertouch, sysex, ...).
    /// Kept verbatim so recording never silently drops input.
    Other { channel: Option<u8>, bytes: Vec<u8> },
}

impl Message {
    pub fn channel(&self) -> Option<u8> {
        match self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::PitchWheel { channel, .. } => Some(*channel),
            Self::Other { channel, .. } => *channel,
        }
    }

    /// Rewrite the channel field. Used on record: stored events must be
    /// tone-isolated per track regardless of the input device's channel.
    pub fn with_channel(&self, new_channel: u8) -> Self {
        match self {
            Self::NoteOn { note, velocity, .. } => Self::NoteOn {
                channel: new_channel,
                note: *note,
                velocity: *velocity,
            },
            Self::NoteOff { note, velocity, .. } => Self::NoteOff {
                channel: new_channel,
                note: *note,
                velocity: *velocity,
            },
            Self::ControlChange { control, value, .. } => Self::ControlChange {
                channel: new_channel,
                control: *control,
                value: *value,
            },
            Self::ProgramChange { program, .. } => Self::ProgramChange {
                channel: new_channel,
                program: *program,
            },
            Self::PitchWheel { pitch, .. } => Self::PitchWheel {
                channel: new_channel,
                pitch: *pitch,
            },
            Self::Other { bytes, .. } => {
                let mut bytes = bytes.clone();
                if let Some(status) = bytes.first_mut() {
                    *status = (*status & 0xF0) | (new_channel & 0x0F);
                }
                Self::Other {
                    channel: Some(new_channel),
                    bytes,
                }
            }
        }
    }

    /// Parse a raw 1-3 byte live MIDI message, as delivered by `midir`'s
    /// input callback.
    pub fn from_live_bytes(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let status = data[0];
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 if data.len() >= 3 => Some(Self::NoteOff {
                channel,
                note: data[1] & 0x7F,
                velocity: data[2] & 0x7F,
            }),
            0x90 if data.len() >= 3 => {
                let note = data[1] & 0x7F;
                let velocity = data[2] & 0x7F;
                if velocity == 0 {
                    Some(Self::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    })
                } else {
                    Some(Self::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            0xB0 if data.len() >= 3 => Some(Self::ControlChange {
                channel,
                control: data[1] & 0x7F,
                value: data[2] & 0x7F,
            }),
            0xC0 if data.len() >= 2 => Some(Self::ProgramChange {
                channel,
                program: data[1] & 0x7F,
            }),
            0xE0 if data.len() >= 3 => {
                let raw = (data[1] as i16 & 0x7F) | ((data[2] as i16 & 0x7F) << 7);
                Some(Self::PitchWheel {
                    channel,
                    pitch: raw - 8192,
                })
            }
            0xF0 => Some(Self::Other {
                channel: None,
                bytes: data.to_vec(),
            }),
            _ if status & 0x80 != 0 => Some(Self::Other {
                channel: Some(channel),
                bytes: data.to_vec(),
            }),
            _ => None,
        }
    }

    /// Encode as raw live MIDI bytes for sending out through `midir`.
    pub fn to_live_bytes(&self) -> Vec<u8> {
        match self {
            Self::Other { bytes, .. } => bytes.clone(),
            _ => {
                let live = self
                    .as_live_event()
                    .expect("non-Other variants always convert to a LiveEvent");
                let mut buf = Vec::new();
                live.write_std(&mut buf).expect("writing to a Vec cannot fail");
                buf
            }
        }
    }

    fn as_live_event(&self) -> Option<LiveEvent<'static>> {
        let (channel, message) = self.to_midly_pair()?;
        Some(LiveEvent::Midi { channel, message })
    }

    /// Convert to `(channel, midly::MidiMessage)`, the shape both live
    /// dispatch and Standard MIDI File export need. `None` for `Other`,
    /// which an SMF exporter should skip rather than fabricate.
    pub(crate) fn to_midly_pair(&self) -> Option<(midly::num::u4, MidiMessage)> {
        use midly::num::u4;
        match *self {
            Self::NoteOn {
                channel,
                note,
                velocity,
            } => Some((
                u4::new(channel),
                MidiMessage::NoteOn {
                    key: u7::new(note),
                    vel: u7::new(velocity),
                },
            )),
            Self::NoteOff {
                channel,
                note,
                velocity,
            } => Some((
                u4::new(channel),
                MidiMessage::NoteOff {
                    key: u7::new(note),
                    vel: u7::new(velocity),
                },
            )),
            Self::ControlChange {
                channel,
                control,
                value,
            } => Some((
                u4::new(channel),
                MidiMessage::Controller {
                    controller: u7::new(control),
                    value: u7::new(value),
                },
            )),
            Self::ProgramChange { channel, program } => Some((
                u4::new(channel),
                MidiMessage::ProgramChange {
                    program: u7::new(program),
                },
            )),
            Self::PitchWheel { channel, pitch } => {
                let raw = (pitch + 8192).clamp(0, 0x3FFF) as u16;
                Some((
                    u4::new(channel),
                    MidiMessage::PitchBend {
                        bend: midly::PitchBend(u14_from_u16(raw)),
                    },
                ))
            }
            Self::Other { .. } => None,
        }
    }

    /// Reconstruct a `Message` from a parsed `midly` channel message, as
    /// seen on Standard MIDI File import.
    pub(crate) fn from_midly_pair(channel: midly::num::u4, message: &MidiMessage) -> Option<Self> {
        let channel = channel.as_int();
        Some(match *message {
            MidiMessage::NoteOn { key, vel } => {
                let note = key.as_int();
                let velocity = vel.as_int();
                if velocity == 0 {
                    Self::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    }
                } else {
                    Self::NoteOn {
                        channel,
                        note,
                        velocity,
                    }
                }
            }
            MidiMessage::NoteOff { key, vel } => Self::NoteOff {
                channel,
                note: key.as_int(),
                velocity: vel.as_int(),
            },
            MidiMessage::Controller { controller, value } => Self::ControlChange {
                channel,
                control: controller.as_int(),
                value: value.as_int(),
            },
            MidiMessage::ProgramChange { program } => Self::ProgramChange {
                channel,
                program: program.as_int(),
            },
            MidiMessage::PitchBend { bend } => Self::PitchWheel {
                channel,
                pitch: bend.0.as_int() as i16 - 8192,
            },
            _ => return None,
        })
    }

    pub fn is_program_change(&self) -> bool {
        matches!(self, Self::ProgramChange { .. })
    }

    pub fn is_bank_msb_cc(&self) -> bool {
        matches!(self, Self::ControlChange { control, .. } if *control == CC_BANK_MSB)
    }

    pub fn is_bank_lsb_cc(&self) -> bool {
        matches!(self, Self::ControlChange { control, .. } if *control == CC_BANK_LSB)
    }
}

fn u14_from_u16(value: u16) -> midly::num::u14 {
    midly::num::u14::new(value)
}

/// Helper used by `panic()` and by tests: an All-Notes-Off + All-Sound-Off
/// pair plus 128 explicit `note_off`s for one channel.
pub fn panic_messages_for_channel(channel: u8) -> Vec<Message> {
    let mut out = Vec::with_capacity(2 + 128);
    out.push(Message::ControlChange {
        channel,
        control: CC_ALL_NOTES_OFF,
        value: 0,
    });
    out.push(Message::ControlChange {
        channel,
        control: CC_ALL_SOUND_OFF,
        value: 0,
    });
    for note in 0..128u8 {
        out.push(Message::NoteOff {
            channel,
            note,
            velocity: 0,
        });
    }
    out
}

#[allow(dead_code)]
fn _assert_u7(v: u7) -> u7 {
    v
}
