//! Standard MIDI File export/import.
//!
//! Ticks per beat = 480, tempo = 500 000 microseconds/beat (120 BPM),
//! fixed for every export; a `set_tempo` meta message is always
//! written first.

use crate::error::EngineError;
use crate::event::Event;
use crate::message::Message;
use crate::track::Track;
use midly::{
    num::u28, Format, Header, MetaMessage, Smf, Timing, Track as MidiTrack, TrackEvent,
    TrackEventKind,
};

pub const TICKS_PER_BEAT: u16 = 480;
pub const TEMPO_US_PER_BEAT: u32 = 500_000;

fn ticks_per_second() -> f64 {
    TICKS_PER_BEAT as f64 / (TEMPO_US_PER_BEAT as f64 / 1_000_000.0)
}

fn seconds_to_ticks(seconds: f64) -> u32 {
    (seconds * ticks_per_second()).round().max(0.0) as u32
}

fn ticks_to_seconds(ticks: u32, ticks_per_beat: u16, us_per_beat: u32) -> f64 {
    let tps = ticks_per_beat as f64 / (us_per_beat as f64 / 1_000_000.0);
    ticks as f64 / tps
}

fn tempo_meta_event() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(midly::num::u24::new(
            TEMPO_US_PER_BEAT,
        ))),
    }
}

fn events_to_midi_track(events: &[(f64, &Message)]) -> MidiTrack<'static> {
    let mut track = vec![tempo_meta_event()];
    let mut prev_ticks: i64 = 0;
    for (offset_s, message) in events {
        let Some((channel, midi_message)) = message.to_midly_pair() else {
            continue;
        };
        let ticks = seconds_to_ticks(*offset_s) as i64;
        let delta = (ticks - prev_ticks).max(0) as u32;
        prev_ticks = ticks;
        track.push(TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel,
                message: midi_message,
            },
        });
    }
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    track
}

fn header(format: Format) -> Header {
    Header {
        format,
        timing: Timing::Metrical(midly::num::u15::new(TICKS_PER_BEAT)),
    }
}

/// Merge every non-empty track's events into a single MIDI track, sorted
/// by absolute time and delta-encoded.
pub fn export_merged(tracks: &[Track]) -> Result<Vec<u8>, EngineError> {
    let mut all: Vec<(f64, &Message)> = tracks
        .iter()
        .flat_map(|t| t.events.iter().map(|e| (e.offset_s, &e.message)))
        .collect();
    all.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let midi_track = events_to_midi_track(&all);
    let smf = Smf {
        header: header(Format::SingleTrack),
        tracks: vec![midi_track],
    };
    let mut buf = Vec::new();
    smf.write(&mut buf).map_err(|e| EngineError::Smf(e.to_string()))?;
    Ok(buf)
}

/// One MIDI file per non-empty track.
pub fn export_separate(tracks: &[Track]) -> Result<Vec<(usize, Vec<u8>)>, EngineError> {
    let mut out = Vec::new();
    for (idx, track) in tracks.iter().enumerate() {
        if track.is_empty() {
            continue;
        }
        let events: Vec<(f64, &Message)> =
            track.events.iter().map(|e| (e.offset_s, &e.message)).collect();
        let midi_track = events_to_midi_track(&events);
        let smf = Smf {
            header: header(Format::SingleTrack),
            tracks: vec![midi_track],
        };
        let mut buf = Vec::new();
        smf.write(&mut buf).map_err(|e| EngineError::Smf(e.to_string()))?;
        out.push((idx, buf));
    }
    Ok(out)
}

/// The result of importing one Standard MIDI File: events plus the tone
/// the last observed `program_change` set, and the duration (the last
/// event's time plus half a second of tail room).
pub struct ImportedTrack {
    pub events: Vec<Event>,
    pub program: Option<u8>,
    pub duration_s: f64,
}

/// Import a Standard MIDI File, merging all of its tracks on absolute
/// time. Absolute times are reconstructed by accumulating deltas,
/// respecting in-stream `set_tempo` changes.
pub fn import(bytes: &[u8]) -> Result<ImportedTrack, EngineError> {
    let smf = Smf::parse(bytes).map_err(|e| EngineError::Smf(e.to_string()))?;

    let ticks_per_beat: u16 = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(..) => {
            return Err(EngineError::Smf(
                "timecode timing is unsupported".to_string(),
            ))
        }
    };

    let mut events = Vec::new();
    let mut program = None;
    let mut us_per_beat = TEMPO_US_PER_BEAT;

    for midi_track in &smf.tracks {
        let mut track_ticks: u64 = 0;
        for event in midi_track {
            track_ticks += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    us_per_beat = tempo.as_int();
                }
                TrackEventKind::Midi { channel, message } => {
                    if let Some(msg) = Message::from_midly_pair(channel, &message) {
                        if msg.is_program_change() {
                            if let Message::ProgramChange { program: p, .. } = msg {
                                program = Some(p);
                            }
                        }
                        let offset_s = ticks_to_seconds(track_ticks as u32, ticks_per_beat, us_per_beat);
                        events.push(Event::new(offset_s, msg));
                    }
                }
                _ => {}
            }
        }
    }

    events.sort_by(|a, b| a.offset_s.partial_cmp(&b.offset_s).unwrap_or(std::cmp::Ordering::Equal));
    let duration_s = events.last().map(|e| e.offset_s + 0.5).unwrap_or(0.0);

    Ok(ImportedTrack {
        events,
        program,
        duration_s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Track;

    #[test]
    fn round_trips_a_single_track() {
        let mut track = Track::empty(0);
        track.append(
            0.0,
            Message::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100,
            },
        );
        track.append(
            1.0,
            Message::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            },
        );
        track.set_duration(1.5);

        let bytes = export_merged(std::slice::from_ref(&track)).unwrap();
        let imported = import(&bytes).unwrap();

        assert_eq!(imported.events.len(), 2);
        assert_eq!(imported.events[0].message, track.events[0].message);
        assert_eq!(imported.events[1].message, track.events[1].message);
        assert!((imported.events[1].offset_s - 1.0).abs() < 0.01);
    }

    #[test]
    fn import_sets_duration_to_last_event_plus_half_second() {
        let mut track = Track::empty(0);
        track.append(
            2.0,
            Message::NoteOn {
                channel: 0,
                note: 1,
                velocity: 1,
            },
        );
        track.set_duration(2.0);
        let bytes = export_merged(std::slice::from_ref(&track)).unwrap();
        let imported = import(&bytes).unwrap();
        assert!((imported.duration_s - 2.5).abs() < 0.01);
    }

    #[test]
    fn export_separate_skips_empty_tracks() {
        let tracks = vec![Track::empty(0), Track::empty(1)];
        let files = export_separate(&tracks).unwrap();
        assert!(files.is_empty());
    }
}
