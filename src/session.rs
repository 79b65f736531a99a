//! Session persistence: two JSON files, the normal session and the
//! Super Looper session, each holding all ten tracks plus tone and
//! Super Looper state.

use crate::event::EventRecord;
use crate::super_looper::SuperLooperConfig;
use crate::track::{Track, NUM_TRACKS};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionFile {
    pub tracks: Vec<Vec<EventRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durations: Option<Vec<f64>>,
    pub programs: Vec<u8>,
    pub channels: Vec<u8>,
    pub bank_msb: Vec<u8>,
    pub bank_lsb: Vec<u8>,
    pub super_looper_enabled: bool,
    pub super_looper_duration: f64,
    pub super_looper_duration_set: bool,
}

impl SessionFile {
    pub fn from_state(tracks: &[Track; NUM_TRACKS], super_looper: &SuperLooperConfig) -> Self {
        let mut file = Self {
            tracks: Vec::with_capacity(NUM_TRACKS),
            durations: Some(Vec::with_capacity(NUM_TRACKS)),
            programs: Vec::with_capacity(NUM_TRACKS),
            channels: Vec::with_capacity(NUM_TRACKS),
            bank_msb: Vec::with_capacity(NUM_TRACKS),
            bank_lsb: Vec::with_capacity(NUM_TRACKS),
            super_looper_enabled: super_looper.enabled,
            super_looper_duration: super_looper.duration_s,
            super_looper_duration_set: super_looper.duration_fixed,
        };
        let durations = file.durations.as_mut().expect("just constructed");
        for track in tracks {
            file.tracks
                .push(track.events.iter().map(EventRecord::from).collect());
            durations.push(track.duration_s);
            file.programs.push(track.program);
            file.channels.push(track.channel);
            file.bank_msb.push(track.bank_msb);
            file.bank_lsb.push(track.bank_lsb);
        }
        file
    }

    /// Reconstruct the ten tracks and Super Looper config this file
    /// describes. Unknown event types are skipped; if `durations` is
    /// absent, each track's duration is reconstructed as
    /// its last event's `time`.
    pub fn into_state(self) -> ([Track; NUM_TRACKS], SuperLooperConfig) {
        let mut tracks: Vec<Track> = Vec::with_capacity(NUM_TRACKS);
        for idx in 0..NUM_TRACKS {
            let channel = self.channels.get(idx).copied().unwrap_or(idx as u8);
            let mut track = Track::empty(channel);
            if let Some(program) = self.programs.get(idx).copied() {
                let bank_msb = self.bank_msb.get(idx).copied().unwrap_or(0);
                let bank_lsb = self.bank_lsb.get(idx).copied().unwrap_or(0);
                track.set_tone(program, bank_msb, bank_lsb);
            }
            if let Some(records) = self.tracks.get(idx) {
                for record in records {
                    if let Some(event) = record.clone().into_event() {
                        track.events.push(event);
                    }
                }
            }
            let duration = self
                .durations
                .as_ref()
                .and_then(|d| d.get(idx).copied())
                .unwrap_or_else(|| track.last_offset().unwrap_or(0.0));
            track.set_duration(duration);
            tracks.push(track);
        }
        let tracks: [Track; NUM_TRACKS] = tracks
            .try_into()
            .unwrap_or_else(|_| unreachable!("NUM_TRACKS tracks were built"));

        let super_looper = SuperLooperConfig {
            enabled: self.super_looper_enabled,
            duration_s: self.super_looper_duration,
            duration_fixed: self.super_looper_duration_set,
        };
        (tracks, super_looper)
    }

    fn empty() -> Self {
        Self {
            tracks: vec![Vec::new(); NUM_TRACKS],
            durations: Some(vec![0.0; NUM_TRACKS]),
            programs: vec![0; NUM_TRACKS],
            channels: (0..NUM_TRACKS as u8).collect(),
            bank_msb: vec![0; NUM_TRACKS],
            bank_lsb: vec![0; NUM_TRACKS],
            super_looper_enabled: false,
            super_looper_duration: 0.0,
            super_looper_duration_set: false,
        }
    }
}

/// Write the session atomically enough for a single-process embedded
/// target: write-then-rename is skipped in favor of a direct write,
/// since a torn write here only costs one session file.
pub fn save(path: impl AsRef<Path>, tracks: &[Track; NUM_TRACKS], super_looper: &SuperLooperConfig) {
    let file = SessionFile::from_state(tracks, super_looper);
    match serde_json::to_vec_pretty(&file) {
        Ok(bytes) => {
            if let Err(err) = std::fs::write(&path, bytes) {
                log::error!("session: failed to write {:?}: {err}", path.as_ref());
            }
        }
        Err(err) => log::error!("session: failed to serialize: {err}"),
    }
}

/// Load a session file. Any failure (missing file, corrupt JSON)
/// degrades to an empty ten-track session rather than propagating.
pub fn load(path: impl AsRef<Path>) -> ([Track; NUM_TRACKS], SuperLooperConfig) {
    let result = std::fs::read(&path).map_err(crate::error::EngineError::from).and_then(|bytes| {
        serde_json::from_slice::<SessionFile>(&bytes).map_err(crate::error::EngineError::from)
    });
    match result {
        Ok(file) => file.into_state(),
        Err(err) => {
            log::warn!("session: load {:?} failed ({err}), starting empty", path.as_ref());
            SessionFile::empty().into_state()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn round_trips_through_json() {
        let mut tracks: Vec<Track> = (0..NUM_TRACKS as u8).map(Track::empty).collect();
        tracks[0].append(
            0.0,
            Message::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100,
            },
        );
        tracks[0].set_duration(1.0);
        tracks[0].set_tone(5, 1, 2);
        let tracks: [Track; NUM_TRACKS] = tracks.try_into().unwrap();
        let super_looper = SuperLooperConfig {
            enabled: true,
            duration_s: 1.0,
            duration_fixed: true,
        };

        let file = SessionFile::from_state(&tracks, &super_looper);
        let json = serde_json::to_vec(&file).unwrap();
        let parsed: SessionFile = serde_json::from_slice(&json).unwrap();
        let (restored, restored_looper) = parsed.into_state();

        assert_eq!(restored[0].events.len(), 1);
        assert_eq!(restored[0].duration_s, 1.0);
        assert_eq!(restored[0].program, 5);
        assert!(restored_looper.enabled);
        assert!(restored_looper.duration_fixed);
    }

    #[test]
    fn missing_durations_falls_back_to_last_event_time() {
        let mut file = SessionFile::empty();
        file.durations = None;
        file.tracks[3] = vec![EventRecord {
            time: 3.25,
            kind: "note_on".to_string(),
            channel: 3,
            note: Some(1),
            velocity: Some(1),
            control: None,
            value: None,
            program: None,
            pitch: None,
        }];
        let (tracks, _) = file.into_state();
        assert_eq!(tracks[3].duration_s, 3.25);
    }

    #[test]
    fn load_of_missing_file_degrades_to_empty_session() {
        let (tracks, looper) = load("/nonexistent/path/to/decaloop-session.json");
        assert!(tracks.iter().all(Track::is_empty));
        assert!(!looper.enabled);
    }
}
