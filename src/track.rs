//! Track state and the ten-track store.

use crate::event::Event;
use crate::message::Message;
use std::sync::Mutex;

pub const NUM_TRACKS: usize = 10;

#[derive(Debug, Clone)]
pub struct Track {
    pub events: Vec<Event>,
    pub duration_s: f64,
    pub program: u8,
    pub bank_msb: u8,
    pub bank_lsb: u8,
    pub channel: u8,
}

impl Track {
    pub fn empty(channel: u8) -> Self {
        Self {
            events: Vec::new(),
            duration_s: 0.0,
            program: 0,
            bank_msb: 0,
            bank_lsb: 0,
            channel,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event, keeping `events` sorted non-decreasingly by
    /// offset. The caller must have already rewritten the message's
    /// channel to match this track.
    pub fn append(&mut self, offset_s: f64, message: Message) {
        debug_assert_eq!(
            message.channel(),
            Some(self.channel),
            "events appended to a track must already carry that track's channel"
        );
        self.events.push(Event::new(offset_s, message));
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.duration_s = 0.0;
    }

    pub fn set_duration(&mut self, seconds: f64) {
        self.duration_s = seconds;
    }

    pub fn set_tone(&mut self, program: u8, bank_msb: u8, bank_lsb: u8) {
        self.program = program;
        self.bank_msb = bank_msb;
        self.bank_lsb = bank_lsb;
    }

    /// `events` must stay sorted non-decreasingly by offset.
    pub fn is_sorted_by_offset(&self) -> bool {
        self.events.windows(2).all(|w| w[0].offset_s <= w[1].offset_s)
    }

    /// Every event's channel must equal the track's own channel.
    pub fn all_events_on_channel(&self) -> bool {
        self.events
            .iter()
            .all(|e| e.message.channel() == Some(self.channel) || e.message.channel().is_none())
    }

    /// `duration_s == 0` if and only if `events` is empty.
    pub fn duration_matches_emptiness(&self) -> bool {
        (self.duration_s == 0.0) == self.events.is_empty()
    }

    pub fn last_offset(&self) -> Option<f64> {
        self.events.last().map(|e| e.offset_s)
    }
}

/// A read-only view of one track handed to the Sequencer for playback.
pub struct PlaybackView {
    pub track_idx: usize,
    pub events: Vec<Event>,
    pub duration_s: f64,
    pub channel: u8,
}

/// In-memory state of the ten tracks, guarded by a single mutex so that
/// structural mutations (append / clear / bulk replace) and playback
/// snapshots never interleave inconsistently.
pub struct TrackStore {
    tracks: Mutex<[Track; NUM_TRACKS]>,
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackStore {
    pub fn new() -> Self {
        let tracks: Vec<Track> = (0..NUM_TRACKS as u8).map(Track::empty).collect();
        let tracks: [Track; NUM_TRACKS] = tracks
            .try_into()
            .unwrap_or_else(|_| unreachable!("NUM_TRACKS tracks were built"));
        Self {
            tracks: Mutex::new(tracks),
        }
    }

    /// Snapshot every non-excluded track for playback traversal.
    /// `exclude_idx` omits the currently-recording track.
    pub fn snapshot_for_playback(&self, exclude_idx: Option<usize>) -> Vec<PlaybackView> {
        let tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != exclude_idx)
            .map(|(idx, track)| PlaybackView {
                track_idx: idx,
                events: track.events.clone(),
                duration_s: track.duration_s,
                channel: track.channel,
            })
            .collect()
    }

    pub fn append(&self, idx: usize, offset_s: f64, message: Message) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].append(offset_s, message);
    }

    pub fn set_duration(&self, idx: usize, seconds: f64) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].set_duration(seconds);
    }

    pub fn clear(&self, idx: usize) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].clear();
    }

    pub fn clear_all(&self) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        for track in tracks.iter_mut() {
            track.clear();
        }
    }

    pub fn set_tone(&self, idx: usize, program: u8, bank_msb: u8, bank_lsb: u8) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].set_tone(program, bank_msb, bank_lsb);
    }

    pub fn channel_of(&self, idx: usize) -> u8 {
        let tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].channel
    }

    pub fn is_empty(&self, idx: usize) -> bool {
        let tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].is_empty()
    }

    pub fn tone_of(&self, idx: usize) -> (u8, u8, u8) {
        let tracks = self.tracks.lock().expect("track store mutex poisoned");
        let track = &tracks[idx];
        (track.program, track.bank_msb, track.bank_lsb)
    }

    /// Clone out a single track, e.g. for SMF export or a status report.
    pub fn clone_track(&self, idx: usize) -> Track {
        let tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx].clone()
    }

    pub fn clone_all(&self) -> [Track; NUM_TRACKS] {
        let tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks.clone()
    }

    /// Bulk-replace a single track's content (session/SMF import). The
    /// caller is responsible for ensuring this only happens while the
    /// transport is idle; the Sequencer's per-track cursor is never
    /// reconciled against a mid-play replace.
    pub fn replace(&self, idx: usize, track: Track) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        tracks[idx] = track;
    }

    /// Replace every track at once (session load).
    pub fn replace_all(&self, new_tracks: [Track; NUM_TRACKS]) {
        let mut tracks = self.tracks.lock().expect("track store mutex poisoned");
        *tracks = new_tracks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_track_is_empty_with_zero_duration() {
        let track = Track::empty(4);
        assert!(track.is_empty());
        assert_eq!(track.duration_s, 0.0);
        assert!(track.duration_matches_emptiness());
    }

    #[test]
    fn append_keeps_sorted_order() {
        let mut track = Track::empty(0);
        track.append(
            0.5,
            Message::NoteOn {
                channel: 0,
                note: 60,
                velocity: 100,
            },
        );
        track.append(
            1.5,
            Message::NoteOff {
                channel: 0,
                note: 60,
                velocity: 0,
            },
        );
        assert!(track.is_sorted_by_offset());
        assert!(track.all_events_on_channel());
    }

    #[test]
    fn clear_resets_duration_to_zero() {
        let mut track = Track::empty(0);
        track.append(
            0.1,
            Message::NoteOn {
                channel: 0,
                note: 1,
                velocity: 1,
            },
        );
        track.set_duration(2.0);
        track.clear();
        assert!(track.duration_matches_emptiness());
    }

    #[test]
    fn store_assigns_channel_equal_to_index() {
        let store = TrackStore::new();
        for i in 0..NUM_TRACKS {
            assert_eq!(store.channel_of(i), i as u8);
        }
    }

    #[test]
    fn exclude_idx_omits_the_recording_track_from_snapshot() {
        let store = TrackStore::new();
        store.append(
            2,
            0.0,
            Message::NoteOn {
                channel: 2,
                note: 1,
                velocity: 1,
            },
        );
        let snapshot = store.snapshot_for_playback(Some(2));
        assert!(snapshot.iter().all(|v| v.track_idx != 2));
    }
}
