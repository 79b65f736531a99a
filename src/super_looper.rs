//! Super Looper: lock every track to one shared loop length.

#[derive(Debug, Clone, Copy, Default)]
pub struct SuperLooperConfig {
    pub enabled: bool,
    pub duration_s: f64,
    pub duration_fixed: bool,
}

impl SuperLooperConfig {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            duration_s: 0.0,
            duration_fixed: false,
        }
    }

    /// Reset, e.g. on a delete-all: the next track closed picks a fresh
    /// shared duration.
    pub fn reset_duration(&mut self) {
        self.duration_s = 0.0;
        self.duration_fixed = false;
    }

    /// Finalize a track's duration at RECORDING -> IDLE close. The first
    /// non-empty close fixes the shared duration for every later track;
    /// subsequent closes are coerced to it regardless of how long they
    /// actually ran. Returns the duration the closing track should use.
    pub fn close_recording(&mut self, d_recorded: f64) -> f64 {
        if !self.enabled {
            return d_recorded;
        }
        if self.duration_fixed {
            return self.duration_s;
        }
        if d_recorded > 0.0 {
            self.duration_s = d_recorded;
            self.duration_fixed = true;
        }
        d_recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_super_looper_keeps_recorded_duration() {
        let mut cfg = SuperLooperConfig::new(false);
        assert_eq!(cfg.close_recording(4.25), 4.25);
    }

    #[test]
    fn first_recording_sets_and_fixes_duration() {
        let mut cfg = SuperLooperConfig::new(true);
        let d = cfg.close_recording(4.25);
        assert_eq!(d, 4.25);
        assert_eq!(cfg.duration_s, 4.25);
        assert!(cfg.duration_fixed);
    }

    #[test]
    fn subsequent_recordings_are_coerced_to_fixed_duration() {
        let mut cfg = SuperLooperConfig::new(true);
        cfg.close_recording(4.25);
        let d = cfg.close_recording(2.0);
        assert_eq!(d, 4.25);
    }

    #[test]
    fn zero_length_recording_does_not_fix_duration() {
        let mut cfg = SuperLooperConfig::new(true);
        let d = cfg.close_recording(0.0);
        assert_eq!(d, 0.0);
        assert!(!cfg.duration_fixed);
    }
}
