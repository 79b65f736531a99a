//! Paused-aware monotonic song clock.
//!
//! Song time is `now - base - accumulated_pause` while running, and frozen
//! at the value observed at pause entry while paused. Built on
//! `Instant`, never wall time, so it cannot regress under clock
//! adjustments.

use std::time::Instant;

#[derive(Debug)]
pub struct Clock {
    base: Instant,
    accumulated_pause: f64,
    pause_mark: Option<(Instant, f64)>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            accumulated_pause: 0.0,
            pause_mark: None,
        }
    }

    /// Monotonic seconds since an arbitrary fixed epoch (not song time).
    pub fn now(&self) -> f64 {
        self.base.elapsed().as_secs_f64()
    }

    /// Song time: seconds since `reset`, minus time spent paused.
    pub fn song_time(&self) -> f64 {
        match self.pause_mark {
            Some((_, frozen_at)) => frozen_at,
            None => self.base.elapsed().as_secs_f64() - self.accumulated_pause,
        }
    }

    /// Enter the paused state; song time freezes at its current value.
    pub fn pause(&mut self) {
        if self.pause_mark.is_none() {
            let frozen_at = self.base.elapsed().as_secs_f64() - self.accumulated_pause;
            self.pause_mark = Some((Instant::now(), frozen_at));
        }
    }

    /// Leave the paused state; the elapsed pause interval is folded into
    /// `accumulated_pause` so song time continues from where it froze.
    pub fn resume(&mut self) {
        if let Some((paused_at, _)) = self.pause_mark.take() {
            self.accumulated_pause += paused_at.elapsed().as_secs_f64();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_mark.is_some()
    }

    /// Reset the clock: `base := now()`, pause state and accumulation
    /// cleared.
    pub fn reset(&mut self) {
        self.base = Instant::now();
        self.accumulated_pause = 0.0;
        self.pause_mark = None;
    }

    pub fn accumulated_pause(&self) -> f64 {
        self.accumulated_pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn song_time_is_monotonic_while_running() {
        let clock = Clock::new();
        let a = clock.song_time();
        sleep(Duration::from_millis(5));
        let b = clock.song_time();
        assert!(b >= a);
    }

    #[test]
    fn song_time_freezes_while_paused() {
        let mut clock = Clock::new();
        sleep(Duration::from_millis(5));
        clock.pause();
        let frozen = clock.song_time();
        sleep(Duration::from_millis(20));
        assert_eq!(clock.song_time(), frozen);
    }

    #[test]
    fn resume_folds_pause_interval_into_accumulated_pause() {
        let mut clock = Clock::new();
        clock.pause();
        sleep(Duration::from_millis(20));
        clock.resume();
        assert!(clock.accumulated_pause() >= 0.015);
        assert!(!clock.is_paused());
    }

    #[test]
    fn reset_clears_accumulated_pause() {
        let mut clock = Clock::new();
        clock.pause();
        sleep(Duration::from_millis(10));
        clock.resume();
        clock.reset();
        assert_eq!(clock.accumulated_pause(), 0.0);
    }
}
