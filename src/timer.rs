//! Second-granularity timekeeping: the per-question countdown and the
//! global run stopwatch. Both advance only when the engine feeds them a
//! tick, so tests can drive time directly.

/// Outcome of advancing a [`QuestionCountdown`] by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Still counting, with the seconds left after this tick.
    Running(u32),
    /// Just hit zero. Reported exactly once per countdown.
    Expired,
    /// Already expired earlier; nothing to report.
    Spent,
}

/// Countdown for the question currently on screen.
#[derive(Debug, Clone)]
pub struct QuestionCountdown {
    remaining: u32,
    expired: bool,
}

impl QuestionCountdown {
    /// A fresh countdown of `secs` seconds.
    pub fn new(secs: u32) -> Self {
        Self {
            remaining: secs,
            expired: false,
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advance one second.
    pub fn tick(&mut self) -> CountdownTick {
        if self.expired {
            return CountdownTick::Spent;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            CountdownTick::Expired
        } else {
            CountdownTick::Running(self.remaining)
        }
    }
}

/// Wall-clock style stopwatch for the whole run.
///
/// Starts when the first round begins, pauses on elimination, resumes on
/// revival, and freezes for good at the finish. The elapsed total is what
/// tie-breaks the leaderboard.
#[derive(Debug, Clone, Default)]
pub struct GlobalStopwatch {
    started: bool,
    running: bool,
    elapsed_secs: u32,
}

impl GlobalStopwatch {
    /// Begin counting. Calling again while already started does nothing, so
    /// re-entering the first round never resets the clock.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.running = true;
    }

    /// Freeze the clock, keeping the elapsed total.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Continue counting from the frozen total, starting fresh if the
    /// clock never ran.
    pub fn resume(&mut self) {
        if self.started {
            self.running = true;
        } else {
            self.start();
        }
    }

    /// Discard all progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance one second; reports the new total only while running.
    pub fn tick(&mut self) -> Option<u32> {
        if !self.running {
            return None;
        }
        self.elapsed_secs += 1;
        Some(self.elapsed_secs)
    }

    /// Total seconds counted so far.
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Whether the clock is currently advancing.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_runs_down_then_expires_once() {
        let mut countdown = QuestionCountdown::new(3);
        assert_eq!(countdown.tick(), CountdownTick::Running(2));
        assert_eq!(countdown.tick(), CountdownTick::Running(1));
        assert_eq!(countdown.tick(), CountdownTick::Expired);
        assert_eq!(countdown.tick(), CountdownTick::Spent);
        assert_eq!(countdown.tick(), CountdownTick::Spent);
    }

    #[test]
    fn zero_second_countdown_expires_immediately() {
        let mut countdown = QuestionCountdown::new(0);
        assert_eq!(countdown.tick(), CountdownTick::Expired);
        assert_eq!(countdown.tick(), CountdownTick::Spent);
    }

    #[test]
    fn stopwatch_counts_only_while_running() {
        let mut stopwatch = GlobalStopwatch::default();
        assert_eq!(stopwatch.tick(), None);
        stopwatch.start();
        assert_eq!(stopwatch.tick(), Some(1));
        assert_eq!(stopwatch.tick(), Some(2));
        stopwatch.stop();
        assert_eq!(stopwatch.tick(), None);
        assert_eq!(stopwatch.elapsed_secs(), 2);
    }

    #[test]
    fn start_is_idempotent() {
        let mut stopwatch = GlobalStopwatch::default();
        stopwatch.start();
        stopwatch.tick();
        stopwatch.start();
        assert_eq!(stopwatch.elapsed_secs(), 1);
        assert!(stopwatch.is_running());
    }

    #[test]
    fn resume_continues_from_the_frozen_total() {
        let mut stopwatch = GlobalStopwatch::default();
        stopwatch.start();
        stopwatch.tick();
        stopwatch.stop();
        stopwatch.resume();
        assert_eq!(stopwatch.tick(), Some(2));
    }

    #[test]
    fn resume_on_a_fresh_clock_starts_it() {
        let mut stopwatch = GlobalStopwatch::default();
        stopwatch.resume();
        assert_eq!(stopwatch.tick(), Some(1));
    }

    #[test]
    fn reset_discards_everything() {
        let mut stopwatch = GlobalStopwatch::default();
        stopwatch.start();
        stopwatch.tick();
        stopwatch.reset();
        assert_eq!(stopwatch.elapsed_secs(), 0);
        assert_eq!(stopwatch.tick(), None);
    }
}
