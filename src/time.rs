//! Wall-clock to game-time conversion.
//!
//! `draw_web()` runs at ~60fps with a variable delta. `GameTime` turns frame
//! timestamps into clamped deltas, and `GameClock` feeds those deltas into two
//! repeating timers: the 1s passive tick and the 30s autosave. Everything is
//! driven by explicit timestamps, so tests never wait on real time.

use crate::idle::config::GameConfig;

/// Frame timestamp tracker.
pub struct GameTime {
    /// Longest delta a single frame may report.
    max_delta_ms: f64,
    /// Timestamp of the last update (ms), None before the first frame.
    last_timestamp: Option<f64>,
    /// Total clamped milliseconds seen.
    pub total_ms: f64,
}

impl GameTime {
    pub fn new(max_delta_ms: f64) -> Self {
        Self {
            max_delta_ms,
            last_timestamp: None,
            total_ms: 0.0,
        }
    }

    /// Feed a wall-clock timestamp (`performance.now()`). Returns the elapsed
    /// milliseconds since the previous call, clamped to `[0, max_delta_ms]`.
    /// The first call returns 0.
    pub fn update(&mut self, now_ms: f64) -> f64 {
        let delta = match self.last_timestamp {
            // A backgrounded tab resumes with one capped frame, not a burst.
            Some(prev) => (now_ms - prev).clamp(0.0, self.max_delta_ms),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);
        self.total_ms += delta;
        delta
    }

    /// Forget the last timestamp so the next frame starts a fresh delta.
    pub fn reset(&mut self) {
        self.last_timestamp = None;
    }
}

/// A repeating timer with a fixed period.
#[derive(Debug, Clone)]
pub struct Interval {
    period_ms: f64,
    elapsed_ms: f64,
    armed: bool,
}

impl Interval {
    /// Created disarmed.
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            elapsed_ms: 0.0,
            armed: false,
        }
    }

    /// Arm the timer with a fresh period. Arming an armed timer restarts it;
    /// there is never more than one schedule per interval.
    pub fn arm(&mut self) {
        self.elapsed_ms = 0.0;
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
        self.elapsed_ms = 0.0;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Advance by `delta_ms`; returns how many times the timer fired.
    pub fn advance(&mut self, delta_ms: f64) -> u32 {
        if !self.armed || !(self.period_ms > 0.0) || !delta_ms.is_finite() || delta_ms <= 0.0 {
            return 0;
        }
        self.elapsed_ms += delta_ms;
        let fires = (self.elapsed_ms / self.period_ms).floor();
        self.elapsed_ms -= fires * self.period_ms;
        fires as u32
    }
}

/// What came due during one clock advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockFires {
    pub ticks: u32,
    pub autosaves: u32,
}

impl ClockFires {
    pub fn is_empty(&self) -> bool {
        self.ticks == 0 && self.autosaves == 0
    }
}

/// The tick driver: passive tick timer plus autosave timer.
pub struct GameClock {
    time: GameTime,
    tick: Interval,
    autosave: Interval,
}

impl GameClock {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            time: GameTime::new(config.max_frame_delta_ms),
            tick: Interval::new(config.tick_period_ms),
            autosave: Interval::new(config.autosave_period_ms),
        }
    }

    /// Arm both timers. Safe to call repeatedly.
    pub fn start(&mut self) {
        if self.is_running() {
            log::debug!("clock already running, re-arming");
        }
        self.tick.arm();
        self.autosave.arm();
        self.time.reset();
    }

    pub fn stop(&mut self) {
        self.tick.disarm();
        self.autosave.disarm();
    }

    pub fn is_running(&self) -> bool {
        self.tick.is_armed() || self.autosave.is_armed()
    }

    /// Advance both timers by an explicit delta.
    pub fn advance_ms(&mut self, delta_ms: f64) -> ClockFires {
        ClockFires {
            ticks: self.tick.advance(delta_ms),
            autosaves: self.autosave.advance(delta_ms),
        }
    }

    /// Advance from a frame timestamp.
    pub fn frame(&mut self, now_ms: f64) -> ClockFires {
        let delta = self.time.update(now_ms);
        self.advance_ms(delta)
    }
}
