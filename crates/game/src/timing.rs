use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Caps the loop rate by sleeping out what is left of each tick's budget.
///
/// It only ever slows the loop down; a tick that overruns its budget is not
/// made up for later.
#[derive(Debug)]
pub struct FrameLimiter {
    budget: Duration,
    last: Instant,
}

impl FrameLimiter {
    pub fn new(target_fps: u32) -> Self {
        assert!(target_fps > 0, "target fps must be positive");
        Self {
            budget: Duration::from_secs(1) / target_fps,
            last: Instant::now(),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Sleep until one budget has passed since the previous call (or since
    /// construction), then return the time actually elapsed.
    pub fn delay(&mut self) -> Duration {
        let spent = self.last.elapsed();
        if spent < self.budget {
            std::thread::sleep(self.budget - spent);
        }
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        elapsed
    }
}

/// Rolling window over the most recent tick durations, for the overlay.
///
/// The sum of the window is kept alongside it.
#[derive(Debug)]
pub struct FrameTimer {
    window: VecDeque<Duration>,
    limit: usize,
    total: Duration,
}

impl FrameTimer {
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "frame timer needs room for one sample");
        Self {
            window: VecDeque::with_capacity(limit),
            limit,
            total: Duration::ZERO,
        }
    }

    /// Add a tick duration, evicting the oldest once the window is full.
    pub fn record(&mut self, dt: Duration) {
        if self.window.len() == self.limit {
            if let Some(oldest) = self.window.pop_front() {
                self.total -= oldest;
            }
        }
        self.window.push_back(dt);
        self.total += dt;
    }

    pub fn last(&self) -> Option<Duration> {
        self.window.back().copied()
    }

    pub fn average(&self) -> Duration {
        match self.window.len() {
            0 => Duration::ZERO,
            n => self.total / n as u32,
        }
    }

    pub fn max(&self) -> Duration {
        self.window.iter().max().copied().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.window.iter().min().copied().unwrap_or_default()
    }

    /// Ticks per second implied by the average duration.
    pub fn average_fps(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg > 0.0 { avg.recip() } else { 0.0 }
    }

    pub fn count(&self) -> usize {
        self.window.len()
    }
}
