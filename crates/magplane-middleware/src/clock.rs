//! Frame pacing.
//!
//! The pipeline renders once per [`FrameClock`] tick.  Production runs use
//! [`IntervalClock`] (display-rate, missed ticks skipped rather than bursted);
//! tests use [`CountedClock`], which ticks a fixed number of times as fast as
//! the scheduler allows and then reports exhaustion.

use std::time::Duration;

use async_trait::async_trait;
use magplane_types::{MagplaneError, ensure_positive};
use tokio::time::{self, Interval, MissedTickBehavior};

pub const DEFAULT_FPS: f32 = 60.0;

#[async_trait]
pub trait FrameClock: Send {
    /// Wait for the next frame.  Returns the zero-based tick number, or
    /// `None` once the clock has no more ticks to give.
    async fn next_tick(&mut self) -> Option<u64>;
}

/// Real-time clock ticking at a fixed rate, optionally for a bounded
/// number of frames.
#[derive(Debug)]
pub struct IntervalClock {
    period: Duration,
    // Created on first use so the clock can be built outside a runtime.
    interval: Option<Interval>,
    ticks: u64,
    limit: Option<u64>,
}

impl IntervalClock {
    pub fn new(fps: f32) -> Result<Self, MagplaneError> {
        ensure_positive("clock.fps", fps)?;
        Ok(Self {
            period: Duration::from_secs_f32(1.0 / fps),
            interval: None,
            ticks: 0,
            limit: None,
        })
    }

    /// Stop after `frames` ticks.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self {
            period: Duration::from_secs_f32(1.0 / DEFAULT_FPS),
            interval: None,
            ticks: 0,
            limit: None,
        }
    }
}

#[async_trait]
impl FrameClock for IntervalClock {
    async fn next_tick(&mut self) -> Option<u64> {
        if self.limit.is_some_and(|limit| self.ticks >= limit) {
            return None;
        }
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut iv = time::interval(period);
            iv.set_missed_tick_behavior(MissedTickBehavior::Skip);
            iv
        });
        interval.tick().await;
        let tick = self.ticks;
        self.ticks += 1;
        Some(tick)
    }
}

/// Ticks exactly `n` times, yielding to the scheduler before each tick.
#[derive(Debug, Clone)]
pub struct CountedClock {
    total: u64,
    ticks: u64,
}

impl CountedClock {
    pub fn new(total: u64) -> Self {
        Self { total, ticks: 0 }
    }

    pub fn remaining(&self) -> u64 {
        self.total - self.ticks
    }
}

#[async_trait]
impl FrameClock for CountedClock {
    async fn next_tick(&mut self) -> Option<u64> {
        if self.ticks >= self.total {
            return None;
        }
        tokio::task::yield_now().await;
        let tick = self.ticks;
        self.ticks += 1;
        Some(tick)
    }
}
