//! Frame timing for the game loop.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frames slower than this multiple of the target are logged as errors.
const CRITICAL_FRAME_FACTOR: u32 = 5;

/// How a frame's duration compared to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePace {
    OnTime,
    Slow,
    Critical,
}

/// Measures frame durations and flags frames that overrun the target.
pub struct FrameClock {
    frame_times: VecDeque<Duration>,
    frame_start: Instant,
    target: Duration,
    pub slow_frames: u32,
    pub critical_frames: u32,
}

impl FrameClock {
    pub fn new(target_frame_rate: u32) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(120),
            frame_start: Instant::now(),
            target: Duration::from_secs(1) / target_frame_rate.max(1),
            slow_frames: 0,
            critical_frames: 0,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    /// Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Call at the end of each frame.
    pub fn end_frame(&mut self) -> FramePace {
        let elapsed = self.frame_start.elapsed();
        self.record_frame(elapsed)
    }

    /// Record a measured frame and log it if it overran
    pub fn record_frame(&mut self, elapsed: Duration) -> FramePace {
        self.frame_times.push_back(elapsed);
        if self.frame_times.len() > 120 {
            self.frame_times.pop_front();
        }

        let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
        let target_ms = self.target.as_secs_f32() * 1000.0;
        if elapsed > self.target * CRITICAL_FRAME_FACTOR {
            self.critical_frames += 1;
            tracing::error!(elapsed_ms, target_ms, "Frame took far longer than target");
            FramePace::Critical
        } else if elapsed > self.target {
            self.slow_frames += 1;
            tracing::warn!(elapsed_ms, target_ms, "Slow frame");
            FramePace::Slow
        } else {
            FramePace::OnTime
        }
    }

    /// Average frame time in milliseconds over the last 120 frames.
    pub fn avg_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let sum: Duration = self.frame_times.iter().sum();
        sum.as_secs_f32() * 1000.0 / self.frame_times.len() as f32
    }

    /// Current FPS based on the average frame time.
    pub fn fps(&self) -> f32 {
        let ms = self.avg_frame_time_ms();
        if ms > 0.0 {
            1000.0 / ms
        } else {
            0.0
        }
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.frame_times
            .iter()
            .max()
            .map(|d| d.as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }
}
