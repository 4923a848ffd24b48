// Pulse Downloader - resumable media downloads with extraction-tool fallback
// Copyright (C) 2025 Pulse Downloader contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Transfer progress tracking and reporting
//!
//! Progress reaches the presentation layers exclusively through a callback
//! invoked with [`TransferProgress`] snapshots. [`ProgressTracker`] owns the
//! bookkeeping: it folds byte positions into a sliding-window speed average
//! and throttles emission so a fast transfer does not flood the callback.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Minimum interval between progress callbacks.
const UPDATE_INTERVAL: Duration = Duration::from_millis(200);

/// Sliding window used for the speed average.
const SPEED_WINDOW: Duration = Duration::from_secs(10);

/// Snapshot of a transfer's progress.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Bytes on disk so far, including any resumed prefix
    pub bytes_transferred: u64,

    /// Expected final size, when the server reported one
    pub total_bytes: Option<u64>,

    /// Average transfer speed in bytes per second
    pub bytes_per_second: f64,

    /// Estimated time remaining, when computable
    pub eta: Option<Duration>,
}

impl TransferProgress {
    /// Percentage complete, `None` while the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        self.total_bytes
            .filter(|total| *total > 0)
            .map(|total| (self.bytes_transferred as f64 / total as f64) * 100.0)
    }
}

/// Speed tracker with a sliding-window moving average.
///
/// A plain delta over the whole transfer reacts too slowly to network
/// fluctuations; a window keeps the figure honest for long downloads.
#[derive(Debug)]
pub struct SpeedTracker {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
}

impl SpeedTracker {
    pub fn new() -> Self {
        Self::with_window(SPEED_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window,
        }
    }

    /// Record the absolute byte position at this moment.
    pub fn record(&mut self, position: u64) {
        let now = Instant::now();
        self.samples.push_back((now, position));

        while let Some((timestamp, _)) = self.samples.front() {
            if now.duration_since(*timestamp) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Average speed over the window in bytes per second; 0.0 until two
    /// samples exist.
    pub fn average(&self) -> f64 {
        let (Some((first_at, first_pos)), Some((last_at, last_pos))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }

        let bytes = last_pos.saturating_sub(*first_pos);
        let elapsed = last_at.duration_since(*first_at).as_secs_f64();
        if elapsed > 0.0 {
            bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Time remaining for `bytes_remaining` at the current average speed.
    pub fn estimate_remaining(&self, bytes_remaining: u64) -> Option<Duration> {
        let speed = self.average();
        if speed > 0.0 {
            Some(Duration::from_secs_f64(bytes_remaining as f64 / speed))
        } else {
            None
        }
    }
}

impl Default for SpeedTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Combines the progress snapshot with speed tracking and emission
/// throttling.
#[derive(Debug)]
pub struct ProgressTracker {
    progress: TransferProgress,
    speed: SpeedTracker,
    last_emit: Instant,
    interval: Duration,
}

impl ProgressTracker {
    /// Start tracking from `resume_offset` bytes already on disk.
    pub fn new(resume_offset: u64, total_bytes: Option<u64>) -> Self {
        Self::with_interval(resume_offset, total_bytes, UPDATE_INTERVAL)
    }

    pub fn with_interval(resume_offset: u64, total_bytes: Option<u64>, interval: Duration) -> Self {
        Self {
            progress: TransferProgress {
                bytes_transferred: resume_offset,
                total_bytes,
                bytes_per_second: 0.0,
                eta: None,
            },
            speed: SpeedTracker::new(),
            last_emit: Instant::now(),
            interval,
        }
    }

    /// Fold in a new byte position. Returns a snapshot when enough time has
    /// passed since the last emission, `None` while throttled.
    pub fn update(&mut self, bytes_transferred: u64) -> Option<&TransferProgress> {
        self.refresh(bytes_transferred);

        let now = Instant::now();
        if now.duration_since(self.last_emit) >= self.interval {
            self.last_emit = now;
            Some(&self.progress)
        } else {
            None
        }
    }

    /// Final update, bypassing the throttle.
    pub fn finish(&mut self, bytes_transferred: u64) -> &TransferProgress {
        self.refresh(bytes_transferred);
        self.last_emit = Instant::now();
        &self.progress
    }

    fn refresh(&mut self, bytes_transferred: u64) {
        self.progress.bytes_transferred = bytes_transferred;
        self.speed.record(bytes_transferred);
        self.progress.bytes_per_second = self.speed.average();
        self.progress.eta = self.progress.total_bytes.and_then(|total| {
            self.speed
                .estimate_remaining(total.saturating_sub(bytes_transferred))
        });
    }
}
