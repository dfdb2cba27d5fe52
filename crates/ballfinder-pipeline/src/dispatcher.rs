//! Single consumer of the ready queue.
//!
//! Results reach the dispatcher out of order because workers finish at
//! different speeds. A result whose capture time is older than the last
//! accepted one is discarded, so telemetry and [`LastSeenState`] only ever
//! move forward in time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ballfinder_detect::DetectionResult;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::last_seen::{LastSeenSnapshot, LastSeenState};
use crate::queue::DropOldestQueue;
use crate::telemetry::{TelemetryRecord, TelemetrySink};

/// Half of the camera's horizontal field of view, in radians (31.1 deg).
pub const DEFAULT_HALF_FOV_RAD: f32 = 0.542_797_4;
/// Interval between throughput log lines.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

/// Horizontal bearing in degrees of pixel column `x` in a frame `width`
/// pixels wide. Zero at the image center, positive to the right.
pub fn bearing_angle(x: f32, width: u32, half_fov_rad: f32) -> f32 {
    let half = width as f32 / 2.0;
    if half <= 0.0 {
        return 0.0;
    }
    ((x - half) * half_fov_rad.tan() / half).atan().to_degrees()
}

/// Counters over the dispatcher's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Results popped from the ready queue.
    pub processed: u64,
    /// Records handed to the sink.
    pub published: u64,
    /// Results discarded by the timestamp guard.
    pub stale: u64,
}

/// What happened to one result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DispatchOutcome {
    Published(TelemetryRecord),
    Stale,
}

pub struct ResultDispatcher<S> {
    sink: S,
    last_seen: Arc<LastSeenState>,
    half_fov_rad: f32,
    last_accepted: Instant,
    stats: DispatcherStats,
    stats_interval: Duration,
}

impl<S: TelemetrySink> ResultDispatcher<S> {
    /// Dispatcher whose guard starts at the current instant; frames captured
    /// before construction are treated as stale.
    pub fn new(sink: S, last_seen: Arc<LastSeenState>) -> Self {
        Self {
            sink,
            last_seen,
            half_fov_rad: DEFAULT_HALF_FOV_RAD,
            last_accepted: Instant::now(),
            stats: DispatcherStats::default(),
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }

    pub fn with_half_fov(mut self, half_fov_rad: f32) -> Self {
        self.half_fov_rad = half_fov_rad;
        self
    }

    pub fn with_last_accepted(mut self, at: Instant) -> Self {
        self.last_accepted = at;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn last_accepted(&self) -> Instant {
        self.last_accepted
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Apply the timestamp guard to one result and publish it.
    ///
    /// A result without a frame carries no timestamp; it publishes the
    /// no-target record and leaves the guard and the shared state alone.
    pub fn dispatch(&mut self, result: DetectionResult) -> DispatchOutcome {
        self.stats.processed += 1;

        let record = match result.frame.as_ref() {
            None => TelemetryRecord::no_target(),
            Some(frame) => {
                if frame.captured_at < self.last_accepted {
                    self.stats.stale += 1;
                    log::trace!(
                        "discarding stale result ({:?} behind)",
                        self.last_accepted - frame.captured_at
                    );
                    return DispatchOutcome::Stale;
                }
                self.last_accepted = frame.captured_at;
                let width = frame.width();
                let record = match &result.target {
                    Some(target) => {
                        let (cx, _) = target.center();
                        TelemetryRecord::from_target(target, bearing_angle(cx, width, self.half_fov_rad))
                    }
                    None => TelemetryRecord::no_target(),
                };
                self.last_seen.update(LastSeenSnapshot::from(result));
                record
            }
        };

        if let Err(e) = self.sink.publish(&record) {
            log::warn!("telemetry publish failed: {e}");
        } else {
            self.stats.published += 1;
        }
        DispatchOutcome::Published(record)
    }

    /// Consume `queue` until it is closed and drained.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run(&mut self, queue: &DropOldestQueue<DetectionResult>) -> DispatcherStats {
        let mut window_start = Instant::now();
        let mut window = DispatcherStats::default();
        while let Some(result) = queue.pop() {
            let before = self.stats;
            self.dispatch(result);
            window.processed += self.stats.processed - before.processed;
            window.published += self.stats.published - before.published;
            window.stale += self.stats.stale - before.stale;

            let elapsed = window_start.elapsed();
            if elapsed >= self.stats_interval {
                log::info!(
                    "dispatcher: {:.1} frames/s, {} stale discarded in the last {:.0}s",
                    window.processed as f64 / elapsed.as_secs_f64(),
                    window.stale,
                    elapsed.as_secs_f64()
                );
                window = DispatcherStats::default();
                window_start = Instant::now();
            }
        }
        log::debug!("dispatcher finished: {:?}", self.stats);
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingSink;
    use approx::assert_abs_diff_eq;
    use ballfinder_core::{PixelBuffer, Target, TimedFrame};
    use image::GrayImage;

    fn result_at(t: Instant, target: Option<Target>) -> DetectionResult {
        DetectionResult {
            target,
            frame: Some(TimedFrame::new(PixelBuffer::Mask(GrayImage::new(320, 240)), t)),
            debug_frame: None,
        }
    }

    #[test]
    fn bearing_is_zero_at_center_and_fov_at_edge() {
        assert_abs_diff_eq!(bearing_angle(160.0, 320, DEFAULT_HALF_FOV_RAD), 0.0);
        assert_abs_diff_eq!(
            bearing_angle(320.0, 320, DEFAULT_HALF_FOV_RAD),
            DEFAULT_HALF_FOV_RAD.to_degrees(),
            epsilon = 1e-3
        );
        assert!(bearing_angle(0.0, 320, DEFAULT_HALF_FOV_RAD) < 0.0);
    }

    #[test]
    fn stale_results_are_discarded() {
        let t0 = Instant::now();
        let sink = RecordingSink::new();
        let state = Arc::new(LastSeenState::new());
        let mut d = ResultDispatcher::new(sink.clone(), Arc::clone(&state)).with_last_accepted(t0);

        let t2 = t0 + Duration::from_millis(20);
        let t1 = t0 + Duration::from_millis(10);
        assert!(matches!(d.dispatch(result_at(t2, None)), DispatchOutcome::Published(_)));
        assert_eq!(d.dispatch(result_at(t1, None)), DispatchOutcome::Stale);
        assert_eq!(state.captured_at(), Some(t2));
        assert_eq!(
            d.stats(),
            DispatcherStats {
                processed: 2,
                published: 1,
                stale: 1
            }
        );
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn equal_timestamps_are_accepted() {
        let t0 = Instant::now();
        let mut d = ResultDispatcher::new(RecordingSink::new(), Arc::new(LastSeenState::new()))
            .with_last_accepted(t0);
        assert!(matches!(d.dispatch(result_at(t0, None)), DispatchOutcome::Published(_)));
        assert!(matches!(d.dispatch(result_at(t0, None)), DispatchOutcome::Published(_)));
    }

    #[test]
    fn frames_older_than_construction_are_stale() {
        let before = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        let mut d = ResultDispatcher::new(RecordingSink::new(), Arc::new(LastSeenState::new()));
        assert_eq!(d.dispatch(result_at(before, None)), DispatchOutcome::Stale);
    }

    #[test]
    fn target_record_carries_bearing() {
        let t0 = Instant::now();
        let sink = RecordingSink::new();
        let mut d = ResultDispatcher::new(sink.clone(), Arc::new(LastSeenState::new())).with_last_accepted(t0);
        let target = Target::Circle {
            cx: 240.0,
            cy: 100.0,
            radius: 30.0,
        };
        d.dispatch(result_at(t0, Some(target)));
        let records = sink.records();
        match records[0] {
            TelemetryRecord::Circle {
                centerx,
                radius,
                anglex,
                ..
            } => {
                assert_abs_diff_eq!(centerx, 240.0);
                assert_abs_diff_eq!(radius, 30.0);
                assert_abs_diff_eq!(anglex, bearing_angle(240.0, 320, DEFAULT_HALF_FOV_RAD));
                assert!(anglex > 0.0);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn missing_frame_publishes_sentinel_without_touching_state() {
        let t0 = Instant::now();
        let state = Arc::new(LastSeenState::new());
        let mut d = ResultDispatcher::new(RecordingSink::new(), Arc::clone(&state)).with_last_accepted(t0);
        let outcome = d.dispatch(DetectionResult::empty());
        assert_eq!(outcome, DispatchOutcome::Published(TelemetryRecord::no_target()));
        assert_eq!(d.last_accepted(), t0);
        assert!(state.captured_at().is_none());
    }

    #[test]
    fn run_drains_closed_queue() {
        let t0 = Instant::now();
        let queue = DropOldestQueue::new(4);
        for ms in [5u64, 1, 9] {
            queue.push(result_at(t0 + Duration::from_millis(ms), None));
        }
        queue.close();
        let mut d = ResultDispatcher::new(RecordingSink::new(), Arc::new(LastSeenState::new()))
            .with_last_accepted(t0);
        let stats = d.run(&queue);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.published, 2);
    }
}
