//! Pipeline context: owns the queues and shared state, starts the threads.
//!
//! ```text
//! FrameSource -> [bf-ingest] -> ingest queue -> [bf-worker-*] -> ready queue -> [bf-dispatch] -> TelemetrySink
//!                                                                                    |
//!                                                                              LastSeenState
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ballfinder_core::TimedFrame;
use ballfinder_detect::{DetectionResult, Detector};

use crate::config::ParameterStore;
use crate::dispatcher::{DispatcherStats, ResultDispatcher, DEFAULT_HALF_FOV_RAD};
use crate::error::PipelineError;
use crate::last_seen::LastSeenState;
use crate::queue::{DropOldestQueue, Pushed, DEFAULT_CAPACITY};
use crate::source::{FrameSource, SourceError};
use crate::telemetry::TelemetrySink;
use crate::workers::{default_worker_count, WorkerPool};

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub ingest_capacity: usize,
    pub ready_capacity: usize,
    /// Worker threads; `None` uses [`default_worker_count`].
    pub workers: Option<usize>,
    pub half_fov_rad: f32,
    pub stats_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest_capacity: DEFAULT_CAPACITY,
            ready_capacity: DEFAULT_CAPACITY,
            workers: None,
            half_fov_rad: DEFAULT_HALF_FOV_RAD,
            stats_interval: Duration::from_secs(10),
        }
    }
}

impl PipelineConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_worker_count).max(1)
    }
}

/// Everything the pipeline threads share, built once at startup.
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<ParameterStore>,
    detector: Arc<Detector>,
    ingest: Arc<DropOldestQueue<TimedFrame>>,
    ready: Arc<DropOldestQueue<DetectionResult>>,
    last_seen: Arc<LastSeenState>,
    started: Instant,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: Arc<ParameterStore>) -> Self {
        Self {
            ingest: Arc::new(DropOldestQueue::new(config.ingest_capacity)),
            ready: Arc::new(DropOldestQueue::new(config.ready_capacity)),
            config,
            store,
            detector: Arc::new(Detector::new()),
            last_seen: Arc::new(LastSeenState::new()),
            started: Instant::now(),
        }
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    pub fn last_seen(&self) -> &Arc<LastSeenState> {
        &self.last_seen
    }

    /// Start the ingest thread, the workers and the dispatcher.
    ///
    /// The dispatcher's timestamp guard starts at the instant the pipeline
    /// was constructed.
    pub fn spawn<S, K>(self, source: S, sink: K) -> Result<PipelineHandle, PipelineError>
    where
        S: FrameSource + 'static,
        K: TelemetrySink + 'static,
    {
        let workers = self.config.worker_count();
        log::info!(
            "starting pipeline: {workers} workers, queue capacity {}/{}",
            self.ingest.capacity(),
            self.ready.capacity()
        );

        let mut dispatcher = ResultDispatcher::new(sink, Arc::clone(&self.last_seen))
            .with_half_fov(self.config.half_fov_rad)
            .with_last_accepted(self.started)
            .with_stats_interval(self.config.stats_interval);
        let ready = Arc::clone(&self.ready);
        let dispatch_thread = spawn_named("bf-dispatch", move || dispatcher.run(&ready));
        let dispatch_thread = match dispatch_thread {
            Ok(h) => h,
            Err(e) => return Err(self.abort(e)),
        };

        let pool = WorkerPool::spawn(
            workers,
            Arc::clone(&self.ingest),
            Arc::clone(&self.ready),
            Arc::clone(&self.detector),
            Arc::clone(&self.store),
        );
        let pool = match pool {
            Ok(p) => p,
            Err(e) => return Err(self.abort(e)),
        };

        let stop = Arc::new(AtomicBool::new(false));
        let ingest_thread = {
            let ingest = Arc::clone(&self.ingest);
            let stop = Arc::clone(&stop);
            spawn_named("bf-ingest", move || run_ingest(source, &ingest, &stop))
        };
        let ingest_thread = match ingest_thread {
            Ok(h) => h,
            Err(e) => return Err(self.abort(e)),
        };

        Ok(PipelineHandle {
            stop,
            ingest: self.ingest,
            ready: self.ready,
            last_seen: self.last_seen,
            store: self.store,
            ingest_thread,
            workers: pool,
            dispatch_thread,
        })
    }

    /// Close both queues so already-started threads exit, then hand back `e`.
    fn abort(&self, e: PipelineError) -> PipelineError {
        log::error!("pipeline startup failed: {e}");
        self.ingest.close();
        self.ready.close();
        e
    }
}

fn spawn_named<T, F>(name: &str, f: F) -> Result<JoinHandle<T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| PipelineError::Spawn {
            name: name.to_string(),
            source,
        })
}

struct IngestOutcome {
    frames: u64,
    /// Frames read after the ingest queue had been closed.
    rejected: u64,
    result: Result<(), SourceError>,
}

fn run_ingest<S: FrameSource>(mut source: S, ingest: &DropOldestQueue<TimedFrame>, stop: &AtomicBool) -> IngestOutcome {
    let mut frames = 0;
    let mut rejected = 0;
    let result = loop {
        if stop.load(Ordering::Acquire) {
            break Ok(());
        }
        match source.next_frame() {
            Ok(Some(frame)) => {
                frames += 1;
                match ingest.push(frame) {
                    Pushed::Queued => {}
                    Pushed::Evicted(_) => log::trace!("ingest queue full, dropped oldest frame"),
                    Pushed::Rejected(_) => {
                        rejected += 1;
                        break Ok(());
                    }
                }
            }
            Ok(None) => {
                log::info!("frame source exhausted after {frames} frames");
                break Ok(());
            }
            Err(e) => {
                log::error!("frame source failed: {e}");
                break Err(e);
            }
        }
    };
    ingest.close();
    IngestOutcome {
        frames,
        rejected,
        result,
    }
}

/// Counters collected when a pipeline finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub frames_ingested: u64,
    pub frames_processed: u64,
    pub ingest_dropped: u64,
    /// Frames thrown away by [`PipelineHandle::shutdown`] without processing.
    pub ingest_discarded: u64,
    pub ready_dropped: u64,
    pub dispatcher: DispatcherStats,
}

/// Running pipeline.
pub struct PipelineHandle {
    stop: Arc<AtomicBool>,
    ingest: Arc<DropOldestQueue<TimedFrame>>,
    ready: Arc<DropOldestQueue<DetectionResult>>,
    last_seen: Arc<LastSeenState>,
    store: Arc<ParameterStore>,
    ingest_thread: JoinHandle<IngestOutcome>,
    workers: WorkerPool,
    dispatch_thread: JoinHandle<DispatcherStats>,
}

impl PipelineHandle {
    pub fn last_seen(&self) -> &Arc<LastSeenState> {
        &self.last_seen
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    /// Stop pulling new frames, let in-flight frames finish and join.
    ///
    /// Frames still waiting in the ingest queue are discarded.
    pub fn shutdown(self) -> Result<PipelineReport, PipelineError> {
        self.stop.store(true, Ordering::Release);
        // close first so the ingest thread cannot refill the queue after the clear
        self.ingest.close();
        let discarded = self.ingest.clear() as u64;
        log::info!("pipeline shutting down, {discarded} queued frames discarded");
        self.finish(discarded)
    }

    /// Wait until the source is exhausted and every result is dispatched.
    pub fn join(self) -> Result<PipelineReport, PipelineError> {
        self.finish(0)
    }

    fn finish(self, discarded: u64) -> Result<PipelineReport, PipelineError> {
        let ingest = self.ingest_thread.join();
        self.ingest.close();
        let workers = self.workers.join();
        self.ready.close();
        let dispatcher = self.dispatch_thread.join();

        let ingest = ingest.map_err(|_| PipelineError::ThreadPanicked("bf-ingest".to_string()))?;
        let frames_processed = workers?;
        let dispatcher = dispatcher.map_err(|_| PipelineError::ThreadPanicked("bf-dispatch".to_string()))?;
        ingest.result?;

        let report = PipelineReport {
            frames_ingested: ingest.frames,
            frames_processed,
            ingest_dropped: self.ingest.dropped(),
            ingest_discarded: discarded + ingest.rejected,
            ready_dropped: self.ready.dropped(),
            dispatcher,
        };
        log::info!("pipeline finished: {report:?}");
        Ok(report)
    }
}
