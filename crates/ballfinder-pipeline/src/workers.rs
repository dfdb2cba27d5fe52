//! Detection worker pool.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ballfinder_core::TimedFrame;
use ballfinder_detect::{DetectionResult, Detector};

use crate::config::ParameterStore;
use crate::error::PipelineError;
use crate::queue::{DropOldestQueue, Pushed};

/// `max(available cores - 1, 1)`; one core is left for ingest and dispatch.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Threads that move frames from the ingest queue to the ready queue.
///
/// Each worker takes one parameter snapshot per frame, so an update lands
/// between frames and never in the middle of one. A worker always finishes
/// the frame it has started; it exits when the ingest queue is closed and
/// drained.
pub struct WorkerPool {
    handles: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    pub fn spawn(
        count: usize,
        ingest: Arc<DropOldestQueue<TimedFrame>>,
        ready: Arc<DropOldestQueue<DetectionResult>>,
        detector: Arc<Detector>,
        store: Arc<ParameterStore>,
    ) -> Result<Self, PipelineError> {
        let count = count.max(1);
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            let name = format!("bf-worker-{i}");
            let ingest = Arc::clone(&ingest);
            let ready = Arc::clone(&ready);
            let detector = Arc::clone(&detector);
            let store = Arc::clone(&store);
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(&ingest, &ready, &detector, &store))
                .map_err(|source| PipelineError::Spawn { name, source })?;
            handles.push(handle);
        }
        log::debug!("spawned {count} detection workers");
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker; returns the number of frames processed.
    pub fn join(self) -> Result<u64, PipelineError> {
        let mut total = 0;
        let mut panicked = None;
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("bf-worker").to_string();
            match handle.join() {
                Ok(n) => total += n,
                Err(_) => panicked = Some(name),
            }
        }
        match panicked {
            Some(name) => Err(PipelineError::ThreadPanicked(name)),
            None => Ok(total),
        }
    }
}

fn run_worker(
    ingest: &DropOldestQueue<TimedFrame>,
    ready: &DropOldestQueue<DetectionResult>,
    detector: &Detector,
    store: &ParameterStore,
) -> u64 {
    let mut processed = 0;
    while let Some(frame) = ingest.pop() {
        let params = store.snapshot();
        let result = detector.detect(Some(frame), &params);
        match ready.push(result) {
            Pushed::Queued => {}
            Pushed::Evicted(_) => log::trace!("ready queue full, dropped oldest result"),
            Pushed::Rejected(_) => log::warn!("ready queue closed while workers were running"),
        }
        processed += 1;
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballfinder_core::PixelBuffer;
    use image::GrayImage;

    #[test]
    fn worker_count_is_at_least_one() {
        assert!(default_worker_count() >= 1);
    }

    #[test]
    fn workers_drain_closed_queue() {
        let ingest = Arc::new(DropOldestQueue::new(8));
        let ready = Arc::new(DropOldestQueue::new(8));
        for _ in 0..3 {
            ingest.push(TimedFrame::now(PixelBuffer::Mask(GrayImage::new(32, 32))));
        }
        ingest.close();
        let pool = WorkerPool::spawn(
            2,
            Arc::clone(&ingest),
            Arc::clone(&ready),
            Arc::new(Detector::new()),
            Arc::new(ParameterStore::default()),
        )
        .unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.join().unwrap(), 3);
        assert_eq!(ready.len(), 3);
        while let Some(r) = ready.try_pop() {
            assert!(r.target.is_none());
            assert!(r.frame.is_some());
        }
    }
}
