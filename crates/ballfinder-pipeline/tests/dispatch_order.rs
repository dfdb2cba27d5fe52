use std::sync::Arc;
use std::time::{Duration, Instant};

use ballfinder_core::{PixelBuffer, TimedFrame};
use ballfinder_detect::DetectionResult;
use ballfinder_pipeline::{
    DispatchOutcome, DropOldestQueue, LastSeenState, RecordingSink, ResultDispatcher,
};
use image::GrayImage;

fn result_at(t: Instant) -> DetectionResult {
    DetectionResult {
        target: None,
        frame: Some(TimedFrame::new(PixelBuffer::Mask(GrayImage::new(8, 8)), t)),
        debug_frame: None,
    }
}

#[test]
fn last_seen_never_moves_backwards() {
    let t0 = Instant::now();
    let state = Arc::new(LastSeenState::new());
    let mut dispatcher =
        ResultDispatcher::new(RecordingSink::new(), Arc::clone(&state)).with_last_accepted(t0);

    let order = [3u64, 1, 4, 2, 8, 5, 9, 7, 6, 10];
    let mut seen = Vec::new();
    let mut accepted = 0;
    for ms in order {
        if let DispatchOutcome::Published(_) =
            dispatcher.dispatch(result_at(t0 + Duration::from_millis(ms)))
        {
            accepted += 1;
        }
        seen.push(state.captured_at().unwrap());
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    // 3, 4, 8, 9, 10 are each newer than everything before them
    assert_eq!(accepted, 5);
    assert_eq!(dispatcher.stats().stale, 5);
}

#[test]
fn dispatcher_thread_drains_out_of_order_queue() {
    let t0 = Instant::now();
    let queue = Arc::new(DropOldestQueue::new(4));
    let state = Arc::new(LastSeenState::new());
    let sink = RecordingSink::new();

    let consumer = {
        let queue = Arc::clone(&queue);
        let mut dispatcher =
            ResultDispatcher::new(sink.clone(), Arc::clone(&state)).with_last_accepted(t0);
        std::thread::spawn(move || dispatcher.run(&queue))
    };

    for ms in [2u64, 1, 3] {
        queue.push(result_at(t0 + Duration::from_millis(ms)));
    }
    queue.close();
    let stats = consumer.join().unwrap();

    assert_eq!(stats.processed, 3);
    assert_eq!(stats.published as usize, sink.records().len());
    assert_eq!(state.captured_at(), Some(t0 + Duration::from_millis(3)));
}
