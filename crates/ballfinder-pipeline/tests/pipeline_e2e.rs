mod common;

use std::sync::Arc;

use ballfinder_pipeline::{
    hsv_source, render_preview, ParameterStore, ParameterUpdate, Pipeline, PipelineConfig,
    RecordingSink, StampingSource, TelemetryRecord,
};
use common::red_disk;

fn config(workers: usize) -> PipelineConfig {
    PipelineConfig {
        workers: Some(workers),
        ingest_capacity: 32,
        ready_capacity: 32,
        ..PipelineConfig::default()
    }
}

#[test]
fn rgb_disk_frames_publish_centered_ellipses() {
    let store = Arc::new(ParameterStore::default());
    let pipeline = Pipeline::new(config(1), store);
    let sink = RecordingSink::new();
    let source = hsv_source(StampingSource::new(
        (0..4).map(|_| red_disk(320, 240, 160.0, 120.0, 40.0)),
    ));

    let handle = pipeline.spawn(source, sink.clone()).unwrap();
    let last_seen = Arc::clone(handle.last_seen());
    let report = handle.join().unwrap();

    assert_eq!(report.frames_ingested, 4);
    assert_eq!(report.dispatcher.processed, 4);
    let records = sink.records();
    assert_eq!(records.len(), 4);
    for record in records {
        match record {
            TelemetryRecord::Ellipse {
                centerx,
                centery,
                axis1,
                anglex,
                ..
            } => {
                assert!((centerx - 160.0).abs() <= 3.0, "centerx = {centerx}");
                assert!((centery - 120.0).abs() <= 3.0, "centery = {centery}");
                assert!((axis1 - 40.0).abs() <= 3.0, "axis1 = {axis1}");
                assert!(anglex.abs() < 1.0, "anglex = {anglex}");
            }
            other => panic!("expected an ellipse, got {other:?}"),
        }
    }

    let jpeg = render_preview(&last_seen.snapshot(), 75).unwrap().unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn circle_strategy_publishes_radius() {
    let store = Arc::new(ParameterStore::default());
    store
        .apply_updates(&[ParameterUpdate::new("strategy", "circle")])
        .unwrap();
    let pipeline = Pipeline::new(config(2), store);
    let sink = RecordingSink::new();
    let source = hsv_source(StampingSource::new(
        (0..3).map(|_| red_disk(320, 240, 200.0, 120.0, 40.0)),
    ));

    let report = pipeline.spawn(source, sink.clone()).unwrap().join().unwrap();
    assert_eq!(report.frames_processed, 3);
    let records = sink.records();
    assert!(!records.is_empty());
    for record in records {
        match record {
            TelemetryRecord::Circle {
                centerx, radius, anglex, ..
            } => {
                assert!((centerx - 200.0).abs() <= 3.0);
                assert!((radius - 40.0).abs() <= 3.0);
                assert!(anglex > 0.0);
            }
            other => panic!("expected a circle, got {other:?}"),
        }
    }
}

#[test]
fn shutdown_stops_an_endless_source_and_accounts_for_every_frame() {
    struct Endless;
    impl ballfinder_pipeline::FrameSource for Endless {
        fn next_frame(
            &mut self,
        ) -> Result<Option<ballfinder_core::TimedFrame>, ballfinder_pipeline::SourceError> {
            std::thread::sleep(std::time::Duration::from_millis(1));
            Ok(Some(ballfinder_core::TimedFrame::now(
                ballfinder_core::PixelBuffer::Mask(image::GrayImage::new(32, 32)),
            )))
        }
    }

    let pipeline = Pipeline::new(config(2), Arc::new(ParameterStore::default()));
    let sink = RecordingSink::new();
    let handle = pipeline.spawn(Endless, sink.clone()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    let report = handle.shutdown().unwrap();
    assert!(report.frames_ingested > 0);
    assert_eq!(
        report.dispatcher.processed,
        report.dispatcher.published + report.dispatcher.stale
    );
    // every frame read is processed, evicted, or discarded by the shutdown
    assert_eq!(
        report.frames_ingested,
        report.frames_processed + report.ingest_dropped + report.ingest_discarded
    );
    assert_eq!(
        report.frames_processed,
        report.dispatcher.processed + report.ready_dropped
    );
    assert!(sink.records().iter().all(|r| !r.has_target()));
}
