//! Logger setup for the frame pipeline.
//!
//! Lines read `[elapsed LEVEL stage module] message`. The stage is derived
//! from the pipeline's thread names (`bf-ingest`, `bf-worker-N`,
//! `bf-dispatch`), so interleaved output from the worker pool stays
//! attributable. Records from other crates only pass at `warn` and above.
//! Use `init_with_level` once at startup, or `init_tracing` with the
//! `tracing` feature.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

/// Prefix shared by every thread the pipeline spawns.
const THREAD_PREFIX: &str = "bf-";
/// Crate prefix of our own log targets.
const OWN_TARGET: &str = "ballfinder";

/// Pipeline stage that emitted a record, from the thread name.
///
/// `bf-worker-3` becomes `worker#3`, `bf-ingest` becomes `ingest`; any other
/// name is used as is.
pub fn stage_label(thread_name: Option<&str>) -> Cow<'_, str> {
    let Some(name) = thread_name else {
        return Cow::Borrowed("-");
    };
    match name.strip_prefix(THREAD_PREFIX) {
        Some(rest) => match rest.strip_prefix("worker-") {
            Some(id) => Cow::Owned(format!("worker#{id}")),
            None => Cow::Borrowed(rest),
        },
        None => Cow::Borrowed(name),
    }
}

/// Last two path segments of a log target (`ballfinder_pipeline::workers`
/// becomes `pipeline::workers`).
fn short_target(target: &str) -> &str {
    let target = target.strip_prefix("ballfinder_").unwrap_or(target);
    match target.rmatch_indices("::").nth(1) {
        Some((i, _)) => &target[i + 2..],
        None => target,
    }
}

fn format_line(elapsed: f64, level: Level, stage: &str, target: &str, args: &fmt::Arguments<'_>) -> String {
    format!(
        "[{:8.3}s {:>5} {:<9} {}] {}",
        elapsed,
        level,
        stage,
        short_target(target),
        args
    )
}

struct PipelineLogger {
    level: LevelFilter,
    started: Instant,
}

impl PipelineLogger {
    fn threshold(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

impl Log for PipelineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let thread = std::thread::current();
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            &stage_label(thread.name()),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<PipelineLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| PipelineLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Filter used when `RUST_LOG` is unset: our crates at `level`, everything
/// else at `warn`.
#[cfg(feature = "tracing")]
fn default_directives(level: LevelFilter) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,ballfinder={level},ballfinder_core={level},ballfinder_detect={level},ballfinder_pipeline={level}")
}

/// Install a `tracing` subscriber. `RUST_LOG` wins over `default_level`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_thread_names(true);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
