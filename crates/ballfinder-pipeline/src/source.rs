//! Frame sources feeding the ingestion queue.
//!
//! The camera driver is external; anything that can hand out [`TimedFrame`]s
//! through a blocking pull implements [`FrameSource`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use ballfinder_core::{rgb_to_hsv, PixelBuffer, TimedFrame};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("frame source has no inputs")]
    NoInputs,
    #[error("input not found: {0}")]
    Missing(PathBuf),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame source failed: {0}")]
    Device(String),
}

/// Blocking pull of frames.
pub trait FrameSource: Send {
    /// Next frame, or `Ok(None)` when the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        (**self).next_frame()
    }
}

/// Applies a one-time pixel transform (typically RGB to HSV) to every frame
/// before it enters the pipeline. Timestamps are kept.
pub struct TransformedSource<S, F> {
    inner: S,
    transform: F,
}

impl<S, F> TransformedSource<S, F>
where
    S: FrameSource,
    F: FnMut(PixelBuffer) -> PixelBuffer + Send,
{
    pub fn new(inner: S, transform: F) -> Self {
        Self { inner, transform }
    }
}

impl<S, F> FrameSource for TransformedSource<S, F>
where
    S: FrameSource,
    F: FnMut(PixelBuffer) -> PixelBuffer + Send,
{
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        Ok(self
            .inner
            .next_frame()?
            .map(|frame| frame.map_pixels(&mut self.transform)))
    }
}

/// Convert color buffers to HSV; masks pass through unchanged.
pub fn hsv_transform(pixels: PixelBuffer) -> PixelBuffer {
    match pixels {
        PixelBuffer::Color(rgb) => PixelBuffer::Color(rgb_to_hsv(&rgb)),
        mask @ PixelBuffer::Mask(_) => mask,
    }
}

/// Wrap `inner` so that frames arrive in the HSV working space.
pub fn hsv_source<S: FrameSource>(inner: S) -> TransformedSource<S, fn(PixelBuffer) -> PixelBuffer> {
    TransformedSource::new(inner, hsv_transform as fn(PixelBuffer) -> PixelBuffer)
}

/// In-memory source for tests and replays.
#[derive(Debug, Default)]
pub struct VecSource {
    frames: VecDeque<TimedFrame>,
}

impl VecSource {
    /// Frames are returned as given, timestamps included.
    pub fn new(frames: impl IntoIterator<Item = TimedFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

/// In-memory source that stamps each buffer at pull time.
#[derive(Debug, Default)]
pub struct StampingSource {
    buffers: VecDeque<PixelBuffer>,
}

impl StampingSource {
    pub fn new(buffers: impl IntoIterator<Item = PixelBuffer>) -> Self {
        Self {
            buffers: buffers.into_iter().collect(),
        }
    }
}

impl FrameSource for StampingSource {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        Ok(self.buffers.pop_front().map(TimedFrame::now))
    }
}

/// Replays image files as RGB frames at a fixed rate.
///
/// Stands in for a camera: frames are stamped when they are produced, not
/// when the file was written.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    period: Option<Duration>,
    last_emit: Option<Instant>,
    looping: bool,
}

impl ImageSequenceSource {
    /// Fails when `paths` is empty or any file does not exist.
    pub fn open(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Result<Self, SourceError> {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(SourceError::NoInputs);
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(SourceError::Missing(missing.clone()));
        }
        Ok(Self {
            paths,
            next: 0,
            period: None,
            last_emit: None,
            looping: false,
        })
    }

    /// Pace frames at `fps`; `0` (or a rate whose period does not fit a
    /// [`Duration`]) disables pacing.
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.period = if fps > 0.0 {
            let period = Duration::try_from_secs_f32(1.0 / fps).ok();
            if period.is_none() {
                log::warn!("frame rate {fps} has no representable period; pacing disabled");
            }
            period
        } else {
            None
        };
        self
    }

    /// Restart from the first file after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn pace(&mut self) {
        if let (Some(period), Some(last)) = (self.period, self.last_emit) {
            let due = last + period;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }
        self.last_emit = Some(Instant::now());
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<TimedFrame>, SourceError> {
        if self.next >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.paths[self.next];
        let rgb = image::open(path)
            .map_err(|source| SourceError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        self.next += 1;
        self.pace();
        Ok(Some(TimedFrame::now(PixelBuffer::Color(rgb))))
    }
}
