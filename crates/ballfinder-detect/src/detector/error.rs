use crate::params::ParamsError;

/// Errors raised while analysing a single frame.
///
/// [`Detector::detect`](super::Detector::detect) never returns these; it logs
/// them and reports "no target" for the frame.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("detection panicked: {0}")]
    Panicked(String),
}
