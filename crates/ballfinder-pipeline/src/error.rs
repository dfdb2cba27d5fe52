use crate::source::SourceError;

/// Failures that stop a pipeline from starting or running.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to spawn thread `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("thread `{0}` panicked")]
    ThreadPanicked(String),
}

#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
