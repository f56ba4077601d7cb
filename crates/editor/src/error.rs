use thiserror::Error;
use timeline::ClipId;

#[derive(Debug, Error, PartialEq)]
pub enum EditorError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("invalid media duration: {0}")]
    InvalidDuration(f64),
    #[error("no clip with id {0}")]
    UnknownClip(ClipId),
    #[error("seek to {time} outside [0, {max}]")]
    SeekOutOfRange { time: f64, max: f64 },
    #[error("another operation is still processing")]
    Busy,
    #[error("session closed")]
    Closed,
    #[error(transparent)]
    Jobs(#[from] jobs::JobError),
}

impl From<timeline::TimelineError> for EditorError {
    fn from(e: timeline::TimelineError) -> Self {
        match e {
            timeline::TimelineError::InvalidDuration(d) => EditorError::InvalidDuration(d),
            timeline::TimelineError::InvalidTrim { duration, .. } => EditorError::InvalidDuration(duration),
        }
    }
}
