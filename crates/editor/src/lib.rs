//! Editor state, playback bridge and session controller for the quickcut editor.

pub mod bridge;
pub mod clock;
pub mod config;
mod error;
pub mod session;
pub mod state;

pub use bridge::{EventSubscription, MediaSurface, PlaybackBridge, SurfaceEvent};
pub use clock::{ClockSurface, PlaybackClock};
pub use config::{ConfigError, EditorConfig};
pub use error::EditorError;
pub use session::{PollReport, ProcessingOutcome, Session, UploadReport};
pub use state::{EditorAction, EditorState, ProcessingJob, EXPORT_NOTICE};
