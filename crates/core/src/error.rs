use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("failed to decode image {path}: {reason}")]
    ImageDecodeFailed { path: PathBuf, reason: String },

    #[error("template {template_w}x{template_h} does not fit in frame {frame_w}x{frame_h}")]
    TemplateTooLarge {
        template_w: u32,
        template_h: u32,
        frame_w: u32,
        frame_h: u32,
    },

    #[error("template has no pixels")]
    EmptyTemplate,

    #[error("pointer input failed: {0}")]
    InputFailed(String),

    #[error("platform unavailable: {0}")]
    PlatformUnavailable(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("automation is already running")]
    AlreadyRunning,

    #[error("automation is not running")]
    NotRunning,

    #[error("previous run is still stopping")]
    Stopping,
}

impl Error {
    /// Lifecycle rejections that the shell reports as a note, not a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::AlreadyRunning | Error::NotRunning | Error::Stopping)
    }
}
