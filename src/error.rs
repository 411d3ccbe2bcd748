use thiserror::Error;

/// Errors that abort a whole `display()` pass.
///
/// Malformed clip fragments and degenerate geometry are resolved inside the
/// occlusion stage and never surface here.
#[derive(Debug, Error)]
pub enum SomError {
    #[error("could not acquire a {width}x{height} raster buffer for occlusion testing")]
    RasterUnavailable { width: u32, height: u32 },

    #[error("invalid scene: {0}")]
    InvalidScene(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SomError {
    /// Configuration-class errors: the pass cannot produce a trustworthy result at all.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SomError::RasterUnavailable { .. })
    }
}

pub type Result<T, E = SomError> = std::result::Result<T, E>;
