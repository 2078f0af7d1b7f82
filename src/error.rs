// Error types. Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

/// A gradient edit that was refused. The gradient is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("anchor index {index} is out of range for {len} anchors")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("a gradient needs at least {min} anchors")]
    TooFewAnchors { min: usize },
}

/// Why a render produced nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("invalid render size {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("no emitters to simulate")]
    NoEmitters,
    #[error("render {generation} was superseded")]
    Cancelled { generation: u64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config toml")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
}
