//! Error types for segmesh

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for segmesh operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read volume {}: {message}", path.display())]
    VolumeRead { path: PathBuf, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Input volume appears to be empty (maximum sample {max} is not positive)")]
    EmptyVolume { max: f32 },

    #[error("No isosurface found at level {level}")]
    EmptyIsosurface { level: f32 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write mesh to {}", path.display())]
    MeshWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for segmesh operations
pub type Result<T> = std::result::Result<T, Error>;
