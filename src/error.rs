/// Error types surfaced to the user.
///
/// None of these terminate the application; the form keeps its in-memory
/// values whenever an operation fails.

use std::path::PathBuf;

use crate::data::header::HeaderError;
use crate::pipeline::extraction::ImageFormat;

#[derive(Debug, thiserror::Error)]
pub enum ReadmeError {
    #[error("Unsupported file type '{extension}' (supported: .czi, .lif, .nd2)")]
    UnsupportedFormat { extension: String },

    #[error("Failed to extract {format} metadata: {message}")]
    Extraction { format: ImageFormat, message: String },

    #[error("Not a ReadMe document: {0}")]
    Parse(String),

    #[error("Could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReadmeError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ReadmeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn extraction(format: ImageFormat, err: HeaderError) -> Self {
        ReadmeError::Extraction {
            format,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReadmeError>;
