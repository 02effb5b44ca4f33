//! Error taxonomy for every engine operation.

use std::path::PathBuf;

use serde::Serialize;

/// Result type for engine operations.
pub type LutoolsResult<T> = Result<T, LutoolsError>;

/// Errors returned by the engine and its components.
#[derive(Debug, thiserror::Error)]
pub enum LutoolsError {
    /// A file could not be opened, read, or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `.cube` header is missing, unsupported, or out of range.
    #[error("malformed LUT header: {0}")]
    MalformedHeader(String),

    /// A `.cube` data line did not contain three finite numbers.
    #[error("malformed LUT sample on line {line}: {text:?}")]
    MalformedSample { line: usize, text: String },

    /// The number of samples does not match `LUT_3D_SIZE³`.
    #[error("expected {expected} LUT samples, found {found}")]
    SampleCountMismatch { expected: usize, found: usize },

    /// Zero or inconsistent image dimensions.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Before/after images of different sizes.
    #[error(
        "image dimensions differ: before is {}x{}, after is {}x{}",
        before.0, before.1, after.0, after.1
    )]
    DimensionMismatch { before: (u32, u32), after: (u32, u32) },

    /// Not enough distinct correspondences to fit a LUT.
    #[error("only {found} distinct color correspondences, at least {required} required")]
    InsufficientSamples { found: usize, required: usize },

    /// Engine used before `init` or after `shutdown`.
    #[error("engine is not initialized")]
    NotInitialized,

    /// Unknown or released LUT handle.
    #[error("invalid LUT handle: {0}")]
    InvalidHandle(u32),

    /// Raster codec failure (unsupported or corrupt image data).
    #[error("image codec error on {}: {source}", path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    /// A long operation observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid engine configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Discriminant of [`LutoolsError`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Io,
    MalformedHeader,
    MalformedSample,
    SampleCountMismatch,
    InvalidDimensions,
    DimensionMismatch,
    InsufficientSamples,
    NotInitialized,
    InvalidHandle,
    Codec,
    Cancelled,
    Config,
}

impl LutoolsError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Self::MalformedSample { .. } => ErrorKind::MalformedSample,
            Self::SampleCountMismatch { .. } => ErrorKind::SampleCountMismatch,
            Self::InvalidDimensions(_) => ErrorKind::InvalidDimensions,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::InsufficientSamples { .. } => ErrorKind::InsufficientSamples,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Self::Codec { .. } => ErrorKind::Codec,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Split an `image` crate error into the I/O and codec classes.
    pub(crate) fn image(path: impl Into<PathBuf>, source: ::image::ImageError) -> Self {
        match source {
            ::image::ImageError::IoError(source) => Self::io(path, source),
            source => Self::Codec {
                path: path.into(),
                source,
            },
        }
    }
}
