//! Error types for the recall searchlight analysis.
//!
//! Every module that can fail imports its error type from here, so the
//! hierarchy stays in one place.
//!
//! ## Hierarchy
//!
//! ```text
//! SearchlightError (top-level)
//! ├── ConfigError   (config validation / file loading)
//! ├── DataError     (trajectory / scan loading, result writing)
//! └── EngineError   (searchlight distribution and evaluation)
//! ```

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// SearchlightResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used by orchestration-level functions.
pub type SearchlightResult<T> = Result<T, SearchlightError>;

// ---------------------------------------------------------------------------
// SearchlightError
// ---------------------------------------------------------------------------

/// Top-level error type for one analysis run.
///
/// [`crate::pipeline::run_subject`] returns `SearchlightResult<T>`. The
/// config, volume and searchlight modules return their own error types which
/// coerce into `SearchlightError` via [`From`].
#[derive(Debug, Error)]
pub enum SearchlightError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An input could not be loaded or the result could not be written.
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// The searchlight engine rejected its inputs.
    #[error("Searchlight engine error: {0}")]
    Engine(#[from] EngineError),

    /// Two arrays that must agree on a dimension do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },
}

impl SearchlightError {
    /// Construct a [`SearchlightError::ShapeMismatch`].
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        SearchlightError::ShapeMismatch { expected, actual }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`SearchlightConfig`].
///
/// [`SearchlightConfig`]: crate::config::SearchlightConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read from (or written to) disk.
    #[error("Cannot read config file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// DataError
// ---------------------------------------------------------------------------

/// Errors produced while loading the inputs or persisting the result.
///
/// None of these are recovered locally. A missing trajectory or scan aborts
/// the run before anything is written.
#[derive(Debug, Error)]
pub enum DataError {
    /// A required input file was not found on disk.
    #[error("Data not found at `{path}`: {message}")]
    DataNotFound {
        /// Path that was expected to exist.
        path: PathBuf,
        /// Additional context.
        message: String,
    },

    /// A file was found but its format or shape is wrong.
    #[error("Invalid data format in `{path}`: {message}")]
    InvalidFormat {
        /// Path of the malformed file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A low-level I/O error while reading or writing a data file.
    #[error("I/O error accessing `{path}`: {source}")]
    IoError {
        /// Path being accessed when the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A numpy array file could not be parsed.
    #[error("NumPy read error in `{path}`: {message}")]
    NpyReadError {
        /// Path of the `.npy` file.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// A numpy array file could not be written.
    #[error("NumPy write error in `{path}`: {message}")]
    NpyWriteError {
        /// Destination path.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// A NIfTI volume could not be parsed.
    #[error("NIfTI read error in `{path}`: {message}")]
    NiftiReadError {
        /// Path of the NIfTI file.
        path: PathBuf,
        /// Error description.
        message: String,
    },
}

impl DataError {
    /// Construct a [`DataError::DataNotFound`].
    pub fn not_found<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        DataError::DataNotFound { path: path.into(), message: msg.into() }
    }

    /// Construct a [`DataError::InvalidFormat`].
    pub fn invalid_format<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        DataError::InvalidFormat { path: path.into(), message: msg.into() }
    }

    /// Construct a [`DataError::IoError`].
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::IoError { path: path.into(), source }
    }

    /// Construct a [`DataError::NpyReadError`].
    pub fn npy_read<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        DataError::NpyReadError { path: path.into(), message: msg.into() }
    }

    /// Construct a [`DataError::NpyWriteError`].
    pub fn npy_write<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        DataError::NpyWriteError { path: path.into(), message: msg.into() }
    }

    /// Construct a [`DataError::NiftiReadError`].
    pub fn nifti_read<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        DataError::NiftiReadError { path: path.into(), message: msg.into() }
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors produced by the searchlight engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `run_searchlight` was called before `distribute`.
    #[error("No data distributed; call distribute() before run_searchlight()")]
    NotDistributed,

    /// `run_searchlight` was called before `broadcast`.
    #[error("No value broadcast; call broadcast() before run_searchlight()")]
    NotBroadcast,

    /// `distribute` was given an empty list of volumes.
    #[error("At least one volume must be distributed")]
    NoVolumes,

    /// A distributed volume's spatial shape disagrees with the mask.
    #[error("Volume {index} has spatial shape {actual:?} but the mask is {expected:?}")]
    VolumeShapeMismatch {
        /// Position of the offending volume in the distributed list.
        index: usize,
        /// Mask shape.
        expected: [usize; 3],
        /// Spatial shape of the volume.
        actual: [usize; 3],
    },

    /// The worker thread pool could not be built.
    #[error("Cannot build worker pool: {0}")]
    ThreadPool(String),
}
