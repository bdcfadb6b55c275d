//! # Recall Searchlight
//!
//! Single-subject, single-permutation searchlight analysis correlating a
//! time-warped recall model against movie-viewing fMRI activity.
//!
//! For each brain voxel, the time-by-time correlation structure of the
//! surrounding neighborhood is compared with the recall model's own
//! time-by-time correlation matrix. Permutation runs circularly shift the
//! model first, with a shift that depends only on the permutation index, so
//! every subject shares the same null shift.
//!
//! ## Architecture
//!
//! ```text
//! SearchlightConfig ──► paths::InputPaths ──► volume::{load_trajectory, load_scan}
//!        │                                            │
//!        │                               volume::brain_mask
//!        │                                            │
//!        ├──► paths::RunMode (shift::permutation_shift)
//!        │                                            │
//!        │         correlation::shifted_model_correlation
//!        │                                            │
//!        └──► searchlight::Searchlight ──► pipeline::recall_voxel_fn
//!                                                     │
//!                                           volume::save_result
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recall_searchlight::config::SearchlightConfig;
//! use recall_searchlight::pipeline::run_subject;
//! use recall_searchlight::searchlight::{Searchlight, SearchlightParams};
//!
//! let config = SearchlightConfig::with_datadir("/data/sherlock");
//! config.validate().expect("config is valid");
//!
//! let mut engine = Searchlight::new(SearchlightParams::from(&config));
//! let report = run_subject(&config, 1, 3, &mut engine).unwrap();
//! println!("wrote {}", report.result_path.display());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod correlation;
pub mod error;
pub mod paths;
pub mod pipeline;
pub mod searchlight;
pub mod shift;
pub mod volume;

// Convenient re-exports at the crate root.
pub use config::{SearchlightConfig, SearchlightShape};
pub use error::{ConfigError, DataError, EngineError, SearchlightError, SearchlightResult};
pub use paths::{InputPaths, RunMode};
pub use pipeline::{run_subject, RunReport};
pub use searchlight::{Searchlight, SearchlightEngine, SearchlightParams};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
