//! Label handling
//!
//! - `normalizer`: delimiter collapsing and plant/disease tokenization
//! - `lookup_tables`: per-locale display name tables
//! - `presenter`: display labels with fallback formatting
//! - `label_set`: classifier label order from `class_indices.json`

pub mod label_set;
pub mod lookup_tables;
pub mod normalizer;
pub mod presenter;

pub use label_set::LabelSet;
pub use lookup_tables::{DisplayTables, Locale};
pub use normalizer::{collapse_delimiters, normalize, plant_token, Disease, NormalizedLabel};
pub use presenter::{DisplayLabel, Presenter};
