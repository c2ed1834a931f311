//! Diagnosis pipeline
//!
//! - `types`: prediction vector and result values
//! - `gate`: confidence tiers and advice
//! - `ranker`: same-plant alternatives
//! - `input`: image sources and the classifier seam
//! - `orchestrator`: the `Diagnoser` tying it together

pub mod gate;
pub mod input;
pub mod orchestrator;
pub mod ranker;
pub mod types;

pub use gate::{ConfidenceTier, GateConfig};
pub use input::{CapturedImage, Classifier, ImageInput, UploadedImage};
pub use orchestrator::{Anonymous, DiagnosisContext, Diagnoser, Session, UserSession};
pub use ranker::{rank_alternatives, RankerConfig};
pub use types::{
    AlternativeEntry, DiagnosisOutcome, DiagnosisResult, PersistenceStatus, PredictionVector, RejectedResult,
};
