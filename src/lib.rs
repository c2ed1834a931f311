//! Plant Leaf Diagnosis
//!
//! Turns a leaf classifier's probability vector into a user-facing diagnosis:
//! confidence gating, localized display names, remediation content and
//! same-plant alternatives, with optional per-user history.
//!
//! - `labels/`: label normalization, display tables, presenter, label set
//! - `remediation/`: knowledge base and label-to-record resolver
//! - `diagnosis/`: gate, ranker, input sources and the orchestrator
//! - `history/`: history stores and the image archive
//! - `config`: TOML + environment configuration
//! - `api_server`: axum endpoints (feature `api`)

pub mod config;
pub mod diagnosis;
pub mod error;
pub mod history;
pub mod labels;
pub mod remediation;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use config::AppConfig;
pub use diagnosis::{
    Anonymous, ConfidenceTier, DiagnosisContext, DiagnosisOutcome, DiagnosisResult, Diagnoser, GateConfig,
    ImageInput, PersistenceStatus, PredictionVector, RankerConfig, RejectedResult, Session, UserSession,
};
pub use error::{ConfigError, DataError, DiagnosisError, StoreError};
pub use history::{HistoryRecord, HistorySort, HistoryStore, MemoryHistoryStore, UserStatistics};
pub use labels::{normalize, DisplayLabel, DisplayTables, LabelSet, Locale, NormalizedLabel, Presenter};
pub use remediation::{KnowledgeBase, RemediationLookup, RemediationRecord, RemediationResolver};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
