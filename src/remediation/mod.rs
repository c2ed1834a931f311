//! Remediation content
//!
//! - `knowledge_base`: insertion-ordered records loaded from JSON
//! - `aliases`: literal key variants for labels with different punctuation
//! - `resolver`: exact-then-fuzzy label to record matching

pub mod aliases;
pub mod knowledge_base;
pub mod resolver;

pub use knowledge_base::{KnowledgeBase, RemediationRecord};
pub use resolver::{FuzzyPolicy, MatchStage, RemediationLookup, RemediationResolver, ResolverConfig};
