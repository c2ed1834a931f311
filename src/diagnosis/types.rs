//! Diagnosis data
//!
//! Plain values handed to the presentation layer and serialized as-is by the
//! API server and CLI.

use super::gate::ConfidenceTier;
use crate::error::DiagnosisError;
use crate::labels::{DisplayLabel, LabelSet};
use crate::remediation::RemediationRecord;
use serde::{Deserialize, Serialize};

/// Classifier output paired with the label set it was produced for
#[derive(Debug, Clone, Copy)]
pub struct PredictionVector<'a> {
    labels: &'a [String],
    probabilities: &'a [f64],
}

impl<'a> PredictionVector<'a> {
    /// Validate classifier output against the label set
    pub fn new(labels: &'a LabelSet, probabilities: &'a [f64]) -> Result<Self, DiagnosisError> {
        if probabilities.is_empty() {
            return Err(DiagnosisError::EmptyVector);
        }
        if probabilities.len() != labels.len() {
            return Err(DiagnosisError::LengthMismatch {
                expected: labels.len(),
                actual: probabilities.len(),
            });
        }
        if let Some((index, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(DiagnosisError::InvalidProbability { index, value });
        }

        Ok(Self {
            labels: labels.as_slice(),
            probabilities,
        })
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// `(label, probability)` pairs in classifier order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let (labels, probabilities) = (self.labels, self.probabilities);
        labels.iter().map(String::as_str).zip(probabilities.iter().copied())
    }

    /// Highest-probability entry; the first index wins ties
    pub fn argmax(&self) -> (&'a str, f64) {
        let mut best = 0;
        for (i, &p) in self.probabilities.iter().enumerate().skip(1) {
            if p > self.probabilities[best] {
                best = i;
            }
        }
        (self.labels[best].as_str(), self.probabilities[best])
    }
}

/// A same-plant candidate shown next to the main result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeEntry {
    pub raw_label: String,
    pub display_label: DisplayLabel,
    /// Percent, 0-100
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub raw_label: String,
    pub display_label: DisplayLabel,
    /// Percent, 0-100
    pub confidence: f64,
    pub tier: ConfidenceTier,
    pub is_healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveat: Option<String>,
    pub advice: String,
    pub alternatives: Vec<AlternativeEntry>,
    /// `None` when the knowledge base has nothing for this label
    pub remediation: Option<RemediationRecord>,
}

/// Low-confidence prediction; the suspected label is a reference only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedResult {
    /// Fraction, 0-1
    pub top_probability: f64,
    /// Percent, 0-100
    pub confidence: f64,
    pub suspected_label: String,
    pub suspected_display: DisplayLabel,
    pub guidance: String,
}

/// What happened to the history record for a diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PersistenceStatus {
    Saved { record_id: String },
    /// No signed-in user, nothing was written
    Anonymous,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiagnosisOutcome {
    Diagnosed {
        result: DiagnosisResult,
        persistence: PersistenceStatus,
    },
    Rejected(RejectedResult),
}

impl DiagnosisOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, DiagnosisOutcome::Rejected(_))
    }

    pub fn result(&self) -> Option<&DiagnosisResult> {
        match self {
            DiagnosisOutcome::Diagnosed { result, .. } => Some(result),
            DiagnosisOutcome::Rejected(_) => None,
        }
    }

    pub fn rejected(&self) -> Option<&RejectedResult> {
        match self {
            DiagnosisOutcome::Rejected(rejected) => Some(rejected),
            DiagnosisOutcome::Diagnosed { .. } => None,
        }
    }

    pub fn persistence(&self) -> Option<&PersistenceStatus> {
        match self {
            DiagnosisOutcome::Diagnosed { persistence, .. } => Some(persistence),
            DiagnosisOutcome::Rejected(_) => None,
        }
    }
}
