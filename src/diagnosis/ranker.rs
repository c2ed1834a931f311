//! Same-Plant Filter & Ranker
//!
//! Alternatives are only ever drawn from classes of the top prediction's plant.

use super::types::PredictionVector;
use crate::error::ConfigError;
use crate::labels::plant_token;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Probability floor (0-1) for the first pass
    pub min_probability: f64,
    pub max_count: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_probability: 0.40,
            max_count: 3,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_probability) {
            return Err(ConfigError::Invalid(format!(
                "alternatives.min_probability must be within [0, 1], got {}",
                self.min_probability
            )));
        }
        if self.max_count == 0 {
            return Err(ConfigError::Invalid("alternatives.max_count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Same-plant entries ranked by probability
    ///
    /// Entries under the floor are filtered out unless that leaves fewer than
    /// two, in which case every same-plant entry is ranked instead.
    pub fn rank<'a>(&self, vector: &PredictionVector<'a>, top_plant: &str) -> Vec<(&'a str, f64)> {
        let same_plant: Vec<(&'a str, f64)> = vector
            .iter()
            .filter(|(label, _)| plant_token(label) == top_plant)
            .collect();

        let mut ranked: Vec<(&'a str, f64)> = same_plant
            .iter()
            .copied()
            .filter(|&(_, p)| p >= self.min_probability)
            .collect();

        if ranked.len() < 2 {
            ranked = same_plant;
        }

        // Stable: equal probabilities keep classifier order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.max_count);
        ranked
    }
}

/// `rank` with the default floor and count
pub fn rank_alternatives<'a>(vector: &PredictionVector<'a>, top_plant: &str) -> Vec<(&'a str, f64)> {
    RankerConfig::default().rank(vector, top_plant)
}
