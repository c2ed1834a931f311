//! Label Normalizer
//!
//! Canonicalizes raw classifier labels such as `Pepper__bell___Bacterial_spot`,
//! `Potato___Early_blight` or `Tomato_Bacterial_spot` into a plant token plus an
//! ordered sequence of disease tokens.
//!
//! The exported label set mixes single, double and triple underscore runs, so
//! every run is collapsed to one delimiter before splitting.

use serde::Serialize;
use smallvec::SmallVec;

/// Delimiter used by the exported label set
pub const DELIMITER: char = '_';

/// Marker that turns any label into the healthy sentinel
pub const HEALTHY_MARKER: &str = "healthy";

/// Plant token used when a label has no tokens at all
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Disease tokens (labels rarely carry more than four)
pub type DiseaseTokens = SmallVec<[String; 4]>;

/// Disease part of a normalized label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tokens", rename_all = "snake_case")]
pub enum Disease {
    /// No disease detected
    Healthy,
    /// Tokens after the plant token (empty for one-token labels)
    Named(DiseaseTokens),
    /// Label had zero tokens after cleaning
    Unknown,
}

/// Canonical form of a class label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedLabel {
    pub plant_token: String,
    pub disease: Disease,
}

impl NormalizedLabel {
    pub fn is_healthy(&self) -> bool {
        matches!(self.disease, Disease::Healthy)
    }

    /// Disease tokens, empty for the healthy and unknown cases
    pub fn disease_tokens(&self) -> &[String] {
        match &self.disease {
            Disease::Named(tokens) => tokens.as_slice(),
            Disease::Healthy | Disease::Unknown => &[],
        }
    }
}

/// Collapse every run of delimiters into one and strip the ends
///
/// `"Tomato__Tomato_YellowLeaf__Curl_Virus"` → `"Tomato_Tomato_YellowLeaf_Curl_Virus"`
pub fn collapse_delimiters(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending = false;

    for c in raw.chars() {
        if c == DELIMITER {
            pending = true;
            continue;
        }
        if pending && !out.is_empty() {
            out.push(DELIMITER);
        }
        pending = false;
        out.push(c);
    }

    out
}

/// Split a label into its non-empty tokens
pub fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(DELIMITER).filter(|t| !t.is_empty())
}

/// First token of a label (the plant), `"unknown"` for malformed labels
pub fn plant_token(raw: &str) -> &str {
    tokens(raw).next().unwrap_or(UNKNOWN_TOKEN)
}

/// Normalize a raw class label
///
/// Never fails: a label with no tokens resolves to plant `"unknown"` with an
/// unknown disease.
pub fn normalize(raw: &str) -> NormalizedLabel {
    let collapsed = collapse_delimiters(raw);
    let mut parts = tokens(&collapsed);

    let Some(plant) = parts.next() else {
        return NormalizedLabel {
            plant_token: UNKNOWN_TOKEN.to_string(),
            disease: Disease::Unknown,
        };
    };

    let disease = if collapsed.to_lowercase().contains(HEALTHY_MARKER) {
        Disease::Healthy
    } else {
        Disease::Named(parts.map(str::to_string).collect())
    };

    NormalizedLabel {
        plant_token: plant.to_string(),
        disease,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(tokens: &[&str]) -> Disease {
        Disease::Named(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_collapse_delimiters() {
        assert_eq!(collapse_delimiters("Pepper__bell___Bacterial_spot"), "Pepper_bell_Bacterial_spot");
        assert_eq!(collapse_delimiters("__Tomato___healthy__"), "Tomato_healthy");
        assert_eq!(collapse_delimiters("Tomato"), "Tomato");
        assert_eq!(collapse_delimiters("____"), "");
        assert_eq!(collapse_delimiters(""), "");
    }

    #[test]
    fn test_normalize_triple_delimiter() {
        let label = normalize("Tomato___Early_blight");
        assert_eq!(label.plant_token, "Tomato");
        assert_eq!(label.disease, named(&["Early", "blight"]));
    }

    #[test]
    fn test_normalize_cultivar_label() {
        let label = normalize("Pepper__bell___Bacterial_spot");
        assert_eq!(label.plant_token, "Pepper");
        assert_eq!(label.disease, named(&["bell", "Bacterial", "spot"]));
    }

    #[test]
    fn test_delimiter_runs_do_not_change_result() {
        let variants = [
            "Tomato_Tomato_YellowLeaf_Curl_Virus",
            "Tomato__Tomato_YellowLeaf__Curl_Virus",
            "Tomato___Tomato___YellowLeaf___Curl___Virus",
            "_Tomato_Tomato__YellowLeaf_Curl_Virus___",
        ];
        let expected = normalize(variants[0]);
        for v in &variants[1..] {
            assert_eq!(normalize(v), expected, "variant {}", v);
        }
    }

    #[test]
    fn test_healthy_in_any_casing() {
        for raw in ["Tomato_healthy", "Pepper__bell___healthy", "Potato___HEALTHY", "Corn___Healthy_leaf"] {
            let label = normalize(raw);
            assert!(label.is_healthy(), "{}", raw);
            assert!(label.disease_tokens().is_empty());
        }
    }

    #[test]
    fn test_single_token_label() {
        let label = normalize("Tomato");
        assert_eq!(label.plant_token, "Tomato");
        assert_eq!(label.disease, named(&[]));
    }

    #[test]
    fn test_malformed_label_falls_back_to_unknown() {
        for raw in ["", "_", "_____"] {
            let label = normalize(raw);
            assert_eq!(label.plant_token, UNKNOWN_TOKEN);
            assert_eq!(label.disease, Disease::Unknown);
        }
    }

    #[test]
    fn test_plant_token() {
        assert_eq!(plant_token("Pepper__bell___healthy"), "Pepper");
        assert_eq!(plant_token("__Potato___Late_blight"), "Potato");
        assert_eq!(plant_token("___"), UNKNOWN_TOKEN);
    }
}
