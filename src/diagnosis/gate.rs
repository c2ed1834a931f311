//! Confidence Gate
//!
//! Decides whether a top-1 confidence (percent) proceeds to a full diagnosis.
//! Evaluated before any remediation lookup or persistence.

use crate::error::ConfigError;
use crate::labels::Locale;
use serde::{Deserialize, Serialize};

/// Gate thresholds in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Below this the prediction is rejected
    pub reject_below: f64,
    /// Below this an accepted prediction carries a caveat
    pub caveat_below: f64,
    /// At or above this the advice text switches to high confidence
    pub high_from: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            reject_below: 40.0,
            caveat_below: 60.0,
            high_from: 80.0,
        }
    }
}

impl GateConfig {
    /// Thresholds must be ordered within [0, 100]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0.0 <= self.reject_below
            && self.reject_below <= self.caveat_below
            && self.caveat_below <= self.high_from
            && self.high_from <= 100.0;

        if !ordered {
            return Err(ConfigError::Invalid(format!(
                "gate thresholds must satisfy 0 <= reject ({}) <= caveat ({}) <= high ({}) <= 100",
                self.reject_below, self.caveat_below, self.high_from
            )));
        }
        Ok(())
    }

    pub fn gate(&self, confidence: f64) -> ConfidenceTier {
        if confidence < self.reject_below {
            ConfidenceTier::Reject
        } else if confidence < self.caveat_below {
            ConfidenceTier::Low
        } else if confidence < self.high_from {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Reject,
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn proceeds(self) -> bool {
        self != ConfidenceTier::Reject
    }

    /// Warning shown next to an accepted but uncertain result
    pub fn caveat(self, locale: Locale) -> Option<&'static str> {
        if self != ConfidenceTier::Low {
            return None;
        }
        Some(match locale {
            Locale::En => "Moderate confidence. The result may not be fully accurate.",
            Locale::Vi => "Độ tin cậy trung bình. Kết quả có thể không chính xác hoàn toàn.",
        })
    }

    pub fn advice(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, ConfidenceTier::High) => {
                "The result is very reliable. You can apply the treatment measures with confidence."
            }
            (Locale::En, ConfidenceTier::Medium) => {
                "Consider consulting an expert so the plant can be treated in time."
            }
            (Locale::En, ConfidenceTier::Low) => {
                "The result may not be fully accurate. Take a clearer photo or consult an expert before treating the plant."
            }
            (Locale::En, ConfidenceTier::Reject) => {
                "I am not sure yet. Take a clearer photo or consult an expert before treating the plant."
            }
            (Locale::Vi, ConfidenceTier::High) => {
                "Kết quả rất đáng tin cậy. Bạn có thể yên tâm áp dụng các biện pháp điều trị."
            }
            (Locale::Vi, ConfidenceTier::Medium) => {
                "Bạn nên tham khảo ý kiến của các chuyên gia để chữa bệnh cho cây kịp thời."
            }
            (Locale::Vi, ConfidenceTier::Low) => {
                "Kết quả có thể không chính xác hoàn toàn. Bạn nên chụp ảnh rõ hơn hoặc tham khảo ý kiến của các chuyên gia để chữa bệnh cho cây."
            }
            (Locale::Vi, ConfidenceTier::Reject) => {
                "Tôi chưa chắc chắn. Bạn nên chụp ảnh rõ hơn hoặc tham khảo ý kiến của các chuyên gia để chữa bệnh cho cây."
            }
        }
    }
}

/// Guidance returned with a rejected prediction
pub fn rejection_guidance(locale: Locale) -> &'static str {
    match locale {
        Locale::En => {
            "Confidence is too low to identify the leaf. The photo may not show a leaf or may be blurred. Take a clearer photo closer to the leaf."
        }
        Locale::Vi => {
            "Độ tin cậy quá thấp, không thể xác định. Đây có thể không phải ảnh lá cây hoặc ảnh quá mờ. Vui lòng chụp ảnh rõ hơn hoặc đến gần lá cây hơn."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let gate = GateConfig::default();
        assert_eq!(gate.gate(0.0), ConfidenceTier::Reject);
        assert_eq!(gate.gate(39.99), ConfidenceTier::Reject);
        assert_eq!(gate.gate(40.0), ConfidenceTier::Low);
        assert_eq!(gate.gate(59.99), ConfidenceTier::Low);
        assert_eq!(gate.gate(60.0), ConfidenceTier::Medium);
        assert_eq!(gate.gate(79.99), ConfidenceTier::Medium);
        assert_eq!(gate.gate(80.0), ConfidenceTier::High);
        assert_eq!(gate.gate(100.0), ConfidenceTier::High);
    }

    #[test]
    fn test_only_low_has_caveat() {
        assert!(ConfidenceTier::Low.caveat(Locale::En).is_some());
        assert!(ConfidenceTier::Medium.caveat(Locale::En).is_none());
        assert!(ConfidenceTier::High.caveat(Locale::Vi).is_none());
        assert!(ConfidenceTier::Reject.caveat(Locale::En).is_none());
    }

    #[test]
    fn test_reject_does_not_proceed() {
        assert!(!ConfidenceTier::Reject.proceeds());
        assert!(ConfidenceTier::Low.proceeds());
        assert!(ConfidenceTier::High.proceeds());
    }

    #[test]
    fn test_validate_rejects_unordered_thresholds() {
        assert!(GateConfig::default().validate().is_ok());

        let swapped = GateConfig {
            reject_below: 70.0,
            caveat_below: 60.0,
            high_from: 80.0,
        };
        assert!(swapped.validate().is_err());

        let over = GateConfig {
            high_from: 120.0,
            ..Default::default()
        };
        assert!(over.validate().is_err());

        let negative = GateConfig {
            reject_below: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_collapsed_thresholds_skip_tiers() {
        let gate = GateConfig {
            reject_below: 50.0,
            caveat_below: 50.0,
            high_from: 50.0,
        };
        assert!(gate.validate().is_ok());
        assert_eq!(gate.gate(49.0), ConfidenceTier::Reject);
        assert_eq!(gate.gate(50.0), ConfidenceTier::High);
    }
}
