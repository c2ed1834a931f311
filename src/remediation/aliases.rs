//! Known key variants
//!
//! A few knowledge-base keys use different internal punctuation than the
//! classifier label (a space between two words, `Yellow_Leaf` vs `YellowLeaf`).
//! Each rule lists literal alternates plus substring swaps applied to the
//! collapsed label.

/// Alias rule for one family of labels
#[derive(Debug, Clone, Copy)]
pub struct AliasRule {
    /// Case-insensitive substrings that must all appear in the collapsed label
    pub requires: &'static [&'static str],
    /// Knowledge-base keys tried literally
    pub alternates: &'static [&'static str],
    /// `(from, to)` substring swaps applied to the collapsed label
    pub swaps: &'static [(&'static str, &'static str)],
}

pub static ALIAS_RULES: &[AliasRule] = &[
    AliasRule {
        requires: &["tomato", "yellow", "leaf"],
        alternates: &[
            "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
            "Tomato___Tomato_YellowLeaf__Curl_Virus",
        ],
        swaps: &[("YellowLeaf", "Yellow_Leaf"), ("Yellow_Leaf", "YellowLeaf")],
    },
    AliasRule {
        requires: &["tomato", "spider", "mite"],
        alternates: &["Tomato___Spider_mites Two-spotted_spider_mite"],
        swaps: &[("mites_Two_spotted", "mites Two-spotted")],
    },
];

impl AliasRule {
    pub fn applies_to(&self, collapsed_lower: &str) -> bool {
        self.requires.iter().all(|r| collapsed_lower.contains(r))
    }
}

/// Alternate keys for a collapsed label, in the order they should be tried
pub fn alias_candidates(rules: &[AliasRule], collapsed: &str) -> Vec<String> {
    let lower = collapsed.to_lowercase();
    let mut out = Vec::new();

    for rule in rules.iter().filter(|r| r.applies_to(&lower)) {
        out.extend(rule.alternates.iter().map(|a| a.to_string()));

        for &(from, to) in rule.swaps {
            if !collapsed.contains(from) {
                continue;
            }
            let swapped = collapsed.replacen(from, to, 1);
            if let Some((plant, rest)) = swapped.split_once('_') {
                out.push(format!("{}___{}", plant, rest));
            }
            out.push(swapped);
        }
    }

    out
}
