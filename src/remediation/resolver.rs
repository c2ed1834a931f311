//! Remediation Resolver
//!
//! Maps a raw classifier label to a knowledge-base record. Stages run in a
//! fixed order and the first hit wins:
//! 1. exact raw label
//! 2. delimiter-collapsed label
//! 3. canonical reconstructions (`Plant___Disease`, `Plant__bell___Disease`)
//! 4. known alias variants
//! 5. token-overlap fuzzy match

use super::aliases::{alias_candidates, AliasRule, ALIAS_RULES};
use super::knowledge_base::{KnowledgeBase, RemediationRecord};
use crate::labels::normalizer::{collapse_delimiters, tokens};
use crate::labels::presenter::is_cultivar_qualifier;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Default share of label tokens a fuzzy candidate must contain
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

/// How the fuzzy stage picks among qualifying keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyPolicy {
    /// First qualifying key in knowledge-base order
    #[default]
    FirstMatch,
    /// Highest overlap ratio; ties go to the shorter key, then file order
    BestOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub fuzzy_threshold: f64,
    pub fuzzy_policy: FuzzyPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_policy: FuzzyPolicy::default(),
        }
    }
}

/// Stage that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Exact,
    Collapsed,
    Canonical,
    Alias,
    Fuzzy,
}

/// A successful lookup
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub key: &'a str,
    pub stage: MatchStage,
    pub record: &'a RemediationRecord,
}

/// Lookup seam used by the orchestrator
pub trait RemediationLookup: Send + Sync {
    /// `None` means no remediation content is available for the label
    fn lookup(&self, raw_label: &str) -> Option<RemediationRecord>;
}

pub struct RemediationResolver {
    kb: KnowledgeBase,
    /// Lower-cased token set of each key, aligned with `kb.iter()`
    key_tokens: Vec<FxHashSet<String>>,
    aliases: &'static [AliasRule],
    config: ResolverConfig,
}

impl RemediationResolver {
    pub fn new(kb: KnowledgeBase, config: ResolverConfig) -> Self {
        let key_tokens = kb.iter().map(|(key, _)| token_set(key)).collect();
        Self {
            kb,
            key_tokens,
            aliases: ALIAS_RULES,
            config,
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn resolve(&self, raw: &str) -> Option<&RemediationRecord> {
        self.resolve_with_stage(raw).map(|r| r.record)
    }

    pub fn resolve_with_stage(&self, raw: &str) -> Option<Resolution<'_>> {
        let resolution = self.find(raw);
        match &resolution {
            Some(r) => tracing::debug!("Remediation for '{}' via {:?} key '{}'", raw, r.stage, r.key),
            None => tracing::debug!("No remediation for '{}'", raw),
        }
        resolution
    }

    fn find(&self, raw: &str) -> Option<Resolution<'_>> {
        if let Some(hit) = self.exact(raw, MatchStage::Exact) {
            return Some(hit);
        }

        let collapsed = collapse_delimiters(raw);
        if let Some(hit) = self.exact(&collapsed, MatchStage::Collapsed) {
            return Some(hit);
        }

        for key in canonical_keys(&collapsed) {
            if let Some(hit) = self.exact(&key, MatchStage::Canonical) {
                return Some(hit);
            }
        }

        for key in alias_candidates(self.aliases, &collapsed) {
            if let Some(hit) = self.exact(&key, MatchStage::Alias) {
                return Some(hit);
            }
        }

        self.fuzzy(&collapsed)
    }

    fn exact(&self, key: &str, stage: MatchStage) -> Option<Resolution<'_>> {
        self.kb
            .get_key_value(key)
            .map(|(key, record)| Resolution { key, stage, record })
    }

    fn fuzzy(&self, collapsed: &str) -> Option<Resolution<'_>> {
        let label = token_set(collapsed);
        if label.is_empty() {
            return None;
        }
        let needed = self.config.fuzzy_threshold * label.len() as f64;

        let mut best: Option<(f64, usize)> = None;
        for (pos, key_set) in self.key_tokens.iter().enumerate() {
            let overlap = key_set.intersection(&label).count();
            if (overlap as f64) < needed {
                continue;
            }

            if self.config.fuzzy_policy == FuzzyPolicy::FirstMatch {
                return self.fuzzy_hit(pos);
            }

            let ratio = overlap as f64 / label.len() as f64;
            let better = match best {
                None => true,
                Some((best_ratio, best_pos)) => {
                    ratio > best_ratio
                        || (ratio == best_ratio && self.key_len(pos) < self.key_len(best_pos))
                }
            };
            if better {
                best = Some((ratio, pos));
            }
        }

        best.and_then(|(_, pos)| self.fuzzy_hit(pos))
    }

    fn fuzzy_hit(&self, pos: usize) -> Option<Resolution<'_>> {
        self.kb.entry(pos).map(|(key, record)| Resolution {
            key,
            stage: MatchStage::Fuzzy,
            record,
        })
    }

    fn key_len(&self, pos: usize) -> usize {
        self.kb.entry(pos).map(|(k, _)| k.len()).unwrap_or(usize::MAX)
    }
}

impl RemediationLookup for RemediationResolver {
    fn lookup(&self, raw_label: &str) -> Option<RemediationRecord> {
        self.resolve(raw_label).cloned()
    }
}

/// Key forms the knowledge base uses for a collapsed label
fn canonical_keys(collapsed: &str) -> Vec<String> {
    let parts: Vec<&str> = tokens(collapsed).collect();
    let mut keys = Vec::new();
    if parts.len() < 2 {
        return keys;
    }

    // Also the key form for labels that repeat the plant (`Tomato___Tomato_mosaic_virus`)
    let plant = parts[0];
    keys.push(format!("{}___{}", plant, parts[1..].join("_")));

    if parts.len() >= 3 && is_cultivar_qualifier(parts[1]) {
        keys.push(format!("{}__{}___{}", plant, parts[1], parts[2..].join("_")));
    }

    keys
}

fn token_set(key: &str) -> FxHashSet<String> {
    tokens(&collapse_delimiters(key).to_lowercase()).map(str::to_string).collect()
}
