//! Translator / Presenter
//!
//! Turns a `NormalizedLabel` into display strings. The fixed label set mixes
//! clean two-token labels with names that repeat the plant (`Tomato__Tomato_mosaic_virus`)
//! or embed a cultivar qualifier (`Pepper__bell___Bacterial_spot`); the presenter
//! absorbs that inconsistency instead of migrating the label set.

use super::lookup_tables::DisplayTables;
use super::normalizer::{Disease, NormalizedLabel, DELIMITER};
use serde::{Deserialize, Serialize};

/// Cultivar qualifiers that carry no disease meaning
pub const CULTIVAR_QUALIFIERS: &[&str] = &["bell"];

/// Presentation strings for one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLabel {
    pub plant_name: String,
    pub disease_name: String,
}

impl DisplayLabel {
    /// "Plant - Disease", the form stored with history alternatives
    pub fn combined(&self) -> String {
        format!("{} - {}", self.plant_name, self.disease_name)
    }
}

/// Maps normalized labels to display labels for one locale
#[derive(Debug, Clone, Default)]
pub struct Presenter {
    tables: DisplayTables,
}

impl Presenter {
    pub fn new(tables: DisplayTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &DisplayTables {
        &self.tables
    }

    /// Disease display string for the healthy sentinel
    pub fn healthy_name(&self) -> &str {
        self.tables.healthy
    }

    pub fn present(&self, label: &NormalizedLabel) -> DisplayLabel {
        let plant_name = match label.disease {
            Disease::Unknown => self.tables.unknown.to_string(),
            _ => self
                .tables
                .plant_name(&label.plant_token)
                .map(str::to_string)
                .unwrap_or_else(|| label.plant_token.clone()),
        };

        let disease_name = match &label.disease {
            Disease::Healthy => self.tables.healthy.to_string(),
            Disease::Unknown => self.tables.unknown.to_string(),
            Disease::Named(tokens) => self.disease_name(&label.plant_token, tokens),
        };

        DisplayLabel { plant_name, disease_name }
    }

    fn disease_name(&self, plant_token: &str, tokens: &[String]) -> String {
        if let Some(name) = self.tables.disease_name(&join(tokens)) {
            return name.to_string();
        }

        // Retry without a leading cultivar qualifier or plant repeat
        if let Some((first, rest)) = tokens.split_first() {
            if is_modifier(first, plant_token) && !rest.is_empty() {
                if let Some(name) = self.tables.disease_name(&join(rest)) {
                    return name.to_string();
                }
            }
        }

        let mut display: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !is_cultivar_qualifier(t))
            .collect();
        if display.first().is_some_and(|t| t.eq_ignore_ascii_case(plant_token)) {
            display.remove(0);
        }

        if display.is_empty() {
            self.tables.unknown.to_string()
        } else {
            title_case(&display.join(" "))
        }
    }
}

fn join(tokens: &[String]) -> String {
    tokens.join(&DELIMITER.to_string())
}

pub fn is_cultivar_qualifier(token: &str) -> bool {
    CULTIVAR_QUALIFIERS.iter().any(|q| q.eq_ignore_ascii_case(token))
}

/// Cultivar qualifier or a redundant repeat of the plant token
pub fn is_modifier(token: &str, plant_token: &str) -> bool {
    is_cultivar_qualifier(token) || token.eq_ignore_ascii_case(plant_token)
}

/// Title-case words: first letter of each alphabetic run upper, rest lower
///
/// `"two-spotted spider_mite"` → `"Two-Spotted Spider Mite"`
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;

    for c in text.chars() {
        let c = if c == DELIMITER { ' ' } else { c };
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }

    out
}
