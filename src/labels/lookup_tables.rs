//! Display Name Lookup Tables
//!
//! Maps plant tokens and `_`-joined disease tokens to display strings.
//! Keys always use single underscores because labels are collapsed before
//! lookup.
//!
//! Two locales ship with the crate:
//! - `en`: English names
//! - `vi`: Vietnamese names used in the field deployment

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Vi,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "vi" | "vietnamese" => Ok(Locale::Vi),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

/// A single table entry
#[derive(Debug, Clone, Copy)]
pub struct NameEntry {
    pub key: &'static str,
    pub name: &'static str,
}

// ============================================================================
// ENGLISH
// ============================================================================

static EN_PLANTS: &[NameEntry] = &[
    NameEntry { key: "Pepper", name: "Pepper" },
    NameEntry { key: "Potato", name: "Potato" },
    NameEntry { key: "Tomato", name: "Tomato" },
];

static EN_DISEASES: &[NameEntry] = &[
    NameEntry { key: "Bacterial_spot", name: "Bacterial spot" },
    NameEntry { key: "Early_blight", name: "Early blight" },
    NameEntry { key: "Late_blight", name: "Late blight" },
    NameEntry { key: "Leaf_Mold", name: "Leaf mold" },
    NameEntry { key: "Septoria_leaf_spot", name: "Septoria leaf spot" },
    NameEntry { key: "Spider_mites_Two_spotted_spider_mite", name: "Two-spotted spider mite" },
    NameEntry { key: "Target_Spot", name: "Target spot" },
    NameEntry { key: "Tomato_YellowLeaf_Curl_Virus", name: "Tomato yellow leaf curl virus" },
    NameEntry { key: "Tomato_mosaic_virus", name: "Tomato mosaic virus" },
    NameEntry { key: "healthy", name: "Healthy" },
    // Cultivar-qualified forms (Pepper bell)
    NameEntry { key: "bell_Bacterial_spot", name: "Bacterial spot" },
    NameEntry { key: "bell_healthy", name: "Healthy" },
    // Forms that repeat the plant name
    NameEntry { key: "Tomato_Target_Spot", name: "Target spot (Corynespora)" },
    NameEntry { key: "Tomato_Tomato_YellowLeaf_Curl_Virus", name: "Tomato yellow leaf curl virus" },
    NameEntry { key: "Tomato_Tomato_mosaic_virus", name: "Tomato mosaic virus" },
];

// ============================================================================
// VIETNAMESE
// ============================================================================

static VI_PLANTS: &[NameEntry] = &[
    NameEntry { key: "Pepper", name: "Ớt chuông" },
    NameEntry { key: "Potato", name: "Khoai tây" },
    NameEntry { key: "Tomato", name: "Cà chua" },
];

static VI_DISEASES: &[NameEntry] = &[
    NameEntry { key: "Bacterial_spot", name: "Bệnh đốm vi khuẩn" },
    NameEntry { key: "Early_blight", name: "Bệnh đốm vòng (bệnh cháy sớm)" },
    NameEntry { key: "Late_blight", name: "Bệnh mốc sương (bệnh cháy muộn)" },
    NameEntry { key: "Leaf_Mold", name: "Bệnh nấm mốc lá" },
    NameEntry { key: "Septoria_leaf_spot", name: "Bệnh đốm lá Septoria (Đốm mắt cua)" },
    NameEntry { key: "Spider_mites_Two_spotted_spider_mite", name: "Nhện đỏ 2 chấm (Nhện chăng tơ)" },
    NameEntry { key: "Target_Spot", name: "Bệnh đốm đích" },
    NameEntry { key: "Tomato_YellowLeaf_Curl_Virus", name: "Bệnh virus xoăn vàng lá" },
    NameEntry { key: "Tomato_mosaic_virus", name: "Bệnh virus khảm" },
    NameEntry { key: "healthy", name: "Cây khỏe mạnh" },
    NameEntry { key: "bell_Bacterial_spot", name: "Bệnh đốm vi khuẩn (bệnh héo xanh vi khuẩn)" },
    NameEntry { key: "bell_healthy", name: "Cây khỏe mạnh" },
    NameEntry { key: "Tomato_Target_Spot", name: "Bệnh đốm đích (Đốm vòng Corynespora)" },
    NameEntry { key: "Tomato_Tomato_YellowLeaf_Curl_Virus", name: "Bệnh virus xoăn vàng lá" },
    NameEntry { key: "Tomato_Tomato_mosaic_virus", name: "Bệnh virus khảm" },
];

// ============================================================================
// TABLES
// ============================================================================

/// Per-locale display tables, built once at startup
#[derive(Debug, Clone)]
pub struct DisplayTables {
    pub locale: Locale,
    plants: FxHashMap<&'static str, &'static str>,
    diseases: FxHashMap<&'static str, &'static str>,
    /// Disease display string for the healthy sentinel
    pub healthy: &'static str,
    /// Display string for labels that cannot be resolved
    pub unknown: &'static str,
}

impl DisplayTables {
    pub fn for_locale(locale: Locale) -> Self {
        let (plants, diseases, healthy, unknown) = match locale {
            Locale::En => (EN_PLANTS, EN_DISEASES, "Healthy", "Unknown"),
            Locale::Vi => (VI_PLANTS, VI_DISEASES, "Khỏe mạnh", "Không xác định"),
        };

        Self {
            locale,
            plants: index(plants),
            diseases: index(diseases),
            healthy,
            unknown,
        }
    }

    pub fn plant_name(&self, plant_token: &str) -> Option<&'static str> {
        self.plants.get(plant_token).copied()
    }

    pub fn disease_name(&self, disease_key: &str) -> Option<&'static str> {
        self.diseases.get(disease_key).copied()
    }
}

impl Default for DisplayTables {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

fn index(entries: &'static [NameEntry]) -> FxHashMap<&'static str, &'static str> {
    entries.iter().map(|e| (e.key, e.name)).collect()
}
