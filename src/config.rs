//! Application configuration
//!
//! Defaults, then an optional TOML file named by `PLANT_DIAGNOSIS_CONFIG`,
//! then environment overrides (`DATA_DIR`, `PORT`, `LOCALE`, `HISTORY_BACKEND`).
//! Validated once on load.

use crate::diagnosis::{DiagnosisContext, Diagnoser, GateConfig, RankerConfig};
use crate::error::ConfigError;
use crate::history::{HistoryStore, ImageArchive, MemoryHistoryStore};
use crate::labels::{DisplayTables, LabelSet, Locale, Presenter};
use crate::remediation::{KnowledgeBase, RemediationResolver, ResolverConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const CONFIG_PATH_VAR: &str = "PLANT_DIAGNOSIS_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub gate: GateConfig,
    pub alternatives: RankerConfig,
    pub display: DisplayConfig,
    pub remediation: ResolverConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    /// Relative to `data_dir` unless absolute
    pub labels_file: PathBuf,
    /// Relative to `data_dir` unless absolute
    pub knowledge_base_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            labels_file: PathBuf::from("class_indices.json"),
            knowledge_base_file: PathBuf::from("solutions.json"),
        }
    }
}

impl DataConfig {
    pub fn labels_path(&self) -> PathBuf {
        self.data_dir.join(&self.labels_file)
    }

    pub fn knowledge_base_path(&self) -> PathBuf {
        self.data_dir.join(&self.knowledge_base_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub locale: Locale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Memory,
    Duckdb,
}

impl FromStr for HistoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(HistoryBackend::Memory),
            "duckdb" => Ok(HistoryBackend::Duckdb),
            other => Err(format!("unsupported history backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    pub database_path: PathBuf,
    /// Where images of saved diagnoses are written; unset disables archiving
    pub image_dir: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::Memory,
            database_path: PathBuf::from("data/history.duckdb"),
            image_dir: None,
        }
    }
}

impl AppConfig {
    /// Load from the file named by `PLANT_DIAGNOSIS_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from `lookup` (the process environment in `load`)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("DATA_DIR") {
            self.data.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: '{}'", port)))?;
        }
        if let Some(locale) = lookup("LOCALE") {
            self.display.locale = locale.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(backend) = lookup("HISTORY_BACKEND") {
            self.history.backend = backend.parse().map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate()?;
        self.alternatives.validate()?;

        let threshold = self.remediation.fuzzy_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "remediation.fuzzy_threshold must be within (0, 1], got {}",
                threshold
            )));
        }

        if cfg!(not(feature = "persistence")) && self.history.backend == HistoryBackend::Duckdb {
            return Err(ConfigError::Invalid(
                "history backend 'duckdb' requires the `persistence` feature".to_string(),
            ));
        }

        Ok(())
    }

    /// Load the label set and knowledge base into a shared context
    pub fn load_context(&self) -> anyhow::Result<DiagnosisContext> {
        let labels_path = self.data.labels_path();
        let labels = LabelSet::from_class_indices(&labels_path)
            .with_context(|| format!("Failed to load label set from {}", labels_path.display()))?;

        let kb_path = self.data.knowledge_base_path();
        let kb = KnowledgeBase::load(&kb_path)
            .with_context(|| format!("Failed to load knowledge base from {}", kb_path.display()))?;

        Ok(DiagnosisContext {
            labels,
            presenter: Presenter::new(DisplayTables::for_locale(self.display.locale)),
            remediation: Arc::new(RemediationResolver::new(kb, self.remediation)),
            gate: self.gate,
            ranker: self.alternatives,
        })
    }

    pub fn open_history_store(&self) -> anyhow::Result<Arc<dyn HistoryStore>> {
        match self.history.backend {
            HistoryBackend::Memory => Ok(Arc::new(MemoryHistoryStore::new())),
            #[cfg(feature = "persistence")]
            HistoryBackend::Duckdb => {
                let store = crate::history::DuckDbHistoryStore::open(&self.history.database_path)
                    .with_context(|| {
                        format!("Failed to open history database {}", self.history.database_path.display())
                    })?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "persistence"))]
            HistoryBackend::Duckdb => {
                anyhow::bail!("history backend 'duckdb' requires the `persistence` feature")
            }
        }
    }

    /// Context, history store and image archive wired into a `Diagnoser`
    pub fn build_diagnoser(&self) -> anyhow::Result<Diagnoser> {
        let context = Arc::new(self.load_context()?);
        let store = self.open_history_store()?;
        let diagnoser = Diagnoser::new(context, store);

        Ok(match &self.history.image_dir {
            Some(dir) => diagnoser.with_image_archive(ImageArchive::new(dir)),
            None => diagnoser,
        })
    }
}
