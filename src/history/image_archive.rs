//! Saved diagnosis images
//!
//! Images of accepted diagnoses are written to `{root}/{user_id}/{timestamp}_{filename}`
//! and the path is stored with the history record.

use crate::diagnosis::ImageInput;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ImageArchive {
    root: PathBuf,
}

impl ImageArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the image and return its path with `/` separators
    pub fn save(&self, user_id: &str, image: &ImageInput) -> Result<String> {
        let dir = self.root.join(sanitize(user_id));
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let filename = format!(
            "{}_{}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            sanitize(&image.suggested_filename())
        );
        let path = dir.join(filename);
        fs::write(&path, image.bytes()).with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path.display().to_string().replace('\\', "/"))
    }
}

/// Keep path components inside the archive directory
fn sanitize(component: &str) -> String {
    let mut cleaned: String = component
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}
