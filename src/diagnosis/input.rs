//! Image sources and the classifier seam
//!
//! Uploads and camera captures reach the classifier through one sum type with
//! the same small capability set.

use chrono::{DateTime, Utc};

/// Default type for frames whose magic bytes are not recognised
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    /// Declared by the client; sniffed from the bytes when empty
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A frame from a camera capture, which carries no filename
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ImageInput {
    Uploaded(UploadedImage),
    Captured(CapturedImage),
}

impl ImageInput {
    pub fn bytes(&self) -> &[u8] {
        match self {
            ImageInput::Uploaded(image) => &image.bytes,
            ImageInput::Captured(image) => &image.bytes,
        }
    }

    pub fn suggested_filename(&self) -> String {
        match self {
            ImageInput::Uploaded(image) => image.filename.clone(),
            ImageInput::Captured(image) => {
                let extension = infer::get(&image.bytes).map(|t| t.extension()).unwrap_or("jpg");
                format!("capture_{}.{}", image.captured_at.format("%Y%m%d_%H%M%S"), extension)
            }
        }
    }

    pub fn content_type(&self) -> String {
        if let ImageInput::Uploaded(UploadedImage {
            content_type: Some(declared),
            ..
        }) = self
        {
            if !declared.is_empty() {
                return declared.clone();
            }
        }
        infer::get(self.bytes())
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }
}

/// Produces one probability per label, in label-set order
pub trait Classifier: Send + Sync {
    fn predict(&self, image: &ImageInput) -> anyhow::Result<Vec<f64>>;
}
