//! Data shared by the picker, the prediction client and the report exporter.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// A user-chosen image on local storage.
///
/// Only a reference is held; the bytes are read when they are uploaded or
/// embedded in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    path: PathBuf,
}

impl SelectedImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URI for the image, when the path is absolute.
    pub fn uri(&self) -> Option<Url> {
        Url::from_file_path(&self.path).ok()
    }
}

/// Parsed body of a successful `/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub disease_info: String,
    /// Display order is the order the endpoint sent them in.
    #[serde(default)]
    pub treatments: Vec<String>,
}

impl PredictionResult {
    /// True when confidence is a probability.
    pub fn has_valid_confidence(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence)
    }
}
