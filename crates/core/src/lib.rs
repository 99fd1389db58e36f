//! PlantGuard Core Library
//!
//! Client-side core of the PlantGuard plant-disease detection app: pick a
//! leaf photo, upload it to a prediction endpoint, show the classification,
//! and export it as a shareable report.
//!
//! # Overview
//!
//! - **Media Picker**: permission check and single-image selection via [`picker`]
//! - **Prediction Client**: multipart upload and failure classification via [`client`]
//! - **Result Renderer**: display model and confidence formatting via [`render`]
//! - **Report Exporter**: HTML report, document and share via [`report`]
//! - **Accounts**: login/signup over a hosted auth service via [`auth`]
//!
//! Per-screen state lives in [`session::UploadSession`].
//!
//! # Quick Start
//!
//! ```ignore
//! use plantguard_core::{FsPicker, PlantGuard, UploadSession};
//!
//! let app = PlantGuard::new()?;
//! let client = app.prediction_client()?;
//!
//! let mut session = UploadSession::new();
//! session.pick_image(&FsPicker::with_path("leaf.jpg"))?;
//! let prediction = session.predict(&client).await?;
//! println!("{}", prediction.class_name);
//! ```
//!
//! # Module Structure
//!
//! - [`auth`]: Login/signup flows and the Firebase backend
//! - [`client`]: Prediction endpoint client
//! - [`config`]: Configuration loading and management
//! - [`error`]: Error types and result aliases
//! - [`image_processing`]: Image reading and data-URI encoding
//! - [`model`]: Selected image and prediction result types
//! - [`picker`]: Media library access and selection
//! - [`render`]: Result display model
//! - [`report`]: Report rendering and export
//! - [`session`]: Upload session state machine
//! - [`settings`]: Persisted user settings

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod image_processing;
pub mod model;
pub mod picker;
pub mod render;
pub mod report;
pub mod session;
pub mod settings;

// Re-export primary types for convenience
pub use auth::{AuthError, AuthService, FirebaseBackend};
pub use client::{PredictionClient, Predictor};
pub use config::Config;
pub use error::{AppError, ExportWarning, Result};
pub use model::{PredictionResult, SelectedImage};
pub use picker::{FsPicker, MediaPicker};
pub use render::{format_confidence, render, PredictionView};
pub use report::{ClipboardSharer, ExportOutcome, HtmlFileRenderer, ReportExporter};
pub use session::{SessionState, UploadSession};
pub use settings::Settings;

/// Main entry point for the PlantGuard client.
///
/// Holds the resolved configuration and builds the collaborators each
/// screen needs.
pub struct PlantGuard {
    config: Config,
}

impl PlantGuard {
    /// Creates a new instance from the environment and persisted settings.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the configured endpoint is not a
    /// valid http(s) URL.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
        })
    }

    /// Creates an instance with custom configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Client for the configured prediction endpoint.
    pub fn prediction_client(&self) -> Result<PredictionClient> {
        PredictionClient::new(&self.config)
    }

    /// Picker prompting for a file in the configured media directory.
    pub fn interactive_picker(&self) -> FsPicker {
        FsPicker::interactive(&self.config.media_dir)
    }

    /// Exporter writing into the report directory and sharing via the clipboard.
    pub fn report_exporter(&self) -> ReportExporter<HtmlFileRenderer, ClipboardSharer> {
        ReportExporter::new(HtmlFileRenderer::new(&self.config.report_dir), ClipboardSharer)
    }

    /// Login/signup service backed by Firebase.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when the Firebase keys are not configured.
    pub fn auth(&self) -> Result<AuthService<FirebaseBackend>> {
        let firebase = self.config.firebase()?.clone();
        Ok(AuthService::new(FirebaseBackend::new(firebase)))
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration.
    ///
    /// Allows overriding settings like the endpoint after initialization.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

/// Loads `.env` files if present.
///
/// Call this once at application startup before reading configuration.
pub fn init() {
    let _ = dotenvy::dotenv();
}
