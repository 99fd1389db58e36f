//! Per-screen upload session and its state machine.
//!
//! ```text
//! Idle -> Picking -> Idle (image selected or cancelled)
//!                 \-> Failed (permission denied, bad file)
//! Idle -> Uploading -> Done | Failed
//! ```
//!
//! [`UploadSession::predict`] borrows the session mutably for the whole
//! request, so a second request cannot start while one is in flight.

use tracing::{debug, info};

use crate::client::Predictor;
use crate::error::{AppError, Result};
use crate::model::{PredictionResult, SelectedImage};
use crate::picker::MediaPicker;

/// Where the session is in the pick/upload cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    /// Waiting for the user.
    #[default]
    Idle,
    /// The media picker is open.
    Picking,
    /// A prediction request is in flight.
    Uploading,
    /// The last request produced a prediction.
    Done,
    /// The last action failed; the error is what the user was shown.
    Failed(AppError),
}

/// Transient state owned by one upload screen.
#[derive(Debug, Default)]
pub struct UploadSession {
    image: Option<SelectedImage>,
    prediction: Option<PredictionResult>,
    state: SessionState,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.prediction.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// True while a prediction request is in flight.
    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Uploading
    }

    /// Replaces the selected image and drops any prediction made for the old one.
    pub fn select_image(&mut self, image: SelectedImage) {
        debug!("session image -> {}", image.path().display());
        self.image = Some(image);
        self.prediction = None;
        self.state = SessionState::Idle;
    }

    /// Runs the picker. Returns whether a new image was selected.
    ///
    /// Cancelling keeps the previous image and prediction.
    pub fn pick_image<P: MediaPicker>(&mut self, picker: &P) -> Result<bool> {
        let previous = std::mem::replace(&mut self.state, SessionState::Picking);
        match picker.pick_image() {
            Ok(Some(image)) => {
                self.select_image(image);
                Ok(true)
            }
            Ok(None) => {
                self.state = previous;
                Ok(false)
            }
            Err(e) => {
                self.state = SessionState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Uploads the selected image and stores the prediction.
    ///
    /// On failure the previous prediction, if any, is left as it was.
    pub async fn predict<C: Predictor>(&mut self, client: &C) -> Result<&PredictionResult> {
        let Some(image) = self.image.as_ref() else {
            self.state = SessionState::Failed(AppError::NoImage);
            return Err(AppError::NoImage);
        };

        self.state = SessionState::Uploading;
        let outcome = client.predict(Some(image)).await;

        match outcome {
            Ok(result) => {
                info!("prediction stored: {}", result.class_name);
                self.state = SessionState::Done;
                Ok(self.prediction.insert(result))
            }
            Err(e) => {
                self.state = SessionState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Back to an empty session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
