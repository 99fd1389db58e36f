//! Error types for the plantguard-core library.
//!
//! Every failure a user action can hit is folded into one closed
//! [`AppError`] taxonomy. The `Display` output of each variant is the
//! message shown to the user; [`AppError::title`] gives the heading of the
//! blocking notice it is surfaced in.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;

/// Fallback shown when the prediction endpoint fails without a `detail`.
pub const GENERIC_PREDICTION_ERROR: &str = "Something went wrong while making the prediction.";

/// Errors that can occur within the plantguard-core library.
///
/// Underlying transport and I/O errors never leak through this type: they
/// are logged where they happen and converted into one of these variants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Media library permission was not granted.
    #[error("Sorry, we need camera roll permissions to make this work!")]
    PermissionDenied,

    /// A prediction was requested before any image was selected.
    #[error("Please select an image first!")]
    NoImage,

    /// The chosen path does not exist.
    #[error("Could not find {}.", .0.display())]
    ImageNotFound(PathBuf),

    /// The chosen file is not an image the picker accepts.
    #[error("{} is not a supported image file.", .0.display())]
    UnsupportedImage(PathBuf),

    /// The request was sent but no response came back.
    #[error("Could not reach the prediction server. Check your connection and try again.")]
    Network,

    /// The endpoint answered with a non-2xx status.
    #[error("{0}")]
    Server(String),

    /// Anything else: request construction, body decoding, local I/O.
    ///
    /// The payload is diagnostic only and is not shown to the user.
    #[error("An unexpected error occurred. Please try again.")]
    Unexpected(String),

    /// A report export was requested before any prediction exists.
    #[error("There is no prediction to export yet.")]
    NoReport,

    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sign-in or sign-up failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an unexpected error carrying a diagnostic message.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Server error with the generic fallback message.
    pub fn server_fallback() -> Self {
        Self::Server(GENERIC_PREDICTION_ERROR.to_string())
    }

    /// Heading for the blocking notice this error is surfaced in.
    pub fn title(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Permission Denied",
            Self::NoImage => "No Image",
            Self::ImageNotFound(_) => "Image Not Found",
            Self::UnsupportedImage(_) => "Unsupported Image",
            Self::Network => "Network Error",
            Self::Server(_) => "Prediction Error",
            Self::Unexpected(_) => "Error",
            Self::NoReport => "No Report",
            Self::Config(_) => "Configuration Error",
            Self::Auth(e) => e.title(),
        }
    }
}

/// Non-fatal outcomes of a report export.
///
/// The export still succeeds when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// The selected image could not be inlined; the report has no picture.
    ImageEmbedFailed(String),
    /// No sharing facility on this device; the document stays on disk.
    SharingUnavailable,
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageEmbedFailed(_) => {
                write!(f, "The image could not be embedded; the report was created without it.")
            }
            Self::SharingUnavailable => {
                write!(f, "Sharing is not available on this device; the report was saved locally.")
            }
        }
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
