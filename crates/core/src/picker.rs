//! Media picker: permission check plus single-image selection.
//!
//! The platform picker is abstracted behind [`MediaPicker`]. The bundled
//! [`FsPicker`] treats a directory on local storage as the media library:
//! access is granted when it can be listed, and an image is chosen either
//! up front (a path given on the command line) or by prompting.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::model::SelectedImage;

/// Platform media library.
pub trait MediaPicker {
    /// Asks for read access to the media library.
    fn request_access(&self) -> bool;

    /// Lets the user choose one image. `Ok(None)` means the user cancelled.
    ///
    /// Implementations only browse after access has been granted.
    fn browse(&self) -> Result<Option<SelectedImage>>;

    /// Permission check followed by a single selection.
    fn pick_image(&self) -> Result<Option<SelectedImage>> {
        if !self.request_access() {
            warn!("media library access denied");
            return Err(AppError::PermissionDenied);
        }
        self.browse()
    }
}

enum PickSource {
    Path(PathBuf),
    Prompt,
}

/// Picker backed by the local filesystem.
pub struct FsPicker {
    library: PathBuf,
    source: PickSource,
}

impl FsPicker {
    /// Picker that asks on stdin, resolving relative answers against `library`.
    pub fn interactive(library: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
            source: PickSource::Prompt,
        }
    }

    /// Picker whose selection was already made, e.g. a CLI argument.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let library = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            library,
            source: PickSource::Path(path),
        }
    }

    /// Turns one answer from the user into a selection.
    ///
    /// A blank answer is a cancellation.
    pub fn resolve_answer(&self, answer: &str) -> Result<Option<SelectedImage>> {
        let answer = answer.trim();
        if answer.is_empty() {
            info!("image selection cancelled");
            return Ok(None);
        }
        let path = Path::new(answer);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.library.join(path)
        };
        validate_image(&path).map(Some)
    }
}

impl MediaPicker for FsPicker {
    fn request_access(&self) -> bool {
        let granted = fs::read_dir(&self.library).is_ok();
        debug!("media access for {}: {}", self.library.display(), granted);
        granted
    }

    fn browse(&self) -> Result<Option<SelectedImage>> {
        match &self.source {
            PickSource::Path(path) => validate_image(path).map(Some),
            PickSource::Prompt => {
                print!("Image path in {} (leave empty to cancel): ", self.library.display());
                io::stdout()
                    .flush()
                    .map_err(|e| AppError::unexpected(format!("flush stdout: {e}")))?;
                let mut answer = String::new();
                io::stdin()
                    .lock()
                    .read_line(&mut answer)
                    .map_err(|e| AppError::unexpected(format!("read stdin: {e}")))?;
                self.resolve_answer(&answer)
            }
        }
    }
}

/// Accepts regular files whose extension names a decodable image format.
fn validate_image(path: &Path) -> Result<SelectedImage> {
    let is_file = match fs::metadata(path) {
        Ok(meta) => meta.is_file(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("selected file {} does not exist", path.display());
            return Err(AppError::ImageNotFound(path.to_path_buf()));
        }
        Err(_) => false,
    };
    let readable = ImageFormat::from_path(path)
        .map(|format| format.reading_enabled())
        .unwrap_or(false);

    if !is_file || !readable {
        warn!("rejected selection {}", path.display());
        return Err(AppError::UnsupportedImage(path.to_path_buf()));
    }

    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    info!("selected image {}", path.display());
    Ok(SelectedImage::new(path))
}
