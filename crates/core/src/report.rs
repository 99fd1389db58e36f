//! Report export: HTML rendering, document conversion and sharing.
//!
//! The document and share steps are platform facilities, modelled by the
//! [`DocumentRenderer`] and [`Sharer`] traits. Only a missing prediction or
//! a failure to produce the document is fatal; a picture that cannot be
//! embedded and an unavailable share facility come back as
//! [`ExportWarning`]s on a successful [`ExportOutcome`].

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use arboard::Clipboard;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{AppError, ExportWarning, Result};
use crate::image_processing::ImageProcessor;
use crate::model::{PredictionResult, SelectedImage};
use crate::render::format_confidence;

pub const REPORT_TITLE: &str = "Plant Disease Detection Report";

/// Converts report HTML into a document on local storage.
pub trait DocumentRenderer {
    fn render_document(&self, html: &str, stem: &str) -> Result<PathBuf>;
}

/// Hands a finished document to the platform's share facility.
pub trait Sharer {
    /// `Err(ExportWarning::SharingUnavailable)` when the device cannot share.
    fn share(&self, document: &Path) -> std::result::Result<(), ExportWarning>;
}

/// Writes print-ready HTML documents into a directory.
///
/// Existing documents are never overwritten: when `{stem}.html` is taken
/// the next free `{stem}-{n}.html` is used.
pub struct HtmlFileRenderer {
    dir: PathBuf,
}

impl HtmlFileRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentRenderer for HtmlFileRenderer {
    fn render_document(&self, html: &str, stem: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::unexpected(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;
        for n in 0u32.. {
            let name = match n {
                0 => format!("{stem}.html"),
                n => format!("{stem}-{n}.html"),
            };
            let path = self.dir.join(name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(AppError::unexpected(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )));
                }
            };
            file.write_all(html.as_bytes()).map_err(|e| {
                AppError::unexpected(format!("Failed to write {}: {}", path.display(), e))
            })?;
            debug!("wrote report document {}", path.display());
            return Ok(path);
        }
        Err(AppError::unexpected(format!(
            "No free report name for {stem} in {}",
            self.dir.display()
        )))
    }
}

/// Shares a document by putting its path on the system clipboard.
pub struct ClipboardSharer;

impl Sharer for ClipboardSharer {
    fn share(&self, document: &Path) -> std::result::Result<(), ExportWarning> {
        let mut clipboard = Clipboard::new().map_err(|e| {
            warn!("clipboard unavailable: {}", e);
            ExportWarning::SharingUnavailable
        })?;
        clipboard
            .set_text(document.display().to_string())
            .map_err(|e| {
                warn!("could not copy report path: {}", e);
                ExportWarning::SharingUnavailable
            })
    }
}

/// For devices with no share facility at all.
pub struct NoSharing;

impl Sharer for NoSharing {
    fn share(&self, _document: &Path) -> std::result::Result<(), ExportWarning> {
        Err(ExportWarning::SharingUnavailable)
    }
}

/// What an export produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub document: PathBuf,
    pub shared: bool,
    pub warnings: Vec<ExportWarning>,
}

pub struct ReportExporter<R, S> {
    renderer: R,
    sharer: S,
}

impl<R: DocumentRenderer, S: Sharer> ReportExporter<R, S> {
    pub fn new(renderer: R, sharer: S) -> Self {
        Self { renderer, sharer }
    }

    /// Renders and shares a report for `prediction`.
    ///
    /// # Errors
    ///
    /// [`AppError::NoReport`] when there is no prediction, checked before
    /// any file or share operation; [`AppError::Unexpected`] when the
    /// document cannot be written.
    pub fn export(
        &self,
        prediction: Option<&PredictionResult>,
        image: Option<&SelectedImage>,
    ) -> Result<ExportOutcome> {
        let prediction = prediction.ok_or(AppError::NoReport)?;
        let mut warnings = Vec::new();

        let embedded = image.and_then(|image| match ImageProcessor::to_data_uri(image) {
            Ok(uri) => Some(uri),
            Err(e) => {
                warn!("exporting without image {}: {:?}", image.path().display(), e);
                warnings.push(ExportWarning::ImageEmbedFailed(image.path().display().to_string()));
                None
            }
        });

        let generated_at = Utc::now();
        let html = render_html(prediction, embedded.as_deref(), generated_at);
        let stem = format!("plantguard-report-{}", generated_at.format("%Y%m%d-%H%M%S%3f"));
        let document = self.renderer.render_document(&html, &stem)?;

        let shared = match self.sharer.share(&document) {
            Ok(()) => true,
            Err(warning) => {
                warnings.push(warning);
                false
            }
        };

        info!("exported report {} (shared: {})", document.display(), shared);
        Ok(ExportOutcome {
            document,
            shared,
            warnings,
        })
    }
}

/// Fixed report template.
pub fn render_html(
    prediction: &PredictionResult,
    image_uri: Option<&str>,
    generated_at: DateTime<Utc>,
) -> String {
    let image = image_uri
        .map(|uri| format!("    <img src=\"{}\" alt=\"Analyzed plant\" />\n", escape(uri)))
        .unwrap_or_default();
    let treatments: String = prediction
        .treatments
        .iter()
        .map(|t| format!("      <li>{}</li>\n", escape(t)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8" />
    <title>{title}</title>
    <style>
      body {{ font-family: Helvetica, Arial, sans-serif; margin: 32px; color: #1b3a1f; }}
      h1 {{ color: #2e7d32; text-align: center; }}
      img {{ display: block; max-width: 300px; margin: 16px auto; border-radius: 10px; }}
      .label {{ font-weight: bold; }}
      .footer {{ margin-top: 32px; font-size: 12px; color: #777; }}
    </style>
  </head>
  <body>
    <h1>{title}</h1>
{image}    <p><span class="label">Predicted Disease:</span> {class_name}</p>
    <p><span class="label">Confidence:</span> {confidence}</p>
    <h2>Disease Information</h2>
    <p>{info}</p>
    <h2>Treatments</h2>
    <ul>
{treatments}    </ul>
    <p class="footer">Generated {generated}</p>
  </body>
</html>
"#,
        title = REPORT_TITLE,
        image = image,
        class_name = escape(&prediction.class_name),
        confidence = format_confidence(prediction.confidence),
        info = escape(&prediction.disease_info),
        treatments = treatments,
        generated = generated_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn prediction() -> PredictionResult {
        PredictionResult {
            class_name: "Tomato___Leaf_Mold".to_string(),
            confidence: 0.5,
            disease_info: "Caused by Passalora fulva <humid conditions>.".to_string(),
            treatments: vec!["Reduce humidity".to_string(), "Apply chlorothalonil".to_string()],
        }
    }

    #[derive(Default)]
    struct Recording {
        documents: RefCell<Vec<String>>,
        shares: RefCell<Vec<PathBuf>>,
        can_share: bool,
    }

    impl DocumentRenderer for &Recording {
        fn render_document(&self, html: &str, stem: &str) -> Result<PathBuf> {
            self.documents.borrow_mut().push(html.to_string());
            Ok(PathBuf::from(format!("/reports/{stem}.html")))
        }
    }

    impl Sharer for &Recording {
        fn share(&self, document: &Path) -> std::result::Result<(), ExportWarning> {
            if !self.can_share {
                return Err(ExportWarning::SharingUnavailable);
            }
            self.shares.borrow_mut().push(document.to_path_buf());
            Ok(())
        }
    }

    fn scratch_image(name: &str, bytes: &[u8]) -> SelectedImage {
        let dir = std::env::temp_dir().join("plantguard_report_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        SelectedImage::new(path)
    }

    #[test]
    fn no_prediction_does_no_work() {
        let rec = Recording {
            can_share: true,
            ..Default::default()
        };
        let exporter = ReportExporter::new(&rec, &rec);

        let err = exporter.export(None, Some(&SelectedImage::new("/tmp/leaf.jpg"))).unwrap_err();
        assert_eq!(err, AppError::NoReport);
        assert!(rec.documents.borrow().is_empty());
        assert!(rec.shares.borrow().is_empty());
    }

    #[test]
    fn report_embeds_image_and_shares() {
        let rec = Recording {
            can_share: true,
            ..Default::default()
        };
        let exporter = ReportExporter::new(&rec, &rec);
        let image = scratch_image("mold.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR");

        let outcome = exporter.export(Some(&prediction()), Some(&image)).unwrap();
        assert!(outcome.shared);
        assert!(outcome.warnings.is_empty());
        assert_eq!(rec.shares.borrow().as_slice(), &[outcome.document.clone()]);

        let html = &rec.documents.borrow()[0];
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("50.00%"));
        assert!(html.contains("&lt;humid conditions&gt;"));
        let first = html.find("<li>Reduce humidity</li>").unwrap();
        let second = html.find("<li>Apply chlorothalonil</li>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn unreadable_image_is_a_warning_not_a_failure() {
        let rec = Recording {
            can_share: true,
            ..Default::default()
        };
        let exporter = ReportExporter::new(&rec, &rec);
        let image = scratch_image("corrupt.jpg", b"not an image at all");

        let outcome = exporter.export(Some(&prediction()), Some(&image)).unwrap();
        assert!(matches!(outcome.warnings.as_slice(), [ExportWarning::ImageEmbedFailed(_)]));
        assert!(!rec.documents.borrow()[0].contains("<img"));
        assert!(outcome.shared);
    }

    #[test]
    fn missing_share_facility_keeps_document() {
        let rec = Recording::default();
        let exporter = ReportExporter::new(&rec, &rec);

        let outcome = exporter.export(Some(&prediction()), None).unwrap();
        assert!(!outcome.shared);
        assert_eq!(outcome.warnings, vec![ExportWarning::SharingUnavailable]);
        assert_eq!(rec.documents.borrow().len(), 1);
    }

    #[test]
    fn html_file_renderer_writes_document() {
        let dir = std::env::temp_dir().join("plantguard_report_test").join("out");
        let exporter = ReportExporter::new(HtmlFileRenderer::new(&dir), NoSharing);

        let outcome = exporter.export(Some(&prediction()), None).unwrap();
        assert!(outcome.document.starts_with(&dir));
        let html = fs::read_to_string(&outcome.document).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(REPORT_TITLE));
    }

    #[test]
    fn back_to_back_exports_keep_both_documents() {
        let dir = std::env::temp_dir().join("plantguard_report_test").join("twice");
        let _ = fs::remove_dir_all(&dir);
        let exporter = ReportExporter::new(HtmlFileRenderer::new(&dir), NoSharing);

        let mut blight = prediction();
        blight.class_name = "Potato___Late_blight".to_string();
        let first = exporter.export(Some(&blight), None).unwrap();
        let second = exporter.export(Some(&prediction()), None).unwrap();

        assert_ne!(first.document, second.document);
        assert!(fs::read_to_string(&first.document).unwrap().contains("Potato___Late_blight"));
        assert!(fs::read_to_string(&second.document).unwrap().contains("Tomato___Leaf_Mold"));
    }

    #[test]
    fn taken_stem_gets_a_numbered_name() {
        let dir = std::env::temp_dir().join("plantguard_report_test").join("taken");
        let _ = fs::remove_dir_all(&dir);
        let renderer = HtmlFileRenderer::new(&dir);

        let first = renderer.render_document("<p>one</p>", "report").unwrap();
        let second = renderer.render_document("<p>two</p>", "report").unwrap();

        assert_eq!(first, dir.join("report.html"));
        assert_eq!(second, dir.join("report-1.html"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "<p>one</p>");
    }
}
