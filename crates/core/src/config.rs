use std::env;
use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::settings::Settings;
use directories::{ProjectDirs, UserDirs};
use dotenvy::dotenv;
use url::Url;

/// Endpoint used when neither the environment nor the settings name one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8009/predict";

#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: Url,
    pub report_dir: PathBuf,
    pub media_dir: PathBuf,
    pub firebase: Option<FirebaseConfig>,
}

#[derive(Clone, Debug)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_url: String,
    pub firestore_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok(), &Settings::load())
    }

    /// Builds a config from an arbitrary variable source, with persisted
    /// settings taking precedence over it.
    pub fn from_lookup<F>(lookup: F, settings: &Settings) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_endpoint = settings
            .endpoint
            .clone()
            .or_else(|| get("PLANTGUARD_ENDPOINT"))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = parse_endpoint(&raw_endpoint)?;

        let report_dir = settings
            .report_dir
            .clone()
            .or_else(|| get("PLANTGUARD_REPORT_DIR").map(PathBuf::from))
            .unwrap_or_else(default_report_dir);

        let media_dir = get("PLANTGUARD_MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_media_dir);

        let firebase = match (get("FIREBASE_API_KEY"), get("FIREBASE_PROJECT_ID")) {
            (Some(api_key), Some(project_id)) => Some(FirebaseConfig {
                api_key,
                project_id,
                auth_url: get("FIREBASE_AUTH_URL")
                    .unwrap_or_else(|| "https://identitytoolkit.googleapis.com/v1".to_string()),
                firestore_url: get("FIREBASE_FIRESTORE_URL")
                    .unwrap_or_else(|| "https://firestore.googleapis.com/v1".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            endpoint,
            report_dir,
            media_dir,
            firebase,
        })
    }

    /// Replaces the endpoint, validating the new value.
    pub fn set_endpoint(&mut self, raw: &str) -> Result<()> {
        self.endpoint = parse_endpoint(raw)?;
        Ok(())
    }

    /// Auth settings, or a configuration error naming what is missing.
    pub fn firebase(&self) -> Result<&FirebaseConfig> {
        self.firebase.as_ref().ok_or_else(|| {
            AppError::config("FIREBASE_API_KEY and FIREBASE_PROJECT_ID must be set in environment or .env file")
        })
    }
}

pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::config(format!("Invalid endpoint URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::config(format!("Unsupported endpoint scheme: {other}"))),
    }
}

fn default_report_dir() -> PathBuf {
    ProjectDirs::from("", "plantguard", "plantguard")
        .map(|dirs| dirs.data_dir().join("reports"))
        .unwrap_or_else(|| env::temp_dir().join("plantguard-reports"))
}

fn default_media_dir() -> PathBuf {
    UserDirs::new()
        .map(|dirs| {
            dirs.picture_dir()
                .map(PathBuf::from)
                .unwrap_or_else(|| dirs.home_dir().to_path_buf())
        })
        .unwrap_or_else(env::temp_dir)
}
