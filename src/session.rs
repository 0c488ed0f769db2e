use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::SessionError;
use crate::processing::filters::FilterSettings;

/// Key under which the captured-image list is stored.
pub const STORAGE_KEY: &str = "images";

/// One captured photo together with the settings that were live when it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedImage {
    /// Encoded image, normally a `data:` URI.
    #[serde(rename = "src", alias = "sourceData")]
    pub source: String,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub mirrored: bool,
    #[serde(default)]
    pub fit_camera: bool,
}

/// Live camera settings, edited freely while capturing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub filters: FilterSettings,
    pub mirrored: bool,
    pub fit_camera: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            filters: FilterSettings::default(),
            mirrored: true,
            fit_camera: false,
        }
    }
}

/// Photos captured so far and the settings the next capture will snapshot.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    settings: CameraSettings,
    target: usize,
    images: Vec<CapturedImage>,
}

impl CaptureSession {
    pub fn new(target: usize) -> Self {
        Self {
            settings: CameraSettings::default(),
            target,
            images: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Only future captures see edits made through this handle.
    pub fn settings_mut(&mut self) -> &mut CameraSettings {
        &mut self.settings
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn is_complete(&self) -> bool {
        self.images.len() >= self.target
    }

    /// Stores `source` with a copy of the current settings and returns its frame index.
    pub fn capture(&mut self, source: impl Into<String>) -> Result<usize, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Full {
                target: self.target,
            });
        }
        let CameraSettings {
            filters,
            mirrored,
            fit_camera,
        } = self.settings;
        self.images.push(CapturedImage {
            source: source.into(),
            filters,
            mirrored,
            fit_camera,
        });
        let index = self.images.len() - 1;
        debug!(index, target = self.target, "captured photo");
        Ok(index)
    }

    /// Drops every capture; live settings are kept.
    pub fn reset(&mut self) {
        self.images.clear();
    }

    pub fn into_images(self) -> Vec<CapturedImage> {
        self.images
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Session-scoped key-value document holding the captured-image list.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored list. A missing, malformed or non-list document reads as empty;
    /// individual entries that fail to parse are skipped.
    pub fn load(&self) -> Vec<CapturedImage> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %self.path.display(), "no stored session: {err}");
                return Vec::new();
            }
        };
        let document: Map<String, Value> = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(err) => {
                error!(path = %self.path.display(), "failed to parse stored session: {err}");
                return Vec::new();
            }
        };
        let Some(entries) = document.get(STORAGE_KEY).and_then(Value::as_array) else {
            return Vec::new();
        };
        let images: Vec<CapturedImage> = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                CapturedImage::deserialize(entry)
                    .inspect_err(|err| warn!(index, "skipping stored image: {err}"))
                    .ok()
            })
            .collect();
        info!(count = images.len(), stored = entries.len(), "loaded stored session");
        images
    }

    /// Replaces the stored list, keeping any other keys in the document.
    pub fn save(&self, images: &[CapturedImage]) -> Result<()> {
        let mut document: Map<String, Value> = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        document.insert(
            STORAGE_KEY.to_string(),
            serde_json::to_value(images).context("failed to serialize captured images")?,
        );
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("failed to write session to {}", self.path.display()))?;
        Ok(())
    }
}
