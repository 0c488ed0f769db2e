use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::selection::BackgroundPicker;

/// Decorative overlay offered by the background picker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateEntry {
    pub label: String,
    pub path: String,
}

impl TemplateEntry {
    /// Templates named `4-*` are drawn for the 4-photo layout, all others for 3 photos.
    pub fn photo_count(&self) -> usize {
        let name = Path::new(&self.path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.path);
        if name.starts_with("4-") { 4 } else { 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// JSON document holding the captured images.
    pub session_file: PathBuf,
    /// Directory downloads are written to.
    pub output_dir: PathBuf,
    /// Base directory for relative template references.
    pub template_dir: Option<PathBuf>,
    pub templates: Vec<TemplateEntry>,
    /// Initial background: `#RRGGBB` or a template reference.
    pub background: Option<String>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        for entry in &self.templates {
            ensure!(
                !entry.path.trim().is_empty(),
                "template {:?} must have a path",
                entry.label
            );
        }
        self.background_picker()?;
        Ok(self)
    }

    /// Templates matching a strip of `photo_count` photos, in configured order.
    pub fn templates_for(&self, photo_count: usize) -> impl Iterator<Item = &TemplateEntry> {
        let wanted = if photo_count == 4 { 4 } else { 3 };
        self.templates
            .iter()
            .filter(move |entry| entry.photo_count() == wanted)
    }

    /// Picker seeded with the configured background.
    pub fn background_picker(&self) -> Result<BackgroundPicker> {
        let mut picker = BackgroundPicker::new();
        if let Some(background) = &self.background {
            picker
                .pick(background)
                .with_context(|| format!("invalid background {background:?}"))?;
        }
        Ok(picker)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            session_file: PathBuf::from("session.json"),
            output_dir: PathBuf::from("."),
            template_dir: None,
            templates: Vec::new(),
            background: None,
        }
    }
}
