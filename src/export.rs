use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use image::{ImageFormat, RgbaImage};
use tracing::{info, warn};

use crate::compositor::RenderedStrip;

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// `photostrip-<unix millis>.png`
pub fn download_file_name(now_millis: i64) -> String {
    format!("photostrip-{now_millis}.png")
}

/// Writes the preview into `dir` under a timestamped name.
///
/// Returns `None` without touching the disk when there is no preview yet.
pub fn save_preview(dir: &Path, preview: Option<&RenderedStrip>) -> Result<Option<PathBuf>> {
    let Some(strip) = preview else {
        warn!("no preview available to download");
        return Ok(None);
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join(download_file_name(Utc::now().timestamp_millis()));
    std::fs::write(&path, strip.png())
        .with_context(|| format!("failed to write photostrip to {}", path.display()))?;
    info!(path = %path.display(), bytes = strip.png().len(), "saved photostrip");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_timestamp() {
        assert_eq!(download_file_name(1_700_000_000_123), "photostrip-1700000000123.png");
    }

    #[test]
    fn nothing_is_written_without_preview() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        assert!(save_preview(&out, None).unwrap().is_none());
        assert!(!out.exists());
    }
}
