use std::future::Future;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::{ImageReader, RgbaImage};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::processing::filters::FilterChain;
use crate::session::CapturedImage;

/// Largest side, in pixels, an off-screen surface may have.
pub const MAX_SURFACE_DIM: u32 = 16_384;

/// Produces rasters for the compositor. Implementations must be cheap to clone;
/// each load runs as its own task.
pub trait ImageLoader: Clone + Send + Sync + 'static {
    /// Decodes one captured photo and applies its filter snapshot.
    fn load_photo(
        &self,
        image: CapturedImage,
    ) -> impl Future<Output = Result<RgbaImage, LoadError>> + Send;

    /// Decodes an overlay template as-is.
    fn load_template(
        &self,
        reference: String,
    ) -> impl Future<Output = Result<RgbaImage, LoadError>> + Send;
}

/// Decodes `data:` URIs and files on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct DecodingLoader {
    template_root: Option<PathBuf>,
}

impl DecodingLoader {
    pub fn new(template_root: Option<PathBuf>) -> Self {
        Self { template_root }
    }
}

impl ImageLoader for DecodingLoader {
    async fn load_photo(&self, image: CapturedImage) -> Result<RgbaImage, LoadError> {
        tokio::task::spawn_blocking(move || load_filtered(&image))
            .await
            .map_err(|err| LoadError::Decode(format!("decode task failed: {err}")))?
    }

    async fn load_template(&self, reference: String) -> Result<RgbaImage, LoadError> {
        let root = self.template_root.clone();
        tokio::task::spawn_blocking(move || decode_source(&reference, root.as_deref()))
            .await
            .map_err(|err| LoadError::Decode(format!("decode task failed: {err}")))?
    }
}

/// Decodes one photo and draws it once through its filter chain onto a private
/// surface of the photo's natural size.
pub fn load_filtered(image: &CapturedImage) -> Result<RgbaImage, LoadError> {
    let decoded = decode_source(&image.source, None)?;
    let mut surface = acquire_surface(decoded.width(), decoded.height())?;
    surface.copy_from_slice(decoded.as_raw());
    let chain = FilterChain::from_settings(&image.filters);
    if !chain.is_identity() {
        debug!(filters = %chain, "applying filter chain");
        chain.apply(&mut surface);
    }
    Ok(surface)
}

/// Allocates a blank RGBA surface, refusing empty or oversized requests.
pub fn acquire_surface(width: u32, height: u32) -> Result<RgbaImage, LoadError> {
    if width == 0 || height == 0 || width > MAX_SURFACE_DIM || height > MAX_SURFACE_DIM {
        return Err(LoadError::SurfaceUnavailable { width, height });
    }
    Ok(RgbaImage::new(width, height))
}

/// Decodes a `data:` URI or an image file. Relative paths resolve against `base`.
pub fn decode_source(reference: &str, base: Option<&Path>) -> Result<RgbaImage, LoadError> {
    let bytes = read_source(reference, base)?;
    let img = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| LoadError::Decode(err.to_string()))?
        .decode()
        .map_err(|err| LoadError::Decode(err.to_string()))?;
    Ok(img.to_rgba8())
}

fn read_source(reference: &str, base: Option<&Path>) -> Result<Vec<u8>, LoadError> {
    if let Some(rest) = reference.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| LoadError::Decode("data URI without payload".into()))?;
        if !meta.ends_with(";base64") {
            return Err(LoadError::Decode(format!(
                "unsupported data URI encoding: {meta}"
            )));
        }
        return base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|err| LoadError::Decode(format!("invalid base64 payload: {err}")));
    }

    let path = resolve_path(reference, base);
    std::fs::read(&path)
        .map_err(|err| LoadError::Decode(format!("failed to read {}: {err}", path.display())))
}

// With a root configured, `/4-frame.png` is root-relative like a web asset path.
fn resolve_path(reference: &str, base: Option<&Path>) -> PathBuf {
    match base {
        Some(root) => root.join(reference.trim_start_matches('/')),
        None => PathBuf::from(reference),
    }
}

/// Loads every photo concurrently and waits for all of them to settle.
///
/// The result keeps capture order; a failed load stays in its slot as `Err`.
pub async fn load_all<L: ImageLoader>(
    loader: &L,
    images: &[CapturedImage],
) -> Vec<Result<RgbaImage, LoadError>> {
    let mut tasks = JoinSet::new();
    for (index, image) in images.iter().cloned().enumerate() {
        let loader = loader.clone();
        tasks.spawn(async move { (index, loader.load_photo(image).await) });
    }

    let mut settled: Vec<Option<Result<RgbaImage, LoadError>>> =
        std::iter::repeat_with(|| None).take(images.len()).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => settled[index] = Some(result),
            Err(err) => warn!("photo load task failed: {err}"),
        }
    }

    settled
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(LoadError::Decode("photo load task did not complete".into())))
        })
        .collect()
}
