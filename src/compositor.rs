use image::{RgbaImage, imageops};
use tracing::{debug, info, warn};

use crate::error::{LoadError, RenderError};
use crate::export::encode_png;
use crate::processing::geometry::compute_cover_crop;
use crate::processing::layout::{CanvasConfig, Frame, frame_layout};
use crate::processing::resize::resize_rgba;
use crate::selection::Background;
use crate::session::CapturedImage;
use crate::tasks::loader::{DecodingLoader, ImageLoader, acquire_surface, load_all};

/// Finished photostrip: the raw canvas plus its PNG encoding.
#[derive(Debug, Clone)]
pub struct RenderedStrip {
    image: RgbaImage,
    png: Vec<u8>,
}

impl RenderedStrip {
    pub(crate) fn from_parts(image: RgbaImage, png: Vec<u8>) -> Self {
        Self { image, png }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Owns the output canvas for the duration of each render.
#[derive(Debug, Clone)]
pub struct Compositor<L = DecodingLoader> {
    canvas: CanvasConfig,
    loader: L,
}

impl<L: ImageLoader> Compositor<L> {
    pub fn new(canvas: CanvasConfig, loader: L) -> Self {
        Self { canvas, loader }
    }

    pub fn canvas(&self) -> CanvasConfig {
        self.canvas
    }

    /// Renders `images` into their frames over an optional colour, under an optional template.
    ///
    /// Every photo load settles before any photo is drawn. Photos that fail to load
    /// or draw leave their frame empty; a template that fails to load fails the render.
    /// Frame rectangles are scaled from the 295x886 strip to this compositor's canvas.
    pub async fn render(
        &self,
        images: &[CapturedImage],
        background: Option<&Background>,
    ) -> Result<RenderedStrip, RenderError> {
        let CanvasConfig { width, height } = self.canvas;
        let mut canvas = acquire_surface(width, height)
            .map_err(|_| RenderError::SurfaceUnavailable { width, height })?;

        if let Some(Background::Color(color)) = background {
            let fill = color.to_rgba();
            for pixel in canvas.pixels_mut() {
                *pixel = fill;
            }
        }

        if images.is_empty() {
            info!("empty capture session; rendering background only");
        }
        let frames: Vec<Frame> = frame_layout(images.len())
            .iter()
            .map(|frame| frame.scaled(CanvasConfig::STRIP, self.canvas))
            .collect();

        let template_ref = match background {
            Some(Background::Template(reference)) => Some(reference.clone()),
            _ => None,
        };
        let template_load = async {
            match &template_ref {
                Some(reference) => Some(self.loader.load_template(reference.clone()).await),
                None => None,
            }
        };
        let (photos, template) = tokio::join!(load_all(&self.loader, images), template_load);

        let mut placed = 0usize;
        for (index, loaded) in photos.into_iter().enumerate() {
            let photo = match loaded {
                Ok(photo) => photo,
                Err(err) => {
                    warn!(index, "skipping photo: {err}");
                    continue;
                }
            };
            let Some(frame) = frames.get(index) else {
                debug!(index, frames = frames.len(), "no frame left for photo");
                continue;
            };
            if let Err(err) = draw_cover(&mut canvas, &photo, frame) {
                warn!(index, "skipping photo: {err}");
                continue;
            }
            placed += 1;
        }

        if let (Some(reference), Some(template)) = (template_ref, template) {
            let template =
                template.map_err(|source: LoadError| RenderError::Template { reference, source })?;
            let scaled = resize_rgba(&template, width, height, None)?;
            imageops::overlay(&mut canvas, &scaled, 0, 0);
        }

        debug!(placed, total = images.len(), "photostrip composed");
        let png = encode_png(&canvas)?;
        Ok(RenderedStrip::from_parts(canvas, png))
    }
}

fn draw_cover(canvas: &mut RgbaImage, photo: &RgbaImage, frame: &Frame) -> Result<(), RenderError> {
    let crop = compute_cover_crop(photo.width(), photo.height(), frame.width, frame.height);
    let scaled = resize_rgba(photo, frame.width, frame.height, Some(crop))?;
    imageops::overlay(canvas, &scaled, frame.x as i64, frame.y as i64);
    Ok(())
}
