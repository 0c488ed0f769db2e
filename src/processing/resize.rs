use fast_image_resize as fir;
use image::RgbaImage;

use crate::error::RenderError;
use crate::processing::geometry::CoverCrop;

/// Scales `source` (or the `crop` region of it) to exactly `target_w` x `target_h`.
pub fn resize_rgba(
    source: &RgbaImage,
    target_w: u32,
    target_h: u32,
    crop: Option<CoverCrop>,
) -> Result<RgbaImage, RenderError> {
    if target_w == 0 || target_h == 0 {
        return Err(RenderError::Draw("resize dimensions must be positive".into()));
    }
    if crop.is_none() && source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| RenderError::Draw(format!("invalid source view: {err}")))?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let mut options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    if let Some(crop) = crop {
        options = options.crop(crop.src_x, crop.src_y, crop.src_w, crop.src_h);
    }
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| RenderError::Draw(format!("resize failed: {err}")))?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| RenderError::Draw("failed to construct resized RGBA image".into()))
}
