use std::fmt;

use image::{Rgba, RgbaImage, imageops};
use serde::{Deserialize, Deserializer, Serialize};

/// Filter intensities captured together with a photo.
///
/// `grayscale`, `retro_filter` (sepia) and the neutral points of `brightness`
/// and `saturate` are percentages; `soft_filter` is a blur radius in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSettings {
    #[serde(deserialize_with = "slider_value")]
    pub grayscale: f32,
    #[serde(deserialize_with = "slider_value")]
    pub brightness: f32,
    #[serde(deserialize_with = "slider_value")]
    pub retro_filter: f32,
    #[serde(deserialize_with = "slider_value")]
    pub saturate: f32,
    #[serde(deserialize_with = "slider_value")]
    pub soft_filter: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            grayscale: 0.0,
            brightness: 100.0,
            retro_filter: 0.0,
            saturate: 100.0,
            soft_filter: 0.0,
        }
    }
}

// Slider widgets store their value as a one-element array.
fn slider_value<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Scalar(f32),
        Slider(Vec<f32>),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Scalar(value) => Ok(value),
        Raw::Slider(values) => values
            .first()
            .copied()
            .ok_or_else(|| serde::de::Error::invalid_length(0, &"a one-element slider array")),
    }
}

/// One stage of the filter chain with its numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterStage {
    /// Percentage, 0 leaves colours untouched, 100 is fully grey.
    Grayscale(f32),
    /// Percentage, 100 is neutral.
    Brightness(f32),
    /// Percentage, 0 leaves colours untouched, 100 is full sepia.
    Sepia(f32),
    /// Percentage, 100 is neutral.
    Saturate(f32),
    /// Gaussian standard deviation in pixels.
    Blur(f32),
}

impl FilterStage {
    fn is_identity(&self) -> bool {
        match *self {
            Self::Grayscale(p) | Self::Sepia(p) => p <= f32::EPSILON,
            Self::Brightness(p) | Self::Saturate(p) => (p - 100.0).abs() <= f32::EPSILON,
            Self::Blur(sigma) => sigma <= f32::EPSILON,
        }
    }

    fn apply(&self, image: &mut RgbaImage) {
        match *self {
            Self::Grayscale(p) => apply_matrix(image, &grayscale_matrix(p / 100.0)),
            Self::Brightness(p) => {
                let factor = (p / 100.0).max(0.0);
                for pixel in image.pixels_mut() {
                    for channel in &mut pixel.0[..3] {
                        *channel = to_channel(*channel as f32 * factor);
                    }
                }
            }
            Self::Sepia(p) => apply_matrix(image, &sepia_matrix(p / 100.0)),
            Self::Saturate(p) => apply_matrix(image, &saturate_matrix(p / 100.0)),
            Self::Blur(sigma) => *image = imageops::blur(&*image, sigma),
        }
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grayscale(p) => write!(f, "grayscale({p}%)"),
            Self::Brightness(p) => write!(f, "brightness({p}%)"),
            Self::Sepia(p) => write!(f, "sepia({p}%)"),
            Self::Saturate(p) => write!(f, "saturate({p}%)"),
            Self::Blur(px) => write!(f, "blur({px}px)"),
        }
    }
}

/// Ordered filter stages: grayscale, brightness, sepia, saturate, blur.
///
/// The order is fixed; every stage works on the clamped output of the one
/// before it, so reordering changes the result.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    stages: [FilterStage; 5],
}

impl FilterChain {
    pub fn from_settings(settings: &FilterSettings) -> Self {
        Self {
            stages: [
                FilterStage::Grayscale(settings.grayscale),
                FilterStage::Brightness(settings.brightness),
                FilterStage::Sepia(settings.retro_filter),
                FilterStage::Saturate(settings.saturate),
                FilterStage::Blur(settings.soft_filter),
            ],
        }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_identity(&self) -> bool {
        self.stages.iter().all(FilterStage::is_identity)
    }

    pub fn apply(&self, image: &mut RgbaImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        for stage in self.stages.iter().filter(|stage| !stage.is_identity()) {
            stage.apply(image);
        }
    }
}

impl fmt::Display for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, stage) in self.stages.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

type ColorMatrix = [[f32; 3]; 3];

fn grayscale_matrix(amount: f32) -> ColorMatrix {
    let inv = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.2126 + 0.7874 * inv, 0.7152 - 0.7152 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 + 0.2848 * inv, 0.0722 - 0.0722 * inv],
        [0.2126 - 0.2126 * inv, 0.7152 - 0.7152 * inv, 0.0722 + 0.9278 * inv],
    ]
}

fn sepia_matrix(amount: f32) -> ColorMatrix {
    let inv = 1.0 - amount.clamp(0.0, 1.0);
    [
        [0.393 + 0.607 * inv, 0.769 - 0.769 * inv, 0.189 - 0.189 * inv],
        [0.349 - 0.349 * inv, 0.686 + 0.314 * inv, 0.168 - 0.168 * inv],
        [0.272 - 0.272 * inv, 0.534 - 0.534 * inv, 0.131 + 0.869 * inv],
    ]
}

fn saturate_matrix(amount: f32) -> ColorMatrix {
    let s = amount.max(0.0);
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn apply_matrix(image: &mut RgbaImage, matrix: &ColorMatrix) {
    for pixel in image.pixels_mut() {
        *pixel = transform_pixel(pixel, matrix);
    }
}

fn transform_pixel(pixel: &Rgba<u8>, m: &ColorMatrix) -> Rgba<u8> {
    let r = pixel[0] as f32;
    let g = pixel[1] as f32;
    let b = pixel[2] as f32;
    Rgba([
        to_channel(m[0][0] * r + m[0][1] * g + m[0][2] * b),
        to_channel(m[1][0] * r + m[1][1] * g + m[1][2] * b),
        to_channel(m[2][0] * r + m[2][1] * g + m[2][2] * b),
        pixel[3],
    ])
}

fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 255.0) + 0.5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba(rgba))
    }

    #[test]
    fn chain_order_is_fixed() {
        let settings = FilterSettings {
            grayscale: 10.0,
            brightness: 120.0,
            retro_filter: 30.0,
            saturate: 150.0,
            soft_filter: 1.5,
        };
        let chain = FilterChain::from_settings(&settings);
        assert_eq!(
            chain.stages(),
            &[
                FilterStage::Grayscale(10.0),
                FilterStage::Brightness(120.0),
                FilterStage::Sepia(30.0),
                FilterStage::Saturate(150.0),
                FilterStage::Blur(1.5),
            ]
        );
        assert_eq!(
            chain.to_string(),
            "grayscale(10%) brightness(120%) sepia(30%) saturate(150%) blur(1.5px)"
        );
    }

    #[test]
    fn default_settings_leave_pixels_untouched() {
        let chain = FilterChain::from_settings(&FilterSettings::default());
        assert!(chain.is_identity());
        let mut img = solid([12, 140, 250, 200]);
        chain.apply(&mut img);
        assert_eq!(img.get_pixel(1, 1).0, [12, 140, 250, 200]);
    }

    #[test]
    fn full_grayscale_equalises_channels() {
        let settings = FilterSettings {
            grayscale: 100.0,
            ..FilterSettings::default()
        };
        let mut img = solid([200, 40, 90, 255]);
        FilterChain::from_settings(&settings).apply(&mut img);
        let px = img.get_pixel(0, 0).0;
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn brightness_scales_and_clamps() {
        let settings = FilterSettings {
            brightness: 200.0,
            ..FilterSettings::default()
        };
        let mut img = solid([100, 200, 10, 255]);
        FilterChain::from_settings(&settings).apply(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [200, 255, 20, 255]);
    }

    #[test]
    fn grey_pixels_survive_saturation() {
        let settings = FilterSettings {
            saturate: 200.0,
            ..FilterSettings::default()
        };
        let mut img = solid([128, 128, 128, 255]);
        FilterChain::from_settings(&settings).apply(&mut img);
        assert_eq!(img.get_pixel(2, 2).0, [128, 128, 128, 255]);
    }

    #[test]
    fn stage_order_changes_output() {
        // brightness before sepia clamps differently than sepia before brightness
        let mut ordered = solid([250, 120, 30, 255]);
        FilterStage::Brightness(180.0).apply(&mut ordered);
        FilterStage::Sepia(100.0).apply(&mut ordered);

        let mut swapped = solid([250, 120, 30, 255]);
        FilterStage::Sepia(100.0).apply(&mut swapped);
        FilterStage::Brightness(180.0).apply(&mut swapped);

        assert_ne!(ordered.get_pixel(0, 0), swapped.get_pixel(0, 0));
    }

    #[test]
    fn accepts_slider_arrays_and_scalars() {
        let json = r#"{"grayscale":[25],"brightness":110,"retroFilter":[0],"saturate":[100],"softFilter":[0.5]}"#;
        let settings: FilterSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.grayscale, 25.0);
        assert_eq!(settings.brightness, 110.0);
        assert_eq!(settings.soft_filter, 0.5);
    }

    #[test]
    fn empty_slider_array_is_rejected() {
        let json = r#"{"grayscale":[]}"#;
        assert!(serde_json::from_str::<FilterSettings>(json).is_err());
    }
}
