use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};
use rust_photostrip::compositor::Compositor;
use rust_photostrip::error::{LoadError, RenderError};
use rust_photostrip::processing::color::HexColor;
use rust_photostrip::processing::filters::FilterSettings;
use rust_photostrip::processing::layout::{CanvasConfig, Frame, frame_layout};
use rust_photostrip::selection::Background;
use rust_photostrip::session::CapturedImage;
use rust_photostrip::tasks::loader::{DecodingLoader, ImageLoader};

const RED: [u8; 4] = [220, 30, 30, 255];
const BLUE: [u8; 4] = [30, 30, 220, 255];
const GREEN: [u8; 4] = [20, 200, 60, 255];
const BLANK: [u8; 4] = [0, 0, 0, 0];

fn data_uri(img: &RgbaImage) -> String {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn photo(rgba: [u8; 4]) -> CapturedImage {
    CapturedImage {
        source: data_uri(&RgbaImage::from_pixel(64, 48, Rgba(rgba))),
        filters: FilterSettings::default(),
        mirrored: true,
        fit_camera: false,
    }
}

fn broken_photo() -> CapturedImage {
    CapturedImage {
        source: "data:image/jpeg;base64,/9j/AAAA".into(),
        ..photo(RED)
    }
}

fn center(frame: &Frame) -> (u32, u32) {
    (frame.x + frame.width / 2, frame.y + frame.height / 2)
}

fn assert_px(img: &RgbaImage, (x, y): (u32, u32), expected: [u8; 4]) {
    let actual = img.get_pixel(x, y).0;
    let close = actual
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| (*a as i16 - *e as i16).abs() <= 2);
    assert!(close, "pixel ({x},{y}) is {actual:?}, expected {expected:?}");
}

fn compositor() -> Compositor {
    Compositor::new(CanvasConfig::STRIP, DecodingLoader::default())
}

#[tokio::test]
async fn empty_session_renders_blank_canvas() {
    let strip = compositor().render(&[], None).await.unwrap();
    assert_eq!(strip.dimensions(), (295, 886));
    assert!(strip.image().pixels().all(|p| p.0 == BLANK));

    let decoded = image::load_from_memory(strip.png()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (295, 886));
}

#[tokio::test]
async fn empty_session_with_color_is_background_only() {
    let color = HexColor::parse("#102030").unwrap();
    let strip = compositor()
        .render(&[], Some(&Background::Color(color)))
        .await
        .unwrap();
    assert!(strip.image().pixels().all(|p| p.0 == [0x10, 0x20, 0x30, 255]));
}

#[tokio::test]
async fn photos_land_in_capture_order() {
    let images = [photo(RED), photo(BLUE), photo(GREEN), photo(RED)];
    let strip = compositor().render(&images, None).await.unwrap();
    let frames = frame_layout(4);
    assert_px(strip.image(), center(&frames[0]), RED);
    assert_px(strip.image(), center(&frames[1]), BLUE);
    assert_px(strip.image(), center(&frames[2]), GREEN);
    assert_px(strip.image(), center(&frames[3]), RED);
    // gutters stay clear
    assert_px(strip.image(), (5, 5), BLANK);
    assert_px(strip.image(), (147, 200), BLANK);
}

#[tokio::test]
async fn failed_photo_leaves_its_slot_empty() {
    let color = HexColor::parse("#ffffff").unwrap();
    let images = [photo(RED), broken_photo(), photo(BLUE)];
    let strip = compositor()
        .render(&images, Some(&Background::Color(color)))
        .await
        .unwrap();
    let frames = frame_layout(3);
    assert_px(strip.image(), center(&frames[0]), RED);
    assert_px(strip.image(), center(&frames[1]), [255, 255, 255, 255]);
    assert_px(strip.image(), center(&frames[2]), BLUE);
}

#[tokio::test]
async fn extra_photos_are_skipped() {
    let images = [
        photo(RED),
        photo(RED),
        photo(RED),
        photo(BLUE),
        photo(BLUE),
    ];
    let strip = compositor().render(&images, None).await.unwrap();
    for frame in frame_layout(3) {
        assert_px(strip.image(), center(frame), RED);
    }
    assert!(!strip.image().pixels().any(|p| p.0 == BLUE));
}

#[tokio::test]
async fn photo_filters_are_applied_per_image() {
    let mut grey = photo(RED);
    grey.filters.grayscale = 100.0;
    let images = [photo(RED), grey, photo(RED)];
    let strip = compositor().render(&images, None).await.unwrap();
    let frames = frame_layout(3);
    assert_px(strip.image(), center(&frames[0]), RED);
    let px = strip.image().get_pixel(center(&frames[1]).0, center(&frames[1]).1).0;
    assert!(px[0].abs_diff(px[1]) <= 1 && px[1].abs_diff(px[2]) <= 1, "{px:?}");
}

/// Wraps the decoding loader with fixed delays to force a completion order.
#[derive(Clone)]
struct DelayedLoader {
    inner: DecodingLoader,
    photo_delay: Duration,
    template_delay: Duration,
}

impl ImageLoader for DelayedLoader {
    async fn load_photo(&self, image: CapturedImage) -> Result<RgbaImage, LoadError> {
        tokio::time::sleep(self.photo_delay).await;
        self.inner.load_photo(image).await
    }

    async fn load_template(&self, reference: String) -> Result<RgbaImage, LoadError> {
        tokio::time::sleep(self.template_delay).await;
        self.inner.load_template(reference).await
    }
}

// Opaque green over the top half, transparent below.
fn half_template() -> String {
    let mut template = RgbaImage::new(295, 886);
    for (_, y, px) in template.enumerate_pixels_mut() {
        if y < 443 {
            *px = Rgba(GREEN);
        }
    }
    data_uri(&template)
}

async fn render_with_overlay(photo_delay: u64, template_delay: u64) -> RgbaImage {
    let loader = DelayedLoader {
        inner: DecodingLoader::default(),
        photo_delay: Duration::from_millis(photo_delay),
        template_delay: Duration::from_millis(template_delay),
    };
    let compositor = Compositor::new(CanvasConfig::STRIP, loader);
    let images = [photo(RED), photo(RED), photo(RED)];
    compositor
        .render(&images, Some(&Background::Template(half_template())))
        .await
        .unwrap()
        .image()
        .clone()
}

#[tokio::test]
async fn overlay_is_drawn_last_regardless_of_load_order() {
    let frames = frame_layout(3);
    for (photo_delay, template_delay) in [(40, 0), (0, 40)] {
        let img = render_with_overlay(photo_delay, template_delay).await;
        // frame 0 is under the opaque half, frame 2 under the transparent half
        assert_px(&img, center(&frames[0]), GREEN);
        assert_px(&img, center(&frames[2]), RED);
        assert_px(&img, (2, 2), GREEN);
        assert_px(&img, (2, 880), BLANK);
    }
}

#[tokio::test]
async fn template_is_scaled_to_canvas() {
    let dir = tempfile::tempdir().unwrap();
    RgbaImage::from_pixel(10, 30, Rgba(BLUE))
        .save(dir.path().join("3-tiny.png"))
        .unwrap();
    let compositor = Compositor::new(
        CanvasConfig::STRIP,
        DecodingLoader::new(Some(dir.path().to_path_buf())),
    );
    let strip = compositor
        .render(&[photo(RED)], Some(&Background::Template("/3-tiny.png".into())))
        .await
        .unwrap();
    assert_px(strip.image(), (0, 0), BLUE);
    assert_px(strip.image(), (294, 885), BLUE);
    assert_px(strip.image(), center(&frame_layout(3)[0]), BLUE);
}

#[tokio::test]
async fn broken_template_fails_the_render() {
    let dir = tempfile::tempdir().unwrap();
    let compositor = Compositor::new(
        CanvasConfig::STRIP,
        DecodingLoader::new(Some(dir.path().to_path_buf())),
    );
    let err = compositor
        .render(
            &[photo(RED)],
            Some(&Background::Template("missing.png".into())),
        )
        .await
        .unwrap_err();
    match err {
        RenderError::Template { reference, source } => {
            assert_eq!(reference, "missing.png");
            assert!(matches!(source, LoadError::Decode(_)));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn zero_sized_canvas_is_unavailable() {
    let compositor = Compositor::new(
        CanvasConfig {
            width: 0,
            height: 886,
        },
        DecodingLoader::default(),
    );
    assert!(matches!(
        compositor.render(&[], None).await,
        Err(RenderError::SurfaceUnavailable { width: 0, .. })
    ));
}

#[tokio::test]
async fn frames_follow_a_larger_canvas() {
    let canvas = CanvasConfig {
        width: 590,
        height: 1772,
    };
    let compositor = Compositor::new(canvas, DecodingLoader::default());
    let images = [photo(RED), photo(BLUE), photo(RED)];
    let strip = compositor.render(&images, None).await.unwrap();
    assert_eq!(strip.dimensions(), (590, 1772));

    let frames: Vec<Frame> = frame_layout(3)
        .iter()
        .map(|frame| frame.scaled(CanvasConfig::STRIP, canvas))
        .collect();
    assert_px(strip.image(), center(&frames[0]), RED);
    assert_px(strip.image(), center(&frames[1]), BLUE);
    assert_px(strip.image(), center(&frames[2]), RED);
    // right half of the bottom frame is painted too
    assert_px(strip.image(), (540, 1250), RED);
    assert_px(strip.image(), (10, 10), BLANK);
}

#[tokio::test]
async fn photo_that_cannot_be_drawn_is_skipped() {
    // on a 1x1 canvas every frame collapses to zero height
    let compositor = Compositor::new(
        CanvasConfig {
            width: 1,
            height: 1,
        },
        DecodingLoader::default(),
    );
    let strip = compositor
        .render(&[photo(RED), photo(BLUE)], None)
        .await
        .unwrap();
    assert_eq!(strip.dimensions(), (1, 1));
    assert_eq!(strip.image().get_pixel(0, 0).0, BLANK);
}
