/// Source rectangle, in source-image pixels, that fills a frame without letterboxing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverCrop {
    pub src_x: f64,
    pub src_y: f64,
    pub src_w: f64,
    pub src_h: f64,
}

/// Centered crop emulating `object-fit: cover`.
///
/// Scaling the returned rectangle to `frame_w` x `frame_h` preserves the source
/// aspect ratio. A relatively wider image loses its sides, a relatively taller
/// one loses top and bottom. All dimensions must be positive.
pub fn compute_cover_crop(img_w: u32, img_h: u32, frame_w: u32, frame_h: u32) -> CoverCrop {
    let iw = img_w as f64;
    let ih = img_h as f64;
    let frame_ratio = frame_w as f64 / frame_h as f64;

    if iw / ih > frame_ratio {
        let src_w = ih * frame_ratio;
        CoverCrop {
            src_x: (iw - src_w) / 2.0,
            src_y: 0.0,
            src_w,
            src_h: ih,
        }
    } else {
        let src_h = iw / frame_ratio;
        CoverCrop {
            src_x: 0.0,
            src_y: (ih - src_h) / 2.0,
            src_w: iw,
            src_h,
        }
    }
}
