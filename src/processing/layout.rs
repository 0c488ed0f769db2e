/// Placement rectangle on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.width && py < self.y + self.height
    }

    /// Maps a frame drawn for `from` onto a canvas of size `to`, rounding to the nearest pixel.
    pub fn scaled(&self, from: CanvasConfig, to: CanvasConfig) -> Self {
        let sx = |v: u32| scale_axis(v, from.width, to.width);
        let sy = |v: u32| scale_axis(v, from.height, to.height);
        Self {
            x: sx(self.x),
            y: sy(self.y),
            width: sx(self.width),
            height: sy(self.height),
        }
    }
}

fn scale_axis(value: u32, from: u32, to: u32) -> u32 {
    if from == 0 || from == to {
        return value;
    }
    let (value, from, to) = (u64::from(value), u64::from(from), u64::from(to));
    ((value * to + from / 2) / from) as u32
}

/// Output canvas dimensions. The frame tables are drawn for the 295x886 strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl CanvasConfig {
    pub const STRIP: Self = Self {
        width: 295,
        height: 886,
    };
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::STRIP
    }
}

const THREE_PHOTO_FRAMES: [Frame; 3] = [
    Frame::new(20, 40, 255, 192),
    Frame::new(20, 286, 255, 192),
    Frame::new(21, 529, 255, 192),
];

const FOUR_PHOTO_FRAMES: [Frame; 4] = [
    Frame::new(20, 19, 255, 172),
    Frame::new(20, 211, 255, 172),
    Frame::new(20, 403, 255, 172),
    Frame::new(21, 595, 255, 172),
];

/// Frames for a strip holding `count` photos, in capture order.
///
/// Only 3 and 4 have dedicated layouts; every other count uses the 3-photo layout.
pub fn frame_layout(count: usize) -> &'static [Frame] {
    match count {
        4 => &FOUR_PHOTO_FRAMES,
        _ => &THREE_PHOTO_FRAMES,
    }
}
