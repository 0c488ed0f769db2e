use std::sync::Arc;

use crate::compositor::RenderedStrip;
use crate::selection::Background;
use crate::session::CapturedImage;

/// Inputs changed; render them. Newer requests supersede older ones.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub images: Arc<[CapturedImage]>,
    pub background: Option<Background>,
}

#[derive(Debug, Clone)]
pub enum PreviewEvent {
    /// A current render finished and replaced the preview.
    Updated {
        generation: u64,
        strip: Arc<RenderedStrip>,
    },
    /// A current render failed; the previous preview is still shown.
    Failed { generation: u64, message: String },
}
