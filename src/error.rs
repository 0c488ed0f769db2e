use thiserror::Error;

/// Failure to turn one encoded source into a filtered raster.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be read or decoded (corrupt or unsupported data).
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// No drawing surface of the requested size could be created.
    #[error("drawing surface unavailable ({width}x{height})")]
    SurfaceUnavailable { width: u32, height: u32 },
}

/// Failure of a whole photostrip render. The previous preview stays in place.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The output canvas could not be created.
    #[error("output canvas unavailable ({width}x{height})")]
    SurfaceUnavailable { width: u32, height: u32 },

    /// The overlay template is integral to the output, so its failure aborts the render.
    #[error("failed to load template {reference}")]
    Template {
        reference: String,
        #[source]
        source: LoadError,
    },

    /// Scaling a photo into its frame failed.
    #[error("failed to draw into frame: {0}")]
    Draw(String),

    /// Encoding the finished canvas failed.
    #[error("failed to encode photostrip: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rejected background selection; selection state is left untouched.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("invalid color format {0:?}, expected #RRGGBB")]
    InvalidColorFormat(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The session already holds the configured number of photos.
    #[error("capture session is full ({target} photos)")]
    Full { target: usize },
}
