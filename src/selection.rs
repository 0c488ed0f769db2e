use tracing::warn;

use crate::error::SelectionError;
use crate::processing::color::HexColor;

pub const INVALID_COLOR_MESSAGE: &str = "Invalid color format. Please use #RRGGBB format.";

/// What sits behind or on top of the photos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// Flood-filled before any photo is drawn.
    Color(HexColor),
    /// Image reference drawn over the whole canvas after every photo.
    Template(String),
}

/// Picker state: at most one of colour and template is set at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundPicker {
    color: Option<HexColor>,
    template: Option<String>,
    error: Option<String>,
}

impl BackgroundPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a value from the combined picker: `#`-prefixed values are colours,
    /// anything else is a template reference. An empty value is ignored.
    pub fn pick(&mut self, value: &str) -> Result<(), SelectionError> {
        if value.is_empty() {
            warn!("empty background value provided");
            return Ok(());
        }
        if value.starts_with('#') {
            self.pick_color(value)
        } else {
            self.pick_template(value);
            Ok(())
        }
    }

    /// Selects a solid colour and clears the template.
    ///
    /// Anything but `#RRGGBB` sets the error indicator and leaves the selection unchanged.
    pub fn pick_color(&mut self, value: &str) -> Result<(), SelectionError> {
        let color = HexColor::parse(value).inspect_err(|_| {
            warn!(value, "rejected background color");
            self.error = Some(INVALID_COLOR_MESSAGE.to_string());
        })?;
        self.color = Some(color);
        self.template = None;
        self.error = None;
        Ok(())
    }

    /// Selects an overlay template and clears the colour.
    pub fn pick_template(&mut self, reference: &str) {
        self.template = Some(reference.to_string());
        self.color = None;
        self.error = None;
    }

    pub fn color(&self) -> Option<HexColor> {
        self.color
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn background(&self) -> Option<Background> {
        match (&self.color, &self.template) {
            (Some(color), _) => Some(Background::Color(*color)),
            (None, Some(template)) => Some(Background::Template(template.clone())),
            (None, None) => None,
        }
    }
}
