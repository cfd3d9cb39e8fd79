//! Zoom arithmetic for the diagram preview. The webview applies the scale as
//! a CSS transform; the numbers live here.

use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.4;
pub const MAX_ZOOM: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Horizontal padding reserved when fitting a diagram to its container.
const FIT_MARGIN: f64 = 20.0;

/// Current preview scale, kept inside [`MIN_ZOOM`, `MAX_ZOOM`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom(f64);

impl Default for Zoom {
    fn default() -> Self {
        Zoom(1.0)
    }
}

impl Zoom {
    pub fn level(&self) -> f64 {
        self.0
    }

    pub fn percent(&self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.0 = (self.0 + ZOOM_STEP).min(MAX_ZOOM);
        self.0
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.0 = (self.0 - ZOOM_STEP).max(MIN_ZOOM);
        self.0
    }

    pub fn reset(&mut self) -> f64 {
        self.0 = 1.0;
        self.0
    }

    /// Scale the diagram so it spans the container width minus a small
    /// margin, never past 100%.
    pub fn fit(&mut self, container_width: f64, svg_width: f64) -> Result<f64, String> {
        if container_width <= 0.0 || svg_width <= 0.0 {
            return Err("Cannot calculate fit zoom.".to_string());
        }
        let scale = ((container_width - FIT_MARGIN) / svg_width).min(1.0);
        self.0 = scale.clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(self.0)
    }
}
