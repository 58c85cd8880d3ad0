//! ASCII map rendering engine.
//!
//! The generator only talks to the [`Renderer`] trait. [`AsciiRenderer`] is
//! the bundled implementation, projecting a [`LandMask`] onto a character
//! grid.

mod ascii;
mod land_mask;

pub use ascii::AsciiRenderer;
pub use land_mask::{LandMask, MaskError};

use thiserror::Error;

use crate::generate_config::{ColorConfig, Marker};

/// Grid geometry shared by every render of a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: u32,
    pub supersample: u32,
    pub char_aspect: f64,
}

impl Geometry {
    /// Number of map rows for this geometry.
    pub fn height(&self) -> u32 {
        map_height(self.width, self.char_aspect)
    }
}

/// Presentation options for a single render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Blank rows added above and below the map
    pub margin_rows: u32,
    pub frame: bool,
    pub color: ColorConfig,
}

/// `round(width / (2 * char_aspect))`, rounding half away from zero.
///
/// Terminal cells are roughly twice as tall as they are wide, so an
/// equirectangular world of `width` columns needs half as many rows,
/// further scaled by the cell aspect ratio.
pub fn map_height(width: u32, char_aspect: f64) -> u32 {
    let rows = (f64::from(width) / (2.0 * char_aspect)).round();
    if rows.is_finite() && rows > 0.0 {
        rows.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("width must be positive")]
    InvalidWidth,

    #[error("supersample must be positive")]
    InvalidSupersample,

    #[error("char aspect {0} must be finite and positive")]
    InvalidCharAspect(f64),

    #[error("map would have no rows")]
    ZeroHeight,

    #[error("marker at lon {lon}, lat {lat} is outside the map")]
    MarkerOutOfBounds { lon: f64, lat: f64 },
}

/// A rendering engine. Implementations must be safe to call from many
/// threads at once; a call may block for as long as the render takes.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        geometry: &Geometry,
        marker: Option<&Marker>,
        options: &RenderOptions,
    ) -> Result<String, RenderError>;
}
