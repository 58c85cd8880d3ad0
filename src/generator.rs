//! Dual-render orchestration and result metadata.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::generate_config::{ColorMode, GenerateConfig};
use crate::render::{Geometry, RenderError, RenderOptions, Renderer};

/// A render failure, tagged with the variant that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("render plain output failed: {0}")]
    Plain(#[source] RenderError),

    #[error("render ansi output failed: {0}")]
    Colorized(#[source] RenderError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateMeta {
    pub width: u32,
    pub height: u32,
    pub supersample: u32,
    pub char_aspect: f64,
    pub duration: Duration,
    /// Byte length of the plain output
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResult {
    pub plain: String,
    /// Colorized output, or a copy of `plain` when color is off
    pub ansi: String,
    pub meta: GenerateMeta,
}

/// Runs validated configurations through a [`Renderer`].
#[derive(Clone)]
pub struct MapGenerator {
    renderer: Arc<dyn Renderer>,
}

impl MapGenerator {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Render the plain variant, then the colorized one if color is on.
    ///
    /// Both renders share geometry and marker. A failed colorized render fails
    /// the whole call even though the plain text is already available.
    pub fn generate(&self, config: &GenerateConfig) -> Result<GenerateResult, GenerateError> {
        let geometry = Geometry {
            width: config.width,
            supersample: config.supersample,
            char_aspect: config.char_aspect,
        };
        let marker = config.marker.as_ref();
        let options = RenderOptions {
            margin_rows: config.margin,
            frame: config.frame,
            color: config.color,
        };

        let start = Instant::now();

        let plain_options = RenderOptions {
            color: config.color.without_color(),
            ..options
        };
        let plain = self
            .renderer
            .render(&geometry, marker, &plain_options)
            .map_err(GenerateError::Plain)?;

        let ansi = match config.color.mode {
            ColorMode::Always => self
                .renderer
                .render(&geometry, marker, &options)
                .map_err(GenerateError::Colorized)?,
            ColorMode::Never => plain.clone(),
        };

        let duration = start.elapsed();

        tracing::debug!(
            width = config.width,
            supersample = config.supersample,
            color = %config.color.mode,
            marker = config.marker.is_some(),
            elapsed_ms = duration.as_millis() as u64,
            "map generated"
        );

        Ok(GenerateResult {
            meta: GenerateMeta {
                width: config.width,
                height: geometry.height(),
                supersample: config.supersample,
                char_aspect: config.char_aspect,
                duration,
                bytes: plain.len(),
            },
            plain,
            ansi,
        })
    }
}
