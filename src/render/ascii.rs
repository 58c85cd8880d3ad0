use std::sync::Arc;

use super::{Geometry, LandMask, RenderError, RenderOptions, Renderer};
use crate::generate_config::{AnsiColor, ColorMode, Marker};

/// Glyphs by land coverage of a cell, from open water to solid land.
const COVERAGE_RAMP: [char; 5] = [' ', '.', ':', 'o', '#'];

const SGR_RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Water,
    Land,
    Marker,
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    glyph: char,
    layer: Layer,
}

/// Renders a [`LandMask`] as an equirectangular character grid.
#[derive(Debug, Clone)]
pub struct AsciiRenderer {
    mask: Arc<LandMask>,
}

impl AsciiRenderer {
    pub fn new(mask: Arc<LandMask>) -> Self {
        Self { mask }
    }

    fn rasterize(&self, width: usize, height: usize, supersample: usize) -> Vec<Cell> {
        let samples = (supersample * supersample) as f64;
        let step = 1.0 / supersample as f64;
        let mut cells = Vec::with_capacity(width * height);

        for row in 0..height {
            for column in 0..width {
                let mut land = 0usize;
                for sy in 0..supersample {
                    let y = row as f64 + (sy as f64 + 0.5) * step;
                    let lat = 90.0 - 180.0 * y / height as f64;
                    for sx in 0..supersample {
                        let x = column as f64 + (sx as f64 + 0.5) * step;
                        let lon = -180.0 + 360.0 * x / width as f64;
                        if self.mask.is_land(lon, lat) {
                            land += 1;
                        }
                    }
                }

                let coverage = land as f64 / samples;
                let level = ((coverage * 4.0).ceil() as usize).min(COVERAGE_RAMP.len() - 1);
                cells.push(Cell {
                    glyph: COVERAGE_RAMP[level],
                    layer: if level == 0 { Layer::Water } else { Layer::Land },
                });
            }
        }

        cells
    }
}

impl Renderer for AsciiRenderer {
    fn render(
        &self,
        geometry: &Geometry,
        marker: Option<&Marker>,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        if geometry.width == 0 {
            return Err(RenderError::InvalidWidth);
        }
        if geometry.supersample == 0 {
            return Err(RenderError::InvalidSupersample);
        }
        if !geometry.char_aspect.is_finite() || geometry.char_aspect <= 0.0 {
            return Err(RenderError::InvalidCharAspect(geometry.char_aspect));
        }
        let height = geometry.height() as usize;
        if height == 0 {
            return Err(RenderError::ZeroHeight);
        }
        let width = geometry.width as usize;

        let mut cells = self.rasterize(width, height, geometry.supersample as usize);
        if let Some(marker) = marker {
            draw_marker(&mut cells, width, height, marker)?;
        }

        Ok(compose(&cells, width, options))
    }
}

fn draw_marker(cells: &mut [Cell], width: usize, height: usize, marker: &Marker) -> Result<(), RenderError> {
    let in_range = marker.lon.is_finite()
        && marker.lat.is_finite()
        && (-180.0..=180.0).contains(&marker.lon)
        && (-90.0..=90.0).contains(&marker.lat);
    if !in_range {
        return Err(RenderError::MarkerOutOfBounds {
            lon: marker.lon,
            lat: marker.lat,
        });
    }

    let column = (((marker.lon + 180.0) / 360.0 * width as f64).floor() as usize).min(width - 1);
    let row = (((90.0 - marker.lat) / 180.0 * height as f64).floor() as usize).min(height - 1);

    let mut set = |row: usize, column: usize, glyph: char| {
        cells[row * width + column] = Cell {
            glyph,
            layer: Layer::Marker,
        };
    };

    for distance in 1..=arm_reach(marker.arm_x, width) {
        if let Some(left) = column.checked_sub(distance) {
            set(row, left, marker.horizontal);
        }
        if column + distance < width {
            set(row, column + distance, marker.horizontal);
        }
    }
    for distance in 1..=arm_reach(marker.arm_y, height) {
        if let Some(up) = row.checked_sub(distance) {
            set(up, column, marker.vertical);
        }
        if row + distance < height {
            set(row + distance, column, marker.vertical);
        }
    }
    set(row, column, marker.center);

    Ok(())
}

/// Negative arm lengths reach the edge of the map.
fn arm_reach(arm: i64, extent: usize) -> usize {
    usize::try_from(arm).map_or(extent, |arm| arm.min(extent))
}

fn compose(cells: &[Cell], width: usize, options: &RenderOptions) -> String {
    let colors = &options.color;
    let map_rows = cells.len() / width;
    let margin = options.margin_rows as usize;

    let mut writer = LineWriter {
        out: String::with_capacity((width + 3) * (map_rows + 2 * margin + 2)),
        colorize: colors.mode == ColorMode::Always,
        frame: options.frame.then_some(colors.frame_color),
        active: None,
    };

    writer.border(width);
    for _ in 0..margin {
        writer.blank_row(width);
    }
    for row in cells.chunks(width) {
        writer.open_row();
        for cell in row {
            let color = match cell.layer {
                Layer::Water => None,
                Layer::Land => colors.map_color,
                Layer::Marker => colors.marker_color,
            };
            writer.push(cell.glyph, color);
        }
        writer.close_row();
    }
    for _ in 0..margin {
        writer.blank_row(width);
    }
    writer.border(width);

    writer.out
}

/// Builds the output text, switching SGR colors only when the color changes.
struct LineWriter {
    out: String,
    colorize: bool,
    /// Frame color when a frame is drawn
    frame: Option<Option<AnsiColor>>,
    active: Option<AnsiColor>,
}

impl LineWriter {
    fn push(&mut self, glyph: char, color: Option<AnsiColor>) {
        if self.colorize && color != self.active {
            if self.active.is_some() {
                self.out.push_str(SGR_RESET);
            }
            if let Some(color) = color {
                self.out.push_str(&format!("\x1b[{}m", color.sgr_code()));
            }
            self.active = color;
        }
        self.out.push(glyph);
    }

    fn end_line(&mut self) {
        if self.active.take().is_some() {
            self.out.push_str(SGR_RESET);
        }
        self.out.push('\n');
    }

    fn border(&mut self, width: usize) {
        let Some(color) = self.frame else {
            return;
        };
        self.push('+', color);
        for _ in 0..width {
            self.push('-', color);
        }
        self.push('+', color);
        self.end_line();
    }

    fn open_row(&mut self) {
        if let Some(color) = self.frame {
            self.push('|', color);
        }
    }

    fn close_row(&mut self) {
        if let Some(color) = self.frame {
            self.push('|', color);
        }
        self.end_line();
    }

    fn blank_row(&mut self, width: usize) {
        self.open_row();
        for _ in 0..width {
            self.push(' ', None);
        }
        self.close_row();
    }
}
