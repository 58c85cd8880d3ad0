use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const EMBEDDED_MASK: &str = include_str!("../../assets/land_mask.txt");

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("failed to read land mask {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("land mask has no rows")]
    Empty,

    #[error("land mask line {line} has {found} cells, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("land mask line {line}, column {column}: unexpected cell {cell:?}")]
    InvalidCell {
        line: usize,
        column: usize,
        cell: char,
    },
}

/// Equirectangular land/water grid.
///
/// Row 0 is the northernmost band (+90 latitude), column 0 the westernmost
/// (-180 longitude). Shared read-only between concurrent renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl LandMask {
    /// The coarse world mask compiled into the binary.
    pub fn embedded() -> Result<Self, MaskError> {
        Self::parse(EMBEDDED_MASK)
    }

    pub fn load(path: &Path) -> Result<Self, MaskError> {
        let text = fs::read_to_string(path).map_err(|source| MaskError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse the text format: one row per line, `#`, `X` or `1` for land,
    /// `.`, `0`, `~` or space for water. Lines starting with `;` and blank
    /// lines are skipped.
    pub fn parse(text: &str) -> Result<Self, MaskError> {
        let mut width = 0;
        let mut cells = Vec::new();
        let mut height = 0;

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim_end_matches('\r');
            if line.starts_with(';') || line.trim().is_empty() {
                continue;
            }

            let row_start = cells.len();
            for (column, cell) in line.chars().enumerate() {
                let land = match cell {
                    '#' | 'X' | '1' => true,
                    '.' | '0' | '~' | ' ' => false,
                    _ => {
                        return Err(MaskError::InvalidCell {
                            line: line_number,
                            column: column + 1,
                            cell,
                        })
                    }
                };
                cells.push(land);
            }

            let found = cells.len() - row_start;
            if height == 0 {
                width = found;
            } else if found != width {
                return Err(MaskError::RaggedRow {
                    line: line_number,
                    expected: width,
                    found,
                });
            }
            height += 1;
        }

        if height == 0 {
            return Err(MaskError::Empty);
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Share of cells that are land, in `[0, 1]`.
    pub fn land_fraction(&self) -> f64 {
        let land = self.cells.iter().filter(|&&cell| cell).count();
        land as f64 / self.cells.len() as f64
    }

    /// Nearest-cell lookup. Longitude wraps around, latitude is clamped.
    pub fn is_land(&self, lon: f64, lat: f64) -> bool {
        let x = ((lon + 180.0) / 360.0 * self.width as f64).floor();
        let y = ((90.0 - lat) / 180.0 * self.height as f64).floor();

        let column = (x as i64).rem_euclid(self.width as i64) as usize;
        let row = (y.max(0.0) as usize).min(self.height - 1);

        self.cells[row * self.width + column]
    }
}
