//! Render-ready configuration produced by the request validator.

use std::fmt;
use std::str::FromStr;

/// Whether the renderer emits ANSI escape sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Never,
    Always,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Never => "never",
            ColorMode::Always => "always",
        }
    }
}

impl FromStr for ColorMode {
    type Err = ();

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(ColorMode::Never),
            "always" => Ok(ColorMode::Always),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 16-color ANSI palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl AnsiColor {
    pub const ALL: [AnsiColor; 16] = [
        AnsiColor::Black,
        AnsiColor::Red,
        AnsiColor::Green,
        AnsiColor::Yellow,
        AnsiColor::Blue,
        AnsiColor::Magenta,
        AnsiColor::Cyan,
        AnsiColor::White,
        AnsiColor::BrightBlack,
        AnsiColor::BrightRed,
        AnsiColor::BrightGreen,
        AnsiColor::BrightYellow,
        AnsiColor::BrightBlue,
        AnsiColor::BrightMagenta,
        AnsiColor::BrightCyan,
        AnsiColor::BrightWhite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnsiColor::Black => "black",
            AnsiColor::Red => "red",
            AnsiColor::Green => "green",
            AnsiColor::Yellow => "yellow",
            AnsiColor::Blue => "blue",
            AnsiColor::Magenta => "magenta",
            AnsiColor::Cyan => "cyan",
            AnsiColor::White => "white",
            AnsiColor::BrightBlack => "bright-black",
            AnsiColor::BrightRed => "bright-red",
            AnsiColor::BrightGreen => "bright-green",
            AnsiColor::BrightYellow => "bright-yellow",
            AnsiColor::BrightBlue => "bright-blue",
            AnsiColor::BrightMagenta => "bright-magenta",
            AnsiColor::BrightCyan => "bright-cyan",
            AnsiColor::BrightWhite => "bright-white",
        }
    }

    /// SGR foreground code: 30-37 for normal colors, 90-97 for bright ones.
    pub fn sgr_code(&self) -> u8 {
        let index = *self as u8;
        if index < 8 {
            30 + index
        } else {
            90 + (index - 8)
        }
    }

    /// Parse a palette name. An empty (or blank) name means "terminal default"
    /// and yields `Ok(None)`.
    pub fn parse_optional(name: &str) -> Result<Option<AnsiColor>, ()> {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Ok(None);
        }
        AnsiColor::ALL
            .iter()
            .find(|color| color.name() == name)
            .copied()
            .map(Some)
            .ok_or(())
    }
}

impl fmt::Display for AnsiColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Color settings. `None` colors leave that element uncolored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorConfig {
    pub mode: ColorMode,
    pub map_color: Option<AnsiColor>,
    pub frame_color: Option<AnsiColor>,
    pub marker_color: Option<AnsiColor>,
}

impl ColorConfig {
    /// Same palette with escape sequences disabled
    pub fn without_color(&self) -> Self {
        Self {
            mode: ColorMode::Never,
            ..*self
        }
    }
}

/// A point annotation drawn on top of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub lon: f64,
    pub lat: f64,
    pub center: char,
    pub horizontal: char,
    pub vertical: char,
    /// Arm length in cells; `-1` extends to the map edge.
    pub arm_x: i64,
    pub arm_y: i64,
}

/// Validated generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateConfig {
    pub width: u32,
    pub supersample: u32,
    pub char_aspect: f64,
    pub margin: u32,
    pub frame: bool,
    pub marker: Option<Marker>,
    pub color: ColorConfig,
}
