//! Decoding and bounds checking of generate requests.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::config::Limits;
use crate::error::ApiError;
use crate::generate_config::{AnsiColor, ColorConfig, ColorMode, GenerateConfig, Marker};

pub const DEFAULT_CENTER_GLYPH: char = 'O';
pub const DEFAULT_HORIZONTAL_GLYPH: char = '-';
pub const DEFAULT_VERTICAL_GLYPH: char = '|';

/// Wire form of a generate request. Missing fields and `null` values keep
/// their defaults, at every nesting level.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub width: i64,
    pub supersample: i64,
    pub char_aspect: f64,
    pub margin: i64,
    pub frame: bool,
    pub marker: MarkerRequest,
    pub color: ColorRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRequest {
    pub enabled: bool,
    pub lon: f64,
    pub lat: f64,
    pub center: String,
    pub horizontal: String,
    pub vertical: String,
    pub arm_x: i64,
    pub arm_y: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorRequest {
    pub mode: String,
    pub map_color: String,
    pub frame_color: String,
    pub marker_color: String,
}

/// Fields present in the payload; absent and `null` both decode to `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "GenerateRequest", default, deny_unknown_fields)]
struct GenerateFields {
    width: Option<i64>,
    supersample: Option<i64>,
    char_aspect: Option<f64>,
    margin: Option<i64>,
    frame: Option<bool>,
    marker: Option<MarkerRequest>,
    color: Option<ColorRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename = "MarkerRequest", default, deny_unknown_fields)]
struct MarkerFields {
    enabled: Option<bool>,
    lon: Option<f64>,
    lat: Option<f64>,
    center: Option<String>,
    horizontal: Option<String>,
    vertical: Option<String>,
    arm_x: Option<i64>,
    arm_y: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename = "ColorRequest", default, deny_unknown_fields)]
struct ColorFields {
    mode: Option<String>,
    map_color: Option<String>,
    frame_color: Option<String>,
    marker_color: Option<String>,
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl<'de> Deserialize<'de> for GenerateRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut request = Self::default();
        if let Some(fields) = Option::<GenerateFields>::deserialize(deserializer)? {
            overlay(&mut request.width, fields.width);
            overlay(&mut request.supersample, fields.supersample);
            overlay(&mut request.char_aspect, fields.char_aspect);
            overlay(&mut request.margin, fields.margin);
            overlay(&mut request.frame, fields.frame);
            overlay(&mut request.marker, fields.marker);
            overlay(&mut request.color, fields.color);
        }
        Ok(request)
    }
}

impl<'de> Deserialize<'de> for MarkerRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut marker = Self::default();
        if let Some(fields) = Option::<MarkerFields>::deserialize(deserializer)? {
            overlay(&mut marker.enabled, fields.enabled);
            overlay(&mut marker.lon, fields.lon);
            overlay(&mut marker.lat, fields.lat);
            overlay(&mut marker.center, fields.center);
            overlay(&mut marker.horizontal, fields.horizontal);
            overlay(&mut marker.vertical, fields.vertical);
            overlay(&mut marker.arm_x, fields.arm_x);
            overlay(&mut marker.arm_y, fields.arm_y);
        }
        Ok(marker)
    }
}

impl<'de> Deserialize<'de> for ColorRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut color = Self::default();
        if let Some(fields) = Option::<ColorFields>::deserialize(deserializer)? {
            overlay(&mut color.mode, fields.mode);
            overlay(&mut color.map_color, fields.map_color);
            overlay(&mut color.frame_color, fields.frame_color);
            overlay(&mut color.marker_color, fields.marker_color);
        }
        Ok(color)
    }
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            width: 120,
            supersample: 3,
            char_aspect: 2.0,
            margin: 2,
            frame: true,
            marker: MarkerRequest::default(),
            color: ColorRequest::default(),
        }
    }
}

impl Default for MarkerRequest {
    fn default() -> Self {
        Self {
            enabled: false,
            lon: 0.0,
            lat: 0.0,
            center: DEFAULT_CENTER_GLYPH.to_string(),
            horizontal: DEFAULT_HORIZONTAL_GLYPH.to_string(),
            vertical: DEFAULT_VERTICAL_GLYPH.to_string(),
            arm_x: -1,
            arm_y: -1,
        }
    }
}

impl Default for ColorRequest {
    fn default() -> Self {
        Self {
            mode: ColorMode::Always.as_str().to_string(),
            map_color: AnsiColor::Green.name().to_string(),
            frame_color: AnsiColor::BrightWhite.name().to_string(),
            marker_color: AnsiColor::BrightRed.name().to_string(),
        }
    }
}

/// Decode a request body over the defaults.
///
/// Unknown fields and anything after the JSON value are rejected.
pub fn decode_generate_request(body: &[u8]) -> Result<GenerateRequest, ApiError> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);

    let request = GenerateRequest::deserialize(&mut deserializer)
        .map_err(|err| ApiError::MalformedPayload(err.to_string()))?;

    deserializer
        .end()
        .map_err(|_| ApiError::MalformedPayload("trailing data".to_string()))?;

    Ok(request)
}

/// First rule a request violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("width must be between {min} and {max}")]
    Width { min: i64, max: i64 },

    #[error("supersample must be between {min} and {max}")]
    Supersample { min: i64, max: i64 },

    #[error("margin must be between 0 and {max}")]
    Margin { max: i64 },

    #[error("char_aspect must be between {min:.1} and {max:.1}")]
    CharAspect { min: f64, max: f64 },

    #[error("color.mode must be one of: never, always")]
    ColorMode,

    #[error("color.{field} is not a supported ANSI 16 color")]
    Color { field: &'static str },

    #[error("marker.lon must be between -180 and 180")]
    Longitude,

    #[error("marker.lat must be between -90 and 90")]
    Latitude,

    #[error("marker arm lengths must be -1 or greater")]
    ArmLength,

    #[error("marker.{field} must be a single ASCII character")]
    GlyphLength { field: &'static str },

    #[error("marker.{field} must be ASCII")]
    GlyphNotAscii { field: &'static str },
}

/// Checks decoded requests against the configured [`Limits`].
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    limits: Limits,
}

impl RequestValidator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Decode and validate a raw request body in one step.
    pub fn validate_body(&self, body: &[u8]) -> Result<GenerateConfig, ApiError> {
        let request = decode_generate_request(body)?;
        Ok(self.validate(&request)?)
    }

    /// Validate a decoded request, stopping at the first violation.
    pub fn validate(&self, request: &GenerateRequest) -> Result<GenerateConfig, ValidationError> {
        let limits = &self.limits;

        if !(limits.min_width..=limits.max_width).contains(&request.width) {
            return Err(ValidationError::Width {
                min: limits.min_width,
                max: limits.max_width,
            });
        }
        if !(limits.min_supersample..=limits.max_supersample).contains(&request.supersample) {
            return Err(ValidationError::Supersample {
                min: limits.min_supersample,
                max: limits.max_supersample,
            });
        }
        if !(0..=limits.max_margin).contains(&request.margin) {
            return Err(ValidationError::Margin {
                max: limits.max_margin,
            });
        }
        if !request.char_aspect.is_finite()
            || !(limits.min_char_aspect..=limits.max_char_aspect).contains(&request.char_aspect)
        {
            return Err(ValidationError::CharAspect {
                min: limits.min_char_aspect,
                max: limits.max_char_aspect,
            });
        }

        let color = validate_color(&request.color)?;
        let marker = if request.marker.enabled {
            Some(validate_marker(&request.marker)?)
        } else {
            None
        };

        Ok(GenerateConfig {
            width: to_u32(request.width),
            supersample: to_u32(request.supersample),
            char_aspect: request.char_aspect,
            margin: to_u32(request.margin),
            frame: request.frame,
            marker,
            color,
        })
    }
}

fn validate_color(color: &ColorRequest) -> Result<ColorConfig, ValidationError> {
    let mode = color
        .mode
        .parse::<ColorMode>()
        .map_err(|_| ValidationError::ColorMode)?;

    let palette = |value: &str, field: &'static str| {
        AnsiColor::parse_optional(value).map_err(|_| ValidationError::Color { field })
    };

    Ok(ColorConfig {
        mode,
        map_color: palette(&color.map_color, "map_color")?,
        frame_color: palette(&color.frame_color, "frame_color")?,
        marker_color: palette(&color.marker_color, "marker_color")?,
    })
}

fn validate_marker(marker: &MarkerRequest) -> Result<Marker, ValidationError> {
    if !marker.lon.is_finite() || !(-180.0..=180.0).contains(&marker.lon) {
        return Err(ValidationError::Longitude);
    }
    if !marker.lat.is_finite() || !(-90.0..=90.0).contains(&marker.lat) {
        return Err(ValidationError::Latitude);
    }
    if marker.arm_x < -1 || marker.arm_y < -1 {
        return Err(ValidationError::ArmLength);
    }

    Ok(Marker {
        lon: marker.lon,
        lat: marker.lat,
        center: parse_ascii_glyph(&marker.center, DEFAULT_CENTER_GLYPH, "center")?,
        horizontal: parse_ascii_glyph(&marker.horizontal, DEFAULT_HORIZONTAL_GLYPH, "horizontal")?,
        vertical: parse_ascii_glyph(&marker.vertical, DEFAULT_VERTICAL_GLYPH, "vertical")?,
        arm_x: marker.arm_x,
        arm_y: marker.arm_y,
    })
}

/// A trimmed single ASCII character; blank input yields `fallback`.
fn parse_ascii_glyph(value: &str, fallback: char, field: &'static str) -> Result<char, ValidationError> {
    let mut chars = value.trim().chars();

    match (chars.next(), chars.next()) {
        (None, _) => Ok(fallback),
        (Some(glyph), None) if glyph.is_ascii() => Ok(glyph),
        (Some(_), None) => Err(ValidationError::GlyphNotAscii { field }),
        (Some(_), Some(_)) => Err(ValidationError::GlyphLength { field }),
    }
}

// Only called on values already checked against non-negative bounds.
fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
