use serde::Serialize;
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = ":8081";
pub const DEFAULT_RATE_LIMIT: i64 = 20;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds enforced on generate requests
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Limits {
    pub min_width: i64,
    pub max_width: i64,
    pub max_margin: i64,
    pub min_supersample: i64,
    pub max_supersample: i64,
    pub min_char_aspect: f64,
    pub max_char_aspect: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_width: 20,
            max_width: 240,
            max_margin: 12,
            min_supersample: 1,
            max_supersample: 5,
            min_char_aspect: 1.0,
            max_char_aspect: 3.5,
        }
    }
}

/// Service configuration, read from `API_*` environment variables.
///
/// Unset variables use the defaults; unparsable ones log a warning and use
/// the defaults too, so loading never fails.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// `host:port`, or `:port` to listen on every interface
    pub listen_addr: String,

    pub limits: Limits,

    /// Requests admitted per client and window
    pub rate_limit: i64,

    #[serde(with = "humantime_serde")]
    pub rate_window: Duration,

    /// Request bodies above this size are rejected before decoding
    pub max_body_bytes: usize,

    /// Land mask file; the embedded mask is used when unset
    pub land_mask: Option<PathBuf>,

    /// Time allowed for receiving a request body
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Time allowed for handling a request, from routing to response
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            limits: Limits::default(),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            land_mask: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let limits = defaults.limits;
        let var = |name: &str| lookup(name);

        Self {
            listen_addr: env_string(var("API_LISTEN_ADDR"), DEFAULT_LISTEN_ADDR),
            limits: Limits {
                min_width: env_parse("API_MIN_WIDTH", var("API_MIN_WIDTH"), limits.min_width),
                max_width: env_parse("API_MAX_WIDTH", var("API_MAX_WIDTH"), limits.max_width),
                max_margin: env_parse("API_MAX_MARGIN", var("API_MAX_MARGIN"), limits.max_margin),
                min_supersample: env_parse(
                    "API_MIN_SUPERSAMPLE",
                    var("API_MIN_SUPERSAMPLE"),
                    limits.min_supersample,
                ),
                max_supersample: env_parse(
                    "API_MAX_SUPERSAMPLE",
                    var("API_MAX_SUPERSAMPLE"),
                    limits.max_supersample,
                ),
                min_char_aspect: env_parse(
                    "API_MIN_CHAR_ASPECT",
                    var("API_MIN_CHAR_ASPECT"),
                    limits.min_char_aspect,
                ),
                max_char_aspect: env_parse(
                    "API_MAX_CHAR_ASPECT",
                    var("API_MAX_CHAR_ASPECT"),
                    limits.max_char_aspect,
                ),
            },
            rate_limit: env_parse("API_RATE_LIMIT", var("API_RATE_LIMIT"), defaults.rate_limit),
            rate_window: env_duration("API_RATE_WINDOW", var("API_RATE_WINDOW"), defaults.rate_window),
            max_body_bytes: env_parse(
                "API_MAX_BODY_BYTES",
                var("API_MAX_BODY_BYTES"),
                defaults.max_body_bytes,
            ),
            land_mask: var("API_LAND_MASK")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            read_timeout: env_duration("API_READ_TIMEOUT", var("API_READ_TIMEOUT"), defaults.read_timeout),
            write_timeout: env_duration(
                "API_WRITE_TIMEOUT",
                var("API_WRITE_TIMEOUT"),
                defaults.write_timeout,
            ),
        }
    }

    /// Addresses to try, in order, when binding the listener.
    ///
    /// `:8081` means every interface: the IPv6 wildcard first (dual-stack on
    /// most hosts), then `0.0.0.0:8081` for hosts without IPv6.
    pub fn bind_addresses(&self) -> Vec<String> {
        let addr = self.listen_addr.trim();
        if addr.starts_with(':') {
            vec![format!("[::]{}", addr), format!("0.0.0.0{}", addr)]
        } else {
            vec![addr.to_string()]
        }
    }
}

fn env_string(value: Option<String>, fallback: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => fallback.to_string(),
    }
}

fn env_parse<T>(name: &str, value: Option<String>, fallback: T) -> T
where
    T: FromStr + Display,
{
    let Some(value) = value else {
        return fallback;
    };
    let value = value.trim();
    if value.is_empty() {
        return fallback;
    }

    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::warn!(variable = name, value, %fallback, "invalid value, using fallback");
            fallback
        }
    }
}

fn env_duration(name: &str, value: Option<String>, fallback: Duration) -> Duration {
    let Some(value) = value else {
        return fallback;
    };
    let value = value.trim();
    if value.is_empty() {
        return fallback;
    }

    match humantime::parse_duration(value) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(
                variable = name,
                value,
                fallback = %humantime::format_duration(fallback),
                error = %err,
                "invalid duration, using fallback"
            );
            fallback
        }
    }
}
