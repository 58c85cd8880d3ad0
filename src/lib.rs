pub mod config;
pub mod error;
pub mod generate_config;
pub mod generator;
pub mod handlers;
pub mod key_generator;
pub mod middleware;
pub mod rate_limiter;
pub mod render;
pub mod response;
pub mod server;
pub mod validation;

pub use config::Config;
pub use error::{ApiError, Result};
pub use generator::{GenerateResult, MapGenerator};
pub use rate_limiter::FixedWindowLimiter;
pub use render::{AsciiRenderer, LandMask, Renderer};
pub use server::{create_app, Server};
pub use validation::RequestValidator;
