use serde::Serialize;

use crate::generator::{GenerateMeta, GenerateResult};

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub plain: String,
    pub ansi: String,
    pub meta: MetaResponse,
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub width: u32,
    pub height: u32,
    pub supersample: u32,
    pub char_aspect: f64,
    pub duration_ms: u64,
    pub bytes: usize,
}

impl From<GenerateMeta> for MetaResponse {
    fn from(meta: GenerateMeta) -> Self {
        Self {
            width: meta.width,
            height: meta.height,
            supersample: meta.supersample,
            char_aspect: meta.char_aspect,
            duration_ms: u64::try_from(meta.duration.as_millis()).unwrap_or(u64::MAX),
            bytes: meta.bytes,
        }
    }
}

impl From<GenerateResult> for GenerateResponse {
    fn from(result: GenerateResult) -> Self {
        Self {
            plain: result.plain,
            ansi: result.ansi,
            meta: result.meta.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_generate_response_shape() {
        let response = GenerateResponse::from(GenerateResult {
            plain: "##\n".to_string(),
            ansi: "\x1b[32m##\x1b[0m\n".to_string(),
            meta: GenerateMeta {
                width: 120,
                height: 30,
                supersample: 3,
                char_aspect: 2.0,
                duration: Duration::from_micros(4_700),
                bytes: 3,
            },
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "plain": "##\n",
                "ansi": "\u{1b}[32m##\u{1b}[0m\n",
                "meta": {
                    "width": 120,
                    "height": 30,
                    "supersample": 3,
                    "char_aspect": 2.0,
                    "duration_ms": 4,
                    "bytes": 3
                }
            })
        );
    }

    #[test]
    fn test_health_response() {
        let json = serde_json::to_string(&HealthResponse::ok()).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }
}
