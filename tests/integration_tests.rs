use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use map_ascii_api::{
    config::Config,
    create_app,
    generate_config::Marker,
    handlers::AppState,
    render::{AsciiRenderer, Geometry, LandMask, RenderError, RenderOptions, Renderer},
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn embedded_renderer() -> Arc<AsciiRenderer> {
    Arc::new(AsciiRenderer::new(Arc::new(LandMask::embedded().unwrap())))
}

fn app_with(config: Config) -> Router {
    create_app(Arc::new(AppState::new(&config, embedded_renderer())))
}

fn app() -> Router {
    app_with(Config::default())
}

fn generate_request(body: impl Into<Body>, client: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(body.into())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let request = Request::builder()
        .uri("/api/healthz")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_health_rejects_other_methods() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/healthz")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app(), request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "method not allowed" }));
}

#[tokio::test]
async fn test_health_rejects_head() {
    let request = Request::builder()
        .method("HEAD")
        .uri("/api/healthz")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_generate_rejects_get() {
    let request = Request::builder()
        .uri("/api/generate")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app(), request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method not allowed");
}

#[tokio::test]
async fn test_generate_with_defaults() {
    let response = app()
        .oneshot(generate_request("{}", "192.0.2.1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    let plain = body["plain"].as_str().unwrap();
    let ansi = body["ansi"].as_str().unwrap();
    assert!(!plain.contains('\u{1b}'));
    assert!(ansi.contains("\u{1b}[32m"));
    assert!(ansi.contains("\u{1b}[97m"));

    let meta = &body["meta"];
    assert_eq!(meta["width"], 120);
    assert_eq!(meta["height"], 30);
    assert_eq!(meta["supersample"], 3);
    assert_eq!(meta["char_aspect"], 2.0);
    assert_eq!(meta["bytes"], plain.len());
    assert!(meta["duration_ms"].is_u64());

    // Frame plus two margin rows above and below the map.
    assert_eq!(plain.lines().count(), 30 + 4 + 2);
}

#[tokio::test]
async fn test_generate_without_color_mirrors_plain() {
    let payload = json!({
        "width": 40,
        "frame": false,
        "margin": 0,
        "color": { "mode": "Never" },
        "marker": { "enabled": true, "lon": -74.0, "lat": 40.7, "center": "@", "arm_x": 2, "arm_y": 1 }
    });

    let (status, body) = send(&app(), generate_request(payload.to_string(), "192.0.2.2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ansi"], body["plain"]);
    assert!(body["plain"].as_str().unwrap().contains('@'));
    assert_eq!(body["meta"]["height"], 10);
}

#[tokio::test]
async fn test_null_values_keep_defaults() {
    let app = app();

    for payload in ["null", r#"{"marker": null}"#, r#"{"width": null}"#] {
        let (status, body) = send(&app, generate_request(payload, "192.0.2.8")).await;

        assert_eq!(status, StatusCode::OK, "payload {}", payload);
        assert_eq!(body["meta"]["width"], 120);
        assert_eq!(body["meta"]["height"], 30);
    }
}

#[tokio::test]
async fn test_width_out_of_bounds() {
    let payload = json!({ "width": 500, "supersample": 3, "char_aspect": 2, "margin": 2, "frame": true });

    let (status, body) = send(&app(), generate_request(payload.to_string(), "192.0.2.3")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "width must be between 20 and 240" }));
}

#[tokio::test]
async fn test_marker_longitude_out_of_bounds() {
    let payload = json!({ "marker": { "enabled": true, "lon": 181, "lat": 0 } });

    let (status, body) = send(&app(), generate_request(payload.to_string(), "192.0.2.4")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "marker.lon must be between -180 and 180");
}

#[tokio::test]
async fn test_malformed_payloads() {
    let app = app();

    for payload in [
        r#"{"width": 100, "colour": {}}"#,
        r#"{"width": 100} trailing"#,
        r#"{"width": "#,
        "",
    ] {
        let (status, body) = send(&app, generate_request(payload, "192.0.2.5")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {:?}", payload);
        assert!(
            body["error"].as_str().unwrap().starts_with("invalid JSON payload: "),
            "payload {:?} gave {}",
            payload,
            body
        );
    }
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let app = app_with(Config {
        max_body_bytes: 64,
        ..Config::default()
    });
    let payload = format!(r#"{{"width": 100, "marker": {{"center": "{}"}}}}"#, "x".repeat(200));

    let (status, body) = send(&app, generate_request(payload, "192.0.2.6")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid JSON payload: "));
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let app = app();
    let payload = json!({ "width": 20, "supersample": 1 }).to_string();

    for i in 0..20 {
        let (status, _) = send(&app, generate_request(payload.clone(), "203.0.113.9")).await;
        assert_eq!(status, StatusCode::OK, "request {}", i + 1);
    }

    let (status, body) = send(&app, generate_request(payload.clone(), "203.0.113.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "error": "rate limit exceeded" }));

    // Other clients keep their own budget.
    let (status, _) = send(&app, generate_request(payload, "203.0.113.10")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_requests_consume_budget() {
    let app = app_with(Config {
        rate_limit: 1,
        ..Config::default()
    });

    let (status, _) = send(&app, generate_request(r#"{"width": 1}"#, "198.51.100.1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, generate_request("{}", "198.51.100.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_unidentified_clients_share_anonymous_budget() {
    let app = app_with(Config {
        rate_limit: 1,
        ..Config::default()
    });
    let anonymous = || {
        Request::builder()
            .method("POST")
            .uri("/api/generate")
            .header("x-forwarded-for", "unknown")
            .body(Body::from(r#"{"width": 20}"#))
            .unwrap()
    };

    let (status, _) = send(&app, anonymous()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, anonymous()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

/// Fails every colorized render.
struct PlainOnlyRenderer;

impl Renderer for PlainOnlyRenderer {
    fn render(
        &self,
        _geometry: &Geometry,
        marker: Option<&Marker>,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        match (options.color.mode, marker) {
            (map_ascii_api::generate_config::ColorMode::Never, _) => Ok("plain\n".to_string()),
            (_, Some(marker)) => Err(RenderError::MarkerOutOfBounds {
                lon: marker.lon,
                lat: marker.lat,
            }),
            (_, None) => Err(RenderError::ZeroHeight),
        }
    }
}

#[tokio::test]
async fn test_colorized_render_failure_returns_error_only() {
    let app = create_app(Arc::new(AppState::new(
        &Config::default(),
        Arc::new(PlainOnlyRenderer),
    )));

    let (status, body) = send(&app, generate_request("{}", "192.0.2.7")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "render ansi output failed: map would have no rows" }));
    assert!(body.get("plain").is_none());
}

/// Holds every render well past any test deadline.
struct SlowRenderer;

impl Renderer for SlowRenderer {
    fn render(
        &self,
        _geometry: &Geometry,
        _marker: Option<&Marker>,
        _options: &RenderOptions,
    ) -> Result<String, RenderError> {
        std::thread::sleep(Duration::from_millis(500));
        Ok(String::new())
    }
}

#[tokio::test]
async fn test_slow_render_times_out() {
    let config = Config {
        write_timeout: Duration::from_millis(100),
        ..Config::default()
    };
    let app = create_app(Arc::new(AppState::new(&config, Arc::new(SlowRenderer))));

    let response = app
        .oneshot(generate_request("{}", "192.0.2.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    addr
}

#[tokio::test]
async fn test_stalled_body_times_out() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let addr = serve(app_with(Config {
        read_timeout: Duration::from_millis(200),
        ..Config::default()
    }))
    .await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"POST /api/generate HTTP/1.1\r\n\
              Host: localhost\r\n\
              Content-Type: application/json\r\n\
              Content-Length: 100\r\n\
              \r\n\
              {\"width\": ",
        )
        .await
        .unwrap();

    let mut buf = vec![0u8; 1024];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("server did not answer a stalled body")
        .unwrap();
    let response = String::from_utf8_lossy(&buf[..read]);

    assert!(response.starts_with("HTTP/1.1 408"), "got {:?}", response);
}

#[tokio::test]
async fn test_end_to_end_over_tcp() {
    let app = app_with(Config {
        rate_limit: 2,
        ..Config::default()
    });
    let addr = serve(app).await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let url = format!("http://{}/api/generate", addr);

    let health = tokio_test::assert_ok!(client.get(format!("http://{}/api/healthz", addr)).send().await);
    assert_eq!(health.status(), reqwest::StatusCode::OK);

    let response = tokio_test::assert_ok!(
        client
            .post(&url)
            .json(&json!({ "width": 60, "color": { "mode": "never" } }))
            .send()
            .await
    );
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["meta"]["height"], 15);

    // No forwarding headers: the peer address is the rate limit key.
    let second = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::OK);
    let third = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(third.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
}
