use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::{io::Cursor, sync::Arc};
use waste_detector::{
    detection::DetectionService,
    detector::Detector,
    server::{self, handlers::AppState},
};

pub const BOUNDARY: &str = "----waste-detector-test-boundary";

/// Upload limit used by the test router
pub const TEST_UPLOAD_LIMIT: usize = 1024 * 1024;

/// Create a router around the given detector (or none)
pub fn create_test_app(detector: Option<Arc<dyn Detector>>, model_path: &str) -> Router {
    create_test_app_with_debug(detector, model_path, false)
}

pub fn create_test_app_with_debug(
    detector: Option<Arc<dyn Detector>>,
    model_path: &str,
    debug: bool,
) -> Router {
    let service = DetectionService::new(detector, model_path);
    server::router(AppState::new(Arc::new(service), debug), TEST_UPLOAD_LIMIT)
}

/// Encode a small solid-colour image
pub fn sample_image(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([90, 140, 60]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .expect("Failed to encode test image");
    bytes.into_inner()
}

/// One multipart part: field name, optional filename, content
pub struct FormPart<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST /detect with the given parts
pub fn detect_request(parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// POST /detect with a single `image` part
pub fn image_request(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    detect_request(&[FormPart {
        name: "image",
        filename: Some(filename),
        content_type,
        data,
    }])
}

pub fn health_request() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}
