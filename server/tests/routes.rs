use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use camino::{Utf8Path as Path, Utf8PathBuf as PathBuf};
use claims::assert_ok;
use ddam::{app, app_state::AppState};
use ddam_core::config::parse_config;
use image::{Rgb, RgbImage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "ddam-test-boundary";

struct TestServer {
    _dir: tempfile::TempDir,
    media_root: PathBuf,
    app: Router,
}

fn test_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let base = PathBuf::try_from(dir.path().to_path_buf()).expect("tempdir paths should be UTF8");
    let toml = r#"
[Upload]
max_file_size = "1 MiB"

[Rendition]
width = 60
height = 30

[Branding]
organization_name_en = "Example Corp"
logo = "branding/logo.svg"
"#;
    let config = assert_ok!(parse_config(toml, &base, None));
    let media_root = config.media.root.clone();
    let app = app(Arc::new(AppState::new(config)));
    TestServer {
        _dir: dir,
        media_root,
        app,
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
    let mut buf = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(files: &[(&str, &[u8])], user: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/asset").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(user) = user {
        builder = builder.header("X-Remote-User", user);
    }
    builder.body(Body::from(multipart_body(files))).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn upload_stores_file_and_returns_asset() {
    let server = test_server();
    let png = png_bytes(120, 60);
    let (status, body) = send_json(
        &server.app,
        upload_request(&[("Harbour View.png", png.as_slice())], Some("editor@example.org")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let asset = &body[0];
    assert_eq!(asset["file"], "assets/Harbour_View.png");
    assert_eq!(asset["filename_orig"], "Harbour View.png");
    assert_eq!(asset["created_by"], "editor@example.org");
    let stored = std::fs::read(server.media_root.join("assets/Harbour_View.png")).unwrap();
    assert_eq!(stored, png);
}

#[tokio::test]
async fn upload_without_user_header_has_empty_uploader() {
    let server = test_server();
    let png = png_bytes(4, 4);
    let (status, body) = send_json(&server.app, upload_request(&[("a.png", png.as_slice())], None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body[0]["created_by"], "");
}

#[tokio::test]
async fn invalid_file_rejects_whole_upload() {
    let server = test_server();
    let png = png_bytes(4, 4);
    let (status, body) = send_json(
        &server.app,
        upload_request(
            &[("good.png", png.as_slice()), ("fake.png", b"I am text".as_slice())],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "errors": [{
                "file": "fake.png",
                "message": "Unsupported file type. Valid mime types: `image/svg+xml, image/jpeg, image/png, image/webp`, got `text/plain`!"
            }]
        })
    );
    assert_eq!(file_count(&server.media_root.join("assets")), 0);
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let server = test_server();
    let request = Request::post("/api/asset")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(format!("--{}--\r\n", BOUNDARY)))
        .unwrap();
    let (status, _) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rendition_is_generated_and_served() {
    let server = test_server();
    let png = png_bytes(120, 60);
    let (status, _) = send(&server.app, upload_request(&[("photo.png", png.as_slice())], None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(&server.app, get("/api/rendition?file=assets/photo.png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "url": "/media/renditions/photo.png.webp",
            "width": 60,
            "height": 30
        })
    );

    let (status, bytes) = send(&server.app, get("/media/renditions/photo.png.webp")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::WebP
    );
}

#[tokio::test]
async fn svg_rendition_points_at_original() {
    let server = test_server();
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
    let (status, _) = send(&server.app, upload_request(&[("logo.svg", svg.as_slice())], None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send_json(&server.app, get("/api/rendition?file=assets/logo.svg")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "url": "/media/assets/logo.svg", "width": null, "height": null })
    );
}

#[tokio::test]
async fn undecodable_original_has_no_rendition() {
    let server = test_server();
    let assets = server.media_root.join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("broken.png"), b"\x89PNG\r\n\x1a\ngarbage").unwrap();
    let (status, body) = send_json(&server.app, get("/api/rendition?file=assets/broken.png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn unknown_or_invalid_keys_are_not_found() {
    let server = test_server();
    let (status, _) = send(&server.app, get("/api/rendition?file=assets/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&server.app, get("/api/rendition?file=../secret.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn purge_reports_removed_renditions() {
    let server = test_server();
    let png = png_bytes(100, 100);
    send(&server.app, upload_request(&[("a.png", png.as_slice()), ("b.png", png.as_slice())], None)).await;
    send(&server.app, get("/api/rendition?file=assets/a.png")).await;

    let request = Request::post("/api/rendition/purge")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "files": ["assets/a.png", "assets/b.png"] }).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(&server.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "purged": 1 }));
    assert_eq!(file_count(&server.media_root.join("renditions")), 0);
}

#[tokio::test]
async fn branding_is_served_from_config() {
    let server = test_server();
    let (status, body) = send_json(&server.app, get("/api/branding")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization_name_en"], "Example Corp");
    assert_eq!(body["abbreviation"], "ACME");
    assert_eq!(body["logo"], "branding/logo.svg");
    assert_eq!(body["favicon"], Value::Null);
}

#[tokio::test]
async fn renditions_are_not_rendered_again() {
    let server = test_server();
    let png = png_bytes(120, 60);
    send(&server.app, upload_request(&[("a.png", png.as_slice())], None)).await;
    let (status, _) = send(&server.app, get("/api/rendition?file=assets/a.png")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&server.app, get("/api/rendition?file=renditions/a.png.webp")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(file_count(&server.media_root.join("renditions")), 1);

    let request = Request::post("/api/rendition/purge")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "files": ["renditions/a.png.webp"] }).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&server.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(file_count(&server.media_root.join("renditions")), 1);
}
