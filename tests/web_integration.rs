use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use rust_signage::config::Configuration;
use rust_signage::web::{router, serve};
use rust_signage::{MediaDescriptor, Playlist};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D, b'I', b'H', b'D', b'R'];
const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00";

fn config_for(root: &Path) -> Configuration {
    Configuration {
        media_root: root.to_path_buf(),
        ..Configuration::default()
    }
    .validated()
    .unwrap()
}

async fn get(cfg: &Configuration, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = router(cfg)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, body.to_vec())
}

#[tokio::test]
async fn root_playlist_is_json_array() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.png"), PNG).unwrap();
    fs::write(tmp.path().join("notes.txt"), b"todo").unwrap();
    let cfg = config_for(tmp.path());

    for uri in ["/api/files", "/api/files/"] {
        let (status, content_type, body) = get(&cfg, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let playlist: Playlist = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            playlist,
            Playlist::new(vec![MediaDescriptor {
                content_type: "image/png".into(),
                url: "/resources/a.png".into(),
            }])
        );
    }
}

#[tokio::test]
async fn scoped_playlist_uses_folder_urls() {
    let tmp = tempdir().unwrap();
    let lobby = tmp.path().join("lobby");
    fs::create_dir_all(&lobby).unwrap();
    fs::write(lobby.join("welcome.gif"), GIF).unwrap();
    let cfg = config_for(tmp.path());

    let (status, _, body) = get(&cfg, "/api/files/lobby").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{ "type": "image/gif", "url": "/resources/lobby/welcome.gif" }])
    );
}

#[tokio::test]
async fn missing_directories_are_plain_text_404() {
    let tmp = tempdir().unwrap();
    let cfg = config_for(tmp.path());

    for uri in ["/api/files/nowhere", "/api/files/%2E%2E"] {
        let (status, content_type, body) = get(&cfg, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(content_type.unwrap().starts_with("text/plain"));
        assert_eq!(body, b"Not found.");
    }

    let cfg = config_for(&tmp.path().join("absent-root"));
    let (status, _, _) = get(&cfg, "/api/files").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn scan_failure_is_a_server_error() {
    let tmp = tempdir().unwrap();
    std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling.png")).unwrap();
    let cfg = config_for(tmp.path());

    let (status, _, _) = get(&cfg, "/api/files").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // The service keeps answering after a failed scan.
    let (status, _, _) = get(&cfg, "/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn page_shell_served_for_root_and_precise() {
    let tmp = tempdir().unwrap();
    let cfg = config_for(tmp.path());

    let (status, content_type, root) = get(&cfg, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    let (status, _, precise) = get(&cfg, "/precise/lobby").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root, precise);

    let page = String::from_utf8(root).unwrap();
    assert!(page.contains("const SLIDE_MS = 15000"));
    assert!(page.contains("const RETRY_SECS = 60"));
}

#[tokio::test]
async fn media_bytes_and_assets_are_served() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.png"), PNG).unwrap();
    let cfg = config_for(tmp.path());

    let (status, _, body) = get(&cfg, "/resources/a.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG);

    let (status, content_type, _) = get(&cfg, "/assets/page.css").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/css"));
}

#[tokio::test]
async fn playlist_is_gzipped_with_security_headers() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("a.png"), PNG).unwrap();
    fs::write(tmp.path().join("b.png"), PNG).unwrap();
    let cfg = config_for(tmp.path());

    let response = router(&cfg)
        .oneshot(
            Request::builder()
                .uri("/api/files")
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
    assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "SAMEORIGIN");

    // Media bytes go out untouched.
    let response = router(&cfg)
        .oneshot(
            Request::builder()
                .uri("/resources/a.png")
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
}

fn serving_config(root: &Path, port: u16) -> Configuration {
    Configuration {
        media_root: root.to_path_buf(),
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port,
        shutdown_grace: Duration::from_millis(200),
        ..Configuration::default()
    }
    .validated()
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serve_returns_after_cancel() {
    let tmp = tempdir().unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(serve(serving_config(tmp.path(), 0), cancel.clone()));

    sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "server stopped before cancel");
    cancel.cancel();

    let res = timeout(Duration::from_secs(2), handle)
        .await
        .expect("timeout waiting for server shutdown")
        .expect("server task panicked");
    assert!(res.is_ok(), "unexpected error: {res:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_request_does_not_outlive_grace_period() {
    let tmp = tempdir().unwrap();
    let port = {
        let spare = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        spare.local_addr().unwrap().port()
    };
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(serve(serving_config(tmp.path(), port), cancel.clone()));

    // Headers never finish, so the connection stays busy through shutdown.
    let mut stream = None;
    for _ in 0..50 {
        if let Ok(s) = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await {
            stream = Some(s);
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    let mut stream = stream.expect("server never accepted a connection");
    stream.write_all(b"GET /api/files HTTP/1.1\r\nHost: localhost\r\n").await.unwrap();
    sleep(Duration::from_millis(50)).await;

    cancel.cancel();
    let res = timeout(Duration::from_secs(2), handle)
        .await
        .expect("grace period was not enforced")
        .expect("server task panicked");
    assert!(res.is_ok(), "unexpected error: {res:?}");
    drop(stream);
}
