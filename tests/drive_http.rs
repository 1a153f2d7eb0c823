use axum::body::Bytes;
use axum::extract::{Path, RawQuery};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use drivefolder_cli::auth::{CredentialBundle, DRIVE_SCOPE};
use drivefolder_cli::catalog::FolderCatalog;
use drivefolder_cli::config::Config;
use drivefolder_cli::error::{AuthError, Error};
use drivefolder_cli::objects::ObjectManager;
use drivefolder_cli::transfer::{NoProgress, TransferEngine};
use drivefolder_cli::Session;
use std::net::SocketAddr;
use tempfile::tempdir;

const TOKEN: &str = "tok-123";
const BLOB: &[u8] = b"remote bytes \x00\x01\x02 end";

fn json(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn not_found(id: &str) -> Response {
    json(
        StatusCode::NOT_FOUND,
        format!(r#"{{"error":{{"code":404,"message":"File not found: {id}."}}}}"#),
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {TOKEN}"))
        .unwrap_or(false)
}

async fn token(body: String) -> Response {
    if body.contains("grant_type=refresh_token") && body.contains("refresh_token=good") {
        json(
            StatusCode::OK,
            format!(r#"{{"access_token":"{TOKEN}","expires_in":3599,"token_type":"Bearer"}}"#),
        )
    } else {
        json(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Bad Request"}"#.to_string(),
        )
    }
}

async fn list(headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let query = query.unwrap_or_default();
    if !query.contains("in+parents") && !query.contains("in%20parents") {
        return json(StatusCode::BAD_REQUEST, r#"{"error":{"message":"bad q"}}"#.into());
    }
    if query.contains("pageToken=p2") {
        json(
            StatusCode::OK,
            r#"{"files":[{"id":"a3","name":"Plan","mimeType":"application/vnd.google-apps.document"}]}"#.into(),
        )
    } else {
        json(
            StatusCode::OK,
            r#"{"nextPageToken":"p2","files":[
                {"id":"a1","name":"report.pdf","mimeType":"application/pdf","size":"2048"},
                {"id":"a2","name":"notes.txt","mimeType":"text/plain","size":"10"}]}"#
                .into(),
        )
    }
}

async fn media(Path(id): Path<String>, RawQuery(query): RawQuery) -> Response {
    if id == "a1" && query.as_deref() == Some("alt=media") {
        (StatusCode::OK, BLOB.to_vec()).into_response()
    } else {
        not_found(&id)
    }
}

async fn remove(Path(id): Path<String>) -> Response {
    if id == "a1" {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(&id)
    }
}

async fn upload(headers: HeaderMap, RawQuery(query): RawQuery, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let body = String::from_utf8_lossy(&body);
    let ok = authorized(&headers)
        && content_type.starts_with("multipart/related; boundary=")
        && query.unwrap_or_default().contains("uploadType=multipart")
        && body.contains(r#""name":"hello.txt""#)
        && body.contains(r#""parents":["folder-1"]"#)
        && body.contains("Content-Type: text/plain\r\n\r\nhello from disk");
    if ok {
        json(
            StatusCode::OK,
            r#"{"id":"new1","name":"hello.txt","mimeType":"text/plain","size":"15"}"#.into(),
        )
    } else {
        json(StatusCode::BAD_REQUEST, r#"{"error":{"message":"malformed upload"}}"#.into())
    }
}

fn start_mock_server() -> SocketAddr {
    let app = Router::new()
        .route("/token", post(token))
        .route("/drive/v3/files", get(list))
        .route("/drive/v3/files/:id", get(media).delete(remove))
        .route("/upload/drive/v3/files", post(upload));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        runtime.block_on(async move {
            axum::serve(listener, app).await.unwrap();
        })
    });
    addr
}

fn config(addr: SocketAddr) -> Config {
    Config {
        credentials_path: "unused.json".into(),
        folder_id: "folder-1".into(),
        api_base: format!("http://{addr}/drive/v3"),
        upload_base: format!("http://{addr}/upload/drive/v3"),
        timeout: Some(std::time::Duration::from_secs(10)),
    }
}

fn bundle(addr: SocketAddr, refresh_token: &str) -> CredentialBundle {
    CredentialBundle::parse(&format!(
        r#"{{"type":"authorized_user","client_id":"cid","client_secret":"secret",
            "refresh_token":"{refresh_token}","token_uri":"http://{addr}/token"}}"#
    ))
    .unwrap()
}

#[test]
fn full_cycle_against_mock_drive() {
    let addr = start_mock_server();
    let config = config(addr);
    let session = Session::open(&bundle(addr, "good"), DRIVE_SCOPE, &config).unwrap();

    let snapshot = FolderCatalog::list(&session, &config.folder_id).unwrap();
    let ids: Vec<&str> = snapshot.objects().iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "a3"]);
    assert_eq!(snapshot.objects()[0].size, Some(2048));
    assert_eq!(snapshot.objects()[2].size, None);

    let dir = tempdir().unwrap();
    let local = dir.path().join("hello.txt");
    std::fs::write(&local, b"hello from disk").unwrap();
    let created = TransferEngine::upload(&session, &local, &config.folder_id, NoProgress).unwrap();
    assert_eq!(created.id, "new1");
    assert_eq!(created.name, "hello.txt");

    let target = dir.path().join("report.pdf");
    let written = TransferEngine::download(&session, "a1", &target).unwrap();
    assert_eq!(written, BLOB.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), BLOB);

    ObjectManager::delete(&session, "a1").unwrap();
    match ObjectManager::delete(&session, "zz").unwrap_err() {
        Error::Delete { source, .. } => {
            assert_eq!(source.status(), Some(404));
            assert!(source.to_string().contains("File not found: zz."));
        }
        other => panic!("expected delete error, got {other:?}"),
    }
}

#[test]
fn missing_object_download_is_backend_error() {
    let addr = start_mock_server();
    let config = config(addr);
    let session = Session::open(&bundle(addr, "good"), DRIVE_SCOPE, &config).unwrap();
    let dir = tempdir().unwrap();
    let target = dir.path().join("nope.bin");

    let err = TransferEngine::download(&session, "nope", &target).unwrap_err();

    assert!(matches!(err, Error::Download { .. }));
    assert!(!target.exists());
}

#[test]
fn rejected_refresh_token_is_auth_error() {
    let addr = start_mock_server();
    let err = Session::open(&bundle(addr, "revoked"), DRIVE_SCOPE, &config(addr))
        .err()
        .expect("token exchange should fail");

    match err {
        Error::Auth(AuthError::Token(source)) => {
            assert_eq!(source.status(), Some(400));
            assert!(source.to_string().contains("invalid_grant"));
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}
