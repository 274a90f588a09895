use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use detect_common::AppConfig;
use serde_json::{Value, json};
use server::{AppState, router};
use tower::ServiceExt;

/// Enough of a PNG for format sniffing
const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

const FAKE_DETECT: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --source) src="$2"; shift ;;
    --project) project="$2"; shift ;;
    --name) name="$2"; shift ;;
  esac
  shift
done
mkdir -p "$project/$name"
cp "$src" "$project/$name/"
"#;

fn config_for(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.paths.base_dir = dir.to_path_buf();
    config.python.interpreter = Some(PathBuf::from("sh"));
    config
}

fn install_detect(config: &AppConfig, script: &str) {
    let layout = config.layout();
    fs::create_dir_all(&layout.yolo_dir).unwrap();
    fs::write(layout.weights_path(&config.detection.weights), b"weights").unwrap();
    fs::write(layout.detect_script(), script).unwrap();
}

fn app(config: AppConfig) -> Router {
    router(Arc::new(AppState::new(config).unwrap()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn predict(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn index_serves_upload_page() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(app(config_for(dir.path())), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("/predict"));
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(app(config_for(dir.path())), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({ "status": "ok" }));
}

#[tokio::test]
async fn startup_creates_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let _app = app(config_for(dir.path()));
    assert!(dir.path().join("data").is_dir());
}

#[tokio::test]
async fn train_is_disabled_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(app(config_for(dir.path())), get("/train")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Training disabled. Use /predict with my_model.pt");
}

#[tokio::test]
async fn enabled_train_without_dataset_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.training.enabled = true;

    let (status, body) = send(app(config), get("/train")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("data.zip not found"));
}

#[tokio::test]
async fn predict_requires_image_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(config_for(dir.path()));

    for body in [r#"{}"#, r#"{"img": "abc"}"#, "this is not json", ""] {
        let (status, response) = send(app.clone(), predict(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(
            json_body(&response),
            json!({ "error": "Send JSON with key 'image' (base64)." })
        );
    }
}

#[tokio::test]
async fn predict_rejects_non_string_image() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(config_for(dir.path()));

    for body in [r#"{"image": 123}"#, r#"{"image": null}"#, r#"{"image": ["abc"]}"#] {
        let (status, response) = send(app.clone(), predict(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(
            json_body(&response),
            json!({ "error": "'image' must be a base64 string." })
        );
    }
}

#[tokio::test]
async fn predict_rejects_bad_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(config_for(dir.path()));

    let (status, body) = send(app.clone(), predict(json!({ "image": "%%%" }).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("base64"));

    let text = STANDARD.encode(b"just some text");
    let (status, body) = send(app, predict(json!({ "image": text }).to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("not a recognised image"));
}

#[tokio::test]
async fn predict_without_model_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let request = predict(json!({ "image": STANDARD.encode(PNG_BYTES) }).to_string());

    let (status, body) = send(app(config), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(&body)["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Model not found:"), "{}", error);
    assert!(error.ends_with("my_model.pt"));
    // the upload is written before detection runs
    assert_eq!(fs::read(dir.path().join("data/inputImage.jpg")).unwrap(), PNG_BYTES);
}

#[cfg(unix)]
#[tokio::test]
async fn predict_returns_annotated_image() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    install_detect(&config, FAKE_DETECT);

    let request = predict(json!({ "image": STANDARD.encode(PNG_BYTES) }).to_string());
    let (status, body) = send(app(config), request).await;

    assert_eq!(status, StatusCode::OK);
    let image = json_body(&body)["image"].as_str().unwrap().to_string();
    assert_eq!(STANDARD.decode(image).unwrap(), PNG_BYTES);
    assert!(dir.path().join("yolov5/runs/detect/result/inputImage.jpg").exists());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_predicts_get_their_own_image() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    install_detect(&config, &format!("sleep 0.2\n{}", FAKE_DETECT));
    let app = app(config);

    let first = PNG_BYTES.to_vec();
    let mut second = PNG_BYTES.to_vec();
    second.extend_from_slice(b"second upload");

    let (a, b) = tokio::join!(
        send(app.clone(), predict(json!({ "image": STANDARD.encode(&first) }).to_string())),
        send(app.clone(), predict(json!({ "image": STANDARD.encode(&second) }).to_string())),
    );

    for ((status, body), expected) in [(a, first), (b, second)] {
        assert_eq!(status, StatusCode::OK);
        let image = json_body(&body)["image"].as_str().unwrap().to_string();
        assert_eq!(STANDARD.decode(image).unwrap(), expected);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn predict_accepts_data_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    install_detect(&config, FAKE_DETECT);

    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES));
    let (status, _) = send(app(config), predict(json!({ "image": data_url }).to_string())).await;
    assert_eq!(status, StatusCode::OK);
}

#[cfg(unix)]
#[tokio::test]
async fn predict_surfaces_detect_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    install_detect(&config, "echo 'No module named torch' >&2\nexit 1\n");

    let request = predict(json!({ "image": STANDARD.encode(PNG_BYTES) }).to_string());
    let (status, body) = send(app(config), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = json_body(&body)["error"].as_str().unwrap().to_string();
    assert!(error.contains("STDERR:\nNo module named torch"), "{}", error);
}

#[cfg(unix)]
#[tokio::test]
async fn predict_reports_missing_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    install_detect(&config, "exit 0\n");

    let request = predict(json!({ "image": STANDARD.encode(PNG_BYTES) }).to_string());
    let (status, body) = send(app(config), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(&body);
    assert_eq!(body["error"], "Detection ran but output image not found.");
    assert!(body["expected"].as_str().unwrap().ends_with("runs/detect/result/inputImage.jpg"));
    assert!(body["hint"].as_str().unwrap().contains("runs/detect/result"));
}

#[cfg(unix)]
#[tokio::test]
async fn live_runs_webcam_detection() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    install_detect(&config, "[ \"$7\" = \"--source\" ] && [ \"$8\" = \"0\" ] || exit 4\n");

    let (status, body) = send(app(config), get("/live")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Camera starting!!");
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app(config_for(dir.path())).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
