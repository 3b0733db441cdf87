//! Router tests for the HTTP surface.

#[cfg(test)]
mod http_tests {
    use std::fs;
    use std::path::Path;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::model::artifacts::{METADATA_FILE, MODEL_FILE, PREPROCESSOR_FILE};
    use crate::{create_router, AppState, Config};

    fn write(dir: &Path, file: &str, value: Value) {
        fs::write(dir.join(file), serde_json::to_vec_pretty(&value).unwrap()).unwrap();
    }

    /// SGD-style artifacts: rating = 4.0 + 0.25 for GAME, - 1.5 for TOOLS.
    fn write_artifacts(dir: &Path) {
        write(dir, METADATA_FILE, json!({
            "model_name": "SGD Regressor",
            "model_type": "sgd",
            "test_rmse": 0.491234,
            "test_r2": 0.052345,
            "test_mae": 0.334567,
            "features": ["Reviews", "Size_MB", "Installs_Num", "Price_USD", "Is_Free", "Category"]
        }));
        write(dir, MODEL_FILE, json!({
            "kind": "linear",
            "intercept": 4.0,
            "coefficients": [0.0, 0.0, 0.0, 0.0, 0.0, 0.25, -1.5]
        }));
        write(dir, PREPROCESSOR_FILE, json!({
            "scaler": {"mean": [0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1]},
            "encoder": {"categories": ["GAME", "TOOLS"]}
        }));
    }

    fn app_for(dir: &Path, preload: bool) -> Router {
        let config = Config {
            model_dir: dir.to_path_buf(),
            preload_preprocessor: preload,
            ..Config::default()
        };
        create_router(AppState::from_config(config))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn sample(category: &str) -> Value {
        json!({
            "reviews": 50000,
            "size_mb": 25.5,
            "installs": 1000000,
            "price": 0.0,
            "is_free": 1,
            "category": category
        })
    }

    #[tokio::test]
    async fn test_root_info() {
        let dir = TempDir::new().unwrap();
        let (status, body) = send(app_for(dir.path(), true), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
        assert_eq!(body["endpoints"]["health"], "/health");
    }

    #[tokio::test]
    async fn test_healthy_model() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let (status, body) = send(app_for(dir.path(), true), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["model_name"], "SGD Regressor");
        assert_eq!(body["model_type"], "sgd");
    }

    #[tokio::test]
    async fn test_model_info_rounds_metrics() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let (status, body) = send(app_for(dir.path(), true), Method::GET, "/model-info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["performance"]["test_rmse"], 0.4912);
        assert_eq!(body["performance"]["test_r2"], 0.0523);
        assert_eq!(body["performance"]["test_mae"], 0.3346);
        assert_eq!(body["features"][5], "Category");
    }

    #[tokio::test]
    async fn test_predict_valid_input() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let (status, body) = send(app_for(dir.path(), true), Method::POST, "/predict", Some(sample("game"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_rating"], 4.25);
        assert_eq!(body["model_name"], "SGD Regressor");
        assert_eq!(body["confidence"], "high");
    }

    #[tokio::test]
    async fn test_predict_low_rating_with_lazy_preprocessor() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let (status, body) = send(app_for(dir.path(), false), Method::POST, "/predict", Some(sample("TOOLS"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["predicted_rating"], 2.5);
        assert_eq!(body["confidence"], "low");
    }

    #[tokio::test]
    async fn test_lazy_preprocessor_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());
        fs::remove_file(dir.path().join(PREPROCESSOR_FILE)).unwrap();

        let app = app_for(dir.path(), false);
        let (status, body) = send(app, Method::POST, "/predict", Some(sample("GAME"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Prediction error:"));
    }

    #[tokio::test]
    async fn test_predict_rejects_every_invalid_field() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let mut input = sample("GAME");
        input["reviews"] = json!(200000000);
        input["is_free"] = json!(2);
        input.as_object_mut().unwrap().remove("category");

        let (status, body) = send(app_for(dir.path(), true), Method::POST, "/predict", Some(input)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let violations = body["violations"].as_array().unwrap();
        let fields: Vec<&str> = violations.iter().map(|v| v["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["reviews", "is_free", "category"]);
        assert_eq!(violations[2]["kind"], "missing");
        assert_eq!(violations[0]["kind"], "out_of_range");
    }

    #[tokio::test]
    async fn test_unloaded_model() {
        let dir = TempDir::new().unwrap();
        let app = app_for(&dir.path().join("missing"), true);

        let (status, body) = send(app.clone(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["message"], "Model not loaded");

        let (status, _) = send(app.clone(), Method::GET, "/model-info", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = send(app, Method::POST, "/predict", Some(sample("GAME"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_validation_runs_before_model_check() {
        let dir = TempDir::new().unwrap();
        let app = app_for(&dir.path().join("missing"), true);

        let (status, _) = send(app, Method::POST, "/predict", Some(json!({"reviews": -5}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app_for(dir.path(), true).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_array_body_is_malformed() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());

        let body = json!([50000, 25.5, 1000000, 0.0, 1, "GAME"]);
        let (status, body) = send(app_for(dir.path(), true), Method::POST, "/predict", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert!(body.get("violations").is_none());
    }

    #[tokio::test]
    async fn test_kind_and_model_shape_mismatch_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        write_artifacts(dir.path());
        let mut metadata: Value = serde_json::from_slice(&fs::read(dir.path().join(METADATA_FILE)).unwrap()).unwrap();
        metadata["model_type"] = json!("random_forest");
        write(dir.path(), METADATA_FILE, metadata);

        let app = app_for(dir.path(), true);
        let (status, body) = send(app.clone(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");

        let (status, _) = send(app, Method::POST, "/predict", Some(sample("GAME"))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
