
    use super::*;
    use autodeck_core::mock_provider::MockProvider;
    use autodeck_core::{MemoryWorkflowStore, Orchestrator, OrchestratorConfig};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(MockProvider::new()),
            Arc::new(MemoryWorkflowStore::new()),
            OrchestratorConfig::default(),
        );
        create_router(Arc::new(AppState::new(orchestrator)))
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(json!({}));
        (status, json)
    }

    #[tokio::test]
    async fn test_known_get_routes_are_wired() {
        let app = test_app();
        json_request(
            app.clone(),
            Method::POST,
            "/jobs",
            Some(json!({"kind": "snapshot-suite"})),
        )
        .await;
        json_request(
            app.clone(),
            Method::POST,
            "/workflows",
            Some(json!({
                "name": "smoke",
                "steps": [{"type": "sleep", "duration_ms": 5}],
            })),
        )
        .await;
        json_request(app.clone(), Method::POST, "/snapshots/ui", None).await;

        for path in [
            "/health",
            "/devices",
            "/metrics",
            "/jobs",
            "/jobs/1",
            "/workflows",
            "/workflows/smoke",
            "/workflows/export",
            "/events/history",
            "/snapshots",
            "/snapshots/ui",
        ] {
            let (status, _) = json_request(app.clone(), Method::GET, path, None).await;
            assert_eq!(status, StatusCode::OK, "unexpected status for {path}");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let app = test_app();
        let (status, _) = json_request(app, Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_returns_405() {
        let app = test_app();
        let (status, _) = json_request(app, Method::DELETE, "/jobs", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_before_handlers() {
        let app = test_app();
        let document = json!({
            "name": "big",
            "steps": [{"type": "sleep", "duration_ms": 5}],
            "description": "x".repeat(MAX_BODY_BYTES),
        });

        let (status, _) = json_request(app, Method::POST, "/workflows", Some(document)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_preflight_lists_allowed_methods() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/jobs")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let allowed = response.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap();
        assert!(allowed.contains("POST"), "allowed methods: {allowed}");
    }
