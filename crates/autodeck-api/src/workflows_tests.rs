
    use super::*;
    use crate::routes::create_router;
    use crate::state::AppState;
    use autodeck_core::mock_provider::MockProvider;
    use autodeck_core::{
        FileWorkflowStore, MemoryWorkflowStore, Orchestrator, OrchestratorConfig, WorkflowStore,
    };
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(MockProvider::new()),
            Arc::new(MemoryWorkflowStore::new()),
            OrchestratorConfig::default(),
        );
        create_router(Arc::new(AppState::new(orchestrator)))
    }

    fn app_over_store(store: Arc<dyn WorkflowStore>) -> Router {
        let orchestrator = Orchestrator::new(
            Arc::new(MockProvider::new()),
            store,
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

    fn smoke_workflow(name: &str) -> Value {
        json!({
            "name": name,
            "steps": [
                {"type": "open-url", "url": "https://example.com"},
                {"type": "sleep", "duration_ms": 5},
            ],
        })
    }

    async fn save(app: &Router, document: Value) -> (StatusCode, Value) {
        json_request(app.clone(), Method::POST, "/workflows", Some(document)).await
    }

    #[tokio::test]
    async fn test_save_and_fetch_workflow() {
        let app = test_app();
        let (status, body) = save(&app, smoke_workflow("smoke")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["workflow"]["name"], "smoke");
        assert_eq!(body["workflow"]["steps"].as_array().unwrap().len(), 2);

        let (status, body) = json_request(app, Method::GET, "/workflows/smoke", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workflow"]["name"], "smoke");
        assert_eq!(body["workflow"]["steps"][0]["type"], "open-url");
    }

    #[tokio::test]
    async fn test_save_rejects_empty_steps() {
        let app = test_app();
        let (status, body) = save(&app, json!({"name": "empty", "steps": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn test_save_rejects_bad_name() {
        let app = test_app();
        let document = json!({
            "name": "has space",
            "steps": [{"type": "sleep", "duration_ms": 5}],
        });
        let (status, body) = save(&app, document).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation");
    }

    #[tokio::test]
    async fn test_get_missing_workflow() {
        let app = test_app();
        let (status, body) = json_request(app, Method::GET, "/workflows/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not-found");
    }

    #[tokio::test]
    async fn test_list_workflows_sorted_by_name() {
        let app = test_app();
        save(&app, smoke_workflow("zulu")).await;
        save(&app, smoke_workflow("alpha")).await;

        let (status, body) = json_request(app, Method::GET, "/workflows", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["workflows"][0]["name"], "alpha");
        assert_eq!(body["workflows"][1]["name"], "zulu");
    }

    #[tokio::test]
    async fn test_delete_workflow() {
        let app = test_app();
        save(&app, smoke_workflow("doomed")).await;

        let (status, _) =
            json_request(app.clone(), Method::DELETE, "/workflows/doomed", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = json_request(app.clone(), Method::GET, "/workflows/doomed", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = json_request(app, Method::DELETE, "/workflows/doomed", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not-found");
    }

    #[tokio::test]
    async fn test_run_workflow_without_body() {
        let app = test_app();
        save(&app, smoke_workflow("smoke")).await;

        let (status, body) =
            json_request(app.clone(), Method::POST, "/workflows/smoke/run", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["job"]["kind"], "workflow-run");
        assert_eq!(body["job"]["input"]["name"], "smoke");

        let id = body["job"]["id"].as_u64().unwrap();
        for _ in 0..200 {
            let (_, body) =
                json_request(app.clone(), Method::GET, &format!("/jobs/{id}"), None).await;
            if body["job"]["status"] == "completed" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("workflow run never completed");
    }

    #[tokio::test]
    async fn test_run_workflow_with_device_id() {
        let app = test_app();
        save(&app, smoke_workflow("smoke")).await;

        let (status, body) = json_request(
            app,
            Method::POST,
            "/workflows/smoke/run",
            Some(json!({"device_id": "sim-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["job"]["input"]["device_id"], "sim-1");
    }

    #[tokio::test]
    async fn test_run_missing_workflow() {
        let app = test_app();
        let (status, body) = json_request(app, Method::POST, "/workflows/ghost/run", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not-found");
    }

    #[tokio::test]
    async fn test_import_skips_malformed_entries() {
        let app = test_app();
        let batch = json!({
            "workflows": [
                smoke_workflow("good-one"),
                smoke_workflow("good-two"),
                {"name": "bad", "steps": []},
            ],
        });

        let (status, body) =
            json_request(app.clone(), Method::POST, "/workflows/import", Some(batch)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], json!(["good-one", "good-two"]));
        assert_eq!(body["skipped"].as_array().unwrap().len(), 1);
        assert_eq!(body["skipped"][0]["index"], 2);
        assert_eq!(body["skipped"][0]["name"], "bad");

        let (_, body) = json_request(app, Method::GET, "/workflows", None).await;
        assert_eq!(body["count"], 2);
    }

    #[tokio::test]
    async fn test_import_replace_clears_existing() {
        let app = test_app();
        save(&app, smoke_workflow("old")).await;

        let batch = json!({"workflows": [smoke_workflow("fresh")]});
        let (status, _) = json_request(
            app.clone(),
            Method::POST,
            "/workflows/import?replace=true",
            Some(batch),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = json_request(app, Method::GET, "/workflows", None).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["workflows"][0]["name"], "fresh");
    }

    #[tokio::test]
    async fn test_export_returns_name_keyed_mapping() {
        let app = test_app();
        save(&app, smoke_workflow("alpha")).await;
        save(&app, smoke_workflow("beta")).await;

        let (status, body) = json_request(app, Method::GET, "/workflows/export", None).await;
        assert_eq!(status, StatusCode::OK);
        let mapping = body.as_object().unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(body["alpha"]["name"], "alpha");
        assert!(body["beta"]["steps"].is_array());
    }

    #[tokio::test]
    async fn test_workflows_survive_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.json");

        let store = Arc::new(FileWorkflowStore::open(&path).await.unwrap());
        let app = app_over_store(store);
        let (status, _) = save(&app, smoke_workflow("durable")).await;
        assert_eq!(status, StatusCode::CREATED);
        drop(app);

        let store = Arc::new(FileWorkflowStore::open(&path).await.unwrap());
        let app = app_over_store(store);
        let (status, body) = json_request(app, Method::GET, "/workflows/durable", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workflow"]["name"], "durable");
    }
