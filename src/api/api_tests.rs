#[cfg(test)]
mod profile_api_tests {
    use std::collections::HashMap;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use std::time::Duration;

    use axum::routing::get as get_route;

    use crate::api::{app_state::AppState, create_router, with_request_timeout};
    use crate::config::config::AppConfig;
    use crate::security::auth::JwtTokenGenerator;

    const BOUNDARY: &str = "gitconnect-test-boundary";
    const MIB: usize = 1024 * 1024;

    async fn app() -> (Router, AppConfig, TempDir) {
        app_with(|_| {}).await
    }

    async fn app_with(tweak: impl FnOnce(&mut AppConfig)) -> (Router, AppConfig, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::development();
        tweak(&mut config);
        config.assets.root = dir.path().to_path_buf();
        config.security.api_keys = HashMap::from([
            ("key-7".to_string(), "7".to_string()),
            ("key-8".to_string(), "8".to_string()),
        ]);

        let state = AppState::from_config(config.clone()).await.unwrap();
        (create_router(state), config, dir)
    }

    fn json_request(method: &str, uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = api_key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn upload(api_key: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"profile_picture\"; \
             filename=\"me\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/profiles/picture")
            .header("X-API-Key", api_key)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn create(app: &Router, key: &str, name: &str) -> Value {
        let (status, body) = send(
            app,
            json_request("POST", "/api/profiles", Some(key), json!({"display_name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let (app, _, dir) = app().await;

        let created = create(&app, "key-7", "Ada").await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["account_id"], "7");
        assert!(created["picture"].is_null());

        let (status, body) = send(
            &app,
            json_request("POST", "/api/profiles", Some("key-7"), json!({"display_name": "Again"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, updated) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/profiles/{id}"),
                Some("key-7"),
                json!({"bio": "Analytical engines"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["bio"], "Analytical engines");
        assert_eq!(updated["display_name"], "Ada");
        let stamp = |v: &Value| {
            serde_json::from_value::<DateTime<Utc>>(v["updated_at"].clone()).unwrap()
        };
        assert!(stamp(&updated) > stamp(&created));

        let (status, uploaded) = send(&app, upload("key-7", "image/jpeg", &vec![0xFF; 3 * MIB])).await;
        assert_eq!(status, StatusCode::OK, "{uploaded}");
        let picture = uploaded["picture"].as_str().unwrap().to_string();
        assert!(picture.ends_with(".jpg"));
        assert!(dir.path().join(&picture).exists());

        let (status, fetched) = send(&app, get(&format!("/api/profiles/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["picture"], picture.as_str());

        let (status, deleted) = send(
            &app,
            json_request("DELETE", &format!("/api/profiles/{id}"), Some("key-7"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["id"], id.as_str());
        assert!(!dir.path().join(&picture).exists());

        let (status, body) = send(&app, get(&format!("/api/profiles/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_mutations_require_credentials() {
        let (app, _, _dir) = app().await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/profiles", None, json!({"display_name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = send(
            &app,
            json_request("POST", "/api/profiles", Some("wrong"), json!({"display_name": "Ada"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, get("/api/profiles/me")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bearer_token_authenticates() {
        let (app, config, _dir) = app().await;
        let token = JwtTokenGenerator::from_settings(&config.security, 300)
            .generate_token("8")
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/profiles")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"display_name": "Bob"}).to_string()))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["account_id"], "8");
    }

    #[tokio::test]
    async fn test_other_accounts_cannot_mutate() {
        let (app, _, _dir) = app().await;
        let created = create(&app, "key-7", "Ada").await;
        let id = created["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/profiles/{id}"),
                Some("key-8"),
                json!({"display_name": "Mallory"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, _) = send(
            &app,
            json_request("DELETE", &format!("/api/profiles/{id}"), Some("key-8"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/profiles",
                Some("key-8"),
                json!({"account_id": "7", "display_name": "Impostor"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    }

    #[tokio::test]
    async fn test_invalid_bodies_are_bad_requests() {
        let (app, _, _dir) = app().await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/profiles", Some("key-7"), json!({"display_name": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = send(
            &app,
            json_request("POST", "/api/profiles", Some("key-7"), json!({"bio": "no name"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_me_and_listing() {
        let (app, _, _dir) = app().await;
        create(&app, "key-7", "Ada").await;
        create(&app, "key-8", "Bob").await;

        let me = Request::builder()
            .uri("/api/profiles/me")
            .header("X-API-Key", "key-8")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, me).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Bob");

        let (status, body) = send(&app, get("/api/profiles")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["profiles"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, get("/api/profiles?page=2&page_size=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["profiles"].as_array().unwrap().len(), 1);
        assert_eq!(body["page"], 2);

        let (status, _) = send(&app, get("/api/profiles?page=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let (app, _, dir) = app().await;

        // no profile yet
        let (status, _) = send(&app, upload("key-7", "image/png", b"png")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        create(&app, "key-7", "Ada").await;

        let (status, body) = send(&app, upload("key-7", "application/pdf", b"%PDF")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");

        let (status, body) = send(&app, upload("key-7", "image/png", &vec![0; 5 * MIB + 1])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_larger_than_request_limit() {
        let (app, _, dir) = app().await;
        create(&app, "key-7", "Ada").await;

        let (status, body) = send(&app, upload("key-7", "image/png", &vec![0; 7 * MIB])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_body_limit_below_picture_limit() {
        let (app, _, dir) = app_with(|c| c.server.max_request_size = MIB).await;
        create(&app, "key-7", "Ada").await;

        let (status, body) = send(&app, upload("key-7", "image/png", &vec![0; 2 * MIB])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_legacy_create_body() {
        let (app, _, _dir) = app().await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/profiles",
                Some("key-7"),
                json!({"full_name": "Ada", "user_id": 7, "bio": "engines"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["account_id"], "7");
        assert_eq!(body["display_name"], "Ada");
    }

    #[tokio::test]
    async fn test_timeout_returns_structured_error() {
        let app: Router = with_request_timeout(
            Router::new().route(
                "/slow",
                get_route(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            ),
            Duration::from_millis(10),
        );

        let (status, body) = send(&app, get("/slow")).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(body["code"], "TIMEOUT");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_docs_and_health() {
        let (app, _, _dir) = app().await;

        let (status, body) = send(&app, get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/profiles"].is_object());

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let (app, _, _dir) = app().await;
        let response = app.oneshot(get("/api/profiles")).await.unwrap();
        assert_eq!(
            response.headers().get("X-Content-Type-Options").unwrap(),
            "nosniff"
        );
    }
}
