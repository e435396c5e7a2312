pub mod admin;
pub mod health;
pub mod history;
pub mod resume;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Upload flows
        .route("/api/resume/batch-upload", post(resume::batch_upload))
        .route("/api/resume/ai-score", post(resume::ai_score))
        .route(
            "/api/resume/generate-cover-letter",
            post(resume::generate_cover_letter),
        )
        // Per-user history
        .route("/api/auth/history", get(history::resume_history))
        .route("/api/auth/count", get(history::resume_count))
        .route("/api/auth/ai-score-history", get(history::ai_score_history))
        .route("/api/auth/ai-score-count", get(history::ai_score_count))
        // Admin
        .route("/api/admin/dashboard/stats", get(admin::dashboard_stats))
        .route("/api/admin/audit-logs", get(admin::audit_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::Claims;
    use crate::config::{BatchSettings, Config, ProviderSettings};
    use crate::extraction::{ExtractionError, TextExtractor};
    use crate::llm_client::testing::{registry_of, ScriptedProvider};
    use crate::store::memory::MemoryStore;

    const SECRET: &str = "route-test-secret";
    const BOUNDARY: &str = "XBOUNDARYX";

    /// One reply that satisfies both the parse and the score contract.
    const COMBINED_REPLY: &str = r#"{"fullName": "Ada Lovelace", "email": "ada@example.com",
        "postAppliedFor": "Engineer", "aiScore": 70, "positionMatch": true,
        "matchReasons": ["Relevant projects"], "mismatchReasons": ["No cloud experience"]}"#;

    struct ReadBackExtractor;

    #[async_trait]
    impl TextExtractor for ReadBackExtractor {
        async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
            crate::extraction::SourceFormat::from_path(path)?;
            Ok(std::fs::read_to_string(path)?)
        }
    }

    fn test_config(upload_dir: &Path) -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: SECRET.to_string(),
            port: 0,
            rust_log: "info".to_string(),
            upload_dir: upload_dir.to_path_buf(),
            max_upload_bytes: 1024 * 1024,
            batch: BatchSettings::default(),
            providers: ProviderSettings {
                gemini_api_key: String::new(),
                gemini_model: String::new(),
                openai_api_key: String::new(),
                openai_model: String::new(),
                nvidia_api_key: String::new(),
                nvidia_base_url: String::new(),
                deepseek_model: String::new(),
                llama_model: String::new(),
            },
            tesseract_path: "tesseract".to_string(),
        }
    }

    fn app(upload_dir: &Path, store: Arc<MemoryStore>) -> Router {
        let provider = Arc::new(ScriptedProvider::always(COMBINED_REPLY));
        let state = AppState::new(
            test_config(upload_dir),
            registry_of(provider),
            Arc::new(ReadBackExtractor),
            store,
        );
        build_router(state)
    }

    fn token(id: &str, role: &str) -> String {
        let claims = Claims {
            id: id.to_string(),
            role: role.to_string(),
            exp: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    enum Part<'a> {
        File(&'a str, &'a str, &'a str),
        Text(&'a str, &'a str),
    }

    fn multipart_body(parts: &[Part<'_>]) -> String {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match part {
                Part::File(field, name, content) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
                )),
                Part::Text(field, value) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
                )),
            }
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn upload(uri: &str, bearer: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("x-forwarded-for", "198.51.100.7");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(multipart_body(parts))).unwrap()
    }

    fn get_as(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_requires_token() {
        let dir = tempfile::tempdir().unwrap();
        let request = upload(
            "/api/resume/batch-upload",
            None,
            &[Part::File("resumes", "a.pdf", "Ada")],
        );
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_batch_upload_returns_results_and_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let request = upload(
            "/api/resume/batch-upload",
            Some(&token("user-7", "user")),
            &[
                Part::File("resumes", "ada.pdf", "Ada resume"),
                Part::File("resumes", "grace.docx", "Grace resume"),
                Part::Text("modelType", "llama"),
                Part::Text("jobDescription", "Software Engineer"),
            ],
        );

        let response = app(dir.path(), store.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["fileName"], "ada.pdf");
        assert_eq!(results[0]["modelType"], "llama");
        assert_eq!(results[1]["aiScore"], 70);

        assert_eq!(store.history.lock().unwrap().len(), 2);
        let audit = store.audit.lock().unwrap();
        assert_eq!(audit[0].user_id, "user-7");
        assert_eq!(audit[0].ip_address.as_deref(), Some("198.51.100.7"));
        // Temp artifacts are gone once the request completes.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let request = upload(
            "/api/resume/batch-upload",
            Some(&token("u", "user")),
            &[Part::Text("modelType", "gemini")],
        );
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "NO_FILES");
    }

    #[tokio::test]
    async fn test_failed_file_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let request = upload(
            "/api/resume/batch-upload",
            Some(&token("u", "user")),
            &[
                Part::File("resumes", "good.pdf", "Ada"),
                Part::File("resumes", "notes.txt", "plain text"),
            ],
        );
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"], "Some resumes failed");
        assert_eq!(body["errors"][0]["fileName"], "notes.txt");
        assert_eq!(body["errors"][0]["error"], "Unsupported file format: txt");
        assert_eq!(body["skipped"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_ai_score_requires_job_description() {
        let dir = tempfile::tempdir().unwrap();
        let request = upload(
            "/api/resume/ai-score",
            Some(&token("u", "user")),
            &[Part::File("resumes", "ada.pdf", "Ada")],
        );
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_ai_score_returns_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        let request = upload(
            "/api/resume/ai-score",
            Some(&token("u", "user")),
            &[
                Part::File("resumes", "ada.pdf", "Ada"),
                Part::Text("jobDescription", "Data Engineer"),
            ],
        );
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cover_letter_is_generated_and_audited() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let request = upload(
            "/api/resume/generate-cover-letter",
            Some(&token("u-3", "user")),
            &[
                Part::File("file", "ada.pdf", "Ada"),
                Part::Text("jobDescription", "Engineer"),
            ],
        );

        let response = app(dir.path(), store.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["coverLetter"]
            .as_str()
            .unwrap()
            .starts_with('{'));

        let audit = store.audit.lock().unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "cover_letter_generated");
        assert_eq!(audit[0].model_type, "gemini");
    }

    #[tokio::test]
    async fn test_cover_letter_requires_file_and_job_description() {
        let dir = tempfile::tempdir().unwrap();
        let request = upload(
            "/api/resume/generate-cover-letter",
            Some(&token("u", "user")),
            &[Part::File("file", "ada.pdf", "Ada")],
        );
        let response = app(dir.path(), Arc::new(MemoryStore::default()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let router = app(dir.path(), store.clone());

        let request = upload(
            "/api/resume/batch-upload",
            Some(&token("owner", "user")),
            &[Part::File("resumes", "ada.pdf", "Ada")],
        );
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(get_as("/api/auth/count", &token("owner", "user")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["count"], 1);

        let response = router
            .oneshot(get_as("/api/auth/history", &token("someone-else", "user")))
            .await
            .unwrap();
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_role() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path(), Arc::new(MemoryStore::default()));

        let response = router
            .clone()
            .oneshot(get_as("/api/admin/dashboard/stats", &token("u", "user")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .oneshot(get_as(
                "/api/admin/audit-logs?action=resume_parsed&page=2&limit=5",
                &token("boss", "admin"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["page"], 2);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["total"], 0);
    }
}
