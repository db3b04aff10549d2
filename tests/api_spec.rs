mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::*;
use docsmith::api::{create_router, SecurityConfig};
use docsmith::models::*;
use serde_json::json;
use uuid::Uuid;

fn setup() -> (TestServer, Harness) {
    let h = harness();
    let app = create_router(h.workspace.clone(), SecurityConfig::disabled());
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, h)
}

async fn create_test_session(server: &TestServer) -> TurnOutcome {
    server
        .post("/api/ai/create")
        .json(&json!({
            "doc_id": "doc-1",
            "blocks": sample_blocks(),
            "instruction": "polish",
        }))
        .await
        .json::<TurnOutcome>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn is_reachable_without_credentials() {
        let h = harness();
        let app = create_router(h.workspace.clone(), SecurityConfig::with_api_key("secret"));
        let server = TestServer::new(app).expect("Failed to create test server");

        let response = server.get("/api/health").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod auth {
    use super::*;

    fn secured() -> TestServer {
        let h = harness();
        let app = create_router(h.workspace.clone(), SecurityConfig::with_api_key("secret"));
        TestServer::new(app).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn rejects_requests_without_a_key() {
        let server = secured();

        let response = server.get("/api/ai/sessions").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_a_wrong_key() {
        let server = secured();

        let response = server
            .get("/api/ai/sessions")
            .add_header("Authorization", "Bearer wrong")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_the_configured_key() {
        let server = secured();

        let response = server
            .get("/api/ai/sessions")
            .add_header("Authorization", "Bearer secret")
            .await;

        response.assert_status_ok();
    }
}

mod documents {
    use super::*;

    #[tokio::test]
    async fn returns_blocks_of_a_known_document() {
        let (server, h) = setup();
        h.documents.add_document("doc-1", sample_blocks());

        let response = server.get("/api/documents/doc-1/blocks").await;

        response.assert_status_ok();
        let content: DocumentContent = response.json();
        assert_eq!(content.doc_id, "doc-1");
        assert_eq!(content.blocks, sample_blocks());
    }

    #[tokio::test]
    async fn serializes_blocks_with_their_type_tag() {
        let (server, h) = setup();
        h.documents.add_document("doc-1", vec![ContentBlock::image("b1", "tok1")]);

        let response = server.get("/api/documents/doc-1/blocks").await;

        let body: serde_json::Value = response.json();
        assert_eq!(
            body["blocks"][0],
            json!({ "block_id": "b1", "block_type": "image", "image_token": "tok1" })
        );
    }

    #[tokio::test]
    async fn includes_the_document_title() {
        let (server, h) = setup();
        h.documents.add_document("doc-1", sample_blocks());
        h.documents.set_title("doc-1", "Release notes");

        let content: DocumentContent = server.get("/api/documents/doc-1/blocks").await.json();

        assert_eq!(content.title.as_deref(), Some("Release notes"));
    }

    #[tokio::test]
    async fn proxies_image_bytes_with_their_content_type() {
        let (server, h) = setup();
        h.documents.add_image("tok1", "image/png", b"\x89PNG-bytes");

        let response = server.get("/api/documents/image/doc-1/tok1").await;

        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "image/png");
        assert_eq!(response.as_bytes().to_vec(), b"\x89PNG-bytes".to_vec());
    }

    #[tokio::test]
    async fn unresolvable_image_is_bad_gateway() {
        let (server, h) = setup();
        h.documents.break_image("tok1");

        let response = server.get("/api/documents/image/doc-1/tok1").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unknown_document_is_bad_gateway() {
        let (server, _) = setup();

        let response = server.get("/api/documents/missing/blocks").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn returns_created_with_first_turn() {
        let (server, h) = setup();
        h.generator.reply("# Title\n\n![x](image_1)");

        let response = server
            .post("/api/ai/create")
            .json(&json!({
                "doc_id": "doc-1",
                "blocks": sample_blocks(),
                "instruction": "polish",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let outcome: TurnOutcome = response.json();
        assert_eq!(outcome.content, "# Title\n\n![x](image_1)");
        assert_eq!(outcome.messages.len(), 2);
    }

    #[tokio::test]
    async fn empty_blocks_are_bad_request() {
        let (server, h) = setup();

        let response = server
            .post("/api/ai/create")
            .json(&json!({ "doc_id": "doc-1", "blocks": [], "instruction": "polish" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn backend_failure_is_bad_gateway() {
        let (server, h) = setup();
        h.generator.fail_next("quota exceeded");

        let response = server
            .post("/api/ai/create")
            .json(&json!({
                "doc_id": "doc-1",
                "blocks": sample_blocks(),
                "instruction": "polish",
            }))
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.text().contains("quota exceeded"));
    }
}

mod refine {
    use super::*;

    #[tokio::test]
    async fn appends_a_turn() {
        let (server, _) = setup();
        let created = create_test_session(&server).await;

        let response = server
            .post("/api/ai/refine")
            .json(&RefineArticleInput {
                session_id: created.session_id,
                instruction: "shorter".to_string(),
            })
            .await;

        response.assert_status_ok();
        let outcome: TurnOutcome = response.json();
        assert_eq!(outcome.messages.len(), 4);
        assert_eq!(outcome.messages[2].content, "shorter");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (server, _) = setup();

        let response = server
            .post("/api/ai/refine")
            .json(&RefineArticleInput {
                session_id: Uuid::new_v4(),
                instruction: "shorter".to_string(),
            })
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn lists_and_fetches_live_sessions() {
        let (server, _) = setup();
        let created = create_test_session(&server).await;

        let list: Vec<SessionSummary> = server.get("/api/ai/sessions").await.json();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].session_id, created.session_id);

        let response = server
            .get(&format!("/api/ai/session/{}", created.session_id))
            .await;
        response.assert_status_ok();
        let summary: SessionSummary = response.json();
        assert_eq!(summary.state, SessionState::Active);
        assert_eq!(summary.message_count, 2);
    }

    #[tokio::test]
    async fn delete_releases_then_reports_nothing_to_release() {
        let (server, _) = setup();
        let created = create_test_session(&server).await;
        let path = format!("/api/ai/session/{}", created.session_id);

        let first = server.delete(&path).await;
        first.assert_status_ok();
        first.assert_json(&json!({ "released": true }));

        let second = server.delete(&path).await;
        second.assert_status_ok();
        second.assert_json(&json!({ "released": false }));

        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let (server, _) = setup();

        let response = server.get("/api/ai/session/not-a-uuid").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod preview {
    use super::*;

    #[tokio::test]
    async fn embeds_images_as_data_uris() {
        let (server, h) = setup();
        h.documents.add_image("tok1", "image/png", b"png");
        h.generator.reply("# Title\n\n![x](image_1)");
        let created = create_test_session(&server).await;

        let response = server
            .get(&format!("/api/ai/preview/{}", created.session_id))
            .await;

        response.assert_status_ok();
        let preview: Preview = response.json();
        assert_eq!(preview.images.len(), 1);
        assert!(preview
            .article_content
            .contains("![image/png](data:image/png;base64,"));
        assert_eq!(preview.original_blocks, sample_blocks());
    }

    #[tokio::test]
    async fn reset_session_is_not_found() {
        let (server, _) = setup();
        let created = create_test_session(&server).await;
        server
            .delete(&format!("/api/ai/session/{}", created.session_id))
            .await;

        let response = server
            .get(&format!("/api/ai/preview/{}", created.session_id))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod publish {
    use super::*;

    #[tokio::test]
    async fn writes_the_article_with_default_options() {
        let (server, h) = setup();
        h.generator.reply("# Title\n\nBody");
        let created = create_test_session(&server).await;

        let response = server
            .post(&format!("/api/ai/publish/{}", created.session_id))
            .json(&json!({}))
            .await;

        response.assert_status_ok();
        let report: PublishReport = response.json();
        assert_eq!(report.doc_id, "doc-1");
        assert_eq!(report.blocks_written, 2);
        assert_eq!(h.documents.writes().len(), 1);
    }

    #[tokio::test]
    async fn empty_article_is_bad_request() {
        let (server, h) = setup();
        h.generator.reply("   ");
        let created = create_test_session(&server).await;

        let response = server
            .post(&format!("/api/ai/publish/{}", created.session_id))
            .json(&json!({ "reinsert_images": true }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(h.documents.writes().is_empty());
    }
}
