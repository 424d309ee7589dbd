//! End-to-end tests for the comment endpoints
//!
//! Tests cover:
//! - Reply re-parenting and mention derivation
//! - Top-level pagination and reply attachment
//! - Auth and validation failures (nothing persisted)
//! - Editing and deleting own comments

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rusqlite::params;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use fanthread::auth::create_session;
use fanthread::config::Config;
use fanthread::db;
use fanthread::routes;
use fanthread::state::{AppState, DbPool};

struct TestApp {
    _dir: TempDir,
    pool: DbPool,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::create_pool(&dir.path().join("test.db")).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        {
            let conn = pool.get().unwrap();
            for (id, username) in [("u1", "alice"), ("u2", "bob"), ("u3", "carol")] {
                conn.execute(
                    "INSERT INTO profiles (id, username, avatar_url) VALUES (?1, ?2, ?3)",
                    params![id, username, format!("https://img.example/{username}.png")],
                )
                .unwrap();
            }
        }

        let router = routes::app(AppState::sqlite(pool.clone(), Config::default()));
        Self {
            _dir: dir,
            pool,
            router,
        }
    }

    fn login(&self, user_id: &str) -> String {
        create_session(&self.pool, user_id, 1).unwrap()
    }

    fn comment_count(&self) -> i64 {
        self.pool
            .get()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))
            .unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn post_comment(&self, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/api/comments")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("fanthread_session={token}"));
        }
        self.send(req.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn get_comments(&self, query: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri(format!("/api/comments?{query}"))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }
}

fn id_of(comment: &Value) -> String {
    comment["id"].as_str().unwrap().to_string()
}

// ============================================================================
// WRITER
// ============================================================================

#[tokio::test]
async fn test_thread_scenario_collapses_to_two_levels() {
    let app = TestApp::new();
    let (t1, t2, t3) = (app.login("u1"), app.login("u2"), app.login("u3"));

    let (status, c1) = app
        .post_comment(Some(&t1), json!({ "postId": "P", "content": "hello" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(c1["parent_id"], Value::Null);
    assert_eq!(c1["user_id"], "u1");
    assert_eq!(c1["replies"], json!([]));
    assert_eq!(c1["profiles"]["username"], "alice");
    assert_eq!(
        c1["profiles"]["avatar_url"],
        "https://img.example/alice.png"
    );

    let (_, c2) = app
        .post_comment(
            Some(&t2),
            json!({ "postId": "P", "content": "hi", "parentId": id_of(&c1) }),
        )
        .await;
    assert_eq!(c2["parent_id"], id_of(&c1));
    assert_eq!(c2["mentioned_username"], Value::Null);

    let (status, c3) = app
        .post_comment(
            Some(&t3),
            json!({ "postId": "P", "content": "re-reply", "parentId": id_of(&c2) }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(c3["parent_id"], id_of(&c1), "Reply to a reply must attach to the root");
    assert_eq!(c3["mentioned_username"], "bob");

    let (status, page) = app.get_comments("postId=P&page=1&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 10);
    assert_eq!(page["hasMore"], false);

    let comments = page["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(id_of(&comments[0]), id_of(&c1));
    let reply_ids: Vec<String> = comments[0]["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(reply_ids, vec![id_of(&c2), id_of(&c3)]);
    assert_eq!(comments[0]["replies"][1]["profiles"]["username"], "carol");
}

#[tokio::test]
async fn test_caller_mention_wins_over_derived() {
    let app = TestApp::new();
    let t1 = app.login("u1");

    let (_, c1) = app
        .post_comment(Some(&t1), json!({ "postId": "P", "content": "root" }))
        .await;
    let (_, c2) = app
        .post_comment(
            Some(&app.login("u2")),
            json!({ "postId": "P", "content": "child", "parentId": id_of(&c1) }),
        )
        .await;
    let (_, c3) = app
        .post_comment(
            Some(&t1),
            json!({
                "postId": "P",
                "content": "@carol look",
                "parentId": id_of(&c2),
                "mentioned_username": "carol"
            }),
        )
        .await;
    assert_eq!(c3["mentioned_username"], "carol");
    assert_eq!(c3["parent_id"], id_of(&c1));
}

#[tokio::test]
async fn test_unauthorized_write_persists_nothing() {
    let app = TestApp::new();

    let (status, body) = app
        .post_comment(None, json!({ "postId": "P", "content": "hello" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let (status, _) = app
        .post_comment(Some("not-a-real-token"), json!({ "postId": "P", "content": "hello" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.comment_count(), 0);
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = TestApp::new();
    let token = app.login("u1");
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/comments")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(json!({ "postId": "P", "content": "hi" }).to_string()))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u1");
}

#[tokio::test]
async fn test_missing_fields_return_400() {
    let app = TestApp::new();
    let token = app.login("u1");

    let (status, body) = app.post_comment(Some(&token), json!({ "postId": "P" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "postId and content are required" }));

    let (status, _) = app
        .post_comment(Some(&token), json!({ "content": "orphan" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.comment_count(), 0);
}

#[tokio::test]
async fn test_unknown_or_foreign_parent_is_rejected() {
    let app = TestApp::new();
    let token = app.login("u1");

    let (status, body) = app
        .post_comment(
            Some(&token),
            json!({ "postId": "P", "content": "hi", "parentId": "missing" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Parent comment not found");

    let (_, root) = app
        .post_comment(Some(&token), json!({ "postId": "P", "content": "root" }))
        .await;
    let (status, _) = app
        .post_comment(
            Some(&token),
            json!({ "postId": "Q", "content": "hi", "parentId": id_of(&root) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.comment_count(), 1);
}

// ============================================================================
// READER
// ============================================================================

#[tokio::test]
async fn test_reader_requires_post_id() {
    let app = TestApp::new();
    let (status, body) = app.get_comments("page=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "postId is required" }));
}

#[tokio::test]
async fn test_reader_rejects_non_numeric_paging() {
    let app = TestApp::new();
    let (status, _) = app.get_comments("postId=P&page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pagination_is_newest_first_with_has_more() {
    let app = TestApp::new();
    let token = app.login("u1");

    let mut ids = Vec::new();
    for i in 0..5 {
        let (_, c) = app
            .post_comment(Some(&token), json!({ "postId": "P", "content": format!("c{i}") }))
            .await;
        ids.push(id_of(&c));
    }
    // Replies never count toward the page total
    app.post_comment(
        Some(&token),
        json!({ "postId": "P", "content": "reply", "parentId": ids[0] }),
    )
    .await;

    let (_, page1) = app.get_comments("postId=P&page=1&limit=2").await;
    assert_eq!(page1["total"], 5);
    assert_eq!(page1["hasMore"], true);
    let page1_ids: Vec<String> = page1["comments"].as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(page1_ids, vec![ids[4].clone(), ids[3].clone()]);

    let (_, page3) = app.get_comments("postId=P&page=3&limit=2").await;
    assert_eq!(page3["hasMore"], false);
    let page3 = page3["comments"].as_array().unwrap();
    assert_eq!(page3.len(), 1);
    assert_eq!(id_of(&page3[0]), ids[0]);
    assert_eq!(page3[0]["replies"].as_array().unwrap().len(), 1);

    let (_, beyond) = app.get_comments("postId=P&page=9&limit=2").await;
    assert_eq!(beyond["comments"], json!([]));
    assert_eq!(beyond["hasMore"], false);
}

#[tokio::test]
async fn test_reader_defaults_page_and_limit() {
    let app = TestApp::new();
    let (status, page) = app.get_comments("postId=empty").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        page,
        json!({ "comments": [], "total": 0, "page": 1, "limit": 10, "hasMore": false })
    );
}

// ============================================================================
// EDIT / DELETE
// ============================================================================

#[tokio::test]
async fn test_edit_and_delete_own_comment() {
    let app = TestApp::new();
    let (t1, t2) = (app.login("u1"), app.login("u2"));

    let (_, root) = app
        .post_comment(Some(&t1), json!({ "postId": "P", "content": "typo" }))
        .await;
    app.post_comment(
        Some(&t2),
        json!({ "postId": "P", "content": "reply", "parentId": id_of(&root) }),
    )
    .await;

    let edit = |token: &str, content: &str| {
        Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/comments/{}", id_of(&root)))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("fanthread_session={token}"))
            .body(Body::from(json!({ "content": content }).to_string()))
            .unwrap()
    };

    let (status, _) = app.send(edit(&t2, "hijack")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = app.send(edit(&t1, "fixed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["content"], "fixed");
    assert_eq!(edited["replies"].as_array().unwrap().len(), 1);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/comments/{}", id_of(&root)))
        .header(header::COOKIE, format!("fanthread_session={t1}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.comment_count(), 0, "Replies go with their thread root");
}
