use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use server::{app, config::Config, state::AppState};
use sheet::MemoryTable;
use tower::ServiceExt;

fn table() -> Arc<MemoryTable> {
    let rows = serde_json::from_value(json!([
        ["Key", "URL", "", "Title", "Date", "Genre", "Intro", "Content", "Likes"],
        ["article1", "", "", "Intro to X", "2024-01-01", "Tech", "short intro", "long body", "3"],
        ["article2", "", "", "Kant", "2024-02-01", "Philosophy", "duty", "body", "0"],
        ["trolley", "A", "5"],
        ["trolley", "B", "7"]
    ]))
    .unwrap();

    Arc::new(MemoryTable::new("Sheet1", rows))
}

fn router(table: Arc<MemoryTable>) -> Router {
    let config = Config::from_lookup(
        |key| match key {
            "SPREADSHEET_ID" => Some("test".to_string()),
            "RETRY_ATTEMPTS" => Some("1".to_string()),
            "RETRY_BASE_MS" => Some("1".to_string()),
            _ => None,
        },
        |_| None,
    )
    .unwrap();

    app(AppState::with_table(config, table))
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

#[tokio::test]
async fn test_like_round_trip() {
    let table = table();
    let router = router(table.clone());

    let (status, body) = send(&router, Method::GET, "/articles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], 1);
    assert_eq!(body[0]["title"], "Intro to X");
    assert_eq!(body[0]["likeCount"], 3);

    let (status, body) = send(&router, Method::POST, "/like", Some(json!({"articleId": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"likes": 4}));

    let (_, body) = send(&router, Method::GET, "/articles", None).await;
    assert_eq!(body[0]["likeCount"], 4);

    assert_eq!(table.snapshot().await[1][8], json!(4));
}

#[tokio::test]
async fn test_like_unknown_article() {
    let router = router(table());

    let (status, body) = send(&router, Method::POST, "/like", Some(json!({"articleId": 42}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("article42"));
}

#[tokio::test]
async fn test_malformed_like_payload() {
    let router = router(table());

    let (status, body) = send(&router, Method::POST, "/like", Some(json!({"id": "one"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_vote_and_tally() {
    let router = router(table());

    let (status, body) = send(&router, Method::POST, "/vote", Some(json!({"option": "B"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"votes": {"A": 5, "B": 8}}));

    let vote = Some(json!({"option": "a"}));
    let (status, body) = send(&router, Method::POST, "/trolley-vote", vote).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"votes": {"A": 6, "B": 8}}));

    let (_, votes) = send(&router, Method::GET, "/votes", None).await;
    let (_, legacy) = send(&router, Method::GET, "/trolley-votes", None).await;
    assert_eq!(votes, json!({"votes": {"A": 6, "B": 8}}));
    assert_eq!(votes, legacy);
}

#[tokio::test]
async fn test_unknown_option_is_rejected() {
    let table = table();
    let router = router(table.clone());

    let (status, _) = send(&router, Method::POST, "/vote", Some(json!({"option": "C"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(table.write_count(), 0);
}

#[tokio::test]
async fn test_unavailable_store() {
    let table = table();
    table.set_available(false);
    let router = router(table);

    let (status, body) = send(&router, Method::GET, "/articles", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());

    let (status, _) = send(&router, Method::POST, "/like", Some(json!({"articleId": 1}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_feed_pages() {
    let router = router(table());

    let uri = "/feed?sortOrder=oldest&pageSize=1&page=2";
    let (status, body) = send(&router, Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalItems"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pageItems"][0]["id"], 2);

    let (_, body) = send(&router, Method::GET, "/feed?genreFilter=tech", None).await;
    assert_eq!(body["totalItems"], 1);
    assert_eq!(body["pageItems"][0]["id"], 1);

    let (status, _) = send(&router, Method::GET, "/feed?page=first", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicated_article_is_a_conflict() {
    let table = table();
    table
        .push_row(serde_json::from_value(json!(["article2", "", "", "Copy"])).unwrap())
        .await;
    let router = router(table.clone());

    let (status, body) = send(&router, Method::POST, "/like", Some(json!({"articleId": 2}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("article2"));
    assert_eq!(table.write_count(), 0);
}

#[tokio::test]
async fn test_feed_negative_page_is_clamped() {
    let router = router(table());

    let (status, body) = send(&router, Method::GET, "/feed?page=-1&pageSize=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["pageItems"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_route() {
    let router = router(table());

    let (status, body) = send(&router, Method::GET, "/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Endpoint not found"}));
}
