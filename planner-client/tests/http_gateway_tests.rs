use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use planner_client::{HttpTaskGateway, TaskGateway};
use planner_core::{ChangeStatusRequest, SyncError, TaskStatus, UpdateTaskRequest};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct SeenRequest {
    method: Method,
    path: String,
    authorization: Option<String>,
    body: Value,
}

/// Replies to every request with a fixed status and body and remembers
/// what it was sent.
#[derive(Clone)]
struct MockApi {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    reply: Arc<(StatusCode, String)>,
}

impl MockApi {
    fn last(&self) -> SeenRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

async fn capture(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    api.seen.lock().unwrap().push(SeenRequest {
        method,
        path: uri.path().to_string(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });
    (*api.reply).clone()
}

async fn start_mock_api(status: StatusCode, body: String) -> (MockApi, String) {
    let api = MockApi {
        seen: Arc::new(Mutex::new(Vec::new())),
        reply: Arc::new((status, body)),
    };
    let app = Router::new().fallback(capture).with_state(api.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (api, format!("http://{addr}"))
}

fn ok(result: Value) -> String {
    json!({
        "isSuccess": true,
        "code": "COMMON200",
        "message": "OK",
        "result": result,
    })
    .to_string()
}

fn gateway(base_url: &str) -> HttpTaskGateway {
    HttpTaskGateway::new(
        base_url,
        Some("test-token".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_today_unwraps_envelope() {
    let body = ok(json!([
        {
            "id": 1,
            "title": "Math review",
            "status": "COMPLETED",
            "startTime": "2026-02-02T14:00:00",
            "endTime": "2026-02-02T15:00:00"
        },
        { "title": "No id yet" }
    ]));
    let (api, url) = start_mock_api(StatusCode::OK, body).await;

    let records = gateway(&url).list_today().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, Some(1));
    assert_eq!(records[0].status.as_deref(), Some("COMPLETED"));
    assert_eq!(records[0].start_time.as_deref(), Some("2026-02-02T14:00:00"));
    assert_eq!(records[1].id, None);

    let seen = api.last();
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/v1/todos");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer test-token"));
}

#[tokio::test]
async fn test_create_posts_title() {
    let body = ok(json!({ "id": 7, "title": "Essay outline", "status": "NOT_COMPLETED" }));
    let (api, url) = start_mock_api(StatusCode::OK, body).await;

    // base urls may carry a trailing slash
    let record = gateway(&format!("{url}/"))
        .create("Essay outline")
        .await
        .unwrap();
    assert_eq!(record.id, Some(7));

    let seen = api.last();
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/v1/todos");
    assert_eq!(seen.body, json!({ "title": "Essay outline" }));
}

#[tokio::test]
async fn test_change_status_patches_item() {
    let (api, url) = start_mock_api(StatusCode::OK, ok(Value::Null)).await;

    gateway(&url)
        .change_status(ChangeStatusRequest {
            id: 5,
            status: TaskStatus::Completed,
            start_time: Some("2026-02-02T14:00:00".to_string()),
            end_time: Some("2026-02-02T15:00:00".to_string()),
        })
        .await
        .unwrap();

    let seen = api.last();
    assert_eq!(seen.method, Method::PATCH);
    assert_eq!(seen.path, "/api/v1/todos/5/status");
    assert_eq!(
        seen.body,
        json!({
            "id": 5,
            "status": "COMPLETED",
            "startTime": "2026-02-02T14:00:00",
            "endTime": "2026-02-02T15:00:00"
        })
    );
}

#[tokio::test]
async fn test_rename_puts_item_without_slot() {
    let (api, url) = start_mock_api(StatusCode::OK, ok(Value::Null)).await;

    gateway(&url)
        .rename(UpdateTaskRequest {
            id: 5,
            title: "Read chapter 4".to_string(),
            start_time: None,
            end_time: None,
        })
        .await
        .unwrap();

    let seen = api.last();
    assert_eq!(seen.method, Method::PUT);
    assert_eq!(seen.path, "/api/v1/todos/5");
    assert_eq!(seen.body, json!({ "id": 5, "title": "Read chapter 4" }));
}

#[tokio::test]
async fn test_delete_accepts_empty_body() {
    let (api, url) = start_mock_api(StatusCode::OK, String::new()).await;

    let client = HttpTaskGateway::new(&url, None, Duration::from_secs(5)).unwrap();
    client.delete(5).await.unwrap();

    let seen = api.last();
    assert_eq!(seen.method, Method::DELETE);
    assert_eq!(seen.path, "/api/v1/todos/5");
    assert_eq!(seen.authorization, None);
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_an_error() {
    let body = json!({
        "isSuccess": false,
        "code": "TODO404",
        "message": "todo not found",
        "result": null
    })
    .to_string();
    let (_api, url) = start_mock_api(StatusCode::OK, body).await;

    let err = gateway(&url).delete(99).await.unwrap_err();
    match err {
        SyncError::RemoteRejected { code, message } => {
            assert_eq!(code, "TODO404");
            assert_eq!(message, "todo not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_an_error() {
    let (_api, url) =
        start_mock_api(StatusCode::INTERNAL_SERVER_ERROR, "upstream down".to_string()).await;

    let err = gateway(&url).list_today().await.unwrap_err();
    match err {
        SyncError::RemoteRejected { code, .. } => assert_eq!(code, "500"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{addr}"))
        .list_today()
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
}
