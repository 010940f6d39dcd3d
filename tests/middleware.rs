use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use meshestra_exception::prelude::*;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::{Layer, ServiceExt, service_fn};

#[derive(Debug, thiserror::Error)]
#[error("")]
struct Blank;

fn app() -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route(
            "/forbidden",
            get(|| async { Err::<&str, _>(HttpException::new(403, "forbidden")) }),
        )
        .route(
            "/far",
            get(|| async { Err::<&str, _>(HttpException::new(700, "too far")) }),
        )
        .route("/blank", get(|| async { throw(Blank) }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/missing-html",
            get(|| async { (StatusCode::NOT_FOUND, Html("gone")) }),
        )
        .route(
            "/missing-text",
            get(|| async { (StatusCode::NOT_FOUND, "nothing here") }),
        )
        .route(
            "/thrown-missing",
            get(|| async { Err::<&str, _>(HttpException::not_found()) }),
        )
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn html_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .body(Body::empty())
        .unwrap()
}

async fn send(layer: ExceptionLayer, request: Request<Body>) -> Response {
    layer.layer(app()).oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Options whose custom handler forwards every record and answers 418
fn capturing(debug: bool) -> (ExceptionOptions, mpsc::UnboundedReceiver<ExceptionRecord>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let options = ExceptionOptions::builder()
        .debug(debug)
        .custom_fn(move |record, _request, _error| {
            let tx = tx.clone();
            async move {
                tx.send((*record).clone()).ok();
                Ok::<Response, BoxError>(StatusCode::IM_A_TEAPOT.into_response())
            }
        })
        .build()
        .unwrap();
    (options, rx)
}

#[tokio::test]
async fn test_success_passes_through() {
    let response = send(ExceptionLayer::default(), get_request("/ok")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_thrown_status_minimal_body() {
    let response = send(ExceptionLayer::default(), get_request("/forbidden")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(content_type(&response).starts_with("application/json"));
    assert_eq!(
        body_json(response).await,
        json!({"code": 403, "message": "forbidden"})
    );
}

#[tokio::test]
async fn test_service_error_is_handled() {
    let inner = service_fn(|_request: Request<Body>| async {
        Err::<Response, BoxError>(Box::new(HttpException::new(403, "forbidden")))
    });
    let service = ExceptionLayer::default().layer(inner);

    let response = service.oneshot(get_request("/any")).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({"code": 403, "message": "forbidden"})
    );
}

#[tokio::test]
async fn test_foreign_service_error_is_500() {
    let inner = service_fn(|_request: Request<Body>| async {
        Err::<Response, BoxError>("database unavailable".into())
    });
    let service = ExceptionLayer::default().layer(inner);

    let response = service.oneshot(get_request("/any")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"code": 500, "message": "database unavailable"})
    );
}

#[tokio::test]
async fn test_default_message_fallback() {
    let options = ExceptionOptions::builder()
        .default_message("oops")
        .build()
        .unwrap();

    let response = send(ExceptionLayer::new(options), get_request("/blank")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"code": 500, "message": "oops"})
    );

    let response = send(ExceptionLayer::default(), get_request("/blank")).await;
    assert_eq!(
        body_json(response).await,
        json!({"code": 500, "message": "unknown exception"})
    );
}

#[tokio::test]
async fn test_out_of_range_status_clamped() {
    let response = send(ExceptionLayer::default(), get_request("/far")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"code": 700, "message": "too far"})
    );
}

#[tokio::test]
async fn test_unmatched_route_becomes_not_found() {
    let response = send(ExceptionLayer::default(), get_request("/nowhere")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"code": 404, "message": "404 not found"})
    );
}

#[tokio::test]
async fn test_not_found_matches_thrown_not_found() {
    let (options, mut rx) = capturing(true);
    let layer = ExceptionLayer::new(options);

    let mut records = Vec::new();
    for uri in ["/missing", "/thrown-missing"] {
        let response = send(layer.clone(), get_request(uri)).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);

        let mut record = rx.recv().await.unwrap();
        record.url = None;
        record.stack = None;
        records.push(record);
    }

    assert_eq!(records[0], records[1]);
    assert_eq!(records[0].code, 404);
    assert_eq!(records[0].message, "404 not found");
}

#[tokio::test]
async fn test_debug_gating() {
    let request = || {
        Request::builder()
            .uri("/forbidden?tab=keys")
            .header(header::COOKIE, "session=abc; note=two%20words")
            .header("x-trace", "t-1")
            .body(Body::empty())
            .unwrap()
    };

    let (options, mut rx) = capturing(false);
    send(ExceptionLayer::new(options), request()).await;
    let record = rx.recv().await.unwrap();
    assert!(record.is_minimal());

    let (options, mut rx) = capturing(true);
    send(ExceptionLayer::new(options), request()).await;
    let record = rx.recv().await.unwrap();

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["code"], 403);
    assert_eq!(value["method"], "GET");
    assert_eq!(value["url"], "/forbidden?tab=keys");
    assert_eq!(value["httpVersion"], "1.1");
    assert_eq!(value["headers"]["x-trace"], "t-1");
    assert_eq!(
        value["cookies"],
        json!([
            {"key": "session", "value": "abc"},
            {"key": "note", "value": "two words"},
        ])
    );
    assert!(value["stack"].is_array());
    assert!(value.get("connection").is_none());
}

#[tokio::test]
async fn test_debug_body_in_json_response() {
    let options = ExceptionOptions::builder().debug(true).build().unwrap();

    let response = send(ExceptionLayer::new(options), get_request("/forbidden")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], "forbidden");
    assert_eq!(body["method"], "GET");
    assert!(body["headers"].is_object());
}

#[tokio::test]
async fn test_custom_handler_short_circuits() {
    let (options, mut rx) = capturing(false);

    let response = send(ExceptionLayer::new(options), html_request("/forbidden")).await;

    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert!(body_text(response).await.is_empty());
    assert_eq!(rx.recv().await.unwrap().code, 403);
}

#[tokio::test]
async fn test_custom_handler_failure_propagates() {
    let options = ExceptionOptions::builder()
        .custom_fn(|_record, _request, _error| async {
            Err::<Response, BoxError>("custom failed".into())
        })
        .build()
        .unwrap();

    let result = ExceptionLayer::new(options)
        .layer(app())
        .oneshot(get_request("/forbidden"))
        .await;

    assert_eq!(result.unwrap_err().to_string(), "custom failed");
}

#[tokio::test]
async fn test_html_client_gets_json_body() {
    let response = send(ExceptionLayer::default(), html_request("/forbidden")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(content_type(&response).starts_with("application/json"));
    assert_eq!(
        body_json(response).await,
        json!({"code": 403, "message": "forbidden"})
    );

    let options = ExceptionOptions::builder().debug(true).build().unwrap();
    let response = send(ExceptionLayer::new(options), html_request("/forbidden")).await;

    assert!(content_type(&response).starts_with("application/json"));
    let body = body_json(response).await;
    assert_eq!(body["code"], 403);
    assert_eq!(body["method"], "GET");
}

struct StubRenderer;

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn render(&self, page: &str, record: &ExceptionRecord) -> Result<String, BoxError> {
        Ok(format!("<p>{page}: {}</p>", record.message))
    }
}

#[tokio::test]
async fn test_not_found_page() {
    let options = ExceptionOptions::builder()
        .not_found_page("404.html")
        .renderer(StubRenderer)
        .build()
        .unwrap();
    let layer = ExceptionLayer::new(options);

    let response = send(layer.clone(), html_request("/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(content_type(&response).starts_with("text/html"));
    assert_eq!(body_text(response).await, "<p>404.html: 404 not found</p>");

    // JSON clients still get the record
    let response = send(layer.clone(), get_request("/nowhere")).await;
    assert_eq!(
        body_json(response).await,
        json!({"code": 404, "message": "404 not found"})
    );

    // Other failures never use the page
    let response = send(layer, html_request("/forbidden")).await;
    assert!(!body_text(response).await.contains("404.html"));
}

#[tokio::test]
async fn test_response_type_negotiation_selects_page() {
    let options = ExceptionOptions::builder()
        .negotiation(Negotiation::ResponseType)
        .not_found_page("404.html")
        .renderer(StubRenderer)
        .build()
        .unwrap();
    let layer = ExceptionLayer::new(options);

    // The downstream response was already HTML
    let response = send(layer.clone(), get_request("/missing-html")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "<p>404.html: 404 not found</p>");

    // Plain text downstream, even for an HTML-accepting client
    let response = send(layer, html_request("/missing-text")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(content_type(&response).starts_with("application/json"));
    assert_eq!(
        body_json(response).await,
        json!({"code": 404, "message": "404 not found"})
    );
}

#[tokio::test]
async fn test_logger_receives_record() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let options = ExceptionOptions::builder()
        .logger_fn(move |record, request, error| {
            let url = request.map(|r| r.url());
            tx.send((record.code, url, error.to_string())).ok();
        })
        .build()
        .unwrap();

    let response = send(ExceptionLayer::new(options), get_request("/forbidden")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (code, url, error) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code, 403);
    assert_eq!(url.as_deref(), Some("/forbidden"));
    assert_eq!(error, "forbidden");
}

#[tokio::test]
async fn test_logger_skipped_on_success() {
    let (tx, mut rx) = mpsc::unbounded_channel::<u16>();
    let options = ExceptionOptions::builder()
        .logger_fn(move |record, _, _| {
            tx.send(record.code).ok();
        })
        .build()
        .unwrap();

    let response = send(ExceptionLayer::new(options), get_request("/ok")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let received = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(received.is_err());
}
