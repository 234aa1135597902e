mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use genbridge::config::ServerConfig;
use genbridge::error::Error;
use genbridge::server::auth::authorized;
use genbridge::server::{router, status_for};
use common::{candidate, response, service, StubBackend};

const PASSWORD: &str = "s3cret";

fn app(backend: StubBackend) -> Router
{   shared_app(Arc::new(backend))
}

fn shared_app(backend: Arc<StubBackend>) -> Router
{   let config = ServerConfig
    {   password: Some(PASSWORD.to_string())
      , ..ServerConfig::default()
    };
    router(Arc::new(service(backend)), &config)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body>
{   let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token
    {   builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body>
{   Request::builder()
      .method("POST")
      .uri(uri)
      .header(header::AUTHORIZATION, format!("Bearer {}", PASSWORD))
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap()
}

async fn body_text(response: Response<Body>) -> String
{   let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value
{   serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_missing_or_wrong_token_is_unauthorized()
{   let app = app(StubBackend::new());

    let response = app.clone().oneshot(get("/v1/models", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "unauthorized");

    let response = app.oneshot(get("/v1/models", Some("nope"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_no_password_rejects_everything()
{   let app = router(
      Arc::new(service(Arc::new(StubBackend::new())))
    , &ServerConfig::default()
    );

    let response = app.oneshot(get("/v1/models", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_token_comparison()
{   assert!(authorized(Some("abc"), "abc"));
    assert!(!authorized(Some("abc"), "abd"));
    assert!(!authorized(Some("abc"), "abcd"));
    assert!(!authorized(None, ""));
}

#[tokio::test]
async fn test_list_models()
{   let app = app(StubBackend::new());

    let response = app.clone()
      .oneshot(get("/v1/models", Some(PASSWORD)))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["id"], "gemini-test");
    assert_eq!(body["data"][0]["object"], "model");
    assert_eq!(body["data"][0]["output_token_limit"], 8192);

    let response = app.oneshot(get("/models", Some(PASSWORD))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_chat_completion()
{   let app = app(StubBackend::replying(
      response(vec![candidate(0, "hi", Some("STOP"))])
    ));

    let response = app
      .oneshot(post("/v1/chat/completions", json!({
        "model": "gemini-test"
      , "messages": [{ "role": "user", "content": "hello" }]
      , "max_completion_tokens": 64
      , "stop": "END"
      })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "gemini-test");
    assert_eq!(body["id"], "resp-1");
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "hi");
    assert_eq!(body["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_prefixed_model_id_on_unversioned_route()
{   let app = app(StubBackend::replying(
      response(vec![candidate(0, "hi", Some("MAX_TOKENS"))])
    ));

    let response = app
      .oneshot(post("/chat/completions", json!({
        "model": "models/gemini-test"
      , "messages": [{ "role": "user", "content": "hello" }]
      })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["choices"][0]["finish_reason"], "length");
}

#[tokio::test]
async fn test_unknown_model_is_bad_request()
{   let app = app(StubBackend::new());

    let response = app
      .oneshot(post("/v1/chat/completions", json!({
        "model": "gpt-4"
      , "messages": [{ "role": "user", "content": "hello" }]
      })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

fn chat(model: &str) -> Request<Body>
{   post("/v1/chat/completions", json!({
      "model": model
    , "messages": [{ "role": "user", "content": "hello" }]
    }))
}

#[tokio::test]
async fn test_model_list_is_cached_between_requests()
{   let backend = Arc::new(StubBackend::replying(
      response(vec![candidate(0, "hi", Some("STOP"))])
    ));
    let app = shared_app(backend.clone());

    for _ in 0..2
    {   let response = app.clone().oneshot(chat("gemini-test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(backend.model_lists.load(Ordering::SeqCst), 1);

    let response = app.clone().oneshot(chat("gpt-4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(backend.model_lists.load(Ordering::SeqCst), 2);

    let response = app.oneshot(chat("models/gemini-test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.model_lists.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_listing_models_fills_the_cache()
{   let backend = Arc::new(StubBackend::replying(
      response(vec![candidate(0, "hi", Some("STOP"))])
    ));
    let app = shared_app(backend.clone());

    let response = app.clone()
      .oneshot(get("/v1/models", Some(PASSWORD)))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(chat("gemini-test")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.model_lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_rate_limit_is_429()
{   let backend = StubBackend::new();
    let app = app(StubBackend
    {   fail_with: Some(Error::RateLimited("slow down".to_string()))
      , ..backend
    });

    let response = app
      .oneshot(get("/v1/models", Some(PASSWORD)))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_streamed_chat_completion()
{   let app = app(StubBackend::streaming(vec![
      response(vec![candidate(0, "Hel", None)])
    , response(vec![candidate(0, "lo", Some("STOP"))])
    , response(vec![candidate(0, "ignored", None)])
    ]));

    let response = app
      .oneshot(post("/v1/chat/completions", json!({
        "model": "gemini-test"
      , "stream": true
      , "messages": [{ "role": "user", "content": "hello" }]
      })))
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
      .to_str()
      .unwrap()
      .starts_with("text/event-stream"));

    let text = body_text(response).await;
    let data: Vec<&str> = text.lines()
      .filter_map(|line| line.strip_prefix("data: "))
      .collect();
    assert_eq!(data.len(), 3);
    assert_eq!(data[2], "[DONE]");

    let first: Value = serde_json::from_str(data[0]).unwrap();
    assert_eq!(first["object"], "chat.completion.chunk");
    assert_eq!(first["choices"][0]["delta"]["content"], "Hel");
    assert!(first["choices"][0]["finish_reason"].is_null());
    let last: Value = serde_json::from_str(data[1]).unwrap();
    assert_eq!(last["choices"][0]["finish_reason"], "stop");
}

#[test]
fn test_error_status_mapping()
{   assert_eq!(
      status_for(&Error::InvalidRequest(String::new()))
    , StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status_for(&Error::Auth(String::new()))
    , StatusCode::BAD_GATEWAY
    );
    assert_eq!(
      status_for(&Error::UploadFailed(String::new()))
    , StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      status_for(&Error::TimeoutExceeded(Duration::from_secs(60)))
    , StatusCode::GATEWAY_TIMEOUT
    );
}
