//! End-to-end tests of the router over the in-memory repository.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shifolink::repository::{ListRequest, Page, Record};
use shifolink::{app, builtin_model, AppError, AppState, MemoryRepository, Repository, ResolvedEntity};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

fn router_with(repo: Arc<dyn Repository>, request_timeout: Duration, body_limit_bytes: usize) -> Router {
    app(AppState::new(repo, builtin_model().unwrap()), request_timeout, body_limit_bytes)
}

fn router() -> Router {
    let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
    router_with(Arc::new(MemoryRepository::with_today(today)), Duration::from_secs(5), 64 * 1024)
}

/// Memory store whose readiness ping stalls, to trip the request deadline.
#[derive(Default)]
struct StallingRepository {
    inner: MemoryRepository,
}

#[async_trait::async_trait]
impl Repository for StallingRepository {
    async fn create(&self, entity: &ResolvedEntity, fields: &Record) -> Result<Uuid, AppError> {
        self.inner.create(entity, fields).await
    }
    async fn get(&self, entity: &ResolvedEntity, id: Uuid) -> Result<Value, AppError> {
        self.inner.get(entity, id).await
    }
    async fn get_list(&self, entity: &ResolvedEntity, request: &ListRequest) -> Result<Page, AppError> {
        self.inner.get_list(entity, request).await
    }
    async fn update(&self, entity: &ResolvedEntity, id: Uuid, fields: &Record) -> Result<Uuid, AppError> {
        self.inner.update(entity, id, fields).await
    }
    async fn delete(&self, entity: &ResolvedEntity, id: Uuid) -> Result<(), AppError> {
        self.inner.delete(entity, id).await
    }
    async fn get_password(&self, entity: &ResolvedEntity, id: Uuid) -> Result<String, AppError> {
        self.inner.get_password(entity, id).await
    }
    async fn update_password(&self, entity: &ResolvedEntity, id: Uuid, new_password: &str) -> Result<(), AppError> {
        self.inner.update_password(entity, id, new_password).await
    }
    async fn ping(&self) -> Result<(), AppError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

fn assert_envelope(envelope: &Value, status: StatusCode) {
    assert_eq!(envelope["status_code"], json!(status.as_u16()), "{}", envelope);
    let description = if status.is_server_error() { "internal server error" } else { "bad request" };
    assert_eq!(envelope["description"], json!(description), "{}", envelope);
    assert!(envelope["data"].is_string(), "{}", envelope);
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create(router: &Router, path: &str, body: Value) -> Value {
    let (status, envelope) = call(router, Method::POST, path, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", envelope);
    envelope["data"].clone()
}

#[tokio::test]
async fn clinic_lifecycle() {
    let router = router();
    let (status, envelope) = call(
        &router,
        Method::POST,
        "/clinic",
        Some(json!({"name": "City Clinic", "description": "General"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(envelope["status_code"], json!(201));
    assert_eq!(envelope["description"], json!("succes"));
    let clinic = envelope["data"].clone();
    let id = clinic["id"].as_str().unwrap().to_string();
    assert_eq!(clinic["name"], json!("City Clinic"));
    assert!(clinic["updated_at"].is_null());
    assert!(clinic["deleted_at"].is_null());

    let (status, fetched) = call(&router, Method::GET, &format!("/clinic/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"], clinic);

    let (status, deleted) = call(&router, Method::DELETE, &format!("/clinic/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["data"], json!("data successfully deleted"));

    let (status, missing) = call(&router, Method::GET, &format!("/clinic/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["description"], json!("bad request"));

    let (status, _) = call(&router, Method::DELETE, &format!("/clinic/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    let router = router();
    let (status, envelope) = call(&router, Method::GET, "/clinic/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["status_code"], json!(400));
    assert_eq!(envelope["description"], json!("bad request"));
}

#[tokio::test]
async fn unknown_entity_is_not_found() {
    let router = router();
    let (status, envelope) = call(&router, Method::GET, "/hospital", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(envelope["status_code"], json!(404));
}

#[tokio::test]
async fn non_integer_paging_is_bad_request() {
    let router = router();
    let (status, _) = call(&router, Method::GET, "/clinic?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(&router, Method::GET, "/clinic?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_counts_and_searches() {
    let router = router();
    for name in ["Alpha Clinic", "Beta Clinic", "alpha dental", "Gamma"] {
        create(&router, "/clinic", json!({"name": name})).await;
    }

    let (status, envelope) = call(&router, Method::GET, "/clinic?page=1&limit=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["data"]["count"], json!(4));
    assert_eq!(envelope["data"]["items"].as_array().unwrap().len(), 3);

    let (_, second) = call(&router, Method::GET, "/clinic?page=2&limit=3", None).await;
    assert_eq!(second["data"]["items"].as_array().unwrap().len(), 1);

    let (_, filtered) = call(&router, Method::GET, "/clinic?search=ALPHA", None).await;
    assert_eq!(filtered["data"]["count"], json!(2));
    for item in filtered["data"]["items"].as_array().unwrap() {
        assert!(item["name"].as_str().unwrap().to_lowercase().contains("alpha"));
    }

    let (_, none) = call(&router, Method::GET, "/clinic?search=zzz", None).await;
    assert_eq!(none["data"]["count"], json!(0));
    assert_eq!(none["data"]["items"], json!([]));
}

#[tokio::test]
async fn update_takes_id_from_path_only() {
    let router = router();
    let clinic = create(&router, "/clinic", json!({"name": "Old", "description": "kept"})).await;
    let id = clinic["id"].as_str().unwrap().to_string();

    let other = uuid::Uuid::new_v4().to_string();
    let (status, updated) = call(
        &router,
        Method::PUT,
        &format!("/clinic/{}", id),
        Some(json!({"id": other, "name": "New"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &updated["data"];
    assert_eq!(data["id"], json!(id));
    assert_eq!(data["name"], json!("New"));
    assert_eq!(data["description"], json!("kept"));
    assert_eq!(data["created_at"], clinic["created_at"]);
    assert!(data["updated_at"].is_string());

    let (status, _) = call(&router, Method::GET, &format!("/clinic/{}", other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let router = router();
    let uri = format!("/clinic/{}", uuid::Uuid::new_v4());
    let (status, _) = call(&router, Method::PUT, &uri, Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_hides_password_and_derives_age() {
    let router = router();
    let customer = create(
        &router,
        "/customer",
        json!({"first_name": "Aziz", "password": "secret1", "birth_date": "2000-06-15", "age": 99}),
    )
    .await;
    assert!(customer.get("password").is_none());
    assert_eq!(customer["age"], json!(23));
    assert_eq!(customer["birth_date"], json!("2000-06-15"));

    let (_, list) = call(&router, Method::GET, "/customer", None).await;
    for item in list["data"]["items"].as_array().unwrap() {
        assert!(item.get("password").is_none());
    }
}

#[tokio::test]
async fn password_change_flow() {
    let router = router();
    let author = create(&router, "/author", json!({"first_name": "Ali", "password": "secret1"})).await;
    let uri = format!("/author/{}", author["id"].as_str().unwrap());

    let (status, envelope) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(json!({"old_password": "wrong!", "new_password": "another1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(envelope["description"], json!("bad request"));

    let (status, _) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(json!({"old_password": "secret1", "new_password": "abc"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, envelope) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(json!({"old_password": "secret1", "new_password": "another1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(envelope["data"], json!("password successfully updated"));

    let (status, _) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(json!({"old_password": "another1", "new_password": "third11"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_change_is_only_for_accounts() {
    let router = router();
    let clinic = create(&router, "/clinic", json!({"name": "City Clinic"})).await;
    let uri = format!("/clinic/{}", clinic["id"].as_str().unwrap());
    let (status, _) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(json!({"old_password": "a", "new_password": "abcdef"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn child_requires_live_parent() {
    let router = router();
    let (status, envelope) = call(
        &router,
        Method::POST,
        "/clinic_branch",
        Some(json!({"clinic_id": uuid::Uuid::new_v4().to_string(), "address": "Main st"})),
    )
    .await;
    assert!(status.is_server_error(), "{}", envelope);
    assert_eq!(envelope["description"], json!("internal server error"));

    let clinic = create(&router, "/clinic", json!({"name": "City Clinic"})).await;
    let branch = create(
        &router,
        "/clinic_branch",
        json!({"clinic_id": clinic["id"], "address": "Main st"}),
    )
    .await;
    assert_eq!(branch["clinic_id"], clinic["id"]);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let router = router();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/clinic")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    assert_envelope(&envelope, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_enveloped() {
    let router = router_with(Arc::new(MemoryRepository::new()), Duration::from_secs(5), 64);
    let body = json!({"name": "x".repeat(200)}).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/clinic")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    assert_envelope(&envelope, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unmatched_route_is_enveloped() {
    let router = router();
    let (status, envelope) = call(&router, Method::GET, "/clinic/a/b", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope(&envelope, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn wrong_method_is_enveloped() {
    let router = router();
    let (status, envelope) = call(&router, Method::PATCH, "/clinic", Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_envelope(&envelope, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn undecodable_path_is_enveloped() {
    let router = router();
    let (status, envelope) = call(&router, Method::GET, "/clinic/%FF", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_envelope(&envelope, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deadline_is_enveloped() {
    let router = router_with(Arc::new(StallingRepository::default()), Duration::from_millis(50), 64 * 1024);
    let (status, envelope) = call(&router, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_envelope(&envelope, StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn health_and_ready() {
    let router = router();
    let (status, body) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], json!("succes"));
    assert_eq!(body["data"]["status"], json!("ok"));
    let (status, body) = call(&router, Method::GET, "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("shifolink"));
    let (status, body) = call(&router, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], json!("ok"));
}
