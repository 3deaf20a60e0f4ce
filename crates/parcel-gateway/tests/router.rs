use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parcel_gateway::{App, AppState, Backends, GatewaySettings};
use parcel_quota::QuotaSettings;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

const BASE_URL: &str = "https://parcel.test";

fn router_with(quota: QuotaSettings) -> Router {
    let settings = GatewaySettings::builder()
        .public_base_url(BASE_URL)
        .quota(quota)
        .build();
    let state = AppState::new(Backends::in_memory(), settings).unwrap();
    App::router(state, Duration::from_secs(5))
}

fn router() -> Router {
    router_with(QuotaSettings::default())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn upload(query: &str, data: &'static [u8]) -> Request<Body> {
    Request::post(format!("/v1/uploads?{query}"))
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from(data))
        .unwrap()
}

const BOUNDARY: &str = "parcel-form-boundary";

/// A `multipart/form-data` upload built from `(name, file name, bytes)` parts.
fn form_upload(query: &str, parts: &[(&str, &str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, file_name, data) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
             Content-Type: image/png\r\n\r\n\
             {data}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::post(format!("/v1/uploads?{query}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn total(buckets: &Value) -> u64 {
    buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|bucket| bucket["total"].as_u64().unwrap())
        .sum()
}

#[tokio::test]
async fn health() {
    let (status, body) = send_json(&router(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn upload_then_view_and_download() {
    let router = router();

    let (status, created) = send_json(&router, upload("owner_id=7&name=hello.txt", b"hello")).await;
    assert_eq!(status, StatusCode::CREATED);
    let code = created["code"].as_str().unwrap().to_string();
    assert_eq!(created["url"], format!("{BASE_URL}/f/{code}"));
    assert_eq!(created["size"], 5);
    assert_eq!(created["content_type"], "text/plain");
    assert_eq!(created["has_thumbnail"], false);

    let response = router
        .clone()
        .oneshot(get(&format!("/f/{code}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "inline; filename=\"hello.txt\""
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello");

    let response = router
        .clone()
        .oneshot(get(&format!("/f/{code}/download")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));

    let id = created["id"].as_i64().unwrap();
    let (status, buckets) =
        send_json(&router, get(&format!("/v1/uploads/{id}/analytics?days=7"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(buckets.as_array().unwrap().len(), 7);
    assert_eq!(total(&buckets), 2);
    let downloads: u64 = buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|bucket| bucket["downloads"].as_u64().unwrap())
        .sum();
    assert_eq!(downloads, 1);
}

#[tokio::test]
async fn word_codes_on_request() {
    let (status, created) = send_json(&router(), upload("word_code=true", b"hi")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(created["code"].as_str().unwrap().contains('-'));
    assert_eq!(created["file_name"], "upload.bin");
    assert!(created["owner_id"].is_null());
}

#[tokio::test]
async fn usage_tracks_uploads_and_deletes() {
    let router = router();
    let (_, created) = send_json(&router, upload("owner_id=7", b"0123456789")).await;
    let id = created["id"].as_i64().unwrap();

    let (status, usage) = send_json(&router, get("/v1/users/7/usage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usage["storage_used"], 10);
    assert_eq!(usage["file_count"], 1);
    assert_eq!(usage["critical"], false);

    let (status, body) = send_json(
        &router,
        Request::delete(format!("/v1/uploads/{id}?owner_id=8"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &router,
        Request::delete(format!("/v1/uploads/{id}?owner_id=7"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, usage) = send_json(&router, get("/v1/users/7/usage")).await;
    assert_eq!(usage["storage_used"], 0);
    assert_eq!(usage["file_count"], 0);

    let code = created["code"].as_str().unwrap();
    let (status, _) = send(&router, get(&format!("/f/{code}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        Request::delete(format!("/v1/uploads/{id}?owner_id=7"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let router = router_with(QuotaSettings::builder().max_upload_bytes(4).build());

    let (status, _) = send(&router, upload("owner_id=1", b"too large")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (_, usage) = send_json(&router, get("/v1/users/1/usage")).await;
    assert_eq!(usage["storage_used"], 0);
}

#[tokio::test]
async fn owner_limits_are_enforced() {
    let router = router();

    let (status, snapshot) = send_json(
        &router,
        json_request(
            Method::PUT,
            "/v1/users/3/limits",
            json!({ "max_storage_bytes": 8, "max_files": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["storage_limit"], 8);
    assert_eq!(snapshot["file_limit"], 1);

    let (status, body) = send_json(&router, upload("owner_id=3", b"123456789")).await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    assert!(body["error"].as_str().unwrap().contains("storage limit"));

    let (status, _) = send(&router, upload("owner_id=3", b"1234")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&router, upload("owner_id=3", b"1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, usage) = send_json(&router, get("/v1/users/3/usage")).await;
    assert_eq!(usage["storage_used"], 4);
    assert_eq!(usage["file_count"], 1);
    assert_eq!(usage["files_critical"], true);
}

#[tokio::test]
async fn reconcile_reports_no_drift() {
    let router = router();
    send(&router, upload("owner_id=4", b"abc")).await;

    let (status, outcome) = send_json(
        &router,
        Request::post("/v1/users/4/usage/reconcile")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["owner_id"], 4);
    assert_eq!(outcome["after"], json!({ "bytes": 3, "files": 1 }));
    assert_eq!(outcome["drifted"], false);
}

#[tokio::test]
async fn links_redirect_and_count_clicks() {
    let router = router();

    let (status, link) = send_json(
        &router,
        json_request(
            Method::POST,
            "/v1/links",
            json!({ "url": "https://example.com/docs", "owner_id": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = link["code"].as_str().unwrap().to_string();
    assert_eq!(link["short_url"], format!("{BASE_URL}/l/{code}"));

    for ip in ["203.0.113.1", "203.0.113.1", "203.0.113.2"] {
        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/l/{code}"))
                    .header("x-forwarded-for", ip)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "https://example.com/docs");
    }

    let id = link["id"].as_i64().unwrap();
    let (status, buckets) = send_json(&router, get(&format!("/v1/links/{id}/analytics"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(buckets.as_array().unwrap().len(), 30);
    assert_eq!(total(&buckets), 3);
    let unique: u64 = buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|bucket| bucket["unique"].as_u64().unwrap())
        .sum();
    assert_eq!(unique, 2);

    let (status, buckets) = send_json(&router, get("/v1/users/5/analytics?days=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(total(&buckets), 3);
}

#[tokio::test]
async fn bad_links_are_rejected() {
    let router = router();

    let (status, _) = send(
        &router,
        json_request(Method::POST, "/v1/links", json!({ "url": "ftp://example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, get("/l/nothere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn view_limited_content_is_gone_then_reaped() {
    let router = router();
    let (_, created) = send_json(&router, upload("owner_id=9&max_views=1", b"secret")).await;
    let code = created["code"].as_str().unwrap().to_string();

    let (status, _) = send(&router, get(&format!("/f/{code}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send_json(&router, get(&format!("/f/{code}"))).await;
    assert_eq!(status, StatusCode::GONE);
    assert!(body["error"].is_string());

    let (status, report) = send_json(
        &router,
        Request::post("/v1/admin/reap").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["cleaned"], 1);
    assert_eq!(report["failed"], 0);

    let (status, _) = send(&router, get(&format!("/f/{code}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, usage) = send_json(&router, get("/v1/users/9/usage")).await;
    assert_eq!(usage["storage_used"], 0);
    assert_eq!(usage["file_count"], 0);
}

#[tokio::test]
async fn missing_thumbnail_is_not_found() {
    let router = router();
    let (_, created) = send_json(&router, upload("", b"no thumb")).await;
    let code = created["code"].as_str().unwrap();

    let (status, _) = send(&router, get(&format!("/f/{code}/thumbnail"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn form_upload_stores_its_thumbnail() {
    let router = router();

    let (status, created) = send_json(
        &router,
        form_upload(
            "owner_id=4",
            &[("file", "cat.png", "meow"), ("thumbnail", "small.png", "mew")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["file_name"], "cat.png");
    assert_eq!(created["content_type"], "image/png");
    assert_eq!(created["size"], 4);
    assert_eq!(created["has_thumbnail"], true);
    let code = created["code"].as_str().unwrap();

    let (status, thumbnail) = send(&router, get(&format!("/f/{code}/thumbnail"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thumbnail, b"mew");

    let (_, file) = send(&router, get(&format!("/f/{code}"))).await;
    assert_eq!(file, b"meow");

    let (_, usage) = send_json(&router, get("/v1/users/4/usage")).await;
    assert_eq!(usage["storage_used"], 4);
}

#[tokio::test]
async fn form_without_a_file_part_is_rejected() {
    let router = router();

    let (status, _) = send(
        &router,
        form_upload("owner_id=4", &[("thumbnail", "small.png", "mew")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, usage) = send_json(&router, get("/v1/users/4/usage")).await;
    assert_eq!(usage["storage_used"], 0);
}
