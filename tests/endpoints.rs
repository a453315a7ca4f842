//! End-to-end dispatch tests for the demo service: routing, validation,
//! coercion, uploads and the exception policy, all through the same
//! `Router::dispatch` boundary the server uses. No sockets involved.

use serde_json::{json, Value};
use vane::{app, Method, Response};

async fn send_json(method: Method, target: &str, body: Value) -> Response {
    let bytes = serde_json::to_vec(&body).unwrap();
    app::router()
        .dispatch(
            method,
            target,
            vec![("content-type".into(), "application/json".into())],
            bytes,
        )
        .await
}

async fn send(method: Method, target: &str, headers: &[(&str, &str)], body: Vec<u8>) -> Response {
    let headers = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    app::router().dispatch(method, target, headers, body).await
}

fn json_body(resp: &Response) -> Value {
    serde_json::from_slice(resp.body_bytes()).unwrap()
}

fn valid_item_body() -> Value {
    json!({
        "item": {"name": "hammer", "price": 9.5},
        "user": {"username": "alice"},
        "importance": 3,
    })
}

#[tokio::test]
async fn root_returns_the_greeting() {
    let resp = send(Method::Get, "/", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(json_body(&resp), json!({"message": "Hello, World!"}));
}

#[tokio::test]
async fn unknown_path_is_404_and_wrong_method_is_405() {
    let resp = send(Method::Get, "/no/such/route", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 404);
    let resp = send(Method::Get, "/offers", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 405);
}

#[tokio::test]
async fn put_items_echoes_item_user_and_query() {
    let resp = send_json(Method::Put, "/items/42?q=abcd", valid_item_body()).await;
    assert_eq!(resp.status_code(), 200);
    let body = json_body(&resp);
    assert_eq!(body["item_id"], 42);
    assert_eq!(body["item"]["name"], "hammer");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["q"], "abcd");
}

#[tokio::test]
async fn item_id_outside_0_to_1000_never_reaches_the_handler() {
    for id in ["-1", "1001", "9999"] {
        let resp = send_json(Method::Put, &format!("/items/{id}"), valid_item_body()).await;
        assert_eq!(resp.status_code(), 400, "item_id {id}");
        let body = json_body(&resp);
        assert_eq!(body["errors"][0]["field"], "path.item_id");
    }
    let resp = send_json(Method::Put, "/items/1000", valid_item_body()).await;
    assert_eq!(resp.status_code(), 200);
    let resp = send_json(Method::Put, "/items/0", valid_item_body()).await;
    assert_eq!(resp.status_code(), 200);
}

#[tokio::test]
async fn importance_bounds_are_exclusive() {
    for importance in 1..=5 {
        let mut body = valid_item_body();
        body["importance"] = json!(importance);
        let resp = send_json(Method::Put, "/items/1", body).await;
        assert_eq!(resp.status_code(), 200, "importance {importance}");
    }
    for importance in [0, 6] {
        let mut body = valid_item_body();
        body["importance"] = json!(importance);
        let resp = send_json(Method::Put, "/items/1", body).await;
        assert_eq!(resp.status_code(), 400, "importance {importance}");
        assert_eq!(json_body(&resp)["errors"][0]["field"], "body.importance");
    }
}

#[tokio::test]
async fn short_q_is_rejected_with_its_field_path() {
    let resp = send_json(Method::Put, "/items/1?q=ab", valid_item_body()).await;
    assert_eq!(resp.status_code(), 400);
    let body = json_body(&resp);
    assert_eq!(body["errors"][0]["field"], "query.q");
}

#[tokio::test]
async fn item3_field_constraints_are_batched() {
    let resp = send_json(
        Method::Put,
        "/items/item3/1",
        json!({
            "name": "ab",
            "description": "x".repeat(301),
            "price": -3.0,
        }),
    )
    .await;
    assert_eq!(resp.status_code(), 400);
    let body = json_body(&resp);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["body.name", "body.description", "body.price"]);
}

#[tokio::test]
async fn item4_tags_are_deduplicated() {
    let resp = send_json(
        Method::Put,
        "/items/item4/1",
        json!({
            "name": "guitar",
            "price": 120.0,
            "tags": ["rock", "metal", "rock", "blues"],
        }),
    )
    .await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(json_body(&resp)["item"]["tags"], json!(["rock", "metal", "blues"]));
}

#[tokio::test]
async fn item5_nested_image_urls_are_validated() {
    let resp = send_json(
        Method::Put,
        "/items/item5/1",
        json!({
            "name": "poster",
            "price": 5.0,
            "tags": [],
            "images": [
                {"url": "https://example.com/a.png", "name": "a"},
                {"url": "definitely not a url", "name": "b"},
            ],
        }),
    )
    .await;
    assert_eq!(resp.status_code(), 400);
    assert_eq!(json_body(&resp)["errors"][0]["field"], "body.images[1].url");
}

#[tokio::test]
async fn offers_carry_nested_items() {
    let resp = send_json(
        Method::Post,
        "/offers",
        json!({
            "name": "bundle",
            "price": 50.0,
            "items": [{"name": "poster", "price": 5.0, "tags": ["art"]}],
        }),
    )
    .await;
    assert_eq!(resp.status_code(), 200);
    let body = json_body(&resp);
    assert_eq!(body["items"][0]["name"], "poster");
    // Optional nested containers default to empty.
    assert_eq!(body["items"][0]["images"], json!([]));
}

#[tokio::test]
async fn empty_image_list_round_trips_to_empty() {
    let resp = send_json(Method::Post, "/images/multiple", json!([])).await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(json_body(&resp), json!([]));
}

#[tokio::test]
async fn index_weight_keys_coerce_and_round_trip() {
    let resp = send_json(Method::Post, "/index-weights/", json!({"1": 2.5, "2": 3.0})).await;
    assert_eq!(resp.status_code(), 200);
    let body = json_body(&resp);
    assert_eq!(body["1"], 2.5);
    assert_eq!(body["2"], 3.0);

    let resp = send_json(Method::Post, "/index-weights/", json!({"one": 2.5})).await;
    assert_eq!(resp.status_code(), 400);
}

#[tokio::test]
async fn schedule_arithmetic_is_exact() {
    let resp = send_json(
        Method::Put,
        "/items/item6/67e55044-10b1-426f-9247-bb680e5fe0c8",
        json!({
            "start_datetime": "2023-01-01T00:00:00",
            "end_datetime": "2023-01-01T02:00:00",
            "process_after": "PT30M",
        }),
    )
    .await;
    assert_eq!(resp.status_code(), 200);
    let body = json_body(&resp);
    assert_eq!(body["start_process"], "2023-01-01T00:30:00");
    assert_eq!(body["duration"], "PT1H30M");
    assert_eq!(body["repeat_at"], Value::Null);
    assert_eq!(body["item_id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
}

#[tokio::test]
async fn schedule_rejects_a_non_uuid_path() {
    let resp = send_json(
        Method::Put,
        "/items/item6/not-a-uuid",
        json!({
            "start_datetime": "2023-01-01T00:00:00",
            "end_datetime": "2023-01-01T02:00:00",
            "process_after": "PT30M",
        }),
    )
    .await;
    assert_eq!(resp.status_code(), 400);
    assert_eq!(json_body(&resp)["errors"][0]["field"], "path.item_id");
}

#[tokio::test]
async fn cookie_endpoint_reads_the_named_cookie() {
    let resp = send(Method::Get, "/items1/", &[("cookie", "ads_id=track-me")], Vec::new()).await;
    assert_eq!(json_body(&resp), json!({"ads_id": "track-me"}));

    let resp = send(Method::Get, "/items1/", &[], Vec::new()).await;
    assert_eq!(json_body(&resp), json!({"ads_id": null}));
}

#[tokio::test]
async fn header_endpoint_normalizes_underscores() {
    let resp = send(
        Method::Get,
        "/items2/",
        &[("Strange-Header", "weird value")],
        Vec::new(),
    )
    .await;
    assert_eq!(json_body(&resp), json!({"strange_header": "weird value"}));
}

#[tokio::test]
async fn raw_file_upload_reports_its_size() {
    let resp = send(Method::Post, "/files1/", &[], vec![0u8; 1234]).await;
    assert_eq!(json_body(&resp), json!({"file_size": 1234}));
}

fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!("content-disposition: form-data; name=\"{name}\"");
        if let Some(f) = filename {
            disposition.push_str(&format!("; filename=\"{f}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("content-type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[tokio::test]
async fn multipart_upload_returns_metadata_and_content() {
    let body = multipart_body(
        "xx",
        &[("file", Some("notes.txt"), Some("text/plain"), b"hello there")],
    );
    let resp = send(
        Method::Post,
        "/uploadfile1/",
        &[("content-type", "multipart/form-data; boundary=xx")],
        body,
    )
    .await;
    assert_eq!(resp.status_code(), 200);
    let body = json_body(&resp);
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(body["content_type"], "text/plain");
    assert_eq!(body["size"], 11);
    assert_eq!(body["content"], "hello there");
}

#[tokio::test]
async fn combined_upload_uses_the_aliased_form_field() {
    let body = multipart_body(
        "zz",
        &[
            ("file", None, None, b"raw-bytes"),
            ("fileb", Some("b.bin"), Some("application/octet-stream"), &[1, 2, 3]),
            ("access_token", None, None, b"s3cret"),
        ],
    );
    let resp = send(
        Method::Post,
        "/files4",
        &[("content-type", "multipart/form-data; boundary=zz")],
        body,
    )
    .await;
    assert_eq!(resp.status_code(), 200);
    let body = json_body(&resp);
    assert_eq!(body["file_size"], 9);
    assert_eq!(body["fileb_filename"], "b.bin");
    assert_eq!(body["fileb_size"], 3);
    assert_eq!(body["token"], "s3cret");
}

#[tokio::test]
async fn missing_multipart_file_is_a_validation_error() {
    let body = multipart_body("zz", &[("other", None, None, b"x")]);
    let resp = send(
        Method::Post,
        "/uploadfile1/",
        &[("content-type", "multipart/form-data; boundary=zz")],
        body,
    )
    .await;
    assert_eq!(resp.status_code(), 400);
}

#[tokio::test]
async fn unknown_item_is_404_with_the_custom_header() {
    let resp = send(Method::Get, "/read_items6/foo", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 404);
    assert_eq!(resp.header("x-error"), Some("There goes my error"));
    assert_eq!(json_body(&resp)["detail"], "Item not found");

    let resp = send(Method::Get, "/read_items6/plumbus", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 200);
}

#[tokio::test]
async fn yolo_trips_the_teapot() {
    let resp = send(Method::Get, "/unicorns/yolo", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 418);
    let message = json_body(&resp)["message"].as_str().unwrap().to_owned();
    assert!(message.contains("yolo"), "{message}");

    let resp = send(Method::Get, "/unicorns/stormy", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(json_body(&resp), json!({"unicorn_name": "stormy"}));
}

#[tokio::test]
async fn legacy_item_route_refuses_three_and_advertises_deprecation() {
    let resp = send(Method::Get, "/items8/3", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 418);

    let resp = send(Method::Get, "/items8/7", &[], Vec::new()).await;
    assert_eq!(resp.status_code(), 200);
    assert_eq!(json_body(&resp), json!({"item_id": 7}));
    assert_eq!(resp.header("deprecation"), Some("true"));
}

#[tokio::test]
async fn malformed_json_body_is_a_400_not_a_500() {
    let resp = send(
        Method::Put,
        "/items/1",
        &[("content-type", "application/json")],
        b"{not json".to_vec(),
    )
    .await;
    assert_eq!(resp.status_code(), 400);
    assert_eq!(json_body(&resp)["errors"][0]["field"], "body");
}
