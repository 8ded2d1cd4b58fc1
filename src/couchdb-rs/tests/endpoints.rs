//! Request shapes for endpoints the stub server does not implement
//! (Mango queries and indexes, views, update handlers).

use bytes::Bytes;
use couchdb::{Client, Payload, QueryParams};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock(server: &MockServer, verb: &str, route: &str, status: u16, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_find_documents() {
    let server = MockServer::start().await;
    let selector = json!({
        "selector": {"year": {"$gt": 2010}},
        "fields": ["_id", "title"],
        "limit": 2,
    });
    Mock::given(method("POST"))
        .and(path("/movies/_find"))
        .and(body_json(&selector))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"docs": [{"_id": "a"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).unwrap();
    let found = client.find_documents("movies", &selector).await.unwrap();
    assert_eq!(found.message, "OK - Request completed successfully");
    assert_eq!(found.data["docs"][0]["_id"], json!("a"));
}

#[tokio::test]
async fn test_find_documents_failure_passes_body_through() {
    let server = MockServer::start().await;
    mock(
        &server,
        "POST",
        "/movies/_find",
        400,
        json!({"error": "invalid_selector", "reason": "bad"}),
    )
    .await;

    let client = Client::new(server.uri()).unwrap();
    let err = client
        .find_documents("movies", &json!({"selector": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.message, "Bad Request - Invalid request");
    assert_eq!(err.data["error"], json!("invalid_selector"));
}

#[tokio::test]
async fn test_index_lifecycle() {
    let server = MockServer::start().await;
    let index = json!({"index": {"fields": ["year"]}, "name": "year-index", "type": "json"});
    Mock::given(method("POST"))
        .and(path("/movies/_index"))
        .and(body_json(&index))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "created",
            "id": "_design/a5f4711fc9448864a13c81dc71e660b524d7410c",
            "name": "year-index",
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock(&server, "GET", "/movies/_index", 200, json!({"total_rows": 2, "indexes": []})).await;
    mock(
        &server,
        "DELETE",
        "/movies/_index/a5f4711fc9448864a13c81dc71e660b524d7410c/json/year-index",
        200,
        json!({"ok": true}),
    )
    .await;

    let client = Client::new(server.uri()).unwrap();
    let created = client.create_index("movies", &index).await.unwrap();
    assert_eq!(created.message, "OK - Index created successfully or already exists");
    let ddoc = created.data["id"].as_str().unwrap().to_string();

    let listed = client.get_index("movies").await.unwrap();
    assert_eq!(listed.data["total_rows"], json!(2));

    let deleted = client
        .delete_index("movies", &ddoc, "year-index")
        .await
        .unwrap();
    assert_eq!(deleted.message, "OK - Success");
}

#[tokio::test]
async fn test_view_query_encodes_json_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/months/_design/ddoc1/_view/all"))
        .and(query_param("startkey", "\"April\""))
        .and(query_param("descending", "true"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_rows": 12,
            "offset": 0,
            "rows": [{"id": "x", "key": "April", "value": 4}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).unwrap();
    let query = QueryParams::new()
        .with("startkey", "April")
        .with("descending", true)
        .with("limit", 3);
    let view = client
        .get_view("months", "ddoc1", "all", &query)
        .await
        .unwrap();
    assert_eq!(view.data["rows"][0]["value"], json!(4));
}

#[tokio::test]
async fn test_missing_view() {
    let server = MockServer::start().await;
    mock(
        &server,
        "GET",
        "/months/_design/ddoc1/_view/nope",
        404,
        json!({"error": "not_found", "reason": "missing_named_view"}),
    )
    .await;

    let client = Client::new(server.uri()).unwrap();
    let err = client
        .get_view("months", "ddoc1", "nope", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.message,
        "Not Found - Specified database, design document or view is missed"
    );
}

#[tokio::test]
async fn test_update_function_with_and_without_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/db/_design/ddoc1/_update/add/mydoc"))
        .and(body_json(json!({"amount": 10})))
        .respond_with(ResponseTemplate::new(201).set_body_string("added 10"))
        .expect(1)
        .mount(&server)
        .await;
    mock(&server, "POST", "/db/_design/ddoc1/_update/add", 200, json!({"ok": true})).await;

    let client = Client::new(server.uri()).unwrap();

    // Handlers may answer with plain text, which is not JSON
    let err = client
        .execute_update_function("db", "ddoc1", "add", &json!({"amount": 10}), Some("mydoc"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 500);
    assert_eq!(err.data, Value::String(err.message.clone()));

    let ok = client
        .execute_update_function("db", "ddoc1", "add", &json!({"amount": 1}), None)
        .await
        .unwrap();
    assert_eq!(ok.status, 200);
}

#[tokio::test]
async fn test_streamed_attachment_upload() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/db/doc/log.txt"))
        .and(query_param("rev", "3-abc"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"ok": true, "id": "doc", "rev": "4-def"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let chunks = futures::stream::iter(
        ["line one\n", "line two\n"]
            .into_iter()
            .map(|line| Ok(Bytes::from_static(line.as_bytes()))),
    );
    let client = Client::new(server.uri()).unwrap();
    let added = client
        .add_attachment(
            "db",
            "doc",
            "log.txt",
            Some("3-abc"),
            "text/plain",
            Payload::stream(chunks),
        )
        .await
        .unwrap();
    assert_eq!(added.data["rev"], json!("4-def"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, b"line one\nline two\n".to_vec());
    assert_eq!(requests[0].headers.get("content-type").unwrap(), "text/plain");
}

#[tokio::test]
async fn test_timeout_setting_applies_to_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_all_dbs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = Client::new(server.uri()).unwrap();
    client.set_timeout(std::time::Duration::from_millis(100));
    let err = client.list_databases().await.unwrap_err();
    assert_eq!(err.status, 500);
    assert_eq!(err.message, "request timed out");
}
