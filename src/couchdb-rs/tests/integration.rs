//! End-to-end tests against an in-process couchdb-stub server.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use couchdb::{Client, DbResponse, Payload, QueryParams};
use couchdb_stub::StubConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn client() -> Client {
    let addr = couchdb_stub::spawn(StubConfig {
        port: 0,
        workers: 1,
        ..StubConfig::default()
    })
    .unwrap();
    Client::new(format!("http://{}", addr)).unwrap()
}

async fn client_with_db(db: &str) -> Client {
    let client = client();
    client.create_database(db).await.unwrap();
    client
}

fn rev_of(response: &DbResponse) -> String {
    response.data["rev"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_server_info_and_uuids() {
    let client = client();

    let info = client.get_info().await.unwrap();
    assert_eq!(info.data["couchdb"], json!("Welcome"));

    let uuids = client.get_uuids(10).await.unwrap();
    assert_eq!(uuids.status, 200);
    assert_eq!(uuids.message, "OK - Request completed successfully");
    let uuids = uuids.data["uuids"].as_array().unwrap();
    assert_eq!(uuids.len(), 10);
    assert!(uuids[0]
        .as_str()
        .unwrap()
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

    let err = client.get_uuids(5_000).await.unwrap_err();
    assert_eq!(err.status, 403);
}

#[tokio::test]
async fn test_create_database() {
    let client = client();

    let created = client.create_database("testdb_1").await.unwrap();
    assert_eq!(created.status, 201);
    assert_eq!(created.message, "Created - Database created successfully");
    assert_eq!(created.data["ok"], json!(true));

    let again = client.create_database("testdb_1").await.unwrap_err();
    assert_eq!(again.status, 412);
    assert_eq!(again.message, "Precondition Failed - Database already exists");
    assert_eq!(again.data["error"], json!("file_exists"));

    let invalid = client.create_database("%123").await.unwrap_err();
    assert_eq!(invalid.status, 400);
    assert_eq!(invalid.message, "Bad Request - Invalid database name");

    let dbs = client.list_databases().await.unwrap();
    assert_eq!(dbs.data, json!(["testdb_1"]));
}

#[tokio::test]
async fn test_database_info_head_and_delete() {
    let client = client_with_db("testdb").await;

    let info = client.get_database("testdb").await.unwrap();
    assert_eq!(info.data["db_name"], json!("testdb"));

    let head = client.get_database_head("testdb").await.unwrap();
    assert_eq!(head.status, 200);
    assert_eq!(head.data, json!({}));

    let deleted = client.delete_database("testdb").await.unwrap();
    assert_eq!(deleted.message, "OK - Database removed successfully");

    let missing = client.delete_database("testdb").await.unwrap_err();
    assert_eq!(missing.status, 404);
    assert_eq!(missing.message, "Not Found - Database doesn’t exist");

    let head = client.get_database_head("testdb").await.unwrap_err();
    assert_eq!(head.status, 404);
    assert_eq!(head.data, json!({}));
}

#[tokio::test]
async fn test_missing_document() {
    let client = client_with_db("testdb").await;

    let err = client
        .get_document("testdb", "missing", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.status, 404);
    assert_eq!(err.message, "Not Found - Document not found");
    assert_eq!(err.data["error"], json!("not_found"));
}

#[tokio::test]
async fn test_document_round_trip() {
    let client = client_with_db("testdb").await;
    let doc = json!({
        "name": "Alice",
        "age": 42,
        "tags": ["admin", "ops"],
        "address": {"city": "Berlin", "zip": null},
    });

    let created = client
        .create_document("testdb", &doc, Some("alice"))
        .await
        .unwrap();
    assert_eq!(created.status, 201);
    let rev = rev_of(&created);

    let fetched = client
        .get_document("testdb", "alice", &QueryParams::new())
        .await
        .unwrap();

    let mut expected = doc.clone();
    expected["_id"] = json!("alice");
    expected["_rev"] = json!(rev);
    assert_eq!(fetched.data, expected);
    assert_eq!(fetched.header("ETag"), Some(format!("\"{}\"", rev).as_str()));
}

#[tokio::test]
async fn test_document_update_conflict_and_delete() {
    let client = client_with_db("testdb").await;
    let doc = json!({"foo": "bar"});

    client.create_document("testdb", &doc, Some("doc")).await.unwrap();
    let conflict = client
        .create_document("testdb", &doc, Some("doc"))
        .await
        .unwrap_err();
    assert_eq!(conflict.status, 409);
    assert!(conflict.message.starts_with("Conflict"));

    let mut current = client
        .get_document("testdb", "doc", &QueryParams::new())
        .await
        .unwrap()
        .data;
    current["baz"] = json!(42);
    let updated = client
        .create_document("testdb", &current, Some("doc"))
        .await
        .unwrap();
    let rev = rev_of(&updated);
    assert!(rev.starts_with("2-"));

    let head = client
        .get_document_head("testdb", "doc", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(head.data, json!({}));
    assert_eq!(head.header("etag"), Some(format!("\"{}\"", rev).as_str()));

    let stale = client.delete_document("testdb", "doc", "1-stale").await.unwrap_err();
    assert_eq!(stale.status, 409);
    assert_eq!(
        stale.message,
        "Conflict - Specified revision is not the latest for target document"
    );

    let deleted = client.delete_document("testdb", "doc", &rev).await.unwrap();
    assert_eq!(deleted.status, 200);
    assert_eq!(deleted.message, "OK - Document successfully removed");
}

#[tokio::test]
async fn test_create_document_without_id() {
    let client = client_with_db("testdb").await;

    let created = client
        .create_document("testdb", &json!({"name": "January", "number": 1}), None)
        .await
        .unwrap();
    assert_eq!(created.status, 201);
    let id = created.data["id"].as_str().unwrap();

    let fetched = client
        .get_document("testdb", id, &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(fetched.data["number"], json!(1));
}

#[tokio::test]
async fn test_all_documents_with_json_keys() {
    let client = client_with_db("testdb").await;
    for id in ["apple", "banana", "cherry", "date"] {
        client
            .create_document("testdb", &json!({"fruit": id}), Some(id))
            .await
            .unwrap();
    }

    let query = QueryParams::new()
        .with("startkey", "banana")
        .with("endkey", "cherry")
        .with("include_docs", true);
    let range = client.get_all_documents("testdb", &query).await.unwrap();
    assert_eq!(range.data["total_rows"], json!(4));
    let ids: Vec<&str> = range.data["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["banana", "cherry"]);
    assert_eq!(range.data["rows"][1]["doc"]["fruit"], json!("cherry"));

    let query = QueryParams::new()
        .with("keys", json!(["date", "nope"]))
        .with("limit", 5);
    let keyed = client.get_all_documents("testdb", &query).await.unwrap();
    assert_eq!(keyed.data["rows"][0]["id"], json!("date"));
    assert_eq!(keyed.data["rows"][1]["error"], json!("not_found"));

    let query = QueryParams::new().with("descending", true).with("limit", 1);
    let last = client.get_all_documents("testdb", &query).await.unwrap();
    assert_eq!(last.data["rows"][0]["id"], json!("date"));
}

#[tokio::test]
async fn test_bulk_documents() {
    let client = client_with_db("testdb").await;
    let docs = vec![
        json!({"_id": "one", "n": 1}),
        json!({"_id": "two", "n": 2}),
        json!({"n": 3}),
    ];

    let saved = client
        .create_bulk_documents("testdb", &docs, Value::Null)
        .await
        .unwrap();
    assert_eq!(saved.status, 201);
    assert_eq!(saved.message, "Created – Document(s) have been created or updated");
    assert_eq!(saved.data.as_array().unwrap().len(), 3);

    let replicated = client
        .create_bulk_documents(
            "testdb",
            &[json!({"_id": "three", "_rev": "7-abc", "n": 3})],
            json!({"new_edits": false}),
        )
        .await
        .unwrap();
    assert_eq!(replicated.data[0]["rev"], json!("7-abc"));

    let doc = client
        .get_document("testdb", "three", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(doc.data["_rev"], json!("7-abc"));
}

#[tokio::test]
async fn test_design_documents() {
    let client = client_with_db("testdb").await;
    let ddoc = json!({
        "language": "javascript",
        "views": {"all": {"map": "function (doc) {emit(doc.name, doc.number)}"}},
    });

    let created = client
        .create_design_document("testdb", &ddoc, "ddoc1")
        .await
        .unwrap();
    assert_eq!(created.data["id"], json!("_design/ddoc1"));

    let fetched = client
        .get_design_document("testdb", "ddoc1", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(fetched.data["views"], ddoc["views"]);

    let info = client
        .get_design_document_info("testdb", "ddoc1")
        .await
        .unwrap();
    assert_eq!(info.data["name"], json!("ddoc1"));

    let rev = fetched.data["_rev"].as_str().unwrap();
    let deleted = client
        .delete_design_document("testdb", "_design/ddoc1", rev)
        .await
        .unwrap();
    assert_eq!(deleted.status, 200);
}

#[tokio::test]
async fn test_text_attachment_inline() {
    let client = client_with_db("testdb").await;
    let created = client
        .create_document("testdb", &json!({"title": "notes"}), Some("doc"))
        .await
        .unwrap();
    let rev = rev_of(&created);

    let added = client
        .add_attachment("testdb", "doc", "hello.txt", Some(&rev), "text/plain", "hello\nworld")
        .await
        .unwrap();
    assert_eq!(added.status, 201);
    assert_eq!(added.message, "Created - Attachment created and stored on disk");

    let query = QueryParams::new().with("attachments", true);
    let doc = client.get_document("testdb", "doc", &query).await.unwrap();
    let attachment = &doc.data["_attachments"]["hello.txt"];
    assert_eq!(attachment["content_type"], json!("text/plain"));
    let decoded = BASE64
        .decode(attachment["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, b"hello\nworld".to_vec());

    let stale = client
        .add_attachment("testdb", "doc", "other.txt", Some(&rev), "text/plain", "x")
        .await
        .unwrap_err();
    assert_eq!(stale.status, 409);
}

#[tokio::test]
async fn test_attachment_streams_both_ways() {
    let client = client_with_db("testdb").await;
    let blob: Vec<u8> = (0..256 * 1024).map(|i| (i % 253) as u8).collect();

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.bin");
    tokio::fs::write(&source, &blob).await.unwrap();

    // Upload straight from a file without buffering it
    let file = tokio::fs::File::open(&source).await.unwrap();
    let added = client
        .add_attachment(
            "testdb",
            "doc",
            "blob.bin",
            None,
            "application/octet-stream",
            Payload::reader(file),
        )
        .await
        .unwrap();
    assert!(rev_of(&added).starts_with("1-"));

    let streamed = client
        .get_attachment("testdb", "doc", "blob.bin", Vec::new(), &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(streamed.response.status, 200);
    assert_eq!(streamed.response.message, "OK - Attachment exists");
    assert_eq!(streamed.response.data, Value::Null);

    let delivered = streamed.finish().await.unwrap();
    assert_eq!(delivered.bytes, blob.len() as u64);
    assert_eq!(delivered.sink, blob);

    let target = dir.path().join("copy.bin");
    let sink = tokio::fs::File::create(&target).await.unwrap();
    client
        .get_attachment("testdb", "doc", "blob.bin", sink, &QueryParams::new())
        .await
        .unwrap()
        .finish()
        .await
        .unwrap();
    assert_eq!(tokio::fs::read(&target).await.unwrap(), blob);
}

#[tokio::test]
async fn test_attachment_missing_and_delete() {
    let client = client_with_db("testdb").await;
    let added = client
        .add_attachment("testdb", "doc", "a.txt", None, "text/plain", "a")
        .await
        .unwrap();
    let rev = rev_of(&added);

    let mut untouched = Vec::new();
    let missing = client
        .get_attachment("testdb", "doc", "b.txt", &mut untouched, &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(missing.status, 404);
    assert_eq!(
        missing.message,
        "Not Found - Specified database, document or attchment was not found"
    );
    assert!(untouched.is_empty());

    let deleted = client
        .delete_attachment("testdb", "doc", "a.txt", &rev)
        .await
        .unwrap();
    assert_eq!(deleted.message, "OK - Attachment successfully removed");

    let gone = client
        .get_attachment("testdb", "doc", "a.txt", Vec::new(), &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(gone.status, 404);
}

#[tokio::test]
async fn test_unreachable_server_and_bad_url() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = Client::new(format!("http://127.0.0.1:{}", port)).unwrap();
    let err = client.list_databases().await.unwrap_err();
    assert_eq!(err.status, 500);
    assert_eq!(err.message, "general server error");

    let client = Client::new("ftp://www.example.com").unwrap();
    let err = client.list_databases().await.unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(err.data, json!("invalid url"));
}
