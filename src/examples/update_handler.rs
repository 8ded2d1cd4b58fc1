//! Update Handler Example
//!
//! Increment a counter through a design document update function.
//!
//! Run with: cargo run --example update_handler

use couchdb::{Client, DbResult, QueryParams};
use serde_json::json;

fn check(result: DbResult) -> anyhow::Result<couchdb::DbResponse> {
    result.map_err(|failure| {
        anyhow::anyhow!("{} {}: {}", failure.status, failure.message, failure.data)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::from_env()?;
    let db = format!("update_{}", std::process::id());

    check(client.create_database(&db).await)?;
    check(
        client
            .create_document(&db, &json!({"name": "foo", "count": 0}), Some("mydoc"))
            .await,
    )?;

    let ddoc = json!({
        "language": "javascript",
        "updates": {
            "add": "function (doc, req) { var body = JSON.parse(req.body); doc.count += body.amount; return [doc, JSON.stringify({count: doc.count})] }",
        },
    });
    check(client.create_design_document(&db, &ddoc, "ddoc1").await)?;

    for _ in 0..3 {
        let updated = check(
            client
                .execute_update_function(&db, "ddoc1", "add", &json!({"amount": 10}), Some("mydoc"))
                .await,
        )?;
        println!("➕ {}", updated.data);
    }

    let doc = check(client.get_document(&db, "mydoc", &QueryParams::new()).await)?;
    println!("{:#}", doc.data);

    check(client.delete_database(&db).await)?;
    Ok(())
}
