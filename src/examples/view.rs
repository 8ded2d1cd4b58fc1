//! View Example
//!
//! Insert some documents, define a view in a design document and query it.
//!
//! Run with: cargo run --example view

use couchdb::{Client, DbResult, QueryParams};
use serde_json::json;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

fn check(result: DbResult) -> anyhow::Result<couchdb::DbResponse> {
    result.map_err(|failure| {
        anyhow::anyhow!("{} {}: {}", failure.status, failure.message, failure.data)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = Client::from_env()?;
    let db = format!("views_{}", std::process::id());

    check(client.create_database(&db).await)?;
    let docs: Vec<_> = MONTHS
        .iter()
        .enumerate()
        .map(|(idx, month)| json!({"name": month, "number": idx + 1}))
        .collect();
    check(client.create_bulk_documents(&db, &docs, json!({})).await)?;

    let ddoc = json!({
        "language": "javascript",
        "views": {"all": {"map": "function (doc) {emit(doc.name, doc.number)}"}},
    });
    check(client.create_design_document(&db, &ddoc, "ddoc1").await)?;

    let info = check(client.get_design_document_info(&db, "ddoc1").await)?;
    println!("{:#}", info.data);

    let query = QueryParams::new()
        .with("startkey", "A")
        .with("endkey", "D")
        .with("limit", 3);
    let view = check(client.get_view(&db, "ddoc1", "all", &query).await)?;
    for row in view.data["rows"].as_array().into_iter().flatten() {
        println!("  {} -> {}", row["key"], row["value"]);
    }

    check(client.delete_database(&db).await)?;
    Ok(())
}
