//! Attachment Streaming Example
//!
//! Upload a file as an attachment without buffering it, then stream it
//! back into a second file.
//!
//! Run with: cargo run --example attachment_stream -- /bin/sh

use couchdb::{Client, DbResult, Payload, QueryParams};
use serde_json::json;

fn check(result: DbResult) -> anyhow::Result<couchdb::DbResponse> {
    result.map_err(|failure| {
        anyhow::anyhow!("{} {}: {}", failure.status, failure.message, failure.data)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let source = std::env::args().nth(1).unwrap_or_else(|| "/bin/sh".to_string());
    let client = Client::from_env()?;
    let db = format!("attachments_{}", std::process::id());

    check(client.create_database(&db).await)?;
    let created = check(
        client
            .create_document(
                &db,
                &json!({"title": "document with large attachment"}),
                Some("myDoc"),
            )
            .await,
    )?;
    let rev = created.data["rev"].as_str().unwrap_or_default().to_string();

    let file = tokio::fs::File::open(&source).await?;
    let added = check(
        client
            .add_attachment(
                &db,
                "myDoc",
                "payload.bin",
                Some(&rev),
                "application/octet-stream",
                Payload::reader(file),
            )
            .await,
    )?;
    println!("📎 {} ({} ms)", added.message, added.duration);

    let doc = check(client.get_document(&db, "myDoc", &QueryParams::new()).await)?;
    println!("{:#}", doc.data["_attachments"]);

    let target = std::env::temp_dir().join(format!("couchdb_attachment_{}", std::process::id()));
    let sink = tokio::fs::File::create(&target).await?;

    // Phase one: headers
    let streamed = client
        .get_attachment(&db, "myDoc", "payload.bin", sink, &QueryParams::new())
        .await
        .map_err(|failure| anyhow::anyhow!("{} {}", failure.status, failure.message))?;
    println!("⬇️  {} {}", streamed.response.status, streamed.response.message);

    // Phase two: body
    let (_, bytes) = streamed.drain.run().await?;
    println!("   wrote {} bytes to {}", bytes, target.display());

    let original = tokio::fs::metadata(&source).await?.len();
    println!("   sizes match: {}", original == bytes);

    check(client.delete_database(&db).await)?;
    Ok(())
}
