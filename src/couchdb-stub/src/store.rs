//! In-memory document store with CouchDB revision semantics.
//!
//! Only the latest revision of each document is kept. Deleted documents stay
//! as tombstones so their revision chain continues when they are recreated.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("Document update conflict.")]
    Conflict,
    #[error("The database could not be created, the file already exists.")]
    DatabaseExists,
    #[error("Name: '{0}'. Only lowercase characters (a-z), digits (0-9), and any of the characters _, $, (, ), +, -, and / are allowed. Must begin with a letter.")]
    IllegalDatabaseName(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Requested more than {0} uuids")]
    TooManyUuids(usize),
}

impl StoreError {
    fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::Conflict => "conflict",
            StoreError::DatabaseExists => "file_exists",
            StoreError::IllegalDatabaseName(_) => "illegal_database_name",
            StoreError::BadRequest(_) => "bad_request",
            StoreError::TooManyUuids(_) => "forbidden",
        }
    }

    /// Per-document error entry as `_bulk_docs` reports it
    pub fn to_row(&self, id: &str) -> Value {
        json!({"id": id, "error": self.kind(), "reason": self.to_string()})
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict => StatusCode::CONFLICT,
            StoreError::DatabaseExists => StatusCode::PRECONDITION_FAILED,
            StoreError::IllegalDatabaseName(_) | StoreError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            StoreError::TooManyUuids(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(json!({"error": self.kind(), "reason": self.to_string()}))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub content_type: String,
    pub data: Vec<u8>,
    pub digest: String,
    pub revpos: u64,
}

impl Attachment {
    fn new(content_type: String, data: Vec<u8>, revpos: u64) -> Self {
        let digest = format!("sha256-{}", BASE64.encode(Sha256::digest(&data)));
        Self {
            content_type,
            data,
            digest,
            revpos,
        }
    }

    fn render(&self, inline: bool) -> Value {
        let mut entry = json!({
            "content_type": self.content_type,
            "revpos": self.revpos,
            "digest": self.digest,
            "length": self.data.len(),
        });
        if inline {
            entry["data"] = Value::String(BASE64.encode(&self.data));
        } else {
            entry["stub"] = Value::Bool(true);
        }
        entry
    }
}

#[derive(Debug, Clone)]
struct Document {
    rev: String,
    body: Map<String, Value>,
    attachments: BTreeMap<String, Attachment>,
    deleted: bool,
}

impl Document {
    fn render(&self, id: &str, inline_attachments: bool) -> Value {
        let mut out = Map::new();
        out.insert("_id".to_string(), Value::String(id.to_string()));
        out.insert("_rev".to_string(), Value::String(self.rev.clone()));
        out.extend(self.body.clone());
        if !self.attachments.is_empty() {
            let attachments = self
                .attachments
                .iter()
                .map(|(name, att)| (name.clone(), att.render(inline_attachments)))
                .collect::<Map<_, _>>();
            out.insert("_attachments".to_string(), Value::Object(attachments));
        }
        Value::Object(out)
    }
}

#[derive(Debug, Default)]
struct Database {
    docs: BTreeMap<String, Document>,
    update_seq: u64,
}

impl Database {
    fn live(&self, id: &str) -> StoreResult<&Document> {
        match self.docs.get(id) {
            Some(doc) if !doc.deleted => Ok(doc),
            Some(_) => Err(StoreError::NotFound("deleted".to_string())),
            None => Err(StoreError::NotFound("missing".to_string())),
        }
    }

    /// Check `rev` against the current revision. Creating (or recreating a
    /// tombstone) takes no revision; updating an existing document requires
    /// the current one.
    fn check_rev(&self, id: &str, rev: Option<&str>) -> StoreResult<Option<&Document>> {
        match (self.docs.get(id), rev) {
            (Some(doc), _) if doc.deleted => match rev {
                None => Ok(Some(doc)),
                Some(rev) if rev == doc.rev => Ok(Some(doc)),
                Some(_) => Err(StoreError::Conflict),
            },
            (Some(doc), Some(rev)) if rev == doc.rev => Ok(Some(doc)),
            (Some(_), _) => Err(StoreError::Conflict),
            (None, None) => Ok(None),
            (None, Some(_)) => Err(StoreError::Conflict),
        }
    }

    fn commit(&mut self, id: &str, doc: Document) -> String {
        let rev = doc.rev.clone();
        self.docs.insert(id.to_string(), doc);
        self.update_seq += 1;
        rev
    }

    fn live_count(&self) -> usize {
        self.docs.values().filter(|doc| !doc.deleted).count()
    }
}

/// Options for `_all_docs`, with JSON-valued keys already decoded
#[derive(Debug, Default, Clone)]
pub struct AllDocsQuery {
    pub include_docs: bool,
    pub attachments: bool,
    pub descending: bool,
    pub inclusive_end: bool,
    pub limit: Option<usize>,
    pub skip: usize,
    pub key: Option<String>,
    pub keys: Option<Vec<String>>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// All databases, keyed by name
#[derive(Debug, Default)]
pub struct Store {
    databases: BTreeMap<String, Database>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_databases(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    pub fn create_database(&mut self, name: &str) -> StoreResult<()> {
        validate_database_name(name)?;
        if self.databases.contains_key(name) {
            return Err(StoreError::DatabaseExists);
        }
        self.databases.insert(name.to_string(), Database::default());
        tracing::info!(db = %name, "database created");
        Ok(())
    }

    pub fn delete_database(&mut self, name: &str) -> StoreResult<()> {
        validate_database_name(name)?;
        self.databases
            .remove(name)
            .map(|_| tracing::info!(db = %name, "database deleted"))
            .ok_or_else(|| StoreError::NotFound("Database does not exist.".to_string()))
    }

    pub fn database_info(&self, name: &str) -> StoreResult<Value> {
        let db = self.database(name)?;
        let deleted = db.docs.len() - db.live_count();
        Ok(json!({
            "db_name": name,
            "doc_count": db.live_count(),
            "doc_del_count": deleted,
            "update_seq": db.update_seq.to_string(),
            "purge_seq": 0,
            "compact_running": false,
            "instance_start_time": "0",
        }))
    }

    /// Create or update `id`. The expected revision comes from the body's
    /// `_rev` or, failing that, from `rev`.
    pub fn put_document(
        &mut self,
        db: &str,
        id: &str,
        body: Value,
        rev: Option<&str>,
    ) -> StoreResult<String> {
        let Value::Object(mut body) = body else {
            return Err(StoreError::BadRequest(
                "Document must be a JSON object".to_string(),
            ));
        };
        if id.is_empty() {
            return Err(StoreError::BadRequest("Document id must not be empty".to_string()));
        }

        let body_rev = match body.remove("_rev") {
            Some(Value::String(rev)) => Some(rev),
            Some(_) => return Err(StoreError::BadRequest("Invalid rev format".to_string())),
            None => None,
        };
        body.remove("_id");
        let deleted = matches!(body.remove("_deleted"), Some(Value::Bool(true)));
        let inline = body.remove("_attachments");
        let expected = body_rev.as_deref().or(rev);

        let database = self.database_mut(db)?;
        let previous = database.check_rev(id, expected)?.cloned();
        let (generation, prev_rev) = next_generation(previous.as_ref());

        let mut attachments = BTreeMap::new();
        if let Some(Value::Object(entries)) = inline {
            for (name, entry) in entries {
                if let Some(data) = entry.get("data").and_then(Value::as_str) {
                    let bytes = BASE64.decode(data).map_err(|_| {
                        StoreError::BadRequest(format!("Invalid attachment data for {}", name))
                    })?;
                    let content_type = entry
                        .get("content_type")
                        .and_then(Value::as_str)
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    attachments.insert(name, Attachment::new(content_type, bytes, generation));
                } else if let Some(existing) = previous
                    .as_ref()
                    .filter(|doc| !doc.deleted)
                    .and_then(|doc| doc.attachments.get(&name))
                {
                    attachments.insert(name, existing.clone());
                }
            }
        }

        let rev = revision(generation, prev_rev.as_deref(), &Value::Object(body.clone()));
        let doc = Document {
            rev,
            body: if deleted { Map::new() } else { body },
            attachments: if deleted { BTreeMap::new() } else { attachments },
            deleted,
        };
        let rev = database.commit(id, doc);
        tracing::debug!(db = %db, id = %id, rev = %rev, "document saved");
        Ok(rev)
    }

    /// Store a document under its `_id`, or a fresh uuid when it has none
    pub fn post_document(&mut self, db: &str, body: Value) -> StoreResult<(String, String)> {
        let id = match body.get("_id") {
            Some(Value::String(id)) => id.clone(),
            Some(_) => {
                return Err(StoreError::BadRequest(
                    "Document id must be a string".to_string(),
                ))
            }
            None => new_uuid(),
        };
        let rev = self.put_document(db, &id, body, None)?;
        Ok((id, rev))
    }

    pub fn get_document(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        inline_attachments: bool,
    ) -> StoreResult<Value> {
        let doc = self.database(db)?.live(id)?;
        if let Some(rev) = rev {
            if rev != doc.rev {
                return Err(StoreError::NotFound("missing".to_string()));
            }
        }
        Ok(doc.render(id, inline_attachments))
    }

    /// Current revision of a live document
    pub fn current_rev(&self, db: &str, id: &str) -> StoreResult<String> {
        Ok(self.database(db)?.live(id)?.rev.clone())
    }

    pub fn delete_document(
        &mut self,
        db: &str,
        id: &str,
        rev: Option<&str>,
    ) -> StoreResult<String> {
        let database = self.database_mut(db)?;
        let current = database.live(id)?;
        if rev != Some(current.rev.as_str()) {
            return Err(StoreError::Conflict);
        }
        let (generation, prev_rev) = next_generation(Some(current));
        let doc = Document {
            rev: revision(generation, prev_rev.as_deref(), &Value::Null),
            body: Map::new(),
            attachments: BTreeMap::new(),
            deleted: true,
        };
        let rev = database.commit(id, doc);
        tracing::debug!(db = %db, id = %id, rev = %rev, "document deleted");
        Ok(rev)
    }

    pub fn all_docs(&self, db: &str, query: &AllDocsQuery) -> StoreResult<Value> {
        let database = self.database(db)?;
        let total_rows = database.live_count();

        let row = |id: &str, doc: &Document| {
            let mut row = json!({"id": id, "key": id, "value": {"rev": doc.rev}});
            if query.include_docs {
                row["doc"] = doc.render(id, query.attachments);
            }
            row
        };

        if let Some(keys) = &query.keys {
            let rows = keys
                .iter()
                .map(|key| match database.docs.get(key) {
                    Some(doc) if doc.deleted => json!({
                        "id": key,
                        "key": key,
                        "value": {"rev": doc.rev, "deleted": true},
                        "doc": null,
                    }),
                    Some(doc) => row(key, doc),
                    None => json!({"key": key, "error": "not_found"}),
                })
                .skip(query.skip)
                .take(query.limit.unwrap_or(usize::MAX))
                .collect::<Vec<_>>();
            return Ok(json!({"total_rows": total_rows, "offset": query.skip, "rows": rows}));
        }

        let live = database.docs.iter().filter(|(_, doc)| !doc.deleted);
        let ordered: Vec<(&String, &Document)> = if query.descending {
            live.rev().collect()
        } else {
            live.collect()
        };

        // A single key is a range that starts and ends on it
        let (start, end, inclusive_end) = match &query.key {
            Some(key) => (Some(key), Some(key), true),
            None => (query.start.as_ref(), query.end.as_ref(), query.inclusive_end),
        };
        let before_start = |id: &str| match start {
            Some(start) if query.descending => id > start.as_str(),
            Some(start) => id < start.as_str(),
            None => false,
        };
        let past_end = |id: &str| match end {
            Some(end) if query.descending && inclusive_end => id < end.as_str(),
            Some(end) if query.descending => id <= end.as_str(),
            Some(end) if inclusive_end => id > end.as_str(),
            Some(end) => id >= end.as_str(),
            None => false,
        };

        let skipped = ordered.iter().take_while(|(id, _)| before_start(id)).count();
        let rows = ordered
            .iter()
            .skip(skipped)
            .take_while(|(id, _)| !past_end(id))
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, doc)| row(id, doc))
            .collect::<Vec<_>>();

        Ok(json!({
            "total_rows": total_rows,
            "offset": (skipped + query.skip).min(total_rows),
            "rows": rows,
        }))
    }

    /// Save each document independently; failures are reported per row.
    /// With `new_edits` off, the supplied `_rev` is stored as-is.
    pub fn bulk_docs(
        &mut self,
        db: &str,
        docs: Vec<Value>,
        new_edits: bool,
    ) -> StoreResult<Vec<Value>> {
        self.database(db)?;
        let mut results = Vec::with_capacity(docs.len());

        for doc in docs {
            let id = match doc.get("_id") {
                Some(Value::String(id)) => id.clone(),
                _ => new_uuid(),
            };

            let outcome = if new_edits {
                self.put_document(db, &id, doc, None)
            } else {
                self.replicate_document(db, &id, doc)
            };

            results.push(match outcome {
                Ok(rev) => json!({"ok": true, "id": id, "rev": rev}),
                Err(err) => err.to_row(&id),
            });
        }
        Ok(results)
    }

    fn replicate_document(&mut self, db: &str, id: &str, body: Value) -> StoreResult<String> {
        let Value::Object(mut body) = body else {
            return Err(StoreError::BadRequest("Document must be a JSON object".to_string()));
        };
        let Some(Value::String(rev)) = body.remove("_rev") else {
            return Err(StoreError::BadRequest("Document rev is required".to_string()));
        };
        body.remove("_id");
        let deleted = matches!(body.remove("_deleted"), Some(Value::Bool(true)));
        let doc = Document {
            rev,
            body,
            attachments: BTreeMap::new(),
            deleted,
        };
        Ok(self.database_mut(db)?.commit(id, doc))
    }

    /// Add or replace an attachment, creating the document when it is
    /// missing and no revision is given.
    pub fn put_attachment(
        &mut self,
        db: &str,
        id: &str,
        name: &str,
        rev: Option<&str>,
        content_type: String,
        data: Vec<u8>,
    ) -> StoreResult<String> {
        if name.is_empty() {
            return Err(StoreError::BadRequest("Attachment name must not be empty".to_string()));
        }
        let database = self.database_mut(db)?;
        let previous = database.check_rev(id, rev)?.cloned();
        let (generation, prev_rev) = next_generation(previous.as_ref());

        // Tombstones carry no body or attachments
        let (body, mut attachments) = match previous {
            Some(doc) => (doc.body, doc.attachments),
            None => (Map::new(), BTreeMap::new()),
        };
        let length = data.len();
        attachments.insert(name.to_string(), Attachment::new(content_type, data, generation));

        let hashed = json!({"body": body, "attachment": name, "length": length});
        let doc = Document {
            rev: revision(generation, prev_rev.as_deref(), &hashed),
            body,
            attachments,
            deleted: false,
        };
        let rev = database.commit(id, doc);
        tracing::debug!(db = %db, id = %id, attachment = %name, bytes = length, "attachment saved");
        Ok(rev)
    }

    pub fn get_attachment(&self, db: &str, id: &str, name: &str) -> StoreResult<Attachment> {
        self.database(db)?
            .live(id)?
            .attachments
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Document is missing attachment".to_string()))
    }

    pub fn delete_attachment(
        &mut self,
        db: &str,
        id: &str,
        name: &str,
        rev: Option<&str>,
    ) -> StoreResult<String> {
        let database = self.database_mut(db)?;
        let current = database.live(id)?;
        if rev != Some(current.rev.as_str()) {
            return Err(StoreError::Conflict);
        }
        if !current.attachments.contains_key(name) {
            return Err(StoreError::NotFound("Document is missing attachment".to_string()));
        }

        let mut doc = current.clone();
        let (generation, prev_rev) = next_generation(Some(current));
        doc.attachments.remove(name);
        doc.rev = revision(
            generation,
            prev_rev.as_deref(),
            &json!({"body": doc.body, "removed": name}),
        );
        Ok(database.commit(id, doc))
    }

    fn database(&self, name: &str) -> StoreResult<&Database> {
        self.databases
            .get(name)
            .ok_or_else(|| StoreError::NotFound("Database does not exist.".to_string()))
    }

    fn database_mut(&mut self, name: &str) -> StoreResult<&mut Database> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound("Database does not exist.".to_string()))
    }
}

/// Lowercase letter first, then `[a-z0-9_$()+/-]`
pub fn validate_database_name(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some('a'..='z'))
        && chars.all(|c| {
            matches!(c, 'a'..='z' | '0'..='9' | '_' | '$' | '(' | ')' | '+' | '/' | '-')
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::IllegalDatabaseName(name.to_string()))
    }
}

pub fn uuids(count: usize, max: usize) -> StoreResult<Vec<String>> {
    if count > max {
        return Err(StoreError::TooManyUuids(max));
    }
    Ok((0..count).map(|_| new_uuid()).collect())
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn next_generation(previous: Option<&Document>) -> (u64, Option<String>) {
    match previous {
        Some(doc) => (generation_of(&doc.rev) + 1, Some(doc.rev.clone())),
        None => (1, None),
    }
}

fn generation_of(rev: &str) -> u64 {
    rev.split_once('-')
        .and_then(|(generation, _)| generation.parse().ok())
        .unwrap_or(0)
}

/// `N-<hash>` where the hash covers the previous revision and the content
fn revision(generation: u64, previous: Option<&str>, content: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.unwrap_or("").as_bytes());
    hasher.update(content.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", generation, &digest[..32])
}
