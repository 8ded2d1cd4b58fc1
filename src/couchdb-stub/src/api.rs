use actix_web::http::header::{self, ETag, EntityTag};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::StubConfig;
use crate::store::{self, AllDocsQuery, Store, StoreError};

/// Shared application state
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
    pub config: Arc<StubConfig>,
}

impl AppState {
    pub fn new(config: StubConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::new())),
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UuidsParams {
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevParams {
    pub rev: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocParams {
    pub rev: Option<String>,
    #[serde(default)]
    pub attachments: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkDocsRequest {
    pub docs: Vec<Value>,
    #[serde(default = "default_new_edits")]
    pub new_edits: bool,
}

fn default_new_edits() -> bool {
    true
}

/// `_all_docs` query string; key-like parameters are JSON encoded
#[derive(Debug, Default, Deserialize)]
pub struct AllDocsParams {
    #[serde(default)]
    pub include_docs: bool,
    #[serde(default)]
    pub attachments: bool,
    #[serde(default)]
    pub descending: bool,
    pub inclusive_end: Option<bool>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub skip: usize,
    pub key: Option<String>,
    pub keys: Option<String>,
    pub startkey: Option<String>,
    pub start_key: Option<String>,
    pub endkey: Option<String>,
    pub end_key: Option<String>,
}

impl AllDocsParams {
    fn into_query(self) -> Result<AllDocsQuery, StoreError> {
        let keys = match self.keys {
            Some(raw) => Some(serde_json::from_str::<Vec<String>>(&raw).map_err(|_| {
                StoreError::BadRequest("`keys` must be an array of strings".to_string())
            })?),
            None => None,
        };

        Ok(AllDocsQuery {
            include_docs: self.include_docs,
            attachments: self.attachments,
            descending: self.descending,
            inclusive_end: self.inclusive_end.unwrap_or(true),
            limit: self.limit,
            skip: self.skip,
            key: decode_key("key", self.key)?,
            keys,
            start: decode_key("startkey", self.startkey.or(self.start_key))?,
            end: decode_key("endkey", self.endkey.or(self.end_key))?,
        })
    }
}

fn decode_key(name: &str, raw: Option<String>) -> Result<Option<String>, StoreError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::String(key)) => Ok(Some(key)),
        _ => Err(StoreError::BadRequest(format!(
            "`{}` must be a JSON encoded string",
            name
        ))),
    }
}

fn parse_json(body: &[u8]) -> Result<Value, StoreError> {
    serde_json::from_slice(body)
        .map_err(|_| StoreError::BadRequest("invalid UTF-8 JSON".to_string()))
}

fn etag(tag: &str) -> ETag {
    ETag(EntityTag::new_strong(tag.to_string()))
}

fn saved(status: StatusCode, id: &str, rev: &str) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(etag(rev))
        .json(json!({"ok": true, "id": id, "rev": rev}))
}

fn design_id(ddoc: &str) -> String {
    format!("_design/{}", ddoc)
}

/// Server welcome
/// GET /
pub async fn welcome() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "couchdb": "Welcome",
        "version": env!("CARGO_PKG_VERSION"),
        "vendor": {"name": "couchdb-stub"},
        "features": [],
    })))
}

/// GET /_uuids?count=N
pub async fn uuids(
    query: web::Query<UuidsParams>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let count = query.count.unwrap_or(1);
    let uuids = store::uuids(count, state.config.max_uuids)?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "must-revalidate, no-cache"))
        .json(json!({"uuids": uuids})))
}

/// GET /_all_dbs
pub async fn all_dbs(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let store = state.store.lock().await;
    Ok(HttpResponse::Ok().json(store.list_databases()))
}

/// PUT /{db}
#[tracing::instrument(skip(state))]
pub async fn create_database(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    state.store.lock().await.create_database(&db)?;
    Ok(HttpResponse::Created().json(json!({"ok": true})))
}

/// GET /{db} and HEAD /{db}
pub async fn database_info(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    let info = state.store.lock().await.database_info(&db)?;
    Ok(HttpResponse::Ok().json(info))
}

/// DELETE /{db}
#[tracing::instrument(skip(state))]
pub async fn delete_database(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    state.store.lock().await.delete_database(&db)?;
    Ok(HttpResponse::Ok().json(json!({"ok": true})))
}

/// POST /{db}
#[tracing::instrument(skip(body, state))]
pub async fn post_document(
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    let doc = parse_json(&body)?;
    let (id, rev) = state.store.lock().await.post_document(&db, doc)?;
    Ok(saved(StatusCode::CREATED, &id, &rev))
}

/// GET /{db}/_all_docs
pub async fn all_docs(
    path: web::Path<String>,
    query: web::Query<AllDocsParams>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    let query = query.into_inner().into_query()?;
    let result = state.store.lock().await.all_docs(&db, &query)?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /{db}/_all_docs with `{"keys": [...]}`
pub async fn all_docs_keys(
    path: web::Path<String>,
    query: web::Query<AllDocsParams>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    let mut query = query.into_inner().into_query()?;
    let body = parse_json(&body)?;
    let keys = body
        .get("keys")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::BadRequest("`keys` body member must be an array".to_string()))?;
    query.keys = Some(
        keys.iter()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect(),
    );
    let result = state.store.lock().await.all_docs(&db, &query)?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /{db}/_bulk_docs
#[tracing::instrument(skip(body, state))]
pub async fn bulk_docs(
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let db = path.into_inner();
    let request: BulkDocsRequest = serde_json::from_slice(&body).map_err(|_| {
        StoreError::BadRequest("POST body must include `docs` parameter.".to_string())
    })?;
    let results = state
        .store
        .lock()
        .await
        .bulk_docs(&db, request.docs, request.new_edits)?;
    Ok(HttpResponse::Created().json(results))
}

async fn read_document(
    state: &AppState,
    req: &HttpRequest,
    db: &str,
    id: &str,
    params: DocParams,
) -> ActixResult<HttpResponse> {
    let store = state.store.lock().await;
    let doc = store.get_document(db, id, params.rev.as_deref(), params.attachments)?;
    let rev = store.current_rev(db, id)?;

    let cached = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_matches('"') == rev)
        .unwrap_or(false);
    if cached {
        return Ok(HttpResponse::NotModified().insert_header(etag(&rev)).finish());
    }

    Ok(HttpResponse::Ok().insert_header(etag(&rev)).json(doc))
}

async fn write_document(
    state: &AppState,
    db: &str,
    id: &str,
    rev: Option<String>,
    body: &[u8],
) -> ActixResult<HttpResponse> {
    let doc = parse_json(body)?;
    let rev = state
        .store
        .lock()
        .await
        .put_document(db, id, doc, rev.as_deref())?;
    Ok(saved(StatusCode::CREATED, id, &rev))
}

async fn remove_document(
    state: &AppState,
    db: &str,
    id: &str,
    rev: Option<String>,
) -> ActixResult<HttpResponse> {
    let rev = state
        .store
        .lock()
        .await
        .delete_document(db, id, rev.as_deref())?;
    Ok(saved(StatusCode::OK, id, &rev))
}

/// GET /{db}/{doc} and HEAD /{db}/{doc}
#[tracing::instrument(skip(query, req, state))]
pub async fn get_document(
    path: web::Path<(String, String)>,
    query: web::Query<DocParams>,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, id) = path.into_inner();
    read_document(&state, &req, &db, &id, query.into_inner()).await
}

/// PUT /{db}/{doc}
#[tracing::instrument(skip(query, body, state))]
pub async fn put_document(
    path: web::Path<(String, String)>,
    query: web::Query<RevParams>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, id) = path.into_inner();
    write_document(&state, &db, &id, query.into_inner().rev, &body).await
}

/// DELETE /{db}/{doc}?rev=
#[tracing::instrument(skip(query, state))]
pub async fn delete_document(
    path: web::Path<(String, String)>,
    query: web::Query<RevParams>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, id) = path.into_inner();
    remove_document(&state, &db, &id, query.into_inner().rev).await
}

/// GET /{db}/_design/{ddoc} and HEAD /{db}/_design/{ddoc}
pub async fn get_design_document(
    path: web::Path<(String, String)>,
    query: web::Query<DocParams>,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, ddoc) = path.into_inner();
    read_document(&state, &req, &db, &design_id(&ddoc), query.into_inner()).await
}

/// GET /{db}/_design/{ddoc}/_info
pub async fn design_document_info(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, ddoc) = path.into_inner();
    state.store.lock().await.current_rev(&db, &design_id(&ddoc))?;
    Ok(HttpResponse::Ok().json(json!({
        "name": ddoc,
        "view_index": {
            "language": "javascript",
            "updater_running": false,
            "waiting_clients": 0,
        },
    })))
}

/// PUT /{db}/_design/{ddoc}
pub async fn put_design_document(
    path: web::Path<(String, String)>,
    query: web::Query<RevParams>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, ddoc) = path.into_inner();
    write_document(&state, &db, &design_id(&ddoc), query.into_inner().rev, &body).await
}

/// DELETE /{db}/_design/{ddoc}?rev=
pub async fn delete_design_document(
    path: web::Path<(String, String)>,
    query: web::Query<RevParams>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, ddoc) = path.into_inner();
    remove_document(&state, &db, &design_id(&ddoc), query.into_inner().rev).await
}

/// PUT /{db}/{doc}/{attachment}?rev=
#[tracing::instrument(skip(query, req, body, state))]
pub async fn put_attachment(
    path: web::Path<(String, String, String)>,
    query: web::Query<RevParams>,
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, id, name) = path.into_inner();
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let rev = state.store.lock().await.put_attachment(
        &db,
        &id,
        &name,
        query.into_inner().rev.as_deref(),
        content_type,
        body.to_vec(),
    )?;
    Ok(saved(StatusCode::CREATED, &id, &rev))
}

/// GET /{db}/{doc}/{attachment} and HEAD /{db}/{doc}/{attachment}
#[tracing::instrument(skip(state))]
pub async fn get_attachment(
    path: web::Path<(String, String, String)>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, id, name) = path.into_inner();
    let attachment = state.store.lock().await.get_attachment(&db, &id, &name)?;
    tracing::debug!(bytes = attachment.data.len(), "serving attachment");

    Ok(HttpResponse::Ok()
        .content_type(attachment.content_type.as_str())
        .insert_header(etag(&attachment.digest))
        .body(attachment.data))
}

/// DELETE /{db}/{doc}/{attachment}?rev=
#[tracing::instrument(skip(query, state))]
pub async fn delete_attachment(
    path: web::Path<(String, String, String)>,
    query: web::Query<RevParams>,
    state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (db, id, name) = path.into_inner();
    let rev = state
        .store
        .lock()
        .await
        .delete_attachment(&db, &id, &name, query.into_inner().rev.as_deref())?;
    Ok(saved(StatusCode::OK, &id, &rev))
}

/// Fallback for every unrouted path
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({"error": "not_found", "reason": "missing"}))
}

/// Configure routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(welcome))
        .route("/_uuids", web::get().to(uuids))
        .route("/_all_dbs", web::get().to(all_dbs))
        // Underscore endpoints MUST come before the document routes
        .route("/{db}/_all_docs", web::get().to(all_docs))
        .route("/{db}/_all_docs", web::post().to(all_docs_keys))
        .route("/{db}/_bulk_docs", web::post().to(bulk_docs))
        .route(
            "/{db}/_design/{ddoc}/_info",
            web::get().to(design_document_info),
        )
        .route("/{db}/_design/{ddoc}", web::get().to(get_design_document))
        .route("/{db}/_design/{ddoc}", web::head().to(get_design_document))
        .route("/{db}/_design/{ddoc}", web::put().to(put_design_document))
        .route(
            "/{db}/_design/{ddoc}",
            web::delete().to(delete_design_document),
        )
        // Attachment names may contain slashes
        .route("/{db}/{doc}/{name:.+}", web::get().to(get_attachment))
        .route("/{db}/{doc}/{name:.+}", web::head().to(get_attachment))
        .route("/{db}/{doc}/{name:.+}", web::put().to(put_attachment))
        .route("/{db}/{doc}/{name:.+}", web::delete().to(delete_attachment))
        .route("/{db}/{doc}", web::get().to(get_document))
        .route("/{db}/{doc}", web::head().to(get_document))
        .route("/{db}/{doc}", web::put().to(put_document))
        .route("/{db}/{doc}", web::delete().to(delete_document))
        .route("/{db}", web::put().to(create_database))
        .route("/{db}", web::get().to(database_info))
        .route("/{db}", web::head().to(database_info))
        .route("/{db}", web::post().to(post_document))
        .route("/{db}", web::delete().to(delete_database));
}
