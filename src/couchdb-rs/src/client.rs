use couchdb_core::url::{encode_doc_id, encode_segment};
use couchdb_core::{
    Config, DbResponse, DbResult, Engine, Method, Payload, QueryParams, RequestError,
    RequestParams, StatusTable, Streamed,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::io::AsyncWrite;

use crate::tables;
use crate::{ClientError, Result};

/// CouchDB HTTP API client
///
/// Every operation settles as `Ok(DbResponse)` for statuses below 400 and
/// `Err(DbResponse)` otherwise, including local and transport failures.
/// Cloning is cheap; clones share the connection pool and the timeout.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    engine: Engine,
}

impl Client {
    /// Create a client for the given server URL with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(&Config {
            base_url: base_url.into(),
            ..Config::default()
        })
    }

    pub fn with_config(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            engine: Engine::new(config)?,
        })
    }

    /// Configure from `COUCHDB_URL` / `DB_URL` and friends
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env().map_err(ClientError::Config)?;
        Self::with_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.engine.timeout()
    }

    /// Applies to requests started afterwards, on this client and its clones
    pub fn set_timeout(&self, timeout: Duration) {
        self.engine.set_timeout(timeout);
    }

    // Server

    /// Server welcome and version information
    pub async fn get_info(&self) -> DbResult {
        self.send(Method::GET, format!("{}/", self.base_url), tables::GET_INFO)
            .await
    }

    /// Request `count` server generated UUIDs
    pub async fn get_uuids(&self, count: u32) -> DbResult {
        let query = QueryParams::new().with("count", count);
        let url = format!("{}/_uuids{}", self.base_url, query.to_query_string());
        self.send(Method::GET, url, tables::GET_UUIDS).await
    }

    // Databases

    pub async fn list_databases(&self) -> DbResult {
        let url = format!("{}/_all_dbs", self.base_url);
        self.send(Method::GET, url, tables::LIST_DATABASES).await
    }

    pub async fn create_database(&self, db: &str) -> DbResult {
        self.send(Method::PUT, self.db_url(db), tables::CREATE_DATABASE)
            .await
    }

    pub async fn get_database(&self, db: &str) -> DbResult {
        self.send(Method::GET, self.db_url(db), tables::GET_DATABASE)
            .await
    }

    /// Check existence without a body; `data` is `{}`
    pub async fn get_database_head(&self, db: &str) -> DbResult {
        self.send(Method::HEAD, self.db_url(db), tables::GET_DATABASE)
            .await
    }

    pub async fn delete_database(&self, db: &str) -> DbResult {
        self.send(Method::DELETE, self.db_url(db), tables::DELETE_DATABASE)
            .await
    }

    // Documents

    /// `_all_docs` with options such as `include_docs`, `limit` or JSON
    /// encoded `startkey` / `endkey` / `keys`
    pub async fn get_all_documents(&self, db: &str, query: &QueryParams) -> DbResult {
        let url = format!("{}/_all_docs{}", self.db_url(db), query.to_query_string());
        self.send(Method::GET, url, tables::GET_ALL_DOCUMENTS).await
    }

    pub async fn get_document(&self, db: &str, id: &str, query: &QueryParams) -> DbResult {
        let url = format!("{}{}", self.doc_url(db, id), query.to_query_string());
        self.send(Method::GET, url, tables::GET_DOCUMENT).await
    }

    /// Revision and size of a document without its body
    pub async fn get_document_head(&self, db: &str, id: &str, query: &QueryParams) -> DbResult {
        let url = format!("{}{}", self.doc_url(db, id), query.to_query_string());
        self.send(Method::HEAD, url, tables::GET_DOCUMENT).await
    }

    /// Create or update a document.
    ///
    /// With an `id` this is `PUT /{db}/{id}`; updates need the current
    /// `_rev` inside `doc`. Without one the server assigns the id.
    pub async fn create_document<T>(&self, db: &str, doc: &T, id: Option<&str>) -> DbResult
    where
        T: Serialize + ?Sized,
    {
        let payload = Payload::json(doc)?;
        let (method, url) = match id {
            Some(id) => (Method::PUT, self.doc_url(db, id)),
            None => (Method::POST, self.db_url(db)),
        };
        self.send_with(
            RequestParams::new(method, url, tables::CREATE_DOCUMENT).payload(payload),
        )
        .await
    }

    pub async fn delete_document(&self, db: &str, id: &str, rev: &str) -> DbResult {
        let url = format!("{}{}", self.doc_url(db, id), rev_query(rev));
        self.send(Method::DELETE, url, tables::DELETE_DOCUMENT).await
    }

    /// Save several documents at once. Object `options` (for example
    /// `{"new_edits": false}`) are merged into the request body.
    pub async fn create_bulk_documents<T>(&self, db: &str, docs: &[T], options: Value) -> DbResult
    where
        T: Serialize,
    {
        let docs = serde_json::to_value(docs).map_err(RequestError::Serialize)?;
        let mut body = Map::new();
        body.insert("docs".to_string(), docs);
        if let Value::Object(options) = options {
            body.extend(options);
        }
        let url = format!("{}/_bulk_docs", self.db_url(db));
        self.send_with(
            RequestParams::new(Method::POST, url, tables::CREATE_BULK_DOCUMENTS)
                .payload(Payload::Json(Value::Object(body))),
        )
        .await
    }

    /// Mango query
    pub async fn find_documents<T>(&self, db: &str, query: &T) -> DbResult
    where
        T: Serialize + ?Sized,
    {
        let url = format!("{}/_find", self.db_url(db));
        self.send_with(
            RequestParams::new(Method::POST, url, tables::FIND_DOCUMENTS)
                .payload(Payload::json(query)?),
        )
        .await
    }

    // Mango indexes

    pub async fn create_index<T>(&self, db: &str, index: &T) -> DbResult
    where
        T: Serialize + ?Sized,
    {
        let url = format!("{}/_index", self.db_url(db));
        self.send_with(
            RequestParams::new(Method::POST, url, tables::CREATE_INDEX)
                .payload(Payload::json(index)?),
        )
        .await
    }

    pub async fn get_index(&self, db: &str) -> DbResult {
        let url = format!("{}/_index", self.db_url(db));
        self.send(Method::GET, url, tables::GET_INDEX).await
    }

    /// `ddoc` may be given with or without its `_design/` prefix
    pub async fn delete_index(&self, db: &str, ddoc: &str, name: &str) -> DbResult {
        let ddoc = ddoc.strip_prefix("_design/").unwrap_or(ddoc);
        let url = format!(
            "{}/_index/{}/json/{}",
            self.db_url(db),
            encode_segment(ddoc),
            encode_segment(name)
        );
        self.send(Method::DELETE, url, tables::DELETE_INDEX).await
    }

    // Design documents

    pub async fn get_design_document(
        &self,
        db: &str,
        ddoc: &str,
        query: &QueryParams,
    ) -> DbResult {
        let url = format!("{}{}", self.design_url(db, ddoc), query.to_query_string());
        self.send(Method::GET, url, tables::GET_DESIGN_DOCUMENT).await
    }

    pub async fn get_design_document_info(&self, db: &str, ddoc: &str) -> DbResult {
        let url = format!("{}/_info", self.design_url(db, ddoc));
        self.send(Method::GET, url, tables::GET_DESIGN_DOCUMENT_INFO)
            .await
    }

    pub async fn create_design_document<T>(&self, db: &str, doc: &T, ddoc: &str) -> DbResult
    where
        T: Serialize + ?Sized,
    {
        let payload = Payload::json(doc)?;
        let url = self.design_url(db, ddoc);
        self.send_with(
            RequestParams::new(Method::PUT, url, tables::CREATE_DESIGN_DOCUMENT).payload(payload),
        )
        .await
    }

    pub async fn delete_design_document(&self, db: &str, ddoc: &str, rev: &str) -> DbResult {
        let url = format!("{}{}", self.design_url(db, ddoc), rev_query(rev));
        self.send(Method::DELETE, url, tables::DELETE_DESIGN_DOCUMENT)
            .await
    }

    pub async fn get_view(
        &self,
        db: &str,
        ddoc: &str,
        view: &str,
        query: &QueryParams,
    ) -> DbResult {
        let url = format!(
            "{}/_view/{}{}",
            self.design_url(db, ddoc),
            encode_segment(view),
            query.to_query_string()
        );
        self.send(Method::GET, url, tables::GET_VIEW).await
    }

    /// Run an update handler, against document `id` when given
    pub async fn execute_update_function<T>(
        &self,
        db: &str,
        ddoc: &str,
        func: &str,
        body: &T,
        id: Option<&str>,
    ) -> DbResult
    where
        T: Serialize + ?Sized,
    {
        let base = format!(
            "{}/_update/{}",
            self.design_url(db, ddoc),
            encode_segment(func)
        );
        let (method, url) = match id {
            Some(id) => (Method::PUT, format!("{}/{}", base, encode_doc_id(id))),
            None => (Method::POST, base),
        };
        self.send_with(
            RequestParams::new(method, url, tables::EXECUTE_UPDATE_FUNCTION)
                .payload(Payload::json(body)?),
        )
        .await
    }

    // Attachments

    /// Upload an attachment from a buffer, string, stream or reader.
    ///
    /// Without `rev` the document is created if it does not exist yet.
    pub async fn add_attachment(
        &self,
        db: &str,
        id: &str,
        name: &str,
        rev: Option<&str>,
        content_type: &str,
        payload: impl Into<Payload>,
    ) -> DbResult {
        let url = format!(
            "{}{}",
            self.attachment_url(db, id, name),
            rev.map(rev_query).unwrap_or_default()
        );
        self.send_with(
            RequestParams::new(Method::PUT, url, tables::ADD_ATTACHMENT)
                .payload(payload.into())
                .content_type(content_type),
        )
        .await
    }

    /// Stream an attachment into `sink`.
    ///
    /// Settles on the response headers; drive [`Streamed::drain`] or call
    /// [`Streamed::finish`] to copy the body.
    pub async fn get_attachment<W>(
        &self,
        db: &str,
        id: &str,
        name: &str,
        sink: W,
        query: &QueryParams,
    ) -> std::result::Result<Streamed<W>, DbResponse>
    where
        W: AsyncWrite + Unpin,
    {
        let url = format!(
            "{}{}",
            self.attachment_url(db, id, name),
            query.to_query_string()
        );
        self.engine
            .request_stream(RequestParams::new(Method::GET, url, tables::GET_ATTACHMENT), sink)
            .await
    }

    pub async fn delete_attachment(&self, db: &str, id: &str, name: &str, rev: &str) -> DbResult {
        let url = format!("{}{}", self.attachment_url(db, id, name), rev_query(rev));
        self.send(Method::DELETE, url, tables::DELETE_ATTACHMENT).await
    }

    async fn send(&self, method: Method, url: String, statuses: StatusTable) -> DbResult {
        self.send_with(RequestParams::new(method, url, statuses))
            .await
    }

    async fn send_with(&self, params: RequestParams) -> DbResult {
        self.engine.request(params).await
    }

    fn db_url(&self, db: &str) -> String {
        format!("{}/{}", self.base_url, encode_segment(db))
    }

    fn doc_url(&self, db: &str, id: &str) -> String {
        format!("{}/{}", self.db_url(db), encode_doc_id(id))
    }

    fn design_url(&self, db: &str, ddoc: &str) -> String {
        let ddoc = ddoc.strip_prefix("_design/").unwrap_or(ddoc);
        format!("{}/_design/{}", self.db_url(db), encode_segment(ddoc))
    }

    fn attachment_url(&self, db: &str, id: &str, name: &str) -> String {
        format!("{}/{}", self.doc_url(db, id), encode_segment(name))
    }
}

fn rev_query(rev: &str) -> String {
    QueryParams::new().with("rev", rev).to_query_string()
}
