//! Typed operations against one index.

use crate::{
    compiler::compile,
    connection::Connection,
    document::{Document, Record},
    error::Result,
    filter::{Filter, Where},
    index::IndexOptions,
    response::{
        CreateAck, DeleteAck, DropAck, EngineResponse, InitAck, TruncateAck, UpdateAck, normalize,
        passthrough,
    },
    transport::{HttpOutcome, Method},
};
use opensequel_log::{debug, info};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::{marker::PhantomData, sync::Arc};

/// Characters escaped in an index name or document ID path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Percent-encode one path segment.
fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

/// Options of [`Model::find_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Where-clause; empty matches every document.
    pub filters: Where,
    /// Maximum number of hits (`size`).
    pub limit: Option<u64>,
    /// Number of hits to skip (`from`).
    pub offset: Option<u64>,
}

impl FindOptions {
    /// Match everything with engine-default paging.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter on `field`.
    pub fn filter(mut self, field: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.filters = self.filters.field(field, filter);
        self
    }

    /// Replace the where-clause.
    pub fn filters(mut self, filters: Where) -> Self {
        self.filters = filters;
        self
    }

    /// Set the maximum number of hits.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the number of hits to skip.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Search request body.
    ///
    /// Fails when a float literal is NaN or infinite.
    pub fn to_json(&self) -> Result<Value> {
        self.filters.validate()?;

        let mut body = Map::new();
        if let Some(offset) = self.offset {
            body.insert("from".to_string(), json!(offset));
        }
        if let Some(limit) = self.limit {
            body.insert("size".to_string(), json!(limit));
        }
        body.insert("query".to_string(), compile(&self.filters).or_match_all().to_json());
        Ok(Value::Object(body))
    }
}

impl From<Where> for FindOptions {
    fn from(filters: Where) -> Self {
        Self::new().filters(filters)
    }
}

/// Typed handle on one index.
///
/// # Example
///
/// ```rust,no_run
/// use opensequel_model::{Connection, ConnectionConfig, Document, FindOptions, Model, RangeFilter};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Movie {
///     name: String,
///     year: u32,
/// }
///
/// impl Document for Movie {
///     fn index_name() -> &'static str {
///         "movies"
///     }
/// }
///
/// # async fn run() -> opensequel_model::Result<()> {
/// let connection = Connection::open(
///     &ConnectionConfig::new("http://localhost:9200").with_basic_auth("admin", "admin"),
/// )?;
/// let movies = Model::<Movie>::new(connection);
///
/// movies
///     .create_with_id("matrix", &Movie { name: "The Matrix".into(), year: 1999 })
///     .await?;
///
/// let recent = movies
///     .find_all(FindOptions::new().filter("year", RangeFilter::new().gte(1999)).limit(10))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Model<T> {
    connection: Arc<Connection>,
    index: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> Clone for Model<T> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            index: self.index.clone(),
            _document: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Model<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("index", &self.index)
            .field("connected", &self.connection.is_connected())
            .finish()
    }
}

impl<T: Document> Model<T> {
    /// Model on `T::index_name()`.
    pub fn new(connection: Arc<Connection>) -> Self {
        Self::with_index(connection, T::index_name())
    }
}

impl<T> Model<T> {
    /// Model on an explicit index.
    pub fn with_index(connection: Arc<Connection>, index: impl Into<String>) -> Self {
        Self {
            connection,
            index: index.into(),
            _document: PhantomData,
        }
    }

    /// Index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Connection the model sends through.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        self.connection.transport()?.send(method, path, body).await
    }

    async fn request<R: EngineResponse>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<R> {
        normalize(self.send(method, path, body).await?)
    }

    fn index_path(&self) -> String {
        format!("/{}", segment(&self.index))
    }

    fn doc_path(&self, endpoint: &str, id: &str) -> String {
        format!("{}/{}/{}", self.index_path(), endpoint, segment(id))
    }

    /// Delete every document of the index, keeping the index itself.
    pub async fn truncate(&self) -> Result<TruncateAck> {
        let path = format!("{}/_delete_by_query", self.index_path());
        let ack: TruncateAck = self
            .request(Method::Post, &path, Some(json!({ "query": { "match_all": {} } })))
            .await?;
        debug!({ index = self.index, count = ack.count }, "truncated index");
        Ok(ack)
    }

    /// Create the index.
    pub async fn init(&self, options: IndexOptions) -> Result<InitAck> {
        info!("Creating index: {}", self.index);
        let path = self.index_path();
        self.request(Method::Put, &path, Some(options.to_json())).await
    }

    /// Delete the index and all of its documents.
    pub async fn drop_index(&self) -> Result<DropAck> {
        info!("Deleting index: {}", self.index);
        let path = self.index_path();
        self.request(Method::Delete, &path, None).await
    }

    /// Partially update a document: only the given fields change.
    pub async fn update(&self, id: &str, partial: &impl Serialize) -> Result<UpdateAck> {
        let body = json!({ "doc": serde_json::to_value(partial)? });
        self.request(Method::Post, &self.doc_path("_update", id), Some(body)).await
    }

    /// Delete a document. A missing document is reported as
    /// [`WriteResult::NotFound`](crate::WriteResult::NotFound), not as an error.
    pub async fn destroy_by_id(&self, id: &str) -> Result<DeleteAck> {
        self.request(Method::Delete, &self.doc_path("_doc", id), None).await
    }

    fn raw_path(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.index_path()
        } else {
            format!("{}/{}", self.index_path(), path)
        }
    }

    async fn raw(&self, method: Method, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        passthrough(self.send(method, &self.raw_path(path), body).await?)
    }

    /// `GET /{index}/{path}`, returned as is.
    ///
    /// Non-2xx answers become [`ModelError::Http`](crate::ModelError::Http)
    /// without further classification.
    pub async fn query_get(&self, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        self.raw(Method::Get, path, body).await
    }

    /// `POST /{index}/{path}`, returned as is.
    pub async fn query_post(&self, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        self.raw(Method::Post, path, body).await
    }

    /// `PUT /{index}/{path}`, returned as is.
    pub async fn query_put(&self, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        self.raw(Method::Put, path, body).await
    }

    /// `DELETE /{index}/{path}`, returned as is.
    pub async fn query_delete(&self, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
        self.raw(Method::Delete, path, body).await
    }
}

impl<T: Document> Model<T> {
    /// Index a new document under an engine-generated ID.
    pub async fn create(&self, document: &T) -> Result<CreateAck> {
        let path = format!("{}/_doc", self.index_path());
        self.request(Method::Post, &path, Some(serde_json::to_value(document)?))
            .await
    }

    /// Index a new document under `id`.
    pub async fn create_with_id(&self, id: &str, document: &T) -> Result<CreateAck> {
        self.request(
            Method::Post,
            &self.doc_path("_doc", id),
            Some(serde_json::to_value(document)?),
        )
        .await
    }

    /// Read a document by ID; `None` when it does not exist.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Record<T>>> {
        self.request(Method::Get, &self.doc_path("_doc", id), None).await
    }

    /// Search the index. Hits come back in engine order.
    pub async fn find_all(&self, options: impl Into<FindOptions>) -> Result<Vec<Record<T>>> {
        let body = options.into().to_json()?;
        let path = format!("{}/_search", self.index_path());
        self.request(Method::Get, &path, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ModelError,
        filter::RangeFilter,
        response::WriteResult,
        transport::Transport,
    };
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Movie {
        name: String,
        year: u32,
    }

    impl Document for Movie {
        fn index_name() -> &'static str {
            "movies"
        }
    }

    type Sent = (Method, String, Option<Value>);

    /// Answers every request with one canned outcome and records it.
    struct Canned {
        outcome: HttpOutcome,
        sent: Mutex<Vec<Sent>>,
    }

    impl Canned {
        fn new(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self {
                outcome: HttpOutcome::new(status, body),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> Sent {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<HttpOutcome> {
            self.sent
                .lock()
                .unwrap()
                .push((method, path.to_string(), body));
            Ok(self.outcome.clone())
        }
    }

    fn model(transport: Arc<Canned>) -> Model<Movie> {
        let connection = Arc::new(Connection::new());
        connection.bind(transport).unwrap();
        Model::new(connection)
    }

    fn matrix() -> Movie {
        Movie {
            name: "The Matrix".to_string(),
            year: 1999,
        }
    }

    #[test]
    fn test_find_options_body() {
        let body = FindOptions::new()
            .filter("year", RangeFilter::new().gte(1999))
            .limit(10)
            .offset(20)
            .to_json()
            .unwrap();
        assert_eq!(
            body,
            json!({
                "from": 20,
                "size": 10,
                "query": { "bool": { "must": [ { "range": { "year": { "gte": 1999 } } } ] } }
            })
        );
    }

    #[test]
    fn test_empty_find_matches_all() {
        assert_eq!(
            FindOptions::new().to_json().unwrap(),
            json!({ "query": { "match_all": {} } })
        );
    }

    #[test]
    fn test_index_name() {
        let connection = Arc::new(Connection::new());
        assert_eq!(Model::<Movie>::new(connection.clone()).index(), "movies");
        assert_eq!(Model::<Movie>::with_index(connection, "films").index(), "films");
    }

    #[test]
    fn test_path_segments_are_encoded() {
        assert_eq!(segment("plain-id_1"), "plain-id_1");
        assert_eq!(segment("a?b"), "a%3Fb");
        assert_eq!(segment("x/y"), "x%2Fy");
        assert_eq!(segment("c#d e%"), "c%23d%20e%25");
        assert_eq!(segment("café"), "caf%C3%A9");
    }

    #[tokio::test]
    async fn test_document_id_stays_one_segment() {
        let transport = Canned::new(
            200,
            json!({ "_index": "movies", "_id": "x/y", "_version": 2, "result": "deleted" }),
        );
        let movies = model(transport.clone());

        movies.destroy_by_id("x/y").await.unwrap();
        assert_eq!(transport.last().1, "/movies/_doc/x%2Fy");

        let films = Model::<Movie>::with_index(Arc::clone(movies.connection()), "my films");
        films.update("a#1", &json!({ "year": 2000 })).await.unwrap();
        assert_eq!(transport.last().1, "/my%20films/_update/a%231");
    }

    #[tokio::test]
    async fn test_non_finite_filter_is_not_sent() {
        let transport = Canned::new(200, json!({ "hits": { "hits": [] } }));
        let movies = model(transport.clone());

        let err = movies
            .find_all(Where::new().field("rating", f64::NAN))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedFilter { ref field, .. } if field == "rating"));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_not_connected() {
        let movies = Model::<Movie>::new(Arc::new(Connection::new()));
        let err = movies.find_by_id("1").await.unwrap_err();
        assert!(matches!(err, ModelError::NotConnected));
    }

    #[tokio::test]
    async fn test_create_with_id_request() {
        let transport = Canned::new(
            201,
            json!({ "_index": "movies", "_id": "fixed_id", "_version": 1, "result": "created" }),
        );
        let ack = model(transport.clone())
            .create_with_id("fixed_id", &matrix())
            .await
            .unwrap();

        assert_eq!(ack.version, 1);
        assert_eq!(
            transport.last(),
            (
                Method::Post,
                "/movies/_doc/fixed_id".to_string(),
                Some(json!({ "name": "The Matrix", "year": 1999 }))
            )
        );
    }

    #[tokio::test]
    async fn test_create_without_id() {
        let transport = Canned::new(
            201,
            json!({ "_index": "movies", "_id": "Qm9v", "_version": 1, "result": "created" }),
        );
        let ack = model(transport.clone()).create(&matrix()).await.unwrap();
        assert_eq!(ack.id, "Qm9v");
        assert_eq!(transport.last().1, "/movies/_doc");
    }

    #[tokio::test]
    async fn test_find_all_request() {
        let transport = Canned::new(200, json!({ "hits": { "hits": [] } }));
        let hits = model(transport.clone())
            .find_all(Where::new().field("year", 1999))
            .await
            .unwrap();

        assert!(hits.is_empty());
        let (method, path, body) = transport.last();
        assert_eq!(method, Method::Get);
        assert_eq!(path, "/movies/_search");
        assert_eq!(
            body,
            Some(json!({ "query": { "bool": { "must": [ { "match": { "year": 1999 } } ] } } }))
        );
    }

    #[tokio::test]
    async fn test_update_sends_partial_doc() {
        #[derive(Serialize)]
        struct Rename<'a> {
            name: &'a str,
        }

        let transport = Canned::new(
            200,
            json!({ "_index": "movies", "_id": "1", "_version": 2, "result": "updated" }),
        );
        let ack = model(transport.clone())
            .update("1", &Rename { name: "Matrix" })
            .await
            .unwrap();

        assert_eq!(ack.result, WriteResult::Updated);
        assert_eq!(
            transport.last(),
            (
                Method::Post,
                "/movies/_update/1".to_string(),
                Some(json!({ "doc": { "name": "Matrix" } }))
            )
        );
    }

    #[tokio::test]
    async fn test_destroy_missing() {
        let transport = Canned::new(
            404,
            json!({ "_index": "movies", "_id": "gone", "_version": 1, "result": "not_found" }),
        );
        let ack = model(transport.clone()).destroy_by_id("gone").await.unwrap();
        assert_eq!(ack.result, WriteResult::NotFound);
        assert_eq!(transport.last().0, Method::Delete);
    }

    #[tokio::test]
    async fn test_truncate_request() {
        let transport = Canned::new(200, json!({ "deleted": 3 }));
        let ack = model(transport.clone()).truncate().await.unwrap();
        assert_eq!(ack.count, 3);
        assert_eq!(
            transport.last(),
            (
                Method::Post,
                "/movies/_delete_by_query".to_string(),
                Some(json!({ "query": { "match_all": {} } }))
            )
        );
    }

    #[tokio::test]
    async fn test_init_and_drop_paths() {
        let transport = Canned::new(200, json!({ "acknowledged": true, "index": "movies" }));
        let movies = model(transport.clone());

        let ack = movies.init(IndexOptions::new()).await.unwrap();
        assert_eq!(ack.index, "movies");
        assert_eq!(transport.last(), (Method::Put, "/movies".to_string(), Some(json!({}))));

        let ack = movies.drop_index().await.unwrap();
        assert!(ack.acknowledged);
        assert_eq!(transport.last(), (Method::Delete, "/movies".to_string(), None));
    }

    #[tokio::test]
    async fn test_raw_paths() {
        let transport = Canned::new(200, json!({ "count": 0 }));
        let movies = model(transport.clone());

        let outcome = movies.query_get("_count", None).await.unwrap();
        assert_eq!(outcome.body, json!({ "count": 0 }));
        assert_eq!(transport.last().1, "/movies/_count");

        movies.query_put("/_mapping", Some(json!({}))).await.unwrap();
        assert_eq!(transport.last().1, "/movies/_mapping");

        movies.query_delete("", None).await.unwrap();
        assert_eq!(transport.last().1, "/movies");
    }

    #[tokio::test]
    async fn test_raw_unauthorized_is_not_classified() {
        let movies = model(Canned::new(401, json!("Unauthorized")));
        let err = movies.query_post("_search", None).await.unwrap_err();
        assert!(matches!(err, ModelError::Http { status: 401, .. }));
        assert_eq!(err.to_string(), "Request failed with status code 401");
    }

    #[tokio::test]
    async fn test_unauthorized_everywhere() {
        let movies = model(Canned::new(401, json!("Unauthorized")));

        let errors = vec![
            movies.create(&matrix()).await.unwrap_err(),
            movies.find_by_id("1").await.unwrap_err(),
            movies.find_all(FindOptions::new()).await.unwrap_err(),
            movies.update("1", &json!({ "year": 2000 })).await.unwrap_err(),
            movies.destroy_by_id("1").await.unwrap_err(),
            movies.truncate().await.unwrap_err(),
            movies.init(IndexOptions::new()).await.unwrap_err(),
            movies.drop_index().await.unwrap_err(),
        ];
        for err in errors {
            assert!(matches!(err, ModelError::Unauthorized), "got {:?}", err);
        }
    }
}
