//! Normalization of raw engine responses.
//!
//! [`normalize`] turns an [`HttpOutcome`] into the typed result of one
//! operation. Failures are classified here and nowhere else:
//!
//! - 401 is always [`ModelError::Unauthorized`], whatever the body says.
//! - A read answered with 404 `{"found": false}` resolves to `None`.
//! - A delete answered with 404 `{"result": "not_found"}` resolves to a
//!   [`DeleteAck`] with [`WriteResult::NotFound`].
//! - A body shaped `{"error": {"root_cause": [{"reason": ...}]}}` becomes
//!   [`ModelError::Engine`] carrying that reason.
//! - Anything else is [`ModelError::Http`] with the body untouched.

use crate::{
    document::Record,
    error::{ModelError, Result},
    transport::HttpOutcome,
};
use opensequel_log::warn;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Operation a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Index a new document.
    Create,
    /// Read a document by ID.
    Get,
    /// Search the index.
    Search,
    /// Partially update a document.
    Update,
    /// Delete a document by ID.
    Delete,
    /// Delete every document of the index.
    Truncate,
    /// Create the index.
    CreateIndex,
    /// Delete the index.
    DropIndex,
}

impl Operation {
    /// Lower-case operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::Search => "search",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Truncate => "truncate",
            Operation::CreateIndex => "create_index",
            Operation::DropIndex => "drop_index",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed result of one operation, built from an engine response.
pub trait EngineResponse: Sized {
    /// Operation this response answers.
    const OPERATION: Operation;

    /// Build the result from a 2xx body.
    fn from_success(body: Value) -> Result<Self>;

    /// Build a result from a non-2xx outcome that still counts as success.
    fn recover(_outcome: &HttpOutcome) -> Option<Self> {
        None
    }
}

/// Map an outcome to the result of `R`'s operation or a classified error.
pub fn normalize<R: EngineResponse>(outcome: HttpOutcome) -> Result<R> {
    if outcome.is_success() {
        return R::from_success(outcome.body);
    }
    if let Some(recovered) = R::recover(&outcome) {
        return Ok(recovered);
    }

    let err = classify(outcome);
    warn!({ operation = R::OPERATION, status = err.status().unwrap_or_default() }, "{}", err);
    Err(err)
}

/// Classify a non-2xx outcome.
pub fn classify(outcome: HttpOutcome) -> ModelError {
    if outcome.status == 401 {
        return ModelError::Unauthorized;
    }

    if outcome.status == 404 {
        if let Ok(missing) = serde_json::from_value::<MissingDocument>(outcome.body.clone()) {
            if !missing.found {
                return ModelError::NotFound {
                    index: missing.index,
                    id: missing.id,
                };
            }
        }
    }

    match root_cause_reason(&outcome.body) {
        Some(reason) => ModelError::Engine {
            status: outcome.status,
            reason,
        },
        None => ModelError::Http {
            status: outcome.status,
            body: outcome.body,
        },
    }
}

/// `error.root_cause[0].reason`, if the body has that shape.
pub fn root_cause_reason(body: &Value) -> Option<String> {
    let parsed = EngineErrorBody::deserialize(body).ok()?;
    parsed.error.root_cause.into_iter().next().map(|cause| cause.reason)
}

/// Pass a raw outcome through: 2xx as is, anything else as [`ModelError::Http`].
pub fn passthrough(outcome: HttpOutcome) -> Result<HttpOutcome> {
    if outcome.is_success() {
        Ok(outcome)
    } else {
        Err(ModelError::Http {
            status: outcome.status,
            body: outcome.body,
        })
    }
}

fn parse<T: DeserializeOwned>(operation: Operation, body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| ModelError::UnexpectedResponse(format!("{} response: {}", operation, e)))
}

#[derive(Deserialize)]
struct EngineErrorBody {
    error: EngineErrorDetail,
}

#[derive(Deserialize)]
struct EngineErrorDetail {
    root_cause: Vec<RootCause>,
}

#[derive(Deserialize)]
struct RootCause {
    reason: String,
}

#[derive(Deserialize)]
struct MissingDocument {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    found: bool,
}

#[derive(Deserialize)]
struct WriteBody {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version")]
    version: Option<i64>,
    result: WriteResult,
}

/// `result` reported by document writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteResult {
    /// A new document was stored.
    Created,
    /// An existing document was changed.
    Updated,
    /// The document was removed.
    Deleted,
    /// There was no such document.
    NotFound,
    /// The update changed nothing.
    Noop,
}

/// Result of a create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAck {
    /// Index name.
    pub index: String,
    /// Assigned or supplied document ID.
    pub id: String,
    /// Document version; 1 for a new document.
    pub version: i64,
}

impl EngineResponse for CreateAck {
    const OPERATION: Operation = Operation::Create;

    fn from_success(body: Value) -> Result<Self> {
        let body: WriteBody = parse(Self::OPERATION, body)?;
        let version = body.version.ok_or_else(|| {
            ModelError::UnexpectedResponse("create response: missing _version".to_string())
        })?;
        Ok(Self {
            index: body.index,
            id: body.id,
            version,
        })
    }
}

/// Result of an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAck {
    /// Index name.
    pub index: String,
    /// Document ID.
    pub id: String,
    /// `updated`, or `noop` when nothing changed.
    pub result: WriteResult,
}

impl EngineResponse for UpdateAck {
    const OPERATION: Operation = Operation::Update;

    fn from_success(body: Value) -> Result<Self> {
        let body: WriteBody = parse(Self::OPERATION, body)?;
        Ok(Self {
            index: body.index,
            id: body.id,
            result: body.result,
        })
    }
}

/// Result of a delete by ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAck {
    /// Index name.
    pub index: String,
    /// Document ID.
    pub id: String,
    /// `deleted` or `not_found`.
    pub result: WriteResult,
}

impl DeleteAck {
    /// Whether a document was actually removed.
    pub fn is_deleted(&self) -> bool {
        self.result == WriteResult::Deleted
    }

    fn from_body(body: WriteBody) -> Self {
        Self {
            index: body.index,
            id: body.id,
            result: body.result,
        }
    }
}

impl EngineResponse for DeleteAck {
    const OPERATION: Operation = Operation::Delete;

    fn from_success(body: Value) -> Result<Self> {
        parse(Self::OPERATION, body).map(Self::from_body)
    }

    fn recover(outcome: &HttpOutcome) -> Option<Self> {
        if outcome.status != 404 {
            return None;
        }
        WriteBody::deserialize(&outcome.body)
            .ok()
            .filter(|body| body.result == WriteResult::NotFound)
            .map(Self::from_body)
    }
}

/// Result of a delete-by-query over the whole index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncateAck {
    /// Number of documents deleted.
    pub count: u64,
}

impl EngineResponse for TruncateAck {
    const OPERATION: Operation = Operation::Truncate;

    fn from_success(body: Value) -> Result<Self> {
        #[derive(Deserialize)]
        struct Body {
            deleted: u64,
        }
        let body: Body = parse(Self::OPERATION, body)?;
        Ok(Self {
            count: body.deleted,
        })
    }
}

/// Result of an index creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitAck {
    /// Name of the created index.
    pub index: String,
}

impl EngineResponse for InitAck {
    const OPERATION: Operation = Operation::CreateIndex;

    fn from_success(body: Value) -> Result<Self> {
        parse(Self::OPERATION, body)
    }
}

/// Result of an index deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropAck {
    /// Whether the engine acknowledged the deletion.
    pub acknowledged: bool,
}

impl EngineResponse for DropAck {
    const OPERATION: Operation = Operation::DropIndex;

    fn from_success(body: Value) -> Result<Self> {
        parse(Self::OPERATION, body)
    }
}

#[derive(Deserialize)]
struct GetBody<T> {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version")]
    version: Option<i64>,
    found: bool,
    #[serde(rename = "_source")]
    source: Option<T>,
}

impl<T: DeserializeOwned> EngineResponse for Option<Record<T>> {
    const OPERATION: Operation = Operation::Get;

    fn from_success(body: Value) -> Result<Self> {
        let body: GetBody<T> = parse(Self::OPERATION, body)?;
        if !body.found {
            return Ok(None);
        }
        let data = body.source.ok_or_else(|| {
            ModelError::UnexpectedResponse("get response: found without _source".to_string())
        })?;
        Ok(Some(Record {
            index: body.index,
            id: body.id,
            version: body.version,
            score: None,
            data,
        }))
    }

    fn recover(outcome: &HttpOutcome) -> Option<Self> {
        let missing = outcome.status == 404
            && outcome.body.get("found").and_then(Value::as_bool) == Some(false);
        missing.then_some(None)
    }
}

#[derive(Deserialize)]
struct SearchBody<T> {
    hits: HitsBody<T>,
}

#[derive(Deserialize)]
struct HitsBody<T> {
    hits: Vec<HitBody<T>>,
}

#[derive(Deserialize)]
struct HitBody<T> {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version")]
    version: Option<i64>,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: T,
}

impl<T: DeserializeOwned> EngineResponse for Vec<Record<T>> {
    const OPERATION: Operation = Operation::Search;

    fn from_success(body: Value) -> Result<Self> {
        let body: SearchBody<T> = parse(Self::OPERATION, body)?;
        Ok(body
            .hits
            .hits
            .into_iter()
            .map(|hit| Record {
                index: hit.index,
                id: hit.id,
                version: hit.version,
                score: hit.score,
                data: hit.source,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(status: u16, body: Value) -> HttpOutcome {
        HttpOutcome::new(status, body)
    }

    fn no_such_index(index: &str) -> Value {
        json!({
            "error": {
                "root_cause": [{
                    "type": "index_not_found_exception",
                    "reason": format!("no such index [{}]", index),
                    "index": index,
                    "index_uuid": "_na_"
                }],
                "type": "index_not_found_exception",
                "reason": format!("no such index [{}]", index)
            },
            "status": 404
        })
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Movie {
        name: String,
        year: u32,
    }

    #[test]
    fn test_create() {
        let ack: CreateAck = normalize(outcome(
            201,
            json!({
                "_index": "movies", "_id": "fixed_id", "_version": 1, "result": "created",
                "_shards": { "total": 2, "successful": 2, "failed": 0 }, "_seq_no": 23, "_primary_term": 7
            }),
        ))
        .unwrap();
        assert_eq!(
            ack,
            CreateAck {
                index: "movies".to_string(),
                id: "fixed_id".to_string(),
                version: 1
            }
        );
    }

    #[test]
    fn test_get_found() {
        let record: Option<Record<Movie>> = normalize(outcome(
            200,
            json!({
                "_index": "movies", "_id": "id", "_version": 4, "_seq_no": 17, "_primary_term": 3,
                "found": true, "_source": { "name": "The Matrix", "year": 1999 }
            }),
        ))
        .unwrap();

        let record = record.unwrap();
        assert_eq!(record.id, "id");
        assert_eq!(record.version, Some(4));
        assert_eq!(record.score, None);
        assert_eq!(
            record.data,
            Movie {
                name: "The Matrix".to_string(),
                year: 1999
            }
        );
    }

    #[test]
    fn test_get_missing_is_none_every_time() {
        let body = json!({ "_index": "movies", "_id": "nonexistent_id", "found": false });
        for _ in 0..3 {
            let record: Option<Record<Value>> = normalize(outcome(404, body.clone())).unwrap();
            assert!(record.is_none());
        }
    }

    #[test]
    fn test_search_keeps_hit_order() {
        let hits: Vec<Record<Movie>> = normalize(outcome(
            200,
            json!({
                "took": 3, "timed_out": false,
                "hits": {
                    "total": { "value": 2, "relation": "eq" },
                    "max_score": 1.2,
                    "hits": [
                        { "_index": "movies", "_id": "b", "_score": 1.2, "_source": { "name": "The Matrix", "year": 1999 } },
                        { "_index": "movies", "_id": "a", "_score": 0.4, "_source": { "name": "Matrix Reloaded", "year": 2003 } }
                    ]
                }
            }),
        ))
        .unwrap();

        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(hits[0].score, Some(1.2));
        assert_eq!(hits[1].year, 2003);
    }

    #[test]
    fn test_update() {
        let ack: UpdateAck = normalize(outcome(
            200,
            json!({ "_index": "movies", "_id": "1", "_version": 2, "result": "updated" }),
        ))
        .unwrap();
        assert_eq!(ack.result, WriteResult::Updated);
    }

    #[test]
    fn test_delete_missing_is_success() {
        let ack: DeleteAck = normalize(outcome(
            404,
            json!({ "_index": "movies", "_id": "nope", "_version": 1, "result": "not_found" }),
        ))
        .unwrap();
        assert_eq!(ack.result, WriteResult::NotFound);
        assert!(!ack.is_deleted());
    }

    #[test]
    fn test_truncate() {
        let ack: TruncateAck = normalize(outcome(
            200,
            json!({ "took": 94, "timed_out": false, "total": 10, "deleted": 10, "failures": [] }),
        ))
        .unwrap();
        assert_eq!(ack, TruncateAck { count: 10 });
    }

    #[test]
    fn test_unauthorized_ignores_body() {
        for body in [json!("Unauthorized"), no_such_index("x"), Value::Null] {
            let err = normalize::<CreateAck>(outcome(401, body)).unwrap_err();
            assert!(matches!(err, ModelError::Unauthorized));
            assert_eq!(err.to_string(), "Unauthorized");
        }
    }

    #[test]
    fn test_engine_reason_on_every_operation() {
        fn reason<R: EngineResponse + std::fmt::Debug>() -> String {
            normalize::<R>(outcome(404, no_such_index("x"))).unwrap_err().to_string()
        }

        assert_eq!(reason::<CreateAck>(), "no such index [x]");
        assert_eq!(reason::<Option<Record<Value>>>(), "no such index [x]");
        assert_eq!(reason::<Vec<Record<Value>>>(), "no such index [x]");
        assert_eq!(reason::<UpdateAck>(), "no such index [x]");
        assert_eq!(reason::<DeleteAck>(), "no such index [x]");
        assert_eq!(reason::<TruncateAck>(), "no such index [x]");
        assert_eq!(reason::<InitAck>(), "no such index [x]");
        assert_eq!(reason::<DropAck>(), "no such index [x]");
    }

    #[test]
    fn test_unrecognized_body_is_http_error() {
        let err = normalize::<UpdateAck>(outcome(400, json!("incorrect response"))).unwrap_err();
        match err {
            ModelError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, json!("incorrect response"));
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_document_outside_get_is_not_found() {
        let err = classify(outcome(404, json!({ "_index": "movies", "_id": "1", "found": false })));
        assert!(matches!(err, ModelError::NotFound { ref id, .. } if id == "1"));
    }

    #[test]
    fn test_empty_root_cause_is_not_engine_error() {
        let err = classify(outcome(500, json!({ "error": { "root_cause": [] } })));
        assert!(matches!(err, ModelError::Http { status: 500, .. }));
    }

    #[test]
    fn test_malformed_success_body() {
        let err = normalize::<CreateAck>(outcome(200, json!({ "acknowledged": true }))).unwrap_err();
        assert!(matches!(err, ModelError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_passthrough() {
        assert!(passthrough(outcome(200, json!("ok"))).is_ok());
        let err = passthrough(outcome(401, json!("Unauthorized"))).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status code 401");
    }
}
