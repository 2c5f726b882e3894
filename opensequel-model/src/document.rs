//! Document trait and the record wrapper returned by reads.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Trait for document types stored in an index.
///
/// # Example
///
/// ```rust
/// use opensequel_model::Document;
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
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Index used when a model is created without an explicit name.
    fn index_name() -> &'static str;
}

/// A stored document together with the identity the engine assigned to it.
///
/// Serializes flat: `_index`, `_id`, `_version` and `_score` next to the
/// document's own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// Index name.
    #[serde(rename = "_index")]
    pub index: String,
    /// Document ID.
    #[serde(rename = "_id")]
    pub id: String,
    /// Document version.
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// Relevance score (search hits only).
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// The document itself.
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    /// Transform the document while keeping its identity.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Record<U> {
        Record {
            index: self.index,
            id: self.id,
            version: self.version,
            score: self.score,
            data: f(self.data),
        }
    }
}

impl<T> std::ops::Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}
