// opensequel - typed object mapping for OpenSearch and Elasticsearch
//
// Models are declared per index and queried with a where-clause language that
// compiles to the engine's query DSL. Responses come back as typed records or
// classified errors.

// Re-export the model layer
pub use opensequel_model::*;

// Re-export logging
pub use opensequel_log as log;

// Re-export serde so models can derive without extra dependencies
pub use serde;
pub use serde_json;

// Re-export async_trait for custom transports
pub use async_trait::async_trait;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Connection,
        ConnectionConfig,
        Document,
        Filter,
        FindOptions,
        // Filters
        Fuzziness,
        FuzzyFilter,
        IndexOptions,
        IndexSettings,
        Mapping,
        MappingField,
        Model,
        ModelError,
        RangeFilter,
        Record,
        RegexFilter,
        WildcardFilter,
        Where,
        // Results
        WriteResult,
    };
    pub use serde::{Deserialize, Serialize};
}
