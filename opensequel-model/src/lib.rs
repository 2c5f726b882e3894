//! Typed models over OpenSearch and Elasticsearch indices.
//!
//! This crate provides:
//! - A where-clause language (exact, fuzzy, regex, wildcard, range and
//!   existence filters) compiled into the engine's query DSL
//! - Normalization of engine responses into typed results and errors
//! - A [`Model`] per index with create, read, search, update, delete,
//!   truncate and index lifecycle operations
//! - Raw passthrough requests relative to the model's index
//!
//! # Example
//!
//! ```rust,no_run
//! use opensequel_model::{
//!     Connection, ConnectionConfig, Document, Filter, FindOptions, Model, RangeFilter,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Movie {
//!     name: String,
//!     year: u32,
//! }
//!
//! impl Document for Movie {
//!     fn index_name() -> &'static str {
//!         "movies"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::open(&ConnectionConfig::from_env()?)?;
//!     let movies = Model::<Movie>::new(connection);
//!
//!     let found = movies
//!         .find_all(
//!             FindOptions::new()
//!                 .filter("name", Filter::fuzzy("Matrix"))
//!                 .filter("year", RangeFilter::new().gte(1999).lt(2010)),
//!         )
//!         .await?;
//!
//!     for movie in found {
//!         println!("{} ({}) score={:?}", movie.name, movie.year, movie.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod compiler;
mod config;
mod connection;
mod document;
mod error;
mod filter;
mod index;
mod model;
mod query;
mod response;
mod transport;

pub use compiler::{compile, compile_json};
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use document::{Document, Record};
pub use error::{ModelError, Result};
pub use filter::{
    Filter, FuzzyFilter, Fuzziness, Literal, RangeFilter, RangeRelation, RegexFilter,
    WildcardFilter, Where,
};
pub use index::{FieldType, IndexOptions, IndexSettings, Mapping, MappingField};
pub use model::{FindOptions, Model};
pub use query::{
    BoolQuery, ExistsQuery, FuzzyQuery, MatchQuery, Query, RangeQuery, RegexpQuery, WildcardQuery,
};
pub use response::{
    CreateAck, DeleteAck, DropAck, EngineResponse, InitAck, Operation, TruncateAck, UpdateAck,
    WriteResult, classify, normalize, passthrough, root_cause_reason,
};
pub use transport::{HttpOutcome, Method, OpenSearchTransport, Transport};
