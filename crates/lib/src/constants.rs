//! # Shared Constants
//!
//! Defaults shared by the library and the server. Every value here can be
//! overridden through configuration; these are the values the service ships with.

/// The default path of the persisted knowledge index.
pub const DEFAULT_KNOWLEDGE_DB_FILE: &str = "db/knowledge.db";

/// The collection that holds the chunked store policy document.
pub const DEFAULT_COLLECTION: &str = "store_policies";

/// Dimensionality of the default embedding model (all-MiniLM-L6-v2 / bge-small).
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Number of lines per knowledge chunk.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Number of lines shared by two adjacent chunks.
pub const DEFAULT_WINDOW_OVERLAP: usize = 5;

/// Number of passages returned by a knowledge search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Approximate meters per degree used to convert degree-space distances.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Geolocated stores further away than this are not offered as "nearest".
pub const MAX_STORE_DISTANCE_METERS: i64 = 50_000;

/// The response returned for every request when no completion service is configured.
pub const LLM_NOT_CONFIGURED_RESPONSE: &str = "Error: LLM not configured.";

/// The language passed to entity detection.
pub const DEFAULT_LANGUAGE: &str = "en";
