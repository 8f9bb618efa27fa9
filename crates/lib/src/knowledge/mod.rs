//! # Knowledge Index
//!
//! A persisted vector index over the store policy document. The document is
//! split into overlapping line windows, each window is embedded, and the chunks
//! are stored in a turso database keyed by collection name. Retrieval embeds the
//! query with the same embedder and ranks chunks by cosine distance.
//!
//! Ingestion is idempotent per collection: once a collection holds any chunk,
//! later ingest calls report the existing count and leave the index untouched.

pub mod chunker;
pub mod extract;

pub use chunker::{chunk_lines, chunk_pages};

use crate::{
    constants::{DEFAULT_WINDOW_OVERLAP, DEFAULT_WINDOW_SIZE},
    errors::PromptError,
    providers::ai::Embedder,
};
use std::{fmt, path::Path};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use turso::{params, Connection, Database, Value as TursoValue};

/// Errors raised while building or querying the knowledge index.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Document not found at '{0}'")]
    DocumentNotFound(String),
    #[error("Failed to parse PDF content: {0}")]
    PdfParse(String),
    #[error("Database error: {0}")]
    Database(#[from] turso::Error),
    #[error("Embedding failed: {0}")]
    Embedding(#[from] PromptError),
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A collection of embedded document chunks.
pub struct KnowledgeIndex {
    db: Database,
    collection: String,
    embedder: Box<dyn Embedder>,
    dimensions: usize,
    window_size: usize,
    overlap: usize,
    /// Serializes the ingest check-then-write.
    ingest_lock: Mutex<()>,
}

impl fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("collection", &self.collection)
            .field("embedder", &self.embedder)
            .field("dimensions", &self.dimensions)
            .field("window_size", &self.window_size)
            .field("overlap", &self.overlap)
            .finish_non_exhaustive()
    }
}

impl KnowledgeIndex {
    /// Opens (creating if needed) the index database at `db_path` and registers
    /// `collection` with the given vector dimensionality.
    ///
    /// Re-opening a collection with a different dimensionality fails.
    pub async fn open(
        db_path: &str,
        collection: &str,
        embedder: Box<dyn Embedder>,
        dimensions: usize,
    ) -> Result<Self, KnowledgeError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|source| KnowledgeError::Io {
                        path: parent.display().to_string(),
                        source,
                    })?;
                }
            }
        }

        let db = turso::Builder::new_local(db_path).build().await?;
        let conn = db.connect()?;
        conn.query("PRAGMA journal_mode=WAL;", ()).await?;
        initialize_schema(&conn).await?;
        register_collection(&conn, collection, dimensions).await?;

        info!(db_path, collection, dimensions, "Opened knowledge index.");
        Ok(Self {
            db,
            collection: collection.to_string(),
            embedder,
            dimensions,
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_WINDOW_OVERLAP,
            ingest_lock: Mutex::new(()),
        })
    }

    /// Overrides the line window used when ingesting.
    pub fn with_chunking(mut self, window_size: usize, overlap: usize) -> Self {
        self.window_size = window_size;
        self.overlap = overlap;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The number of chunks stored in this collection.
    pub async fn count(&self) -> Result<usize, KnowledgeError> {
        let conn = self.db.connect()?;
        count_chunks(&conn, &self.collection).await
    }

    /// Ingests a document into the collection and returns the collection size.
    ///
    /// Returns the existing count without extracting anything when the
    /// collection is already populated, and `0` when the document has no
    /// extractable text.
    #[instrument(skip(self, document_path), fields(collection = %self.collection))]
    pub async fn ingest(&self, document_path: impl AsRef<Path>) -> Result<usize, KnowledgeError> {
        let path = document_path.as_ref();
        if !path.exists() {
            return Err(KnowledgeError::DocumentNotFound(path.display().to_string()));
        }

        let _guard = self.ingest_lock.lock().await;
        let conn = self.db.connect()?;

        let existing = count_chunks(&conn, &self.collection).await?;
        if existing > 0 {
            info!(existing, "Collection already populated. Skipping ingestion.");
            return Ok(existing);
        }

        info!(path = %path.display(), "Ingesting document.");
        let pages = extract::extract_pages(path).await?;
        let chunks = chunk_pages(&pages, self.window_size, self.overlap);
        if chunks.is_empty() {
            warn!(path = %path.display(), "Document has no extractable text.");
            return Ok(0);
        }

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(KnowledgeError::Embedding(PromptError::AiApi(format!(
                "expected {} embeddings, received {}",
                chunks.len(),
                vectors.len()
            ))));
        }
        for vector in &vectors {
            self.check_dimensions(vector)?;
        }

        conn.execute("BEGIN TRANSACTION", ()).await?;
        if let Err(e) = insert_chunks(&conn, &self.collection, &chunks, &vectors).await {
            if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
                warn!("Rollback after failed ingestion also failed: {rollback_err}");
            }
            return Err(e);
        }
        conn.execute("COMMIT", ()).await?;

        info!(chunks = chunks.len(), "Ingestion complete.");
        Ok(chunks.len())
    }

    /// Returns the texts of the `limit` chunks closest to `query`, most similar
    /// first. A blank query or a zero limit yields nothing.
    #[instrument(skip(self, query), fields(collection = %self.collection))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, KnowledgeError> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                KnowledgeError::Embedding(PromptError::AiApi(
                    "embedder returned no vector for the query".to_string(),
                ))
            })?;
        self.check_dimensions(&query_vector)?;

        let vector_str = format!(
            "vector('[{}]')",
            query_vector
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let sql = format!(
            "SELECT content, vector_distance_cos(embedding, {vector_str}) AS distance
             FROM knowledge_chunks
             WHERE collection = ?
             ORDER BY distance ASC, id ASC
             LIMIT {limit}"
        );

        let conn = self.db.connect()?;
        let mut rows = conn.query(&sql, params![self.collection.clone()]).await?;
        let mut passages = Vec::new();
        while let Some(row) = rows.next().await? {
            if let TursoValue::Text(content) = row.get_value(0)? {
                passages.push(content);
            }
        }

        debug!(hits = passages.len(), "Knowledge search finished.");
        Ok(passages)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), KnowledgeError> {
        if vector.len() != self.dimensions {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

async fn initialize_schema(conn: &Connection) -> Result<(), KnowledgeError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS knowledge_collections (
            name TEXT PRIMARY KEY,
            dimensions INTEGER NOT NULL,
            distance TEXT NOT NULL
        )",
        (),
    )
    .await?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS knowledge_chunks (
            collection TEXT NOT NULL,
            id INTEGER NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB NOT NULL
        )",
        (),
    )
    .await?;
    Ok(())
}

async fn register_collection(
    conn: &Connection,
    collection: &str,
    dimensions: usize,
) -> Result<(), KnowledgeError> {
    let stored = {
        let mut rows = conn
            .query(
                "SELECT dimensions FROM knowledge_collections WHERE name = ?",
                params![collection.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                TursoValue::Integer(n) => Some(n as usize),
                _ => Some(0),
            },
            None => None,
        }
    };

    if let Some(stored) = stored {
        if stored != dimensions {
            return Err(KnowledgeError::DimensionMismatch {
                expected: stored,
                actual: dimensions,
            });
        }
        return Ok(());
    }

    conn.execute(
        "INSERT INTO knowledge_collections (name, dimensions, distance) VALUES (?, ?, 'cosine')",
        params![collection.to_string(), dimensions as i64],
    )
    .await?;
    info!(collection, dimensions, "Created knowledge collection.");
    Ok(())
}

async fn count_chunks(conn: &Connection, collection: &str) -> Result<usize, KnowledgeError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE collection = ?",
            params![collection.to_string()],
        )
        .await?;
    let count = match rows.next().await? {
        Some(row) => match row.get_value(0)? {
            TursoValue::Integer(n) => n as usize,
            _ => 0,
        },
        None => 0,
    };
    Ok(count)
}

async fn insert_chunks(
    conn: &Connection,
    collection: &str,
    chunks: &[String],
    vectors: &[Vec<f32>],
) -> Result<(), KnowledgeError> {
    let mut stmt = conn
        .prepare(
            "INSERT INTO knowledge_chunks (collection, id, content, embedding) VALUES (?, ?, ?, ?)",
        )
        .await?;
    for (id, (chunk, vector)) in chunks.iter().zip(vectors).enumerate() {
        stmt.execute(vec![
            TursoValue::Text(collection.to_string()),
            TursoValue::Integer(id as i64),
            TursoValue::Text(chunk.clone()),
            TursoValue::Blob(vector_to_bytes(vector)),
        ])
        .await?;
    }
    Ok(())
}

/// Encodes a vector as the little-endian `f32` blob layout used by `vector()`.
fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}
