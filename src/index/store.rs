//! SQLite index store with migrations
//!
//! Persists the vocabulary, documents, and both posting tables behind a
//! pooled connection. One logical writer/reader at a time is assumed; the
//! pool exists for scoped acquisition, not concurrent access.

use crate::error::{Result, SemrankError};
use crate::index::{Posting, PostingSet};
use ahash::AHashMap;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Maximum parameters per `IN (...)` filter, below SQLite's variable limit
const IN_CHUNK: usize = 512;

/// Index store with migration support
pub struct IndexStore {
    pool: DbPool,
}

impl IndexStore {
    /// Open (or create) the index store at the given path
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SemrankError::Io {
                source: e,
                context: format!("Failed to create store directory: {:?}", parent),
            })?;
        }

        // Pragmas run per pooled connection; foreign_keys in particular is
        // connection-local and the cascades depend on it.
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| SemrankError::Config(format!("Failed to create connection pool: {}", e)))?;

        let store = Self { pool };
        store.migrate()?;

        Ok(store)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| SemrankError::Config(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Insert vocabulary terms, keeping existing rows (and their IDF) intact
    pub fn insert_vocabulary(&self, terms: &[u32]) -> Result<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO vocabulary (term) VALUES (?1) ON CONFLICT(term) DO NOTHING",
            )?;
            for term in terms {
                inserted += stmt.execute(params![term])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Upsert one document row and its literal postings in a single batch
    pub fn ingest_document(&self, id: &str, length: i64, counts: &[(u32, i64)]) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (id, length) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET length = excluded.length",
            params![id, length],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO postings_literal (document, term, tf) VALUES (?1, ?2, ?3)
                 ON CONFLICT(document, term) DO UPDATE SET tf = excluded.tf",
            )?;
            for (term, tf) in counts {
                stmt.execute(params![id, term, tf])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Upsert the semantic postings accumulated for one term
    pub fn upsert_semantic_postings(&self, term: u32, rows: &[(String, f64)]) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO postings_semantic (document, term, tfsem) VALUES (?1, ?2, ?3)
                 ON CONFLICT(document, term) DO UPDATE SET tfsem = excluded.tfsem",
            )?;
            for (document, tfsem) in rows {
                stmt.execute(params![document, term, tfsem])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Every term currently in the vocabulary, ascending
    pub fn vocabulary_terms(&self) -> Result<Vec<u32>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT term FROM vocabulary ORDER BY term")?;
        let terms = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<u32>, _>>()?;
        Ok(terms)
    }

    /// Total document count
    pub fn document_count(&self) -> Result<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Mean document length over the whole corpus, 0.0 when empty
    pub fn avg_doc_length(&self) -> Result<f64> {
        let conn = self.get_conn()?;
        let avg = conn.query_row(
            "SELECT COALESCE(AVG(length), 0.0) FROM documents",
            [],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    /// Literal IDF for exactly the given terms; rows without a computed IDF
    /// are omitted (they contribute nothing at query time)
    pub fn literal_idf_for(&self, terms: &[u32]) -> Result<AHashMap<u32, f64>> {
        let conn = self.get_conn()?;
        let mut idf = AHashMap::with_capacity(terms.len());

        for chunk in terms.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT term, literal_idf FROM vocabulary WHERE term IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, Option<f64>>(1)?))
            })?;
            for row in rows {
                let (term, value) = row?;
                if let Some(value) = value {
                    idf.insert(term, value);
                }
            }
        }

        Ok(idf)
    }

    /// Postings from the chosen table, restricted to the given terms
    pub fn postings_for(&self, terms: &[u32], set: PostingSet) -> Result<Vec<Posting>> {
        let conn = self.get_conn()?;
        let mut postings = Vec::new();

        for chunk in terms.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT document, term, {} FROM {} WHERE term IN ({})",
                set.value_column(),
                set.table(),
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok(Posting {
                    document: row.get(0)?,
                    term: row.get(1)?,
                    tf: row.get(2)?,
                })
            })?;
            for row in rows {
                postings.push(row?);
            }
        }

        Ok(postings)
    }

    /// Lengths for exactly the given document ids
    pub fn doc_lengths_for(&self, ids: &[String]) -> Result<AHashMap<String, i64>> {
        let conn = self.get_conn()?;
        let mut lengths = AHashMap::with_capacity(ids.len());

        for chunk in ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT id, length FROM documents WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (id, length) = row?;
                lengths.insert(id, length);
            }
        }

        Ok(lengths)
    }

    /// Recompute the IDF column fed by the chosen posting table, for every
    /// vocabulary term:
    ///
    /// `idf(t) = ln((N - df(t) + 0.5) / (df(t) + 0.5) + 1)`
    ///
    /// Zero document frequency yields a defined, positive value.
    pub fn recompute_idf(&self, set: PostingSet) -> Result<()> {
        let mut conn = self.get_conn()?;

        let n: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let mut df: AHashMap<u32, i64> = AHashMap::new();
        {
            let sql = format!(
                "SELECT term, COUNT(DISTINCT document) FROM {} GROUP BY term",
                set.table()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (term, count) = row?;
                df.insert(term, count);
            }
        }

        let terms = self.vocabulary_terms()?;
        let tx = conn.transaction()?;
        {
            let sql = format!(
                "UPDATE vocabulary SET {} = ?1 WHERE term = ?2",
                set.idf_column()
            );
            let mut stmt = tx.prepare(&sql)?;
            for term in &terms {
                let df = df.get(term).copied().unwrap_or(0) as f64;
                let idf = ((n as f64 - df + 0.5) / (df + 0.5) + 1.0).ln();
                stmt.execute(params![idf, term])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            "Recomputed {} for {} terms over {} documents",
            set.idf_column(),
            terms.len(),
            n
        );
        Ok(())
    }

    /// Delete all index contents (vocabulary, documents, and postings)
    pub fn clear(&self) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM postings_semantic", [])?;
        tx.execute("DELETE FROM postings_literal", [])?;
        tx.execute("DELETE FROM documents", [])?;
        tx.execute("DELETE FROM vocabulary", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Get index statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.get_conn()?;

        let vocabulary: i64 =
            conn.query_row("SELECT COUNT(*) FROM vocabulary", [], |row| row.get(0))?;

        let documents: i64 =
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let literal_postings: i64 =
            conn.query_row("SELECT COUNT(*) FROM postings_literal", [], |row| row.get(0))?;

        let semantic_postings: i64 = conn.query_row(
            "SELECT COUNT(*) FROM postings_semantic",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            vocabulary: vocabulary as usize,
            documents: documents as usize,
            literal_postings: literal_postings as usize,
            semantic_postings: semantic_postings as usize,
        })
    }
}

/// Index statistics
#[derive(Debug)]
pub struct StoreStats {
    pub vocabulary: usize,
    pub documents: usize,
    pub literal_postings: usize,
    pub semantic_postings: usize,
}

fn placeholders(n: usize) -> String {
    let mut out = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Vocabulary with both IDF columns; IDF is NULL until its pass runs
    CREATE TABLE vocabulary (
        term INTEGER PRIMARY KEY,
        literal_idf REAL,
        semantic_idf REAL
    );

    -- Documents keyed by filename stem
    CREATE TABLE documents (
        id TEXT PRIMARY KEY,
        length INTEGER NOT NULL
    );

    -- Literal postings (raw term counts)
    CREATE TABLE postings_literal (
        document TEXT NOT NULL,
        term INTEGER NOT NULL,
        tf INTEGER NOT NULL,
        PRIMARY KEY (document, term),
        FOREIGN KEY (document) REFERENCES documents(id) ON DELETE CASCADE,
        FOREIGN KEY (term) REFERENCES vocabulary(term) ON DELETE CASCADE
    );

    CREATE INDEX idx_postings_literal_term ON postings_literal(term);

    -- Semantic postings (neighbor-weighted term frequency)
    CREATE TABLE postings_semantic (
        document TEXT NOT NULL,
        term INTEGER NOT NULL,
        tfsem REAL NOT NULL,
        PRIMARY KEY (document, term),
        FOREIGN KEY (document) REFERENCES documents(id) ON DELETE CASCADE,
        FOREIGN KEY (term) REFERENCES vocabulary(term) ON DELETE CASCADE
    );

    CREATE INDEX idx_postings_semantic_term ON postings_semantic(term);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, IndexStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(&temp_dir.path().join("index.sqlite")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("index.sqlite");

        let _store = IndexStore::new(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_migrations() {
        let (_dir, store) = store();

        let conn = store.get_conn().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_schema_exists() {
        let (_dir, store) = store();
        let conn = store.get_conn().unwrap();

        let tables = vec![
            "vocabulary",
            "documents",
            "postings_literal",
            "postings_semantic",
        ];

        for table in tables {
            let count: i32 = conn
                .query_row(
                    &format!(
                        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='{}'",
                        table
                    ),
                    [],
                    |row| row.get(0),
                )
                .unwrap();

            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_document_cascade_deletes_postings() {
        let (_dir, store) = store();

        store.insert_vocabulary(&[5, 9]).unwrap();
        store.ingest_document("d1", 10, &[(5, 2), (9, 1)]).unwrap();
        store
            .upsert_semantic_postings(5, &[("d1".to_string(), 2.4)])
            .unwrap();

        let conn = store.get_conn().unwrap();
        conn.execute("DELETE FROM documents WHERE id = 'd1'", [])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.literal_postings, 0);
        assert_eq!(stats.semantic_postings, 0);
    }

    #[test]
    fn test_ingest_is_idempotent() {
        let (_dir, store) = store();

        store.insert_vocabulary(&[5, 9]).unwrap();
        for _ in 0..2 {
            store.ingest_document("d1", 10, &[(5, 2), (9, 1)]).unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.literal_postings, 2);

        let postings = store.postings_for(&[5], PostingSet::Literal).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].tf, 2.0);
    }

    #[test]
    fn test_idf_positive_and_defined_for_zero_df() {
        let (_dir, store) = store();

        store.insert_vocabulary(&[5, 9]).unwrap();
        store.ingest_document("d1", 4, &[(5, 2)]).unwrap();
        store.ingest_document("d2", 6, &[(5, 1)]).unwrap();
        store.recompute_idf(PostingSet::Literal).unwrap();

        let idf = store.literal_idf_for(&[5, 9]).unwrap();

        // df(5) = 2 of 2 documents, df(9) = 0
        let expected_5 = ((2.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0f64).ln();
        let expected_9 = ((2.0 - 0.0 + 0.5) / (0.0 + 0.5) + 1.0f64).ln();
        assert!((idf[&5] - expected_5).abs() < 1e-12);
        assert!((idf[&9] - expected_9).abs() < 1e-12);
        assert!(idf.values().all(|v| *v > 0.0));
    }

    #[test]
    fn test_idf_missing_before_first_pass() {
        let (_dir, store) = store();

        store.insert_vocabulary(&[5]).unwrap();
        let idf = store.literal_idf_for(&[5]).unwrap();
        assert!(idf.is_empty());
    }

    #[test]
    fn test_postings_filter_by_term_set() {
        let (_dir, store) = store();

        store.insert_vocabulary(&[1, 2, 3]).unwrap();
        store
            .ingest_document("d1", 5, &[(1, 1), (2, 2), (3, 3)])
            .unwrap();

        let postings = store.postings_for(&[1, 3], PostingSet::Literal).unwrap();
        let mut terms: Vec<u32> = postings.iter().map(|p| p.term).collect();
        terms.sort_unstable();
        assert_eq!(terms, vec![1, 3]);
    }

    #[test]
    fn test_avg_doc_length() {
        let (_dir, store) = store();
        assert_eq!(store.avg_doc_length().unwrap(), 0.0);

        store.insert_vocabulary(&[1]).unwrap();
        store.ingest_document("d1", 4, &[]).unwrap();
        store.ingest_document("d2", 8, &[]).unwrap();
        assert_eq!(store.avg_doc_length().unwrap(), 6.0);
    }

    #[test]
    fn test_clear() {
        let (_dir, store) = store();

        store.insert_vocabulary(&[5]).unwrap();
        store.ingest_document("d1", 3, &[(5, 3)]).unwrap();
        store.clear().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.vocabulary, 0);
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.literal_postings, 0);
    }
}
