//! Judgment file loading

use crate::error::{Result, SemrankError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One judged query: the query text plus its graded relevant documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query: String,
    pub relevant_docs: Vec<RelevantDoc>,
}

/// A judged document with its integer relevance grade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevantDoc {
    pub doc_id: String,
    pub score: i32,
}

impl QueryRecord {
    /// Judgments as a doc-id -> grade map
    pub fn judgment_map(&self) -> HashMap<String, i32> {
        self.relevant_docs
            .iter()
            .map(|doc| (doc.doc_id.clone(), doc.score))
            .collect()
    }
}

/// Load the judgment set from a JSON array of query records
pub fn load_judgments(path: &Path) -> Result<Vec<QueryRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| SemrankError::Io {
        source: e,
        context: format!("Failed to read judgments file: {:?}", path),
    })?;

    serde_json::from_str(&content).map_err(|e| SemrankError::Json {
        source: e,
        context: format!("Failed to parse judgments file: {:?}", path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("queries.json");
        std::fs::write(
            &path,
            r#"[
                {"query": "first", "relevant_docs": [{"doc_id": "d1", "score": 2}]},
                {"query": "second", "relevant_docs": []}
            ]"#,
        )
        .unwrap();

        let records = load_judgments(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].judgment_map()["d1"], 2);
        assert!(records[1].judgment_map().is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_judgments(Path::new("/nonexistent/queries.json"));
        assert!(matches!(result, Err(SemrankError::Io { .. })));
    }
}
