//! Vocabulary and literal-statistics build pass

use crate::config::CorpusConfig;
use crate::embedding::SemanticModel;
use crate::error::{Result, SemrankError};
use crate::index::{IndexStore, PostingSet};
use crate::tokenize::scan_token_ids;
use ahash::{AHashMap, AHashSet};
use std::path::PathBuf;

/// Outcome of a literal build pass
#[derive(Debug, Default)]
pub struct BuildReport {
    pub vocabulary: usize,
    pub documents: usize,
    pub skipped: usize,
    pub postings: usize,
}

/// Builds the vocabulary, document, and literal posting tables from a
/// directory of pre-tokenized documents, then recomputes literal IDF.
pub struct IndexBuilder<'a> {
    store: &'a IndexStore,
    config: CorpusConfig,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(store: &'a IndexStore, config: CorpusConfig) -> Self {
        Self { store, config }
    }

    /// Run the full literal pass. Unreadable documents are logged and
    /// skipped; store failures abort.
    pub fn build(&self, model: &dyn SemanticModel) -> Result<BuildReport> {
        let terms = self.vocabulary_terms(model);
        self.store.insert_vocabulary(&terms)?;
        tracing::info!("Vocabulary: {} terms", terms.len());

        let vocabulary: AHashSet<u32> = terms.iter().copied().collect();
        let mut report = BuildReport {
            vocabulary: terms.len(),
            ..BuildReport::default()
        };

        for path in self.corpus_files()? {
            let Some(doc_id) = path.file_stem().and_then(|s| s.to_str()).map(String::from)
            else {
                tracing::warn!("Skipping document with unusable name: {:?}", path);
                report.skipped += 1;
                continue;
            };

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping unreadable document {:?}: {}", path, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let ids = scan_token_ids(&content);
            let length = ids.len() as i64;

            let mut freq: AHashMap<u32, i64> = AHashMap::new();
            for id in ids {
                if vocabulary.contains(&id) {
                    *freq.entry(id).or_insert(0) += 1;
                }
            }
            let mut counts: Vec<(u32, i64)> = freq.into_iter().collect();
            counts.sort_unstable_by_key(|(term, _)| *term);

            self.store.ingest_document(&doc_id, length, &counts)?;
            report.documents += 1;
            report.postings += counts.len();

            if report.documents % 1000 == 0 {
                tracing::info!("Indexed {} documents", report.documents);
            }
        }

        self.store.recompute_idf(PostingSet::Literal)?;

        tracing::info!(
            "Literal pass complete: {} documents ({} skipped), {} postings",
            report.documents,
            report.skipped,
            report.postings
        );
        Ok(report)
    }

    /// Model vocabulary restricted to short numeric surface forms, deduplicated
    fn vocabulary_terms(&self, model: &dyn SemanticModel) -> Vec<u32> {
        let mut terms: Vec<u32> = model
            .vocabulary()
            .iter()
            .filter(|word| word.len() < self.config.max_term_text_len)
            .filter_map(|word| word.parse().ok())
            .collect::<AHashSet<u32>>()
            .into_iter()
            .collect();
        terms.sort_unstable();
        terms
    }

    /// Corpus `.txt` files in deterministic (name) order
    fn corpus_files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.config.docs_dir).map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to read corpus directory: {:?}", self.config.docs_dir),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SemrankError::Io {
                source: e,
                context: format!(
                    "Failed to read corpus directory entry: {:?}",
                    self.config.docs_dir
                ),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("txt") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
