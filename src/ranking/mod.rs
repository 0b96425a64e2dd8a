//! BM25-family scoring over the literal or semantic posting set

use crate::config::RankingConfig;
use crate::error::Result;
use crate::index::{IndexStore, PostingSet};
use ahash::AHashMap;

/// Scores queries against one posting set at a time.
///
/// The corpus-wide average document length is captured once at construction;
/// rebuild the ranker after rebuilding the index.
pub struct Ranker<'a> {
    store: &'a IndexStore,
    config: RankingConfig,
    avg_len: f64,
}

impl<'a> Ranker<'a> {
    pub fn new(store: &'a IndexStore, config: RankingConfig) -> Result<Self> {
        let avg_len = store.avg_doc_length()?;
        Ok(Self {
            store,
            config,
            avg_len,
        })
    }

    /// Average document length the ranker normalizes against
    pub fn avg_doc_length(&self) -> f64 {
        self.avg_len
    }

    /// Relevance score per matched document. Documents without any matching
    /// term are absent, never scored 0.0. Both posting sets are weighted by
    /// literal IDF.
    pub fn scores(&self, terms: &[u32], set: PostingSet) -> Result<AHashMap<String, f64>> {
        let idf = self.store.literal_idf_for(terms)?;
        let postings = self.store.postings_for(terms, set)?;

        let mut matched: AHashMap<String, Vec<(u32, f64)>> = AHashMap::new();
        for posting in postings {
            matched
                .entry(posting.document)
                .or_default()
                .push((posting.term, posting.tf));
        }

        let ids: Vec<String> = matched.keys().cloned().collect();
        let lengths = self.store.doc_lengths_for(&ids)?;

        let mut scores = AHashMap::with_capacity(matched.len());
        for (document, term_frequencies) in matched {
            let length = lengths.get(&document).copied().unwrap_or(1) as f64;
            let mut score = 0.0;
            for (term, tf) in term_frequencies {
                let idf = idf.get(&term).copied().unwrap_or(0.0);
                score += idf * self.term_weight(tf, length);
            }
            scores.insert(document, score);
        }

        Ok(scores)
    }

    /// Ranked document ids, descending score, ascending id on ties,
    /// truncated to the configured result limit
    pub fn ranked(&self, terms: &[u32], set: PostingSet) -> Result<Vec<String>> {
        Ok(self
            .ranked_with_scores(terms, set)?
            .into_iter()
            .map(|(document, _)| document)
            .collect())
    }

    /// Ranked (document, score) pairs, same ordering as [`Self::ranked`]
    pub fn ranked_with_scores(&self, terms: &[u32], set: PostingSet) -> Result<Vec<(String, f64)>> {
        let scores = self.scores(terms, set)?;

        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(self.config.top_k);
        Ok(ranked)
    }

    // The default arithmetic keeps the historical numerator `tf*(k+1)/tf`,
    // which collapses to k+1; term frequency only gates presence. The
    // corrected mode restores the canonical saturating denominator.
    fn term_weight(&self, tf: f64, length: f64) -> f64 {
        let k = self.config.k;
        let b = self.config.b;
        let norm = k * (1.0 - b + b * (length / self.avg_len));
        if self.config.corrected_bm25 {
            (tf * (k + 1.0)) / (tf + norm)
        } else {
            (tf * (k + 1.0)) / tf + norm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankingConfig;
    use crate::index::IndexStore;
    use tempfile::TempDir;

    fn config() -> RankingConfig {
        RankingConfig {
            k: 1.7,
            b: 0.75,
            top_k: 10_000,
            corrected_bm25: false,
        }
    }

    fn seeded_store() -> (TempDir, IndexStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(&temp_dir.path().join("index.sqlite")).unwrap();

        store.insert_vocabulary(&[5, 9]).unwrap();
        store.ingest_document("d1", 10, &[(5, 2)]).unwrap();

        (temp_dir, store)
    }

    #[test]
    fn golden_score_for_single_document() {
        let (_dir, store) = seeded_store();

        // Pin idf(5) = 0.4: with avg_len = len = 10 the historical weight is
        // (k+1) + k = 4.4 and the score must be exactly 0.4 * 4.4.
        let conn = store.get_conn().unwrap();
        conn.execute(
            "UPDATE vocabulary SET literal_idf = 0.4 WHERE term = 5",
            [],
        )
        .unwrap();
        drop(conn);

        let ranker = Ranker::new(&store, config()).unwrap();
        let scores = ranker.scores(&[5], PostingSet::Literal).unwrap();

        assert_eq!(scores.len(), 1);
        assert!((scores["d1"] - 1.76).abs() < 1e-12);
    }

    #[test]
    fn corrected_mode_saturates_on_frequency() {
        let (_dir, store) = seeded_store();
        let conn = store.get_conn().unwrap();
        conn.execute(
            "UPDATE vocabulary SET literal_idf = 0.4 WHERE term = 5",
            [],
        )
        .unwrap();
        drop(conn);

        let mut corrected = config();
        corrected.corrected_bm25 = true;

        let ranker = Ranker::new(&store, corrected).unwrap();
        let scores = ranker.scores(&[5], PostingSet::Literal).unwrap();

        // tf = 2, norm = 1.7: 0.4 * (2 * 2.7) / (2 + 1.7)
        let expected = 0.4 * (2.0 * 2.7) / 3.7;
        assert!((scores["d1"] - expected).abs() < 1e-12);
    }

    #[test]
    fn unknown_query_terms_contribute_nothing() {
        let (_dir, store) = seeded_store();
        store.recompute_idf(PostingSet::Literal).unwrap();

        let ranker = Ranker::new(&store, config()).unwrap();
        let scores = ranker.scores(&[777], PostingSet::Literal).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn only_matched_documents_appear() {
        let (_dir, store) = seeded_store();
        store.ingest_document("d2", 5, &[(9, 1)]).unwrap();
        store.recompute_idf(PostingSet::Literal).unwrap();

        let ranker = Ranker::new(&store, config()).unwrap();
        let scores = ranker.scores(&[5], PostingSet::Literal).unwrap();
        assert!(scores.contains_key("d1"));
        assert!(!scores.contains_key("d2"));
    }

    #[test]
    fn ranked_breaks_ties_by_document_id() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(&temp_dir.path().join("index.sqlite")).unwrap();

        store.insert_vocabulary(&[5]).unwrap();
        // Identical length and frequency: identical scores.
        store.ingest_document("d2", 10, &[(5, 2)]).unwrap();
        store.ingest_document("d1", 10, &[(5, 2)]).unwrap();
        store.recompute_idf(PostingSet::Literal).unwrap();

        let ranker = Ranker::new(&store, config()).unwrap();
        let ranked = ranker.ranked(&[5], PostingSet::Literal).unwrap();
        assert_eq!(ranked, vec!["d1".to_string(), "d2".to_string()]);
    }

    #[test]
    fn ranked_respects_result_limit() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(&temp_dir.path().join("index.sqlite")).unwrap();

        store.insert_vocabulary(&[5]).unwrap();
        for doc in ["d1", "d2", "d3"] {
            store.ingest_document(doc, 10, &[(5, 1)]).unwrap();
        }
        store.recompute_idf(PostingSet::Literal).unwrap();

        let mut limited = config();
        limited.top_k = 2;
        let ranker = Ranker::new(&store, limited).unwrap();
        assert_eq!(ranker.ranked(&[5], PostingSet::Literal).unwrap().len(), 2);
    }

    #[test]
    fn semantic_mode_reads_semantic_postings_with_literal_idf() {
        let (_dir, store) = seeded_store();
        store
            .upsert_semantic_postings(9, &[("d1".to_string(), 1.5)])
            .unwrap();
        store.recompute_idf(PostingSet::Literal).unwrap();
        store.recompute_idf(PostingSet::Semantic).unwrap();

        let ranker = Ranker::new(&store, config()).unwrap();

        let literal = ranker.scores(&[9], PostingSet::Literal).unwrap();
        assert!(literal.is_empty());

        let semantic = ranker.scores(&[9], PostingSet::Semantic).unwrap();
        assert_eq!(semantic.len(), 1);

        // Weighted by literal idf(9), which has zero document frequency.
        let idf = ((1.0 - 0.0 + 0.5) / (0.0 + 0.5) + 1.0f64).ln();
        let expected = idf * ((1.5 * 2.7) / 1.5 + 1.7);
        assert!((semantic["d1"] - expected).abs() < 1e-12);
    }
}
