//! Semantic neighbor expansion pass
//!
//! Credits a document for containing terms embedding-similar to a vocabulary
//! term, discounted by similarity and a fixed lambda factor, so exact matches
//! always dominate related matches.

use crate::config::ExpansionConfig;
use crate::embedding::SemanticModel;
use crate::error::Result;
use crate::index::{IndexStore, PostingSet};
use ahash::AHashMap;

/// Outcome of an expansion pass
#[derive(Debug, Default)]
pub struct ExpansionReport {
    pub terms_expanded: usize,
    pub postings: usize,
}

/// Derives the semantic posting table from literal postings and embedding
/// neighbors, then recomputes semantic IDF.
pub struct SemanticExpander<'a> {
    store: &'a IndexStore,
    config: ExpansionConfig,
}

impl<'a> SemanticExpander<'a> {
    pub fn new(store: &'a IndexStore, config: ExpansionConfig) -> Self {
        Self { store, config }
    }

    /// Expand every vocabulary term. Terms whose qualifying set matches no
    /// literal posting produce no rows at all.
    pub fn expand(&self, model: &dyn SemanticModel) -> Result<ExpansionReport> {
        let terms = self.store.vocabulary_terms()?;
        let mut report = ExpansionReport::default();

        for (done, &term) in terms.iter().enumerate() {
            // Qualifying set: neighbors above the similarity threshold,
            // plus the term itself at weight 1.0. Zero-weight neighbors
            // (lambda = 0) are dropped so they never materialize rows.
            let mut weights: AHashMap<u32, f64> = model
                .nearest(term, self.config.max_neighbors)
                .into_iter()
                .filter(|(_, similarity)| *similarity > self.config.min_similarity)
                .map(|(neighbor, similarity)| (neighbor, self.config.lambda * similarity))
                .filter(|(_, weight)| *weight > 0.0)
                .collect();
            weights.insert(term, 1.0);

            let qualifying: Vec<u32> = weights.keys().copied().collect();
            let postings = self.store.postings_for(&qualifying, PostingSet::Literal)?;

            let mut accumulated: AHashMap<String, f64> = AHashMap::new();
            for posting in postings {
                let weight = weights[&posting.term];
                *accumulated.entry(posting.document).or_insert(0.0) += posting.tf * weight;
            }

            if accumulated.is_empty() {
                continue;
            }

            let mut rows: Vec<(String, f64)> = accumulated.into_iter().collect();
            rows.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            self.store.upsert_semantic_postings(term, &rows)?;
            report.terms_expanded += 1;
            report.postings += rows.len();

            if (done + 1) % 1000 == 0 {
                tracing::info!("Expanded {}/{} terms", done + 1, terms.len());
            }
        }

        self.store.recompute_idf(PostingSet::Semantic)?;

        tracing::info!(
            "Expansion complete: {} terms produced {} semantic postings",
            report.terms_expanded,
            report.postings
        );
        Ok(report)
    }
}
