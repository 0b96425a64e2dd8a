//! Index build pipeline and persisted posting store
//!
//! The store holds the vocabulary, document, and posting tables; the builder
//! fills the literal side from a tokenized corpus; the expander derives the
//! semantic posting set from embedding neighbors.

pub mod builder;
pub mod expansion;
pub mod store;

pub use builder::{BuildReport, IndexBuilder};
pub use expansion::{ExpansionReport, SemanticExpander};
pub use store::{IndexStore, StoreStats};

/// Which posting table an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingSet {
    Literal,
    Semantic,
}

impl PostingSet {
    pub(crate) fn table(self) -> &'static str {
        match self {
            PostingSet::Literal => "postings_literal",
            PostingSet::Semantic => "postings_semantic",
        }
    }

    pub(crate) fn value_column(self) -> &'static str {
        match self {
            PostingSet::Literal => "tf",
            PostingSet::Semantic => "tfsem",
        }
    }

    pub(crate) fn idf_column(self) -> &'static str {
        match self {
            PostingSet::Literal => "literal_idf",
            PostingSet::Semantic => "semantic_idf",
        }
    }
}

/// One posting row, term frequency widened to f64 for the scoring path
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub document: String,
    pub term: u32,
    pub tf: f64,
}
