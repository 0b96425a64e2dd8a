//! Tokenization seam
//!
//! Documents and queries are sequences of integer term ids. The index only
//! depends on the [`Tokenizer`] trait; [`BpeTokenizer`] is the cl100k_base
//! provider used by the CLI for queries and corpus preparation.

use crate::error::{Result, SemrankError};
use regex::Regex;
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

/// Deterministic, stateless text-to-term-id encoding
pub trait Tokenizer {
    fn encode(&self, text: &str) -> Vec<u32>;
}

/// cl100k_base byte-pair tokenizer
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| SemrankError::Model(format!("Failed to load cl100k_base: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|id| id as u32)
            .collect()
    }
}

/// Extract every integer term id from a pre-tokenized document body.
///
/// Ids longer than the `u32` range are dropped rather than truncated.
pub fn scan_token_ids(text: &str) -> Vec<u32> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid token pattern"));

    pattern
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .collect()
}

/// Split raw text into sentences on terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"[^.!?]+[.!?]*").expect("valid sentence pattern"));

    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
