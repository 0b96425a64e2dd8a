//! word2vec text-format loader backed by a dense ndarray matrix

use crate::embedding::SemanticModel;
use crate::error::{Result, SemrankError};
use ahash::AHashMap;
use ndarray::Array2;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// In-memory word-embedding space loaded from word2vec text format
/// (header line `count dim`, then one `surface v1 .. vd` row per term).
///
/// Rows are unit-normalized at load time, so cosine similarity is a plain
/// dot product. Surface forms that parse as `u32` are addressable as terms;
/// the rest stay in the vocabulary but never match a term id.
pub struct WordVectors {
    words: Vec<String>,
    ids: Vec<Option<u32>>,
    by_id: AHashMap<u32, usize>,
    vectors: Array2<f32>,
}

impl WordVectors {
    /// Load an embedding space from a word2vec text-format file
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to open vectors file: {:?}", path),
        })?;
        let mut reader = BufReader::new(file);

        let mut header = String::new();
        reader.read_line(&mut header).map_err(|e| SemrankError::Io {
            source: e,
            context: format!("Failed to read vectors header: {:?}", path),
        })?;
        let mut parts = header.split_whitespace();
        let count: usize = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SemrankError::Model(format!("Malformed header in {:?}", path)))?;
        let dim: usize = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| SemrankError::Model(format!("Malformed header in {:?}", path)))?;

        let mut entries = Vec::with_capacity(count);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SemrankError::Io {
                source: e,
                context: format!("Failed to read vectors file: {:?}", path),
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let word = fields
                .next()
                .ok_or_else(|| {
                    SemrankError::Model(format!("Empty row {} in {:?}", line_no + 2, path))
                })?
                .to_string();
            let values = fields
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    SemrankError::Model(format!(
                        "Bad vector component for '{}' in {:?}: {}",
                        word, path, e
                    ))
                })?;
            if values.len() != dim {
                return Err(SemrankError::Model(format!(
                    "Vector for '{}' has {} components, expected {}",
                    word,
                    values.len(),
                    dim
                )));
            }
            entries.push((word, values));
        }

        tracing::info!("Loaded {} vectors ({}d) from {:?}", entries.len(), dim, path);
        Self::from_entries(entries, dim)
    }

    /// Build an embedding space from in-memory rows
    pub fn from_entries(entries: Vec<(String, Vec<f32>)>, dim: usize) -> Result<Self> {
        let mut words = Vec::with_capacity(entries.len());
        let mut ids = Vec::with_capacity(entries.len());
        let mut by_id = AHashMap::with_capacity(entries.len());
        let mut vectors = Array2::<f32>::zeros((entries.len(), dim));

        for (row, (word, values)) in entries.into_iter().enumerate() {
            if values.len() != dim {
                return Err(SemrankError::Model(format!(
                    "Vector for '{}' has {} components, expected {}",
                    word,
                    values.len(),
                    dim
                )));
            }

            let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
            let mut target = vectors.row_mut(row);
            if norm > 0.0 {
                for (slot, value) in target.iter_mut().zip(values.iter()) {
                    *slot = value / norm;
                }
            }

            let id = word.parse::<u32>().ok();
            if let Some(id) = id {
                by_id.entry(id).or_insert(row);
            }
            words.push(word);
            ids.push(id);
        }

        Ok(Self {
            words,
            ids,
            by_id,
            vectors,
        })
    }

    /// Number of vocabulary rows
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the space is empty
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    fn row_of(&self, term: u32) -> Option<usize> {
        self.by_id.get(&term).copied()
    }
}

impl SemanticModel for WordVectors {
    fn vocabulary(&self) -> Vec<String> {
        self.words.clone()
    }

    fn nearest(&self, term: u32, k: usize) -> Vec<(u32, f64)> {
        let Some(row) = self.row_of(term) else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let query = self.vectors.row(row);
        let mut scored: Vec<(u32, f32)> = Vec::new();
        for (candidate, id) in self.ids.iter().enumerate() {
            let Some(id) = id else { continue };
            if candidate == row {
                continue;
            }
            let sim = query.dot(&self.vectors.row(candidate));
            scored.push((*id, sim));
        }

        scored.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored.into_iter().map(|(id, sim)| (id, sim as f64)).collect()
    }

    fn similarity(&self, a: u32, b: u32) -> f64 {
        match (self.row_of(a), self.row_of(b)) {
            (Some(ra), Some(rb)) => self.vectors.row(ra).dot(&self.vectors.row(rb)) as f64,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> WordVectors {
        WordVectors::from_entries(
            vec![
                ("1".to_string(), vec![1.0, 0.0]),
                ("2".to_string(), vec![2.0, 0.0]),
                ("3".to_string(), vec![0.0, 5.0]),
                ("oov".to_string(), vec![1.0, 1.0]),
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn similarity_is_cosine() {
        let space = space();
        assert!((space.similarity(1, 2) - 1.0).abs() < 1e-6);
        assert!(space.similarity(1, 3).abs() < 1e-6);
        assert_eq!(space.similarity(1, 99), 0.0);
    }

    #[test]
    fn nearest_orders_by_similarity_and_skips_non_numeric() {
        let space = space();
        let neighbors = space.nearest(1, 10);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].0, 2);
        assert!(neighbors[0].1 > neighbors[1].1);
    }

    #[test]
    fn nearest_unknown_term_is_empty() {
        let space = space();
        assert!(space.nearest(42, 5).is_empty());
    }

    #[test]
    fn loads_text_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "3 2\n1 1.0 0.0\n2 0.0 1.0\n3 1.0 1.0\n").unwrap();

        let space = WordVectors::load(&path).unwrap();
        assert_eq!(space.len(), 3);
        assert_eq!(space.dimension(), 2);
        assert!((space.similarity(1, 3) - (0.5f64).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "1 3\n1 1.0 0.0\n").unwrap();

        assert!(matches!(
            WordVectors::load(&path),
            Err(SemrankError::Model(_))
        ));
    }
}
