//! Ranking-quality metrics over a single ranked list
//!
//! All divisions by an empty set report 0.0 by policy rather than erroring.

use std::collections::HashMap;

/// Graded relevance judgments for one query: doc id -> grade.
/// Absence means "not judged", which the metrics treat as non-relevant.
pub type Judgments = HashMap<String, i32>;

fn top_k(ranked: &[String], k: usize) -> &[String] {
    &ranked[..ranked.len().min(k)]
}

/// Fraction of the top-k prefix that is judged; 0.0 for an empty prefix
pub fn precision_at_k(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    let top = top_k(ranked, k);
    if top.is_empty() {
        return 0.0;
    }
    let hits = top.iter().filter(|doc| judgments.contains_key(*doc)).count();
    hits as f64 / top.len() as f64
}

/// Fraction of judged documents found in the top-k prefix; 0.0 when nothing
/// is judged
pub fn recall_at_k(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    if judgments.is_empty() {
        return 0.0;
    }
    let top = top_k(ranked, k);
    let hits = top.iter().filter(|doc| judgments.contains_key(*doc)).count();
    hits as f64 / judgments.len() as f64
}

/// Harmonic mean of precision and recall at k; 0.0 when both are 0
pub fn f1_at_k(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    let p = precision_at_k(ranked, judgments, k);
    let r = recall_at_k(ranked, judgments, k);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Average precision over the top-k prefix, normalized by the judged count
pub fn average_precision(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    if judgments.is_empty() {
        return 0.0;
    }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (position, doc) in top_k(ranked, k).iter().enumerate() {
        if judgments.contains_key(doc) {
            hits += 1;
            sum += hits as f64 / (position + 1) as f64;
        }
    }
    sum / judgments.len() as f64
}

/// Discounted cumulative gain with exponential graded contributions:
/// `(2^rel - 1) / log2(i + 2)`, unjudged documents contributing 0
pub fn dcg_at_k(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    let mut dcg = 0.0;
    for (position, doc) in top_k(ranked, k).iter().enumerate() {
        let rel = judgments.get(doc).copied().unwrap_or(0);
        if rel > 0 {
            let gain = 2f64.powi(rel) - 1.0;
            dcg += gain / ((position + 2) as f64).log2();
        }
    }
    dcg
}

/// DCG of the ideal ordering: all positive grades sorted descending,
/// truncated to k
pub fn idcg_at_k(judgments: &Judgments, k: usize) -> f64 {
    let mut grades: Vec<i32> = judgments.values().copied().filter(|v| *v > 0).collect();
    grades.sort_unstable_by(|a, b| b.cmp(a));

    let mut idcg = 0.0;
    for (position, rel) in grades.iter().take(k).enumerate() {
        let gain = 2f64.powi(*rel) - 1.0;
        idcg += gain / ((position + 2) as f64).log2();
    }
    idcg
}

/// Normalized DCG at k; 0.0 when the ideal DCG is 0
pub fn ndcg_at_k(ranked: &[String], judgments: &Judgments, k: usize) -> f64 {
    let idcg = idcg_at_k(judgments, k);
    if idcg == 0.0 {
        0.0
    } else {
        dcg_at_k(ranked, judgments, k) / idcg
    }
}

/// Sum of relevance grades over every retrieved judged document
/// (the whole list, not a top-k prefix)
pub fn judgment_sum(ranked: &[String], judgments: &Judgments) -> f64 {
    ranked
        .iter()
        .filter_map(|doc| judgments.get(doc))
        .map(|grade| *grade as f64)
        .sum()
}

/// Count of retrieved documents graded exactly "highly relevant"
/// (the whole list, not a top-k prefix)
pub fn high_grade_count(ranked: &[String], judgments: &Judgments) -> f64 {
    ranked
        .iter()
        .filter(|doc| judgments.get(*doc).copied() == Some(2))
        .count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judged(pairs: &[(&str, i32)]) -> Judgments {
        pairs
            .iter()
            .map(|(doc, grade)| (doc.to_string(), *grade))
            .collect()
    }

    fn ranked(docs: &[&str]) -> Vec<String> {
        docs.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn golden_example() {
        let judgments = judged(&[("d1", 2), ("d2", 1)]);
        let list = ranked(&["d1", "d3", "d2"]);

        assert!((precision_at_k(&list, &judgments, 3) - 2.0 / 3.0).abs() < 1e-12);
        assert!((recall_at_k(&list, &judgments, 3) - 1.0).abs() < 1e-12);
        assert!((dcg_at_k(&list, &judgments, 3) - 3.5).abs() < 1e-12);

        let idcg = 3.0 + 1.0 / 3f64.log2();
        assert!((idcg_at_k(&judgments, 3) - idcg).abs() < 1e-4);
        assert!((ndcg_at_k(&list, &judgments, 3) - 3.5 / idcg).abs() < 1e-4);
        assert!((ndcg_at_k(&list, &judgments, 3) - 0.9645).abs() < 1e-4);
    }

    #[test]
    fn average_precision_accumulates_at_hits() {
        let judgments = judged(&[("d1", 2), ("d2", 1)]);
        let list = ranked(&["d1", "d3", "d2"]);

        // Hits at positions 1 and 3: (1/1 + 2/3) / 2
        let expected = (1.0 + 2.0 / 3.0) / 2.0;
        assert!((average_precision(&list, &judgments, 3) - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_judgments_report_zero() {
        let judgments = Judgments::new();
        let list = ranked(&["d1", "d2"]);

        assert_eq!(recall_at_k(&list, &judgments, 2), 0.0);
        assert_eq!(average_precision(&list, &judgments, 2), 0.0);
        assert_eq!(ndcg_at_k(&list, &judgments, 2), 0.0);
        assert_eq!(f1_at_k(&list, &judgments, 2), 0.0);
    }

    #[test]
    fn empty_ranking_reports_zero_precision() {
        let judgments = judged(&[("d1", 1)]);
        assert_eq!(precision_at_k(&[], &judgments, 5), 0.0);
    }

    #[test]
    fn recall_is_monotone_in_k() {
        let judgments = judged(&[("d1", 1), ("d4", 2)]);
        let list = ranked(&["d2", "d1", "d3", "d4"]);

        let mut previous = 0.0;
        for k in 1..=list.len() {
            let recall = recall_at_k(&list, &judgments, k);
            assert!(recall >= previous);
            assert!((0.0..=1.0).contains(&recall));
            previous = recall;
        }
    }

    #[test]
    fn ndcg_stays_within_unit_interval() {
        let judgments = judged(&[("d1", 2), ("d2", 1), ("d3", 1)]);
        let list = ranked(&["d3", "d2", "d1", "d4"]);

        for k in 1..=5 {
            let ndcg = ndcg_at_k(&list, &judgments, k);
            assert!((0.0..=1.0 + 1e-12).contains(&ndcg));
        }
    }

    #[test]
    fn whole_list_sums_ignore_cutoff() {
        let judgments = judged(&[("d1", 2), ("d2", 1), ("d3", 2)]);
        let list = ranked(&["d1", "d2", "d3", "d4"]);

        assert_eq!(judgment_sum(&list, &judgments), 5.0);
        assert_eq!(high_grade_count(&list, &judgments), 2.0);
        assert_eq!(judgment_sum(&[], &judgments), 0.0);
    }
}
