//! Aggregate comparison of the literal and semantic rankings

use crate::eval::metrics::{
    average_precision, f1_at_k, high_grade_count, judgment_sum, ndcg_at_k, precision_at_k,
    recall_at_k, Judgments,
};
use crate::eval::QueryResult;
use serde::Serialize;

/// Per-method metric bundle. The first five are means over queries; the two
/// raw scores are sums over the full (untruncated) ranked lists.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricSet {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub map: f64,
    pub ndcg: f64,
    pub judgment_sum: f64,
    pub high_grade_count: f64,
}

impl MetricSet {
    fn of(ranked: &[String], judgments: &Judgments, k: usize) -> Self {
        Self {
            precision: precision_at_k(ranked, judgments, k),
            recall: recall_at_k(ranked, judgments, k),
            f1: f1_at_k(ranked, judgments, k),
            map: average_precision(ranked, judgments, k),
            ndcg: ndcg_at_k(ranked, judgments, k),
            judgment_sum: judgment_sum(ranked, judgments),
            high_grade_count: high_grade_count(ranked, judgments),
        }
    }

    fn accumulate(&mut self, other: &MetricSet) {
        self.precision += other.precision;
        self.recall += other.recall;
        self.f1 += other.f1;
        self.map += other.map;
        self.ndcg += other.ndcg;
        self.judgment_sum += other.judgment_sum;
        self.high_grade_count += other.high_grade_count;
    }

    /// Divide the averaged metrics by the query count; the raw scores
    /// stay as sums
    fn finish(&mut self, queries: usize) {
        if queries == 0 {
            return;
        }
        let n = queries as f64;
        self.precision /= n;
        self.recall /= n;
        self.f1 /= n;
        self.map /= n;
        self.ndcg /= n;
    }

    fn delta(semantic: &MetricSet, literal: &MetricSet) -> MetricSet {
        MetricSet {
            precision: semantic.precision - literal.precision,
            recall: semantic.recall - literal.recall,
            f1: semantic.f1 - literal.f1,
            map: semantic.map - literal.map,
            ndcg: semantic.ndcg - literal.ndcg,
            judgment_sum: semantic.judgment_sum - literal.judgment_sum,
            high_grade_count: semantic.high_grade_count - literal.high_grade_count,
        }
    }
}

/// Aggregate over one set of queries: both methods plus semantic - literal
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MethodComparison {
    pub queries: usize,
    pub literal: MetricSet,
    pub semantic: MetricSet,
    pub delta: MetricSet,
}

/// Full evaluation outcome
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub cutoff: usize,
    pub overall: MethodComparison,
    /// Aggregate restricted to queries whose whole-list judgment sums differ
    /// between the two rankings; `None` when no query differs
    pub disagreement: Option<MethodComparison>,
}

/// Compute per-query metrics at the cutoff and aggregate them, overall and
/// over the disagreement subset.
pub fn compare(queries: &[QueryResult], cutoff: usize) -> Comparison {
    let mut overall_literal = MetricSet::default();
    let mut overall_semantic = MetricSet::default();
    let mut differing_literal = MetricSet::default();
    let mut differing_semantic = MetricSet::default();
    let mut differing = 0usize;

    for query in queries {
        let literal = MetricSet::of(&query.literal, &query.judgments, cutoff);
        let semantic = MetricSet::of(&query.semantic, &query.judgments, cutoff);

        overall_literal.accumulate(&literal);
        overall_semantic.accumulate(&semantic);

        if literal.judgment_sum != semantic.judgment_sum {
            differing_literal.accumulate(&literal);
            differing_semantic.accumulate(&semantic);
            differing += 1;
        }
    }

    overall_literal.finish(queries.len());
    overall_semantic.finish(queries.len());

    let overall = MethodComparison {
        queries: queries.len(),
        literal: overall_literal,
        semantic: overall_semantic,
        delta: MetricSet::delta(&overall_semantic, &overall_literal),
    };

    let disagreement = if differing > 0 {
        differing_literal.finish(differing);
        differing_semantic.finish(differing);
        Some(MethodComparison {
            queries: differing,
            literal: differing_literal,
            semantic: differing_semantic,
            delta: MetricSet::delta(&differing_semantic, &differing_literal),
        })
    } else {
        None
    };

    Comparison {
        cutoff,
        overall,
        disagreement,
    }
}
