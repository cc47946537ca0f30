//! Classification metrics — accuracy, weighted precision/recall/F1, a
//! per-class report, and a confusion matrix.
//!
//! Pure function of its two label sequences; computed fresh per call and
//! never persisted. Mismatched lengths are a caller bug and fail hard.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Precondition violation: the two label sequences differ in length.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("label sequences differ in length: {expected} true vs {actual} predicted")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Per-class precision/recall/F1 and support (occurrences in y_true).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

/// Aggregate metrics over a batch of (true, predicted) labels.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationMetrics {
    /// Fraction of exact matches.
    pub accuracy: f64,
    /// Support-weighted average precision.
    pub precision: f64,
    /// Support-weighted average recall.
    pub recall: f64,
    /// Support-weighted average F1.
    pub f1: f64,
    /// Per-label report over the union of observed labels.
    pub per_class: BTreeMap<String, ClassMetrics>,
    /// Sorted (lexical) union of observed labels, indexing the matrix axes.
    pub labels: Vec<String>,
    /// Row = true label, column = predicted label, cell = count.
    pub confusion_matrix: Vec<Vec<u64>>,
}

/// Evaluate predicted labels against ground truth.
///
/// Labels present only in `y_pred` carry zero support (they don't move the
/// weighted averages) but still appear in the report and the matrix axes.
/// Zero-division anywhere yields 0.0, not an error.
pub fn evaluate(y_true: &[String], y_pred: &[String]) -> Result<EvaluationMetrics, EvalError> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }

    let total = y_true.len();
    if total == 0 {
        return Ok(EvaluationMetrics {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            per_class: BTreeMap::new(),
            labels: Vec::new(),
            confusion_matrix: Vec::new(),
        });
    }

    // Sorted (lexical) union of observed labels.
    let observed: BTreeSet<&str> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(String::as_str)
        .collect();
    let labels: Vec<String> = observed.iter().map(|l| l.to_string()).collect();
    let label_index: BTreeMap<&str, usize> = observed
        .iter()
        .enumerate()
        .map(|(idx, label)| (*label, idx))
        .collect();

    let n = labels.len();
    let mut matrix = vec![vec![0u64; n]; n];
    let mut correct = 0usize;

    for (truth, pred) in y_true.iter().zip(y_pred.iter()) {
        if truth == pred {
            correct += 1;
        }
        let row = label_index[truth.as_str()];
        let col = label_index[pred.as_str()];
        matrix[row][col] += 1;
    }

    let mut per_class = BTreeMap::new();
    let mut weighted_precision = 0.0;
    let mut weighted_recall = 0.0;
    let mut weighted_f1 = 0.0;

    for (idx, label) in labels.iter().enumerate() {
        let tp = matrix[idx][idx];
        let actual: u64 = matrix[idx].iter().sum();
        let predicted: u64 = matrix.iter().map(|row| row[idx]).sum();

        let precision = ratio(tp, predicted);
        let recall = ratio(tp, actual);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let weight = actual as f64 / total as f64;
        weighted_precision += precision * weight;
        weighted_recall += recall * weight;
        weighted_f1 += f1 * weight;

        per_class.insert(
            label.clone(),
            ClassMetrics {
                precision,
                recall,
                f1,
                support: actual,
            },
        );
    }

    Ok(EvaluationMetrics {
        accuracy: correct as f64 / total as f64,
        precision: weighted_precision,
        recall: weighted_recall,
        f1: weighted_f1,
        per_class,
        labels,
        confusion_matrix: matrix,
    })
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
