//! Accuracy of a results table against a ground-truth table

use carbonmatch_core::{Error, MatchResult, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Rating agreement between ground truth and match output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Distinct inputs in the ground truth
    pub total: usize,
    pub correct: usize,
    /// Ground-truth inputs absent from the output; counted as incorrect
    pub missing: usize,
}

impl Evaluation {
    /// Percentage of ground-truth inputs whose rating matches
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64 * 100.0
    }
}

/// Compare ratings keyed by input product.
///
/// A later row for the same input replaces an earlier one on both sides.
pub fn evaluate(truth: &[MatchResult], output: &[MatchResult]) -> Result<Evaluation> {
    let truth = ratings_by_input(truth);
    if truth.is_empty() {
        return Err(Error::InvalidConfig("ground truth is empty".to_string()));
    }
    let output = ratings_by_input(output);

    let mut evaluation = Evaluation {
        total: truth.len(),
        correct: 0,
        missing: 0,
    };
    for (input, expected) in &truth {
        match output.get(input) {
            Some(actual) if actual == expected => evaluation.correct += 1,
            Some(_) => {}
            None => evaluation.missing += 1,
        }
    }
    Ok(evaluation)
}

fn ratings_by_input(rows: &[MatchResult]) -> HashMap<&str, &str> {
    rows.iter()
        .map(|r| (r.input_product.as_str(), r.carbon_rating.as_str()))
        .collect()
}
