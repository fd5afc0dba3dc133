// Vote aggregation - plurality vote over per-segment predictions
//
// Every prediction vector casts one vote for its arg-max class. Votes are
// tallied in first-encountered order and sorted by count with a stable
// sort, so equal counts keep the order in which their genres first
// appeared. Percentages are rounded to two decimals per genre.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::classifier::{LabelTable, PredictionVector};
use crate::error::AggregationError;

/// Genre reported when there were no votes at all
pub const UNKNOWN_GENRE: &str = "unknown";

/// One row of the ranked breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreShare {
    pub genre: String,
    pub percentage: f64,
}

/// Headline prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    pub genre: String,
    pub confidence: f64,
}

/// Aggregated verdict for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub segment_count: usize,
    pub results: Vec<GenreShare>,
    pub top_prediction: TopPrediction,
}

/// Vote counts in first-encountered order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    counts: Vec<(String, usize)>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one vote for `genre`
    pub fn record(&mut self, genre: &str) {
        match self.counts.iter_mut().find(|(g, _)| g == genre) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((genre.to_string(), 1)),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn count(&self, genre: &str) -> usize {
        self.counts
            .iter()
            .find(|(g, _)| g == genre)
            .map_or(0, |(_, count)| *count)
    }

    /// Entries sorted by count descending; ties keep first-encountered order
    pub fn ranked(&self) -> Vec<(String, usize)> {
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// Hundredths of a percent in a whole
const PERCENT_UNITS: u64 = 10_000;

/// `100 * count / total` in hundredths, rounded half to even
fn rounded_units(count: usize, total: usize) -> i64 {
    let scaled = count as u64 * PERCENT_UNITS;
    let total = total as u64;
    let (quotient, remainder) = (scaled / total, scaled % total);
    let rounded = match (2 * remainder).cmp(&total) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal => quotient + quotient % 2,
    };
    rounded as i64
}

/// Two-decimal percentages for `counts`
///
/// Each entry is `round(100 * count / total, 2)`. When those drift more than
/// 0.01 away from 100 in total, whole groups of equal counts are nudged by one
/// hundredth toward their exact share until the drift is back within 0.01.
/// Equal counts always get equal percentages, so a drift no group can absorb
/// (six single votes at 16.67 each) is left as is.
fn apportion_percentages(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }

    let mut units: Vec<i64> = counts.iter().map(|&c| rounded_units(c, total)).collect();
    let mut drift = units.iter().sum::<i64>() - PERCENT_UNITS as i64;

    if drift.abs() > 1 {
        let step = drift.signum();
        let mut groups: Vec<usize> = counts.to_vec();
        groups.sort_unstable();
        groups.dedup();

        // Signed rounding error, largest first in the direction of the drift
        let mut by_error: Vec<(usize, i64)> = groups
            .into_iter()
            .map(|c| {
                let error = rounded_units(c, total) * total as i64
                    - (c as u64 * PERCENT_UNITS) as i64;
                (c, error * step)
            })
            .collect();
        by_error.sort_by(|a, b| b.1.cmp(&a.1));

        for (count, _) in by_error {
            if drift.abs() <= 1 {
                break;
            }
            let members = counts.iter().filter(|&&c| c == count).count() as i64;
            if (drift - step * members).abs() >= drift.abs() {
                continue;
            }
            for (unit, _) in units.iter_mut().zip(counts).filter(|(_, c)| **c == count) {
                *unit -= step;
            }
            drift -= step * members;
        }
    }

    units.into_iter().map(|u| u as f64 / 100.0).collect()
}

/// Tally arg-max votes of `predictions` through `labels`
pub fn tally_votes(
    predictions: &[PredictionVector],
    labels: &LabelTable,
) -> Result<VoteTally, AggregationError> {
    let mut tally = VoteTally::new();
    for (position, prediction) in predictions.iter().enumerate() {
        let index = prediction
            .argmax()
            .ok_or(AggregationError::EmptyPrediction { position })?;
        let genre = labels.get(index).ok_or(AggregationError::UnmappedClass {
            index,
            table_len: labels.len(),
        })?;
        tally.record(genre);
    }
    Ok(tally)
}

/// Rank a finished tally into the response shape
pub fn rank(tally: &VoteTally) -> RankedResult {
    let total = tally.total();
    let ranked = tally.ranked();
    let counts: Vec<usize> = ranked.iter().map(|(_, count)| *count).collect();

    let results: Vec<GenreShare> = ranked
        .into_iter()
        .zip(apportion_percentages(&counts))
        .map(|((genre, _), percentage)| GenreShare { genre, percentage })
        .collect();

    let top_prediction = results
        .first()
        .map(|top| TopPrediction {
            genre: top.genre.clone(),
            confidence: top.percentage,
        })
        .unwrap_or_else(|| TopPrediction {
            genre: UNKNOWN_GENRE.to_string(),
            confidence: 0.0,
        });

    RankedResult {
        segment_count: total,
        results,
        top_prediction,
    }
}

/// Combine per-segment predictions into one ranked verdict
///
/// Zero predictions produce a degenerate result (`segment_count = 0`,
/// top prediction `unknown` at 0) rather than an error; callers decide
/// whether that is acceptable.
pub fn aggregate(
    predictions: &[PredictionVector],
    labels: &LabelTable,
) -> Result<RankedResult, AggregationError> {
    let tally = tally_votes(predictions, labels)?;
    Ok(rank(&tally))
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
