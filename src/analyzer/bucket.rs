use crate::analyzer::table::{NumericField, OrderTable};
use crate::error::AppError;

/// Validated set of labeled bins over a numeric field.
///
/// Bin `i` covers `(boundaries[i], boundaries[i + 1]]`: left-open, right-closed,
/// so with `[0, 18, 25]` an age of 18 lands in the first bin and 0 in none.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSpec {
    boundaries: Vec<f64>,
    labels: Vec<String>,
}

impl BucketSpec {
    pub fn new(boundaries: Vec<f64>, labels: Vec<String>) -> Result<BucketSpec, AppError> {
        if boundaries.len() < 2 {
            return Err(AppError::Configuration(format!(
                "at least 2 bucket boundaries are required, got {}",
                boundaries.len()
            )));
        }
        if boundaries.iter().any(|b| !b.is_finite()) {
            return Err(AppError::Configuration(
                "bucket boundaries must be finite numbers".to_string(),
            ));
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AppError::Configuration(format!(
                "bucket boundaries must be strictly increasing: {:?}",
                boundaries
            )));
        }
        if labels.len() != boundaries.len() - 1 {
            return Err(AppError::Configuration(format!(
                "{} boundaries need {} labels, got {}",
                boundaries.len(),
                boundaries.len() - 1,
                labels.len()
            )));
        }
        Ok(BucketSpec { boundaries, labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Label of the bin containing `value`, `None` outside every bin.
    pub fn label_for(&self, value: f64) -> Option<&str> {
        if value.is_nan() {
            return None;
        }
        self.boundaries
            .windows(2)
            .position(|w| value > w[0] && value <= w[1])
            .map(|i| self.labels[i].as_str())
    }
}

/// Returns a copy of `table` where every record carries a `target` label
/// for its `source` value. Out-of-range or undefined values get no label.
pub fn bucketize(
    table: &OrderTable,
    source: NumericField,
    target: &str,
    spec: &BucketSpec,
) -> OrderTable {
    let records = table
        .iter()
        .map(|record| {
            let mut record = record.clone();
            record.buckets.remove(target);
            if let Some(label) = record.numeric(source).and_then(|v| spec.label_for(v)) {
                record.buckets.insert(target.to_string(), label.to_string());
            }
            record
        })
        .collect();

    table
        .derive(records)
        .with_bucket_domain(target, spec.labels().to_vec())
}
