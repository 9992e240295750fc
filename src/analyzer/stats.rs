//! Reusable reductions for dashboard KPIs. Every function returns a defined
//! value on empty input instead of dividing by zero.

/// Arithmetic mean. Returns 0.0 if the iterator is empty.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// `100 × part / whole`. Returns 0.0 when `whole` is not positive.
pub fn pct(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}
