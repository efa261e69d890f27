/// Arithmetic mean, accumulated as `Σ v / n` so finite inputs never overflow.
/// Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().map(|v| v / n).sum();
    Some(clamp_to_range(sum, values))
}

/// Selects the element at index `floor(len / 2)` of the ascending sort.
///
/// Even-length inputs are not averaged: `[1, 2, 3, 4]` yields `3`.
/// Returns `None` for empty input.
pub fn median_at_midpoint(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted[sorted.len() / 2])
}

/// Weighted mean of `(value, weight)` pairs, weights normalized over the given
/// pairs only. Weights must be positive and finite.
///
/// Weights are first rescaled by a power of two near the largest one, which is
/// exact and keeps their sum finite. Returns `None` for empty input.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    let w_max = pairs.iter().map(|(_, w)| *w).fold(0.0_f64, f64::max);
    if pairs.is_empty() || w_max <= 0.0 {
        return None;
    }
    let exponent = (w_max.log2().floor() as i32).clamp(-1023, 1024);
    let scale = 2.0_f64.powi(-exponent);
    let total: f64 = pairs.iter().map(|(_, w)| w * scale).sum();
    let value: f64 = pairs.iter().map(|(v, w)| v * (w * scale / total)).sum();

    let values: Vec<f64> = pairs.iter().map(|(v, _)| *v).collect();
    Some(clamp_to_range(value, &values))
}

/// Keeps a mean inside `[min, max]` of its inputs against rounding drift.
fn clamp_to_range(value: f64, values: &[f64]) -> f64 {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    value.clamp(min, max)
}

/// `(max - min) / |reference|`, or 0.0 when the reference is zero or the input is empty.
///
/// A negative consensus divides by its absolute value so the spread is never negative.
pub fn relative_spread(values: &[f64], reference: f64) -> f64 {
    if values.is_empty() || reference == 0.0 {
        return 0.0;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (max - min) / reference.abs()
}
