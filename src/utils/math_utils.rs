//! Small numerical helpers (casts, compensated sums, quadrature)
use kahan::KahanSum;

#[must_use]
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

#[must_use]
pub const fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}

/// Compensated (Kahan) sum of a sequence of values.
///
/// Used for total power and statistics over full propagation grids where a naive sum
/// accumulates a noticeable rounding error.
pub fn kahan_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = KahanSum::<f64>::new_with_value(0.0);
    for v in values {
        sum += v;
    }
    sum.sum()
}

/// Mean and (population) standard deviation of a sequence of values.
///
/// Returns `(0.0, 0.0)` for an empty sequence.
pub fn mean_and_std<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let values: Vec<f64> = values.into_iter().collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let count = usize_to_f64(values.len());
    let mean = kahan_sum(values.iter().copied()) / count;
    let variance = kahan_sum(values.iter().map(|v| (v - mean) * (v - mean))) / count;
    (mean, variance.sqrt())
}

/// Composite Simpson integration of `f` over `[start, end]` using `intervals` sub-intervals.
///
/// `intervals` is rounded up to the next even number.
pub fn simpson<F: Fn(f64) -> f64>(f: F, start: f64, end: f64, intervals: usize) -> f64 {
    let n = if intervals % 2 == 0 {
        intervals.max(2)
    } else {
        intervals + 1
    };
    let h = (end - start) / usize_to_f64(n);
    let mut sum = KahanSum::<f64>::new_with_value(f(start));
    sum += f(end);
    for i in 1..n {
        let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
        sum += weight * f(usize_to_f64(i).mul_add(h, start));
    }
    sum.sum() * h / 3.0
}
