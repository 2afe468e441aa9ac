//! Goodness-of-fit statistics

use ndarray::ArrayView1;

/// Coefficient of determination as the squared Pearson correlation of `a` and `b`.
///
/// Returns 0 when either series has zero variance, or when the lengths differ
/// or are below two.
pub fn r_squared(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let n = a.len();
    if n < 2 || n != b.len() {
        return 0.0;
    }
    let mean_a = a.sum() / n as f64;
    let mean_b = b.sum() / n as f64;

    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }

    if saa <= 0.0 || sbb <= 0.0 {
        return 0.0;
    }
    let r = sab / (saa.sqrt() * sbb.sqrt());
    if r.is_finite() {
        (r * r).min(1.0)
    } else {
        0.0
    }
}
