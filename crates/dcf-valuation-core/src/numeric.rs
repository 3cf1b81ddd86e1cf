//! Small numeric helpers shared by the valuation kernel.

/// Clamp a value into `[lo, hi]`.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Replace a non-finite value with a fallback.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Compute the percentile value from a **sorted** slice using linear
/// interpolation. `p` is in percent units (50.0 = median).
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n, not n-1).
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Cholesky-decompose a correlation matrix into its lower factor `L`.
///
/// If the matrix is asymmetric the identity is returned (uncorrelated
/// sampling). If it is not positive-definite, diagonal jitter is added in
/// increasing steps up to 1e-2 before falling back to the identity.
pub fn cholesky_with_jitter(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = matrix.len();
    if n == 0 || matrix.iter().any(|row| row.len() != n) || !is_symmetric(matrix) {
        return identity(n);
    }

    let mut jitter = 0.0;
    loop {
        if let Some(l) = try_cholesky(matrix, jitter) {
            return l;
        }
        jitter = if jitter == 0.0 { 1e-8 } else { jitter * 10.0 };
        if jitter > 1e-2 {
            return identity(n);
        }
    }
}

fn is_symmetric(matrix: &[Vec<f64>]) -> bool {
    let n = matrix.len();
    for i in 0..n {
        for j in 0..i {
            if (matrix[i][j] - matrix[j][i]).abs() > 1e-12 {
                return false;
            }
        }
    }
    true
}

fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

fn try_cholesky(matrix: &[Vec<f64>], jitter: f64) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let diag = matrix[i][i] + jitter - sum;
                if !diag.is_finite() || diag <= 0.0 {
                    return None;
                }
                l[i][j] = diag.sqrt();
            } else {
                if l[j][j] == 0.0 {
                    return None;
                }
                l[i][j] = (matrix[i][j] - sum) / l[j][j];
                if !l[i][j].is_finite() {
                    return None;
                }
            }
        }
    }
    Some(l)
}

/// Map a standard-normal draw `z` to a lognormal variate whose arithmetic
/// mean and standard deviation match the given moments.
///
/// Falls back to the plain normal transform when the target mean is not
/// strictly positive (the lognormal is undefined there).
pub fn lognormal_from_normal(z: f64, mean: f64, std_dev: f64) -> f64 {
    if mean <= 0.0 {
        return mean + std_dev * z;
    }
    let cv2 = (std_dev / mean).powi(2);
    let sigma = (1.0 + cv2).ln().sqrt();
    let mu = mean.ln() - sigma * sigma / 2.0;
    (mu + sigma * z).exp()
}
