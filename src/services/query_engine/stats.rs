//! Descriptive statistics over columns with missing values.
//!
//! Missing cells are skipped. Empty inputs give `NaN` (sum gives 0).

use std::cmp::Ordering;
use std::ops::Range;

pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

pub fn count(values: &[Option<f64>]) -> usize {
    values.iter().flatten().count()
}

pub fn sum(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

pub fn mean(values: &[Option<f64>]) -> f64 {
    let n = count(values);
    if n == 0 {
        f64::NAN
    } else {
        sum(values) / n as f64
    }
}

pub fn median(values: &[Option<f64>]) -> f64 {
    let mut data = present(values);
    if data.is_empty() {
        return f64::NAN;
    }
    data.sort_by(f64::total_cmp);
    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[Option<f64>]) -> f64 {
    let data = present(values);
    if data.len() < 2 {
        return f64::NAN;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    let variance =
        data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

pub fn min(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().copied().reduce(f64::min).unwrap_or(f64::NAN)
}

pub fn max(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().copied().reduce(f64::max).unwrap_or(f64::NAN)
}

/// Pearson correlation over the rows where both sides are present.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        f64::NAN
    } else {
        (cov / denominator).clamp(-1.0, 1.0)
    }
}

/// Descending order with `NaN` placed last.
pub fn cmp_desc_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Ascending copy of a column with missing cells moved to the end.
pub fn sorted_missing_last(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

/// Splits `len` rows into `bins` contiguous ranges of `len / bins` rows; the
/// last range absorbs the remainder.
pub fn bin_ranges(len: usize, bins: usize) -> Vec<Range<usize>> {
    if bins == 0 {
        return Vec::new();
    }
    let size = len / bins;
    (0..bins)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 < bins { start + size } else { len };
            start..end
        })
        .collect()
}

/// Two-decimal rendering; NaN prints as `nan` to match missing-cell labels.
pub fn fmt2(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.2}", value)
    }
}
