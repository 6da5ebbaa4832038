//! Small statistics over indicator series.

/// Last `n` defined values of a series, oldest first.
fn last_defined(values: &[Option<f64>], n: usize) -> Vec<f64> {
    let mut tail: Vec<f64> = values.iter().rev().flatten().take(n).copied().collect();
    tail.reverse();
    tail
}

/// Least-squares slope over the last `n` defined values (x = 0, 1, ...).
///
/// Returns 0.0 with fewer than two points.
pub fn linreg_slope(values: &[Option<f64>], n: usize) -> f64 {
    let ys = last_defined(values, n);
    let m = ys.len();
    if m < 2 {
        return 0.0;
    }
    let mf = m as f64;
    let mean_x = (mf - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / mf;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Number of rises among the last `steps` steps of defined values.
pub fn rises_in_last(values: &[Option<f64>], steps: usize) -> usize {
    let tail = last_defined(values, steps + 1);
    tail.windows(2).filter(|w| w[1] > w[0]).count()
}

/// Indices of the last two swing highs in `values[from..]`.
///
/// A swing high is `v[i] > v[i-1] && v[i] >= v[i+1]`. With fewer than two
/// pivots, falls back to the indices of the two largest values. Indices are
/// absolute and returned in ascending order.
pub fn last_two_swing_highs(values: &[f64], from: usize) -> Option<(usize, usize)> {
    let n = values.len();
    if from >= n || n - from < 2 {
        return None;
    }

    let pivots: Vec<usize> = ((from + 1)..n.saturating_sub(1))
        .filter(|&i| values[i] > values[i - 1] && values[i] >= values[i + 1])
        .collect();
    if let [.., a, b] = pivots[..] {
        return Some((a, b));
    }

    let mut idx: Vec<usize> = (from..n).collect();
    idx.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    let (a, b) = (idx[0], idx[1]);
    Some((a.min(b), a.max(b)))
}
