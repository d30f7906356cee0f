//! Small numeric kernels shared by the engine's rolling operations.

/// Sum of a window, or `None` if any value in it is missing.
pub(crate) fn present_sum(window: &[Option<f64>]) -> Option<f64> {
    window.iter().try_fold(0.0, |acc, v| v.map(|x| acc + x))
}

/// True when every value equals the first. Compared exactly: a rounded
/// mean cannot be trusted to reproduce a flat series.
fn is_flat(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

/// Two-pass standard deviation of a fully-present window. A flat window is
/// exactly zero.
pub(crate) fn std_dev(window: &[Option<f64>], ddof: usize) -> Option<f64> {
    let n = window.len();
    if n <= ddof {
        return None;
    }
    let mean = present_sum(window)? / n as f64;
    if is_flat(window.iter().flatten().copied()) {
        return Some(0.0);
    }
    let sum_sq: f64 = window
        .iter()
        .flatten()
        .map(|x| (x - mean) * (x - mean))
        .sum();
    Some((sum_sq / (n - ddof) as f64).sqrt())
}

/// Pearson correlation over the positions where both columns have a value.
///
/// `None` when fewer than two positions overlap or either side is constant
/// over the overlap.
pub(crate) fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2
        || is_flat(pairs.iter().map(|(x, _)| *x))
        || is_flat(pairs.iter().map(|(_, y)| *y))
    {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
