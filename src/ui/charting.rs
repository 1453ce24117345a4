/// Reaction times as (hit number, ms) points for the results chart
pub fn reaction_series(times_ms: &[f64]) -> Vec<(f64, f64)> {
    times_ms
        .iter()
        .enumerate()
        .map(|(i, &ms)| ((i + 1) as f64, ms))
        .collect()
}

/// Compute X (hit count) and Y (slowest ms) bounds for the results chart
pub fn compute_chart_params(series: &[(f64, f64)]) -> (f64, f64) {
    let slowest = series.iter().map(|&(_, ms)| ms).fold(0.0, f64::max);

    let hits = match series.last() {
        Some(&(n, _)) => n.max(1.0),
        None => 1.0,
    };

    (hits, slowest.ceil())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
