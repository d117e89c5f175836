/// Quantiles reported for every route summary.
pub const SUMMARY_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Nearest-rank quantile over an ascending slice.
///
/// `rank = round(q * (n + 1))`, rounding halves away from zero, clamped to
/// `1..=n`. Returns `None` for an empty slice.
pub fn nearest_rank(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let rank = (q * (n as f64 + 1.0)).round();
    let rank = if rank < 1.0 { 1 } else { rank as usize };
    if rank > n {
        Some(sorted[n - 1])
    } else {
        Some(sorted[rank - 1])
    }
}

/// Summary of one route's durations: the fixed quantiles plus sum and count.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileSummary {
    /// `(q, value)` pairs in [`SUMMARY_QUANTILES`] order
    pub quantiles: Vec<(f64, f64)>,
    pub sum: f64,
    pub count: u64,
}

impl QuantileSummary {
    /// Build a summary from an ascending slice.
    /// Returns `None` if the slice holds no observations.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let quantiles = SUMMARY_QUANTILES
            .iter()
            .map(|&q| nearest_rank(sorted, q).map(|v| (q, v)))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            quantiles,
            sum: sorted.iter().sum(),
            count: sorted.len() as u64,
        })
    }
}
