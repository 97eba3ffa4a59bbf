//! Descriptive statistics over already-coerced values.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear-interpolated percentile of sorted data, `p` in `[0, 1]`.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return f64::NAN; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Distribution summary of one column. Missing values must already be
/// filtered out.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl SummaryStats {
    /// Row labels for [`SummaryStats::values`], in order. `count` is not
    /// part of the distribution table.
    pub const LABELS: [&'static str; 7] = ["mean", "std", "min", "25%", "50%", "75%", "max"];

    pub fn compute(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = mean_of(&sorted).unwrap_or(f64::NAN);
        // Sample standard deviation (n - 1)
        let std = if count < 2 {
            f64::NAN
        } else {
            // Deviations are scaled by the largest one so squaring cannot overflow.
            let scale = sorted.iter().map(|v| (v - mean).abs()).fold(0.0, f64::max);
            if scale == 0.0 || !scale.is_finite() {
                scale
            } else {
                let sum_sq = sorted.iter().map(|v| ((v - mean) / scale).powi(2)).sum::<f64>();
                scale * (sum_sq / (count - 1) as f64).sqrt()
            }
        };

        Self {
            count,
            mean,
            std,
            min: sorted.first().copied().unwrap_or(f64::NAN),
            q1: percentile(&sorted, 0.25),
            median: percentile(&sorted, 0.50),
            q3: percentile(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }

    pub fn values(&self) -> [f64; 7] {
        [self.mean, self.std, self.min, self.q1, self.median, self.q3, self.max]
    }
}
