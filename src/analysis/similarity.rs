//! Vector similarity and descriptive statistics over similarity scores.

/// Cosine similarity of two vectors; 0 when either has zero length or norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }

    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for i in 0..n {
        let (x, y) = (f64::from(a[i]), f64::from(b[i]));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }

    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}

/// Percentiles reported alongside the basic statistics.
pub const REPORTED_PERCENTILES: [f64; 5] = [25.0, 50.0, 75.0, 90.0, 95.0];

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityStatistics {
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// `(percentile, value)` pairs for [`REPORTED_PERCENTILES`].
    pub percentiles: Vec<(f64, f64)>,
}

impl SimilarityStatistics {
    /// `None` for an empty slice.
    #[must_use]
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            max: sorted[sorted.len() - 1],
            min: sorted[0],
            mean,
            median: percentile(&sorted, 50.0),
            std_dev: variance.sqrt(),
            percentiles: REPORTED_PERCENTILES
                .iter()
                .map(|&p| (p, percentile(&sorted, p)))
                .collect(),
        })
    }
}

/// Percentile of an ascending slice using linear interpolation between
/// closest ranks.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        len => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (len - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_statistics_match_linear_interpolation() {
        let stats = SimilarityStatistics::from_scores(&[0.4, 0.1, 0.3, 0.2]).unwrap();
        assert!((stats.max - 0.4).abs() < 1e-12);
        assert!((stats.min - 0.1).abs() < 1e-12);
        assert!((stats.mean - 0.25).abs() < 1e-12);
        assert!((stats.median - 0.25).abs() < 1e-12);
        // population std of [0.1, 0.2, 0.3, 0.4]
        assert!((stats.std_dev - 0.0125f64.sqrt()).abs() < 1e-9);
        // 25th percentile: rank 0.75 between 0.1 and 0.2
        assert!((stats.percentiles[0].1 - 0.175).abs() < 1e-12);
        assert_eq!(stats.percentiles.len(), 5);
    }

    #[test]
    fn test_statistics_single_and_empty() {
        let stats = SimilarityStatistics::from_scores(&[0.7]).unwrap();
        assert_eq!(stats.median, 0.7);
        assert_eq!(stats.std_dev, 0.0);
        assert!(SimilarityStatistics::from_scores(&[]).is_none());
    }
}
