//! Two-cluster split of similarity scores and the on-topic threshold derived from it.

const MAX_ITERATIONS: usize = 300;

/// Result of 1-D k-means with k = 2.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoMeans {
    pub centroids: [f64; 2],
    /// Cluster index (0 or 1) per input score.
    pub labels: Vec<usize>,
}

/// Lloyd iterations seeded at the minimum and maximum score.
///
/// `None` when there are fewer than two distinct scores.
#[must_use]
pub fn two_means(scores: &[f64]) -> Option<TwoMeans> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if scores.is_empty() || !(max > min) {
        return None;
    }

    let mut centroids = [min, max];
    let mut labels = vec![usize::MAX; scores.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (label, &s) in labels.iter_mut().zip(scores) {
            let nearest = usize::from((s - centroids[1]).abs() < (s - centroids[0]).abs());
            if *label != nearest {
                *label = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        for (k, centroid) in centroids.iter_mut().enumerate() {
            let (sum, count) = labels
                .iter()
                .zip(scores)
                .filter(|(l, _)| **l == k)
                .fold((0.0, 0usize), |(sum, n), (_, s)| (sum + s, n + 1));
            if count > 0 {
                *centroid = sum / count as f64;
            }
        }
    }

    Some(TwoMeans { centroids, labels })
}

/// Cut-off separating on-topic from off-topic utterances.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub value: f64,
    /// Lowest score inside the on-topic cluster.
    pub topic_min: f64,
    /// Highest score inside the off-topic cluster; `None` when everything
    /// landed in one cluster.
    pub off_topic_max: Option<f64>,
}

impl Threshold {
    #[must_use]
    pub fn is_on_topic(&self, score: f64) -> bool {
        score >= self.value
    }
}

/// Midpoint between the on-topic cluster's minimum and the off-topic
/// cluster's maximum. The on-topic cluster is the one with the larger centroid.
///
/// With fewer than two distinct scores every utterance is on-topic and the
/// threshold is that single score. `None` for empty input.
#[must_use]
pub fn relevance_threshold(scores: &[f64]) -> Option<Threshold> {
    let first = *scores.first()?;

    let Some(split) = two_means(scores) else {
        return Some(Threshold {
            value: first,
            topic_min: first,
            off_topic_max: None,
        });
    };

    let topic_cluster = usize::from(split.centroids[1] > split.centroids[0]);
    let mut topic_min = f64::INFINITY;
    let mut off_topic_max = f64::NEG_INFINITY;
    for (&label, &s) in split.labels.iter().zip(scores) {
        if label == topic_cluster {
            topic_min = topic_min.min(s);
        } else {
            off_topic_max = off_topic_max.max(s);
        }
    }

    if !off_topic_max.is_finite() {
        return Some(Threshold {
            value: topic_min,
            topic_min,
            off_topic_max: None,
        });
    }

    Some(Threshold {
        value: (topic_min + off_topic_max) / 2.0,
        topic_min,
        off_topic_max: Some(off_topic_max),
    })
}
