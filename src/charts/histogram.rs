use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, VPos};
use std::f64::consts::PI;

use super::{SKY_BLUE, chart_error, draw_text, draw_title, font_available, fonts::FONT_FAMILY, render};
use crate::errors::BotError;

pub const BINS: usize = 30;
const KDE_POINTS: usize = 200;
/// Dashes (plus equal gaps) along the threshold line.
const DASHES: f64 = 20.0;

/// Count of scores per equal-width bin over `[lo, hi]`; the last bin is closed.
#[must_use]
pub fn bin_counts(scores: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    let width = (hi - lo) / bins as f64;
    if bins == 0 || width <= 0.0 {
        return counts;
    }
    for &s in scores {
        let idx = ((s - lo) / width).floor();
        if idx < 0.0 {
            continue;
        }
        let idx = (idx as usize).min(bins - 1);
        if s <= hi {
            counts[idx] += 1;
        }
    }
    counts
}

/// Scott's rule bandwidth: sample std times n^(-1/5). `None` when degenerate.
#[must_use]
pub fn scott_bandwidth(scores: &[f64]) -> Option<f64> {
    let n = scores.len();
    if n < 2 {
        return None;
    }
    let mean = scores.iter().sum::<f64>() / n as f64;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let bw = var.sqrt() * (n as f64).powf(-0.2);
    (bw > 0.0).then_some(bw)
}

/// Gaussian kernel density estimate at `x`.
#[must_use]
pub fn gaussian_kde(scores: &[f64], bandwidth: f64, x: f64) -> f64 {
    let norm = 1.0 / ((2.0 * PI).sqrt() * bandwidth * scores.len() as f64);
    scores
        .iter()
        .map(|s| (-0.5 * ((x - s) / bandwidth).powi(2)).exp())
        .sum::<f64>()
        * norm
}

/// Histogram of similarity scores with a density curve scaled to counts and
/// a dashed red line at the threshold.
pub fn similarity_histogram(scores: &[f64], threshold: f64) -> Result<Vec<u8>, BotError> {
    if scores.is_empty() {
        return Err(BotError::ChartError("no similarity scores to plot".to_string()));
    }

    let mut lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi - lo < f64::EPSILON {
        lo -= 0.05;
        hi += 0.05;
    }
    let bin_width = (hi - lo) / BINS as f64;
    let counts = bin_counts(scores, lo, hi, BINS);

    let curve: Vec<(f64, f64)> = scott_bandwidth(scores)
        .map(|bw| {
            (0..=KDE_POINTS)
                .map(|i| {
                    let x = lo + (hi - lo) * i as f64 / KDE_POINTS as f64;
                    (x, gaussian_kde(scores, bw, x) * scores.len() as f64 * bin_width)
                })
                .collect()
        })
        .unwrap_or_default();

    let peak = counts
        .iter()
        .map(|&c| c as f64)
        .chain(curve.iter().map(|p| p.1))
        .fold(1.0, f64::max);
    let y_max = peak * 1.1;
    let x_range = lo.min(threshold) - bin_width..hi.max(threshold) + bin_width;

    render(1000, 600, |canvas| {
        draw_title(canvas, "Similarity score distribution")?;

        let mut chart = ChartBuilder::on(canvas)
            .margin_top(60)
            .margin_right(20)
            .margin_left(20)
            .margin_bottom(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range.clone(), 0f64..y_max)
            .map_err(chart_error)?;

        if font_available() {
            chart
                .configure_mesh()
                .x_desc("Similarity score")
                .y_desc("Count")
                .label_style((FONT_FAMILY, 14))
                .draw()
                .map_err(chart_error)?;
        }

        chart
            .draw_series(counts.iter().enumerate().filter(|(_, c)| **c > 0).map(|(i, &c)| {
                let x0 = lo + bin_width * i as f64;
                Rectangle::new([(x0, 0.0), (x0 + bin_width, c as f64)], SKY_BLUE.filled())
            }))
            .map_err(chart_error)?;
        chart
            .draw_series(counts.iter().enumerate().filter(|(_, c)| **c > 0).map(|(i, &c)| {
                let x0 = lo + bin_width * i as f64;
                Rectangle::new([(x0, 0.0), (x0 + bin_width, c as f64)], WHITE.stroke_width(1))
            }))
            .map_err(chart_error)?;

        if !curve.is_empty() {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    curve.clone(),
                    SKY_BLUE.mix(0.9).stroke_width(3),
                )))
                .map_err(chart_error)?;
        }

        let dash = y_max / (2.0 * DASHES);
        let mut segments = Vec::new();
        let mut y = 0.0;
        while y < y_max {
            segments.push(PathElement::new(
                vec![(threshold, y), (threshold, (y + dash).min(y_max))],
                RED.stroke_width(2),
            ));
            y += dash * 2.0;
        }
        chart.draw_series(segments).map_err(chart_error)?;

        let (x, y) = chart.backend_coord(&(threshold, y_max));
        draw_text(
            canvas,
            &format!("Threshold ({threshold:.2})"),
            (x + 6, y + 4),
            14,
            (HPos::Left, VPos::Top),
        )
    })
}
