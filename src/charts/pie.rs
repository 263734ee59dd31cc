use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, VPos};
use std::f64::consts::PI;

use super::{GOLD, LIGHT_CORAL, LIGHT_SKY_BLUE, chart_error, draw_legend, draw_text, draw_title, render};
use crate::analysis::participation::ParticipationReport;
use crate::errors::BotError;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const RADIUS: f64 = 200.0;
/// Radial offset of the largest slice, as a fraction of the radius.
const EXPLODE: f64 = 0.1;
const PALETTE: [RGBColor; 3] = [GOLD, LIGHT_SKY_BLUE, LIGHT_CORAL];

/// Point at `angle` radians clockwise from twelve o'clock.
fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.sin()).round() as i32,
        (center.1 - radius * angle.cos()).round() as i32,
    )
}

/// Share of each member as a pie, largest slice first and pulled out.
///
/// Slices run clockwise from twelve o'clock. Members with a zero value get no
/// slice but still appear in the legend.
pub fn participation_pie(report: &ParticipationReport) -> Result<Vec<u8>, BotError> {
    if report.is_empty() || report.total == 0 {
        return Err(BotError::ChartError(
            "no participation to plot".to_string(),
        ));
    }

    render(WIDTH, HEIGHT, |canvas| {
        draw_title(canvas, report.metric.title())?;

        let center = (f64::from(WIDTH) / 2.0 - 60.0, f64::from(HEIGHT) / 2.0 + 20.0);
        let total = report.total as f64;
        let mut start = 0.0f64;

        for (i, entry) in report.entries.iter().enumerate() {
            if entry.value == 0 {
                continue;
            }
            let sweep = entry.value as f64 / total * 2.0 * PI;
            let mid = start + sweep / 2.0;
            let offset = if i == 0 { EXPLODE * RADIUS } else { 0.0 };
            let origin = (
                center.0 + offset * mid.sin(),
                center.1 - offset * mid.cos(),
            );
            let color = PALETTE[i % PALETTE.len()];

            let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;
            let mut points = Vec::with_capacity(steps + 2);
            points.push((origin.0.round() as i32, origin.1.round() as i32));
            for s in 0..=steps {
                points.push(polar(origin, RADIUS, start + sweep * s as f64 / steps as f64));
            }

            canvas
                .draw(&Polygon::new(points.clone(), color.filled()))
                .map_err(chart_error)?;
            canvas
                .draw(&PathElement::new(points, WHITE.stroke_width(2)))
                .map_err(chart_error)?;

            let label = format!("{:.1}%\n({})", entry.percentage, entry.value);
            for (line_no, line) in label.lines().enumerate() {
                let (x, y) = polar(origin, RADIUS * 0.6, mid);
                draw_text(canvas, line, (x, y + line_no as i32 * 18 - 9), 16, (HPos::Center, VPos::Center))?;
            }
            let (x, y) = polar(origin, RADIUS * 1.12, mid);
            draw_text(canvas, &entry.username, (x, y), 16, (HPos::Center, VPos::Center))?;

            start += sweep;
        }

        let legend: Vec<(&str, RGBColor)> = report
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.username.as_str(), PALETTE[i % PALETTE.len()]))
            .collect();
        draw_legend(canvas, &legend)
    })
}
