use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, VPos};

use super::{
    Canvas, GOLD, LIGHT_CORAL, LIGHT_SKY_BLUE, YELLOW_GREEN, chart_error, draw_legend, draw_text,
    draw_title, font_available, fonts::FONT_FAMILY, render,
};
use crate::analysis::contribution::{CRITERIA, ContributionReport};
use crate::analysis::topic::TopicRelevanceReport;
use crate::errors::BotError;

const RATIO_COLORS: [RGBColor; 3] = [GOLD, LIGHT_CORAL, LIGHT_SKY_BLUE];
const CRITERIA_COLORS: [RGBColor; 4] = [YELLOW_GREEN, GOLD, LIGHT_SKY_BLUE, LIGHT_CORAL];
/// Width of one criterion bar in group units.
const WIDTH: f64 = 0.2;

type BarChart<'c, 'b> =
    ChartContext<'c, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Per-group bars in one cartesian chart with the group names under the x axis.
struct BarLayout<'a> {
    title: &'a str,
    y_desc: &'a str,
    groups: Vec<&'a str>,
    y_max: f64,
}

impl BarLayout<'_> {
    /// Draws the frame and returns the chart for the caller's series.
    fn draw<'c, 'b>(&self, canvas: &'c Canvas<'b>) -> Result<BarChart<'c, 'b>, BotError> {
        draw_title(canvas, self.title)?;

        let mut chart = ChartBuilder::on(canvas)
            .margin_top(60)
            .margin_right(if font_available() { 200 } else { 20 })
            .margin_left(20)
            .margin_bottom(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..self.groups.len() as f64, 0f64..self.y_max)
            .map_err(chart_error)?;

        if font_available() {
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(0)
                .y_labels(6)
                .y_desc(self.y_desc)
                .label_style((FONT_FAMILY, 14))
                .draw()
                .map_err(chart_error)?;

            for (i, name) in self.groups.iter().enumerate() {
                let (x, y) = chart.backend_coord(&(i as f64 + 0.5, 0.0));
                draw_text(canvas, name, (x, y + 18), 16, (HPos::Center, VPos::Center))?;
            }
        }

        Ok(chart)
    }
}

/// On-topic ratio per member, in report order.
pub fn relevance_bar(report: &TopicRelevanceReport) -> Result<Vec<u8>, BotError> {
    if report.users.is_empty() {
        return Err(BotError::ChartError("no members to plot".to_string()));
    }

    let layout = BarLayout {
        title: "On-topic message ratio",
        y_desc: "Ratio",
        groups: report.users.iter().map(|u| u.username.as_str()).collect(),
        y_max: 1.05,
    };

    render(800, 600, |canvas| {
        let mut chart = layout.draw(canvas)?;
        chart
            .draw_series(report.users.iter().enumerate().map(|(i, user)| {
                let x = i as f64;
                Rectangle::new(
                    [(x + 0.15, 0.0), (x + 0.85, user.ratio)],
                    RATIO_COLORS[i % RATIO_COLORS.len()].filled(),
                )
            }))
            .map_err(chart_error)?;
        Ok(())
    })
}

/// Four grouped bars per member, one per contribution criterion.
pub fn contribution_bars(report: &ContributionReport) -> Result<Vec<u8>, BotError> {
    if report.is_empty() {
        return Err(BotError::ChartError("no members to plot".to_string()));
    }

    let top = report
        .members
        .iter()
        .flat_map(|m| m.totals.as_array())
        .max()
        .unwrap_or(0)
        .max(1);

    let layout = BarLayout {
        title: "Meeting contribution per member",
        y_desc: "Score total",
        groups: report.members.iter().map(|m| m.username.as_str()).collect(),
        y_max: f64::from(top) * 1.1,
    };

    render(1200, 600, |canvas| {
        let mut chart = layout.draw(canvas)?;

        for (k, color) in CRITERIA_COLORS.iter().enumerate() {
            chart
                .draw_series(report.members.iter().enumerate().map(|(i, member)| {
                    // Bars centred on the group: offsets -1.5w, -0.5w, 0.5w, 1.5w.
                    let left = i as f64 + 0.5 + (k as f64 - 2.0) * WIDTH;
                    let value = f64::from(member.totals.as_array()[k]);
                    Rectangle::new([(left, 0.0), (left + WIDTH, value)], color.filled())
                }))
                .map_err(chart_error)?;
        }

        let legend: Vec<(&str, RGBColor)> = CRITERIA.iter().copied().zip(CRITERIA_COLORS).collect();
        draw_legend(canvas, &legend)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::clustering::Threshold;
    use crate::analysis::contribution::{CriterionTotals, MemberContribution};
    use crate::analysis::similarity::SimilarityStatistics;
    use crate::analysis::topic::UserRelevance;
    use crate::charts::test_support::is_png;

    fn topic_report(users: Vec<UserRelevance>) -> TopicRelevanceReport {
        TopicRelevanceReport {
            topic: "Budget".into(),
            scores: vec![0.2, 0.8],
            statistics: SimilarityStatistics::from_scores(&[0.2, 0.8]).unwrap(),
            threshold: Threshold {
                value: 0.5,
                topic_min: 0.8,
                off_topic_max: Some(0.2),
            },
            users,
        }
    }

    #[test]
    fn test_relevance_bar_renders() {
        let report = topic_report(vec![
            UserRelevance {
                user_id: "U1".into(),
                username: "alice".into(),
                high_similarity_count: 1,
                message_count: 1,
                ratio: 1.0,
            },
            UserRelevance {
                user_id: "U2".into(),
                username: "bob".into(),
                high_similarity_count: 0,
                message_count: 1,
                ratio: 0.0,
            },
        ]);
        assert!(is_png(&relevance_bar(&report).unwrap()));
        assert!(relevance_bar(&topic_report(vec![])).is_err());
    }

    #[test]
    fn test_contribution_bars_render() {
        let report = ContributionReport {
            members: vec![MemberContribution {
                user_id: "U1".into(),
                username: "alice".into(),
                totals: CriterionTotals {
                    discussion: 5,
                    direction: 4,
                    goal: 3,
                    collaboration: 2,
                },
            }],
            team: CriterionTotals::default(),
            evaluated: 1,
            skipped: 0,
        };
        assert!(is_png(&contribution_bars(&report).unwrap()));

        let empty = ContributionReport {
            members: vec![],
            team: CriterionTotals::default(),
            evaluated: 0,
            skipped: 0,
        };
        assert!(matches!(contribution_bars(&empty), Err(BotError::ChartError(_))));
    }
}
