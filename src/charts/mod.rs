//! PNG charts for analysis reports.
//!
//! Everything is drawn with `plotters` onto an in-memory RGB buffer and then
//! encoded with `image`, so rendering needs no filesystem access. Text is only
//! drawn once a font has been registered through [`fonts::register_font_file`].

pub mod bar;
pub mod fonts;
pub mod histogram;
pub mod pie;

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::errors::BotError;

pub use bar::{contribution_bars, relevance_bar};
pub use fonts::{font_available, register_font_file};
pub use histogram::similarity_histogram;
pub use pie::participation_pie;

pub const GOLD: RGBColor = RGBColor(255, 215, 0);
pub const LIGHT_SKY_BLUE: RGBColor = RGBColor(135, 206, 250);
pub const LIGHT_CORAL: RGBColor = RGBColor(240, 128, 128);
pub const YELLOW_GREEN: RGBColor = RGBColor(154, 205, 50);
pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);

pub(crate) type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

pub(crate) fn chart_error<E: std::fmt::Display>(error: E) -> BotError {
    BotError::ChartError(error.to_string())
}

/// Draw onto a white `width` x `height` canvas and return the PNG bytes.
pub(crate) fn render<F>(width: u32, height: u32, draw: F) -> Result<Vec<u8>, BotError>
where
    F: FnOnce(&Canvas<'_>) -> Result<(), BotError>,
{
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        draw(&root)?;
        root.present().map_err(chart_error)?;
    }
    encode_png(&buffer, width, height)
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, BotError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(chart_error)?;
    Ok(png)
}

/// Draw `text` anchored at `pos`. No-op without a registered font.
pub(crate) fn draw_text(
    canvas: &Canvas<'_>,
    text: &str,
    pos: (i32, i32),
    size: u32,
    anchor: (HPos, VPos),
) -> Result<(), BotError> {
    if !font_available() {
        return Ok(());
    }
    let style = TextStyle::from((fonts::FONT_FAMILY, size).into_font())
        .color(&BLACK)
        .pos(Pos::new(anchor.0, anchor.1));
    canvas
        .draw(&Text::new(text.to_string(), pos, style))
        .map_err(chart_error)
}

/// Left-aligned chart title in the top margin.
pub(crate) fn draw_title(canvas: &Canvas<'_>, title: &str) -> Result<(), BotError> {
    draw_text(canvas, title, (20, 12), 28, (HPos::Left, VPos::Top))
}

/// Legend of coloured squares in the top-right corner.
pub(crate) fn draw_legend(
    canvas: &Canvas<'_>,
    entries: &[(&str, RGBColor)],
) -> Result<(), BotError> {
    if !font_available() || entries.is_empty() {
        return Ok(());
    }
    let (width, _) = canvas.dim_in_pixel();
    let x = width as i32 - 190;
    for (i, (label, color)) in entries.iter().enumerate() {
        let y = 60 + i as i32 * 24;
        canvas
            .draw(&Rectangle::new([(x, y), (x + 16, y + 16)], color.filled()))
            .map_err(chart_error)?;
        draw_text(canvas, label, (x + 24, y + 8), 16, (HPos::Left, VPos::Center))?;
    }
    Ok(())
}
