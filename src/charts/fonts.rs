use once_cell::sync::OnceCell;
use plotters::style::{FontStyle, register_font};
use std::path::Path;
use tracing::info;

use crate::errors::BotError;

/// Family name every chart asks for.
pub const FONT_FAMILY: &str = "sans-serif";

static REGISTERED: OnceCell<()> = OnceCell::new();

/// Whether chart text can be drawn.
pub fn font_available() -> bool {
    REGISTERED.get().is_some()
}

/// Load a TTF/OTF file (Hangul-capable for Korean member names) and use it for
/// all chart text. Only the first successful registration takes effect.
pub fn register_font_file(path: impl AsRef<Path>) -> Result<(), BotError> {
    if font_available() {
        return Ok(());
    }
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        BotError::ChartError(format!("cannot read font {}: {}", path.display(), e))
    })?;
    register_font_bytes(bytes)?;
    info!("Registered chart font from {}", path.display());
    Ok(())
}

fn register_font_bytes(bytes: Vec<u8>) -> Result<(), BotError> {
    REGISTERED
        .get_or_try_init(|| {
            // plotters keeps a 'static reference; the font lives for the process.
            let data: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            register_font(FONT_FAMILY, FontStyle::Normal, data)
                .map_err(|_| BotError::ChartError("invalid font data".to_string()))
        })
        .map(|_| ())
}
