use image::imageops::FilterType;
use image::{DynamicImage, Rgba};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::config::{ImageProtocol, ImageSettings};
use crate::error::{RemGitError, Result};

const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// An image rendered into terminal cells, ready to splice into a document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArt {
    pub lines: Vec<Line<'static>>,
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(RemGitError::Decode("empty payload".to_string()));
    }
    image::load_from_memory(bytes).map_err(|e| RemGitError::Decode(e.to_string()))
}

pub fn decode_and_render(bytes: &[u8], settings: &ImageSettings) -> Result<RenderedArt> {
    let img = decode(bytes)?;
    render(&img, settings)
}

/// Scale the image into `width` x `height` cells. Each cell covers one pixel
/// column and two pixel rows, which keeps the aspect ratio roughly square.
pub fn render(img: &DynamicImage, settings: &ImageSettings) -> Result<RenderedArt> {
    let width = u32::from(settings.width);
    let height = u32::from(settings.height) * 2;
    if width == 0 || height == 0 {
        return Err(RemGitError::Render("zero sized target".to_string()));
    }

    let scaled = img.resize(width, height, FilterType::Triangle).to_rgba8();
    let (w, h) = scaled.dimensions();
    if w == 0 || h == 0 {
        return Err(RemGitError::Render(format!(
            "image {}x{} scaled to nothing",
            img.width(),
            img.height()
        )));
    }

    let transparent = Rgba([0, 0, 0, 0]);
    let mut lines = Vec::with_capacity(h.div_ceil(2) as usize);

    for y in (0..h).step_by(2) {
        let spans: Vec<Span<'static>> = (0..w)
            .map(|x| {
                let top = *scaled.get_pixel(x, y);
                let bottom = if y + 1 < h {
                    *scaled.get_pixel(x, y + 1)
                } else {
                    transparent
                };
                match settings.protocol {
                    ImageProtocol::Halfblocks => halfblock(top, bottom),
                    ImageProtocol::Ascii => ascii(top, bottom),
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    Ok(RenderedArt { lines })
}

fn visible(px: Rgba<u8>) -> bool {
    px[3] >= 128
}

fn rgb(px: Rgba<u8>) -> Color {
    Color::Rgb(px[0], px[1], px[2])
}

fn halfblock(top: Rgba<u8>, bottom: Rgba<u8>) -> Span<'static> {
    match (visible(top), visible(bottom)) {
        (false, false) => Span::raw(" "),
        (true, false) => Span::styled("▀", Style::default().fg(rgb(top))),
        (false, true) => Span::styled("▄", Style::default().fg(rgb(bottom))),
        (true, true) => Span::styled("▀", Style::default().fg(rgb(top)).bg(rgb(bottom))),
    }
}

fn luminance(px: Rgba<u8>) -> u32 {
    (299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2])) / 1000
}

fn ascii(top: Rgba<u8>, bottom: Rgba<u8>) -> Span<'static> {
    let samples: Vec<u32> = [top, bottom]
        .into_iter()
        .filter(|px| visible(*px))
        .map(luminance)
        .collect();
    if samples.is_empty() {
        return Span::raw(" ");
    }
    let lum = samples.iter().sum::<u32>() / samples.len() as u32;
    let idx = (lum as usize * (ASCII_RAMP.len() - 1)) / 255;
    Span::raw((ASCII_RAMP[idx] as char).to_string())
}
