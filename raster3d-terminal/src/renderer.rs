/// Terminal output of rendered frames
use crossterm::{
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal, QueueableCommand,
};
use image::{Rgb, RgbImage};
use std::io::{self, Write};

/// Upper half block: foreground paints the top pixel, background the bottom
const HALF_BLOCK: char = '▀';

/// Prints an RGB image as 24-bit coloured half-block cells, two pixel rows
/// per terminal row
pub struct TerminalPainter {
    columns: usize,
    rows: usize,
}

impl TerminalPainter {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }

    /// Fit to the current terminal, keeping the last row for the prompt
    pub fn from_terminal() -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        Ok(Self::new(columns as usize, (rows as usize).saturating_sub(1)))
    }

    /// Pixels per cell side so that `image` fits the cell grid
    fn step(&self, image: &RgbImage) -> usize {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let across = width.div_ceil(self.columns);
        let down = height.div_ceil(self.rows * 2);
        across.max(down).max(1)
    }

    pub fn draw<W: Write>(&self, image: &RgbImage, writer: &mut W) -> io::Result<()> {
        let step = self.step(image);
        let (width, height) = (image.width() as usize, image.height() as usize);
        let columns = width / step;
        let rows = height / (2 * step);

        for row in 0..rows {
            let top = row * 2 * step;
            let bottom = top + step;
            for column in 0..columns {
                let x = (column * step) as u32;
                let Rgb([r, g, b]) = *image.get_pixel(x, top as u32);
                writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                let Rgb([r, g, b]) = *image.get_pixel(x, bottom as u32);
                writer.queue(SetBackgroundColor(Color::Rgb { r, g, b }))?;
                writer.queue(Print(HALF_BLOCK))?;
            }
            writer.queue(ResetColor)?;
            writer.queue(Print('\n'))?;
        }
        writer.queue(ResetColor)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(output: &[u8]) -> usize {
        String::from_utf8_lossy(output)
            .chars()
            .filter(|c| *c == HALF_BLOCK)
            .count()
    }

    #[test]
    fn test_draws_two_pixel_rows_per_line() {
        let image = RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]));
        let mut out = Vec::new();
        TerminalPainter::new(80, 24).draw(&image, &mut out).unwrap();
        assert_eq!(cells(&out), 8 * 3);
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches('\n').count(), 3);
    }

    #[test]
    fn test_downsamples_to_fit() {
        let image = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        let mut out = Vec::new();
        TerminalPainter::new(50, 10).draw(&image, &mut out).unwrap();
        // 5 pixels per cell side: 40 columns by 10 rows
        assert_eq!(cells(&out), 40 * 10);
    }
}
