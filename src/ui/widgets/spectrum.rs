// src/ui/widgets/spectrum.rs
//! Spectrum bars with gravity fall-off.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Bar width in characters
const BAR_WIDTH: usize = 2;
/// Gap between bars
const BAR_GAP: usize = 1;
/// Block characters for smooth gradation
const CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Bar heights in 0..=1 that jump up to new peaks and fall under gravity.
#[derive(Debug, Clone, Default)]
pub struct SpectrumBars {
    heights: Vec<f32>,
    velocities: Vec<f32>,
}

impl SpectrumBars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Fold `db` into `count` bars and advance the fall-off by `dt` seconds.
    ///
    /// Each bar takes the loudest bin of its slice, mapped linearly from
    /// `min_db..max_db` to `0..1`. `gravity` is in bar heights per second squared.
    pub fn update(&mut self, db: &[f32], count: usize, min_db: f32, max_db: f32, gravity: f32, dt: f32) {
        let count = count.min(db.len());
        if self.heights.len() != count {
            self.heights = vec![0.0; count];
            self.velocities = vec![0.0; count];
        }

        let range = (max_db - min_db).max(f32::EPSILON);
        for i in 0..count {
            let slice = &db[i * db.len() / count..(i + 1) * db.len() / count];
            let peak = slice.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let target = ((peak - min_db) / range).clamp(0.0, 1.0);

            if target >= self.heights[i] {
                self.heights[i] = target;
                self.velocities[i] = 0.0;
            } else {
                self.velocities[i] += gravity * dt;
                self.heights[i] = (self.heights[i] - self.velocities[i] * dt).max(target);
            }
        }
    }
}

/// Number of bars that fit in a panel of `width` cells (inside the border).
pub fn bar_count(width: u16) -> usize {
    let inner = width.saturating_sub(2) as usize;
    (inner + BAR_GAP) / (BAR_WIDTH + BAR_GAP)
}

/// Render the bars, left to right from low to high frequency.
pub fn render_spectrum(f: &mut Frame<'_>, area: Rect, title: &str, bars: &SpectrumBars) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let height = inner.height as usize;
    let mut content = String::with_capacity((inner.width as usize + 1) * height);
    for row in 0..height {
        let mut line = String::with_capacity(inner.width as usize);
        for (i, &h) in bars.heights().iter().enumerate() {
            if i > 0 {
                line.extend(std::iter::repeat_n(' ', BAR_GAP));
            }
            let c = char_for_row(h, row, height);
            line.extend(std::iter::repeat_n(c, BAR_WIDTH));
        }
        content.push_str(&line);
        if row + 1 < height {
            content.push('\n');
        }
    }

    // One widget for the whole panel so stale cells are cleared.
    let paragraph = Paragraph::new(content).style(Style::default().fg(Color::Cyan));
    f.render_widget(paragraph, inner);
}

/// Character drawn at `row` (0 = top) of a bar filled to `height_ratio`.
fn char_for_row(height_ratio: f32, row: usize, height: usize) -> char {
    let filled = height_ratio * height as f32;
    let row_from_bottom = height - row - 1;
    let full_rows = filled as usize;

    if row_from_bottom < full_rows {
        '█'
    } else if row_from_bottom == full_rows {
        let fraction = filled - full_rows as f32;
        let idx = (fraction * CHARS.len() as f32) as usize;
        if idx == 0 {
            if row_from_bottom == 0 { CHARS[0] } else { ' ' }
        } else {
            CHARS[idx.min(CHARS.len()) - 1]
        }
    } else {
        ' '
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_jump_up_and_fall_slowly() {
        let mut bars = SpectrumBars::new();
        bars.update(&[-5.0, -5.0], 2, -60.0, -5.0, 8.0, 0.016);
        assert_eq!(bars.heights(), &[1.0, 1.0]);

        bars.update(&[-60.0, -5.0], 2, -60.0, -5.0, 8.0, 0.016);
        let fallen = bars.heights()[0];
        assert!(fallen < 1.0 && fallen > 0.9);
        assert_eq!(bars.heights()[1], 1.0);

        // Keeps accelerating until it reaches the floor.
        for _ in 0..100 {
            bars.update(&[-60.0, -5.0], 2, -60.0, -5.0, 8.0, 0.016);
        }
        assert_eq!(bars.heights()[0], 0.0);
    }

    #[test]
    fn test_bars_take_loudest_bin_of_slice() {
        let mut bars = SpectrumBars::new();
        let db = [-60.0, -20.0, -60.0, -60.0];
        bars.update(&db, 2, -60.0, 0.0, 8.0, 0.016);
        assert!((bars.heights()[0] - 40.0 / 60.0).abs() < 1e-6);
        assert_eq!(bars.heights()[1], 0.0);
    }

    #[test]
    fn test_bar_count_is_limited_by_bins() {
        let mut bars = SpectrumBars::new();
        bars.update(&[-10.0; 3], 40, -60.0, -5.0, 8.0, 0.016);
        assert_eq!(bars.heights().len(), 3);
        assert_eq!(bar_count(2), 0);
        assert_eq!(bar_count(10), 3);
    }

    #[test]
    fn test_char_for_row() {
        assert_eq!(char_for_row(1.0, 0, 4), '█');
        assert_eq!(char_for_row(0.0, 3, 4), '▁');
        assert_eq!(char_for_row(0.0, 0, 4), ' ');
        assert_eq!(char_for_row(0.5, 3, 4), '█');
        assert_eq!(char_for_row(0.5, 1, 4), ' ');
    }
}
