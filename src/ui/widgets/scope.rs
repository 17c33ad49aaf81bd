// src/ui/widgets/scope.rs
//! Oscilloscope view of the newest samples in a channel buffer.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use crate::audio::MAX_AMPLITUDE;

/// Render `samples` as a line from -1 to 1 full scale.
pub fn render_scope(f: &mut Frame<'_>, area: Rect, title: &str, samples: &[i16]) {
    // Braille cells hold two dots across.
    let points = scope_points(samples, area.width.saturating_sub(2) as usize * 2);
    let x_max = points.last().map(|&(x, _)| x).unwrap_or(1.0);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(Axis::default().bounds([-1.0, 1.0]));

    f.render_widget(chart, area);
}

/// Pick up to `max_points` evenly spaced samples, normalized to -1..1.
pub fn scope_points(samples: &[i16], max_points: usize) -> Vec<(f64, f64)> {
    if samples.is_empty() || max_points == 0 {
        return Vec::new();
    }
    let step = samples.len().div_ceil(max_points);
    samples
        .iter()
        .enumerate()
        .step_by(step)
        .map(|(i, &s)| (i as f64, s as f64 / MAX_AMPLITUDE as f64))
        .collect()
}
