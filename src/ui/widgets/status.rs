// src/ui/widgets/status.rs
//! Status panel: source state, pipeline settings and per-channel levels.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::app::Pipeline;

/// Render the status panel.
pub fn render_status(f: &mut Frame<'_>, area: Rect, pipeline: &Pipeline, measured_fps: f32) {
    f.render_widget(Block::default().borders(Borders::ALL).title("1: Status"), area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let config = pipeline.config();
    let state = if pipeline.is_streaming() {
        Span::styled("streaming", Style::default().fg(Color::Green))
    } else if let Some(err) = pipeline.last_error() {
        Span::styled(format!("no input: {err}"), Style::default().fg(Color::Red))
    } else {
        Span::styled("stopped", Style::default().fg(Color::Yellow))
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", config.input.source.name()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        state,
        Span::raw(format!(
            "  | fft {} | {} ms | {:.0}/{} fps ",
            config.fft.size, config.duration_ms, measured_fps, config.fps
        )),
    ]);
    f.render_widget(Paragraph::new(line), inner[0]);

    // One level meter per channel, side by side
    let count = pipeline.channel_count().max(1) as u32;
    let meters = Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..count).map(|_| Constraint::Ratio(1, count)))
        .split(inner[1]);

    for (channel, &meter) in meters.iter().enumerate().take(pipeline.channel_count()) {
        let level = pipeline.level(channel).unwrap_or(0.0);
        let label = match pipeline.dominant_frequency(channel) {
            Some(freq) => format!("{} {:>5.0} Hz", channel_name(channel, count), freq),
            None => channel_name(channel, count).to_string(),
        };
        f.render_widget(
            Gauge::default()
                .gauge_style(Style::default().fg(Color::Magenta))
                .ratio(f64::from(level).clamp(0.0, 1.0))
                .label(label),
            meter,
        );
    }
}

/// Display name of `channel` in a layout of `count` channels.
pub fn channel_name(channel: usize, count: u32) -> &'static str {
    match (count, channel) {
        (1, _) => "mono",
        (_, 0) => "left",
        _ => "right",
    }
}
