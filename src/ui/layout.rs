// src/ui/layout.rs
//! Layout computation for the UI panels.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Visibility state for UI sections.
#[derive(Debug, Clone, Copy)]
pub struct SectionVisibility {
    pub status: bool,
    pub spectrum: bool,
    pub scope: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            status: true,
            spectrum: true,
            scope: true,
        }
    }
}

impl SectionVisibility {
    /// Toggle a section by number (1-3).
    pub fn toggle(&mut self, section: usize) {
        match section {
            1 => self.status = !self.status,
            2 => self.spectrum = !self.spectrum,
            3 => self.scope = !self.scope,
            _ => {}
        }
    }
}

/// Areas of one channel's row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelAreas {
    pub spectrum: Option<Rect>,
    pub scope: Option<Rect>,
}

/// Computed layout areas for rendering.
pub struct ComputedLayout {
    /// Status panel at the top (if visible)
    pub status_area: Option<Rect>,
    /// One entry per channel, top to bottom
    pub channels: Vec<ChannelAreas>,
}

/// Compute the layout for `channels` stacked rows below an optional status panel.
pub fn compute_layout(area: Rect, channels: usize, visibility: &SectionVisibility) -> ComputedLayout {
    let (status_area, body) = if visibility.status {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(area);
        (Some(chunks[0]), chunks[1])
    } else {
        (None, area)
    };

    let rows = channels.max(1) as u32;
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints((0..rows).map(|_| Constraint::Ratio(1, rows)))
        .split(body);

    let channels = row_areas
        .iter()
        .take(channels)
        .map(|&row| match (visibility.spectrum, visibility.scope) {
            (true, true) => {
                // Spectrum gets the larger share of the row.
                let halves = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                    .split(row);
                ChannelAreas {
                    spectrum: Some(halves[0]),
                    scope: Some(halves[1]),
                }
            }
            (true, false) => ChannelAreas {
                spectrum: Some(row),
                scope: None,
            },
            (false, true) => ChannelAreas {
                spectrum: None,
                scope: Some(row),
            },
            (false, false) => ChannelAreas {
                spectrum: None,
                scope: None,
            },
        })
        .collect();

    ComputedLayout {
        status_area,
        channels,
    }
}
