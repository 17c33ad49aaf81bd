// src/app/state.rs
//! Application state management.

use std::time::Instant;

use crossterm::event::KeyEvent;
use ratatui::Frame;
use tracing::warn;

use super::pipeline::Pipeline;
use crate::{
    config::PipelineConfig,
    error::Result,
    ui::{
        keybindings::{apply_action, key_to_action, Action},
        layout::{compute_layout, SectionVisibility},
        widgets::{bar_count, channel_name, render_scope, render_spectrum, render_status, SpectrumBars},
    },
};

/// Bars drawn before the first layout pass tells us the real width.
const INITIAL_BARS: usize = 64;

/// Main application state.
pub struct App {
    /// Capture and analysis pipeline
    pub pipeline: Pipeline,
    /// Falling bar state for each channel
    bars: Vec<SpectrumBars>,
    /// Bar count that fit each channel's spectrum panel on the last draw
    bar_counts: Vec<usize>,
    /// Section visibility state
    pub visibility: SectionVisibility,
    /// Frames per second actually achieved, smoothed
    measured_fps: f32,
    last_update: Instant,
}

impl App {
    /// Create a new application instance.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pipeline = Pipeline::new(config)?;
        let channels = pipeline.channel_count();
        Ok(Self {
            pipeline,
            bars: vec![SpectrumBars::new(); channels],
            bar_counts: vec![INITIAL_BARS; channels],
            visibility: SectionVisibility::default(),
            measured_fps: 0.0,
            last_update: Instant::now(),
        })
    }

    /// Handle a key event and return true if the app should quit.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        let action = key_to_action(&key);
        match action {
            Action::Quit => return true,
            Action::ToggleSection(d) => self.visibility.toggle(d),
            _ => {
                if let Some(next) = apply_action(action, self.pipeline.config()) {
                    if let Err(e) = self.pipeline.reconfigure(next) {
                        warn!("rejected configuration change: {e}");
                    }
                    self.sync_channels();
                }
            }
        }
        false
    }

    /// Analyze new samples and advance the bar animation.
    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        if dt > 0.0 {
            self.measured_fps = 0.9 * self.measured_fps + 0.1 / dt;
        }

        self.pipeline.tick();

        let config = self.pipeline.config();
        let (min_db, max_db, gravity) = (config.min_db, config.max_db, config.gravity);
        for (channel, bars) in self.bars.iter_mut().enumerate() {
            if let Some(db) = self.pipeline.spectrum(channel) {
                let count = self.bar_counts.get(channel).copied().unwrap_or(INITIAL_BARS);
                bars.update(&db, count, min_db, max_db, gravity, dt);
            }
        }
    }

    /// Draw the application UI.
    pub fn draw(&mut self, f: &mut Frame<'_>) {
        let channels = self.pipeline.channel_count();
        let layout = compute_layout(f.area(), channels, &self.visibility);

        if let Some(area) = layout.status_area {
            render_status(f, area, &self.pipeline, self.measured_fps);
        }

        let buffers = self.pipeline.buffers().read();
        for (channel, areas) in layout.channels.iter().enumerate() {
            let name = channel_name(channel, channels as u32);
            if let Some(area) = areas.spectrum {
                if let Some(count) = self.bar_counts.get_mut(channel) {
                    *count = bar_count(area.width).max(1);
                }
                if let Some(bars) = self.bars.get(channel) {
                    render_spectrum(f, area, &format!("2: Spectrum ({name})"), bars);
                }
            }
            if let (Some(area), Some(buffer)) = (areas.scope, buffers.get(channel)) {
                render_scope(f, area, &format!("3: Scope ({name})"), &buffer.snapshot());
            }
        }
    }

    /// Match the per-channel UI state to the pipeline after a reconfiguration.
    fn sync_channels(&mut self) {
        let channels = self.pipeline.channel_count();
        self.bars.resize(channels, SpectrumBars::new());
        self.bar_counts.resize(channels, INITIAL_BARS);
    }
}
