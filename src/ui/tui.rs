// src/ui/tui.rs
//! Terminal setup and the paced render loop.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as CEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use crate::app::{App, FrameClock};
use crate::config::PipelineConfig;

/// Run the visualizer until the user quits.
pub fn run(config: PipelineConfig) -> Result<()> {
    let mut app = App::new(config).context("failed to start the audio pipeline")?;

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &mut app);

    // Restore the terminal even if the loop failed
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut clock = FrameClock::new(app.pipeline.config().frame_period());
    info!(period = ?clock.period(), "render loop started");

    loop {
        clock.begin();

        app.update();
        terminal.draw(|f| app.draw(f))?;

        // Drain input without blocking the frame
        while event::poll(Duration::ZERO)? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.on_key(key) {
                    info!("quit requested");
                    return Ok(());
                }
            }
        }

        clock.set_period(app.pipeline.config().frame_period());
        clock.wait();
    }
}
