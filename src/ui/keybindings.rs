// src/ui/keybindings.rs
//! Keyboard input handling and key mappings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::{PipelineConfig, Source};

/// Smallest and largest FFT length reachable from the keyboard.
const FFT_SIZE_RANGE: (usize, usize) = (256, 1 << 16);
/// Buffer duration bounds and step in milliseconds.
const DURATION_RANGE: (u32, u32) = (20, 2000);
const DURATION_STEP: u32 = 20;

/// Map digit/shifted-digit keys to section number (1..3).
pub fn map_key_to_digit(k: &KeyEvent) -> Option<usize> {
    if let KeyCode::Char(c) = k.code {
        match c {
            '1' | '!' => Some(1),
            '2' | '@' => Some(2),
            '3' | '#' => Some(3),
            _ => None,
        }
    } else {
        None
    }
}

/// Actions derived from key events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    ToggleStereo,
    FftLarger,
    FftSmaller,
    LongerBuffer,
    ShorterBuffer,
    CycleSource,
    ToggleSection(usize),
    None,
}

/// Convert a key event to an action.
pub fn key_to_action(key: &KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if let Some(d) = map_key_to_digit(key) {
        return Action::ToggleSection(d);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('s') => Action::ToggleStereo,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::FftLarger,
        KeyCode::Char('-') => Action::FftSmaller,
        KeyCode::Char(']') => Action::LongerBuffer,
        KeyCode::Char('[') => Action::ShorterBuffer,
        KeyCode::Char('c') => Action::CycleSource,
        _ => Action::None,
    }
}

/// The configuration `action` asks for, or `None` if it does not touch the pipeline.
pub fn apply_action(action: Action, config: &PipelineConfig) -> Option<PipelineConfig> {
    let mut next = config.clone();
    match action {
        Action::ToggleStereo => next.input.stereo = !next.input.stereo,
        Action::FftLarger => next.fft.size = (next.fft.size * 2).min(FFT_SIZE_RANGE.1),
        Action::FftSmaller => next.fft.size = (next.fft.size / 2).max(FFT_SIZE_RANGE.0),
        Action::LongerBuffer => {
            next.duration_ms = (next.duration_ms + DURATION_STEP).min(DURATION_RANGE.1)
        }
        Action::ShorterBuffer => {
            next.duration_ms = next.duration_ms.saturating_sub(DURATION_STEP).max(DURATION_RANGE.0)
        }
        Action::CycleSource => {
            next.input.source = match next.input.source {
                Source::Fifo => Source::Server,
                Source::Server => Source::Playback,
                Source::Playback => Source::Fifo,
            }
        }
        Action::Quit | Action::ToggleSection(_) | Action::None => return None,
    }
    (next != *config).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_keys_map_to_actions() {
        assert_eq!(key_to_action(&key('q')), Action::Quit);
        assert_eq!(key_to_action(&key('s')), Action::ToggleStereo);
        assert_eq!(key_to_action(&key('+')), Action::FftLarger);
        assert_eq!(key_to_action(&key('2')), Action::ToggleSection(2));
        assert_eq!(key_to_action(&key('@')), Action::ToggleSection(2));
        assert_eq!(key_to_action(&key('x')), Action::None);
        assert_eq!(
            key_to_action(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn test_fft_size_steps_in_powers_of_two() {
        let config = PipelineConfig::default();
        let larger = apply_action(Action::FftLarger, &config).unwrap();
        assert_eq!(larger.fft.size, 8192);
        let smaller = apply_action(Action::FftSmaller, &config).unwrap();
        assert_eq!(smaller.fft.size, 2048);

        let mut floor = config.clone();
        floor.fft.size = FFT_SIZE_RANGE.0;
        assert!(apply_action(Action::FftSmaller, &floor).is_none());
    }

    #[test]
    fn test_buffer_duration_is_bounded() {
        let mut config = PipelineConfig::default();
        config.duration_ms = DURATION_RANGE.0;
        assert!(apply_action(Action::ShorterBuffer, &config).is_none());
        let longer = apply_action(Action::LongerBuffer, &config).unwrap();
        assert_eq!(longer.duration_ms, DURATION_RANGE.0 + DURATION_STEP);
    }

    #[test]
    fn test_source_cycles_through_all_backends() {
        let mut config = PipelineConfig::default();
        for expected in [Source::Server, Source::Playback, Source::Fifo] {
            config = apply_action(Action::CycleSource, &config).unwrap();
            assert_eq!(config.input.source, expected);
        }
    }

    #[test]
    fn test_view_actions_leave_config_alone() {
        let config = PipelineConfig::default();
        assert!(apply_action(Action::ToggleSection(1), &config).is_none());
        assert!(apply_action(Action::Quit, &config).is_none());
    }
}
