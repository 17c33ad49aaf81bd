// src/ui/widgets/mod.rs
//! Custom widgets for the pcmviz UI.

pub mod scope;
pub mod spectrum;
pub mod status;

// Re-export widget rendering functions
pub use scope::render_scope;
pub use spectrum::{bar_count, render_spectrum, SpectrumBars};
pub use status::{channel_name, render_status};
