// src/app/mod.rs
//! Application module - the pipeline driver, frame pacing and UI state.

pub mod clock;
pub mod pipeline;
pub mod state;

// Re-export the main types
pub use clock::FrameClock;
pub use pipeline::Pipeline;
pub use state::App;
