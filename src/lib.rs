// src/lib.rs
//! pcmviz - a terminal audio visualizer.
//!
//! This library provides the capture, buffering and FFT pipeline behind the
//! `pcmviz` binary, plus the terminal renderer that draws its output.

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Result, VizError};
