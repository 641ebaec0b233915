//! Real-time terminal spectrum analyzer and VU meter.

pub mod app;
pub mod capture;
pub mod colors;
pub mod config;
pub mod error;
pub mod grid;
pub mod level;
pub mod mode;
pub mod render;
pub mod settings;
pub mod spectrum;
pub mod terminal;

pub use error::{Error, Result};
