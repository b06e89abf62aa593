//! Render targets

pub mod target;

pub use target::{RenderTarget, COLOR_FORMAT, DEPTH_FORMAT};
