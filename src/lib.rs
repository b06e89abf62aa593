//! Grassfield - GPU-driven procedural grass placement and instanced rendering

pub mod core;
pub mod math;
pub mod render;
pub mod grass;
