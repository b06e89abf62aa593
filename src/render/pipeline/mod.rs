//! Render and compute pipelines

pub mod grass_draw;
pub mod placement;

pub use grass_draw::{GrassMaterial, GRASS_SHADER_IDENTITY};
pub use placement::{PlacementPipeline, PLACEMENT_ENTRY_POINT};
