//! GPU context, buffers, and pipelines

pub mod context;
pub mod buffer;
pub mod pipeline;
pub mod texture;

pub use context::GpuContext;
