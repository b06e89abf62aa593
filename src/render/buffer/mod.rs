//! GPU buffer helpers

pub mod readback;

pub use readback::read_buffer;
