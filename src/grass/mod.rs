//! GPU grass field.
//!
//! A compute kernel places blades across a rectangular area into a packed
//! instance buffer, and one indirect instanced draw renders them with wind.
//! [`GrassField`] owns the buffers and the generate / render / clear
//! lifecycle; [`kernel`] mirrors the placement math on the host.

pub mod args;
pub mod config;
pub mod dispatch;
pub mod field;
pub mod kernel;
pub mod mesh;
pub mod params;
pub mod record;
pub mod terrain;

pub use args::{ArgsBuffer, DrawIndexedIndirectArgs};
pub use config::{FieldConfig, HeightVariation, WindParams};
pub use dispatch::{dispatch_for, DispatchSize, MAX_GROUPS_PER_DIMENSION, WORKGROUP_SIZE};
pub use field::{field_bounds, AbortReason, FrameParams, GenerateOutcome, GrassField};
pub use kernel::{generate_records, KernelInputs};
pub use mesh::{GrassVertex, MeshData, ReferenceMesh, SubMesh};
pub use params::{GrassUniforms, PlacementParams};
pub use record::{PlacementRecord, RecordLayout};
pub use terrain::{HeightMap, TerrainSampler};
