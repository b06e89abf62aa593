//! Placement record layout (the kernel/renderer binary contract).
//!
//! Records are tightly packed little-endian `f32`s: 5 floats (20 bytes) for
//! `Basic`, 6 floats (24 bytes) for `Shaded`. Both WGSL programs index a flat
//! `array<f32>` with `RECORD_FLOATS` injected from [`RecordLayout::floats`].

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Mat4, Quat, Result, Vec3};

/// Which fields a placement record carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayout {
    /// position, rotation, scale
    #[default]
    Basic,
    /// position, rotation, scale, color bias
    Shaded,
}

impl RecordLayout {
    /// Number of f32 values per record.
    pub const fn floats(self) -> u32 {
        match self {
            Self::Basic => 5,
            Self::Shaded => 6,
        }
    }

    /// Stride in bytes.
    pub const fn stride(self) -> u64 {
        self.floats() as u64 * 4
    }

    /// WGSL prelude declaring the stride constant for this layout.
    pub fn wgsl_prelude(self) -> String {
        format!("const RECORD_FLOATS: u32 = {}u;\n", self.floats())
    }

    /// Decode `count` records from raw buffer bytes.
    pub fn decode(self, bytes: &[u8], count: usize) -> Result<Vec<PlacementRecord>> {
        let needed = count * self.stride() as usize;
        if bytes.len() < needed {
            return Err(Error::Readback(format!(
                "expected at least {} bytes for {} records, got {}", needed, count, bytes.len()
            )));
        }
        // Chunks may be unaligned when the bytes come from a plain Vec<u8>
        let chunks = bytes[..needed].chunks_exact(self.stride() as usize);
        let records = match self {
            Self::Basic => chunks
                .map(|c| PlacementRecord::from(bytemuck::pod_read_unaligned::<GpuPlacementRecord>(c)))
                .collect(),
            Self::Shaded => chunks
                .map(|c| PlacementRecord::from(bytemuck::pod_read_unaligned::<GpuShadedPlacementRecord>(c)))
                .collect(),
        };
        Ok(records)
    }

    /// Encode records into the packed layout.
    ///
    /// A missing `color_bias` is written as 0 in the shaded layout.
    pub fn encode(self, records: &[PlacementRecord]) -> Vec<u8> {
        match self {
            Self::Basic => {
                let packed: Vec<GpuPlacementRecord> = records.iter().map(|r| r.packed()).collect();
                bytemuck::cast_slice(&packed).to_vec()
            }
            Self::Shaded => {
                let packed: Vec<GpuShadedPlacementRecord> =
                    records.iter().map(|r| r.packed_shaded()).collect();
                bytemuck::cast_slice(&packed).to_vec()
            }
        }
    }
}

/// GPU-side basic record (20 bytes). Must match `grass_placement.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuPlacementRecord {
    pub position: [f32; 3],
    pub rotation: f32,
    pub scale: f32,
}

/// GPU-side shaded record (24 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuShadedPlacementRecord {
    pub position: [f32; 3],
    pub rotation: f32,
    pub scale: f32,
    pub color_bias: f32,
}

/// Host-side view of one placed blade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementRecord {
    /// Offset from the field origin.
    pub position: Vec3,
    /// Yaw in radians.
    pub rotation: f32,
    pub scale: f32,
    /// Yellowness in [0, 1]; only present in the shaded layout.
    pub color_bias: Option<f32>,
}

impl PlacementRecord {
    fn packed(&self) -> GpuPlacementRecord {
        GpuPlacementRecord {
            position: self.position.to_array(),
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    fn packed_shaded(&self) -> GpuShadedPlacementRecord {
        GpuShadedPlacementRecord {
            position: self.position.to_array(),
            rotation: self.rotation,
            scale: self.scale,
            color_bias: self.color_bias.unwrap_or(0.0),
        }
    }

    /// World transform for host-side instancing (readback fallback path).
    pub fn world_transform(&self, origin: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation),
            origin + self.position,
        )
    }
}

impl From<GpuPlacementRecord> for PlacementRecord {
    fn from(r: GpuPlacementRecord) -> Self {
        Self {
            position: Vec3::from_array(r.position),
            rotation: r.rotation,
            scale: r.scale,
            color_bias: None,
        }
    }
}

impl From<GpuShadedPlacementRecord> for PlacementRecord {
    fn from(r: GpuShadedPlacementRecord) -> Self {
        Self {
            position: Vec3::from_array(r.position),
            rotation: r.rotation,
            scale: r.scale,
            color_bias: Some(r.color_bias),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes_match_layout() {
        assert_eq!(std::mem::size_of::<GpuPlacementRecord>() as u64, RecordLayout::Basic.stride());
        assert_eq!(std::mem::size_of::<GpuShadedPlacementRecord>() as u64, RecordLayout::Shaded.stride());
        assert_eq!(RecordLayout::Basic.stride(), 20);
        assert_eq!(RecordLayout::Shaded.stride(), 24);
    }

    #[test]
    fn test_field_offsets() {
        let r = GpuShadedPlacementRecord {
            position: [1.0, 2.0, 3.0],
            rotation: 4.0,
            scale: 5.0,
            color_bias: 6.0,
        };
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&r));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_wgsl_prelude() {
        assert_eq!(RecordLayout::Basic.wgsl_prelude(), "const RECORD_FLOATS: u32 = 5u;\n");
        assert_eq!(RecordLayout::Shaded.wgsl_prelude(), "const RECORD_FLOATS: u32 = 6u;\n");
    }

    #[test]
    fn test_decode_flat_floats() {
        let floats: [f32; 10] = [0.5, 0.0, -1.5, 1.0, 0.8, -2.0, 0.0, 2.0, 3.0, 1.2];
        let records = RecordLayout::Basic.decode(bytemuck::cast_slice(&floats), 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].position, Vec3::new(-2.0, 0.0, 2.0));
        assert_eq!(records[1].rotation, 3.0);
        assert_eq!(records[1].scale, 1.2);
        assert_eq!(records[1].color_bias, None);
    }

    #[test]
    fn test_decode_ignores_padding_tail() {
        // Buffers may be larger than the logical record count
        let floats = [1.0f32; 12];
        let records = RecordLayout::Shaded.decode(bytemuck::cast_slice(&floats), 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].color_bias, Some(1.0));
    }

    #[test]
    fn test_decode_short_buffer_errors() {
        let floats = [0.0f32; 4];
        assert!(RecordLayout::Basic.decode(bytemuck::cast_slice(&floats), 1).is_err());
    }

    #[test]
    fn test_shaded_encode_fills_missing_bias() {
        let r = PlacementRecord {
            position: Vec3::ONE,
            rotation: 0.25,
            scale: 1.0,
            color_bias: None,
        };
        let bytes = RecordLayout::Shaded.encode(&[r]);
        assert_eq!(bytes.len(), 24);
        let back = RecordLayout::Shaded.decode(&bytes, 1).unwrap();
        assert_eq!(back[0].color_bias, Some(0.0));
    }

    #[test]
    fn test_world_transform() {
        let r = PlacementRecord {
            position: Vec3::new(1.0, 0.0, -2.0),
            rotation: std::f32::consts::FRAC_PI_2,
            scale: 2.0,
            color_bias: None,
        };
        let m = r.world_transform(Vec3::new(10.0, 1.0, 0.0));
        let tip = m.transform_point3(Vec3::Y);
        assert!(tip.distance(Vec3::new(11.0, 3.0, -2.0)) < 1e-5);
        // +X rotated a quarter turn about Y lands on -Z
        let side = m.transform_vector3(Vec3::X);
        assert!(side.distance(Vec3::new(0.0, 0.0, -2.0)) < 1e-5);
    }
}
