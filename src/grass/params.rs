//! GPU-ready uniforms for the placement kernel and the grass draw.
//!
//! Field order and padding follow WGSL uniform layout rules; each struct
//! must match its twin in `grass_placement.wgsl` / `grass_instanced.wgsl`.

use bytemuck::{Pod, Zeroable};

use crate::core::{Mat4, Vec3};
use crate::grass::config::{FieldConfig, WindParams};
use crate::grass::terrain::TerrainSampler;

/// Kernel inputs (80 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PlacementParams {
    pub area_size: [f32; 2],
    pub grass_count: u32,
    pub seed: f32,
    // -- 16 bytes --
    pub height_frequency: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub use_height_map: u32,
    // -- 16 bytes --
    pub origin: [f32; 3],
    pub displacement_strength: f32,
    // -- 16 bytes --
    pub terrain_position: [f32; 3],
    pub _pad0: f32,
    // -- 16 bytes --
    pub terrain_size: [f32; 2],
    pub _pad1: [f32; 2],
    // -- 16 bytes --
    // Total: 80 bytes
}

impl PlacementParams {
    /// Build from a config snapshot. Unusable terrain is treated as absent.
    pub fn new(config: &FieldConfig, terrain: Option<&TerrainSampler>) -> Self {
        let hv = &config.height_variation;
        let terrain = terrain.filter(|t| t.is_usable());
        Self {
            area_size: config.area_size.to_array(),
            grass_count: config.instance_count,
            seed: config.seed,
            height_frequency: hv.frequency,
            min_scale: hv.min_scale,
            max_scale: hv.max_scale,
            use_height_map: u32::from(terrain.is_some()),
            origin: config.origin.to_array(),
            displacement_strength: terrain.map_or(0.0, |t| t.displacement_strength),
            terrain_position: terrain.map_or([0.0; 3], |t| t.position.to_array()),
            _pad0: 0.0,
            terrain_size: terrain.map_or([1.0, 1.0], |t| [t.size.x, t.size.z]),
            _pad1: [0.0; 2],
        }
    }
}

/// Per-frame draw uniforms (112 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GrassUniforms {
    pub view_proj: [[f32; 4]; 4],
    // -- 64 bytes --
    pub manager_position: [f32; 3],
    pub time: f32,
    // -- 16 bytes --
    pub wind_direction: [f32; 2],
    pub wind_strength: f32,
    pub wind_speed: f32,
    // -- 16 bytes --
    pub wind_scale_influence: f32,
    pub _pad: [f32; 3],
    // -- 16 bytes --
    // Total: 112 bytes
}

impl GrassUniforms {
    pub fn new(view_proj: Mat4, manager_position: Vec3, time: f32, wind: &WindParams) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            manager_position: manager_position.to_array(),
            time,
            wind_direction: wind.normalized_direction().to_array(),
            wind_strength: wind.strength,
            wind_speed: wind.speed,
            wind_scale_influence: wind.scale_influence,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grass::terrain::HeightMap;

    #[test]
    fn test_placement_params_size() {
        assert_eq!(std::mem::size_of::<PlacementParams>(), 80);
        assert_eq!(std::mem::size_of::<PlacementParams>() % 16, 0);
    }

    #[test]
    fn test_grass_uniforms_size() {
        assert_eq!(std::mem::size_of::<GrassUniforms>(), 112);
        assert_eq!(std::mem::size_of::<GrassUniforms>() % 16, 0);
    }

    #[test]
    fn test_params_without_terrain() {
        let p = PlacementParams::new(&FieldConfig::default(), None);
        assert_eq!(p.grass_count, 10_000);
        assert_eq!(p.area_size, [50.0, 50.0]);
        assert_eq!(p.seed, 1.0);
        assert_eq!(p.use_height_map, 0);
        // Non-zero so the shader never divides by zero
        assert_eq!(p.terrain_size, [1.0, 1.0]);
    }

    #[test]
    fn test_params_with_terrain() {
        let terrain = TerrainSampler {
            height_map: HeightMap::flat(2, 2, 0.0),
            displacement_strength: 30.0,
            position: Vec3::new(-50.0, 5.0, -60.0),
            size: Vec3::new(100.0, 30.0, 120.0),
        };
        let p = PlacementParams::new(&FieldConfig::default(), Some(&terrain));
        assert_eq!(p.use_height_map, 1);
        assert_eq!(p.displacement_strength, 30.0);
        assert_eq!(p.terrain_position, [-50.0, 5.0, -60.0]);
        assert_eq!(p.terrain_size, [100.0, 120.0]);
    }

    #[test]
    fn test_unusable_terrain_disabled() {
        let terrain = TerrainSampler {
            height_map: HeightMap::flat(2, 2, 0.0),
            displacement_strength: 30.0,
            position: Vec3::ZERO,
            size: Vec3::ZERO,
        };
        let p = PlacementParams::new(&FieldConfig::default(), Some(&terrain));
        assert_eq!(p.use_height_map, 0);
    }

    #[test]
    fn test_uniforms_normalize_wind() {
        let wind = WindParams {
            direction: crate::core::Vec2::new(3.0, 4.0),
            ..Default::default()
        };
        let u = GrassUniforms::new(Mat4::IDENTITY, Vec3::ONE, 2.5, &wind);
        assert!((u.wind_direction[0] - 0.6).abs() < 1e-6);
        assert!((u.wind_direction[1] - 0.8).abs() < 1e-6);
        assert_eq!(u.time, 2.5);
        assert_eq!(u.manager_position, [1.0, 1.0, 1.0]);
    }
}
