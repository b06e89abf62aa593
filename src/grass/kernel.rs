//! Host mirror of the placement kernel in `grass_placement.wgsl`.
//!
//! Every function here has a WGSL twin with identical integer hashing, so a
//! given `(index, seed)` lands on the same lattice values on both sides.
//! Float results agree within rounding. Used by tests, benchmarks, and the
//! host-instancing fallback.

use rayon::prelude::*;

use crate::core::{Vec2, Vec3};
use crate::grass::config::{FieldConfig, HeightVariation};
use crate::grass::record::{PlacementRecord, RecordLayout};
use crate::grass::terrain::TerrainSampler;

/// Hash channels. Must match the `CH_*` constants in the shader.
pub const CH_POS_X: u32 = 0;
pub const CH_POS_Z: u32 = 1;
pub const CH_ROTATION: u32 = 2;
pub const CH_SCALE: u32 = 3;
pub const CH_COLOR: u32 = 4;

/// Lattice offset separating the color noise from the scale noise.
pub const COLOR_NOISE_OFFSET: f32 = 137.0;

/// 32-bit integer finalizer (lowbias32).
#[inline]
pub fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

#[inline]
fn seed_hash(seed_bits: u32, channel: u32) -> u32 {
    hash_u32(seed_bits.wrapping_add(channel.wrapping_mul(0x9e37_79b9)))
}

/// Top 24 bits as a float in [0, 1).
#[inline]
fn unit_float(h: u32) -> f32 {
    (h >> 8) as f32 / 16_777_216.0
}

/// Per-instance random value in [0, 1).
#[inline]
pub fn random01(index: u32, seed_bits: u32, channel: u32) -> f32 {
    unit_float(hash_u32(index ^ seed_hash(seed_bits, channel)))
}

#[inline]
fn lattice(ix: i32, iz: i32, seed_bits: u32, channel: u32) -> f32 {
    let h = (ix as u32).wrapping_mul(0x8da6_b343)
        ^ (iz as u32).wrapping_mul(0xd816_3841)
        ^ seed_hash(seed_bits, channel);
    unit_float(hash_u32(h))
}

/// Smooth 2D value noise in [0, 1) over an integer lattice.
pub fn value_noise(p: Vec2, seed_bits: u32, channel: u32) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    // Smoothstep for C1 continuity
    let u = f * f * (Vec2::splat(3.0) - 2.0 * f);
    let ix = cell.x as i32;
    let iz = cell.y as i32;

    let a = lattice(ix, iz, seed_bits, channel);
    let b = lattice(ix.wrapping_add(1), iz, seed_bits, channel);
    let c = lattice(ix, iz.wrapping_add(1), seed_bits, channel);
    let d = lattice(ix.wrapping_add(1), iz.wrapping_add(1), seed_bits, channel);

    let ab = a + (b - a) * u.x;
    let cd = c + (d - c) * u.x;
    ab + (cd - ab) * u.y
}

/// Inputs of one placement pass.
#[derive(Clone, Copy, Debug)]
pub struct KernelInputs<'a> {
    pub area_size: Vec2,
    pub instance_count: u32,
    pub seed: f32,
    pub height_variation: HeightVariation,
    pub layout: RecordLayout,
    pub origin: Vec3,
    pub terrain: Option<&'a TerrainSampler>,
}

impl<'a> KernelInputs<'a> {
    pub fn from_config(config: &FieldConfig, terrain: Option<&'a TerrainSampler>) -> Self {
        Self {
            area_size: config.area_size,
            instance_count: config.instance_count,
            seed: config.seed,
            height_variation: config.height_variation,
            layout: config.layout,
            origin: config.origin,
            terrain: terrain.filter(|t| t.is_usable()),
        }
    }
}

/// Compute the record for invocation `index`.
pub fn place(index: u32, inputs: &KernelInputs<'_>) -> PlacementRecord {
    let seed_bits = inputs.seed.to_bits();
    let hv = &inputs.height_variation;

    let rx = random01(index, seed_bits, CH_POS_X);
    let rz = random01(index, seed_bits, CH_POS_Z);
    let mut position = Vec3::new(
        (rx - 0.5) * inputs.area_size.x,
        0.0,
        (rz - 0.5) * inputs.area_size.y,
    );

    let rotation = random01(index, seed_bits, CH_ROTATION) * std::f32::consts::TAU;

    let xz = Vec2::new(position.x, position.z);
    let t = value_noise(xz * hv.frequency, seed_bits, CH_SCALE);
    let scale = (hv.min_scale + (hv.max_scale - hv.min_scale) * t).clamp(hv.min_scale, hv.max_scale);

    if let Some(terrain) = inputs.terrain {
        position.y = terrain.displaced_height(inputs.origin, xz);
    }

    let color_bias = match inputs.layout {
        RecordLayout::Basic => None,
        RecordLayout::Shaded => {
            let p = xz * (hv.frequency * 0.5) + Vec2::splat(COLOR_NOISE_OFFSET);
            Some(value_noise(p, seed_bits, CH_COLOR).clamp(0.0, 1.0))
        }
    };

    PlacementRecord {
        position,
        rotation,
        scale,
        color_bias,
    }
}

/// Run the kernel for every index in parallel.
pub fn generate_records(inputs: &KernelInputs<'_>) -> Vec<PlacementRecord> {
    (0..inputs.instance_count)
        .into_par_iter()
        .map(|i| place(i, inputs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grass::terrain::HeightMap;

    fn inputs(count: u32) -> KernelInputs<'static> {
        KernelInputs::from_config(&FieldConfig { instance_count: count, ..Default::default() }, None)
    }

    #[test]
    fn test_hash_known_values() {
        assert_eq!(hash_u32(0), 0);
        assert_ne!(hash_u32(1), hash_u32(2));
    }

    #[test]
    fn test_random01_range() {
        for i in 0..10_000 {
            let r = random01(i, 1.0f32.to_bits(), CH_POS_X);
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn test_channels_independent() {
        let seed = 1.0f32.to_bits();
        let same = (0..1000)
            .filter(|&i| random01(i, seed, CH_POS_X) == random01(i, seed, CH_POS_Z))
            .count();
        assert!(same < 5);
    }

    #[test]
    fn test_value_noise_range_and_continuity() {
        let seed = 3.0f32.to_bits();
        let mut prev = value_noise(Vec2::ZERO, seed, CH_SCALE);
        for step in 1..2000 {
            let p = Vec2::new(step as f32 * 0.01, 0.37);
            let v = value_noise(p, seed, CH_SCALE);
            assert!((0.0..1.0).contains(&v));
            // Small steps give small changes
            assert!((v - prev).abs() < 0.05, "jump at {:?}", p);
            prev = v;
        }
    }

    #[test]
    fn test_value_noise_hits_lattice_values() {
        let seed = 9.0f32.to_bits();
        let v = value_noise(Vec2::new(4.0, -2.0), seed, CH_SCALE);
        assert_eq!(v, lattice(4, -2, seed, CH_SCALE));
    }

    #[test]
    fn test_scenario_bounds_and_scale() {
        let inp = inputs(10_000);
        let records = generate_records(&inp);
        assert_eq!(records.len(), 10_000);

        let hv = inp.height_variation;
        for r in &records {
            assert!(r.position.x >= -25.0 && r.position.x <= 25.0);
            assert!(r.position.z >= -25.0 && r.position.z <= 25.0);
            assert_eq!(r.position.y, 0.0);
            assert!(r.rotation >= 0.0 && r.rotation < std::f32::consts::TAU);
            assert!(r.scale >= hv.min_scale && r.scale <= hv.max_scale);
            assert!(r.color_bias.is_none());
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let inp = inputs(2048);
        let a = generate_records(&inp);
        let b = generate_records(&inp);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_layout() {
        let a = generate_records(&inputs(64));
        let mut inp = inputs(64);
        inp.seed = 2.0;
        let b = generate_records(&inp);
        assert_ne!(a, b);
    }

    #[test]
    fn test_order_independent() {
        let inp = inputs(500);
        let all = generate_records(&inp);
        assert_eq!(place(321, &inp), all[321]);
    }

    #[test]
    fn test_neighbours_share_height() {
        // Scale is spatially smooth, not per-blade noise
        let mut inp = inputs(0);
        inp.height_variation.frequency = 0.05;
        let seed = inp.seed.to_bits();
        let a = value_noise(Vec2::new(10.0, 10.0) * 0.05, seed, CH_SCALE);
        let b = value_noise(Vec2::new(10.1, 10.0) * 0.05, seed, CH_SCALE);
        assert!((a - b).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_area_and_scale_range() {
        let mut inp = inputs(100);
        inp.area_size = Vec2::ZERO;
        inp.height_variation.min_scale = 0.8;
        inp.height_variation.max_scale = 0.8;
        for r in generate_records(&inp) {
            assert_eq!(r.position, Vec3::ZERO);
            assert_eq!(r.scale, 0.8);
        }
    }

    #[test]
    fn test_shaded_layout_has_color_bias() {
        let mut inp = inputs(1000);
        inp.layout = RecordLayout::Shaded;
        let records = generate_records(&inp);
        assert!(records.iter().all(|r| matches!(r.color_bias, Some(c) if (0.0..=1.0).contains(&c))));
        // Positions are unaffected by the layout
        let basic = generate_records(&inputs(1000));
        assert_eq!(records[17].position, basic[17].position);
    }

    #[test]
    fn test_terrain_displacement() {
        let terrain = TerrainSampler {
            height_map: HeightMap::flat(4, 4, 0.5),
            displacement_strength: 10.0,
            position: Vec3::new(-100.0, 2.0, -100.0),
            size: Vec3::new(200.0, 10.0, 200.0),
        };
        let mut inp = inputs(100);
        inp.terrain = Some(&terrain);
        for r in generate_records(&inp) {
            assert!((r.position.y - 7.0).abs() < 1e-5);
            assert!(r.position.x.abs() <= 25.0);
        }
    }

    #[test]
    fn test_empty_count() {
        assert!(generate_records(&inputs(0)).is_empty());
    }
}
