//! Field configuration (user-facing, serializable).
//!
//! A generation pass snapshots the config; edits made through
//! `GrassField::config_mut` only take effect on the next `generate`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, Vec2, Vec3};
use crate::grass::record::RecordLayout;
use crate::render::pipeline::grass_draw::GRASS_SHADER_IDENTITY;

/// Smooth spatial scale variation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightVariation {
    /// Lattice frequency of the value noise (cells per meter).
    pub frequency: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for HeightVariation {
    fn default() -> Self {
        Self {
            frequency: 0.1,
            min_scale: 0.5,
            max_scale: 1.5,
        }
    }
}

/// Wind animation parameters, uploaded every frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindParams {
    /// Horizontal direction (x, z). Normalized on upload.
    pub direction: Vec2,
    /// Peak tip displacement in meters.
    pub strength: f32,
    /// Gust wave speed in meters per second.
    pub speed: f32,
    /// How much taller blades bend more (0 = uniform).
    pub scale_influence: f32,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            direction: Vec2::new(1.0, 0.0),
            strength: 0.3,
            speed: 1.5,
            scale_influence: 0.5,
        }
    }
}

/// Peak of the gust factor `0.6 + 0.4 sin(p) + 0.15 sin(2.7p + x)` in
/// `grass_instanced.wgsl`.
pub const MAX_GUST: f32 = 1.15;

impl WindParams {
    /// Direction normalized, falling back to +X for a zero vector.
    pub fn normalized_direction(&self) -> Vec2 {
        self.direction.try_normalize().unwrap_or(Vec2::X)
    }

    /// Upper bound of the tip displacement for blades scaled within `hv`.
    pub fn max_bend(&self, hv: &HeightVariation) -> f32 {
        let influence = |scale: f32| (1.0 + self.scale_influence * (scale - 1.0)).max(0.0);
        self.strength.abs() * MAX_GUST * influence(hv.min_scale).max(influence(hv.max_scale))
    }
}

/// Complete configuration of one grass field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Width (x) and depth (z) of the placement area in meters.
    pub area_size: Vec2,
    pub instance_count: u32,
    pub seed: f32,
    pub layout: RecordLayout,
    pub height_variation: HeightVariation,
    pub wind: WindParams,
    /// World position of the field center.
    pub origin: Vec3,
    /// Material identity the render path requires. `None` skips the check.
    pub required_shader_identity: Option<String>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            area_size: Vec2::new(50.0, 50.0),
            instance_count: 10_000,
            seed: 1.0,
            layout: RecordLayout::Basic,
            height_variation: HeightVariation::default(),
            wind: WindParams::default(),
            origin: Vec3::ZERO,
            required_shader_identity: Some(GRASS_SHADER_IDENTITY.to_string()),
        }
    }
}

impl FieldConfig {
    /// Check ranges that would otherwise produce garbage on the GPU.
    pub fn validate(&self) -> Result<()> {
        if !self.area_size.is_finite() || self.area_size.min_element() < 0.0 {
            return Err(Error::Config(format!(
                "area_size must be finite and non-negative, got {:?}", self.area_size
            )));
        }
        if !self.seed.is_finite() {
            return Err(Error::Config("seed must be finite".into()));
        }
        let hv = &self.height_variation;
        if !(hv.frequency.is_finite() && hv.min_scale.is_finite() && hv.max_scale.is_finite()) {
            return Err(Error::Config("height variation values must be finite".into()));
        }
        if hv.min_scale > hv.max_scale {
            return Err(Error::Config(format!(
                "min_scale ({}) exceeds max_scale ({})", hv.min_scale, hv.max_scale
            )));
        }
        if !self.origin.is_finite() {
            return Err(Error::Config("origin must be finite".into()));
        }
        let wind = &self.wind;
        if !(wind.direction.is_finite()
            && wind.strength.is_finite()
            && wind.speed.is_finite()
            && wind.scale_influence.is_finite())
        {
            return Err(Error::Config("wind values must be finite".into()));
        }
        Ok(())
    }

    /// Size in bytes of the instance buffer this config produces.
    pub fn instance_buffer_size(&self) -> u64 {
        self.instance_count as u64 * self.layout.stride()
    }

    /// Load a config from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
