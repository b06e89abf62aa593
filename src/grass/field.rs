//! Field manager: owns the instance and args buffers and drives the
//! generate / render / clear lifecycle.
//!
//! Both buffers live in one [`GeneratedField`] so they are created and
//! released together; a field is either fully generated or fully cleared.

use crate::core::{Error, Mat4, Result, Vec2, Vec3};
use crate::grass::args::{ArgsBuffer, DrawIndexedIndirectArgs};
use crate::grass::config::{FieldConfig, WindParams};
use crate::grass::dispatch::{dispatch_for, DispatchSize, WORKGROUP_SIZE};
use crate::grass::mesh::ReferenceMesh;
use crate::grass::params::{GrassUniforms, PlacementParams};
use crate::grass::record::{PlacementRecord, RecordLayout};
use crate::grass::terrain::TerrainSampler;
use crate::math::{Aabb, Frustum};
use crate::render::buffer::read_buffer;
use crate::render::context::max_storage_binding;
use crate::render::pipeline::{GrassMaterial, PlacementPipeline};

/// Vertical half extent of the draw bounds before blade height is added.
/// Covers terrain displacement without tracking per-blade heights.
pub const DRAW_BOUNDS_HALF_HEIGHT: f32 = 1000.0;

/// Extra horizontal slack beyond blade reach and wind bend.
pub const DRAW_BOUNDS_MARGIN: f32 = 2.0;

/// Conservative world bounds of a field for frustum culling.
///
/// Grows the placement area by the mesh's horizontal reach at the largest
/// scale (any yaw) plus the furthest the wind can push a tip.
pub fn field_bounds(config: &FieldConfig, mesh: Option<Aabb>, wind: &WindParams) -> Aabb {
    let hv = &config.height_variation;
    let blade_scale = hv.min_scale.abs().max(hv.max_scale.abs());
    let (reach, height) = mesh.map_or((0.0, 0.0), |b| {
        let x = b.min.x.abs().max(b.max.x.abs());
        let z = b.min.z.abs().max(b.max.z.abs());
        (Vec2::new(x, z).length(), b.min.y.abs().max(b.max.y.abs()))
    });
    let bend = wind.max_bend(hv);
    let margin = reach * blade_scale + bend + DRAW_BOUNDS_MARGIN;
    let half = Vec3::new(
        config.area_size.x * 0.5 + margin,
        DRAW_BOUNDS_HALF_HEIGHT + height * blade_scale + bend,
        config.area_size.y * 0.5 + margin,
    );
    Aabb::from_center_half_extent(config.origin, half)
}

/// Why a generation request did nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// No material is bound.
    MissingMaterial,
    /// The bound material is not the one the config requires.
    IdentityMismatch { required: String, found: String },
    /// The material reads a different record layout than the kernel writes.
    LayoutMismatch { material: RecordLayout, config: RecordLayout },
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingMaterial => write!(f, "no material bound"),
            Self::IdentityMismatch { required, found } => {
                write!(f, "material '{}' does not match required '{}'", found, required)
            }
            Self::LayoutMismatch { material, config } => {
                write!(f, "material reads {:?} records but config writes {:?}", material, config)
            }
        }
    }
}

/// Result of [`GrassField::generate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Buffers allocated and the placement dispatch submitted.
    /// `dispatch` is `None` when there was nothing to place.
    Generated {
        instance_count: u32,
        dispatch: Option<DispatchSize>,
    },
    /// Nothing was created; the field stays cleared.
    Aborted(AbortReason),
}

impl GenerateOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// Per-frame render inputs.
#[derive(Clone, Copy, Debug)]
pub struct FrameParams {
    pub view_proj: Mat4,
    /// Seconds since start, drives the wind animation.
    pub time: f32,
    pub wind: WindParams,
}

/// Device resources of a generated field.
struct GeneratedField {
    /// Config the buffers were built from; later edits wait for `generate`.
    config: FieldConfig,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    layout: RecordLayout,
    draw_bind_group: wgpu::BindGroup,
    args: ArgsBuffer,
}

/// A grass field: configuration, bound inputs, and generated buffers.
pub struct GrassField {
    config: FieldConfig,
    material: Option<GrassMaterial>,
    mesh: Option<ReferenceMesh>,
    terrain: Option<TerrainSampler>,
    placement: Option<PlacementPipeline>,
    generated: Option<GeneratedField>,
}

impl GrassField {
    /// Create an empty field. No device resources are allocated until
    /// [`generate`](Self::generate).
    pub fn new(config: FieldConfig) -> Self {
        Self {
            config,
            material: None,
            mesh: None,
            terrain: None,
            placement: None,
            generated: None,
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Edits apply on the next `generate`.
    pub fn config_mut(&mut self) -> &mut FieldConfig {
        &mut self.config
    }

    /// Bind the render material. Clears the field, since the draw bind
    /// group belongs to the previous material.
    pub fn set_material(&mut self, material: Option<GrassMaterial>) {
        self.clear();
        self.material = material;
    }

    pub fn material(&self) -> Option<&GrassMaterial> {
        self.material.as_ref()
    }

    /// Bind the reference mesh. A generated field keeps its instances and
    /// gets its draw arguments rewritten for the new mesh.
    pub fn set_mesh(&mut self, queue: &wgpu::Queue, mesh: Option<ReferenceMesh>) {
        self.mesh = mesh;
        if let Some(generated) = &mut self.generated {
            let args = DrawIndexedIndirectArgs::for_mesh(
                self.mesh.as_ref().map(|m| m.submesh()),
                generated.instance_count,
            );
            generated.args.update(queue, args);
            log::debug!("Rewrote grass draw args: {:?}", args.to_words());
        }
    }

    pub fn mesh(&self) -> Option<&ReferenceMesh> {
        self.mesh.as_ref()
    }

    /// Bind terrain for height displacement. Takes effect on the next `generate`.
    pub fn set_terrain(&mut self, terrain: Option<TerrainSampler>) {
        self.terrain = terrain;
    }

    pub fn terrain(&self) -> Option<&TerrainSampler> {
        self.terrain.as_ref()
    }

    /// Build (or rebuild) the field on the device.
    ///
    /// Existing buffers are released first. A missing or mismatched material
    /// aborts quietly with the field left cleared; invalid configuration and
    /// device limits surface as errors, also leaving the field cleared.
    pub fn generate(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<GenerateOutcome> {
        self.clear();
        self.config.validate()?;

        let Some(material) = &self.material else {
            log::warn!("Grass generation aborted: {}", AbortReason::MissingMaterial);
            return Ok(GenerateOutcome::Aborted(AbortReason::MissingMaterial));
        };
        if let Some(required) = &self.config.required_shader_identity {
            if material.identity() != required {
                let reason = AbortReason::IdentityMismatch {
                    required: required.clone(),
                    found: material.identity().to_string(),
                };
                log::warn!("Grass generation aborted: {}", reason);
                return Ok(GenerateOutcome::Aborted(reason));
            }
        }
        let layout = self.config.layout;
        if material.layout() != layout {
            let reason = AbortReason::LayoutMismatch {
                material: material.layout(),
                config: layout,
            };
            log::warn!("Grass generation aborted: {}", reason);
            return Ok(GenerateOutcome::Aborted(reason));
        }

        let instance_count = self.config.instance_count;
        // Storage bindings can't be empty, so an empty field still gets one record
        let size = self.config.instance_buffer_size().max(layout.stride());
        let max_size = max_storage_binding(device);
        if size > max_size {
            return Err(Error::Gpu(format!(
                "{} instances need {} bytes, device allows {}", instance_count, size, max_size
            )));
        }

        let dispatch = dispatch_for(instance_count);
        if let Some(d) = dispatch {
            if !d.covers(instance_count, WORKGROUP_SIZE) {
                return Err(Error::Gpu(format!(
                    "{} instances exceed the largest dispatch grid {:?}", instance_count, d
                )));
            }
        }

        let terrain = match &self.terrain {
            Some(t) if !t.is_usable() => {
                log::warn!("Terrain has a degenerate extent {:?}, placing without displacement", t.size);
                None
            }
            other => other.as_ref(),
        };
        if let Some(t) = terrain {
            let max_dimension = device.limits().max_texture_dimension_2d;
            if !t.height_map.fits_texture(max_dimension) {
                return Err(Error::Gpu(format!(
                    "height map {}x{} exceeds the {} texel texture limit",
                    t.height_map.width(), t.height_map.height(), max_dimension
                )));
            }
        }

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_instances"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        match dispatch {
            Some(d) => {
                let placement = self.placement.get_or_insert_with(|| PlacementPipeline::new(device));
                placement.update_params(queue, &PlacementParams::new(&self.config, terrain));

                let height_texture = terrain.map(|t| t.height_map.create_texture(device, queue));
                let height_view = height_texture
                    .as_ref()
                    .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()));
                let bind_group = placement.create_bind_group(device, &instance_buffer, height_view.as_ref());

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("grass_placement_encoder"),
                });
                placement.dispatch(&mut encoder, layout, &bind_group, d);
                queue.submit(std::iter::once(encoder.finish()));
                log::debug!("Placement dispatch {}x{}x{} for {} instances", d.x, d.y, d.z, instance_count);
            }
            None => log::debug!("Zero instances, placement dispatch skipped"),
        }

        let args = ArgsBuffer::new(
            device,
            queue,
            DrawIndexedIndirectArgs::for_mesh(self.mesh.as_ref().map(|m| m.submesh()), instance_count),
        );
        if self.mesh.is_none() {
            log::warn!("No reference mesh bound, grass field will not draw");
        }

        let draw_bind_group = material.create_instance_bind_group(device, &instance_buffer);

        self.generated = Some(GeneratedField {
            config: self.config.clone(),
            instance_buffer,
            instance_count,
            layout,
            draw_bind_group,
            args,
        });

        log::info!(
            "Generated grass field: {} instances over {}x{} m (seed {}, {:?} layout{})",
            instance_count,
            self.config.area_size.x,
            self.config.area_size.y,
            self.config.seed,
            layout,
            if terrain.is_some() { ", terrain" } else { "" },
        );

        Ok(GenerateOutcome::Generated { instance_count, dispatch })
    }

    /// Record the field's draw into `pass`.
    ///
    /// Returns false without touching the pass when anything needed is
    /// missing or the field is outside the frustum.
    pub fn render(&self, queue: &wgpu::Queue, pass: &mut wgpu::RenderPass<'_>, frame: &FrameParams) -> bool {
        let (Some(generated), Some(material), Some(mesh)) =
            (&self.generated, &self.material, &self.mesh)
        else {
            return false;
        };
        if generated.instance_count == 0 {
            return false;
        }

        let bounds = field_bounds(&generated.config, Some(mesh.bounds()), &frame.wind);
        let frustum = Frustum::from_view_projection(&frame.view_proj);
        if !frustum.intersects_aabb(&bounds) {
            return false;
        }

        let uniforms = GrassUniforms::new(frame.view_proj, generated.config.origin, frame.time, &frame.wind);
        material.update_uniforms(queue, &uniforms);
        material.draw(pass, &generated.draw_bind_group, mesh, &generated.args);
        true
    }

    /// Release the instance and args buffers. Safe to call at any time.
    pub fn clear(&mut self) {
        if self.generated.take().is_some() {
            log::debug!("Cleared grass field");
        }
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// Instances in the generated field, 0 when cleared.
    pub fn instance_count(&self) -> u32 {
        self.generated.as_ref().map_or(0, |g| g.instance_count)
    }

    pub fn instance_buffer(&self) -> Option<&wgpu::Buffer> {
        self.generated.as_ref().map(|g| &g.instance_buffer)
    }

    /// Host copy of the current draw arguments.
    pub fn args(&self) -> Option<DrawIndexedIndirectArgs> {
        self.generated.as_ref().map(|g| *g.args.args())
    }

    pub fn args_buffer(&self) -> Option<&wgpu::Buffer> {
        self.generated.as_ref().map(|g| g.args.buffer())
    }

    /// Conservative world bounds used for frustum culling.
    ///
    /// Built from the config of the last `generate` and the bound mesh;
    /// `None` while cleared.
    pub fn draw_bounds(&self, wind: &WindParams) -> Option<Aabb> {
        let generated = self.generated.as_ref()?;
        Some(field_bounds(&generated.config, self.mesh.as_ref().map(|m| m.bounds()), wind))
    }

    /// Copy the placement records back to the host. Blocks until the GPU
    /// is idle; returns an empty list when the field isn't generated.
    pub fn read_back_records(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<PlacementRecord>> {
        let Some(generated) = &self.generated else {
            return Ok(Vec::new());
        };
        let size = generated.instance_count as u64 * generated.layout.stride();
        let bytes = read_buffer(device, queue, &generated.instance_buffer, size)?;
        generated.layout.decode(&bytes, generated.instance_count as usize)
    }

    /// Read the args buffer as the device sees it.
    pub fn read_back_args(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Option<DrawIndexedIndirectArgs>> {
        let Some(generated) = &self.generated else {
            return Ok(None);
        };
        let size = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;
        let bytes = read_buffer(device, queue, generated.args.buffer(), size)?;
        DrawIndexedIndirectArgs::from_bytes(&bytes)
            .map(Some)
            .ok_or_else(|| Error::Readback("short args buffer".to_string()))
    }

    /// World transforms for host-side instancing when indirect draws are unavailable.
    pub fn read_back_transforms(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Mat4>> {
        let Some(generated) = &self.generated else {
            return Ok(Vec::new());
        };
        let origin = generated.config.origin;
        Ok(self
            .read_back_records(device, queue)?
            .iter()
            .map(|r| r.world_transform(origin))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Camera;
    use crate::grass::mesh::MeshData;

    #[test]
    fn test_new_field_is_cleared() {
        let mut field = GrassField::new(FieldConfig::default());
        assert!(!field.is_generated());
        assert_eq!(field.instance_count(), 0);
        assert!(field.instance_buffer().is_none());
        assert!(field.args().is_none());
        field.clear();
        field.clear();
        assert!(!field.is_generated());
    }

    #[test]
    fn test_draw_bounds_cover_area() {
        let config = FieldConfig {
            area_size: Vec2::new(50.0, 20.0),
            origin: Vec3::new(10.0, 3.0, -5.0),
            ..Default::default()
        };
        let bounds = field_bounds(&config, None, &WindParams::default());
        assert!(bounds.contains_point(Vec3::new(10.0 + 25.0, 3.0, -5.0 + 10.0)));
        assert!(bounds.contains_point(Vec3::new(10.0 - 25.0, 3.0 + 500.0, -5.0 - 10.0)));
        assert!(!bounds.contains_point(Vec3::new(10.0 + 30.0, 3.0, -5.0)));
    }

    #[test]
    fn test_bounds_grow_with_mesh_and_scale() {
        let mut config = FieldConfig::default();
        let calm = WindParams { strength: 0.0, ..Default::default() };
        let mesh = MeshData::blade(3, 2.0, 4.0).bounds();
        let bare = field_bounds(&config, None, &calm);
        let with_mesh = field_bounds(&config, Some(mesh), &calm);
        assert!(with_mesh.max.x - bare.max.x >= 1.0 * config.height_variation.max_scale);
        assert!(with_mesh.max.y - bare.max.y >= 4.0 * config.height_variation.max_scale);

        config.height_variation.max_scale = 3.0;
        let taller = field_bounds(&config, Some(mesh), &calm);
        assert!(taller.max.x > with_mesh.max.x);
    }

    #[test]
    fn test_strong_wind_tips_stay_inside_bounds() {
        let config = FieldConfig::default();
        let wind = WindParams { strength: 4.0, ..Default::default() };
        let mesh = MeshData::blade(4, 0.1, 1.0).bounds();
        let bounds = field_bounds(&config, Some(mesh), &wind);

        // Edge root at x = 24.9, max scale 1.5, peak gust 1.15, influence 1.25
        let tip_x = 24.9 + 4.0 * 1.15 * 1.25;
        assert!(bounds.max.x > tip_x, "{} <= {}", bounds.max.x, tip_x);

        // A narrow camera just outside the area that only sees bent tips
        let mut camera = Camera::look_at(
            Vec3::new(tip_x - 0.5, 0.5, 60.0),
            Vec3::new(tip_x - 0.5, 0.5, 0.0),
            Vec3::Y,
        );
        camera.fov_y = 2f32.to_radians();
        let frustum = Frustum::from_view_projection(&camera.view_projection());
        assert!(frustum.intersects_aabb(&bounds));
    }

    #[test]
    fn test_cleared_field_has_no_draw_bounds() {
        let field = GrassField::new(FieldConfig::default());
        assert!(field.draw_bounds(&WindParams::default()).is_none());
    }

    #[test]
    fn test_abort_reason_display() {
        let reason = AbortReason::IdentityMismatch {
            required: "a".into(),
            found: "b".into(),
        };
        assert_eq!(reason.to_string(), "material 'b' does not match required 'a'");
        assert!(!GenerateOutcome::Aborted(reason).is_generated());
    }
}
