//! Instanced grass render pipeline (the field's material)

use crate::grass::args::ArgsBuffer;
use crate::grass::mesh::{GrassVertex, ReferenceMesh};
use crate::grass::params::GrassUniforms;
use crate::grass::record::RecordLayout;

/// Identity of the built-in instanced grass shader.
pub const GRASS_SHADER_IDENTITY: &str = "grassfield/instanced_grass";

const GRASS_DRAW_SOURCE: &str = include_str!("../../../shaders/grass_instanced.wgsl");

/// Render pipeline plus the per-frame uniforms it reads.
///
/// Group 0 holds [`GrassUniforms`], group 1 the field's instance buffer.
pub struct GrassMaterial {
    identity: String,
    layout: RecordLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_bind_group_layout: wgpu::BindGroupLayout,
}

impl GrassMaterial {
    /// Built-in grass material.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        layout: RecordLayout,
    ) -> Self {
        Self::from_wgsl(device, color_format, depth_format, layout, GRASS_SHADER_IDENTITY, GRASS_DRAW_SOURCE)
    }

    /// Material from custom WGSL honoring the same bindings and `vs_main`/`fs_main`
    /// entry points. `RECORD_FLOATS` is prepended for `layout`.
    pub fn from_wgsl(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        layout: RecordLayout,
        identity: &str,
        source: &str,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_draw_shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{}{}", layout.wgsl_prelude(), source).into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_uniforms"),
            size: std::mem::size_of::<GrassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Group 0: frame uniforms
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_uniform_bg"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Group 1: placement records
        let instance_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("grass_instance_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_draw_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &instance_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grass_draw_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GrassVertex::desc()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Blades are single-sided quads seen from both sides
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("Created grass material '{}' ({:?} records)", identity, layout);

        Self {
            identity: identity.to_string(),
            layout,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            instance_bind_group_layout,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Record layout the vertex shader was built for.
    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    pub fn create_instance_bind_group(
        &self,
        device: &wgpu::Device,
        instance_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_instance_bg"),
            layout: &self.instance_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: instance_buffer.as_entire_binding(),
            }],
        })
    }

    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &GrassUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Issue the single indirect instanced draw.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        instance_bind_group: &wgpu::BindGroup,
        mesh: &ReferenceMesh,
        args: &ArgsBuffer,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, instance_bind_group, &[]);
        pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
        pass.set_index_buffer(mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed_indirect(args.buffer(), 0);
    }
}
