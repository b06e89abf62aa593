//! Grass placement compute pipeline

use crate::grass::dispatch::DispatchSize;
use crate::grass::params::PlacementParams;
use crate::grass::record::RecordLayout;

/// Entry point of the placement kernel.
pub const PLACEMENT_ENTRY_POINT: &str = "place_grass";

const PLACEMENT_SOURCE: &str = include_str!("../../../shaders/grass_placement.wgsl");

/// Kernel source specialized for a record layout.
pub fn placement_source(layout: RecordLayout) -> String {
    format!("{}{}", layout.wgsl_prelude(), PLACEMENT_SOURCE)
}

/// Placement compute pipeline, one variant per record layout
pub struct PlacementPipeline {
    basic: wgpu::ComputePipeline,
    shaded: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    #[allow(dead_code)]
    flat_height: wgpu::Texture,
    flat_height_view: wgpu::TextureView,
}

impl PlacementPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_placement_params"),
            size: std::mem::size_of::<PlacementParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Group 0: instance buffer, params, height map
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grass_placement_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grass_placement_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let basic = Self::create_pipeline(device, &pipeline_layout, RecordLayout::Basic);
        let shaded = Self::create_pipeline(device, &pipeline_layout, RecordLayout::Shaded);

        // Bound when the field has no terrain; never sampled
        let flat_height = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("grass_flat_height"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let flat_height_view = flat_height.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            basic,
            shaded,
            bind_group_layout,
            params_buffer,
            flat_height,
            flat_height_view,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        pipeline_layout: &wgpu::PipelineLayout,
        layout: RecordLayout,
    ) -> wgpu::ComputePipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grass_placement_shader"),
            source: wgpu::ShaderSource::Wgsl(placement_source(layout).into()),
        });

        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(match layout {
                RecordLayout::Basic => "grass_placement_pipeline",
                RecordLayout::Shaded => "grass_placement_shaded_pipeline",
            }),
            layout: Some(pipeline_layout),
            module: &shader,
            entry_point: Some(PLACEMENT_ENTRY_POINT),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    pub fn update_params(&self, queue: &wgpu::Queue, params: &PlacementParams) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
    }

    /// Bind `instance_buffer` and an optional height map.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        instance_buffer: &wgpu::Buffer,
        height_view: Option<&wgpu::TextureView>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grass_placement_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: instance_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        height_view.unwrap_or(&self.flat_height_view),
                    ),
                },
            ],
        })
    }

    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        layout: RecordLayout,
        bind_group: &wgpu::BindGroup,
        size: DispatchSize,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("grass_placement_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(match layout {
            RecordLayout::Basic => &self.basic,
            RecordLayout::Shaded => &self.shaded,
        });
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(size.x, size.y, size.z);
    }
}
