//! Reference blade mesh drawn once per instance.

use bytemuck::{Pod, Zeroable};

use crate::core::{Error, Result, Vec3};
use crate::math::Aabb;

/// Blade vertex (16 bytes). `tip` is 0 at the root and 1 at the tip and
/// drives wind bending in the vertex shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GrassVertex {
    pub position: [f32; 3],
    pub tip: f32,
}

impl GrassVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GrassVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Index range of the mesh inside its buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubMesh {
    pub index_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
}

/// CPU-side triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<GrassVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Tapered blade with `segments` vertical sections, root at the origin,
    /// facing +Z with a slight forward curve.
    pub fn blade(segments: u32, width: f32, height: f32) -> Self {
        let segments = segments.max(1);
        let mut vertices = Vec::with_capacity(segments as usize * 2 + 1);
        for s in 0..segments {
            let t = s as f32 / segments as f32;
            let half = width * 0.5 * (1.0 - t);
            let y = t * height;
            let z = 0.1 * height * t * t;
            vertices.push(GrassVertex { position: [-half, y, z], tip: t });
            vertices.push(GrassVertex { position: [half, y, z], tip: t });
        }
        vertices.push(GrassVertex { position: [0.0, height, 0.1 * height], tip: 1.0 });

        let mut indices = Vec::with_capacity(((segments - 1) * 6 + 3) as usize);
        for s in 0..segments - 1 {
            let l0 = s * 2;
            let (r0, l1, r1) = (l0 + 1, l0 + 2, l0 + 3);
            indices.extend_from_slice(&[l0, r0, r1, l0, r1, l1]);
        }
        let last = (segments - 1) * 2;
        indices.extend_from_slice(&[last, last + 1, segments * 2]);

        Self { vertices, indices }
    }

    /// Check indices against the vertex count.
    pub fn validate(&self) -> Result<()> {
        if self.indices.is_empty() || self.indices.len() % 3 != 0 {
            return Err(Error::Config(format!(
                "mesh needs a non-empty triangle list, got {} indices", self.indices.len()
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(Error::Config(format!(
                "index {} out of range for {} vertices", bad, self.vertices.len()
            )));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Aabb {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next().unwrap_or(Vec3::ZERO);
        let mut aabb = Aabb::new(first, first);
        for p in iter {
            aabb.expand(p);
        }
        aabb
    }
}

/// Device-resident reference mesh.
pub struct ReferenceMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    submesh: SubMesh,
    bounds: Aabb,
}

impl ReferenceMesh {
    /// Upload a whole mesh; the submesh spans every index.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, data: &MeshData) -> Result<Self> {
        let submesh = SubMesh {
            index_count: data.indices.len() as u32,
            first_index: 0,
            base_vertex: 0,
        };
        Self::with_submesh(device, queue, data, submesh)
    }

    /// Upload shared buffers and draw only `submesh` out of them.
    pub fn with_submesh(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &MeshData,
        submesh: SubMesh,
    ) -> Result<Self> {
        data.validate()?;
        let end = submesh.first_index as u64 + submesh.index_count as u64;
        if submesh.index_count == 0 || end > data.indices.len() as u64 {
            return Err(Error::Config(format!(
                "submesh {:?} outside {} indices", submesh, data.indices.len()
            )));
        }

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_blade_vertices"),
            size: std::mem::size_of_val(data.vertices.as_slice()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&data.vertices));

        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_blade_indices"),
            size: std::mem::size_of_val(data.indices.as_slice()) as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&data.indices));

        Ok(Self {
            vertex_buffer,
            index_buffer,
            submesh,
            bounds: data.bounds(),
        })
    }

    pub fn submesh(&self) -> &SubMesh {
        &self.submesh
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }
}
