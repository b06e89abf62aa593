//! Indirect draw arguments for the single instanced grass draw.

use bytemuck::{Pod, Zeroable};

use crate::grass::mesh::SubMesh;

/// `draw_indexed_indirect` argument block (20 bytes).
///
/// Layout is fixed by wgpu: index count, instance count, first index,
/// base vertex, first instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    /// Arguments drawing `instance_count` copies of `mesh`.
    ///
    /// Without a mesh the index range is empty, so a stray draw renders nothing.
    pub fn for_mesh(mesh: Option<&SubMesh>, instance_count: u32) -> Self {
        match mesh {
            Some(m) => Self {
                index_count: m.index_count,
                instance_count,
                first_index: m.first_index,
                base_vertex: m.base_vertex,
                first_instance: 0,
            },
            None => Self {
                instance_count,
                ..Self::default()
            },
        }
    }

    /// The five values as stored in the buffer.
    pub fn to_words(&self) -> [u32; 5] {
        bytemuck::cast(*self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..std::mem::size_of::<Self>())?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }
}

/// Device buffer holding one argument block.
pub struct ArgsBuffer {
    buffer: wgpu::Buffer,
    args: DrawIndexedIndirectArgs,
}

impl ArgsBuffer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, args: DrawIndexedIndirectArgs) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grass_draw_args"),
            size: std::mem::size_of::<DrawIndexedIndirectArgs>() as u64,
            usage: wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        queue.write_buffer(&buffer, 0, bytemuck::bytes_of(&args));
        Self { buffer, args }
    }

    /// Rewrite the block (mesh swapped while a field exists).
    pub fn update(&mut self, queue: &wgpu::Queue, args: DrawIndexedIndirectArgs) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&args));
        self.args = args;
    }

    /// Host copy of the last uploaded arguments.
    pub fn args(&self) -> &DrawIndexedIndirectArgs {
        &self.args
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
