//! Blocking GPU-to-host buffer copies

use crate::core::{Error, Result};

/// Copy `size` bytes from the start of `source` into host memory.
///
/// `source` needs `COPY_SRC`. Waits for the queue to drain, so keep this out
/// of per-frame paths.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>> {
    if size == 0 {
        return Ok(Vec::new());
    }
    if size > source.size() {
        return Err(Error::Readback(format!(
            "requested {} bytes from a {} byte buffer", size, source.size()
        )));
    }

    // Copies must be 4-byte aligned
    let padded = size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("readback_staging"),
        size: padded,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, padded.min(source.size()));
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
        .map_err(|e| Error::Readback(e.to_string()))?;

    rx.recv()
        .map_err(|e| Error::Readback(e.to_string()))?
        .map_err(|e| Error::Readback(e.to_string()))?;

    let data = slice.get_mapped_range();
    let bytes = data[..size as usize].to_vec();
    drop(data);
    staging.unmap();

    log::trace!("Read back {} bytes", size);
    Ok(bytes)
}
