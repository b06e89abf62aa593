//! Headless GPU context management using wgpu

use crate::core::error::Error;

/// GPU context without a presentation surface
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a context on the best available adapter
    pub async fn headless() -> Result<Self, Error> {
        Self::with_options(false).await
    }

    /// Create a context, optionally forcing the software fallback adapter
    pub async fn with_options(force_fallback_adapter: bool) -> Result<Self, Error> {
        let instance_desc = wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        };
        let instance = wgpu::Instance::new(&instance_desc);

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .map_err(|e| Error::Gpu(format!("No suitable adapter found: {:?}", e)))?;

        let adapter_limits = adapter.limits();

        let device_desc = wgpu::DeviceDescriptor {
            label: Some("grassfield_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits {
                max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
                max_buffer_size: adapter_limits.max_buffer_size,
                ..Default::default()
            },
            memory_hints: wgpu::MemoryHints::Performance,
            experimental_features: Default::default(),
            trace: Default::default(),
        };

        let (device, queue) = adapter
            .request_device(&device_desc)
            .await
            .map_err(|e| Error::Gpu(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);
        log::info!("GPU buffer limits: max_buffer_size={}MB, max_storage_binding={}MB",
            adapter_limits.max_buffer_size / 1024 / 1024,
            adapter_limits.max_storage_buffer_binding_size / 1024 / 1024);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Largest instance buffer the device can bind as storage
    pub fn max_storage_binding(&self) -> u64 {
        max_storage_binding(&self.device)
    }
}

/// Largest buffer `device` can bind as storage, limited by its max buffer size
pub fn max_storage_binding(device: &wgpu::Device) -> u64 {
    let limits = device.limits();
    (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
}
