//! Optional terrain input: height map plus world placement.
//!
//! The kernel samples the height map nearest-texel at the blade's world XZ
//! mapped into terrain UV space, clamped to the edge.

use std::path::Path;

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::core::{Result, Vec2, Vec3};

/// Row-major height samples in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct HeightMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl HeightMap {
    /// Wrap raw samples. Returns `None` if the size doesn't match.
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != (width * height) as usize {
            return None;
        }
        Some(Self { width, height, data })
    }

    /// Constant-height map.
    pub fn flat(width: u32, height: u32, value: f32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            data: vec![value; (width * height) as usize],
        }
    }

    /// Convert any image to 16-bit luma and normalize to [0, 1].
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let luma = image.to_luma16();
        let (width, height) = luma.dimensions();
        let data = luma.pixels().map(|p| p.0[0] as f32 / u16::MAX as f32).collect();
        Self { width, height, data }
    }

    /// Load a height map image from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path.as_ref())?;
        let map = Self::from_image(&image);
        log::info!(
            "Loaded height map {} ({}x{})",
            path.as_ref().display(), map.width, map.height
        );
        Ok(map)
    }

    /// Procedural FBM height map, remapped to [0, 1].
    ///
    /// `scale` is the number of texels per noise unit (larger = smoother).
    pub fn from_fbm(width: u32, height: u32, seed: u32, scale: f64, octaves: usize) -> Self {
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(octaves)
            .set_persistence(0.5)
            .set_lacunarity(2.0);

        let (width, height) = (width.max(1), height.max(1));
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = noise.get([x as f64 / scale, y as f64 / scale]);
                data.push(((v + 1.0) * 0.5).clamp(0.0, 1.0) as f32);
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// True if both dimensions fit a 2D texture of at most `max_dimension` texels.
    pub fn fits_texture(&self, max_dimension: u32) -> bool {
        self.width <= max_dimension && self.height <= max_dimension
    }

    /// Nearest-texel lookup, clamped to the edge. Mirrors the shader's `textureLoad`.
    pub fn sample_nearest(&self, uv: Vec2) -> f32 {
        let tx = ((uv.x * self.width as f32).floor() as i32).clamp(0, self.width as i32 - 1);
        let ty = ((uv.y * self.height as f32).floor() as i32).clamp(0, self.height as i32 - 1);
        self.data[(ty as u32 * self.width + tx as u32) as usize]
    }

    /// Upload as an `R32Float` texture for `textureLoad` in the kernel.
    pub fn create_texture(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("grass_height_map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&self.data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            size,
        );
        texture
    }
}

/// Terrain the field conforms to.
#[derive(Clone, Debug)]
pub struct TerrainSampler {
    pub height_map: HeightMap,
    /// World units per unit of height-map value.
    pub displacement_strength: f32,
    /// World position of the terrain's min corner.
    pub position: Vec3,
    /// World-space extent (x, height, z).
    pub size: Vec3,
}

impl TerrainSampler {
    /// False for zero or non-finite extents, which would make UVs meaningless.
    pub fn is_usable(&self) -> bool {
        self.size.x > 0.0
            && self.size.z > 0.0
            && self.size.is_finite()
            && self.position.is_finite()
            && self.displacement_strength.is_finite()
    }

    /// Terrain UV of a field-local XZ position.
    pub fn uv(&self, origin: Vec3, local_xz: Vec2) -> Vec2 {
        let world = Vec2::new(origin.x, origin.z) + local_xz;
        (world - Vec2::new(self.position.x, self.position.z)) / Vec2::new(self.size.x, self.size.z)
    }

    /// Field-local Y that puts a blade base on the terrain surface.
    pub fn displaced_height(&self, origin: Vec3, local_xz: Vec2) -> f32 {
        let h = self.height_map.sample_nearest(self.uv(origin, local_xz));
        h * self.displacement_strength + self.position.y - origin.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightMap {
        // 4x2, value = column index / 4
        let data = (0..8).map(|i| (i % 4) as f32 / 4.0).collect();
        HeightMap::from_raw(4, 2, data).unwrap()
    }

    #[test]
    fn test_from_raw_rejects_mismatch() {
        assert!(HeightMap::from_raw(2, 2, vec![0.0; 3]).is_none());
        assert!(HeightMap::from_raw(0, 2, vec![]).is_none());
    }

    #[test]
    fn test_sample_nearest() {
        let map = ramp();
        assert_eq!(map.sample_nearest(Vec2::new(0.0, 0.0)), 0.0);
        assert_eq!(map.sample_nearest(Vec2::new(0.3, 0.9)), 0.25);
        assert_eq!(map.sample_nearest(Vec2::new(0.99, 0.5)), 0.75);
    }

    #[test]
    fn test_sample_clamps_outside() {
        let map = ramp();
        assert_eq!(map.sample_nearest(Vec2::new(-3.0, -1.0)), 0.0);
        assert_eq!(map.sample_nearest(Vec2::new(5.0, 9.0)), 0.75);
    }

    #[test]
    fn test_displaced_height() {
        let terrain = TerrainSampler {
            height_map: ramp(),
            displacement_strength: 8.0,
            position: Vec3::new(0.0, 1.0, 0.0),
            size: Vec3::new(40.0, 8.0, 40.0),
        };
        let origin = Vec3::new(20.0, 0.5, 20.0);
        // Field center maps to uv (0.5, 0.5) -> column 2 -> 0.5
        let y = terrain.displaced_height(origin, Vec2::ZERO);
        assert!((y - (0.5 * 8.0 + 1.0 - 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_fits_texture() {
        let map = HeightMap::flat(8193, 4, 0.0);
        assert!(!map.fits_texture(8192));
        assert!(map.fits_texture(8193));
        assert!(HeightMap::flat(4, 8192, 0.0).fits_texture(8192));
    }

    #[test]
    fn test_unusable_terrain() {
        let terrain = TerrainSampler {
            height_map: HeightMap::flat(1, 1, 0.0),
            displacement_strength: 1.0,
            position: Vec3::ZERO,
            size: Vec3::new(0.0, 1.0, 10.0),
        };
        assert!(!terrain.is_usable());
    }

    #[test]
    fn test_fbm_range() {
        let map = HeightMap::from_fbm(32, 16, 7, 8.0, 4);
        assert_eq!(map.data().len(), 32 * 16);
        assert!(map.data().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_ne!(map.data()[0], map.data()[100]);
    }

    #[test]
    fn test_from_image_normalizes() {
        let mut img = image::GrayImage::new(2, 1);
        img.put_pixel(0, 0, image::Luma([0]));
        img.put_pixel(1, 0, image::Luma([255]));
        let map = HeightMap::from_image(&image::DynamicImage::ImageLuma8(img));
        assert_eq!(map.width(), 2);
        assert_eq!(map.data()[0], 0.0);
        assert!((map.data()[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("height.png");
        image::GrayImage::from_pixel(3, 3, image::Luma([128])).save(&path).unwrap();
        let map = HeightMap::load(&path).unwrap();
        assert_eq!((map.width(), map.height()), (3, 3));
        assert!((map.data()[4] - 128.0 / 255.0).abs() < 1e-3);
    }
}
