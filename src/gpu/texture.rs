// ============================================================================
// RASTER TEXTURE — the decoded image, uploaded once
// ============================================================================

use super::GpuError;
use super::context::GpuContext;
use crate::raster::{PixelFormat, RasterImage};

/// A GPU-side copy of a decoded raster. The CPU buffer can be dropped as soon
/// as this exists.
pub struct RasterTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    /// 16-bit samples were reduced to 8 bits because the device lacks
    /// `Rgba16Unorm` support.
    pub narrowed: bool,
}

impl RasterTexture {
    pub fn upload(
        ctx: &GpuContext,
        bind_group_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        image: &RasterImage,
    ) -> Result<Self, GpuError> {
        let width = u32::try_from(image.width()).map_err(|_| GpuError::too_large(ctx, image))?;
        let height = u32::try_from(image.height()).map_err(|_| GpuError::too_large(ctx, image))?;
        if !ctx.supports_size(width, height) {
            return Err(GpuError::too_large(ctx, image));
        }

        let narrowed_bytes;
        let (format, data, bytes_per_pixel, narrowed) = match image.pixel_format() {
            PixelFormat::Rgba8 => (wgpu::TextureFormat::Rgba8Unorm, image.as_bytes(), 4, false),
            PixelFormat::Rgba16 if ctx.supports_16bit_norm => {
                (wgpu::TextureFormat::Rgba16Unorm, image.as_bytes(), 8, false)
            }
            PixelFormat::Rgba16 => {
                narrowed_bytes = super::narrow_rgba16(image.as_bytes());
                (wgpu::TextureFormat::Rgba8Unorm, narrowed_bytes.as_slice(), 4, true)
            }
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("RasterTexture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_pixel * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("RasterTexture bind group"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Ok(Self {
            texture,
            view,
            bind_group,
            width,
            height,
            format,
            narrowed,
        })
    }
}
