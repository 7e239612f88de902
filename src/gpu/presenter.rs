// ============================================================================
// PRESENTER — draws the raster texture with the viewport projection
// ============================================================================
//
// The viewer owns its own wgpu device (eframe keeps its device private), so
// each frame is drawn into an offscreen target, read back, and handed to egui
// as an ordinary texture. Frames are only drawn when the view changes.
// ============================================================================

use bytemuck::{Pod, Zeroable};

use super::context::GpuContext;
use super::texture::RasterTexture;
use super::{GpuError, aligned_bytes_per_row, shaders};
use crate::raster::RasterImage;
use crate::viewport::Mat4;

use wgpu::util::DeviceExt;

/// Output format of the offscreen target and the readback.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ============================================================================
// UNIFORM TYPES
// ============================================================================

/// Projection matrix + image size, uploaded as a uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ViewUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub image_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl ViewUniforms {
    pub fn new(matrix: &Mat4, image_width: u32, image_height: u32) -> Self {
        Self {
            view_proj: matrix.to_cols_array(),
            image_size: [image_width as f32, image_height as f32],
            _pad: [0.0; 2],
        }
    }
}

/// Sampling filters for minification and magnification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingMode {
    pub min: wgpu::FilterMode,
    pub mag: wgpu::FilterMode,
}

impl Default for SamplingMode {
    /// Smooth when zoomed out, crisp pixels when zoomed in.
    fn default() -> Self {
        Self {
            min: wgpu::FilterMode::Linear,
            mag: wgpu::FilterMode::Nearest,
        }
    }
}

struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

// ============================================================================
// PRESENTER
// ============================================================================

pub struct Presenter {
    ctx: GpuContext,
    pipeline: wgpu::RenderPipeline,
    texture_bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    raster: Option<RasterTexture>,
    target: Option<RenderTarget>,
    clear_color: wgpu::Color,
    /// Cached staging buffer for readback, reused while large enough.
    cached_staging: Option<(wgpu::Buffer, u64)>,
}

impl Presenter {
    pub fn new(ctx: GpuContext, sampling: SamplingMode, background: [u8; 3]) -> Self {
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raster_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::RASTER_SHADER.into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("view_bgl"),
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

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("raster_tex_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raster_pipeline_layout"),
            bind_group_layouts: &[&uniform_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        // Straight (unpremultiplied) alpha over the clear colour.
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("raster_pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("raster_sampler"),
            mag_filter: sampling.mag,
            min_filter: sampling.min,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = ViewUniforms::new(&Mat4::IDENTITY, 1, 1);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("view_uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("view_bind_group"),
            layout: &uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let [r, g, b] = background;
        let clear_color = wgpu::Color {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: 1.0,
        };

        Self {
            ctx,
            pipeline,
            texture_bgl,
            sampler,
            uniform_buffer,
            uniform_bind_group,
            raster: None,
            target: None,
            clear_color,
            cached_staging: None,
        }
    }

    pub fn adapter_name(&self) -> &str {
        &self.ctx.adapter_name
    }

    /// Upload the raster. Replaces any previous one. The caller drops its CPU
    /// copy afterwards.
    pub fn upload(&mut self, image: &RasterImage) -> Result<&RasterTexture, GpuError> {
        let texture = RasterTexture::upload(&self.ctx, &self.texture_bgl, &self.sampler, image)?;
        Ok(self.raster.insert(texture))
    }

    pub fn has_raster(&self) -> bool {
        self.raster.is_some()
    }

    /// Draw the raster with `matrix` into a `width × height` target and read
    /// the result back as tightly packed RGBA8.
    pub fn render(&mut self, matrix: &Mat4, width: u32, height: u32) -> Result<Vec<u8>, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::EmptyViewport);
        }
        if !self.ctx.supports_size(width, height) {
            return Err(GpuError::TextureTooLarge {
                width: width as usize,
                height: height as usize,
                max: self.ctx.max_texture_dim,
            });
        }
        self.ensure_target(width, height);
        let Some(target) = self.target.as_ref() else {
            return Err(GpuError::EmptyViewport);
        };

        if let Some(raster) = &self.raster {
            let uniforms = ViewUniforms::new(matrix, raster.width, raster.height);
            self.ctx
                .queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("raster_frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("raster_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some(raster) = &self.raster {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_bind_group(1, &raster.bind_group, &[]);
                pass.draw(0..6, 0..1);
            }
        }
        self.ctx.submit_one(encoder);

        readback_texture(&self.ctx, &target.texture, width, height, &mut self.cached_staging)
    }

    fn ensure_target(&mut self, width: u32, height: u32) {
        if let Some(t) = &self.target
            && t.width == width
            && t.height == height
        {
            return;
        }
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("raster_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.target = Some(RenderTarget {
            texture,
            view,
            width,
            height,
        });
    }
}

/// Copy an RGBA8 texture into CPU memory, dropping the row padding wgpu
/// requires for buffer copies.
fn readback_texture(
    ctx: &GpuContext,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    cached_staging: &mut Option<(wgpu::Buffer, u64)>,
) -> Result<Vec<u8>, GpuError> {
    let device = &ctx.device;

    let bytes_per_row = aligned_bytes_per_row(width);
    let buffer_size = (bytes_per_row * height) as u64;

    let reuse = matches!(cached_staging, Some((_, sz)) if *sz >= buffer_size);
    if !reuse {
        let new_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging"),
            size: buffer_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        *cached_staging = Some((new_buf, buffer_size));
    }
    let Some((staging, _)) = cached_staging.as_ref() else {
        return Err(GpuError::Readback("staging buffer missing".to_string()));
    };

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("readback_encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    ctx.submit_one(encoder);

    let slice = staging.slice(..buffer_size);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(GpuError::Readback(format!("map error: {:?}", e))),
        Err(e) => return Err(GpuError::Readback(format!("channel error: {:?}", e))),
    }

    let mapped = slice.get_mapped_range();
    let pixels = super::strip_row_padding(&mapped, width * 4, bytes_per_row, height);
    drop(mapped);
    staging.unmap();

    Ok(pixels)
}
