//! GPU resources that survive resizes: parameter buffers, the SSAO kernel and
//! noise tile, samplers, and the default material texture.

use wgpu::util::DeviceExt;

use ssaoview_gpu_shared::uniforms::{SSAOParams, SceneParams};
use ssaoview_render::kernel::{Kernel, NoiseTile};
use ssaoview_render::uniform_blocks::{UniformBlock, UniformBlockManager};

use crate::pipeline::create_material_bgl;
use crate::render_targets::NOISE_FORMAT;

pub struct SsaoResources {
    pub scene_buffer: wgpu::Buffer,
    pub ssao_params_buffer: wgpu::Buffer,
    pub kernel_buffer: wgpu::Buffer,
    pub noise_texture: wgpu::Texture,
    pub noise_view: wgpu::TextureView,
    /// Nearest, clamp-to-edge. Used for every attachment read.
    pub color_sampler: wgpu::Sampler,
    /// Nearest, repeat. The noise holds discrete rotations, never interpolated.
    pub noise_sampler: wgpu::Sampler,
    pub material_sampler: wgpu::Sampler,
    pub default_texture: wgpu::Texture,
    pub default_texture_view: wgpu::TextureView,
    pub material_bgl: wgpu::BindGroupLayout,
}

impl SsaoResources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, kernel: &Kernel, noise: &NoiseTile) -> Self {
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Params"),
            size: std::mem::size_of::<SceneParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let ssao_params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SSAO Params"),
            size: std::mem::size_of::<SSAOParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Uploaded once, never rewritten.
        let kernel_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SSAO Kernel"),
            contents: bytemuck::bytes_of(&kernel.to_uniform()),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let noise_size = wgpu::Extent3d {
            width: noise.dim(),
            height: noise.dim(),
            depth_or_array_layers: 1,
        };
        let noise_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SSAO Noise"),
            size: noise_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: NOISE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &noise_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &noise.to_bytes(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(16 * noise.dim()),
                rows_per_image: Some(noise.dim()),
            },
            noise_size,
        );
        let noise_view = noise_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let color_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Attachment Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let noise_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Noise Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let (default_texture, default_texture_view) =
            create_rgba_texture(device, queue, "Default White Texture", &[255, 255, 255, 255], 1, 1);

        let material_bgl = create_material_bgl(device);

        Self {
            scene_buffer,
            ssao_params_buffer,
            kernel_buffer,
            noise_texture,
            noise_view,
            color_sampler,
            noise_sampler,
            material_sampler,
            default_texture,
            default_texture_view,
            material_bgl,
        }
    }

    pub fn buffer(&self, block: UniformBlock) -> &wgpu::Buffer {
        match block {
            UniformBlock::Scene => &self.scene_buffer,
            UniformBlock::Ssao => &self.ssao_params_buffer,
        }
    }

    /// Upload every dirty parameter block. Writes are ordered before the next submit.
    pub fn flush(&self, queue: &wgpu::Queue, blocks: &mut UniformBlockManager) {
        for block in blocks.take_dirty() {
            log::trace!("Uploading {block:?} parameter block");
            queue.write_buffer(self.buffer(block), 0, blocks.bytes(block));
        }
    }
}

/// Create a sampled sRGB texture from tightly packed RGBA8 pixels.
pub fn create_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    pixels: &[u8],
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
