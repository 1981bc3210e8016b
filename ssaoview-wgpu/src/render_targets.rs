//! Render target allocation for the SSAO pipeline.
//! Backs the platform-independent `AttachmentStore` with wgpu textures.

use std::sync::Arc;

use ssaoview_render::attachment::{
    AttachmentAllocator, AttachmentDesc, AttachmentFormat, AttachmentId, AttachmentStore,
};
use ssaoview_render::{RenderError, RenderResult};

/// View-space position + linear depth.
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Encoded normal and albedo.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Single-channel occlusion term (raw and blurred).
pub const SSAO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
/// Depth format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Rotation noise tile.
pub const NOISE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

pub fn texture_format(format: AttachmentFormat) -> wgpu::TextureFormat {
    match format {
        AttachmentFormat::Rgba32Float => POSITION_FORMAT,
        AttachmentFormat::Rgba8Unorm => COLOR_FORMAT,
        AttachmentFormat::R8Unorm => SSAO_FORMAT,
        AttachmentFormat::Depth32Float => DEPTH_FORMAT,
    }
}

/// A GPU attachment. Dropping it releases the texture.
pub struct GpuAttachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub type GpuAttachmentStore = AttachmentStore<WgpuAllocator>;

/// View of an allocated attachment.
pub fn attachment_view(store: &GpuAttachmentStore, id: AttachmentId) -> RenderResult<&wgpu::TextureView> {
    Ok(&store.expect(id)?.image().view)
}

/// Allocates attachments that are both render targets and sampled textures.
pub struct WgpuAllocator {
    device: Arc<wgpu::Device>,
}

impl WgpuAllocator {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }
}

impl AttachmentAllocator for WgpuAllocator {
    type Image = GpuAttachment;

    fn allocate(&mut self, desc: &AttachmentDesc) -> RenderResult<GpuAttachment> {
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.id.label()),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = oom.or(validation) {
            return Err(RenderError::Allocation {
                label: desc.id.label().into(),
                reason: err.to_string(),
            });
        }
        Ok(GpuAttachment { texture, view })
    }
}
