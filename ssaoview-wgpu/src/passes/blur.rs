//! SSAO blur pass bindings.

use ssaoview_render::attachment::AttachmentId;
use ssaoview_render::RenderResult;

use crate::render_targets::{attachment_view, GpuAttachmentStore};
use crate::resources::SsaoResources;

pub fn create_blur_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    store: &GpuAttachmentStore,
    resources: &SsaoResources,
) -> RenderResult<wgpu::BindGroup> {
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSAO Blur Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(attachment_view(store, AttachmentId::Ssao)?),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&resources.color_sampler),
            },
        ],
    }))
}
