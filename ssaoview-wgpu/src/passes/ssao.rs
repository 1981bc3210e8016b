//! SSAO pass bindings: GBuffer position/normal, noise tile, kernel, parameters.

use ssaoview_render::attachment::AttachmentId;
use ssaoview_render::RenderResult;

use crate::render_targets::{attachment_view, GpuAttachmentStore};
use crate::resources::SsaoResources;

pub fn create_ssao_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    store: &GpuAttachmentStore,
    resources: &SsaoResources,
) -> RenderResult<wgpu::BindGroup> {
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSAO Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(attachment_view(store, AttachmentId::Position)?),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(attachment_view(store, AttachmentId::Normal)?),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&resources.noise_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: resources.kernel_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: resources.ssao_params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: wgpu::BindingResource::Sampler(&resources.color_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: wgpu::BindingResource::Sampler(&resources.noise_sampler),
            },
        ],
    }))
}
