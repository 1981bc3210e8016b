//! Composition pass bindings: every GBuffer target, both SSAO maps and the toggles.

use ssaoview_render::attachment::AttachmentId;
use ssaoview_render::RenderResult;

use crate::render_targets::{attachment_view, GpuAttachmentStore};
use crate::resources::SsaoResources;

const INPUTS: [AttachmentId; 5] = [
    AttachmentId::Position,
    AttachmentId::Normal,
    AttachmentId::Albedo,
    AttachmentId::Ssao,
    AttachmentId::SsaoBlur,
];

pub fn create_composition_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    store: &GpuAttachmentStore,
    resources: &SsaoResources,
) -> RenderResult<wgpu::BindGroup> {
    let mut entries = Vec::with_capacity(INPUTS.len() + 2);
    for (binding, id) in INPUTS.into_iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: wgpu::BindingResource::TextureView(attachment_view(store, id)?),
        });
    }
    entries.push(wgpu::BindGroupEntry {
        binding: 5,
        resource: resources.ssao_params_buffer.as_entire_binding(),
    });
    entries.push(wgpu::BindGroupEntry {
        binding: 6,
        resource: wgpu::BindingResource::Sampler(&resources.color_sampler),
    });

    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Composition Bind Group"),
        layout,
        entries: &entries,
    }))
}
