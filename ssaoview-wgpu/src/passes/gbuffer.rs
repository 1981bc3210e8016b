//! G-Buffer geometry pass bindings: SceneParams in group 0. Materials come
//! per draw from the mesh store in group 1.

use crate::resources::SsaoResources;

pub fn create_gbuffer_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    resources: &SsaoResources,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("GBuffer Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: resources.scene_buffer.as_entire_binding(),
        }],
    })
}
