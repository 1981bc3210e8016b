//! Per-pass descriptor sets. Rebuilt whenever the attachments are recreated.

pub mod blur;
pub mod composition;
pub mod gbuffer;
pub mod ssao;

use std::collections::HashMap;

use ssaoview_render::pass::PassId;
use ssaoview_render::{RenderError, RenderResult};

use crate::pipeline::PipelineStateFactory;
use crate::render_targets::GpuAttachmentStore;
use crate::resources::SsaoResources;

pub struct PassBindGroups {
    groups: HashMap<PassId, wgpu::BindGroup>,
}

impl PassBindGroups {
    pub fn new(
        device: &wgpu::Device,
        factory: &PipelineStateFactory,
        store: &GpuAttachmentStore,
        resources: &SsaoResources,
    ) -> RenderResult<Self> {
        let mut groups = HashMap::new();
        for pass in PassId::ALL {
            let layout = &factory.get(pass)?.bind_group_layout;
            let group = match pass {
                PassId::GBuffer => gbuffer::create_gbuffer_bind_group(device, layout, resources),
                PassId::Ssao => ssao::create_ssao_bind_group(device, layout, store, resources)?,
                PassId::Blur => blur::create_blur_bind_group(device, layout, store, resources)?,
                PassId::Composition => {
                    composition::create_composition_bind_group(device, layout, store, resources)?
                }
            };
            groups.insert(pass, group);
        }
        Ok(Self { groups })
    }

    pub fn get(&self, pass: PassId) -> RenderResult<&wgpu::BindGroup> {
        self.groups
            .get(&pass)
            .ok_or_else(|| RenderError::device(format!("no bind group for {}", pass.label())))
    }
}
