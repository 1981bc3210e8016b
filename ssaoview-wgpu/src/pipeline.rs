//! Render pipeline creation for the four SSAO pipeline passes.
//! Each pass gets one pipeline and one bind group layout, stored by `PassId`.

use std::collections::HashMap;

use ssaoview_gpu_shared::shaders;
use ssaoview_gpu_shared::uniforms::SSAO_KERNEL_SIZE;
use ssaoview_render::config::RendererConfig;
use ssaoview_render::pass::PassId;
use ssaoview_render::{RenderError, RenderResult};

use crate::geometry::Vertex;
use crate::render_targets::{COLOR_FORMAT, DEPTH_FORMAT, POSITION_FORMAT, SSAO_FORMAT};

/// Shared fullscreen vertex state (vertex-index full-screen triangle).
fn fullscreen_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_main"),
        compilation_options: wgpu::PipelineCompilationOptions::default(),
        buffers: &[],
    }
}

/// Depth state of the GBuffer pass.
fn depth_stencil_rw() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Depth state for a pass that only carries the depth view for compatibility.
fn depth_stencil_passthrough() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Attachments are sampled with a nearest sampler, and `Rgba32Float` is not
/// filterable without an extra feature, so every attachment read is unfilterable.
fn attachment_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

// ============================================================
// Bind group layouts
// ============================================================

/// GBuffer group 0: SceneParams (vertex + fragment).
pub fn create_gbuffer_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("GBuffer BGL"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
    })
}

/// GBuffer group 1, one per draw: base colour texture + sampler.
pub fn create_material_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material BGL"),
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
            sampler_entry(1, wgpu::SamplerBindingType::Filtering),
        ],
    })
}

/// SSAO bind group layout, matches ssao_frag.wgsl:
///   0: g_position, 1: g_normal, 2: noise_texture
///   3: uniform SSAOKernel, 4: uniform SSAOParams
///   5: color_sampler, 6: noise_sampler
pub fn create_ssao_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("SSAO BGL"),
        entries: &[
            attachment_texture_entry(0),
            attachment_texture_entry(1),
            attachment_texture_entry(2),
            uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            uniform_entry(4, wgpu::ShaderStages::FRAGMENT),
            sampler_entry(5, wgpu::SamplerBindingType::NonFiltering),
            sampler_entry(6, wgpu::SamplerBindingType::NonFiltering),
        ],
    })
}

/// Blur: 0: ssao_texture, 1: color_sampler.
pub fn create_blur_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("SSAO Blur BGL"),
        entries: &[
            attachment_texture_entry(0),
            sampler_entry(1, wgpu::SamplerBindingType::NonFiltering),
        ],
    })
}

/// Composition: 0..4 position/normal/albedo/ssao/ssaoBlur, 5: SSAOParams, 6: color_sampler.
pub fn create_composition_bgl(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Composition BGL"),
        entries: &[
            attachment_texture_entry(0),
            attachment_texture_entry(1),
            attachment_texture_entry(2),
            attachment_texture_entry(3),
            attachment_texture_entry(4),
            uniform_entry(5, wgpu::ShaderStages::FRAGMENT),
            sampler_entry(6, wgpu::SamplerBindingType::NonFiltering),
        ],
    })
}

// ============================================================
// Pipelines
// ============================================================

pub fn create_gbuffer_pipeline(
    device: &wgpu::Device,
    scene_bgl: &wgpu::BindGroupLayout,
    material_bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let vert_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("GBuffer Vertex"),
        source: wgpu::ShaderSource::Wgsl(shaders::GBUFFER_VERT.into()),
    });

    let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("GBuffer Fragment"),
        source: wgpu::ShaderSource::Wgsl(shaders::GBUFFER_FRAG.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("GBuffer Pipeline Layout"),
        bind_group_layouts: &[scene_bgl, material_bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("GBuffer Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vert_module,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &frag_module,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[
                Some(wgpu::ColorTargetState {
                    format: POSITION_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                }),
                Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                }),
                Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                }),
            ],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(depth_stencil_rw()),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Full-screen pass pipeline. `constants` fills the fragment stage's
/// pipeline-overridable constants.
pub fn create_fullscreen_effect_pipeline(
    device: &wgpu::Device,
    label: &str,
    frag_source: &str,
    bgl: &wgpu::BindGroupLayout,
    output_format: wgpu::TextureFormat,
    constants: &HashMap<String, f64>,
    depth_stencil: Option<wgpu::DepthStencilState>,
) -> wgpu::RenderPipeline {
    let vert_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Fullscreen Vert"),
        source: wgpu::ShaderSource::Wgsl(shaders::FULLSCREEN_VERT.into()),
    });

    let frag_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(frag_source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{label} Layout")),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: fullscreen_vertex_state(&vert_module),
        fragment: Some(wgpu::FragmentState {
            module: &frag_module,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants,
                ..Default::default()
            },
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Override values for ssao_frag.wgsl.
pub fn ssao_constants(radius: f32) -> HashMap<String, f64> {
    HashMap::from([
        (shaders::SSAO_KERNEL_SIZE_CONSTANT.to_string(), SSAO_KERNEL_SIZE as f64),
        (shaders::SSAO_RADIUS_CONSTANT.to_string(), radius as f64),
    ])
}

// ============================================================
// Factory
// ============================================================

pub struct PassPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// The four compiled pass pipelines, keyed by pass.
pub struct PipelineStateFactory {
    pipelines: HashMap<PassId, PassPipeline>,
}

impl PipelineStateFactory {
    /// Compile every pass pipeline. Any validation failure is fatal.
    ///
    /// `material_bgl` outlives the factory: mesh material bind groups are built
    /// against it once and survive pipeline rebuilds.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        config: &RendererConfig,
        material_bgl: &wgpu::BindGroupLayout,
    ) -> RenderResult<Self> {
        let mut pipelines = HashMap::new();
        for pass in PassId::ALL {
            log::info!("Creating {} pipeline...", pass.label());
            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let built = Self::build(device, pass, surface_format, config, material_bgl);
            if let Some(err) = pollster::block_on(device.pop_error_scope()) {
                return Err(RenderError::PipelineCreation {
                    pass,
                    reason: err.to_string(),
                });
            }
            pipelines.insert(pass, built);
        }
        Ok(Self { pipelines })
    }

    fn build(
        device: &wgpu::Device,
        pass: PassId,
        surface_format: wgpu::TextureFormat,
        config: &RendererConfig,
        material_bgl: &wgpu::BindGroupLayout,
    ) -> PassPipeline {
        let no_constants = HashMap::new();
        match pass {
            PassId::GBuffer => {
                let bgl = create_gbuffer_bgl(device);
                PassPipeline {
                    pipeline: create_gbuffer_pipeline(device, &bgl, material_bgl),
                    bind_group_layout: bgl,
                }
            }
            PassId::Ssao => {
                let bgl = create_ssao_bgl(device);
                PassPipeline {
                    pipeline: create_fullscreen_effect_pipeline(
                        device,
                        "SSAO Pipeline",
                        shaders::SSAO_FRAG,
                        &bgl,
                        SSAO_FORMAT,
                        &ssao_constants(config.ssao_radius),
                        None,
                    ),
                    bind_group_layout: bgl,
                }
            }
            PassId::Blur => {
                let bgl = create_blur_bgl(device);
                PassPipeline {
                    pipeline: create_fullscreen_effect_pipeline(
                        device,
                        "SSAO Blur Pipeline",
                        shaders::BLUR_FRAG,
                        &bgl,
                        SSAO_FORMAT,
                        &no_constants,
                        None,
                    ),
                    bind_group_layout: bgl,
                }
            }
            PassId::Composition => {
                let bgl = create_composition_bgl(device);
                PassPipeline {
                    pipeline: create_fullscreen_effect_pipeline(
                        device,
                        "Composition Pipeline",
                        shaders::COMPOSITION_FRAG,
                        &bgl,
                        surface_format,
                        &no_constants,
                        config.share_depth_with_composition.then(depth_stencil_passthrough),
                    ),
                    bind_group_layout: bgl,
                }
            }
        }
    }

    pub fn get(&self, pass: PassId) -> RenderResult<&PassPipeline> {
        self.pipelines.get(&pass).ok_or_else(|| RenderError::PipelineCreation {
            pass,
            reason: "pipeline not built".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssao_constants_carry_kernel_size_and_radius() {
        let constants = ssao_constants(0.5);
        assert_eq!(constants["kernel_size"], 64.0);
        assert_eq!(constants["radius"], 0.5);
    }
}
