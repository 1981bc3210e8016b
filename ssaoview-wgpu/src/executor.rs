//! Replays a recorded frame onto a wgpu command encoder.
//!
//! wgpu derives the hardware transitions itself from how each texture is used
//! inside a render pass. The recorded barriers still decide where pass
//! boundaries fall, and each one is checked against a mirror of the attachment
//! states before any GPU work is encoded.

use ssaoview_render::attachment::{AttachmentId, AttachmentState};
use ssaoview_render::barrier::Barrier;
use ssaoview_render::command::{ColorTarget, Command, CommandStream, DepthLoad, DepthTarget};
use ssaoview_render::pass::{PassDesc, PassSequencer};
use ssaoview_render::{RenderError, RenderResult};

use crate::geometry::{SceneDrawer, UiOverlay};
use crate::passes::PassBindGroups;
use crate::pipeline::PipelineStateFactory;
use crate::render_targets::{attachment_view, GpuAttachmentStore};

/// Attachment states as seen by the command stream.
pub struct StateMirror {
    states: [AttachmentState; AttachmentId::COUNT],
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMirror {
    pub fn new() -> Self {
        Self {
            states: [AttachmentState::Undefined; AttachmentId::COUNT],
        }
    }

    pub fn state(&self, id: AttachmentId) -> AttachmentState {
        self.states[id.index()]
    }

    pub fn apply(&mut self, barrier: &Barrier) -> RenderResult<()> {
        let current = self.state(barrier.attachment);
        if current != barrier.old {
            return Err(RenderError::IllegalTransition {
                attachment: barrier.attachment,
                from: current,
                to: barrier.new,
            });
        }
        self.states[barrier.attachment.index()] = barrier.new;
        Ok(())
    }

    /// A pass may only render into targets it declared and that are in
    /// `AttachmentWrite`, and may only sample inputs already in `ShaderRead`.
    pub fn check_targets(
        &self,
        pass: &PassDesc,
        colors: &[ColorTarget],
        depth: Option<&DepthTarget>,
    ) -> RenderResult<()> {
        let written = colors
            .iter()
            .map(|c| (c.attachment, true))
            .chain(depth.map(|d| (d.attachment, !d.read_only)));
        for (attachment, writes) in written {
            if writes && !pass.declares_write(attachment) {
                return Err(RenderError::UndeclaredWrite {
                    pass: pass.id,
                    attachment,
                });
            }
            let state = self.state(attachment);
            if state != AttachmentState::AttachmentWrite {
                return Err(RenderError::Hazard {
                    pass: pass.id,
                    attachment,
                    state,
                });
            }
        }
        for &read in &pass.reads {
            let state = self.state(read);
            if state != AttachmentState::ShaderRead {
                return Err(RenderError::Hazard {
                    pass: pass.id,
                    attachment: read,
                    state,
                });
            }
        }
        Ok(())
    }

    /// Track one command. Non-barrier, non-pass commands are ignored.
    pub fn observe(&mut self, command: &Command, sequencer: &PassSequencer) -> RenderResult<()> {
        match command {
            Command::Barrier(barrier) => {
                self.apply(barrier)?;
                log::trace!(
                    "Barrier {:?}: {:?} -> {:?}",
                    barrier.attachment,
                    barrier.old,
                    barrier.new
                );
                Ok(())
            }
            Command::BeginRendering {
                pass, colors, depth, ..
            } => {
                let desc = sequencer
                    .pass(*pass)
                    .ok_or_else(|| RenderError::submission(format!("unknown pass {pass:?}")))?;
                self.check_targets(desc, colors, depth.as_ref())
            }
            _ => Ok(()),
        }
    }
}

/// Check a whole stream without touching the GPU.
pub fn validate_stream(stream: &CommandStream, sequencer: &PassSequencer) -> RenderResult<StateMirror> {
    let mut mirror = StateMirror::new();
    for command in stream.commands() {
        mirror.observe(command, sequencer)?;
    }
    if mirror.state(AttachmentId::Swapchain) != AttachmentState::PresentSource {
        return Err(RenderError::submission("frame does not end in a present transition"));
    }
    Ok(mirror)
}

/// Everything the executor binds while replaying a frame.
pub struct FrameContext<'a> {
    pub sequencer: &'a PassSequencer,
    pub store: &'a GpuAttachmentStore,
    pub swapchain_view: &'a wgpu::TextureView,
    pub pipelines: &'a PipelineStateFactory,
    pub bind_groups: &'a PassBindGroups,
    pub scene: &'a dyn SceneDrawer,
    pub overlay: Option<&'a dyn UiOverlay>,
}

impl FrameContext<'_> {
    fn view(&self, id: AttachmentId) -> RenderResult<&wgpu::TextureView> {
        if id.is_external() {
            Ok(self.swapchain_view)
        } else {
            attachment_view(self.store, id)
        }
    }
}

fn to_color(c: [f64; 4]) -> wgpu::Color {
    wgpu::Color {
        r: c[0],
        g: c[1],
        b: c[2],
        a: c[3],
    }
}

fn active_pass<'a>(active: &'a mut Option<wgpu::RenderPass<'static>>) -> RenderResult<&'a mut wgpu::RenderPass<'static>> {
    active
        .as_mut()
        .ok_or_else(|| RenderError::submission("command recorded outside a render pass"))
}

/// Encode `stream` into `encoder`.
pub fn execute(
    encoder: &mut wgpu::CommandEncoder,
    stream: &CommandStream,
    ctx: &FrameContext<'_>,
) -> RenderResult<()> {
    let mut mirror = StateMirror::new();
    let mut active: Option<wgpu::RenderPass<'static>> = None;

    for command in stream.commands() {
        mirror.observe(command, ctx.sequencer)?;
        match command {
            Command::Barrier(_) => {
                if active.is_some() {
                    return Err(RenderError::submission("barrier recorded inside a render pass"));
                }
            }
            Command::BeginRendering { pass, colors, depth, .. } => {
                if active.is_some() {
                    return Err(RenderError::submission("nested render pass"));
                }
                let views = colors
                    .iter()
                    .map(|c| ctx.view(c.attachment))
                    .collect::<RenderResult<Vec<_>>>()?;
                let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = colors
                    .iter()
                    .zip(views)
                    .map(|(target, view)| {
                        Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(to_color(target.clear)),
                                store: wgpu::StoreOp::Store,
                            },
                        })
                    })
                    .collect();

                let depth_stencil_attachment = match depth {
                    Some(d) => Some(wgpu::RenderPassDepthStencilAttachment {
                        view: ctx.view(d.attachment)?,
                        // Read-only depth carries no ops at all.
                        depth_ops: (!d.read_only).then(|| wgpu::Operations {
                            load: match d.load {
                                DepthLoad::Clear(v) => wgpu::LoadOp::Clear(v),
                                DepthLoad::Load => wgpu::LoadOp::Load,
                            },
                            store: if d.store {
                                wgpu::StoreOp::Store
                            } else {
                                wgpu::StoreOp::Discard
                            },
                        }),
                        stencil_ops: None,
                    }),
                    None => None,
                };

                let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(pass.label()),
                    color_attachments: &color_attachments,
                    depth_stencil_attachment,
                    ..Default::default()
                });
                active = Some(render_pass.forget_lifetime());
            }
            Command::BindPipeline(pass) => {
                let pipeline = &ctx.pipelines.get(*pass)?.pipeline;
                active_pass(&mut active)?.set_pipeline(pipeline);
            }
            Command::BindDescriptorSet(pass) => {
                let group = ctx.bind_groups.get(*pass)?;
                active_pass(&mut active)?.set_bind_group(0, group, &[]);
            }
            Command::SetViewport {
                x,
                y,
                width,
                height,
                min_depth,
                max_depth,
            } => {
                active_pass(&mut active)?.set_viewport(*x, *y, *width, *height, *min_depth, *max_depth);
            }
            Command::SetScissor { x, y, width, height } => {
                active_pass(&mut active)?.set_scissor_rect(*x, *y, *width, *height);
            }
            Command::DrawFullscreenTriangle => {
                active_pass(&mut active)?.draw(0..3, 0..1);
            }
            Command::DrawScene => {
                ctx.scene.draw_scene(active_pass(&mut active)?);
            }
            Command::DrawUiOverlay => {
                let pass = active_pass(&mut active)?;
                if let Some(overlay) = ctx.overlay {
                    overlay.draw_overlay(pass);
                }
            }
            Command::EndRendering(_) => {
                if active.take().is_none() {
                    return Err(RenderError::submission("render pass ended twice"));
                }
            }
        }
    }

    if active.is_some() {
        return Err(RenderError::submission("render pass left open"));
    }
    Ok(())
}
