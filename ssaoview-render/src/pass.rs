//! The fixed four-pass graph and its declared read/write sets.
//!
//! Order is structural: passes are never reordered, and `validate` only checks
//! that the fixed order satisfies every declared read.

use crate::attachment::{AttachmentId, AttachmentState};
use crate::error::{RenderError, RenderResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    GBuffer,
    Ssao,
    Blur,
    Composition,
}

impl PassId {
    pub const ALL: [PassId; 4] = [PassId::GBuffer, PassId::Ssao, PassId::Blur, PassId::Composition];

    pub fn label(self) -> &'static str {
        match self {
            PassId::GBuffer => "GBuffer",
            PassId::Ssao => "SSAO",
            PassId::Blur => "SSAO Blur",
            PassId::Composition => "Composition",
        }
    }

    /// Vertex and fragment stage names of the pass's shader pair.
    pub fn shader_stages(self) -> (&'static str, &'static str) {
        match self {
            PassId::GBuffer => ("gbuffer.vert", "gbuffer.frag"),
            PassId::Ssao => ("fullscreen.vert", "ssao.frag"),
            PassId::Blur => ("fullscreen.vert", "blur.frag"),
            PassId::Composition => ("fullscreen.vert", "composition.frag"),
        }
    }
}

/// Inputs that no pass in the graph produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExternalInput {
    SceneGeometry,
    SceneParams,
    NoiseTexture,
    KernelBuffer,
    SsaoParams,
    UiOverlay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawKind {
    /// Mesh draws issued through the geometry collaborator.
    Scene,
    /// One triangle covering the viewport, no vertex buffer.
    FullscreenTriangle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PassDesc {
    pub id: PassId,
    pub color_writes: Vec<AttachmentId>,
    pub depth_write: Option<AttachmentId>,
    /// Depth view attached for render-pass compatibility only. No test, no write.
    pub depth_reference: Option<AttachmentId>,
    pub reads: Vec<AttachmentId>,
    pub external_reads: Vec<ExternalInput>,
    pub draw: DrawKind,
    pub draws_overlay: bool,
}

impl PassDesc {
    /// Every attachment this pass writes, colour targets first.
    pub fn writes(&self) -> impl Iterator<Item = AttachmentId> + '_ {
        self.color_writes.iter().copied().chain(self.depth_write)
    }

    pub fn declares_write(&self, id: AttachmentId) -> bool {
        self.writes().any(|w| w == id)
    }
}

pub struct PassSequencer {
    passes: Vec<PassDesc>,
}

impl PassSequencer {
    pub fn new(share_depth_with_composition: bool) -> Self {
        use AttachmentId::*;
        let passes = vec![
            PassDesc {
                id: PassId::GBuffer,
                color_writes: vec![Position, Normal, Albedo],
                depth_write: Some(Depth),
                depth_reference: None,
                reads: vec![],
                external_reads: vec![ExternalInput::SceneGeometry, ExternalInput::SceneParams],
                draw: DrawKind::Scene,
                draws_overlay: false,
            },
            PassDesc {
                id: PassId::Ssao,
                color_writes: vec![Ssao],
                depth_write: None,
                depth_reference: None,
                reads: vec![Position, Normal],
                external_reads: vec![
                    ExternalInput::NoiseTexture,
                    ExternalInput::KernelBuffer,
                    ExternalInput::SsaoParams,
                ],
                draw: DrawKind::FullscreenTriangle,
                draws_overlay: false,
            },
            PassDesc {
                id: PassId::Blur,
                color_writes: vec![SsaoBlur],
                depth_write: None,
                depth_reference: None,
                reads: vec![Ssao],
                external_reads: vec![],
                draw: DrawKind::FullscreenTriangle,
                draws_overlay: false,
            },
            PassDesc {
                id: PassId::Composition,
                color_writes: vec![Swapchain],
                depth_write: None,
                depth_reference: share_depth_with_composition.then_some(Depth),
                reads: vec![Position, Normal, Albedo, Ssao, SsaoBlur],
                external_reads: vec![ExternalInput::SsaoParams, ExternalInput::UiOverlay],
                draw: DrawKind::FullscreenTriangle,
                draws_overlay: true,
            },
        ];
        Self { passes }
    }

    #[cfg(test)]
    pub(crate) fn from_passes(passes: Vec<PassDesc>) -> Self {
        Self { passes }
    }

    /// The passes in execution order.
    pub fn next_passes(&self) -> impl Iterator<Item = &PassDesc> + '_ {
        self.passes.iter()
    }

    pub fn pass(&self, id: PassId) -> Option<&PassDesc> {
        self.passes.iter().find(|p| p.id == id)
    }

    fn position(&self, id: PassId) -> Option<usize> {
        self.passes.iter().position(|p| p.id == id)
    }

    pub fn producer_of(&self, attachment: AttachmentId) -> Option<PassId> {
        self.passes.iter().find(|p| p.declares_write(attachment)).map(|p| p.id)
    }

    /// Whether any pass after `pass` reads `attachment` in the same frame.
    pub fn is_consumed_after(&self, pass: PassId, attachment: AttachmentId) -> bool {
        let Some(start) = self.position(pass) else {
            return false;
        };
        self.passes[start + 1..].iter().any(|p| p.reads.contains(&attachment))
    }

    /// Check that every read is produced by an earlier pass and that each
    /// attachment has at most one producer.
    pub fn validate(&self) -> RenderResult<()> {
        let mut written: Vec<AttachmentId> = Vec::new();
        for pass in &self.passes {
            for read in &pass.reads {
                if !written.contains(read) {
                    return Err(RenderError::Hazard {
                        pass: pass.id,
                        attachment: *read,
                        state: AttachmentState::Undefined,
                    });
                }
            }
            if let Some(depth) = pass.depth_reference {
                if !written.contains(&depth) {
                    return Err(RenderError::Hazard {
                        pass: pass.id,
                        attachment: depth,
                        state: AttachmentState::Undefined,
                    });
                }
            }
            for write in pass.writes() {
                if written.contains(&write) {
                    return Err(RenderError::IllegalTransition {
                        attachment: write,
                        from: AttachmentState::AttachmentWrite,
                        to: AttachmentState::AttachmentWrite,
                    });
                }
                written.push(write);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order() {
        let seq = PassSequencer::new(false);
        let ids: Vec<PassId> = seq.next_passes().map(|p| p.id).collect();
        assert_eq!(ids, PassId::ALL.to_vec());
        seq.validate().unwrap();
        PassSequencer::new(true).validate().unwrap();
    }

    #[test]
    fn test_single_producer_per_attachment() {
        let seq = PassSequencer::new(false);
        assert_eq!(seq.producer_of(AttachmentId::Position), Some(PassId::GBuffer));
        assert_eq!(seq.producer_of(AttachmentId::Depth), Some(PassId::GBuffer));
        assert_eq!(seq.producer_of(AttachmentId::Ssao), Some(PassId::Ssao));
        assert_eq!(seq.producer_of(AttachmentId::SsaoBlur), Some(PassId::Blur));
        assert_eq!(seq.producer_of(AttachmentId::Swapchain), Some(PassId::Composition));
    }

    #[test]
    fn test_consumers() {
        let seq = PassSequencer::new(false);
        assert!(seq.is_consumed_after(PassId::GBuffer, AttachmentId::Albedo));
        assert!(seq.is_consumed_after(PassId::Ssao, AttachmentId::Ssao));
        assert!(!seq.is_consumed_after(PassId::GBuffer, AttachmentId::Depth));
        assert!(!seq.is_consumed_after(PassId::Composition, AttachmentId::Swapchain));
    }

    #[test]
    fn test_shared_depth_is_reference_only() {
        let seq = PassSequencer::new(true);
        let comp = seq.pass(PassId::Composition).unwrap();
        assert_eq!(comp.depth_reference, Some(AttachmentId::Depth));
        assert!(!comp.declares_write(AttachmentId::Depth));
        assert!(PassSequencer::new(false)
            .pass(PassId::Composition)
            .unwrap()
            .depth_reference
            .is_none());
    }

    #[test]
    fn test_validate_rejects_read_before_write() {
        let mut passes = PassSequencer::new(false).passes;
        passes.swap(1, 2);
        let err = PassSequencer::from_passes(passes).validate().unwrap_err();
        assert!(matches!(
            err,
            RenderError::Hazard { pass: PassId::Blur, attachment: AttachmentId::Ssao, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_second_producer() {
        let mut passes = PassSequencer::new(false).passes;
        passes[2].color_writes.push(AttachmentId::Ssao);
        let err = PassSequencer::from_passes(passes).validate().unwrap_err();
        assert!(matches!(err, RenderError::IllegalTransition { attachment: AttachmentId::Ssao, .. }));
    }
}
