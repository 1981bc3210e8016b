//! Pipeline-stage barriers between passes.
//!
//! Everything runs on one queue in one command stream, so a barrier is only
//! ever a same-queue layout/access transition. Barriers are never elided.

use std::ops::BitOr;

use crate::attachment::{AttachmentAllocator, AttachmentId, AttachmentState, AttachmentStore};
use crate::error::{RenderError, RenderResult};
use crate::pass::{PassDesc, PassSequencer};

/// Pipeline stage bitfield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StageMask(pub u32);

impl StageMask {
    pub const NONE: StageMask = StageMask(0);
    pub const TOP_OF_PIPE: StageMask = StageMask(1 << 0);
    pub const EARLY_FRAGMENT_TESTS: StageMask = StageMask(1 << 1);
    pub const LATE_FRAGMENT_TESTS: StageMask = StageMask(1 << 2);
    pub const FRAGMENT_SHADER: StageMask = StageMask(1 << 3);
    pub const COLOR_ATTACHMENT_OUTPUT: StageMask = StageMask(1 << 4);
    pub const BOTTOM_OF_PIPE: StageMask = StageMask(1 << 5);

    pub fn has(&self, flag: StageMask) -> bool {
        self.0 & flag.0 == flag.0 && flag.0 != 0
    }
}

impl BitOr for StageMask {
    type Output = StageMask;

    fn bitor(self, rhs: StageMask) -> StageMask {
        StageMask(self.0 | rhs.0)
    }
}

/// Memory access bitfield.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AccessMask(pub u32);

impl AccessMask {
    pub const NONE: AccessMask = AccessMask(0);
    pub const COLOR_ATTACHMENT_WRITE: AccessMask = AccessMask(1 << 0);
    pub const DEPTH_ATTACHMENT_WRITE: AccessMask = AccessMask(1 << 1);
    pub const SHADER_READ: AccessMask = AccessMask(1 << 2);

    pub fn has(&self, flag: AccessMask) -> bool {
        self.0 & flag.0 == flag.0 && flag.0 != 0
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;

    fn bitor(self, rhs: AccessMask) -> AccessMask {
        AccessMask(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrier {
    pub attachment: AttachmentId,
    pub old: AttachmentState,
    pub new: AttachmentState,
    pub src_stage: StageMask,
    pub dst_stage: StageMask,
    pub src_access: AccessMask,
    pub dst_access: AccessMask,
}

impl Barrier {
    fn to_write(attachment: AttachmentId, old: AttachmentState, depth: bool) -> Self {
        if depth {
            let tests = StageMask::EARLY_FRAGMENT_TESTS | StageMask::LATE_FRAGMENT_TESTS;
            Barrier {
                attachment,
                old,
                new: AttachmentState::AttachmentWrite,
                src_stage: tests,
                dst_stage: tests,
                src_access: AccessMask::NONE,
                dst_access: AccessMask::DEPTH_ATTACHMENT_WRITE,
            }
        } else {
            Barrier {
                attachment,
                old,
                new: AttachmentState::AttachmentWrite,
                src_stage: StageMask::TOP_OF_PIPE,
                dst_stage: StageMask::COLOR_ATTACHMENT_OUTPUT,
                src_access: AccessMask::NONE,
                dst_access: AccessMask::COLOR_ATTACHMENT_WRITE,
            }
        }
    }

    fn to_shader_read(attachment: AttachmentId) -> Self {
        Barrier {
            attachment,
            old: AttachmentState::AttachmentWrite,
            new: AttachmentState::ShaderRead,
            src_stage: StageMask::COLOR_ATTACHMENT_OUTPUT,
            dst_stage: StageMask::FRAGMENT_SHADER,
            src_access: AccessMask::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessMask::SHADER_READ,
        }
    }

    fn to_present() -> Self {
        Barrier {
            attachment: AttachmentId::Swapchain,
            old: AttachmentState::AttachmentWrite,
            new: AttachmentState::PresentSource,
            src_stage: StageMask::COLOR_ATTACHMENT_OUTPUT,
            dst_stage: StageMask::BOTTOM_OF_PIPE,
            src_access: AccessMask::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessMask::NONE,
        }
    }
}

/// Computes the transitions around each pass and applies them to the store.
pub struct BarrierInserter<'a> {
    sequencer: &'a PassSequencer,
}

impl<'a> BarrierInserter<'a> {
    pub fn new(sequencer: &'a PassSequencer) -> Self {
        Self { sequencer }
    }

    /// Transitions every write target of `pass` into `AttachmentWrite`.
    ///
    /// Fails with `Hazard` when a declared read has not reached `ShaderRead`,
    /// or when the shared depth reference was never written.
    pub fn before_pass<A: AttachmentAllocator>(
        &self,
        store: &mut AttachmentStore<A>,
        pass: &PassDesc,
    ) -> RenderResult<Vec<Barrier>> {
        for &read in &pass.reads {
            let state = store.state(read);
            if state != AttachmentState::ShaderRead {
                return Err(RenderError::Hazard {
                    pass: pass.id,
                    attachment: read,
                    state,
                });
            }
        }
        if let Some(depth) = pass.depth_reference {
            let state = store.state(depth);
            if state != AttachmentState::AttachmentWrite {
                return Err(RenderError::Hazard {
                    pass: pass.id,
                    attachment: depth,
                    state,
                });
            }
        }

        let mut barriers = Vec::new();
        for (id, depth) in pass
            .color_writes
            .iter()
            .map(|&id| (id, false))
            .chain(pass.depth_write.map(|id| (id, true)))
        {
            if store.state(id) == AttachmentState::AttachmentWrite {
                continue;
            }
            let old = store.transition(id, AttachmentState::AttachmentWrite)?;
            let barrier = Barrier::to_write(id, old, depth);
            log::trace!("{}: {:?} {:?} -> {:?}", pass.id.label(), id, old, barrier.new);
            barriers.push(barrier);
        }
        Ok(barriers)
    }

    /// Transitions colour outputs read later in the frame into `ShaderRead`.
    pub fn after_pass<A: AttachmentAllocator>(
        &self,
        store: &mut AttachmentStore<A>,
        pass: &PassDesc,
    ) -> RenderResult<Vec<Barrier>> {
        let mut barriers = Vec::new();
        for &id in &pass.color_writes {
            if id.is_external() || !self.sequencer.is_consumed_after(pass.id, id) {
                continue;
            }
            store.transition(id, AttachmentState::ShaderRead)?;
            log::trace!("{}: {:?} AttachmentWrite -> ShaderRead", pass.id.label(), id);
            barriers.push(Barrier::to_shader_read(id));
        }
        Ok(barriers)
    }

    /// Final swapchain transition into `PresentSource`.
    pub fn present<A: AttachmentAllocator>(&self, store: &mut AttachmentStore<A>) -> RenderResult<Barrier> {
        store.transition(AttachmentId::Swapchain, AttachmentState::PresentSource)?;
        log::trace!("Swapchain AttachmentWrite -> PresentSource");
        Ok(Barrier::to_present())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::testing::offscreen_store;
    use crate::pass::PassId;

    #[test]
    fn test_gbuffer_barriers() {
        let seq = PassSequencer::new(false);
        let inserter = BarrierInserter::new(&seq);
        let mut store = offscreen_store(64, 64);
        let gbuffer = seq.pass(PassId::GBuffer).unwrap();

        let before = inserter.before_pass(&mut store, gbuffer).unwrap();
        assert_eq!(before.len(), 4);
        let depth = before.iter().find(|b| b.attachment == AttachmentId::Depth).unwrap();
        assert!(depth.dst_stage.has(StageMask::EARLY_FRAGMENT_TESTS));
        assert!(depth.dst_stage.has(StageMask::LATE_FRAGMENT_TESTS));
        assert_eq!(depth.dst_access, AccessMask::DEPTH_ATTACHMENT_WRITE);
        for b in before.iter().filter(|b| b.attachment != AttachmentId::Depth) {
            assert_eq!((b.old, b.new), (AttachmentState::Undefined, AttachmentState::AttachmentWrite));
            assert_eq!(b.src_stage, StageMask::TOP_OF_PIPE);
            assert_eq!(b.dst_stage, StageMask::COLOR_ATTACHMENT_OUTPUT);
            assert_eq!(b.src_access, AccessMask::NONE);
        }

        let after = inserter.after_pass(&mut store, gbuffer).unwrap();
        let ids: Vec<AttachmentId> = after.iter().map(|b| b.attachment).collect();
        assert_eq!(ids, vec![AttachmentId::Position, AttachmentId::Normal, AttachmentId::Albedo]);
        // Depth is never read later, so it stays in AttachmentWrite.
        assert_eq!(store.state(AttachmentId::Depth), AttachmentState::AttachmentWrite);
        for b in &after {
            assert_eq!(b.src_stage, StageMask::COLOR_ATTACHMENT_OUTPUT);
            assert_eq!(b.dst_stage, StageMask::FRAGMENT_SHADER);
            assert_eq!(b.dst_access, AccessMask::SHADER_READ);
        }
    }

    #[test]
    fn test_consumer_before_producer_is_a_hazard() {
        let seq = PassSequencer::new(false);
        let inserter = BarrierInserter::new(&seq);
        let mut store = offscreen_store(64, 64);
        let err = inserter
            .before_pass(&mut store, seq.pass(PassId::Ssao).unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Hazard {
                pass: PassId::Ssao,
                attachment: AttachmentId::Position,
                state: AttachmentState::Undefined,
            }
        ));
    }

    #[test]
    fn test_multi_consumer_read_transitions_once() {
        let seq = PassSequencer::new(false);
        let inserter = BarrierInserter::new(&seq);
        let mut store = offscreen_store(64, 64);
        let mut ssao_reads = 0;
        for pass in seq.next_passes() {
            let before = inserter.before_pass(&mut store, pass).unwrap();
            let after = inserter.after_pass(&mut store, pass).unwrap();
            ssao_reads += before
                .iter()
                .chain(after.iter())
                .filter(|b| b.attachment == AttachmentId::Ssao && b.new == AttachmentState::ShaderRead)
                .count();
        }
        // Read by Blur and Composition, transitioned once.
        assert_eq!(ssao_reads, 1);
    }

    #[test]
    fn test_present_barrier() {
        let seq = PassSequencer::new(false);
        let inserter = BarrierInserter::new(&seq);
        let mut store = offscreen_store(8, 8);
        assert!(inserter.present(&mut store).is_err());

        store.transition(AttachmentId::Swapchain, AttachmentState::AttachmentWrite).unwrap();
        let b = inserter.present(&mut store).unwrap();
        assert_eq!(b.dst_stage, StageMask::BOTTOM_OF_PIPE);
        assert_eq!(b.dst_access, AccessMask::NONE);
        assert_eq!(b.new, AttachmentState::PresentSource);
    }

    #[test]
    fn test_shared_depth_needs_no_extra_barrier() {
        let seq = PassSequencer::new(true);
        let inserter = BarrierInserter::new(&seq);
        let mut store = offscreen_store(8, 8);
        let mut depth_barriers = 0;
        for pass in seq.next_passes() {
            let before = inserter.before_pass(&mut store, pass).unwrap();
            let after = inserter.after_pass(&mut store, pass).unwrap();
            depth_barriers += before
                .iter()
                .chain(after.iter())
                .filter(|b| b.attachment == AttachmentId::Depth)
                .count();
        }
        assert_eq!(depth_barriers, 1);
    }

    #[test]
    fn test_mask_flags() {
        let m = StageMask::EARLY_FRAGMENT_TESTS | StageMask::LATE_FRAGMENT_TESTS;
        assert!(m.has(StageMask::LATE_FRAGMENT_TESTS));
        assert!(!m.has(StageMask::FRAGMENT_SHADER));
        assert!(!AccessMask::NONE.has(AccessMask::NONE));
    }
}
