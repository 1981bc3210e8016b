//! Surface size changes and what they require of the size-dependent resources.
//!
//! Attachment dimensions are baked into the images and into the pipelines'
//! viewport and format declarations, so nothing is reused across a size
//! change: a new nonzero size rebuilds everything and a zero size only tears
//! down. Rendering resumes once a nonzero size arrives.

use crate::attachment::{AttachmentAllocator, AttachmentStore};
use crate::command::Extent;
use crate::error::RenderResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizePlan {
    /// Same size and everything is built. Nothing to do.
    Unchanged,
    /// Minimized: release every size-dependent resource, create nothing.
    TearDown,
    /// Release everything, then recreate at the new size.
    Rebuild,
}

impl ResizePlan {
    /// `built` says whether size-dependent resources currently exist.
    pub fn decide(current: Extent, next: Extent, built: bool) -> Self {
        if next.is_empty() {
            if built {
                ResizePlan::TearDown
            } else {
                ResizePlan::Unchanged
            }
        } else if next == current && built {
            ResizePlan::Unchanged
        } else {
            ResizePlan::Rebuild
        }
    }

    /// Apply the plan to the attachment store.
    ///
    /// Everything that references the attachments must be dropped first.
    pub fn apply<A: AttachmentAllocator>(self, store: &mut AttachmentStore<A>, next: Extent) -> RenderResult<()> {
        match self {
            ResizePlan::Unchanged => Ok(()),
            ResizePlan::TearDown => {
                store.destroy_all();
                log::info!("Surface minimized, frames skipped until resize");
                Ok(())
            }
            ResizePlan::Rebuild => {
                store.destroy_all();
                store.create_offscreen(next.width, next.height)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::testing::{offscreen_store, CountingAllocator};
    use crate::attachment::OFFSCREEN_ATTACHMENTS;

    fn resize(store: &mut AttachmentStore<CountingAllocator>, current: Extent, next: Extent) -> ResizePlan {
        let plan = ResizePlan::decide(current, next, store.live_count() > 0);
        plan.apply(store, next).unwrap();
        plan
    }

    #[test]
    fn test_decide() {
        let a = Extent::new(800, 600);
        let b = Extent::new(1024, 768);
        let zero = Extent::new(0, 600);
        assert_eq!(ResizePlan::decide(a, a, true), ResizePlan::Unchanged);
        assert_eq!(ResizePlan::decide(a, a, false), ResizePlan::Rebuild);
        assert_eq!(ResizePlan::decide(a, b, true), ResizePlan::Rebuild);
        assert_eq!(ResizePlan::decide(a, zero, true), ResizePlan::TearDown);
        assert_eq!(ResizePlan::decide(zero, Extent::new(0, 0), false), ResizePlan::Unchanged);
        assert_eq!(ResizePlan::decide(zero, a, false), ResizePlan::Rebuild);
    }

    #[test]
    fn test_minimize_tears_down_and_restore_rebuilds() {
        let mut store = offscreen_store(800, 600);
        let full = OFFSCREEN_ATTACHMENTS.len();

        let plan = resize(&mut store, Extent::new(800, 600), Extent::new(0, 0));
        assert_eq!(plan, ResizePlan::TearDown);
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.allocator().destroyed.get(), full);

        // Still minimized: nothing is created at zero size.
        let plan = resize(&mut store, Extent::new(0, 0), Extent::new(0, 300));
        assert_eq!(plan, ResizePlan::Unchanged);
        assert_eq!(store.allocator().created.get(), full);

        let plan = resize(&mut store, Extent::new(0, 300), Extent::new(800, 600));
        assert_eq!(plan, ResizePlan::Rebuild);
        assert_eq!(store.live_count(), full);
        assert_eq!(store.allocator().created.get(), 2 * full);
        for desc in store.descs() {
            assert_eq!((desc.width, desc.height), (800, 600));
        }
    }

    #[test]
    fn test_resize_releases_old_set_one_to_one() {
        let mut store = offscreen_store(800, 600);
        let full = OFFSCREEN_ATTACHMENTS.len();
        resize(&mut store, Extent::new(800, 600), Extent::new(1280, 720));
        assert_eq!(store.allocator().destroyed.get(), full);
        assert_eq!(store.live_count(), full);
        assert!(store.descs().iter().all(|d| (d.width, d.height) == (1280, 720)));

        let plan = resize(&mut store, Extent::new(1280, 720), Extent::new(1280, 720));
        assert_eq!(plan, ResizePlan::Unchanged);
        assert_eq!(store.allocator().destroyed.get(), full);
    }
}
