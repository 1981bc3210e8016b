//! Records one frame: GBuffer, SSAO, Blur, Composition, then present.

use crate::attachment::{AttachmentAllocator, AttachmentStore};
use crate::barrier::BarrierInserter;
use crate::command::{
    ColorTarget, Command, CommandStream, DepthLoad, DepthTarget, Extent, CLEAR_COLOR, CLEAR_DEPTH,
};
use crate::config::RendererConfig;
use crate::error::RenderResult;
use crate::pass::{DrawKind, PassDesc, PassSequencer};

/// Per-frame counters reported alongside the recorded stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: u32,
    pub barriers: u32,
    pub draws: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub extent: Extent,
    pub stream: CommandStream,
    pub stats: FrameStats,
}

pub struct FrameRecorder {
    sequencer: PassSequencer,
    clear_color: [f64; 4],
}

impl FrameRecorder {
    pub fn new(config: &RendererConfig) -> RenderResult<Self> {
        let sequencer = PassSequencer::new(config.share_depth_with_composition);
        sequencer.validate()?;
        Ok(Self {
            sequencer,
            clear_color: config.clear_color,
        })
    }

    pub fn sequencer(&self) -> &PassSequencer {
        &self.sequencer
    }

    /// Record the whole frame into one stream.
    ///
    /// Returns `Ok(None)` for a zero-sized surface; nothing is touched then.
    /// `overlay` adds the UI overlay draw to the composition pass.
    pub fn record<A: AttachmentAllocator>(
        &self,
        store: &mut AttachmentStore<A>,
        extent: Extent,
        overlay: bool,
    ) -> RenderResult<Option<RecordedFrame>> {
        if extent.is_empty() {
            log::debug!("Skipping frame at {}x{}", extent.width, extent.height);
            return Ok(None);
        }

        store.begin_frame();
        let inserter = BarrierInserter::new(&self.sequencer);
        let mut stream = CommandStream::new();
        let mut stats = FrameStats::default();

        for pass in self.sequencer.next_passes() {
            let before = inserter.before_pass(store, pass)?;
            stats.barriers += before.len() as u32;
            stream.extend_barriers(before);

            let target = self.pass_extent(store, pass, extent)?;
            self.record_pass(&mut stream, pass, target, overlay);
            stats.passes += 1;

            let after = inserter.after_pass(store, pass)?;
            stats.barriers += after.len() as u32;
            stream.extend_barriers(after);
        }

        stream.push(Command::Barrier(inserter.present(store)?));
        stats.barriers += 1;
        stats.draws = stream.draw_count() as u32;

        log::debug!(
            "Recorded frame {}x{}: {} passes, {} barriers, {} draws",
            extent.width,
            extent.height,
            stats.passes,
            stats.barriers,
            stats.draws
        );
        Ok(Some(RecordedFrame { extent, stream, stats }))
    }

    /// Render area of a pass: its first colour target's size, or the surface
    /// extent when that target is the swapchain.
    fn pass_extent<A: AttachmentAllocator>(
        &self,
        store: &AttachmentStore<A>,
        pass: &PassDesc,
        surface: Extent,
    ) -> RenderResult<Extent> {
        match pass.color_writes.first() {
            Some(id) if !id.is_external() => {
                let attachment = store.expect(*id)?;
                Ok(Extent::new(attachment.width(), attachment.height()))
            }
            _ => Ok(surface),
        }
    }

    fn record_pass(&self, stream: &mut CommandStream, pass: &PassDesc, extent: Extent, overlay: bool) {
        let colors = pass
            .color_writes
            .iter()
            .map(|&attachment| ColorTarget {
                attachment,
                clear: if attachment.is_external() { self.clear_color } else { CLEAR_COLOR },
            })
            .collect();
        let depth = match (pass.depth_write, pass.depth_reference) {
            (Some(attachment), _) => Some(DepthTarget {
                attachment,
                load: DepthLoad::Clear(CLEAR_DEPTH),
                store: self.sequencer.next_passes().any(|p| p.depth_reference == Some(attachment)),
                read_only: false,
            }),
            (None, Some(attachment)) => Some(DepthTarget {
                attachment,
                load: DepthLoad::Load,
                store: false,
                read_only: true,
            }),
            (None, None) => None,
        };

        stream.push(Command::BeginRendering {
            pass: pass.id,
            colors,
            depth,
            extent,
        });
        stream.push(Command::BindPipeline(pass.id));
        stream.push(Command::BindDescriptorSet(pass.id));
        stream.push(Command::SetViewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        });
        stream.push(Command::SetScissor {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        });
        stream.push(match pass.draw {
            DrawKind::Scene => Command::DrawScene,
            DrawKind::FullscreenTriangle => Command::DrawFullscreenTriangle,
        });
        if pass.draws_overlay && overlay {
            stream.push(Command::DrawUiOverlay);
        }
        stream.push(Command::EndRendering(pass.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::testing::{offscreen_store, CountingAllocator};
    use crate::attachment::{AttachmentId, AttachmentState};
    use crate::error::RenderError;
    use crate::pass::PassId;

    fn recorder() -> FrameRecorder {
        FrameRecorder::new(&RendererConfig::with_seed(1)).unwrap()
    }

    #[test]
    fn test_zero_extent_skips_frame() {
        let mut store = offscreen_store(64, 64);
        store.transition(AttachmentId::Ssao, AttachmentState::AttachmentWrite).unwrap();
        assert!(recorder().record(&mut store, Extent::new(0, 64), true).unwrap().is_none());
        assert!(recorder().record(&mut store, Extent::new(64, 0), true).unwrap().is_none());
        // Untouched: no begin_frame happened.
        assert_eq!(store.state(AttachmentId::Ssao), AttachmentState::AttachmentWrite);
    }

    #[test]
    fn test_passes_in_fixed_order_and_present_last() {
        let mut store = offscreen_store(64, 64);
        let frame = recorder().record(&mut store, Extent::new(64, 64), true).unwrap().unwrap();
        let stream = &frame.stream;

        let begins: Vec<usize> = PassId::ALL.iter().map(|p| stream.begin_of(*p).unwrap()).collect();
        assert!(begins.windows(2).all(|w| w[0] < w[1]));

        match stream.commands().last() {
            Some(Command::Barrier(b)) => {
                assert_eq!(b.attachment, AttachmentId::Swapchain);
                assert_eq!(b.new, AttachmentState::PresentSource);
            }
            other => panic!("stream ends with {other:?}"),
        }
        assert_eq!(store.state(AttachmentId::Swapchain), AttachmentState::PresentSource);
    }

    #[test]
    fn test_every_producer_consumer_pair_has_one_barrier_before_the_consumer() {
        let rec = recorder();
        let mut store = offscreen_store(64, 64);
        let frame = rec.record(&mut store, Extent::new(64, 64), true).unwrap().unwrap();
        let stream = &frame.stream;

        for consumer in rec.sequencer().next_passes() {
            for &read in &consumer.reads {
                let producer = rec.sequencer().producer_of(read).unwrap();
                let read_barriers: Vec<usize> = stream
                    .commands()
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| match c {
                        Command::Barrier(b)
                            if b.attachment == read && b.new == AttachmentState::ShaderRead =>
                        {
                            Some(i)
                        }
                        _ => None,
                    })
                    .collect();
                assert_eq!(read_barriers.len(), 1, "{read:?} transitioned {} times", read_barriers.len());
                let at = read_barriers[0];
                assert!(at > stream.end_of(producer).unwrap());
                assert!(at < stream.begin_of(consumer.id).unwrap());
            }
        }
    }

    #[test]
    fn test_write_barriers_precede_their_pass() {
        let rec = recorder();
        let mut store = offscreen_store(32, 32);
        let frame = rec.record(&mut store, Extent::new(32, 32), false).unwrap().unwrap();
        let stream = &frame.stream;

        for pass in rec.sequencer().next_passes() {
            for write in pass.writes() {
                let at = stream
                    .position(|c| {
                        matches!(c, Command::Barrier(b)
                            if b.attachment == write && b.new == AttachmentState::AttachmentWrite)
                    })
                    .unwrap();
                assert!(at < stream.begin_of(pass.id).unwrap());
            }
        }
    }

    #[test]
    fn test_stats_and_overlay() {
        let rec = recorder();
        let mut store = offscreen_store(16, 16);
        let with = rec.record(&mut store, Extent::new(16, 16), true).unwrap().unwrap();
        assert_eq!(with.stats, FrameStats { passes: 4, barriers: 13, draws: 5 });

        let without = rec.record(&mut store, Extent::new(16, 16), false).unwrap().unwrap();
        assert_eq!(without.stats.draws, 4);
        assert!(without.stream.position(|c| *c == Command::DrawUiOverlay).is_none());
    }

    #[test]
    fn test_consecutive_frames_restart_from_undefined() {
        let rec = recorder();
        let mut store = offscreen_store(16, 16);
        let first = rec.record(&mut store, Extent::new(16, 16), true).unwrap().unwrap();
        let second = rec.record(&mut store, Extent::new(16, 16), true).unwrap().unwrap();
        assert_eq!(first.stream, second.stream);
    }

    #[test]
    fn test_viewport_matches_pass_targets() {
        let rec = recorder();
        let mut store = offscreen_store(320, 200);
        let frame = rec.record(&mut store, Extent::new(320, 200), true).unwrap().unwrap();
        for c in frame.stream.commands() {
            match c {
                Command::SetViewport { width, height, .. } => assert_eq!((*width, *height), (320.0, 200.0)),
                Command::SetScissor { width, height, .. } => assert_eq!((*width, *height), (320, 200)),
                Command::BeginRendering { extent, .. } => assert_eq!(*extent, Extent::new(320, 200)),
                _ => {}
            }
        }
    }

    #[test]
    fn test_clear_values_and_depth_targets() {
        let mut config = RendererConfig::with_seed(1);
        config.clear_color = [0.1, 0.2, 0.3, 1.0];
        config.share_depth_with_composition = true;
        let rec = FrameRecorder::new(&config).unwrap();
        let mut store = offscreen_store(16, 16);
        let frame = rec.record(&mut store, Extent::new(16, 16), true).unwrap().unwrap();

        for c in frame.stream.commands() {
            if let Command::BeginRendering { pass, colors, depth, .. } = c {
                match pass {
                    PassId::GBuffer => {
                        assert!(colors.iter().all(|t| t.clear == CLEAR_COLOR));
                        let d = depth.unwrap();
                        assert_eq!(d.load, DepthLoad::Clear(CLEAR_DEPTH));
                        assert!(d.store);
                    }
                    PassId::Composition => {
                        assert_eq!(colors[0].clear, [0.1, 0.2, 0.3, 1.0]);
                        let d = depth.unwrap();
                        assert_eq!(d.load, DepthLoad::Load);
                        assert!(d.read_only);
                    }
                    _ => assert!(depth.is_none()),
                }
            }
        }
    }

    #[test]
    fn test_missing_attachments_fail() {
        let mut store = AttachmentStore::new(CountingAllocator::default());
        let err = recorder().record(&mut store, Extent::new(8, 8), true).unwrap_err();
        assert!(matches!(err, RenderError::MissingAttachment(_)));
    }
}
