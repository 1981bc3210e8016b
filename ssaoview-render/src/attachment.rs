//! Off-screen attachments and their per-frame state machine.
//!
//! The store exclusively owns every off-screen image. Images are RAII values
//! handed out by an [`AttachmentAllocator`]: dropping a slot releases the GPU
//! memory, so teardown on resize or shutdown is just clearing the slots.

use crate::error::{RenderError, RenderResult};

/// Pixel formats used by the SSAO pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentFormat {
    /// View-space position in xyz, linear depth in w.
    Rgba32Float,
    Rgba8Unorm,
    R8Unorm,
    Depth32Float,
}

impl AttachmentFormat {
    pub fn bytes_per_pixel(self) -> u64 {
        match self {
            AttachmentFormat::Rgba32Float => 16,
            AttachmentFormat::Rgba8Unorm | AttachmentFormat::Depth32Float => 4,
            AttachmentFormat::R8Unorm => 1,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(self, AttachmentFormat::Depth32Float)
    }
}

/// What an attachment is rendered as. Every attachment is also sampleable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentUsage {
    Color,
    Depth,
}

/// Resource state tracked per attachment within one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentState {
    Undefined,
    AttachmentWrite,
    ShaderRead,
    PresentSource,
}

/// Attachment slots known to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentId {
    Position,
    Normal,
    Albedo,
    Ssao,
    SsaoBlur,
    Depth,
    /// Presentation target. Its image belongs to the swapchain; only its state lives here.
    Swapchain,
}

impl AttachmentId {
    pub const COUNT: usize = 7;

    pub const ALL: [AttachmentId; Self::COUNT] = [
        AttachmentId::Position,
        AttachmentId::Normal,
        AttachmentId::Albedo,
        AttachmentId::Ssao,
        AttachmentId::SsaoBlur,
        AttachmentId::Depth,
        AttachmentId::Swapchain,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_external(self) -> bool {
        self == AttachmentId::Swapchain
    }

    pub fn label(self) -> &'static str {
        match self {
            AttachmentId::Position => "GBuffer Position",
            AttachmentId::Normal => "GBuffer Normal",
            AttachmentId::Albedo => "GBuffer Albedo",
            AttachmentId::Ssao => "SSAO Color",
            AttachmentId::SsaoBlur => "SSAO Blur Color",
            AttachmentId::Depth => "Depth Stencil",
            AttachmentId::Swapchain => "Swapchain",
        }
    }
}

/// Format and usage of every store-owned attachment.
pub const OFFSCREEN_ATTACHMENTS: [(AttachmentId, AttachmentFormat, AttachmentUsage); 6] = [
    (AttachmentId::Position, AttachmentFormat::Rgba32Float, AttachmentUsage::Color),
    (AttachmentId::Normal, AttachmentFormat::Rgba8Unorm, AttachmentUsage::Color),
    (AttachmentId::Albedo, AttachmentFormat::Rgba8Unorm, AttachmentUsage::Color),
    (AttachmentId::Ssao, AttachmentFormat::R8Unorm, AttachmentUsage::Color),
    (AttachmentId::SsaoBlur, AttachmentFormat::R8Unorm, AttachmentUsage::Color),
    (AttachmentId::Depth, AttachmentFormat::Depth32Float, AttachmentUsage::Depth),
];

/// Creation parameters of an attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub id: AttachmentId,
    pub format: AttachmentFormat,
    pub usage: AttachmentUsage,
    pub width: u32,
    pub height: u32,
}

impl AttachmentDesc {
    /// Backing memory size: `width * height * bytes_per_pixel(format)`.
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel()
    }
}

/// Backend hook that turns a descriptor into a GPU image usable both as a
/// render target and as a sampled texture.
pub trait AttachmentAllocator {
    /// Image + view guard. Dropping it must release the backing memory.
    type Image;

    fn allocate(&mut self, desc: &AttachmentDesc) -> RenderResult<Self::Image>;
}

/// An allocated attachment.
pub struct Attachment<I> {
    desc: AttachmentDesc,
    image: I,
}

impl<I> Attachment<I> {
    pub fn desc(&self) -> &AttachmentDesc {
        &self.desc
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }
}

/// Owner of all off-screen attachments and of every attachment's current state.
pub struct AttachmentStore<A: AttachmentAllocator> {
    allocator: A,
    slots: [Option<Attachment<A::Image>>; AttachmentId::COUNT],
    states: [AttachmentState; AttachmentId::COUNT],
}

impl<A: AttachmentAllocator> AttachmentStore<A> {
    pub fn new(allocator: A) -> Self {
        Self {
            allocator,
            slots: std::array::from_fn(|_| None),
            states: [AttachmentState::Undefined; AttachmentId::COUNT],
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Allocate (or replace) the attachment in slot `id`.
    pub fn create(
        &mut self,
        id: AttachmentId,
        format: AttachmentFormat,
        usage: AttachmentUsage,
        width: u32,
        height: u32,
    ) -> RenderResult<&Attachment<A::Image>> {
        if id.is_external() {
            return Err(RenderError::Allocation {
                label: id.label().into(),
                reason: "swapchain images are owned by the presentation engine".into(),
            });
        }
        if width == 0 || height == 0 {
            return Err(RenderError::Allocation {
                label: id.label().into(),
                reason: format!("zero extent {width}x{height}"),
            });
        }

        let desc = AttachmentDesc {
            id,
            format,
            usage,
            width,
            height,
        };

        // Release the previous image before allocating its replacement.
        self.slots[id.index()] = None;
        let image = self.allocator.allocate(&desc)?;
        log::info!(
            "Created attachment {} {}x{} {:?} ({} bytes)",
            id.label(),
            width,
            height,
            format,
            desc.byte_size()
        );

        self.states[id.index()] = AttachmentState::Undefined;
        let attachment = self.slots[id.index()].insert(Attachment { desc, image });
        Ok(&*attachment)
    }

    /// Create the full off-screen set at `width x height`.
    pub fn create_offscreen(&mut self, width: u32, height: u32) -> RenderResult<()> {
        for (id, format, usage) in OFFSCREEN_ATTACHMENTS {
            self.create(id, format, usage, width, height)?;
        }
        Ok(())
    }

    pub fn get(&self, id: AttachmentId) -> Option<&Attachment<A::Image>> {
        self.slots[id.index()].as_ref()
    }

    pub fn expect(&self, id: AttachmentId) -> RenderResult<&Attachment<A::Image>> {
        self.get(id).ok_or(RenderError::MissingAttachment(id))
    }

    /// Descriptors of every live attachment, in slot order.
    pub fn descs(&self) -> Vec<AttachmentDesc> {
        self.slots.iter().flatten().map(|a| a.desc).collect()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Release every attachment.
    pub fn destroy_all(&mut self) {
        let released = self.live_count();
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.states = [AttachmentState::Undefined; AttachmentId::COUNT];
        if released > 0 {
            log::info!("Destroyed {released} attachments");
        }
    }

    /// Tear down every attachment and recreate the same set at a new size.
    ///
    /// A zero extent is not a size to render at: the current set stays live.
    pub fn recreate(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring recreate at {width}x{height}");
            return Ok(());
        }
        let descs = self.descs();
        self.destroy_all();
        for desc in descs {
            self.create(desc.id, desc.format, desc.usage, width, height)?;
        }
        Ok(())
    }

    pub fn state(&self, id: AttachmentId) -> AttachmentState {
        self.states[id.index()]
    }

    /// Move `id` to `to`, enforcing `Undefined -> AttachmentWrite -> {ShaderRead | PresentSource}`.
    /// Returns the previous state.
    pub fn transition(&mut self, id: AttachmentId, to: AttachmentState) -> RenderResult<AttachmentState> {
        if !id.is_external() && self.get(id).is_none() {
            return Err(RenderError::MissingAttachment(id));
        }
        let from = self.states[id.index()];
        let legal = matches!(
            (from, to),
            (AttachmentState::Undefined, AttachmentState::AttachmentWrite)
                | (AttachmentState::AttachmentWrite, AttachmentState::ShaderRead)
                | (AttachmentState::AttachmentWrite, AttachmentState::PresentSource)
        );
        if !legal {
            return Err(RenderError::IllegalTransition { attachment: id, from, to });
        }
        self.states[id.index()] = to;
        Ok(from)
    }

    /// Contents are never preserved across frames: every state restarts at `Undefined`.
    pub fn begin_frame(&mut self) {
        self.states = [AttachmentState::Undefined; AttachmentId::COUNT];
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Allocator that counts allocations and releases of its images.
    #[derive(Clone, Default)]
    pub struct CountingAllocator {
        pub created: Rc<Cell<usize>>,
        pub destroyed: Rc<Cell<usize>>,
        pub fail_on: Option<AttachmentId>,
    }

    pub struct CountedImage {
        pub desc: AttachmentDesc,
        destroyed: Rc<Cell<usize>>,
    }

    impl Drop for CountedImage {
        fn drop(&mut self) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    /// Store holding the full off-screen set, backed by a counting allocator.
    pub fn offscreen_store(width: u32, height: u32) -> AttachmentStore<CountingAllocator> {
        let mut store = AttachmentStore::new(CountingAllocator::default());
        store
            .create_offscreen(width, height)
            .expect("counting allocator never fails without fail_on");
        store
    }

    impl AttachmentAllocator for CountingAllocator {
        type Image = CountedImage;

        fn allocate(&mut self, desc: &AttachmentDesc) -> RenderResult<CountedImage> {
            if self.fail_on == Some(desc.id) {
                return Err(RenderError::Allocation {
                    label: desc.id.label().into(),
                    reason: "out of device memory".into(),
                });
            }
            self.created.set(self.created.get() + 1);
            Ok(CountedImage {
                desc: *desc,
                destroyed: Rc::clone(&self.destroyed),
            })
        }
    }
}
