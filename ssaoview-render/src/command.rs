//! Backend-neutral command stream for one frame.

use crate::attachment::AttachmentId;
use crate::barrier::Barrier;
use crate::pass::PassId;

/// Colour targets clear to transparent black.
pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 0.0];
/// Depth clears to the far plane.
pub const CLEAR_DEPTH: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorTarget {
    pub attachment: AttachmentId,
    pub clear: [f64; 4],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DepthLoad {
    Clear(f32),
    Load,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthTarget {
    pub attachment: AttachmentId,
    pub load: DepthLoad,
    /// Keep the contents after the pass ends.
    pub store: bool,
    pub read_only: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Barrier(Barrier),
    BeginRendering {
        pass: PassId,
        colors: Vec<ColorTarget>,
        depth: Option<DepthTarget>,
        extent: Extent,
    },
    BindPipeline(PassId),
    BindDescriptorSet(PassId),
    SetViewport {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        min_depth: f32,
        max_depth: f32,
    },
    SetScissor {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    DrawFullscreenTriangle,
    DrawScene,
    DrawUiOverlay,
    EndRendering(PassId),
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            Command::DrawFullscreenTriangle | Command::DrawScene | Command::DrawUiOverlay
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandStream {
    commands: Vec<Command>,
}

impl CommandStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn extend_barriers(&mut self, barriers: impl IntoIterator<Item = Barrier>) {
        self.commands.extend(barriers.into_iter().map(Command::Barrier));
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn barriers(&self) -> impl Iterator<Item = &Barrier> + '_ {
        self.commands.iter().filter_map(|c| match c {
            Command::Barrier(b) => Some(b),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Index of the first command matching `pred`.
    pub fn position(&self, pred: impl Fn(&Command) -> bool) -> Option<usize> {
        self.commands.iter().position(pred)
    }

    pub fn begin_of(&self, pass: PassId) -> Option<usize> {
        self.position(|c| matches!(c, Command::BeginRendering { pass: p, .. } if *p == pass))
    }

    pub fn end_of(&self, pass: PassId) -> Option<usize> {
        self.position(|c| matches!(c, Command::EndRendering(p) if *p == pass))
    }
}
