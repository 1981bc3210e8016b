//! Platform-independent core of the deferred SSAO renderer.
//!
//! Owns the attachment state machine, the fixed four-pass graph, barrier
//! insertion, SSAO kernel/noise generation and the per-frame uniform blocks.
//! Frames are recorded into a backend-neutral [`command::CommandStream`] that a
//! GPU backend replays; nothing in this crate touches a GPU API.

pub mod attachment;
pub mod barrier;
pub mod camera;
pub mod command;
pub mod composite;
pub mod config;
pub mod error;
pub mod kernel;
pub mod pass;
pub mod recorder;
pub mod resize;
pub mod settings;
pub mod uniform_blocks;

pub use error::{RenderError, RenderResult};
