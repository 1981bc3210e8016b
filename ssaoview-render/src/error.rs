//! Central error type for the SSAO renderer.
//!
//! Every variant is fatal: the pipeline has no degraded mode, so callers
//! propagate with `?` up to the application boundary and abort there.
//! Zero-sized surfaces are not errors and never reach this type.

use crate::attachment::{AttachmentId, AttachmentState};
use crate::pass::PassId;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("missing capability: {0}")]
    MissingCapability(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("failed to allocate attachment {label}: {reason}")]
    Allocation { label: String, reason: String },

    #[error("failed to create {pass:?} pipeline: {reason}")]
    PipelineCreation { pass: PassId, reason: String },

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("attachment {0:?} has not been created")]
    MissingAttachment(AttachmentId),

    #[error("illegal transition of {attachment:?}: {from:?} -> {to:?}")]
    IllegalTransition {
        attachment: AttachmentId,
        from: AttachmentState,
        to: AttachmentState,
    },

    #[error("{pass:?} reads {attachment:?} while it is {state:?}")]
    Hazard {
        pass: PassId,
        attachment: AttachmentId,
        state: AttachmentState,
    },

    #[error("{pass:?} writes {attachment:?} without declaring it")]
    UndeclaredWrite { pass: PassId, attachment: AttachmentId },
}

impl RenderError {
    pub fn device<T: ToString>(msg: T) -> Self {
        RenderError::Device(msg.to_string())
    }

    pub fn submission<T: ToString>(msg: T) -> Self {
        RenderError::Submission(msg.to_string())
    }

    pub fn missing_capability<T: ToString>(msg: T) -> Self {
        RenderError::MissingCapability(msg.to_string())
    }
}

/// Result alias for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
