//! GPU-facing data shared by the SSAO renderer crates.
//!
//! Everything here is plain data: `#[repr(C)]` uniform blocks whose layout
//! matches the WGSL structs, and the embedded shader sources.

pub mod shaders;
pub mod uniforms;
