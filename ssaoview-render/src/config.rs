//! Startup configuration for the renderer.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::kernel::NOISE_DIM;
use crate::settings::RenderSettings;
use ssaoview_gpu_shared::uniforms::SSAO_RADIUS;

#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Seed for the kernel and noise. `None` seeds from the wall clock.
    pub kernel_seed: Option<u64>,
    pub noise_dim: u32,
    pub ssao_radius: f32,
    /// Give the composition pass the GBuffer depth view as a depth attachment.
    /// Only needed where the platform demands render-pass compatibility between
    /// the two passes; composition never depth-tests against it.
    pub share_depth_with_composition: bool,
    pub clear_color: [f64; 4],
    pub initial_settings: RenderSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kernel_seed: None,
            noise_dim: NOISE_DIM,
            ssao_radius: SSAO_RADIUS,
            share_depth_with_composition: false,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            initial_settings: RenderSettings::default(),
        }
    }
}

impl RendererConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            kernel_seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn resolved_seed(&self) -> u64 {
        self.kernel_seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }
}
