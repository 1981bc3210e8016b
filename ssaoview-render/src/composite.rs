//! CPU mirror of the blur and composition fragment stages.
//!
//! Evaluates exactly what `blur_frag.wgsl` and `composition_frag.wgsl` compute
//! for one pixel, so the toggle behaviour can be checked without a GPU.

use glam::{Vec3, Vec4};
use ssaoview_gpu_shared::uniforms::SSAOParams;

/// Half-width of the box blur window (5x5).
pub const BLUR_RANGE: i32 = 2;

/// One GBuffer texel as stored in the attachments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GBufferTexel {
    /// View-space position.
    pub position: Vec3,
    /// Normal encoded as `n * 0.5 + 0.5`.
    pub normal: Vec3,
    pub albedo: Vec4,
}

/// Box blur over an `R8`-style single-channel map with clamp-to-edge addressing.
pub fn box_blur(ssao: &[f32], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as i32, height as i32);
    let at = |x: i32, y: i32| ssao[(y.clamp(0, h - 1) * w + x.clamp(0, w - 1)) as usize];
    let taps = ((2 * BLUR_RANGE + 1) * (2 * BLUR_RANGE + 1)) as f32;

    let mut out = Vec::with_capacity(ssao.len());
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for dy in -BLUR_RANGE..=BLUR_RANGE {
                for dx in -BLUR_RANGE..=BLUR_RANGE {
                    sum += at(x + dx, y + dy);
                }
            }
            out.push(sum / taps);
        }
    }
    out
}

/// Composition output colour for one pixel.
pub fn shade(texel: &GBufferTexel, ssao: f32, ssao_blurred: f32, params: &SSAOParams) -> Vec3 {
    let normal = (texel.normal * 2.0 - Vec3::ONE).normalize_or_zero();
    let light = (-texel.position).normalize_or_zero();
    let n_dot_l = normal.dot(light).max(0.5);

    let occlusion = if params.ssao_blur == 1 { ssao_blurred } else { ssao };
    if params.ssao_only == 1 {
        return Vec3::splat(occlusion);
    }
    let base = texel.albedo.truncate() * n_dot_l;
    if params.ssao == 1 {
        base * occlusion
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::settings::{RenderSettings, SsaoToggle};
    use crate::uniform_blocks::UniformBlockManager;

    fn texel() -> GBufferTexel {
        GBufferTexel {
            position: Vec3::new(0.0, 0.0, -3.0),
            normal: Vec3::new(0.5, 0.5, 1.0),
            albedo: Vec4::new(0.8, 0.4, 0.2, 1.0),
        }
    }

    fn params_for(settings: &RenderSettings) -> SSAOParams {
        let mut blocks = UniformBlockManager::new();
        blocks.update_ssao(&Camera::default(), settings);
        *blocks.ssao()
    }

    #[test]
    fn test_ssao_disabled_yields_unoccluded_composite() {
        let mut settings = RenderSettings::default();
        settings.set(SsaoToggle::Enabled, false);
        let params = params_for(&settings);
        assert_eq!(params.ssao, 0);

        // Normal faces the camera, so NdotL is 1.
        let expected = texel().albedo.truncate();
        for (raw, blurred) in [(0.0, 0.0), (0.3, 0.7), (1.0, 1.0)] {
            assert_eq!(shade(&texel(), raw, blurred, &params), expected);
        }
    }

    #[test]
    fn test_ssao_only_ignores_albedo() {
        let mut settings = RenderSettings::default();
        settings.set(SsaoToggle::Only, true);
        let params = params_for(&settings);

        let mut dark = texel();
        dark.albedo = Vec4::ZERO;
        assert_eq!(shade(&texel(), 0.2, 0.6, &params), Vec3::splat(0.6));
        assert_eq!(shade(&dark, 0.2, 0.6, &params), Vec3::splat(0.6));
    }

    #[test]
    fn test_blur_toggle_selects_source() {
        let mut settings = RenderSettings::default();
        settings.set(SsaoToggle::Only, true);
        settings.set(SsaoToggle::Blur, false);
        let params = params_for(&settings);
        assert_eq!(shade(&texel(), 0.2, 0.6, &params), Vec3::splat(0.2));
    }

    #[test]
    fn test_ndotl_floor() {
        let params = params_for(&RenderSettings::default());
        let mut side = texel();
        // Normal perpendicular to the view ray.
        side.normal = Vec3::new(1.0, 0.5, 0.5);
        let c = shade(&side, 1.0, 1.0, &params);
        assert!((c - side.albedo.truncate() * 0.5).length() < 1e-6);
    }

    #[test]
    fn test_box_blur() {
        let flat = vec![0.5; 16];
        for v in box_blur(&flat, 4, 4) {
            assert!((v - 0.5).abs() < 1e-6);
        }

        let mut spike = vec![0.0; 49];
        spike[3 * 7 + 3] = 25.0;
        let out = box_blur(&spike, 7, 7);
        assert!((out[3 * 7 + 3] - 1.0).abs() < 1e-6);
        assert!((out[1 * 7 + 1] - 1.0).abs() < 1e-6);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_ssao_only_end_to_end_with_blur() {
        let (w, h) = (6u32, 6u32);
        let raw: Vec<f32> = (0..w * h).map(|i| (i % 5) as f32 / 4.0).collect();
        let blurred = box_blur(&raw, w, h);

        let mut settings = RenderSettings::default();
        settings.set(SsaoToggle::Only, true);
        let params = params_for(&settings);

        for i in 0..(w * h) as usize {
            let color = shade(&texel(), raw[i], blurred[i], &params);
            assert_eq!(color, Vec3::splat(blurred[i]));
        }
    }
}
