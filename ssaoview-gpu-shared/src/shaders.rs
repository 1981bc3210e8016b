/// Embedded WGSL shader sources for the four SSAO pipeline passes.
/// Every screen-space pass pairs `FULLSCREEN_VERT` with its own fragment stage.

pub const GBUFFER_VERT: &str = include_str!("../shaders/gbuffer_vert.wgsl");
pub const GBUFFER_FRAG: &str = include_str!("../shaders/gbuffer_frag.wgsl");
pub const FULLSCREEN_VERT: &str = include_str!("../shaders/fullscreen_vert.wgsl");
pub const SSAO_FRAG: &str = include_str!("../shaders/ssao_frag.wgsl");
pub const BLUR_FRAG: &str = include_str!("../shaders/blur_frag.wgsl");
pub const COMPOSITION_FRAG: &str = include_str!("../shaders/composition_frag.wgsl");

/// Name of the SSAO fragment stage's kernel-size override constant.
pub const SSAO_KERNEL_SIZE_CONSTANT: &str = "kernel_size";
/// Name of the SSAO fragment stage's radius override constant.
pub const SSAO_RADIUS_CONSTANT: &str = "radius";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_entry_points_present() {
        for src in [GBUFFER_VERT, FULLSCREEN_VERT] {
            assert!(src.contains("fn vs_main"));
        }
        for src in [GBUFFER_FRAG, SSAO_FRAG, BLUR_FRAG, COMPOSITION_FRAG] {
            assert!(src.contains("fn fs_main"));
        }
    }

    #[test]
    fn test_ssao_overrides_declared() {
        assert!(SSAO_FRAG.contains(&format!("override {SSAO_KERNEL_SIZE_CONSTANT}")));
        assert!(SSAO_FRAG.contains(&format!("override {SSAO_RADIUS_CONSTANT}")));
    }
}
