use bytemuck::{Pod, Zeroable};

/// Number of hemisphere samples in the SSAO kernel.
/// Also the array length of `SSAOKernel` in ssao_frag.wgsl.
pub const SSAO_KERNEL_SIZE: usize = 64;

/// Default sampling radius (view-space units) of the SSAO pass.
pub const SSAO_RADIUS: f32 = 0.3;

/// Scene matrices for the GBuffer pass, group 0, binding 0 (vertex + fragment).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneParams {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub near_plane: f32,
    pub far_plane: f32,
    pub _pad1: f32,
    pub _pad2: f32,
}

/// SSAO toggles and projection. SSAO pass binding 4, Composition pass binding 5.
///
/// The toggles are `i32` (0 / 1) because WGSL uniform structs cannot hold `bool`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SSAOParams {
    pub projection: [[f32; 4]; 4],
    pub ssao: i32,
    pub ssao_only: i32,
    pub ssao_blur: i32,
    pub _pad1: i32,
}

/// Hemisphere sample kernel, SSAO pass binding 3.
/// `w` is always 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SSAOKernel {
    pub samples: [[f32; 4]; SSAO_KERNEL_SIZE],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SceneParams>(), 208);
        assert_eq!(std::mem::size_of::<SSAOParams>(), 80);
        assert_eq!(std::mem::size_of::<SSAOKernel>(), 1024);
        assert_eq!(std::mem::size_of::<SceneParams>() % 16, 0);
        assert_eq!(std::mem::size_of::<SSAOParams>() % 16, 0);
    }

    #[test]
    fn test_ssao_params_toggle_offsets() {
        // ssao_frag.wgsl / composition_frag.wgsl read the toggles right after the matrix.
        let params = SSAOParams {
            projection: [[0.0; 4]; 4],
            ssao: 1,
            ssao_only: 2,
            ssao_blur: 3,
            _pad1: 0,
        };
        let bytes = bytemuck::bytes_of(&params);
        assert_eq!(&bytes[64..68], &1i32.to_le_bytes());
        assert_eq!(&bytes[68..72], &2i32.to_le_bytes());
        assert_eq!(&bytes[72..76], &3i32.to_le_bytes());
    }
}
