//! SSAO sampling data: the hemisphere kernel and the tiled rotation noise.
//!
//! Both are drawn from one seeded `StdRng` stream, kernel first, so a fixed
//! seed reproduces the exact same data.

use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ssaoview_gpu_shared::uniforms::{SSAOKernel, SSAO_KERNEL_SIZE};

/// Edge length of the noise tile.
#[cfg(any(target_os = "android", target_os = "ios"))]
pub const NOISE_DIM: u32 = 8;
#[cfg(not(any(target_os = "android", target_os = "ios")))]
pub const NOISE_DIM: u32 = 4;

fn lerp(a: f32, b: f32, f: f32) -> f32 {
    a + f * (b - a)
}

/// Radial weight of kernel sample `i`: `lerp(0.1, 1.0, (i / N)^2)`.
/// Packs samples close to the origin, where nearby occluders matter most.
pub fn falloff(i: usize) -> f32 {
    let t = i as f32 / SSAO_KERNEL_SIZE as f32;
    lerp(0.1, 1.0, t * t)
}

/// Immutable hemisphere sample kernel oriented along +Z.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    samples: [Vec4; SSAO_KERNEL_SIZE],
}

impl Kernel {
    pub fn samples(&self) -> &[Vec4; SSAO_KERNEL_SIZE] {
        &self.samples
    }

    pub fn to_uniform(&self) -> SSAOKernel {
        SSAOKernel {
            samples: self.samples.map(|s| s.to_array()),
        }
    }
}

/// Square tile of 2-D rotation vectors, addressed with repeat wrapping.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseTile {
    dim: u32,
    texels: Vec<Vec4>,
}

impl NoiseTile {
    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Texel at integer coordinates, wrapped into the tile.
    pub fn texel(&self, x: i64, y: i64) -> Vec4 {
        let d = self.dim as i64;
        let (x, y) = (x.rem_euclid(d), y.rem_euclid(d));
        self.texels[(y * d + x) as usize]
    }

    /// Nearest-neighbour lookup at normalized coordinates with repeat addressing.
    pub fn sample(&self, u: f32, v: f32) -> Vec4 {
        let d = self.dim as f32;
        self.texel((u * d).floor() as i64, (v * d).floor() as i64)
    }

    /// Row-major `Rgba32Float` texel data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let texels: Vec<[f32; 4]> = self.texels.iter().map(|t| t.to_array()).collect();
        bytemuck::cast_slice(&texels).to_vec()
    }
}

/// Seeded generator for the kernel and noise tile.
pub struct KernelGenerator {
    rng: StdRng,
}

impl KernelGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    fn signed(&mut self) -> f32 {
        self.unit() * 2.0 - 1.0
    }

    pub fn kernel(&mut self) -> Kernel {
        let mut samples = [Vec4::ZERO; SSAO_KERNEL_SIZE];
        for (i, slot) in samples.iter_mut().enumerate() {
            let dir = Vec3::new(self.signed(), self.signed(), self.unit()).normalize_or_zero();
            let sample = dir * self.unit() * falloff(i);
            *slot = sample.extend(0.0);
        }
        Kernel { samples }
    }

    pub fn noise(&mut self, dim: u32) -> NoiseTile {
        let texels = (0..dim * dim)
            .map(|_| Vec4::new(self.signed(), self.signed(), 0.0, 0.0))
            .collect();
        NoiseTile { dim, texels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_stays_in_scaled_hemisphere() {
        let kernel = KernelGenerator::new(7).kernel();
        for (i, s) in kernel.samples().iter().enumerate() {
            assert!(s.z >= 0.0, "sample {i} below the hemisphere");
            assert_eq!(s.w, 0.0);
            // Unit direction times a [0, 1) scalar, then the fall-off weight.
            let unscaled = s.truncate().length() / falloff(i);
            assert!(unscaled <= 1.0 + 1e-5, "sample {i} has unscaled length {unscaled}");
        }
    }

    #[test]
    fn test_falloff_curve() {
        assert!((falloff(0) - 0.1).abs() < 1e-6);
        for i in 0..SSAO_KERNEL_SIZE {
            let t = i as f32 / 64.0;
            let expected = 0.1 + (1.0 - 0.1) * t * t;
            assert!((falloff(i) - expected).abs() < 1e-6);
            if i > 0 {
                assert!(falloff(i) >= falloff(i - 1));
            }
        }
        assert!(falloff(SSAO_KERNEL_SIZE - 1) < 1.0);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let mut a = KernelGenerator::new(42);
        let mut b = KernelGenerator::new(42);
        assert_eq!(a.kernel(), b.kernel());
        assert_eq!(a.noise(NOISE_DIM), b.noise(NOISE_DIM));

        let other = KernelGenerator::new(43).kernel();
        assert_ne!(KernelGenerator::new(42).kernel(), other);
    }

    #[test]
    fn test_noise_components() {
        let noise = KernelGenerator::new(1).noise(8);
        assert_eq!(noise.texels().len(), 64);
        for t in noise.texels() {
            assert!((-1.0..1.0).contains(&t.x));
            assert!((-1.0..1.0).contains(&t.y));
            assert_eq!((t.z, t.w), (0.0, 0.0));
        }
        assert_eq!(noise.to_bytes().len(), 64 * 16);
    }

    #[test]
    fn test_noise_tiles_under_wrap_addressing() {
        let noise = KernelGenerator::new(3).noise(4);
        for y in 0..4 {
            for x in 0..4 {
                let u = (x as f32 + 0.5) / 4.0;
                let v = (y as f32 + 0.5) / 4.0;
                let base = noise.sample(u, v);
                assert_eq!(base, noise.texel(x, y));
                for k in [-2.0f32, -1.0, 1.0, 3.0] {
                    assert_eq!(noise.sample(u + k, v), base);
                    assert_eq!(noise.sample(u, v + k), base);
                }
                assert_eq!(noise.texel(x + 4 * 5, y - 4 * 3), base);
            }
        }
    }

    #[test]
    fn test_kernel_uniform_layout() {
        let kernel = KernelGenerator::new(9).kernel();
        let block = kernel.to_uniform();
        assert_eq!(block.samples[10], kernel.samples()[10].to_array());
    }
}
