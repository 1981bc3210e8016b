//! Host copies of the per-frame parameter blocks.
//!
//! Updates are pure functions of camera and settings. A block is only marked
//! dirty when its bytes change, and the backend uploads dirty blocks before the
//! next submission.

use glam::Mat4;
use ssaoview_gpu_shared::uniforms::{SSAOParams, SceneParams};

use crate::camera::Camera;
use crate::settings::RenderSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformBlock {
    Scene,
    Ssao,
}

impl UniformBlock {
    pub const ALL: [UniformBlock; 2] = [UniformBlock::Scene, UniformBlock::Ssao];

    fn index(self) -> usize {
        self as usize
    }
}

pub struct UniformBlockManager {
    scene: SceneParams,
    ssao: SSAOParams,
    dirty: [bool; 2],
}

impl Default for UniformBlockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformBlockManager {
    pub fn new() -> Self {
        Self {
            scene: bytemuck::Zeroable::zeroed(),
            ssao: bytemuck::Zeroable::zeroed(),
            // Both blocks must reach the GPU once even if they stay zeroed.
            dirty: [true; 2],
        }
    }

    /// Recompute `SceneParams` from the camera. Returns true if the bytes changed.
    pub fn update_scene(&mut self, camera: &Camera) -> bool {
        let next = SceneParams {
            projection: camera.projection().to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            near_plane: camera.near,
            far_plane: camera.far,
            _pad1: 0.0,
            _pad2: 0.0,
        };
        Self::store(&mut self.scene, next, &mut self.dirty[UniformBlock::Scene.index()])
    }

    /// Recompute `SSAOParams` from the camera projection and the toggles.
    pub fn update_ssao(&mut self, camera: &Camera, settings: &RenderSettings) -> bool {
        let next = SSAOParams {
            projection: camera.projection().to_cols_array_2d(),
            ssao: settings.ssao_enabled as i32,
            ssao_only: settings.ssao_only as i32,
            ssao_blur: settings.ssao_blur_enabled as i32,
            _pad1: 0,
        };
        Self::store(&mut self.ssao, next, &mut self.dirty[UniformBlock::Ssao.index()])
    }

    fn store<T: bytemuck::Pod>(slot: &mut T, next: T, dirty: &mut bool) -> bool {
        if bytemuck::bytes_of(slot) == bytemuck::bytes_of(&next) {
            return false;
        }
        *slot = next;
        *dirty = true;
        true
    }

    pub fn scene(&self) -> &SceneParams {
        &self.scene
    }

    pub fn ssao(&self) -> &SSAOParams {
        &self.ssao
    }

    pub fn bytes(&self, block: UniformBlock) -> &[u8] {
        match block {
            UniformBlock::Scene => bytemuck::bytes_of(&self.scene),
            UniformBlock::Ssao => bytemuck::bytes_of(&self.ssao),
        }
    }

    pub fn is_dirty(&self, block: UniformBlock) -> bool {
        self.dirty[block.index()]
    }

    /// Blocks changed since the last call, clearing their dirty flags.
    pub fn take_dirty(&mut self) -> Vec<UniformBlock> {
        UniformBlock::ALL
            .into_iter()
            .filter(|b| std::mem::replace(&mut self.dirty[b.index()], false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SsaoToggle;

    #[test]
    fn test_update_scene_is_idempotent() {
        let camera = Camera::default();
        let mut blocks = UniformBlockManager::new();

        assert!(blocks.update_scene(&camera));
        let first = blocks.bytes(UniformBlock::Scene).to_vec();
        blocks.take_dirty();

        assert!(!blocks.update_scene(&camera));
        assert_eq!(blocks.bytes(UniformBlock::Scene), first.as_slice());
        assert!(!blocks.is_dirty(UniformBlock::Scene));
    }

    #[test]
    fn test_update_ssao_is_idempotent() {
        let camera = Camera::default();
        let settings = RenderSettings::default();
        let mut blocks = UniformBlockManager::new();

        blocks.update_ssao(&camera, &settings);
        let first = blocks.bytes(UniformBlock::Ssao).to_vec();
        blocks.update_ssao(&camera, &settings);
        assert_eq!(blocks.bytes(UniformBlock::Ssao), first.as_slice());
    }

    #[test]
    fn test_toggles_reach_the_block() {
        let camera = Camera::default();
        let mut settings = RenderSettings::default();
        let mut blocks = UniformBlockManager::new();
        blocks.update_ssao(&camera, &settings);
        assert_eq!((blocks.ssao().ssao, blocks.ssao().ssao_only, blocks.ssao().ssao_blur), (1, 0, 1));
        blocks.take_dirty();

        settings.set(SsaoToggle::Enabled, false);
        assert!(blocks.update_ssao(&camera, &settings));
        assert_eq!(blocks.ssao().ssao, 0);
        assert_eq!(blocks.take_dirty(), vec![UniformBlock::Ssao]);
        assert!(blocks.take_dirty().is_empty());
    }

    #[test]
    fn test_camera_matrices_written() {
        let camera = Camera::default();
        let mut blocks = UniformBlockManager::new();
        blocks.update_scene(&camera);
        assert_eq!(blocks.scene().projection, camera.projection().to_cols_array_2d());
        assert_eq!(blocks.scene().view, camera.view().to_cols_array_2d());
        assert_eq!(blocks.scene().model, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(blocks.scene().far_plane, 64.0);
    }

    #[test]
    fn test_fresh_blocks_start_dirty() {
        let mut blocks = UniformBlockManager::new();
        assert_eq!(blocks.take_dirty(), UniformBlock::ALL.to_vec());
    }
}
