use std::sync::Arc;

use glam::Vec3;

use ssaoview_render::camera::Camera;
use ssaoview_render::command::Extent;
use ssaoview_render::config::RendererConfig;
use ssaoview_render::kernel::KernelGenerator;
use ssaoview_render::recorder::{FrameRecorder, FrameStats};
use ssaoview_render::resize::ResizePlan;
use ssaoview_render::settings::{RenderSettings, SsaoToggle};
use ssaoview_render::uniform_blocks::UniformBlockManager;
use ssaoview_render::{RenderError, RenderResult};

use crate::executor::{self, FrameContext};
use crate::geometry::{BaseColorImage, MeshStore, UiOverlay, Vertex};
use crate::passes::PassBindGroups;
use crate::pipeline::PipelineStateFactory;
use crate::render_targets::{GpuAttachmentStore, WgpuAllocator};
use crate::resources::SsaoResources;

/// What happened to a frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented(FrameStats),
    /// Zero-sized or lost surface. Nothing was submitted.
    Skipped,
}

/// Main backend state. Owns the device, the surface and every pipeline resource.
pub struct SsaoBackendState {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub width: u32,
    pub height: u32,

    config: RendererConfig,
    store: GpuAttachmentStore,
    resources: SsaoResources,
    // Both are dropped before the attachments they reference on resize.
    factory: Option<PipelineStateFactory>,
    bind_groups: Option<PassBindGroups>,
    recorder: FrameRecorder,
    uniforms: UniformBlockManager,
    camera: Camera,
    settings: RenderSettings,
    pub meshes: MeshStore,
    overlay: Option<Box<dyn UiOverlay + Send>>,

    pub last_stats: Option<FrameStats>,
    pub last_error: Option<String>,
}

impl SsaoBackendState {
    /// Create a new backend state from a raw window handle.
    pub fn new(
        window: impl raw_window_handle::HasWindowHandle + raw_window_handle::HasDisplayHandle + Send + Sync + 'static,
        width: u32,
        height: u32,
        config: RendererConfig,
    ) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::missing_capability(format!("Failed to create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::missing_capability("Failed to find suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("SSAO Viewer Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::missing_capability(format!("Failed to create device: {e}")))?;
        let device = Arc::new(device);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::missing_capability("Surface reports no formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let seed = config.resolved_seed();
        log::info!("Generating SSAO kernel with seed {seed}");
        let mut generator = KernelGenerator::new(seed);
        let kernel = generator.kernel();
        let noise = generator.noise(config.noise_dim);
        let resources = SsaoResources::new(&device, &queue, &kernel, &noise);

        let recorder = FrameRecorder::new(&config)?;
        let store = GpuAttachmentStore::new(WgpuAllocator::new(device.clone()));

        let mut camera = Camera::default();
        camera.set_viewport(width, height);
        let settings = config.initial_settings;

        let mut state = Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            width,
            height,
            config,
            store,
            resources,
            factory: None,
            bind_groups: None,
            recorder,
            uniforms: UniformBlockManager::new(),
            camera,
            settings,
            meshes: MeshStore::new(),
            overlay: None,
            last_stats: None,
            last_error: None,
        };
        state.uniforms.update_scene(&state.camera);
        state.uniforms.update_ssao(&state.camera, &state.settings);
        state.apply_size(width, height)?;

        let info = state.adapter.get_info();
        log::info!("SSAO backend initialized: {} ({:?})", info.name, info.backend);
        Ok(state)
    }

    /// Bring the size-dependent resources in line with `width x height`.
    ///
    /// Pipelines and descriptor sets are dropped before the attachments they
    /// reference. A zero size leaves everything torn down.
    fn apply_size(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let next = Extent::new(width, height);
        let plan = ResizePlan::decide(Extent::new(self.width, self.height), next, self.factory.is_some());
        self.width = width;
        self.height = height;
        if plan == ResizePlan::Unchanged {
            return Ok(());
        }

        self.bind_groups = None;
        self.factory = None;
        plan.apply(&mut self.store, next)?;
        if plan == ResizePlan::TearDown {
            return Ok(());
        }

        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);

        log::info!("Created attachments at {width}x{height}");
        let factory = PipelineStateFactory::new(
            &self.device,
            self.surface_config.format,
            &self.config,
            &self.resources.material_bgl,
        )?;
        let bind_groups = PassBindGroups::new(&self.device, &factory, &self.store, &self.resources)?;
        self.factory = Some(factory);
        self.bind_groups = Some(bind_groups);
        self.camera.set_viewport(width, height);
        Ok(())
    }

    /// Resize the surface and rebuild every size-dependent resource.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.apply_size(width, height)?;
        log::info!("Resized to {width}x{height}");
        Ok(())
    }

    pub fn set_camera(&mut self, position: Vec3, rotation: Vec3) {
        self.camera.set_position(position);
        self.camera.set_rotation(rotation);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Flip a UI toggle. The SSAO block is refreshed right away.
    pub fn set_toggle(&mut self, toggle: SsaoToggle, value: bool) {
        if self.settings.set(toggle, value) {
            log::debug!("{toggle:?} -> {value}");
            self.uniforms.update_ssao(&self.camera, &self.settings);
        }
    }

    pub fn set_overlay(&mut self, overlay: Option<Box<dyn UiOverlay + Send>>) {
        self.overlay = overlay;
    }

    pub fn upload_mesh(&mut self, vertices: &[Vertex], indices: &[u32], base_color: Option<BaseColorImage<'_>>) -> u64 {
        self.meshes
            .upload(&self.device, &self.queue, &self.resources, vertices, indices, base_color)
    }

    pub fn destroy_mesh(&mut self, handle: u64) -> bool {
        self.meshes.destroy(handle)
    }

    /// Record, validate, submit and present one frame.
    pub fn render_frame(&mut self) -> RenderResult<FrameOutcome> {
        let extent = Extent::new(self.width, self.height);
        if extent.is_empty() {
            return Ok(FrameOutcome::Skipped);
        }

        if self.camera.take_updated() {
            self.uniforms.update_scene(&self.camera);
            self.uniforms.update_ssao(&self.camera, &self.settings);
        }
        self.resources.flush(&self.queue, &mut self.uniforms);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::warn!("Surface lost, reconfiguring and skipping frame");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(FrameOutcome::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface acquire timed out, skipping frame");
                return Ok(FrameOutcome::Skipped);
            }
            Err(e) => return Err(RenderError::device(format!("Surface texture error: {e}"))),
        };
        let swapchain_view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let frame = match self
            .recorder
            .record(&mut self.store, extent, self.overlay.is_some())?
        {
            Some(frame) => frame,
            None => return Ok(FrameOutcome::Skipped),
        };

        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| RenderError::device("pipelines not built"))?;
        let bind_groups = self
            .bind_groups
            .as_ref()
            .ok_or_else(|| RenderError::device("bind groups not built"))?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("SSAO Frame Encoder"),
        });

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let ctx = FrameContext {
            sequencer: self.recorder.sequencer(),
            store: &self.store,
            swapchain_view: &swapchain_view,
            pipelines: factory,
            bind_groups,
            scene: &self.meshes,
            overlay: self.overlay.as_deref().map(|o| o as &dyn UiOverlay),
        };
        if let Err(err) = executor::execute(&mut encoder, &frame.stream, &ctx) {
            pollster::block_on(self.device.pop_error_scope());
            return Err(err);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::submission(err));
        }

        output.present();
        self.last_stats = Some(frame.stats);
        Ok(FrameOutcome::Presented(frame.stats))
    }
}
