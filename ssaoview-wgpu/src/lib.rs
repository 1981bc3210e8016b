//! SSAO viewer wgpu backend: C FFI entry points.
//!
//! This crate is compiled as a cdylib and loaded by the host application.
//! All public functions use `extern "C"` ABI with `#[no_mangle]`.
//! The host owns the window, the event loop and frame pacing.

mod backend;
mod executor;
mod geometry;
mod handle;
mod passes;
mod pipeline;
mod render_targets;
mod resources;

pub use backend::{FrameOutcome, SsaoBackendState};
pub use executor::{validate_stream, StateMirror};
pub use geometry::{SceneDrawer, UiOverlay, Vertex};

use backend::SsaoBackendState as State;
use geometry::{interleave, BaseColorImage};
use glam::Vec3;
use handle::HandleStore;
use ssaoview_render::config::RendererConfig;
use ssaoview_render::settings::SsaoToggle;
use ssaoview_render::RenderError;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::{Mutex, MutexGuard};

// Global store of backend instances (usually just one).
static BACKENDS: std::sync::LazyLock<Mutex<HandleStore<State>>> =
    std::sync::LazyLock::new(|| Mutex::new(HandleStore::new()));

// Keeps the string handed out by `ssaoview_last_error` alive until the next call.
static ERROR_TEXT: std::sync::LazyLock<Mutex<Option<CString>>> = std::sync::LazyLock::new(|| Mutex::new(None));

// Failure of the most recent `ssaoview_initialize`, reported for handle 0.
static INIT_ERROR: Mutex<Option<String>> = Mutex::new(None);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================
// Window handle wrapper for raw-window-handle integration
// ============================================================

/// Wrapper that implements HasWindowHandle + HasDisplayHandle for X11.
#[cfg(target_os = "linux")]
struct X11WindowHandle {
    window: u64,
    display: *mut std::ffi::c_void,
}

#[cfg(target_os = "linux")]
unsafe impl Send for X11WindowHandle {}
#[cfg(target_os = "linux")]
unsafe impl Sync for X11WindowHandle {}

#[cfg(target_os = "linux")]
impl raw_window_handle::HasWindowHandle for X11WindowHandle {
    fn window_handle(&self) -> Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError> {
        let raw = raw_window_handle::RawWindowHandle::Xlib(raw_window_handle::XlibWindowHandle::new(self.window as _));
        Ok(unsafe { raw_window_handle::WindowHandle::borrow_raw(raw) })
    }
}

#[cfg(target_os = "linux")]
impl raw_window_handle::HasDisplayHandle for X11WindowHandle {
    fn display_handle(&self) -> Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError> {
        let raw = raw_window_handle::RawDisplayHandle::Xlib(raw_window_handle::XlibDisplayHandle::new(
            std::ptr::NonNull::new(self.display),
            0,
        ));
        Ok(unsafe { raw_window_handle::DisplayHandle::borrow_raw(raw) })
    }
}

/// Wrapper for Windows (Win32).
#[cfg(target_os = "windows")]
struct Win32WindowHandle {
    hwnd: *mut std::ffi::c_void,
}

#[cfg(target_os = "windows")]
unsafe impl Send for Win32WindowHandle {}
#[cfg(target_os = "windows")]
unsafe impl Sync for Win32WindowHandle {}

#[cfg(target_os = "windows")]
impl raw_window_handle::HasWindowHandle for Win32WindowHandle {
    fn window_handle(&self) -> Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError> {
        let hwnd = std::num::NonZeroIsize::new(self.hwnd as isize).ok_or(raw_window_handle::HandleError::Unavailable)?;
        let raw = raw_window_handle::RawWindowHandle::Win32(raw_window_handle::Win32WindowHandle::new(hwnd));
        Ok(unsafe { raw_window_handle::WindowHandle::borrow_raw(raw) })
    }
}

#[cfg(target_os = "windows")]
impl raw_window_handle::HasDisplayHandle for Win32WindowHandle {
    fn display_handle(&self) -> Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError> {
        let raw = raw_window_handle::RawDisplayHandle::Windows(raw_window_handle::WindowsDisplayHandle::new());
        Ok(unsafe { raw_window_handle::DisplayHandle::borrow_raw(raw) })
    }
}

// ============================================================
// FFI: Lifecycle
// ============================================================

/// Initialize the backend with a raw window handle.
///
/// On Linux: `window_handle` is the X11 Window (u64), `display_handle` is the X11 Display*.
/// On Windows: `window_handle` is the HWND, `display_handle` is unused.
/// `seed` fixes the SSAO kernel; 0 seeds from the clock.
///
/// Returns a backend handle (> 0) on success, 0 on failure.
#[no_mangle]
pub extern "C" fn ssaoview_initialize(
    window_handle: u64,
    display_handle: *mut std::ffi::c_void,
    width: i32,
    height: i32,
    seed: u64,
) -> u64 {
    let _ = env_logger::try_init();

    let w = width.max(0) as u32;
    let h = height.max(0) as u32;
    let config = RendererConfig {
        kernel_seed: (seed != 0).then_some(seed),
        ..Default::default()
    };

    #[cfg(target_os = "linux")]
    let result = {
        let handle = X11WindowHandle {
            window: window_handle,
            display: display_handle,
        };
        State::new(handle, w, h, config)
    };

    #[cfg(target_os = "windows")]
    let result = {
        let _ = display_handle;
        let handle = Win32WindowHandle {
            hwnd: window_handle as *mut std::ffi::c_void,
        };
        State::new(handle, w, h, config)
    };

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    let result: Result<State, RenderError> = {
        let _ = (window_handle, display_handle, w, h, config);
        Err(RenderError::missing_capability("Unsupported platform"))
    };

    match result {
        Ok(state) => {
            *lock(&INIT_ERROR) = None;
            lock(&BACKENDS).insert(state)
        }
        Err(e) => {
            log::error!("SSAO backend initialization failed: {e}");
            *lock(&INIT_ERROR) = Some(e.to_string());
            0
        }
    }
}

/// Shutdown the backend and release all GPU resources.
#[no_mangle]
pub extern "C" fn ssaoview_shutdown(backend: u64) {
    if let Some(state) = lock(&BACKENDS).remove(backend) {
        drop(state);
        log::info!("SSAO backend shut down");
    }
}

/// Run `f` on a backend, storing any error as its last error.
fn with_backend(backend: u64, f: impl FnOnce(&mut State) -> Result<(), RenderError>) -> i32 {
    let mut backends = lock(&BACKENDS);
    let Some(state) = backends.get_mut(backend) else {
        return -1;
    };
    match f(state) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{e}");
            state.last_error = Some(e.to_string());
            -1
        }
    }
}

/// Resize the rendering surface. A zero size pauses rendering.
/// Returns 0 on success, -1 on failure.
#[no_mangle]
pub extern "C" fn ssaoview_resize(backend: u64, width: i32, height: i32) -> i32 {
    with_backend(backend, |state| state.resize(width.max(0) as u32, height.max(0) as u32))
}

// ============================================================
// FFI: Frame
// ============================================================

/// Render and present one frame.
/// Returns 0 when presented, 1 when skipped, -1 on a fatal error.
#[no_mangle]
pub extern "C" fn ssaoview_render_frame(backend: u64) -> i32 {
    let mut skipped = false;
    let code = with_backend(backend, |state| {
        skipped = state.render_frame()? == FrameOutcome::Skipped;
        Ok(())
    });
    if code == 0 && skipped {
        1
    } else {
        code
    }
}

// ============================================================
// FFI: UI toggles and camera
// ============================================================

/// Set a toggle: 0 = ssao, 1 = ssao only, 2 = blur.
/// Returns 0 on success, -1 for an unknown backend or toggle.
#[no_mangle]
pub extern "C" fn ssaoview_set_toggle(backend: u64, toggle: u32, value: i32) -> i32 {
    let Some(toggle) = SsaoToggle::from_raw(toggle) else {
        return -1;
    };
    with_backend(backend, |state| {
        state.set_toggle(toggle, value != 0);
        Ok(())
    })
}

/// Returns 1 or 0 for the toggle value, -1 for an unknown backend or toggle.
#[no_mangle]
pub extern "C" fn ssaoview_get_toggle(backend: u64, toggle: u32) -> i32 {
    let Some(toggle) = SsaoToggle::from_raw(toggle) else {
        return -1;
    };
    lock(&BACKENDS)
        .get(backend)
        .map(|state| state.settings().get(toggle) as i32)
        .unwrap_or(-1)
}

/// Set the camera from two `[f32; 3]` arrays: position and rotation in degrees.
#[no_mangle]
pub extern "C" fn ssaoview_set_camera(backend: u64, position: *const f32, rotation: *const f32) -> i32 {
    if position.is_null() || rotation.is_null() {
        return -1;
    }
    let position = unsafe { std::slice::from_raw_parts(position, 3) };
    let rotation = unsafe { std::slice::from_raw_parts(rotation, 3) };
    with_backend(backend, |state| {
        state.set_camera(Vec3::from_slice(position), Vec3::from_slice(rotation));
        Ok(())
    })
}

// ============================================================
// FFI: Mesh operations
// ============================================================

/// Upload mesh data to GPU. Returns mesh handle (> 0) or 0 on failure.
///
/// `colors` and `texture_pixels` may be null. Texture pixels are tightly
/// packed RGBA8, `texture_width * texture_height * 4` bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn ssaoview_upload_mesh(
    backend: u64,
    positions: *const f32,
    uvs: *const f32,
    colors: *const f32,
    normals: *const f32,
    num_vertices: u32,
    indices: *const u32,
    num_indices: u32,
    texture_pixels: *const u8,
    texture_width: u32,
    texture_height: u32,
) -> u64 {
    if positions.is_null() || uvs.is_null() || normals.is_null() || indices.is_null() {
        return 0;
    }
    let mut backends = lock(&BACKENDS);
    let Some(state) = backends.get_mut(backend) else {
        return 0;
    };

    let n = num_vertices as usize;
    let pos_slice = unsafe { std::slice::from_raw_parts(positions, n * 3) };
    let uv_slice = unsafe { std::slice::from_raw_parts(uvs, n * 2) };
    let norm_slice = unsafe { std::slice::from_raw_parts(normals, n * 3) };
    let color_slice = (!colors.is_null()).then(|| unsafe { std::slice::from_raw_parts(colors, n * 3) });
    let idx_slice = unsafe { std::slice::from_raw_parts(indices, num_indices as usize) };

    let base_color = if !texture_pixels.is_null() && texture_width > 0 && texture_height > 0 {
        let Some(len) = rgba_byte_len(texture_width, texture_height) else {
            log::error!("Base colour image {texture_width}x{texture_height} is too large");
            return 0;
        };
        Some(BaseColorImage {
            pixels: unsafe { std::slice::from_raw_parts(texture_pixels, len) },
            width: texture_width,
            height: texture_height,
        })
    } else {
        None
    };

    let vertices = interleave(pos_slice, uv_slice, color_slice, norm_slice);
    state.upload_mesh(&vertices, idx_slice, base_color)
}

/// Byte length of a tightly packed RGBA8 image, `None` on overflow.
fn rgba_byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize).checked_mul(height as usize)?.checked_mul(4)
}

/// Destroy a mesh and free its GPU resources.
#[no_mangle]
pub extern "C" fn ssaoview_destroy_mesh(backend: u64, mesh: u64) {
    if let Some(state) = lock(&BACKENDS).get_mut(backend) {
        state.destroy_mesh(mesh);
    }
}

// ============================================================
// FFI: Error handling
// ============================================================

/// Get the last error message. Returns a C string (valid until next call) or null.
/// Handle 0 reports the last initialization failure.
#[no_mangle]
pub extern "C" fn ssaoview_last_error(backend: u64) -> *const c_char {
    let message = if backend == 0 {
        lock(&INIT_ERROR).clone()
    } else {
        lock(&BACKENDS).get(backend).and_then(|state| state.last_error.clone())
    };

    let mut text = lock(&ERROR_TEXT);
    *text = message.and_then(|m| CString::new(m.replace('\0', " ")).ok());
    text.as_ref().map_or(std::ptr::null(), |c| c.as_ptr())
}
