use winit::window::Window;

use crate::device::{SurfaceErrorAction, WgpuDevice};
use crate::render::Renderer;
use crate::scene::{Camera, Scene};
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` is the callback, `'w` the window borrow held by the renderer's surface.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub renderer: &'a mut Renderer<WgpuDevice<'w>>,
    pub time: FrameTime,
}

impl FrameCtx<'_, '_> {
    /// Surface size in physical pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.renderer.size()
    }

    pub fn aspect(&self) -> f32 {
        let (w, h) = self.size();
        if h == 0 { 1.0 } else { w as f32 / h as f32 }
    }

    /// Renders one frame into the current target (presenting it when that is the
    /// surface). Recoverable surface errors skip the frame; anything else ends the app.
    pub fn render(&mut self, scene: &mut Scene, camera: Option<&mut Camera>) -> AppControl {
        if self.renderer.render_target().is_none() {
            self.window.pre_present_notify();
        }
        match self.renderer.render(scene, camera) {
            Ok(()) => AppControl::Continue,
            Err(err) => match err.surface_action() {
                Some(SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame) => {
                    log::debug!("frame skipped: {err}");
                    AppControl::Continue
                }
                Some(SurfaceErrorAction::Fatal) | None => {
                    log::error!("frame failed: {err}");
                    AppControl::Exit
                }
            },
        }
    }
}
