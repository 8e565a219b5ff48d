//! Tessera studio: a spinning cube, a transparent pane, a checkerboard and a panel
//! showing an off-screen render, drawn with the tessera renderer.

mod demo;

use anyhow::Result;
use winit::event::WindowEvent;
use winit::keyboard::{Key, NamedKey};

use tessera_engine::core::{App, AppControl, FrameCtx};
use tessera_engine::device::GpuInit;
use tessera_engine::logging::{LoggingConfig, init_logging};
use tessera_engine::render::RendererConfig;
use tessera_engine::window::{Runtime, RuntimeConfig};

use demo::{MainScene, OffscreenScene};

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.06,
    b: 0.08,
    a: 1.0,
};

const OFFSCREEN_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.12,
    g: 0.1,
    b: 0.2,
    a: 1.0,
};

struct Studio {
    main: MainScene,
    offscreen: OffscreenScene,
}

impl Studio {
    fn new() -> Self {
        let offscreen = demo::offscreen();
        let main = demo::main_scene(&offscreen.target);
        Self { main, offscreen }
    }
}

impl App for Studio {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.main.camera.set_aspect(width as f32 / height as f32);
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let t = ctx.time.elapsed;
        demo::spin(&mut self.offscreen.scene, self.offscreen.cube, -t * 1.3);
        demo::spin(&mut self.main.scene, self.main.cube, t);

        ctx.renderer
            .set_render_target(Some(self.offscreen.target.clone()));
        ctx.renderer.config_mut().clear_color = OFFSCREEN_CLEAR;
        let control = ctx.render(&mut self.offscreen.scene, Some(&mut self.offscreen.camera));
        ctx.renderer.set_render_target(None);
        ctx.renderer.config_mut().clear_color = CLEAR;
        if control == AppControl::Exit {
            return control;
        }

        if ctx.time.frame_index % 600 == 0 {
            log::debug!("frame {} at {:.1}s", ctx.time.frame_index, t);
        }
        ctx.render(&mut self.main.scene, Some(&mut self.main.camera))
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Tessera Studio".to_string(),
        renderer: RendererConfig {
            clear_color: CLEAR,
            ..RendererConfig::default()
        },
        ..RuntimeConfig::default()
    };
    log::info!("starting {}", config.title);
    Runtime::run(config, GpuInit::default(), Studio::new())
}
