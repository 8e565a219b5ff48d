/// Frame-level renderer settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RendererConfig {
    /// Clear color and depth at the start of every frame.
    pub auto_clear: bool,
    pub clear_color: wgpu::Color,
    pub clear_depth: f32,
    /// Format of every depth buffer the renderer allocates.
    pub depth_format: wgpu::TextureFormat,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            auto_clear: true,
            clear_color: wgpu::Color::BLACK,
            clear_depth: 1.0,
            depth_format: wgpu::TextureFormat::Depth24Plus,
        }
    }
}
