//! Render pipelines: the shared builder plus one module per material.

pub mod basic;
pub mod light;
pub mod line;
pub mod matcap;
pub mod shadow;

/// All pipelines the renderer switches between in one frame.
#[derive(Debug)]
pub struct Pipelines {
    pub matcap: wgpu::RenderPipeline,
    pub line: wgpu::RenderPipeline,
    pub shadow: wgpu::RenderPipeline,
}
