//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`]; the engine sorts those into one
//! batch per pipeline and records the shadow pass and the main pass from the batches.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum flows return from `on_render`
//! - [`Instanced<'a>`] is a lit, instanced triangle mesh (the spheres)
//! - [`Lines<'a>`] is an instanced, unlit line list (the axis planes)

use wgpu::RenderPass;

use crate::{
    context::Context,
    data_structures::model::{DrawMesh, LineMesh, Mesh},
};

/// Data for instanced matcap rendering: mesh, material and instance buffer.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a Mesh,
    pub material: &'a wgpu::BindGroup,
    pub amount: usize,
    /// Whether the instances are drawn into the shadow map.
    pub casts_shadow: bool,
}

/// Data for instanced line rendering.
pub struct Lines<'a> {
    pub instance: &'a wgpu::Buffer,
    pub lines: &'a LineMesh,
    pub amount: usize,
}

/// Specifies how a flow should be rendered.
///
/// - `None` renders nothing
/// - `Matcap(Instanced)` renders lit, shadow casting instances
/// - `Lines(Lines)` renders unlit line instances
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    Matcap(Instanced<'a>),
    Lines(Lines<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, batches: &mut Batches<'a>) {
        match self {
            Render::Matcap(instanced) => batches.matcaps.push(instanced),
            Render::Lines(lines) => batches.lines.push(lines),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(batches)),
            Render::None => (),
        }
    }
}

/// Renders of all flows sorted by pipeline.
#[derive(Default)]
pub(crate) struct Batches<'a> {
    pub matcaps: Vec<Instanced<'a>>,
    pub lines: Vec<Lines<'a>>,
}

impl<'a> Batches<'a> {
    pub fn collect(renders: impl IntoIterator<Item = Render<'a>>) -> Self {
        let mut batches = Self::default();
        renders
            .into_iter()
            .for_each(|render| render.set_pipelines(&mut batches));
        batches
    }

    /// Depth-only draws from the directional light.
    pub fn draw_shadows<'pass>(&self, ctx: &'pass Context, render_pass: &mut RenderPass<'pass>)
    where
        'a: 'pass,
    {
        render_pass.set_pipeline(&ctx.pipelines.shadow);
        for instanced in self.matcaps.iter().filter(|i| i.casts_shadow) {
            if instanced.amount == 0 || instanced.instance.size() == 0 {
                continue;
            }
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_mesh_depth(
                instanced.mesh,
                0..instanced.amount as u32,
                &ctx.light.depth_bind_group,
            );
        }
    }

    pub fn draw<'pass>(&self, ctx: &'pass Context, render_pass: &mut RenderPass<'pass>)
    where
        'a: 'pass,
    {
        render_pass.set_pipeline(&ctx.pipelines.matcap);
        for instanced in &self.matcaps {
            if instanced.amount == 0 || instanced.instance.size() == 0 {
                log::warn!("you attempted to render something with zero instances");
                continue;
            }
            render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
            render_pass.draw_mesh_instanced(
                instanced.mesh,
                0..instanced.amount as u32,
                instanced.material,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
            );
        }

        render_pass.set_pipeline(&ctx.pipelines.line);
        for lines in &self.lines {
            if lines.amount == 0 || lines.instance.size() == 0 {
                log::warn!("you attempted to render lines with zero instances");
                continue;
            }
            render_pass.set_vertex_buffer(1, lines.instance.slice(..));
            render_pass.draw_lines_instanced(
                lines.lines,
                0..lines.amount as u32,
                &ctx.camera.bind_group,
            );
        }
    }
}
