use instant::Duration;
use wgpu::util::DeviceExt;
use winit::event::WindowEvent;

use crate::{
    color::{rgb_from_u32, srgb_to_linear},
    context::{Context, InitContext},
    data_structures::{geometry::AxisGrid, instance::Instance, model::LineMesh},
    flow::{GraphicsFlow, Out},
    render::{Lines, Render},
};

/// The axis lines on the XY, ZY and XZ planes: one line group drawn three times.
pub struct AxisPlanes {
    lines: LineMesh,
    planes: Vec<Instance>,
    instance_buffer: wgpu::Buffer,
}

impl AxisPlanes {
    pub fn new(ctx: &InitContext) -> Self {
        let grid = &ctx.scene.grid;
        let tint = srgb_to_linear(rgb_from_u32(grid.line_color));
        let axis_grid = AxisGrid::new(grid.len, grid.line_spacing);
        let lines = LineMesh::from_grid(&ctx.device, "axis grid", &axis_grid);
        let planes: Vec<Instance> = AxisGrid::plane_transforms()
            .into_iter()
            .map(|plane| plane.with_tint(tint))
            .collect();
        let raw: Vec<_> = planes.iter().map(Instance::to_raw).collect();
        let instance_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Axis Plane Instance Buffer"),
                contents: bytemuck::cast_slice(&raw),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Self {
            lines,
            planes,
            instance_buffer,
        }
    }
}

impl GraphicsFlow for AxisPlanes {
    fn on_init(&mut self, _ctx: &mut Context) -> Out {
        log::info!(
            "{} axis lines on {} planes",
            self.lines.num_vertices / 2,
            self.planes.len()
        );
        Out::Empty
    }

    fn on_update(&mut self, _ctx: &Context, _elapsed: Duration) -> Out {
        Out::Empty
    }

    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) -> Out {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Lines(Lines {
            instance: &self.instance_buffer,
            lines: &self.lines,
            amount: self.planes.len(),
        })
    }
}
