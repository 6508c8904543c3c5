use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    context::{Context, InitContext},
    data_structures::{geometry::SphereGeometry, model::Mesh},
    flow::{GraphicsFlow, Out},
    palette::Palette,
    render::{Instanced, Render},
    resources::{Matcap, load_matcap},
    scene::SphereField,
};

/// The bobbing sphere grid: one sphere mesh drawn once per grid cell with the matcap
/// material. `S` toggles shadow mapping.
pub struct SphereGrid {
    field: SphereField,
    mesh: Mesh,
    matcap: Matcap,
    instance_buffer: wgpu::Buffer,
}

impl SphereGrid {
    pub async fn new(ctx: &InitContext) -> anyhow::Result<Self> {
        let scene = &ctx.scene;
        let palette = Palette::load(scene.renderer.palette.as_deref()).await?;
        if palette.is_empty() {
            log::warn!("The palette table is empty, every sphere will be black");
        }
        let field = SphereField::new(&scene.grid, &scene.animation, &palette);

        let geometry = SphereGeometry::new(
            scene.grid.sphere_radius,
            scene.grid.width_segments,
            scene.grid.height_segments,
        );
        let mesh = Mesh::from_sphere(&ctx.device, "sphere", &geometry);
        let matcap = load_matcap(
            &scene.renderer.matcap,
            &ctx.device,
            &ctx.queue,
            &ctx.matcap_layout,
        )
        .await;

        let instance_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sphere Instance Buffer"),
                contents: bytemuck::cast_slice(&field.to_raw()),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        Ok(Self {
            field,
            mesh,
            matcap,
            instance_buffer,
        })
    }
}

impl GraphicsFlow for SphereGrid {
    fn on_init(&mut self, _ctx: &mut Context) -> Out {
        log::info!(
            "{} spheres ({} with {})",
            self.field.len(),
            self.mesh.name,
            self.matcap.name
        );
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, elapsed: Duration) -> Out {
        if self.field.advance(elapsed) {
            ctx.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.field.to_raw()),
            );
        }
        Out::Empty
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) -> Out {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::KeyS),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => Out::Configure(Box::new(|ctx: &mut Context| ctx.toggle_shadows())),
            _ => Out::Empty,
        }
    }

    fn on_render(&self) -> Render<'_> {
        Render::Matcap(Instanced {
            instance: &self.instance_buffer,
            mesh: &self.mesh,
            material: &self.matcap.bind_group,
            amount: self.field.len(),
            casts_shadow: true,
        })
    }
}
