use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    camera::{CameraResources, OrbitCamera, OrbitController, Projection},
    config::SceneConfig,
    data_structures::texture,
    pipelines::{
        Pipelines,
        light::LightResources,
        line::mk_line_pipeline,
        matcap::mk_matcap_pipeline,
        shadow::mk_shadow_pipeline,
    },
    resources::matcap_layout,
    viewport::Viewport,
};

/// GPU and window state shared by every flow.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub scene: SceneConfig,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub matcap_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
    pub viewport: Viewport,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: SceneConfig) -> anyhow::Result<Self> {
        let viewport = Viewport::from_physical(
            window.inner_size(),
            window.scale_factor(),
            scene.renderer.max_pixel_ratio,
        );

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("Adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .context("could not open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders assume an Srgb surface texture. Using a different
        // one will result in all the colors coming out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: viewport.surface_width.max(1),
            height: viewport.surface_height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        log::info!("Surface format {:?}", surface_format);

        let camera_config = &scene.camera;
        let camera = OrbitCamera::new(camera_config.position, camera_config.target);
        let mut projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(camera_config.fov_deg),
            camera_config.near,
            camera_config.far,
        );
        projection.set_aspect(viewport.aspect());
        let controller = OrbitController::new(camera_config, viewport.physical_height());
        let camera = CameraResources::new(&device, camera, controller, &projection);

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(&device, &scene.light, scene.renderer.shadows);
        let matcap_layout = matcap_layout(&device);

        let pipelines = Pipelines {
            matcap: mk_matcap_pipeline(
                &device,
                &config,
                &matcap_layout,
                &camera.bind_group_layout,
                &light.bind_group_layout,
            ),
            line: mk_line_pipeline(&device, &config, &camera.bind_group_layout),
            shadow: mk_shadow_pipeline(&device, &light.depth_bind_group_layout),
        };

        let [r, g, b, a] = scene.renderer.clear_colour;
        let clear_colour = wgpu::Color { r, g, b, a };

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            scene,
            camera,
            projection,
            light,
            pipelines,
            matcap_layout,
            clear_colour,
            viewport,
        })
    }

    /// Apply a resize handshake: surface size, projection aspect, depth buffer and the
    /// controller's notion of the viewport height. Returns `false` for an undrawable size.
    pub fn resize(&mut self, viewport: Viewport) -> bool {
        self.viewport = viewport;
        if !viewport.is_drawable() {
            return false;
        }
        self.config.width = viewport.surface_width;
        self.config.height = viewport.surface_height;
        self.surface.configure(&self.device, &self.config);
        self.projection.set_aspect(viewport.aspect());
        self.camera
            .controller
            .set_viewport_height(viewport.physical_height());
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        log::debug!(
            "Resized to {}x{} (pixel ratio {})",
            viewport.surface_width,
            viewport.surface_height,
            viewport.pixel_ratio
        );
        true
    }

    /// Reconfigure the surface with the current size, e.g. after it was lost.
    pub fn reconfigure(&mut self) -> bool {
        let viewport = Viewport::from_physical(
            self.window.inner_size(),
            self.window.scale_factor(),
            self.scene.renderer.max_pixel_ratio,
        );
        self.resize(viewport)
    }

    pub fn toggle_shadows(&mut self) {
        let enabled = !self.light.uniform.casts_shadows();
        let enabled = self.light.set_shadows(&self.queue, enabled);
        log::info!("Shadows {}", if enabled { "on" } else { "off" });
    }
}

/// The part of the [`Context`] flows need while they are constructed.
///
/// Cloning only clones the internal handles of the device and queue.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub scene: SceneConfig,
    pub matcap_layout: wgpu::BindGroupLayout,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            scene: ctx.scene.clone(),
            matcap_layout: ctx.matcap_layout.clone(),
        }
    }
}
