//! Perspective camera with orbit controls.
//!
//! The camera orbits a target point on a sphere (`radius`, polar angle `phi` measured from
//! `+y`, azimuth `theta` measured from `+z` towards `+x`). [`OrbitController`] turns
//! pointer input into changes of those coordinates:
//!
//! - left drag rotates around the target
//! - right drag pans the target in screen space
//! - the wheel zooms towards / away from the target
//!
//! With damping enabled the accumulated input is applied a fraction per frame and decays,
//! which gives the camera its inertia.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::from_cols(
    cgmath::Vector4::new(1.0, 0.0, 0.0, 0.0),
    cgmath::Vector4::new(0.0, 1.0, 0.0, 0.0),
    cgmath::Vector4::new(0.0, 0.0, 0.5, 0.0),
    cgmath::Vector4::new(0.0, 0.0, 0.5, 1.0),
);

const EPS: f32 = 1e-6;
const MIN_RADIUS: f32 = 1e-3;
/// Wheel zoom factor per notch at `zoom_speed = 1`.
const ZOOM_STEP: f32 = 0.95;
/// Pixels per wheel line for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    pub radius: f32,
    pub theta: Rad<f32>,
    pub phi: Rad<f32>,
}

impl OrbitCamera {
    pub fn new<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(eye: E, target: T) -> Self {
        let eye = eye.into();
        let target = target.into();
        let offset = eye - target;
        let radius = offset.magnitude().max(MIN_RADIUS);
        let theta = Rad(offset.x.atan2(offset.z));
        let phi = Rad((offset.y / radius).clamp(-1.0, 1.0).acos());
        Self {
            target,
            radius,
            theta,
            phi,
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        let sin_phi = self.phi.0.sin();
        self.target
            + Vector3::new(
                self.radius * sin_phi * self.theta.0.sin(),
                self.radius * self.phi.0.cos(),
                self.radius * sin_phi * self.theta.0.cos(),
            )
    }

    /// Unit vector pointing from the eye to the target.
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.eye()).normalize()
    }

    /// Screen-space right and up axes of the camera.
    pub fn screen_axes(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = self.forward();
        let right = forward.cross(Vector3::unit_y());
        let right = if right.magnitude2() > EPS {
            right.normalize()
        } else {
            // looking straight up or down
            Vector3::new(self.theta.0.cos(), 0.0, -self.theta.0.sin())
        };
        let up = right.cross(forward).normalize();
        (right, up)
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.set_aspect(width as f32 / height.max(1) as f32);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    None,
    Rotate,
    Pan,
}

/// Orbit-style pointer controls.
#[derive(Debug, Clone)]
pub struct OrbitController {
    enable_damping: bool,
    damping_factor: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    pan_speed: f32,
    /// Pending azimuth / polar change.
    delta_theta: f32,
    delta_phi: f32,
    /// Pending pan in pixels.
    pan_pixels: cgmath::Vector2<f32>,
    /// Pending pan in world units, kept for damping.
    pan_offset: Vector3<f32>,
    scale: f32,
    drag: Drag,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
}

impl OrbitController {
    pub fn new(config: &CameraConfig, viewport_height: u32) -> Self {
        Self {
            enable_damping: config.damping,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            delta_theta: 0.0,
            delta_phi: 0.0,
            pan_pixels: cgmath::Vector2::new(0.0, 0.0),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
            drag: Drag::None,
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
        }
    }

    /// `height` in physical window pixels, the unit of `CursorMoved` positions.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Drag by `(dx, dy)` pixels; a full viewport height turns the camera by a full circle.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let per_pixel = 2.0 * PI * self.rotate_speed / self.viewport_height;
        self.delta_theta -= dx * per_pixel;
        self.delta_phi -= dy * per_pixel;
    }

    /// Positive `lines` zoom in.
    pub fn zoom(&mut self, lines: f32) {
        let factor = ZOOM_STEP.powf(self.zoom_speed * lines.abs());
        if lines > 0.0 {
            self.scale *= factor;
        } else if lines < 0.0 {
            self.scale /= factor;
        }
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.pan_pixels += cgmath::Vector2::new(dx, dy) * self.pan_speed;
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (button, state.is_pressed()) {
                    (MouseButton::Left, true) => Drag::Rotate,
                    (MouseButton::Right, true) | (MouseButton::Middle, true) => Drag::Pan,
                    (_, false) => Drag::None,
                    _ => self.drag,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    match self.drag {
                        Drag::Rotate => self.rotate(dx, dy),
                        Drag::Pan => self.pan(dx, dy),
                        Drag::None => (),
                    }
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = Drag::None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                        *y as f32 / PIXELS_PER_LINE
                    }
                };
                self.zoom(lines);
            }
            _ => (),
        }
    }

    /// Apply pending input to `camera`. Called once per frame.
    pub fn update(&mut self, camera: &mut OrbitCamera, projection: &Projection) {
        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        if self.pan_pixels.magnitude2() > 0.0 {
            // world units per pixel at the target's distance
            let per_pixel = 2.0 * camera.radius * (projection.fovy().0 / 2.0).tan() / self.viewport_height;
            let (right, up) = camera.screen_axes();
            self.pan_offset +=
                right * (-self.pan_pixels.x * per_pixel) + up * (self.pan_pixels.y * per_pixel);
            self.pan_pixels = cgmath::Vector2::new(0.0, 0.0);
        }

        camera.theta += Rad(self.delta_theta * factor);
        camera.phi = Rad((camera.phi.0 + self.delta_phi * factor).clamp(EPS, PI - EPS));
        camera.radius = (camera.radius * self.scale).max(MIN_RADIUS);
        camera.target += self.pan_offset * factor;

        self.scale = 1.0;
        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view: [[f32; 4]; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view: cgmath::Matrix4::identity().into(),
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.eye().to_homogeneous().into();
        let view = camera.calc_matrix();
        self.view = view.into();
        self.view_proj = (projection.calc_matrix() * view).into();
    }

    pub fn view_proj(&self) -> cgmath::Matrix4<f32> {
        self.view_proj.into()
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera state plus the GPU uniform it is mirrored into every frame.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        camera: OrbitCamera,
        controller: OrbitController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Run the controller and upload the resulting matrices.
    pub fn update(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.controller.update(&mut self.camera, projection);
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{EuclideanSpace, Transform};

    use super::*;

    fn stock_camera() -> OrbitCamera {
        OrbitCamera::new([15.0, 8.0, 15.0], [0.0, 0.0, 0.0])
    }

    fn projection() -> Projection {
        Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 300.0)
    }

    fn controller(damping: bool) -> OrbitController {
        let config = CameraConfig {
            damping,
            ..Default::default()
        };
        OrbitController::new(&config, 600)
    }

    #[test]
    fn spherical_coordinates_round_trip_the_eye() {
        let camera = stock_camera();
        let eye = camera.eye();
        assert!((eye - Point3::new(15.0, 8.0, 15.0)).magnitude() < 1e-4);
        assert!((camera.radius - (15.0f32 * 15.0 * 2.0 + 64.0).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn target_projects_to_the_screen_centre() {
        let camera = stock_camera();
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection());
        let clip = uniform.view_proj() * camera.target.to_homogeneous();
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let mut camera = stock_camera();
        let radius = camera.radius;
        let mut controller = controller(false);
        controller.rotate(120.0, -40.0);
        controller.update(&mut camera, &projection());
        assert!((camera.radius - radius).abs() < 1e-5);
        assert!(((camera.eye() - camera.target).magnitude() - radius).abs() < 1e-4);
        assert_ne!(camera, stock_camera());
    }

    #[test]
    fn full_viewport_drag_is_a_full_turn() {
        let mut camera = stock_camera();
        let theta = camera.theta;
        let mut controller = controller(false);
        controller.rotate(600.0, 0.0);
        controller.update(&mut camera, &projection());
        assert!(((theta.0 - camera.theta.0).abs() - 2.0 * PI).abs() < 1e-4);
    }

    #[test]
    fn drag_across_a_dense_window_is_one_turn() {
        // 3x display rendered at the capped 2x: pointer deltas stay in window pixels
        let viewport =
            crate::viewport::Viewport::from_physical(winit::dpi::PhysicalSize::new(2400, 1800), 3.0, 2.0);
        let mut camera = stock_camera();
        let theta = camera.theta;
        let mut controller = controller(false);
        controller.set_viewport_height(viewport.physical_height());
        controller.rotate(1800.0, 0.0);
        controller.update(&mut camera, &projection());
        assert!(((theta.0 - camera.theta.0).abs() - 2.0 * PI).abs() < 1e-4);
    }

    #[test]
    fn damping_spreads_input_over_frames() {
        let mut camera = stock_camera();
        let theta = camera.theta.0;
        let mut controller = controller(true);
        controller.rotate(60.0, 0.0);
        let expected = -60.0 * 2.0 * PI / 600.0;

        controller.update(&mut camera, &projection());
        let first_step = camera.theta.0 - theta;
        assert!((first_step - expected * 0.05).abs() < 1e-5);

        for _ in 0..2000 {
            controller.update(&mut camera, &projection());
        }
        assert!((camera.theta.0 - theta - expected).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut camera = stock_camera();
        let mut controller = controller(false);
        controller.rotate(0.0, 10_000.0);
        controller.update(&mut camera, &projection());
        assert!(camera.phi.0 > 0.0);
        controller.rotate(0.0, -20_000.0);
        controller.update(&mut camera, &projection());
        assert!(camera.phi.0 < PI);
        assert!(camera.eye().x.is_finite());
    }

    #[test]
    fn wheel_zooms_in_and_out() {
        let mut camera = stock_camera();
        let radius = camera.radius;
        let mut controller = controller(false);
        controller.zoom(1.0);
        controller.update(&mut camera, &projection());
        assert!((camera.radius - radius * ZOOM_STEP).abs() < 1e-4);
        controller.zoom(-1.0);
        controller.update(&mut camera, &projection());
        assert!((camera.radius - radius).abs() < 1e-4);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut camera = stock_camera();
        let offset = camera.eye() - camera.target;
        let mut controller = controller(false);
        controller.pan(50.0, 0.0);
        controller.update(&mut camera, &projection());
        assert!(camera.target.to_vec().magnitude() > 0.0);
        assert!(((camera.eye() - camera.target) - offset).magnitude() < 1e-4);
        // dragging right moves the scene right, i.e. the target left
        let (right, _) = stock_camera().screen_axes();
        assert!(camera.target.to_vec().dot(right) < 0.0);
    }

    #[test]
    fn resize_updates_aspect_and_ignores_zero_height() {
        let mut projection = projection();
        projection.resize(1920, 1080);
        assert!((projection.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
        projection.resize(0, 0);
        assert!((projection.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
        let p = projection.calc_matrix().transform_point(Point3::new(0.0, 0.0, -1.0));
        assert!(p.z.is_finite());
    }
}
