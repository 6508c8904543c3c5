//! Ambient + directional lighting and the directional light's shadow map.

use cgmath::{InnerSpace, Point3, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    color::{rgb_from_u32, srgb_to_linear},
    config::LightConfig,
    data_structures::texture::Texture,
};

/// Orthographic camera the shadow map is rendered from.
///
/// Sits at the directional light's position and looks at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub extent: f32,
    pub near: f32,
    pub far: f32,
}

impl ShadowCamera {
    pub fn new(config: &LightConfig) -> Self {
        Self {
            position: config.directional_position.into(),
            target: Point3::new(0.0, 0.0, 0.0),
            extent: config.shadow_extent,
            near: config.shadow_near,
            far: config.shadow_far,
        }
    }

    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction(&self) -> Vector3<f32> {
        let dir = self.position - self.target;
        if dir.magnitude2() > 0.0 {
            dir.normalize()
        } else {
            Vector3::unit_y()
        }
    }

    pub fn view_proj(&self) -> cgmath::Matrix4<f32> {
        // the light looks straight down when it sits above the target
        let up = if self.direction().cross(Vector3::unit_y()).magnitude2() < 1e-6 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = cgmath::Matrix4::look_at_rh(self.position, self.target, up);
        let proj = cgmath::ortho(
            -self.extent,
            self.extent,
            -self.extent,
            self.extent,
            self.near,
            self.far,
        );
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Ambient colour premultiplied with its intensity.
    ambient: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    /// Directional colour premultiplied with its intensity.
    color: [f32; 3],
    _padding2: u32,
    direction: [f32; 3],
    /// `1.0` when the shadow map holds casters, `0.0` otherwise.
    shadows: f32,
    view_proj: [[f32; 4]; 4],
}

impl LightUniform {
    pub fn new(config: &LightConfig, shadows: bool) -> Self {
        let scale = |rgb: u32, intensity: f32| srgb_to_linear(rgb_from_u32(rgb)).map(|c| c * intensity);
        let shadow_camera = ShadowCamera::new(config);
        Self {
            ambient: scale(config.ambient_color, config.ambient_intensity),
            _padding: 0,
            color: scale(config.directional_color, config.directional_intensity),
            _padding2: 0,
            direction: shadow_camera.direction().into(),
            shadows: if shadows && config.cast_shadow { 1.0 } else { 0.0 },
            view_proj: shadow_camera.view_proj().into(),
        }
    }

    pub fn ambient(&self) -> [f32; 3] {
        self.ambient
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn casts_shadows(&self) -> bool {
        self.shadows > 0.0
    }

    pub fn set_shadows(&mut self, enabled: bool) {
        self.shadows = if enabled { 1.0 } else { 0.0 };
    }
}

/// Light uniform, shadow map and the two bind groups built from them.
///
/// `bind_group` (uniform + shadow map + comparison sampler) is used by the lit pass,
/// `depth_bind_group` (uniform only) by the pass that renders the shadow map.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    /// The light may cast shadows at all; runtime toggles cannot enable it otherwise.
    pub cast_shadow: bool,
    pub buffer: wgpu::Buffer,
    pub shadow_map: Texture,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    pub depth_bind_group_layout: wgpu::BindGroupLayout,
    pub depth_bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, config: &LightConfig, shadows: bool) -> Self {
        let uniform = LightUniform::new(config, shadows);
        let buffer = mk_buffer(device, uniform);
        let size = if config.cast_shadow {
            config.shadow_map_size.max(1)
        } else {
            1
        };
        let shadow_map = Texture::create_depth_texture(device, [size, size], "shadow_map");

        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, &shadow_map);
        let depth_bind_group_layout = mk_depth_bind_group_layout(device);
        let depth_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &depth_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("shadow_depth_bind_group"),
        });

        Self {
            uniform,
            cast_shadow: config.cast_shadow,
            buffer,
            shadow_map,
            bind_group_layout,
            bind_group,
            depth_bind_group_layout,
            depth_bind_group,
        }
    }

    /// Switch shadow mapping on or off and upload the change. Returns the new state.
    pub fn set_shadows(&mut self, queue: &wgpu::Queue, enabled: bool) -> bool {
        self.uniform.set_shadows(enabled && self.cast_shadow);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        self.uniform.casts_shadows()
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(0),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_depth_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[uniform_entry(0)],
        label: Some("shadow_depth_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow_map: &Texture,
) -> wgpu::BindGroup {
    let fallback;
    let sampler = match &shadow_map.sampler {
        Some(sampler) => sampler,
        None => {
            fallback = device.create_sampler(&wgpu::SamplerDescriptor {
                compare: Some(wgpu::CompareFunction::LessEqual),
                ..Default::default()
            });
            &fallback
        }
    };
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{Transform, Vector4};

    use super::*;

    #[test]
    fn intensities_are_premultiplied() {
        let uniform = LightUniform::new(&LightConfig::default(), true);
        assert_eq!(uniform.ambient(), [0.5; 3]);
        assert_eq!(uniform.color(), [0.5; 3]);
        assert!(uniform.casts_shadows());
        assert!(!LightUniform::new(&LightConfig::default(), false).casts_shadows());
    }

    #[test]
    fn shadows_need_a_casting_light() {
        let config = LightConfig {
            cast_shadow: false,
            ..Default::default()
        };
        assert!(!LightUniform::new(&config, true).casts_shadows());
        let mut uniform = LightUniform::new(&LightConfig::default(), true);
        uniform.set_shadows(false);
        assert!(!uniform.casts_shadows());
    }

    #[test]
    fn direction_points_at_the_light() {
        let camera = ShadowCamera::new(&LightConfig::default());
        let expected = Vector3::new(2.0, 2.0, -1.0).normalize();
        assert!((camera.direction() - expected).magnitude() < 1e-6);
    }

    #[test]
    fn shadow_frustum_maps_near_and_far_to_unit_depth() {
        let camera = ShadowCamera::new(&LightConfig::default());
        let view_proj = camera.view_proj();
        let dir = camera.direction();
        let at = |distance: f32| {
            let p = camera.position - dir * distance;
            view_proj.transform_point(p)
        };
        assert!(at(1.0).z.abs() < 1e-5);
        assert!((at(6.0).z - 1.0).abs() < 1e-5);
        // the target (3 units away) lies in the middle of the map
        let centre = view_proj * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(centre.x.abs() < 1e-5 && centre.y.abs() < 1e-5);
    }

    #[test]
    fn overhead_light_still_has_a_valid_view() {
        let config = LightConfig {
            directional_position: [0.0, 4.0, 0.0],
            ..Default::default()
        };
        let m = ShadowCamera::new(&config).view_proj();
        let p = m.transform_point(Point3::new(1.0, 0.0, 1.0));
        assert!(p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
    }
}
