use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::mk_render_pipeline,
};

const SHADER: &str = include_str!("matcap.wgsl");

/// Spheres: matcap texture sampled by the view-space normal and multiplied with the
/// instance tint. The directional light's shadow map darkens it towards the ambient share.
pub fn mk_matcap_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    matcap_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Matcap Pipeline Layout"),
        bind_group_layouts: &[
            matcap_bind_group_layout,
            camera_bind_group_layout,
            light_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Matcap Shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER.into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        wgpu::PrimitiveTopology::TriangleList,
        shader,
    )
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Vector3};

    use super::SHADER;
    use crate::{config::LightConfig, pipelines::light::LightUniform};

    /// `fs_main`'s lookup: `view_dir` points from the surface to the eye.
    fn matcap_uv(view_dir: Vector3<f32>, normal: Vector3<f32>) -> [f32; 2] {
        let x = Vector3::new(view_dir.z, 0.0, -view_dir.x).normalize();
        let y = view_dir.cross(x);
        [x.dot(normal) * 0.495 + 0.5, y.dot(normal) * 0.495 + 0.5]
    }

    fn shade(light: &LightUniform, shadow: f32) -> [f32; 3] {
        let (ambient, color) = (light.ambient(), light.color());
        std::array::from_fn(|c| {
            let share = ambient[c] / (ambient[c] + color[c]).max(1e-4);
            share + (1.0 - share) * shadow
        })
    }

    #[test]
    fn view_direction_points_at_the_eye() {
        assert!(SHADER.contains("out.view_dir = normalize(-view_position.xyz);"));
    }

    #[test]
    fn normals_map_onto_the_matching_matcap_side() {
        // a surface point straight ahead of the camera, seen along -z in view space
        let view_position = Vector3::new(0.0, 0.0, -10.0);
        let view_dir = (-view_position).normalize();

        let [u, v] = matcap_uv(view_dir, Vector3::unit_x());
        assert!(u > 0.5 && (v - 0.5).abs() < 1e-6, "({}, {})", u, v);
        let [u, _] = matcap_uv(view_dir, -Vector3::unit_x());
        assert!(u < 0.5);
        let [_, v] = matcap_uv(view_dir, Vector3::unit_y());
        assert!(v > 0.5);
        let [u, v] = matcap_uv(view_dir, Vector3::unit_z());
        assert!((u - 0.5).abs() < 1e-6 && (v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn shadows_only_darken_the_matcap() {
        let light = LightUniform::new(&LightConfig::default(), true);
        assert_eq!(shade(&light, 1.0), [1.0; 3]);
        assert_eq!(shade(&light, 0.0), [0.5; 3]);
        assert!(shade(&light, 0.3).iter().all(|&s| (0.5..=1.0).contains(&s)));
    }
}
