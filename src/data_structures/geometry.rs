//! CPU-side geometry: the UV sphere and the axis line grid.

use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::{InnerSpace, Rotation3};

use crate::data_structures::{
    instance::Instance,
    model::{LineVertex, ModelVertex},
};

/// A UV sphere centred on the origin.
///
/// Rings run from the north pole (`+y`) to the south pole. The two pole rings carry one
/// vertex per segment so every triangle gets its own texture coordinate, and the
/// degenerate triangles touching the poles are left out of the index list.
#[derive(Debug, Clone)]
pub struct SphereGeometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    pub fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            // centre the pole texels between their neighbours
            let u_offset = if iy == 0 {
                0.5 / width_segments as f32
            } else if iy == height_segments {
                -0.5 / width_segments as f32
            } else {
                0.0
            };
            let theta = v * PI;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * 2.0 * PI;
                let position = cgmath::Vector3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                let normal = if position.magnitude2() > 0.0 {
                    position.normalize()
                } else {
                    cgmath::Vector3::unit_y()
                };
                vertices.push(ModelVertex {
                    position: position.into(),
                    normal: normal.into(),
                    tex_coords: [u + u_offset, v],
                });
            }
        }

        let row = width_segments + 1;
        let mut indices = Vec::with_capacity((width_segments * (height_segments - 1) * 6) as usize);
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }
}

/// One group of axis lines lying in the `z = 0` plane.
///
/// `len + 1` horizontal lines `(0, i·s, 0) → (len·s, i·s, 0)` and as many vertical ones
/// `(i·s, 0, 0) → (i·s, len·s, 0)`, stored as a line list.
#[derive(Debug, Clone)]
pub struct AxisGrid {
    pub vertices: Vec<LineVertex>,
}

impl AxisGrid {
    pub fn new(len: usize, spacing: f32) -> Self {
        let extent = len as f32 * spacing;
        let vertices = (0..=len)
            .flat_map(|i| {
                let offset = i as f32 * spacing;
                [
                    [0.0, offset, 0.0],
                    [extent, offset, 0.0],
                    [offset, 0.0, 0.0],
                    [offset, extent, 0.0],
                ]
            })
            .map(|position| LineVertex { position })
            .collect();
        Self { vertices }
    }

    pub fn line_count(&self) -> usize {
        self.vertices.len() / 2
    }

    /// The three placements of the group: as built (XY plane), rotated `-90°` about `y`
    /// (ZY plane) and rotated `90°` about `x` (XZ plane).
    pub fn plane_transforms() -> [Instance; 3] {
        [
            Instance::new(),
            cgmath::Quaternion::from_angle_y(cgmath::Rad(-FRAC_PI_2)).into(),
            cgmath::Quaternion::from_angle_x(cgmath::Rad(FRAC_PI_2)).into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{EuclideanSpace, Transform};

    use super::*;

    #[test]
    fn sphere_has_expected_vertex_and_index_counts() {
        let sphere = SphereGeometry::new(0.5, 32, 32);
        assert_eq!(sphere.vertices.len(), 33 * 33);
        // pole rows contribute one triangle per segment instead of two
        assert_eq!(sphere.indices.len(), 32 * 31 * 2 * 3);
        assert!(sphere
            .indices
            .iter()
            .all(|&i| (i as usize) < sphere.vertices.len()));
    }

    #[test]
    fn sphere_vertices_lie_on_the_surface() {
        let sphere = SphereGeometry::new(0.5, 16, 8);
        for vertex in &sphere.vertices {
            let p = cgmath::Vector3::from(vertex.position);
            assert!((p.magnitude() - 0.5).abs() < 1e-5);
            let n = cgmath::Vector3::from(vertex.normal);
            assert!((n.magnitude() - 1.0).abs() < 1e-5);
            assert!((n * 0.5 - p).magnitude() < 1e-5);
        }
        assert_eq!(sphere.vertices.first().unwrap().position[1], 0.5);
        assert!((sphere.vertices.last().unwrap().position[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn sphere_triangles_face_outwards() {
        let sphere = SphereGeometry::new(1.0, 12, 6);
        for tri in sphere.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| cgmath::Vector3::from(sphere.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let centre = (a + b + c) / 3.0;
            assert!(face_normal.dot(centre) > 0.0);
        }
    }

    #[test]
    fn axis_grid_spans_twice_the_grid_length() {
        let grid = AxisGrid::new(10, 2.0);
        assert_eq!(grid.line_count(), 22);
        let max = grid
            .vertices
            .iter()
            .flat_map(|v| v.position)
            .fold(f32::MIN, f32::max);
        assert_eq!(max, 20.0);
        assert!(grid.vertices.iter().all(|v| v.position[2] == 0.0));
        assert_eq!(grid.vertices[4].position, [0.0, 2.0, 0.0]);
        assert_eq!(grid.vertices[5].position, [20.0, 2.0, 0.0]);
    }

    #[test]
    fn plane_transforms_cover_three_orthogonal_planes() {
        let [xy, zy, xz] = AxisGrid::plane_transforms();
        let corner = cgmath::Point3::new(20.0, 20.0, 0.0);

        let p = xy.to_matrix().transform_point(corner);
        assert_eq!(p, corner);

        // rotateY(-90°) maps +x onto +z
        let p = zy.to_matrix().transform_point(corner).to_vec();
        assert!((p - cgmath::Vector3::new(0.0, 20.0, 20.0)).magnitude() < 1e-4);

        // rotateX(90°) maps +y onto +z
        let p = xz.to_matrix().transform_point(corner).to_vec();
        assert!((p - cgmath::Vector3::new(20.0, 0.0, 20.0)).magnitude() < 1e-4);
    }
}
