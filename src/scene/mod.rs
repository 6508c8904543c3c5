//! The composition itself: a bobbing grid of spheres standing on three axis planes.
//!
//! [`SphereField`] and [`sphere_positions`] are the GPU-free part of the grid, the flows
//! [`SphereGrid`] and [`AxisPlanes`] wrap them in GPU resources.

mod axes;
mod spheres;

pub use axes::AxisPlanes;
pub use spheres::SphereGrid;

use std::time::Duration;

use cgmath::Vector3;

use crate::{
    animation::Ripple,
    config::{AnimationConfig, GridConfig},
    context::InitContext,
    data_structures::instance::{Instance, InstanceRaw},
    flow::{FlowConstructor, FlowFuture, GraphicsFlow},
    palette::Palette,
};

/// Centres of a `len × len` grid of unit cells on the ground plane, `i` (x) outer and `j`
/// (z) inner: `(i + 0.5, 0.5, j + 0.5)`.
pub fn sphere_positions(len: usize) -> Vec<Vector3<f32>> {
    (0..len)
        .flat_map(|i| (0..len).map(move |j| Vector3::new(i as f32 + 0.5, 0.5, j as f32 + 0.5)))
        .collect()
}

/// Sphere instances plus the state of their bob.
pub struct SphereField {
    instances: Vec<Instance>,
    bases: Vec<f32>,
    heights: Vec<f32>,
    ripple: Ripple,
}

impl SphereField {
    pub fn new(grid: &GridConfig, animation: &AnimationConfig, palette: &Palette) -> Self {
        let len = grid.len;
        let instances: Vec<Instance> = sphere_positions(len)
            .into_iter()
            .enumerate()
            .map(|(idx, position)| {
                let (i, j) = (idx / len, idx % len);
                Instance::from(position).with_tint(palette.sphere_tint(i, j))
            })
            .collect();
        let bases: Vec<f32> = instances.iter().map(|i| i.position.y).collect();
        Self {
            heights: bases.clone(),
            bases,
            instances,
            ripple: Ripple::new(animation),
        }
    }

    /// Advance the bob to `elapsed` since start. Schedules this frame's update for every
    /// sphere and applies whatever is due; returns whether any height changed.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        let t = elapsed.as_secs_f32();
        self.ripple.tick(elapsed, t, self.instances.len());
        let applied = self.ripple.apply_due(elapsed, &mut self.heights, &self.bases);
        if applied == 0 {
            return false;
        }
        self.instances
            .iter_mut()
            .zip(&self.heights)
            .for_each(|(instance, &y)| instance.position.y = y);
        true
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn to_raw(&self) -> Vec<InstanceRaw> {
        self.instances.iter().map(Instance::to_raw).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Updates scheduled but not applied yet.
    pub fn pending(&self) -> usize {
        self.ripple.pending()
    }
}

async fn axis_planes(ctx: InitContext) -> anyhow::Result<Box<dyn GraphicsFlow>> {
    Ok(Box::new(AxisPlanes::new(&ctx)))
}

async fn sphere_grid(ctx: InitContext) -> anyhow::Result<Box<dyn GraphicsFlow>> {
    Ok(Box::new(SphereGrid::new(&ctx).await?))
}

/// The flows making up the stock scene.
pub fn constructors() -> Vec<FlowConstructor> {
    vec![
        Box::new(|ctx| -> FlowFuture { Box::pin(axis_planes(ctx)) }),
        Box::new(|ctx| -> FlowFuture { Box::pin(sphere_grid(ctx)) }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BobMode;

    #[test]
    fn grid_is_row_major_in_x() {
        let positions = sphere_positions(3);
        assert_eq!(positions.len(), 9);
        assert_eq!(positions[0], Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(positions[1], Vector3::new(0.5, 0.5, 1.5));
        assert_eq!(positions[3], Vector3::new(1.5, 0.5, 0.5));
        assert!(sphere_positions(0).is_empty());
    }

    #[test]
    fn field_takes_tints_from_the_palette() {
        let palette = Palette::builtin();
        let field = SphereField::new(&GridConfig::default(), &AnimationConfig::default(), &palette);
        assert_eq!(field.len(), 100);
        // cell (2, 3) is entry 3 * 2 + 1
        assert_eq!(field.instances()[2 * 10 + 3].tint, palette.sphere_tint(2, 3));
        assert_eq!(field.instances()[0].tint, palette.sphere_tint(0, 0));
    }

    #[test]
    fn first_sphere_moves_immediately_the_rest_later() {
        let mut field = SphereField::new(
            &GridConfig::default(),
            &AnimationConfig::default(),
            &Palette::builtin(),
        );
        let now = Duration::from_millis(500);
        assert!(field.advance(now));
        let t = now.as_secs_f32();
        let expected = 0.5 + t.sin() * t.cos() * 0.1;
        assert!((field.instances()[0].position.y - expected).abs() < 1e-6);
        assert_eq!(field.instances()[1].position.y, 0.5);
        assert_eq!(field.pending(), 99);
    }

    #[test]
    fn anchored_mode_stays_near_the_ground() {
        let animation = AnimationConfig {
            mode: BobMode::Anchored,
            ..Default::default()
        };
        let mut field = SphereField::new(&GridConfig::default(), &animation, &Palette::builtin());
        for frame in 0..600u64 {
            field.advance(Duration::from_millis(frame * 16));
        }
        let max_offset = animation.amplitude * 60.0 / 2.0;
        assert!(field
            .instances()
            .iter()
            .all(|i| i.position.y >= 0.5 - 1e-6 && i.position.y <= 0.5 + max_offset + 1e-6));
    }
}
