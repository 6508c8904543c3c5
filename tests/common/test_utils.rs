#![allow(dead_code)]

use std::time::Duration;

use sphere_grid::{config::SceneConfig, palette::Palette, scene::SphereField};

/// The stock sphere grid with the embedded palette.
pub fn stock_field() -> SphereField {
    let config = SceneConfig::default();
    SphereField::new(&config.grid, &config.animation, &Palette::builtin())
}

/// Drive `field` through `frames` frames of `frame_ms` each, starting at zero.
pub fn run_frames(field: &mut SphereField, frames: u64, frame_ms: u64) -> Duration {
    let mut now = Duration::ZERO;
    for frame in 0..frames {
        now = Duration::from_millis(frame * frame_ms);
        field.advance(now);
    }
    now
}

pub fn heights(field: &SphereField) -> Vec<f32> {
    field.instances().iter().map(|i| i.position.y).collect()
}
