//! Scene data: geometry, GPU meshes, instances and textures.
//!
//! - `geometry` builds the sphere and the axis line grid on the CPU
//! - `model` holds vertex layouts and the GPU meshes built from that geometry
//! - `instance` holds per-instance transformation and tint data
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod geometry;
pub mod instance;
pub mod model;
pub mod texture;
