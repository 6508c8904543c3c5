//! sphere-grid
//!
//! A small wgpu scene that runs natively and in the browser: a 10×10 grid of matcap
//! spheres bobbing in a staggered ripple above axis lines on three planes, lit by an
//! ambient and a shadow casting directional light and viewed through orbit controls.
//!
//! High-level modules
//! - `animation`: frame clock, the bob function and the deferred ripple queue
//! - `camera`: orbit camera, controller and uniforms for view/projection
//! - `color`: the deterministic string-to-colour hash
//! - `config`: every constant of the scene, overridable from `assets/scene.json`
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, instances, textures and their CPU-side geometry
//! - `flow`: flows (scene parts) and the event loop driving them
//! - `palette`: the colour table the sphere tints are derived from
//! - `pipelines`: render pipelines (matcap, lines, shadow map) and the lights
//! - `render`: render composition for pipeline batching
//! - `resources`: asset loading for native and WASM
//! - `scene`: the sphere grid and the axis planes
//! - `viewport`: the resize handshake
//!

pub mod animation;
pub mod camera;
pub mod color;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod palette;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Run the stock scene until the window is closed.
pub fn run() -> anyhow::Result<()> {
    flow::run(scene::constructors())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
