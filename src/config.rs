//! Scene configuration.
//!
//! Every constant of the composition lives here. `SceneConfig::default()` reproduces the
//! stock scene; `assets/scene.json` may override any subset of fields.

use serde::{Deserialize, Serialize};

use crate::resources::load_string;

pub const CONFIG_FILE: &str = "scene.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub grid: GridConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub animation: AnimationConfig,
    pub renderer: RendererConfig,
}

impl SceneConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `assets/scene.json`, falling back to the defaults when there is none.
    pub async fn load() -> anyhow::Result<Self> {
        match load_string(CONFIG_FILE).await {
            Ok(json) => {
                let config = Self::from_json(&json)?;
                log::info!("Loaded scene config from {}", CONFIG_FILE);
                Ok(config)
            }
            Err(e) => {
                log::info!("No {} ({}), using the default scene", CONFIG_FILE, e);
                Ok(Self::default())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Spheres per row and column, also the number of cells per axis line group.
    pub len: usize,
    pub sphere_radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    /// Distance between two parallel axis lines.
    pub line_spacing: f32,
    pub line_color: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            len: 10,
            sphere_radius: 0.5,
            width_segments: 32,
            height_segments: 32,
            line_spacing: 2.0,
            line_color: 0xBABABA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 300.0,
            position: [15.0, 8.0, 15.0],
            target: [0.0; 3],
            damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    /// Half width/height of the orthographic shadow camera.
    pub shadow_extent: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0xFFFFFF,
            ambient_intensity: 0.5,
            directional_color: 0xFFFFFF,
            directional_intensity: 0.5,
            directional_position: [2.0, 2.0, -1.0],
            cast_shadow: true,
            shadow_map_size: 1024,
            shadow_near: 1.0,
            shadow_far: 6.0,
            shadow_extent: 5.0,
        }
    }
}

/// How the per-frame bob is applied to a sphere's height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BobMode {
    /// `y += sin(t)cos(t) * amplitude` once per frame.
    #[default]
    Cumulative,
    /// `y = base + offset(t)`, the 60 Hz steady state of `Cumulative` without frame-rate drift.
    Anchored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub amplitude: f32,
    /// Delay between two consecutive spheres picking up a frame's update.
    pub stagger_ms: u64,
    pub mode: BobMode,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.1,
            stagger_ms: 10,
            mode: BobMode::Cumulative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub max_pixel_ratio: f64,
    pub shadows: bool,
    pub clear_colour: [f64; 4],
    /// Matcap image under `assets/`.
    pub matcap: String,
    /// Palette table under `assets/`; the embedded table is used when unset.
    pub palette: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            shadows: true,
            clear_colour: [0.0, 0.0, 0.0, 1.0],
            matcap: "texture.jpg".to_string(),
            palette: None,
        }
    }
}
