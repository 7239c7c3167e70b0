//! Renderer and viewer settings, stored as RON

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::rasterizer::{ClipPolicy, Color, Material, ProjectionMethod, Vec3};

/// Error type for config operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the pipeline needs to size its targets and run a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Side length of the square shadow map
    pub shadow_map_size: usize,
    pub projection: ProjectionMethod,
    pub clip_policy: ClipPolicy,
    pub backface_cull: bool,
    pub shadows: bool,
    /// Depth slack before a point counts as occluded
    pub shadow_bias: f32,
    /// World-space push along the normal before the shadow lookup
    pub shadow_normal_offset: f32,
    /// Also write a grayscale picture of the shadow map
    pub shadow_debug_view: bool,
    pub mip_level_offset: i32,
    pub material: Material,
    pub clear_color: Color,
    /// Worker threads; 0 picks the rayon default
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            shadow_map_size: 1024,
            projection: ProjectionMethod::Perspective,
            clip_policy: ClipPolicy::AllVerticesOutside,
            backface_cull: true,
            shadows: true,
            shadow_bias: 0.1,
            shadow_normal_offset: 0.05,
            shadow_debug_view: false,
            mip_level_offset: 0,
            material: Material::default(),
            clear_color: Color::BLACK,
            threads: 0,
        }
    }
}

/// Settings of the interactive viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub render: RenderConfig,
    /// OBJ file to show; the built-in cube and floor when unset
    pub mesh: Option<PathBuf>,
    pub texture: Option<PathBuf>,
    pub camera_distance: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Points from the scene toward the light
    pub light_direction: Vec3,
    /// Width, height and depth of the box the shadow map covers
    pub light_extent: Vec3,
    pub light_intensity: f32,
    pub light_color: Color,
    /// Degrees per second when no rotate key is held
    pub auto_rotate: f32,
    pub window_scale: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            mesh: None,
            texture: None,
            camera_distance: 2.5,
            fov: 60.0,
            near: 0.1,
            far: 10.0,
            light_direction: Vec3::new(1.0, 1.0, -1.0),
            light_extent: Vec3::new(4.0, 4.0, 10.0),
            light_intensity: 2.0,
            light_color: Color::new(0.98, 0.92, 0.89),
            auto_rotate: 15.0,
            window_scale: 1.0,
        }
    }
}

/// Load a config from a RON file
pub fn load_config<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let contents = fs::read_to_string(path)?;
    load_config_from_str(&contents)
}

/// Parse a config from a RON string; missing fields take their defaults
pub fn load_config_from_str<T>(s: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    Ok(ron::from_str(s)?)
}

/// Save a config to a RON file
pub fn save_config<T: Serialize, P: AsRef<Path>>(config: &T, path: P) -> Result<(), ConfigError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}
