//! Trapezoid: a multithreaded CPU scanline rasterizer
//!
//! - `rasterizer`: math kernel, buffers, textures, triangle setup and the pipeline
//! - `scene`: meshes, camera and light transforms, OBJ loading
//! - `config`: RON-backed render and viewer settings

pub mod config;
pub mod rasterizer;
pub mod scene;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
