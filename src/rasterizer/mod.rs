//! CPU scanline rasterizer
//!
//! Features:
//! - Flat-top / flat-bottom triangle decomposition
//! - Perspective-correct attribute interpolation (1/w)
//! - Reversed depth buffer (larger is nearer)
//! - Physically based shading with hard shadow maps
//! - Mipmapped, bilinear-filtered textures

mod buffer;
mod clip;
mod math;
mod primitives;
mod render;
mod shader;
mod texture;
mod types;

pub use buffer::*;
pub use clip::*;
pub use math::*;
pub use primitives::*;
pub use render::*;
pub use shader::*;
pub use texture::*;
pub use types::*;
