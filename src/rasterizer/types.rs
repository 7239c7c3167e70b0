//! Core types for the rasterizer

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::math::{Vec2, Vec3};

/// Linear RGB color, nominally 0.0-1.0 per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const RED: Color = Color { r: 1.0, g: 0.0, b: 0.0 };
    pub const GREEN: Color = Color { r: 0.0, g: 1.0, b: 0.0 };
    pub const BLUE: Color = Color { r: 0.0, g: 0.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn gray(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Unpack from `0x00RRGGBB`
    pub fn from_rgb_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xff) as f32 / 255.0,
            g: ((packed >> 8) & 0xff) as f32 / 255.0,
            b: (packed & 0xff) as f32 / 255.0,
        }
    }

    /// Pack to `0x00RRGGBB`, clamping each channel (NaN packs as 0)
    pub fn to_rgb_u32(self) -> u32 {
        fn channel(c: f32) -> u32 {
            (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8 as u32
        }
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// sRGB-ish encode (`c^(1/gamma)`)
    pub fn gamma_encode(self, gamma: f32) -> Self {
        let inv = 1.0 / gamma;
        Self::new(self.r.max(0.0).powf(inv), self.g.max(0.0).powf(inv), self.b.max(0.0).powf(inv))
    }

    /// Inverse of [`Color::gamma_encode`]
    pub fn gamma_decode(self, gamma: f32) -> Self {
        Self::new(self.r.max(0.0).powf(gamma), self.g.max(0.0).powf(gamma), self.b.max(0.0).powf(gamma))
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub fn from_vec3(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Add for Color {
    type Output = Color;
    fn add(self, o: Color) -> Color {
        Color::new(self.r + o.r, self.g + o.g, self.b + o.b)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, o: Color) {
        *self = *self + o;
    }
}

impl Sub for Color {
    type Output = Color;
    fn sub(self, o: Color) -> Color {
        Color::new(self.r - o.r, self.g - o.g, self.b - o.b)
    }
}

impl SubAssign for Color {
    fn sub_assign(&mut self, o: Color) {
        *self = *self - o;
    }
}

impl Mul<f32> for Color {
    type Output = Color;
    fn mul(self, s: f32) -> Color {
        Color::new(self.r * s, self.g * s, self.b * s)
    }
}

impl Mul for Color {
    type Output = Color;
    fn mul(self, o: Color) -> Color {
        Color::new(self.r * o.r, self.g * o.g, self.b * o.b)
    }
}

/// A mesh vertex with position, normal, texture coordinate and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Color,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
            color: Color::WHITE,
        }
    }
}

impl Vertex {
    pub fn new(pos: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            pos,
            normal,
            uv,
            color: Color::WHITE,
        }
    }
}

/// Directional light; `dir` points from the surface toward the light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirLight {
    pub dir: Vec3,
    pub intensity: f32,
    pub color: Color,
}

impl Default for DirLight {
    fn default() -> Self {
        Self {
            dir: Vec3::new(0.0, 0.0, -1.0),
            intensity: 1.0,
            color: Color::WHITE,
        }
    }
}

/// Surface parameters for the physically based shading path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub roughness: f32,
    pub metallic: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            roughness: 0.5,
            metallic: 0.0,
        }
    }
}

/// Projection used by the color pass (selects the depth-test quantity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMethod {
    /// Compare interpolated 1/w
    #[default]
    Perspective,
    /// Compare 1/z of the screen-space depth
    Orthographic,
}

/// Attributes of a fragment after perspective correction
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: usize,
    pub y: usize,
    pub world_pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Color,
}

/// Per-fragment callback; `None` discards the fragment
pub type ShadeFn = Arc<dyn Fn(&Fragment) -> Option<Color> + Send + Sync>;

/// How a mesh's fragments are colored
#[derive(Clone, Default)]
pub enum Shading {
    /// Cook-Torrance specular + Burley diffuse, lit and shadowed
    #[default]
    Pbr,
    /// Base color (mesh color x vertex color x texture), unlit
    Flat,
    /// World normal remapped into 0-1
    Normals,
    Custom(ShadeFn),
}

impl fmt::Debug for Shading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shading::Pbr => write!(f, "Pbr"),
            Shading::Flat => write!(f, "Flat"),
            Shading::Normals => write!(f, "Normals"),
            Shading::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
