//! Fixed-size 2D sample grids used as render targets, depth buffers and textures

use std::slice::ChunksMut;

use super::types::Color;

/// Sample types that can be blended for bilinear filtering
pub trait Sample: Copy + Default + Send + Sync {
    fn blend(a: Self, b: Self, t: f32) -> Self;
}

impl Sample for f32 {
    fn blend(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Packed `0x00RRGGBB`, blended per channel
impl Sample for u32 {
    fn blend(a: u32, b: u32, t: f32) -> u32 {
        let ca = Color::from_rgb_u32(a);
        let cb = Color::from_rgb_u32(b);
        (ca + (cb - ca) * t).to_rgb_u32()
    }
}

/// Row-major 2D grid with (x, y) and linear indexing
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

/// Packed RGB color target / texture
pub type IntBuffer = Buffer<u32>;
/// Depth buffer / shadow map
pub type FloatBuffer = Buffer<f32>;

impl<T: Sample> Buffer<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    /// Wrap existing samples; `None` when the length doesn't match
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.index(x, y)]
    }

    pub fn try_get(&self, x: usize, y: usize) -> Option<T> {
        if x < self.width && y < self.height {
            Some(self.get(x, y))
        } else {
            None
        }
    }

    pub fn get_index(&self, i: usize) -> T {
        self.data[i]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable row slices, top to bottom
    pub fn rows_mut(&mut self) -> ChunksMut<'_, T> {
        self.data.chunks_mut(self.width.max(1))
    }

    /// Nearest sample at normalized coordinates, wrapping outside [0, 1)
    pub fn sample_nearest(&self, u: f32, v: f32) -> T {
        let x = wrap((u - u.floor()) * self.width as f32, self.width);
        let y = wrap((v - v.floor()) * self.height as f32, self.height);
        self.get(x, y)
    }

    /// Bilinear sample in texel units, wrapping around both edges
    pub fn tex2d_screen_space(&self, u: f32, v: f32) -> T {
        if self.data.is_empty() {
            return T::default();
        }
        let (fx, fy) = (u.floor(), v.floor());
        let (tx, ty) = (finite_or_zero(u - fx), finite_or_zero(v - fy));
        let x = wrap(fx, self.width);
        let y = wrap(fy, self.height);
        let x2 = (x + 1) % self.width;
        let y2 = (y + 1) % self.height;

        let top = T::blend(self.get(x, y), self.get(x2, y), tx);
        let bottom = T::blend(self.get(x, y2), self.get(x2, y2), tx);
        T::blend(top, bottom, ty)
    }

    /// Bilinear sample at texture coordinates (v = 0 is the bottom row)
    pub fn tex2d(&self, u: f32, v: f32) -> T {
        self.tex2d_screen_space(u * self.width as f32, (1.0 - v) * self.height as f32)
    }
}

impl IntBuffer {
    /// RGBA bytes for presentation (alpha forced opaque)
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 4);
        for &p in &self.data {
            out.extend_from_slice(&[(p >> 16) as u8, (p >> 8) as u8, p as u8, 255]);
        }
        out
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

/// Integer texel coordinate wrapped into [0, size)
fn wrap(coord: f32, size: usize) -> usize {
    let c = coord as i64; // saturating; NaN becomes 0
    c.rem_euclid(size.max(1) as i64) as usize
}
