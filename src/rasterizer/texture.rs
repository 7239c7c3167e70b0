//! Texture loading and mip chains

use std::fmt;
use std::path::Path;

use super::buffer::IntBuffer;
use super::math::Vec2;
use super::types::Color;

/// Error type for texture loading
#[derive(Debug)]
pub enum TextureError {
    IoError(std::io::Error),
    DecodeError(image::ImageError),
    Empty,
}

impl From<std::io::Error> for TextureError {
    fn from(e: std::io::Error) -> Self {
        TextureError::IoError(e)
    }
}

impl From<image::ImageError> for TextureError {
    fn from(e: image::ImageError) -> Self {
        TextureError::DecodeError(e)
    }
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::IoError(e) => write!(f, "IO error: {}", e),
            TextureError::DecodeError(e) => write!(f, "Decode error: {}", e),
            TextureError::Empty => write!(f, "Image has no pixels"),
        }
    }
}

impl std::error::Error for TextureError {}

/// Load an image file into a packed RGB buffer
pub fn load_texture<P: AsRef<Path>>(path: P) -> Result<IntBuffer, TextureError> {
    let bytes = std::fs::read(path.as_ref())?;
    let texture = texture_from_bytes(&bytes)?;
    log::debug!(
        "loaded texture {} ({}x{})",
        path.as_ref().display(),
        texture.width(),
        texture.height()
    );
    Ok(texture)
}

/// Decode an in-memory image into a packed RGB buffer
pub fn texture_from_bytes(bytes: &[u8]) -> Result<IntBuffer, TextureError> {
    let img = image::load_from_memory(bytes)?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Empty);
    }

    let pixels: Vec<u32> = rgb
        .pixels()
        .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
        .collect();

    IntBuffer::from_vec(width as usize, height as usize, pixels).ok_or(TextureError::Empty)
}

/// Create a checkerboard test texture
pub fn checkerboard(size: usize, cell: usize, color1: Color, color2: Color) -> IntBuffer {
    let (a, b) = (color1.to_rgb_u32(), color2.to_rgb_u32());
    let cell = cell.max(1);
    let mut tex = IntBuffer::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let checker = ((x / cell) + (y / cell)) % 2 == 0;
            tex.set(x, y, if checker { a } else { b });
        }
    }
    tex
}

/// Halve a texture, averaging 2x2 blocks in linear space
pub fn downsample(src: &IntBuffer) -> IntBuffer {
    const GAMMA: f32 = 2.2;
    let w = (src.width() / 2).max(1);
    let h = (src.height() / 2).max(1);
    let mut dst = IntBuffer::new(w, h);

    let texel = |x: usize, y: usize| {
        Color::from_rgb_u32(src.get(x % src.width(), y % src.height())).gamma_decode(GAMMA)
    };

    for y in 0..h {
        for x in 0..w {
            let sum = texel(x * 2, y * 2)
                + texel(x * 2 + 1, y * 2)
                + texel(x * 2, y * 2 + 1)
                + texel(x * 2 + 1, y * 2 + 1);
            dst.set(x, y, (sum * 0.25).gamma_encode(GAMMA).to_rgb_u32());
        }
    }
    dst
}

/// Texture plus its chain of successively halved levels
#[derive(Debug, Clone)]
pub struct MipMap {
    levels: Vec<IntBuffer>,
}

impl MipMap {
    pub fn new(base: IntBuffer) -> Self {
        let mut levels = vec![base];
        while let Some(last) = levels.last() {
            if last.width() <= 1 || last.height() <= 1 {
                break;
            }
            let next = downsample(last);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, i: usize) -> &IntBuffer {
        &self.levels[i.min(self.levels.len() - 1)]
    }

    pub fn base(&self) -> &IntBuffer {
        &self.levels[0]
    }

    /// Mip level for the given uv derivatives per screen pixel.
    ///
    /// `lod = log2(max(|dx|, |dy|))` with the derivatives measured in base
    /// texels; the result is rounded, offset, and clamped to the chain.
    pub fn select_level(&self, dx: Vec2, dy: Vec2, level_offset: i32) -> usize {
        let base = self.base();
        let (w, h) = (base.width() as f32, base.height() as f32);
        let px = Vec2::new(dx.x * w, dx.y * h).len();
        let py = Vec2::new(dy.x * w, dy.y * h).len();
        let footprint = px.max(py);

        let lod = if footprint.is_finite() && footprint > 0.0 {
            footprint.log2().round()
        } else {
            0.0
        };
        let max_level = (self.levels.len() - 1) as f32;
        (lod + level_offset as f32).clamp(0.0, max_level) as usize
    }

    /// Bilinear sample from the level chosen by [`MipMap::select_level`]
    pub fn sample(&self, uv: Vec2, dx: Vec2, dy: Vec2, level_offset: i32) -> Color {
        let level = self.select_level(dx, dy, level_offset);
        Color::from_rgb_u32(self.levels[level].tex2d(uv.x, uv.y))
    }
}
