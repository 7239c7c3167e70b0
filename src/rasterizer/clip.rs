//! Clip-volume tests, backface culling and the viewport transform

use serde::{Deserialize, Serialize};

use super::math::{Vec3, Vec4};

// outcodes against the canonical view volume (0 <= z <= w, -w <= x, y <= w)
pub const CLIP_NEAR: u8 = 0b000001;
pub const CLIP_FAR: u8 = 0b000010;
pub const CLIP_LEFT: u8 = 0b000100;
pub const CLIP_RIGHT: u8 = 0b001000;
pub const CLIP_BOTTOM: u8 = 0b010000;
pub const CLIP_TOP: u8 = 0b100000;

/// Outcode of a clip-space position; 0 means inside
pub fn clip_code(v: Vec4) -> u8 {
    let w = v.w;
    let mut code = 0;
    if v.z < 0.0 {
        code |= CLIP_NEAR;
    }
    if v.z > w {
        code |= CLIP_FAR;
    }
    if v.x < -w {
        code |= CLIP_LEFT;
    }
    if v.x > w {
        code |= CLIP_RIGHT;
    }
    if v.y < -w {
        code |= CLIP_BOTTOM;
    }
    if v.y > w {
        code |= CLIP_TOP;
    }
    code
}

/// When a triangle is thrown away by the clip test.
///
/// There is no partial clipping: a triangle that survives is rasterized
/// whole and the scanline walk clamps it to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipPolicy {
    /// Reject only when every vertex is outside the volume
    #[default]
    AllVerticesOutside,
    /// Reject as soon as any vertex is outside (older, more aggressive variant)
    AnyVertexOutside,
}

impl ClipPolicy {
    pub fn rejects(self, codes: [u8; 3]) -> bool {
        match self {
            ClipPolicy::AllVerticesOutside => codes.iter().all(|&c| c != 0),
            ClipPolicy::AnyVertexOutside => codes.iter().any(|&c| c != 0),
        }
    }
}

/// Screen-space winding test: culled when z of `(p1 - p0) x (p2 - p1)` is <= 0
pub fn is_backface(p0: Vec3, p1: Vec3, p2: Vec3) -> bool {
    let e0 = p1 - p0;
    let e1 = p2 - p1;
    e0.x * e1.y - e0.y * e1.x <= 0.0
}

/// Perspective divide and viewport mapping (y flipped, origin top-left)
pub fn homogenize(clip: Vec4, width: f32, height: f32) -> Vec3 {
    let ndc = clip.homogenize();
    Vec3::new(
        (ndc.x + 1.0) * width * 0.5,
        (1.0 - ndc.y) * height * 0.5,
        ndc.z,
    )
}
