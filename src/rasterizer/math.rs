//! Vector and matrix math for the pipeline
//!
//! Matrices use the row-vector convention: a point is transformed as
//! `v' = v * M`, so transforms compose left to right
//! (`model * view * projection`).

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use serde::{Serialize, Deserialize};

/// 2D Vector (texture coordinates, screen-space derivatives)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn len(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, s: f32) -> Vec2 {
        Vec2::new(self.x / s, self.y / s)
    }
}

/// 3D Vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn len(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy; the zero vector is returned unchanged
    pub fn normalize(self) -> Vec3 {
        let l = self.len();
        if l == 0.0 {
            return self;
        }
        Vec3 {
            x: self.x / l,
            y: self.y / l,
            z: self.z / l,
        }
    }

    pub fn scale(self, s: f32) -> Vec3 {
        Vec3 {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Extend to a homogeneous point (w = 1)
    pub fn to_point(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 1.0)
    }

    /// Extend to a homogeneous direction (w = 0)
    pub fn to_direction(self) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, 0.0)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Vec3) {
        *self = *self + other;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Vec3) {
        *self = *self - other;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        self.scale(s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        self.scale(-1.0)
    }
}

/// Homogeneous 4D vector (clip space)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Drop w without dividing
    pub fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Perspective divide, then drop w
    pub fn homogenize(self) -> Vec3 {
        let inv_w = 1.0 / self.w;
        Vec3::new(self.x * inv_w, self.y * inv_w, self.z * inv_w)
    }
}

/// 4x4 matrix, row-major, row-vector convention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut r = Self::IDENTITY;
        r.m[3][0] = x;
        r.m[3][1] = y;
        r.m[3][2] = z;
        r
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Self {
        let mut r = Self::IDENTITY;
        r.m[0][0] = x;
        r.m[1][1] = y;
        r.m[2][2] = z;
        r
    }

    /// Rotation of `degrees` about `axis` (built from the equivalent quaternion)
    pub fn rotation(axis: Vec3, degrees: f32) -> Self {
        let axis = axis.normalize();
        let (qsin, qcos) = (degrees.to_radians() * 0.5).sin_cos();
        let (x, y, z, w) = (axis.x * qsin, axis.y * qsin, axis.z * qsin, qcos);

        Mat4 {
            m: [
                [1.0 - 2.0 * y * y - 2.0 * z * z, 2.0 * x * y + 2.0 * w * z, 2.0 * x * z - 2.0 * w * y, 0.0],
                [2.0 * x * y - 2.0 * w * z, 1.0 - 2.0 * x * x - 2.0 * z * z, 2.0 * y * z + 2.0 * w * x, 0.0],
                [2.0 * x * z + 2.0 * w * y, 2.0 * y * z - 2.0 * w * x, 1.0 - 2.0 * x * x - 2.0 * y * y, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Left-handed view matrix looking from `eye` toward `at`
    pub fn look_at(eye: Vec3, at: Vec3, up: Vec3) -> Self {
        let zaxis = (at - eye).normalize();
        let xaxis = up.cross(zaxis).normalize();
        let yaxis = zaxis.cross(xaxis);

        Mat4 {
            m: [
                [xaxis.x, yaxis.x, zaxis.x, 0.0],
                [xaxis.y, yaxis.y, zaxis.y, 0.0],
                [xaxis.z, yaxis.z, zaxis.z, 0.0],
                [-xaxis.dot(eye), -yaxis.dot(eye), -zaxis.dot(eye), 1.0],
            ],
        }
    }

    /// Left-handed perspective projection; maps view z in [near, far] to clip z in [0, w]
    pub fn perspective(fovy_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let fax = 1.0 / (fovy_degrees.to_radians() * 0.5).tan();
        let mut r = Mat4 { m: [[0.0; 4]; 4] };
        r.m[0][0] = fax / aspect;
        r.m[1][1] = fax;
        r.m[2][2] = far / (far - near);
        r.m[3][2] = -near * far / (far - near);
        r.m[2][3] = 1.0;
        r
    }

    /// Orthographic projection of a `width` x `height` box, `depth` deep
    pub fn orthographic(width: f32, height: f32, depth: f32) -> Self {
        Self::scaling(2.0 / width, 2.0 / height, 1.0 / depth)
    }

    /// `self * translation(x, y, z)`
    pub fn translated(self, x: f32, y: f32, z: f32) -> Self {
        self * Self::translation(x, y, z)
    }

    /// `self * rotation(axis, degrees)`
    pub fn rotated(self, axis: Vec3, degrees: f32) -> Self {
        self * Self::rotation(axis, degrees)
    }

    /// `v * self`
    pub fn apply(&self, v: Vec4) -> Vec4 {
        let m = &self.m;
        Vec4 {
            x: v.x * m[0][0] + v.y * m[1][0] + v.z * m[2][0] + v.w * m[3][0],
            y: v.x * m[0][1] + v.y * m[1][1] + v.z * m[2][1] + v.w * m[3][1],
            z: v.x * m[0][2] + v.y * m[1][2] + v.z * m[2][2] + v.w * m[3][2],
            w: v.x * m[0][3] + v.y * m[1][3] + v.z * m[2][3] + v.w * m[3][3],
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec4 {
        self.apply(p.to_point())
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.apply(v.to_direction()).xyz()
    }

    /// Eye position of a rigid (rotation + translation) view matrix
    pub fn view_origin(&self) -> Vec3 {
        let m = &self.m;
        let t = Vec3::new(m[3][0], m[3][1], m[3][2]);
        -Vec3::new(
            t.dot(Vec3::new(m[0][0], m[0][1], m[0][2])),
            t.dot(Vec3::new(m[1][0], m[1][1], m[1][2])),
            t.dot(Vec3::new(m[2][0], m[2][1], m[2][2])),
        )
    }
}

impl Mul for Mat4 {
    type Output = Mat4;
    fn mul(self, other: Mat4) -> Mat4 {
        let mut r = Mat4 { m: [[0.0; 4]; 4] };
        for i in 0..4 {
            for j in 0..4 {
                r.m[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j]
                    + self.m[i][3] * other.m[3][j];
            }
        }
        r
    }
}

/// Calculate barycentric coordinates for point p in triangle (v1, v2, v3)
/// Returns (u, v, w) where u + v + w = 1 if point is inside triangle
pub fn barycentric(p: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> Vec3 {
    let d = (v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y);

    if d.abs() < 0.0001 {
        return Vec3::new(-1.0, -1.0, -1.0); // Degenerate triangle
    }

    let u = ((v2.y - v3.y) * (p.x - v3.x) + (v3.x - v2.x) * (p.y - v3.y)) / d;
    let v = ((v3.y - v1.y) * (p.x - v3.x) + (v1.x - v3.x) * (p.y - v3.y)) / d;
    let w = 1.0 - u - v;

    Vec3::new(u, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_vec3_dot() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert!((a.dot(b) - 32.0).abs() < 0.001);
    }

    #[test]
    fn test_vec3_cross() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = a.cross(b);
        assert!((c.z - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_zero_is_noop() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        assert!(approx(Vec3::new(3.0, 4.0, 0.0).normalize().len(), 1.0));
    }

    #[test]
    fn test_homogenize_divides_by_w() {
        let v = Vec4::new(2.0, 4.0, 6.0, 2.0).homogenize();
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_perspective_depth_range() {
        let p = Mat4::perspective(60.0, 1.0, 0.1, 100.0);
        let near = p.transform_point(Vec3::new(0.0, 0.0, 0.1));
        let far = p.transform_point(Vec3::new(0.0, 0.0, 100.0));
        assert!(approx(near.z, 0.0));
        assert!(approx(far.z / far.w, 1.0));
        assert!(approx(near.w, 0.1));
    }

    #[test]
    fn test_translation_composes_row_vector() {
        let m = Mat4::translation(1.0, 0.0, 0.0) * Mat4::scaling(2.0, 2.0, 2.0);
        // translate first, then scale
        let p = m.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx(p.x, 4.0));
        assert_eq!(Mat4::identity() * m, m);
    }

    #[test]
    fn test_rotation_about_y() {
        let r = Mat4::rotation(Vec3::UP, 90.0);
        let v = r.transform_vector(Vec3::new(1.0, 0.0, 0.0));
        assert!(approx(v.len(), 1.0));
        assert!(approx(v.y, 0.0));
        assert!(approx(v.x, 0.0));
    }

    #[test]
    fn test_look_at_puts_target_on_z() {
        let eye = Vec3::new(3.0, 2.0, -5.0);
        let view = Mat4::look_at(eye, Vec3::ZERO, Vec3::UP);
        let target = view.transform_point(Vec3::ZERO);
        assert!(approx(target.x, 0.0));
        assert!(approx(target.y, 0.0));
        assert!(approx(target.z, eye.len()));
    }

    #[test]
    fn test_view_origin_recovers_eye() {
        let eye = Vec3::new(1.0, -2.0, 4.0);
        let view = Mat4::look_at(eye, Vec3::new(0.0, 0.5, 0.0), Vec3::UP);
        let o = view.view_origin();
        assert!(approx(o.x, eye.x) && approx(o.y, eye.y) && approx(o.z, eye.z));

        let translated = Mat4::translation(0.0, 0.0, 2.5).view_origin();
        assert!(approx(translated.z, -2.5));
    }

    #[test]
    fn test_barycentric_inside() {
        let v1 = Vec2::new(0.0, 0.0);
        let v2 = Vec2::new(10.0, 0.0);
        let v3 = Vec2::new(5.0, 10.0);
        let p = Vec2::new(5.0, 3.0);
        let bc = barycentric(p, v1, v2, v3);
        assert!(bc.x >= 0.0 && bc.y >= 0.0 && bc.z >= 0.0);
    }
}
