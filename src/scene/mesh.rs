//! Triangle meshes and built-in test geometry

use std::sync::Arc;

use crate::rasterizer::{Color, MipMap, Shading, Vec2, Vec3, Vertex};

/// Indexed triangle mesh with optional texture and shading mode
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// Triangle list; every three entries form one triangle
    pub indices: Vec<u32>,
    pub texture: Option<Arc<MipMap>>,
    pub shading: Shading,
    pub color: Color,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            texture: None,
            shading: Shading::Pbr,
            color: Color::WHITE,
        }
    }

    pub fn with_texture(mut self, texture: Arc<MipMap>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Drop trailing partial triangles and triangles with out-of-range
    /// indices; returns how many triangles were removed
    pub fn retain_valid_triangles(&mut self) -> usize {
        let vertex_count = self.vertices.len();
        let before = self.triangle_count();
        let partial = usize::from(self.indices.len() % 3 != 0);
        let indices: Vec<u32> = self
            .indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
            .flatten()
            .copied()
            .collect();
        self.indices = indices;
        before - self.triangle_count() + partial
    }

    /// Cube centered at the origin, two triangles per face, each face wound
    /// clockwise as seen from outside so it survives backface culling
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            // -Z (faces the default camera)
            (Vec3::new(0.0, 0.0, -1.0), [
                Vec3::new(-h, -h, -h), Vec3::new(-h, h, -h), Vec3::new(h, h, -h), Vec3::new(h, -h, -h),
            ]),
            // +Z
            (Vec3::new(0.0, 0.0, 1.0), [
                Vec3::new(h, -h, h), Vec3::new(h, h, h), Vec3::new(-h, h, h), Vec3::new(-h, -h, h),
            ]),
            // +Y
            (Vec3::new(0.0, 1.0, 0.0), [
                Vec3::new(-h, h, -h), Vec3::new(-h, h, h), Vec3::new(h, h, h), Vec3::new(h, h, -h),
            ]),
            // -Y
            (Vec3::new(0.0, -1.0, 0.0), [
                Vec3::new(-h, -h, h), Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h), Vec3::new(h, -h, h),
            ]),
            // +X
            (Vec3::new(1.0, 0.0, 0.0), [
                Vec3::new(h, -h, -h), Vec3::new(h, h, -h), Vec3::new(h, h, h), Vec3::new(h, -h, h),
            ]),
            // -X
            (Vec3::new(-1.0, 0.0, 0.0), [
                Vec3::new(-h, -h, h), Vec3::new(-h, h, h), Vec3::new(-h, h, -h), Vec3::new(-h, -h, -h),
            ]),
        ];

        let uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (pos, uv) in corners.into_iter().zip(uvs) {
                vertices.push(Vertex::new(pos, normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self::new(vertices, indices)
    }

    /// Square in the XZ plane at height `y`, facing +Y
    pub fn plane(size: f32, y: f32) -> Self {
        let h = size * 0.5;
        let normal = Vec3::UP;
        let vertices = vec![
            Vertex::new(Vec3::new(-h, y, -h), normal, Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::new(-h, y, h), normal, Vec2::new(0.0, 1.0)),
            Vertex::new(Vec3::new(h, y, h), normal, Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(h, y, -h), normal, Vec2::new(1.0, 0.0)),
        ];
        Self::new(vertices, vec![0, 1, 2, 0, 2, 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_layout() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    #[test]
    fn test_cube_faces_wind_outward() {
        // (b - a) x (c - a) points out of the face, toward a viewer in front of it
        let cube = Mesh::cube(2.0);
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| cube.vertices[i as usize]);
            let n = (b.pos - a.pos).cross(c.pos - a.pos);
            assert!(n.dot(a.normal) > 0.0);
        }
    }

    #[test]
    fn test_retain_valid_triangles() {
        let mut mesh = Mesh::new(vec![Vertex::default(); 3], vec![0, 1, 2, 0, 1, 9, 2, 1]);
        let removed = mesh.retain_valid_triangles();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(removed, 2);
    }
}
