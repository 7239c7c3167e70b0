//! Scene description: meshes plus camera and light transforms
//!
//! The scene holds everything a frame needs that outlives the frame:
//! - Camera model / view / projection matrices
//! - Light view / projection for the shadow pass
//! - The directional light and the mesh list

mod mesh;
pub mod obj;

pub use mesh::*;

use crate::rasterizer::{Color, DirLight, Mat4, Vec3};

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub light_view: Mat4,
    pub light_projection: Mat4,
    pub light: DirLight,
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn set_perspective(&mut self, fovy_degrees: f32, aspect: f32, near: f32, far: f32) {
        self.projection = Mat4::perspective(fovy_degrees, aspect, near, far);
    }

    pub fn set_orthographic(&mut self, width: f32, height: f32, depth: f32) {
        self.projection = Mat4::orthographic(width, height, depth);
    }

    /// Place a directional light.
    ///
    /// `direction` points from the scene toward the light. The shadow camera
    /// sits `depth / 2` along it looking at the origin and covers a
    /// `width` x `height` x `depth` box.
    pub fn set_light(&mut self, direction: Vec3, width: f32, height: f32, depth: f32, intensity: f32, color: Color) {
        let dir = direction.normalize();
        let eye = dir * (depth * 0.5);
        let up = if dir.cross(Vec3::UP).len() < 1e-4 {
            Vec3::new(0.0, 0.0, 1.0)
        } else {
            Vec3::UP
        };
        self.light_view = Mat4::look_at(eye, Vec3::ZERO, up);
        self.light_projection = Mat4::orthographic(width, height, depth);
        self.light = DirLight { dir, intensity, color };
    }

    /// Move the camera along its y and z axes (applied in view space)
    pub fn camera_translate(&mut self, y: f32, z: f32) {
        self.view = self.view.translated(0.0, y, z);
    }

    /// Spin the model about the world y axis
    pub fn model_rotate(&mut self, degrees: f32) {
        self.model = self.model.rotated(Vec3::UP, degrees);
    }

    /// Add a mesh, dropping triangles that reference missing vertices
    pub fn add_mesh(&mut self, mut mesh: Mesh) {
        let dropped = mesh.retain_valid_triangles();
        if dropped > 0 {
            log::warn!("dropped {} malformed triangle(s) from mesh", dropped);
        }
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// Camera position in world space
    pub fn camera_position(&self) -> Vec3 {
        self.view.view_origin()
    }

    /// Reset every transform to identity (meshes and light are kept)
    pub fn clear(&mut self) {
        self.model = Mat4::identity();
        self.view = Mat4::identity();
        self.projection = Mat4::identity();
        self.light_view = Mat4::identity();
        self.light_projection = Mat4::identity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Vertex;

    #[test]
    fn test_clear_resets_matrices() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 10.0);
        scene.camera_translate(0.5, 2.0);
        scene.model_rotate(30.0);
        scene.set_light(Vec3::new(1.0, 1.0, -1.0), 4.0, 4.0, 10.0, 2.0, Color::WHITE);
        scene.add_mesh(Mesh::cube(1.0));

        scene.clear();
        assert_eq!(scene.model, Mat4::identity());
        assert_eq!(scene.view, Mat4::identity());
        assert_eq!(scene.projection, Mat4::identity());
        assert_eq!(scene.light_view, Mat4::identity());
        assert_eq!(scene.light_projection, Mat4::identity());
        assert_eq!(scene.meshes().len(), 1);
    }

    #[test]
    fn test_light_frames_origin() {
        let mut scene = Scene::new();
        scene.set_light(Vec3::new(0.0, 1.0, 0.0), 4.0, 4.0, 10.0, 1.0, Color::WHITE);
        let clip = (scene.light_view * scene.light_projection).transform_point(Vec3::ZERO);
        // origin lands mid-depth, centered
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!((clip.z - 0.5).abs() < 1e-5);
        assert!((scene.light.dir.len() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_camera_translate_moves_eye() {
        let mut scene = Scene::new();
        scene.set_view_matrix(Mat4::translation(0.0, 0.0, 2.5));
        assert!((scene.camera_position().z + 2.5).abs() < 1e-5);
        scene.camera_translate(0.0, 0.5);
        assert!((scene.camera_position().z + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_add_mesh_drops_bad_triangles() {
        let mut scene = Scene::new();
        scene.add_mesh(Mesh::new(vec![Vertex::default(); 3], vec![0, 1, 2, 3, 4, 5]));
        assert_eq!(scene.triangle_count(), 1);
    }
}
