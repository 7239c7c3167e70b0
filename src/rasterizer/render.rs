//! Core rendering functions
//! Shadow-map and color passes over scanline-decomposed triangles
//!
//! Each pass transforms a mesh's triangles in parallel, rejects clipped,
//! malformed and back-facing ones, splits the rest into flat-top and
//! flat-bottom halves and walks every scanline under its row lock.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;

use super::buffer::{FloatBuffer, IntBuffer};
use super::clip::{clip_code, homogenize, is_backface, ClipPolicy};
use super::math::{Mat4, Vec2, Vec3};
use super::primitives::{split_triangle, Scanline, TVertex};
use super::shader::physically_based;
use super::texture::MipMap;
use super::types::{Color, DirLight, Fragment, Material, ProjectionMethod, Shading, Vertex};
use crate::config::RenderConfig;
use crate::scene::{Mesh, Scene};

/// Error type for pipeline construction
#[derive(Debug)]
pub enum PipelineError {
    ThreadPool(rayon::ThreadPoolBuildError),
    EmptyTarget { width: usize, height: usize },
}

impl From<rayon::ThreadPoolBuildError> for PipelineError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        PipelineError::ThreadPool(e)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
            PipelineError::EmptyTarget { width, height } => {
                write!(f, "Render target has no pixels ({}x{})", width, height)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Where the pipeline is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    BuffersCleared,
    ShadowPassDone,
    ColorPassDone,
}

/// Render targets plus the worker pool that fills them
pub struct Pipeline {
    config: RenderConfig,
    pool: rayon::ThreadPool,
    color: IntBuffer,
    depth: FloatBuffer,
    shadow: FloatBuffer,
    shadow_view: Option<IntBuffer>,
    state: FrameState,
}

impl Pipeline {
    pub fn new(config: RenderConfig) -> Result<Self, PipelineError> {
        check_target(config.width, config.height)?;
        check_target(config.shadow_map_size, config.shadow_map_size)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("raster-{}", i))
            .build()?;
        log::debug!(
            "pipeline {}x{} (shadow map {}) on {} thread(s)",
            config.width,
            config.height,
            config.shadow_map_size,
            pool.current_num_threads()
        );

        let size = config.shadow_map_size;
        Ok(Self {
            color: IntBuffer::new(config.width, config.height),
            depth: FloatBuffer::new(config.width, config.height),
            shadow: FloatBuffer::new(size, size),
            shadow_view: config.shadow_debug_view.then(|| IntBuffer::new(size, size)),
            config,
            pool,
            state: FrameState::Idle,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Settings are picked up at the next clear or pass; `threads` only at construction
    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    pub fn color_buffer(&self) -> &IntBuffer {
        &self.color
    }

    pub fn depth_buffer(&self) -> &FloatBuffer {
        &self.depth
    }

    pub fn shadow_buffer(&self) -> &FloatBuffer {
        &self.shadow
    }

    pub fn shadow_view(&self) -> Option<&IntBuffer> {
        self.shadow_view.as_ref()
    }

    pub fn frame_state(&self) -> FrameState {
        self.state
    }

    /// Color to the clear color; depth, shadow map and shadow view to zero
    pub fn clear_buffers(&mut self) {
        self.sync_targets();
        self.color.fill(self.config.clear_color.to_rgb_u32());
        self.depth.fill(0.0);
        self.shadow.fill(0.0);
        if let Some(view) = &mut self.shadow_view {
            view.fill(0);
        }
        self.set_state(FrameState::BuffersCleared);
    }

    /// Full frame: clear, shadow pass when enabled, color pass
    pub fn render(&mut self, scene: &Scene) {
        self.clear_buffers();
        if self.config.shadows {
            self.render_shadow_map(scene);
        }
        self.render_meshes(scene);
    }

    /// Rasterize every mesh from the light into the shadow map
    pub fn render_shadow_map(&mut self, scene: &Scene) {
        self.sync_targets();
        {
            let Self { config, pool, shadow, shadow_view, .. } = self;
            let (width, height) = (shadow.width(), shadow.height());
            let rows = row_targets(shadow, shadow_view.as_mut());
            let pass = Pass {
                kind: PassKind::Shadow,
                model: scene.model,
                mvp: scene.model * scene.light_view * scene.light_projection,
                width,
                height,
                backface_cull: config.backface_cull,
                clip_policy: config.clip_policy,
                rows: &rows,
            };
            pool.install(|| pass.draw_meshes(scene.meshes()));
            log::debug!(
                "shadow pass: {} triangle(s) into {}x{}",
                scene.triangle_count(),
                width,
                height
            );
        }
        self.set_state(FrameState::ShadowPassDone);
    }

    /// Rasterize and shade every mesh from the camera into the color target
    pub fn render_meshes(&mut self, scene: &Scene) {
        self.sync_targets();
        {
            let Self { config, pool, color, depth, shadow, .. } = self;
            let (width, height) = (color.width(), color.height());
            let light_vp = scene.light_view * scene.light_projection;
            let shadow = config.shadows.then(|| ShadowLookup {
                map: &*shadow,
                light_vp,
                bias: config.shadow_bias,
                normal_offset: config.shadow_normal_offset,
            });
            let color_pass = ColorPass {
                projection: config.projection,
                light: scene.light,
                camera_pos: scene.camera_position(),
                material: config.material,
                mip_level_offset: config.mip_level_offset,
                shadow,
            };
            let rows = row_targets(depth, Some(color));
            let pass = Pass {
                kind: PassKind::Color(color_pass),
                model: scene.model,
                mvp: scene.model * scene.view * scene.projection,
                width,
                height,
                backface_cull: config.backface_cull,
                clip_policy: config.clip_policy,
                rows: &rows,
            };
            pool.install(|| pass.draw_meshes(scene.meshes()));
            log::debug!(
                "color pass: {} triangle(s) into {}x{}",
                scene.triangle_count(),
                width,
                height
            );
        }
        self.set_state(FrameState::ColorPassDone);
    }

    /// Write one pixel of the color target; out-of-range writes are dropped
    pub fn draw_pixel(&mut self, x: usize, y: usize, color: Color) -> bool {
        if x >= self.color.width() || y >= self.color.height() {
            log::warn!(
                "draw_pixel({}, {}) outside {}x{} target",
                x,
                y,
                self.color.width(),
                self.color.height()
            );
            return false;
        }
        self.color.set(x, y, color.to_rgb_u32());
        true
    }

    fn set_state(&mut self, state: FrameState) {
        log::trace!("frame state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Reallocate targets whose size no longer matches the config
    fn sync_targets(&mut self) {
        let (w, h) = (self.config.width, self.config.height);
        if self.color.width() != w || self.color.height() != h {
            log::debug!("resizing color target to {}x{}", w, h);
            self.color = IntBuffer::new(w, h);
            self.depth = FloatBuffer::new(w, h);
        }
        let size = self.config.shadow_map_size;
        if self.shadow.width() != size {
            self.shadow = FloatBuffer::new(size, size);
        }
        let view_fits = self.shadow_view.as_ref().is_some_and(|v| v.width() == size);
        if !self.config.shadow_debug_view {
            self.shadow_view = None;
        } else if !view_fits {
            self.shadow_view = Some(IntBuffer::new(size, size));
        }
    }
}

fn check_target(width: usize, height: usize) -> Result<(), PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::EmptyTarget { width, height });
    }
    Ok(())
}

/// One row of the bound targets, locked as a unit while a span is walked
struct RowTarget<'r> {
    color: Option<&'r mut [u32]>,
    depth: &'r mut [f32],
}

fn row_targets<'r>(depth: &'r mut FloatBuffer, color: Option<&'r mut IntBuffer>) -> Vec<Mutex<RowTarget<'r>>> {
    match color {
        Some(color) => depth
            .rows_mut()
            .zip(color.rows_mut())
            .map(|(depth, color)| Mutex::new(RowTarget { color: Some(color), depth }))
            .collect(),
        None => depth
            .rows_mut()
            .map(|depth| Mutex::new(RowTarget { color: None, depth }))
            .collect(),
    }
}

/// Hard shadow test against a rendered shadow map
struct ShadowLookup<'a> {
    map: &'a FloatBuffer,
    light_vp: Mat4,
    bias: f32,
    normal_offset: f32,
}

impl ShadowLookup<'_> {
    /// 0 when something nearer to the light covers `world_pos`, else 1
    fn attenuation(&self, world_pos: Vec3, normal: Vec3) -> f32 {
        let clip = self.light_vp.transform_point(world_pos + normal * self.normal_offset);
        let p = homogenize(clip, self.map.width() as f32, self.map.height() as f32);
        let stored = self.map.tex2d_screen_space(p.x, p.y);
        if stored - 1.0 / p.z > self.bias {
            0.0
        } else {
            1.0
        }
    }
}

struct ColorPass<'a> {
    projection: ProjectionMethod,
    light: DirLight,
    camera_pos: Vec3,
    material: Material,
    mip_level_offset: i32,
    shadow: Option<ShadowLookup<'a>>,
}

enum PassKind<'a> {
    Color(ColorPass<'a>),
    Shadow,
}

/// Per-mesh surface state
struct Surface<'a> {
    shading: &'a Shading,
    texture: Option<&'a MipMap>,
    color: Color,
}

impl<'a> Surface<'a> {
    fn of(mesh: &'a Mesh) -> Self {
        Self {
            shading: &mesh.shading,
            texture: mesh.texture.as_deref(),
            color: mesh.color,
        }
    }
}

struct Pass<'a, 'r> {
    kind: PassKind<'a>,
    model: Mat4,
    mvp: Mat4,
    width: usize,
    height: usize,
    backface_cull: bool,
    clip_policy: ClipPolicy,
    rows: &'a [Mutex<RowTarget<'r>>],
}

impl Pass<'_, '_> {
    fn draw_meshes(&self, meshes: &[Mesh]) {
        for mesh in meshes {
            let surface = Surface::of(mesh);
            mesh.indices.par_chunks(3).for_each(|tri| {
                if let &[a, b, c] = tri {
                    self.draw_triangle(&mesh.vertices, [a, b, c], &surface);
                }
            });
        }
    }

    fn draw_triangle(&self, vertices: &[Vertex], indices: [u32; 3], surface: &Surface) {
        let mut verts = [Vertex::default(); 3];
        for (slot, &i) in verts.iter_mut().zip(&indices) {
            match vertices.get(i as usize) {
                Some(v) => *slot = *v,
                None => return,
            }
        }

        let clip = verts.map(|v| self.mvp.transform_point(v.pos));
        if self.clip_policy.rejects(clip.map(clip_code)) {
            return;
        }
        // behind the eye or malformed input
        if clip.iter().any(|c| !(c.w.is_finite() && c.w > 0.0)) {
            return;
        }

        let screen = clip.map(|c| homogenize(c, self.width as f32, self.height as f32));
        if screen.iter().any(|p| !p.is_finite()) {
            return;
        }
        if self.backface_cull && is_backface(screen[0], screen[1], screen[2]) {
            return;
        }

        let tv: [TVertex; 3] = std::array::from_fn(|i| {
            let v = &verts[i];
            let mut t = TVertex::new(
                screen[i],
                self.model.transform_point(v.pos).xyz(),
                v.color,
                v.uv,
                self.model.transform_vector(v.normal),
            );
            t.init_rhw(clip[i].w);
            t
        });

        for line in split_triangle(&tv[0], &tv[1], &tv[2]).scanlines_within(self.height) {
            self.draw_scanline(&line, surface);
        }
    }

    fn draw_scanline(&self, line: &Scanline, surface: &Surface) {
        if line.y < 0 || line.y as usize >= self.height {
            return;
        }
        let x_start = line.x0.max(0);
        let x_end = line.x1.min(self.width as i32 - 1);
        if x_start > x_end {
            return;
        }
        let Some(row) = self.rows.get(line.y as usize) else {
            return;
        };
        let mut row = row.lock().unwrap_or_else(PoisonError::into_inner);

        // spans clipped on the left start part way along; x0 may have saturated
        let start = line.v0 + line.step * (x_start as f32 - line.v0.point.x.floor());
        let span = x_start as usize..=x_end as usize;
        match &self.kind {
            PassKind::Color(pass) => pass.shade_span(&mut row, line, start, span, surface),
            PassKind::Shadow => shadow_span(&mut row, line, start, span),
        }
    }
}

/// Depth is `1/z`, which assumes the orthographic light projection
/// built by `Scene::set_light`.
fn shadow_span(row: &mut RowTarget, line: &Scanline, start: TVertex, span: std::ops::RangeInclusive<usize>) {
    let mut vi = start;
    for x in span {
        let z = 1.0 / vi.point.z;
        vi += line.step;
        if !z.is_finite() || z < row.depth[x] {
            continue;
        }
        if let Some(view) = row.color.as_deref_mut() {
            view[x] = Color::gray(z * 0.1).to_rgb_u32();
        }
        row.depth[x] = z;
    }
}

impl ColorPass<'_> {
    fn shade_span(
        &self,
        row: &mut RowTarget,
        line: &Scanline,
        start: TVertex,
        span: std::ops::RangeInclusive<usize>,
        surface: &Surface,
    ) {
        let y = line.y as usize;
        let mut vi = start;
        for x in span {
            let here = vi;
            vi += line.step;

            let depth = match self.projection {
                ProjectionMethod::Perspective => here.rhw,
                ProjectionMethod::Orthographic => 1.0 / here.point.z,
            };
            if !depth.is_finite() || depth < row.depth[x] {
                continue;
            }
            let inv = 1.0 / here.rhw;
            if !inv.is_finite() {
                continue;
            }

            let v = here * inv;
            let fragment = Fragment {
                x,
                y,
                world_pos: v.world_pos,
                normal: v.normal,
                uv: v.uv,
                color: v.color,
            };
            if let Some(c) = self.shade(&fragment, surface, line.dx * inv, line.dy * inv) {
                if let Some(color) = row.color.as_deref_mut() {
                    color[x] = c.to_rgb_u32();
                }
                row.depth[x] = depth;
            }
        }
    }

    fn shade(&self, fragment: &Fragment, surface: &Surface, dx: Vec2, dy: Vec2) -> Option<Color> {
        match surface.shading {
            Shading::Pbr => Some(self.lit(fragment, self.base_color(fragment, surface, dx, dy))),
            Shading::Flat => Some(self.base_color(fragment, surface, dx, dy)),
            Shading::Normals => {
                let n = fragment.normal.normalize();
                Some(Color::new(n.x * 0.5 + 0.5, n.y * 0.5 + 0.5, n.z * 0.5 + 0.5))
            }
            Shading::Custom(shade) => shade(fragment),
        }
    }

    /// Mesh color x vertex color x texture
    fn base_color(&self, fragment: &Fragment, surface: &Surface, dx: Vec2, dy: Vec2) -> Color {
        let c = surface.color * fragment.color;
        match surface.texture {
            Some(texture) => c * texture.sample(fragment.uv, dx, dy, self.mip_level_offset),
            None => c,
        }
    }

    fn lit(&self, fragment: &Fragment, base: Color) -> Color {
        let n = fragment.normal.normalize();
        let l = self.light.dir;
        let v = (self.camera_pos - fragment.world_pos).normalize();
        let n_dot_l = n.dot(l).clamp(0.0, 1.0);
        let shadow = self
            .shadow
            .as_ref()
            .map_or(1.0, |s| s.attenuation(fragment.world_pos, n));

        let brdf = physically_based(base, self.material, n, l, v, n_dot_l);
        brdf * self.light.color * (self.light.intensity * n_dot_l * shadow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn test_config(width: usize, height: usize) -> RenderConfig {
        RenderConfig {
            width,
            height,
            shadow_map_size: 16,
            shadows: false,
            threads: 2,
            ..Default::default()
        }
    }

    fn triangle(points: [Vec3; 3], shading: Shading, color: Color) -> Mesh {
        let vertices = points
            .iter()
            .map(|&p| Vertex::new(p, Vec3::new(0.0, 0.0, -1.0), Vec2::ZERO))
            .collect();
        Mesh::new(vertices, vec![0, 1, 2]).with_shading(shading).with_color(color)
    }

    fn golden_scene(points: [Vec3; 3]) -> Scene {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        scene.add_mesh(triangle(points, Shading::Flat, Color::WHITE));
        scene
    }

    fn covered(pipeline: &Pipeline) -> Vec<(usize, usize)> {
        let buf = pipeline.color_buffer();
        let mut out = Vec::new();
        for y in 0..buf.height() {
            for x in 0..buf.width() {
                if buf.get(x, y) != 0 {
                    out.push((x, y));
                }
            }
        }
        out
    }

    /// Triangle at depth `z` that projects to the same screen area for any z
    fn centered(z: f32) -> [Vec3; 3] {
        let h = 0.5 * z;
        [Vec3::new(-h, -h, z), Vec3::new(0.0, h, z), Vec3::new(h, -h, z)]
    }

    #[test]
    fn test_golden_back_facing_is_culled() {
        let scene = golden_scene([
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        ]);
        let mut pipeline = Pipeline::new(test_config(4, 4)).unwrap();
        pipeline.render(&scene);
        assert!(covered(&pipeline).is_empty());
        assert!(pipeline.depth_buffer().as_slice().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_golden_coverage_without_culling() {
        let scene = golden_scene([
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        ]);
        let mut config = test_config(4, 4);
        config.backface_cull = false;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.render(&scene);
        assert_eq!(covered(&pipeline), vec![(2, 1), (2, 2), (3, 2)]);
        for (x, y) in covered(&pipeline) {
            assert_eq!(pipeline.color_buffer().get(x, y), 0x00FFFFFF);
            assert!((pipeline.depth_buffer().get(x, y) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_golden_coverage_front_facing() {
        let scene = golden_scene([
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
            Vec3::new(1.0, 0.0, 2.0),
        ]);
        let mut pipeline = Pipeline::new(test_config(4, 4)).unwrap();
        pipeline.render(&scene);
        assert_eq!(covered(&pipeline), vec![(2, 1), (2, 2), (3, 2)]);
    }

    #[test]
    fn test_nearer_surface_wins_in_any_order() {
        let near = triangle(centered(2.0), Shading::Flat, Color::RED);
        let far = triangle(centered(3.0), Shading::Flat, Color::BLUE);

        for order in [[&near, &far], [&far, &near]] {
            let mut scene = Scene::new();
            scene.set_perspective(60.0, 1.0, 0.1, 100.0);
            for mesh in order {
                scene.add_mesh(mesh.clone());
            }
            let mut pipeline = Pipeline::new(test_config(8, 8)).unwrap();
            pipeline.render(&scene);
            assert_eq!(pipeline.color_buffer().get(4, 4), 0x00FF0000);
            assert!((pipeline.depth_buffer().get(4, 4) - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_clip_rejection() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        // beyond the far plane
        scene.add_mesh(triangle(centered(200.0), Shading::Flat, Color::WHITE));
        // behind the eye
        scene.add_mesh(triangle(centered(-2.0), Shading::Flat, Color::WHITE));
        let mut pipeline = Pipeline::new(test_config(8, 8)).unwrap();
        pipeline.render(&scene);
        assert!(covered(&pipeline).is_empty());
    }

    #[test]
    fn test_clip_policy_on_partially_outside_triangle() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        let mut points = centered(2.0);
        points[2].x = 20.0;
        scene.add_mesh(triangle(points, Shading::Flat, Color::WHITE));

        let mut pipeline = Pipeline::new(test_config(8, 8)).unwrap();
        pipeline.render(&scene);
        assert!(!covered(&pipeline).is_empty());

        pipeline.config_mut().clip_policy = ClipPolicy::AnyVertexOutside;
        pipeline.render(&scene);
        assert!(covered(&pipeline).is_empty());
    }

    #[test]
    fn test_triangle_straddling_top_left_corner() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        scene.add_mesh(triangle(
            [Vec3::new(-3.0, 3.0, 2.0), Vec3::new(1.0, -1.0, 2.0), Vec3::new(1.0, 1.0, 2.0)],
            Shading::Flat,
            Color::WHITE,
        ));
        let mut config = test_config(8, 8);
        config.backface_cull = false;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.render(&scene);

        let pixels = covered(&pipeline);
        assert!(pixels.contains(&screen_pixel(&scene, Vec3::new(0.5, 0.5, 2.0), 8)));
        for (x, y) in pixels {
            assert_eq!(pipeline.color_buffer().get(x, y), 0x00FFFFFF);
            assert!((pipeline.depth_buffer().get(x, y) - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_vertex_just_in_front_of_eye() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        // far off the left edge once projected
        scene.add_mesh(triangle(
            [Vec3::new(-10.0, 0.0, 1e-9), Vec3::new(0.0, 0.5, 2.0), Vec3::new(0.3, -0.5, 2.0)],
            Shading::Flat,
            Color::WHITE,
        ));
        // millions of rows above the target once projected
        scene.add_mesh(triangle(
            [Vec3::new(0.0, 1.0, 1e-9), Vec3::new(-0.5, 0.0, 2.0), Vec3::new(0.5, 0.0, 2.0)],
            Shading::Flat,
            Color::WHITE,
        ));
        let mut config = test_config(8, 8);
        config.backface_cull = false;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.render(&scene);

        assert_eq!(pipeline.frame_state(), FrameState::ColorPassDone);
        assert!(pipeline.depth_buffer().as_slice().iter().all(|d| d.is_finite() && *d >= 0.0));
    }

    #[test]
    fn test_malformed_vertices_leave_buffers_untouched() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        let mut points = centered(2.0);
        points[1].y = f32::NAN;
        scene.add_mesh(triangle(points, Shading::Flat, Color::WHITE));
        let mut points = centered(2.0);
        points[0].x = f32::INFINITY;
        scene.add_mesh(triangle(points, Shading::Flat, Color::WHITE));

        let mut pipeline = Pipeline::new(test_config(8, 8)).unwrap();
        pipeline.render(&scene);
        assert!(covered(&pipeline).is_empty());
        assert!(pipeline.depth_buffer().as_slice().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_custom_shading_can_discard() {
        let mut scene = Scene::new();
        scene.set_perspective(60.0, 1.0, 0.1, 100.0);
        let discard: crate::rasterizer::ShadeFn = Arc::new(|frag: &Fragment| {
            if frag.x % 2 == 0 {
                None
            } else {
                Some(Color::GREEN)
            }
        });
        scene.add_mesh(triangle(centered(2.0), Shading::Custom(discard), Color::WHITE));

        let mut pipeline = Pipeline::new(test_config(8, 8)).unwrap();
        pipeline.render(&scene);
        let pixels = covered(&pipeline);
        assert!(!pixels.is_empty());
        for (x, y) in pixels {
            assert_eq!(x % 2, 1);
            assert_eq!(pipeline.color_buffer().get(x, y), 0x0000FF00);
        }
        for y in 0..8 {
            for x in (0..8).step_by(2) {
                assert_eq!(pipeline.depth_buffer().get(x, y), 0.0);
            }
        }
    }

    #[test]
    fn test_orthographic_depth_is_inverse_z() {
        let mut scene = Scene::new();
        scene.set_orthographic(4.0, 4.0, 10.0);
        scene.add_mesh(triangle(
            [Vec3::new(-1.0, -1.0, 2.0), Vec3::new(0.0, 1.0, 2.0), Vec3::new(1.0, -1.0, 2.0)],
            Shading::Flat,
            Color::WHITE,
        ));
        let mut config = test_config(8, 8);
        config.projection = ProjectionMethod::Orthographic;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.render(&scene);
        assert!(!covered(&pipeline).is_empty());
        assert!((pipeline.depth_buffer().get(4, 4) - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_frame_states() {
        let scene = golden_scene(centered(2.0));
        let mut pipeline = Pipeline::new(test_config(4, 4)).unwrap();
        assert_eq!(pipeline.frame_state(), FrameState::Idle);
        pipeline.clear_buffers();
        assert_eq!(pipeline.frame_state(), FrameState::BuffersCleared);
        pipeline.render_shadow_map(&scene);
        assert_eq!(pipeline.frame_state(), FrameState::ShadowPassDone);
        pipeline.render_meshes(&scene);
        assert_eq!(pipeline.frame_state(), FrameState::ColorPassDone);
    }

    #[test]
    fn test_draw_pixel_bounds() {
        let mut pipeline = Pipeline::new(test_config(4, 4)).unwrap();
        assert!(pipeline.draw_pixel(3, 3, Color::RED));
        assert_eq!(pipeline.color_buffer().get(3, 3), 0x00FF0000);
        assert!(!pipeline.draw_pixel(4, 0, Color::RED));
        assert!(!pipeline.draw_pixel(0, 100, Color::RED));
    }

    #[test]
    fn test_empty_target_is_an_error() {
        assert!(matches!(
            Pipeline::new(test_config(0, 4)),
            Err(PipelineError::EmptyTarget { width: 0, height: 4 })
        ));
        let mut config = test_config(4, 4);
        config.shadow_map_size = 0;
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn test_resize_through_config() {
        let mut pipeline = Pipeline::new(test_config(4, 4)).unwrap();
        pipeline.config_mut().width = 6;
        pipeline.config_mut().shadow_debug_view = true;
        pipeline.clear_buffers();
        assert_eq!(pipeline.color_buffer().width(), 6);
        assert_eq!(pipeline.depth_buffer().width(), 6);
        assert_eq!(pipeline.shadow_view().map(|v| v.width()), Some(16));
    }

    #[test]
    fn test_shadow_attenuation() {
        let mut map = FloatBuffer::new(4, 4);
        map.fill(2.0);
        let lookup = ShadowLookup {
            map: &map,
            light_vp: Mat4::orthographic(4.0, 4.0, 10.0),
            bias: 0.1,
            normal_offset: 0.0,
        };
        // z = 0.4 -> 1/z = 2.5, nearer than the stored 2.0
        assert_eq!(lookup.attenuation(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO), 1.0);
        // z = 0.6 -> 1/z ~ 1.67, occluded
        assert_eq!(lookup.attenuation(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO), 0.0);
        // within the bias
        assert_eq!(lookup.attenuation(Vec3::new(0.0, 0.0, 5.1), Vec3::ZERO), 1.0);
    }

    fn shadow_scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_view_matrix(Mat4::translation(0.0, 0.0, 2.5));
        scene.set_perspective(60.0, 1.0, 0.1, 10.0);
        scene.set_light(Vec3::UP, 4.0, 4.0, 10.0, 1.0, Color::WHITE);
        scene.add_mesh(Mesh::cube(0.5));
        scene.add_mesh(Mesh::plane(4.0, -1.0));
        scene
    }

    fn screen_pixel(scene: &Scene, p: Vec3, size: usize) -> (usize, usize) {
        let clip = (scene.view * scene.projection).transform_point(p);
        let s = homogenize(clip, size as f32, size as f32);
        (s.x as usize, s.y as usize)
    }

    #[test]
    fn test_shadow_pass_darkens_occluded_floor() {
        let scene = shadow_scene();
        let mut config = test_config(64, 64);
        config.shadows = true;
        config.shadow_map_size = 64;
        config.shadow_debug_view = true;
        let mut pipeline = Pipeline::new(config).unwrap();
        pipeline.render(&scene);

        assert!(pipeline.shadow_buffer().as_slice().iter().any(|&d| d > 0.0));
        let view = pipeline.shadow_view().unwrap();
        assert!(view.as_slice().iter().any(|&p| p != 0));

        let (sx, sy) = screen_pixel(&scene, Vec3::new(0.0, -1.0, 0.0), 64);
        let (lx, ly) = screen_pixel(&scene, Vec3::new(0.8, -1.0, 0.0), 64);
        let shadowed = Color::from_rgb_u32(pipeline.color_buffer().get(sx, sy));
        let lit = Color::from_rgb_u32(pipeline.color_buffer().get(lx, ly));
        assert_eq!(shadowed, Color::BLACK);
        assert!(lit.r > 0.0 && lit.g > 0.0);

        // without the shadow pass the same spot is lit
        pipeline.config_mut().shadows = false;
        pipeline.render(&scene);
        let unshadowed = Color::from_rgb_u32(pipeline.color_buffer().get(sx, sy));
        assert!(unshadowed.r > 0.0);
    }

    #[test]
    fn test_thread_count_does_not_change_image() {
        let mut scene = shadow_scene();
        scene.model_rotate(30.0);
        let render = |threads| {
            let mut config = test_config(48, 48);
            config.threads = threads;
            config.shadows = true;
            let mut pipeline = Pipeline::new(config).unwrap();
            pipeline.render(&scene);
            pipeline.depth_buffer().clone()
        };
        assert_eq!(render(1), render(4));
    }
}
