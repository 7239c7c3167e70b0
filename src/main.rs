//! Trapezoid viewer: renders a lit, shadowed mesh on the CPU and blits it
//!
//! Keys:
//! - W/S move the camera forward/back, Q/E up/down
//! - A/D rotate the model (it turns slowly on its own otherwise)
//! - Left/Right change roughness, Up/Down change metallic
//! - Tab toggles shadows, Escape quits

use std::path::Path;
use std::sync::Arc;

use macroquad::prelude::*;
use trapezoid_raster::config::{load_config, ViewerConfig};
use trapezoid_raster::rasterizer::{self as raster, load_texture, MipMap, Pipeline, ProjectionMethod};
use trapezoid_raster::scene::{obj::load_obj, Mesh, Scene};
use trapezoid_raster::VERSION;

const CONFIG_PATH: &str = "assets/viewer.ron";

/// Camera travel in world units per second
const MOVE_SPEED: f32 = 1.2;
/// Model spin in degrees per second while A/D is held
const ROTATE_SPEED: f32 = 120.0;
/// Material change per second while an arrow key is held
const MATERIAL_SPEED: f32 = 0.6;

fn read_config() -> Result<ViewerConfig, trapezoid_raster::config::ConfigError> {
    if Path::new(CONFIG_PATH).exists() {
        load_config(CONFIG_PATH)
    } else {
        Ok(ViewerConfig::default())
    }
}

fn window_conf() -> Conf {
    let config = read_config().unwrap_or_default();
    Conf {
        window_title: format!("Trapezoid Viewer v{}", VERSION),
        window_width: (config.render.width as f32 * config.window_scale) as i32,
        window_height: (config.render.height as f32 * config.window_scale) as i32,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();
    log::debug!("logging initialized");
}

fn load_meshes(config: &ViewerConfig) -> Vec<Mesh> {
    let Some(path) = &config.mesh else {
        return vec![Mesh::cube(1.0), Mesh::plane(4.0, -1.0)];
    };
    match load_obj(path) {
        Ok(meshes) => meshes,
        Err(e) => {
            log::warn!("failed to load mesh {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn load_mipmap(config: &ViewerConfig) -> Option<Arc<MipMap>> {
    let path = config.texture.as_ref()?;
    match load_texture(path) {
        Ok(base) => Some(Arc::new(MipMap::new(base))),
        Err(e) => {
            log::warn!("failed to load texture {}: {}", path.display(), e);
            None
        }
    }
}

fn build_scene(config: &ViewerConfig) -> Scene {
    let render = &config.render;
    let aspect = render.width as f32 / render.height as f32;

    let mut scene = Scene::new();
    scene.set_view_matrix(raster::Mat4::translation(0.0, 0.0, config.camera_distance));
    match render.projection {
        ProjectionMethod::Perspective => scene.set_perspective(config.fov, aspect, config.near, config.far),
        ProjectionMethod::Orthographic => {
            let height = config.camera_distance * 2.0;
            scene.set_orthographic(height * aspect, height, config.far)
        }
    }

    let extent = config.light_extent;
    scene.set_light(
        config.light_direction,
        extent.x,
        extent.y,
        extent.z,
        config.light_intensity,
        config.light_color,
    );

    let texture = load_mipmap(config);
    for mesh in load_meshes(config) {
        let mesh = match &texture {
            Some(texture) => mesh.with_texture(Arc::clone(texture)),
            None => mesh,
        };
        scene.add_mesh(mesh);
    }
    log::info!(
        "scene ready: {} mesh(es), {} triangle(s)",
        scene.meshes().len(),
        scene.triangle_count()
    );
    scene
}

fn handle_input(scene: &mut Scene, pipeline: &mut Pipeline, config: &ViewerConfig, dt: f32) {
    let step = MOVE_SPEED * dt;
    if is_key_down(KeyCode::W) {
        scene.camera_translate(0.0, -step);
    }
    if is_key_down(KeyCode::S) {
        scene.camera_translate(0.0, step);
    }
    if is_key_down(KeyCode::E) {
        scene.camera_translate(-step, 0.0);
    }
    if is_key_down(KeyCode::Q) {
        scene.camera_translate(step, 0.0);
    }

    if is_key_down(KeyCode::A) {
        scene.model_rotate(ROTATE_SPEED * dt);
    } else if is_key_down(KeyCode::D) {
        scene.model_rotate(-ROTATE_SPEED * dt);
    } else {
        scene.model_rotate(config.auto_rotate * dt);
    }

    let render = pipeline.config_mut();
    let delta = MATERIAL_SPEED * dt;
    if is_key_down(KeyCode::Left) {
        render.material.roughness -= delta;
    }
    if is_key_down(KeyCode::Right) {
        render.material.roughness += delta;
    }
    if is_key_down(KeyCode::Up) {
        render.material.metallic += delta;
    }
    if is_key_down(KeyCode::Down) {
        render.material.metallic -= delta;
    }
    render.material.roughness = render.material.roughness.clamp(0.0, 1.0);
    render.material.metallic = render.material.metallic.clamp(0.0, 1.0);

    if is_key_pressed(KeyCode::Tab) {
        render.shadows = !render.shadows;
        log::info!("shadows {}", if render.shadows { "on" } else { "off" });
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    init_logging();

    let config = match read_config() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring {}: {}", CONFIG_PATH, e);
            ViewerConfig::default()
        }
    };

    let mut pipeline = match Pipeline::new(config.render.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("cannot start renderer: {}", e);
            return;
        }
    };
    let mut scene = build_scene(&config);

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        handle_input(&mut scene, &mut pipeline, &config, get_frame_time());

        pipeline.render(&scene);

        let frame = pipeline.color_buffer();
        let texture = Texture2D::from_rgba8(frame.width() as u16, frame.height() as u16, &frame.to_rgba8());
        texture.set_filter(FilterMode::Nearest);

        clear_background(BLACK);
        draw_texture_ex(
            &texture,
            0.0,
            0.0,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(screen_width(), screen_height())),
                ..Default::default()
            },
        );

        let material = pipeline.config().material;
        draw_text(
            &format!(
                "Roughness: {:.2}  Metallic: {:.2}  FPS: {}",
                material.roughness,
                material.metallic,
                get_fps()
            ),
            10.0,
            22.0,
            20.0,
            WHITE,
        );

        next_frame().await;
    }
}
