//! Physically based BRDF used by the color pass

use std::f32::consts::FRAC_1_PI;

use super::math::Vec3;
use super::types::{Color, Material};

fn pow5(x: f32) -> f32 {
    let x2 = x * x;
    x2 * x2 * x
}

// Walter et al. 2007, "Microfacet Models for Refraction through Rough Surfaces"
fn d_ggx(linear_roughness: f32, n_dot_h: f32) -> f32 {
    let one_minus_noh2 = 1.0 - n_dot_h * n_dot_h;
    let a = n_dot_h * linear_roughness;
    let k = linear_roughness / (one_minus_noh2 + a * a);
    k * k * FRAC_1_PI
}

// Heitz 2014, "Understanding the Masking-Shadowing Function in Microfacet-Based BRDFs"
fn v_smith_ggx_correlated(linear_roughness: f32, n_dot_v: f32, n_dot_l: f32) -> f32 {
    let a2 = linear_roughness * linear_roughness;
    let ggx_v = n_dot_l * ((n_dot_v - a2 * n_dot_v) * n_dot_v + a2).sqrt();
    let ggx_l = n_dot_v * ((n_dot_l - a2 * n_dot_l) * n_dot_l + a2).sqrt();
    let denom = ggx_v + ggx_l;
    if denom <= 0.0 { 0.0 } else { 0.5 / denom }
}

// Schlick 1994, "An Inexpensive BRDF Model for Physically-Based Rendering"
fn f_schlick(f0: Vec3, v_dot_h: f32) -> Vec3 {
    f0 + (Vec3::ONE - f0) * pow5(1.0 - v_dot_h)
}

fn f_schlick_scalar(f0: f32, f90: f32, v_dot_h: f32) -> f32 {
    f0 + (f90 - f0) * pow5(1.0 - v_dot_h)
}

// Burley 2012, "Physically-Based Shading at Disney"
fn fd_burley(linear_roughness: f32, n_dot_v: f32, n_dot_l: f32, l_dot_h: f32) -> f32 {
    let f90 = 0.5 + 2.0 * linear_roughness * l_dot_h * l_dot_h;
    let light_scatter = f_schlick_scalar(1.0, f90, n_dot_l);
    let view_scatter = f_schlick_scalar(1.0, f90, n_dot_v);
    light_scatter * view_scatter * FRAC_1_PI
}

/// Specular (GGX / Smith / Schlick) plus Burley diffuse, `Fd + Fr`.
///
/// `n`, `l` and `v` must be unit vectors; `l` points toward the light and
/// `v` toward the eye. The result is not yet scaled by light or `N.L`.
pub fn physically_based(base: Color, material: Material, n: Vec3, l: Vec3, v: Vec3, n_dot_l: f32) -> Color {
    let base = base.to_vec3();
    let roughness = material.roughness.clamp(0.0, 1.0);
    let metallic = material.metallic.clamp(0.0, 1.0);

    let h = (v + l).normalize();
    let n_dot_v = n.dot(v).abs() + 1e-5;
    let n_dot_h = n.dot(h).clamp(0.0, 1.0);
    let l_dot_h = l.dot(h).clamp(0.0, 1.0);

    let linear_roughness = roughness * roughness;
    let diffuse_color = base * (1.0 - metallic);
    let f0 = base * metallic + Vec3::ONE * (0.04 * (1.0 - metallic));

    // specular BRDF
    let d = d_ggx(linear_roughness, n_dot_h);
    let vis = v_smith_ggx_correlated(linear_roughness, n_dot_v, n_dot_l);
    let f = f_schlick(f0, l_dot_h);
    let fr = f * (d * vis);

    // diffuse BRDF
    let fd = diffuse_color * fd_burley(linear_roughness, n_dot_v, n_dot_l, l_dot_h);

    let c = fd + fr;
    if c.is_finite() { Color::from_vec3(c) } else { Color::BLACK }
}
