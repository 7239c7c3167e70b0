//! Interpolated vertices, scanlines and flat-top/flat-bottom decomposition

use std::ops::{Add, AddAssign, Mul, RangeInclusive, Sub};

use super::math::{Vec2, Vec3};
use super::types::Color;

const EPSILON: f32 = 1e-6;

/// Pipeline vertex carrying perspective-correction state.
///
/// After [`TVertex::init_rhw`] every interpolated attribute is stored
/// pre-multiplied by `rhw`; dividing by the interpolated `rhw` recovers the
/// true value at any point along an edge or span.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TVertex {
    /// Screen-space x, y and depth
    pub point: Vec3,
    pub world_pos: Vec3,
    pub color: Color,
    pub uv: Vec2,
    pub normal: Vec3,
    /// 1 / clip-space w
    pub rhw: f32,
}

impl TVertex {
    pub fn new(point: Vec3, world_pos: Vec3, color: Color, uv: Vec2, normal: Vec3) -> Self {
        Self {
            point,
            world_pos,
            color,
            uv,
            normal,
            rhw: 1.0,
        }
    }

    pub fn init_rhw(&mut self, w: f32) {
        self.rhw = 1.0 / w;
        self.world_pos = self.world_pos * self.rhw;
        self.color = self.color * self.rhw;
        self.uv = self.uv * self.rhw;
        self.normal = self.normal * self.rhw;
    }

    /// Undo the rhw pre-multiplication (scales every field by `1 / rhw`)
    pub fn recover(self) -> TVertex {
        self * (1.0 / self.rhw)
    }

    pub fn lerp(a: &TVertex, b: &TVertex, t: f32) -> TVertex {
        *a + (*b - *a) * t
    }
}

impl Add for TVertex {
    type Output = TVertex;
    fn add(self, o: TVertex) -> TVertex {
        TVertex {
            point: self.point + o.point,
            world_pos: self.world_pos + o.world_pos,
            color: self.color + o.color,
            uv: self.uv + o.uv,
            normal: self.normal + o.normal,
            rhw: self.rhw + o.rhw,
        }
    }
}

impl AddAssign for TVertex {
    fn add_assign(&mut self, o: TVertex) {
        *self = *self + o;
    }
}

impl Sub for TVertex {
    type Output = TVertex;
    fn sub(self, o: TVertex) -> TVertex {
        TVertex {
            point: self.point - o.point,
            world_pos: self.world_pos - o.world_pos,
            color: self.color - o.color,
            uv: self.uv - o.uv,
            normal: self.normal - o.normal,
            rhw: self.rhw - o.rhw,
        }
    }
}

impl Mul<f32> for TVertex {
    type Output = TVertex;
    fn mul(self, k: f32) -> TVertex {
        TVertex {
            point: self.point * k,
            world_pos: self.world_pos * k,
            color: self.color * k,
            uv: self.uv * k,
            normal: self.normal * k,
            rhw: self.rhw * k,
        }
    }
}

/// One horizontal span of a trapezoid
#[derive(Debug, Clone, Copy)]
pub struct Scanline {
    /// Interpolated vertex at the left edge
    pub v0: TVertex,
    /// Per-pixel increment
    pub step: TVertex,
    pub x0: i32,
    pub x1: i32,
    pub y: i32,
    /// rhw-weighted uv change per pixel along x (mip selection hint)
    pub dx: Vec2,
    /// rhw-weighted uv change per row (mip selection hint)
    pub dy: Vec2,
}

/// Classification of a decomposed triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleKind {
    None,
    FlatTop,
    FlatBottom,
    FlatTopBottom,
}

/// A screen-space triangle split into horizontal-edged halves.
///
/// Screen y grows downward. `FlatTop` has its horizontal edge
/// (`left`, `right`) at the larger y with the apex `bottom` at the smaller
/// y; `FlatBottom` has the horizontal edge at the smaller y and the apex
/// `top` at the larger y. `left.point.x <= right.point.x` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitTriangle {
    None,
    FlatTop { bottom: TVertex, left: TVertex, right: TVertex },
    FlatBottom { top: TVertex, left: TVertex, right: TVertex },
    FlatTopBottom { top: TVertex, bottom: TVertex, left: TVertex, right: TVertex },
}

impl SplitTriangle {
    pub fn kind(&self) -> TriangleKind {
        match self {
            SplitTriangle::None => TriangleKind::None,
            SplitTriangle::FlatTop { .. } => TriangleKind::FlatTop,
            SplitTriangle::FlatBottom { .. } => TriangleKind::FlatBottom,
            SplitTriangle::FlatTopBottom { .. } => TriangleKind::FlatTopBottom,
        }
    }

    /// The halves to scan-convert, upper (smaller y) first
    pub fn trapezoids(&self) -> impl Iterator<Item = Trapezoid> {
        let (upper, lower) = match *self {
            SplitTriangle::None => (None, None),
            SplitTriangle::FlatTop { bottom, left, right } => {
                (Some(Trapezoid::flat_top(bottom, left, right)), None)
            }
            SplitTriangle::FlatBottom { top, left, right } => {
                (None, Some(Trapezoid::flat_bottom(top, left, right)))
            }
            SplitTriangle::FlatTopBottom { top, bottom, left, right } => (
                Some(Trapezoid::flat_top(bottom, left, right)),
                Some(Trapezoid::flat_bottom(top, left, right)),
            ),
        };
        upper.into_iter().chain(lower)
    }

    /// All scanlines of every half, in row order
    pub fn scanlines(&self) -> impl Iterator<Item = Scanline> {
        self.trapezoids().flat_map(|t| t.scanlines())
    }

    /// Scanlines restricted to the rows `0..height` of a target
    pub fn scanlines_within(&self, height: usize) -> impl Iterator<Item = Scanline> {
        self.trapezoids().flat_map(move |t| t.scanlines_within(height))
    }
}

/// Sort by y and split into flat-top / flat-bottom halves
pub fn split_triangle(a: &TVertex, b: &TVertex, c: &TVertex) -> SplitTriangle {
    let (mut v0, mut v1, mut v2) = (a, b, c);
    if v0.point.y > v1.point.y {
        std::mem::swap(&mut v0, &mut v1);
    }
    if v0.point.y > v2.point.y {
        std::mem::swap(&mut v0, &mut v2);
    }
    if v1.point.y > v2.point.y {
        std::mem::swap(&mut v1, &mut v2);
    }

    let same_y = |p: &TVertex, q: &TVertex| (p.point.y - q.point.y).abs() < EPSILON;
    let same_x = |p: &TVertex, q: &TVertex| (p.point.x - q.point.x).abs() < EPSILON;

    if (same_y(v0, v1) && same_y(v1, v2)) || (same_x(v0, v1) && same_x(v1, v2)) {
        return SplitTriangle::None;
    }

    if same_y(v0, v1) {
        if v0.point.x > v1.point.x {
            std::mem::swap(&mut v0, &mut v1);
        }
        return SplitTriangle::FlatBottom {
            top: *v2,
            left: *v0,
            right: *v1,
        };
    }

    if same_y(v1, v2) {
        if v1.point.x > v2.point.x {
            std::mem::swap(&mut v1, &mut v2);
        }
        return SplitTriangle::FlatTop {
            bottom: *v0,
            left: *v1,
            right: *v2,
        };
    }

    let factor = (v1.point.y - v0.point.y) / (v2.point.y - v0.point.y);
    let split = TVertex::lerp(v0, v2, factor);
    let (left, right) = if split.point.x <= v1.point.x {
        (split, *v1)
    } else {
        (*v1, split)
    };

    SplitTriangle::FlatTopBottom {
        top: *v2,
        bottom: *v0,
        left,
        right,
    }
}

/// Region between two edges, spanning the rows `(y_top, y_bottom]`
#[derive(Debug, Clone, Copy)]
pub struct Trapezoid {
    top_left: TVertex,
    top_right: TVertex,
    bottom_left: TVertex,
    bottom_right: TVertex,
}

impl Trapezoid {
    fn flat_top(apex: TVertex, left: TVertex, right: TVertex) -> Self {
        Self {
            top_left: apex,
            top_right: apex,
            bottom_left: left,
            bottom_right: right,
        }
    }

    fn flat_bottom(apex: TVertex, left: TVertex, right: TVertex) -> Self {
        Self {
            top_left: left,
            top_right: right,
            bottom_left: apex,
            bottom_right: apex,
        }
    }

    pub fn y_top(&self) -> f32 {
        self.top_left.point.y
    }

    pub fn y_bottom(&self) -> f32 {
        self.bottom_left.point.y
    }

    /// Integer rows covered by this half
    pub fn rows(&self) -> RangeInclusive<i32> {
        ((self.y_top().floor() + 1.0) as i32)..=(self.y_bottom().floor() as i32)
    }

    /// Covered rows intersected with `0..height`
    pub fn rows_within(&self, height: usize) -> RangeInclusive<i32> {
        let first = (self.y_top().floor() + 1.0).max(0.0);
        let last = self.y_bottom().floor().min(height as f32 - 1.0);
        (first as i32)..=(last as i32)
    }

    /// Left and right edge vertices interpolated at row `y`
    pub fn edges_at(&self, y: f32) -> (TVertex, TVertex) {
        let height = self.y_bottom() - self.y_top();
        let factor = if height.abs() < EPSILON { 1.0 } else { (y - self.y_top()) / height };
        (
            TVertex::lerp(&self.top_left, &self.bottom_left, factor),
            TVertex::lerp(&self.top_right, &self.bottom_right, factor),
        )
    }

    /// Texture derivative hints measured across the middle of the half
    pub fn derivatives(&self) -> (Vec2, Vec2) {
        let median_left = TVertex::lerp(&self.top_left, &self.bottom_left, 0.5);
        let median_right = TVertex::lerp(&self.top_right, &self.bottom_right, 0.5);
        let span = (median_right.point.x - median_left.point.x).abs() + 1.0;
        let dx = (median_right.uv - median_left.uv) / span;

        let row_count = (self.y_bottom().floor() - self.y_top().floor() - 1.0).abs() + 1.0;
        let top_mid = (self.top_left.uv + self.top_right.uv) * 0.5;
        let bottom_mid = (self.bottom_left.uv + self.bottom_right.uv) * 0.5;
        let dy = (bottom_mid - top_mid) / row_count;
        (dx, dy)
    }

    pub fn scanline(&self, y: i32, dx: Vec2, dy: Vec2) -> Scanline {
        let (left, right) = self.edges_at(y as f32);
        let width = (right.point.x - left.point.x).max(1.0);
        Scanline {
            v0: left,
            step: (right - left) * (1.0 / width),
            x0: left.point.x.floor() as i32,
            x1: right.point.x.floor() as i32,
            y,
            dx,
            dy,
        }
    }

    pub fn scanlines(self) -> impl Iterator<Item = Scanline> {
        let (dx, dy) = self.derivatives();
        self.rows().map(move |y| self.scanline(y, dx, dy))
    }

    pub fn scanlines_within(self, height: usize) -> impl Iterator<Item = Scanline> {
        let (dx, dy) = self.derivatives();
        self.rows_within(height).map(move |y| self.scanline(y, dx, dy))
    }
}
