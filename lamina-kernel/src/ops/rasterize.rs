//! Rasterization of 2-D shapes into a label image.

use lamina_api::{Shape, ShapeType};
use ndarray::{Array2, ArrayD, ArrayView2};

use crate::error::CanvasTooLarge;

const EPSILON: f64 = 1e-9;

/// Largest canvas, in pixels, that shapes may be painted onto.
pub const MAX_CANVAS_PIXELS: usize = 1 << 26;

/// Paint `shapes` onto a canvas of `floor(max vertex) + 1` pixels per axis.
///
/// Shape `i` is painted with label `i + 1`; later shapes cover earlier ones.
/// Pixel `(r, c)` is covered when the point `(r, c)` lies inside or on the
/// boundary of the shape. Only two-dimensional shapes can be painted.
pub fn rasterize(shapes: &[Shape]) -> Result<ArrayD<i64>, CanvasTooLarge> {
    let (rows, cols) = canvas_extent(shapes)?;
    let mut canvas = Array2::<i64>::zeros((rows, cols));
    for (index, shape) in shapes.iter().enumerate() {
        let label = index as i64 + 1;
        let vertices = shape.vertices.view();
        match shape.shape_type {
            ShapeType::Rectangle => paint_box(&mut canvas, vertices, label),
            ShapeType::Ellipse => paint_ellipse(&mut canvas, vertices, label),
            ShapeType::Polygon => paint_polygon(&mut canvas, vertices, label),
            ShapeType::Line | ShapeType::Path => paint_path(&mut canvas, vertices, label),
        }
    }
    Ok(canvas.into_dyn())
}

/// Canvas size for `shapes`, refused before allocation when it exceeds
/// [`MAX_CANVAS_PIXELS`].
fn canvas_extent(shapes: &[Shape]) -> Result<(usize, usize), CanvasTooLarge> {
    let mut extent = [0.0f64; 2];
    for shape in shapes {
        for row in shape.vertices.rows() {
            for (axis, &coord) in row.iter().take(2).enumerate() {
                if coord >= 0.0 {
                    extent[axis] = extent[axis].max(coord.floor() + 1.0);
                }
            }
        }
    }
    let [rows, cols] = extent;
    let limit = MAX_CANVAS_PIXELS as f64;
    if !(rows <= limit && cols <= limit && rows * cols <= limit) {
        return Err(CanvasTooLarge {
            rows,
            cols,
            limit: MAX_CANVAS_PIXELS,
        });
    }
    Ok((rows as usize, cols as usize))
}

/// Inclusive pixel bounds of the vertices, clipped to the canvas.
fn pixel_bounds(
    canvas: &Array2<i64>,
    vertices: ArrayView2<'_, f64>,
) -> Option<[(usize, usize); 2]> {
    let mut bounds = [(0usize, 0usize); 2];
    for (axis, bound) in bounds.iter_mut().enumerate() {
        let column = vertices.column(axis);
        let lo = column.iter().copied().fold(f64::INFINITY, f64::min).ceil().max(0.0);
        let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max).floor();
        let limit = canvas.shape()[axis];
        if hi < lo || limit == 0 {
            return None;
        }
        *bound = (lo as usize, (hi as usize).min(limit - 1));
        if bound.0 > bound.1 {
            return None;
        }
    }
    Some(bounds)
}

fn paint_box(canvas: &mut Array2<i64>, vertices: ArrayView2<'_, f64>, label: i64) {
    let Some([(r0, r1), (c0, c1)]) = pixel_bounds(canvas, vertices) else {
        return;
    };
    for r in r0..=r1 {
        for c in c0..=c1 {
            canvas[[r, c]] = label;
        }
    }
}

fn paint_ellipse(canvas: &mut Array2<i64>, vertices: ArrayView2<'_, f64>, label: i64) {
    let Some([(r0, r1), (c0, c1)]) = pixel_bounds(canvas, vertices) else {
        return;
    };
    let span = |axis: usize| {
        let column = vertices.column(axis);
        let lo = column.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        ((lo + hi) / 2.0, (hi - lo) / 2.0)
    };
    let (center_r, radius_r) = span(0);
    let (center_c, radius_c) = span(1);
    let offset = |value: f64, center: f64, radius: f64| {
        if radius < EPSILON {
            if (value - center).abs() < EPSILON { 0.0 } else { f64::INFINITY }
        } else {
            (value - center) / radius
        }
    };
    for r in r0..=r1 {
        for c in c0..=c1 {
            let dr = offset(r as f64, center_r, radius_r);
            let dc = offset(c as f64, center_c, radius_c);
            if dr * dr + dc * dc <= 1.0 + EPSILON {
                canvas[[r, c]] = label;
            }
        }
    }
}

fn paint_polygon(canvas: &mut Array2<i64>, vertices: ArrayView2<'_, f64>, label: i64) {
    let Some([(r0, r1), (c0, c1)]) = pixel_bounds(canvas, vertices) else {
        return;
    };
    let points: Vec<(f64, f64)> = vertices.rows().into_iter().map(|v| (v[0], v[1])).collect();
    for r in r0..=r1 {
        for c in c0..=c1 {
            if polygon_contains(&points, (r as f64, c as f64)) {
                canvas[[r, c]] = label;
            }
        }
    }
}

fn paint_path(canvas: &mut Array2<i64>, vertices: ArrayView2<'_, f64>, label: i64) {
    let points: Vec<(f64, f64)> = vertices.rows().into_iter().map(|v| (v[0], v[1])).collect();
    if let [single] = points.as_slice() {
        paint_point(canvas, *single, label);
    }
    let (rows, cols) = canvas.dim();
    for pair in points.windows(2) {
        let Some((start, end)) = clip_segment(pair[0], pair[1], rows, cols) else {
            continue;
        };
        let length = (end.0 - start.0).abs().max((end.1 - start.1).abs());
        let steps = length.ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let point = (
                start.0 + (end.0 - start.0) * t,
                start.1 + (end.1 - start.1) * t,
            );
            paint_point(canvas, point, label);
        }
    }
}

/// The part of segment `start..end` whose pixels land on a `rows x cols` canvas.
fn clip_segment(
    start: (f64, f64),
    end: (f64, f64),
    rows: usize,
    cols: usize,
) -> Option<((f64, f64), (f64, f64))> {
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    let delta = (end.0 - start.0, end.1 - start.1);
    for (from, step, size) in [(start.0, delta.0, rows), (start.1, delta.1, cols)] {
        let (lo, hi) = (-0.5, size as f64 - 0.5);
        if step.abs() < EPSILON {
            if from < lo || from > hi {
                return None;
            }
            continue;
        }
        let (a, b) = ((lo - from) / step, (hi - from) / step);
        t0 = t0.max(a.min(b));
        t1 = t1.min(a.max(b));
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| (start.0 + delta.0 * t, start.1 + delta.1 * t);
    Some((at(t0), at(t1)))
}

fn paint_point(canvas: &mut Array2<i64>, (r, c): (f64, f64), label: i64) {
    let (r, c) = (r.round(), c.round());
    if r < 0.0 || c < 0.0 {
        return;
    }
    if let Some(pixel) = canvas.get_mut([r as usize, c as usize]) {
        *pixel = label;
    }
}

/// Even-odd containment test that counts points on an edge as inside.
fn polygon_contains(points: &[(f64, f64)], (y, x): (f64, f64)) -> bool {
    let n = points.len();
    let mut inside = false;
    for i in 0..n {
        let (y0, x0) = points[i];
        let (y1, x1) = points[(i + 1) % n];
        if on_segment((y0, x0), (y1, x1), (y, x)) {
            return true;
        }
        if (y0 > y) != (y1 > y) {
            let crossing = x0 + (y - y0) * (x1 - x0) / (y1 - y0);
            if x < crossing {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > EPSILON {
        return false;
    }
    p.0 >= a.0.min(b.0) - EPSILON
        && p.0 <= a.0.max(b.0) + EPSILON
        && p.1 >= a.1.min(b.1) - EPSILON
        && p.1 <= a.1.max(b.1) + EPSILON
}
