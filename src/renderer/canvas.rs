//! Anti-aliased vector primitives over the RGBA frame buffer.
//!
//! Shapes are given in scene units and mapped to pixels through the current
//! [`Transform`]. All drawing is clipped to the canvas clip rectangle.

/// Scene-space point.
pub type Point = (f64, f64);

/// Vertical subsamples per pixel row for polygon coverage.
const SUBSAMPLES: usize = 4;

/// 2D affine transform, column-major like a canvas context:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    /// Uniform scale followed by a pixel offset.
    pub fn scale_translate(scale: f64, tx: f64, ty: f64) -> Self {
        Transform { a: scale, b: 0.0, c: 0.0, d: scale, e: tx, f: ty }
    }

    /// Translate in the current (local) frame.
    pub fn translate(self, tx: f64, ty: f64) -> Self {
        Transform {
            e: self.a * tx + self.c * ty + self.e,
            f: self.b * tx + self.d * ty + self.f,
            ..self
        }
    }

    /// Rotate the local frame by `angle` radians.
    pub fn rotate(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Transform {
            a: self.a * cos + self.c * sin,
            b: self.b * cos + self.d * sin,
            c: self.c * cos - self.a * sin,
            d: self.d * cos - self.b * sin,
            ..self
        }
    }

    pub fn scale(self, s: f64) -> Self {
        Transform { a: self.a * s, b: self.b * s, c: self.c * s, d: self.d * s, ..self }
    }

    pub fn apply(&self, p: Point) -> Point {
        (self.a * p.0 + self.c * p.1 + self.e, self.b * p.0 + self.d * p.1 + self.f)
    }

    /// Length scale of the transform (geometric mean of the axes).
    pub fn scale_factor(&self) -> f64 {
        (self.a * self.d - self.b * self.c).abs().sqrt()
    }
}

/// Pixel rectangle, half-open.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clip {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Clip {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Clip { x0: x, y0: y, x1: x + w, y1: y + h }
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    /// Intersect with a floating-point box, rounding outward.
    fn bound(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<Clip> {
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }
        let x0 = (min_x.floor().max(self.x0 as f64) as usize).min(self.x1);
        let y0 = (min_y.floor().max(self.y0 as f64) as usize).min(self.y1);
        let x1 = (max_x.ceil().max(0.0) as usize).min(self.x1);
        let y1 = (max_y.ceil().max(0.0) as usize).min(self.y1);
        if x1 <= x0 || y1 <= y0 {
            None
        } else {
            Some(Clip { x0, y0, x1, y1 })
        }
    }
}

/// Stroke parameters in scene units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub width: f64,
    /// `(on, off)` lengths. Dashes get butt caps, solid strokes round ones.
    pub dash: Option<(f64, f64)>,
}

impl Stroke {
    pub fn solid(width: f64) -> Self {
        Stroke { width, dash: None }
    }

    pub fn dashed(width: f64, on: f64, off: f64) -> Self {
        Stroke { width, dash: Some((on, off)) }
    }
}

// Source-over: dst = dst * (1 - a) + src * a
#[inline]
pub(crate) fn blend_over(buf: &mut [u8], off: usize, color: [u8; 3], alpha: f64) {
    if off + 3 >= buf.len() || alpha <= 0.0 {
        return;
    }
    let a = alpha.min(1.0);
    for i in 0..3 {
        let d = buf[off + i] as f64;
        buf[off + i] = (d + (color[i] as f64 - d) * a).round() as u8;
    }
    buf[off + 3] = 255;
}

// Screen blend: result = 1 - (1-bg)(1-fg*alpha) -- always brightens
#[inline]
fn screen_blend(buf: &mut [u8], off: usize, color: [u8; 3], alpha: f64) {
    if off + 3 >= buf.len() {
        return;
    }
    for i in 0..3 {
        let b = buf[off + i] as f64;
        let f = (color[i] as f64 * alpha).min(255.0);
        buf[off + i] = (b + f - b * f / 255.0).min(255.0) as u8;
    }
}

pub struct Canvas<'a> {
    buf: &'a mut [u8],
    stride: usize,
    clip: Clip,
    pub transform: Transform,
    mask: Vec<f32>,
    row: Vec<f32>,
}

impl<'a> Canvas<'a> {
    pub fn new(buf: &'a mut [u8], stride: usize, clip: Clip, transform: Transform) -> Self {
        Self { buf, stride, clip, transform, mask: Vec::new(), row: Vec::new() }
    }

    /// Fill the whole clip rectangle with an opaque color.
    pub fn clear(&mut self, color: [u8; 3]) {
        for y in self.clip.y0..self.clip.y1 {
            for x in self.clip.x0..self.clip.x1 {
                let off = (y * self.stride + x) * 4;
                if off + 3 < self.buf.len() {
                    self.buf[off] = color[0];
                    self.buf[off + 1] = color[1];
                    self.buf[off + 2] = color[2];
                    self.buf[off + 3] = 255;
                }
            }
        }
    }

    /// Axis-aligned rectangle in local coordinates.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: [u8; 3], alpha: f64) {
        self.fill_polygon(&[(x, y), (x + w, y), (x + w, y + h), (x, y + h)], color, alpha);
    }

    /// Even-odd scanline fill with vertical supersampling and exact
    /// horizontal span coverage.
    pub fn fill_polygon(&mut self, points: &[Point], color: [u8; 3], alpha: f64) {
        if points.len() < 3 {
            return;
        }
        let pts: Vec<Point> = points.iter().map(|&p| self.transform.apply(p)).collect();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(x, y) in &pts {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let Some(b) = self.clip.bound(min_x, min_y, max_x, max_y) else {
            return;
        };

        let width = b.width();
        self.row.clear();
        self.row.resize(width, 0.0);
        let weight = 1.0 / SUBSAMPLES as f64;
        let mut crossings: Vec<f64> = Vec::with_capacity(8);

        for py in b.y0..b.y1 {
            let mut lo = width;
            let mut hi = 0;
            for s in 0..SUBSAMPLES {
                let ys = py as f64 + (s as f64 + 0.5) * weight;
                crossings.clear();
                for i in 0..pts.len() {
                    let (p, q) = (pts[i], pts[(i + 1) % pts.len()]);
                    if (p.1 <= ys && ys < q.1) || (q.1 <= ys && ys < p.1) {
                        crossings.push(p.0 + (ys - p.1) * (q.0 - p.0) / (q.1 - p.1));
                    }
                }
                crossings.sort_by(f64::total_cmp);
                for pair in crossings.chunks_exact(2) {
                    let xa = pair[0].max(b.x0 as f64);
                    let xb = pair[1].min(b.x1 as f64);
                    if xb <= xa {
                        continue;
                    }
                    let ia = xa.floor() as usize;
                    let ib = (xb.ceil() as usize).min(b.x1);
                    for px in ia..ib {
                        let l = (px as f64).max(xa);
                        let r = ((px + 1) as f64).min(xb);
                        self.row[px - b.x0] += ((r - l) * weight) as f32;
                    }
                    lo = lo.min(ia - b.x0);
                    hi = hi.max(ib - b.x0);
                }
            }
            for i in lo..hi {
                let cov = self.row[i].min(1.0) as f64;
                if cov > 0.0 {
                    let off = (py * self.stride + b.x0 + i) * 4;
                    blend_over(self.buf, off, color, alpha * cov);
                }
                self.row[i] = 0.0;
            }
        }
    }

    /// Polyline stroke. Overlapping segments of one stroke never double-blend.
    pub fn stroke_polyline(&mut self, points: &[Point], closed: bool, stroke: Stroke, color: [u8; 3], alpha: f64) {
        if points.len() < 2 {
            return;
        }
        let mut pts: Vec<Point> = points.iter().map(|&p| self.transform.apply(p)).collect();
        if closed {
            pts.push(pts[0]);
        }
        let scale = self.transform.scale_factor();
        let hw = stroke.width * scale / 2.0;
        let segments: Vec<(Point, Point)> = match stroke.dash {
            Some((on, off)) if on > 0.0 => dash_segments(&pts, on * scale, off.max(0.0) * scale),
            _ => pts.windows(2).map(|w| (w[0], w[1])).collect(),
        };
        let round = stroke.dash.is_none();
        let Some(b) = self.segments_bound(&segments, hw) else {
            return;
        };
        self.reset_mask(&b);
        for &(p, q) in &segments {
            cover_segment(&mut self.mask, &b, p, q, hw, round, |_| 1.0);
        }
        self.composite_mask(&b, color, alpha);
    }

    /// Straight line whose opacity ramps linearly from `alpha_start` at `from`
    /// to `alpha_end` at `to`.
    pub fn stroke_gradient(&mut self, from: Point, to: Point, width: f64, color: [u8; 3], alpha_start: f64, alpha_end: f64) {
        let p = self.transform.apply(from);
        let q = self.transform.apply(to);
        let hw = width * self.transform.scale_factor() / 2.0;
        let segments = [(p, q)];
        let Some(b) = self.segments_bound(&segments, hw) else {
            return;
        };
        self.reset_mask(&b);
        cover_segment(&mut self.mask, &b, p, q, hw, false, |t| alpha_start + (alpha_end - alpha_start) * t);
        self.composite_mask(&b, color, 1.0);
    }

    pub fn fill_circle(&mut self, center: Point, radius: f64, color: [u8; 3], alpha: f64) {
        let (cx, cy) = self.transform.apply(center);
        let r = radius * self.transform.scale_factor();
        let Some(b) = self.clip.bound(cx - r - 1.0, cy - r - 1.0, cx + r + 1.0, cy + r + 1.0) else {
            return;
        };
        for py in b.y0..b.y1 {
            for px in b.x0..b.x1 {
                let d = ((px as f64 + 0.5 - cx).powi(2) + (py as f64 + 0.5 - cy).powi(2)).sqrt();
                let cov = (r + 0.5 - d).clamp(0.0, 1.0);
                if cov > 0.0 {
                    blend_over(self.buf, (py * self.stride + px) * 4, color, alpha * cov);
                }
            }
        }
    }

    /// Ring centered on the circle of `radius`.
    pub fn stroke_circle(&mut self, center: Point, radius: f64, width: f64, color: [u8; 3], alpha: f64) {
        let (cx, cy) = self.transform.apply(center);
        let scale = self.transform.scale_factor();
        let r = radius * scale;
        let hw = width * scale / 2.0;
        let reach = r + hw + 1.0;
        let Some(b) = self.clip.bound(cx - reach, cy - reach, cx + reach, cy + reach) else {
            return;
        };
        for py in b.y0..b.y1 {
            for px in b.x0..b.x1 {
                let d = ((px as f64 + 0.5 - cx).powi(2) + (py as f64 + 0.5 - cy).powi(2)).sqrt();
                let cov = (hw + 0.5 - (d - r).abs()).clamp(0.0, 1.0);
                if cov > 0.0 {
                    blend_over(self.buf, (py * self.stride + px) * 4, color, alpha * cov);
                }
            }
        }
    }

    /// Soft radial halo, screen-blended so it only ever brightens.
    pub fn glow(&mut self, center: Point, radius: f64, color: [u8; 3], strength: f64) {
        let (cx, cy) = self.transform.apply(center);
        let r = radius * self.transform.scale_factor();
        if r <= 0.0 {
            return;
        }
        let Some(b) = self.clip.bound(cx - r, cy - r, cx + r, cy + r) else {
            return;
        };
        for py in b.y0..b.y1 {
            for px in b.x0..b.x1 {
                let d = ((px as f64 + 0.5 - cx).powi(2) + (py as f64 + 0.5 - cy).powi(2)).sqrt();
                if d < r {
                    let falloff = 1.0 - d / r;
                    screen_blend(self.buf, (py * self.stride + px) * 4, color, strength * falloff * falloff);
                }
            }
        }
    }

    fn segments_bound(&self, segments: &[(Point, Point)], hw: f64) -> Option<Clip> {
        let reach = hw + 1.0;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for &(p, q) in segments {
            min_x = min_x.min(p.0.min(q.0));
            min_y = min_y.min(p.1.min(q.1));
            max_x = max_x.max(p.0.max(q.0));
            max_y = max_y.max(p.1.max(q.1));
        }
        if segments.is_empty() {
            return None;
        }
        self.clip.bound(min_x - reach, min_y - reach, max_x + reach, max_y + reach)
    }

    fn reset_mask(&mut self, b: &Clip) {
        self.mask.clear();
        self.mask.resize(b.width() * b.height(), 0.0);
    }

    fn composite_mask(&mut self, b: &Clip, color: [u8; 3], alpha: f64) {
        let w = b.width();
        for py in b.y0..b.y1 {
            for px in b.x0..b.x1 {
                let m = self.mask[(py - b.y0) * w + (px - b.x0)];
                if m > 0.0 {
                    blend_over(self.buf, (py * self.stride + px) * 4, color, alpha * m as f64);
                }
            }
        }
    }
}

/// Split a pixel-space polyline into the "on" pieces of a dash pattern.
fn dash_segments(pts: &[Point], on: f64, off: f64) -> Vec<(Point, Point)> {
    let mut out = Vec::new();
    let period = on + off;
    let mut phase = 0.0;
    for w in pts.windows(2) {
        let (p, q) = (w[0], w[1]);
        let len = ((q.0 - p.0).powi(2) + (q.1 - p.1).powi(2)).sqrt();
        if len == 0.0 {
            continue;
        }
        let mut t = 0.0;
        while t < len {
            let in_on = phase < on;
            let remaining = if in_on { on - phase } else { period - phase };
            let step = remaining.min(len - t);
            if in_on {
                let a = lerp(p, q, t / len);
                let b = lerp(p, q, (t + step) / len);
                out.push((a, b));
            }
            t += step;
            phase += step;
            if phase >= period {
                phase -= period;
            }
        }
    }
    out
}

fn lerp(p: Point, q: Point, t: f64) -> Point {
    (p.0 + (q.0 - p.0) * t, p.1 + (q.1 - p.1) * t)
}

/// x-range of pixel centers in row `yc` that may lie within `reach` of segment pq.
fn row_span(p: Point, q: Point, yc: f64, reach: f64) -> (f64, f64) {
    let dy = q.1 - p.1;
    if dy.abs() < 1e-9 {
        return (p.0.min(q.0) - reach, p.0.max(q.0) + reach);
    }
    let mut t0 = ((yc - reach - p.1) / dy).clamp(0.0, 1.0);
    let mut t1 = ((yc + reach - p.1) / dy).clamp(0.0, 1.0);
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    let xa = p.0 + (q.0 - p.0) * t0;
    let xb = p.0 + (q.0 - p.0) * t1;
    (xa.min(xb) - reach, xa.max(xb) + reach)
}

/// Max-accumulate the coverage of one thick segment into `mask`.
fn cover_segment(mask: &mut [f32], b: &Clip, p: Point, q: Point, hw: f64, round: bool, alpha_at: impl Fn(f64) -> f64) {
    let (dx, dy) = (q.0 - p.0, q.1 - p.1);
    let len2 = dx * dx + dy * dy;
    let len = len2.sqrt();
    if len == 0.0 && !round {
        return;
    }
    let reach = hw + 1.0;
    let w = b.width();
    let y_start = ((p.1.min(q.1) - reach).floor().max(b.y0 as f64) as usize).min(b.y1);
    let y_end = ((p.1.max(q.1) + reach).ceil().max(0.0) as usize).min(b.y1);
    for py in y_start..y_end {
        let yc = py as f64 + 0.5;
        let (xa, xb) = row_span(p, q, yc, reach);
        let x_start = (xa.floor().max(b.x0 as f64) as usize).min(b.x1);
        let x_end = (xb.ceil().max(0.0) as usize).min(b.x1);
        for px in x_start..x_end {
            let xc = px as f64 + 0.5;
            let t = if len2 > 0.0 { ((xc - p.0) * dx + (yc - p.1) * dy) / len2 } else { 0.0 };
            let tc = t.clamp(0.0, 1.0);
            let cov = if round {
                let (nx, ny) = (p.0 + dx * tc, p.1 + dy * tc);
                let d = ((xc - nx).powi(2) + (yc - ny).powi(2)).sqrt();
                (hw + 0.5 - d).clamp(0.0, 1.0)
            } else {
                let perp = ((xc - p.0) * dy - (yc - p.1) * dx).abs() / len;
                let outside = if t < 0.5 { -t * len } else { (t - 1.0) * len };
                (hw + 0.5 - perp).clamp(0.0, 1.0) * (0.5 - outside).clamp(0.0, 1.0)
            };
            if cov <= 0.0 {
                continue;
            }
            let v = (cov * alpha_at(tc)) as f32;
            let i = (py - b.y0) * w + (px - b.x0);
            if v > mask[i] {
                mask[i] = v;
            }
        }
    }
}
