use std::f64::consts::FRAC_PI_2;

use serde::Deserialize;

use super::canvas::{Canvas, Point, Stroke};
use super::color::{self, ASPHALT, BACKGROUND, BLACK, WHITE};

/// Segments per semicircular end.
const ARC_SEGMENTS: usize = 64;
const WALL_LINE_WIDTH: f64 = 2.0;
const MARKING_WIDTH: f64 = 2.0;
/// Edge lines sit this far inside each boundary.
const EDGE_INSET: f64 = 5.0;
const LANE_DASH: (f64, f64) = (15.0, 15.0);
const LANE_ALPHA: f64 = 0.5;
const FINISH_COLUMNS: usize = 3;
const FINISH_ROWS: usize = 10;
const FINISH_CELL_W: f64 = 6.0;
const FINISH_CELL_H: f64 = 10.0;

/// Oval geometry in scene units.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackGeometry {
    pub wall_height: u32,
    pub car_height: u32,
    pub center_left: (f64, f64),
    pub center_right: (f64, f64),
    pub outer_radius: f64,
    pub inner_radius: f64,
    /// Dashed centerline radius.
    pub lane_radius: f64,
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self {
            wall_height: 12,
            car_height: 6,
            center_left: (200.0, 300.0),
            center_right: (600.0, 300.0),
            outer_radius: 200.0,
            inner_radius: 100.0,
            lane_radius: 150.0,
        }
    }
}

impl TrackGeometry {
    /// Closed stadium outline at `radius`, shifted vertically by `dy`.
    /// Right end runs top to bottom, left end bottom to top.
    pub fn stadium(&self, radius: f64, dy: f64) -> Vec<Point> {
        let mut pts = Vec::with_capacity(2 * (ARC_SEGMENTS + 1));
        arc(&mut pts, self.center_right, radius, dy, -FRAC_PI_2, FRAC_PI_2);
        arc(&mut pts, self.center_left, radius, dy, FRAC_PI_2, 3.0 * FRAC_PI_2);
        pts
    }

    /// Top-left corner of the checkered block on the top straight.
    pub fn finish_origin(&self) -> Point {
        let mid_x = (self.center_left.0 + self.center_right.0) / 2.0;
        let top = self.center_right.1 - self.outer_radius;
        (mid_x - 1.5 * FINISH_CELL_W, top)
    }
}

fn arc(pts: &mut Vec<Point>, center: Point, radius: f64, dy: f64, from: f64, to: f64) {
    for i in 0..=ARC_SEGMENTS {
        let a = from + (to - from) * i as f64 / ARC_SEGMENTS as f64;
        pts.push((center.0 + radius * a.cos(), center.1 + dy + radius * a.sin()));
    }
}

/// Drivable surface.
pub fn draw_fill(canvas: &mut Canvas, geom: &TrackGeometry) {
    canvas.fill_polygon(&geom.stadium(geom.outer_radius, 0.0), ASPHALT, 1.0);
}

/// Extruded walls, bottom layer first.
pub fn draw_walls(canvas: &mut Canvas, geom: &TrackGeometry) {
    let stroke = Stroke::solid(WALL_LINE_WIDTH);
    for h in 0..geom.wall_height {
        let shade = color::wall_shade(h, geom.wall_height);
        let dy = -(h as f64);
        canvas.stroke_polyline(&geom.stadium(geom.outer_radius, dy), true, stroke, shade, 1.0);
        canvas.stroke_polyline(&geom.stadium(geom.inner_radius, dy), true, stroke, shade, 1.0);
    }
}

/// Dashed centerline and the two solid edge lines.
pub fn draw_markings(canvas: &mut Canvas, geom: &TrackGeometry) {
    let (on, off) = LANE_DASH;
    canvas.stroke_polyline(
        &geom.stadium(geom.lane_radius, 0.0),
        true,
        Stroke::dashed(MARKING_WIDTH, on, off),
        WHITE,
        LANE_ALPHA,
    );
    let solid = Stroke::solid(MARKING_WIDTH);
    canvas.stroke_polyline(&geom.stadium(geom.outer_radius - EDGE_INSET, 0.0), true, solid, WHITE, 1.0);
    canvas.stroke_polyline(&geom.stadium(geom.inner_radius + EDGE_INSET, 0.0), true, solid, WHITE, 1.0);
}

/// Infield filled back to the page background.
pub fn draw_cutout(canvas: &mut Canvas, geom: &TrackGeometry) {
    canvas.fill_polygon(&geom.stadium(geom.inner_radius, 0.0), BACKGROUND, 1.0);
}

pub fn draw_finish_line(canvas: &mut Canvas, geom: &TrackGeometry) {
    let (x0, y0) = geom.finish_origin();
    for col in 0..FINISH_COLUMNS {
        for row in 0..FINISH_ROWS {
            let x = x0 + col as f64 * FINISH_CELL_W;
            let y = y0 + row as f64 * FINISH_CELL_H;
            let c = if (row + col) % 2 == 0 { WHITE } else { BLACK };
            canvas.fill_rect(x, y, FINISH_CELL_W, FINISH_CELL_H, c, 1.0);
        }
    }
}

/// Whole track in paint order.
#[cfg(test)]
pub fn draw(canvas: &mut Canvas, geom: &TrackGeometry) {
    draw_fill(canvas, geom);
    draw_walls(canvas, geom);
    draw_markings(canvas, geom);
    draw_cutout(canvas, geom);
    draw_finish_line(canvas, geom);
}
