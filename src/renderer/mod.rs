pub mod canvas;
pub mod color;
mod font;
mod panel;
pub mod track;
pub mod vehicle;

pub(crate) use font::{draw_text, draw_text_clipped, draw_text_sized, TextSize, FONT_HEIGHT, FONT_WIDTH};

use canvas::{Canvas, Clip, Stroke, Transform};
use crate::controls::Controls;
use crate::protocol::VehicleSnapshot;
use crate::state::{RenderState, Viewer};
use track::TrackGeometry;

/// Scene coordinate space the server positions cars in.
pub const SCENE_WIDTH: f64 = 800.0;
pub const SCENE_HEIGHT: f64 = 600.0;
/// Telemetry and controls column to the right of the scene.
pub const PANEL_WIDTH: usize = 220;
const MIN_DISPLAY_WIDTH: usize = 160;
const MIN_DISPLAY_HEIGHT: usize = 120;

const STATUS_PAD_TOP: usize = 3;
const STATUS_PAD_BOTTOM: usize = 2;
pub const STATUS_BAR_HEIGHT: usize = STATUS_PAD_TOP + FONT_HEIGHT + STATUS_PAD_BOTTOM;
const STATUS_PAD_LEFT: usize = 4;

const TRAIL_WIDTH: f64 = 1.0;
const TRAIL_ALPHA: f64 = 0.5;

/// Dynamic render layout computed from window pixel size.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub display_width: usize,
    pub display_height: usize,
    pub frame_width: usize,
    pub frame_height: usize,
}

impl RenderConfig {
    /// Compute layout to fit the given pixel dimensions. The scene area
    /// gets everything left of the panel; the status bar goes below.
    pub fn fit(pixel_width: usize, pixel_height: usize) -> Self {
        let display_width = pixel_width.saturating_sub(PANEL_WIDTH).max(MIN_DISPLAY_WIDTH);
        let display_height = pixel_height.max(MIN_DISPLAY_HEIGHT);
        Self {
            display_width,
            display_height,
            frame_width: display_width + PANEL_WIDTH,
            frame_height: display_height + STATUS_BAR_HEIGHT,
        }
    }

    /// Uniform scene-to-pixel scale, letterboxed and centered.
    pub fn scene_transform(&self) -> Transform {
        let s = (self.display_width as f64 / SCENE_WIDTH).min(self.display_height as f64 / SCENE_HEIGHT);
        let tx = (self.display_width as f64 - SCENE_WIDTH * s) / 2.0;
        let ty = (self.display_height as f64 - SCENE_HEIGHT * s) / 2.0;
        Transform::scale_translate(s, tx, ty)
    }

    pub fn scene_clip(&self) -> Clip {
        Clip::new(0, 0, self.display_width, self.display_height)
    }
}

/// Paint layers, composited strictly in declaration order every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Background,
    TrackFill,
    Walls,
    Markings,
    Cutout,
    FinishLine,
    Trails,
    /// Depth-sorted by `y`.
    Vehicles,
    Particles,
}

pub const LAYERS: [Layer; 9] = [
    Layer::Background,
    Layer::TrackFill,
    Layer::Walls,
    Layer::Markings,
    Layer::Cutout,
    Layer::FinishLine,
    Layer::Trails,
    Layer::Vehicles,
    Layer::Particles,
];

/// Painter's order: ascending `y`, so cars lower on screen draw on top.
/// Ties keep the server's order.
pub fn depth_order(cars: &[VehicleSnapshot]) -> Vec<&VehicleSnapshot> {
    let mut order: Vec<&VehicleSnapshot> = cars.iter().collect();
    order.sort_by(|a, b| a.y.total_cmp(&b.y));
    order
}

fn draw_layer(canvas: &mut Canvas, layer: Layer, viewer: &Viewer, geom: &TrackGeometry) {
    let cars = &viewer.render.cars;
    match layer {
        Layer::Background => canvas.clear(color::BACKGROUND),
        Layer::TrackFill => track::draw_fill(canvas, geom),
        Layer::Walls => track::draw_walls(canvas, geom),
        Layer::Markings => track::draw_markings(canvas, geom),
        Layer::Cutout => track::draw_cutout(canvas, geom),
        Layer::FinishLine => track::draw_finish_line(canvas, geom),
        Layer::Trails => {
            for car in cars {
                let trail = viewer.trails.get(car.id);
                if trail.len() < 2 {
                    continue;
                }
                let pts: Vec<_> = trail.iter().map(|p| (p.x, p.y)).collect();
                canvas.stroke_polyline(&pts, false, Stroke::solid(TRAIL_WIDTH), car.color, TRAIL_ALPHA);
            }
        }
        Layer::Vehicles => {
            for car in depth_order(cars) {
                vehicle::draw_vehicle(canvas, car, geom.car_height);
            }
        }
        Layer::Particles => {
            for p in viewer.particles.particles() {
                canvas.fill_circle((p.x, p.y), p.radius(), p.color, p.alpha());
            }
        }
    }
}

/// Render the scene and the side panel into `buf`, resizing it to the
/// frame. The status bar and confirmation dialog are drawn separately.
pub fn render_into(buf: &mut Vec<u8>, viewer: &Viewer, controls: &Controls, geom: &TrackGeometry, cfg: &RenderConfig) {
    let total = cfg.frame_width * cfg.frame_height * 4;
    buf.resize(total, 0);
    buf.fill(0);

    let mut canvas = Canvas::new(buf, cfg.frame_width, cfg.scene_clip(), cfg.scene_transform());
    for layer in LAYERS {
        draw_layer(&mut canvas, layer, viewer, geom);
    }
    drop(canvas);

    panel::render_panel(buf, cfg, viewer, controls);
}

/// Render to a new RGBA buffer (test convenience wrapper).
#[cfg(test)]
pub fn render(viewer: &Viewer, controls: &Controls, cfg: &RenderConfig) -> Vec<u8> {
    let mut buf = Vec::new();
    render_into(&mut buf, viewer, controls, &TrackGeometry::default(), cfg);
    buf
}

/// One-line status bar text.
pub fn format_status(state: &RenderState, speed: &str, fps: u32) -> String {
    let steps = match state.steps {
        Some(s) => s.to_string(),
        None => "-".to_string(),
    };
    let mode = if state.paused { "paused" } else { "running" };
    let link = if state.connected { "connected" } else { "offline" };
    format!(
        "gen {} | alive {} | steps {} | {} | {} | {} | {} fps",
        state.generation, state.alive_count, steps, speed, mode, link, fps
    )
}

mod status_colors {
    pub const BG: [u8; 3] = [0x0D, 0x0D, 0x0D];
    pub const RULE: [u8; 3] = [0x33, 0x33, 0x33];
    pub const TEXT: [u8; 3] = [0x88, 0x88, 0x88];
}

/// Status bar across the bottom of the frame, below the scene and panel.
pub fn render_status(buf: &mut [u8], cfg: &RenderConfig, text: &str) {
    let fw = cfg.frame_width;
    let top = cfg.display_height;
    fill_rect_px(buf, fw, 0, top, fw, cfg.frame_height - top, status_colors::BG);
    fill_rect_px(buf, fw, 0, top, fw, 1, status_colors::RULE);
    draw_text_clipped(buf, fw, STATUS_PAD_LEFT, top + STATUS_PAD_TOP, text, status_colors::TEXT, TextSize::BASE, fw - STATUS_PAD_LEFT);
}

/// Fill a solid opaque rectangle.
pub(crate) fn fill_rect_px(buf: &mut [u8], frame_width: usize, x0: usize, y0: usize, w: usize, h: usize, color: [u8; 3]) {
    for y in y0..y0 + h {
        for x in x0..(x0 + w).min(frame_width) {
            let off = (y * frame_width + x) * 4;
            if off + 3 < buf.len() {
                buf[off] = color[0];
                buf[off + 1] = color[1];
                buf[off + 2] = color[2];
                buf[off + 3] = 255;
            }
        }
    }
}

/// Darken a rectangular region of the buffer by multiplying RGB by `factor`.
pub(crate) fn darken_rect(buf: &mut [u8], frame_width: usize, x0: usize, y0: usize, w: usize, h: usize, factor: f64) {
    for dy in 0..h {
        let y = y0 + dy;
        for dx in 0..w {
            let x = x0 + dx;
            let off = (y * frame_width + x) * 4;
            if off + 3 < buf.len() {
                buf[off] = (buf[off] as f64 * factor) as u8;
                buf[off + 1] = (buf[off + 1] as f64 * factor) as u8;
                buf[off + 2] = (buf[off + 2] as f64 * factor) as u8;
            }
        }
    }
}

/// Draw a 1px border rectangle.
pub(crate) fn draw_rect_border(buf: &mut [u8], frame_width: usize, x0: usize, y0: usize, w: usize, h: usize, color: [u8; 3]) {
    if w == 0 || h == 0 {
        return;
    }
    fill_rect_px(buf, frame_width, x0, y0, w, 1, color);
    fill_rect_px(buf, frame_width, x0, y0 + h - 1, w, 1, color);
    fill_rect_px(buf, frame_width, x0, y0, 1, h, color);
    fill_rect_px(buf, frame_width, x0 + w - 1, y0, 1, h, color);
}
