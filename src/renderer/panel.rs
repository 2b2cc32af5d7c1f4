use super::canvas::{Canvas, Clip, Point, Stroke, Transform};
use super::color::{DISTANCE_SERIES, EPSILON_SERIES};
use super::{draw_rect_border, draw_text, draw_text_sized, fill_rect_px, RenderConfig, TextSize, FONT_HEIGHT, PANEL_WIDTH};
use crate::controls::{self, Controls};
use crate::state::Viewer;
use crate::telemetry::Telemetry;

const MARGIN: usize = 8;
const CHART_HEIGHT: usize = 96;
const SERIES_WIDTH: f64 = 1.5;
const EPSILON_DASH: (f64, f64) = (5.0, 5.0);
const ROW_STEP: usize = FONT_HEIGHT + 3;
const TITLE_SIZE: TextSize = TextSize { w: 7, h: 9 };

mod colors {
    pub const BG: [u8; 3] = [0x14, 0x16, 0x1A];
    pub const SEPARATOR: [u8; 3] = [0x33, 0x33, 0x33];
    pub const TITLE: [u8; 3] = [0xDF, 0xE6, 0xE9];
    pub const SECTION: [u8; 3] = [0x88, 0x88, 0x88];
    pub const CHART_BG: [u8; 3] = [0x0D, 0x0D, 0x0D];
    pub const ROW: [u8; 3] = [0xAA, 0xAA, 0xAA];
    pub const ROW_LATEST: [u8; 3] = [0xFF, 0xFF, 0xFF];
}

/// Map a series onto `rect`, scaled to its own `[0, max]` range.
fn series_points(values: &[f64], rect: Clip) -> Vec<Point> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let w = rect.width().saturating_sub(1) as f64;
    let h = rect.height().saturating_sub(1) as f64;
    let left = rect.x0 as f64 + 0.5;
    let bottom = rect.y0 as f64 + 0.5 + h;
    let n = values.len();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = if n > 1 { left + w * i as f64 / (n - 1) as f64 } else { left + w / 2.0 };
            let t = if max > 0.0 { (v / max).clamp(0.0, 1.0) } else { 0.0 };
            (x, bottom - t * h)
        })
        .collect()
}

fn draw_series(canvas: &mut Canvas, pts: &[Point], stroke: Stroke, color: [u8; 3]) {
    match pts {
        [] => {}
        [p] => canvas.fill_circle(*p, 2.0, color, 1.0),
        _ => canvas.stroke_polyline(pts, false, stroke, color, 1.0),
    }
}

/// Distance and epsilon on independent vertical scales.
fn render_chart(buf: &mut [u8], frame_width: usize, rect: Clip, telemetry: &Telemetry) {
    fill_rect_px(buf, frame_width, rect.x0, rect.y0, rect.width(), rect.height(), colors::CHART_BG);
    draw_rect_border(buf, frame_width, rect.x0, rect.y0, rect.width(), rect.height(), colors::SEPARATOR);

    let inner = Clip::new(rect.x0 + 1, rect.y0 + 1, rect.width().saturating_sub(2), rect.height().saturating_sub(2));
    let chart = telemetry.chart();
    let mut canvas = Canvas::new(buf, frame_width, inner, Transform::IDENTITY);
    let (on, off) = EPSILON_DASH;
    draw_series(&mut canvas, &series_points(&chart.epsilon, inner), Stroke::dashed(SERIES_WIDTH, on, off), EPSILON_SERIES);
    draw_series(&mut canvas, &series_points(&chart.distance, inner), Stroke::solid(SERIES_WIDTH), DISTANCE_SERIES);
}

fn format_row(generation: u32, distance: f64, epsilon: f64) -> String {
    format!("{generation:<5}{distance:>9.1}{epsilon:>8.3}")
}

/// Side panel: title, controls, telemetry chart and the generation log.
pub fn render_panel(buf: &mut [u8], cfg: &RenderConfig, viewer: &Viewer, controls: &Controls) {
    let fw = cfg.frame_width;
    let x0 = cfg.display_width;
    let bottom = cfg.display_height;
    fill_rect_px(buf, fw, x0, 0, PANEL_WIDTH, bottom, colors::BG);
    fill_rect_px(buf, fw, x0, 0, 1, bottom, colors::SEPARATOR);

    let x = x0 + MARGIN;
    let inner_w = PANEL_WIDTH - 2 * MARGIN;
    let mut y = MARGIN;
    draw_text_sized(buf, fw, x, y, "raceview", colors::TITLE, TITLE_SIZE);
    y += TITLE_SIZE.h + 8;

    controls::render_controls(buf, fw, x, y, controls, viewer.render.paused);
    y += controls::CONTROLS_HEIGHT + 10;

    let telemetry = &viewer.telemetry;
    let cx = draw_text(buf, fw, x, y, "telemetry", colors::SECTION) + 8;
    if let Some(best) = telemetry.best_distance() {
        draw_text(buf, fw, cx, y, &format!("best {best:.1}"), colors::ROW);
    }
    y += FONT_HEIGHT + 4;

    let chart_h = CHART_HEIGHT.min(bottom.saturating_sub(y + MARGIN));
    if chart_h < 8 {
        return;
    }
    render_chart(buf, fw, Clip::new(x, y, inner_w, chart_h), telemetry);
    y += chart_h + 4;

    // legend
    fill_rect_px(buf, fw, x, y + 3, 10, 2, DISTANCE_SERIES);
    let lx = draw_text(buf, fw, x + 14, y, "distance", DISTANCE_SERIES) + 10;
    fill_rect_px(buf, fw, lx, y + 3, 4, 2, EPSILON_SERIES);
    fill_rect_px(buf, fw, lx + 6, y + 3, 4, 2, EPSILON_SERIES);
    draw_text(buf, fw, lx + 14, y, "epsilon", EPSILON_SERIES);
    y += FONT_HEIGHT + 8;

    if y + FONT_HEIGHT > bottom {
        return;
    }
    draw_text(buf, fw, x, y, "gen       dist     eps", colors::SECTION);
    y += ROW_STEP;
    fill_rect_px(buf, fw, x, y - 2, inner_w, 1, colors::SEPARATOR);
    if telemetry.is_empty() {
        draw_text(buf, fw, x, y, "no generations yet", colors::SECTION);
        return;
    }
    for (i, row) in telemetry.rows().enumerate() {
        if y + FONT_HEIGHT + MARGIN > bottom {
            break;
        }
        let color = if i == 0 { colors::ROW_LATEST } else { colors::ROW };
        draw_text(buf, fw, x, y, &format_row(row.generation, row.distance, row.epsilon), color);
        y += ROW_STEP;
    }
}
