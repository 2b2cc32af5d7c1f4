use tracing::debug;

use crate::channel::Outbound;
use crate::renderer::{self, TextSize, FONT_HEIGHT};

/// Proof that the user explicitly confirmed a hard reset. Only
/// [`Controls::apply`] can mint one, and only from an open dialog.
pub struct Confirmed {
    _private: (),
}

/// User intents, independent of the input device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    TogglePause,
    /// Nudge the speed slider by this many steps.
    SpeedStep(i32),
    SetSpeed(u32),
    RequestRestart,
    Confirm,
    Cancel,
}

/// Bounded integer speed multiplier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeedSlider {
    value: u32,
    min: u32,
    max: u32,
}

impl SpeedSlider {
    pub fn new(min: u32, max: u32, initial: u32) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self { value: initial.clamp(min, max), min, max }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Multiplier label shown next to the slider, e.g. `"2x"`.
    pub fn label(&self) -> String {
        format!("{}x", self.value)
    }

    /// Clamp and store. Returns the new value only if it changed.
    pub fn set(&mut self, value: u32) -> Option<u32> {
        let v = value.clamp(self.min, self.max);
        if v == self.value {
            return None;
        }
        self.value = v;
        Some(v)
    }

    pub fn step(&mut self, delta: i32) -> Option<u32> {
        let target = (self.value as i64 + delta as i64).clamp(self.min as i64, self.max as i64);
        self.set(target as u32)
    }

    /// Fill fraction for the gauge.
    pub fn ratio(&self) -> f64 {
        if self.max == self.min {
            1.0
        } else {
            (self.value - self.min) as f64 / (self.max - self.min) as f64
        }
    }
}

/// Local state of the on-screen controls. The pause icon itself follows
/// the server's `pause_state`, not this struct.
pub struct Controls {
    pub speed: SpeedSlider,
    confirm_open: bool,
}

impl Controls {
    pub fn new(speed: SpeedSlider) -> Self {
        Self { speed, confirm_open: false }
    }

    pub fn confirm_open(&self) -> bool {
        self.confirm_open
    }

    /// Apply one user action, emitting at most one outbound event.
    /// Returns true if anything visible changed.
    pub fn apply(&mut self, action: ControlAction, out: &Outbound) -> bool {
        if self.confirm_open {
            return match action {
                ControlAction::Confirm => {
                    self.confirm_open = false;
                    out.restart_sim(Confirmed { _private: () });
                    true
                }
                ControlAction::Cancel => {
                    self.confirm_open = false;
                    debug!("hard reset cancelled");
                    true
                }
                // the dialog is modal
                _ => false,
            };
        }
        match action {
            ControlAction::TogglePause => {
                out.toggle_pause();
                false
            }
            ControlAction::SpeedStep(delta) => emit_speed(self.speed.step(delta), out),
            ControlAction::SetSpeed(v) => emit_speed(self.speed.set(v), out),
            ControlAction::RequestRestart => {
                self.confirm_open = true;
                true
            }
            ControlAction::Confirm | ControlAction::Cancel => false,
        }
    }
}

/// Emit `set_speed` only when the clamped value actually moved.
fn emit_speed(changed: Option<u32>, out: &Outbound) -> bool {
    match changed {
        Some(v) => {
            out.set_speed(v);
            true
        }
        None => false,
    }
}

/// Colors used by the controls and the confirmation dialog.
mod colors {
    pub const BORDER: [u8; 3] = [0x44, 0x44, 0x44];
    pub const BUTTON: [u8; 3] = [0x2A, 0x2E, 0x35];
    pub const BUTTON_PAUSED: [u8; 3] = [0xE1, 0x70, 0x55];
    pub const ICON: [u8; 3] = [0xDD, 0xDD, 0xDD];
    pub const LABEL: [u8; 3] = [0x88, 0x88, 0x88];
    pub const VALUE: [u8; 3] = [0xCC, 0xCC, 0xCC];
    pub const HEADER: [u8; 3] = [0xFF, 0x76, 0x75];
    pub const TEXT: [u8; 3] = [0xCC, 0xCC, 0xCC];
    pub const HINT: [u8; 3] = [0x44, 0x88, 0x88];
}

pub const BUTTON_SIZE: usize = 15;
const GAUGE_CHARS: usize = 10;
/// Height of the block drawn by [`render_controls`].
pub const CONTROLS_HEIGHT: usize = BUTTON_SIZE + 6 + FONT_HEIGHT + 6 + FONT_HEIGHT;

/// Draw a gauge bar with a teal-to-red gradient fill.
fn draw_gauge(buf: &mut [u8], frame_width: usize, x: usize, y: usize, ratio: f64, width: usize, height: usize) {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    for dy in 0..height {
        for dx in 0..width {
            let off = ((y + dy) * frame_width + x + dx) * 4;
            if off + 3 < buf.len() {
                if dx < filled {
                    let t = dx as f64 / width as f64;
                    buf[off] = (0x00 as f64 + t * 0xFF as f64) as u8;
                    buf[off + 1] = (0xBB as f64 - t * (0xBB - 0x76) as f64) as u8;
                    buf[off + 2] = (0xBB as f64 - t * (0xBB - 0x75) as f64) as u8;
                } else {
                    buf[off] = 0x22;
                    buf[off + 1] = 0x22;
                    buf[off + 2] = 0x22;
                }
                buf[off + 3] = 255;
            }
        }
    }
}

/// Pause button plus state label, speed gauge, restart hint.
pub fn render_controls(buf: &mut [u8], frame_width: usize, x: usize, y: usize, controls: &Controls, paused: bool) {
    let bg = if paused { colors::BUTTON_PAUSED } else { colors::BUTTON };
    renderer::fill_rect_px(buf, frame_width, x, y, BUTTON_SIZE, BUTTON_SIZE, bg);
    renderer::draw_rect_border(buf, frame_width, x, y, BUTTON_SIZE, BUTTON_SIZE, colors::BORDER);
    if paused {
        // play triangle
        for dy in 0..9 {
            let half = if dy <= 4 { dy } else { 8 - dy };
            renderer::fill_rect_px(buf, frame_width, x + 5, y + 3 + dy, half + 1, 1, colors::ICON);
        }
    } else {
        // pause bars
        renderer::fill_rect_px(buf, frame_width, x + 4, y + 3, 2, 9, colors::ICON);
        renderer::fill_rect_px(buf, frame_width, x + 9, y + 3, 2, 9, colors::ICON);
    }
    let state = if paused { "paused" } else { "running" };
    renderer::draw_text(buf, frame_width, x + BUTTON_SIZE + 6, y + (BUTTON_SIZE - FONT_HEIGHT) / 2, state, colors::VALUE);

    let row = y + BUTTON_SIZE + 6;
    let cx = renderer::draw_text(buf, frame_width, x, row, "speed", colors::LABEL) + 6;
    let gauge_w = GAUGE_CHARS * (renderer::FONT_WIDTH + 1);
    draw_gauge(buf, frame_width, cx, row, controls.speed.ratio(), gauge_w, FONT_HEIGHT);
    renderer::draw_text(buf, frame_width, cx + gauge_w + 6, row, &controls.speed.label(), colors::VALUE);

    let row = row + FONT_HEIGHT + 6;
    renderer::draw_text(buf, frame_width, x, row, "space=pause  lr=speed  r=restart", colors::HINT);
}

/// Modal hard-reset confirmation, centered in the display area.
/// Does nothing unless the dialog is open.
pub fn render_confirm(buf: &mut [u8], frame_width: usize, display_width: usize, display_height: usize, controls: &Controls) {
    if !controls.confirm_open {
        return;
    }
    let size = TextSize { w: 7, h: 9 };
    let row_h = size.h + 4;
    let pad = 10;
    let lines = ["hard reset the simulation?", "all learning progress will be lost."];

    let content_chars = lines.iter().map(|l| l.len()).max().unwrap_or(0);
    let panel_w = (content_chars * size.advance() + pad * 2).min(display_width.saturating_sub(4));
    let panel_h = (pad + row_h + 4 + lines.len() * row_h + 6 + FONT_HEIGHT + 2 + pad).min(display_height.saturating_sub(4));
    let px = display_width.saturating_sub(panel_w) / 2;
    let py = display_height.saturating_sub(panel_h) / 2;

    renderer::darken_rect(buf, frame_width, px, py, panel_w, panel_h, 0.25);
    renderer::draw_rect_border(buf, frame_width, px, py, panel_w, panel_h, colors::BORDER);

    // text stays inside the border even when the window is too narrow
    let left = px + pad;
    let right = px + panel_w.saturating_sub(1);
    let mut cy = py + pad;
    renderer::draw_text_clipped(buf, frame_width, left, cy, "hard reset", colors::HEADER, size, right);
    cy += row_h + 4;
    for line in lines {
        renderer::draw_text_clipped(buf, frame_width, left, cy, line, colors::TEXT, size, right);
        cy += row_h;
    }
    cy += 6;
    renderer::draw_text_clipped(buf, frame_width, left, cy, "y=confirm  n=cancel", colors::HINT, TextSize::BASE, right);
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::protocol::ClientEvent;

    fn setup() -> (Controls, Outbound, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel();
        (Controls::new(SpeedSlider::new(1, 10, 1)), Outbound::new(tx), rx)
    }

    fn sent(rx: &mpsc::Receiver<ClientEvent>) -> Vec<ClientEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_set_speed_emits_once_and_updates_label() {
        let (mut c, out, rx) = setup();
        assert!(c.apply(ControlAction::SetSpeed(2), &out));
        assert_eq!(sent(&rx), vec![ClientEvent::SetSpeed { speed: 2 }]);
        assert_eq!(c.speed.label(), "2x");
    }

    #[test]
    fn test_unchanged_speed_emits_nothing() {
        let (mut c, out, rx) = setup();
        assert!(!c.apply(ControlAction::SetSpeed(1), &out));
        assert!(!c.apply(ControlAction::SpeedStep(-1), &out), "already at minimum");
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn test_speed_clamped_to_bounds() {
        let (mut c, out, rx) = setup();
        c.apply(ControlAction::SetSpeed(50), &out);
        assert_eq!(c.speed.value(), 10);
        c.apply(ControlAction::SpeedStep(1), &out);
        assert_eq!(sent(&rx), vec![ClientEvent::SetSpeed { speed: 10 }]);
        assert_eq!(c.speed.label(), "10x");
    }

    #[test]
    fn test_speed_steps() {
        let (mut c, out, rx) = setup();
        c.apply(ControlAction::SpeedStep(1), &out);
        c.apply(ControlAction::SpeedStep(1), &out);
        c.apply(ControlAction::SpeedStep(-1), &out);
        assert_eq!(
            sent(&rx),
            vec![
                ClientEvent::SetSpeed { speed: 2 },
                ClientEvent::SetSpeed { speed: 3 },
                ClientEvent::SetSpeed { speed: 2 },
            ]
        );
    }

    #[test]
    fn test_slider_initial_clamped() {
        let s = SpeedSlider::new(2, 5, 9);
        assert_eq!(s.value(), 5);
        assert_eq!(s.ratio(), 1.0);
        let s = SpeedSlider::new(0, 10, 0);
        assert_eq!(s.value(), 1, "multiplier never drops below 1");
    }

    #[test]
    fn test_toggle_pause_emits_without_local_change() {
        let (mut c, out, rx) = setup();
        assert!(!c.apply(ControlAction::TogglePause, &out));
        assert_eq!(sent(&rx), vec![ClientEvent::TogglePause]);
    }

    #[test]
    fn test_restart_requires_confirmation() {
        let (mut c, out, rx) = setup();
        assert!(c.apply(ControlAction::RequestRestart, &out));
        assert!(c.confirm_open());
        assert!(sent(&rx).is_empty(), "request alone must not emit");
        assert!(c.apply(ControlAction::Confirm, &out));
        assert!(!c.confirm_open());
        assert_eq!(sent(&rx), vec![ClientEvent::RestartSim]);
    }

    #[test]
    fn test_restart_cancel_emits_nothing() {
        let (mut c, out, rx) = setup();
        c.apply(ControlAction::RequestRestart, &out);
        c.apply(ControlAction::Cancel, &out);
        assert!(!c.confirm_open());
        c.apply(ControlAction::Confirm, &out);
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn test_dialog_is_modal() {
        let (mut c, out, rx) = setup();
        c.apply(ControlAction::RequestRestart, &out);
        assert!(!c.apply(ControlAction::TogglePause, &out));
        assert!(!c.apply(ControlAction::SetSpeed(4), &out));
        assert!(sent(&rx).is_empty());
        assert_eq!(c.speed.value(), 1);
    }

    #[test]
    fn test_confirm_without_dialog_is_noop() {
        let (mut c, out, rx) = setup();
        assert!(!c.apply(ControlAction::Confirm, &out));
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn test_render_confirm_closed_is_noop() {
        let (c, _out, _rx) = setup();
        let cfg = renderer::RenderConfig::fit(1000, 612);
        let mut buf = vec![42u8; cfg.frame_width * cfg.frame_height * 4];
        let orig = buf.clone();
        render_confirm(&mut buf, cfg.frame_width, cfg.display_width, cfg.display_height, &c);
        assert_eq!(buf, orig);
    }

    #[test]
    fn test_render_confirm_darkens_center() {
        let (mut c, out, _rx) = setup();
        c.apply(ControlAction::RequestRestart, &out);
        let cfg = renderer::RenderConfig::fit(1000, 612);
        let mut buf = vec![200u8; cfg.frame_width * cfg.frame_height * 4];
        render_confirm(&mut buf, cfg.frame_width, cfg.display_width, cfg.display_height, &c);
        let darkened = buf.chunks(4).filter(|px| px[0] == 50).count();
        assert!(darkened > 10_000, "dialog backdrop should be darkened, got {darkened}");
        assert_eq!(buf[0], 200, "corner outside the dialog is untouched");
    }

    #[test]
    fn test_render_confirm_text_stays_in_dialog_when_narrow() {
        let (mut c, out, _rx) = setup();
        c.apply(ControlAction::RequestRestart, &out);
        let cfg = renderer::RenderConfig::fit(160 + renderer::PANEL_WIDTH, 200);
        let fw = cfg.frame_width;
        let mut buf = vec![200u8; fw * cfg.frame_height * 4];
        render_confirm(&mut buf, fw, cfg.display_width, cfg.display_height, &c);

        // dialog spans x in 2..158 for a 160 px scene
        let text = [colors::TEXT, colors::HEADER, colors::HINT];
        let mut inside = 0;
        for (i, px) in buf.chunks_exact(4).enumerate() {
            if text.iter().any(|t| px[..3] == *t) {
                let x = i % fw;
                assert!((2..157).contains(&x), "text pixel escaped the dialog at x={x}");
                inside += 1;
            }
        }
        assert!(inside > 100, "dialog text still drawn");
    }

    #[test]
    fn test_pause_button_reflects_state() {
        let (c, _out, _rx) = setup();
        let w = 240;
        let mut running = vec![0u8; w * 60 * 4];
        let mut paused = vec![0u8; w * 60 * 4];
        render_controls(&mut running, w, 2, 2, &c, false);
        render_controls(&mut paused, w, 2, 2, &c, true);
        // top-left inside the button shows the background color
        let off = (4 * w + 3) * 4;
        assert_eq!(&running[off..off + 3], &colors::BUTTON);
        assert_eq!(&paused[off..off + 3], &colors::BUTTON_PAUSED);
    }

    #[test]
    fn test_gauge_empty_full() {
        let w = 100;
        let mut empty = vec![0u8; w * 10 * 4];
        let mut full = vec![0u8; w * 10 * 4];
        draw_gauge(&mut empty, w, 0, 0, 0.0, 60, 7);
        draw_gauge(&mut full, w, 0, 0, 1.0, 60, 7);
        assert_eq!(empty[0], 0x22);
        assert!(full[1] > 0x22, "full gauge should be filled");
    }
}
