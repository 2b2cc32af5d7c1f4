mod channel;
mod config;
mod controls;
mod input;
mod iterm2;
mod particles;
mod protocol;
mod renderer;
mod state;
mod telemetry;
mod term;
mod trails;
mod transport;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::Parser;
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

use channel::{ChannelAdapter, Inbound};
use controls::{Controls, SpeedSlider};
use input::{Command, TermKey};
use protocol::ClientEvent;
use renderer::track::TrackGeometry;
use renderer::{RenderConfig, STATUS_BAR_HEIGHT};
use state::Viewer;

struct Defaults;

impl Defaults {
    const HEADLESS_WIDTH: usize = 1020;
    const HEADLESS_HEIGHT: usize = 612;
    const HEADLESS_FRAME_INTERVAL_MS: u64 = 33;
    /// Max pixel count for headless render resolution.
    /// Terminal upscales via iTerm2's width/height parameters.
    const HEADLESS_MAX_RENDER_PIXELS: usize = 1020 * 612;
    const LOG_FILTER: &'static str = "info";
    /// Quieter default so log lines do not scroll over inline images.
    const HEADLESS_LOG_FILTER: &'static str = "warn";
}

/// Live viewer for the racing simulation server.
#[derive(Parser, Debug)]
#[command(name = "raceview", version, about)]
struct Cli {
    /// WebSocket endpoint; overrides `server.url` from the config file.
    #[arg(long)]
    url: Option<String>,
    /// Config file (default: ./raceview.yaml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Render to the terminal as iTerm2 inline images instead of a window.
    #[arg(long)]
    headless: bool,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Convert RGBA &[u8] buffer to 0RGB &[u32] buffer for minifb.
fn rgba_to_argb(rgba: &[u8], out: &mut [u32]) {
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        out[i] = (pixel[0] as u32) << 16 | (pixel[1] as u32) << 8 | pixel[2] as u32;
    }
}

/// Layout whose frame, status bar included, matches a window of this size.
fn fit_window(width: usize, height: usize) -> RenderConfig {
    RenderConfig::fit(width, height.saturating_sub(STATUS_BAR_HEIGHT))
}

fn window_title(connected: bool) -> &'static str {
    if connected { "connected - raceview" } else { "raceview" }
}

/// Viewer state plus the channel ends the front ends drive.
struct App {
    viewer: Viewer,
    controls: Controls,
    adapter: ChannelAdapter,
    inbound: mpsc::Receiver<Inbound>,
    geom: TrackGeometry,
}

impl App {
    fn new(cfg: &config::Config, outbound: mpsc::Sender<ClientEvent>, inbound: mpsc::Receiver<Inbound>) -> Self {
        let speed = SpeedSlider::new(cfg.speed.min, cfg.speed.max, cfg.speed.initial);
        Self {
            viewer: Viewer::new(cfg.trail_capacity),
            controls: Controls::new(speed),
            adapter: ChannelAdapter::new(outbound),
            inbound,
            geom: cfg.track.clone(),
        }
    }

    /// Apply everything the transport delivered since the last call, in
    /// arrival order. Returns true if anything changed.
    fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.inbound.try_recv() {
            changed |= self.adapter.handle(&mut self.viewer, msg);
        }
        changed
    }

    /// Returns `None` on quit, otherwise whether a redraw is needed.
    fn key(&mut self, key: &TermKey) -> Option<bool> {
        match input::command_for(key, self.controls.confirm_open()) {
            Some(Command::Quit) => None,
            Some(Command::Control(action)) => Some(self.controls.apply(action, self.adapter.outbound())),
            None => Some(false),
        }
    }

    fn draw(&self, buf: &mut Vec<u8>, cfg: &RenderConfig, fps: u32) {
        renderer::render_into(buf, &self.viewer, &self.controls, &self.geom, cfg);
        let status = renderer::format_status(&self.viewer.render, &self.controls.speed.label(), fps);
        renderer::render_status(buf, cfg, &status);
        controls::render_confirm(buf, cfg.frame_width, cfg.display_width, cfg.display_height, &self.controls);
    }
}

/// Spawn the transport and build the app around its channel ends.
fn start(cfg: &config::Config, url: String, running: &Arc<AtomicBool>) -> (App, std::thread::JoinHandle<()>) {
    let (in_tx, in_rx) = mpsc::channel();
    let (out_tx, out_rx) = mpsc::channel();
    info!(%url, "starting transport");
    let handle = transport::spawn(url, in_tx, out_rx, running.clone());
    (App::new(cfg, out_tx, in_rx), handle)
}

fn install_ctrlc(running: &Arc<AtomicBool>) -> anyhow::Result<()> {
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)).context("setting Ctrl+C handler")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.headless { Defaults::HEADLESS_LOG_FILTER } else { Defaults::LOG_FILTER });

    let cfg = config::load(cli.config.as_deref());
    let url = cli.url.clone().unwrap_or_else(|| cfg.server.url.clone());

    if cli.headless {
        run_headless(&cfg, url)
    } else {
        run_gui(&cfg, url)
    }
}

/// minifb keys mapped onto the terminal key set so both front ends share
/// one binding table.
fn pressed_keys(window: &Window) -> Vec<TermKey> {
    let once = [
        (Key::Space, TermKey::Space),
        (Key::Enter, TermKey::Enter),
        (Key::Escape, TermKey::Escape),
        (Key::R, TermKey::Char('r')),
        (Key::Y, TermKey::Char('y')),
        (Key::N, TermKey::Char('n')),
        (Key::Q, TermKey::Char('q')),
        (Key::Key1, TermKey::Char('1')),
        (Key::Key2, TermKey::Char('2')),
        (Key::Key3, TermKey::Char('3')),
        (Key::Key4, TermKey::Char('4')),
        (Key::Key5, TermKey::Char('5')),
        (Key::Key6, TermKey::Char('6')),
        (Key::Key7, TermKey::Char('7')),
        (Key::Key8, TermKey::Char('8')),
        (Key::Key9, TermKey::Char('9')),
    ];
    let repeat = [
        (Key::Left, TermKey::Left),
        (Key::Right, TermKey::Right),
        (Key::Up, TermKey::Up),
        (Key::Down, TermKey::Down),
    ];
    once.into_iter()
        .filter(|(k, _)| window.is_key_pressed(*k, KeyRepeat::No))
        .chain(repeat.into_iter().filter(|(k, _)| window.is_key_pressed(*k, KeyRepeat::Yes)))
        .map(|(_, t)| t)
        .collect()
}

fn run_gui(cfg: &config::Config, url: String) -> anyhow::Result<()> {
    let mut win_size = (cfg.display.width, cfg.display.height);
    let mut render_cfg = fit_window(win_size.0, win_size.1);

    let mut window = Window::new(
        window_title(false),
        render_cfg.frame_width,
        render_cfg.frame_height,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )
    .map_err(|e| anyhow!("failed to create window: {e}"))?;
    window.set_target_fps(cfg.display.target_fps);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc(&running)?;
    let (mut app, transport) = start(cfg, url, &running);

    let mut framebuf = vec![0u32; render_cfg.frame_width * render_cfg.frame_height];
    let mut rgba_buf: Vec<u8> = Vec::new();
    let mut frame_count = 0u32;
    let mut last_fps_time = Instant::now();
    let mut display_fps = 0u32;
    let mut connected = false;
    let mut needs_redraw = true;

    'frames: while window.is_open() && running.load(Ordering::SeqCst) {
        for key in pressed_keys(&window) {
            match app.key(&key) {
                Some(redraw) => needs_redraw |= redraw,
                None => break 'frames,
            }
        }

        let size = window.get_size();
        if size != win_size {
            win_size = size;
            render_cfg = fit_window(size.0, size.1);
            framebuf = vec![0u32; render_cfg.frame_width * render_cfg.frame_height];
            needs_redraw = true;
        }

        needs_redraw |= app.pump();
        if app.viewer.render.connected != connected {
            connected = app.viewer.render.connected;
            window.set_title(window_title(connected));
        }

        if needs_redraw {
            app.draw(&mut rgba_buf, &render_cfg, display_fps);
            rgba_to_argb(&rgba_buf, &mut framebuf);
            needs_redraw = false;
        }

        window
            .update_with_buffer(&framebuf, render_cfg.frame_width, render_cfg.frame_height)
            .map_err(|e| anyhow!("window update failed: {e}"))?;

        frame_count += 1;
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            display_fps = frame_count;
            frame_count = 0;
            last_fps_time = now;
            needs_redraw = true;
        }
    }

    running.store(false, Ordering::SeqCst);
    drop(app);
    let _ = transport.join();
    Ok(())
}

/// Capped render dimensions for a terminal of this pixel size.
fn headless_render_dims(term_w: usize, term_h: usize) -> (usize, usize) {
    let actual = term_w * term_h;
    let max = Defaults::HEADLESS_MAX_RENDER_PIXELS;
    let scale = if actual > max { (max as f64 / actual as f64).sqrt() } else { 1.0 };
    let rw = ((term_w as f64 * scale) as usize).max(2);
    let rh = ((term_h as f64 * scale) as usize).max(2);
    (rw, rh)
}

fn run_headless(cfg: &config::Config, url: String) -> anyhow::Result<()> {
    use std::io::Write;

    let (mut term_width, mut term_height) =
        term::pixel_size().unwrap_or((Defaults::HEADLESS_WIDTH, Defaults::HEADLESS_HEIGHT));
    let (render_w, render_h) = headless_render_dims(term_width, term_height);
    let mut render_cfg = fit_window(render_w, render_h);
    let frame_interval = Duration::from_millis(Defaults::HEADLESS_FRAME_INTERVAL_MS);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc(&running)?;
    let (mut app, transport) = start(cfg, url, &running);

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::with_capacity(4 * 1024 * 1024, stdout.lock());
    execute!(out, EnterAlternateScreen, cursor::Hide, Clear(ClearType::All)).context("failed to enter alternate screen")?;

    let raw_guard = term::RawTerminal::enter();

    let mut encoder = iterm2::Iterm2Encoder::new();
    let mut rgba_buf: Vec<u8> = Vec::new();
    let mut frame_count = 0u32;
    let mut last_fps_time = Instant::now();
    let mut display_fps = 0u32;
    let mut needs_redraw = true;

    'frames: while running.load(Ordering::SeqCst) {
        let frame_start = Instant::now();

        if raw_guard.is_some() {
            for key in term::pending_keys()? {
                match app.key(&key) {
                    Some(redraw) => needs_redraw |= redraw,
                    None => break 'frames,
                }
            }
        }

        if let Some((tw, th)) = term::pixel_size() {
            if (tw, th) != (term_width, term_height) {
                (term_width, term_height) = (tw, th);
                let (rw, rh) = headless_render_dims(tw, th);
                render_cfg = fit_window(rw, rh);
                needs_redraw = true;
            }
        }

        needs_redraw |= app.pump();

        if needs_redraw {
            app.draw(&mut rgba_buf, &render_cfg, display_fps);
            let seq = encoder.encode(&rgba_buf, render_cfg.frame_width, render_cfg.frame_height, term_width, term_height)?;
            queue!(out, cursor::MoveTo(0, 0))?;
            out.write_all(seq)?;
            out.flush()?;
            needs_redraw = false;
            frame_count += 1;
        }

        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            display_fps = frame_count;
            frame_count = 0;
            last_fps_time = now;
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_interval {
            std::thread::sleep(frame_interval - elapsed);
        }
    }

    drop(raw_guard);
    execute!(out, cursor::Show, LeaveAlternateScreen)?;

    running.store(false, Ordering::SeqCst);
    drop(app);
    let _ = transport.join();
    Ok(())
}
