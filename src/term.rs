use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use tracing::{debug, error};

use crate::input::{self, TermKey};

/// Raw keyboard input for the headless loop; restores the terminal on drop.
pub struct RawTerminal(());

impl RawTerminal {
    /// `None` when stdin is not a terminal.
    pub fn enter() -> Option<Self> {
        match enable_raw_mode() {
            Ok(()) => Some(Self(())),
            Err(err) => {
                debug!(?err, "raw mode unavailable, keyboard disabled");
                None
            }
        }
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            error!(?err, "failed to disable raw mode");
        }
    }
}

/// Every key already queued, without blocking.
pub fn pending_keys() -> std::io::Result<Vec<TermKey>> {
    let mut keys = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            keys.extend(input::from_key_event(&key));
        }
    }
    Ok(keys)
}

/// Terminal size in pixels, when the terminal reports one.
pub fn pixel_size() -> Option<(usize, usize)> {
    let size = terminal::window_size().ok()?;
    (size.width > 0 && size.height > 0).then(|| (size.width as usize, size.height as usize))
}
