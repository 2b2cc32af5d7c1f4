use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::controls::ControlAction;

/// Key press shared by the window and terminal front ends.
#[derive(Debug, Clone, PartialEq)]
pub enum TermKey {
    Space,
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Char(char),
    Interrupt,
}

/// What a key press asks the viewer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Control(ControlAction),
    Quit,
}

/// Map a crossterm key event. Only presses count; Ctrl-C arrives as a key
/// because raw mode swallows the signal.
pub fn from_key_event(key: &KeyEvent) -> Option<TermKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(TermKey::Interrupt),
        KeyCode::Char(' ') => Some(TermKey::Space),
        KeyCode::Char(c @ ('q' | 'r' | 'y' | 'n' | '+' | '-' | '1'..='9')) => Some(TermKey::Char(c)),
        KeyCode::Enter => Some(TermKey::Enter),
        KeyCode::Esc => Some(TermKey::Escape),
        KeyCode::Up => Some(TermKey::Up),
        KeyCode::Down => Some(TermKey::Down),
        KeyCode::Left => Some(TermKey::Left),
        KeyCode::Right => Some(TermKey::Right),
        _ => None,
    }
}

/// Key bindings. While the reset dialog is open only confirm/cancel keys
/// do anything, and Escape cancels instead of quitting.
pub fn command_for(key: &TermKey, confirm_open: bool) -> Option<Command> {
    use ControlAction::*;
    if *key == TermKey::Interrupt {
        return Some(Command::Quit);
    }
    if confirm_open {
        return match key {
            TermKey::Char('y') | TermKey::Enter => Some(Command::Control(Confirm)),
            TermKey::Char('n') | TermKey::Escape => Some(Command::Control(Cancel)),
            TermKey::Char('q') => Some(Command::Quit),
            _ => None,
        };
    }
    match key {
        TermKey::Space => Some(Command::Control(TogglePause)),
        TermKey::Right | TermKey::Up | TermKey::Char('+') => Some(Command::Control(SpeedStep(1))),
        TermKey::Left | TermKey::Down | TermKey::Char('-') => Some(Command::Control(SpeedStep(-1))),
        TermKey::Char('r') => Some(Command::Control(RequestRestart)),
        TermKey::Char(c @ '1'..='9') => c.to_digit(10).map(|n| Command::Control(SetSpeed(n))),
        TermKey::Char('q') | TermKey::Escape => Some(Command::Quit),
        _ => None,
    }
}
