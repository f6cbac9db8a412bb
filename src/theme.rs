//! Terminal styling for the `chatlink` REPL.
//!
//! Honors `NO_COLOR` and `--no-color`.

use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::observer::ConnectionState;

static COLOR_DISABLED: AtomicBool = AtomicBool::new(false);

pub fn disable_color() {
    COLOR_DISABLED.store(true, Ordering::Relaxed);
    colored::control::set_override(false);
}

/// Call once after argument parsing.
pub fn init_color(no_color_flag: bool) {
    if no_color_flag
        || std::env::var("NO_COLOR")
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    {
        disable_color();
    }
}

fn is_color() -> bool {
    !COLOR_DISABLED.load(Ordering::Relaxed)
}

pub mod palette {
    pub const ACCENT: (u8, u8, u8) = (0x4C, 0x9E, 0xEB);
    pub const SUCCESS: (u8, u8, u8) = (0x2F, 0xBF, 0x71);
    pub const WARN: (u8, u8, u8) = (0xFF, 0xB0, 0x20);
    pub const ERROR: (u8, u8, u8) = (0xE2, 0x3D, 0x2D);
    pub const MUTED: (u8, u8, u8) = (0x8B, 0x7F, 0x77);
}

fn apply(text: &str, rgb: (u8, u8, u8)) -> String {
    if is_color() {
        text.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        text.to_string()
    }
}

pub fn accent(text: &str) -> String {
    apply(text, palette::ACCENT)
}

pub fn success(text: &str) -> String {
    apply(text, palette::SUCCESS)
}

pub fn warn(text: &str) -> String {
    apply(text, palette::WARN)
}

pub fn error(text: &str) -> String {
    apply(text, palette::ERROR)
}

pub fn muted(text: &str) -> String {
    apply(text, palette::MUTED)
}

pub fn bold(text: &str) -> String {
    if is_color() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn icon_ok(label: &str) -> String {
    format!("{} {}", success("✓"), label)
}

pub fn icon_fail(label: &str) -> String {
    format!("{} {}", error("✗"), label)
}

pub fn icon_warn(label: &str) -> String {
    format!("{} {}", warn("⚠"), label)
}

/// "  Label : value" with the label muted.
pub fn label_value(label: &str, value: &str) -> String {
    format!("  {} : {}", muted(label), accent(value))
}

/// Short colored description of a connection state.
pub fn state_label(state: ConnectionState) -> String {
    match state {
        ConnectionState::Disconnected => muted("disconnected"),
        ConnectionState::Connecting => warn("connecting"),
        ConnectionState::Open => success("connected"),
        ConnectionState::Reconnecting { attempt } => {
            warn(&format!("reconnecting (attempt {attempt})"))
        }
    }
}
