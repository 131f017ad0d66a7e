//! Palette and status styling shared by every picker.

use crate::data::PrStatus;
use crate::fmt::Outcome;
use crate::git::branches::Tracking;
use crate::git::FileStatus;
use ratatui::style::{Color, Modifier, Style};

pub const GREEN: Color = Color::Rgb(0x00, 0xff, 0x41);
pub const CYAN: Color = Color::Rgb(0x00, 0xe5, 0xff);
pub const PALE: Color = Color::Rgb(0xb8, 0xd4, 0xb8);
pub const AMBER: Color = Color::Rgb(0xff, 0xb3, 0x00);
pub const PURPLE: Color = Color::Rgb(0xb3, 0x9d, 0xdb);
pub const RED: Color = Color::Rgb(0xff, 0x55, 0x55);
pub const BG: Color = Color::Rgb(0x0a, 0x0e, 0x0a);
pub const SURFACE: Color = Color::Rgb(0x0d, 0x1a, 0x0d);
pub const DARK: Color = Color::Rgb(0x15, 0x20, 0x15);
pub const DIM: Color = Color::Rgb(0x4d, 0x8a, 0x4d);
pub const CURSOR_BG: Color = Color::Rgb(0x00, 0x3d, 0x00);

/// Unified status configuration - single source of truth for icon and style.
pub struct StatusConfig {
    pub icon: &'static str,
    pub style: Style,
}

/// Types that know how they are drawn in a status column.
pub trait StatusConfigurable {
    fn status_config(&self) -> StatusConfig;
}

fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

impl StatusConfigurable for PrStatus {
    fn status_config(&self) -> StatusConfig {
        match self {
            PrStatus::Open => StatusConfig {
                icon: "●",
                style: bold(Color::Green),
            },
            PrStatus::Draft => StatusConfig {
                icon: "◐",
                style: bold(Color::Yellow),
            },
            PrStatus::Merged => StatusConfig {
                icon: "✔",
                style: bold(Color::Blue),
            },
            PrStatus::Declined => StatusConfig {
                icon: "✗",
                style: bold(Color::Red),
            },
            PrStatus::Other(_) => StatusConfig {
                icon: "·",
                style: Style::default().fg(PALE),
            },
        }
    }
}

impl StatusConfigurable for Tracking {
    fn status_config(&self) -> StatusConfig {
        match self {
            Tracking::Tracked => StatusConfig {
                icon: "⇅",
                style: Style::default().fg(GREEN),
            },
            Tracking::NeverPushed => StatusConfig {
                icon: "○",
                style: Style::default().fg(AMBER),
            },
            Tracking::UpstreamGone => StatusConfig {
                icon: "✗",
                style: Style::default().fg(RED),
            },
            Tracking::RemoteOnly => StatusConfig {
                icon: "☁",
                style: Style::default().fg(CYAN),
            },
        }
    }
}

impl StatusConfigurable for FileStatus {
    fn status_config(&self) -> StatusConfig {
        match self {
            FileStatus::Added | FileStatus::Untracked => StatusConfig {
                icon: "+",
                style: Style::default().fg(RED),
            },
            FileStatus::Deleted => StatusConfig {
                icon: "-",
                style: Style::default().fg(AMBER),
            },
            _ => StatusConfig {
                icon: "~",
                style: Style::default().fg(AMBER),
            },
        }
    }
}

impl StatusConfigurable for Outcome {
    fn status_config(&self) -> StatusConfig {
        match self {
            Outcome::Ok => StatusConfig {
                icon: self.glyph(),
                style: bold(GREEN),
            },
            Outcome::Failed => StatusConfig {
                icon: self.glyph(),
                style: bold(RED),
            },
            Outcome::Skipped => StatusConfig {
                icon: self.glyph(),
                style: Style::default().fg(DIM),
            },
        }
    }
}

/// Style for the status label column of a staged or unstaged file row.
pub fn file_label_style(status: FileStatus, staged: bool) -> Style {
    if staged {
        return bold(GREEN);
    }
    match status {
        FileStatus::Added | FileStatus::Untracked | FileStatus::Deleted => bold(RED),
        _ => bold(AMBER),
    }
}

/// Tracker workflow status, matched case-insensitively.
pub fn issue_status_style(status: &str) -> Style {
    match status.to_lowercase().as_str() {
        "in progress" => bold(Color::Blue),
        "in review" => bold(Color::Yellow),
        "done" | "closed" => bold(Color::Green),
        "build" => bold(Color::Cyan),
        "blocked" => bold(Color::Red),
        _ => Style::default().fg(Color::White),
    }
}

pub fn priority_style(priority: &str) -> Style {
    match priority.to_lowercase().as_str() {
        "highest" | "critical" => bold(Color::Red),
        "high" => Style::default().fg(Color::Red),
        "medium" => Style::default().fg(Color::Yellow),
        "low" => Style::default().fg(Color::Green),
        "lowest" => Style::default().fg(Color::Green).add_modifier(Modifier::DIM),
        _ => Style::default().fg(Color::White),
    }
}

pub fn header_style() -> Style {
    bold(GREEN).bg(DARK)
}

pub fn cursor_style() -> Style {
    Style::default().bg(CURSOR_BG).add_modifier(Modifier::BOLD)
}

pub fn title_style() -> Style {
    bold(GREEN)
}

pub fn dim_style() -> Style {
    Style::default().fg(DIM)
}

pub fn text_style() -> Style {
    Style::default().fg(PALE)
}

pub fn border_style() -> Style {
    Style::default().fg(GREEN)
}
