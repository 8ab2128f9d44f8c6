//! Theme and Colors
//!
//! DataSense palette. Premium content is gold, the upsell chip is teal,
//! everything free stays neutral.

use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Brand Palette
// ============================================================================

/// DataSense accent (assistant prefix, chip border)
pub const DATASENSE_TEAL: Color = Color::Rgb(64, 196, 200);

/// Premium gold (premium answer and cards)
pub const PREMIUM_GOLD: Color = Color::Rgb(240, 196, 80);

/// Video card accent
pub const VIDEO_CORAL: Color = Color::Rgb(255, 127, 110);

/// Document card accent
pub const DOCUMENT_BLUE: Color = Color::Rgb(120, 170, 255);

// ============================================================================
// UI Colors
// ============================================================================

/// User input green
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Scroll fade shades (outermost first)
pub const FADE_SHADES: [Color; 2] = [Color::Rgb(80, 80, 80), Color::Rgb(120, 120, 120)];

/// Warning notices
pub const WARNING_AMBER: Color = Color::Rgb(255, 170, 60);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// Success green (toasts)
pub const SUCCESS_GREEN: Color = Color::Rgb(120, 230, 120);

/// Overlay background
pub const OVERLAY_BG: Color = Color::Rgb(24, 28, 36);

/// Style for overlay borders
pub fn overlay_border() -> Style {
    Style::default().fg(DATASENSE_TEAL).bg(OVERLAY_BG)
}

/// Style for overlay body text
pub fn overlay_text() -> Style {
    Style::default().fg(Color::White).bg(OVERLAY_BG)
}

/// Style for the highlighted choice in an overlay
pub fn overlay_selected() -> Style {
    Style::default()
        .fg(PREMIUM_GOLD)
        .bg(OVERLAY_BG)
        .add_modifier(Modifier::BOLD)
}
