//! Theme for StreamVerse
//!
//! Color palette and style helpers for the TUI. A dark plum background with
//! rose and gold accents.

use ratatui::style::{Color, Modifier, Style};

/// Color palette
pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // CORE PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Background: #140d14 (deep plum)
    pub const BACKGROUND: Color = Color::Rgb(0x14, 0x0d, 0x14);

    /// Primary: #ff6f91 (rose)
    pub const PRIMARY: Color = Color::Rgb(0xff, 0x6f, 0x91);

    /// Secondary: #c39bd3 (lavender)
    pub const SECONDARY: Color = Color::Rgb(0xc3, 0x9b, 0xd3);

    /// Accent: #ffc75f (gold)
    pub const ACCENT: Color = Color::Rgb(0xff, 0xc7, 0x5f);

    /// Text: #f0e6ef (warm white)
    pub const TEXT: Color = Color::Rgb(0xf0, 0xe6, 0xef);

    /// Dim: #7a6a78 (muted mauve)
    pub const DIM: Color = Color::Rgb(0x7a, 0x6a, 0x78);

    /// Success: #7ee0a1 (mint)
    pub const SUCCESS: Color = Color::Rgb(0x7e, 0xe0, 0xa1);

    /// Error: #ff4f5e (coral red)
    pub const ERROR: Color = Color::Rgb(0xff, 0x4f, 0x5e);

    /// Border color (dim rose)
    pub const BORDER: Color = Color::Rgb(0x80, 0x3a, 0x50);

    /// Border color when focused
    pub const BORDER_FOCUSED: Color = Self::PRIMARY;

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    /// Highlighted text (inverted with primary color)
    pub fn highlighted() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default()
            .fg(Self::SUCCESS)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn secondary() -> Style {
        Style::default().fg(Self::SECONDARY)
    }

    pub fn accent() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    pub fn border_focused() -> Style {
        Style::default()
            .fg(Self::BORDER_FOCUSED)
            .add_modifier(Modifier::BOLD)
    }

    pub fn input() -> Style {
        Style::default().fg(Self::TEXT)
    }

    /// Key hint in help lines
    pub fn keybind() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BORDER)
    }

    pub fn loading() -> Style {
        Style::default()
            .fg(Self::SECONDARY)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn year() -> Style {
        Style::default().fg(Self::DIM)
    }

    /// Masked PIN digits
    pub fn pin() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLOR UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Relative luminance of a color
/// Formula: https://www.w3.org/TR/WCAG20/#relativeluminancedef
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel_luminance(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * channel_luminance(r) + 0.7152 * channel_luminance(g) + 0.0722 * channel_luminance(b)
}

/// Contrast ratio between two colors, from 1 (same) to 21 (black/white)
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let l1 = relative_luminance(fg.0, fg.1, fg.2);
    let l2 = relative_luminance(bg.0, bg.1, bg.2);

    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };

    (lighter + 0.05) / (darker + 0.05)
}

/// WCAG AA for normal text
pub fn meets_wcag_aa(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 4.5
}

/// WCAG AA for large text
pub fn meets_wcag_aa_large(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 3.0
}

/// Extract RGB tuple from ratatui Color (only works for Rgb variant)
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}
