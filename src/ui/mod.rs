//! Terminal UI components
//!
//! Built with ratatui. Keyboard-first navigation throughout.

pub mod theme;

pub use theme::Theme;

use ratatui::layout::Rect;

/// Rectangle of the given size centered in `area`, clamped to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}
