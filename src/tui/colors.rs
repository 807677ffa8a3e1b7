//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Priority;

/// Headline and focus accents.
pub const ACCENT: Color = Color::Rgb(99, 102, 241);
/// Completed tasks and the progress gauge.
pub const DARK_GREEN: Color = Color::Rgb(0, 120, 60);
/// Medium priority.
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Destructive confirmations and overdue dates.
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);

pub fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => GOLD,
        Priority::Low => Color::Blue,
    }
}
