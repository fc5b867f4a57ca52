//! Theme and styling for the recite TUI.

use ratatui::style::{Color, Modifier, Style};

/// Color palette for a theme.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Brand Colors
    pub primary: Color,
    pub accent: Color,

    // Semantic Colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,

    // Background Colors
    pub bg_dark: Color,
    pub bg_elevated: Color,
    pub bg_highlight: Color,

    // Text Colors
    pub text: Color,
    pub text_muted: Color,
    pub text_dim: Color,

    // Status Colors
    pub status_not_started: Color,
    pub status_in_progress: Color,
    pub status_mastered: Color,
}

/// Available theme names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Default,
    KanagawaWave,
    Parchment,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Default => "default",
            ThemeName::KanagawaWave => "kanagawa-wave",
            ThemeName::Parchment => "parchment",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeName::Default => "Default",
            ThemeName::KanagawaWave => "Kanagawa Wave",
            ThemeName::Parchment => "Parchment",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "kanagawa-wave" | "kanagawa_wave" | "kanagawa" => ThemeName::KanagawaWave,
            "parchment" | "light" => ThemeName::Parchment,
            _ => ThemeName::Default,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeName::Default => ThemeName::KanagawaWave,
            ThemeName::KanagawaWave => ThemeName::Parchment,
            ThemeName::Parchment => ThemeName::Default,
        }
    }
}

/// Theme struct that holds colors and provides style methods.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn new(name: ThemeName) -> Self {
        let colors = match name {
            ThemeName::Default => Self::default_colors(),
            ThemeName::KanagawaWave => Self::kanagawa_wave_colors(),
            ThemeName::Parchment => Self::parchment_colors(),
        };
        Self { name, colors }
    }

    pub fn from_name(name: &str) -> Self {
        Self::new(ThemeName::parse(name))
    }

    fn default_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(99, 102, 241),      // Indigo
            accent: Color::Rgb(56, 189, 248),       // Sky

            success: Color::Rgb(34, 197, 94),       // Green
            warning: Color::Rgb(250, 204, 21),      // Yellow
            error: Color::Rgb(239, 68, 68),         // Red

            bg_dark: Color::Rgb(15, 23, 42),        // Slate 900
            bg_elevated: Color::Rgb(51, 65, 85),    // Slate 700
            bg_highlight: Color::Rgb(71, 85, 105),  // Slate 600

            text: Color::Rgb(226, 232, 240),        // Slate 200
            text_muted: Color::Rgb(148, 163, 184),  // Slate 400
            text_dim: Color::Rgb(100, 116, 139),    // Slate 500

            status_not_started: Color::Rgb(148, 163, 184),
            status_in_progress: Color::Rgb(245, 158, 11), // Amber
            status_mastered: Color::Rgb(34, 197, 94),
        }
    }

    /// Kanagawa Wave theme - inspired by kanagawa.nvim
    fn kanagawa_wave_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(0x7E, 0x9C, 0xD8),      // crystalBlue
            accent: Color::Rgb(0xD2, 0x7E, 0x99),       // sakuraPink

            success: Color::Rgb(0x98, 0xBB, 0x6C),      // springGreen
            warning: Color::Rgb(0xFF, 0x9E, 0x3B),      // roninYellow
            error: Color::Rgb(0xE8, 0x24, 0x24),        // samuraiRed

            bg_dark: Color::Rgb(0x16, 0x16, 0x1D),      // sumiInk0
            bg_elevated: Color::Rgb(0x2A, 0x2A, 0x37),  // sumiInk2
            bg_highlight: Color::Rgb(0x36, 0x36, 0x46), // sumiInk3

            text: Color::Rgb(0xDC, 0xD7, 0xBA),         // fujiWhite
            text_muted: Color::Rgb(0xC8, 0xC0, 0x93),   // oldWhite
            text_dim: Color::Rgb(0x54, 0x54, 0x6D),     // sumiInk4

            status_not_started: Color::Rgb(0x72, 0x71, 0x69), // fujiGray
            status_in_progress: Color::Rgb(0xFF, 0x9E, 0x3B),
            status_mastered: Color::Rgb(0x98, 0xBB, 0x6C),
        }
    }

    /// Light theme for bright terminals.
    fn parchment_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(120, 53, 15),       // Amber 900
            accent: Color::Rgb(30, 64, 175),        // Blue 800

            success: Color::Rgb(21, 128, 61),       // Green 700
            warning: Color::Rgb(180, 83, 9),        // Amber 700
            error: Color::Rgb(185, 28, 28),         // Red 700

            bg_dark: Color::Rgb(253, 246, 227),
            bg_elevated: Color::Rgb(238, 226, 196),
            bg_highlight: Color::Rgb(227, 210, 168),

            text: Color::Rgb(41, 37, 36),           // Stone 800
            text_muted: Color::Rgb(87, 83, 78),     // Stone 600
            text_dim: Color::Rgb(168, 162, 158),    // Stone 400

            status_not_started: Color::Rgb(120, 113, 108),
            status_in_progress: Color::Rgb(180, 83, 9),
            status_mastered: Color::Rgb(21, 128, 61),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Styles
    // ══════════════════════════════════════════════════════════════════════

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.colors.text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.colors.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.colors.bg_highlight)
            .fg(self.colors.text)
    }

    pub fn card_front(&self) -> Style {
        Style::default()
            .fg(self.colors.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn card_back(&self) -> Style {
        Style::default()
            .fg(self.colors.success)
            .add_modifier(Modifier::BOLD)
    }

    pub fn stats_due(&self) -> Style {
        Style::default()
            .fg(self.colors.warning)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_text(&self) -> Style {
        Style::default()
            .fg(self.colors.error)
            .add_modifier(Modifier::BOLD)
    }

    pub fn blank(&self) -> Style {
        Style::default()
            .fg(self.colors.text)
            .bg(self.colors.bg_elevated)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn key_hint(&self) -> Style {
        Style::default()
            .fg(self.colors.text_dim)
    }

    pub fn key_highlight(&self) -> Style {
        Style::default()
            .fg(self.colors.accent)
            .add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeName::Default)
    }
}

pub mod icons {
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
    pub const FIRE: &str = "🔥";
    pub const BELL: &str = "🔔";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in [ThemeName::Default, ThemeName::KanagawaWave, ThemeName::Parchment] {
            assert_eq!(ThemeName::parse(name.as_str()), name);
        }
        assert_eq!(ThemeName::parse("nonsense"), ThemeName::Default);
    }

    #[test]
    fn cycling_returns_to_start() {
        let start = ThemeName::Default;
        assert_eq!(start.next().next().next(), start);
    }
}
