//! Theme tokens and the `NO_COLOR` accessibility hook for dashboard rendering.

#![allow(missing_docs)]

use std::env;
use std::fmt;

use crossterm::style::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Color output mode for compatibility with `NO_COLOR` and terminal policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Enabled,
    Disabled,
}

/// Accessibility knobs consumed by the frame painter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessibilityProfile {
    pub color: ColorMode,
}

impl Default for AccessibilityProfile {
    fn default() -> Self {
        Self {
            color: ColorMode::Enabled,
        }
    }
}

impl AccessibilityProfile {
    #[must_use]
    pub const fn from_no_color_flag(no_color: bool) -> Self {
        Self {
            color: if no_color {
                ColorMode::Disabled
            } else {
                ColorMode::Enabled
            },
        }
    }

    #[must_use]
    pub fn from_environment() -> Self {
        Self::from_no_color_flag(env::var_os("NO_COLOR").is_some())
    }

    #[must_use]
    pub const fn no_color(self) -> bool {
        matches!(self.color, ColorMode::Disabled)
    }
}

/// Named palette selectable from config, env, CLI, or the `t` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    /// Resolve a theme name; anything unrecognised falls back to dark.
    #[must_use]
    pub fn from_name(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            _ => Self::Dark,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ThemeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ThemeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_name(&raw))
    }
}

/// Semantic color slot for a rendered cell, independent of concrete colors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tone {
    #[default]
    Normal,
    Primary,
    Secondary,
    Success,
    Warning,
    Error,
    Muted,
    Border,
    BorderFocused,
    P10,
    P50,
    P90,
}

/// Concrete colors for every [`Tone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
}

impl ThemePalette {
    #[must_use]
    pub const fn dark() -> Self {
        Self {
            primary: Color::AnsiValue(39),
            secondary: Color::AnsiValue(205),
            success: Color::AnsiValue(42),
            warning: Color::AnsiValue(220),
            error: Color::AnsiValue(196),
            muted: Color::AnsiValue(241),
            foreground: Color::AnsiValue(252),
            border: Color::AnsiValue(241),
            border_focused: Color::AnsiValue(39),
        }
    }

    #[must_use]
    pub const fn light() -> Self {
        Self {
            primary: Color::AnsiValue(27),
            secondary: Color::AnsiValue(162),
            success: Color::AnsiValue(34),
            warning: Color::AnsiValue(172),
            error: Color::AnsiValue(160),
            muted: Color::AnsiValue(240),
            foreground: Color::AnsiValue(235),
            border: Color::AnsiValue(240),
            border_focused: Color::AnsiValue(27),
        }
    }

    #[must_use]
    pub const fn for_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Quantile bands reuse the status colors: p10 muted, p50 primary,
    /// p90 warning.
    #[must_use]
    pub const fn color(self, tone: Tone) -> Color {
        match tone {
            Tone::Normal => self.foreground,
            Tone::Primary | Tone::P50 => self.primary,
            Tone::Secondary => self.secondary,
            Tone::Success => self.success,
            Tone::Warning | Tone::P90 => self.warning,
            Tone::Error => self.error,
            Tone::Muted | Tone::P10 => self.muted,
            Tone::Border => self.border,
            Tone::BorderFocused => self.border_focused,
        }
    }
}

/// Full render theme (palette + accessibility profile).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: ThemeName,
    pub palette: ThemePalette,
    pub accessibility: AccessibilityProfile,
}

impl Theme {
    #[must_use]
    pub const fn new(name: ThemeName, accessibility: AccessibilityProfile) -> Self {
        Self {
            name,
            palette: ThemePalette::for_name(name),
            accessibility,
        }
    }

    /// Foreground for `tone`, or `None` when colors are disabled.
    #[must_use]
    pub const fn foreground(self, tone: Tone) -> Option<Color> {
        if self.accessibility.no_color() {
            None
        } else {
            Some(self.palette.color(tone))
        }
    }
}
