//! Catppuccin palettes (mocha and latte) and the styles the explorer draws with.

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    #[default]
    Mocha, // dark
    Latte, // light
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub mauve: Color,
    pub red: Color,
    pub peach: Color,
    pub yellow: Color,
    pub green: Color,
    pub teal: Color,
    pub sky: Color,
    pub blue: Color,
    pub lavender: Color,
    pub text: Color,
    pub subtext0: Color,
    pub overlay1: Color,
    pub overlay0: Color,
    pub surface1: Color,
    pub surface0: Color,
    pub base: Color,
    pub mantle: Color,
}

impl Theme {
    pub fn new(variant: ThemeVariant) -> Self {
        match variant {
            ThemeVariant::Mocha => Self::mocha(),
            ThemeVariant::Latte => Self::latte(),
        }
    }

    fn mocha() -> Self {
        Self {
            mauve: Color::Rgb(0xcb, 0xa6, 0xf7),
            red: Color::Rgb(0xf3, 0x8b, 0xa8),
            peach: Color::Rgb(0xfa, 0xb3, 0x87),
            yellow: Color::Rgb(0xf9, 0xe2, 0xaf),
            green: Color::Rgb(0xa6, 0xe3, 0xa1),
            teal: Color::Rgb(0x94, 0xe2, 0xd5),
            sky: Color::Rgb(0x89, 0xdc, 0xeb),
            blue: Color::Rgb(0x89, 0xb4, 0xfa),
            lavender: Color::Rgb(0xb4, 0xbe, 0xfe),
            text: Color::Rgb(0xcd, 0xd6, 0xf4),
            subtext0: Color::Rgb(0xa6, 0xad, 0xc8),
            overlay1: Color::Rgb(0x7f, 0x84, 0x9c),
            overlay0: Color::Rgb(0x6c, 0x70, 0x86),
            surface1: Color::Rgb(0x45, 0x47, 0x5a),
            surface0: Color::Rgb(0x31, 0x32, 0x44),
            base: Color::Rgb(0x1e, 0x1e, 0x2e),
            mantle: Color::Rgb(0x18, 0x18, 0x25),
        }
    }

    fn latte() -> Self {
        Self {
            mauve: Color::Rgb(0x88, 0x39, 0xef),
            red: Color::Rgb(0xd2, 0x0f, 0x39),
            peach: Color::Rgb(0xfe, 0x64, 0x0b),
            yellow: Color::Rgb(0xdf, 0x8e, 0x1d),
            green: Color::Rgb(0x40, 0xa0, 0x2b),
            teal: Color::Rgb(0x17, 0x92, 0x99),
            sky: Color::Rgb(0x04, 0xa5, 0xe5),
            blue: Color::Rgb(0x1e, 0x66, 0xf5),
            lavender: Color::Rgb(0x72, 0x87, 0xfd),
            text: Color::Rgb(0x4c, 0x4f, 0x69),
            subtext0: Color::Rgb(0x6c, 0x6f, 0x85),
            overlay1: Color::Rgb(0x8c, 0x8f, 0xa1),
            overlay0: Color::Rgb(0x9c, 0xa0, 0xb0),
            surface1: Color::Rgb(0xbc, 0xc0, 0xcc),
            surface0: Color::Rgb(0xcc, 0xd0, 0xda),
            base: Color::Rgb(0xef, 0xf1, 0xf5),
            mantle: Color::Rgb(0xe6, 0xe9, 0xef),
        }
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.red)
    }

    pub fn success_style(&self) -> Style {
        Style::default().fg(self.green)
    }

    pub fn info_style(&self) -> Style {
        Style::default().fg(self.teal)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.blue).add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.lavender)
        } else {
            Style::default().fg(self.overlay0)
        }
    }

    pub fn selected_style(&self) -> Style {
        Style::default().bg(self.surface1).fg(self.text).add_modifier(Modifier::BOLD)
    }

    pub fn gate_style(&self) -> Style {
        Style::default().fg(self.mauve)
    }

    pub fn event_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    /// Undefined events and `n/a` cells
    pub fn placeholder_style(&self) -> Style {
        Style::default().fg(self.overlay1).add_modifier(Modifier::ITALIC)
    }

    pub fn transfer_style(&self) -> Style {
        Style::default().fg(self.peach)
    }

    pub fn key_style(&self) -> Style {
        Style::default().fg(self.blue).add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeVariant::default())
    }
}
