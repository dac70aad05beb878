use ratatui::style::{Color, Modifier, Style};

use crate::state::corp::ProjectStatus;
use crate::state::message::Theme;
use crate::state::traits::TraitName;

/// Colours for one theme. Both TUIs draw everything through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub panel: Color,
    pub fg: Color,
    pub muted: Color,
    pub border: Color,
    pub accent: Color,
    pub user: Color,
    pub ai: Color,
    pub system: Color,
    pub correction: Color,
    pub meta: Color,
    pub code_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                bg: Color::Rgb(243, 244, 246),
                panel: Color::Rgb(255, 255, 255),
                fg: Color::Rgb(31, 41, 55),
                muted: Color::Rgb(107, 114, 128),
                border: Color::Rgb(209, 213, 219),
                accent: c_brand(),
                user: Color::Rgb(79, 70, 229),
                ai: Color::Rgb(31, 41, 55),
                system: Color::Rgb(185, 28, 28),
                correction: Color::Rgb(180, 83, 9),
                meta: Color::Rgb(109, 40, 217),
                code_bg: Color::Rgb(229, 231, 235),
            },
            Theme::Dark => Self {
                bg: Color::Rgb(17, 24, 39),
                panel: Color::Rgb(31, 41, 55),
                fg: Color::Rgb(243, 244, 246),
                muted: Color::Rgb(156, 163, 175),
                border: Color::Rgb(55, 65, 81),
                accent: Color::Rgb(129, 140, 248),
                user: Color::Rgb(165, 180, 252),
                ai: Color::Rgb(229, 231, 235),
                system: Color::Rgb(248, 113, 113),
                correction: Color::Rgb(251, 191, 36),
                meta: Color::Rgb(196, 181, 253),
                code_bg: Color::Rgb(3, 7, 18),
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn panel(&self) -> Style {
        Style::default().fg(self.fg).bg(self.panel)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn code(&self) -> Style {
        Style::default().fg(self.fg).bg(self.code_bg)
    }
}

pub fn c_brand() -> Color {
    Color::Rgb(99, 102, 241)
}

pub fn c_ok() -> Color {
    Color::Rgb(22, 163, 74)
}

pub fn c_warn() -> Color {
    Color::Rgb(245, 158, 11)
}

pub fn c_err() -> Color {
    Color::Rgb(220, 38, 38)
}

pub fn c_money() -> Color {
    Color::Rgb(16, 185, 129)
}

pub fn trait_color(name: TraitName) -> Color {
    match name {
        TraitName::Logic => Color::Rgb(59, 130, 246),
        TraitName::Creativity => Color::Rgb(139, 92, 246),
        TraitName::Memory => Color::Rgb(245, 158, 11),
        TraitName::Adaptability => Color::Rgb(34, 197, 94),
        TraitName::Ethics => Color::Rgb(236, 72, 153),
    }
}

/// Icon and colour for a project status.
pub fn project_status_icon(status: ProjectStatus) -> (&'static str, Color) {
    match status {
        ProjectStatus::Initiated => ("◌", c_brand()),
        ProjectStatus::InProgress => ("◐", c_warn()),
        ProjectStatus::GeneratingRevenue => ("$", c_money()),
        ProjectStatus::Completed => ("✓", c_ok()),
        ProjectStatus::Stalled => ("!", c_err()),
    }
}

/// Usage bar colour: green, amber past 60%, red past 85%.
pub fn load_color(percent: f64) -> Color {
    if percent > 85.0 {
        c_err()
    } else if percent > 60.0 {
        c_warn()
    } else {
        c_ok()
    }
}
