use iced::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn background(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.95, 0.96, 0.97),
            Theme::Dark => Color::from_rgb(0.09, 0.10, 0.12),
        }
    }

    pub fn surface(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(1.0, 1.0, 1.0),
            Theme::Dark => Color::from_rgb(0.15, 0.16, 0.19),
        }
    }

    /// Background of the output log.
    pub fn console(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.90, 0.91, 0.93),
            Theme::Dark => Color::from_rgb(0.05, 0.05, 0.06),
        }
    }

    pub fn text(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.08, 0.08, 0.10),
            Theme::Dark => Color::from_rgb(0.93, 0.94, 0.96),
        }
    }

    pub fn secondary_text(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.38, 0.40, 0.45),
            Theme::Dark => Color::from_rgb(0.65, 0.68, 0.72),
        }
    }

    // Arch blue
    pub fn primary(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.07, 0.50, 0.72),
            Theme::Dark => Color::from_rgb(0.09, 0.58, 0.82),
        }
    }

    pub fn success(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.15, 0.55, 0.25),
            Theme::Dark => Color::from_rgb(0.35, 0.80, 0.45),
        }
    }

    pub fn danger(&self) -> Color {
        match self {
            Theme::Light => Color::from_rgb(0.85, 0.20, 0.20),
            Theme::Dark => Color::from_rgb(1.0, 0.38, 0.38),
        }
    }
}
