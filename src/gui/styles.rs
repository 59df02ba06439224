use iced::widget::button::{Appearance as ButtonAppearance, StyleSheet as ButtonStyleSheet};
use iced::widget::container::{Appearance as ContainerAppearance, StyleSheet as ContainerStyleSheet};
use iced::widget::scrollable::{Appearance as ScrollableAppearance, StyleSheet as ScrollableStyleSheet};
use iced::widget::text_input::{Appearance as TextInputAppearance, StyleSheet as TextInputStyleSheet};
use iced::{Border, Color};

fn scale(color: Color, factor: f32) -> Color {
    Color {
        r: (color.r * factor).clamp(0.0, 1.0),
        g: (color.g * factor).clamp(0.0, 1.0),
        b: (color.b * factor).clamp(0.0, 1.0),
        a: color.a,
    }
}

pub struct ActionButtonStyle {
    pub radius: f32,
    /// Fill colour. `None` draws an outlined button.
    pub fill: Option<Color>,
    pub accent: Color,
    pub text_color: Color,
}

impl ButtonStyleSheet for ActionButtonStyle {
    type Style = iced::Theme;

    fn active(&self, _style: &Self::Style) -> ButtonAppearance {
        ButtonAppearance {
            background: self.fill.map(iced::Background::Color),
            border: Border {
                radius: self.radius.into(),
                width: if self.fill.is_some() { 0.0 } else { 1.5 },
                color: self.accent,
            },
            text_color: self.text_color,
            shadow: iced::Shadow {
                color: Color::from_rgba(0.0, 0.0, 0.0, 0.25),
                offset: iced::Vector::new(0.0, 2.0),
                blur_radius: 6.0,
            },
            shadow_offset: iced::Vector::default(),
        }
    }

    fn hovered(&self, style: &Self::Style) -> ButtonAppearance {
        let mut appearance = self.active(style);
        appearance.background = Some(iced::Background::Color(match self.fill {
            Some(fill) => scale(fill, 1.15),
            None => Color { a: 0.15, ..self.accent },
        }));
        appearance
    }

    fn pressed(&self, style: &Self::Style) -> ButtonAppearance {
        let mut appearance = self.active(style);
        if let Some(fill) = self.fill {
            appearance.background = Some(iced::Background::Color(scale(fill, 0.85)));
        }
        appearance.shadow = iced::Shadow::default();
        appearance
    }

    fn disabled(&self, style: &Self::Style) -> ButtonAppearance {
        let mut appearance = self.active(style);
        appearance.background = self
            .fill
            .map(|fill| iced::Background::Color(Color { a: 0.35, ..fill }));
        appearance.border.color = Color { a: 0.35, ..self.accent };
        appearance.text_color = Color { a: 0.45, ..self.text_color };
        appearance.shadow = iced::Shadow::default();
        appearance
    }
}

pub struct PanelStyle {
    pub radius: f32,
    pub background: Color,
    /// Coloured edge, used for the confirmation and notice banners.
    pub edge: Option<Color>,
}

impl ContainerStyleSheet for PanelStyle {
    type Style = iced::Theme;

    fn appearance(&self, _style: &Self::Style) -> ContainerAppearance {
        ContainerAppearance {
            background: Some(iced::Background::Color(self.background)),
            border: Border {
                radius: self.radius.into(),
                width: if self.edge.is_some() { 2.0 } else { 0.0 },
                color: self.edge.unwrap_or(Color::TRANSPARENT),
            },
            shadow: iced::Shadow {
                color: Color::from_rgba(0.0, 0.0, 0.0, 0.2),
                offset: iced::Vector::new(0.0, 3.0),
                blur_radius: 10.0,
            },
            text_color: None,
        }
    }
}

pub struct ThinScrollableStyle {
    pub accent: Color,
    pub radius: f32,
}

impl ThinScrollableStyle {
    fn with_scroller_alpha(&self, alpha: f32) -> ScrollableAppearance {
        ScrollableAppearance {
            container: ContainerAppearance::default(),
            scrollbar: iced::widget::scrollable::Scrollbar {
                background: None,
                border: Border::default(),
                scroller: iced::widget::scrollable::Scroller {
                    color: Color { a: alpha, ..self.accent },
                    border: Border {
                        radius: (self.radius * 0.5).into(),
                        width: 0.0,
                        color: Color::TRANSPARENT,
                    },
                },
            },
            gap: None,
        }
    }
}

impl ScrollableStyleSheet for ThinScrollableStyle {
    type Style = iced::Theme;

    fn active(&self, _style: &Self::Style) -> ScrollableAppearance {
        self.with_scroller_alpha(0.45)
    }

    fn hovered(&self, _style: &Self::Style, is_mouse_over_scrollbar: bool) -> ScrollableAppearance {
        self.with_scroller_alpha(if is_mouse_over_scrollbar { 0.85 } else { 0.6 })
    }

    fn dragging(&self, _style: &Self::Style) -> ScrollableAppearance {
        self.with_scroller_alpha(0.95)
    }
}

pub struct InputStyle {
    pub radius: f32,
    pub accent: Color,
    pub background: Color,
    pub text_color: Color,
}

impl TextInputStyleSheet for InputStyle {
    type Style = iced::Theme;

    fn active(&self, _style: &Self::Style) -> TextInputAppearance {
        TextInputAppearance {
            background: iced::Background::Color(self.background),
            border: Border {
                radius: self.radius.into(),
                width: 1.0,
                color: Color { a: 0.6, ..self.accent },
            },
            icon_color: self.text_color,
        }
    }

    fn focused(&self, style: &Self::Style) -> TextInputAppearance {
        let mut appearance = self.active(style);
        appearance.border.width = 2.0;
        appearance.border.color = self.accent;
        appearance
    }

    fn placeholder_color(&self, _style: &Self::Style) -> Color {
        Color { a: 0.45, ..self.text_color }
    }

    fn value_color(&self, _style: &Self::Style) -> Color {
        self.text_color
    }

    fn disabled_color(&self, _style: &Self::Style) -> Color {
        Color { a: 0.4, ..self.text_color }
    }

    fn selection_color(&self, _style: &Self::Style) -> Color {
        Color { a: 0.35, ..self.accent }
    }

    fn disabled(&self, style: &Self::Style) -> TextInputAppearance {
        let mut appearance = self.active(style);
        appearance.border.color = Color { a: 0.3, ..self.accent };
        appearance
    }
}
