use iced::{
    alignment, executor,
    widget::{button, column, container, row, scrollable, text, text_input, Space},
    Application, Color, Command, Element, Length, Padding, Pixels, Settings, Theme as IcedTheme,
};
use std::path::PathBuf;

use crate::config::Config;
use crate::controller::{Controller, Effect, NoticeKind, Query};
use crate::package::LOCAL_PACKAGE_SUFFIX;
use crate::probe::HostProbe;
use crate::runner::{self, Captured, RunEvent};

mod styles;
mod theme;

use styles::{ActionButtonStyle, InputStyle, PanelStyle, ThinScrollableStyle};
use theme::Theme as AppTheme;

/// Rendering every `pacman -Ss` row at once makes the list sluggish.
const MAX_LISTED: usize = 500;

fn find_window_icon() -> Option<PathBuf> {
    let candidates = [
        "/usr/share/pixmaps/archlinux-logo.png",
        "/usr/share/icons/hicolor/48x48/apps/system-software-install.png",
        "icon.png",
    ];
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

pub fn run(config: Config) -> iced::Result {
    let mut window_settings = iced::window::Settings {
        size: iced::Size::new(1000.0, 760.0),
        resizable: true,
        min_size: Some(iced::Size::new(720.0, 560.0)),
        ..Default::default()
    };

    if let Some(icon_path) = find_window_icon() {
        match iced::window::icon::from_file(&icon_path) {
            Ok(icon) => window_settings.icon = Some(icon),
            Err(e) => log::warn!("Could not load window icon {}: {}", icon_path.display(), e),
        }
    }

    log::debug!("Starting GUI");
    <PackageInstallerGui as Application>::run(Settings {
        window: window_settings,
        flags: config,
        default_text_size: Pixels(14.0),
        antialiasing: true,
        id: None,
        fonts: Vec::new(),
        default_font: iced::Font::DEFAULT,
    })
}

#[derive(Debug, Clone)]
pub enum Message {
    InputChanged(String),
    FilterChanged(String),
    ReloadPackages,
    PackagesLoaded(Result<Captured, String>),
    SelectPackage(String),
    DetailsLoaded(String, Result<Captured, String>),
    Install,
    Remove,
    SolveProblem,
    Browse,
    BrowseSelected(Option<PathBuf>),
    ConfirmAccepted,
    ConfirmDeclined,
    Run(RunEvent),
    DismissNotice,
    ThemeToggled,
    Exit,
}

#[derive(Debug)]
pub struct PackageInstallerGui {
    controller: Controller,
    probe: HostProbe,
    theme: AppTheme,
    border_radius: f32,
}

impl Application for PackageInstallerGui {
    type Message = Message;
    type Theme = IcedTheme;
    type Executor = executor::Default;
    type Flags = Config;

    fn new(config: Config) -> (Self, Command<Message>) {
        let probe = HostProbe::new(&config.pacman_binary);
        let mut controller = Controller::new(config);
        let initial_load = controller.request_packages();

        let gui = PackageInstallerGui {
            controller,
            probe,
            theme: AppTheme::Dark,
            border_radius: 10.0,
        };
        (gui, dispatch(initial_load))
    }

    fn title(&self) -> String {
        match self.controller.running() {
            Some(op) => format!("Package Installer - {}", op),
            None => String::from("Package Installer"),
        }
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::InputChanged(input) => {
                self.controller.set_input(input);
                Command::none()
            }
            Message::FilterChanged(filter) => {
                self.controller.set_filter(filter);
                Command::none()
            }
            Message::ReloadPackages => dispatch(self.controller.request_packages()),
            Message::PackagesLoaded(result) => {
                self.controller.on_packages_loaded(result);
                Command::none()
            }
            Message::SelectPackage(name) => dispatch(self.controller.select_package(name)),
            Message::DetailsLoaded(name, result) => {
                self.controller.on_details_loaded(&name, result);
                Command::none()
            }
            Message::Install => {
                if let Err(e) = self.controller.request_install() {
                    self.controller.report(&e);
                }
                Command::none()
            }
            Message::Remove => {
                if let Err(e) = self.controller.request_remove() {
                    self.controller.report(&e);
                }
                Command::none()
            }
            Message::SolveProblem => {
                if let Err(e) = self.controller.request_unlock() {
                    self.controller.report(&e);
                }
                Command::none()
            }
            Message::Browse => Command::perform(pick_package_file(), Message::BrowseSelected),
            Message::BrowseSelected(selection) => {
                if let Some(path) = selection {
                    self.controller.set_input(path.display().to_string());
                }
                Command::none()
            }
            Message::ConfirmAccepted => match self.controller.confirm(&self.probe) {
                Ok(effect) => dispatch(effect),
                Err(e) => {
                    self.controller.report(&e);
                    Command::none()
                }
            },
            Message::ConfirmDeclined => {
                self.controller.decline();
                Command::none()
            }
            Message::Run(event) => match self.controller.on_run_event(event) {
                Some(effect) => dispatch(effect),
                None => Command::none(),
            },
            Message::DismissNotice => {
                self.controller.dismiss_notice();
                Command::none()
            }
            Message::ThemeToggled => {
                self.theme = self.theme.toggled();
                Command::none()
            }
            Message::Exit => iced::window::close(iced::window::Id::MAIN),
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let theme = self.theme;

        let mut main = column![self.view_header(), self.view_input()]
            .spacing(14)
            .padding(Padding::new(20.0));

        if let Some(prompt) = self.controller.pending_prompt() {
            main = main.push(self.view_confirmation(prompt));
        }
        if let Some(banner) = self.view_notice() {
            main = main.push(banner);
        }

        main = main.push(
            row![self.view_package_list(), self.view_details()]
                .spacing(14)
                .height(Length::FillPortion(3)),
        );
        main = main.push(self.view_output());

        container(main)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(iced::theme::Container::Custom(Box::new(PanelStyle {
                radius: 0.0,
                background: theme.background(),
                edge: None,
            })))
            .into()
    }

    fn theme(&self) -> IcedTheme {
        match self.theme {
            AppTheme::Light => IcedTheme::Light,
            AppTheme::Dark => IcedTheme::Dark,
        }
    }
}

impl PackageInstallerGui {
    fn view_header(&self) -> Element<'_, Message> {
        let theme = self.theme;
        let status = match self.controller.running() {
            Some(op) => format!("Running: {}...", op),
            None if self.controller.is_loading_packages() => "Loading packages...".to_string(),
            None => String::new(),
        };

        row![
            text("Package Installer")
                .size(22)
                .style(iced::theme::Text::Color(theme.primary())),
            Space::with_width(Length::Fixed(16.0)),
            text(status)
                .size(13)
                .style(iced::theme::Text::Color(theme.secondary_text())),
            Space::with_width(Length::Fill),
            self.action_button(
                if theme == AppTheme::Dark { "Light" } else { "Dark" },
                Some(Message::ThemeToggled),
                false,
            ),
            self.action_button("Exit", Some(Message::Exit), false),
        ]
        .spacing(8)
        .align_items(alignment::Alignment::Center)
        .into()
    }

    fn view_input(&self) -> Element<'_, Message> {
        let theme = self.theme;
        let idle = !self.controller.is_busy();
        let when_idle = |message: Message| if idle { Some(message) } else { None };

        container(
            column![
                text("Enter package name or path:")
                    .size(14)
                    .style(iced::theme::Text::Color(theme.secondary_text())),
                text_input("e.g. vim or /path/to/package.pkg.tar.zst", self.controller.input())
                    .on_input(Message::InputChanged)
                    .padding(Padding::new(10.0))
                    .width(Length::Fill)
                    .style(iced::theme::TextInput::Custom(Box::new(self.input_style()))),
                row![
                    self.action_button("Browse", Some(Message::Browse), false),
                    self.action_button("Install", when_idle(Message::Install), true),
                    self.action_button("Remove", when_idle(Message::Remove), true),
                    Space::with_width(Length::Fill),
                    self.action_button("Solve Problem", when_idle(Message::SolveProblem), false),
                ]
                .spacing(8)
                .align_items(alignment::Alignment::Center),
            ]
            .spacing(10),
        )
        .width(Length::Fill)
        .padding(Padding::new(16.0))
        .style(iced::theme::Container::Custom(Box::new(self.panel_style(None))))
        .into()
    }

    fn view_confirmation(&self, prompt: String) -> Element<'_, Message> {
        let theme = self.theme;
        container(
            column![
                text("Confirm Action")
                    .size(16)
                    .style(iced::theme::Text::Color(theme.primary())),
                text(prompt)
                    .size(14)
                    .style(iced::theme::Text::Color(theme.text())),
                row![
                    Space::with_width(Length::Fill),
                    self.action_button("No", Some(Message::ConfirmDeclined), false),
                    self.action_button("Yes", Some(Message::ConfirmAccepted), true),
                ]
                .spacing(8),
            ]
            .spacing(8),
        )
        .width(Length::Fill)
        .padding(Padding::new(14.0))
        .style(iced::theme::Container::Custom(Box::new(
            self.panel_style(Some(theme.primary())),
        )))
        .into()
    }

    fn view_notice(&self) -> Option<Element<'_, Message>> {
        let theme = self.theme;
        let notice = self.controller.notice()?;
        let accent = match notice.kind {
            NoticeKind::Success => theme.success(),
            NoticeKind::Error => theme.danger(),
        };

        Some(
            container(
                row![
                    column![
                        text(&notice.title)
                            .size(16)
                            .style(iced::theme::Text::Color(accent)),
                        text(&notice.body)
                            .size(14)
                            .style(iced::theme::Text::Color(theme.text())),
                    ]
                    .spacing(4)
                    .width(Length::Fill),
                    self.action_button("OK", Some(Message::DismissNotice), false),
                ]
                .spacing(12)
                .align_items(alignment::Alignment::Center),
            )
            .width(Length::Fill)
            .padding(Padding::new(14.0))
            .style(iced::theme::Container::Custom(Box::new(self.panel_style(Some(accent)))))
            .into(),
        )
    }

    fn view_package_list(&self) -> Element<'_, Message> {
        let theme = self.theme;
        let visible: Vec<_> = self.controller.visible_packages().collect();
        let total = visible.len();

        let rows: Vec<Element<'_, Message>> = visible
            .into_iter()
            .take(MAX_LISTED)
            .map(|pkg| {
                let is_selected = self.controller.selected() == Some(pkg.name.as_str());
                let label = if pkg.installed {
                    format!("{} {} [installed]", pkg.qualified_name(), pkg.version)
                } else {
                    format!("{} {}", pkg.qualified_name(), pkg.version)
                };
                button(
                    text(label)
                        .size(13)
                        .style(iced::theme::Text::Color(if is_selected {
                            Color::WHITE
                        } else {
                            theme.text()
                        })),
                )
                .width(Length::Fill)
                .padding(Padding::new(6.0))
                .on_press(Message::SelectPackage(pkg.name.clone()))
                .style(iced::theme::Button::Custom(Box::new(ActionButtonStyle {
                    radius: 6.0,
                    fill: if is_selected {
                        Some(theme.primary())
                    } else {
                        Some(Color::TRANSPARENT)
                    },
                    accent: theme.primary(),
                    text_color: theme.text(),
                })))
                .into()
            })
            .collect();

        let available = self.controller.packages().len();
        let footer = if total > MAX_LISTED {
            format!("Showing {} of {} matches, refine the filter to see more", MAX_LISTED, total)
        } else if total < available {
            format!("{} of {} packages", total, available)
        } else {
            format!("{} packages", total)
        };

        container(
            column![
                row![
                    text("Available Packages:")
                        .size(14)
                        .style(iced::theme::Text::Color(theme.secondary_text())),
                    Space::with_width(Length::Fill),
                    self.action_button(
                        "Reload",
                        (!self.controller.is_loading_packages()).then_some(Message::ReloadPackages),
                        false,
                    ),
                ]
                .align_items(alignment::Alignment::Center),
                text_input("Filter...", self.controller.filter())
                    .on_input(Message::FilterChanged)
                    .padding(Padding::new(8.0))
                    .style(iced::theme::TextInput::Custom(Box::new(self.input_style()))),
                scrollable(column(rows).spacing(2).padding(4))
                    .height(Length::Fill)
                    .style(iced::theme::Scrollable::Custom(Box::new(self.scrollable_style()))),
                text(footer)
                    .size(12)
                    .style(iced::theme::Text::Color(theme.secondary_text())),
            ]
            .spacing(8),
        )
        .width(Length::FillPortion(2))
        .height(Length::Fill)
        .padding(Padding::new(12.0))
        .style(iced::theme::Container::Custom(Box::new(self.panel_style(None))))
        .into()
    }

    fn view_details(&self) -> Element<'_, Message> {
        let theme = self.theme;
        let details = if self.controller.details().is_empty() {
            "Select a package to see its details."
        } else {
            self.controller.details()
        };

        container(
            column![
                text("Package Details:")
                    .size(14)
                    .style(iced::theme::Text::Color(theme.secondary_text())),
                scrollable(
                    text(details)
                        .size(13)
                        .font(iced::Font::MONOSPACE)
                        .style(iced::theme::Text::Color(theme.text()))
                        .width(Length::Fill),
                )
                .height(Length::Fill)
                .style(iced::theme::Scrollable::Custom(Box::new(self.scrollable_style()))),
            ]
            .spacing(8),
        )
        .width(Length::FillPortion(3))
        .height(Length::Fill)
        .padding(Padding::new(12.0))
        .style(iced::theme::Container::Custom(Box::new(self.panel_style(None))))
        .into()
    }

    fn view_output(&self) -> Element<'_, Message> {
        let theme = self.theme;

        container(
            column![
                text("Terminal Output:")
                    .size(14)
                    .style(iced::theme::Text::Color(theme.secondary_text())),
                container(
                    scrollable(
                        text(self.controller.log().join("\n"))
                            .size(12)
                            .font(iced::Font::MONOSPACE)
                            .style(iced::theme::Text::Color(theme.text()))
                            .width(Length::Fill),
                    )
                    .height(Length::Fill)
                    .style(iced::theme::Scrollable::Custom(Box::new(self.scrollable_style()))),
                )
                .padding(Padding::new(8.0))
                .height(Length::Fill)
                .style(iced::theme::Container::Custom(Box::new(PanelStyle {
                    radius: self.border_radius,
                    background: theme.console(),
                    edge: None,
                }))),
            ]
            .spacing(8),
        )
        .width(Length::Fill)
        .height(Length::FillPortion(2))
        .padding(Padding::new(12.0))
        .style(iced::theme::Container::Custom(Box::new(self.panel_style(None))))
        .into()
    }

    fn action_button<'a>(
        &self,
        label: &'a str,
        on_press: Option<Message>,
        primary: bool,
    ) -> Element<'a, Message> {
        let theme = self.theme;
        let mut btn = button(text(label).size(14))
            .padding(Padding::from([8.0, 14.0]))
            .style(iced::theme::Button::Custom(Box::new(ActionButtonStyle {
                radius: self.border_radius,
                fill: primary.then(|| theme.primary()),
                accent: theme.primary(),
                text_color: if primary { Color::WHITE } else { theme.text() },
            })));
        if let Some(message) = on_press {
            btn = btn.on_press(message);
        }
        btn.into()
    }

    fn panel_style(&self, edge: Option<Color>) -> PanelStyle {
        PanelStyle {
            radius: self.border_radius,
            background: self.theme.surface(),
            edge,
        }
    }

    fn input_style(&self) -> InputStyle {
        InputStyle {
            radius: self.border_radius,
            accent: self.theme.primary(),
            background: self.theme.background(),
            text_color: self.theme.text(),
        }
    }

    fn scrollable_style(&self) -> ThinScrollableStyle {
        ThinScrollableStyle {
            accent: self.theme.primary(),
            radius: self.border_radius,
        }
    }
}

/// Turns a controller effect into work for the iced executor.
fn dispatch(effect: Effect) -> Command<Message> {
    match effect {
        Effect::Capture(Query::Packages, command) => Command::perform(
            async move { runner::capture(command).await.map_err(|e| e.to_string()) },
            Message::PackagesLoaded,
        ),
        Effect::Capture(Query::Details(name), command) => Command::perform(
            async move {
                let result = runner::capture(command).await.map_err(|e| e.to_string());
                (name, result)
            },
            |(name, result)| Message::DetailsLoaded(name, result),
        ),
        Effect::Stream(command) => Command::run(runner::stream(&command), Message::Run),
    }
}

async fn pick_package_file() -> Option<PathBuf> {
    let extension = LOCAL_PACKAGE_SUFFIX.trim_start_matches('.');
    rfd::AsyncFileDialog::new()
        .set_title("Select Package File")
        .add_filter("Package Files", &[extension])
        .add_filter("All Files", &["*"])
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}
