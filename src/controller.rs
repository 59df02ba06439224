//! Interactive state and the rules that turn user actions into commands.
//!
//! The controller never runs anything itself. Every action that needs a
//! process returns an [`Effect`]; the caller executes it and feeds the
//! results back through `on_*` methods.

use std::fmt;

use crate::config::Config;
use crate::error::{InstallerError, Result};
use crate::package::{parse_search_output, PackageEntry, PackageRef};
use crate::pacman::{PacmanCommand, PacmanCommands};
use crate::probe::SystemProbe;
use crate::runner::{Captured, RunEvent};

pub const SUCCESS_MESSAGE: &str = "Operation completed successfully!";
pub const FAILURE_MESSAGE: &str = "Operation failed. Please check the output for details.";

/// A privileged action that goes through the confirmation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install(PackageRef),
    Remove(String),
    Unlock,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install(package) => write!(f, "install {}", package),
            Operation::Remove(name) => write!(f, "remove {}", name),
            Operation::Unlock => write!(f, "remove lock file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Packages,
    Details(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run to completion and report through `on_packages_loaded` / `on_details_loaded`.
    Capture(Query, PacmanCommand),
    /// Stream output through `on_run_event`.
    Stream(PacmanCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub body: String,
}

impl Notice {
    fn success(body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            body: body.into(),
        }
    }

    fn error(body: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            body: body.into(),
        }
    }
}

#[derive(Debug)]
pub struct Controller {
    commands: PacmanCommands,
    input: String,
    filter: String,
    packages: Vec<PackageEntry>,
    loading_packages: bool,
    selected: Option<String>,
    details: String,
    log: Vec<String>,
    pending: Option<Operation>,
    running: Option<Operation>,
    notice: Option<Notice>,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self {
            commands: PacmanCommands::new(config),
            input: String::new(),
            filter: String::new(),
            packages: Vec::new(),
            loading_packages: false,
            selected: None,
            details: String::new(),
            log: Vec::new(),
            pending: None,
            running: None,
            notice: None,
        }
    }

    pub fn config(&self) -> &Config {
        self.commands.config()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn packages(&self) -> &[PackageEntry] {
        &self.packages
    }

    /// Entries whose name contains the filter, ignoring case.
    pub fn visible_packages(&self) -> impl Iterator<Item = &PackageEntry> {
        let needle = self.filter.trim().to_lowercase();
        self.packages
            .iter()
            .filter(move |pkg| needle.is_empty() || pkg.name.to_lowercase().contains(&needle))
    }

    pub fn is_loading_packages(&self) -> bool {
        self.loading_packages
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn running(&self) -> Option<&Operation> {
        self.running.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    /// The yes/no question for the operation awaiting confirmation.
    pub fn pending_prompt(&self) -> Option<String> {
        self.pending.as_ref().map(|op| self.prompt_for(op))
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Shows `error` as a modal notice.
    pub fn report(&mut self, error: &InstallerError) {
        log::warn!("{}", error);
        self.notice = Some(Notice::error(error.to_string()));
    }

    pub fn request_packages(&mut self) -> Effect {
        self.loading_packages = true;
        Effect::Capture(Query::Packages, self.commands.search_all())
    }

    pub fn on_packages_loaded(&mut self, result: std::result::Result<Captured, String>) {
        self.loading_packages = false;
        match result {
            Ok(captured) if captured.success() => {
                self.packages = parse_search_output(&captured.stdout);
                log::debug!("Loaded {} packages", self.packages.len());
            }
            Ok(captured) => {
                self.notice = Some(Notice::error(format!(
                    "Failed to load packages: {}",
                    captured.stderr.trim()
                )));
            }
            Err(message) => {
                self.notice = Some(Notice::error(format!(
                    "Failed to load packages: {}",
                    message
                )));
            }
        }
    }

    pub fn select_package(&mut self, name: impl Into<String>) -> Effect {
        let name = name.into();
        let command = self.commands.query_info(&name);
        self.selected = Some(name.clone());
        Effect::Capture(Query::Details(name), command)
    }

    pub fn on_details_loaded(&mut self, name: &str, result: std::result::Result<Captured, String>) {
        if self.selected.as_deref() != Some(name) {
            log::debug!("Dropping stale details for {}", name);
            return;
        }
        self.details = match result {
            Ok(captured) if captured.success() => captured.stdout,
            Ok(captured) => format!(
                "Failed to retrieve package details: {}",
                captured.stderr.trim()
            ),
            Err(message) => format!("Failed to retrieve package details: {}", message),
        };
    }

    pub fn request_install(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let package = PackageRef::parse(&self.input).ok_or(InstallerError::EmptyInput)?;
        reject_option_like(&package.target())?;
        self.pending = Some(Operation::Install(package));
        Ok(())
    }

    pub fn request_remove(&mut self) -> Result<()> {
        self.ensure_idle()?;
        let name = self.input.trim();
        if name.is_empty() {
            return Err(InstallerError::EmptyInput);
        }
        reject_option_like(name)?;
        self.pending = Some(Operation::Remove(name.to_string()));
        Ok(())
    }

    /// Queues lock-file removal. The input field plays no part.
    pub fn request_unlock(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.pending = Some(Operation::Unlock);
        Ok(())
    }

    pub fn decline(&mut self) {
        if let Some(op) = self.pending.take() {
            log::info!("Declined: {}", op);
        }
    }

    /// Accepts the pending prompt. On success the returned command must be streamed.
    pub fn confirm(&mut self, probe: &dyn SystemProbe) -> Result<Effect> {
        self.ensure_idle()?;
        let op = self.pending.take().ok_or(InstallerError::NothingToConfirm)?;

        let command = match &op {
            Operation::Install(package) => {
                if let PackageRef::Local(path) = package {
                    if !probe.is_file(path) {
                        return Err(InstallerError::MissingLocalPackage(path.clone()));
                    }
                }
                self.commands.install(package)
            }
            Operation::Remove(name) => self.commands.remove(name),
            Operation::Unlock => {
                if probe.package_manager_running() {
                    return Err(InstallerError::PackageManagerRunning(
                        self.config().lock_file.clone(),
                    ));
                }
                self.commands.unlock()
            }
        };

        log::info!("Running {}: {}", op, command);
        self.log.clear();
        self.log.push(format!("$ {}", command));
        self.notice = None;
        self.running = Some(op);
        Ok(Effect::Stream(command))
    }

    /// Folds one runner event into the log. Returns the reload effect after a success.
    pub fn on_run_event(&mut self, event: RunEvent) -> Option<Effect> {
        if self.running.is_none() {
            log::debug!("Ignoring event with nothing running: {:?}", event);
            return None;
        }

        match event {
            RunEvent::Line(line) => {
                self.log.push(line);
                None
            }
            RunEvent::SpawnFailed(message) => {
                self.running = None;
                self.log.push(message.clone());
                self.notice = Some(Notice::error(message));
                None
            }
            RunEvent::Exited(0) => {
                if let Some(op) = self.running.take() {
                    log::info!("Finished: {}", op);
                }
                self.notice = Some(Notice::success(SUCCESS_MESSAGE));
                Some(self.request_packages())
            }
            RunEvent::Exited(status) => {
                if let Some(op) = self.running.take() {
                    log::warn!("{} failed with exit status {}", op, status);
                }
                self.log.push(format!("Exit status: {}", status));
                self.notice = Some(Notice::error(FAILURE_MESSAGE));
                None
            }
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        match &self.running {
            Some(op) => Err(InstallerError::Busy(op.clone())),
            None => Ok(()),
        }
    }

    fn prompt_for(&self, op: &Operation) -> String {
        match op {
            Operation::Install(PackageRef::Local(path)) => format!(
                "Are you sure you want to install the local package '{}'?",
                path.display()
            ),
            Operation::Install(PackageRef::Remote(name)) => {
                format!("Are you sure you want to install the package '{}'?", name)
            }
            Operation::Remove(name) => {
                format!("Are you sure you want to remove the package '{}'?", name)
            }
            Operation::Unlock => format!(
                "Are you sure you want to delete the pacman lock file '{}'? Only do this if no other package operation is running.",
                self.config().lock_file.display()
            ),
        }
    }
}

/// pacman would read a leading `-` as a flag.
fn reject_option_like(target: &str) -> Result<()> {
    if target.starts_with('-') {
        return Err(InstallerError::OptionLikeTarget(target.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MockSystemProbe;
    use std::path::PathBuf;

    fn controller() -> Controller {
        Controller::new(Config::default())
    }

    fn idle_probe() -> MockSystemProbe {
        let mut probe = MockSystemProbe::new();
        probe.expect_package_manager_running().return_const(false);
        probe
    }

    fn captured(status: i32, stdout: &str, stderr: &str) -> Captured {
        Captured {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn reloads(effects: &[Option<Effect>]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Some(Effect::Capture(Query::Packages, _))))
            .count()
    }

    #[test]
    fn remote_install_confirms_then_streams_exact_command() {
        let mut ctl = controller();
        ctl.set_input("vim");
        ctl.request_install().unwrap();
        assert_eq!(
            ctl.pending_prompt().as_deref(),
            Some("Are you sure you want to install the package 'vim'?")
        );

        let mut probe = MockSystemProbe::new();
        probe.expect_is_file().never();
        let effect = ctl.confirm(&probe).unwrap();
        let Effect::Stream(command) = effect else {
            panic!("expected a streamed command");
        };
        assert_eq!(command.argv(), ["sudo", "pacman", "-S", "vim", "--noconfirm"]);
        assert!(ctl.is_busy());
        assert_eq!(ctl.log(), ["$ sudo pacman -S vim --noconfirm"]);
    }

    #[test]
    fn success_reloads_exactly_once() {
        let mut ctl = controller();
        ctl.set_input("vim");
        ctl.request_install().unwrap();
        ctl.confirm(&idle_probe()).unwrap();

        let effects: Vec<Option<Effect>> = vec![
            ctl.on_run_event(RunEvent::Line("resolving dependencies...".to_string())),
            ctl.on_run_event(RunEvent::Line("installing vim...".to_string())),
            ctl.on_run_event(RunEvent::Exited(0)),
        ];

        assert_eq!(reloads(&effects), 1);
        assert_eq!(
            effects.last().cloned().flatten(),
            Some(Effect::Capture(
                Query::Packages,
                PacmanCommand::new("pacman", ["-Ss"])
            ))
        );
        assert!(!ctl.is_busy());
        assert!(ctl.is_loading_packages());
        let notice = ctl.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.body, SUCCESS_MESSAGE);
    }

    #[test]
    fn failure_does_not_reload() {
        let mut ctl = controller();
        ctl.set_input("vim");
        ctl.request_remove().unwrap();
        ctl.confirm(&idle_probe()).unwrap();

        let effects = vec![
            ctl.on_run_event(RunEvent::Line("error: target not found: vim".to_string())),
            ctl.on_run_event(RunEvent::Exited(1)),
        ];

        assert_eq!(reloads(&effects), 0);
        assert!(!ctl.is_busy());
        assert_eq!(ctl.notice().unwrap().kind, NoticeKind::Error);
        assert_eq!(ctl.notice().unwrap().body, FAILURE_MESSAGE);
    }

    #[test]
    fn spawn_failure_is_reported_without_reload() {
        let mut ctl = controller();
        ctl.request_unlock().unwrap();
        ctl.confirm(&idle_probe()).unwrap();

        let effect = ctl.on_run_event(RunEvent::SpawnFailed(
            "Failed to start `sudo rm /var/lib/pacman/db.lck`: No such file or directory".to_string(),
        ));
        assert_eq!(effect, None);
        assert!(!ctl.is_busy());
        let notice = ctl.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.body.contains("Failed to start"));
    }

    #[test]
    fn existing_local_archive_installs_with_upgrade_flag() {
        let mut ctl = controller();
        ctl.set_input("/tmp/foo.pkg.tar.zst");
        ctl.request_install().unwrap();
        assert_eq!(
            ctl.pending_prompt().as_deref(),
            Some("Are you sure you want to install the local package '/tmp/foo.pkg.tar.zst'?")
        );

        let mut probe = MockSystemProbe::new();
        probe
            .expect_is_file()
            .withf(|path| path.to_str() == Some("/tmp/foo.pkg.tar.zst"))
            .times(1)
            .return_const(true);

        let effect = ctl.confirm(&probe).unwrap();
        assert_eq!(
            effect,
            Effect::Stream(PacmanCommand::new(
                "sudo",
                ["pacman", "-U", "/tmp/foo.pkg.tar.zst", "--noconfirm"]
            ))
        );
    }

    #[test]
    fn missing_local_archive_fails_before_spawning() {
        let mut ctl = controller();
        ctl.set_input("/tmp/missing.pkg.tar.zst");
        ctl.request_install().unwrap();

        let mut probe = MockSystemProbe::new();
        probe.expect_is_file().return_const(false);

        let err = ctl.confirm(&probe).unwrap_err();
        assert!(
            matches!(&err, InstallerError::MissingLocalPackage(p) if p == &PathBuf::from("/tmp/missing.pkg.tar.zst"))
        );
        assert!(!ctl.is_busy());
        assert!(ctl.pending_prompt().is_none());
        assert!(ctl.log().is_empty());

        ctl.report(&err);
        assert_eq!(ctl.notice().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn declining_spawns_nothing() {
        for request in [
            Controller::request_install as fn(&mut Controller) -> Result<()>,
            Controller::request_remove,
            Controller::request_unlock,
        ] {
            let mut ctl = controller();
            ctl.set_input("vim");
            request(&mut ctl).unwrap();
            assert!(ctl.pending_prompt().is_some());

            ctl.decline();
            assert!(ctl.pending_prompt().is_none());
            assert!(!ctl.is_busy());

            let probe = MockSystemProbe::new();
            assert!(matches!(
                ctl.confirm(&probe),
                Err(InstallerError::NothingToConfirm)
            ));
        }
    }

    #[test]
    fn new_request_replaces_pending_prompt() {
        let mut ctl = controller();
        ctl.set_input("vim");
        ctl.request_install().unwrap();
        ctl.request_remove().unwrap();
        assert_eq!(
            ctl.pending_prompt().as_deref(),
            Some("Are you sure you want to remove the package 'vim'?")
        );

        let Effect::Stream(command) = ctl.confirm(&idle_probe()).unwrap() else {
            panic!("expected a streamed command");
        };
        assert_eq!(command.argv(), ["sudo", "pacman", "-R", "vim", "--noconfirm"]);
    }

    #[test]
    fn option_like_targets_are_rejected() {
        for input in ["-dd", " --overwrite=*", "-x.pkg.tar.zst"] {
            let mut ctl = controller();
            ctl.set_input(input);
            assert!(matches!(
                ctl.request_install(),
                Err(InstallerError::OptionLikeTarget(_))
            ));
            assert!(matches!(
                ctl.request_remove(),
                Err(InstallerError::OptionLikeTarget(_))
            ));
            assert!(ctl.pending_prompt().is_none());
        }
    }

    #[test]
    fn unlock_ignores_input_field() {
        let mut ctl = controller();
        ctl.set_input("something-else");
        ctl.request_unlock().unwrap();
        let effect = ctl.confirm(&idle_probe()).unwrap();
        assert_eq!(
            effect,
            Effect::Stream(PacmanCommand::new("sudo", ["rm", "/var/lib/pacman/db.lck"]))
        );
    }

    #[test]
    fn unlock_refused_while_pacman_runs() {
        let mut ctl = controller();
        ctl.request_unlock().unwrap();

        let mut probe = MockSystemProbe::new();
        probe.expect_package_manager_running().return_const(true);

        assert!(matches!(
            ctl.confirm(&probe),
            Err(InstallerError::PackageManagerRunning(_))
        ));
        assert!(!ctl.is_busy());
    }

    #[test]
    fn busy_blocks_new_privileged_requests() {
        let mut ctl = controller();
        ctl.set_input("vim");
        ctl.request_install().unwrap();
        ctl.confirm(&idle_probe()).unwrap();

        assert!(matches!(ctl.request_install(), Err(InstallerError::Busy(_))));
        assert!(matches!(ctl.request_remove(), Err(InstallerError::Busy(_))));
        assert!(matches!(ctl.request_unlock(), Err(InstallerError::Busy(_))));

        // read-only queries stay available
        assert!(matches!(
            ctl.select_package("bash"),
            Effect::Capture(Query::Details(_), _)
        ));
    }

    #[test]
    fn empty_input_is_rejected_without_prompt() {
        let mut ctl = controller();
        ctl.set_input("   ");
        assert!(matches!(ctl.request_install(), Err(InstallerError::EmptyInput)));
        assert!(matches!(ctl.request_remove(), Err(InstallerError::EmptyInput)));
        assert!(ctl.pending_prompt().is_none());
    }

    #[test]
    fn events_without_running_operation_are_ignored() {
        let mut ctl = controller();
        assert_eq!(ctl.on_run_event(RunEvent::Exited(0)), None);
        assert!(ctl.log().is_empty());
        assert!(ctl.notice().is_none());
    }

    #[test]
    fn output_lines_are_logged_in_order() {
        let mut ctl = controller();
        ctl.set_input("vim");
        ctl.request_remove().unwrap();
        ctl.confirm(&idle_probe()).unwrap();
        for line in ["a", "b", "c"] {
            ctl.on_run_event(RunEvent::Line(line.to_string()));
        }
        assert_eq!(ctl.log(), ["$ sudo pacman -R vim --noconfirm", "a", "b", "c"]);
    }

    #[test]
    fn package_list_is_replaced_and_filtered() {
        let mut ctl = controller();
        ctl.request_packages();
        ctl.on_packages_loaded(Ok(captured(
            0,
            "extra/vim 9.1-1\n    Vi Improved\nextra/neovim 0.10-1\n    Fork of Vim\ncore/bash 5.2-1\n    Shell\n",
            "",
        )));
        assert!(!ctl.is_loading_packages());
        assert_eq!(ctl.packages().len(), 3);

        ctl.set_filter("VIM");
        let names: Vec<&str> = ctl.visible_packages().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["vim", "neovim"]);

        ctl.on_packages_loaded(Ok(captured(0, "core/bash 5.2-1\n", "")));
        assert_eq!(ctl.packages().len(), 1);
    }

    #[test]
    fn package_list_failure_surfaces_stderr() {
        let mut ctl = controller();
        ctl.on_packages_loaded(Ok(captured(1, "", "error: failed to init transaction\n")));
        let notice = ctl.notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(
            notice.body,
            "Failed to load packages: error: failed to init transaction"
        );
    }

    #[test]
    fn details_show_stdout_or_error_text() {
        let mut ctl = controller();
        let effect = ctl.select_package("bash");
        assert_eq!(
            effect,
            Effect::Capture(
                Query::Details("bash".to_string()),
                PacmanCommand::new("pacman", ["-Qi", "bash"])
            )
        );

        ctl.on_details_loaded("bash", Ok(captured(0, "Name : bash\n", "")));
        assert_eq!(ctl.details(), "Name : bash\n");

        ctl.select_package("vim");
        ctl.on_details_loaded("vim", Ok(captured(1, "", "error: package 'vim' was not found\n")));
        assert_eq!(
            ctl.details(),
            "Failed to retrieve package details: error: package 'vim' was not found"
        );
    }

    #[test]
    fn stale_details_are_dropped() {
        let mut ctl = controller();
        ctl.select_package("bash");
        ctl.select_package("vim");
        ctl.on_details_loaded("bash", Ok(captured(0, "Name : bash\n", "")));
        assert_eq!(ctl.details(), "");
        assert_eq!(ctl.selected(), Some("vim"));
    }
}
