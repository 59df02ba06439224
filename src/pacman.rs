use std::fmt;

use crate::config::Config;
use crate::package::PackageRef;

/// A program plus its arguments, ready to hand to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacmanCommand {
    program: String,
    args: Vec<String>,
}

impl PacmanCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for PacmanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Builds every command the installer issues.
#[derive(Debug, Clone)]
pub struct PacmanCommands {
    config: Config,
}

impl PacmanCommands {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn search_all(&self) -> PacmanCommand {
        PacmanCommand::new(self.config.pacman_binary.as_str(), ["-Ss"])
    }

    pub fn query_info(&self, name: &str) -> PacmanCommand {
        PacmanCommand::new(self.config.pacman_binary.as_str(), ["-Qi", name])
    }

    pub fn install(&self, package: &PackageRef) -> PacmanCommand {
        let flag = if package.is_local() { "-U" } else { "-S" };
        let target = package.target();
        self.elevated(
            &self.config.pacman_binary,
            &[flag, target.as_str(), "--noconfirm"],
        )
    }

    pub fn remove(&self, name: &str) -> PacmanCommand {
        self.elevated(&self.config.pacman_binary, &["-R", name, "--noconfirm"])
    }

    pub fn unlock(&self) -> PacmanCommand {
        let lock = self.config.lock_file.display().to_string();
        self.elevated("rm", &[lock.as_str()])
    }

    fn elevated(&self, program: &str, args: &[&str]) -> PacmanCommand {
        let prefix = self.config.privilege_command.trim();
        if prefix.is_empty() {
            PacmanCommand::new(program, args.iter().copied())
        } else {
            PacmanCommand::new(
                prefix,
                std::iter::once(program).chain(args.iter().copied()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn commands() -> PacmanCommands {
        PacmanCommands::new(Config::default())
    }

    #[test]
    fn read_only_queries() {
        assert_eq!(commands().search_all().argv(), ["pacman", "-Ss"]);
        assert_eq!(
            commands().query_info("bash").argv(),
            ["pacman", "-Qi", "bash"]
        );
    }

    #[test]
    fn install_remote_and_local() {
        let remote = PackageRef::Remote("vim".to_string());
        assert_eq!(
            commands().install(&remote).argv(),
            ["sudo", "pacman", "-S", "vim", "--noconfirm"]
        );

        let local = PackageRef::Local(PathBuf::from("/tmp/foo.pkg.tar.zst"));
        assert_eq!(
            commands().install(&local).argv(),
            ["sudo", "pacman", "-U", "/tmp/foo.pkg.tar.zst", "--noconfirm"]
        );
    }

    #[test]
    fn remove_and_unlock() {
        assert_eq!(
            commands().remove("vim").argv(),
            ["sudo", "pacman", "-R", "vim", "--noconfirm"]
        );
        assert_eq!(
            commands().unlock().argv(),
            ["sudo", "rm", "/var/lib/pacman/db.lck"]
        );
    }

    #[test]
    fn empty_privilege_command_runs_directly() {
        let commands = PacmanCommands::new(Config {
            privilege_command: String::new(),
            ..Config::default()
        });
        assert_eq!(
            commands.remove("vim").to_string(),
            "pacman -R vim --noconfirm"
        );
    }
}
