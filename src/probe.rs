use std::fs;
use std::path::Path;

/// Host checks the controller needs before it lets a command start.
#[cfg_attr(test, mockall::automock)]
pub trait SystemProbe {
    fn is_file(&self, path: &Path) -> bool;
    fn package_manager_running(&self) -> bool;
}

/// Looks at the real filesystem and `/proc`.
#[derive(Debug, Clone)]
pub struct HostProbe {
    process_name: String,
    proc_root: std::path::PathBuf,
}

impl HostProbe {
    pub fn new(pacman_binary: &str) -> Self {
        let process_name = Path::new(pacman_binary)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| pacman_binary.to_string());
        Self {
            process_name,
            proc_root: std::path::PathBuf::from("/proc"),
        }
    }

    #[cfg(test)]
    fn with_proc_root(mut self, root: &Path) -> Self {
        self.proc_root = root.to_path_buf();
        self
    }
}

impl SystemProbe for HostProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn package_manager_running(&self) -> bool {
        let entries = match fs::read_dir(&self.proc_root) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot scan {}: {}", self.proc_root.display(), e);
                return false;
            }
        };

        // comm is truncated to 15 bytes by the kernel.
        let wanted: String = self.process_name.chars().take(15).collect();

        entries.flatten().any(|entry| {
            let is_pid = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.bytes().all(|b| b.is_ascii_digit()));
            is_pid
                && fs::read_to_string(entry.path().join("comm"))
                    .is_ok_and(|comm| comm.trim_end() == wanted)
        })
    }
}
