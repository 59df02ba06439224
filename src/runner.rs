//! Runs commands off the UI thread.
//!
//! Streamed runs get a dedicated worker thread that forwards output over a
//! channel; captured runs go through tokio's blocking pool.

use futures::stream::{self, Stream};
use std::io::{BufRead, BufReader, Read};
use std::process::{ChildStderr, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

use crate::error::{InstallerError, Result};
use crate::pacman::PacmanCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// One line of output, stdout first, then stderr.
    Line(String),
    /// Always the last event of a run that started.
    Exited(i32),
    /// The process never started. Last event of the run.
    SpawnFailed(String),
}

impl RunEvent {
    /// Nothing follows a final event.
    pub fn is_final(&self) -> bool {
        !matches!(self, RunEvent::Line(_))
    }
}

/// Reported when the worker goes away without a status.
pub const WORKER_VANISHED: &str = "worker ended without reporting a status";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Starts `command` on a worker thread and returns the receiving end of its events.
pub fn spawn(command: &PacmanCommand) -> mpsc::UnboundedReceiver<RunEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker_tx = tx.clone();
    let worker_command = command.clone();

    let started = thread::Builder::new()
        .name("command-runner".to_string())
        .spawn(move || drive(&worker_command, &worker_tx));

    if let Err(e) = started {
        log::error!("Could not start worker thread for `{}`: {}", command, e);
        let _ = tx.send(RunEvent::SpawnFailed(format!(
            "Failed to start `{}`: {}",
            command, e
        )));
    }

    rx
}

/// Same as [`spawn`], adapted into a stream for the GUI executor.
pub fn stream(command: &PacmanCommand) -> impl Stream<Item = RunEvent> + Send + 'static {
    until_final(spawn(command))
}

/// Yields events up to and including the final one. A channel that closes
/// early still ends with [`RunEvent::SpawnFailed`].
fn until_final(
    rx: mpsc::UnboundedReceiver<RunEvent>,
) -> impl Stream<Item = RunEvent> + Send + 'static {
    stream::unfold(Some(rx), |state| async move {
        let mut rx = state?;
        match rx.recv().await {
            Some(event) => {
                let next = if event.is_final() { None } else { Some(rx) };
                Some((event, next))
            }
            None => {
                log::error!("Command worker stopped before reporting a status");
                Some((RunEvent::SpawnFailed(WORKER_VANISHED.to_string()), None))
            }
        }
    })
}

enum StderrSource {
    Drain(JoinHandle<String>),
    /// The drain thread could not start; read after stdout instead.
    Deferred(ChildStderr),
    Missing,
}

fn read_lossy(mut pipe: impl Read) -> String {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf) {
        log::warn!("Error reading stderr: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn drain_stderr(stderr: ChildStderr) -> StderrSource {
    let slot = Arc::new(Mutex::new(Some(stderr)));
    let thread_slot = Arc::clone(&slot);

    let started = thread::Builder::new()
        .name("stderr-drain".to_string())
        .spawn(move || {
            let pipe = thread_slot.lock().ok().and_then(|mut pipe| pipe.take());
            pipe.map(read_lossy).unwrap_or_default()
        });

    match started {
        Ok(handle) => StderrSource::Drain(handle),
        Err(e) => {
            log::warn!("Could not start stderr reader, reading after stdout: {}", e);
            match slot.lock().ok().and_then(|mut pipe| pipe.take()) {
                Some(pipe) => StderrSource::Deferred(pipe),
                None => StderrSource::Missing,
            }
        }
    }
}

fn drive(command: &PacmanCommand, tx: &mpsc::UnboundedSender<RunEvent>) {
    log::debug!("Spawning `{}`", command);

    let mut child = match Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            log::warn!("Failed to start `{}`: {}", command, e);
            let _ = tx.send(RunEvent::SpawnFailed(format!(
                "Failed to start `{}`: {}",
                command, e
            )));
            return;
        }
    };

    // Drained on the side so a chatty stderr can't stall the child.
    let stderr_source = match child.stderr.take() {
        Some(stderr) => drain_stderr(stderr),
        None => StderrSource::Missing,
    };

    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    let _ = tx.send(RunEvent::Line(line));
                }
                Err(e) => {
                    log::warn!("Error reading stdout of `{}`: {}", command, e);
                    break;
                }
            }
        }
    }

    let stderr_text = match stderr_source {
        StderrSource::Drain(handle) => handle.join().unwrap_or_else(|_| {
            log::error!("stderr reader for `{}` panicked", command);
            String::new()
        }),
        StderrSource::Deferred(pipe) => read_lossy(pipe),
        StderrSource::Missing => String::new(),
    };
    for line in stderr_text.trim().lines() {
        let _ = tx.send(RunEvent::Line(line.to_string()));
    }

    let status = match child.wait() {
        Ok(status) => exit_code(status),
        Err(e) => {
            log::warn!("Failed to wait for `{}`: {}", command, e);
            -1
        }
    };
    log::debug!("`{}` exited with {}", command, status);
    let _ = tx.send(RunEvent::Exited(status));
}

/// Runs `command` to completion on the blocking pool.
pub async fn capture(command: PacmanCommand) -> Result<Captured> {
    tokio::task::spawn_blocking(move || capture_blocking(&command))
        .await
        .map_err(|e| InstallerError::Worker(e.to_string()))?
}

pub fn capture_blocking(command: &PacmanCommand) -> Result<Captured> {
    log::debug!("Capturing `{}`", command);
    let output = Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::null())
        .output()
        .map_err(|source| InstallerError::Spawn {
            command: command.to_string(),
            source,
        })?;

    Ok(Captured {
        status: exit_code(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sh(script: &str) -> PacmanCommand {
        PacmanCommand::new("sh", ["-c", script])
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn line(text: &str) -> RunEvent {
        RunEvent::Line(text.to_string())
    }

    #[tokio::test]
    async fn stdout_then_stderr_then_status() {
        let events = collect(spawn(&sh(
            "echo one; echo oops >&2; echo two; echo three; exit 3",
        )))
        .await;

        assert_eq!(
            events,
            vec![
                line("one"),
                line("two"),
                line("three"),
                line("oops"),
                RunEvent::Exited(3),
            ]
        );
    }

    #[tokio::test]
    async fn keeps_order_and_blank_lines() {
        let events = collect(spawn(&sh("for i in 1 2 3 4 5 6 7 8; do echo $i; done; echo; echo end"))).await;
        let expected: Vec<RunEvent> = ["1", "2", "3", "4", "5", "6", "7", "8", "", "end"]
            .into_iter()
            .map(line)
            .chain(std::iter::once(RunEvent::Exited(0)))
            .collect();
        assert_eq!(events, expected);
    }

    #[tokio::test]
    async fn large_stderr_does_not_stall() {
        let events = collect(spawn(&sh(
            "i=0; while [ $i -lt 5000 ]; do echo err-line-$i >&2; i=$((i+1)); done; echo done",
        )))
        .await;
        assert_eq!(events.first(), Some(&line("done")));
        assert_eq!(events.len(), 5002);
        assert_eq!(events.last(), Some(&RunEvent::Exited(0)));
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failure_once() {
        let command = PacmanCommand::new("/nonexistent/definitely-not-pacman", ["-Ss"]);
        let events = collect(spawn(&command)).await;
        assert_eq!(events.len(), 1);
        assert!(
            matches!(&events[0], RunEvent::SpawnFailed(msg) if msg.contains("definitely-not-pacman"))
        );
    }

    #[tokio::test]
    async fn stream_adapter_yields_same_events() {
        let events: Vec<RunEvent> = stream(&sh("echo hi")).collect().await;
        assert_eq!(events, vec![line("hi"), RunEvent::Exited(0)]);
    }

    #[tokio::test]
    async fn crlf_invalid_utf8_and_unterminated_line() {
        let events = collect(spawn(&sh(r"printf 'a\r\nb\377c\nlast'"))).await;
        assert_eq!(
            events,
            vec![
                line("a"),
                line("b\u{FFFD}c"),
                line("last"),
                RunEvent::Exited(0),
            ]
        );
    }

    #[tokio::test]
    async fn closed_channel_still_ends_with_final_event() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(line("partial")).unwrap();
        drop(tx);

        let events: Vec<RunEvent> = until_final(rx).collect().await;
        assert_eq!(
            events,
            vec![
                line("partial"),
                RunEvent::SpawnFailed(WORKER_VANISHED.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_is_read_past_the_final_event() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(RunEvent::Exited(0)).unwrap();
        tx.send(line("late")).unwrap();

        let events: Vec<RunEvent> = until_final(rx).collect().await;
        assert_eq!(events, vec![RunEvent::Exited(0)]);
    }

    #[tokio::test]
    async fn capture_collects_both_streams() {
        let captured = capture(sh("echo out; echo err >&2; exit 1")).await.unwrap();
        assert_eq!(captured.status, 1);
        assert!(!captured.success());
        assert_eq!(captured.stdout, "out\n");
        assert_eq!(captured.stderr, "err\n");
    }

    #[tokio::test]
    async fn capture_of_missing_binary_is_spawn_error() {
        let command = PacmanCommand::new("/nonexistent/definitely-not-pacman", ["-Qi", "x"]);
        assert!(matches!(
            capture(command).await,
            Err(InstallerError::Spawn { .. })
        ));
    }
}
