//! [`DebugBackend`] driving an external `adb` executable.
//!
//! The executable talks to the server selected through `ADB_SERVER_SOCKET`,
//! with its key store under the configured base directory. Server liveness is
//! read from the socket table, never from adb's own auto-start behaviour.

use crate::ADB_BINARY;
use crate::backend::{BackendPaths, DebugBackend, OutputSink};
use crate::discovery::probe::is_port_listening;
use crate::error::BackendError;

use common::{ErrorLocation, RedactedPairingCode};

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::thread::{scope, sleep};
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};
use regex::Regex;

const STOP_VERIFY_MAX_ELAPSED: Duration = Duration::from_secs(5);
const ANDROID_DIR: &str = ".android";
const TCP_SCHEME: &str = "tcp:";

const MSG_ALREADY_RUNNING: &str = "Server already running.";
const MSG_STARTED: &str = "Server started.";
const MSG_ALREADY_STOPPED: &str = "Server already stopped.";
const MSG_STOPPED: &str = "Server stopped.";
const MSG_NOT_RUNNING: &str = "Server is not running.";

fn pair_success() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Successfully paired to ").expect("valid regex"))
}

fn connect_success() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(already )?connected to ").expect("valid regex"))
}

fn disconnect_success() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^disconnected( |$)").expect("valid regex"))
}

/// Port of a `tcp:[host:]port` socket spec; `None` for unix-socket specs.
pub fn tcp_port(socket_spec: &str) -> Option<u16> {
    socket_spec
        .strip_prefix(TCP_SCHEME)?
        .rsplit(':')
        .next()?
        .parse()
        .ok()
}

/// Drives `adb` as a child process per call.
#[derive(Debug)]
pub struct ProcessBackend {
    program: PathBuf,
    paths: OnceLock<BackendPaths>,
}

impl ProcessBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            paths: OnceLock::new(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    #[track_caller]
    fn paths(&self) -> Result<&BackendPaths, BackendError> {
        self.paths.get().ok_or_else(|| BackendError::Unavailable {
            message: "The adb backend has not been initialized.".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn command<I, S>(&self, args: I) -> Result<Command, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let paths = self.paths()?;
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .env("HOME", &paths.base_dir)
            .env("ANDROID_DATA", &paths.base_dir)
            .env("TMPDIR", &paths.cache_dir)
            .env("ADB_SERVER_SOCKET", &paths.socket_spec)
            .stdin(Stdio::null());
        Ok(command)
    }

    #[track_caller]
    fn output<I, S>(&self, args: I) -> Result<Output, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command(args)?
            .output()
            .map_err(|e| BackendError::Spawn {
                message: format!("Failed to run {}: {e}", self.program.display()),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })
    }

    /// Whether the configured server socket has a listener. `None` when the
    /// socket is not a TCP socket and cannot be probed.
    #[track_caller]
    fn server_listening(&self) -> Result<Option<bool>, BackendError> {
        let Some(port) = tcp_port(&self.paths()?.socket_spec) else {
            return Ok(None);
        };

        is_port_listening(port)
            .map(Some)
            .map_err(|e| BackendError::Io {
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn require_server(&self) -> Result<(), BackendError> {
        match self.server_listening()? {
            Some(false) => Err(BackendError::rejected(MSG_NOT_RUNNING)),
            _ => Ok(()),
        }
    }

    /// Run a host query and keep its output only when `success` matches.
    fn query(&self, args: &[&str], success: &Regex) -> Result<String, BackendError> {
        self.require_server()?;
        let output = self.output(args)?;
        let text = combined_text(&output);

        if output.status.success() && success.is_match(&text) {
            Ok(text)
        } else if text.is_empty() {
            Err(BackendError::rejected(format!(
                "{} {} exited with {}",
                ADB_BINARY, args[0], output.status
            )))
        } else {
            Err(BackendError::rejected(text))
        }
    }

    /// Wait (with backoff) for the server socket to close.
    fn wait_for_stop(&self) -> Result<(), BackendError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(STOP_VERIFY_MAX_ELAPSED),
            ..Default::default()
        };

        loop {
            if self.server_listening()? != Some(true) {
                debug!("adb server socket closed");
                return Ok(());
            }

            match backoff.next_backoff() {
                Some(duration) => {
                    trace!("adb server still listening, retrying after {duration:?}");
                    sleep(duration);
                }
                None => {
                    return Err(BackendError::rejected(
                        "Server is still running after kill-server.",
                    ));
                }
            }
        }
    }
}

impl Default for ProcessBackend {
    fn default() -> Self {
        Self::new(ADB_BINARY)
    }
}

fn combined_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}\n{}", stdout.trim(), stderr.trim())
        .trim()
        .to_string()
}

fn forward_lines<R: Read>(reader: R, sink: &OutputSink) {
    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) => sink.emit(line),
            Err(e) => {
                warn!("Stopped reading command output: {e}");
                break;
            }
        }
    }
}

impl DebugBackend for ProcessBackend {
    fn initialize(&self, paths: &BackendPaths) -> Result<(), BackendError> {
        if self.paths.get().is_some() {
            return Ok(());
        }

        std::fs::create_dir_all(paths.base_dir.join(ANDROID_DIR))?;
        std::fs::create_dir_all(&paths.cache_dir)?;

        let version = Command::new(&self.program)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| BackendError::Unavailable {
                message: format!("Cannot run {}: {e}", self.program.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if !version.status.success() {
            return Err(BackendError::Unavailable {
                message: format!(
                    "{} version exited with {}",
                    self.program.display(),
                    version.status
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let _ = self.paths.set(paths.clone());
        info!(
            "adb backend ready: {} ({})",
            self.program.display(),
            String::from_utf8_lossy(&version.stdout)
                .lines()
                .next()
                .unwrap_or_default()
        );
        Ok(())
    }

    fn start_server(&self) -> Result<String, BackendError> {
        if self.server_listening()? == Some(true) {
            return Ok(MSG_ALREADY_RUNNING.to_string());
        }

        let output = self.output(["start-server"])?;
        if output.status.success() {
            Ok(MSG_STARTED.to_string())
        } else {
            Err(BackendError::rejected(combined_text(&output)))
        }
    }

    fn stop_server(&self) -> Result<String, BackendError> {
        if self.server_listening()? == Some(false) {
            return Ok(MSG_ALREADY_STOPPED.to_string());
        }

        let output = self.output(["kill-server"])?;
        if !output.status.success() {
            return Err(BackendError::rejected(combined_text(&output)));
        }

        self.wait_for_stop()?;
        Ok(MSG_STOPPED.to_string())
    }

    fn pair(&self, address: &str, code: &RedactedPairingCode) -> Result<String, BackendError> {
        if address.trim().is_empty() || code.is_empty() {
            return Err(BackendError::rejected("Missing address or code."));
        }
        self.query(&["pair", address, code.expose()], pair_success())
    }

    fn connect(&self, address: &str) -> Result<String, BackendError> {
        if address.trim().is_empty() {
            return Err(BackendError::rejected("Missing address."));
        }
        self.query(&["connect", address], connect_success())
    }

    fn disconnect(&self, address: Option<&str>) -> Result<String, BackendError> {
        match address {
            Some(address) => self.query(&["disconnect", address], disconnect_success()),
            None => self.query(&["disconnect"], disconnect_success()),
        }
    }

    fn run_command_streaming(&self, args: &[String], output: &OutputSink) -> i32 {
        match self.require_server() {
            Ok(()) => {}
            Err(e) => {
                output.emit(format!("error: {}", e.user_message()));
                return -1;
            }
        }

        let child = self.command(args).and_then(|mut command| {
            command
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(BackendError::from)
        });

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                output.emit(format!("error: {}", e.user_message()));
                return -1;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        scope(|s| {
            if let Some(stdout) = stdout {
                s.spawn(|| forward_lines(stdout, output));
            }
            if let Some(stderr) = stderr {
                s.spawn(|| forward_lines(stderr, output));
            }
        });

        match child.wait() {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                output.emit(format!("error: {e}"));
                -1
            }
        }
    }
}
