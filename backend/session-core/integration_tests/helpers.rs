//! Shared fixtures: a scripted backend and a controller factory.

use session_core::backend::{BackendPaths, DebugBackend, OutputSink};
use session_core::discovery::PortProbe;
use session_core::error::BackendError;
use session_core::notification::{StatusSink, StatusSummary};
use session_core::security::SecurityPolicy;
use session_core::{SessionController, SessionOptions, SessionState};

use common::{ErrorLocation, RedactedPairingCode};

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::panic::Location;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

/// Address the fixed test policy treats as a local interface.
pub const LAN_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

/// Ports the fixed probe reports as listening.
pub const LISTENING_PORTS: [u16; 2] = [37000, 5555];

/// In-memory backend that records every call.
pub struct FakeBackend {
    init_ok: bool,
    server_running: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    pair_gate: Mutex<Option<std_mpsc::Receiver<()>>>,
    pair_error: Mutex<Option<String>>,
    connect_error: Mutex<Option<String>>,
    command_output: Mutex<(Vec<String>, i32)>,
    command_scripts: Mutex<VecDeque<(Vec<String>, i32)>>,
    command_gate: Mutex<Option<std_mpsc::Receiver<()>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    pub fn failing_init() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    fn build(init_ok: bool) -> Self {
        Self {
            init_ok,
            server_running: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
            pair_gate: Mutex::new(None),
            pair_error: Mutex::new(None),
            connect_error: Mutex::new(None),
            command_output: Mutex::new((vec!["List of devices attached".to_string()], 0)),
            command_scripts: Mutex::new(VecDeque::new()),
            command_gate: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Make the next `pair` call block until the returned sender fires.
    pub fn gate_pair(&self) -> std_mpsc::Sender<()> {
        let (tx, rx) = std_mpsc::channel();
        *self.pair_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn fail_pair(&self, message: &str) {
        *self.pair_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_connect(&self, message: &str) {
        *self.connect_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn script_command(&self, lines: Vec<String>, exit_code: i32) {
        *self.command_output.lock().unwrap() = (lines, exit_code);
    }

    /// Script one command run. Queued scripts are used in order before the
    /// default from [`FakeBackend::script_command`].
    pub fn queue_command(&self, lines: Vec<String>, exit_code: i32) {
        self.command_scripts
            .lock()
            .unwrap()
            .push_back((lines, exit_code));
    }

    /// Hold the next command after its first output line until the sender
    /// fires.
    pub fn gate_command(&self) -> std_mpsc::Sender<()> {
        let (tx, rx) = std_mpsc::channel();
        *self.command_gate.lock().unwrap() = Some(rx);
        tx
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DebugBackend for FakeBackend {
    fn initialize(&self, _paths: &BackendPaths) -> Result<(), BackendError> {
        self.record("initialize".to_string());
        if self.init_ok {
            Ok(())
        } else {
            Err(BackendError::Unavailable {
                message: "no adb".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    fn start_server(&self) -> Result<String, BackendError> {
        self.record("start_server".to_string());
        let mut running = self.server_running.lock().unwrap();
        if *running {
            return Ok("Server already running.".to_string());
        }
        *running = true;
        Ok("Server started.".to_string())
    }

    fn stop_server(&self) -> Result<String, BackendError> {
        self.record("stop_server".to_string());
        let mut running = self.server_running.lock().unwrap();
        if !*running {
            return Ok("Server already stopped.".to_string());
        }
        *running = false;
        Ok("Server stopped.".to_string())
    }

    fn pair(&self, address: &str, code: &RedactedPairingCode) -> Result<String, BackendError> {
        self.record(format!("pair {address} {}", code.expose()));
        let gate = self.pair_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        match self.pair_error.lock().unwrap().clone() {
            Some(message) => Err(BackendError::rejected(message)),
            None => Ok(format!("Successfully paired to {address}")),
        }
    }

    fn connect(&self, address: &str) -> Result<String, BackendError> {
        self.record(format!("connect {address}"));
        match self.connect_error.lock().unwrap().clone() {
            Some(message) => Err(BackendError::rejected(message)),
            None => Ok(format!("connected to {address}")),
        }
    }

    fn disconnect(&self, address: Option<&str>) -> Result<String, BackendError> {
        match address {
            Some(address) => {
                self.record(format!("disconnect {address}"));
                Ok(format!("disconnected {address}"))
            }
            None => {
                self.record("disconnect".to_string());
                Ok("disconnected everything".to_string())
            }
        }
    }

    fn run_command_streaming(&self, args: &[String], output: &OutputSink) -> i32 {
        self.record(format!("run {}", args.join(" ")));
        let scripted = self.command_scripts.lock().unwrap().pop_front();
        let (lines, exit_code) =
            scripted.unwrap_or_else(|| self.command_output.lock().unwrap().clone());
        let gate = self.command_gate.lock().unwrap().take();

        let mut lines = lines.into_iter();
        if let Some(first) = lines.next() {
            output.emit(first);
        }
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        for line in lines {
            output.emit(line);
        }
        exit_code
    }
}

/// Port probe with a fixed set of listening ports.
pub struct FixedProbe(pub Vec<u16>);

impl PortProbe for FixedProbe {
    fn is_listening(&self, port: u16) -> bool {
        self.0.contains(&port)
    }
}

/// Status sink that keeps every summary it was given.
#[derive(Default)]
pub struct RecordingSink {
    pub summaries: Mutex<Vec<StatusSummary>>,
}

impl StatusSink for RecordingSink {
    fn refresh(&self, status: &StatusSummary) {
        self.summaries.lock().unwrap().push(status.clone());
    }
}

pub fn test_policy() -> SecurityPolicy {
    SecurityPolicy::with_local_addresses([IpAddr::V4(LAN_ADDRESS)])
}

pub fn test_options() -> SessionOptions {
    SessionOptions::new(BackendPaths::new(
        "/tmp/adbhost-test/base",
        "/tmp/adbhost-test/cache",
    ))
    .with_policy(test_policy())
    .with_probe(Arc::new(FixedProbe(LISTENING_PORTS.to_vec())))
}

pub async fn start_controller(backend: &Arc<FakeBackend>) -> SessionController {
    start_controller_with(backend, test_options()).await
}

pub async fn start_controller_with(
    backend: &Arc<FakeBackend>,
    options: SessionOptions,
) -> SessionController {
    let backend: Arc<dyn DebugBackend> = backend.clone();
    SessionController::start(backend, options).await
}

/// Start the controller and the server, and wait until the server is running.
pub async fn start_running(backend: &Arc<FakeBackend>) -> SessionController {
    let controller = start_controller(backend).await;
    controller.start_server().expect("start queued");
    controller.drain().await.expect("drained");
    assert!(controller.snapshot().server_running);
    controller
}

pub async fn wait_for<F>(rx: &mut watch::Receiver<SessionState>, predicate: F) -> SessionState
where
    F: FnMut(&SessionState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("state reached in time")
        .expect("session alive")
        .clone()
}
