use crate::backend::{BackendPaths, DebugBackend};
use crate::command::{CommandMode, Rejection, display_form, plan_command};
use crate::discovery::{NetstatProbe, PortProbe, ServiceEvent, ServiceKind, accept_resolved};
use crate::error::SessionError;
use crate::notification::{LogStatusSink, StatusSink, StatusSummary};
use crate::security::SecurityPolicy;
use crate::session::executor::Executor;
use crate::session::history::{MAX_HISTORY, MAX_LOGS, push_recent};
use crate::session::operation::Operation;
use crate::session::state::{ConnectionState, SessionState};
use crate::session::store::SessionStore;

use common::{ErrorLocation, RedactedPairingCode};

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const MSG_INIT_FAILED: &str = "Failed to initialize the native adb backend.";
const MSG_SERVER_UNAVAILABLE: &str = "ADB host backend is not available in this build.";
const MSG_COMMAND_UNAVAILABLE: &str = "ADB backend isn't available in this build.";
const MSG_PAIR_UNAVAILABLE: &str = "Pairing is not available because the backend is missing.";
const MSG_CONNECT_UNAVAILABLE: &str = "Connect is not available because the backend is missing.";
const MSG_DISCONNECT_UNAVAILABLE: &str =
    "Disconnect is not available because the backend is missing.";
const MSG_EMPTY_COMMAND: &str = "Type a command first.";
const MSG_SERVER_NOT_RUNNING: &str = "Start the server first.";
const MSG_LOCAL_ONLY: &str = "Only connections to this device are allowed.";
const MSG_PAIRING_EMPTY: &str = "Pairing input is empty.";
const MSG_PAIRING_INVALID: &str = "Pairing code required. Make sure the pairing service is detected.";
const MSG_WORKER_STOPPED: &str = "The session worker is not running.";

/// Collaborators handed to [`SessionController::start`].
#[derive(Clone)]
pub struct SessionOptions {
    pub paths: BackendPaths,
    pub policy: SecurityPolicy,
    pub probe: Arc<dyn PortProbe>,
    pub status_sink: Arc<dyn StatusSink>,
}

impl SessionOptions {
    pub fn new(paths: BackendPaths) -> Self {
        Self {
            paths,
            policy: SecurityPolicy::system(),
            probe: Arc::new(NetstatProbe),
            status_sink: Arc::new(LogStatusSink),
        }
    }

    pub fn with_policy(mut self, policy: SecurityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn PortProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_status_sink(mut self, status_sink: Arc<dyn StatusSink>) -> Self {
        self.status_sink = status_sink;
        self
    }
}

/// State shared between the controller handle and the worker.
pub(crate) struct Shared {
    pub(crate) store: SessionStore,
    pub(crate) backend: Arc<dyn DebugBackend>,
    pub(crate) policy: SecurityPolicy,
    backend_available: AtomicBool,
    auto_connect_pending: AtomicBool,
    probe: Arc<dyn PortProbe>,
    status_sink: Arc<dyn StatusSink>,
}

#[cfg(test)]
impl Shared {
    /// Shared state for driving a worker directly, with the backend marked
    /// available.
    pub(crate) fn detached(backend: Arc<dyn DebugBackend>) -> Arc<Self> {
        Arc::new(Self {
            store: SessionStore::new(),
            backend,
            policy: SecurityPolicy::with_local_addresses([]),
            backend_available: AtomicBool::new(true),
            auto_connect_pending: AtomicBool::new(false),
            probe: Arc::new(NetstatProbe),
            status_sink: Arc::new(LogStatusSink),
        })
    }
}

impl Shared {
    /// Append a transcript line.
    pub(crate) fn log_line(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.store.replace_with(|state| SessionState {
            logs: push_recent(&state.logs, message, MAX_LOGS),
            ..state.clone()
        });
    }

    /// Set `last_error` without touching the connection state.
    pub(crate) fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.store.replace_with(|state| SessionState {
            last_error: Some(message),
            ..state.clone()
        });
    }

    pub(crate) fn notify(&self) {
        let summary = StatusSummary::from_state(&self.store.snapshot());
        self.status_sink.refresh(&summary);
    }

    pub(crate) fn arm_auto_connect(&self) {
        self.auto_connect_pending.store(true, Ordering::SeqCst);
    }

    /// Consume the pending auto-connect when its preconditions hold.
    ///
    /// The flag stays armed while the connect address is missing, non-local or
    /// the server is down, so a later detected address can still use it. It is
    /// consumed (without connecting) when the session is already connected.
    pub(crate) fn take_auto_connect(&self) -> Option<String> {
        if !self.auto_connect_pending.load(Ordering::SeqCst) {
            return None;
        }

        let state = self.store.snapshot();
        let address = state.connect_address.trim();
        if address.is_empty()
            || !state.server_running
            || self.policy.local_target(address).is_none()
        {
            return None;
        }

        if !self.auto_connect_pending.swap(false, Ordering::SeqCst) {
            return None;
        }

        if state.connection_state == ConnectionState::Connected {
            return None;
        }

        Some(address.to_string())
    }
}

/// Owning handle of the session actor.
///
/// Cloning the handle shares the same session. Synchronous checks (blank
/// input, validation, local-only policy) run on the caller; everything that
/// touches the backend is queued for the single worker.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<Operation>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionController {
    /// Initialise the backend and spawn the worker.
    ///
    /// A failed initialisation does not stop the controller from starting:
    /// the session comes up in `Error` and every backend operation
    /// short-circuits.
    pub async fn start(backend: Arc<dyn DebugBackend>, options: SessionOptions) -> Self {
        let SessionOptions {
            paths,
            policy,
            probe,
            status_sink,
        } = options;

        let init_backend = Arc::clone(&backend);
        let available = match tokio::task::spawn_blocking(move || init_backend.initialize(&paths))
            .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Backend initialization failed: {e}");
                false
            }
            Err(e) => {
                error!("Backend initialization task failed: {e}");
                false
            }
        };

        let shared = Arc::new(Shared {
            store: SessionStore::new(),
            backend,
            policy,
            backend_available: AtomicBool::new(available),
            auto_connect_pending: AtomicBool::new(false),
            probe,
            status_sink,
        });

        if !available {
            shared.record_error(MSG_INIT_FAILED);
            shared.store.replace_with(|state| SessionState {
                connection_state: ConnectionState::Error,
                ..state.clone()
            });
            shared.notify();
        }

        let (queue, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(Executor::new(Arc::clone(&shared), rx).run());

        Self {
            shared,
            queue,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.shared.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.store.subscribe()
    }

    pub fn is_backend_available(&self) -> bool {
        self.shared.backend_available.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.shared.policy
    }

    pub fn update_pairing_address(&self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|state| SessionState {
            pairing_address: value,
            ..state.clone()
        });
    }

    pub fn update_pairing_code(&self, value: impl Into<String>) {
        self.store_pairing_code(RedactedPairingCode::new(value));
    }

    fn store_pairing_code(&self, code: RedactedPairingCode) {
        self.edit(|state| SessionState {
            pairing_code: code,
            ..state.clone()
        });
    }

    pub fn update_connect_address(&self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|state| SessionState {
            connect_address: value,
            ..state.clone()
        });
    }

    pub fn update_command_input(&self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|state| SessionState {
            command_input: value,
            ..state.clone()
        });
    }

    /// Field edit: replaces the field and clears `last_error`.
    fn edit<F>(&self, update: F)
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        self.shared.store.replace_with(|state| SessionState {
            last_error: None,
            ..update(state)
        });
    }

    pub fn start_server(&self) -> Result<(), SessionError> {
        if !self.is_backend_available() {
            return Err(self.backend_unavailable(
                MSG_SERVER_UNAVAILABLE,
                "Server start failed: backend not wired.".to_string(),
                true,
            ));
        }
        self.submit(Operation::StartServer)
    }

    pub fn stop_server(&self) -> Result<(), SessionError> {
        if !self.is_backend_available() {
            return Err(self.backend_unavailable(
                MSG_SERVER_UNAVAILABLE,
                "Server stop failed: backend not wired.".to_string(),
                false,
            ));
        }
        self.submit(Operation::StopServer)
    }

    pub fn request_pair(&self, address: &str, code: RedactedPairingCode) -> Result<(), SessionError> {
        let address = address.trim().to_string();
        if !self.is_backend_available() {
            return Err(self.backend_unavailable(
                MSG_PAIR_UNAVAILABLE,
                format!("Pairing requested for {address}, but backend is missing."),
                false,
            ));
        }
        self.require_local(&address, "Pairing")?;
        self.submit(Operation::Pair { address, code })
    }

    pub fn request_connect(&self, address: &str) -> Result<(), SessionError> {
        let address = address.trim().to_string();
        if !self.is_backend_available() {
            return Err(self.backend_unavailable(
                MSG_CONNECT_UNAVAILABLE,
                format!("Connect requested for {address}, but backend is missing."),
                false,
            ));
        }
        self.require_local(&address, "Connect")?;
        self.submit(Operation::Connect { address })
    }

    /// Disconnect the current connect address, or everything when none is set.
    pub fn request_disconnect(&self) -> Result<(), SessionError> {
        if !self.is_backend_available() {
            return Err(self.backend_unavailable(
                MSG_DISCONNECT_UNAVAILABLE,
                "Disconnect requested, but backend is missing.".to_string(),
                false,
            ));
        }
        let address = self.snapshot().connect_address.trim().to_string();
        let address = (!address.is_empty()).then_some(address);
        self.submit(Operation::Disconnect { address })
    }

    /// Validate `input` and queue it for execution.
    ///
    /// Rejections are returned and also recorded as a failed command
    /// (exit code 1, the reason as its only output line).
    pub fn run_command(&self, input: &str, mode: CommandMode) -> Result<(), SessionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            self.shared.record_error(MSG_EMPTY_COMMAND);
            self.shared.log_line("Rejected command: empty input.");
            self.shared.notify();
            return Err(SessionError::Validation {
                message: MSG_EMPTY_COMMAND.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let display = display_form(trimmed, mode);

        if !self.is_backend_available() {
            self.reject_command(&display, MSG_COMMAND_UNAVAILABLE);
            self.shared.store.replace_with(|state| SessionState {
                connection_state: ConnectionState::Error,
                ..state.clone()
            });
            self.shared.notify();
            return Err(SessionError::BackendUnavailable {
                message: MSG_COMMAND_UNAVAILABLE.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if !self.snapshot().server_running {
            self.reject_command(&display, MSG_SERVER_NOT_RUNNING);
            self.shared.notify();
            return Err(SessionError::Validation {
                message: MSG_SERVER_NOT_RUNNING.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let plan = match plan_command(trimmed, mode, &self.shared.policy) {
            Ok(plan) => plan,
            Err(rejection) => return Err(self.reject(rejection)),
        };

        // The command buffers belong to the worker; a command still running
        // keeps them until this one is dequeued.
        let display = plan.display.clone();
        self.shared.store.replace_with(|state| SessionState {
            command_history: push_recent(&state.command_history, display, MAX_HISTORY),
            command_input: String::new(),
            ..state.clone()
        });

        self.submit(Operation::RunCommand(plan))
    }

    /// Handle a reply-style pairing code (a code typed into a system prompt).
    pub fn submit_pairing_reply(&self, input: &str) -> Result<(), SessionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(self.reject_reply(
                SessionError::Validation {
                    message: MSG_PAIRING_EMPTY.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                },
                "Pairing rejected: empty input.",
            ));
        }

        let address = self.snapshot().pairing_address.trim().to_string();
        let code = match RedactedPairingCode::parse(input) {
            Some(code) if !address.is_empty() => code,
            _ => {
                return Err(self.reject_reply(
                    SessionError::Validation {
                        message: MSG_PAIRING_INVALID.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    },
                    "Pairing rejected: invalid input.",
                ));
            }
        };

        if self.shared.policy.local_target(&address).is_none() {
            return Err(self.reject_reply(
                SessionError::SecurityRejection {
                    message: MSG_LOCAL_ONLY.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                },
                "Pairing rejected: non-local address.",
            ));
        }

        self.store_pairing_code(code.clone());
        self.request_pair(&address, code)
    }

    /// Apply a discovery event. Resolved records are re-validated before they
    /// are stored.
    pub fn apply_discovery(&self, event: ServiceEvent) {
        match event {
            ServiceEvent::Resolved { kind, host, port } => {
                match accept_resolved(&host, port, &self.shared.policy, self.shared.probe.as_ref()) {
                    Ok(address) => self.set_detected_address(kind, address),
                    Err(e) => warn!("Ignoring {kind} service at {host}:{port}: {e}"),
                }
            }
            ServiceEvent::Lost { kind } => self.set_detected_address(kind, String::new()),
            ServiceEvent::Failed { kind, code } => {
                self.shared.log_line(format!("{kind} discovery failed ({code})"));
                self.report_error(format!("Service discovery failed ({code})."));
            }
        }
    }

    /// Store a detected pairing address. An empty string means the service
    /// was lost.
    pub fn set_detected_pairing_address(&self, value: impl Into<String>) {
        let value = value.into();
        self.shared.store.replace_with(|state| SessionState {
            pairing_address: value,
            ..state.clone()
        });
    }

    /// Store a detected connect address and retry a pending auto-connect.
    pub fn set_detected_connect_address(&self, value: impl Into<String>) {
        let value = value.into();
        self.shared.store.replace_with(|state| SessionState {
            connect_address: value,
            ..state.clone()
        });

        if let Some(address) = self.shared.take_auto_connect() {
            info!("Auto-connecting to {address}");
            if let Err(e) = self.submit(Operation::Connect { address }) {
                warn!("Auto-connect could not be queued: {e}");
            }
        }
    }

    fn set_detected_address(&self, kind: ServiceKind, address: String) {
        match kind {
            ServiceKind::Pairing => self.set_detected_pairing_address(address),
            ServiceKind::Connect => self.set_detected_connect_address(address),
        }
    }

    pub fn report_error(&self, message: impl Into<String>) {
        self.shared.record_error(message);
        self.shared.notify();
    }

    pub fn log_info(&self, message: impl Into<String>) {
        self.shared.log_line(message);
    }

    pub fn clear_error(&self) {
        self.shared.store.replace_with(|state| SessionState {
            last_error: None,
            ..state.clone()
        });
    }

    pub fn clear_command_output(&self) {
        self.shared.store.replace_with(|state| SessionState {
            last_command: None,
            last_command_exit_code: None,
            last_command_output: Vec::new(),
            command_running: false,
            ..state.clone()
        });
    }

    /// Resolves once every operation queued before this call has finished.
    pub async fn drain(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.submit(Operation::Barrier(tx))?;
        rx.await.map_err(|_| SessionError::Actor {
            message: MSG_WORKER_STOPPED.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Stop the worker after the operations already queued, and wait for it.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let Some(worker) = self.worker.lock().await.take() else {
            return Ok(());
        };

        // The worker may already be gone; joining still reports how it ended.
        let _ = self.queue.send(Operation::Shutdown);

        worker.await.map_err(|e| SessionError::Actor {
            message: format!("Session worker failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn submit(&self, operation: Operation) -> Result<(), SessionError> {
        self.queue.send(operation).map_err(|_| SessionError::Actor {
            message: MSG_WORKER_STOPPED.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn backend_unavailable(&self, message: &str, log: String, server_stopped: bool) -> SessionError {
        self.shared.record_error(message);
        self.shared.log_line(log);
        self.shared.store.replace_with(|state| SessionState {
            server_running: state.server_running && !server_stopped,
            connection_state: ConnectionState::Error,
            ..state.clone()
        });
        self.shared.notify();

        SessionError::BackendUnavailable {
            message: message.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    fn require_local(&self, address: &str, action: &str) -> Result<(), SessionError> {
        if self.shared.policy.local_target(address).is_some() {
            return Ok(());
        }

        self.shared.record_error(MSG_LOCAL_ONLY);
        self.shared.log_line(format!("{action} rejected for non-local address {address}."));
        self.shared.notify();

        Err(SessionError::SecurityRejection {
            message: MSG_LOCAL_ONLY.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn reject(&self, rejection: Rejection) -> SessionError {
        self.reject_command(&rejection.display, &rejection.reason);
        self.shared.notify();
        rejection.into_error()
    }

    /// Record a refused command as a failed entry (not added to history).
    fn reject_command(&self, display: &str, reason: &str) {
        self.shared.record_error(reason);
        self.shared.store.replace_with(|state| SessionState {
            last_command: Some(display.to_string()),
            last_command_exit_code: Some(1),
            last_command_output: vec![reason.to_string()],
            command_running: false,
            ..state.clone()
        });
        self.shared.log_line(format!("Rejected command: {display}"));
    }

    fn reject_reply(&self, error: SessionError, log: &str) -> SessionError {
        self.shared.record_error(error.user_message());
        self.shared.log_line(log);
        self.shared.notify();
        error
    }
}
