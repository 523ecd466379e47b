use crate::backend::{DebugBackend, OutputSink};
use crate::command::CommandPlan;
use crate::error::{BackendError, SessionError};
use crate::session::controller::Shared;
use crate::session::history::{MAX_COMMAND_OUTPUT, MIRRORED_OUTPUT_LINES, append_bounded};
use crate::session::operation::Operation;
use crate::session::state::{SessionEvent, SessionState};

use common::{ErrorLocation, RedactedPairingCode};

use std::panic::Location;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;

/// The single worker draining the operation queue.
///
/// This task is the only caller of the backend and the only writer of the
/// command buffers (`last_command`, its exit code and output, and
/// `command_running`).
pub(crate) struct Executor {
    shared: Arc<Shared>,
    rx: mpsc::UnboundedReceiver<Operation>,
}

impl Executor {
    pub(crate) fn new(shared: Arc<Shared>, rx: mpsc::UnboundedReceiver<Operation>) -> Self {
        Self { shared, rx }
    }

    pub(crate) async fn run(mut self) {
        info!("Session worker started");

        while let Some(operation) = self.rx.recv().await {
            debug!("Session worker handling {operation:?}");
            match operation {
                Operation::StartServer => self.start_server().await,
                Operation::StopServer => self.stop_server().await,
                Operation::Pair { address, code } => self.pair(address, code).await,
                Operation::Connect { address } => self.connect(address).await,
                Operation::Disconnect { address } => self.disconnect(address).await,
                Operation::RunCommand(plan) => self.run_command(plan).await,
                Operation::Barrier(done) => {
                    let _ = done.send(());
                    continue;
                }
                Operation::Shutdown => break,
            }
            self.shared.notify();
        }

        info!("Session worker stopped");
    }

    /// Run one backend call on the blocking pool.
    #[track_caller]
    pub(crate) fn call<F>(&self, f: F) -> impl Future<Output = Result<String, BackendError>>
    where
        F: FnOnce(&dyn DebugBackend) -> Result<String, BackendError> + Send + 'static,
    {
        let location = ErrorLocation::from(Location::caller());
        let backend = Arc::clone(&self.shared.backend);
        async move {
            match tokio::task::spawn_blocking(move || f(backend.as_ref())).await {
                Ok(result) => result,
                Err(e) => Err(BackendError::Worker {
                    message: format!("Backend call did not complete: {e}"),
                    location,
                }),
            }
        }
    }

    /// Record a backend failure: `last_error`, a log line and the `Error` state.
    fn fail(&self, error: BackendError, log: String) {
        let error = SessionError::from(error);
        self.shared.record_error(error.user_message());
        self.shared.log_line(log);
        self.apply(SessionEvent::Failed);
    }

    fn apply(&self, event: SessionEvent) {
        self.shared
            .store
            .replace_with(|state| state.transition(event));
    }

    /// Apply `event`, clear `last_error` and log the backend's message.
    fn succeed(&self, event: SessionEvent, message: String) {
        self.shared.store.replace_with(|state| SessionState {
            last_error: None,
            ..state.transition(event)
        });
        self.shared.log_line(message);
    }

    async fn start_server(&self) {
        match self.call(|backend| backend.start_server()).await {
            Ok(message) => {
                self.shared.store.replace_with(|state| SessionState {
                    server_running: true,
                    last_error: None,
                    ..state.transition(SessionEvent::ServerStarted {
                        was_running: state.server_running,
                    })
                });
                self.shared.log_line(message);
            }
            Err(e) => {
                self.fail(e, "Server start failed.".to_string());
                self.shared.store.replace_with(|state| SessionState {
                    server_running: false,
                    ..state.clone()
                });
            }
        }
    }

    async fn stop_server(&self) {
        match self.call(|backend| backend.stop_server()).await {
            Ok(message) => {
                self.shared.store.replace_with(|state| SessionState {
                    server_running: false,
                    last_error: None,
                    ..state.transition(SessionEvent::ServerStopped)
                });
                self.shared.log_line(message);
            }
            Err(e) => self.fail(e, "Server stop failed.".to_string()),
        }
    }

    async fn pair(&self, address: String, code: RedactedPairingCode) {
        self.shared.store.replace_with(|state| SessionState {
            pairing_address: address.clone(),
            last_error: None,
            ..state.transition(SessionEvent::PairingStarted)
        });
        self.shared.notify();

        let target = address.clone();
        match self.call(move |backend| backend.pair(&target, &code)).await {
            Ok(message) => {
                self.succeed(SessionEvent::PairingSucceeded, message);
                self.shared.arm_auto_connect();
                if let Some(connect_address) = self.shared.take_auto_connect() {
                    info!("Auto-connecting to {connect_address} after pairing");
                    self.connect(connect_address).await;
                }
            }
            Err(e) => self.fail(e, format!("Pairing failed for {address}.")),
        }
    }

    async fn connect(&self, address: String) {
        self.shared.store.replace_with(|state| SessionState {
            connect_address: address.clone(),
            ..state.clone()
        });

        let target = address.clone();
        match self.call(move |backend| backend.connect(&target)).await {
            Ok(message) => self.succeed(SessionEvent::ConnectSucceeded, message),
            Err(e) => self.fail(e, format!("Connect failed for {address}.")),
        }
    }

    async fn disconnect(&self, address: Option<String>) {
        match self
            .call(move |backend| backend.disconnect(address.as_deref()))
            .await
        {
            Ok(message) => self.succeed(SessionEvent::DisconnectSucceeded, message),
            Err(e) => self.fail(e, "Disconnect failed.".to_string()),
        }
    }

    async fn run_command(&self, plan: CommandPlan) {
        let CommandPlan {
            args,
            display,
            effective,
            target,
        } = plan;

        self.shared.store.replace_with(|state| SessionState {
            last_command: Some(display.clone()),
            last_command_exit_code: None,
            last_command_output: Vec::new(),
            command_running: true,
            ..state.clone()
        });
        self.shared.log_line(format!("Command running: {display}"));
        self.shared.notify();

        let (sink, mut output) = OutputSink::channel();
        let backend = Arc::clone(&self.shared.backend);
        let task = tokio::task::spawn_blocking(move || backend.run_command_streaming(&args, &sink));

        // The sink lives inside the blocking task, so the channel closes when
        // the command returns (or panics).
        while let Some(line) = output.recv().await {
            self.append_output(&line);
        }

        let exit_code = match task.await {
            Ok(code) => code,
            Err(e) => {
                error!("Command task for {display} failed: {e}");
                -1
            }
        };

        let event = match (exit_code, effective.as_str()) {
            (0, "pair") => Some(SessionEvent::PairingSucceeded),
            (0, "connect") => Some(SessionEvent::ConnectSucceeded),
            (0, "disconnect") => Some(SessionEvent::DisconnectSucceeded),
            (_, "pair" | "connect" | "disconnect") => Some(SessionEvent::Failed),
            _ => None,
        };

        let mirrored: Vec<String> = self
            .shared
            .store
            .snapshot()
            .last_command_output
            .into_iter()
            .take(MIRRORED_OUTPUT_LINES)
            .collect();

        self.shared.store.replace_with(|state| {
            let next = match event {
                Some(event) => state.transition(event),
                None => state.clone(),
            };
            let (pairing_address, connect_address) = match (exit_code, effective.as_str(), &target)
            {
                (0, "pair", Some(target)) => (target.clone(), next.connect_address),
                (0, "connect", Some(target)) => (next.pairing_address, target.clone()),
                _ => (next.pairing_address, next.connect_address),
            };

            SessionState {
                pairing_address,
                connect_address,
                last_command_exit_code: Some(exit_code),
                command_running: false,
                ..next
            }
        });

        for line in mirrored {
            self.shared.log_line(line);
        }

        if exit_code != 0 {
            let failure = SessionError::non_zero_exit(exit_code);
            self.shared.record_error(failure.user_message());
            self.shared.log_line(format!("Command failed: {display}"));
        } else {
            self.shared.log_line(format!("Command completed: {display}"));
        }
    }

    fn append_output(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let line = line.trim_end().to_string();
        self.shared.store.replace_with(|state| SessionState {
            last_command_output: append_bounded(
                &state.last_command_output,
                line,
                MAX_COMMAND_OUTPUT,
            ),
            ..state.clone()
        });
    }
}
