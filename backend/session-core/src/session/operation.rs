use crate::command::CommandPlan;

use common::RedactedPairingCode;

use tokio::sync::oneshot;

/// Work items drained by the session worker, in submission order.
#[derive(Debug)]
pub(crate) enum Operation {
    StartServer,
    StopServer,
    Pair {
        address: String,
        code: RedactedPairingCode,
    },
    Connect {
        address: String,
    },
    Disconnect {
        address: Option<String>,
    },
    RunCommand(CommandPlan),
    /// Completes once everything queued before it has run.
    Barrier(oneshot::Sender<()>),
    /// Last message the worker handles.
    Shutdown,
}
