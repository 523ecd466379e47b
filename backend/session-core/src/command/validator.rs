//! Subcommand resolution and the per-subcommand rule table.

use crate::ADB_BINARY;
use crate::command::tokenizer::tokenize;
use crate::error::SessionError;
use crate::security::SecurityPolicy;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};

const WAIT_FOR_PREFIX: &str = "wait-for-";
const FLAG_TERMINATOR: &str = "--";

/// Global flags that consume the following token as their value.
const VALUE_FLAGS: [&str; 7] = ["-s", "-t", "-H", "-P", "-L", "--reply-fd", "--one-device"];

/// Flags that point the client at a different server.
const SERVER_OVERRIDE_FLAGS: [&str; 3] = ["-H", "-P", "-L"];

const SERVER_LIFECYCLE_COMMANDS: [&str; 2] = ["start-server", "kill-server"];

const MSG_INVALID_COMMAND: &str = "Please enter a valid adb command.";
const MSG_MISSING_COMMAND: &str = "Please enter an adb command, like devices or connect.";
const MSG_SERVER_OVERRIDE: &str = "Overriding the adb server address isn't supported here.";
const MSG_SERVER_LIFECYCLE: &str = "Use the dedicated start/stop operations to manage the server.";
const MSG_NOT_LOCAL: &str = "This app only connects to this device.";
const MSG_UNSUPPORTED: &str = "That command isn't supported here yet. Try devices, root, shell, connect, pair, push, pull, install, or uninstall.";

/// How raw input is turned into a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    /// Input is a device shell command line (`adb shell <input>`).
    Shell,
    /// Input is an adb command line, with or without the `adb` prefix.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Validation,
    Security,
}

/// A command refused before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub display: String,
    pub reason: String,
}

impl Rejection {
    fn validation(display: &str, reason: &str) -> Self {
        Self {
            kind: RejectionKind::Validation,
            display: display.to_string(),
            reason: reason.to_string(),
        }
    }

    fn security(display: &str, reason: &str) -> Self {
        Self {
            kind: RejectionKind::Security,
            display: display.to_string(),
            reason: reason.to_string(),
        }
    }

    #[track_caller]
    pub fn into_error(self) -> SessionError {
        let location = ErrorLocation::from(Location::caller());
        match self.kind {
            RejectionKind::Validation => SessionError::Validation {
                message: self.reason,
                location,
            },
            RejectionKind::Security => SessionError::SecurityRejection {
                message: self.reason,
                location,
            },
        }
    }
}

/// Position of the subcommand inside a token list.
///
/// `effective_index` differs from `index` only for `wait-for-*` wrappers, where
/// the real command is the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcommandSpan {
    pub index: usize,
    pub effective_index: usize,
}

impl SubcommandSpan {
    pub fn subcommand<'a>(&self, args: &'a [String]) -> Option<&'a str> {
        args.get(self.index).map(String::as_str)
    }

    pub fn effective<'a>(&self, args: &'a [String]) -> Option<&'a str> {
        args.get(self.effective_index).map(String::as_str)
    }

    /// Tokens strictly after the effective subcommand.
    pub fn arguments<'a>(&self, args: &'a [String]) -> &'a [String] {
        args.get(self.effective_index + 1..).unwrap_or_default()
    }
}

/// Find the subcommand, skipping global flags.
///
/// Returns `None` when no token is left after the flags.
pub fn resolve_subcommand(args: &[String]) -> Option<SubcommandSpan> {
    let mut i = 0;
    let index = loop {
        let arg = args.get(i)?.as_str();
        if !arg.starts_with('-') {
            break i;
        }
        if arg == FLAG_TERMINATOR {
            break i + 1;
        }
        // Glued values (-semulator-5554), -d/-e/-a and unknown flags take one token.
        i += if VALUE_FLAGS.contains(&arg) { 2 } else { 1 };
    };

    let subcommand = args.get(index)?;
    let effective_index = if subcommand.starts_with(WAIT_FOR_PREFIX) {
        index + 1
    } else {
        index
    };

    Some(SubcommandSpan {
        index,
        effective_index,
    })
}

fn has_server_override(args: &[String], index: usize) -> bool {
    args[..index].iter().any(|arg| {
        SERVER_OVERRIDE_FLAGS
            .iter()
            .any(|flag| arg.starts_with(flag))
    })
}

fn check_arguments(command: &str, arguments: &[String]) -> Result<(), &'static str> {
    let count = arguments.len();
    let (ok, usage) = match command {
        "devices" | "version" | "help" | "root" | "unroot" => (true, ""),
        "shell" => (count >= 1, "Shell needs a command here. Try: adb shell getprop"),
        "connect" => (count == 1, "Usage: adb connect HOST[:PORT]"),
        "disconnect" => (count <= 1, "Usage: adb disconnect [HOST[:PORT]]"),
        "pair" => ((1..=2).contains(&count), "Usage: adb pair HOST[:PORT] [PAIRING CODE]"),
        "push" => (count >= 2, "Usage: adb push <source> <destination>"),
        "pull" => (count >= 1, "Usage: adb pull <remote> [local]"),
        "install" => (count >= 1, "Usage: adb install <apk>"),
        "install-multiple" => (count >= 1, "Usage: adb install-multiple <apk...>"),
        "uninstall" => (count >= 1, "Usage: adb uninstall <package>"),
        _ => (false, MSG_UNSUPPORTED),
    };

    if ok { Ok(()) } else { Err(usage) }
}

/// The transcript form of a command: `adb shell <input>` in shell mode,
/// otherwise the input with an `adb` prefix added when missing.
pub fn display_form(trimmed: &str, mode: CommandMode) -> String {
    match mode {
        CommandMode::Shell => format!("{ADB_BINARY} shell {trimmed}"),
        CommandMode::Direct => {
            let prefixed = trimmed == ADB_BINARY
                || trimmed
                    .strip_prefix(ADB_BINARY)
                    .is_some_and(|rest| rest.starts_with(' '));
            if prefixed {
                trimmed.to_string()
            } else {
                format!("{ADB_BINARY} {trimmed}")
            }
        }
    }
}

/// An accepted command, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Tokens handed to the backend (program name stripped).
    pub args: Vec<String>,
    pub display: String,
    /// The subcommand after `wait-for-*` unwrapping.
    pub effective: String,
    /// Address argument of `pair`/`connect`/`disconnect`, when present.
    pub target: Option<String>,
}

/// Tokenize and validate `input` (already trimmed, non-empty).
///
/// Shell mode skips the security rules: it always runs on the device that is
/// already connected.
pub fn plan_command(
    trimmed: &str,
    mode: CommandMode,
    policy: &SecurityPolicy,
) -> Result<CommandPlan, Rejection> {
    let display = display_form(trimmed, mode);
    let direct = mode == CommandMode::Direct;

    // Both modes tokenize the transcript form; the leading `adb` is dropped.
    let args = tokenize(&display);

    let span = resolve_subcommand(&args)
        .ok_or_else(|| Rejection::validation(&display, MSG_INVALID_COMMAND))?;

    if direct && has_server_override(&args, span.index) {
        return Err(Rejection::security(&display, MSG_SERVER_OVERRIDE));
    }

    let effective = span
        .effective(&args)
        .ok_or_else(|| Rejection::validation(&display, MSG_MISSING_COMMAND))?
        .to_string();

    if direct && SERVER_LIFECYCLE_COMMANDS.contains(&effective.as_str()) {
        return Err(Rejection::security(&display, MSG_SERVER_LIFECYCLE));
    }

    let arguments = span.arguments(&args);
    check_arguments(&effective, arguments)
        .map_err(|usage| Rejection::validation(&display, usage))?;

    let first_argument = arguments.first().cloned();

    if direct && matches!(effective.as_str(), "connect" | "pair") {
        let local = first_argument
            .as_deref()
            .and_then(|target| policy.local_target(target))
            .is_some();
        if !local {
            return Err(Rejection::security(&display, MSG_NOT_LOCAL));
        }
    }

    let target = match effective.as_str() {
        "pair" | "connect" | "disconnect" => first_argument,
        _ => None,
    };

    Ok(CommandPlan {
        args,
        display,
        effective,
        target,
    })
}
