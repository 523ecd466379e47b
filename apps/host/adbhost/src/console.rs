//! Line console front-end.
//!
//! Plain lines run as direct adb commands, `$ `-prefixed lines run through
//! `adb shell`, and `:`-prefixed lines drive the session itself. The session
//! transcript is printed as snapshots arrive.

use crate::error::AdbHostError;

use session_core::error::SessionError;
use session_core::notification::StatusSummary;
use session_core::{CommandMode, SessionController, SessionState};

use common::RedactedPairingCode;

use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tokio::sync::watch;

const SHELL_PREFIX: &str = "$ ";

pub const HELP: &str = "\
Commands:
  <args>                 run `adb <args>`
  $ <command>            run `adb shell <command>`
  :start | :stop         start or stop the adb server
  :pair <addr> <code>    pair with the wireless-debugging service
  :connect <addr>        connect to the device
  :disconnect            disconnect the current device
  :code <digits>         answer a pairing prompt for the detected service
  :clear                 clear the last command and error
  :status                show the session status
  :quit                  exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Empty,
    Run { input: String, mode: CommandMode },
    Start,
    Stop,
    Pair { address: String, code: String },
    Connect { address: String },
    Disconnect,
    Code(String),
    Clear,
    Status,
    Help,
    Quit,
}

/// Parse a console line.
///
/// # Errors
///
/// Returns [`AdbHostError::Console`] for unknown `:` commands and missing
/// arguments.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, AdbHostError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ConsoleCommand::Empty);
    }

    if let Some(command) = line.trim_start().strip_prefix(SHELL_PREFIX) {
        return Ok(ConsoleCommand::Run {
            input: command.trim().to_string(),
            mode: CommandMode::Shell,
        });
    }

    let Some(directive) = trimmed.strip_prefix(':') else {
        return Ok(ConsoleCommand::Run {
            input: trimmed.to_string(),
            mode: CommandMode::Direct,
        });
    };

    let mut words = directive.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let command = match (name, args.as_slice()) {
        ("start", []) => ConsoleCommand::Start,
        ("stop", []) => ConsoleCommand::Stop,
        ("pair", [address, code]) => ConsoleCommand::Pair {
            address: address.to_string(),
            code: code.to_string(),
        },
        ("connect", [address]) => ConsoleCommand::Connect {
            address: address.to_string(),
        },
        ("disconnect", []) => ConsoleCommand::Disconnect,
        ("code", [digits]) => ConsoleCommand::Code(digits.to_string()),
        ("clear", []) => ConsoleCommand::Clear,
        ("status", []) => ConsoleCommand::Status,
        ("help", []) => ConsoleCommand::Help,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        ("pair", _) => return Err(AdbHostError::console("Usage: :pair <addr> <code>")),
        ("connect", _) => return Err(AdbHostError::console("Usage: :connect <addr>")),
        ("code", _) => return Err(AdbHostError::console("Usage: :code <digits>")),
        (
            "start" | "stop" | "disconnect" | "clear" | "status" | "help" | "quit" | "exit",
            _,
        ) => {
            return Err(AdbHostError::console(format!(":{name} takes no arguments")));
        }
        _ => return Err(AdbHostError::console(format!("Unknown command :{name}"))),
    };

    Ok(command)
}

/// What the console loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Hand a parsed command to the controller.
///
/// Rejections are already recorded in the session and come back through the
/// transcript; only a dead worker is an error here.
pub fn dispatch(controller: &SessionController, command: ConsoleCommand) -> Result<Flow, AdbHostError> {
    let result = match command {
        ConsoleCommand::Empty => Ok(()),
        ConsoleCommand::Run { input, mode } => {
            controller.update_command_input(input.as_str());
            controller.run_command(&input, mode)
        }
        ConsoleCommand::Start => controller.start_server(),
        ConsoleCommand::Stop => controller.stop_server(),
        ConsoleCommand::Pair { address, code } => {
            controller.update_pairing_address(address.as_str());
            controller.update_pairing_code(code.as_str());
            controller.request_pair(&address, RedactedPairingCode::new(code))
        }
        ConsoleCommand::Connect { address } => {
            controller.update_connect_address(address.as_str());
            controller.request_connect(&address)
        }
        ConsoleCommand::Disconnect => controller.request_disconnect(),
        ConsoleCommand::Code(digits) => controller.submit_pairing_reply(&digits),
        ConsoleCommand::Clear => {
            controller.clear_command_output();
            controller.clear_error();
            Ok(())
        }
        ConsoleCommand::Status => {
            println!("{}", status_report(&controller.snapshot()));
            Ok(())
        }
        ConsoleCommand::Help => {
            println!("{HELP}");
            Ok(())
        }
        ConsoleCommand::Quit => return Ok(Flow::Quit),
    };

    match result {
        Ok(()) => Ok(Flow::Continue),
        Err(e @ SessionError::Actor { .. }) => Err(e.into()),
        Err(e) => {
            debug!("Console request rejected: {e}");
            Ok(Flow::Continue)
        }
    }
}

/// Multi-line status block for `:status`.
pub fn status_report(state: &SessionState) -> String {
    let summary = StatusSummary::from_state(state);
    let mut report = format!("{}: {}", summary.title, summary.text);

    if !state.pairing_address.is_empty() {
        report.push_str(&format!("\n  pairing: {}", state.pairing_address));
    }
    if !state.connect_address.is_empty() {
        report.push_str(&format!("\n  connect: {}", state.connect_address));
    }
    if let Some(command) = &state.last_command {
        let status = match (state.command_running, state.last_command_exit_code) {
            (true, _) => "running".to_string(),
            (false, Some(code)) => format!("exit {code}"),
            (false, None) => "pending".to_string(),
        };
        report.push_str(&format!("\n  last command: {command} ({status})"));
    }
    if let Some(error) = &summary.last_error {
        report.push_str(&format!("\n  error: {error}"));
    }

    report
}

/// Read stdin until `:quit` or end of input.
pub async fn run(controller: &SessionController) -> Result<(), AdbHostError> {
    println!("{HELP}");
    let mut lines = BufReader::new(stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(AdbHostError::Console { message, .. }) => {
                println!("! {message}");
                continue;
            }
            Err(e) => return Err(e),
        };

        if dispatch(controller, command)? == Flow::Quit {
            break;
        }
    }

    info!("Console closed");
    Ok(())
}

/// Lines of `next` that were not in `previous`, for a most-recent-first
/// buffer that drops its oldest entries. Returned oldest first.
pub fn fresh_log_lines<'a>(previous: &[String], next: &'a [String]) -> Vec<&'a String> {
    let added = (0..=next.len())
        .find(|&k| previous.starts_with(&next[k..]))
        .unwrap_or(next.len());
    next[..added].iter().rev().collect()
}

/// Lines of `next` that were not in `previous`, for an arrival-order buffer
/// that drops its oldest entries.
pub fn fresh_output_lines<'a>(previous: &[String], next: &'a [String]) -> &'a [String] {
    let dropped = (0..=previous.len())
        .find(|&d| next.starts_with(&previous[d..]))
        .unwrap_or(previous.len());
    &next[previous.len() - dropped..]
}

/// Print transcript lines, command output and new errors as snapshots arrive.
pub async fn print_updates(mut states: watch::Receiver<SessionState>) {
    let mut previous = states.borrow_and_update().clone();

    while states.changed().await.is_ok() {
        let next = states.borrow_and_update().clone();

        for line in fresh_log_lines(&previous.logs, &next.logs) {
            println!("* {line}");
        }

        let output_reset = next.last_command != previous.last_command
            || next.last_command_output.is_empty();
        let previous_output: &[String] = if output_reset {
            &[]
        } else {
            &previous.last_command_output
        };
        for line in fresh_output_lines(previous_output, &next.last_command_output) {
            println!("  | {line}");
        }

        if next.last_error != previous.last_error {
            if let Some(error) = &next.last_error {
                println!("! {error}");
            }
        }

        previous = next;
    }
}
