use crate::command::{
    CommandMode, RejectionKind, display_form, plan_command, resolve_subcommand, tokenize,
};
use crate::error::SessionError;
use crate::security::SecurityPolicy;

use std::net::{IpAddr, Ipv4Addr};

fn policy() -> SecurityPolicy {
    SecurityPolicy::with_local_addresses([IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))])
}

fn args(input: &str) -> Vec<String> {
    tokenize(input)
}

/// **VALUE**: Verifies global flags with values are skipped when finding the subcommand.
///
/// **WHY THIS MATTERS**: `-s <serial>` is the most common prefix; treating the serial
/// as the subcommand would reject valid commands.
///
/// **BUG THIS CATCHES**: Value flags consuming only one token.
#[test]
fn given_serial_flag_when_resolving_then_subcommand_follows_its_value() {
    // GIVEN: A command with -s and its value
    let tokens = args("-s emulator-5554 shell ls");

    // WHEN: Resolving the subcommand
    let span = resolve_subcommand(&tokens).expect("subcommand");

    // THEN: shell, with [ls] as arguments
    assert_eq!(span.subcommand(&tokens), Some("shell"));
    assert_eq!(span.arguments(&tokens), ["ls".to_string()]);
}

#[test]
fn given_wait_for_prefix_when_resolving_then_effective_subcommand_is_next_token() {
    let tokens = args("wait-for-device shell ls");

    let span = resolve_subcommand(&tokens).expect("subcommand");

    assert_eq!(span.subcommand(&tokens), Some("wait-for-device"));
    assert_eq!(span.effective(&tokens), Some("shell"));
    assert_eq!(span.arguments(&tokens), ["ls".to_string()]);
}

#[test]
fn given_flag_terminator_when_resolving_then_next_token_is_subcommand() {
    let tokens = args("-d -- devices");

    let span = resolve_subcommand(&tokens).expect("subcommand");

    assert_eq!(span.subcommand(&tokens), Some("devices"));
}

#[test]
fn given_only_flags_when_resolving_then_no_subcommand() {
    assert!(resolve_subcommand(&args("-s emulator-5554")).is_none());
    assert!(resolve_subcommand(&args("-d --")).is_none());
    assert!(resolve_subcommand(&[]).is_none());
}

#[test]
fn given_direct_input_when_display_form_built_then_adb_prefix_added_once() {
    assert_eq!(display_form("devices", CommandMode::Direct), "adb devices");
    assert_eq!(display_form("adb devices", CommandMode::Direct), "adb devices");
    assert_eq!(display_form("adbd", CommandMode::Direct), "adb adbd");
    assert_eq!(display_form("ls -la", CommandMode::Shell), "adb shell ls -la");
}

/// **VALUE**: The headline security property: remote connect targets never reach the backend.
///
/// **WHY THIS MATTERS**: The self-host check is the only thing preventing the host
/// from being pointed at another machine.
///
/// **BUG THIS CATCHES**: The connect target check being skipped or applied to the
/// wrong token.
#[test]
fn given_remote_connect_target_when_planning_then_security_rejection() {
    // GIVEN: A public address
    // WHEN: Planning a direct connect
    let rejection = plan_command("connect 8.8.8.8:5555", CommandMode::Direct, &policy())
        .expect_err("remote target must be rejected");

    // THEN: Security rejection with the user-facing message
    assert_eq!(rejection.kind, RejectionKind::Security);
    assert_eq!(rejection.reason, "This app only connects to this device.");
    assert_eq!(rejection.display, "adb connect 8.8.8.8:5555");
}

#[test]
fn given_loopback_connect_target_when_planning_then_plan_carries_target() {
    let plan = plan_command("connect 127.0.0.1:5555", CommandMode::Direct, &policy())
        .expect("loopback target accepted");

    assert_eq!(plan.args, vec!["connect", "127.0.0.1:5555"]);
    assert_eq!(plan.effective, "connect");
    assert_eq!(plan.target.as_deref(), Some("127.0.0.1:5555"));
    assert_eq!(plan.display, "adb connect 127.0.0.1:5555");
}

#[test]
fn given_local_interface_pair_target_when_planning_then_accepted() {
    let plan = plan_command("pair 192.168.1.20:37000 123456", CommandMode::Direct, &policy())
        .expect("interface address accepted");

    assert_eq!(plan.target.as_deref(), Some("192.168.1.20:37000"));
}

#[test]
fn given_wait_for_connect_with_remote_target_when_planning_then_rejected() {
    let rejection = plan_command("wait-for-device connect 10.0.0.9:5555", CommandMode::Direct, &policy())
        .expect_err("remote target behind wait-for must be rejected");

    assert_eq!(rejection.kind, RejectionKind::Security);
}

#[test]
fn given_connect_target_without_port_when_planning_then_rejected_as_not_local() {
    let rejection = plan_command("connect localhost", CommandMode::Direct, &policy())
        .expect_err("target without port cannot be verified");

    assert_eq!(rejection.kind, RejectionKind::Security);
}

#[test]
fn given_server_override_flag_when_planning_direct_then_rejected() {
    for input in ["-H 10.0.0.2 devices", "-P 5038 devices", "-Ltcp:5038 devices"] {
        let rejection = plan_command(input, CommandMode::Direct, &policy())
            .expect_err("server override must be rejected");

        assert_eq!(rejection.kind, RejectionKind::Security, "input: {input}");
        assert_eq!(
            rejection.reason,
            "Overriding the adb server address isn't supported here."
        );
    }
}

#[test]
fn given_server_lifecycle_command_when_planning_direct_then_rejected() {
    for input in ["start-server", "adb kill-server"] {
        let rejection =
            plan_command(input, CommandMode::Direct, &policy()).expect_err("lifecycle rejected");

        assert_eq!(rejection.kind, RejectionKind::Security);
        assert_eq!(
            rejection.reason,
            "Use the dedicated start/stop operations to manage the server."
        );
    }
}

/// **VALUE**: Documents the one deliberate asymmetry: shell mode skips the security rules.
///
/// **WHY THIS MATTERS**: Shell commands run on the device that is already
/// connected; their arguments are not host targets.
///
/// **BUG THIS CATCHES**: Accidentally applying host checks to shell arguments and
/// rejecting harmless device commands.
#[test]
fn given_shell_mode_when_planning_then_security_rules_do_not_apply() {
    let plan = plan_command("ping -c 1 8.8.8.8", CommandMode::Shell, &policy())
        .expect("shell command accepted");

    assert_eq!(plan.args, vec!["shell", "ping", "-c", "1", "8.8.8.8"]);
    assert_eq!(plan.effective, "shell");
    assert_eq!(plan.display, "adb shell ping -c 1 8.8.8.8");
}

#[test]
fn given_argument_rules_when_planning_then_usage_messages_returned() {
    let cases = [
        ("connect", "Usage: adb connect HOST[:PORT]"),
        ("connect a:1 b:2", "Usage: adb connect HOST[:PORT]"),
        ("disconnect a:1 b:2", "Usage: adb disconnect [HOST[:PORT]]"),
        ("pair", "Usage: adb pair HOST[:PORT] [PAIRING CODE]"),
        ("push only-one", "Usage: adb push <source> <destination>"),
        ("pull", "Usage: adb pull <remote> [local]"),
        ("install", "Usage: adb install <apk>"),
        ("install-multiple", "Usage: adb install-multiple <apk...>"),
        ("uninstall", "Usage: adb uninstall <package>"),
        ("shell", "Shell needs a command here. Try: adb shell getprop"),
    ];

    for (input, usage) in cases {
        let rejection = plan_command(input, CommandMode::Direct, &policy())
            .expect_err("argument rule must reject");

        assert_eq!(rejection.kind, RejectionKind::Validation, "input: {input}");
        assert_eq!(rejection.reason, usage, "input: {input}");
    }
}

#[test]
fn given_unconstrained_subcommands_when_planning_then_accepted() {
    for input in ["devices", "devices -l", "version", "help", "root", "unroot", "disconnect"] {
        assert!(
            plan_command(input, CommandMode::Direct, &policy()).is_ok(),
            "input: {input}"
        );
    }
}

#[test]
fn given_unsupported_subcommand_when_planning_then_rejected() {
    let rejection = plan_command("reboot bootloader", CommandMode::Direct, &policy())
        .expect_err("unsupported");

    assert_eq!(rejection.kind, RejectionKind::Validation);
    assert!(rejection.reason.starts_with("That command isn't supported here yet."));
}

#[test]
fn given_flags_without_subcommand_when_planning_then_generic_usage() {
    let rejection =
        plan_command("-s emulator-5554", CommandMode::Direct, &policy()).expect_err("no command");

    assert_eq!(rejection.reason, "Please enter a valid adb command.");
}

#[test]
fn given_dangling_wait_for_when_planning_then_asks_for_a_command() {
    let rejection =
        plan_command("wait-for-device", CommandMode::Direct, &policy()).expect_err("no command");

    assert_eq!(
        rejection.reason,
        "Please enter an adb command, like devices or connect."
    );
}

#[test]
fn given_rejection_when_converted_then_error_kind_matches() {
    let security = plan_command("connect 8.8.8.8:5555", CommandMode::Direct, &policy())
        .expect_err("rejected")
        .into_error();
    let validation = plan_command("connect", CommandMode::Direct, &policy())
        .expect_err("rejected")
        .into_error();

    assert!(matches!(security, SessionError::SecurityRejection { .. }));
    assert!(matches!(validation, SessionError::Validation { .. }));
    assert_eq!(validation.user_message(), "Usage: adb connect HOST[:PORT]");
}
