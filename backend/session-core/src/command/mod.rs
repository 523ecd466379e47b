//! Command-line handling for ad-hoc debug commands.
//!
//! [`tokenize`] turns raw input into arguments; [`validator`] finds the
//! effective subcommand and applies argument and security rules before anything
//! is queued for the backend.

pub mod tokenizer;
pub mod validator;

pub use tokenizer::tokenize;
pub use validator::{
    CommandMode, CommandPlan, Rejection, RejectionKind, SubcommandSpan, display_form,
    plan_command, resolve_subcommand,
};
