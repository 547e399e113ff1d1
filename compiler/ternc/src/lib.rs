//! Library surface of the `tern` CLI.
//!
//! The binary parses arguments and delegates here; tests drive the same
//! functions against temp files.

pub mod commands;

pub use commands::{
    check_files, load_rule_config, print_reports, print_rules, CheckCommandOptions, CliError,
    FileReport,
};
