//! The `check` and `rules` commands.
//!
//! Input files are serialized syntax trees (the external parser's hand-off
//! format); configuration is a JSON table of rule name to severity name.
//! Files fan out across rayon workers, one analysis session each, with no
//! shared mutable state beyond the interner.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;

use tern_check::{CancellationToken, CheckOptions, FileSession};
use tern_diagnostic::{wire::WireDiagnostic, Category, Diagnostic, Rule, RuleConfig};
use tern_ir::{wire::WireProgram, EmptyResolver, LineIndex, StringInterner};

/// Errors surfaced to the CLI user before analysis starts.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("{path} is not a valid syntax-tree file: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("{path}: {detail}")]
    Malformed { path: String, detail: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] tern_diagnostic::ConfigError),
    #[error("analysis did not complete: {0}")]
    Analysis(#[from] tern_check::AnalysisError),
}

/// Options for the `check` command.
#[derive(Debug, Default)]
pub struct CheckCommandOptions {
    pub config_path: Option<String>,
    pub json: bool,
    pub error_limit: usize,
}

/// Result of checking one input file.
pub struct FileReport {
    pub path: String,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.category == Category::Error)
    }

    pub fn wire(&self) -> Vec<WireDiagnostic> {
        let index = LineIndex::build(&self.source);
        self.diagnostics
            .iter()
            .map(|d| WireDiagnostic::from_diagnostic(d, &self.source, &index))
            .collect()
    }
}

/// Load the rule table from a JSON config file.
///
/// Unknown rule names inside the table are ignored with a logged warning;
/// unknown severities are errors.
pub fn load_rule_config(path: &str) -> Result<RuleConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })?;
    let table: BTreeMap<String, String> =
        serde_json::from_str(&text).map_err(|source| CliError::Parse {
            path: path.to_owned(),
            source,
        })?;
    let config = RuleConfig::from_entries(
        table.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    Ok(config)
}

fn check_one(path: &str, options: &CheckOptions) -> Result<FileReport, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })?;
    let program: WireProgram =
        serde_json::from_str(&text).map_err(|source| CliError::Parse {
            path: path.to_owned(),
            source,
        })?;
    let interner = Arc::new(StringInterner::new());
    let (source, ast) = program.load(&interner).map_err(|e| CliError::Malformed {
        path: path.to_owned(),
        detail: e.to_string(),
    })?;

    let mut session = FileSession::new(
        source,
        ast,
        Arc::clone(&interner),
        Box::new(EmptyResolver),
    );
    let diagnostics = session.check_file(options, &CancellationToken::new())?;
    tracing::debug!(path, findings = diagnostics.len(), "file checked");
    Ok(FileReport {
        path: path.to_owned(),
        source: session.source().to_owned(),
        diagnostics,
    })
}

/// Check every input file, one session per file on the worker pool.
///
/// Per-file diagnostics are in source order; the report list preserves the
/// argument order regardless of which worker finished first.
pub fn check_files(
    paths: &[String],
    rules: &RuleConfig,
    options: &CheckCommandOptions,
) -> Vec<Result<FileReport, CliError>> {
    let check_options = CheckOptions {
        rules: rules.clone(),
        error_limit: options.error_limit,
    };
    paths
        .par_iter()
        .map(|path| check_one(path, &check_options))
        .collect()
}

/// Print reports in the human or wire format. Returns the exit code.
pub fn print_reports(
    reports: &[Result<FileReport, CliError>],
    options: &CheckCommandOptions,
) -> i32 {
    let mut exit = 0;
    for report in reports {
        match report {
            Ok(report) => {
                if options.json {
                    print_wire(report);
                } else {
                    print_human(report);
                }
                if report.has_errors() {
                    exit = 1;
                }
            }
            Err(e) => {
                eprintln!("error: {e}");
                exit = 2;
            }
        }
    }
    exit
}

fn print_human(report: &FileReport) {
    let index = LineIndex::build(&report.source);
    for diag in &report.diagnostics {
        let (line, col) = index.span_start(&report.source, diag.span);
        match diag.rule {
            Some(rule) => println!(
                "{}[{}]: {} --> {}:{line}:{col}",
                diag.category, rule, diag.message, report.path
            ),
            None => println!(
                "{}: {} --> {}:{line}:{col}",
                diag.category, diag.message, report.path
            ),
        }
    }
    let errors = report
        .diagnostics
        .iter()
        .filter(|d| d.category == Category::Error)
        .count();
    if errors > 0 {
        println!("{}: {} error(s)", report.path, errors);
    }
}

fn print_wire(report: &FileReport) {
    let wire = report.wire();
    let payload = serde_json::json!({
        "file": report.path,
        "diagnostics": wire,
    });
    match serde_json::to_string(&payload) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: cannot serialize diagnostics: {e}"),
    }
}

/// Print the rule table with default severities.
pub fn print_rules() {
    for rule in Rule::ALL {
        println!("{:<24} {}", rule.as_str(), rule.default_severity());
    }
}
