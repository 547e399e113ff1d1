//! Shared fixture plumbing for checker integration tests.

use std::sync::Arc;

use tern_check::{CancellationToken, CheckOptions, FileSession};
use tern_diagnostic::Diagnostic;
use tern_ir::{AstBuilder, EmptyResolver, ModuleResolver, StmtId, StringInterner};

/// Opt into log output with `RUST_LOG=tern_check=debug cargo test`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a session over a programmatically-constructed module.
pub fn session_from(
    build: impl FnOnce(&mut AstBuilder) -> Vec<StmtId>,
) -> (FileSession, Arc<StringInterner>) {
    session_with_resolver(build, Box::new(EmptyResolver))
}

pub fn session_with_resolver(
    build: impl FnOnce(&mut AstBuilder) -> Vec<StmtId>,
    resolver: Box<dyn ModuleResolver>,
) -> (FileSession, Arc<StringInterner>) {
    init_logging();
    let interner = Arc::new(StringInterner::new());
    let mut builder = AstBuilder::new(&interner);
    let body = build(&mut builder);
    let ast = builder.finish(body);
    let session = FileSession::new("", ast, Arc::clone(&interner), resolver);
    (session, interner)
}

/// Run a default-config check, panicking on cancellation.
pub fn check(session: &mut FileSession) -> Vec<Diagnostic> {
    check_with(session, &CheckOptions::default())
}

pub fn check_with(session: &mut FileSession, options: &CheckOptions) -> Vec<Diagnostic> {
    match session.check_file(options, &CancellationToken::new()) {
        Ok(diags) => diags,
        Err(e) => panic!("check pass failed: {e}"),
    }
}
