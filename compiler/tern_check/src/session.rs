//! Per-file analysis session.
//!
//! Owns one file's syntax tree, bind result, evaluation caches, and
//! generation stamp. The batch entry point is [`FileSession::check_file`];
//! point queries (`type_of`, `declarations_of`) answer against a merely
//! bound module without running the diagnostic pass, which is what editor
//! hover and completion need.
//!
//! A host running many files fans out one session per file on its worker
//! threads; sessions share nothing mutable, so no locking exists here.

use std::cell::RefCell;
use std::sync::Arc;

use tern_diagnostic::{wire::WireDiagnostic, Diagnostic, RuleConfig};
use tern_ir::{Ast, ExprId, LineIndex, ModuleResolver, StringInterner};
use tern_flow::{bind, BindResult, Declaration, ScopeId};
use tern_types::{Builtins, Type};

use crate::cancel::CancellationToken;
use crate::checker::Checker;
use crate::error::AnalysisError;
use crate::eval::{Caches, Evaluator};

/// Lifecycle of one scope within a session.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ScopeState {
    #[default]
    NotVisited,
    Binding,
    Bound,
    Checking,
    Checked,
}

/// Options for one checking pass.
#[derive(Clone, Debug, Default)]
pub struct CheckOptions {
    pub rules: RuleConfig,
    /// Maximum error findings before the sink filters (0 = unlimited).
    pub error_limit: usize,
}

/// One file's analysis state.
pub struct FileSession {
    interner: Arc<StringInterner>,
    resolver: Box<dyn ModuleResolver>,
    source: String,
    line_index: LineIndex,
    ast: Ast,
    builtins: Builtins,
    /// Generation stamp; incremented by every edit. Cache entries carry
    /// the stamp they were computed under and are lazily evicted when it
    /// no longer matches.
    version: u32,
    bind: Option<BindResult>,
    states: RefCell<Vec<ScopeState>>,
    caches: Caches,
}

impl FileSession {
    pub fn new(
        source: impl Into<String>,
        ast: Ast,
        interner: Arc<StringInterner>,
        resolver: Box<dyn ModuleResolver>,
    ) -> Self {
        let source = source.into();
        let line_index = LineIndex::build(&source);
        let builtins = Builtins::new(&interner);
        FileSession {
            interner,
            resolver,
            source,
            line_index,
            ast,
            builtins,
            version: 1,
            bind: None,
            states: RefCell::new(Vec::new()),
            caches: Caches::default(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Current lifecycle state of a scope.
    pub fn scope_state(&self, scope: ScopeId) -> ScopeState {
        self.states
            .borrow()
            .get(scope.index())
            .copied()
            .unwrap_or(ScopeState::NotVisited)
    }

    /// Replace the file's contents after an edit.
    ///
    /// Bumps the generation stamp and drops the bind result and structural
    /// caches. Expression-cache entries stay and age out lazily: the next
    /// query sees a stamp mismatch and recomputes.
    pub fn apply_edit(&mut self, source: impl Into<String>, ast: Ast) {
        self.source = source.into();
        self.line_index = LineIndex::build(&self.source);
        self.ast = ast;
        self.version += 1;
        self.bind = None;
        self.states.replace(Vec::new());
        self.caches.clear_structural();
        tracing::debug!(version = self.version, "edit applied");
    }

    fn ensure_bound(&mut self) {
        if self.bind.is_some() {
            return;
        }
        self.states.replace(vec![ScopeState::Binding]);
        let bound = bind(&self.ast, &*self.resolver);
        self.states
            .replace(vec![ScopeState::Bound; bound.scopes.len()]);
        self.bind = Some(bound);
    }

    fn evaluator(&self) -> Option<Evaluator<'_>> {
        let bound = self.bind.as_ref()?;
        Some(Evaluator::new(
            &self.ast,
            bound,
            &self.builtins,
            &self.interner,
            &*self.resolver,
            self.version,
            &self.caches,
        ))
    }

    /// Run the full diagnostic pass.
    ///
    /// Diagnostics come back in source order. A cancelled pass discards
    /// its partial findings and returns `Err(Cancelled)`; the session
    /// stays reusable and the caller re-requests a fresh pass.
    pub fn check_file(
        &mut self,
        options: &CheckOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Diagnostic>, AnalysisError> {
        self.ensure_bound();
        let Some(eval) = self.evaluator() else {
            return Err(AnalysisError::Internal {
                detail: "module failed to bind".to_owned(),
            });
        };
        Checker::new(&eval, options, cancel, &self.states).run()
    }

    /// Point query: the type of one expression.
    ///
    /// Forces binding but not checking; hover and completion must answer
    /// against a merely bound scope.
    pub fn type_of(&mut self, expr: ExprId) -> Type {
        self.ensure_bound();
        match self.evaluator() {
            Some(eval) => eval.type_of(expr),
            None => Type::Unknown,
        }
    }

    /// Point query: rendered hover text for one expression.
    pub fn type_description(&mut self, expr: ExprId) -> String {
        let ty = self.type_of(expr);
        ty.display(&self.interner).to_string()
    }

    /// Point query: the declarations a name resolves to from a scope.
    pub fn declarations_of(&mut self, scope: ScopeId, name: &str) -> Vec<Declaration> {
        self.ensure_bound();
        let name = self.interner.intern(name);
        let Some(bound) = self.bind.as_ref() else {
            return Vec::new();
        };
        bound
            .declarations_of(scope, name)
            .iter()
            .filter_map(|&decl| bound.decl(decl).cloned())
            .collect()
    }

    /// Convert findings to the editor-protocol wire shape.
    pub fn wire_diagnostics(&self, diagnostics: &[Diagnostic]) -> Vec<WireDiagnostic> {
        diagnostics
            .iter()
            .map(|d| WireDiagnostic::from_diagnostic(d, &self.source, &self.line_index))
            .collect()
    }
}
