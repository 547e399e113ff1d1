//! Module resolution interface.
//!
//! Mapping an import name to a module is an external service; the binder
//! only needs the resolved module's exported names. Hosts plug in whatever
//! lookup they have (filesystem walker, editor workspace index); tests and
//! the CLI use [`MapResolver`].

use crate::Name;
use rustc_hash::FxHashMap;

/// A successfully resolved module: its name and exported bindings.
///
/// Export types are conveyed as annotation-style strings (`"int"`,
/// `"str | None"`) and evaluated by the checker against its builtins, which
/// keeps this interface free of any type-model dependency.
#[derive(Clone, Debug, Default)]
pub struct ResolvedModule {
    pub name: Name,
    /// Exported name → annotation text.
    pub exports: FxHashMap<Name, String>,
}

/// The lookup service consumed by the binder.
pub trait ModuleResolver {
    /// Resolve an import by module name. `None` means not found; the binder
    /// declares the import as unresolved and the checker reports it once.
    fn resolve(&self, module: Name) -> Option<&ResolvedModule>;
}

/// Table-backed resolver.
#[derive(Default)]
pub struct MapResolver {
    modules: FxHashMap<Name, ResolvedModule>,
}

impl MapResolver {
    pub fn new() -> Self {
        MapResolver::default()
    }

    /// Register a module.
    pub fn insert(&mut self, module: ResolvedModule) {
        self.modules.insert(module.name, module);
    }
}

impl ModuleResolver for MapResolver {
    fn resolve(&self, module: Name) -> Option<&ResolvedModule> {
        self.modules.get(&module)
    }
}

/// A resolver that knows no modules. Every import is unresolved.
#[derive(Default)]
pub struct EmptyResolver;

impl ModuleResolver for EmptyResolver {
    fn resolve(&self, _module: Name) -> Option<&ResolvedModule> {
        None
    }
}
