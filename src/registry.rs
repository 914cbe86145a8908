//! Component registry: construct-by-name without reflective lookup.
//!
//! Pipeline components are registered under dotted module paths, each module
//! contributing a table of named factories. A module's registration function
//! is the analog of executing that module's top-level code: it runs lazily on
//! first resolution, its table is cached, and a `reload` resolution re-runs it
//! (repeating any registration side effects).
//!
//! Factories receive the descriptor's `params` mapping and return a type-erased
//! component. [`ModuleScope::register`] binds a plain constructor over a
//! `serde`-deserializable config struct, so `params` keys map onto the config
//! struct's fields.

use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Params;
use crate::resolver::ResolveError;

/// A constructed, type-erased pipeline component.
pub type Component = Box<dyn Any + Send>;

/// Constructor-side error type for registered factories.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// A factory bound under a `module.Name` key.
pub type Factory = Arc<dyn Fn(&Params) -> Result<Component, InstantiateError> + Send + Sync>;

/// Errors surfaced while turning a configuration descriptor into a component.
#[derive(Debug, thiserror::Error)]
pub enum InstantiateError {
    #[error("expected key `target` to instantiate")]
    MissingTarget,

    #[error("unrecognized sentinel descriptor: {value:?}")]
    UnknownSentinel { value: String },

    #[error("descriptor must be a mapping or sentinel string, found {found}")]
    InvalidDescriptor { found: &'static str },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("params do not match the constructor signature of `{target}`")]
    BadParams {
        target: String,
        #[source]
        source: serde_json::Error,
    },

    // Constructor failures pass through verbatim.
    #[error(transparent)]
    Constructor(BoxedError),
}

/// Registration surface handed to a module's init function.
///
/// Mirrors a module defining its public classes at import time.
#[derive(Default)]
pub struct ModuleScope {
    types: HashMap<String, Factory>,
}

impl ModuleScope {
    /// Register a constructor for `name` taking a deserializable config.
    ///
    /// The descriptor's `params` mapping is deserialized into `C`; missing or
    /// mismatched keys fail with [`InstantiateError::BadParams`], and any
    /// error from `ctor` propagates unwrapped.
    pub fn register<C, T, F>(&mut self, name: &str, ctor: F)
    where
        C: DeserializeOwned,
        T: Send + 'static,
        F: Fn(C) -> Result<T, BoxedError> + Send + Sync + 'static,
    {
        let name_owned = name.to_string();
        let factory: Factory = Arc::new(move |params: &Params| {
            let config: C = serde_json::from_value(serde_json::Value::Object(params.clone()))
                .map_err(|source| InstantiateError::BadParams {
                    target: name_owned.clone(),
                    source,
                })?;
            let component = ctor(config).map_err(InstantiateError::Constructor)?;
            Ok(Box::new(component) as Component)
        });
        self.types.insert(name.to_string(), factory);
    }

    /// Register a raw factory over the untyped `params` mapping.
    pub fn register_raw(&mut self, name: &str, factory: Factory) {
        self.types.insert(name.to_string(), factory);
    }

    fn into_table(self) -> HashMap<String, Factory> {
        self.types
    }
}

type ModuleInit = Arc<dyn Fn(&mut ModuleScope) + Send + Sync>;

struct ModuleEntry {
    init: ModuleInit,
    // Populated on first resolution; replaced wholesale on reload.
    table: Option<HashMap<String, Factory>>,
}

/// Registry of constructible component types, keyed by dotted module path.
#[derive(Default)]
pub struct ComponentRegistry {
    modules: HashMap<String, ModuleEntry>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `path`. The init function runs lazily on the
    /// first resolution that names this module.
    pub fn register_module<F>(&mut self, path: &str, init: F)
    where
        F: Fn(&mut ModuleScope) + Send + Sync + 'static,
    {
        self.modules.insert(
            path.to_string(),
            ModuleEntry {
                init: Arc::new(init),
                table: None,
            },
        );
    }

    /// Whether `path` names a registered module.
    pub fn has_module(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    /// Resolve `reference` (`module.path.TypeName`, split on the last dot) to
    /// its factory. Returns the factory, never an instance.
    ///
    /// With `reload`, the owning module's init function is re-run before the
    /// lookup, replacing any cached table.
    pub fn resolve(&mut self, reference: &str, reload: bool) -> Result<Factory, ResolveError> {
        let (module_path, type_name) =
            reference
                .rsplit_once('.')
                .ok_or_else(|| ResolveError::MalformedRef {
                    reference: reference.to_string(),
                })?;

        let entry =
            self.modules
                .get_mut(module_path)
                .ok_or_else(|| ResolveError::UnknownModule {
                    module: module_path.to_string(),
                })?;

        if entry.table.is_none() || reload {
            let mut scope = ModuleScope::default();
            (entry.init)(&mut scope);
            entry.table = Some(scope.into_table());
        }

        let table = entry.table.as_ref().unwrap();
        table
            .get(type_name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownType {
                module: module_path.to_string(),
                name: type_name.to_string(),
            })
    }
}
