//! Target resolution context: search roots plus the component registry.
//!
//! The original layout keeps pipeline sources in two sibling trees, anchored
//! by a directory named `t2v_turbo` or `videogen_hub` somewhere above the
//! running code. [`SearchRoots::discover`] reproduces that anchor walk and
//! yields the candidate roots for the matched anchor. The roots live in an
//! explicit [`ResolverContext`] passed to every resolution call instead of a
//! process-wide mutable list, which is what makes concurrent use a plain
//! borrow-checker question rather than a data race.

use std::path::{Component as PathComponent, Path, PathBuf};

use tracing::debug;

use crate::config::{ComponentConfig, Params};
use crate::registry::{Component, ComponentRegistry, Factory, InstantiateError};

/// Directory names recognized as project anchors during the upward walk.
pub const ANCHOR_DIRS: [&str; 2] = ["t2v_turbo", "videogen_hub"];

/// Errors from target resolution and root discovery.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("couldn't find `t2v_turbo` or `videogen_hub` above {start}")]
    AnchorNotFound { start: PathBuf },

    #[error("target reference `{reference}` has no module path")]
    MalformedRef { reference: String },

    #[error("no module registered under `{module}`")]
    UnknownModule { module: String },

    #[error("module `{module}` has no type named `{name}`")]
    UnknownType { module: String, name: String },
}

/// Ordered, deduplicated list of module-search roots.
///
/// Roots are prepended, so the most recently added root has the highest
/// priority. Repeated discovery calls therefore leave the last caller's roots
/// in front; that call-order dependence matches the original search-path
/// behavior and is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRoots {
    roots: Vec<PathBuf>,
}

impl SearchRoots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk upward from `start` (inclusive) until a directory named after one
    /// of [`ANCHOR_DIRS`] is found, then prepend that anchor's candidate
    /// roots:
    ///
    /// - `t2v_turbo` anchors the tree itself and its parent;
    /// - `videogen_hub` anchors `<hub>/pipelines` and
    ///   `<hub>/pipelines/t2v_turbo`.
    ///
    /// The result depends only on which anchor is found, not on how deep
    /// `start` sits below it.
    pub fn discover(start: &Path) -> Result<Self, ResolveError> {
        let mut roots = Self::new();
        roots.discover_into(start)?;
        Ok(roots)
    }

    /// Run the anchor walk and merge the discovered roots into `self`.
    pub fn discover_into(&mut self, start: &Path) -> Result<(), ResolveError> {
        let mut dir = start.to_path_buf();
        let anchor = loop {
            match dir.file_name().and_then(|n| n.to_str()) {
                Some(name) if ANCHOR_DIRS.contains(&name) => break name.to_string(),
                _ => match dir.parent() {
                    Some(parent) => dir = parent.to_path_buf(),
                    None => {
                        return Err(ResolveError::AnchorNotFound {
                            start: start.to_path_buf(),
                        })
                    }
                },
            }
        };

        let candidates: Vec<PathBuf> = match anchor.as_str() {
            "t2v_turbo" => vec![dir.clone(), dir.join("..")],
            _ => vec![dir.join("pipelines"), dir.join("pipelines").join("t2v_turbo")],
        };

        debug!(anchor = %anchor, base = %dir.display(), "discovered search roots");
        for candidate in candidates {
            self.prepend(&candidate);
        }
        Ok(())
    }

    /// Normalize `path` and insert it at the front unless already present.
    /// Idempotent; existing entries keep their position.
    pub fn prepend(&mut self, path: &Path) {
        let normalized = normalize(path);
        if !self.roots.contains(&normalized) {
            self.roots.insert(0, normalized);
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.roots.contains(&normalize(path))
    }

    /// Roots in priority order, highest first.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Lexically collapse `.` and `..` segments without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Explicit resolution state: search roots plus the component registry.
///
/// Built once at process start and passed to every instantiation call.
pub struct ResolverContext {
    roots: SearchRoots,
    registry: ComponentRegistry,
}

impl ResolverContext {
    pub fn new(roots: SearchRoots, registry: ComponentRegistry) -> Self {
        Self { roots, registry }
    }

    /// Context with roots discovered by the anchor walk from `start` and an
    /// empty registry.
    pub fn discover(start: &Path) -> Result<Self, ResolveError> {
        Ok(Self::new(SearchRoots::discover(start)?, ComponentRegistry::new()))
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut SearchRoots {
        &mut self.roots
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Resolve a dotted `module.path.TypeName` reference to its factory.
    pub fn resolve_target(&mut self, reference: &str, reload: bool) -> Result<Factory, ResolveError> {
        self.registry.resolve(reference, reload)
    }

    /// Turn a configuration descriptor into a constructed component.
    ///
    /// Sentinel descriptors yield `Ok(None)` without touching the registry or
    /// the search roots. Explicit descriptors resolve their target (no
    /// reload) and invoke the factory with the descriptor's params; no
    /// instance is cached, so repeated calls construct independently.
    pub fn instantiate(
        &mut self,
        config: &ComponentConfig,
    ) -> Result<Option<Component>, InstantiateError> {
        match config {
            ComponentConfig::FirstStage | ComponentConfig::Unconditional => Ok(None),
            ComponentConfig::Explicit { target, params } => {
                let factory = self.resolve_target(target, false)?;
                let component = factory(params)?;
                Ok(Some(component))
            }
        }
    }

    /// Parse a loosely-typed JSON descriptor and instantiate it.
    pub fn instantiate_from_value(
        &mut self,
        value: &serde_json::Value,
    ) -> Result<Option<Component>, InstantiateError> {
        let config = ComponentConfig::from_value(value)?;
        self.instantiate(&config)
    }
}

/// Convenience for factories that ignore params entirely.
pub fn constant_factory<T, F>(make: F) -> Factory
where
    T: Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    std::sync::Arc::new(move |_: &Params| Ok(Box::new(make()) as Component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_parent_segments() {
        assert_eq!(
            normalize(Path::new("/a/b/t2v_turbo/..")),
            PathBuf::from("/a/b")
        );
        assert_eq!(normalize(Path::new("/a/./b")), PathBuf::from("/a/b"));
    }

    #[test]
    fn prepend_is_idempotent_and_orders_newest_first() {
        let mut roots = SearchRoots::new();
        roots.prepend(Path::new("/a"));
        roots.prepend(Path::new("/b"));
        roots.prepend(Path::new("/a"));
        assert_eq!(roots.len(), 2);
        let order: Vec<_> = roots.iter().collect();
        assert_eq!(order, vec![Path::new("/b"), Path::new("/a")]);
    }

    #[test]
    fn contains_normalizes_before_comparing() {
        let mut roots = SearchRoots::new();
        roots.prepend(Path::new("/a/b/.."));
        assert!(roots.contains(Path::new("/a")));
    }
}
