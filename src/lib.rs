//! T2V-Turbo utilities: config-driven component instantiation plus the
//! tensor/video helpers shared by the text-to-video pipeline.
//!
//! The core of this crate is the component registry and resolver
//! (`registry`, `resolver`, `config`): pipeline components are registered
//! under dotted module paths and constructed from configuration
//! descriptors at assembly time. The remaining modules are leaf utilities
//! with no shared state: parameter counting, npz batch loading, image
//! resizing, device binding, and video grid serialization.

pub mod config;
pub mod device;
pub mod imaging;
pub mod npz;
pub mod params;
pub mod registry;
pub mod resolver;
pub mod video;

pub use config::{ComponentConfig, Params};
pub use registry::{Component, ComponentRegistry, Factory, InstantiateError, ModuleScope};
pub use resolver::{ResolveError, ResolverContext, SearchRoots};
