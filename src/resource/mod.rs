//! Resource handlers driven by the declarative engine

mod manifest;
#[cfg(test)]
pub mod testing;

pub use manifest::ManifestResource;

/// Resource type name used in targets ("k8s_manifest.web")
pub const RESOURCE_TYPE: &str = "k8s_manifest";

/// Namespace to apply into; changing it replaces the object
pub const ATTR_NAMESPACE: &str = "namespace";

/// Manifest YAML or JSON
pub const ATTR_CONTENT: &str = "content";
