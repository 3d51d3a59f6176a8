//! Stack file loading
//!
//! A stack file is TOML:
//!
//! ```toml
//! [provider]
//! kubeconfig = "~/.kube/config"
//! kubeconfig_context = "staging"
//!
//! [timeouts]
//! create = 300
//!
//! [[manifest]]
//! name = "web"
//! namespace = "ops"
//! file = "manifests/web.yaml"
//!
//! [[manifest]]
//! name = "ops-namespace"
//! content = """
//! apiVersion: v1
//! kind: Namespace
//! metadata:
//!   name: ops
//! """
//! ```

use anyhow::{Context, Result, bail};
use declarative::{Attributes, TimeoutPolicy, Timeouts};
use kubectl::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ProviderArgs;
use crate::paths;
use crate::resource::{ATTR_CONTENT, ATTR_NAMESPACE};

// ============================================================================
// File Format
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackFile {
    #[serde(default)]
    pub provider: ConnectionConfig,

    #[serde(default)]
    pub timeouts: TimeoutSettings,

    #[serde(default, rename = "manifest")]
    pub manifests: Vec<ManifestEntry>,
}

/// Operation timeouts in seconds; unset ones use the default of 20 minutes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSettings {
    pub create: Option<u64>,
    pub read: Option<u64>,
    pub update: Option<u64>,
    pub delete: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timeouts: Option<TimeoutSettings>,
}

impl TimeoutSettings {
    /// Resolve on top of `base`
    pub fn resolve(&self, base: Timeouts) -> Timeouts {
        let secs = |v: Option<u64>, fallback: Duration| v.map_or(fallback, Duration::from_secs);
        Timeouts {
            create: secs(self.create, base.create),
            read: secs(self.read, base.read),
            update: secs(self.update, base.update),
            delete: secs(self.delete, base.delete),
        }
    }
}

// ============================================================================
// Loaded Stack
// ============================================================================

/// One declared manifest with its content loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredManifest {
    pub name: String,
    pub namespace: Option<String>,
    pub content: String,
}

impl DesiredManifest {
    /// Attributes handed to the planner
    pub fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        if let Some(ns) = &self.namespace {
            attrs.insert(ATTR_NAMESPACE.to_string(), ns.clone());
        }
        attrs.insert(ATTR_CONTENT.to_string(), self.content.clone());
        attrs
    }
}

/// A validated stack
#[derive(Debug)]
pub struct Stack {
    /// Stack file location
    pub path: PathBuf,
    /// Connection settings from the `[provider]` table
    pub provider: ConnectionConfig,
    /// Timeouts per manifest
    pub timeouts: TimeoutPolicy,
    /// Declared manifests in file order
    pub manifests: Vec<DesiredManifest>,
}

impl Stack {
    /// Load and validate a stack file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read stack file {}", path.display()))?;
        Self::parse(path, &content)
    }

    /// Load a stack file, or `None` when it does not exist
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(path, &content).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Could not read stack file {}", path.display())),
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let file: StackFile = toml::from_str(content)
            .with_context(|| format!("Invalid stack file {}", path.display()))?;

        let base_dir = path.parent().unwrap_or(Path::new("."));
        let stack = Self::from_file(path.to_path_buf(), base_dir, file)?;

        log::debug!(
            "Loaded {} manifests from {}",
            stack.manifests.len(),
            path.display()
        );
        Ok(stack)
    }

    fn from_file(path: PathBuf, base_dir: &Path, file: StackFile) -> Result<Self> {
        let default = file.timeouts.resolve(Timeouts::default());
        let mut timeouts = TimeoutPolicy::new(default);
        let mut seen = BTreeSet::new();
        let mut manifests = Vec::with_capacity(file.manifests.len());

        for entry in file.manifests {
            if entry.name.trim().is_empty() {
                bail!("Manifest entries need a non-empty name");
            }
            if !seen.insert(entry.name.clone()) {
                bail!("Duplicate manifest name \"{}\"", entry.name);
            }

            let content = match (&entry.content, &entry.file) {
                (Some(_), Some(_)) => {
                    bail!("{}: set either content or file, not both", entry.name)
                }
                (None, None) => bail!("{}: one of content or file is required", entry.name),
                (Some(content), None) => content.clone(),
                (None, Some(file)) => {
                    let manifest_path = resolve_relative(base_dir, file);
                    fs::read_to_string(&manifest_path).with_context(|| {
                        format!(
                            "{}: could not read manifest {}",
                            entry.name,
                            manifest_path.display()
                        )
                    })?
                }
            };

            if content.trim().is_empty() {
                bail!("{}: manifest content is empty", entry.name);
            }

            if let Some(overrides) = entry.timeouts {
                timeouts = timeouts.with_override(entry.name.clone(), overrides.resolve(default));
            }

            manifests.push(DesiredManifest {
                name: entry.name,
                namespace: entry.namespace.filter(|ns| !ns.is_empty()),
                content,
            });
        }

        let mut provider = file.provider;
        provider.kubeconfig = provider
            .kubeconfig
            .filter(|p| !p.is_empty())
            .map(|p| resolve_relative(base_dir, &p).to_string_lossy().into_owned());
        provider.validate().context("Invalid [provider] settings")?;

        Ok(Self {
            path,
            provider,
            timeouts,
            manifests,
        })
    }

    /// Desired attributes keyed by manifest name
    pub fn desired(&self) -> BTreeMap<String, Attributes> {
        self.manifests
            .iter()
            .map(|m| (m.name.clone(), m.attributes()))
            .collect()
    }

    /// Connection settings with command-line and environment overrides applied
    pub fn connection(&self, overrides: &ProviderArgs) -> Result<ConnectionConfig> {
        merge_provider(self.provider.clone(), overrides)
    }
}

/// Apply overrides on top of file settings.
///
/// A kubeconfig source given as an override replaces both kubeconfig
/// settings from the file, so a path on the command line wins over inline
/// content in the file. Setting both as overrides is still a conflict.
pub fn merge_provider(
    mut config: ConnectionConfig,
    overrides: &ProviderArgs,
) -> Result<ConnectionConfig> {
    let kubeconfig = overrides.kubeconfig.as_deref().filter(|p| !p.is_empty());
    let kubeconfig_content = overrides
        .kubeconfig_content
        .as_deref()
        .filter(|c| !c.is_empty());
    if kubeconfig.is_some() || kubeconfig_content.is_some() {
        config.kubeconfig = kubeconfig.map(|p| paths::expand(p).to_string_lossy().into_owned());
        config.kubeconfig_content = kubeconfig_content.map(str::to_string);
    }
    if let Some(context) = &overrides.kubeconfig_context {
        config.kubeconfig_context = Some(context.clone());
    }
    if let Some(path) = &overrides.kubectl_path {
        config.kubectl_path = Some(path.clone());
    }
    if let Some(token) = &overrides.kubectl_token {
        config.kubectl_token = Some(token.clone());
    }
    if let Some(validate) = overrides.kubectl_validate {
        config.kubectl_validate = validate;
    }

    config.validate().context("determining kubeconfig")?;
    Ok(config)
}

fn resolve_relative(base_dir: &Path, path: &str) -> PathBuf {
    let expanded = paths::expand(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_stack(dir: &TempDir, toml: &str) -> PathBuf {
        let path = dir.path().join("kubemanifest.toml");
        fs::write(&path, toml).unwrap();
        path
    }

    #[test]
    fn test_load_inline_and_file_manifests() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("manifests")).unwrap();
        fs::write(dir.path().join("manifests/web.yaml"), "kind: Service\n").unwrap();

        let path = write_stack(
            &dir,
            r#"
[[manifest]]
name = "ns"
content = "kind: Namespace\n"

[[manifest]]
name = "web"
namespace = "ops"
file = "manifests/web.yaml"
"#,
        );

        let stack = Stack::load(&path).unwrap();
        assert_eq!(stack.manifests.len(), 2);
        assert_eq!(stack.manifests[1].content, "kind: Service\n");
        assert_eq!(stack.manifests[1].namespace.as_deref(), Some("ops"));

        let desired = stack.desired();
        assert_eq!(desired["web"]["namespace"], "ops");
        assert!(!desired["ns"].contains_key("namespace"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(
            &dir,
            r#"
[[manifest]]
name = "web"
content = "a"

[[manifest]]
name = "web"
content = "b"
"#,
        );

        let err = Stack::load(&path).unwrap_err();
        assert!(err.to_string().contains("Duplicate manifest name"));
    }

    #[test]
    fn test_content_and_file_are_exclusive() {
        let dir = TempDir::new().unwrap();
        let both = write_stack(
            &dir,
            r#"
[[manifest]]
name = "web"
content = "a"
file = "web.yaml"
"#,
        );
        assert!(Stack::load(&both).is_err());

        let neither = write_stack(&dir, "[[manifest]]\nname = \"web\"\n");
        assert!(Stack::load(&neither).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(&dir, "[[manifest]]\nname = \"web\"\ncontent = \"a\"\nreplicas = 3\n");
        assert!(Stack::load(&path).is_err());
    }

    #[test]
    fn test_provider_conflict_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(
            &dir,
            r#"
[provider]
kubeconfig = "/etc/kube/config"
kubeconfig_content = "apiVersion: v1"
"#,
        );

        let err = Stack::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("both kubeconfig and kubeconfig_content"));
    }

    #[test]
    fn test_load_optional_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("kubemanifest.toml");
        assert!(Stack::load_optional(&missing).unwrap().is_none());

        let path = write_stack(&dir, "[provider]\nkubeconfig_context = \"prod\"\n");
        let stack = Stack::load_optional(&path).unwrap().unwrap();
        assert_eq!(stack.provider.kubeconfig_context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_empty_kubeconfig_means_ambient() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(&dir, "[provider]\nkubeconfig = \"\"\n");
        let stack = Stack::load(&path).unwrap();
        assert_eq!(stack.provider.kubeconfig, None);

        let path = write_stack(
            &dir,
            "[provider]\nkubeconfig = \"\"\nkubeconfig_content = \"apiVersion: v1\"\n",
        );
        let stack = Stack::load(&path).unwrap();
        assert_eq!(stack.provider.kubeconfig, None);
        assert_eq!(
            stack.provider.kubeconfig_content.as_deref(),
            Some("apiVersion: v1")
        );
    }

    #[test]
    fn test_relative_kubeconfig_resolved_against_stack() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(&dir, "[provider]\nkubeconfig = \"kube/config\"\n");
        let stack = Stack::load(&path).unwrap();
        assert_eq!(
            stack.provider.kubeconfig.map(PathBuf::from),
            Some(dir.path().join("kube/config"))
        );
    }

    #[test]
    fn test_unknown_provider_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(&dir, "[provider]\nkubeconfig_contxt = \"prod\"\n");

        let err = Stack::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("kubeconfig_contxt"));
    }

    #[test]
    fn test_timeouts_default_and_override() {
        let dir = TempDir::new().unwrap();
        let path = write_stack(
            &dir,
            r#"
[timeouts]
create = 300

[[manifest]]
name = "web"
content = "a"
timeouts = { delete = 60 }

[[manifest]]
name = "db"
content = "b"
"#,
        );

        let stack = Stack::load(&path).unwrap();
        let web = stack.timeouts.for_instance("web");
        let db = stack.timeouts.for_instance("db");

        assert_eq!(web.create, Duration::from_secs(300));
        assert_eq!(web.delete, Duration::from_secs(60));
        assert_eq!(db.create, Duration::from_secs(300));
        assert_eq!(db.read, Timeouts::DEFAULT);
    }

    #[test]
    fn test_merge_provider_precedence() {
        let file = ConnectionConfig {
            kubeconfig_content: Some("apiVersion: v1".into()),
            kubeconfig_context: Some("file-context".into()),
            ..Default::default()
        };
        let overrides = ProviderArgs {
            kubeconfig: Some("/etc/kube/config".into()),
            kubeconfig_context: Some("flag-context".into()),
            kubectl_validate: Some(false),
            ..Default::default()
        };

        let merged = merge_provider(file, &overrides).unwrap();
        assert_eq!(merged.kubeconfig.as_deref(), Some("/etc/kube/config"));
        assert_eq!(merged.kubeconfig_content, None);
        assert_eq!(merged.kubeconfig_context.as_deref(), Some("flag-context"));
        assert!(!merged.kubectl_validate);
    }

    #[test]
    fn test_merge_provider_empty_override_keeps_file_settings() {
        let file = ConnectionConfig {
            kubeconfig: Some("/etc/kube/config".into()),
            ..Default::default()
        };
        let overrides = ProviderArgs {
            kubeconfig: Some(String::new()),
            ..Default::default()
        };

        let merged = merge_provider(file, &overrides).unwrap();
        assert_eq!(merged.kubeconfig.as_deref(), Some("/etc/kube/config"));
    }

    #[test]
    fn test_merge_provider_conflicting_overrides() {
        let overrides = ProviderArgs {
            kubeconfig: Some("/etc/kube/config".into()),
            kubeconfig_content: Some("apiVersion: v1".into()),
            ..Default::default()
        };
        assert!(merge_provider(ConnectionConfig::default(), &overrides).is_err());
    }
}
