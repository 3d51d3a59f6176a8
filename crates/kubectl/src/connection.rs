//! Kubeconfig resolution.
//!
//! Turns a [`ConnectionConfig`] into a kubeconfig path for a single call.
//! Inline content is written to a uniquely named temporary file which is
//! removed when the [`ResolvedConnection`] is dropped, on every exit path.

use crate::error::{Error, Result};
use crate::types::{ConnectionConfig, non_empty};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// A kubeconfig location valid for the lifetime of this value.
#[derive(Debug)]
pub struct ResolvedConnection {
    path: Option<PathBuf>,
    // Removes the materialized file on drop
    temp: Option<TempPath>,
}

impl ResolvedConnection {
    /// Rely on kubectl's ambient configuration.
    pub fn ambient() -> Self {
        Self {
            path: None,
            temp: None,
        }
    }

    /// The kubeconfig path, or `None` to omit `--kubeconfig` entirely.
    pub fn kubeconfig(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the kubeconfig was materialized from inline content.
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }
}

/// Resolve the kubeconfig to use for one operation.
pub fn resolve(config: &ConnectionConfig) -> Result<ResolvedConnection> {
    resolve_in(config, &env::temp_dir())
}

/// Like [`resolve`], materializing inline content under `temp_dir`.
pub(crate) fn resolve_in(config: &ConnectionConfig, temp_dir: &Path) -> Result<ResolvedConnection> {
    let path = non_empty(config.kubeconfig.as_deref());
    let content = non_empty(config.kubeconfig_content.as_deref());

    match (path, content) {
        (Some(_), Some(_)) => Err(Error::ConfigurationConflict),
        (None, Some(content)) => materialize(content, temp_dir),
        (Some(path), None) => Ok(ResolvedConnection {
            path: Some(PathBuf::from(path)),
            temp: None,
        }),
        (None, None) => Ok(ResolvedConnection::ambient()),
    }
}

/// Write inline kubeconfig content to a fresh temporary file.
///
/// A partially written file is removed when the `NamedTempFile` drops on
/// the error path.
fn materialize(content: &str, temp_dir: &Path) -> Result<ResolvedConnection> {
    let mut file = tempfile::Builder::new()
        .prefix("kubeconfig_")
        .tempfile_in(temp_dir)
        .map_err(|source| Error::TempFile {
            context: "creating a kubeconfig file",
            source,
        })?;

    file.write_all(content.as_bytes())
        .map_err(|source| Error::TempFile {
            context: "writing kubeconfig to file",
            source,
        })?;

    file.as_file()
        .sync_all()
        .map_err(|source| Error::TempFile {
            context: "completion of write to kubeconfig file",
            source,
        })?;

    let temp = file.into_temp_path();
    log::debug!("Materialized kubeconfig at {}", temp.display());

    Ok(ResolvedConnection {
        path: Some(temp.to_path_buf()),
        temp: Some(temp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entries(dir: &TempDir) -> usize {
        fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn test_conflict_is_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let config = ConnectionConfig {
            kubeconfig: Some("/tmp/does-not-matter".to_string()),
            kubeconfig_content: Some("apiVersion: v1".to_string()),
            ..Default::default()
        };

        let result = resolve_in(&config, dir.path());

        assert!(matches!(result, Err(Error::ConfigurationConflict)));
        assert_eq!(entries(&dir), 0);
    }

    #[test]
    fn test_materialized_file_lives_in_temp_dir() {
        let dir = TempDir::new().unwrap();
        let config = ConnectionConfig {
            kubeconfig_content: Some("apiVersion: v1".to_string()),
            ..Default::default()
        };

        let resolved = resolve_in(&config, dir.path()).unwrap();
        let path = resolved.kubeconfig().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("kubeconfig_")
        );
        assert_eq!(entries(&dir), 1);

        drop(resolved);
        assert_eq!(entries(&dir), 0);
    }

    #[test]
    fn test_path_is_passed_through() {
        let config = ConnectionConfig {
            kubeconfig: Some("/etc/kube/config".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&config).unwrap();
        assert_eq!(resolved.kubeconfig(), Some(Path::new("/etc/kube/config")));
        assert!(!resolved.is_temporary());
    }

    #[test]
    fn test_nothing_configured_is_ambient() {
        let resolved = resolve(&ConnectionConfig::default()).unwrap();
        assert_eq!(resolved.kubeconfig(), None);
    }

    #[test]
    fn test_inline_content_is_materialized_and_removed() {
        let content = "apiVersion: v1\nkind: Config\nclusters: []\n";
        let config = ConnectionConfig {
            kubeconfig_content: Some(content.to_string()),
            ..Default::default()
        };

        let resolved = resolve(&config).unwrap();
        let path = resolved.kubeconfig().unwrap().to_path_buf();
        assert!(resolved.is_temporary());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_resolutions_do_not_collide() {
        let config = ConnectionConfig {
            kubeconfig_content: Some("apiVersion: v1".to_string()),
            ..Default::default()
        };
        let a = resolve(&config).unwrap();
        let b = resolve(&config).unwrap();
        assert_ne!(a.kubeconfig(), b.kubeconfig());
    }
}
