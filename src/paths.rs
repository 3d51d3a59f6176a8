//! Centralized path resolution for kubemanifest
//!
//! # Environment Variables
//!
//! - `KUBEMANIFEST_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For state_dir():
//! 1. `KUBEMANIFEST_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/kubemanifest` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\kubemanifest`
//!    - macOS/Linux: `~/.local/state/kubemanifest`
//!
//! Each stack gets its own state file inside the state directory, keyed by
//! the stack file's canonical path.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "KUBEMANIFEST_STATE_DIR";

/// Get the kubemanifest state directory path
///
/// Priority:
/// 1. `KUBEMANIFEST_STATE_DIR` env var
/// 2. `XDG_STATE_HOME/kubemanifest`
/// 3. Platform default
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("kubemanifest");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join("kubemanifest");
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    // Unix default: ~/.local/state/kubemanifest
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("kubemanifest");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Default state file for a stack file
///
/// `<state_dir>/<stem>-<hash>.json`, where the hash is taken over the stack
/// file's canonical path so equally named stacks in different directories
/// never share state.
pub fn state_file_for(stack_file: &Path) -> Result<PathBuf> {
    let canonical = stack_file
        .canonicalize()
        .with_context(|| format!("Could not resolve {}", stack_file.display()))?;

    Ok(state_dir()?.join(state_file_name(&canonical)))
}

fn state_file_name(canonical: &Path) -> String {
    let stem = canonical
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("stack");
    let hash = blake3::hash(canonical.to_string_lossy().as_bytes()).to_hex();
    format!("{stem}-{}.json", &hash.as_str()[..12])
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as they are.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    /// Serializes tests that mutate the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_state_dir_env_override() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            let result = state_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/state/path"));
        });
    }

    #[test]
    fn test_xdg_state_home() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-test", || {
                let result = state_dir().unwrap();
                assert_eq!(result, PathBuf::from("/tmp/xdg-state-test/kubemanifest"));
            });
        });
    }

    #[cfg(unix)]
    #[test]
    fn test_default_state_dir_unix() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        without_env_var(ENV_STATE_DIR, || {
            without_env_var("XDG_STATE_HOME", || {
                let result = state_dir().unwrap();
                let home = dirs::home_dir().unwrap();
                assert_eq!(
                    result,
                    home.join(".local").join("state").join("kubemanifest")
                );
            });
        });
    }

    #[test]
    fn test_state_file_name_is_stable_and_distinct() {
        let a = state_file_name(Path::new("/srv/app/kubemanifest.toml"));
        let b = state_file_name(Path::new("/srv/other/kubemanifest.toml"));

        assert!(a.starts_with("kubemanifest-"));
        assert!(a.ends_with(".json"));
        assert_eq!(a, state_file_name(Path::new("/srv/app/kubemanifest.toml")));
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_file_for_missing_stack() {
        assert!(state_file_for(Path::new("/nonexistent/kubemanifest.toml")).is_err());
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
