//! Core types for declarative resource lifecycle management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Attribute values of one resource instance.
///
/// An absent key means the attribute is unset.
pub type Attributes = BTreeMap<String, String>;

/// Stored record of a managed resource instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Externally assigned identity; empty means not managed
    #[serde(default)]
    pub id: String,
    /// Attribute values the instance was last applied with
    #[serde(default)]
    pub attributes: Attributes,
}

impl ResourceData {
    /// New, not yet managed instance with the given attributes
    pub fn new(attributes: Attributes) -> Self {
        Self {
            id: String::new(),
            attributes,
        }
    }

    /// Get an attribute, treating empty strings as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Set the identity
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Clear the identity, marking the instance as gone
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Whether an identity is recorded
    pub fn is_managed(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Planned action for one resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Nothing to do
    NoChange,
    /// Create a new instance
    Create,
    /// Update the instance in place
    Update,
    /// Delete and create again (a force-new attribute changed)
    Replace,
    /// Delete the instance
    Delete,
}

impl Action {
    /// Whether the action changes anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Plan symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoChange => " ",
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoChange => "no change",
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was deleted and created again
    Replaced,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of resources reconciled in parallel
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}

/// Maximum duration of each lifecycle operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    /// Default timeout of each operation (20 minutes)
    pub const DEFAULT: Duration = Duration::from_secs(20 * 60);

    /// Same timeout for every operation
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT)
    }
}

/// Timeouts per instance name, falling back to a default
#[derive(Debug, Clone, Default)]
pub struct TimeoutPolicy {
    pub default: Timeouts,
    pub overrides: BTreeMap<String, Timeouts>,
}

impl TimeoutPolicy {
    /// Same timeouts for every instance
    pub fn new(default: Timeouts) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Override the timeouts of one instance
    pub fn with_override(mut self, name: impl Into<String>, timeouts: Timeouts) -> Self {
        self.overrides.insert(name.into(), timeouts);
        self
    }

    /// Timeouts that apply to `name`
    pub fn for_instance(&self, name: &str) -> Timeouts {
        self.overrides.get(name).copied().unwrap_or(self.default)
    }
}
