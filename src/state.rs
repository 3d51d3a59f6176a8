use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{Attributes, Outcome, RefreshOutcome, ResourceData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::resource::{ATTR_CONTENT, ATTR_NAMESPACE};

/// Current state file format
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Managed objects of one stack
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct State {
    /// Format version
    pub version: u32,

    /// Records keyed by manifest name
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

/// What was last applied for one manifest
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Object identity (kubectl selfLink)
    pub id: String,

    /// Namespace the manifest was applied to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Manifest content that was applied
    pub content: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

// ============================================================================
// Record Conversion
// ============================================================================

impl From<&ResourceRecord> for ResourceData {
    fn from(record: &ResourceRecord) -> Self {
        let mut attributes = Attributes::new();
        if let Some(ns) = &record.namespace {
            attributes.insert(ATTR_NAMESPACE.to_string(), ns.clone());
        }
        attributes.insert(ATTR_CONTENT.to_string(), record.content.clone());
        Self {
            id: record.id.clone(),
            attributes,
        }
    }
}

impl From<&ResourceData> for ResourceRecord {
    fn from(data: &ResourceData) -> Self {
        Self {
            id: data.id.clone(),
            namespace: data.get(ATTR_NAMESPACE).map(str::to_string),
            content: data.get(ATTR_CONTENT).unwrap_or_default().to_string(),
        }
    }
}

// ============================================================================
// State Implementation
// ============================================================================

impl State {
    /// Load state from disk, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build supports up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} records from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, replacing the previous file atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;

        let content = serde_json::to_string_pretty(&*self).context("Failed to serialize state")?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .context("Failed to write state")?;
        temp.persist(path)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Records in the planner's form
    pub fn records(&self) -> BTreeMap<String, ResourceData> {
        self.resources
            .iter()
            .map(|(name, record)| (name.clone(), ResourceData::from(record)))
            .collect()
    }

    /// Store or drop a record by name
    pub fn set(&mut self, name: &str, record: Option<&ResourceData>) {
        match record {
            Some(data) if data.is_managed() => {
                self.resources
                    .insert(name.to_string(), ResourceRecord::from(data));
            }
            _ => {
                self.resources.remove(name);
            }
        }
    }

    /// Record the results of an apply or destroy
    pub fn apply_outcomes(&mut self, outcomes: &[Outcome]) {
        for outcome in outcomes {
            self.set(&outcome.name, outcome.record.as_ref());
        }
    }

    /// Record the results of a refresh
    pub fn apply_refresh(&mut self, outcomes: &[RefreshOutcome]) {
        for outcome in outcomes {
            self.set(&outcome.name, outcome.record.as_ref());
        }
    }
}
