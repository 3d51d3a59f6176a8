//! Diff computation between prior and desired state

use crate::resource::Schema;
use crate::types::{Action, Attributes, ResourceData};
use serde::{Deserialize, Serialize};

/// A changed attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub force_new: bool,
}

/// Planned change for one named resource instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Instance name
    pub name: String,
    /// What will happen
    pub action: Action,
    /// Attributes that differ
    pub changes: Vec<AttributeChange>,
}

impl ResourceDiff {
    /// Compare a prior record with desired attributes
    ///
    /// No prior record (or one without identity) means create, no desired
    /// attributes means delete. Otherwise any changed force-new attribute
    /// means replace and any other change means update.
    pub fn compute(
        schema: &Schema,
        name: &str,
        prior: Option<&ResourceData>,
        desired: Option<&Attributes>,
    ) -> Self {
        let prior = prior.filter(|p| p.is_managed());

        let (action, changes) = match (prior, desired) {
            (None, None) => (Action::NoChange, Vec::new()),
            (None, Some(desired)) => (Action::Create, changes(schema, None, Some(desired))),
            (Some(prior), None) => (
                Action::Delete,
                changes(schema, Some(&prior.attributes), None),
            ),
            (Some(prior), Some(desired)) => {
                let changes = changes(schema, Some(&prior.attributes), Some(desired));
                let action = if changes.is_empty() {
                    Action::NoChange
                } else if changes.iter().any(|c| c.force_new) {
                    Action::Replace
                } else {
                    Action::Update
                };
                (action, changes)
            }
        };

        Self {
            name: name.to_string(),
            action,
            changes,
        }
    }

    /// Names of attributes forcing replacement
    pub fn forced_by(&self) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|c| c.force_new)
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn value<'a>(attrs: Option<&'a Attributes>, key: &str) -> Option<&'a str> {
    attrs
        .and_then(|a| a.get(key))
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn changes(
    schema: &Schema,
    prior: Option<&Attributes>,
    desired: Option<&Attributes>,
) -> Vec<AttributeChange> {
    schema
        .attributes
        .iter()
        .filter_map(|attr| {
            let from = value(prior, attr.name);
            let to = value(desired, attr.name);
            (from != to).then(|| AttributeChange {
                name: attr.name.to_string(),
                from: from.map(str::to_string),
                to: to.map(str::to_string),
                force_new: attr.force_new,
            })
        })
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    pub additions: usize,
    pub updates: usize,
    pub replacements: usize,
    pub removals: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Update => summary.updates += 1,
                Action::Replace => summary.replacements += 1,
                Action::Delete => summary.removals += 1,
                Action::NoChange => {}
            }
        }
        summary
    }
}
