//! Execution planner - turns prior and desired state into planned changes

use crate::diff::ResourceDiff;
use crate::resource::{Resource, SchemaError};
use crate::types::{Action, Attributes, ResourceData};
use std::collections::{BTreeMap, BTreeSet};

/// One instance with its planned action
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// The computed diff
    pub diff: ResourceDiff,
    /// Stored record, if any
    pub prior: Option<ResourceData>,
    /// Desired attributes, if still declared
    pub desired: Option<Attributes>,
}

impl PlannedChange {
    /// Instance name
    pub fn name(&self) -> &str {
        &self.diff.name
    }

    /// Planned action
    pub fn action(&self) -> Action {
        self.diff.action
    }
}

/// An execution plan for one resource type
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    /// Changes ordered by instance name
    pub changes: Vec<PlannedChange>,
}

impl ExecutionPlan {
    /// Plan every instance found in either prior or desired state
    pub fn build(
        resource: &dyn Resource,
        prior: &BTreeMap<String, ResourceData>,
        desired: &BTreeMap<String, Attributes>,
    ) -> Result<Self, SchemaError> {
        let schema = resource.schema();

        for (name, attributes) in desired {
            schema.validate(name, attributes)?;
        }

        let names: BTreeSet<&String> = prior.keys().chain(desired.keys()).collect();

        let changes = names
            .into_iter()
            .map(|name| {
                let prior = prior.get(name);
                let desired = desired.get(name);
                PlannedChange {
                    diff: ResourceDiff::compute(&schema, name, prior, desired),
                    prior: prior.cloned(),
                    desired: desired.cloned(),
                }
            })
            .collect();

        Ok(Self { changes })
    }

    /// Filter plan to only include changes matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlannedChange) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include instances matching a target pattern
    ///
    /// Target format: "name" or "type.name"
    pub fn filter_by_target(self, resource_type: &str, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let name = match t.split_once('.') {
                    Some((ty, name)) if ty == resource_type => name.to_string(),
                    Some(_) => return Self::default(),
                    None => t.to_string(),
                };
                self.filter(|c| c.name() == name)
            }
        }
    }

    /// Only the changes that do something
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action().is_change())
    }

    /// Number of changes that do something
    pub fn total_changes(&self) -> usize {
        self.pending().count()
    }

    /// Check if plan has nothing to do
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }
}
