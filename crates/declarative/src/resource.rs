//! Resource trait for declarative lifecycle management
//!
//! A [`Resource`] is a handler for one kind of managed object. The
//! framework owns the per-instance [`ResourceData`] and hands it to the
//! handler for each lifecycle step; the handler only reports identity
//! changes back through it.

use crate::types::{Attributes, ResourceData};
use anyhow::Result;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One attribute of a resource schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: &'static str,
    /// Must be set in desired state
    pub required: bool,
    /// Changing it replaces the instance instead of updating it
    pub force_new: bool,
}

impl Attribute {
    /// Required, updatable attribute
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            force_new: false,
        }
    }

    /// Optional, updatable attribute
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            force_new: false,
        }
    }

    /// Mark the attribute as force-new
    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// Attribute set of a resource type
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub attributes: Vec<Attribute>,
}

/// Desired attributes that do not fit the schema
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{resource}: missing required attribute \"{attribute}\"")]
    MissingRequired { resource: String, attribute: String },

    #[error("{resource}: unsupported attribute \"{attribute}\"")]
    Unsupported { resource: String, attribute: String },
}

impl Schema {
    /// Build a schema from attributes
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    /// Look up an attribute
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check desired attributes of the instance `resource`
    pub fn validate(&self, resource: &str, attributes: &Attributes) -> Result<(), SchemaError> {
        for key in attributes.keys() {
            if self.attribute(key).is_none() {
                return Err(SchemaError::Unsupported {
                    resource: resource.to_string(),
                    attribute: key.clone(),
                });
            }
        }

        for attr in self.attributes.iter().filter(|a| a.required) {
            if attributes.get(attr.name).is_none_or(String::is_empty) {
                return Err(SchemaError::MissingRequired {
                    resource: resource.to_string(),
                    attribute: attr.name.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Lifecycle handler for one resource type
///
/// Each operation runs synchronously and may block up to `timeout`.
///
/// - `create` must set the identity on success and leave it empty on failure
/// - `read` clears the identity when the object no longer exists
/// - `update` re-applies the desired attributes, keeping the identity
/// - `delete` removes the object; the framework drops the record afterwards
pub trait Resource: Send + Sync + fmt::Debug {
    /// Resource type name, e.g. "k8s_manifest"
    fn resource_type(&self) -> &'static str;

    /// Attribute schema
    fn schema(&self) -> Schema;

    /// Create the object described by `data.attributes`
    fn create(&self, data: &mut ResourceData, timeout: Duration) -> Result<()>;

    /// Refresh `data` from the live object
    fn read(&self, data: &mut ResourceData, timeout: Duration) -> Result<()>;

    /// Update the object in place
    fn update(&self, data: &mut ResourceData, timeout: Duration) -> Result<()>;

    /// Delete the object
    fn delete(&self, data: &mut ResourceData, timeout: Duration) -> Result<()>;
}
