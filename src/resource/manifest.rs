//! Kubernetes manifest resource

use anyhow::{Context, Result, bail};
use declarative::{Attribute, Resource, ResourceData, Schema};
use kubectl::{Client, Manifest, ProcessRunner, Runner};
use std::fmt;
use std::time::Duration;

use super::{ATTR_CONTENT, ATTR_NAMESPACE, RESOURCE_TYPE};

/// One manifest applied with kubectl, identified by its selfLink
pub struct ManifestResource<R: Runner = ProcessRunner> {
    client: Client<R>,
}

impl<R: Runner> ManifestResource<R> {
    pub fn new(client: Client<R>) -> Self {
        Self { client }
    }
}

impl<R: Runner> fmt::Debug for ManifestResource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestResource")
            .field("kubectl", &self.client.config().program())
            .finish_non_exhaustive()
    }
}

fn manifest(data: &ResourceData) -> Result<Manifest> {
    let Some(content) = data.get(ATTR_CONTENT) else {
        bail!("manifest content is empty");
    };
    let manifest = Manifest::new(content);
    Ok(match data.get(ATTR_NAMESPACE) {
        Some(ns) => manifest.with_namespace(ns),
        None => manifest,
    })
}

impl<R: Runner> Resource for ManifestResource<R> {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Attribute::optional(ATTR_NAMESPACE).force_new(),
            Attribute::required(ATTR_CONTENT),
        ])
    }

    fn create(&self, data: &mut ResourceData, timeout: Duration) -> Result<()> {
        let manifest = manifest(data)?;
        let id = self
            .client
            .create(&manifest, timeout)
            .context("applying manifest")?;
        data.set_id(id);
        Ok(())
    }

    fn read(&self, data: &mut ResourceData, timeout: Duration) -> Result<()> {
        let exists = self
            .client
            .read(&data.id, timeout)
            .with_context(|| format!("reading {}", data.id))?;
        if exists.is_none() {
            data.clear_id();
        }
        Ok(())
    }

    fn update(&self, data: &mut ResourceData, timeout: Duration) -> Result<()> {
        let manifest = manifest(data)?;
        self.client
            .update(&manifest, timeout)
            .context("applying manifest")
    }

    fn delete(&self, data: &mut ResourceData, timeout: Duration) -> Result<()> {
        self.client
            .delete(&data.id, timeout)
            .with_context(|| format!("deleting {}", data.id))
    }
}
