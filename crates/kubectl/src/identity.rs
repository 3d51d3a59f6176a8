//! Resource identity derived from kubectl output.
//!
//! After a manifest is applied, `kubectl get -o json -f -` returns a list
//! whose single item carries a self-link such as
//! `/api/v1/namespaces/ops/services/web`. That string is the durable
//! identity. Later operations split it back into a `kind/name` reference
//! and an optional namespace.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Default, Deserialize)]
struct Metadata {
    #[serde(default, alias = "selfLink")]
    selflink: String,
}

/// Derive an identity from the JSON output of `kubectl get -o json -f -`.
pub fn encode(response: &[u8]) -> Result<String> {
    let list: ListResponse = serde_json::from_slice(response)?;

    if list.items.len() != 1 {
        return Err(Error::Cardinality {
            count: list.items.len(),
        });
    }

    let selflink = list
        .items
        .into_iter()
        .next()
        .map(|item| item.metadata.selflink)
        .unwrap_or_default();

    if selflink.is_empty() {
        return Err(Error::MissingSelfLink {
            response: String::from_utf8_lossy(response).into_owned(),
        });
    }

    Ok(selflink)
}

/// A `kind/name` reference plus namespace, decoded from an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    /// `<kind-plural>/<name>` as accepted by `kubectl get` and `kubectl delete`
    pub resource: String,
    /// Namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
}

impl ResourceRef {
    /// Decode a stored identity.
    ///
    /// The last two segments form the resource reference. The namespace is
    /// the segment right after a literal `namespaces` segment, if any.
    pub fn from_identity(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split('/').collect();
        if parts.len() < 2 {
            return Err(Error::InvalidIdentity { id: id.to_string() });
        }

        let resource = format!("{}/{}", parts[parts.len() - 2], parts[parts.len() - 1]);

        let namespace = parts
            .windows(2)
            .find(|pair| pair[0] == "namespaces")
            .map(|pair| pair[1])
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);

        Ok(Self {
            resource,
            namespace,
        })
    }

    /// Namespace as a string slice.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} (namespace {})", self.resource, ns),
            None => write!(f, "{}", self.resource),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_single_item() {
        let response = br#"{"items":[{"metadata":{"selflink":"/api/v1/namespaces/foo/services/bar"}}]}"#;
        assert_eq!(
            encode(response).unwrap(),
            "/api/v1/namespaces/foo/services/bar"
        );
    }

    #[test]
    fn test_encode_accepts_kubectl_casing() {
        let response = br#"{
            "apiVersion": "v1",
            "kind": "List",
            "items": [{
                "kind": "Service",
                "metadata": {
                    "name": "web",
                    "namespace": "ops",
                    "selfLink": "/api/v1/namespaces/ops/services/web"
                }
            }]
        }"#;
        assert_eq!(
            encode(response).unwrap(),
            "/api/v1/namespaces/ops/services/web"
        );
    }

    #[test]
    fn test_encode_rejects_zero_items() {
        let err = encode(br#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Cardinality { count: 0 }));
    }

    #[test]
    fn test_encode_rejects_two_items() {
        let response = br#"{"items":[
            {"metadata":{"selflink":"/api/v1/namespaces/a/services/x"}},
            {"metadata":{"selflink":"/api/v1/namespaces/a/services/y"}}
        ]}"#;
        let err = encode(response).unwrap_err();
        assert!(matches!(err, Error::Cardinality { count: 2 }));
    }

    #[test]
    fn test_encode_missing_selflink() {
        let err = encode(br#"{"items":[{"metadata":{"name":"web"}}]}"#).unwrap_err();
        assert!(matches!(err, Error::MissingSelfLink { .. }));

        let err = encode(br#"{"items":[{"metadata":{"selflink":""}}]}"#).unwrap_err();
        assert!(matches!(err, Error::MissingSelfLink { .. }));
    }

    #[test]
    fn test_encode_rejects_non_json() {
        let err = encode(b"service/web created").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_namespaced() {
        let r = ResourceRef::from_identity("default/namespaces/foo/services/bar").unwrap();
        assert_eq!(r.resource, "services/bar");
        assert_eq!(r.namespace(), Some("foo"));
    }

    #[test]
    fn test_decode_self_link() {
        let r = ResourceRef::from_identity("/apis/apps/v1/namespaces/ops/deployments/web").unwrap();
        assert_eq!(r.resource, "deployments/web");
        assert_eq!(r.namespace(), Some("ops"));
    }

    #[test]
    fn test_decode_cluster_scoped() {
        let r = ResourceRef::from_identity("services/bar").unwrap();
        assert_eq!(r.resource, "services/bar");
        assert_eq!(r.namespace(), None);

        let r = ResourceRef::from_identity("/api/v1/namespaces/ops").unwrap();
        assert_eq!(r.resource, "namespaces/ops");
        assert_eq!(r.namespace(), Some("ops"));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(matches!(
            ResourceRef::from_identity("bar"),
            Err(Error::InvalidIdentity { .. })
        ));
        assert!(matches!(
            ResourceRef::from_identity(""),
            Err(Error::InvalidIdentity { .. })
        ));
    }
}
