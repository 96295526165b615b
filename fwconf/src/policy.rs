//! Entity boundary and reference-tag policy.
//!
//! What counts as an entity, which wrappers to skip, and which element names
//! carry references to other entities are data, not code. The default policy
//! is embedded from `policy/entity_policy.toml`; callers may load their own.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// A fixed entity type and the element names that produce it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnownTag {
    /// Canonical tag stored on extracted entities.
    pub tag: String,
    /// Element names mapping to `tag`. Empty means just `tag`.
    #[serde(default)]
    pub selectors: Vec<String>,
}

impl KnownTag {
    /// Selectors in declaration order, falling back to the canonical tag.
    pub fn selectors(&self) -> Vec<&str> {
        if self.selectors.is_empty() {
            vec![self.tag.as_str()]
        } else {
            self.selectors.iter().map(String::as_str).collect()
        }
    }
}

/// `parent` elements whose `child` elements are each an independent entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnwrapRule {
    pub parent: String,
    pub child: String,
}

/// Tags and fields used to group interface-bound entities.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TopologyPolicy {
    pub interface_field: String,
    pub vlan_tag: String,
    pub alias_tag: String,
    pub lag_tag: String,
    pub lag_member_field: String,
    pub interface_tag: String,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    container_tags: Vec<String>,
    reference_tags: Vec<String>,
    #[serde(default)]
    known: Vec<KnownTag>,
    #[serde(default)]
    unwrap: Vec<UnwrapRule>,
    topology: TopologyPolicy,
}

/// Errors returned when loading policy files.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Entity policy shared by extraction and reference resolution.
#[derive(Debug, Clone)]
pub struct EntityPolicy {
    known: Vec<KnownTag>,
    selectors: HashSet<String>,
    containers: HashSet<String>,
    reference_tags: HashSet<String>,
    unwrap: Vec<UnwrapRule>,
    topology: TopologyPolicy,
}

impl EntityPolicy {
    /// Load a policy from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PolicyLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw, path.display().to_string())
    }

    /// Parse a policy from TOML text; `origin` names it in errors.
    pub fn from_toml(raw: &str, origin: String) -> Result<Self, PolicyLoadError> {
        let parsed: PolicyFile = toml::from_str(raw).map_err(|source| PolicyLoadError::Parse {
            path: origin,
            source,
        })?;
        Ok(Self::from_file(parsed))
    }

    fn from_file(file: PolicyFile) -> Self {
        let selectors = file
            .known
            .iter()
            .flat_map(|k| k.selectors().into_iter().map(str::to_string))
            .collect();
        Self {
            selectors,
            containers: file.container_tags.into_iter().collect(),
            reference_tags: file.reference_tags.into_iter().collect(),
            known: file.known,
            unwrap: file.unwrap,
            topology: file.topology,
        }
    }

    /// Known entity types in declaration order.
    pub fn known_tags(&self) -> &[KnownTag] {
        &self.known
    }

    /// True when `tag` is a selector of any known entity type.
    pub fn is_known_selector(&self, tag: &str) -> bool {
        self.selectors.contains(tag)
    }

    /// Known entity type produced by elements named `selector`.
    pub fn canonical_tag(&self, selector: &str) -> Option<&str> {
        self.known
            .iter()
            .find(|known| known.selectors().contains(&selector))
            .map(|known| known.tag.as_str())
    }

    pub fn is_container_tag(&self, tag: &str) -> bool {
        self.containers.contains(tag)
    }

    /// True when text inside a `tag` element may name another entity.
    pub fn is_reference_tag(&self, tag: &str) -> bool {
        self.reference_tags.contains(tag)
    }

    /// Child tag to unwrap when `parent` matches an unwrap rule.
    pub fn unwrap_child(&self, parent: &str) -> Option<&str> {
        self.unwrap
            .iter()
            .find(|rule| rule.parent == parent)
            .map(|rule| rule.child.as_str())
    }

    pub fn topology(&self) -> &TopologyPolicy {
        &self.topology
    }
}

impl Default for EntityPolicy {
    /// The embedded policy, or a compiled-in fallback if it fails to parse.
    fn default() -> Self {
        let embedded = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/policy/entity_policy.toml"
        ));
        match Self::from_toml(embedded, "embedded policy".to_string()) {
            Ok(policy) if !policy.known.is_empty() => policy,
            Ok(_) => {
                warn!("embedded entity policy lists no known tags; using fallback");
                fallback_policy()
            }
            Err(err) => {
                warn!("{err}; using fallback entity policy");
                fallback_policy()
            }
        }
    }
}

fn fallback_policy() -> EntityPolicy {
    let known = [
        "FirewallRule",
        "IPHost",
        "IPHostGroup",
        "FQDNHost",
        "FQDNHostGroup",
        "Services",
        "ServiceGroup",
        "Zone",
        "Interface",
        "VLAN",
        "Alias",
        "LAG",
        "VPNIPSecConnection",
    ]
    .into_iter()
    .map(|tag| KnownTag {
        tag: tag.to_string(),
        selectors: Vec::new(),
    })
    .collect();

    EntityPolicy::from_file(PolicyFile {
        container_tags: strings(&["Configuration", "Entities", "Root"]),
        reference_tags: strings(&[
            "Network",
            "Zone",
            "Service",
            "Group",
            "Member",
            "Interface",
            "FQDN",
            "User",
            "Host",
        ]),
        known,
        unwrap: vec![UnwrapRule {
            parent: "VPNIPSecConnection".to_string(),
            child: "Configuration".to_string(),
        }],
        topology: TopologyPolicy {
            interface_field: "Interface".to_string(),
            vlan_tag: "VLAN".to_string(),
            alias_tag: "Alias".to_string(),
            lag_tag: "LAG".to_string(),
            lag_member_field: "MemberInterface".to_string(),
            interface_tag: "Interface".to_string(),
        },
    })
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
