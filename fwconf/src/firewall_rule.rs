//! Flattened view of `FirewallRule` entities.
//!
//! Rules carry their settings in either a `NetworkPolicy` or a `UserPolicy`
//! subtree. The parser picks one, keeps it whole in [`FirewallRule::policy`],
//! and flattens the well-known fields for tabular display. Empty values stay
//! empty here; display defaults such as "Any" belong to the renderer.

use serde::Serialize;
use xml_value_core::{parse_object, FieldMap, FieldValue, XmlNode};

const NETWORK_POLICY: &str = "NetworkPolicy";
const USER_POLICY: &str = "UserPolicy";

/// Which policy subtree the flattened fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    Network,
    User,
    None,
}

/// Zones, networks and services explicitly excluded from a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleExclusions {
    pub source_zones: Vec<String>,
    pub destination_zones: Vec<String>,
    pub source_networks: Vec<String>,
    pub destination_networks: Vec<String>,
    pub services: Vec<String>,
}

impl RuleExclusions {
    pub fn is_empty(&self) -> bool {
        self.source_zones.is_empty()
            && self.destination_zones.is_empty()
            && self.source_networks.is_empty()
            && self.destination_networks.is_empty()
            && self.services.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallRule {
    /// Position among the document's firewall rules, from 0.
    pub index: usize,
    pub name: String,
    pub description: String,
    pub status: String,
    pub ip_family: String,
    pub policy_type: String,
    pub position: String,
    /// Name of the preceding rule (`After > Name`).
    pub after: String,
    pub transaction_id: String,
    pub policy_source: PolicySource,
    /// The selected policy subtree, unflattened.
    pub policy: FieldMap,
    pub action: String,
    pub log_traffic: String,
    pub schedule: String,
    pub source_zones: Vec<String>,
    pub destination_zones: Vec<String>,
    pub source_networks: Vec<String>,
    pub destination_networks: Vec<String>,
    pub services: Vec<String>,
    pub web_filter: String,
    pub application_control: String,
    pub intrusion_prevention: String,
    pub scan_virus: String,
    pub zero_day_protection: String,
    pub proxy_mode: String,
    pub decrypt_https: String,
    /// Comma-joined identity members of a user policy.
    pub identity: String,
    pub exclusions: RuleExclusions,
}

impl FirewallRule {
    pub fn is_enabled(&self) -> bool {
        self.status.eq_ignore_ascii_case("Enable")
    }
}

/// Flatten one `FirewallRule` element.
pub fn parse_firewall_rule(node: &XmlNode, index: usize) -> FirewallRule {
    let text = |tag: &str| node.child_text(tag).unwrap_or("").to_string();
    let policy_type = text("PolicyType");
    let (policy_source, policy) = select_policy(node, &policy_type);
    let scalar = |key: &str| scalar_field(&policy, key);

    FirewallRule {
        index,
        name: text("Name"),
        description: text("Description"),
        status: text("Status"),
        ip_family: text("IPFamily"),
        position: text("Position"),
        after: node
            .get_text(&["After", "Name"])
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        transaction_id: node.attribute("transactionid").unwrap_or("").to_string(),
        action: scalar("Action"),
        log_traffic: scalar("LogTraffic"),
        schedule: scalar("Schedule"),
        source_zones: list_field(&policy, "SourceZones", "Zone"),
        destination_zones: list_field(&policy, "DestinationZones", "Zone"),
        source_networks: list_field(&policy, "SourceNetworks", "Network"),
        destination_networks: list_field(&policy, "DestinationNetworks", "Network"),
        services: list_field(&policy, "Services", "Service"),
        web_filter: scalar("WebFilter"),
        application_control: scalar("ApplicationControl"),
        intrusion_prevention: scalar("IntrusionPrevention"),
        scan_virus: scalar("ScanVirus"),
        zero_day_protection: scalar("ZeroDayProtection"),
        proxy_mode: scalar("ProxyMode"),
        decrypt_https: scalar("DecryptHTTPS"),
        identity: policy.get("Identity").map(identity_display).unwrap_or_default(),
        exclusions: policy
            .get("Exclusions")
            .and_then(FieldValue::as_object)
            .map(parse_exclusions)
            .unwrap_or_default(),
        policy_type,
        policy_source,
        policy,
    }
}

// A "User" policy type reads `UserPolicy` first; everything else reads
// `NetworkPolicy` first. Either falls back to the other subtree.
fn select_policy(node: &XmlNode, policy_type: &str) -> (PolicySource, FieldMap) {
    let order = if policy_type.eq_ignore_ascii_case("User") {
        [(USER_POLICY, PolicySource::User), (NETWORK_POLICY, PolicySource::Network)]
    } else {
        [(NETWORK_POLICY, PolicySource::Network), (USER_POLICY, PolicySource::User)]
    };
    order
        .into_iter()
        .find_map(|(tag, source)| node.get_child(tag).map(|child| (source, parse_object(child))))
        .unwrap_or((PolicySource::None, FieldMap::new()))
}

fn scalar_field(map: &FieldMap, key: &str) -> String {
    map.get(key)
        .and_then(FieldValue::as_scalar)
        .unwrap_or("")
        .to_string()
}

/// Read a list-valued policy field as plain strings.
///
/// Accepts a direct array (`SourceZones` holding repeated `Zone`s), a wrapper
/// object whose `item_tag` field holds the values, or a bare scalar. Any other
/// shape yields an empty list.
pub fn list_field(map: &FieldMap, key: &str, item_tag: &str) -> Vec<String> {
    map.get(key)
        .map(|value| list_values(value, item_tag))
        .unwrap_or_default()
}

fn list_values(value: &FieldValue, item_tag: &str) -> Vec<String> {
    match value {
        FieldValue::Scalar(s) if s.is_empty() => Vec::new(),
        FieldValue::Scalar(s) => vec![s.clone()],
        FieldValue::Array(items) => items
            .iter()
            .filter_map(FieldValue::as_scalar)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        FieldValue::Object(map) => match map.get(item_tag) {
            Some(inner @ (FieldValue::Scalar(_) | FieldValue::Array(_))) => list_values(inner, item_tag),
            _ => Vec::new(),
        },
    }
}

fn identity_display(value: &FieldValue) -> String {
    let members: Vec<String> = match value {
        FieldValue::Array(_) => list_values(value, "Member"),
        FieldValue::Object(map) => map.get("Member").map(|m| list_values(m, "Member")).unwrap_or_default(),
        FieldValue::Scalar(s) => vec![s.clone()],
    };
    members.join(", ")
}

fn parse_exclusions(map: &FieldMap) -> RuleExclusions {
    RuleExclusions {
        source_zones: list_field(map, "SourceZones", "Zone"),
        destination_zones: list_field(map, "DestinationZones", "Zone"),
        source_networks: list_field(map, "SourceNetworks", "Network"),
        destination_networks: list_field(map, "DestinationNetworks", "Network"),
        services: list_field(map, "Services", "Service"),
    }
}
