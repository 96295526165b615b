//! Entity extraction over a parsed configuration document.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use xml_value_core::{parse, parse_file, DocumentIndex, NodeId, ParseError, WriteError, XmlNode};

use crate::entity::{build_entity, entity_mark, reported_tag, unwrap_children, Entity};
use crate::firewall_rule::{parse_firewall_rule, FirewallRule};
use crate::policy::EntityPolicy;
use crate::tag_format::format_tag_name;
use crate::topology::InterfaceTopology;

/// Root tag every configuration export is expected to carry.
pub const CONFIGURATION_ROOT: &str = "Configuration";
/// Tag whose entities are also parsed into [`FirewallRule`]s.
pub const FIREWALL_RULE_TAG: &str = "FirewallRule";

/// Errors from loading and extracting a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to serialize entity subtree: {0}")]
    Write(#[from] WriteError),
}

/// Entities of one known type, labelled for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCollection {
    pub tag: String,
    pub label: String,
    pub entities: Vec<Entity>,
}

/// Everything extracted from one configuration export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationModel {
    pub root_tag: String,
    /// One collection per known tag, in policy order. Empty collections are kept.
    pub collections: Vec<EntityCollection>,
    /// Entities of every other tag seen, keyed by tag.
    pub entities_by_tag: BTreeMap<String, Vec<Entity>>,
    pub firewall_rules: Vec<FirewallRule>,
    pub topology: InterfaceTopology,
}

impl ConfigurationModel {
    /// Known collections first, then dynamic tags in tag order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.collections
            .iter()
            .flat_map(|c| c.entities.iter())
            .chain(self.entities_by_tag.values().flatten())
    }

    pub fn entity_count(&self) -> usize {
        self.collections.iter().map(|c| c.entities.len()).sum::<usize>()
            + self.entities_by_tag.values().map(Vec::len).sum::<usize>()
    }

    pub fn collection(&self, tag: &str) -> Option<&EntityCollection> {
        self.collections.iter().find(|c| c.tag == tag)
    }

    /// Entities stored under `tag`, known or dynamic.
    pub fn entities_with_tag(&self, tag: &str) -> &[Entity] {
        self.collection(tag)
            .map(|c| c.entities.as_slice())
            .or_else(|| self.entities_by_tag.get(tag).map(Vec::as_slice))
            .unwrap_or(&[])
    }
}

/// An extracted entity and the element it came from.
#[derive(Debug, Clone)]
pub(crate) struct Located {
    pub id: NodeId,
    pub entity: Entity,
}

#[derive(Debug, Default)]
pub(crate) struct Extraction {
    pub known: Vec<(String, Vec<Located>)>,
    pub dynamic: BTreeMap<String, Vec<Located>>,
}

impl Extraction {
    pub fn all(&self) -> impl Iterator<Item = &Located> {
        self.known
            .iter()
            .flat_map(|(_, items)| items.iter())
            .chain(self.dynamic.values().flatten())
    }
}

/// Parse XML text with the embedded policy.
pub fn parse_configuration(xml: &str) -> Result<ConfigurationModel, ConfigError> {
    parse_configuration_with_policy(xml, &EntityPolicy::default())
}

pub fn parse_configuration_with_policy(
    xml: &str,
    policy: &EntityPolicy,
) -> Result<ConfigurationModel, ConfigError> {
    let root = parse(xml.as_bytes())?;
    extract(&root, policy)
}

/// Read, parse and extract a configuration file.
pub fn load_configuration(path: &Path, policy: &EntityPolicy) -> Result<ConfigurationModel, ConfigError> {
    let root = parse_file(path)?;
    extract(&root, policy)
}

/// Build the entity model for an already parsed document.
pub fn extract(root: &XmlNode, policy: &EntityPolicy) -> Result<ConfigurationModel, ConfigError> {
    if root.tag != CONFIGURATION_ROOT {
        warn!(root = %root.tag, "unexpected root element; extracting anyway");
    }
    let doc = DocumentIndex::build(root);
    let extraction = extract_located(&doc, policy)?;

    let mut rule_ids: Vec<NodeId> = extraction
        .all()
        .filter(|l| l.entity.tag == FIREWALL_RULE_TAG)
        .map(|l| l.id)
        .collect();
    rule_ids.sort_unstable();
    let firewall_rules: Vec<FirewallRule> = rule_ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| parse_firewall_rule(doc.node(id), index))
        .collect();

    let collections: Vec<EntityCollection> = extraction
        .known
        .into_iter()
        .map(|(tag, items)| EntityCollection {
            label: format_tag_name(&tag),
            tag,
            entities: items.into_iter().map(|l| l.entity).collect(),
        })
        .collect();
    let entities_by_tag: BTreeMap<String, Vec<Entity>> = extraction
        .dynamic
        .into_iter()
        .map(|(tag, items)| (tag, items.into_iter().map(|l| l.entity).collect()))
        .collect();

    let topology = InterfaceTopology::build(
        collections
            .iter()
            .flat_map(|c| c.entities.iter())
            .chain(entities_by_tag.values().flatten()),
        policy.topology(),
    );

    let model = ConfigurationModel {
        root_tag: root.tag.clone(),
        collections,
        entities_by_tag,
        firewall_rules,
        topology,
    };
    debug!(
        entities = model.entity_count(),
        dynamic_tags = model.entities_by_tag.len(),
        rules = model.firewall_rules.len(),
        "extracted configuration"
    );
    Ok(model)
}

/// Run known-tag and dynamic-tag extraction, keeping source element ids.
pub(crate) fn extract_located(
    doc: &DocumentIndex<'_>,
    policy: &EntityPolicy,
) -> Result<Extraction, WriteError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut extraction = Extraction::default();

    for known in policy.known_tags() {
        // Document order across all selectors, so the first occurrence wins.
        let mut ids: Vec<NodeId> = known
            .selectors()
            .into_iter()
            .flat_map(|selector| doc.with_tag(selector))
            .flat_map(|id| expand_unwrapped(doc, id, policy))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let mut items = Vec::new();
        for id in ids {
            if entity_mark(doc, id, policy).is_none() {
                continue;
            }
            let entity = build_entity(doc, id, &known.tag, policy)?;
            if entity.carries_information() && seen.insert(entity.dedupe_key()) {
                items.push(Located { id, entity });
            }
        }
        extraction.known.push((known.tag.clone(), items));
    }

    for id in dynamic_candidates(doc, policy) {
        let tag = reported_tag(doc, id, policy);
        if !passes_dynamic_filters(doc, id) {
            continue;
        }
        let entity = build_entity(doc, id, tag, policy)?;
        if entity.carries_information() && seen.insert(entity.dedupe_key()) {
            extraction
                .dynamic
                .entry(tag.to_string())
                .or_default()
                .push(Located { id, entity });
        }
    }

    Ok(extraction)
}

fn expand_unwrapped(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> Vec<NodeId> {
    let children: Vec<NodeId> = unwrap_children(doc, id, policy).collect();
    if children.is_empty() {
        vec![id]
    } else {
        children
    }
}

// Outermost entities whose reported tag is not a known selector. Entities
// nested inside another entity are fields of it, not entities of their own.
fn dynamic_candidates(doc: &DocumentIndex<'_>, policy: &EntityPolicy) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut pending: Vec<NodeId> = doc.children(doc.root()).iter().rev().copied().collect();
    while let Some(id) = pending.pop() {
        if entity_mark(doc, id, policy).is_some() {
            if !policy.is_known_selector(reported_tag(doc, id, policy)) {
                out.push(id);
            }
            continue;
        }
        pending.extend(doc.children(id).iter().rev().copied());
    }
    out
}

fn passes_dynamic_filters(doc: &DocumentIndex<'_>, id: NodeId) -> bool {
    let tag = doc.tag(id);
    let repeats_in_children = doc.children(id).iter().any(|c| doc.tag(*c) == tag);
    let nested_in_same = doc.parent(id).is_some_and(|p| doc.tag(p) == tag);
    !repeats_in_children && !nested_in_same && !doc.node(id).is_blank()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use xml_value_core::FieldValue;

    use super::{parse_configuration, ConfigError};

    #[test]
    fn extracts_single_host() {
        let model = parse_configuration(
            r#"<Configuration><IPHost transactionid="1"><Name>Srv1</Name><IPAddress>10.0.0.1</IPAddress></IPHost></Configuration>"#,
        )
        .expect("model");

        let hosts = &model.collection("IPHost").expect("collection").entities;
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].tag, "IPHost");
        assert_eq!(hosts[0].name, "Srv1");
        assert_eq!(hosts[0].transaction_id, "1");
        assert_eq!(
            hosts[0].fields.get("IPAddress"),
            Some(&FieldValue::Scalar("10.0.0.1".to_string()))
        );
        assert_eq!(model.entity_count(), 1);
    }

    #[test]
    fn selectors_map_to_canonical_tag_and_dedupe() {
        let model = parse_configuration(
            r#"<Configuration>
                <Service><Name>Web</Name><Port>80</Port></Service>
                <Services><Name>Mail</Name><Port>25</Port></Services>
                <Services><Name>Web</Name><Port>80</Port></Services>
            </Configuration>"#,
        )
        .expect("model");

        let names: Vec<&str> = model
            .entities_with_tag("Services")
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Web", "Mail"]);
    }

    #[test]
    fn dynamic_tags_are_collected_and_filtered() {
        let model = parse_configuration(
            r#"<Configuration>
                <DNS transactionid="7"><Server>1.1.1.1</Server></DNS>
                <Lists transactionid=""><Lists><Name>inner</Name></Lists></Lists>
                <AdminSettings><Name>admin</Name><Hostname>fw</Hostname><Banner><Name>nested</Name></Banner></AdminSettings>
                <Empty transactionid=""/>
            </Configuration>"#,
        )
        .expect("model");

        let tags: Vec<&str> = model.entities_by_tag.keys().map(String::as_str).collect();
        assert_eq!(tags, vec!["AdminSettings", "DNS"]);
        assert_eq!(model.entities_by_tag["DNS"][0].name, "DNS");
        assert_eq!(model.entities_by_tag["DNS"][0].transaction_id, "7");
    }

    #[test]
    fn vpn_configurations_are_unwrapped() {
        let model = parse_configuration(
            r#"<Configuration><VPNIPSecConnection transactionid="42">
                <Configuration><Name>Branch</Name><Mode>Tunnel</Mode></Configuration>
                <Configuration><Name>HQ</Name><Mode>Tunnel</Mode></Configuration>
            </VPNIPSecConnection></Configuration>"#,
        )
        .expect("model");

        let vpn = model.entities_with_tag("VPNIPSecConnection");
        assert_eq!(vpn.len(), 2);
        assert!(vpn.iter().all(|e| e.transaction_id == "42"));
        assert_eq!(vpn[1].name, "HQ");
        assert!(model.entities_by_tag.is_empty());
    }

    #[test]
    fn entity_raw_xml_reextracts_to_same_record() {
        let model = parse_configuration(
            r#"<Configuration><Zone transactionid="3"><Name>LAN</Name><Members><Interface>Port1</Interface><Interface>Port2</Interface></Members></Zone></Configuration>"#,
        )
        .expect("model");
        let zone = &model.entities_with_tag("Zone")[0];

        let wrapped = format!("<Configuration>{}</Configuration>", zone.raw_xml);
        let again = parse_configuration(&wrapped).expect("again");
        assert_eq!(&again.entities_with_tag("Zone")[0], zone);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let err = parse_configuration("<Configuration><IPHost></Configuration>").expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
