//! Reverse cross-reference index: for every named entity, where is it used?
//!
//! The build walks entity names in discovery order and looks each one up in a
//! single text index of the document, so the tree is walked once rather than
//! once per name. Names are processed in chunks; between chunks the builder
//! yields to the runtime and checks its [`CancellationToken`]. A cancelled
//! build returns [`ReferenceOutcome::Cancelled`] and none of its partial state.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use xml_value_core::{parse, DocumentIndex, NodeId, XmlNode};

use crate::entity::{
    build_entity, direct_name, entity_mark, reported_tag, transaction_id, Entity, EntityMark, NAME_TAG,
};
use crate::extract::ConfigError;
use crate::policy::EntityPolicy;

/// One place where an entity's name appears inside another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub parent_entity_name: String,
    pub parent_entity_tag: String,
    pub parent_transaction_id: String,
    /// Element directly enclosing the referencing field, or the parent
    /// entity's tag when the field sits directly on the entity.
    pub context_tag: String,
    /// Tags from just inside the parent entity down to the referencing field.
    pub context_path: String,
    /// Tag of the element whose text is the referenced name.
    pub reference_element: String,
    /// Tags from the document root down to the referencing field.
    pub full_path: String,
}

/// Definitions of one entity name and every reference to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReferenceTree {
    pub entity_name: String,
    /// Tag of the first definition.
    pub primary_tag: String,
    pub definitions: Vec<Entity>,
    pub references: Vec<ReferenceEntry>,
}

/// Entity name -> reference tree. Only names with at least one reference.
pub type ReferenceIndex = BTreeMap<String, EntityReferenceTree>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceOptions {
    /// Entity names processed between yields. Values below 1 act as 1.
    pub chunk_size: usize,
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self { chunk_size: 64 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceOutcome {
    Complete(ReferenceIndex),
    /// The token fired before the build finished.
    Cancelled,
}

impl ReferenceOutcome {
    pub fn into_index(self) -> Option<ReferenceIndex> {
        match self {
            Self::Complete(index) => Some(index),
            Self::Cancelled => None,
        }
    }
}

/// Parse `xml` and build its reference index.
///
/// Malformed XML fails before any indexing starts. `on_progress` receives a
/// non-decreasing percentage, starting at 0 and ending at 100 for a
/// completed build.
pub async fn build_reference_index(
    xml: &str,
    policy: &EntityPolicy,
    options: ReferenceOptions,
    cancel: &CancellationToken,
    on_progress: impl FnMut(u8),
) -> Result<ReferenceOutcome, ConfigError> {
    let root = parse(xml.as_bytes())?;
    build_reference_index_for(&root, policy, options, cancel, on_progress).await
}

/// Build the reference index of an already parsed document.
pub async fn build_reference_index_for(
    root: &XmlNode,
    policy: &EntityPolicy,
    options: ReferenceOptions,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(u8),
) -> Result<ReferenceOutcome, ConfigError> {
    let doc = DocumentIndex::build(root);
    let definitions = definitions_by_name(&doc, policy)?;
    let text_index = doc.text_index();
    debug!(
        names = definitions.len(),
        distinct_texts = text_index.len(),
        "indexed reference candidates"
    );

    let chunk_size = options.chunk_size.max(1);
    let total = definitions.len();
    let mut progress = Progress::new(&mut on_progress);
    let mut index = ReferenceIndex::new();

    for (chunk_no, chunk) in definitions.chunks(chunk_size).enumerate() {
        if cancel.is_cancelled() {
            debug!(chunk = chunk_no, "reference build cancelled");
            return Ok(ReferenceOutcome::Cancelled);
        }
        for (name, defs) in chunk {
            let references = collect_references(&doc, policy, name, &text_index);
            if references.is_empty() {
                continue;
            }
            index.insert(
                name.to_string(),
                EntityReferenceTree {
                    entity_name: name.to_string(),
                    primary_tag: defs[0].tag.clone(),
                    definitions: defs.clone(),
                    references,
                },
            );
        }
        let done = (chunk_no * chunk_size + chunk.len()).min(total);
        progress.report(percent(done, total));
        tokio::task::yield_now().await;
    }

    if cancel.is_cancelled() {
        debug!("reference build cancelled after last chunk");
        return Ok(ReferenceOutcome::Cancelled);
    }
    progress.report(100);
    info!(referenced = index.len(), names = total, "reference index built");
    Ok(ReferenceOutcome::Complete(index))
}

/// Every reference to `name` found through `text_index`, deduplicated by
/// parent entity, context tag and reference element.
pub fn collect_references(
    doc: &DocumentIndex<'_>,
    policy: &EntityPolicy,
    name: &str,
    text_index: &HashMap<&str, Vec<NodeId>>,
) -> Vec<ReferenceEntry> {
    let Some(candidates) = text_index.get(name) else {
        return Vec::new();
    };
    let mut seen: HashSet<(String, String, String, String)> = HashSet::new();
    let mut out = Vec::new();

    for &candidate in candidates {
        let tag = doc.tag(candidate);
        if tag == NAME_TAG && doc.parent(candidate).and_then(|p| direct_name(doc, p)) == Some(name) {
            continue;
        }
        if !policy.is_reference_tag(tag) {
            continue;
        }
        let Some(owner) = owning_entity(doc, candidate, policy) else {
            continue;
        };
        let Some(owner_name) = direct_name(doc, owner) else {
            continue;
        };
        if owner_name == name {
            continue;
        }

        let owner_tag = reported_tag(doc, owner, policy);
        let path = path_below(doc, owner, candidate);
        let context_tag = if path.len() >= 2 { path[path.len() - 2] } else { owner_tag };

        let key = (
            owner_tag.to_string(),
            owner_name.to_string(),
            context_tag.to_string(),
            tag.to_string(),
        );
        if !seen.insert(key) {
            continue;
        }
        out.push(ReferenceEntry {
            parent_entity_name: owner_name.to_string(),
            parent_entity_tag: owner_tag.to_string(),
            parent_transaction_id: transaction_id(doc, owner, policy).to_string(),
            context_tag: context_tag.to_string(),
            context_path: path.join(" > "),
            reference_element: tag.to_string(),
            full_path: doc.tag_path(candidate).join(" > "),
        });
    }
    out
}

// Every named entity in the document grouped by name, in order of first
// discovery. Nested and repeated definitions all count.
fn definitions_by_name<'a>(
    doc: &DocumentIndex<'a>,
    policy: &EntityPolicy,
) -> Result<Vec<(&'a str, Vec<Entity>)>, ConfigError> {
    let mut order: Vec<(&'a str, Vec<Entity>)> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();

    for id in doc.ids() {
        if entity_mark(doc, id, policy) != Some(EntityMark::Named) {
            continue;
        }
        let Some(name) = direct_name(doc, id) else {
            continue;
        };
        let reported = reported_tag(doc, id, policy);
        let tag = policy.canonical_tag(reported).unwrap_or(reported);
        let entity = build_entity(doc, id, tag, policy)?;
        match slots.get(name) {
            Some(&slot) => order[slot].1.push(entity),
            None => {
                slots.insert(name, order.len());
                order.push((name, vec![entity]));
            }
        }
    }
    Ok(order)
}

fn owning_entity(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> Option<NodeId> {
    doc.ancestors(id)
        .find(|&ancestor| entity_mark(doc, ancestor, policy) == Some(EntityMark::Named))
}

// Tags strictly below `owner` down to `id`, inclusive.
fn path_below<'a>(doc: &DocumentIndex<'a>, owner: NodeId, id: NodeId) -> Vec<&'a str> {
    let mut path: Vec<&'a str> = std::iter::once(id)
        .chain(doc.ancestors(id).take_while(|&a| a != owner))
        .map(|n| doc.tag(n))
        .collect();
    path.reverse();
    path
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(done * 100 / total).unwrap_or(100)
}

struct Progress<'f, F: FnMut(u8)> {
    sink: &'f mut F,
    last: Option<u8>,
}

impl<'f, F: FnMut(u8)> Progress<'f, F> {
    fn new(sink: &'f mut F) -> Self {
        let mut progress = Self { sink, last: None };
        progress.report(0);
        progress
    }

    fn report(&mut self, value: u8) {
        if self.last.is_some_and(|last| value <= last) {
            return;
        }
        self.last = Some(value);
        (self.sink)(value);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;

    use super::{build_reference_index, ReferenceIndex, ReferenceOptions, ReferenceOutcome};
    use crate::extract::ConfigError;
    use crate::policy::EntityPolicy;

    async fn index_of(xml: &str) -> ReferenceIndex {
        build_reference_index(
            xml,
            &EntityPolicy::default(),
            ReferenceOptions::default(),
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .expect("build")
        .into_index()
        .expect("complete")
    }

    #[tokio::test]
    async fn rule_network_references_host() {
        let index = index_of(
            r#"<Configuration>
                <IPHost><Name>Srv1</Name><IPAddress>10.0.0.1</IPAddress></IPHost>
                <FirewallRule><Name>R1</Name><NetworkPolicy><SourceNetworks><Network>Srv1</Network></SourceNetworks></NetworkPolicy></FirewallRule>
            </Configuration>"#,
        )
        .await;

        let tree = &index["Srv1"];
        assert_eq!(tree.primary_tag, "IPHost");
        assert_eq!(tree.definitions.len(), 1);
        assert_eq!(tree.references.len(), 1);
        let entry = &tree.references[0];
        assert_eq!(entry.parent_entity_tag, "FirewallRule");
        assert_eq!(entry.parent_entity_name, "R1");
        assert_eq!(entry.reference_element, "Network");
        assert_eq!(entry.context_tag, "SourceNetworks");
        assert_eq!(entry.context_path, "NetworkPolicy > SourceNetworks > Network");
        assert_eq!(
            entry.full_path,
            "Configuration > FirewallRule > NetworkPolicy > SourceNetworks > Network"
        );
    }

    #[tokio::test]
    async fn own_name_and_self_containment_are_not_references() {
        let index = index_of(
            r#"<Configuration>
                <Group><Name>Srv1</Name><Members><Member>Srv1</Member></Members></Group>
                <IPHost><Name>Other</Name></IPHost>
            </Configuration>"#,
        )
        .await;

        assert!(!index.contains_key("Srv1"));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn repeated_references_in_one_field_collapse() {
        let index = index_of(
            r#"<Configuration>
                <Zone><Name>LAN</Name></Zone>
                <FirewallRule><Name>R1</Name><NetworkPolicy>
                    <SourceZones><Zone>LAN</Zone><Zone>LAN</Zone></SourceZones>
                    <DestinationZones><Zone>LAN</Zone></DestinationZones>
                </NetworkPolicy></FirewallRule>
                <Interface><Name>Port1</Name><NetworkZone>LAN</NetworkZone></Interface>
            </Configuration>"#,
        )
        .await;

        let contexts: Vec<(&str, &str)> = index["LAN"]
            .references
            .iter()
            .map(|r| (r.parent_entity_name.as_str(), r.context_tag.as_str()))
            .collect();
        assert_eq!(
            contexts,
            vec![("R1", "SourceZones"), ("R1", "DestinationZones"), ("Port1", "Interface")]
        );
    }

    #[tokio::test]
    async fn unreferenced_names_are_pruned_and_unwrapped_owners_report_parent_tag() {
        let index = index_of(
            r#"<Configuration>
                <IPHostGroup><Name>Servers</Name></IPHostGroup>
                <IPHost><Name>Lonely</Name></IPHost>
                <VPNIPSecConnection transactionid="42"><Configuration><Name>Branch</Name><LocalSubnet>Servers</LocalSubnet></Configuration></VPNIPSecConnection>
            </Configuration>"#,
        )
        .await;

        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["Servers"]);
        let entry = &index["Servers"].references[0];
        assert_eq!(entry.parent_entity_tag, "VPNIPSecConnection");
        assert_eq!(entry.parent_entity_name, "Branch");
        assert_eq!(entry.parent_transaction_id, "42");
        assert_eq!(entry.context_tag, "VPNIPSecConnection");
    }

    #[tokio::test]
    async fn duplicate_definitions_are_kept() {
        let index = index_of(
            r#"<Configuration>
                <IPHost transactionid="1"><Name>Dup</Name></IPHost>
                <FQDNHost transactionid="2"><Name>Dup</Name></FQDNHost>
                <IPHostGroup><Name>G</Name><HostList><Host>Dup</Host></HostList></IPHostGroup>
            </Configuration>"#,
        )
        .await;

        let tree = &index["Dup"];
        assert_eq!(tree.primary_tag, "IPHost");
        assert_eq!(tree.definitions.len(), 2);
        assert_eq!(tree.references[0].context_tag, "HostList");
    }

    #[tokio::test]
    async fn same_tag_definitions_of_one_name_are_all_kept() {
        let index = index_of(
            r#"<Configuration>
                <IPHost><Name>Dup</Name><IPAddress>10.0.0.1</IPAddress></IPHost>
                <IPHost><Name>Dup</Name><IPAddress>10.0.0.2</IPAddress></IPHost>
                <IPHostGroup><Name>G</Name><HostList><Host>Dup</Host></HostList></IPHostGroup>
            </Configuration>"#,
        )
        .await;

        let tree = &index["Dup"];
        assert_eq!(tree.definitions.len(), 2);
        assert!(tree.definitions.iter().all(|d| d.tag == "IPHost"));
        assert!(tree.definitions[0].raw_xml.contains("10.0.0.1"));
        assert!(tree.definitions[1].raw_xml.contains("10.0.0.2"));
        assert_eq!(tree.references.len(), 1);
        assert_eq!(tree.references[0].parent_entity_name, "G");
    }

    #[tokio::test]
    async fn named_elements_nested_in_other_entities_are_definitions() {
        let index = index_of(
            r#"<Configuration>
                <WebFilterPolicy><Name>Strict</Name><RuleList><Rule><Name>Block</Name><Action>Deny</Action></Rule></RuleList></WebFilterPolicy>
                <FirewallRule><Name>R1</Name><NetworkPolicy><Policy>Block</Policy></NetworkPolicy></FirewallRule>
            </Configuration>"#,
        )
        .await;

        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["Block"]);
        let tree = &index["Block"];
        assert_eq!(tree.primary_tag, "Rule");
        assert_eq!(tree.definitions.len(), 1);
        let entry = &tree.references[0];
        assert_eq!(entry.parent_entity_tag, "FirewallRule");
        assert_eq!(entry.parent_entity_name, "R1");
        assert_eq!(entry.context_tag, "NetworkPolicy");
        assert_eq!(entry.reference_element, "Policy");
    }

    #[tokio::test]
    async fn progress_is_monotonic_from_zero_to_hundred() {
        let xml = r#"<Configuration>
            <Zone><Name>A</Name></Zone><Zone><Name>B</Name></Zone><Zone><Name>C</Name></Zone>
            <FirewallRule><Name>R</Name><NetworkPolicy><SourceZones><Zone>A</Zone><Zone>B</Zone></SourceZones></NetworkPolicy></FirewallRule>
        </Configuration>"#;
        let mut seen = Vec::new();
        let outcome = build_reference_index(
            xml,
            &EntityPolicy::default(),
            ReferenceOptions { chunk_size: 1 },
            &CancellationToken::new(),
            |p| seen.push(p),
        )
        .await
        .expect("build");

        assert!(matches!(outcome, ReferenceOutcome::Complete(_)));
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(seen.len() > 2);
    }

    #[tokio::test]
    async fn cancelled_token_discards_the_build() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = build_reference_index(
            r#"<Configuration><Zone><Name>A</Name></Zone><Rule><Name>R</Name><Zone>A</Zone></Rule></Configuration>"#,
            &EntityPolicy::default(),
            ReferenceOptions::default(),
            &cancel,
            |_| {},
        )
        .await
        .expect("build");

        assert_eq!(outcome, ReferenceOutcome::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_mid_build_stops_at_chunk_boundary() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let outcome = build_reference_index(
            r#"<Configuration><Zone><Name>A</Name></Zone><Zone><Name>B</Name></Zone><Rule><Name>R</Name><Zone>A</Zone><Zone>B</Zone></Rule></Configuration>"#,
            &EntityPolicy::default(),
            ReferenceOptions { chunk_size: 1 },
            &cancel,
            move |p| {
                if p > 0 {
                    trigger.cancel();
                }
            },
        )
        .await
        .expect("build");

        assert_eq!(outcome, ReferenceOutcome::Cancelled);
    }

    #[tokio::test]
    async fn malformed_xml_fails_before_indexing() {
        let mut calls = 0;
        let err = build_reference_index(
            "<Configuration><Zone>",
            &EntityPolicy::default(),
            ReferenceOptions::default(),
            &CancellationToken::new(),
            |_| calls += 1,
        )
        .await
        .expect_err("malformed");

        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(calls, 0);
    }
}
