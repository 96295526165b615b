use std::fs;
use std::path::PathBuf;

use fwconf::policy::EntityPolicy;
use fwconf::references::{build_reference_index, ReferenceIndex, ReferenceOptions};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

async fn index_with(chunk_size: usize) -> ReferenceIndex {
    let xml = fs::read_to_string(fixture("fixtures/config_old.xml")).expect("fixture");
    build_reference_index(
        &xml,
        &EntityPolicy::default(),
        ReferenceOptions { chunk_size },
        &CancellationToken::new(),
        |_| {},
    )
    .await
    .expect("build")
    .into_index()
    .expect("complete")
}

#[tokio::test]
async fn fixture_references_cover_used_entities_only() {
    let index = index_with(64).await;

    assert_eq!(
        index.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["DMZ", "LAN", "Port1", "Port2", "Port3", "Servers", "Srv1", "Srv2", "WAN", "Web"]
    );
    assert!(index.values().all(|tree| !tree.references.is_empty()));
    assert!(!index.contains_key("Updates"));
    assert!(!index.contains_key("Allow Web"));
}

#[tokio::test]
async fn zone_references_name_their_rule_context() {
    let index = index_with(64).await;
    let lan = &index["LAN"];

    assert_eq!(lan.primary_tag, "Zone");
    let entries: Vec<(&str, &str, &str)> = lan
        .references
        .iter()
        .map(|r| {
            (
                r.parent_entity_tag.as_str(),
                r.parent_entity_name.as_str(),
                r.context_tag.as_str(),
            )
        })
        .collect();
    assert_eq!(
        entries,
        vec![
            ("Interface", "Port1", "Interface"),
            ("VLAN", "Port1.10", "VLAN"),
            ("FirewallRule", "Allow Web", "SourceZones"),
            ("FirewallRule", "Staff Internet", "SourceZones"),
        ]
    );
}

#[tokio::test]
async fn excluded_network_is_still_a_reference() {
    let index = index_with(64).await;
    let srv2 = &index["Srv2"];

    let exclusion = srv2
        .references
        .iter()
        .find(|r| r.parent_entity_name == "Staff Internet")
        .expect("exclusion reference");
    assert_eq!(exclusion.context_path, "UserPolicy > Exclusions > SourceNetworks > Network");
    assert_eq!(exclusion.reference_element, "Network");
}

#[tokio::test]
async fn chunk_size_does_not_change_the_result() {
    assert_eq!(index_with(1).await, index_with(1000).await);
    assert_eq!(index_with(0).await, index_with(64).await);
}
