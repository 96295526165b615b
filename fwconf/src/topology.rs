//! Interface-bound groupings: VLANs and aliases by parent interface, LAG
//! membership in both directions.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::entity::Entity;
use crate::policy::TopologyPolicy;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceTopology {
    /// Interface name -> VLAN entity names bound to it.
    pub vlans_by_interface: BTreeMap<String, Vec<String>>,
    /// Interface name -> alias entity names bound to it.
    pub aliases_by_interface: BTreeMap<String, Vec<String>>,
    /// LAG name -> member interface names as listed on the LAG.
    pub lag_members: BTreeMap<String, Vec<String>>,
    /// LAG name -> interface entities that are members of it.
    pub interfaces_by_lag: BTreeMap<String, Vec<String>>,
}

impl InterfaceTopology {
    pub fn build<'a>(entities: impl IntoIterator<Item = &'a Entity>, policy: &TopologyPolicy) -> Self {
        let mut topology = Self::default();
        let mut interfaces: Vec<&Entity> = Vec::new();

        for entity in entities {
            let tag = entity.tag.as_str();
            if tag == policy.vlan_tag {
                push_bound(&mut topology.vlans_by_interface, entity, &policy.interface_field);
            } else if tag == policy.alias_tag {
                push_bound(&mut topology.aliases_by_interface, entity, &policy.interface_field);
            } else if tag == policy.lag_tag {
                let members: Vec<String> = entity
                    .fields
                    .get(&policy.lag_member_field)
                    .map(|value| {
                        value
                            .scalars()
                            .into_iter()
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                topology.lag_members.insert(entity.name.clone(), members);
            }
            if tag == policy.interface_tag {
                interfaces.push(entity);
            }
        }

        for (lag, members) in &topology.lag_members {
            let members: HashSet<&str> = members.iter().map(String::as_str).collect();
            let bound: Vec<String> = interfaces
                .iter()
                .filter(|iface| members.contains(iface.name.as_str()))
                .map(|iface| iface.name.clone())
                .collect();
            if !bound.is_empty() {
                topology.interfaces_by_lag.insert(lag.clone(), bound);
            }
        }
        topology
    }

    pub fn is_empty(&self) -> bool {
        self.vlans_by_interface.is_empty()
            && self.aliases_by_interface.is_empty()
            && self.lag_members.is_empty()
    }
}

fn push_bound(map: &mut BTreeMap<String, Vec<String>>, entity: &Entity, field: &str) {
    let Some(interface) = entity.fields.get(field).and_then(|v| v.as_scalar()) else {
        return;
    };
    if interface.is_empty() {
        return;
    }
    map.entry(interface.to_string())
        .or_default()
        .push(entity.name.clone());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::extract::parse_configuration;

    #[test]
    fn groups_vlans_aliases_and_lag_members() {
        let model = parse_configuration(
            r#"<Configuration>
                <Interface><Name>Port1</Name><Hardware>Port1</Hardware></Interface>
                <Interface><Name>Port2</Name><Hardware>Port2</Hardware></Interface>
                <Interface><Name>Port3</Name><Hardware>Port3</Hardware></Interface>
                <LAG><Name>Bond0</Name><MemberInterface><Interface>Port2</Interface><Interface>Port3</Interface></MemberInterface></LAG>
                <LAG><Name>Bond1</Name><MemberInterface>Port9</MemberInterface></LAG>
                <VLAN><Name>Port1.10</Name><Interface>Port1</Interface></VLAN>
                <VLAN><Name>Port1.20</Name><Interface>Port1</Interface></VLAN>
                <Alias><Name>Port1:0</Name><Interface>Port1</Interface></Alias>
            </Configuration>"#,
        )
        .expect("model");
        let topology = &model.topology;

        assert_eq!(topology.vlans_by_interface["Port1"], vec!["Port1.10", "Port1.20"]);
        assert_eq!(topology.aliases_by_interface["Port1"], vec!["Port1:0"]);
        assert_eq!(topology.lag_members["Bond0"], vec!["Port2", "Port3"]);
        assert_eq!(topology.lag_members["Bond1"], vec!["Port9"]);
        assert_eq!(topology.interfaces_by_lag["Bond0"], vec!["Port2", "Port3"]);
        assert!(!topology.interfaces_by_lag.contains_key("Bond1"));
    }
}
