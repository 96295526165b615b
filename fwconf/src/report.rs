use colored::Colorize;
use xml_value_core::{format_diff_lines, FieldValue};

use crate::diff::{DiffItem, DiffResult, DiffSummary};
use crate::extract::ConfigurationModel;
use crate::firewall_rule::FirewallRule;
use crate::references::{EntityReferenceTree, ReferenceIndex};
use crate::tag_format::format_tag_name;
use crate::topology::InterfaceTopology;

/// Render entity collections, optionally only those stored under `tag`.
pub fn render_entities(model: &ConfigurationModel, tag: Option<&str>) -> String {
    let mut out = Vec::new();
    let known = model
        .collections
        .iter()
        .map(|c| (c.tag.as_str(), c.label.clone(), c.entities.as_slice()));
    let dynamic = model
        .entities_by_tag
        .iter()
        .map(|(t, entities)| (t.as_str(), format_tag_name(t), entities.as_slice()));

    for (collection_tag, label, entities) in known.chain(dynamic) {
        if entities.is_empty() || tag.is_some_and(|t| t != collection_tag) {
            continue;
        }
        out.push(format!("{label} ({})", entities.len()).bold().to_string());
        for entity in entities {
            let tid = if entity.transaction_id.is_empty() {
                String::new()
            } else {
                format!(" [tid={}]", entity.transaction_id)
            };
            out.push(format!("- {}{tid}", entity.name));
            for (key, value) in entity.fields.iter() {
                out.push(format!("    {key}: {}", short_value(value)));
            }
        }
        out.push(String::new());
    }
    out.push(format!("entities={}", model.entity_count()).cyan().to_string());
    out.join("\n")
}

/// Render the firewall rule table. Empty values get display defaults here.
pub fn render_rules(rules: &[FirewallRule]) -> String {
    let mut out = Vec::new();
    for rule in rules {
        let status = or_default(&rule.status, "Disable");
        let header = format!("#{} {} [{status}]", rule.index + 1, rule.name);
        out.push(if rule.is_enabled() {
            header.green().to_string()
        } else {
            header.dimmed().to_string()
        });
        if !rule.description.is_empty() {
            out.push(format!("    description: {}", rule.description));
        }
        out.push(format!(
            "    type={} action={} log={}",
            or_default(&rule.policy_type, "Network"),
            or_default(&rule.action, "None"),
            or_default(&rule.log_traffic, "Disable")
        ));
        if !rule.after.is_empty() {
            out.push(format!("    after: {}", rule.after));
        }
        out.push(format!(
            "    from {} / {}",
            join_or(&rule.source_zones, "Any"),
            join_or(&rule.source_networks, "Any")
        ));
        out.push(format!(
            "    to   {} / {}",
            join_or(&rule.destination_zones, "Any"),
            join_or(&rule.destination_networks, "Any")
        ));
        out.push(format!("    services: {}", join_or(&rule.services, "Any")));
        if !rule.identity.is_empty() {
            out.push(format!("    identity: {}", rule.identity));
        }
        if !rule.exclusions.is_empty() {
            let ex = &rule.exclusions;
            let parts = [
                ("source_zones", &ex.source_zones),
                ("destination_zones", &ex.destination_zones),
                ("source_networks", &ex.source_networks),
                ("destination_networks", &ex.destination_networks),
                ("services", &ex.services),
            ];
            for (label, values) in parts.iter().filter(|(_, v)| !v.is_empty()) {
                out.push(format!("    exclude {label}: {}", values.join(", ")).yellow().to_string());
            }
        }
        out.push(format!(
            "    web_filter={} app_control={} ips={} av={} zero_day={} proxy={} decrypt_https={}",
            or_default(&rule.web_filter, "None"),
            or_default(&rule.application_control, "None"),
            or_default(&rule.intrusion_prevention, "None"),
            or_default(&rule.scan_virus, "Disable"),
            or_default(&rule.zero_day_protection, "Disable"),
            or_default(&rule.proxy_mode, "Disable"),
            or_default(&rule.decrypt_https, "Disable"),
        ));
    }
    if out.is_empty() {
        out.push("no firewall rules".to_string());
    }
    out.join("\n")
}

/// Render a diff result with `+`/`-`/`~` prefixed, colored lines.
pub fn render_diff(result: &DiffResult) -> String {
    let mut raw = Vec::new();
    for item in &result.removed {
        raw.push(format!("- {}", item_label(item)));
    }
    for item in &result.added {
        raw.push(format!("+ {}", item_label(item)));
    }
    for item in &result.modified {
        raw.push(format!("~ {}", item_label(item)));
        for change in &item.changes {
            for line in format_diff_lines(&change.field, &change.diff) {
                raw.push(format!("    {line}"));
            }
        }
    }
    raw.iter().map(|line| colorize(line)).collect::<Vec<_>>().join("\n")
}

/// Render summary counts for terminal output.
pub fn render_summary(summary: &DiffSummary) -> String {
    format!(
        "added={} removed={} modified={} unchanged={}",
        summary.added, summary.removed, summary.modified, summary.unchanged
    )
    .cyan()
    .to_string()
}

/// Render reference trees, optionally just the one for `name`.
pub fn render_references(index: &ReferenceIndex, name: Option<&str>) -> String {
    let mut out = Vec::new();
    let trees: Vec<&EntityReferenceTree> = match name {
        Some(name) => index.get(name).into_iter().collect(),
        None => index.values().collect(),
    };
    for tree in trees {
        out.push(
            format!(
                "{} ({}) defined {}x, referenced {}x",
                tree.entity_name,
                format_tag_name(&tree.primary_tag),
                tree.definitions.len(),
                tree.references.len()
            )
            .bold()
            .to_string(),
        );
        for entry in &tree.references {
            out.push(format!(
                "  <- {} {} via {} ({})",
                entry.parent_entity_tag, entry.parent_entity_name, entry.context_tag, entry.context_path
            ));
        }
    }
    if out.is_empty() {
        out.push("no references found".to_string());
    }
    out.join("\n")
}

pub fn render_topology(topology: &InterfaceTopology) -> String {
    if topology.is_empty() {
        return "no interface topology".to_string();
    }
    let mut out = Vec::new();
    let sections = [
        ("vlans_by_interface", &topology.vlans_by_interface),
        ("aliases_by_interface", &topology.aliases_by_interface),
        ("lag_members", &topology.lag_members),
        ("interfaces_by_lag", &topology.interfaces_by_lag),
    ];
    for (title, map) in sections {
        if map.is_empty() {
            continue;
        }
        out.push(title.to_string());
        for (key, values) in map {
            out.push(format!("- {key}: {}", values.join(", ")));
        }
        out.push(String::new());
    }
    out.join("\n").trim_end().to_string()
}

fn item_label(item: &DiffItem) -> String {
    format!("{} {}", format_tag_name(&item.tag), item.name)
}

fn colorize(line: &str) -> String {
    match line.trim_start().chars().next() {
        Some('+') => line.green().to_string(),
        Some('-') => line.red().to_string(),
        Some('~') => line.yellow().to_string(),
        _ => line.to_string(),
    }
}

fn short_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Scalar(s) => s.clone(),
        FieldValue::Array(items) if items.iter().all(FieldValue::is_scalar) => value.to_string(),
        FieldValue::Array(items) => format!("[{} records]", items.len()),
        FieldValue::Object(map) => format!("{{{}}}", map.keys().collect::<Vec<_>>().join(", ")),
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn join_or(values: &[String], default: &str) -> String {
    if values.is_empty() {
        default.to_string()
    } else {
        values.join(", ")
    }
}
