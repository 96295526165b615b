use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fwconf::extract::{load_configuration, ConfigurationModel};
use fwconf::policy::EntityPolicy;
use fwconf::report::{render_entities, render_rules, render_topology};

mod cli;
mod diff_cmd;
mod logging;
mod refs_cmd;

use cli::{Cli, Command, EntitiesArgs, OutputFormat, RulesArgs, TopologyArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let policy = load_policy(cli.policy_file.as_deref())?;

    match cli.command {
        Command::Entities(args) => run_entities(args, &policy),
        Command::Rules(args) => run_rules(args, &policy),
        Command::Diff(args) => diff_cmd::run_diff(args, &policy),
        Command::Refs(args) => refs_cmd::run_refs(args, &policy),
        Command::Topology(args) => run_topology(args, &policy),
    }
}

fn load_policy(path: Option<&Path>) -> Result<EntityPolicy> {
    match path {
        Some(path) => EntityPolicy::load(path)
            .with_context(|| format!("failed to load entity policy {}", path.display())),
        None => Ok(EntityPolicy::default()),
    }
}

pub(crate) fn load_model(path: &Path, policy: &EntityPolicy) -> Result<ConfigurationModel> {
    load_configuration(path, policy).with_context(|| format!("failed to parse {}", path.display()))
}

fn run_entities(args: EntitiesArgs, policy: &EntityPolicy) -> Result<()> {
    let model = load_model(&args.file, policy)?;
    if let Some(tag) = args.tag.as_deref() {
        if model.entities_with_tag(tag).is_empty() {
            bail!("no entities with tag {tag} in {}", args.file.display());
        }
    }
    match args.format {
        OutputFormat::Text => println!("{}", render_entities(&model, args.tag.as_deref())),
        OutputFormat::Json => match args.tag.as_deref() {
            Some(tag) => println!("{}", serde_json::to_string_pretty(model.entities_with_tag(tag))?),
            None => println!("{}", serde_json::to_string_pretty(&model)?),
        },
    }
    Ok(())
}

fn run_rules(args: RulesArgs, policy: &EntityPolicy) -> Result<()> {
    let model = load_model(&args.file, policy)?;
    match args.format {
        OutputFormat::Text => println!("{}", render_rules(&model.firewall_rules)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&model.firewall_rules)?),
    }
    Ok(())
}

fn run_topology(args: TopologyArgs, policy: &EntityPolicy) -> Result<()> {
    let model = load_model(&args.file, policy)?;
    match args.format {
        OutputFormat::Text => println!("{}", render_topology(&model.topology)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&model.topology)?),
    }
    Ok(())
}
