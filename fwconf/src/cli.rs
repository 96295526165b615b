use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "fwconf")]
#[command(about = "Extract, diff and cross-reference firewall XML configuration exports")]
pub struct Cli {
    /// Entity policy TOML to use instead of the built-in one.
    #[arg(long, global = true)]
    pub policy_file: Option<PathBuf>,
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List extracted entities grouped by tag.
    Entities(EntitiesArgs),
    /// Show the flattened firewall rule table.
    Rules(RulesArgs),
    /// Compare two configuration exports entity by entity.
    Diff(DiffArgs),
    /// Show where each named entity is referenced.
    Refs(RefsArgs),
    /// Show VLAN, alias and LAG groupings by interface.
    Topology(TopologyArgs),
}

#[derive(Parser, Debug)]
pub struct EntitiesArgs {
    pub file: PathBuf,
    /// Only show entities stored under this tag.
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct RulesArgs {
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print only the summary counts.
    #[arg(long)]
    pub summary: bool,
    /// Shared keys needed to pair two differing records at one array position.
    #[arg(long, default_value_t = 1)]
    pub min_shared_keys: usize,
}

#[derive(Parser, Debug)]
pub struct RefsArgs {
    pub file: PathBuf,
    /// Only show references to this entity name.
    #[arg(long)]
    pub name: Option<String>,
    /// Entity names processed between yields.
    #[arg(long, default_value_t = 64)]
    pub chunk_size: usize,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct TopologyArgs {
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
