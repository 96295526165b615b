use anyhow::Result;
use fwconf::diff::diff_configurations_with_options;
use fwconf::policy::EntityPolicy;
use fwconf::report::{render_diff, render_summary};
use xml_value_core::CompareOptions;

use crate::cli::{DiffArgs, OutputFormat};
use crate::load_model;

pub fn run_diff(args: DiffArgs, policy: &EntityPolicy) -> Result<()> {
    let old = load_model(&args.old, policy)?;
    let new = load_model(&args.new, policy)?;
    let opts = CompareOptions {
        min_shared_keys: args.min_shared_keys,
    };
    let result = diff_configurations_with_options(&old, &new, &opts);

    match (args.format, args.summary) {
        (OutputFormat::Text, true) => println!("{}", render_summary(&result.summary)),
        (OutputFormat::Text, false) => {
            if result.has_changes() {
                println!("{}", render_diff(&result));
                println!();
            }
            println!("{}", render_summary(&result.summary));
        }
        (OutputFormat::Json, true) => println!("{}", serde_json::to_string_pretty(&result.summary)?),
        (OutputFormat::Json, false) => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}
