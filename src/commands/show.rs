use std::io::Write;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{GlobalOpts, ShowOpts};
use crate::engine::Plan;
use crate::logging::Log;

/// Run the show command: print the plan resolved for this machine.
///
/// # Errors
///
/// Returns an error if setup fails or stdout cannot be written.
pub fn run(global: &GlobalOpts, opts: &ShowOpts, log: &dyn Log) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let rendered = render(&setup.plan, opts.json)?;
    let mut out = std::io::stdout().lock();
    out.write_all(rendered.as_bytes())
        .context("writing plan to stdout")?;
    Ok(())
}

/// Render `plan` as text, or as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(plan: &Plan, json: bool) -> Result<String> {
    if json {
        let mut text = serde_json::to_string_pretty(plan).context("serializing plan")?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(plan.render())
    }
}
