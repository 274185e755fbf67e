//! `cool recommended` -- the recommended baselines of a stream.

use anyhow::Result;
use cool_ucm::Identifiable;

use crate::cli::StreamArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `cool recommended` command.
pub fn run(ctx: &RuntimeContext, args: &StreamArgs) -> Result<()> {
    let session = ctx.session();
    let stream = session.stream(&args.stream)?;
    let recommended: Vec<String> = stream
        .recommended_baselines(session, false)?
        .iter()
        .map(|b| b.reference().to_string())
        .collect();

    if ctx.json {
        output_json(&recommended);
    } else if recommended.is_empty() {
        if !ctx.quiet {
            println!("{} recommends no baselines", stream.reference());
        }
    } else {
        for baseline in &recommended {
            println!("{baseline}");
        }
    }
    Ok(())
}
